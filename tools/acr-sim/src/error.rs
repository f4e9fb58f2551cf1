// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the tool itself, as opposed to a failed boot.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid profile: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unknown falcon `{0}`")]
    UnknownFalcon(String),
    #[error("sha256 must be 64 hex digits: {0}")]
    Digest(#[from] hex::FromHexError),
    #[error("locked region {start:#x}..{end:#x} in slot {slot} is empty or not page aligned")]
    LockedRegion { slot: u8, start: u64, end: u64 },
    #[error("slot {slot} does not exist on {chip}")]
    NoSuchSlot { slot: u8, chip: &'static str },
}

impl SimError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SimError::Io { path: path.into(), source }
    }
}
