// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! TOML description of a simulated GPU and the boot command to run on it.
//!
//! Addresses and sizes are bytes. `payload.image` is resolved relative to
//! the profile's directory.

use std::fs;
use std::path::{Path, PathBuf};

use acr::{BootCommand, DmaProperties, FalconId, FalconIdentity, PayloadDescriptor};
use serde::Deserialize;

use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChipKind {
    Tu10x,
    Ga10x,
    Gh100,
}

impl ChipKind {
    pub const fn name(self) -> &'static str {
        match self {
            ChipKind::Tu10x => "tu10x",
            ChipKind::Ga10x => "ga10x",
            ChipKind::Gh100 => "gh100",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    pub chip: ChipKind,
    #[serde(default)]
    pub gpu: GpuProfile,
    #[serde(default)]
    pub faults: Faults,
    #[serde(default)]
    pub acr: AcrOverrides,
    pub target: TargetProfile,
    pub payload: PayloadProfile,
    #[serde(default)]
    pub dma: DmaProfile,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GpuProfile {
    /// Chipset field of the identity register; defaults to the generation's first.
    pub chipset: Option<u32>,
    pub fuse_version: Option<u32>,
    pub usable_fb_mb: Option<u32>,
    /// Regions an earlier boot agent left locked.
    #[serde(default)]
    pub locked: Vec<LockedRegion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockedRegion {
    pub slot: u8,
    pub start: u64,
    pub end: u64,
    pub region_id: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StuckReset {
    /// The target never leaves reset.
    Asserted,
    /// The target never enters reset.
    Deasserted,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Faults {
    #[serde(default)]
    pub stuck_lock: bool,
    pub stuck_reset: Option<StuckReset>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcrOverrides {
    pub ucode_version: Option<u32>,
    pub carveout_start: Option<u64>,
    pub carveout_end: Option<u64>,
    pub lock_timeout_us: Option<u64>,
    pub reset_timeout_us: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetProfile {
    pub falcon: String,
    #[serde(default)]
    pub instance: u32,
    #[serde(default)]
    pub smc_aware: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PayloadProfile {
    #[serde(default)]
    pub source: u64,
    pub size: u64,
    #[serde(default)]
    pub image_offset: u64,
    pub image_size: u64,
    /// Image bytes the loader digests; an empty image when absent.
    pub image: Option<PathBuf>,
    /// Expected SHA-256 of `image`, hex encoded.
    pub sha256: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DmaProfile {
    #[serde(default)]
    pub ctx_dma: u8,
    #[serde(default = "all_levels")]
    pub read_mask: u8,
    #[serde(default)]
    pub write_mask: u8,
}

impl Default for DmaProfile {
    fn default() -> Self {
        Self { ctx_dma: 0, read_mask: all_levels(), write_mask: 0 }
    }
}

fn all_levels() -> u8 {
    acr::subwpr::MASK_ALL
}

impl Profile {
    pub fn parse(text: &str) -> Result<Self, SimError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads `path` and anchors a relative `payload.image` at its directory.
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let text = fs::read_to_string(path).map_err(|err| SimError::io(path, err))?;
        let mut profile = Self::parse(&text)?;
        if let (Some(image), Some(dir)) = (profile.payload.image.as_mut(), path.parent()) {
            if image.is_relative() {
                *image = dir.join(&*image);
            }
        }
        Ok(profile)
    }

    pub fn target(&self) -> Result<FalconIdentity, SimError> {
        let id = FalconId::from_name(&self.target.falcon.to_ascii_lowercase())
            .ok_or_else(|| SimError::UnknownFalcon(self.target.falcon.clone()))?;
        Ok(FalconIdentity::new(id, self.target.instance))
    }

    pub fn command(&self) -> Result<BootCommand, SimError> {
        Ok(BootCommand {
            target: self.target()?,
            smc_aware: self.target.smc_aware,
            payload: PayloadDescriptor {
                source: self.payload.source,
                size: self.payload.size,
                image_offset: self.payload.image_offset,
                image_size: self.payload.image_size,
            },
            dma: DmaProperties {
                ctx_dma: self.dma.ctx_dma,
                read_mask: self.dma.read_mask,
                write_mask: self.dma.write_mask,
            },
        })
    }

    pub fn expected_digest(&self) -> Result<Option<[u8; 32]>, SimError> {
        let Some(text) = self.payload.sha256.as_deref() else {
            return Ok(None);
        };
        let mut digest = [0u8; 32];
        hex::decode_to_slice(text.trim(), &mut digest)?;
        Ok(Some(digest))
    }

    pub fn image(&self) -> Result<Vec<u8>, SimError> {
        match &self.payload.image {
            Some(path) => fs::read(path).map_err(|err| SimError::io(path, err)),
            None => Ok(Vec::new()),
        }
    }
}
