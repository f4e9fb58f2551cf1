// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: GPU secure-boot core: WPR lifecycle, sub-WPR grants, falcon reset, revocation
//! OWNERS: @acr-team
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit + proptest per module, host integration in tests/acr_e2e
//!
//! Runs as trusted code on a GPU microcontroller. Register access goes
//! through [`acr_hal::Bus`]; every per-generation address and quirk comes from
//! a [`chip::Chip`] implementation picked at build time.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), forbid(clippy::unwrap_used))]

pub mod boot;
pub mod chip;
pub mod config;
pub mod error;
pub mod falcon;
pub mod plm;
pub mod poll;
pub mod regs;
pub mod reset;
pub mod revocation;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod subwpr;
pub mod timer;
pub mod wpr;

pub use boot::{
    BootCommand, BootFailure, BootOrchestrator, BootReport, BootStage, DmaProperties, PayloadDescriptor,
    PayloadLoader,
};
pub use chip::{Chip, Selected};
pub use config::{AcrConfig, UCODE_VERSION};
pub use error::{AcrError, AcrStatus, ErrorClass};
pub use falcon::{resolve, FalconConfig, FalconId, FalconIdentity};
pub use plm::PlmManager;
pub use reset::ResetSequencer;
pub use revocation::{RevocationGate, RevocationRecord};
pub use subwpr::{SubWpr, SubWprProgram, SubWprState, SubWprUnit};
pub use timer::PtimerClock;
pub use wpr::{LockState, WprAllocator, WprRegion, WprSlotState};
