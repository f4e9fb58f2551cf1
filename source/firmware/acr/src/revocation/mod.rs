// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Anti-rollback and chip-identity gate
//! OWNERS: @acr-team
//! PUBLIC API: RevocationRecord, RevocationGate
//! DEPENDS_ON: regs::{Boot42, FuseUcodeRev}
//! INVARIANTS: check() has no side effects; records are read fresh on every boot
//!
//! The chip identity is checked before the version: a fuse value read on the
//! wrong generation has no meaning.

#[cfg(test)]
mod tests_prop;

use core::marker::PhantomData;

use acr_hal::Bus;
use acr_log::Topic;

use crate::chip::Chip;
use crate::error::AcrError;
use crate::regs::{Boot42, FuseUcodeRev, NV_PMC_BOOT_42};

const TARGET: &str = "acr::revocation";

/// Inputs of one revocation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevocationRecord {
    /// Minimum ucode version the hardware accepts.
    pub hw_fuse_version: u32,
    /// Version this build declares.
    pub sw_ucode_version: u32,
    /// Chipset from `NV_PMC_BOOT_42`.
    pub chip_id: u32,
}

impl RevocationRecord {
    /// Reads the fuses of generation `C`.
    pub fn read<C: Chip>(bus: &impl Bus, sw_ucode_version: u32) -> Self {
        Self {
            hw_fuse_version: FuseUcodeRev::read(bus, C::FUSE_UCODE_REV).version(),
            sw_ucode_version,
            chip_id: Boot42::read(bus, NV_PMC_BOOT_42).chipset(),
        }
    }
}

/// Gate for a build locked to chip generation `C`.
pub struct RevocationGate<C> {
    _chip: PhantomData<C>,
}

impl<C: Chip> Default for RevocationGate<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Chip> RevocationGate<C> {
    pub const fn new() -> Self {
        Self { _chip: PhantomData }
    }

    pub fn check(&self, record: &RevocationRecord) -> Result<(), AcrError> {
        if !C::supports_chipset(record.chip_id) {
            acr_log::error(TARGET, Topic::FUSE, |line| {
                line.text("chip id mismatch ");
                line.kv_hex("chip", u64::from(record.chip_id));
                line.text(" ");
                line.kv_literal("build", C::NAME);
            });
            return Err(AcrError::InvalidChipId);
        }
        if record.sw_ucode_version < record.hw_fuse_version {
            acr_log::error(TARGET, Topic::FUSE, |line| {
                line.text("ucode revoked ");
                line.kv_dec("sw", u64::from(record.sw_ucode_version));
                line.text(" ");
                line.kv_dec("fuse", u64::from(record.hw_fuse_version));
            });
            return Err(AcrError::UcodeRevoked);
        }
        acr_log::debug(TARGET, Topic::FUSE, |line| {
            line.text("passed ");
            line.kv_dec("sw", u64::from(record.sw_ucode_version));
            line.text(" ");
            line.kv_dec("fuse", u64::from(record.hw_fuse_version));
        });
        Ok(())
    }

    /// Reads a fresh record from `bus` and checks it.
    pub fn check_hardware(&self, bus: &impl Bus, sw_ucode_version: u32) -> Result<RevocationRecord, AcrError> {
        let record = RevocationRecord::read::<C>(bus, sw_ucode_version);
        self.check(&record)?;
        Ok(record)
    }
}
