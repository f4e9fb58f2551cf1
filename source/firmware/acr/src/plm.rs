// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Privilege level mask raise / restore / source lowering
//! OWNERS: @acr-team
//! PUBLIC API: PlmManager::{read, raise, restore, lower_source}
//! INVARIANTS: Every update is one read-modify-write of the whole word followed by a readback;
//!             restore writes back the exact saved pattern, never a default

use acr_hal::Bus;
use acr_log::Topic;

use crate::error::AcrError;
use crate::regs::{PrivLevelMask, ViolationPolicy};

const TARGET: &str = "acr::plm";

pub struct PlmManager<B> {
    bus: B,
}

impl<B: Bus> PlmManager<B> {
    pub const fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn read(&self, register: usize) -> PrivLevelMask {
        PrivLevelMask::read(&self.bus, register)
    }

    /// Denies writes from every privilege level below `level` and reports violations.
    ///
    /// Returns the mask as it was before raising; hand it to [`PlmManager::restore`].
    pub fn raise(&self, register: usize, level: u8) -> Result<PrivLevelMask, AcrError> {
        if register == 0 || level >= PrivLevelMask::LEVELS {
            return Err(AcrError::InvalidArgument);
        }
        let saved = self.read(register);
        let below = (1u8 << level) - 1;
        let raised = saved
            .set_write_protection_bits(saved.write_protection_bits() & !below)
            .set_write_violation(ViolationPolicy::Report);
        self.commit(register, raised)?;
        acr_log::debug(TARGET, Topic::PLM, |line| {
            line.text("raised ");
            line.kv_hex("reg", register as u64);
            line.text(" ");
            line.kv_hex("from", saved.raw() as u64);
            line.text(" ");
            line.kv_hex("to", raised.raw() as u64);
        });
        Ok(saved)
    }

    /// Writes back a mask captured by [`PlmManager::raise`].
    pub fn restore(&self, register: usize, saved: PrivLevelMask) -> Result<(), AcrError> {
        if register == 0 {
            return Err(AcrError::InvalidArgument);
        }
        self.commit(register, saved)?;
        acr_log::debug(TARGET, Topic::PLM, |line| {
            line.text("restored ");
            line.kv_hex("reg", register as u64);
            line.text(" ");
            line.kv_hex("value", saved.raw() as u64);
        });
        Ok(())
    }

    /// Enables request source `source` in `SOURCE_ENABLE`, leaving every other field alone.
    pub fn lower_source(&self, register: usize, source: u8) -> Result<PrivLevelMask, AcrError> {
        if register == 0 || u32::from(source) >= PrivLevelMask::SOURCE_BITS {
            return Err(AcrError::InvalidArgument);
        }
        let current = self.read(register);
        let lowered = current.set_source_enable(current.source_enable() | (1 << source));
        if lowered != current {
            self.commit(register, lowered)?;
        }
        Ok(lowered)
    }

    fn commit(&self, register: usize, value: PrivLevelMask) -> Result<(), AcrError> {
        value.write(&self.bus, register);
        let readback = self.read(register);
        if readback != value {
            acr_log::error(TARGET, Topic::PLM, |line| {
                line.text("readback mismatch ");
                line.kv_hex("reg", register as u64);
                line.text(" ");
                line.kv_hex("want", value.raw() as u64);
                line.text(" ");
                line.kv_hex("got", readback.raw() as u64);
            });
            return Err(AcrError::ReadbackMismatch);
        }
        Ok(())
    }
}
