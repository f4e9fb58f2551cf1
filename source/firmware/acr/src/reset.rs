// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Falcon reset assert/deassert with bounded polling
//! OWNERS: @acr-team
//! PUBLIC API: ResetSequencer::{assert_reset, deassert_reset}
//! INVARIANTS: A poll ends only on the exact RESET_STATUS value or on Timeout; never retried

use core::time::Duration;

use acr_hal::{Bus, Timer};
use acr_log::Topic;

use crate::error::AcrError;
use crate::falcon::FalconConfig;
use crate::poll::wait_on;
use crate::regs::{EngineReset, ResetStatus};

const TARGET: &str = "acr::reset";

pub struct ResetSequencer<B, T> {
    bus: B,
    timer: T,
}

impl<B: Bus, T: Timer> ResetSequencer<B, T> {
    pub const fn new(bus: B, timer: T) -> Self {
        Self { bus, timer }
    }

    pub fn assert_reset(&self, cfg: &FalconConfig, timeout: Duration) -> Result<(), AcrError> {
        self.transition(cfg, true, ResetStatus::Asserted, timeout)
    }

    pub fn deassert_reset(&self, cfg: &FalconConfig, timeout: Duration) -> Result<(), AcrError> {
        self.transition(cfg, false, ResetStatus::Deasserted, timeout)
    }

    fn transition(
        &self,
        cfg: &FalconConfig,
        assert: bool,
        expected: ResetStatus,
        timeout: Duration,
    ) -> Result<(), AcrError> {
        let reg = cfg.reset_control;
        if reg == 0 {
            return Err(AcrError::InvalidResetAddress);
        }
        EngineReset::read(&self.bus, reg).set_reset(assert).write(&self.bus, reg);

        let result = wait_on(&self.timer, timeout, || {
            (EngineReset::read(&self.bus, reg).status() == expected).then_some(())
        });
        match result {
            Ok(()) => acr_log::debug(TARGET, Topic::RESET, |line| {
                line.text(if assert { "asserted " } else { "deasserted " });
                line.kv_literal("falcon", cfg.identity.id.name());
                line.text(" ");
                line.kv_dec("inst", u64::from(cfg.identity.instance));
            }),
            Err(err) => acr_log::error(TARGET, Topic::RESET, |line| {
                line.text(if assert { "assert timed out " } else { "deassert timed out " });
                line.kv_literal("falcon", cfg.identity.id.name());
                line.text(" ");
                line.kv_hex("reg", reg as u64);
                line.text(" ");
                line.fmt(format_args!("err={err}"));
            }),
        }
        result
    }
}
