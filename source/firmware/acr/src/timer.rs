// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! PTIMER-backed [`Timer`].

use acr_hal::{Bus, Timer};

use crate::regs::{NV_PTIMER_TIME_0, NV_PTIMER_TIME_1};

/// Nanosecond clock read from the GPU's PTIMER.
pub struct PtimerClock<B> {
    bus: B,
}

impl<B: Bus> PtimerClock<B> {
    pub const fn new(bus: B) -> Self {
        Self { bus }
    }
}

impl<B: Bus> Timer for PtimerClock<B> {
    fn now(&self) -> u64 {
        // TIME_0 may wrap between the two reads; retry until TIME_1 is stable.
        loop {
            let hi = self.bus.read32(NV_PTIMER_TIME_1);
            let lo = self.bus.read32(NV_PTIMER_TIME_0);
            if self.bus.read32(NV_PTIMER_TIME_1) == hi {
                return (u64::from(hi) << 32) | u64::from(lo);
            }
        }
    }
}
