// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bounded busy-wait.

use core::time::Duration;

use acr_hal::Timer;

use crate::error::AcrError;

/// Calls `cond` until it yields a value or `timeout` has elapsed on `timer`.
///
/// The timestamp is re-read on every iteration. The condition always runs at
/// least once, and once more after the last timestamp that was still inside
/// the budget, so a zero timeout still samples the hardware.
pub fn wait_on<T, R>(timer: &T, timeout: Duration, mut cond: impl FnMut() -> Option<R>) -> Result<R, AcrError>
where
    T: Timer + ?Sized,
{
    let budget = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
    let start = timer.now();
    loop {
        if let Some(value) = cond() {
            return Ok(value);
        }
        if timer.now().wrapping_sub(start) >= budget {
            return Err(AcrError::Timeout);
        }
    }
}
