// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Register-access HAL consumed by the ACR firmware core
//! OWNERS: @acr-team
//! PUBLIC API: Bus, Timer, Aperture, Mmio, sim::{SimBus, SimTimer} (feature `sim`)
//! INVARIANTS: 32-bit aligned accesses only; no caching of register values
//!
//! The core never touches memory-mapped registers directly. Everything goes
//! through [`Bus`], which keeps the firmware testable against the simulated
//! register file in [`sim`].

#![cfg_attr(not(test), no_std)]

#[cfg(feature = "sim")]
pub mod sim;

/// 32-bit register bus shared by the secure-boot core.
pub trait Bus {
    /// Reads the register at `addr`.
    fn read32(&self, addr: usize) -> u32;
    /// Writes `value` to the register at `addr`.
    fn write32(&self, addr: usize, value: u32);
}

impl<B: Bus + ?Sized> Bus for &B {
    fn read32(&self, addr: usize) -> u32 {
        (**self).read32(addr)
    }

    fn write32(&self, addr: usize, value: u32) {
        (**self).write32(addr, value)
    }
}

/// Abstraction for a monotonic timer.
pub trait Timer {
    /// Returns the current time in nanoseconds.
    fn now(&self) -> u64;
}

impl<T: Timer + ?Sized> Timer for &T {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

/// Register aperture a [`Mmio`] window is mapped through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aperture {
    /// PCI BAR0 priv space, shared with the host.
    Bar0,
    /// Falcon-local CSB space.
    Csb,
}

/// Raw memory-mapped register window.
///
/// Accesses that are unaligned or fall outside the window never reach the
/// hardware: reads return all ones, the way an aborted bus transaction reads
/// back, and writes are dropped.
pub struct Mmio {
    aperture: Aperture,
    base: usize,
    len: usize,
}

impl Mmio {
    /// Creates a window over `len` bytes of registers starting at `base`.
    ///
    /// # Safety
    ///
    /// `base..base + len` must be a valid, mapped register range for the
    /// whole lifetime of the returned value, and nothing else may assume
    /// exclusive ownership of it.
    pub const unsafe fn new(aperture: Aperture, base: usize, len: usize) -> Self {
        Self { aperture, base, len }
    }

    pub const fn aperture(&self) -> Aperture {
        self.aperture
    }

    fn checked(&self, addr: usize) -> Option<usize> {
        let in_window = addr % 4 == 0 && addr.checked_add(4).is_some_and(|end| end <= self.len);
        in_window.then(|| self.base + addr)
    }
}

impl Bus for Mmio {
    fn read32(&self, addr: usize) -> u32 {
        let Some(ptr) = self.checked(addr) else {
            return u32::MAX;
        };
        // SAFETY: `new` guarantees the window is mapped; `checked` keeps us inside it.
        unsafe { core::ptr::read_volatile(ptr as *const u32) }
    }

    fn write32(&self, addr: usize, value: u32) {
        let Some(ptr) = self.checked(addr) else {
            return;
        };
        // SAFETY: see `read32`.
        unsafe { core::ptr::write_volatile(ptr as *mut u32, value) }
    }
}
