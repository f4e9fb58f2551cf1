// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Simulated register file and timer.
//!
//! Registers read as zero until written. Behaviour that real hardware adds on
//! top of plain storage (sticky lock bits, reset status following a request,
//! writes ignored while locked) is modelled by per-address write hooks.

extern crate alloc;

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::ops::Range;
use core::sync::atomic::{AtomicU64, Ordering};

use spin::Mutex;

use crate::{Bus, Timer};

/// Hook invoked instead of a plain store when `addr` is written.
pub type WriteHook = Box<dyn FnMut(&mut RegisterFile, usize, u32) + Send>;

/// Backing storage of a [`SimBus`].
#[derive(Default)]
pub struct RegisterFile {
    regs: BTreeMap<usize, u32>,
}

impl RegisterFile {
    pub fn get(&self, addr: usize) -> u32 {
        self.regs.get(&addr).copied().unwrap_or(0)
    }

    pub fn set(&mut self, addr: usize, value: u32) {
        self.regs.insert(addr, value);
    }
}

#[derive(Default)]
struct Inner {
    regs: RegisterFile,
    hooks: BTreeMap<usize, WriteHook>,
    writes: Vec<(usize, u32)>,
    reads: u64,
}

/// In-memory [`Bus`] with write logging and hooks.
#[derive(Default)]
pub struct SimBus {
    inner: Mutex<Inner>,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a register without logging the access or running its hook.
    pub fn preset(&self, addr: usize, value: u32) {
        self.inner.lock().regs.set(addr, value);
    }

    /// Returns a register value without counting it as a bus read.
    pub fn peek(&self, addr: usize) -> u32 {
        self.inner.lock().regs.get(addr)
    }

    /// Installs `hook` for writes to `addr`, replacing any previous one.
    pub fn on_write(
        &self,
        addr: usize,
        hook: impl FnMut(&mut RegisterFile, usize, u32) + Send + 'static,
    ) {
        self.inner.lock().hooks.insert(addr, Box::new(hook));
    }

    /// Every write issued so far, in order.
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.inner.lock().writes.clone()
    }

    /// Number of writes that targeted `range`.
    pub fn writes_in(&self, range: Range<usize>) -> usize {
        self.inner.lock().writes.iter().filter(|(addr, _)| range.contains(addr)).count()
    }

    /// Number of bus reads issued so far.
    pub fn read_count(&self) -> u64 {
        self.inner.lock().reads
    }

    pub fn clear_log(&self) {
        let mut inner = self.inner.lock();
        inner.writes.clear();
        inner.reads = 0;
    }
}

impl Bus for SimBus {
    fn read32(&self, addr: usize) -> u32 {
        let mut inner = self.inner.lock();
        inner.reads += 1;
        inner.regs.get(addr)
    }

    fn write32(&self, addr: usize, value: u32) {
        let mut guard = self.inner.lock();
        let Inner { regs, hooks, writes, .. } = &mut *guard;
        writes.push((addr, value));
        match hooks.get_mut(&addr) {
            Some(hook) => hook(regs, addr, value),
            None => regs.set(addr, value),
        }
    }
}

/// Deterministic timer that advances by a fixed step on every query.
pub struct SimTimer {
    now: AtomicU64,
    step: u64,
}

impl SimTimer {
    /// Creates a timer starting at zero that advances `step_ns` per `now()`.
    pub const fn new(step_ns: u64) -> Self {
        Self { now: AtomicU64::new(0), step: step_ns }
    }

    /// Current time without advancing.
    pub fn current(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }

    pub fn advance(&self, ns: u64) {
        self.now.fetch_add(ns, Ordering::Relaxed);
    }
}

impl Timer for SimTimer {
    fn now(&self) -> u64 {
        self.now.fetch_add(self.step, Ordering::Relaxed)
    }
}
