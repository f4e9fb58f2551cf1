// Copyright 2025 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Deterministic, allocation-free logging facade for the ACR firmware
//! OWNERS: @acr-team
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests (level/topic gating, line formatting, truncation)
//!
//! Lines are assembled into a fixed-size buffer through a [`LineBuilder`] and
//! handed to a single installed [`Sink`]. The firmware core never owns an
//! output device: the print plumbing installs a sink at bring-up, and until it
//! does every line is dropped.

#![no_std]

#[cfg(feature = "capture")]
extern crate alloc;

#[cfg(feature = "capture")]
pub mod capture;

use core::fmt;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use bitflags::bitflags;
use spin::Once;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }
}

bitflags! {
    /// Subsystem topics; a line is emitted only if all its topic bits are enabled.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Topic: u32 {
        const GENERAL = 1 << 0;
        const WPR = 1 << 1;
        const SUBWPR = 1 << 2;
        const RESET = 1 << 3;
        const PLM = 1 << 4;
        const FUSE = 1 << 5;
        const BOOT = 1 << 6;
    }
}

/// Destination for finished log lines.
pub trait Sink: Sync {
    /// Receives one complete line, without trailing newline.
    fn write_line(&self, level: Level, target: &str, line: &[u8]);
}

/// Longest line handed to a sink; longer lines are truncated.
pub const MAX_LINE: usize = 192;

static MAX_LEVEL: AtomicU8 = AtomicU8::new(Level::Debug as u8);
static TOPIC_MASK: AtomicU32 = AtomicU32::new(u32::MAX);
static SINK: Once<&'static dyn Sink> = Once::new();

pub fn set_max_level(level: Level) {
    MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn set_topic_mask(mask: Topic) {
    TOPIC_MASK.store(mask.bits(), Ordering::Relaxed);
}

/// Installs the process-wide sink. Returns `false` if one was already installed.
pub fn install_sink(sink: &'static dyn Sink) -> bool {
    let mut installed = false;
    SINK.call_once(|| {
        installed = true;
        sink
    });
    installed
}

fn level_enabled(level: Level) -> bool {
    level as u8 <= MAX_LEVEL.load(Ordering::Relaxed)
}

fn topic_enabled(topic: Topic) -> bool {
    let mask = TOPIC_MASK.load(Ordering::Relaxed);
    let bits = topic.bits();
    if bits == 0 {
        return true;
    }
    (mask & bits) == bits
}

pub fn error(target: &str, topic: Topic, f: impl FnOnce(&mut LineBuilder)) {
    log(LineMeta { level: Level::Error, target, topic }, f);
}

pub fn warn(target: &str, topic: Topic, f: impl FnOnce(&mut LineBuilder)) {
    log(LineMeta { level: Level::Warn, target, topic }, f);
}

pub fn info(target: &str, topic: Topic, f: impl FnOnce(&mut LineBuilder)) {
    log(LineMeta { level: Level::Info, target, topic }, f);
}

pub fn debug(target: &str, topic: Topic, f: impl FnOnce(&mut LineBuilder)) {
    log(LineMeta { level: Level::Debug, target, topic }, f);
}

pub fn trace(target: &str, topic: Topic, f: impl FnOnce(&mut LineBuilder)) {
    log(LineMeta { level: Level::Trace, target, topic }, f);
}

pub struct LineMeta<'a> {
    pub level: Level,
    pub target: &'a str,
    pub topic: Topic,
}

pub fn log(meta: LineMeta<'_>, f: impl FnOnce(&mut LineBuilder)) {
    if !level_enabled(meta.level) || !topic_enabled(meta.topic) {
        return;
    }
    let Some(sink) = SINK.get() else {
        return;
    };

    let mut builder = LineBuilder::new();
    builder.push(b'[');
    builder.push_bytes(meta.level.label().as_bytes());
    builder.push(b' ');
    builder.push_bytes(meta.target.as_bytes());
    builder.push_bytes(b"] ");
    f(&mut builder);

    sink.write_line(meta.level, meta.target, builder.as_bytes());
}

/// Fixed-capacity line under construction.
pub struct LineBuilder {
    buf: [u8; MAX_LINE],
    len: usize,
    truncated: bool,
}

impl LineBuilder {
    fn new() -> Self {
        Self { buf: [0; MAX_LINE], len: 0, truncated: false }
    }

    fn push(&mut self, byte: u8) {
        if self.len < MAX_LINE {
            self.buf[self.len] = byte;
            self.len += 1;
        } else {
            self.truncated = true;
        }
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push(b);
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn text(&mut self, text: &str) {
        self.push_bytes(text.as_bytes());
    }

    pub fn kv_literal(&mut self, key: &str, value: &str) {
        self.text(key);
        self.push(b'=');
        self.text(value);
    }

    pub fn kv_hex(&mut self, key: &str, value: u64) {
        self.text(key);
        self.push(b'=');
        self.hex(value);
    }

    pub fn kv_dec(&mut self, key: &str, value: u64) {
        self.text(key);
        self.push(b'=');
        self.dec(value);
    }

    pub fn hex(&mut self, value: u64) {
        self.push(b'0');
        self.push(b'x');
        emit_hex(value, |b| self.push(b));
    }

    pub fn dec(&mut self, value: u64) {
        let mut buf = [0u8; 20];
        let mut n = value;
        let mut idx = buf.len();
        if n == 0 {
            idx -= 1;
            buf[idx] = b'0';
        } else {
            while n != 0 {
                idx -= 1;
                buf[idx] = b'0' + (n % 10) as u8;
                n /= 10;
            }
        }
        self.push_bytes(&buf[idx..]);
    }

    pub fn fmt(&mut self, args: fmt::Arguments<'_>) {
        fmt::write(self, args).ok();
    }
}

impl fmt::Write for LineBuilder {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_bytes(s.as_bytes());
        Ok(())
    }
}

// Leading zeros are dropped; zero prints as a single digit.
fn emit_hex(value: u64, mut emit: impl FnMut(u8)) {
    let digits = if value == 0 { 1 } else { (64 - value.leading_zeros() as usize + 3) / 4 };
    for shift in (0..digits).rev() {
        let nibble = ((value >> (shift * 4)) & 0xf) as u8;
        let ch = if nibble < 10 { b'0' + nibble } else { b'a' + (nibble - 10) };
        emit(ch);
    }
}
