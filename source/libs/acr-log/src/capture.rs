// Copyright 2025 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-memory sink for host tests.
//!
//! Tests run in parallel and share the global sink, so lookups filter by
//! target rather than draining everything.

use alloc::string::String;
use alloc::vec::Vec;

use spin::Mutex;

use crate::{install_sink, set_max_level, Level, Sink};

struct CaptureSink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl Sink for CaptureSink {
    fn write_line(&self, level: Level, _target: &str, line: &[u8]) {
        let text = String::from_utf8_lossy(line).into_owned();
        self.lines.lock().push((level, text));
    }
}

static CAPTURE: CaptureSink = CaptureSink { lines: Mutex::new(Vec::new()) };

/// Installs the capture sink (idempotent) and enables every level.
pub fn install() {
    install_sink(&CAPTURE);
    set_max_level(Level::Trace);
}

/// Captured lines whose text contains `needle`.
pub fn lines_containing(needle: &str) -> Vec<(Level, String)> {
    CAPTURE.lines.lock().iter().filter(|(_, line)| line.contains(needle)).cloned().collect()
}
