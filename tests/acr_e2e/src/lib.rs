// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Shared fixtures for the ACR host integration tests
//! INTENT: Boot commands and a call-recording sub-WPR programmer
//! DEPS: acr (sim feature)
//! TESTS: tests/*.rs

use acr::{AcrError, BootCommand, DmaProperties, FalconConfig, FalconIdentity, PayloadDescriptor, SubWpr, SubWprProgram};

/// Command booting `target` from a `pages`-page payload whose last
/// `image_pages` pages are the image.
pub fn command(target: FalconIdentity, smc_aware: bool, pages: u64, image_pages: u64) -> BootCommand {
    BootCommand {
        target,
        smc_aware,
        payload: PayloadDescriptor {
            source: 0x40_0000,
            size: pages << 12,
            image_offset: (pages - image_pages) << 12,
            image_size: image_pages << 12,
        },
        dma: DmaProperties { ctx_dma: 0, read_mask: 0xf, write_mask: 0x0 },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Program { owner: FalconIdentity, id: u8 },
    Disable { owner: FalconIdentity, id: u8 },
}

/// Programmer that only records what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingProgrammer {
    calls: Vec<Call>,
}

impl RecordingProgrammer {
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn programs(&self) -> usize {
        self.calls.iter().filter(|call| matches!(call, Call::Program { .. })).count()
    }
}

impl SubWprProgram for RecordingProgrammer {
    fn program(&mut self, cfg: &FalconConfig, sub: &SubWpr) -> Result<(), AcrError> {
        self.calls.push(Call::Program { owner: cfg.identity, id: sub.id });
        Ok(())
    }

    fn disable(&mut self, cfg: &FalconConfig, id: u8) -> Result<(), AcrError> {
        self.calls.push(Call::Disable { owner: cfg.identity, id });
        Ok(())
    }
}
