// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Scoped state of one boot command and the cleanup that undoes it.
//!
//! A [`BootContext`] exists from the moment the region is locked until the
//! command returns. Every grant and PLM change goes through it so that
//! [`BootContext::finish`], or `Drop` on an early exit or unwind, can revoke
//! exactly what was set up.

use core::ops::Range;

use acr_hal::Bus;
use acr_log::Topic;
use zeroize::Zeroize;

use super::{BootCommand, BootStage};
use crate::error::AcrError;
use crate::falcon::{FalconConfig, FalconIdentity};
use crate::plm::PlmManager;
use crate::regs::PrivLevelMask;
use crate::subwpr::{SubWpr, SubWprProgram};

const TARGET: &str = "acr::boot";

/// Decoded command words held for the duration of one boot.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Scratch {
    pub source: u64,
    pub size: u64,
    pub image_offset: u64,
    pub image_size: u64,
    pub ctx_dma: u8,
    pub read_mask: u8,
    pub write_mask: u8,
    pub region: Range<u64>,
    pub image: Range<u64>,
}

impl Zeroize for Scratch {
    fn zeroize(&mut self) {
        self.source.zeroize();
        self.size.zeroize();
        self.image_offset.zeroize();
        self.image_size.zeroize();
        self.ctx_dma.zeroize();
        self.read_mask.zeroize();
        self.write_mask.zeroize();
        self.region.start.zeroize();
        self.region.end.zeroize();
        self.image.start.zeroize();
        self.image.end.zeroize();
    }
}

impl Scratch {
    fn decode(cmd: &BootCommand, region: Range<u64>) -> Self {
        Self {
            source: cmd.payload.source,
            size: cmd.payload.size,
            image_offset: cmd.payload.image_offset,
            image_size: cmd.payload.image_size,
            ctx_dma: cmd.dma.ctx_dma,
            read_mask: cmd.dma.read_mask,
            write_mask: cmd.dma.write_mask,
            region,
            image: 0..0,
        }
    }
}

pub(crate) struct BootContext<'a, B: Bus, P: SubWprProgram> {
    bus: B,
    programmer: &'a mut P,
    own: FalconConfig,
    own_slot: u8,
    target: Option<FalconConfig>,
    target_slot: u8,
    plm: Option<(usize, PrivLevelMask)>,
    stage: BootStage,
    active: FalconIdentity,
    scratch: Scratch,
    succeeded: bool,
    finished: bool,
}

fn keep_first(acc: &mut Result<(), AcrError>, step: Result<(), AcrError>) {
    if acc.is_ok() {
        *acc = step;
    }
}

impl<'a, B: Bus, P: SubWprProgram> BootContext<'a, B, P> {
    pub fn new(
        bus: B,
        programmer: &'a mut P,
        own: FalconConfig,
        slots: (u8, u8),
        cmd: &BootCommand,
        region: Range<u64>,
    ) -> Self {
        Self {
            bus,
            programmer,
            own,
            own_slot: slots.0,
            target: None,
            target_slot: slots.1,
            plm: None,
            stage: BootStage::RegionLocked,
            active: own.identity,
            scratch: Scratch::decode(cmd, region),
            succeeded: false,
            finished: false,
        }
    }

    pub fn stage(&self) -> BootStage {
        self.stage
    }

    pub fn advance(&mut self, stage: BootStage) {
        self.stage = stage;
    }

    pub fn active(&self) -> FalconIdentity {
        self.active
    }

    pub fn set_active(&mut self, falcon: FalconIdentity) {
        self.active = falcon;
    }

    pub fn set_target(&mut self, target: FalconConfig) {
        self.target = Some(target);
    }

    pub fn record_image(&mut self, image: Range<u64>) {
        self.scratch.image = image;
    }

    /// Grants the orchestrator `range` at privilege `mask` only.
    pub fn grant_own(&mut self, range: Range<u64>, mask: u8) -> Result<(), AcrError> {
        let sub = SubWpr { id: self.own_slot, owner: self.own.identity, range, read_mask: mask, write_mask: mask };
        self.programmer.program(&self.own, &sub)
    }

    pub fn grant_target(&mut self, range: Range<u64>, read_mask: u8, write_mask: u8) -> Result<(), AcrError> {
        let target = self.target.ok_or(AcrError::InvalidOperation)?;
        let sub = SubWpr { id: self.target_slot, owner: target.identity, range, read_mask, write_mask };
        self.programmer.program(&target, &sub)
    }

    pub fn raise_plm(&mut self, register: usize, level: u8) -> Result<(), AcrError> {
        if register == 0 {
            return Err(AcrError::InvalidArgument);
        }
        let plm = PlmManager::new(&self.bus);
        // Registered before the write so a failed commit is still undone.
        self.plm = Some((register, plm.read(register)));
        plm.raise(register, level)?;
        Ok(())
    }

    /// Keeps the target's grant through cleanup.
    pub fn succeed(&mut self) {
        self.succeeded = true;
    }

    /// Runs cleanup and reports its first error.
    pub fn finish(mut self) -> Result<(), AcrError> {
        self.cleanup()
    }

    fn cleanup(&mut self) -> Result<(), AcrError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let mut result = Ok(());
        if !self.succeeded {
            if let Some(target) = self.target {
                keep_first(&mut result, self.programmer.disable(&target, self.target_slot));
            }
        }
        keep_first(&mut result, self.programmer.disable(&self.own, self.own_slot));
        if let Some((register, saved)) = self.plm.take() {
            keep_first(&mut result, PlmManager::new(&self.bus).restore(register, saved));
        }
        self.scratch.zeroize();

        let stage = self.stage;
        match result {
            Ok(()) => acr_log::debug(TARGET, Topic::BOOT, |line| {
                line.text("cleanup done ");
                line.kv_literal("stage", stage.name());
            }),
            Err(err) => acr_log::error(TARGET, Topic::BOOT, |line| {
                line.text("cleanup failed ");
                line.kv_literal("stage", stage.name());
                line.text(" ");
                line.fmt(format_args!("err={err}"));
            }),
        }
        result
    }
}

impl<B: Bus, P: SubWprProgram> Drop for BootContext<'_, B, P> {
    fn drop(&mut self) {
        // Errors are logged by cleanup(); nothing else can observe them here.
        let _ = self.cleanup();
    }
}
