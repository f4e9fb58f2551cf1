// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Boot orchestrator: revocation, region lock, payload, grant, hand-off
//! OWNERS: @acr-team
//! STATUS: Functional
//! PUBLIC API: BootOrchestrator::boot, BootCommand, BootReport, BootFailure, BootStage, PayloadLoader
//! DEPENDS_ON: revocation, wpr, falcon, subwpr, plm, reset
//! INVARIANTS:
//!   - Nothing is written to the GPU before the revocation gate passes
//!   - No grant is programmed against a region whose lock was not confirmed
//!   - The target's sub-WPR is programmed while it is held in reset
//!   - Every exit after the lock revokes the orchestrator's own grant, and on
//!     failure the target's grant too
//!
//! ```text
//! Start -> RevocationChecked -> RegionLocked -> PayloadPlaced
//!       -> SubWprProgrammed -> HandedOff -> Cleanup
//! ```
//!
//! A failure reports the last stage that completed and the falcon that was
//! being driven when it happened.

mod context;
#[cfg(test)]
mod tests_prop;

use core::marker::PhantomData;
use core::ops::Range;

use acr_hal::{Bus, Timer};
use acr_log::Topic;

use crate::chip::Chip;
use crate::config::AcrConfig;
use crate::error::{AcrError, AcrStatus};
use crate::falcon::{resolve, FalconConfig, FalconIdentity};
use crate::regs::{PrivLevelMask, WprLock, PAGE_SIZE};
use crate::reset::ResetSequencer;
use crate::revocation::RevocationGate;
use crate::subwpr::{SubWprProgram, SubWprUnit, MASK_ALL};
use crate::wpr::{WprAllocator, WprSlotState};

use context::BootContext;

const TARGET: &str = "acr::boot";

/// Number of DMA context slots a command may name.
pub const MAX_CTX_DMA: u8 = 8;

/// Where the payload comes from and which part of it the target runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadDescriptor {
    /// Address of the staged payload.
    pub source: u64,
    /// Bytes to copy into the region; the region is sized from this.
    pub size: u64,
    /// Offset of the target's image inside the payload.
    pub image_offset: u64,
    pub image_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaProperties {
    pub ctx_dma: u8,
    /// Privilege levels the target may read its image at.
    pub read_mask: u8,
    /// Privilege levels the target may write its image at.
    pub write_mask: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootCommand {
    pub target: FalconIdentity,
    pub smc_aware: bool,
    pub payload: PayloadDescriptor,
    pub dma: DmaProperties,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootStage {
    Start,
    RevocationChecked,
    RegionLocked,
    PayloadPlaced,
    SubWprProgrammed,
    HandedOff,
    Cleanup,
}

impl BootStage {
    pub const fn name(self) -> &'static str {
        match self {
            BootStage::Start => "start",
            BootStage::RevocationChecked => "revocation-checked",
            BootStage::RegionLocked => "region-locked",
            BootStage::PayloadPlaced => "payload-placed",
            BootStage::SubWprProgrammed => "subwpr-programmed",
            BootStage::HandedOff => "handed-off",
            BootStage::Cleanup => "cleanup",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootReport {
    pub region: WprSlotState,
    pub target_config: FalconConfig,
    /// Bytes granted to the target.
    pub image: Range<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootFailure {
    pub error: AcrError,
    pub failing_engine: Option<FalconIdentity>,
    pub stage: BootStage,
}

impl From<BootFailure> for AcrStatus {
    fn from(failure: BootFailure) -> Self {
        failure.error.into()
    }
}

/// Copies the payload into a locked region and verifies its signature.
pub trait PayloadLoader {
    /// Returns the page-aligned byte range inside `region` that `target` must be granted.
    fn place_and_verify(
        &mut self,
        region: &WprSlotState,
        target: &FalconIdentity,
        payload: &PayloadDescriptor,
    ) -> Result<Range<u64>, AcrError>;
}

impl<L: PayloadLoader + ?Sized> PayloadLoader for &mut L {
    fn place_and_verify(
        &mut self,
        region: &WprSlotState,
        target: &FalconIdentity,
        payload: &PayloadDescriptor,
    ) -> Result<Range<u64>, AcrError> {
        (**self).place_and_verify(region, target, payload)
    }
}

pub struct BootOrchestrator<C, B, T, P, L> {
    bus: B,
    timer: T,
    config: AcrConfig,
    programmer: P,
    loader: L,
    _chip: PhantomData<C>,
}

impl<C: Chip, B: Bus + Copy, T: Timer, L: PayloadLoader> BootOrchestrator<C, B, T, SubWprUnit<C, B>, L> {
    /// Orchestrator programming sub-WPRs directly through `bus`.
    pub fn with_hardware(bus: B, timer: T, config: AcrConfig, loader: L) -> Self {
        Self::new(bus, timer, config, SubWprUnit::new(bus), loader)
    }
}

impl<C, B, T, P, L> BootOrchestrator<C, B, T, P, L>
where
    C: Chip,
    B: Bus,
    T: Timer,
    P: SubWprProgram,
    L: PayloadLoader,
{
    pub fn new(bus: B, timer: T, config: AcrConfig, programmer: P, loader: L) -> Self {
        Self { bus, timer, config, programmer, loader, _chip: PhantomData }
    }

    pub fn config(&self) -> &AcrConfig {
        &self.config
    }

    pub fn programmer(&self) -> &P {
        &self.programmer
    }

    pub fn programmer_mut(&mut self) -> &mut P {
        &mut self.programmer
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Runs one boot command to completion.
    pub fn boot(&mut self, cmd: &BootCommand) -> Result<BootReport, BootFailure> {
        let Self { bus, timer, config, programmer, loader, .. } = self;
        let orchestrator = config.orchestrator;
        let early = |error: AcrError, stage: BootStage| {
            log_failure(error, orchestrator, stage);
            BootFailure { error, failing_engine: Some(orchestrator), stage }
        };

        acr_log::info(TARGET, Topic::BOOT, |line| {
            line.text("boot ");
            line.kv_literal("target", cmd.target.id.name());
            line.text(" ");
            line.kv_dec("inst", u64::from(cmd.target.instance));
        });

        RevocationGate::<C>::new()
            .check_hardware(&*bus, config.ucode_version)
            .map_err(|err| early(err, BootStage::Start))?;

        validate(cmd, config).map_err(|err| early(err, BootStage::RevocationChecked))?;
        let own = resolve::<C>(orchestrator, false).map_err(|err| early(err, BootStage::RevocationChecked))?;

        let allocator = WprAllocator::<C, _, _>::new(&*bus, &*timer, config.carveout.clone(), config.lock_timeout);
        let mut region = allocator
            .allocate(cmd.payload.size)
            .map_err(|err| early(err, BootStage::RevocationChecked))?;
        allocator.lock(&mut region).map_err(|err| early(err, BootStage::RevocationChecked))?;
        let slot = allocator.slot(region.index());

        let slots = (config.self_subwpr, config.target_subwpr);
        let mut ctx = BootContext::new(&*bus, &mut *programmer, own, slots, cmd, region.range());
        let outcome = hand_off::<C, _, _, _, _>(&mut ctx, &*bus, &*timer, config, &mut *loader, cmd, &slot);
        let (stage, active) = (ctx.stage(), ctx.active());
        let cleanup = ctx.finish();

        match (outcome, cleanup) {
            (Ok((target_config, image)), Ok(())) => {
                acr_log::info(TARGET, Topic::BOOT, |line| {
                    line.text("handed off ");
                    line.kv_literal("target", cmd.target.id.name());
                    line.text(" ");
                    line.kv_hex("lo", image.start);
                    line.text(" ");
                    line.kv_hex("hi", image.end);
                });
                Ok(BootReport { region: slot, target_config, image })
            }
            (Ok(_), Err(error)) => {
                log_failure(error, orchestrator, BootStage::Cleanup);
                Err(BootFailure { error, failing_engine: Some(orchestrator), stage: BootStage::Cleanup })
            }
            (Err(error), _) => {
                log_failure(error, active, stage);
                Err(BootFailure { error, failing_engine: Some(active), stage })
            }
        }
    }
}

fn log_failure(error: AcrError, falcon: FalconIdentity, stage: BootStage) {
    acr_log::error(TARGET, Topic::BOOT, |line| {
        line.text("boot failed ");
        line.kv_literal("stage", stage.name());
        line.text(" ");
        line.kv_literal("falcon", falcon.id.name());
        line.text(" ");
        line.kv_dec("inst", u64::from(falcon.instance));
        line.text(" ");
        line.fmt(format_args!("err={error}"));
    });
}

fn validate(cmd: &BootCommand, config: &AcrConfig) -> Result<(), AcrError> {
    let payload = &cmd.payload;
    let image_end = payload.image_offset.checked_add(payload.image_size).ok_or(AcrError::InvalidArgument)?;
    if payload.size == 0 || payload.image_size == 0 || image_end > payload.size {
        return Err(AcrError::InvalidArgument);
    }
    if cmd.dma.read_mask > MASK_ALL || cmd.dma.write_mask > MASK_ALL || cmd.dma.ctx_dma >= MAX_CTX_DMA {
        return Err(AcrError::InvalidArgument);
    }
    if cmd.target == config.orchestrator || config.privilege_level >= PrivLevelMask::LEVELS {
        return Err(AcrError::InvalidArgument);
    }
    Ok(())
}

fn ensure_locked<C: Chip>(bus: &impl Bus, region: &WprSlotState) -> Result<(), AcrError> {
    if WprLock::read(bus, C::WPR_LOCK).locked(region.index) {
        Ok(())
    } else {
        Err(AcrError::InvalidOperation)
    }
}

fn check_image(region: &WprSlotState, image: &Range<u64>) -> Result<(), AcrError> {
    let aligned = image.start % PAGE_SIZE == 0 && image.end % PAGE_SIZE == 0;
    let inside = region.range.start <= image.start && image.end <= region.range.end;
    if image.start >= image.end || !aligned || !inside {
        return Err(AcrError::InvalidArgument);
    }
    Ok(())
}

/// Steps after the region lock; every `?` lands in the context's cleanup.
fn hand_off<C, B, T, P, L>(
    ctx: &mut BootContext<'_, &B, P>,
    bus: &B,
    timer: &T,
    config: &AcrConfig,
    loader: &mut L,
    cmd: &BootCommand,
    region: &WprSlotState,
) -> Result<(FalconConfig, Range<u64>), AcrError>
where
    C: Chip,
    B: Bus,
    T: Timer,
    P: SubWprProgram,
    L: PayloadLoader,
{
    let own_mask = 1u8 << config.privilege_level;
    ensure_locked::<C>(bus, region)?;
    ctx.grant_own(region.range.clone(), own_mask)?;

    ctx.set_active(cmd.target);
    let target = resolve::<C>(cmd.target, cmd.smc_aware)?;
    ctx.set_target(target);

    ctx.set_active(config.orchestrator);
    let image = loader.place_and_verify(region, &cmd.target, &cmd.payload)?;
    check_image(region, &image)?;
    ctx.record_image(image.clone());
    ctx.advance(BootStage::PayloadPlaced);

    ctx.set_active(cmd.target);
    ctx.raise_plm(target.reset_plm, config.privilege_level)?;
    let reset = ResetSequencer::new(bus, timer);
    reset.assert_reset(&target, config.reset_timeout)?;
    ensure_locked::<C>(bus, region)?;
    ctx.grant_target(image.clone(), cmd.dma.read_mask, cmd.dma.write_mask)?;
    ctx.advance(BootStage::SubWprProgrammed);

    reset.deassert_reset(&target, config.reset_timeout)?;
    ctx.advance(BootStage::HandedOff);
    ctx.succeed();
    Ok((target, image))
}
