// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Simulated GPU for host tests and the acr-sim tool
//! OWNERS: @acr-team
//! PUBLIC API: GpuModel, CountingProgrammer, PlacingLoader
//! DEPENDS_ON: acr_hal::sim (register file, timer)
//!
//! [`GpuModel`] wires a [`SimBus`] up the way generation `C` behaves after a
//! GPU reset: identity and fuses preset, every falcon out of reset with its
//! reset status following requests, sub-WPR slots at their reset values, a
//! sticky region-table lock and slots that ignore writes once locked.

use core::marker::PhantomData;
use core::ops::Range;

use acr_hal::sim::{SimBus, SimTimer};

use crate::boot::{PayloadDescriptor, PayloadLoader};
use crate::chip::Chip;
use crate::config::UCODE_VERSION;
use crate::error::AcrError;
use crate::falcon::{resolve, FalconConfig, FalconId, FalconIdentity};
use crate::regs::{
    Boot42, EngineReset, FuseUcodeRev, PageAddr, ResetStatus, WprCfg, WprLock, NV_PMC_BOOT_42, PAGE_SHIFT,
};
use crate::subwpr::{SubWpr, SubWprProgram};
use crate::wpr::WprSlotState;

pub struct GpuModel<C> {
    bus: SimBus,
    timer: SimTimer,
    _chip: PhantomData<C>,
}

impl<C: Chip> Default for GpuModel<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Every register block generation `C` exposes, legacy and per-instance.
pub fn falcon_configs<C: Chip>() -> impl Iterator<Item = FalconConfig> {
    FalconId::ALL.into_iter().flat_map(|id| {
        let legacy = resolve::<C>(FalconIdentity::new(id, 0), false);
        let instances = if id.is_gpc_class() { C::MAX_SMC_ENGINES } else { 0 };
        let smc = (0..instances).map(move |inst| resolve::<C>(FalconIdentity::new(id, inst), true));
        core::iter::once(legacy).chain(smc).filter_map(Result::ok)
    })
}

impl<C: Chip> GpuModel<C> {
    /// Nanoseconds the simulated clock advances per read.
    pub const TIMER_STEP_NS: u64 = 1_000;
    /// Reset-time privilege level mask: every level, every source.
    pub const DEFAULT_PLM: u32 = 0x00ff_f0ff;
    pub const DEFAULT_FB_MB: u32 = 8 * 1024;

    pub fn new() -> Self {
        let gpu = Self { bus: SimBus::new(), timer: SimTimer::new(Self::TIMER_STEP_NS), _chip: PhantomData };
        let chipset = (0..0x200).find(|&chipset| C::supports_chipset(chipset)).unwrap_or(0);
        gpu.set_chipset(chipset);
        gpu.set_fuse_version(UCODE_VERSION);
        gpu.set_usable_fb_mb(Self::DEFAULT_FB_MB);
        for cfg in falcon_configs::<C>() {
            gpu.reset_falcon(&cfg);
        }
        gpu.wire_region_table();
        gpu
    }

    pub fn bus(&self) -> &SimBus {
        &self.bus
    }

    pub fn timer(&self) -> &SimTimer {
        &self.timer
    }

    pub fn set_chipset(&self, chipset: u32) {
        self.bus.preset(NV_PMC_BOOT_42, Boot42::with_chipset(chipset).raw());
    }

    pub fn set_fuse_version(&self, version: u32) {
        self.bus.preset(C::FUSE_UCODE_REV, FuseUcodeRev::with_version(version).raw());
    }

    pub fn set_usable_fb_mb(&self, mb: u32) {
        self.bus.preset(C::USABLE_FB_SIZE, mb);
    }

    fn reset_falcon(&self, cfg: &FalconConfig) {
        let lo = if C::SUBWPR_ZERO_BOUNDS_UNCONFIGURED { 0 } else { PageAddr::MAX_PAGE };
        let lo = PageAddr::from_page(lo);
        let perm = if C::SUBWPR_PERMS_RESET_DENY { 0 } else { 0xff };
        for id in 0..cfg.subwpr_slots {
            self.bus.preset(cfg.subwpr_addr_lo(id), lo.raw());
            self.bus.preset(cfg.subwpr_addr_hi(id), 0);
            self.bus.preset(cfg.subwpr_perm(id), perm);
        }
        self.bus.preset(cfg.reset_plm, Self::DEFAULT_PLM);
        let out_of_reset = EngineReset::default().with_status(ResetStatus::Deasserted);
        self.bus.preset(cfg.reset_control, out_of_reset.raw());
        self.bus.on_write(cfg.reset_control, |regs, addr, value| {
            let request = EngineReset::from_raw(value);
            let status = if request.reset() { ResetStatus::Asserted } else { ResetStatus::Deasserted };
            regs.set(addr, request.with_status(status).raw());
        });
    }

    fn wire_region_table(&self) {
        let lock = C::WPR_LOCK;
        self.bus.on_write(lock, |regs, addr, value| {
            let held = regs.get(addr);
            regs.set(addr, held | value);
        });
        for slot in 0..C::WPR_SLOTS {
            for addr in [C::wpr_addr_lo(slot), C::wpr_addr_hi(slot), C::wpr_cfg(slot)] {
                self.bus.on_write(addr, move |regs, addr, value| {
                    if !WprLock::from_raw(regs.get(lock)).locked(slot) {
                        regs.set(addr, value);
                    }
                });
            }
        }
    }

    /// Records a region locked by an earlier boot agent.
    pub fn lock_region(&self, slot: u8, range: Range<u64>, region_id: u8) {
        let lo = PageAddr::from_page((range.start >> PAGE_SHIFT) as u32);
        let hi = PageAddr::from_page(((range.end >> PAGE_SHIFT) - 1) as u32);
        self.bus.preset(C::wpr_addr_lo(slot), lo.raw());
        self.bus.preset(C::wpr_addr_hi(slot), hi.raw());
        self.bus.preset(C::wpr_cfg(slot), WprCfg::default().set_region_id(region_id).raw());
        let held = self.bus.peek(C::WPR_LOCK);
        self.bus.preset(C::WPR_LOCK, held | WprLock::request(slot).raw());
    }

    /// Lock requests are dropped; the lock bit never sets.
    pub fn stick_lock(&self) {
        self.bus.on_write(C::WPR_LOCK, |_, _, _| {});
    }

    /// `cfg`'s reset status stays at `status` whatever is requested.
    pub fn stick_reset(&self, cfg: &FalconConfig, status: ResetStatus) {
        let held = EngineReset::from_raw(self.bus.peek(cfg.reset_control)).with_status(status);
        self.bus.preset(cfg.reset_control, held.raw());
        self.bus.on_write(cfg.reset_control, move |regs, addr, value| {
            regs.set(addr, EngineReset::from_raw(value).with_status(status).raw());
        });
    }
}

/// Forwards to `P` and counts calls.
pub struct CountingProgrammer<P> {
    inner: P,
    programs: usize,
    disables: usize,
}

impl<P> CountingProgrammer<P> {
    pub const fn new(inner: P) -> Self {
        Self { inner, programs: 0, disables: 0 }
    }

    pub fn programs(&self) -> usize {
        self.programs
    }

    pub fn disables(&self) -> usize {
        self.disables
    }
}

impl<P: SubWprProgram> SubWprProgram for CountingProgrammer<P> {
    fn program(&mut self, cfg: &FalconConfig, sub: &SubWpr) -> Result<(), AcrError> {
        self.programs += 1;
        self.inner.program(cfg, sub)
    }

    fn disable(&mut self, cfg: &FalconConfig, id: u8) -> Result<(), AcrError> {
        self.disables += 1;
        self.inner.disable(cfg, id)
    }
}

/// Loader that trusts the payload and places the image at its offset in the region.
pub struct PlacingLoader {
    fail: Option<AcrError>,
    calls: usize,
}

impl Default for PlacingLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PlacingLoader {
    pub const fn new() -> Self {
        Self { fail: None, calls: 0 }
    }

    /// Loader whose verification always fails with `err`.
    pub const fn failing(err: AcrError) -> Self {
        Self { fail: Some(err), calls: 0 }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl PayloadLoader for PlacingLoader {
    fn place_and_verify(
        &mut self,
        region: &WprSlotState,
        _target: &FalconIdentity,
        payload: &PayloadDescriptor,
    ) -> Result<Range<u64>, AcrError> {
        self.calls += 1;
        if let Some(err) = self.fail {
            return Err(err);
        }
        let start = region.range.start.checked_add(payload.image_offset).ok_or(AcrError::InvalidArgument)?;
        let end = start.checked_add(payload.image_size).ok_or(AcrError::InvalidArgument)?;
        Ok(start..end)
    }
}
