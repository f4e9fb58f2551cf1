// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Builds the simulated GPU a profile describes and runs its boot command.

use core::ops::Range;
use core::time::Duration;

use acr::chip::{Ga10x, Gh100, Tu10x};
use acr::regs::{ResetStatus, PAGE_SIZE};
use acr::sim::GpuModel;
use acr::{resolve, AcrConfig, AcrStatus, BootCommand, BootFailure, BootOrchestrator, BootReport, Chip};

use crate::error::SimError;
use crate::loader::DigestLoader;
use crate::profile::{AcrOverrides, ChipKind, Profile, StuckReset};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Booted(BootReport),
    Failed(BootFailure),
}

impl Outcome {
    pub fn status(&self) -> AcrStatus {
        match self {
            Outcome::Booted(_) => AcrStatus::Ok,
            Outcome::Failed(failure) => (*failure).into(),
        }
    }
}

#[derive(Debug)]
pub struct Summary {
    pub chip: ChipKind,
    pub outcome: Outcome,
    /// Where the loader copied the image, even if verification then failed.
    pub placed: Option<Range<u64>>,
    /// Register writes the boot issued.
    pub writes: usize,
    /// Simulated time the boot took.
    pub elapsed_ns: u64,
}

/// Runs `profile` on `chip`, or on the profile's own generation.
pub fn run(profile: &Profile, chip: Option<ChipKind>) -> Result<Summary, SimError> {
    let chip = chip.unwrap_or(profile.chip);
    match chip {
        ChipKind::Tu10x => run_on::<Tu10x>(profile, chip),
        ChipKind::Ga10x => run_on::<Ga10x>(profile, chip),
        ChipKind::Gh100 => run_on::<Gh100>(profile, chip),
    }
}

fn run_on<C: Chip>(profile: &Profile, chip: ChipKind) -> Result<Summary, SimError> {
    let cmd = profile.command()?;
    let loader = DigestLoader::new(profile.image()?, profile.expected_digest()?);
    let gpu = GpuModel::<C>::new();
    prepare(&gpu, profile, &cmd, chip)?;
    gpu.bus().clear_log();
    let started = gpu.timer().current();

    let config = configure(AcrConfig::for_chip::<C>(), &profile.acr);
    let mut acr = BootOrchestrator::<C, _, _, _, _>::with_hardware(gpu.bus(), gpu.timer(), config, loader);
    let outcome = match acr.boot(&cmd) {
        Ok(report) => Outcome::Booted(report),
        Err(failure) => Outcome::Failed(failure),
    };
    Ok(Summary {
        chip,
        outcome,
        placed: acr.loader().placed(),
        writes: gpu.bus().writes().len(),
        elapsed_ns: gpu.timer().current().saturating_sub(started),
    })
}

fn prepare<C: Chip>(gpu: &GpuModel<C>, profile: &Profile, cmd: &BootCommand, chip: ChipKind) -> Result<(), SimError> {
    if let Some(chipset) = profile.gpu.chipset {
        gpu.set_chipset(chipset);
    }
    if let Some(version) = profile.gpu.fuse_version {
        gpu.set_fuse_version(version);
    }
    if let Some(mb) = profile.gpu.usable_fb_mb {
        gpu.set_usable_fb_mb(mb);
    }
    for locked in &profile.gpu.locked {
        if locked.slot >= C::WPR_SLOTS {
            return Err(SimError::NoSuchSlot { slot: locked.slot, chip: chip.name() });
        }
        let aligned = locked.start % PAGE_SIZE == 0 && locked.end % PAGE_SIZE == 0;
        if !aligned || locked.start >= locked.end {
            return Err(SimError::LockedRegion { slot: locked.slot, start: locked.start, end: locked.end });
        }
        gpu.lock_region(locked.slot, locked.start..locked.end, locked.region_id);
    }

    if profile.faults.stuck_lock {
        gpu.stick_lock();
    }
    if let Some(stuck) = profile.faults.stuck_reset {
        // An unresolvable target fails before reset is touched; nothing to stick.
        if let Ok(target) = resolve::<C>(cmd.target, cmd.smc_aware) {
            let status = match stuck {
                StuckReset::Asserted => ResetStatus::Asserted,
                StuckReset::Deasserted => ResetStatus::Deasserted,
            };
            gpu.stick_reset(&target, status);
        }
    }
    Ok(())
}

fn configure(mut config: AcrConfig, overrides: &AcrOverrides) -> AcrConfig {
    if let Some(version) = overrides.ucode_version {
        config = config.with_ucode_version(version);
    }
    let start = overrides.carveout_start.unwrap_or(config.carveout.start);
    let end = overrides.carveout_end.unwrap_or(config.carveout.end);
    config = config.with_carveout(start..end);
    if let Some(us) = overrides.lock_timeout_us {
        config = config.with_lock_timeout(Duration::from_micros(us));
    }
    if let Some(us) = overrides.reset_timeout_us {
        config = config.with_reset_timeout(Duration::from_micros(us));
    }
    config
}
