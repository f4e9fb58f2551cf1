// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Diagnostics emitted by failed boots
//! TESTS: Revocation and lock failures are logged at error level with the stage

use acr::chip::Ga10x;
use acr::regs::FuseUcodeRev;
use acr::sim::{GpuModel, PlacingLoader};
use acr::{AcrConfig, BootOrchestrator, Chip, FalconId, FalconIdentity};
use acr_e2e::command;
use acr_log::Level;

#[test]
fn revoked_ucode_is_reported() {
    acr_log::capture::install();
    let gpu = GpuModel::<Ga10x>::new();
    gpu.bus().preset(Ga10x::FUSE_UCODE_REV, FuseUcodeRev::with_version(11).raw());
    let mut acr = BootOrchestrator::<Ga10x, _, _, _, _>::with_hardware(
        gpu.bus(),
        gpu.timer(),
        AcrConfig::for_chip::<Ga10x>(),
        PlacingLoader::new(),
    );

    acr.boot(&command(FalconIdentity::new(FalconId::Nvdec, 0), false, 2, 1)).unwrap_err();

    let revoked = acr_log::capture::lines_containing("fuse=11");
    assert!(revoked.iter().any(|(level, line)| *level == Level::Error && line.contains("ucode revoked")));
    let failed = acr_log::capture::lines_containing("stage=start");
    assert!(failed.iter().any(|(_, line)| line.contains("boot failed") && line.contains("falcon=sec2")));
}

#[test]
fn unconfirmed_lock_is_reported() {
    acr_log::capture::install();
    let gpu = GpuModel::<Ga10x>::new();
    gpu.stick_lock();
    let mut acr = BootOrchestrator::<Ga10x, _, _, _, _>::with_hardware(
        gpu.bus(),
        gpu.timer(),
        AcrConfig::for_chip::<Ga10x>(),
        PlacingLoader::new(),
    );

    acr.boot(&command(FalconIdentity::new(FalconId::Fecs, 3), true, 2, 1)).unwrap_err();

    let lines = acr_log::capture::lines_containing("lock not confirmed");
    assert!(lines.iter().any(|(level, _)| *level == Level::Error));
    assert!(!acr_log::capture::lines_containing("stage=revocation-checked").is_empty());
}
