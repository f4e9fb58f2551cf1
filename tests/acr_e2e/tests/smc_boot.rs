// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: End-to-end boots of SMC and legacy falcons on every generation
//! TESTS: GPCCS:2 on GA10x, NVDEC on GH100 via GSP, Turing instance limit

use acr::chip::{Ga10x, Gh100, Tu10x};
use acr::regs::{EngineReset, ResetStatus};
use acr::sim::{GpuModel, PlacingLoader};
use acr::{
    resolve, AcrConfig, AcrError, BootOrchestrator, BootStage, Chip, FalconId, FalconIdentity, SubWpr,
    SubWprState, SubWprUnit,
};
use acr_e2e::command;

#[test]
fn gpccs_instance_two_runs_with_exact_grant() {
    let gpu = GpuModel::<Ga10x>::new();
    let config = AcrConfig::for_chip::<Ga10x>();
    let target = FalconIdentity::new(FalconId::Gpccs, 2);
    let mut acr = BootOrchestrator::<Ga10x, _, _, _, _>::with_hardware(
        gpu.bus(),
        gpu.timer(),
        config.clone(),
        PlacingLoader::new(),
    );

    let report = acr.boot(&command(target, true, 16, 1)).expect("boot");

    assert_eq!(report.region.range, 0x8000_0000..0x8001_0000);
    assert!(report.region.locked);
    assert_eq!(report.image, 0x8000_f000..0x8001_0000);
    // the SMC window, not the legacy block
    let legacy = resolve::<Ga10x>(FalconIdentity::new(FalconId::Gpccs, 0), false).expect("legacy gpccs");
    assert_ne!(report.target_config.base, legacy.base);

    let status = EngineReset::from_raw(gpu.bus().peek(report.target_config.reset_control)).status();
    assert_eq!(status, ResetStatus::Deasserted);

    let unit = SubWprUnit::<Ga10x, _>::new(gpu.bus());
    let granted = SubWpr { id: 0, owner: target, range: report.image.clone(), read_mask: 0xf, write_mask: 0 };
    assert_eq!(unit.read(&report.target_config, config.target_subwpr), Ok(SubWprState::Active(granted)));
    let own = resolve::<Ga10x>(config.orchestrator, false).expect("sec2");
    assert_eq!(unit.read(&own, config.self_subwpr), Ok(SubWprState::Disabled));
    assert_eq!(gpu.bus().peek(report.target_config.reset_plm), GpuModel::<Ga10x>::DEFAULT_PLM);
}

#[test]
fn hopper_boots_nvdec_from_gsp() {
    let gpu = GpuModel::<Gh100>::new();
    let config = AcrConfig::for_chip::<Gh100>();
    assert_eq!(config.orchestrator.id, FalconId::Gsp);
    let mut acr = BootOrchestrator::<Gh100, _, _, _, _>::with_hardware(
        gpu.bus(),
        gpu.timer(),
        config.clone(),
        PlacingLoader::new(),
    );

    let report = acr.boot(&command(FalconIdentity::new(FalconId::Nvdec, 0), false, 4, 2)).expect("boot");
    assert_eq!(report.image.end - report.image.start, 0x2000);

    let own = resolve::<Gh100>(config.orchestrator, false).expect("gsp");
    let unit = SubWprUnit::<Gh100, _>::new(gpu.bus());
    assert_eq!(unit.read(&own, config.self_subwpr), Ok(SubWprState::Disabled));
}

#[test]
fn turing_has_one_smc_instance() {
    let gpu = GpuModel::<Tu10x>::new();
    let mut acr = BootOrchestrator::<Tu10x, _, _, _, _>::with_hardware(
        gpu.bus(),
        gpu.timer(),
        AcrConfig::for_chip::<Tu10x>(),
        PlacingLoader::new(),
    );

    let failure = acr.boot(&command(FalconIdentity::new(FalconId::Fecs, 1), true, 4, 1)).unwrap_err();
    assert_eq!(failure.error, AcrError::InvalidArgument);
    assert_eq!(failure.stage, BootStage::RegionLocked);
    assert_eq!(failure.failing_engine, Some(FalconIdentity::new(FalconId::Fecs, 1)));

    let report = acr.boot(&command(FalconIdentity::new(FalconId::Fecs, 0), true, 4, 1)).expect("boot");
    assert_eq!(report.target_config.identity.instance, 0);
    assert_eq!(Tu10x::MAX_SMC_ENGINES, 1);
}
