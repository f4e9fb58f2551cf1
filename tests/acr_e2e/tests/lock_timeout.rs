// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Orchestrator behaviour when the region lock or the payload fails
//! TESTS: Stuck lock never reaches the programmer; loader failure revokes both grants

use core::time::Duration;

use acr::chip::Ga10x;
use acr::sim::{GpuModel, PlacingLoader};
use acr::{AcrConfig, AcrError, AcrStatus, BootOrchestrator, BootStage, FalconId, FalconIdentity};
use acr_e2e::{command, Call, RecordingProgrammer};

#[test]
fn stuck_lock_times_out_without_programming() {
    let gpu = GpuModel::<Ga10x>::new();
    gpu.stick_lock();
    let config = AcrConfig::for_chip::<Ga10x>().with_lock_timeout(Duration::from_micros(50));
    let mut acr = BootOrchestrator::<Ga10x, _, _, _, _>::new(
        gpu.bus(),
        gpu.timer(),
        config.clone(),
        RecordingProgrammer::default(),
        PlacingLoader::new(),
    );

    let failure = acr.boot(&command(FalconIdentity::new(FalconId::Gpccs, 2), true, 16, 1)).unwrap_err();

    assert_eq!(failure.error, AcrError::Timeout);
    assert_eq!(AcrStatus::from(failure), AcrStatus::Timeout);
    assert_eq!(failure.failing_engine, Some(config.orchestrator));
    assert_eq!(acr.programmer().programs(), 0);
    assert!(acr.programmer().calls().is_empty());
    assert_eq!(acr.loader().calls(), 0);
    assert!(gpu.timer().current() >= 50_000);
}

#[test]
fn rejected_payload_revokes_both_grants() {
    let gpu = GpuModel::<Ga10x>::new();
    let config = AcrConfig::for_chip::<Ga10x>();
    let target = FalconIdentity::new(FalconId::Nvdec, 0);
    let loader = PlacingLoader::failing(AcrError::InvalidOperation);
    let mut acr = BootOrchestrator::<Ga10x, _, _, _, _>::new(
        gpu.bus(),
        gpu.timer(),
        config.clone(),
        RecordingProgrammer::default(),
        loader,
    );

    let failure = acr.boot(&command(target, false, 4, 1)).unwrap_err();

    assert_eq!(failure.error, AcrError::InvalidOperation);
    assert_eq!(failure.stage, BootStage::RegionLocked);
    assert_eq!(failure.failing_engine, Some(config.orchestrator));
    assert_eq!(
        acr.programmer().calls(),
        &[
            Call::Program { owner: config.orchestrator, id: config.self_subwpr },
            Call::Disable { owner: target, id: config.target_subwpr },
            Call::Disable { owner: config.orchestrator, id: config.self_subwpr },
        ]
    );
}
