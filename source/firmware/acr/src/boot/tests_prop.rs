// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![cfg(test)]
//! CONTEXT: Failure-injection property tests for the boot orchestrator
//! OWNERS: @acr-team
//! NOTE: Tests only; no firmware logic.
//!
//! TEST_SCOPE:
//!   - No partial grant survives a failed boot, whichever step failed
//!   - Nothing is written before the revocation gate passes
//!   - Reset PLM is back to its original pattern after every boot
//!
//! TEST_SCENARIOS:
//!   - no_partial_grant(): inject one fault per run across every stage transition
//!   - success_grants_exactly_the_image(): random geometry, target slot mirrors the command

use acr_hal::sim::SimBus;

use super::{BootCommand, BootOrchestrator, BootStage, DmaProperties, PayloadDescriptor};
use crate::chip::{Chip, Ga10x};
use crate::config::AcrConfig;
use crate::error::AcrError;
use crate::falcon::{resolve, FalconConfig, FalconId, FalconIdentity};
use crate::regs::{FuseUcodeRev, ResetStatus};
use crate::sim::{CountingProgrammer, GpuModel, PlacingLoader};
use crate::subwpr::{SubWprState, SubWprUnit};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    Revoked,
    LockStuck,
    BadInstance,
    PayloadRejected,
    AssertStuck,
    TargetGrantDropped,
    DeassertStuck,
    PlmCorrupted,
}

fn arb_fault() -> impl Strategy<Value = Fault> {
    prop_oneof![
        Just(Fault::Revoked),
        Just(Fault::LockStuck),
        Just(Fault::BadInstance),
        Just(Fault::PayloadRejected),
        Just(Fault::AssertStuck),
        Just(Fault::TargetGrantDropped),
        Just(Fault::DeassertStuck),
        Just(Fault::PlmCorrupted),
    ]
}

fn arb_target() -> impl Strategy<Value = FalconIdentity> {
    prop_oneof![
        (0u32..8).prop_map(|inst| FalconIdentity::new(FalconId::Gpccs, inst)),
        (0u32..8).prop_map(|inst| FalconIdentity::new(FalconId::Fecs, inst)),
        Just(FalconIdentity::new(FalconId::Nvdec, 0)),
        Just(FalconIdentity::new(FalconId::Pmu, 0)),
    ]
}

fn command(target: FalconIdentity, pages: u64, image_pages: u64) -> BootCommand {
    BootCommand {
        target,
        smc_aware: true,
        payload: PayloadDescriptor {
            source: 0x20_0000,
            size: pages << 12,
            image_offset: (pages - image_pages) << 12,
            image_size: image_pages << 12,
        },
        dma: DmaProperties { ctx_dma: 0, read_mask: 0xf, write_mask: 0x8 },
    }
}

fn slot_state(bus: &SimBus, cfg: &FalconConfig, id: u8) -> SubWprState {
    SubWprUnit::<Ga10x, _>::new(bus).read(cfg, id).unwrap()
}

fn inject(gpu: &GpuModel<Ga10x>, fault: Fault, target: &FalconConfig) {
    match fault {
        Fault::Revoked => gpu.bus().preset(Ga10x::FUSE_UCODE_REV, FuseUcodeRev::with_version(9).raw()),
        Fault::LockStuck => gpu.stick_lock(),
        Fault::AssertStuck => gpu.stick_reset(target, ResetStatus::Deasserted),
        Fault::DeassertStuck => gpu.stick_reset(target, ResetStatus::Asserted),
        Fault::TargetGrantDropped => {
            // First permission write is lost; later ones land.
            let mut dropped = false;
            gpu.bus().on_write(target.subwpr_perm(0), move |regs, addr, value| {
                if dropped {
                    regs.set(addr, value);
                }
                dropped = true;
            });
        }
        Fault::PlmCorrupted => {
            // First mask write lands with a flipped bit and fails readback.
            let mut corrupted = false;
            gpu.bus().on_write(target.reset_plm, move |regs, addr, value| {
                let stored = if corrupted { value } else { value ^ 1 };
                corrupted = true;
                regs.set(addr, stored);
            });
        }
        Fault::BadInstance | Fault::PayloadRejected => {}
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn no_partial_grant(fault in arb_fault(), target in arb_target(), pages in 1u64..16) {
        let gpu = GpuModel::<Ga10x>::new();
        let config = AcrConfig::for_chip::<Ga10x>();
        let target_cfg = resolve::<Ga10x>(target, true).unwrap();
        inject(&gpu, fault, &target_cfg);

        let mut cmd = command(target, pages, 1);
        if fault == Fault::BadInstance {
            cmd.target = FalconIdentity::new(FalconId::Gpccs, Ga10x::MAX_SMC_ENGINES);
        }
        let loader = if fault == Fault::PayloadRejected {
            PlacingLoader::failing(AcrError::InvalidOperation)
        } else {
            PlacingLoader::new()
        };
        let programmer = CountingProgrammer::new(SubWprUnit::<Ga10x, _>::new(gpu.bus()));
        let mut acr = BootOrchestrator::<Ga10x, _, _, _, _>::new(
            gpu.bus(),
            gpu.timer(),
            config.clone(),
            programmer,
            loader,
        );

        let failure = acr.boot(&cmd).unwrap_err();

        let own = resolve::<Ga10x>(config.orchestrator, false).unwrap();
        match fault {
            Fault::Revoked => {
                prop_assert_eq!(failure.stage, BootStage::Start);
                prop_assert!(gpu.bus().writes().is_empty());
            }
            Fault::PlmCorrupted => {
                prop_assert_eq!(failure.error, AcrError::ReadbackMismatch);
                prop_assert_eq!(failure.stage, BootStage::PayloadPlaced);
            }
            Fault::LockStuck => {
                prop_assert_eq!(failure.error, AcrError::Timeout);
                prop_assert_eq!(acr.programmer().programs(), 0);
                prop_assert_eq!(acr.programmer().disables(), 0);
            }
            _ => {
                prop_assert!(failure.stage >= BootStage::RegionLocked);
                prop_assert_eq!(slot_state(gpu.bus(), &own, config.self_subwpr), SubWprState::Disabled);
                prop_assert_eq!(gpu.bus().peek(own.subwpr_perm(config.self_subwpr)), 0);
            }
        }

        match fault {
            Fault::PayloadRejected | Fault::AssertStuck | Fault::TargetGrantDropped | Fault::DeassertStuck => {
                prop_assert_eq!(slot_state(gpu.bus(), &target_cfg, config.target_subwpr), SubWprState::Disabled);
                prop_assert_eq!(gpu.bus().peek(target_cfg.subwpr_perm(config.target_subwpr)), 0);
            }
            _ => {
                let untouched = !matches!(
                    slot_state(gpu.bus(), &target_cfg, config.target_subwpr),
                    SubWprState::Active(_)
                );
                prop_assert!(untouched);
            }
        }
        prop_assert_eq!(gpu.bus().peek(target_cfg.reset_plm), GpuModel::<Ga10x>::DEFAULT_PLM);
    }

    #[test]
    fn success_grants_exactly_the_image(target in arb_target(), pages in 1u64..32, image_pages in 1u64..32) {
        prop_assume!(image_pages <= pages);
        let gpu = GpuModel::<Ga10x>::new();
        let mut acr = BootOrchestrator::<Ga10x, _, _, _, _>::with_hardware(
            gpu.bus(),
            gpu.timer(),
            AcrConfig::for_chip::<Ga10x>(),
            PlacingLoader::new(),
        );
        let cmd = command(target, pages, image_pages);
        let report = acr.boot(&cmd).unwrap();
        prop_assert_eq!(report.image.end, report.region.range.end);
        prop_assert_eq!(report.image.end - report.image.start, image_pages << 12);
        match slot_state(gpu.bus(), &report.target_config, 0) {
            SubWprState::Active(sub) => {
                prop_assert_eq!(sub.range, report.image);
                prop_assert_eq!((sub.read_mask, sub.write_mask), (0xf, 0x8));
            }
            other => prop_assert!(false, "target slot {:?}", other),
        }
    }
}
