// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Region table across several boots
//! TESTS: One slot per boot until the table is full; locked ranges stay
//!        reserved; scrub clears a surviving target grant

use core::time::Duration;

use acr::chip::Ga10x;
use acr::sim::{GpuModel, PlacingLoader};
use acr::{
    AcrConfig, AcrError, BootOrchestrator, BootStage, Chip, FalconId, FalconIdentity, SubWprState, SubWprUnit,
    WprAllocator,
};
use acr_e2e::command;
use proptest::prelude::*;

const LOCK_TIMEOUT: Duration = Duration::from_millis(1);

#[test]
fn each_boot_locks_its_own_slot_until_the_table_is_full() {
    let gpu = GpuModel::<Ga10x>::new();
    let config = AcrConfig::for_chip::<Ga10x>();
    let mut acr = BootOrchestrator::<Ga10x, _, _, _, _>::with_hardware(
        gpu.bus(),
        gpu.timer(),
        config.clone(),
        PlacingLoader::new(),
    );

    let mut ranges = Vec::new();
    for instance in 0..u32::from(Ga10x::WPR_SLOTS) {
        let report = acr.boot(&command(FalconIdentity::new(FalconId::Fecs, instance), true, 8, 2)).expect("boot");
        assert_eq!(report.region.index, ranges.len() as u8);
        assert_eq!(report.region.region_id, report.region.index + 1);
        ranges.push(report.region.range);
    }
    assert!(ranges.windows(2).all(|pair| pair[0].end <= pair[1].start));

    let failure = acr.boot(&command(FalconIdentity::new(FalconId::Fecs, 7), true, 8, 2)).unwrap_err();
    assert_eq!(failure.error, AcrError::NoSpace);
    assert_eq!(failure.stage, BootStage::RevocationChecked);

    let allocator = WprAllocator::<Ga10x, _, _>::new(gpu.bus(), gpu.timer(), config.carveout, LOCK_TIMEOUT);
    assert!(allocator.regions().all(|slot| slot.locked));
    assert_eq!(allocator.reserve(ranges[0].clone()).map(|_| ()), Err(AcrError::InvalidOperation));
}

#[test]
fn scrub_clears_a_live_target_grant() {
    let gpu = GpuModel::<Ga10x>::new();
    let mut acr = BootOrchestrator::<Ga10x, _, _, _, _>::with_hardware(
        gpu.bus(),
        gpu.timer(),
        AcrConfig::for_chip::<Ga10x>(),
        PlacingLoader::new(),
    );
    let report = acr.boot(&command(FalconIdentity::new(FalconId::Gpccs, 5), true, 4, 1)).expect("boot");

    let mut unit = SubWprUnit::<Ga10x, _>::new(gpu.bus());
    assert!(matches!(unit.read(&report.target_config, 0), Ok(SubWprState::Active(_))));
    assert_eq!(unit.scrub(&report.target_config), Ok(1));
    assert_eq!(unit.read(&report.target_config, 0), Ok(SubWprState::Disabled));
    assert_eq!(unit.scrub(&report.target_config), Ok(0));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn locked_range_cannot_be_reserved_again(start_page in 0u64..16, len_pages in 1u64..16) {
        let gpu = GpuModel::<Ga10x>::new();
        let config = AcrConfig::for_chip::<Ga10x>();
        let mut acr = BootOrchestrator::<Ga10x, _, _, _, _>::with_hardware(
            gpu.bus(),
            gpu.timer(),
            config.clone(),
            PlacingLoader::new(),
        );
        let report = acr.boot(&command(FalconIdentity::new(FalconId::Nvdec, 0), false, 8, 1)).expect("boot");

        let start = report.region.range.start + (start_page << 12);
        let range = start..start + (len_pages << 12);
        let allocator = WprAllocator::<Ga10x, _, _>::new(gpu.bus(), gpu.timer(), config.carveout, LOCK_TIMEOUT);
        let overlaps = range.start < report.region.range.end;
        let reserved = allocator.reserve(range);
        prop_assert_eq!(reserved.is_err(), overlaps);
        prop_assert!(allocator.slot(report.region.index).locked);
    }
}
