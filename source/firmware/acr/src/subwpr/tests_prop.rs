// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![cfg(test)]
//! CONTEXT: Property-based tests for sub-WPR programming
//! OWNERS: @acr-team
//! NOTE: Tests only; no firmware logic.
//!
//! TEST_SCOPE:
//!   - disable() idempotence from any prior slot state
//!   - program()/read() agreement for every well-formed grant
//!
//! TEST_SCENARIOS:
//!   - disable_twice_equals_once(): second disable leaves registers unchanged
//!   - programmed_grant_reads_back(): Active state mirrors the grant exactly

use super::{SubWpr, SubWprProgram, SubWprState, SubWprUnit};
use crate::chip::{Chip, Ga10x, Gh100, Tu10x};
use crate::falcon::{resolve, FalconConfig, FalconId, FalconIdentity};
use crate::sim::GpuModel;
use proptest::prelude::*;

fn arb_grant() -> impl Strategy<Value = (u8, u64, u64, u8, u8)> {
    (0u8..4, 0x8000u64..0x9000, 1u64..64, 0u8..16, 0u8..16)
}

fn snapshot(bus: &acr_hal::sim::SimBus, cfg: &FalconConfig, id: u8) -> [u32; 3] {
    [bus.peek(cfg.subwpr_addr_lo(id)), bus.peek(cfg.subwpr_addr_hi(id)), bus.peek(cfg.subwpr_perm(id))]
}

fn disable_idempotent<C: Chip>(grant: (u8, u64, u64, u8, u8), programmed: bool) -> Result<(), TestCaseError> {
    let (id, first_page, pages, read_mask, write_mask) = grant;
    let gpu = GpuModel::<C>::new();
    let cfg = resolve::<C>(FalconIdentity::new(FalconId::Fecs, 0), false).unwrap();
    let mut unit = SubWprUnit::<C, _>::new(gpu.bus());
    if programmed {
        let sub = SubWpr {
            id,
            owner: cfg.identity,
            range: first_page << 12..(first_page + pages) << 12,
            read_mask,
            write_mask,
        };
        unit.program(&cfg, &sub).unwrap();
    }
    unit.disable(&cfg, id).unwrap();
    let once = snapshot(gpu.bus(), &cfg, id);
    unit.disable(&cfg, id).unwrap();
    prop_assert_eq!(snapshot(gpu.bus(), &cfg, id), once);
    prop_assert_eq!(unit.read(&cfg, id).unwrap(), SubWprState::Disabled);
    prop_assert_eq!(once[2], 0);
    Ok(())
}

proptest! {
    #[test]
    fn disable_twice_equals_once(grant in arb_grant(), programmed in any::<bool>()) {
        disable_idempotent::<Tu10x>(grant, programmed)?;
        disable_idempotent::<Ga10x>(grant, programmed)?;
        disable_idempotent::<Gh100>(grant, programmed)?;
    }

    #[test]
    fn programmed_grant_reads_back(grant in arb_grant()) {
        let (id, first_page, pages, read_mask, write_mask) = grant;
        let gpu = GpuModel::<Ga10x>::new();
        let cfg = resolve::<Ga10x>(FalconIdentity::new(FalconId::Gpccs, 5), true).unwrap();
        let mut unit = SubWprUnit::<Ga10x, _>::new(gpu.bus());
        let sub = SubWpr {
            id,
            owner: cfg.identity,
            range: first_page << 12..(first_page + pages) << 12,
            read_mask,
            write_mask,
        };
        unit.program(&cfg, &sub).unwrap();
        prop_assert_eq!(unit.read(&cfg, id).unwrap(), SubWprState::Active(sub));
    }
}
