// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![cfg(test)]
//! CONTEXT: Property-based tests for falcon resolution
//! OWNERS: @acr-team
//! NOTE: Tests only; no firmware logic.
//!
//! TEST_SCOPE:
//!   - Instance-range validation per engine class
//!   - Resolved register blocks never collide between instances
//!
//! TEST_SCENARIOS:
//!   - gpc_class_accepts_exactly_smc_range(): Ok iff instance < MAX_SMC_ENGINES
//!   - other_engines_accept_only_zero(): Ok iff instance == 0
//!   - instances_get_disjoint_windows(): distinct instances never share a reset register

use super::{resolve, FalconId, FalconIdentity};
use crate::chip::{Chip, Ga10x, Gh100, Tu10x};
use crate::error::AcrError;
use proptest::prelude::*;

fn arb_gpc_class() -> impl Strategy<Value = FalconId> {
    prop_oneof![Just(FalconId::Fecs), Just(FalconId::Gpccs)]
}

fn arb_other() -> impl Strategy<Value = FalconId> {
    prop_oneof![Just(FalconId::Pmu), Just(FalconId::Nvdec), Just(FalconId::Sec2), Just(FalconId::Gsp)]
}

fn check_gpc<C: Chip>(id: FalconId, instance: u32) -> Result<(), TestCaseError> {
    let result = resolve::<C>(FalconIdentity::new(id, instance), true);
    if instance < C::MAX_SMC_ENGINES {
        prop_assert!(result.is_ok(), "{} {:?}:{}", C::NAME, id, instance);
    } else {
        prop_assert_eq!(result, Err(AcrError::InvalidArgument));
    }
    Ok(())
}

proptest! {
    #[test]
    fn gpc_class_accepts_exactly_smc_range(id in arb_gpc_class(), instance in 0u32..64) {
        check_gpc::<Tu10x>(id, instance)?;
        check_gpc::<Ga10x>(id, instance)?;
        check_gpc::<Gh100>(id, instance)?;
    }

    #[test]
    fn other_engines_accept_only_zero(id in arb_other(), instance in 0u32..64, smc_aware in any::<bool>()) {
        let result = resolve::<Ga10x>(FalconIdentity::new(id, instance), smc_aware);
        if instance == 0 {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result, Err(AcrError::InvalidArgument));
        }
    }

    #[test]
    fn instances_get_disjoint_windows(id in arb_gpc_class(), a in 0u32..8, b in 0u32..8) {
        prop_assume!(a != b);
        let first = resolve::<Ga10x>(FalconIdentity::new(id, a), true).unwrap();
        let second = resolve::<Ga10x>(FalconIdentity::new(id, b), true).unwrap();
        prop_assert_ne!(first.reset_control, second.reset_control);
        prop_assert_ne!(first.subwpr_base, second.subwpr_base);
    }
}
