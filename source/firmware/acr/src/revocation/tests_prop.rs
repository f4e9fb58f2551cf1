// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![cfg(test)]
//! CONTEXT: Property-based tests for the revocation gate
//! OWNERS: @acr-team
//!
//! TEST_SCENARIOS:
//!   - revoked_iff_fuse_exceeds_sw(): monotonic anti-rollback decision
//!   - foreign_chip_always_rejected(): chipsets of other generations never pass

use super::{RevocationGate, RevocationRecord};
use crate::chip::{Chip, Ga10x, Gh100};
use crate::error::AcrError;
use proptest::prelude::*;

proptest! {
    #[test]
    fn revoked_iff_fuse_exceeds_sw(fuse in 0u32..=16, sw in 0u32..=16, chip in 0x172u32..=0x177) {
        let gate = RevocationGate::<Ga10x>::new();
        let record = RevocationRecord { hw_fuse_version: fuse, sw_ucode_version: sw, chip_id: chip };
        if fuse > sw {
            prop_assert_eq!(gate.check(&record), Err(AcrError::UcodeRevoked));
        } else {
            prop_assert_eq!(gate.check(&record), Ok(()));
        }
    }

    #[test]
    fn foreign_chip_always_rejected(chip in 0u32..0x200, fuse in 0u32..=16, sw in 0u32..=16) {
        prop_assume!(!Gh100::supports_chipset(chip));
        let gate = RevocationGate::<Gh100>::new();
        let record = RevocationRecord { hw_fuse_version: fuse, sw_ucode_version: sw, chip_id: chip };
        prop_assert_eq!(gate.check(&record), Err(AcrError::InvalidChipId));
    }
}
