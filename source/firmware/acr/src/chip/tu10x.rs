// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Turing (TU10x) register layout. No SMC partitioning.

use super::{Architecture, Chip, FalconLayout};
use crate::falcon::FalconId;
use crate::regs::FALCON_ENGINE;

pub(super) const WPR_SLOTS: u8 = 2;

/// Turing TU102 through TU117.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tu10x;

impl Chip for Tu10x {
    const NAME: &'static str = "tu10x";
    const ARCH: Architecture = Architecture::Turing;
    const MAX_SMC_ENGINES: u32 = 1;

    const WPR_SLOTS: u8 = WPR_SLOTS;
    const WPR_ADDR_LO: usize = 0x001f_a824;
    const WPR_ADDR_HI: usize = 0x001f_a828;
    const WPR_CFG: usize = 0x001f_a82c;
    const WPR_SLOT_STRIDE: usize = 0x10;
    const WPR_LOCK: usize = 0x001f_a87c;
    const USABLE_FB_SIZE: usize = 0x0011_83a4;

    const SUBWPR_OFFSET: usize = 0x900;
    const SUBWPR_SLOTS: u8 = 4;
    const SUBWPR_STRIDE: usize = 0xc;
    const SUBWPR_CFG_OFFSET: usize = 0x8;
    const SUBWPR_PERMS_RESET_DENY: bool = true;
    const SUBWPR_ZERO_BOUNDS_UNCONFIGURED: bool = false;

    const FUSE_UCODE_REV: usize = 0x0082_4100;

    fn supports_chipset(chipset: u32) -> bool {
        matches!(chipset, 0x162 | 0x164 | 0x166 | 0x167 | 0x168)
    }

    fn falcon_layout(id: FalconId) -> Option<FalconLayout> {
        let pri_base = match id {
            FalconId::Pmu => 0x0010_a000,
            FalconId::Fecs => 0x0040_9000,
            FalconId::Gpccs => 0x0041_a000,
            FalconId::Nvdec => 0x0084_8000,
            FalconId::Sec2 => 0x0084_0000,
            FalconId::Gsp => 0x0011_0000,
            FalconId::Fbfalcon => 0x009a_4000,
        };
        Some(FalconLayout { pri_base, smc: None, reset_offset: Some(FALCON_ENGINE) })
    }
}
