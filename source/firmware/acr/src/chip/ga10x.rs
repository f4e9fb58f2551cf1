// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Ampere (GA10x) register layout.

use super::{Architecture, Chip, FalconLayout, SmcWindow};
use crate::falcon::FalconId;
use crate::regs::FALCON_ENGINE;

pub(super) const WPR_SLOTS: u8 = 3;

/// Ampere GA100/GA10x.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ga10x;

impl Chip for Ga10x {
    const NAME: &'static str = "ga10x";
    const ARCH: Architecture = Architecture::Ampere;
    const MAX_SMC_ENGINES: u32 = 8;

    const WPR_SLOTS: u8 = WPR_SLOTS;
    const WPR_ADDR_LO: usize = 0x001f_a824;
    const WPR_ADDR_HI: usize = 0x001f_a828;
    const WPR_CFG: usize = 0x001f_a82c;
    const WPR_SLOT_STRIDE: usize = 0x10;
    const WPR_LOCK: usize = 0x001f_a880;
    const USABLE_FB_SIZE: usize = 0x0011_83a4;

    const SUBWPR_OFFSET: usize = 0x900;
    const SUBWPR_SLOTS: u8 = 8;
    const SUBWPR_STRIDE: usize = 0x10;
    const SUBWPR_CFG_OFFSET: usize = 0x8;
    const SUBWPR_PERMS_RESET_DENY: bool = false;
    const SUBWPR_ZERO_BOUNDS_UNCONFIGURED: bool = true;

    const FUSE_UCODE_REV: usize = 0x0082_4140;

    fn supports_chipset(chipset: u32) -> bool {
        // GA100, then GA102 through GA107.
        matches!(chipset, 0x170 | 0x172..=0x177)
    }

    fn falcon_layout(id: FalconId) -> Option<FalconLayout> {
        let plain = |pri_base| FalconLayout { pri_base, smc: None, reset_offset: Some(FALCON_ENGINE) };
        let layout = match id {
            FalconId::Pmu => plain(0x0010_a000),
            FalconId::Fecs => FalconLayout {
                pri_base: 0x0040_9000,
                smc: Some(SmcWindow { base: 0x0050_9000, stride: 0x2_0000 }),
                reset_offset: Some(FALCON_ENGINE),
            },
            FalconId::Gpccs => FalconLayout {
                pri_base: 0x0041_a000,
                smc: Some(SmcWindow { base: 0x0051_a000, stride: 0x2_0000 }),
                reset_offset: Some(FALCON_ENGINE),
            },
            FalconId::Nvdec => plain(0x0084_8000),
            FalconId::Sec2 => plain(0x0084_0000),
            FalconId::Gsp => plain(0x0011_0000),
            FalconId::Fbfalcon => plain(0x009a_4000),
        };
        Some(layout)
    }
}
