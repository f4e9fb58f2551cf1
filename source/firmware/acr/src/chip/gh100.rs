// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Hopper (GH100) register layout.
//!
//! The PMU is gone on Hopper, and FBFALCON is reset by the GSP rather than
//! through its own engine register.

use super::{Architecture, Chip, FalconLayout, SmcWindow};
use crate::falcon::FalconId;
use crate::regs::FALCON_ENGINE;

pub(super) const WPR_SLOTS: u8 = 3;

/// Hopper GH100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gh100;

impl Chip for Gh100 {
    const NAME: &'static str = "gh100";
    const ARCH: Architecture = Architecture::Hopper;
    const MAX_SMC_ENGINES: u32 = 8;

    const WPR_SLOTS: u8 = WPR_SLOTS;
    const WPR_ADDR_LO: usize = 0x001f_a8a0;
    const WPR_ADDR_HI: usize = 0x001f_a8a4;
    const WPR_CFG: usize = 0x001f_a8a8;
    const WPR_SLOT_STRIDE: usize = 0x10;
    const WPR_LOCK: usize = 0x001f_a8f0;
    const USABLE_FB_SIZE: usize = 0x0011_83a4;

    const SUBWPR_OFFSET: usize = 0xa00;
    const SUBWPR_SLOTS: u8 = 8;
    const SUBWPR_STRIDE: usize = 0x10;
    const SUBWPR_CFG_OFFSET: usize = 0xc;
    const SUBWPR_PERMS_RESET_DENY: bool = true;
    const SUBWPR_ZERO_BOUNDS_UNCONFIGURED: bool = false;

    const FUSE_UCODE_REV: usize = 0x0082_0140;

    fn supports_chipset(chipset: u32) -> bool {
        chipset == 0x180
    }

    fn falcon_layout(id: FalconId) -> Option<FalconLayout> {
        let plain = |pri_base| FalconLayout { pri_base, smc: None, reset_offset: Some(FALCON_ENGINE) };
        let layout = match id {
            FalconId::Pmu => return None,
            FalconId::Fecs => FalconLayout {
                pri_base: 0x0040_9000,
                smc: Some(SmcWindow { base: 0x0060_9000, stride: 0x2_0000 }),
                reset_offset: Some(FALCON_ENGINE),
            },
            FalconId::Gpccs => FalconLayout {
                pri_base: 0x0041_a000,
                smc: Some(SmcWindow { base: 0x0061_a000, stride: 0x2_0000 }),
                reset_offset: Some(FALCON_ENGINE),
            },
            FalconId::Nvdec => plain(0x0084_8000),
            FalconId::Sec2 => plain(0x0084_0000),
            FalconId::Gsp => plain(0x0011_0000),
            FalconId::Fbfalcon => FalconLayout { pri_base: 0x009a_4000, smc: None, reset_offset: None },
        };
        Some(layout)
    }
}
