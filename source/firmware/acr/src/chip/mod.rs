// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Per-chip-generation register tables and quirks
//! OWNERS: @acr-team
//! PUBLIC API: Chip, Architecture, FalconLayout, SmcWindow, Tu10x, Ga10x, Gh100, Selected
//! INVARIANTS: All generation variation lives here; call sites never hard-code addresses
//!
//! Every generation is compiled so tests can exercise each one; the Cargo
//! feature only decides which one [`Selected`] names. Components are generic
//! over [`Chip`], so there is no runtime dispatch.

mod ga10x;
mod gh100;
mod tu10x;

pub use ga10x::Ga10x;
pub use gh100::Gh100;
pub use tu10x::Tu10x;

use static_assertions::const_assert;

use crate::falcon::FalconId;

#[cfg(feature = "gh100")]
pub type Selected = Gh100;
#[cfg(all(feature = "ga10x", not(feature = "gh100")))]
pub type Selected = Ga10x;
#[cfg(all(feature = "tu10x", not(any(feature = "ga10x", feature = "gh100"))))]
pub type Selected = Tu10x;
#[cfg(not(any(feature = "tu10x", feature = "ga10x", feature = "gh100")))]
compile_error!("select a chip generation: enable one of `tu10x`, `ga10x`, `gh100`");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    Turing,
    Ampere,
    Hopper,
}

/// Per-instance register window of a GPC-class engine under SMC partitioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmcWindow {
    pub base: usize,
    pub stride: usize,
}

/// Where one falcon's registers live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FalconLayout {
    /// Legacy (non-SMC) priv base.
    pub pri_base: usize,
    /// Per-instance windows, for GPC-class engines on SMC-capable chips.
    pub smc: Option<SmcWindow>,
    /// Offset of the engine reset-control register, `None` if the engine has none.
    pub reset_offset: Option<usize>,
}

mod sealed {
    pub trait Sealed {}
}

/// Register layout of one chip generation.
pub trait Chip: sealed::Sealed + 'static {
    const NAME: &'static str;
    const ARCH: Architecture;
    /// Exclusive upper bound on GPC-class engine instances.
    const MAX_SMC_ENGINES: u32;

    /// Number of region-table slots.
    const WPR_SLOTS: u8;
    const WPR_ADDR_LO: usize;
    const WPR_ADDR_HI: usize;
    const WPR_CFG: usize;
    /// Distance between consecutive region-table slots.
    const WPR_SLOT_STRIDE: usize;
    const WPR_LOCK: usize;
    /// `NV_USABLE_FB_SIZE_IN_MB`.
    const USABLE_FB_SIZE: usize;

    /// Falcon-relative offset of sub-WPR slot 0.
    const SUBWPR_OFFSET: usize;
    const SUBWPR_SLOTS: u8;
    /// Distance between consecutive sub-WPR slots.
    const SUBWPR_STRIDE: usize;
    /// Offset of the permission register inside a slot; the bounds sit at 0x0 and 0x4.
    const SUBWPR_CFG_OFFSET: usize;
    /// Sub-WPR permissions come out of reset denying everything.
    const SUBWPR_PERMS_RESET_DENY: bool;
    /// Known defect: a slot whose bounds both read zero cannot be told apart
    /// from one that was never programmed, so it is treated as unconfigured.
    const SUBWPR_ZERO_BOUNDS_UNCONFIGURED: bool;

    /// Anti-rollback fuse for the ACR ucode.
    const FUSE_UCODE_REV: usize;

    /// Whether `chipset` (from `NV_PMC_BOOT_42`) belongs to this generation.
    fn supports_chipset(chipset: u32) -> bool;

    /// Register layout of `id`, or `None` if the engine does not exist here.
    fn falcon_layout(id: FalconId) -> Option<FalconLayout>;

    /// Address of region-table slot `slot`'s low bound.
    fn wpr_addr_lo(slot: u8) -> usize {
        Self::WPR_ADDR_LO + slot as usize * Self::WPR_SLOT_STRIDE
    }

    fn wpr_addr_hi(slot: u8) -> usize {
        Self::WPR_ADDR_HI + slot as usize * Self::WPR_SLOT_STRIDE
    }

    fn wpr_cfg(slot: u8) -> usize {
        Self::WPR_CFG + slot as usize * Self::WPR_SLOT_STRIDE
    }
}

// The lock register carries one bit per slot; the region id field is two bits wide.
const_assert!(ga10x::WPR_SLOTS as u32 <= 32 && tu10x::WPR_SLOTS as u32 <= 32);
const_assert!(gh100::WPR_SLOTS as u32 <= 32);
const_assert!(crate::wpr::MAX_REGION_ID <= 3);

impl sealed::Sealed for Tu10x {}
impl sealed::Sealed for Ga10x {}
impl sealed::Sealed for Gh100 {}
