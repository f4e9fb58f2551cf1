// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Typed register values touched by the secure-boot core
//! OWNERS: @acr-team
//! PUBLIC API: PrivLevelMask, EngineReset, PageAddr, WprCfg, WprLock, SubWprPerm, Boot42,
//!             FuseUcodeRev, UsableFbSize, chip-common offsets
//! INVARIANTS: Bit layouts are fixed; setters mask their input to the field width
//!
//! Each type wraps the raw 32-bit word. Getters and setters document the exact
//! bit range they touch; nothing outside that range is modified by a setter.

use acr_hal::Bus;

/// `NV_PMC_BOOT_42`: chip identification.
pub const NV_PMC_BOOT_42: usize = 0x0000_0a00;
/// `NV_PTIMER_TIME_0`: low 32 bits of the nanosecond timer.
pub const NV_PTIMER_TIME_0: usize = 0x0000_9400;
/// `NV_PTIMER_TIME_1`: high 32 bits of the nanosecond timer.
pub const NV_PTIMER_TIME_1: usize = 0x0000_9410;

/// Falcon-relative offset of the engine reset-control register.
pub const FALCON_ENGINE: usize = 0x3c0;
/// Falcon-relative offset of the reset register's privilege level mask.
pub const FALCON_RESET_PLM: usize = 0x408;

/// Size of the pages region and sub-region bounds are expressed in.
pub const PAGE_SHIFT: u32 = 12;
pub const PAGE_SIZE: u64 = 1 << PAGE_SHIFT;

macro_rules! impl_raw {
    ($ty:ident) => {
        impl $ty {
            #[inline]
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            #[inline]
            pub fn read(bus: &impl Bus, addr: usize) -> Self {
                Self(bus.read32(addr))
            }

            #[inline]
            pub fn write(self, bus: &impl Bus, addr: usize) {
                bus.write32(addr, self.0)
            }
        }
    };
}

const fn field(raw: u32, shift: u32, width: u32) -> u32 {
    (raw >> shift) & ((1u32 << width) - 1)
}

const fn with_field(raw: u32, shift: u32, width: u32, value: u32) -> u32 {
    let mask = ((1u32 << width) - 1) << shift;
    (raw & !mask) | ((value << shift) & mask)
}

/// Whether unauthorized accesses are reported or silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationPolicy {
    Ignore,
    Report,
}

/// Privilege level mask word guarding one register.
///
/// A set protection bit means the corresponding privilege level *may* access
/// the guarded register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrivLevelMask(u32);
impl_raw!(PrivLevelMask);

impl PrivLevelMask {
    pub const LEVELS: u8 = 4;
    pub const SOURCE_BITS: u32 = 12;

    /// Bits 3:0, one per privilege level.
    pub const fn read_protection_bits(self) -> u8 {
        field(self.0, 0, 4) as u8
    }

    pub const fn set_read_protection_bits(self, bits: u8) -> Self {
        Self(with_field(self.0, 0, 4, bits as u32))
    }

    /// Bits 7:4, one per privilege level.
    pub const fn write_protection_bits(self) -> u8 {
        field(self.0, 4, 4) as u8
    }

    pub const fn set_write_protection_bits(self, bits: u8) -> Self {
        Self(with_field(self.0, 4, 4, bits as u32))
    }

    pub fn read_protection(self) -> [bool; 4] {
        let bits = self.read_protection_bits();
        core::array::from_fn(|level| bits & (1 << level) != 0)
    }

    pub fn write_protection(self) -> [bool; 4] {
        let bits = self.write_protection_bits();
        core::array::from_fn(|level| bits & (1 << level) != 0)
    }

    /// Bit 8.
    pub const fn read_violation(self) -> ViolationPolicy {
        if field(self.0, 8, 1) != 0 {
            ViolationPolicy::Report
        } else {
            ViolationPolicy::Ignore
        }
    }

    /// Bit 9.
    pub const fn write_violation(self) -> ViolationPolicy {
        if field(self.0, 9, 1) != 0 {
            ViolationPolicy::Report
        } else {
            ViolationPolicy::Ignore
        }
    }

    pub const fn set_write_violation(self, policy: ViolationPolicy) -> Self {
        let bit = match policy {
            ViolationPolicy::Report => 1,
            ViolationPolicy::Ignore => 0,
        };
        Self(with_field(self.0, 9, 1, bit))
    }

    /// Bits 23:12, one per request source.
    pub const fn source_enable(self) -> u32 {
        field(self.0, 12, Self::SOURCE_BITS)
    }

    pub const fn set_source_enable(self, bitmap: u32) -> Self {
        Self(with_field(self.0, 12, Self::SOURCE_BITS, bitmap))
    }
}

/// Engine reset-control register (`NV_PFALCON_FALCON_ENGINE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineReset(u32);
impl_raw!(EngineReset);

/// Decoded `RESET_STATUS` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStatus {
    Asserted,
    Deasserted,
    /// Transitional or undocumented encodings.
    Other(u8),
}

impl EngineReset {
    const STATUS_ASSERTED: u32 = 0;
    const STATUS_DEASSERTED: u32 = 2;

    /// Bit 0: reset request.
    pub const fn reset(self) -> bool {
        field(self.0, 0, 1) != 0
    }

    pub const fn set_reset(self, assert: bool) -> Self {
        Self(with_field(self.0, 0, 1, assert as u32))
    }

    /// Bits 10:8.
    pub const fn status(self) -> ResetStatus {
        match field(self.0, 8, 3) {
            Self::STATUS_ASSERTED => ResetStatus::Asserted,
            Self::STATUS_DEASSERTED => ResetStatus::Deasserted,
            other => ResetStatus::Other(other as u8),
        }
    }

    pub const fn with_status(self, status: ResetStatus) -> Self {
        let value = match status {
            ResetStatus::Asserted => Self::STATUS_ASSERTED,
            ResetStatus::Deasserted => Self::STATUS_DEASSERTED,
            ResetStatus::Other(v) => v as u32,
        };
        Self(with_field(self.0, 8, 3, value))
    }
}

/// Address-bound register shared by region-table and sub-WPR slots.
///
/// Bits 31:4 hold a 4K page number; bits 3:0 are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageAddr(u32);
impl_raw!(PageAddr);

impl PageAddr {
    pub const PAGE_BITS: u32 = 28;
    /// Largest encodable page, also used as the "invalid" low bound.
    pub const MAX_PAGE: u32 = (1 << Self::PAGE_BITS) - 1;

    /// Bits 31:4.
    pub const fn page(self) -> u32 {
        field(self.0, 4, Self::PAGE_BITS)
    }

    pub const fn from_page(page: u32) -> Self {
        Self(with_field(0, 4, Self::PAGE_BITS, page))
    }

    pub const fn address(self) -> u64 {
        (self.page() as u64) << PAGE_SHIFT
    }
}

/// Region-table slot configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WprCfg(u32);
impl_raw!(WprCfg);

impl WprCfg {
    /// Bits 1:0: ACR region id (0 = insecure).
    pub const fn region_id(self) -> u8 {
        field(self.0, 0, 2) as u8
    }

    pub const fn set_region_id(self, id: u8) -> Self {
        Self(with_field(self.0, 0, 2, id as u32))
    }
}

/// Region-table lock register: one sticky bit per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WprLock(u32);
impl_raw!(WprLock);

impl WprLock {
    /// Bit `slot`.
    pub const fn locked(self, slot: u8) -> bool {
        field(self.0, slot as u32, 1) != 0
    }

    pub const fn request(slot: u8) -> Self {
        Self(1 << slot)
    }
}

/// Sub-WPR permission register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubWprPerm(u32);
impl_raw!(SubWprPerm);

impl SubWprPerm {
    /// Bits 3:0: privilege levels allowed to read.
    pub const fn read_mask(self) -> u8 {
        field(self.0, 0, 4) as u8
    }

    /// Bits 7:4: privilege levels allowed to write.
    pub const fn write_mask(self) -> u8 {
        field(self.0, 4, 4) as u8
    }

    pub const fn new(read_mask: u8, write_mask: u8) -> Self {
        Self(with_field(with_field(0, 0, 4, read_mask as u32), 4, 4, write_mask as u32))
    }
}

/// `NV_PMC_BOOT_42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Boot42(u32);
impl_raw!(Boot42);

impl Boot42 {
    /// Bits 28:20: architecture and implementation.
    pub const fn chipset(self) -> u32 {
        field(self.0, 20, 9)
    }

    pub const fn with_chipset(chipset: u32) -> Self {
        Self(with_field(0, 20, 9, chipset))
    }
}

/// Anti-rollback fuse for the ACR ucode, burned as a thermometer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FuseUcodeRev(u32);
impl_raw!(FuseUcodeRev);

impl FuseUcodeRev {
    /// Bits 15:0; the version is the index of the highest burned bit plus one.
    pub const fn version(self) -> u32 {
        let bits = field(self.0, 0, 16);
        32 - bits.leading_zeros()
    }

    pub const fn with_version(version: u32) -> Self {
        let bits = if version >= 16 { 0xffff } else { (1u32 << version) - 1 };
        Self(bits)
    }
}

/// `NV_USABLE_FB_SIZE_IN_MB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsableFbSize(u32);
impl_raw!(UsableFbSize);

impl UsableFbSize {
    pub const fn bytes(self) -> u64 {
        (self.0 as u64) << 20
    }
}
