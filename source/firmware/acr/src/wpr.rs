// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: WPR region allocation and locking against the hardware region table
//! OWNERS: @acr-team
//! PUBLIC API: WprAllocator::{allocate, reserve, lock, regions, slot, window}, WprRegion, WprSlotState
//! DEPENDS_ON: chip::Chip (table layout), poll::wait_on (lock confirmation)
//! INVARIANTS:
//!   - The region table is the source of truth; nothing is cached between calls
//!   - Locked is one-way; a locked slot or range is never written again
//!   - A region counts as locked only after the lock bit has been read back set
//!
//! Ranges are half-open byte ranges `[start, end)` on 4K boundaries. The
//! hardware high bound holds the last page of the range, not one past it.

use core::marker::PhantomData;
use core::ops::Range;
use core::time::Duration;

use acr_hal::{Bus, Timer};
use acr_log::Topic;
use static_assertions::const_assert;

use crate::chip::{Chip, Ga10x, Gh100, Tu10x};
use crate::error::AcrError;
use crate::poll::wait_on;
use crate::regs::{PageAddr, UsableFbSize, WprCfg, WprLock, PAGE_SHIFT, PAGE_SIZE};

const TARGET: &str = "acr::wpr";

/// Largest ACR region id the `CFG` field encodes; 0 means insecure.
pub const MAX_REGION_ID: u8 = 3;

// Slot `n` is tagged with region id `n + 1`.
const_assert!(Tu10x::WPR_SLOTS <= MAX_REGION_ID);
const_assert!(Ga10x::WPR_SLOTS <= MAX_REGION_ID);
const_assert!(Gh100::WPR_SLOTS <= MAX_REGION_ID);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked,
}

/// A region handed out by [`WprAllocator`]; only the allocator can lock it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WprRegion {
    index: u8,
    range: Range<u64>,
    region_id: u8,
    lock_state: LockState,
}

impl WprRegion {
    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn range(&self) -> Range<u64> {
        self.range.clone()
    }

    pub fn region_id(&self) -> u8 {
        self.region_id
    }

    pub fn lock_state(&self) -> LockState {
        self.lock_state
    }

    pub fn is_locked(&self) -> bool {
        self.lock_state == LockState::Locked
    }
}

/// One region-table slot as the hardware reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WprSlotState {
    pub index: u8,
    pub range: Range<u64>,
    pub region_id: u8,
    pub locked: bool,
}

impl WprSlotState {
    /// Whether some agent has claimed this slot.
    pub fn is_used(&self) -> bool {
        self.region_id != 0 || self.locked
    }
}

fn overlaps(a: &Range<u64>, b: &Range<u64>) -> bool {
    a.start < b.end && b.start < a.end
}

/// End of the address space the region table's page fields can encode.
pub const ADDRESSABLE_END: u64 = (PageAddr::MAX_PAGE as u64 + 1) << PAGE_SHIFT;

const fn is_page_aligned(addr: u64) -> bool {
    addr & (PAGE_SIZE - 1) == 0
}

/// Bound register value for the page holding `addr`, refusing pages the field would truncate.
fn page_of(addr: u64) -> Result<PageAddr, AcrError> {
    u32::try_from(addr >> PAGE_SHIFT)
        .ok()
        .filter(|&page| page <= PageAddr::MAX_PAGE)
        .map(PageAddr::from_page)
        .ok_or(AcrError::InvalidArgument)
}

pub struct WprAllocator<C, B, T> {
    bus: B,
    timer: T,
    carveout: Range<u64>,
    lock_timeout: Duration,
    _chip: PhantomData<C>,
}

impl<C: Chip, B: Bus, T: Timer> WprAllocator<C, B, T> {
    /// `carveout` is the framebuffer window regions may be placed in.
    pub fn new(bus: B, timer: T, carveout: Range<u64>, lock_timeout: Duration) -> Self {
        Self { bus, timer, carveout, lock_timeout, _chip: PhantomData }
    }

    /// Carve-out window clamped to usable framebuffer and to [`ADDRESSABLE_END`],
    /// trimmed to page boundaries.
    pub fn window(&self) -> Range<u64> {
        let fb_end = UsableFbSize::read(&self.bus, C::USABLE_FB_SIZE).bytes();
        let start = self.carveout.start.saturating_add(PAGE_SIZE - 1) & !(PAGE_SIZE - 1);
        let end = self.carveout.end.min(fb_end).min(ADDRESSABLE_END) & !(PAGE_SIZE - 1);
        start..end.max(start)
    }

    /// Reads region-table slot `index`.
    pub fn slot(&self, index: u8) -> WprSlotState {
        let lo = PageAddr::read(&self.bus, C::wpr_addr_lo(index));
        let hi = PageAddr::read(&self.bus, C::wpr_addr_hi(index));
        let cfg = WprCfg::read(&self.bus, C::wpr_cfg(index));
        let lock = WprLock::read(&self.bus, C::WPR_LOCK);
        WprSlotState {
            index,
            range: lo.address()..(u64::from(hi.page()) + 1) << PAGE_SHIFT,
            region_id: cfg.region_id(),
            locked: lock.locked(index),
        }
    }

    /// Every region-table slot, in index order.
    pub fn regions(&self) -> impl Iterator<Item = WprSlotState> + '_ {
        (0..C::WPR_SLOTS).map(move |index| self.slot(index))
    }

    fn free_slot(&self) -> Result<u8, AcrError> {
        self.regions().find(|slot| !slot.is_used()).map(|slot| slot.index).ok_or(AcrError::NoSpace)
    }

    fn conflict(&self, range: &Range<u64>, skip: Option<u8>) -> Option<WprSlotState> {
        self.regions()
            .filter(|slot| Some(slot.index) != skip)
            .find(|slot| slot.is_used() && overlaps(&slot.range, range))
    }

    fn unlocked(index: u8, range: Range<u64>) -> WprRegion {
        WprRegion { index, range, region_id: index + 1, lock_state: LockState::Unlocked }
    }

    /// First-fit placement of `size` bytes (rounded up to 4K) inside [`Self::window`].
    pub fn allocate(&self, size: u64) -> Result<WprRegion, AcrError> {
        if size == 0 {
            return Err(AcrError::InvalidArgument);
        }
        let size = size.checked_add(PAGE_SIZE - 1).ok_or(AcrError::InvalidArgument)? & !(PAGE_SIZE - 1);
        let index = self.free_slot()?;
        let window = self.window();

        let mut start = window.start;
        loop {
            let end = start.checked_add(size).ok_or(AcrError::NoSpace)?;
            if end > window.end {
                acr_log::warn(TARGET, Topic::WPR, |line| {
                    line.text("no gap ");
                    line.kv_hex("size", size);
                    line.text(" ");
                    line.kv_hex("window_end", window.end);
                });
                return Err(AcrError::NoSpace);
            }
            let candidate = start..end;
            match self.conflict(&candidate, None) {
                Some(slot) => start = slot.range.end,
                None => return Ok(Self::unlocked(index, candidate)),
            }
        }
    }

    /// Claims exactly `range`, which must be page aligned, inside the window
    /// and clear of every region the table already records.
    pub fn reserve(&self, range: Range<u64>) -> Result<WprRegion, AcrError> {
        if range.start >= range.end || !is_page_aligned(range.start) || !is_page_aligned(range.end) {
            return Err(AcrError::InvalidArgument);
        }
        let window = self.window();
        if range.start < window.start || range.end > window.end {
            return Err(AcrError::InvalidArgument);
        }
        if let Some(slot) = self.conflict(&range, None) {
            acr_log::warn(TARGET, Topic::WPR, |line| {
                line.text("reserve overlaps ");
                line.kv_dec("slot", u64::from(slot.index));
                line.text(" ");
                line.kv_literal("locked", if slot.locked { "yes" } else { "no" });
            });
            return Err(AcrError::InvalidOperation);
        }
        let index = self.free_slot()?;
        Ok(Self::unlocked(index, range))
    }

    /// Writes `region` into its table slot and locks the slot.
    ///
    /// On `Err` the region stays `Unlocked` and must not be used, even if the
    /// bounds were written.
    pub fn lock(&self, region: &mut WprRegion) -> Result<u8, AcrError> {
        let index = region.index;
        if region.is_locked() || index >= C::WPR_SLOTS {
            return Err(AcrError::InvalidOperation);
        }
        if region.range.start >= region.range.end {
            return Err(AcrError::InvalidArgument);
        }
        let lo = page_of(region.range.start)?;
        let hi = page_of(region.range.end - 1)?;
        let current = self.slot(index);
        if current.is_used() || self.conflict(&region.range, Some(index)).is_some() {
            return Err(AcrError::InvalidOperation);
        }

        let cfg = WprCfg::default().set_region_id(region.region_id);
        lo.write(&self.bus, C::wpr_addr_lo(index));
        hi.write(&self.bus, C::wpr_addr_hi(index));
        cfg.write(&self.bus, C::wpr_cfg(index));
        if PageAddr::read(&self.bus, C::wpr_addr_lo(index)) != lo
            || PageAddr::read(&self.bus, C::wpr_addr_hi(index)) != hi
            || WprCfg::read(&self.bus, C::wpr_cfg(index)) != cfg
        {
            return Err(AcrError::ReadbackMismatch);
        }

        WprLock::request(index).write(&self.bus, C::WPR_LOCK);
        let confirmed = wait_on(&self.timer, self.lock_timeout, || {
            WprLock::read(&self.bus, C::WPR_LOCK).locked(index).then_some(())
        });
        if let Err(err) = confirmed {
            acr_log::error(TARGET, Topic::WPR, |line| {
                line.text("lock not confirmed ");
                line.kv_dec("slot", u64::from(index));
            });
            return Err(err);
        }

        region.lock_state = LockState::Locked;
        acr_log::info(TARGET, Topic::WPR, |line| {
            line.text("locked ");
            line.kv_dec("slot", u64::from(index));
            line.text(" ");
            line.kv_hex("lo", region.range.start);
            line.text(" ");
            line.kv_hex("hi", region.range.end);
            line.text(" ");
            line.kv_dec("id", u64::from(region.region_id));
        });
        Ok(index)
    }
}
