// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Sub-WPR grant programming and revocation inside a locked region
//! OWNERS: @acr-team
//! PUBLIC API: SubWpr, SubWprState, SubWprProgram, SubWprUnit::{program, disable, read, scrub}
//! DEPENDS_ON: falcon::FalconConfig (slot addresses), chip::Chip (reset defaults, quirks)
//! INVARIANTS:
//!   - No window where a valid range carries the hardware's boot-time permissions
//!   - disable() is idempotent: permissions zero, bounds inverted
//!   - A grant is valid only after every register read back as written
//!
//! When permissions reset to deny-all the bounds go first and the masks last;
//! otherwise the masks are narrowed before the range becomes valid. disable()
//! always clears the masks before invalidating the bounds.

#[cfg(test)]
mod tests_prop;

use core::marker::PhantomData;
use core::ops::Range;

use acr_hal::Bus;
use acr_log::Topic;

use crate::chip::Chip;
use crate::error::AcrError;
use crate::falcon::{FalconConfig, FalconIdentity};
use crate::regs::{PageAddr, SubWprPerm, PAGE_SHIFT, PAGE_SIZE};

const TARGET: &str = "acr::subwpr";

/// Largest value of a read or write unlock mask (one bit per privilege level).
pub const MASK_ALL: u8 = 0xf;

/// A grant of `range` to `owner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubWpr {
    pub id: u8,
    pub owner: FalconIdentity,
    pub range: Range<u64>,
    pub read_mask: u8,
    pub write_mask: u8,
}

/// Decoded sub-WPR slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubWprState {
    /// Bounds inverted; matches nothing.
    Disabled,
    /// Reset-state bounds on a chip that cannot tell them from a real range.
    Unconfigured,
    Active(SubWpr),
}

/// Programs and revokes sub-WPR grants.
pub trait SubWprProgram {
    fn program(&mut self, cfg: &FalconConfig, sub: &SubWpr) -> Result<(), AcrError>;
    fn disable(&mut self, cfg: &FalconConfig, id: u8) -> Result<(), AcrError>;
}

impl<P: SubWprProgram + ?Sized> SubWprProgram for &mut P {
    fn program(&mut self, cfg: &FalconConfig, sub: &SubWpr) -> Result<(), AcrError> {
        (**self).program(cfg, sub)
    }

    fn disable(&mut self, cfg: &FalconConfig, id: u8) -> Result<(), AcrError> {
        (**self).disable(cfg, id)
    }
}

/// Register-level [`SubWprProgram`] for chip generation `C`.
pub struct SubWprUnit<C, B> {
    bus: B,
    _chip: PhantomData<C>,
}

struct Encoded {
    lo: PageAddr,
    hi: PageAddr,
    perm: SubWprPerm,
}

fn encode(cfg: &FalconConfig, sub: &SubWpr) -> Result<Encoded, AcrError> {
    let range = &sub.range;
    if sub.owner != cfg.identity
        || sub.id >= cfg.subwpr_slots
        || sub.read_mask > MASK_ALL
        || sub.write_mask > MASK_ALL
        || range.start >= range.end
        || range.start & (PAGE_SIZE - 1) != 0
        || range.end & (PAGE_SIZE - 1) != 0
    {
        return Err(AcrError::InvalidArgument);
    }
    let last_page = (range.end >> PAGE_SHIFT) - 1;
    if last_page > u64::from(PageAddr::MAX_PAGE) {
        return Err(AcrError::InvalidArgument);
    }
    Ok(Encoded {
        lo: PageAddr::from_page((range.start >> PAGE_SHIFT) as u32),
        hi: PageAddr::from_page(last_page as u32),
        perm: SubWprPerm::new(sub.read_mask, sub.write_mask),
    })
}

impl<C: Chip, B: Bus> SubWprUnit<C, B> {
    pub const fn new(bus: B) -> Self {
        Self { bus, _chip: PhantomData }
    }

    fn write_bounds(&self, cfg: &FalconConfig, id: u8, lo: PageAddr, hi: PageAddr) {
        lo.write(&self.bus, cfg.subwpr_addr_lo(id));
        hi.write(&self.bus, cfg.subwpr_addr_hi(id));
    }

    fn confirm(&self, cfg: &FalconConfig, id: u8, lo: PageAddr, hi: PageAddr, perm: SubWprPerm) -> Result<(), AcrError> {
        let got_lo = PageAddr::read(&self.bus, cfg.subwpr_addr_lo(id));
        let got_hi = PageAddr::read(&self.bus, cfg.subwpr_addr_hi(id));
        let got_perm = SubWprPerm::read(&self.bus, cfg.subwpr_perm(id));
        if (got_lo, got_hi, got_perm) != (lo, hi, perm) {
            acr_log::error(TARGET, Topic::SUBWPR, |line| {
                line.text("readback mismatch ");
                line.kv_literal("falcon", cfg.identity.id.name());
                line.text(" ");
                line.kv_dec("slot", u64::from(id));
            });
            return Err(AcrError::ReadbackMismatch);
        }
        Ok(())
    }

    /// Decodes slot `id` of `cfg`.
    pub fn read(&self, cfg: &FalconConfig, id: u8) -> Result<SubWprState, AcrError> {
        if id >= cfg.subwpr_slots {
            return Err(AcrError::InvalidArgument);
        }
        let lo = PageAddr::read(&self.bus, cfg.subwpr_addr_lo(id));
        let hi = PageAddr::read(&self.bus, cfg.subwpr_addr_hi(id));
        if C::SUBWPR_ZERO_BOUNDS_UNCONFIGURED && lo.raw() == 0 && hi.raw() == 0 {
            // A real grant of the first page reads the same; it is skipped too.
            return Ok(SubWprState::Unconfigured);
        }
        if lo.page() > hi.page() {
            return Ok(SubWprState::Disabled);
        }
        let perm = SubWprPerm::read(&self.bus, cfg.subwpr_perm(id));
        Ok(SubWprState::Active(SubWpr {
            id,
            owner: cfg.identity,
            range: lo.address()..(u64::from(hi.page()) + 1) << PAGE_SHIFT,
            read_mask: perm.read_mask(),
            write_mask: perm.write_mask(),
        }))
    }

    /// Disables every active slot of `cfg`; returns how many were disabled.
    pub fn scrub(&mut self, cfg: &FalconConfig) -> Result<usize, AcrError> {
        let mut disabled = 0;
        for id in 0..cfg.subwpr_slots {
            if let SubWprState::Active(_) = self.read(cfg, id)? {
                self.disable(cfg, id)?;
                disabled += 1;
            }
        }
        acr_log::debug(TARGET, Topic::SUBWPR, |line| {
            line.text("scrubbed ");
            line.kv_literal("falcon", cfg.identity.id.name());
            line.text(" ");
            line.kv_dec("count", disabled as u64);
        });
        Ok(disabled)
    }
}

impl<C: Chip, B: Bus> SubWprProgram for SubWprUnit<C, B> {
    fn program(&mut self, cfg: &FalconConfig, sub: &SubWpr) -> Result<(), AcrError> {
        let Encoded { lo, hi, perm } = encode(cfg, sub)?;
        if C::SUBWPR_PERMS_RESET_DENY {
            self.write_bounds(cfg, sub.id, lo, hi);
            perm.write(&self.bus, cfg.subwpr_perm(sub.id));
        } else {
            perm.write(&self.bus, cfg.subwpr_perm(sub.id));
            self.write_bounds(cfg, sub.id, lo, hi);
        }
        self.confirm(cfg, sub.id, lo, hi, perm)?;
        acr_log::info(TARGET, Topic::SUBWPR, |line| {
            line.text("granted ");
            line.kv_literal("falcon", cfg.identity.id.name());
            line.text(" ");
            line.kv_dec("inst", u64::from(cfg.identity.instance));
            line.text(" ");
            line.kv_dec("slot", u64::from(sub.id));
            line.text(" ");
            line.kv_hex("lo", sub.range.start);
            line.text(" ");
            line.kv_hex("hi", sub.range.end);
            line.text(" ");
            line.kv_hex("perm", u64::from(perm.raw()));
        });
        Ok(())
    }

    fn disable(&mut self, cfg: &FalconConfig, id: u8) -> Result<(), AcrError> {
        if id >= cfg.subwpr_slots {
            return Err(AcrError::InvalidArgument);
        }
        let lo = PageAddr::from_page(PageAddr::MAX_PAGE);
        let hi = PageAddr::from_page(0);
        let perm = SubWprPerm::new(0, 0);
        perm.write(&self.bus, cfg.subwpr_perm(id));
        self.write_bounds(cfg, id, lo, hi);
        self.confirm(cfg, id, lo, hi, perm)?;
        acr_log::debug(TARGET, Topic::SUBWPR, |line| {
            line.text("disabled ");
            line.kv_literal("falcon", cfg.identity.id.name());
            line.text(" ");
            line.kv_dec("inst", u64::from(cfg.identity.instance));
            line.text(" ");
            line.kv_dec("slot", u64::from(id));
        });
        Ok(())
    }
}
