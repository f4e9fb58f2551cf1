// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Falcon identity to register-block resolution
//! OWNERS: @acr-team
//! PUBLIC API: FalconId, FalconIdentity, FalconConfig, resolve()
//! DEPENDS_ON: chip::Chip (per-generation layout tables)
//! INVARIANTS: Out-of-range instances are rejected, never clamped; a zero reset
//!             address is an error, never "no reset needed"
//!
//! Resolution is a pure lookup. Nothing here touches the bus.

#[cfg(test)]
mod tests_prop;

use crate::chip::Chip;
use crate::error::AcrError;
use crate::regs::FALCON_RESET_PLM;

/// Embedded microcontroller engines the secure-boot core knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FalconId {
    Pmu,
    Fecs,
    Gpccs,
    Nvdec,
    Sec2,
    Gsp,
    Fbfalcon,
}

impl FalconId {
    pub const ALL: [FalconId; 7] = [
        FalconId::Pmu,
        FalconId::Fecs,
        FalconId::Gpccs,
        FalconId::Nvdec,
        FalconId::Sec2,
        FalconId::Gsp,
        FalconId::Fbfalcon,
    ];

    /// Graphics engines that are replicated per SMC partition.
    pub const fn is_gpc_class(self) -> bool {
        matches!(self, FalconId::Fecs | FalconId::Gpccs)
    }

    pub const fn name(self) -> &'static str {
        match self {
            FalconId::Pmu => "pmu",
            FalconId::Fecs => "fecs",
            FalconId::Gpccs => "gpccs",
            FalconId::Nvdec => "nvdec",
            FalconId::Sec2 => "sec2",
            FalconId::Gsp => "gsp",
            FalconId::Fbfalcon => "fbfalcon",
        }
    }

    /// Parses the lowercase name produced by [`FalconId::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }
}

/// One engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FalconIdentity {
    pub id: FalconId,
    pub instance: u32,
}

impl FalconIdentity {
    pub const fn new(id: FalconId, instance: u32) -> Self {
        Self { id, instance }
    }
}

/// Register addresses of one resolved engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FalconConfig {
    pub identity: FalconIdentity,
    /// Priv base of the instance's register window.
    pub base: usize,
    /// Engine reset-control register; never zero.
    pub reset_control: usize,
    /// Privilege level mask guarding `reset_control`.
    pub reset_plm: usize,
    /// Address of sub-WPR slot 0.
    pub subwpr_base: usize,
    pub subwpr_stride: usize,
    pub subwpr_cfg_offset: usize,
    pub subwpr_slots: u8,
}

impl FalconConfig {
    /// Low-bound register of sub-WPR `slot`; the high bound follows at +4.
    pub const fn subwpr_addr_lo(&self, slot: u8) -> usize {
        self.subwpr_base + slot as usize * self.subwpr_stride
    }

    pub const fn subwpr_addr_hi(&self, slot: u8) -> usize {
        self.subwpr_addr_lo(slot) + 4
    }

    pub const fn subwpr_perm(&self, slot: u8) -> usize {
        self.subwpr_addr_lo(slot) + self.subwpr_cfg_offset
    }
}

/// Resolves `identity` against chip generation `C`.
///
/// GPC-class engines accept instances `0..C::MAX_SMC_ENGINES` when
/// `smc_aware` is set and only instance 0 (the legacy window) otherwise;
/// every other engine accepts only instance 0.
pub fn resolve<C: Chip>(identity: FalconIdentity, smc_aware: bool) -> Result<FalconConfig, AcrError> {
    let layout = C::falcon_layout(identity.id).ok_or(AcrError::NotFound)?;

    let limit = if identity.id.is_gpc_class() && smc_aware { C::MAX_SMC_ENGINES } else { 1 };
    if identity.instance >= limit {
        return Err(AcrError::InvalidArgument);
    }

    let base = match layout.smc {
        Some(window) if smc_aware => window.base + identity.instance as usize * window.stride,
        _ => layout.pri_base,
    };

    let reset_offset = layout.reset_offset.ok_or(AcrError::InvalidResetAddress)?;
    let reset_control = base + reset_offset;
    if reset_control == 0 {
        return Err(AcrError::InvalidResetAddress);
    }

    Ok(FalconConfig {
        identity,
        base,
        reset_control,
        reset_plm: base + FALCON_RESET_PLM,
        subwpr_base: base + C::SUBWPR_OFFSET,
        subwpr_stride: C::SUBWPR_STRIDE,
        subwpr_cfg_offset: C::SUBWPR_CFG_OFFSET,
        subwpr_slots: C::SUBWPR_SLOTS,
    })
}
