// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-build configuration of the boot orchestrator.

use core::ops::Range;
use core::time::Duration;

use crate::chip::{Architecture, Chip, Selected};
use crate::falcon::{FalconId, FalconIdentity};

/// ACR ucode version this build declares to the revocation gate.
pub const UCODE_VERSION: u32 = 3;

/// Privilege level of heavy-secure code.
pub const HS_LEVEL: u8 = 3;

/// Framebuffer window regions are carved from unless overridden.
pub const DEFAULT_CARVEOUT: Range<u64> = 0x8000_0000..0x1_0000_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcrConfig {
    pub ucode_version: u32,
    /// Falcon running this code.
    pub orchestrator: FalconIdentity,
    /// Privilege level the orchestrator runs at; PLMs are raised to it.
    pub privilege_level: u8,
    pub carveout: Range<u64>,
    pub reset_timeout: Duration,
    pub lock_timeout: Duration,
    /// Sub-WPR slot of the orchestrator's own grant.
    pub self_subwpr: u8,
    /// Sub-WPR slot of the target's grant.
    pub target_subwpr: u8,
}

impl Default for AcrConfig {
    /// Defaults for the generation this build is locked to.
    fn default() -> Self {
        Self::for_chip::<Selected>()
    }
}

impl AcrConfig {
    /// Defaults for chip generation `C`.
    pub fn for_chip<C: Chip>() -> Self {
        let orchestrator = match C::ARCH {
            Architecture::Hopper => FalconId::Gsp,
            Architecture::Turing | Architecture::Ampere => FalconId::Sec2,
        };
        Self {
            ucode_version: UCODE_VERSION,
            orchestrator: FalconIdentity::new(orchestrator, 0),
            privilege_level: HS_LEVEL,
            carveout: DEFAULT_CARVEOUT,
            reset_timeout: Duration::from_millis(10),
            lock_timeout: Duration::from_millis(1),
            self_subwpr: 1,
            target_subwpr: 0,
        }
    }

    pub fn with_ucode_version(mut self, version: u32) -> Self {
        self.ucode_version = version;
        self
    }

    pub fn with_orchestrator(mut self, orchestrator: FalconIdentity) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    pub fn with_privilege_level(mut self, level: u8) -> Self {
        self.privilege_level = level;
        self
    }

    pub fn with_carveout(mut self, carveout: Range<u64>) -> Self {
        self.carveout = carveout;
        self
    }

    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_subwpr_slots(mut self, own: u8, target: u8) -> Self {
        self.self_subwpr = own;
        self.target_subwpr = target;
        self
    }
}
