// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Closed status taxonomy shared by every secure-boot operation
//! OWNERS: @acr-team
//! PUBLIC API: AcrError, AcrStatus, ErrorClass
//! INVARIANTS: Nothing in this crate retries; every error is terminal for the current attempt

use thiserror::Error;

/// Failure of a secure-boot operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AcrError {
    /// Null, out-of-range or misaligned input.
    #[error("invalid argument")]
    InvalidArgument,
    /// The resolved reset-control register address is zero.
    #[error("falcon has no reset-control register")]
    InvalidResetAddress,
    /// The running ucode is older than the fused minimum version.
    #[error("ucode revoked by fuse")]
    UcodeRevoked,
    /// The chip identity fuse does not match this build's chip generation.
    #[error("chip id does not match this build")]
    InvalidChipId,
    /// A bounded hardware poll expired.
    #[error("hardware poll timed out")]
    Timeout,
    /// The request is invalid for the current hardware state (for example a locked region).
    #[error("operation not permitted in current hardware state")]
    InvalidOperation,
    /// Unknown falcon identity for this chip generation.
    #[error("falcon not present on this chip")]
    NotFound,
    /// A register did not hold the value just written to it.
    #[error("register readback mismatch")]
    ReadbackMismatch,
    /// No free region-table slot or no gap in the carve-out window.
    #[error("no space for region")]
    NoSpace,
}

/// Coarse grouping of [`AcrError`] used by callers deciding how to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller bug.
    Argument,
    /// Hardware or sequencing fault.
    HardwareTiming,
    /// Deliberate refusal to proceed.
    Trust,
    /// Unknown engine or instance.
    Configuration,
    /// Register state contradicts what was just programmed.
    Hardware,
}

impl AcrError {
    pub const fn class(self) -> ErrorClass {
        match self {
            AcrError::InvalidArgument | AcrError::InvalidResetAddress => ErrorClass::Argument,
            AcrError::Timeout => ErrorClass::HardwareTiming,
            AcrError::UcodeRevoked | AcrError::InvalidChipId => ErrorClass::Trust,
            AcrError::NotFound => ErrorClass::Configuration,
            AcrError::InvalidOperation | AcrError::ReadbackMismatch | AcrError::NoSpace => {
                ErrorClass::Hardware
            }
        }
    }

    /// Always `false`: timeouts and trust failures end the boot attempt.
    pub const fn is_retryable(self) -> bool {
        false
    }
}

/// Status word reported to the command dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AcrStatus {
    Ok = 0,
    InvalidArgument = 1,
    InvalidResetAddress = 2,
    UcodeRevoked = 3,
    InvalidChipId = 4,
    Timeout = 5,
    InvalidOperation = 6,
    NotFound = 7,
    ReadbackMismatch = 8,
    NoSpace = 9,
}

impl From<AcrError> for AcrStatus {
    fn from(err: AcrError) -> Self {
        match err {
            AcrError::InvalidArgument => AcrStatus::InvalidArgument,
            AcrError::InvalidResetAddress => AcrStatus::InvalidResetAddress,
            AcrError::UcodeRevoked => AcrStatus::UcodeRevoked,
            AcrError::InvalidChipId => AcrStatus::InvalidChipId,
            AcrError::Timeout => AcrStatus::Timeout,
            AcrError::InvalidOperation => AcrStatus::InvalidOperation,
            AcrError::NotFound => AcrStatus::NotFound,
            AcrError::ReadbackMismatch => AcrStatus::ReadbackMismatch,
            AcrError::NoSpace => AcrStatus::NoSpace,
        }
    }
}

impl<T> From<Result<T, AcrError>> for AcrStatus {
    fn from(result: Result<T, AcrError>) -> Self {
        match result {
            Ok(_) => AcrStatus::Ok,
            Err(err) => err.into(),
        }
    }
}

impl AcrStatus {
    pub const fn code(self) -> u32 {
        self as u32
    }
}
