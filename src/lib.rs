// Allow uppercase acronyms for industry-standard terms like ERC, SCT
#![allow(clippy::upper_case_acronyms)]

pub mod drives;
pub mod reconciler;
pub mod registry;
pub mod settings;

// Re-export the pieces a run is assembled from
pub use reconciler::{DriveOutcome, Reconciler, RunReport};
pub use registry::{Registry, RegistryRow};
pub use settings::Settings;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriveError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Hardware command failed: {0}")]
    HardwareCommandFailed(String),

    #[error("SMART read failed: {0}")]
    SMARTReadFailed(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Insufficient permissions: {0}")]
    PermissionDenied(String),

    #[error("Drive not found: {0}")]
    NotFound(String),
}

pub type DriveResult<T> = Result<T, DriveError>;

/// Raw SCT ERC threshold requested for RAID members that can bound their own
/// recovery time. smartctl counts in units of 100 ms, so 70 is 7 seconds.
pub const FAST_RECOVERY_TIMEOUT: u32 = 70;

/// Host-side command timeout for RAID members without fast error recovery.
/// Consumer drives may retry a bad sector internally for well over 120s.
pub const HOST_TIMEOUT_SECS: u32 = 180;

/// The SCT ERC "Read:" value as smartctl reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErcValue {
    /// Timeout in raw ERC units (100 ms each)
    Numeric(u32),
    /// Anything else smartctl printed, e.g. `Disabled`
    Text(String),
}

/// One device's diagnostic answer for the current run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveReading {
    pub device_id: String,
    /// Empty when the drive gave no usable identification
    pub serial: String,
    pub erc: Option<ErcValue>,
}

impl DriveReading {
    pub fn new(device_id: impl Into<String>, serial: impl Into<String>, erc: Option<ErcValue>) -> Self {
        Self {
            device_id: device_id.into(),
            serial: serial.into(),
            erc,
        }
    }

    /// True when the drive reports a finite fast-error-recovery timeout.
    pub fn supports_fast_recovery(&self) -> bool {
        matches!(self.erc, Some(ErcValue::Numeric(_)))
    }

    pub fn raw_timeout(&self) -> Option<u32> {
        match self.erc {
            Some(ErcValue::Numeric(raw)) => Some(raw),
            _ => None,
        }
    }

    /// Human display of the ERC value; cosmetic only.
    pub fn erc_display(&self) -> String {
        erc_display(self.erc.as_ref())
    }
}

/// Numeric readings shown in whole seconds (raw / 10), text verbatim,
/// absent as an empty string.
pub fn erc_display(erc: Option<&ErcValue>) -> String {
    match erc {
        Some(ErcValue::Numeric(raw)) => format!("{}s", raw / 10),
        Some(ErcValue::Text(text)) => text.clone(),
        None => String::new(),
    }
}

/// The two corrective actions a RAID member can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CorrectiveAction {
    /// Drive-level SCT ERC threshold, raw units
    SetFastRecoveryTimeout { raw: u32 },
    /// OS block-device command timeout, seconds
    SetHostTimeout { seconds: u32 },
}

impl fmt::Display for CorrectiveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrectiveAction::SetFastRecoveryTimeout { raw } => {
                write!(f, "SCT ERC timeout set to {}s", raw / 10)
            }
            CorrectiveAction::SetHostTimeout { seconds } => {
                write!(f, "host command timeout set to {}s", seconds)
            }
        }
    }
}


#[cfg(test)]
mod registry_tests;
