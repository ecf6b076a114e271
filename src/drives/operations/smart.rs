use crate::{DriveError, DriveReading, DriveResult, ErcValue};
use regex::Regex;
use std::path::PathBuf;
use std::process::Command;

/// Answers "who is this drive and can it bound its own recovery time".
pub trait DiagnosticQuery {
    /// `None` when the device has no SMART support or could not be queried.
    /// A reading with an empty serial means the drive did not identify itself.
    fn query(&self, device: &str) -> Option<DriveReading>;
}

/// Diagnostic query backed by smartctl.
pub struct SMARTMonitor {
    smartctl: PathBuf,
}

impl Default for SMARTMonitor {
    fn default() -> Self {
        Self::new("smartctl")
    }
}

impl SMARTMonitor {
    pub fn new(smartctl: impl Into<PathBuf>) -> Self {
        Self {
            smartctl: smartctl.into(),
        }
    }

    /// Run `smartctl -i -l scterc` and return its stdout.
    pub(crate) fn read_identity_and_erc(&self, device: &str) -> DriveResult<String> {
        let output = Command::new(&self.smartctl)
            .args(["-i", "-l", "scterc", device])
            .output()
            .map_err(|e| DriveError::SMARTReadFailed(format!("smartctl failed to start: {}", e)))?;

        // smartctl's exit status is a bitmask; a non-zero value still
        // comes with a usable report most of the time
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("Permission denied") {
                return Err(DriveError::SMARTReadFailed(
                    "Insufficient permissions".to_string(),
                ));
            }
            tracing::debug!(device = %device, status = ?output.status.code(), "smartctl returned non-zero");
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Build a reading from smartctl's `-i -l scterc` report.
    pub fn parse_reading(device: &str, output: &str) -> Option<DriveReading> {
        if !Self::smart_available(output) {
            tracing::debug!(device = %device, "SMART unsupported, skipping");
            return None;
        }

        let serial = Self::parse_serial(output).unwrap_or_default();
        let erc = Self::parse_scterc(output);

        Some(DriveReading::new(device, serial, erc))
    }

    /// False only when smartctl explicitly reports SMART as unavailable.
    pub(crate) fn smart_available(output: &str) -> bool {
        !output.lines().any(|line| {
            let line = line.trim();
            line.starts_with("SMART support is:") && line.contains("Unavailable")
        })
    }

    pub(crate) fn parse_serial(output: &str) -> Option<String> {
        let re = Regex::new(r"(?mi)^serial number:[ \t]*(\S[^\r\n]*?)[ \t]*\r?$").ok()?;
        re.captures(output)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// The `Read:` setting under `SCT Error Recovery Control:`.
    pub(crate) fn parse_scterc(output: &str) -> Option<ErcValue> {
        let re = Regex::new(r"SCT Error Recovery Control:[ \t]*\r?\n\s*Read:[ \t]*(\S+)").ok()?;
        let value = re.captures(output)?.get(1)?.as_str();

        Some(match value.parse::<u32>() {
            Ok(raw) => ErcValue::Numeric(raw),
            Err(_) => ErcValue::Text(value.to_string()),
        })
    }
}

impl DiagnosticQuery for SMARTMonitor {
    fn query(&self, device: &str) -> Option<DriveReading> {
        match self.read_identity_and_erc(device) {
            Ok(output) => Self::parse_reading(device, &output),
            Err(e) => {
                tracing::warn!(device = %device, "{}", e);
                None
            }
        }
    }
}
