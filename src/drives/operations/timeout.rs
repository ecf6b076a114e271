use crate::{CorrectiveAction, DriveError, DriveResult};
use std::fs;
use std::path::PathBuf;
use std::process::Command;

/// Applies a corrective action to one device. Fire-and-forget: callers do
/// not read the value back.
pub trait CorrectiveActions {
    fn apply(&mut self, device: &str, action: CorrectiveAction) -> DriveResult<()>;
}

/// Sets SCT ERC through smartctl and the host command timeout through sysfs.
pub struct TimeoutSetter {
    smartctl: PathBuf,
    sysfs_root: PathBuf,
}

impl Default for TimeoutSetter {
    fn default() -> Self {
        Self::new("smartctl", "/sys")
    }
}

impl TimeoutSetter {
    pub fn new(smartctl: impl Into<PathBuf>, sysfs_root: impl Into<PathBuf>) -> Self {
        Self {
            smartctl: smartctl.into(),
            sysfs_root: sysfs_root.into(),
        }
    }

    /// Set both the read and write SCT ERC thresholds.
    pub fn set_erc_timeout(&self, device: &str, raw: u32) -> DriveResult<()> {
        let setting = format!("scterc,{},{}", raw, raw);
        tracing::debug!(device = %device, "Running: smartctl -q errorsonly -l {}", setting);

        let output = Command::new(&self.smartctl)
            .args(["-q", "errorsonly", "-l", &setting, device])
            .output()
            .map_err(|e| DriveError::HardwareCommandFailed(format!("smartctl failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(DriveError::HardwareCommandFailed(format!(
                "smartctl -l {} {}: {}{}",
                setting,
                device,
                stdout.trim(),
                stderr.trim()
            )));
        }

        Ok(())
    }

    /// `<sysfs_root>/block/<name>/device/timeout` for a `/dev/<name>` path.
    /// Links such as `/dev/disk/by-id/...` are resolved to the kernel name first.
    pub fn host_timeout_path(&self, device: &str) -> DriveResult<PathBuf> {
        let resolved = fs::canonicalize(device).unwrap_or_else(|_| PathBuf::from(device));
        let name = resolved
            .file_name()
            .ok_or_else(|| DriveError::NotFound(format!("not a device path: {}", device)))?;

        Ok(self
            .sysfs_root
            .join("block")
            .join(name)
            .join("device")
            .join("timeout"))
    }

    /// Write the OS command timeout for the device's block queue.
    pub fn set_host_timeout(&self, device: &str, seconds: u32) -> DriveResult<()> {
        let path = self.host_timeout_path(device)?;
        if !path.exists() {
            return Err(DriveError::NotFound(format!(
                "no command timeout attribute at {}",
                path.display()
            )));
        }

        tracing::debug!("Writing {} to {}", seconds, path.display());
        fs::write(&path, format!("{}\n", seconds)).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                DriveError::PermissionDenied(format!("{}: {}", path.display(), e))
            }
            _ => DriveError::IoError(e),
        })
    }
}

impl CorrectiveActions for TimeoutSetter {
    fn apply(&mut self, device: &str, action: CorrectiveAction) -> DriveResult<()> {
        match action {
            CorrectiveAction::SetFastRecoveryTimeout { raw } => self.set_erc_timeout(device, raw),
            CorrectiveAction::SetHostTimeout { seconds } => self.set_host_timeout(device, seconds),
        }
    }
}

/// Records what would be applied and touches nothing.
#[derive(Debug, Default)]
pub struct DryRunActions {
    planned: Vec<(String, CorrectiveAction)>,
}

impl DryRunActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn planned(&self) -> &[(String, CorrectiveAction)] {
        &self.planned
    }
}

impl CorrectiveActions for DryRunActions {
    fn apply(&mut self, device: &str, action: CorrectiveAction) -> DriveResult<()> {
        tracing::info!(device = %device, "Dry run: would apply {}", action);
        self.planned.push((device.to_string(), action));
        Ok(())
    }
}
