use std::fs;
use std::path::{Path, PathBuf};

/// Supplies the device paths to query, in order.
pub trait DeviceEnumerator {
    fn devices(&self) -> Vec<String>;
}

/// Scans `<sysfs_root>/block` for physical block devices.
pub struct DriveDetector {
    sysfs_root: PathBuf,
    dev_root: PathBuf,
}

impl Default for DriveDetector {
    fn default() -> Self {
        Self::new("/sys", "/dev")
    }
}

impl DriveDetector {
    pub fn new(sysfs_root: impl Into<PathBuf>, dev_root: impl Into<PathBuf>) -> Self {
        Self {
            sysfs_root: sysfs_root.into(),
            dev_root: dev_root.into(),
        }
    }

    /// Device paths for every candidate under /sys/block that also exists
    /// under /dev, sorted by name.
    pub fn detect_devices(&self) -> Vec<String> {
        let block_dir = self.sysfs_root.join("block");

        let entries = match fs::read_dir(&block_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %block_dir.display(), "Cannot list block devices: {}", e);
                return Vec::new();
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| !Self::should_skip_device(name))
            .collect();
        names.sort();

        names
            .into_iter()
            .map(|name| self.dev_root.join(name))
            .filter(|path| {
                let exists = path.exists();
                if !exists {
                    tracing::debug!(device = %path.display(), "No device node, skipping");
                }
                exists
            })
            .map(|path| path.to_string_lossy().into_owned())
            .collect()
    }

    /// Check if device should be skipped
    pub(crate) fn should_skip_device(device_name: &str) -> bool {
        // Virtual devices have no SCT ERC, and NVMe has no SCT at all
        device_name.starts_with("loop")
            || device_name.starts_with("ram")
            || device_name.starts_with("dm-")
            || device_name.starts_with("sr") // CD/DVD drives
            || device_name.starts_with("zram")
            || device_name.starts_with("md")
            || device_name.starts_with("nbd")
            || device_name.starts_with("nvme")
    }
}

impl DeviceEnumerator for DriveDetector {
    fn devices(&self) -> Vec<String> {
        self.detect_devices()
    }
}

/// Device paths given on the command line. Paths that do not exist are
/// dropped.
pub struct ExplicitDevices {
    paths: Vec<String>,
}

impl ExplicitDevices {
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }
}

impl DeviceEnumerator for ExplicitDevices {
    fn devices(&self) -> Vec<String> {
        self.paths
            .iter()
            .filter(|path| {
                let exists = Path::new(path.as_str()).exists();
                if !exists {
                    tracing::debug!(device = %path, "Device does not exist, skipping");
                }
                exists
            })
            .cloned()
            .collect()
    }
}
