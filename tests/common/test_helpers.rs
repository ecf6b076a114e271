/// Test helper functions for integration tests
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const HEADER: &str = "drive_serial,sctert_support,is_raid_disk";

/// Write a registry file with the header and the given lines
pub fn write_registry(dir: &Path, lines: &[&str]) -> PathBuf {
    let path = dir.join("drives.csv");
    let mut contents = format!("{}\n", HEADER);
    for line in lines {
        contents.push_str(line);
        contents.push('\n');
    }
    fs::write(&path, contents).unwrap();
    path
}

/// Fake /sys tree with a command timeout attribute per device
pub fn fake_sysfs(devices: &[&str]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for name in devices {
        let device_dir = temp.path().join("block").join(name).join("device");
        fs::create_dir_all(&device_dir).unwrap();
        fs::write(device_dir.join("timeout"), "30\n").unwrap();
    }
    temp
}

#[allow(dead_code)]
pub fn read_timeout(sysfs: &Path, name: &str) -> String {
    fs::read_to_string(sysfs.join("block").join(name).join("device/timeout"))
        .unwrap()
        .trim()
        .to_string()
}
