use crate::{DriveError, DriveResult, FAST_RECOVERY_TIMEOUT, HOST_TIMEOUT_SECS};
use ::config::{Config, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables with this prefix override the config file,
/// e.g. `SCTERC_TUNE_REGISTRY_PATH`.
pub const ENV_PREFIX: &str = "SCTERC_TUNE";

pub const DEFAULT_REGISTRY_PATH: &str = "/var/lib/scterc-tune/drives.csv";

/// Drives slower than this to give up on a bad sector would be evicted
/// anyway; the host timeout has to be longer.
const CONSUMER_RECOVERY_WINDOW_SECS: u32 = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub registry_path: PathBuf,
    pub smartctl_path: PathBuf,
    pub sysfs_root: PathBuf,
    pub dev_root: PathBuf,
    /// Raw SCT ERC units (100 ms each)
    pub erc_timeout: u32,
    pub host_timeout_secs: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registry_path: PathBuf::from(DEFAULT_REGISTRY_PATH),
            smartctl_path: PathBuf::from("smartctl"),
            sysfs_root: PathBuf::from("/sys"),
            dev_root: PathBuf::from("/dev"),
            erc_timeout: FAST_RECOVERY_TIMEOUT,
            host_timeout_secs: HOST_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Defaults, then the config file, then `SCTERC_TUNE_*` variables.
    /// An explicit `config_file` must exist; the per-user default may not.
    pub fn load(config_file: Option<&Path>) -> DriveResult<Self> {
        let settings = match config_file {
            Some(path) => Self::build(Some((path, true)), true),
            None => {
                let default_file = Self::default_config_file();
                Self::build(default_file.as_deref().map(|p| (p, false)), true)
            }
        }?;

        settings.validate()?;
        tracing::debug!(?settings, "Loaded settings");
        Ok(settings)
    }

    /// Defaults overlaid with a single TOML file, ignoring the environment.
    pub fn from_file(path: &Path) -> DriveResult<Self> {
        let settings = Self::build(Some((path, true)), false)?;
        settings.validate()?;
        Ok(settings)
    }

    /// `config.toml` in the platform config directory, if one can be found.
    pub fn default_config_file() -> Option<PathBuf> {
        ProjectDirs::from("", "", "scterc-tune").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn build(file: Option<(&Path, bool)>, with_env: bool) -> DriveResult<Self> {
        let defaults = Self::default();

        let mut builder = Config::builder()
            .set_default("registry_path", path_value(&defaults.registry_path))
            .and_then(|b| b.set_default("smartctl_path", path_value(&defaults.smartctl_path)))
            .and_then(|b| b.set_default("sysfs_root", path_value(&defaults.sysfs_root)))
            .and_then(|b| b.set_default("dev_root", path_value(&defaults.dev_root)))
            .and_then(|b| b.set_default("erc_timeout", i64::from(defaults.erc_timeout)))
            .and_then(|b| b.set_default("host_timeout_secs", i64::from(defaults.host_timeout_secs)))
            .map_err(config_error)?;

        if let Some((path, required)) = file {
            builder = builder.add_source(
                File::from(path.to_path_buf())
                    .format(FileFormat::Toml)
                    .required(required),
            );
        }

        if with_env {
            builder = builder.add_source(Environment::with_prefix(ENV_PREFIX));
        }

        builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(config_error)
    }

    pub fn validate(&self) -> DriveResult<()> {
        if self.erc_timeout == 0 {
            return Err(DriveError::Config(
                "erc_timeout must be greater than zero".to_string(),
            ));
        }

        if self.host_timeout_secs <= CONSUMER_RECOVERY_WINDOW_SECS {
            return Err(DriveError::Config(format!(
                "host_timeout_secs must exceed {}s, got {}",
                CONSUMER_RECOVERY_WINDOW_SECS, self.host_timeout_secs
            )));
        }

        Ok(())
    }
}

fn path_value(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn config_error(err: ConfigError) -> DriveError {
    DriveError::Config(err.to_string())
}
