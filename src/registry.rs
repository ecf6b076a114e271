use crate::{DriveError, DriveResult};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// First line of every non-empty registry file.
pub const REGISTRY_HEADER: &str = "drive_serial,sctert_support,is_raid_disk";

/// Membership value written for drives the operator has not classified yet.
pub const MEMBERSHIP_UNKNOWN: &str = "unknown";

/// One known drive. `raid_membership` is the operator's field; only the exact
/// text `yes` marks a RAID member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryRow {
    pub serial: String,
    /// `yes`/`no` snapshot taken when the drive was first seen
    pub supports_fast_recovery: String,
    pub raid_membership: String,
}

impl RegistryRow {
    pub fn first_seen(serial: &str, supports_fast_recovery: bool) -> Self {
        Self {
            serial: serial.to_string(),
            supports_fast_recovery: yes_no(supports_fast_recovery).to_string(),
            raid_membership: MEMBERSHIP_UNKNOWN.to_string(),
        }
    }

    pub fn is_raid_member(&self) -> bool {
        self.raid_membership == "yes"
    }

    fn to_line(&self) -> String {
        format!(
            "{},{},{}",
            self.serial, self.supports_fast_recovery, self.raid_membership
        )
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Table of previously seen drives keyed by serial.
///
/// Loaded once at the start of a run; the only mutation is appending a row,
/// which is written through to the backing file immediately when there is one.
#[derive(Debug, Default)]
pub struct Registry {
    path: Option<PathBuf>,
    rows: Vec<RegistryRow>,
}

impl Registry {
    /// A table with no backing file
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<RegistryRow>) -> Self {
        Self { path: None, rows }
    }

    /// Load the table at `path`. A missing file is an empty table; it will be
    /// created on the first append. A file whose first line is not the
    /// header gets one on the first append.
    pub fn load(path: impl Into<PathBuf>) -> DriveResult<Self> {
        let path = path.into();

        let rows = match fs::read_to_string(&path) {
            Ok(contents) => Self::parse(&contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Registry file not found, starting empty");
                Vec::new()
            }
            Err(e) => {
                return Err(DriveError::Registry(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        tracing::debug!(path = %path.display(), rows = rows.len(), "Loaded registry");

        Ok(Self {
            path: Some(path),
            rows,
        })
    }

    /// Parse registry text. The header, blank lines and lines with fewer than
    /// three fields are skipped. No quoting: anything after the second comma
    /// belongs to the membership field.
    pub(crate) fn parse(contents: &str) -> Vec<RegistryRow> {
        let mut rows = Vec::new();

        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line == REGISTRY_HEADER {
                continue;
            }

            let fields: Vec<&str> = line.splitn(3, ',').map(str::trim).collect();
            if fields.len() < 3 || fields[0].is_empty() {
                tracing::warn!(line = index + 1, "Skipping malformed registry line: {}", line);
                continue;
            }

            rows.push(RegistryRow {
                serial: fields[0].to_string(),
                supports_fast_recovery: fields[1].to_string(),
                raid_membership: fields[2].to_string(),
            });
        }

        rows
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn rows(&self) -> &[RegistryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row with this serial.
    pub fn lookup(&self, serial: &str) -> Option<&RegistryRow> {
        self.rows.iter().find(|row| row.serial == serial)
    }

    /// Record a drive seen for the first time. Returns `Ok(None)` without
    /// touching anything when the serial is already known.
    pub fn insert_new(
        &mut self,
        serial: &str,
        supports_fast_recovery: bool,
    ) -> DriveResult<Option<&RegistryRow>> {
        if serial.contains(',') || serial.contains('\n') {
            return Err(DriveError::Registry(format!(
                "serial {:?} cannot be stored without quoting",
                serial
            )));
        }

        if self.lookup(serial).is_some() {
            return Ok(None);
        }

        let row = RegistryRow::first_seen(serial, supports_fast_recovery);
        if let Some(path) = &self.path {
            Self::append_line(path, &row.to_line())?;
        }

        self.rows.push(row);
        Ok(self.rows.last())
    }

    /// Render the whole table, header first.
    pub fn to_csv(&self) -> String {
        let mut out = String::from(REGISTRY_HEADER);
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.to_line());
            out.push('\n');
        }
        out
    }

    fn append_line(path: &Path, line: &str) -> DriveResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
            .map_err(|e| {
                DriveError::Registry(format!("cannot open {} for append: {}", path.display(), e))
            })?;

        let mut existing = String::new();
        file.read_to_string(&mut existing)?;

        if !Self::starts_with_header(&existing) {
            return Self::rewrite_with_header(path, &existing, line);
        }

        let mut pending = String::new();
        // Hand edits often drop the trailing newline
        if !existing.ends_with('\n') {
            pending.push('\n');
        }
        pending.push_str(line);
        pending.push('\n');

        file.write_all(pending.as_bytes())?;
        file.flush()?;

        tracing::debug!(path = %path.display(), "Appended registry row: {}", line);
        Ok(())
    }

    fn starts_with_header(contents: &str) -> bool {
        contents
            .lines()
            .next()
            .map_or(false, |first| first.trim() == REGISTRY_HEADER)
    }

    /// The file is empty, blank, or lost its header to a hand edit. Write it
    /// back with the header first, keeping every non-blank line in order.
    fn rewrite_with_header(path: &Path, existing: &str, line: &str) -> DriveResult<()> {
        let mut contents = String::from(REGISTRY_HEADER);
        contents.push('\n');

        let mut kept = 0;
        for old in existing.lines() {
            let trimmed = old.trim();
            if trimmed.is_empty() || trimmed == REGISTRY_HEADER {
                continue;
            }
            contents.push_str(old.trim_end_matches('\r'));
            contents.push('\n');
            kept += 1;
        }

        contents.push_str(line);
        contents.push('\n');

        if kept > 0 {
            tracing::warn!(path = %path.display(), "Registry had no header line, restoring it");
        }

        fs::write(path, contents).map_err(|e| {
            DriveError::Registry(format!("cannot write {}: {}", path.display(), e))
        })?;

        tracing::debug!(path = %path.display(), "Appended registry row: {}", line);
        Ok(())
    }
}
