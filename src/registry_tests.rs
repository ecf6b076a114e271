/// Tests for the drive registry
///
/// This test suite covers:
/// - Parsing: header, blank lines, whitespace, malformed lines, extra commas
/// - Lookup semantics including duplicate serials
/// - Append-only persistence: header on first write, header and newline repair
/// - Reload after append

use crate::registry::*;
use crate::DriveError;
use std::fs;
use tempfile::TempDir;

fn row(serial: &str, support: &str, raid: &str) -> RegistryRow {
    RegistryRow {
        serial: serial.to_string(),
        supports_fast_recovery: support.to_string(),
        raid_membership: raid.to_string(),
    }
}

// ========================================================================
// Parsing
// ========================================================================

#[test]
fn test_parse_with_header() {
    let text = "drive_serial,sctert_support,is_raid_disk\nABC123DE,yes,yes\nFGH4I567,yes,no\n";
    let rows = Registry::parse(text);
    assert_eq!(
        rows,
        vec![row("ABC123DE", "yes", "yes"), row("FGH4I567", "yes", "no")]
    );
}

#[test]
fn test_parse_skips_blank_and_malformed_lines() {
    let text = "drive_serial,sctert_support,is_raid_disk\n\nABC123DE,yes,yes\nbroken-line\nonly,two\n,yes,no\n";
    let rows = Registry::parse(text);
    assert_eq!(rows, vec![row("ABC123DE", "yes", "yes")]);
}

#[test]
fn test_parse_trims_whitespace_and_crlf() {
    let text = "drive_serial,sctert_support,is_raid_disk\r\n ABC123DE , no , yes \r\n";
    let rows = Registry::parse(text);
    assert_eq!(rows, vec![row("ABC123DE", "no", "yes")]);
}

#[test]
fn test_parse_extra_commas_stay_in_membership() {
    let rows = Registry::parse("ABC123DE,yes,yes,array0\n");
    assert_eq!(rows[0].raid_membership, "yes,array0");
    assert!(!rows[0].is_raid_member());
}

#[test]
fn test_parse_without_header() {
    let rows = Registry::parse("ABC123DE,yes,unknown\n");
    assert_eq!(rows.len(), 1);
}

// ========================================================================
// Lookup and membership
// ========================================================================

#[test]
fn test_only_exact_yes_is_raid_member() {
    assert!(row("A", "yes", "yes").is_raid_member());
    for other in ["no", "unknown", "Yes", "YES", "y", "true", "yes please", ""] {
        assert!(
            !row("A", "yes", other).is_raid_member(),
            "{:?} must not count as a RAID member",
            other
        );
    }
}

#[test]
fn test_lookup_first_duplicate_wins() {
    let registry = Registry::from_rows(vec![
        row("DUP1", "yes", "no"),
        row("DUP1", "yes", "yes"),
    ]);
    assert_eq!(registry.lookup("DUP1").unwrap().raid_membership, "no");
    assert!(registry.lookup("MISSING").is_none());
}

#[test]
fn test_insert_new_in_memory() {
    let mut registry = Registry::in_memory();
    let inserted = registry.insert_new("NEW1", true).unwrap().cloned();
    assert_eq!(inserted, Some(row("NEW1", "yes", MEMBERSHIP_UNKNOWN)));

    let again = registry.insert_new("NEW1", false).unwrap();
    assert!(again.is_none());
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.lookup("NEW1").unwrap().supports_fast_recovery, "yes");
}

#[test]
fn test_insert_rejects_comma_in_serial() {
    let mut registry = Registry::in_memory();
    let result = registry.insert_new("AB,CD", true);
    assert!(matches!(result, Err(DriveError::Registry(_))));
    assert!(registry.is_empty());
}

#[test]
fn test_to_csv() {
    let registry = Registry::from_rows(vec![row("ABC123DE", "yes", "yes")]);
    assert_eq!(
        registry.to_csv(),
        "drive_serial,sctert_support,is_raid_disk\nABC123DE,yes,yes\n"
    );
}

// ========================================================================
// Persistence
// ========================================================================

#[test]
fn test_load_missing_file_is_empty() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("drives.csv");
    let registry = Registry::load(&path).unwrap();
    assert!(registry.is_empty());
    assert_eq!(registry.path(), Some(path.as_path()));
    assert!(!path.exists(), "loading must not create the file");
}

#[test]
fn test_first_append_writes_header() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state").join("drives.csv");

    let mut registry = Registry::load(&path).unwrap();
    registry.insert_new("ABC123DE", true).unwrap();
    registry.insert_new("FGH4I567", false).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(
        contents,
        "drive_serial,sctert_support,is_raid_disk\nABC123DE,yes,unknown\nFGH4I567,no,unknown\n"
    );
}

#[test]
fn test_append_preserves_operator_edits() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("drives.csv");
    let original = "drive_serial,sctert_support,is_raid_disk\nABC123DE,yes,yes\n";
    fs::write(&path, original).unwrap();

    let mut registry = Registry::load(&path).unwrap();
    registry.insert_new("NEW00001", false).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(contents, format!("{}NEW00001,no,unknown\n", original));
}

#[test]
fn test_append_repairs_missing_trailing_newline() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("drives.csv");
    fs::write(&path, "drive_serial,sctert_support,is_raid_disk\nABC123DE,yes,yes").unwrap();

    let mut registry = Registry::load(&path).unwrap();
    registry.insert_new("NEW00001", true).unwrap();

    let reloaded = Registry::load(&path).unwrap();
    assert_eq!(
        reloaded.rows(),
        &[row("ABC123DE", "yes", "yes"), row("NEW00001", "yes", "unknown")]
    );
}

#[test]
fn test_append_to_blank_file_writes_header() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("drives.csv");
    fs::write(&path, "\n").unwrap();

    let mut registry = Registry::load(&path).unwrap();
    assert!(registry.is_empty());
    registry.insert_new("ABC123DE", true).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "drive_serial,sctert_support,is_raid_disk\nABC123DE,yes,unknown\n"
    );
}

#[test]
fn test_append_restores_missing_header() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("drives.csv");
    fs::write(&path, "\nABC123DE,yes,yes\r\nFGH4I567,no,no").unwrap();

    let mut registry = Registry::load(&path).unwrap();
    assert_eq!(registry.len(), 2);
    registry.insert_new("NEW00001", false).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with(REGISTRY_HEADER));
    assert_eq!(
        contents,
        "drive_serial,sctert_support,is_raid_disk\nABC123DE,yes,yes\nFGH4I567,no,no\nNEW00001,no,unknown\n"
    );

    let reloaded = Registry::load(&path).unwrap();
    assert_eq!(reloaded.rows(), registry.rows());
}

#[test]
fn test_existing_serial_does_not_touch_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("drives.csv");
    let original = "drive_serial,sctert_support,is_raid_disk\nABC123DE,no,yes\n";
    fs::write(&path, original).unwrap();

    let mut registry = Registry::load(&path).unwrap();
    assert!(registry.insert_new("ABC123DE", true).unwrap().is_none());

    assert_eq!(fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn test_load_directory_is_an_error() {
    let temp = TempDir::new().unwrap();
    let result = Registry::load(temp.path());
    assert!(matches!(result, Err(DriveError::Registry(_))));
}
