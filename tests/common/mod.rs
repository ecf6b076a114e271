/// Common test utilities and fakes
///
/// This module provides shared functionality for integration tests including:
/// - Canned diagnostic readings keyed by device
/// - A fixed device list
/// - Registry and sysfs fixtures on disk

pub mod mock_drives;
pub mod test_helpers;
