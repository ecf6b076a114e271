// Drive discovery and per-drive operations
//
// Organized structure:
// - detection.rs: which block devices to query
// - operations/: SMART diagnostic query and the two timeout setters

pub mod detection;


pub mod operations;

pub use detection::{DeviceEnumerator, DriveDetector, ExplicitDevices};
pub use operations::{
    CorrectiveActions, DiagnosticQuery, DryRunActions, SMARTMonitor, TimeoutSetter,
};
