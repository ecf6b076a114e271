// Drive operations
//
// smart.rs queries identity and SCT ERC state; timeout.rs applies the drive
// or host side timeout to RAID members.

pub mod smart; // SMART identity and SCT ERC query
pub mod timeout; // SCT ERC and block-device timeout setters

pub use smart::{DiagnosticQuery, SMARTMonitor};
pub use timeout::{CorrectiveActions, DryRunActions, TimeoutSetter};
