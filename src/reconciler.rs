use crate::drives::{CorrectiveActions, DeviceEnumerator, DiagnosticQuery};
use crate::registry::Registry;
use crate::{
    CorrectiveAction, DriveReading, DriveResult, FAST_RECOVERY_TIMEOUT, HOST_TIMEOUT_SECS,
};
use serde::Serialize;
use std::fmt;

/// What happened to one drive during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DriveOutcome {
    /// First sighting; a row was appended with membership `unknown`
    NewlySeen {
        device: String,
        serial: String,
        supports_fast_recovery: bool,
        erc_display: String,
    },
    /// Registered RAID member; `applied` is false when the setter failed
    ActionIssued {
        device: String,
        serial: String,
        action: CorrectiveAction,
        applied: bool,
    },
    /// Known drive not marked as a RAID member
    NoChangeNeeded {
        device: String,
        serial: String,
        raid_membership: String,
    },
}

impl DriveOutcome {
    pub fn serial(&self) -> &str {
        match self {
            DriveOutcome::NewlySeen { serial, .. }
            | DriveOutcome::ActionIssued { serial, .. }
            | DriveOutcome::NoChangeNeeded { serial, .. } => serial,
        }
    }
}

impl fmt::Display for DriveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveOutcome::NewlySeen {
                device,
                serial,
                supports_fast_recovery,
                erc_display,
            } => write!(
                f,
                "New drive {} ({}): SCT ERC support: {}, timeout: {}",
                serial,
                device,
                if *supports_fast_recovery { "yes" } else { "no" },
                erc_display
            ),
            DriveOutcome::ActionIssued {
                device,
                serial,
                action,
                applied: true,
            } => write!(f, "{} ({}): {}", serial, device, action),
            DriveOutcome::ActionIssued {
                device,
                serial,
                action,
                applied: false,
            } => write!(f, "{} ({}): FAILED: {}", serial, device, action),
            DriveOutcome::NoChangeNeeded { device, serial, .. } => {
                write!(f, "{} ({}): no changes needed", serial, device)
            }
        }
    }
}

/// Everything one run did, in device order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<DriveOutcome>,
}

impl RunReport {
    pub fn new_drives(&self) -> impl Iterator<Item = &DriveOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DriveOutcome::NewlySeen { .. }))
    }

    pub fn has_new_drives(&self) -> bool {
        self.new_drives().next().is_some()
    }

    pub fn actions(&self) -> impl Iterator<Item = (&str, CorrectiveAction)> {
        self.outcomes.iter().filter_map(|o| match o {
            DriveOutcome::ActionIssued { device, action, .. } => Some((device.as_str(), *action)),
            _ => None,
        })
    }
}

/// Matches drive readings against the registry and picks the timeout fix for
/// each known RAID member.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    erc_timeout: u32,
    host_timeout_secs: u32,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(FAST_RECOVERY_TIMEOUT, HOST_TIMEOUT_SECS)
    }
}

impl Reconciler {
    pub fn new(erc_timeout: u32, host_timeout_secs: u32) -> Self {
        Self {
            erc_timeout,
            host_timeout_secs,
        }
    }

    /// Choose the fix from the live reading; the stored support snapshot is
    /// never consulted.
    pub fn action_for(&self, reading: &DriveReading) -> CorrectiveAction {
        if reading.supports_fast_recovery() {
            CorrectiveAction::SetFastRecoveryTimeout {
                raw: self.erc_timeout,
            }
        } else {
            CorrectiveAction::SetHostTimeout {
                seconds: self.host_timeout_secs,
            }
        }
    }

    /// Reconcile one reading. `Ok(None)` means the drive could not be
    /// identified and was skipped.
    pub fn reconcile(
        &self,
        registry: &mut Registry,
        actions: &mut dyn CorrectiveActions,
        reading: &DriveReading,
    ) -> DriveResult<Option<DriveOutcome>> {
        let serial = reading.serial.as_str();
        if serial.is_empty() {
            tracing::debug!(device = %reading.device_id, "No serial number, skipping");
            return Ok(None);
        }
        if serial.contains(',') {
            tracing::warn!(device = %reading.device_id, "Serial {:?} contains a comma, skipping", serial);
            return Ok(None);
        }

        let membership = registry
            .lookup(serial)
            .map(|row| (row.is_raid_member(), row.raid_membership.clone()));

        let outcome = match membership {
            None => {
                registry.insert_new(serial, reading.supports_fast_recovery())?;
                tracing::info!(device = %reading.device_id, serial = %serial, "Registered new drive");
                DriveOutcome::NewlySeen {
                    device: reading.device_id.clone(),
                    serial: serial.to_string(),
                    supports_fast_recovery: reading.supports_fast_recovery(),
                    erc_display: reading.erc_display(),
                }
            }
            Some((false, raid_membership)) => DriveOutcome::NoChangeNeeded {
                device: reading.device_id.clone(),
                serial: serial.to_string(),
                raid_membership,
            },
            Some((true, _)) => {
                let action = self.action_for(reading);
                let applied = match actions.apply(&reading.device_id, action) {
                    Ok(()) => {
                        tracing::info!(device = %reading.device_id, serial = %serial, "Applied {}", action);
                        true
                    }
                    Err(e) => {
                        tracing::warn!(device = %reading.device_id, serial = %serial, "Failed to apply {}: {}", action, e);
                        false
                    }
                };
                DriveOutcome::ActionIssued {
                    device: reading.device_id.clone(),
                    serial: serial.to_string(),
                    action,
                    applied,
                }
            }
        };

        Ok(Some(outcome))
    }

    /// Reconcile a batch of readings in order.
    pub fn reconcile_all<'r>(
        &self,
        registry: &mut Registry,
        actions: &mut dyn CorrectiveActions,
        readings: impl IntoIterator<Item = &'r DriveReading>,
    ) -> DriveResult<RunReport> {
        let mut report = RunReport::default();
        for reading in readings {
            if let Some(outcome) = self.reconcile(registry, actions, reading)? {
                report.outcomes.push(outcome);
            }
        }
        Ok(report)
    }

    /// Enumerate, query and reconcile every device, one at a time.
    /// `on_outcome` sees each outcome as soon as it is decided.
    pub fn run(
        &self,
        enumerator: &dyn DeviceEnumerator,
        query: &dyn DiagnosticQuery,
        registry: &mut Registry,
        actions: &mut dyn CorrectiveActions,
        mut on_outcome: impl FnMut(&DriveOutcome),
    ) -> DriveResult<RunReport> {
        let mut report = RunReport::default();

        for device in enumerator.devices() {
            let Some(reading) = query.query(&device) else {
                continue;
            };

            if let Some(outcome) = self.reconcile(registry, actions, &reading)? {
                on_outcome(&outcome);
                report.outcomes.push(outcome);
            }
        }

        Ok(report)
    }
}
