/// Fake drives for reconciliation tests
///
/// Stands in for smartctl and /sys/block so runs can be replayed without
/// hardware.
use scterc_tune::drives::{DeviceEnumerator, DiagnosticQuery};
use scterc_tune::{DriveReading, ErcValue};
use std::cell::RefCell;
use std::collections::HashMap;

/// Mock drive registry: device path -> reading
#[derive(Default)]
pub struct MockDrives {
    order: Vec<String>,
    readings: HashMap<String, DriveReading>,
    queried: RefCell<Vec<String>>,
}

#[allow(dead_code)]
impl MockDrives {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive that reports a numeric SCT ERC timeout
    pub fn with_erc(self, device: &str, serial: &str, raw: u32) -> Self {
        self.with_reading(DriveReading::new(device, serial, Some(ErcValue::Numeric(raw))))
    }

    /// Drive with SCT ERC disabled
    pub fn with_erc_disabled(self, device: &str, serial: &str) -> Self {
        self.with_reading(DriveReading::new(
            device,
            serial,
            Some(ErcValue::Text("Disabled".to_string())),
        ))
    }

    /// Drive that does not support SCT ERC at all
    pub fn without_erc(self, device: &str, serial: &str) -> Self {
        self.with_reading(DriveReading::new(device, serial, None))
    }

    /// Device that is enumerated but has no SMART
    pub fn without_smart(mut self, device: &str) -> Self {
        self.order.push(device.to_string());
        self
    }

    pub fn with_reading(mut self, reading: DriveReading) -> Self {
        self.order.push(reading.device_id.clone());
        self.readings.insert(reading.device_id.clone(), reading);
        self
    }

    /// Devices queried so far, in order
    pub fn queried(&self) -> Vec<String> {
        self.queried.borrow().clone()
    }
}

impl DeviceEnumerator for MockDrives {
    fn devices(&self) -> Vec<String> {
        self.order.clone()
    }
}

impl DiagnosticQuery for MockDrives {
    fn query(&self, device: &str) -> Option<DriveReading> {
        self.queried.borrow_mut().push(device.to_string());
        self.readings.get(device).cloned()
    }
}
