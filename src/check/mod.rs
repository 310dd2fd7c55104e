//! SMART check: pass / warning / fail verdicts with a trip reason.
//!
//! ATA drives are judged by SMART RETURN STATUS (or the SCT status mirror)
//! and their attribute thresholds, SCSI drives by informational exceptions,
//! NVMe drives by the critical-warning byte of the health log.

pub mod ata;
pub mod guard;
pub mod nvme;
pub mod scsi;
pub mod sense;

use log::info;

pub use ata::check_ata;
pub use nvme::check_nvme;
pub use scsi::{check_scsi, MAX_IE_WAIT_MS};

use crate::error::Result;
use crate::models::trip::CheckResult;
use crate::transport::Device;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    /// Longest wait for an informational-exceptions poll, capped at one second.
    pub ie_wait_ms: u64,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self { ie_wait_ms: MAX_IE_WAIT_MS }
    }
}

pub fn smart_check(device: Device<'_>, opts: &CheckOptions) -> Result<CheckResult> {
    let result = match device {
        Device::Ata(dev)  => check_ata(dev, opts)?,
        Device::Scsi(dev) => check_scsi(dev, opts)?,
        Device::Nvme(dev) => check_nvme(dev)?,
    };
    info!(
        "{} SMART check: {}{}",
        device.kind().label(),
        result.status.label(),
        result.trip.as_ref().map(|t| format!(" ({})", t.reason)).unwrap_or_default()
    );
    Ok(result)
}
