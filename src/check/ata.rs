use log::{debug, warn};

use super::scsi::check_scsi;
use super::CheckOptions;
use crate::error::{alloc_zeroed, Error, Result};
use crate::models::device::VendorFamily;
use crate::models::smart::{Attribute, AttributeTable, TripState};
use crate::models::trip::{AtaStatusSource, CheckResult, CheckStatus, ProtocolFamily, TripDetail, TripInfo};
use crate::smart::parse::read_attributes;
use crate::smart::tables;
use crate::transport::{AtaTransport, SECTOR};
use crate::util::bytes::le_u16;

const SIGNATURE_PASS: (u8, u8) = (0x4F, 0xC2);
const SIGNATURE_FAIL: (u8, u8) = (0xF4, 0x2C);

/// SCT status formats newer than this mirror the SMART status.
const SCT_MIRROR_MIN_VERSION: u16 = 3;
const SCT_SMART_STATUS: usize = 214;

fn signature_status(mid: u8, high: u8) -> Option<CheckStatus> {
    match (mid, high) {
        SIGNATURE_PASS => Some(CheckStatus::Pass),
        SIGNATURE_FAIL => Some(CheckStatus::Fail),
        _              => None,
    }
}

fn sct_mirror(dev: &dyn AtaTransport) -> Result<Option<CheckStatus>> {
    let mut buf = alloc_zeroed(SECTOR)?;
    if let Err(e) = dev.sct_status(&mut buf) {
        debug!("SCT status unavailable: {}", e);
        return Ok(None);
    }
    let version = le_u16(&buf, 0);
    if version < SCT_MIRROR_MIN_VERSION {
        debug!("SCT status format {} carries no SMART status", version);
        return Ok(None);
    }
    Ok(signature_status(buf[SCT_SMART_STATUS], buf[SCT_SMART_STATUS + 1]))
}

/// Verdict from SMART RETURN STATUS, or from the SCT status mirror when the
/// returned registers carry neither signature.
fn device_status(dev: &dyn AtaTransport, sct_supported: bool) -> Result<Option<(CheckStatus, AtaStatusSource)>> {
    match dev.smart_return_status() {
        Ok(tf) => {
            if let Some(status) = signature_status(tf.lba_mid, tf.lba_high) {
                return Ok(Some((status, AtaStatusSource::ReturnStatus)));
            }
            debug!("SMART RETURN STATUS signature {:02X}/{:02X} not recognised", tf.lba_mid, tf.lba_high);
        }
        Err(e) => debug!("SMART RETURN STATUS failed: {}", e),
    }
    if !sct_supported {
        return Ok(None);
    }
    Ok(sct_mirror(dev)?.map(|s| (s, AtaStatusSource::SctStatus)))
}

fn attribute_label(family: VendorFamily, id: u8) -> String {
    match tables::name(family, id) {
        Some(name) => format!("{} [{}]", name, id),
        None       => format!("Attribute [{}]", id),
    }
}

/// Verdict and reason for one attribute, `None` when it has not tripped.
pub fn attribute_trip(family: VendorFamily, attr: &Attribute) -> Option<(CheckStatus, TripInfo)> {
    let state = attr.trip_state();
    let threshold = attr.threshold?;
    let label = attribute_label(family, attr.id);
    let reason = match state {
        TripState::Ok => return None,
        TripState::Failing => format!(
            "{} tripped! Current Value {} below Threshold {}",
            label, attr.nominal, threshold
        ),
        TripState::PreviouslyFailed => format!(
            "{} tripped! Worst Ever Value {} below Threshold {}",
            label, attr.worst, threshold
        ),
        TripState::AlwaysFailing => format!("{} tripped! Threshold is set to always fail", label),
    };
    let status = if state == TripState::AlwaysFailing || attr.flags.prefail() {
        CheckStatus::Fail
    } else {
        CheckStatus::Warning
    };
    let trip = TripInfo {
        protocol: ProtocolFamily::Ata,
        detail:   TripDetail::AtaAttribute {
            id:        attr.id,
            name:      tables::name(family, attr.id).map(str::to_string),
            nominal:   attr.nominal,
            worst:     attr.worst,
            threshold,
            prefail:   attr.flags.prefail(),
        },
        reason,
    };
    Some((status, trip))
}

/// Most severe attribute trip in the table; the first one wins a tie.
pub fn worst_attribute_trip(family: VendorFamily, table: &AttributeTable) -> Option<(CheckStatus, TripInfo)> {
    let mut worst: Option<(CheckStatus, TripInfo)> = None;
    for attr in &table.attributes {
        if let Some((status, trip)) = attribute_trip(family, attr) {
            debug!("{}", trip.reason);
            if worst.as_ref().map_or(true, |(w, _)| status.severity() > w.severity()) {
                worst = Some((status, trip));
            }
        }
    }
    worst
}

fn status_trip(source: AtaStatusSource) -> TripInfo {
    let reason = match source {
        AtaStatusSource::ReturnStatus => "SMART return status reports a threshold exceeded condition",
        AtaStatusSource::SctStatus    => "SCT status reports a threshold exceeded condition",
    };
    TripInfo {
        protocol: ProtocolFamily::Ata,
        detail:   TripDetail::AtaStatus { source },
        reason:   reason.to_string(),
    }
}

fn check_ata_smart(dev: &dyn AtaTransport) -> Result<CheckResult> {
    let features = dev.features();
    if !features.smart_enabled {
        return Ok(CheckResult::new(CheckStatus::NotSupported));
    }

    let mut result = match device_status(dev, features.sct_supported)? {
        Some((CheckStatus::Fail, source)) => CheckResult::with_trip(CheckStatus::Fail, status_trip(source)),
        Some((status, _))                 => CheckResult::new(status),
        None                              => CheckResult::new(CheckStatus::Unknown),
    };

    let table = match read_attributes(dev) {
        Ok(table) => table,
        Err(e @ Error::MemoryFailure(_)) => return Err(e),
        Err(e) => {
            warn!("SMART attributes unavailable: {}", e);
            return Ok(result);
        }
    };

    match worst_attribute_trip(dev.family(), &table) {
        Some((CheckStatus::Fail, trip)) => result = CheckResult::with_trip(CheckStatus::Fail, trip),
        Some((status, trip)) if result.status != CheckStatus::Fail => {
            result = CheckResult::with_trip(status, trip)
        }
        Some(_) => {}
        None if result.status == CheckStatus::Unknown && table.thresholds_loaded => {
            result = CheckResult::new(CheckStatus::Pass)
        }
        None => {}
    }
    Ok(result)
}

pub fn check_ata(dev: &dyn AtaTransport, opts: &CheckOptions) -> Result<CheckResult> {
    let result = check_ata_smart(dev)?;
    let undecided = matches!(result.status, CheckStatus::Unknown | CheckStatus::NotSupported);
    if !undecided || dev.interface().is_ide() {
        return Ok(result);
    }
    let scsi = match dev.as_scsi() {
        Some(scsi) => scsi,
        None       => return Ok(result),
    };
    debug!("ATA check undecided, trying informational exceptions through the translation layer");
    let translated = check_scsi(scsi, opts)?;
    if matches!(translated.status, CheckStatus::Unknown | CheckStatus::NotSupported) {
        Ok(result)
    } else {
        Ok(translated)
    }
}
