//! Informational-exceptions check for SCSI devices, also used for ATA drives
//! reached through a translation layer.

use std::thread;
use std::time::Duration;

use log::{debug, warn};

use super::guard::{IeModePage, IeOverride, MRIE_ON_REQUEST};
use super::sense::{describe_ie, ie_status, SenseCodes};
use super::CheckOptions;
use crate::error::{alloc_zeroed, Error, Result};
use crate::models::trip::{CheckResult, CheckStatus, ProtocolFamily, TripDetail, TripInfo};
use crate::transport::{PageControl, ScsiTransport};
use crate::util::bytes::be_u16;

pub const IE_LOG_PAGE: u8 = 0x2F;
const IE_LOG_BUFFER: usize = 64;
const IE_GENERAL_PARAMETER: u16 = 0x0000;
const SENSE_BUFFER: usize = 252;

/// Upper bound on any informational-exceptions wait.
pub const MAX_IE_WAIT_MS: u64 = 1000;

fn verdict(sense_key: u8, asc: u8, ascq: u8) -> CheckResult {
    let status = ie_status(asc);
    if status == CheckStatus::Pass {
        return CheckResult::new(status);
    }
    CheckResult::with_trip(
        status,
        TripInfo {
            protocol: ProtocolFamily::Scsi,
            detail:   TripDetail::Scsi { sense_key, asc, ascq },
            reason:   describe_ie(asc, ascq),
        },
    )
}

/// What log page 0x2F had to say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IeLog {
    /// ASC/ASCQ of the general parameter (code 0000h).
    Codes(u8, u8),
    /// The first parameter is not the general one.
    UnexpectedParameter(u16),
    Unavailable,
}

fn read_ie_log(dev: &dyn ScsiTransport) -> Result<IeLog> {
    let mut buf = alloc_zeroed(IE_LOG_BUFFER)?;
    match dev.log_sense(IE_LOG_PAGE, 0, &mut buf) {
        Ok(n) if n >= 10 && buf[0] & 0x3F == IE_LOG_PAGE => match be_u16(&buf, 4) {
            IE_GENERAL_PARAMETER => Ok(IeLog::Codes(buf[8], buf[9])),
            code                 => Ok(IeLog::UnexpectedParameter(code)),
        },
        Ok(n) => {
            debug!("informational exceptions log too short or mislabelled ({} bytes)", n);
            Ok(IeLog::Unavailable)
        }
        Err(e) => {
            debug!("informational exceptions log unavailable: {}", e);
            Ok(IeLog::Unavailable)
        }
    }
}

fn request_sense(dev: &dyn ScsiTransport) -> CheckResult {
    let mut buf = [0u8; SENSE_BUFFER];
    match dev.request_sense(&mut buf) {
        Ok(n) => match SenseCodes::parse(&buf[..n.min(SENSE_BUFFER)]) {
            Some(s) => {
                debug!("REQUEST SENSE: key {:#x} asc {:#04x} ascq {:#04x}", s.key, s.asc, s.ascq);
                verdict(s.key, s.asc, s.ascq)
            }
            None => {
                warn!("REQUEST SENSE returned unrecognised sense data");
                CheckResult::new(CheckStatus::Unknown)
            }
        },
        Err(e) => {
            warn!("REQUEST SENSE failed: {}", e);
            CheckResult::new(CheckStatus::Unknown)
        }
    }
}

fn pause(ms: u64) {
    if ms > 0 {
        thread::sleep(Duration::from_millis(ms));
    }
}

pub fn check_scsi(dev: &dyn ScsiTransport, opts: &CheckOptions) -> Result<CheckResult> {
    match read_ie_log(dev)? {
        IeLog::Codes(asc, ascq) => {
            debug!("informational exceptions log: asc {:#04x} ascq {:#04x}", asc, ascq);
            return Ok(verdict(0, asc, ascq));
        }
        IeLog::UnexpectedParameter(code) => {
            warn!("informational exceptions log opens with parameter {:#06x}", code);
            return Ok(CheckResult::new(CheckStatus::Unknown));
        }
        IeLog::Unavailable => {}
    }

    let current = match IeModePage::read(dev, PageControl::Current) {
        Ok(page) => page,
        Err(e @ Error::MemoryFailure(_)) => return Err(e),
        Err(e) => {
            debug!("informational exceptions control page unavailable: {}", e);
            return Ok(CheckResult::new(CheckStatus::NotSupported));
        }
    };
    if current.mrie() == 0 {
        return Ok(CheckResult::new(CheckStatus::NotSupported));
    }

    let ceiling = opts.ie_wait_ms.min(MAX_IE_WAIT_MS);
    let natural = u64::from(current.interval()) * 100;
    if current.mrie() == MRIE_ON_REQUEST && natural <= ceiling {
        pause(natural);
        return Ok(request_sense(dev));
    }

    let saved = match IeModePage::read(dev, PageControl::Saved) {
        Ok(page) => page,
        Err(e @ Error::MemoryFailure(_)) => return Err(e),
        Err(e) => {
            debug!("saved informational exceptions page unavailable ({}), restoring current values", e);
            current.clone()
        }
    };
    let guard = match IeOverride::apply(dev, &current, current.with_reporting_of(&saved)) {
        Ok(guard) => guard,
        Err(e @ Error::MemoryFailure(_)) => return Err(e),
        Err(e) => {
            warn!("could not switch informational exceptions reporting: {}", e);
            return Ok(CheckResult::new(CheckStatus::Unknown));
        }
    };
    pause(ceiling);
    let result = request_sense(dev);
    guard.restore();
    Ok(result)
}
