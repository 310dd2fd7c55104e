//! Sense data parsing and the informational-exceptions ASC/ASCQ tables.

use crate::models::trip::CheckStatus;

pub const ASC_IMPENDING_FAILURE: u8 = 0x5D;
pub const ASC_WARNING: u8 = 0x0B;

/// Sense key, ASC and ASCQ pulled out of fixed or descriptor sense data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenseCodes {
    pub key:  u8,
    pub asc:  u8,
    pub ascq: u8,
}

impl SenseCodes {
    pub fn parse(data: &[u8]) -> Option<Self> {
        match data.first()? & 0x7F {
            0x70 | 0x71 if data.len() >= 14 => Some(Self {
                key:  data[2] & 0x0F,
                asc:  data[12],
                ascq: data[13],
            }),
            0x72 | 0x73 if data.len() >= 4 => Some(Self {
                key:  data[1] & 0x0F,
                asc:  data[2],
                ascq: data[3],
            }),
            _ => None,
        }
    }
}

/// Verdict carried by an informational-exceptions ASC.
pub fn ie_status(asc: u8) -> CheckStatus {
    match asc {
        ASC_IMPENDING_FAILURE => CheckStatus::Fail,
        ASC_WARNING           => CheckStatus::Warning,
        _                     => CheckStatus::Pass,
    }
}

const IMPENDING: [&str; 6] = [
    "Hardware Impending Failure",
    "Controller Impending Failure",
    "Data Channel Impending Failure",
    "Servo Impending Failure",
    "Spindle Impending Failure",
    "Firmware Impending Failure",
];

const FAILURE_REASON: [&str; 14] = [
    "General Hard Drive Failure",
    "Drive Error Rate Too High",
    "Data Error Rate Too High",
    "Seek Error Rate Too High",
    "Too Many Block Reassigns",
    "Access Times Too High",
    "Start Unit Times Too High",
    "Channel Parametrics",
    "Controller Detected",
    "Throughput Performance",
    "Seek Time Performance",
    "Spin-Up Retry Count",
    "Drive Calibration Retry Count",
    "Power Loss Protection Circuit",
];

fn failure_prediction(ascq: u8) -> String {
    match ascq {
        0x00 => "Failure Prediction Threshold Exceeded".to_string(),
        0x01 => "Media Failure Prediction Threshold Exceeded".to_string(),
        0x02 => "Logical Unit Failure Prediction Threshold Exceeded".to_string(),
        0x03 => "Spare Area Exhaustion Prediction Threshold Exceeded".to_string(),
        0x04..=0x0F => format!("Failure Prediction Threshold Exceeded (resource {:#04x})", ascq),
        0x10..=0x6F => {
            let prefix = IMPENDING[usize::from(ascq >> 4) - 1];
            match FAILURE_REASON.get(usize::from(ascq & 0x0F)) {
                Some(reason) => format!("{} - {}", prefix, reason),
                None         => format!("{} - Unknown Failure Reason", prefix),
            }
        }
        0xFF => "Failure Prediction Threshold Exceeded (False)".to_string(),
        _    => format!("Vendor Specific Failure Prediction ({:#04x})", ascq),
    }
}

fn warning(ascq: u8) -> String {
    let text = match ascq {
        0x00 => "Warning",
        0x01 => "Warning - Specified Temperature Exceeded",
        0x02 => "Warning - Enclosure Degraded",
        0x03 => "Warning - Background Self-Test Failed",
        0x04 => "Warning - Background Pre-Scan Detected Medium Error",
        0x05 => "Warning - Background Medium Scan Detected Medium Error",
        0x06 => "Warning - Non-Volatile Cache Now Volatile",
        0x07 => "Warning - Degraded Power To Non-Volatile Cache",
        0x08 => "Warning - Power Loss Expected",
        0x09 => "Warning - Device Statistics Notification Active",
        0x0A => "Warning - High Critical Temperature Limit Exceeded",
        0x0B => "Warning - Low Critical Temperature Limit Exceeded",
        0x0C => "Warning - High Operating Temperature Limit Exceeded",
        0x0D => "Warning - Low Operating Temperature Limit Exceeded",
        0x0E => "Warning - High Critical Humidity Limit Exceeded",
        0x0F => "Warning - Low Critical Humidity Limit Exceeded",
        0x10 => "Warning - High Operating Humidity Limit Exceeded",
        0x11 => "Warning - Low Operating Humidity Limit Exceeded",
        0x12 => "Warning - Microcode Security At Risk",
        0x13 => "Warning - Microcode Digital Signature Validation Failure",
        0x14 => "Warning - Physical Element Status Change",
        _    => return format!("Warning - Unknown ({:#04x})", ascq),
    };
    text.to_string()
}

/// Human reason for an informational-exceptions ASC/ASCQ pair.
pub fn describe_ie(asc: u8, ascq: u8) -> String {
    match asc {
        ASC_IMPENDING_FAILURE => failure_prediction(ascq),
        ASC_WARNING           => warning(ascq),
        0x00 if ascq == 0     => "No Additional Sense Information".to_string(),
        _                     => format!("ASC {:#04x} ASCQ {:#04x}", asc, ascq),
    }
}
