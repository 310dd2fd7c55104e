use serde::Serialize;

use crate::error::ReturnCode;

/// Overall SMART-check verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckStatus {
    Pass,
    Warning,
    Fail,
    Unknown,
    NotSupported,
}

impl CheckStatus {
    pub fn code(&self) -> ReturnCode {
        match self {
            CheckStatus::Pass         => ReturnCode::Success,
            CheckStatus::Warning      => ReturnCode::InProgress,
            CheckStatus::Fail         => ReturnCode::Failure,
            CheckStatus::Unknown      => ReturnCode::Unknown,
            CheckStatus::NotSupported => ReturnCode::NotSupported,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CheckStatus::Pass         => "PASS",
            CheckStatus::Warning      => "WARNING",
            CheckStatus::Fail         => "FAIL",
            CheckStatus::Unknown      => "UNKNOWN",
            CheckStatus::NotSupported => "NOT SUPPORTED",
        }
    }

    /// Rank used when combining verdicts from several sources.
    pub fn severity(&self) -> u8 {
        match self {
            CheckStatus::NotSupported => 0,
            CheckStatus::Unknown      => 1,
            CheckStatus::Pass         => 2,
            CheckStatus::Warning      => 3,
            CheckStatus::Fail         => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProtocolFamily {
    Ata,
    Scsi,
    Nvme,
}

/// Where an ATA verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AtaStatusSource {
    ReturnStatus,
    SctStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TripDetail {
    /// A tripped attribute.
    AtaAttribute {
        id:        u8,
        name:      Option<String>,
        nominal:   u8,
        worst:     u8,
        threshold: u8,
        prefail:   bool,
    },
    /// SMART RETURN STATUS or the SCT status mirror reported a threshold exceeded.
    AtaStatus { source: AtaStatusSource },
    Scsi { sense_key: u8, asc: u8, ascq: u8 },
    Nvme { critical_warning: u8 },
}

/// Reason record attached to a failing or warning verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripInfo {
    pub protocol: ProtocolFamily,
    pub detail:   TripDetail,
    pub reason:   String,
}

/// Verdict plus optional reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    pub trip:   Option<TripInfo>,
}

impl CheckResult {
    pub fn new(status: CheckStatus) -> Self {
        Self { status, trip: None }
    }

    pub fn with_trip(status: CheckStatus, trip: TripInfo) -> Self {
        Self { status, trip: Some(trip) }
    }
}
