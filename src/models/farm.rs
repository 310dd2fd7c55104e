use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One of the seven FARM dataset kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubpageKind {
    Current,
    Factory,
    TimeSeries,
    Sticky,
    WorkloadTrace,
    Save,
    LongSave,
}

impl SubpageKind {
    /// Order in which present datasets appear in a combined file.
    pub const EMISSION_ORDER: [SubpageKind; 7] = [
        SubpageKind::Current,
        SubpageKind::Factory,
        SubpageKind::Save,
        SubpageKind::TimeSeries,
        SubpageKind::LongSave,
        SubpageKind::Sticky,
        SubpageKind::WorkloadTrace,
    ];

    /// Space padded 8-byte dataset signature.
    pub fn signature(&self) -> &'static [u8; 8] {
        match self {
            SubpageKind::Current       => b"FARM    ",
            SubpageKind::Factory       => b"FACTORY ",
            SubpageKind::TimeSeries    => b"FARMTIME",
            SubpageKind::Sticky        => b"FARMSTCK",
            SubpageKind::WorkloadTrace => b"WORKLDTC",
            SubpageKind::Save          => b"FARMSAVE",
            SubpageKind::LongSave      => b"FARMLONG",
        }
    }

    /// Bit position in the header content bitmap.
    pub fn bit(&self) -> u32 {
        match self {
            SubpageKind::Current       => 0,
            SubpageKind::Factory       => 1,
            SubpageKind::TimeSeries    => 2,
            SubpageKind::Sticky        => 3,
            SubpageKind::WorkloadTrace => 4,
            SubpageKind::Save          => 5,
            SubpageKind::LongSave      => 6,
        }
    }

    pub fn from_signature(sig: &[u8]) -> Option<SubpageKind> {
        SubpageKind::EMISSION_ORDER
            .iter()
            .copied()
            .find(|k| &k.signature()[..] == sig)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubpageKind::Current       => "Current",
            SubpageKind::Factory       => "Factory",
            SubpageKind::TimeSeries    => "Time Series",
            SubpageKind::Sticky        => "Sticky",
            SubpageKind::WorkloadTrace => "Workload Trace",
            SubpageKind::Save          => "Saved",
            SubpageKind::LongSave      => "Long Saved",
        }
    }
}

/// Where an ATA drive sources the FARM frames it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopySource {
    Disc,
    Flash,
}

impl FromStr for CopySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disc" | "disk" => Ok(CopySource::Disc),
            "flash"         => Ok(CopySource::Flash),
            other           => Err(format!("unknown copy source '{}' (disc or flash)", other)),
        }
    }
}

/// One 32-byte dataset descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetDescriptor {
    pub kind:     SubpageKind,
    /// Offset from the start of the file to the payload.
    pub offset:   u32,
    pub length:   u32,
    pub start_ms: u64,
    pub end_ms:   u64,
}

/// Summary of a produced or parsed combined FARM file.
#[derive(Debug, Clone, Serialize)]
pub struct FarmSummary {
    pub version:        (u16, u16, u16),
    pub interface:      String,
    pub model:          String,
    pub serial:         String,
    pub firmware:       String,
    pub header_length:  u16,
    pub content_bitmap: u32,
    pub descriptors:    Vec<DatasetDescriptor>,
    pub file_size:      u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_unique_and_cover_seven() {
        let mask = SubpageKind::EMISSION_ORDER
            .iter()
            .fold(0u32, |m, k| m | (1 << k.bit()));
        assert_eq!(mask, 0x7F);
    }

    #[test]
    fn signatures_round_trip() {
        for kind in SubpageKind::EMISSION_ORDER {
            assert_eq!(SubpageKind::from_signature(kind.signature()), Some(kind));
        }
        assert_eq!(SubpageKind::from_signature(b"NOTFARM "), None);
    }

    #[test]
    fn copy_source_parses() {
        assert_eq!("Flash".parse::<CopySource>(), Ok(CopySource::Flash));
        assert_eq!("disc".parse::<CopySource>(), Ok(CopySource::Disc));
        assert!("tape".parse::<CopySource>().is_err());
    }
}
