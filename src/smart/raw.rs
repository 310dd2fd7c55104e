//! Raw-field interpretations used by the hybrid view.

use serde::Serialize;

use crate::models::smart::Attribute;
use crate::util::bytes::bytes_to_u64;
use crate::util::human::fmt_bytes;

const MIB_32: u64 = 32 * 1024 * 1024;
const GIB: u64 = 1024 * 1024 * 1024;

/// How the seven raw bytes of an attribute are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RawFormat {
    /// All seven bytes as hex, most significant first.
    RawHex,
    /// Integer spanning bytes `msb..=lsb` (either order).
    Decimal { msb: u8, lsb: u8 },
    /// Counter of 32 MiB units.
    DecimalMb,
    /// Counter of GiB units.
    DecimalGib,
    Percentage,
    /// Current in byte 0, worst (highest) in byte 2, lowest in byte 4.
    TempWstLow,
    /// Current in byte 0, highest in byte 2.
    TempRawHighCur,
    TempRawCurrentOnly,
    /// Current in byte 0, low/high of this power cycle in bytes 2 and 3.
    AirflowTemp,
    /// Temperature carried by the nominal and worst values.
    TempNomWst,
}

impl RawFormat {
    pub const COUNTER: RawFormat = RawFormat::Decimal { msb: 5, lsb: 0 };
    pub const DWORD:   RawFormat = RawFormat::Decimal { msb: 3, lsb: 0 };
    pub const WORD:    RawFormat = RawFormat::Decimal { msb: 1, lsb: 0 };

    pub fn render(&self, attr: &Attribute) -> String {
        let raw = &attr.raw;
        match *self {
            RawFormat::RawHex => hex(raw),
            RawFormat::Decimal { msb, lsb } => {
                bytes_to_u64(raw, usize::from(msb), usize::from(lsb)).to_string()
            }
            RawFormat::DecimalMb => fmt_bytes(attr.raw_counter().saturating_mul(MIB_32)),
            RawFormat::DecimalGib => fmt_bytes(attr.raw_counter().saturating_mul(GIB)),
            RawFormat::Percentage => format!("{}%", bytes_to_u64(raw, 3, 0)),
            RawFormat::TempWstLow => {
                format!("{} C (Worst {} C, Lowest {} C)", raw[0], raw[2], raw[4])
            }
            RawFormat::TempRawHighCur => format!("{} C (Highest {} C)", raw[0], raw[2]),
            RawFormat::TempRawCurrentOnly => format!("{} C", raw[0]),
            RawFormat::AirflowTemp => {
                format!("{} C (Low {} C, High {} C)", raw[0], raw[2], raw[3])
            }
            RawFormat::TempNomWst => format!("{} C (Worst {} C)", attr.nominal, attr.worst),
        }
    }
}

/// Raw bytes as a 14-digit hex string, byte 6 first.
pub fn hex(raw: &[u8; 7]) -> String {
    raw.iter().rev().map(|b| format!("{:02X}", b)).collect()
}
