use serde::Serialize;

/// Status flag word of an ATA SMART attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AttributeFlags(pub u16);

impl AttributeFlags {
    pub const PREFAIL:         u16 = 0x0001;
    pub const ONLINE:          u16 = 0x0002;
    pub const PERFORMANCE:     u16 = 0x0004;
    pub const ERROR_RATE:      u16 = 0x0008;
    pub const EVENT_COUNT:     u16 = 0x0010;
    pub const SELF_PRESERVING: u16 = 0x0020;

    pub fn has(&self, bit: u16) -> bool {
        self.0 & bit != 0
    }

    /// Prefail/warranty bit: a trip on this attribute is a failure.
    pub fn prefail(&self) -> bool {
        self.has(Self::PREFAIL)
    }
}

/// Threshold byte as interpreted by the trip rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ThresholdClass {
    AlwaysPassing,
    AlwaysFailing,
    Invalid,
    Value(u8),
}

impl ThresholdClass {
    pub fn of(threshold: u8) -> Self {
        match threshold {
            0x00 => ThresholdClass::AlwaysPassing,
            0xFF => ThresholdClass::AlwaysFailing,
            0xFE => ThresholdClass::Invalid,
            v    => ThresholdClass::Value(v),
        }
    }
}

/// Nominal and worst values outside 1..=253 suppress threshold comparison.
pub fn value_in_range(v: u8) -> bool {
    (1..=253).contains(&v)
}

/// Outcome of comparing one attribute against its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TripState {
    Ok,
    /// Current nominal value is at or below the threshold.
    Failing,
    /// Only the worst-ever value reached the threshold.
    PreviouslyFailed,
    AlwaysFailing,
}

impl TripState {
    pub fn tripped(&self) -> bool {
        !matches!(self, TripState::Ok)
    }
}

/// One 12-byte attribute record joined with its threshold record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub id:        u8,
    pub flags:     AttributeFlags,
    pub nominal:   u8,
    pub worst:     u8,
    pub raw:       [u8; 7],
    /// `None` when the threshold page was unavailable or held no record for this id.
    pub threshold: Option<u8>,
}

impl Attribute {
    pub fn trip_state(&self) -> TripState {
        let threshold = match self.threshold {
            Some(t) => t,
            None    => return TripState::Ok,
        };
        match ThresholdClass::of(threshold) {
            ThresholdClass::AlwaysPassing | ThresholdClass::Invalid => TripState::Ok,
            ThresholdClass::AlwaysFailing => TripState::AlwaysFailing,
            ThresholdClass::Value(t) => {
                if !value_in_range(self.nominal) || !value_in_range(self.worst) {
                    TripState::Ok
                } else if self.nominal <= t {
                    TripState::Failing
                } else if self.worst <= t {
                    TripState::PreviouslyFailed
                } else {
                    TripState::Ok
                }
            }
        }
    }

    /// Raw bytes 0..=5 as a plain little-endian counter.
    pub fn raw_counter(&self) -> u64 {
        crate::util::bytes::bytes_to_u64(&self.raw, 5, 0)
    }
}

/// Parsed SMART READ DATA sector with thresholds attached.
#[derive(Debug, Clone, Serialize)]
pub struct AttributeTable {
    pub version:           u16,
    pub attributes:        Vec<Attribute>,
    pub thresholds_loaded: bool,
    pub checksum_valid:    bool,
}

impl AttributeTable {
    pub fn get(&self, id: u8) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.id == id)
    }
}

/// NVMe SMART / Health Information log page (log id 0x02).
#[derive(Debug, Clone, Default, Serialize)]
pub struct NvmeHealth {
    pub critical_warning:          u8,
    pub temperature_kelvin:        u16,
    pub available_spare_pct:       u8,
    pub available_spare_threshold: u8,
    pub percentage_used:           u8,
    pub data_units_read:           u128,   // units of 1000 * 512 bytes
    pub data_units_written:        u128,
    pub host_read_commands:        u128,
    pub host_write_commands:       u128,
    pub controller_busy_minutes:   u128,
    pub power_cycles:              u128,
    pub power_on_hours:            u128,
    pub unsafe_shutdowns:          u128,
    pub media_errors:              u128,
    pub error_log_entries:         u128,
    pub warning_temp_minutes:      u32,
    pub critical_temp_minutes:     u32,
    pub temperature_sensors:       Vec<u16>,
}

impl NvmeHealth {
    pub const PAGE_LEN: usize = 512;

    pub fn parse(page: &[u8]) -> Option<Self> {
        use crate::util::bytes::{le_u128, le_u16, le_u32};
        if page.len() < Self::PAGE_LEN {
            return None;
        }
        let temperature_sensors = (0..8)
            .map(|i| le_u16(page, 200 + i * 2))
            .filter(|&t| t != 0)
            .collect();
        Some(NvmeHealth {
            critical_warning:          page[0],
            temperature_kelvin:        le_u16(page, 1),
            available_spare_pct:       page[3],
            available_spare_threshold: page[4],
            percentage_used:           page[5],
            data_units_read:           le_u128(page, 32),
            data_units_written:        le_u128(page, 48),
            host_read_commands:        le_u128(page, 64),
            host_write_commands:       le_u128(page, 80),
            controller_busy_minutes:   le_u128(page, 96),
            power_cycles:              le_u128(page, 112),
            power_on_hours:            le_u128(page, 128),
            unsafe_shutdowns:          le_u128(page, 144),
            media_errors:              le_u128(page, 160),
            error_log_entries:         le_u128(page, 176),
            warning_temp_minutes:      le_u32(page, 192),
            critical_temp_minutes:     le_u32(page, 196),
            temperature_sensors,
        })
    }

    pub fn temperature_celsius(&self) -> i64 {
        i64::from(self.temperature_kelvin) - 273
    }

    /// Approximate bytes read (1 unit = 512 000 bytes).
    pub fn bytes_read(&self) -> u128    { self.data_units_read    * 512 * 1000 }
    pub fn bytes_written(&self) -> u128 { self.data_units_written * 512 * 1000 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(nominal: u8, worst: u8, threshold: Option<u8>) -> Attribute {
        Attribute { id: 5, flags: AttributeFlags(0x33), nominal, worst, raw: [0; 7], threshold }
    }

    #[test]
    fn trip_rule() {
        assert_eq!(attr(100, 100, Some(36)).trip_state(), TripState::Ok);
        assert_eq!(attr(36, 36, Some(36)).trip_state(), TripState::Failing);
        assert_eq!(attr(90, 20, Some(36)).trip_state(), TripState::PreviouslyFailed);
        assert_eq!(attr(1, 1, Some(0)).trip_state(), TripState::Ok);
        assert_eq!(attr(100, 100, Some(0xFF)).trip_state(), TripState::AlwaysFailing);
        assert_eq!(attr(1, 1, Some(0xFE)).trip_state(), TripState::Ok);
        assert_eq!(attr(1, 1, None).trip_state(), TripState::Ok);
    }

    #[test]
    fn out_of_range_values_suppress_comparison() {
        assert_eq!(attr(0, 0, Some(36)).trip_state(), TripState::Ok);
        assert_eq!(attr(254, 10, Some(36)).trip_state(), TripState::Ok);
        assert_eq!(attr(20, 255, Some(36)).trip_state(), TripState::Ok);
    }

    #[test]
    fn nvme_health_page() {
        let mut page = vec![0u8; 512];
        page[0] = 0x02;
        page[1] = 0x3A; // 314 K
        page[2] = 0x01;
        page[3] = 100;
        page[4] = 10;
        page[5] = 3;
        page[128] = 0x10;
        let h = NvmeHealth::parse(&page).unwrap();
        assert_eq!(h.critical_warning, 2);
        assert_eq!(h.temperature_celsius(), 41);
        assert_eq!(h.power_on_hours, 16);
        assert!(NvmeHealth::parse(&page[..100]).is_none());
    }
}
