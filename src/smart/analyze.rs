//! Semantic decoders for the analyzed view.
//!
//! Like the name tables, decoders are data: each family resolves to an
//! ordered list of decode tables and the first table holding an id wins.
//! Most raw fields are a few integer spans, so an entry is usually a list of
//! [`Field`]s; the odd layouts get a hand-written function.

use crate::models::device::VendorFamily;
use crate::models::smart::Attribute;
use crate::util::bytes::bytes_to_u64;
use crate::util::human::{fmt_bytes, fmt_celsius, fmt_hours_ms};

const LBA: u64 = 512;
const MIB_32: u64 = 32 * 1024 * 1024;
const GIB: u64 = 1024 * 1024 * 1024;

/// One line of an analyzed raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Integer over raw bytes `msb..=lsb`.
    Count(&'static str, u8, u8),
    /// Integer over raw bytes `msb..=lsb` counting units of the given size.
    Volume(&'static str, u8, u8, u64),
    /// Percentage held in raw bytes `msb..=lsb`.
    RawPercent(&'static str, u8, u8),
    /// Normalized value read as a percentage.
    NominalPercent(&'static str),
    /// Temperature in one raw byte.
    Celsius(&'static str, u8),
    NominalCelsius(&'static str),
    WorstCelsius(&'static str),
    /// Set bits of raw bytes `msb..=lsb`.
    Bits(&'static str, u8, u8),
}

impl Field {
    fn render(&self, a: &Attribute) -> String {
        let span = |msb: u8, lsb: u8| bytes_to_u64(&a.raw, usize::from(msb), usize::from(lsb));
        match *self {
            Field::Count(label, msb, lsb) => format!("{}: {}", label, span(msb, lsb)),
            Field::Volume(label, msb, lsb, unit) => {
                let n = span(msb, lsb);
                format!("{}: {} ({})", label, n, fmt_bytes(n.saturating_mul(unit)))
            }
            Field::RawPercent(label, msb, lsb) => format!("{}: {}%", label, span(msb, lsb)),
            Field::NominalPercent(label)       => format!("{}: {}%", label, a.nominal),
            Field::Celsius(label, byte)        => {
                format!("{}: {}", label, fmt_celsius(i64::from(a.raw[usize::from(byte)])))
            }
            Field::NominalCelsius(label) => format!("{}: {}", label, fmt_celsius(i64::from(a.nominal))),
            Field::WorstCelsius(label)   => format!("{}: {}", label, fmt_celsius(i64::from(a.worst))),
            Field::Bits(label, msb, lsb) => {
                let value = span(msb, lsb);
                let set: Vec<String> = (0..64u32).filter(|&b| value & (1u64 << b) != 0).map(|b| b.to_string()).collect();
                if set.is_empty() {
                    format!("{}: none", label)
                } else {
                    format!("{}: {}", label, set.join(", "))
                }
            }
        }
    }
}

#[derive(Clone, Copy)]
pub enum Analysis {
    Fields(&'static [Field]),
    Custom(fn(&Attribute) -> Vec<String>),
}

#[derive(Clone, Copy)]
pub struct Decode {
    pub id:  u8,
    pub how: Analysis,
}

const fn f(id: u8, fields: &'static [Field]) -> Decode {
    Decode { id, how: Analysis::Fields(fields) }
}

const fn custom(id: u8, func: fn(&Attribute) -> Vec<String>) -> Decode {
    Decode { id, how: Analysis::Custom(func) }
}

use Field::{Bits, Celsius, Count, NominalCelsius, NominalPercent, RawPercent, Volume, WorstCelsius};

// ── Seagate rotating media ───────────────────────────────────────────

const SEAGATE_HDD: &[Decode] = &[
    f(1,   &[Count("Operations", 3, 0), Count("Errors", 5, 4)]),
    f(3,   &[Count("Spin up time (ms)", 1, 0)]),
    f(4,   &[Count("Spindle start/stop cycles", 3, 0)]),
    f(5,   &[Count("Retired sectors", 3, 0)]),
    f(7,   &[Count("Seeks", 3, 0), Count("Seek errors", 5, 4)]),
    custom(9, hours_with_remainder),
    f(10,  &[Count("Spin retries", 3, 0)]),
    f(12,  &[Count("Power cycles", 3, 0)]),
    custom(18, head_health),
    f(183, &[Count("PHY events", 3, 0)]),
    f(184, &[Count("End-to-end data path errors", 3, 0)]),
    f(187, &[Count("Uncorrectable errors reported to host", 3, 0)]),
    f(188, &[
        Count("Total command timeouts", 1, 0),
        Count("Commands completing in more than 5 s", 3, 2),
        Count("Commands completing in more than 7.5 s", 5, 4),
    ]),
    f(189, &[Count("High fly writes", 3, 0)]),
    f(190, &[
        Celsius("Current airflow temperature", 0),
        Celsius("Lowest this power cycle", 2),
        Celsius("Highest this power cycle", 3),
    ]),
    f(191, &[Count("Shock events", 3, 0)]),
    f(192, &[Count("Emergency retracts", 3, 0)]),
    f(193, &[Count("Load/unload cycles", 3, 0)]),
    f(194, &[
        Celsius("Current temperature", 0),
        Celsius("Highest recorded", 2),
        Celsius("Lowest recorded", 4),
    ]),
    f(195, &[Count("On-the-fly ECC corrections", 3, 0)]),
    f(197, &[Count("Sectors pending reallocation", 3, 0)]),
    f(198, &[Count("Uncorrectable sectors found offline", 3, 0)]),
    f(199, &[Count("Interface CRC errors", 3, 0)]),
    f(200, &[Count("Pressure limit events", 3, 0)]),
    f(231, &[NominalPercent("Endurance remaining")]),
    custom(240, head_flight_hours),
    f(241, &[Volume("LBAs written", 5, 0, LBA)]),
    f(242, &[Volume("LBAs read", 5, 0, LBA)]),
    f(254, &[Count("Free fall events", 3, 0)]),
];

const SEAGATE_LEGACY: &[Decode] = &[
    f(1,   &[Count("Read errors", 3, 0)]),
    f(7,   &[Count("Seek errors", 3, 0)]),
    f(11,  &[Count("Calibration retries", 3, 0)]),
    f(194, &[Celsius("Current temperature", 0), Celsius("Highest recorded", 2)]),
    f(196, &[Count("Reallocation events", 3, 0)]),
];

// ── Seagate solid state ──────────────────────────────────────────────

const SSD_BASE: &[Decode] = &[
    f(1,   &[Count("Read errors", 3, 0)]),
    f(5,   &[Count("Retired blocks", 3, 0)]),
    custom(9, plain_hours),
    f(12,  &[Count("Power cycles", 3, 0)]),
    f(100, &[Volume("Flash erased", 5, 0, GIB)]),
    f(170, &[Count("Grown bad blocks", 3, 0)]),
    f(171, &[Count("Program failures", 3, 0)]),
    f(172, &[Count("Erase failures", 3, 0)]),
    f(173, &[Count("Average program/erase cycles", 1, 0)]),
    f(174, &[Count("Unexpected power losses", 3, 0)]),
    f(177, &[Count("Wear range delta", 3, 0)]),
    f(183, &[Count("SATA downshifts", 3, 0)]),
    f(187, &[Count("Uncorrectable RAISE errors", 3, 0)]),
    f(194, &[Celsius("Current temperature", 0), Celsius("Highest recorded", 2)]),
    f(195, &[Count("ECC events", 3, 0)]),
    f(199, &[Count("Interface CRC errors", 3, 0)]),
    f(231, &[NominalPercent("Endurance remaining")]),
    f(233, &[Volume("Written to flash", 5, 0, GIB)]),
    f(234, &[Volume("Read from flash", 5, 0, GIB)]),
    f(241, &[Volume("Written by host", 5, 0, GIB)]),
    f(242, &[Volume("Read by host", 5, 0, GIB)]),
];

const SSD_VENDOR_B: &[Decode] = &[
    f(171, &[Count("Program failures", 5, 2)]),
    f(177, &[RawPercent("Endurance remaining", 3, 0)]),
    f(241, &[Volume("Written by host", 5, 0, MIB_32)]),
    f(242, &[Volume("Read by host", 5, 0, MIB_32)]),
];

const SSD_VENDOR_CD: &[Decode] = &[
    f(11,  &[Bits("Backup circuit faults", 1, 0)]),
    f(169, &[RawPercent("Life remaining", 3, 0)]),
    f(190, &[NominalCelsius("Current airflow temperature"), WorstCelsius("Highest airflow temperature")]),
    f(194, &[Celsius("Current temperature", 0)]),
    f(202, &[RawPercent("Lifetime used", 3, 0)]),
];

const SSD_VENDOR_E: &[Decode] = &[
    f(167, &[Bits("Write protect reasons", 3, 0)]),
    f(168, &[Count("SATA PHY errors", 3, 0)]),
    f(194, &[
        Celsius("Current temperature", 0),
        Celsius("Highest recorded", 2),
        Celsius("Lowest recorded", 4),
    ]),
    f(245, &[Count("Host pages written", 5, 0)]),
];

const SSD_VENDOR_FG: &[Decode] = &[
    f(175, &[Count("Program failures on worst chip", 3, 0)]),
    f(176, &[Count("Erase failures on worst chip", 3, 0)]),
    f(181, &[Count("Program failures", 3, 0)]),
    f(182, &[Count("Erase failures", 3, 0)]),
    f(231, &[RawPercent("Endurance remaining", 3, 0)]),
];

const SSD_VENDOR_K: &[Decode] = &[
    f(173, &[Count("Maximum erase count", 1, 0)]),
    f(174, &[Count("Unexpected power losses", 3, 0)]),
    f(194, &[NominalCelsius("Current temperature"), WorstCelsius("Highest recorded")]),
    f(246, &[Volume("Host sectors written", 5, 0, LBA)]),
    f(247, &[Count("Host pages programmed", 5, 0)]),
    f(248, &[Count("Background pages programmed", 5, 0)]),
];

// ── Other vendors ────────────────────────────────────────────────────

const SAMSUNG: &[Decode] = &[
    f(5,   &[Count("Reallocated sectors", 3, 0)]),
    custom(9, plain_hours),
    f(12,  &[Count("Power cycles", 3, 0)]),
    f(177, &[Count("Average program/erase cycles", 3, 0), NominalPercent("Wear remaining")]),
    f(179, &[Count("Used reserved blocks", 3, 0), NominalPercent("Reserve remaining")]),
    f(181, &[Count("Program failures", 3, 0)]),
    f(182, &[Count("Erase failures", 3, 0)]),
    f(183, &[Count("Runtime bad blocks", 3, 0)]),
    f(187, &[Count("Uncorrectable errors", 3, 0)]),
    f(190, &[Celsius("Current airflow temperature", 0)]),
    f(194, &[Celsius("Current temperature", 0), Celsius("Highest recorded", 2)]),
    f(195, &[Count("ECC errors", 3, 0)]),
    f(199, &[Count("Interface CRC errors", 3, 0)]),
    f(235, &[Count("Power-off recoveries", 3, 0)]),
    f(241, &[Volume("LBAs written", 5, 0, LBA)]),
];

const MAXTOR: &[Decode] = &[
    f(1,   &[Count("Read errors", 3, 0)]),
    f(3,   &[Count("Spin up time (ms)", 1, 0)]),
    f(4,   &[Count("Spindle start/stop cycles", 3, 0)]),
    f(5,   &[Count("Reallocated sectors", 3, 0)]),
    f(7,   &[Count("Seek errors", 3, 0)]),
    custom(9, plain_hours),
    f(10,  &[Count("Spin retries", 3, 0)]),
    f(11,  &[Count("Calibration retries", 3, 0)]),
    f(12,  &[Count("Power cycles", 3, 0)]),
    f(192, &[Count("Power-off retracts", 3, 0)]),
    f(193, &[Count("Load cycles", 3, 0)]),
    f(194, &[Celsius("Current temperature", 0)]),
    f(195, &[Count("Hardware ECC recoveries", 3, 0)]),
    f(196, &[Count("Reallocation events", 3, 0)]),
    f(197, &[Count("Sectors pending reallocation", 3, 0)]),
    f(198, &[Count("Uncorrectable sectors found offline", 3, 0)]),
    f(199, &[Count("Interface CRC errors", 3, 0)]),
    f(200, &[Count("Write errors", 3, 0)]),
    f(220, &[Count("Disk shift", 3, 0)]),
    f(222, &[Count("Loaded hours", 3, 0)]),
    f(223, &[Count("Load retries", 3, 0)]),
    f(224, &[Count("Load friction", 3, 0)]),
    f(226, &[Count("Load-in time", 3, 0)]),
];

const GENERIC: &[Decode] = &[
    f(1,   &[Count("Read errors", 3, 0)]),
    f(4,   &[Count("Spindle start/stop cycles", 3, 0)]),
    f(5,   &[Count("Reallocated sectors", 3, 0)]),
    f(7,   &[Count("Seek errors", 3, 0)]),
    custom(9, plain_hours),
    f(12,  &[Count("Power cycles", 3, 0)]),
    f(187, &[Count("Uncorrectable errors reported to host", 3, 0)]),
    f(194, &[Celsius("Current temperature", 0)]),
    f(197, &[Count("Sectors pending reallocation", 3, 0)]),
];

/// Decode tables consulted for `family`, in priority order.
pub fn decoders_for(family: VendorFamily) -> &'static [&'static [Decode]] {
    match family {
        VendorFamily::Seagate => &[SEAGATE_HDD],
        VendorFamily::SeagateConner | VendorFamily::SeagateQuantum => &[SEAGATE_LEGACY, SEAGATE_HDD],
        VendorFamily::SeagateVendorB => &[SSD_VENDOR_B, SSD_BASE],
        VendorFamily::SeagateVendorC | VendorFamily::SeagateVendorD => &[SSD_VENDOR_CD, SSD_BASE],
        VendorFamily::SeagateVendorE => &[SSD_VENDOR_E, SSD_BASE],
        VendorFamily::SeagateVendorF | VendorFamily::SeagateVendorG => &[SSD_VENDOR_FG, SSD_BASE],
        VendorFamily::SeagateVendorK => &[SSD_VENDOR_K, SSD_BASE],
        VendorFamily::Samsung => &[SAMSUNG],
        VendorFamily::Maxtor  => &[MAXTOR],
        VendorFamily::Default => &[GENERIC],
    }
}

pub fn decoder(family: VendorFamily, id: u8) -> Option<&'static Decode> {
    decoders_for(family)
        .iter()
        .find_map(|table| table.iter().find(|d| d.id == id))
}

/// Analyzed lines for `attr`, or `None` when the family has no decoder for it.
pub fn analyze(family: VendorFamily, attr: &Attribute) -> Option<Vec<String>> {
    decoder(family, attr.id).map(|d| match d.how {
        Analysis::Fields(fields) => fields.iter().map(|field| field.render(attr)).collect(),
        Analysis::Custom(func)   => func(attr),
    })
}

/// Human sentences for every status flag set on the attribute.
pub fn flag_sentences(flags: u16) -> Vec<&'static str> {
    const SENTENCES: [(u16, &str, &str); 6] = [
        (0x0001, "Pre-fail / warranty: a trip means the drive is failing", "Advisory: a trip is a warning only"),
        (0x0002, "Updated during normal operation", "Updated only during offline data collection"),
        (0x0004, "Performance related", ""),
        (0x0008, "Error rate", ""),
        (0x0010, "Event counter", ""),
        (0x0020, "Self-preserving", ""),
    ];
    SENTENCES
        .iter()
        .filter_map(|&(bit, set, clear)| {
            let text = if flags & bit != 0 { set } else { clear };
            (!text.is_empty()).then_some(text)
        })
        .collect()
}

fn hours_with_remainder(a: &Attribute) -> Vec<String> {
    let hours = bytes_to_u64(&a.raw, 3, 0);
    let ms = bytes_to_u64(&a.raw, 6, 4);
    vec![format!("Power on time: {}", fmt_hours_ms(hours, ms))]
}

fn head_flight_hours(a: &Attribute) -> Vec<String> {
    let hours = bytes_to_u64(&a.raw, 3, 0);
    let ms = bytes_to_u64(&a.raw, 6, 4);
    vec![format!("Head flight time: {}", fmt_hours_ms(hours, ms))]
}

fn plain_hours(a: &Attribute) -> Vec<String> {
    let hours = bytes_to_u64(&a.raw, 3, 0);
    vec![format!("Power on time: {} hours ({:.1} days)", hours, hours as f64 / 24.0)]
}

fn head_health(a: &Attribute) -> Vec<String> {
    let bitmap = bytes_to_u64(&a.raw, 3, 0);
    if bitmap == 0 {
        return vec!["No head has failed self assessment".to_string()];
    }
    let heads: Vec<String> = (0..32u32).filter(|&h| bitmap & (1u64 << h) != 0).map(|h| h.to_string()).collect();
    vec![format!("Heads failing self assessment: {}", heads.join(", "))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::smart::AttributeFlags;

    fn attr(id: u8, raw: [u8; 7]) -> Attribute {
        Attribute { id, flags: AttributeFlags(0x32), nominal: 90, worst: 70, raw, threshold: Some(0) }
    }

    fn lines(family: VendorFamily, a: &Attribute) -> Vec<String> {
        analyze(family, a).unwrap_or_else(|| panic!("no decoder for {} on {}", a.id, family))
    }

    #[test]
    fn power_on_hours_split() {
        // 1234 hours plus 125 000 ms
        let a = attr(9, [0xD2, 0x04, 0, 0, 0x48, 0xE8, 0x01]);
        assert_eq!(lines(VendorFamily::Seagate, &a), vec!["Power on time: 1234 hours, 2 minutes, 5 seconds"]);
        let a = attr(240, [0xD2, 0x04, 0, 0, 0x48, 0xE8, 0x01]);
        assert_eq!(lines(VendorFamily::Seagate, &a), vec!["Head flight time: 1234 hours, 2 minutes, 5 seconds"]);
    }

    #[test]
    fn head_bitmap() {
        assert_eq!(lines(VendorFamily::Seagate, &attr(18, [0; 7])), vec!["No head has failed self assessment"]);
        assert_eq!(
            lines(VendorFamily::Seagate, &attr(18, [0b1001, 0, 0, 0, 0, 0, 0])),
            vec!["Heads failing self assessment: 0, 3"]
        );
    }

    #[test]
    fn dispatch_depends_on_family() {
        assert!(decoder(VendorFamily::Seagate, 188).is_some());
        assert!(decoder(VendorFamily::Samsung, 188).is_none());
        assert!(decoder(VendorFamily::Default, 9).is_some());
        assert!(decoder(VendorFamily::Default, 241).is_none());
        assert!(analyze(VendorFamily::Maxtor, &attr(250, [0; 7])).is_none());
    }

    #[test]
    fn each_family_decodes_multi_field_values() {
        let cases: &[(VendorFamily, u8, u8, u8, [u8; 7], &[&str])] = &[
            (VendorFamily::Seagate, 1, 90, 70, [0x40, 0x42, 0x0F, 0x00, 0x03, 0x00, 0x00], &[
                "Operations: 1000000",
                "Errors: 3",
            ]),
            (VendorFamily::Seagate, 188, 100, 100, [0x05, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00], &[
                "Total command timeouts: 5",
                "Commands completing in more than 5 s: 2",
                "Commands completing in more than 7.5 s: 1",
            ]),
            (VendorFamily::Seagate, 190, 64, 55, [36, 0, 22, 45, 0, 0, 0], &[
                "Current airflow temperature: 36 C (96.8 F)",
                "Lowest this power cycle: 22 C (71.6 F)",
                "Highest this power cycle: 45 C (113.0 F)",
            ]),
            (VendorFamily::Seagate, 241, 100, 100, [0x00, 0x00, 0x20, 0x00, 0x00, 0x00, 0x00], &[
                "LBAs written: 2097152 (1.00 GB)",
            ]),
            (VendorFamily::SeagateQuantum, 194, 30, 20, [30, 0, 50, 0, 0, 0, 0], &[
                "Current temperature: 30 C (86.0 F)",
                "Highest recorded: 50 C (122.0 F)",
            ]),
            (VendorFamily::SeagateVendorB, 171, 100, 100, [0xFF, 0xFF, 0x07, 0x00, 0x00, 0x00, 0x00], &[
                "Program failures: 7",
            ]),
            (VendorFamily::SeagateVendorB, 241, 100, 100, [0x20, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], &[
                "Written by host: 32 (1.00 GB)",
            ]),
            (VendorFamily::SeagateVendorC, 190, 33, 61, [0; 7], &[
                "Current airflow temperature: 33 C (91.4 F)",
                "Highest airflow temperature: 61 C (141.8 F)",
            ]),
            (VendorFamily::SeagateVendorD, 11, 100, 100, [0x05, 0x00, 0, 0, 0, 0, 0], &[
                "Backup circuit faults: 0, 2",
            ]),
            (VendorFamily::SeagateVendorE, 194, 35, 20, [35, 0, 58, 0, 12, 0, 0], &[
                "Current temperature: 35 C (95.0 F)",
                "Highest recorded: 58 C (136.4 F)",
                "Lowest recorded: 12 C (53.6 F)",
            ]),
            (VendorFamily::SeagateVendorF, 231, 97, 97, [96, 0, 0, 0, 0, 0, 0], &[
                "Endurance remaining: 96%",
            ]),
            (VendorFamily::SeagateVendorG, 233, 100, 100, [0x00, 0x04, 0, 0, 0, 0, 0], &[
                "Written to flash: 1024 (1.00 TB)",
            ]),
            (VendorFamily::SeagateVendorK, 194, 40, 66, [0; 7], &[
                "Current temperature: 40 C (104.0 F)",
                "Highest recorded: 66 C (150.8 F)",
            ]),
            (VendorFamily::SeagateVendorK, 246, 100, 100, [0x00, 0x00, 0x00, 0x01, 0, 0, 0], &[
                "Host sectors written: 16777216 (8.00 GB)",
            ]),
            (VendorFamily::Samsung, 177, 94, 94, [0x2C, 0x01, 0, 0, 0, 0, 0], &[
                "Average program/erase cycles: 300",
                "Wear remaining: 94%",
            ]),
            (VendorFamily::Samsung, 179, 99, 99, [0x0A, 0, 0, 0, 0, 0, 0], &[
                "Used reserved blocks: 10",
                "Reserve remaining: 99%",
            ]),
            (VendorFamily::Maxtor, 9, 95, 95, [0x30, 0, 0, 0, 0, 0, 0], &[
                "Power on time: 48 hours (2.0 days)",
            ]),
            (VendorFamily::Maxtor, 5, 100, 100, [0x10, 0x01, 0, 0, 0xFF, 0, 0], &[
                "Reallocated sectors: 272",
            ]),
            (VendorFamily::Default, 197, 100, 100, [0x08, 0, 0, 0, 0x01, 0, 0], &[
                "Sectors pending reallocation: 8",
            ]),
        ];

        for (family, id, nominal, worst, raw, want) in cases {
            let a = Attribute { nominal: *nominal, worst: *worst, ..attr(*id, *raw) };
            assert_eq!(lines(*family, &a), *want, "{} attribute {}", family, id);
        }
    }

    #[test]
    fn common_seagate_ids_are_covered() {
        for id in [5, 183, 184, 187, 189, 191, 192, 193, 195, 197, 198, 199, 200] {
            assert!(decoder(VendorFamily::Seagate, id).is_some(), "id {}", id);
        }
        assert_eq!(
            lines(VendorFamily::Seagate, &attr(199, [0x0C, 0x00, 0, 0, 0, 0, 0])),
            vec!["Interface CRC errors: 12"]
        );
    }

    #[test]
    fn decode_tables_have_unique_ids() {
        for family in VendorFamily::ALL {
            for table in decoders_for(family) {
                let mut ids: Vec<u8> = table.iter().map(|d| d.id).collect();
                ids.sort_unstable();
                let before = ids.len();
                ids.dedup();
                assert_eq!(before, ids.len(), "{}", family);
            }
        }
    }

    #[test]
    fn flags_as_sentences() {
        let s = flag_sentences(0x0033);
        assert_eq!(s.len(), 4);
        assert!(s[0].starts_with("Pre-fail"));
        assert_eq!(flag_sentences(0)[0], "Advisory: a trip is a warning only");
    }
}
