//! Per-family attribute tables: id → display name and raw interpretation.
//!
//! A family resolves to an ordered list of tables; the first table holding
//! an id wins. SSD families share one base table and override a handful of
//! entries each.

use super::raw::RawFormat;
use crate::models::device::VendorFamily;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrSpec {
    pub id:   u8,
    pub name: &'static str,
    pub raw:  RawFormat,
}

const fn a(id: u8, name: &'static str, raw: RawFormat) -> AttrSpec {
    AttrSpec { id, name, raw }
}

const HEX: RawFormat = RawFormat::RawHex;
const CNT: RawFormat = RawFormat::COUNTER;
const DW:  RawFormat = RawFormat::DWORD;
const W:   RawFormat = RawFormat::WORD;

// ── Seagate rotating media ───────────────────────────────────────────

const SEAGATE_HDD: &[AttrSpec] = &[
    a(1,   "Read Error Rate",               RawFormat::Decimal { msb: 5, lsb: 4 }),
    a(3,   "Spin Up Time",                  W),
    a(4,   "Start/Stop Count",              DW),
    a(5,   "Retired Sectors Count",         DW),
    a(7,   "Seek Error Rate",               RawFormat::Decimal { msb: 5, lsb: 4 }),
    a(9,   "Power On Hours",                DW),
    a(10,  "Spin Retry Count",              DW),
    a(12,  "Power Cycle Count",             DW),
    a(18,  "Head Health Self Assessment",   HEX),
    a(183, "PHY Counter Events",            DW),
    a(184, "IOEDC Count",                   DW),
    a(187, "Reported Un-correctable",       DW),
    a(188, "Command Timeout",               HEX),
    a(189, "High Fly Writes",               DW),
    a(190, "Airflow Temperature",           RawFormat::AirflowTemp),
    a(191, "Shock Sensor Counter",          DW),
    a(192, "Emergency Retract Count",       DW),
    a(193, "Load-Unload Count",             DW),
    a(194, "Temperature",                   RawFormat::TempWstLow),
    a(195, "ECC On The Fly Count",          DW),
    a(197, "Pending-Sparing Count",         DW),
    a(198, "Offline Uncorrectable Sectors", DW),
    a(199, "Ultra DMA CRC Error",           DW),
    a(200, "Pressure Measurement Limit",    HEX),
    a(230, "Life Curve Status",             HEX),
    a(231, "SSD Life Left",                 RawFormat::Percentage),
    a(240, "Head Flight Hours",             DW),
    a(241, "Lifetime Writes from Host",     CNT),
    a(242, "Lifetime Reads from Host",      CNT),
    a(254, "Free Fall Event",               DW),
];

/// Older Conner and Quantum designs reuse a few ids differently.
const SEAGATE_LEGACY: &[AttrSpec] = &[
    a(1,   "Raw Read Error Rate",           DW),
    a(7,   "Seek Error Rate",               DW),
    a(11,  "Calibration Retry Count",       DW),
    a(194, "Temperature",                   RawFormat::TempRawHighCur),
    a(196, "Reallocation Event Count",      DW),
];

// ── Seagate solid state ──────────────────────────────────────────────

const SSD_BASE: &[AttrSpec] = &[
    a(1,   "Raw Read Error Rate",             DW),
    a(5,   "Retired Block Count",             DW),
    a(9,   "Power On Hours",                  DW),
    a(12,  "Power Cycle Count",               DW),
    a(100, "Flash GB Erased",                 CNT),
    a(102, "Lifetime PS4 Entry Count",        DW),
    a(103, "Lifetime PS3 Exit Count",         DW),
    a(170, "Grown Bad Block Count",           DW),
    a(171, "Program Fail Count",              DW),
    a(172, "Erase Fail Count",                DW),
    a(173, "Average Program/Erase Count",     W),
    a(174, "Unexpected Power Loss Count",     DW),
    a(177, "Wear Range Delta",                DW),
    a(183, "SATA Downshift Count",            DW),
    a(187, "Uncorrectable RAISE Errors",      DW),
    a(194, "Temperature",                     RawFormat::TempRawHighCur),
    a(195, "ECC Rate",                        DW),
    a(196, "Reallocation Event Count",        DW),
    a(199, "SATA CRC Error Count",            DW),
    a(201, "Uncorrectable Read Error Rate",   DW),
    a(204, "Soft ECC Correction Rate",        DW),
    a(230, "Life Curve Status",               HEX),
    a(231, "SSD Life Left",                   RawFormat::Percentage),
    a(233, "Lifetime Writes to Flash",        RawFormat::DecimalGib),
    a(234, "Lifetime Reads from Flash",       RawFormat::DecimalGib),
    a(235, "Power Loss Protection Health",    HEX),
    a(241, "Lifetime Writes from Host",       RawFormat::DecimalGib),
    a(242, "Lifetime Reads from Host",        RawFormat::DecimalGib),
];

const SSD_VENDOR_B: &[AttrSpec] = &[
    a(171, "Program Fail Count",              RawFormat::Decimal { msb: 5, lsb: 2 }),
    a(177, "Endurance Remaining",             RawFormat::Percentage),
    a(241, "Lifetime Writes from Host",       RawFormat::DecimalMb),
    a(242, "Lifetime Reads from Host",        RawFormat::DecimalMb),
];

/// Vendor C and D share a controller and its attribute map.
const SSD_VENDOR_CD: &[AttrSpec] = &[
    a(11,  "Power Fail Backup Health",        HEX),
    a(169, "Remaining Life",                  RawFormat::Percentage),
    a(190, "Airflow Temperature",             RawFormat::TempNomWst),
    a(194, "Temperature",                     RawFormat::TempRawCurrentOnly),
    a(202, "Percentage Lifetime Used",        RawFormat::Percentage),
];

const SSD_VENDOR_E: &[AttrSpec] = &[
    a(167, "Write Protect Detail",            HEX),
    a(168, "SATA PHY Error Count",            DW),
    a(194, "Temperature",                     RawFormat::TempWstLow),
    a(245, "Lifetime Host Write Pages",       CNT),
];

/// Vendor F and G differ only in firmware packaging.
const SSD_VENDOR_FG: &[AttrSpec] = &[
    a(9,   "Power On Hours",                  RawFormat::Decimal { msb: 3, lsb: 0 }),
    a(175, "Program Fail Count Chip",         DW),
    a(176, "Erase Fail Count Chip",           DW),
    a(181, "Program Fail Count Total",        DW),
    a(182, "Erase Fail Count Total",          DW),
    a(231, "SSD Life Left",                   RawFormat::Percentage),
];

const SSD_VENDOR_K: &[AttrSpec] = &[
    a(173, "Maximum Erase Count",             W),
    a(174, "Unexpected Power Loss Count",     DW),
    a(194, "Temperature",                     RawFormat::TempNomWst),
    a(246, "Cumulative Host Sectors Written", CNT),
    a(247, "Host Program Page Count",         CNT),
    a(248, "Background Program Page Count",   CNT),
];

// ── Other vendors ────────────────────────────────────────────────────

const SAMSUNG: &[AttrSpec] = &[
    a(5,   "Reallocated Sector Count",        DW),
    a(9,   "Power On Hours",                  DW),
    a(12,  "Power Cycle Count",               DW),
    a(177, "Wear Leveling Count",             DW),
    a(179, "Used Reserved Block Count",       DW),
    a(181, "Program Fail Count",              DW),
    a(182, "Erase Fail Count",                DW),
    a(183, "Runtime Bad Block",               DW),
    a(187, "Uncorrectable Error Count",       DW),
    a(190, "Airflow Temperature",             RawFormat::TempRawCurrentOnly),
    a(194, "Temperature",                     RawFormat::TempRawHighCur),
    a(195, "ECC Error Rate",                  DW),
    a(199, "CRC Error Count",                 DW),
    a(235, "POR Recovery Count",              DW),
    a(241, "Total LBAs Written",              CNT),
];

const MAXTOR: &[AttrSpec] = &[
    a(1,   "Raw Read Error Rate",             DW),
    a(3,   "Spin Up Time",                    W),
    a(4,   "Start/Stop Count",                DW),
    a(5,   "Reallocated Sector Count",        DW),
    a(7,   "Seek Error Rate",                 DW),
    a(9,   "Power On Hours",                  DW),
    a(10,  "Spin Retry Count",                DW),
    a(11,  "Calibration Retry Count",         DW),
    a(12,  "Power Cycle Count",               DW),
    a(192, "Power-Off Retract Count",         DW),
    a(193, "Load Cycle Count",                DW),
    a(194, "Temperature",                     RawFormat::TempRawCurrentOnly),
    a(195, "Hardware ECC Recovered",          DW),
    a(196, "Reallocation Event Count",        DW),
    a(197, "Current Pending Sector",          DW),
    a(198, "Offline Uncorrectable",           DW),
    a(199, "UDMA CRC Error Count",            DW),
    a(200, "Write Error Rate",                DW),
    a(203, "Run Out Cancel",                  HEX),
    a(220, "Disk Shift",                      DW),
    a(222, "Loaded Hours",                    DW),
    a(223, "Load Retry Count",                DW),
    a(224, "Load Friction",                   DW),
    a(226, "Load-in Time",                    DW),
];

/// Ids whose meaning is common enough to decode on any drive.
const GENERIC: &[AttrSpec] = &[
    a(1,   "Read Error Rate",                 DW),
    a(4,   "Start/Stop Count",                DW),
    a(5,   "Reallocated Sector Count",        DW),
    a(7,   "Seek Error Rate",                 DW),
    a(9,   "Power On Hours",                  DW),
    a(12,  "Power Cycle Count",               DW),
    a(187, "Reported Uncorrectable Errors",   DW),
    a(194, "Temperature",                     RawFormat::TempRawCurrentOnly),
    a(197, "Current Pending Sector Count",    DW),
];

/// Tables consulted for `family`, in priority order.
pub fn tables_for(family: VendorFamily) -> &'static [&'static [AttrSpec]] {
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

pub fn lookup(family: VendorFamily, id: u8) -> Option<&'static AttrSpec> {
    tables_for(family)
        .iter()
        .find_map(|table| table.iter().find(|spec| spec.id == id))
}

pub fn name(family: VendorFamily, id: u8) -> Option<&'static str> {
    lookup(family, id).map(|spec| spec.name)
}

/// Raw interpretation for `id`; ids missing from every table render as hex.
pub fn raw_format(family: VendorFamily, id: u8) -> RawFormat {
    lookup(family, id).map(|spec| spec.raw).unwrap_or(RawFormat::RawHex)
}
