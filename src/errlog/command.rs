//! ATA command-register decoder.
//!
//! `describe_command` is a pure function of the registers captured in an
//! error-log command record. 28-bit commands carry LBA bits 27:24 in the low
//! nibble of the device register; `lba` holds whatever the log recorded
//! (24 bits for 28-bit logs, 48 bits for extended ones).

use serde::Serialize;

/// Registers written for one command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommandRegisters {
    pub command:  u8,
    pub features: u16,
    pub count:    u16,
    pub lba:      u64,
    pub device:   u8,
}

const DEVICE_LBA_MODE: u8 = 0x40;
const SMART_SIGNATURE: u16 = 0xC24F;
const LBA28_LIMIT: u64 = 0x0FFF_FFFF;

impl CommandRegisters {
    fn feature_lo(&self) -> u8 {
        (self.features & 0xFF) as u8
    }

    fn count_lo(&self) -> u8 {
        (self.count & 0xFF) as u8
    }

    fn lba_lo(&self) -> u8 {
        (self.lba & 0xFF) as u8
    }

    /// LBA mid and high as one word (mid in the low byte).
    fn lba_mid_high(&self) -> u16 {
        ((self.lba >> 8) & 0xFFFF) as u16
    }

    fn lba_mode(&self) -> bool {
        self.device & DEVICE_LBA_MODE != 0
    }

    /// 28-bit address: low three LBA bytes plus the device nibble.
    pub fn lba28(&self) -> u64 {
        (self.lba & 0x00FF_FFFF) | (u64::from(self.device & 0x0F) << 24)
    }

    fn chs(&self) -> (u16, u8, u8) {
        (self.lba_mid_high(), self.device & 0x0F, self.lba_lo())
    }
}

// ── Opcode classes ───────────────────────────────────────────────────

/// Opcodes using 48-bit register sets.
pub fn is_ext(command: u8) -> bool {
    matches!(
        command,
        0x24..=0x27 | 0x29..=0x2B | 0x2F | 0x34..=0x37 | 0x39..=0x3B | 0x3D..=0x3F
            | 0x42 | 0x44 | 0x45 | 0x47 | 0x4A | 0x57 | 0x60..=0x65 | 0x9F | 0xB4 | 0xCE | 0xEA
    )
}

pub fn is_streaming(command: u8) -> bool {
    matches!(command, 0x2A | 0x2B | 0x3A | 0x3B)
}

pub fn is_recalibrate(command: u8) -> bool {
    (0x10..=0x1F).contains(&command)
}

/// Commands whose LBA/count registers address user data.
pub fn is_data_transfer(command: u8) -> bool {
    matches!(
        command,
        0x20..=0x26 | 0x29..=0x2B | 0x30..=0x36 | 0x38..=0x3E | 0x40..=0x42 | 0x44 | 0x45
            | 0x60 | 0x61 | 0xC4 | 0xC5 | 0xC7..=0xCE
    )
}

fn data_command_name(command: u8) -> Option<&'static str> {
    Some(match command {
        0x20 => "Read Sectors",
        0x21 => "Read Sectors (No Retry)",
        0x22 => "Read Long",
        0x23 => "Read Long (No Retry)",
        0x24 => "Read Sectors Ext",
        0x25 => "Read DMA Ext",
        0x26 => "Read DMA Queued Ext",
        0x29 => "Read Multiple Ext",
        0x2A => "Read Stream DMA Ext",
        0x2B => "Read Stream Ext",
        0x30 => "Write Sectors",
        0x31 => "Write Sectors (No Retry)",
        0x32 => "Write Long",
        0x33 => "Write Long (No Retry)",
        0x34 => "Write Sectors Ext",
        0x35 => "Write DMA Ext",
        0x36 => "Write DMA Queued Ext",
        0x38 => "CFA Write Sectors Without Erase",
        0x39 => "Write Multiple Ext",
        0x3A => "Write Stream DMA Ext",
        0x3B => "Write Stream Ext",
        0x3C => "Write Verify",
        0x3D => "Write DMA FUA Ext",
        0x3E => "Write DMA Queued FUA Ext",
        0x40 => "Read Verify Sectors",
        0x41 => "Read Verify Sectors (No Retry)",
        0x42 => "Read Verify Sectors Ext",
        0x44 => "Zero Ext",
        0xC4 => "Read Multiple",
        0xC5 => "Write Multiple",
        0xC7 => "Read DMA Queued",
        0xC8 => "Read DMA",
        0xC9 => "Read DMA (No Retry)",
        0xCA => "Write DMA",
        0xCB => "Write DMA (No Retry)",
        0xCC => "Write DMA Queued",
        0xCD => "CFA Write Multiple Without Erase",
        0xCE => "Write Multiple FUA Ext",
        _ => return None,
    })
}

/// Name of a log address as used by read/write log commands.
pub fn log_address_name(address: u8) -> &'static str {
    match address {
        0x00 => "Log Directory",
        0x01 => "Summary SMART Error Log",
        0x02 => "Comprehensive SMART Error Log",
        0x03 => "Extended Comprehensive SMART Error Log",
        0x04 => "Device Statistics",
        0x05 => "CFA",
        0x06 => "SMART Self-Test Log",
        0x07 => "Extended SMART Self-Test Log",
        0x08 => "Power Conditions",
        0x09 => "Selective Self-Test Log",
        0x0A => "Device Statistics Notification",
        0x0C => "Pending Defects",
        0x0D => "LPS Mis-alignment",
        0x0F => "Sense Data For Successful NCQ Commands",
        0x10 => "NCQ Command Error",
        0x11 => "SATA Phy Event Counters",
        0x12 => "SATA NCQ Queue Management",
        0x13 => "SATA NCQ Send and Receive",
        0x14 => "Hybrid Information",
        0x15 => "Rebuild Assist",
        0x18 => "Command Duration Limits",
        0x19 => "LBA Status",
        0x20 => "Streaming Performance",
        0x21 => "Write Stream Error",
        0x22 => "Read Stream Error",
        0x24 => "Current Device Internal Status Data",
        0x25 => "Saved Device Internal Status Data",
        0x2F => "Sector Configuration",
        0x30 => "IDENTIFY DEVICE Data",
        0x47 => "Concurrent Positioning Ranges",
        0x53 => "Sense Data",
        0x59 => "Power Consumption Control",
        0x61 => "Capacity/Model Number Mapping",
        0x80..=0x9F => "Host Specific",
        0xA0..=0xDF => "Device Vendor Specific",
        0xE0 => "SCT Command/Status",
        0xE1 => "SCT Data Transfer",
        _ => "Reserved",
    }
}

/// Idle/standby timer value in human form.
pub fn timer_period(value: u8) -> String {
    match value {
        0x00 => "Disabled".to_string(),
        0x01..=0xF0 => {
            let secs = u32::from(value) * 5;
            if secs < 60 {
                format!("{} seconds", secs)
            } else if secs % 60 == 0 {
                format!("{} minutes", secs / 60)
            } else {
                format!("{} minutes {} seconds", secs / 60, secs % 60)
            }
        }
        0xF1..=0xFB => {
            let mins = (u32::from(value) - 240) * 30;
            format!("{} minutes", mins)
        }
        0xFC => "21 minutes".to_string(),
        0xFD => "8 to 12 hours".to_string(),
        0xFE => "Reserved".to_string(),
        0xFF => "21 minutes 15 seconds".to_string(),
    }
}

fn security_protocol_name(protocol: u8) -> &'static str {
    match protocol {
        0x00 => "Security Protocol Information",
        0x01..=0x06 => "TCG",
        0x07 => "CbCS",
        0x20 => "Tape Data Encryption",
        0x21 => "Data Encryption Configuration",
        0x40 => "SA Creation Capabilities",
        0x41 => "IKEv2-SCSI",
        0xE9 => "SD Card TrustedFlash",
        0xEA => "IEEE 1667",
        0xEC => "JEDEC UFS",
        0xED => "SD Card Security",
        0xEE => "Authentication in Host Attachments of Transient Storage Devices",
        0xEF => "ATA Device Server Password Security",
        0xF0..=0xFF => "Vendor Specific",
        _ => "Reserved",
    }
}

// ── Entry point ──────────────────────────────────────────────────────

/// Human description of one command.
pub fn describe_command(r: &CommandRegisters) -> String {
    let c = r.command;
    if let Some(name) = data_command_name(c) {
        return data_transfer(name, r);
    }
    match c {
        0x00 => match r.feature_lo() {
            0x01 => "NOP - Auto Poll".to_string(),
            _    => "NOP".to_string(),
        },
        0x03 => "CFA Request Extended Error Code".to_string(),
        0x06 => data_set_management("Data Set Management", r),
        0x07 => data_set_management("Data Set Management XL", r),
        0x08 => "Device Reset".to_string(),
        0x0B => "Request Sense Data Ext".to_string(),
        0x12 if r.count != 0 => format!(
            "Get Physical Element Status - Starting Element: {} Count: {} Filter: {:02X}h Report Type: {:X}h",
            r.lba,
            r.count,
            (r.features >> 14) & 0x3,
            (r.features >> 8) & 0xF
        ),
        0x10..=0x1F => "Recalibrate".to_string(),
        0x27 => "Read Native Max Address Ext".to_string(),
        0x2F => log_command("Read Log Ext", r),
        0x37 => format!("Set Max Address Ext - Max LBA: {}", r.lba),
        0x3F => log_command("Write Log Ext", r),
        0x45 => write_uncorrectable(r),
        0x47 => log_command("Read Log DMA Ext", r),
        0x4A => zone_management_in(r),
        0x50 => "Format Track".to_string(),
        0x51 => format!("Configure Stream - Stream ID: {}", r.features & 0x07),
        0x57 => log_command("Write Log DMA Ext", r),
        0x5B => trusted("Trusted Non-Data", r),
        0x5C => trusted("Trusted Receive", r),
        0x5D => trusted("Trusted Receive DMA", r),
        0x5E => trusted("Trusted Send", r),
        0x5F => trusted("Trusted Send DMA", r),
        0x60 => fpdma("Read FPDMA Queued", r),
        0x61 => fpdma("Write FPDMA Queued", r),
        0x63 => ncq_non_data(r),
        0x64 => send_fpdma(r),
        0x65 => receive_fpdma(r),
        0x70..=0x7F => seek_range(r),
        0x87 => "CFA Translate Sector".to_string(),
        0x80..=0x8F => format!("Vendor Specific Command {:02X}h", c),
        0x90 => "Execute Device Diagnostic".to_string(),
        0x91 => format!(
            "Initialize Device Parameters - Heads: {} Sectors Per Track: {}",
            (r.device & 0x0F) + 1,
            r.count_lo()
        ),
        0x92 => download_microcode("Download Microcode", r),
        0x93 => download_microcode("Download Microcode DMA", r),
        0x94 => "Standby Immediate (legacy)".to_string(),
        0x95 => "Idle Immediate (legacy)".to_string(),
        0x96 => format!("Standby (legacy) - Timer: {}", timer_period(r.count_lo())),
        0x97 => format!("Idle (legacy) - Timer: {}", timer_period(r.count_lo())),
        0x98 => "Check Power Mode (legacy)".to_string(),
        0x99 => "Sleep (legacy)".to_string(),
        0x9A => "Vendor Specific Command 9Ah".to_string(),
        0x9F => zone_management_out(r),
        0xA0 => "Packet".to_string(),
        0xA1 => "Identify Packet Device".to_string(),
        0xA2 => "Service".to_string(),
        0xB0 => smart(r),
        0xB1 => device_configuration_overlay(r),
        0xB2 => format!(
            "Set Sector Configuration Ext - Command Check: {:04X}h Descriptor Index: {}",
            r.features,
            r.count & 0x07
        ),
        0xB4 => sanitize(r),
        0xB6 => nv_cache(r),
        0xC0 => "CFA Erase Sectors".to_string(),
        0xC6 => format!("Set Multiple Mode - Sectors Per Block: {}", r.count_lo()),
        0xD1 => "Check Media Card Type".to_string(),
        0xDA => "Get Media Status".to_string(),
        0xDB => "Acknowledge Media Change".to_string(),
        0xDC => "Boot - Post-Boot".to_string(),
        0xDD => "Boot - Pre-Boot".to_string(),
        0xDE => "Media Lock".to_string(),
        0xDF => "Media Unlock".to_string(),
        0xE0 => "Standby Immediate".to_string(),
        0xE1 => match (r.feature_lo(), r.lba) {
            (0x44, 0x55_4E4C) => "Idle Immediate - Unload".to_string(),
            _                 => "Idle Immediate".to_string(),
        },
        0xE2 => format!("Standby - Timer: {}", timer_period(r.count_lo())),
        0xE3 => format!("Idle - Timer: {}", timer_period(r.count_lo())),
        0xE4 => "Read Buffer".to_string(),
        0xE5 => "Check Power Mode".to_string(),
        0xE6 => "Sleep".to_string(),
        0xE7 => "Flush Cache".to_string(),
        0xE8 => "Write Buffer".to_string(),
        0xE9 => "Read Buffer DMA".to_string(),
        0xEA => "Flush Cache Ext".to_string(),
        0xEB => "Write Buffer DMA".to_string(),
        0xEC => "Identify Device".to_string(),
        0xED => "Media Eject".to_string(),
        0xEE => "Identify Device DMA".to_string(),
        0xEF => set_features(r),
        0xF1 => "Security Set Password".to_string(),
        0xF2 => "Security Unlock".to_string(),
        0xF3 => "Security Erase Prepare".to_string(),
        0xF4 => "Security Erase Unit".to_string(),
        0xF5 => "Security Freeze Lock".to_string(),
        0xF6 => "Security Disable Password".to_string(),
        0xF8 => "Read Native Max Address".to_string(),
        0xF9 => set_max_address(r),
        0xF0..=0xFF => format!("Vendor Specific Command {:02X}h", c),
        _ => format!("Unknown Command {:02X}h", c),
    }
}

// ── Data transfer ────────────────────────────────────────────────────

/// Address portion for a data command: LBA, or CHS when the device register
/// selects CHS addressing on a 28-bit command.
pub fn address(r: &CommandRegisters) -> String {
    if is_ext(r.command) {
        format!("LBA: {}", r.lba)
    } else if r.lba_mode() {
        format!("LBA: {}", r.lba28())
    } else {
        let (cylinder, head, sector) = r.chs();
        format!("Cylinder: {} Head: {} Sector: {}", cylinder, head, sector)
    }
}

/// Sector count as the drive interprets it: zero means the maximum.
fn sector_count(r: &CommandRegisters) -> u32 {
    match (is_ext(r.command), r.count) {
        (true, 0)  => 65536,
        (true, n)  => u32::from(n),
        (false, _) => match r.count_lo() {
            0 => 256,
            n => u32::from(n),
        },
    }
}

fn data_transfer(name: &str, r: &CommandRegisters) -> String {
    let count = sector_count(r);
    let mut out = format!("{} - {} Count: {}", name, address(r), count);
    if is_streaming(r.command) {
        out.push_str(&format!(" Stream ID: {}", r.features & 0x07));
    }
    out
}

fn data_set_management(name: &str, r: &CommandRegisters) -> String {
    if r.features & 0x01 != 0 {
        format!("{} - TRIM Blocks: {}", name, r.count)
    } else {
        format!("{} - Blocks: {}", name, r.count)
    }
}

fn write_uncorrectable(r: &CommandRegisters) -> String {
    let mode = match r.feature_lo() {
        0x55 => "Pseudo Uncorrectable",
        0xAA => "Flagged Uncorrectable",
        0x5A | 0xA5 => "Vendor Specific",
        _ => "Reserved",
    };
    format!("Write Uncorrectable Ext - {} LBA: {} Count: {}", mode, r.lba, r.count)
}

fn log_command(name: &str, r: &CommandRegisters) -> String {
    let address = r.lba_lo();
    let page = (r.lba >> 8) & 0xFFFF;
    format!(
        "{} - Log: {:02X}h ({}) Page: {} Count: {} Feature: {:04X}h",
        name,
        address,
        log_address_name(address),
        page,
        r.count,
        r.features
    )
}

// ── NCQ ──────────────────────────────────────────────────────────────

fn fpdma(name: &str, r: &CommandRegisters) -> String {
    let tag = (r.count >> 3) & 0x1F;
    let mut out = format!("{} - LBA: {} Count: {} Tag: {}", name, r.lba, r.features, tag);
    if r.device & 0x80 != 0 {
        out.push_str(" FUA");
    }
    let prio = (r.count >> 14) & 0x3;
    if prio != 0 {
        out.push_str(&format!(" Priority: {}", prio));
    }
    out
}

fn ncq_non_data(r: &CommandRegisters) -> String {
    let tag = (r.count >> 3) & 0x1F;
    let sub = match r.features & 0x0F {
        0x0 => "Abort NCQ Queue".to_string(),
        0x1 => "Deadline Handling".to_string(),
        0x2 => "Hybrid Demote By Size".to_string(),
        0x3 => "Hybrid Change By LBA Range".to_string(),
        0x4 => "Hybrid Control".to_string(),
        0x5 => format!("Set Features - {}", set_feature_name((r.features >> 8) as u8, r.count_lo())),
        0x6 => format!("Zero Ext - LBA: {}", r.lba),
        0x7 => format!("Zone Management Out - {}", zone_action_name((r.features >> 8) as u8 & 0x1F)),
        other => format!("Reserved Subcommand {:X}h", other),
    };
    format!("NCQ Non-Data - {} Tag: {}", sub, tag)
}

fn send_fpdma(r: &CommandRegisters) -> String {
    let tag = (r.count >> 3) & 0x1F;
    let sub = match (r.count >> 8) & 0x1F {
        0x00 => "Data Set Management",
        0x01 => "Hybrid Evict",
        0x02 => "Write Log DMA Ext",
        0x03 => "Zone Management Out",
        0x04 => "Data Set Management XL",
        _ => "Reserved Subcommand",
    };
    format!("Send FPDMA Queued - {} Blocks: {} Tag: {}", sub, r.features, tag)
}

fn receive_fpdma(r: &CommandRegisters) -> String {
    let tag = (r.count >> 3) & 0x1F;
    let sub = match (r.count >> 8) & 0x1F {
        0x01 => "Read Log DMA Ext",
        0x02 => "Zone Management In",
        _ => "Reserved Subcommand",
    };
    format!("Receive FPDMA Queued - {} Blocks: {} Tag: {}", sub, r.features, tag)
}

// ── Zones ────────────────────────────────────────────────────────────

fn zone_action_name(action: u8) -> &'static str {
    match action {
        0x00 => "Report Zones Ext",
        0x01 => "Close Zone Ext",
        0x02 => "Finish Zone Ext",
        0x03 => "Open Zone Ext",
        0x04 => "Reset Write Pointers Ext",
        _ => "Reserved Action",
    }
}

fn zone_management_in(r: &CommandRegisters) -> String {
    let action = r.feature_lo() & 0x1F;
    if action == 0x00 {
        format!(
            "Zone Management In - Report Zones Ext Zone LBA: {} Reporting Options: {:02X}h",
            r.lba,
            (r.features >> 8) & 0x3F
        )
    } else {
        format!("Zone Management In - {}", zone_action_name(action))
    }
}

fn zone_management_out(r: &CommandRegisters) -> String {
    let action = r.feature_lo() & 0x1F;
    let all = if (r.features >> 8) & 0x01 != 0 { " All Zones" } else { "" };
    format!("Zone Management Out - {}{} Zone LBA: {}", zone_action_name(action), all, r.lba)
}

// ── 70h range ────────────────────────────────────────────────────────

/// Opcodes 70h..7Fh were all SEEK in early standards. Newer commands reuse
/// 77h, 78h and 7Ch; they are recognised by registers a seek never sets.
fn seek_range(r: &CommandRegisters) -> String {
    match r.command {
        0x77 if r.lba > LBA28_LIMIT => {
            format!("Set Date And Time Ext - Timestamp: {} ms", r.lba)
        }
        0x78 if r.features == 0x0001 => format!("Accessible Max Address Configuration - Set Accessible Max Address Ext - Max LBA: {}", r.lba),
        0x78 if r.features == 0x0002 => "Accessible Max Address Configuration - Freeze Accessible Max Address Ext".to_string(),
        0x78 if r.features == 0x0000 && r.lba == 0 && r.count == 0 && r.lba_mode() => {
            "Accessible Max Address Configuration - Get Native Max Address Ext".to_string()
        }
        0x7C if r.lba > LBA28_LIMIT || r.features != 0 => {
            format!("Remove And Truncate - Requested Max: {}", r.lba)
        }
        _ => format!("Seek - {}", address(r)),
    }
}

// ── SMART ────────────────────────────────────────────────────────────

fn offline_test_name(lba_lo: u8) -> &'static str {
    match lba_lo {
        0x00 => "Offline Data Collection",
        0x01 => "Short Self-Test (offline)",
        0x02 => "Extended Self-Test (offline)",
        0x03 => "Conveyance Self-Test (offline)",
        0x04 => "Selective Self-Test (offline)",
        0x7F => "Abort Self-Test",
        0x81 => "Short Self-Test (captive)",
        0x82 => "Extended Self-Test (captive)",
        0x83 => "Conveyance Self-Test (captive)",
        0x84 => "Selective Self-Test (captive)",
        0x40..=0x7E | 0x90..=0xFF => "Vendor Specific",
        _ => "Reserved",
    }
}

fn smart(r: &CommandRegisters) -> String {
    let sub = match r.feature_lo() {
        0xD0 => "Read Data".to_string(),
        0xD1 => "Read Attribute Thresholds".to_string(),
        0xD2 => match r.count_lo() {
            0x00 => "Disable Attribute Autosave".to_string(),
            0xF1 => "Enable Attribute Autosave".to_string(),
            _    => format!("Attribute Autosave - Reserved Value {:02X}h", r.count_lo()),
        },
        0xD3 => "Save Attribute Values".to_string(),
        0xD4 => format!("Execute Offline Immediate - {}", offline_test_name(r.lba_lo())),
        0xD5 => format!(
            "Read Log - Log: {:02X}h ({}) Count: {}",
            r.lba_lo(),
            log_address_name(r.lba_lo()),
            r.count_lo()
        ),
        0xD6 => format!(
            "Write Log - Log: {:02X}h ({}) Count: {}",
            r.lba_lo(),
            log_address_name(r.lba_lo()),
            r.count_lo()
        ),
        0xD7 => "Write Attribute Thresholds".to_string(),
        0xD8 => "Enable Operations".to_string(),
        0xD9 => "Disable Operations".to_string(),
        0xDA => "Return Status".to_string(),
        0xDB => match r.count_lo() {
            0x00 => "Disable Automatic Offline".to_string(),
            0xF8 => "Enable Automatic Offline".to_string(),
            _    => format!("Automatic Offline - Reserved Value {:02X}h", r.count_lo()),
        },
        0xE0..=0xFF => format!("Vendor Specific Subcommand {:02X}h", r.feature_lo()),
        other => format!("Reserved Subcommand {:02X}h", other),
    };
    if r.lba_mid_high() == SMART_SIGNATURE {
        format!("SMART {}", sub)
    } else {
        format!("SMART {} (invalid signature {:04X}h)", sub, r.lba_mid_high())
    }
}

// ── Microcode, security, configuration ──────────────────────────────

fn download_microcode(name: &str, r: &CommandRegisters) -> String {
    let blocks = u32::from(r.count_lo()) | (u32::from(r.lba_lo()) << 8);
    let offset = r.lba_mid_high();
    match r.feature_lo() {
        0x01 => format!("{} - Temporary (obsolete) Block Count: {}", name, blocks),
        0x03 => format!("{} - Download with offsets and save Block Count: {} Buffer Offset: {}", name, blocks, offset),
        0x07 => format!("{} - Download and save Block Count: {}", name, blocks),
        0x0E => format!("{} - Download with offsets and save for future activation Block Count: {} Buffer Offset: {}", name, blocks, offset),
        0x0F => format!("{} - Activate deferred microcode", name),
        other => format!("{} - Reserved Subcommand {:02X}h", name, other),
    }
}

fn trusted(name: &str, r: &CommandRegisters) -> String {
    let protocol = r.feature_lo();
    let specific = r.lba_mid_high();
    if name == "Trusted Non-Data" {
        let direction = if r.lba & 0x0100_0000 != 0 { "Receive" } else { "Send" };
        format!(
            "{} - Protocol: {:02X}h ({}) Specific: {:04X}h {}",
            name,
            protocol,
            security_protocol_name(protocol),
            specific,
            direction
        )
    } else {
        let blocks = u32::from(r.count_lo()) | (u32::from(r.lba_lo()) << 8);
        format!(
            "{} - Protocol: {:02X}h ({}) Specific: {:04X}h Transfer Length: {}",
            name,
            protocol,
            security_protocol_name(protocol),
            specific,
            blocks
        )
    }
}

fn device_configuration_overlay(r: &CommandRegisters) -> String {
    let sub = match r.feature_lo() {
        0xC0 => "Restore",
        0xC1 => "Freeze Lock",
        0xC2 => "Identify",
        0xC3 => "Set",
        0xC4 => "Identify DMA",
        0xC5 => "Set DMA",
        _ => "Reserved Subcommand",
    };
    format!("Device Configuration Overlay - {}", sub)
}

fn set_max_address(r: &CommandRegisters) -> String {
    match r.feature_lo() {
        0x00 => {
            let volatile = if r.count_lo() & 0x01 == 0 { " (volatile)" } else { "" };
            format!("Set Max Address - Max LBA: {}{}", r.lba28(), volatile)
        }
        0x01 => "Set Max Set Password".to_string(),
        0x02 => "Set Max Lock".to_string(),
        0x03 => "Set Max Unlock".to_string(),
        0x04 => "Set Max Freeze Lock".to_string(),
        other => format!("Set Max Address - Reserved Subcommand {:02X}h", other),
    }
}

fn nv_cache(r: &CommandRegisters) -> String {
    let sub = match r.features {
        0x0000 => "Set NV Cache Power Mode",
        0x0001 => "Return From NV Cache Power Mode",
        0x0010 => "Add LBAs To NV Cache Pinned Set",
        0x0011 => "Remove LBAs From NV Cache Pinned Set",
        0x0012 => "Query NV Cache Pinned Set",
        0x0013 => "Query NV Cache Misses",
        0x0014 => "Flush NV Cache",
        0x0015 => "NV Cache Enable",
        0x0016 => "NV Cache Disable",
        _ => "Reserved Subcommand",
    };
    format!("NV Cache - {}", sub)
}

// ── Sanitize ─────────────────────────────────────────────────────────

const SANITIZE_CRYPTO_KEY: u64 = 0x4372_7970; // "Cryp"
const SANITIZE_BLOCK_KEY: u64 = 0x426B_4572; // "BkEr"
const SANITIZE_OVERWRITE_KEY: u64 = 0x4F57; // "OW" in LBA 47:32
const SANITIZE_FREEZE_KEY: u64 = 0x4672_4C6B; // "FrLk"
const SANITIZE_ANTIFREEZE_KEY: u64 = 0x416E_7469; // "Anti"

fn sanitize(r: &CommandRegisters) -> String {
    fn checked(name: &str, ok: bool) -> String {
        if ok {
            format!("Sanitize Device - {}", name)
        } else {
            format!("Sanitize Device - {} (invalid signature)", name)
        }
    }
    let lower = r.lba & 0xFFFF_FFFF;
    match r.features {
        0x0000 => {
            let clear = if r.count & 0x01 != 0 { " Clear Sanitize Operation Failed" } else { "" };
            format!("Sanitize Device - Sanitize Status Ext{}", clear)
        }
        0x0011 => checked("Crypto Scramble Ext", lower == SANITIZE_CRYPTO_KEY),
        0x0012 => checked("Block Erase Ext", lower == SANITIZE_BLOCK_KEY),
        0x0014 => {
            let passes = match r.count & 0x0F {
                0 => 16,
                n => n,
            };
            let ok = (r.lba >> 32) & 0xFFFF == SANITIZE_OVERWRITE_KEY;
            format!(
                "{} Pattern: {:08X}h Passes: {}",
                checked("Overwrite Ext", ok),
                lower,
                passes
            )
        }
        0x0020 => checked("Sanitize Freeze Lock Ext", lower == SANITIZE_FREEZE_KEY),
        0x0040 => checked("Sanitize Antifreeze Lock Ext", lower == SANITIZE_ANTIFREEZE_KEY),
        other => format!("Sanitize Device - Reserved Subcommand {:04X}h", other),
    }
}

// ── Set Features ─────────────────────────────────────────────────────

fn transfer_mode(count: u8) -> String {
    match count {
        0x00 => "PIO Default Mode".to_string(),
        0x01 => "PIO Default Mode, IORDY Disabled".to_string(),
        0x08..=0x0F => format!("PIO Mode {}", count & 0x07),
        0x20..=0x27 => format!("Multiword DMA Mode {}", count & 0x07),
        0x40..=0x47 => format!("Ultra DMA Mode {}", count & 0x07),
        _ => format!("Reserved Transfer Mode {:02X}h", count),
    }
}

fn sata_feature_name(count: u8) -> &'static str {
    match count {
        0x01 => "Non-Zero Buffer Offsets",
        0x02 => "DMA Setup FIS Auto-Activate",
        0x03 => "Device-Initiated Interface Power State Transitions",
        0x04 => "Guaranteed In-Order Data Delivery",
        0x05 => "Asynchronous Notification",
        0x06 => "Software Settings Preservation",
        0x07 => "Device Automatic Partial To Slumber Transitions",
        0x08 => "Hardware Feature Control",
        0x09 => "Device Sleep",
        0x0A => "Hybrid Information",
        0x0B => "Power Disable",
        _ => "Reserved SATA Feature",
    }
}

fn epc_subcommand(r_lba: u64, count: u8) -> String {
    match r_lba & 0x0F {
        0x0 => "Restore Power Condition Settings".to_string(),
        0x1 => format!("Go To Power Condition {:02X}h", count),
        0x2 => format!("Set Power Condition Timer {:02X}h", count),
        0x3 => format!("Set Power Condition State {:02X}h", count),
        0x4 => "Enable EPC".to_string(),
        0x5 => "Disable EPC".to_string(),
        0x6 => "Set EPC Power Source".to_string(),
        other => format!("Reserved EPC Subcommand {:X}h", other),
    }
}

/// Name of a SET FEATURES subcommand.
pub fn set_feature_name(subcommand: u8, count: u8) -> String {
    match subcommand {
        0x01 => "Enable 8-bit PIO".to_string(),
        0x02 => "Enable Volatile Write Cache".to_string(),
        0x03 => format!("Set Transfer Mode - {}", transfer_mode(count)),
        0x04 => "Enable All Automatic Defect Reassignment".to_string(),
        0x05 => format!("Enable APM - Level: {:02X}h", count),
        0x06 => "Enable Power-Up In Standby".to_string(),
        0x07 => "Power-Up In Standby Device Spin-Up".to_string(),
        0x0A => "Enable CFA Power Mode 1".to_string(),
        0x0B => format!("Enable Write-Read-Verify - Mode: {:02X}h", count),
        0x0C => "Enable Device Life Control".to_string(),
        0x10 => format!("Enable SATA Feature - {}", sata_feature_name(count)),
        0x20 => "Set Time-Limited R/W - Read Command Error".to_string(),
        0x21 => "Set Time-Limited R/W - Write Command Error".to_string(),
        0x31 => "Disable Media Status Notification".to_string(),
        0x33 => "Disable Retry".to_string(),
        0x41 => "Enable Free-Fall Control".to_string(),
        0x42 => format!("Enable AAM - Level: {:02X}h", count),
        0x43 => "Set Maximum Host Interface Sector Times".to_string(),
        0x44 => "Vendor Specific ECC Length".to_string(),
        0x45 => "Set Rate Basis".to_string(),
        0x4A => "Extended Power Conditions".to_string(),
        0x55 => "Disable Read Look-Ahead".to_string(),
        0x5D => "Enable Release Interrupt".to_string(),
        0x5E => "Enable Service Interrupt".to_string(),
        0x62 => "Long Physical Sector Alignment Error Reporting".to_string(),
        0x63 => match count {
            0x01 => "Enable Device Statistics Notification".to_string(),
            0x02 => "Disable Device Statistics Notification".to_string(),
            _    => format!("Device Statistics Notification - Reserved Value {:02X}h", count),
        },
        0x66 => "Disable Reverting To Power-On Defaults".to_string(),
        0x77 => "Disable ECC".to_string(),
        0x81 => "Disable 8-bit PIO".to_string(),
        0x82 => "Disable Volatile Write Cache".to_string(),
        0x84 => "Disable All Automatic Defect Reassignment".to_string(),
        0x85 => "Disable APM".to_string(),
        0x86 => "Disable Power-Up In Standby".to_string(),
        0x88 => "Disable ECC".to_string(),
        0x8A => "Disable CFA Power Mode 1".to_string(),
        0x8B => "Disable Write-Read-Verify".to_string(),
        0x8C => "Disable Device Life Control".to_string(),
        0x90 => format!("Disable SATA Feature - {}", sata_feature_name(count)),
        0x95 => "Enable Media Status Notification".to_string(),
        0x99 => "Enable Retries".to_string(),
        0x9A => format!("Set Device Maximum Average Current - {} mA", u32::from(count) * 4),
        0xAA => "Enable Read Look-Ahead".to_string(),
        0xAB => format!("Set Maximum Prefetch - {} sectors", count),
        0xBB => "4 Bytes Of ECC".to_string(),
        0xC1 => "Disable Free-Fall Control".to_string(),
        0xC2 => "Disable AAM".to_string(),
        0xC3 => {
            if count & 0x01 != 0 {
                "Enable Sense Data Reporting".to_string()
            } else {
                "Disable Sense Data Reporting".to_string()
            }
        }
        0xC4 => {
            if count & 0x01 != 0 {
                "Enable Sense Data Return For Successful NCQ Commands".to_string()
            } else {
                "Disable Sense Data Return For Successful NCQ Commands".to_string()
            }
        }
        0xCC => "Enable Reverting To Power-On Defaults".to_string(),
        0xDD => "Disable Release Interrupt".to_string(),
        0xDE => "Disable Service Interrupt".to_string(),
        0xE0..=0xEF => format!("Vendor Specific Feature {:02X}h", subcommand),
        0xF0..=0xFF => format!("CFA Reserved Feature {:02X}h", subcommand),
        other => format!("Reserved Feature {:02X}h", other),
    }
}

fn set_features(r: &CommandRegisters) -> String {
    let sub = r.feature_lo();
    if sub == 0x4A {
        return format!("Set Features - Extended Power Conditions - {}", epc_subcommand(r.lba, r.count_lo()));
    }
    format!("Set Features - {}", set_feature_name(sub, r.count_lo()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regs(command: u8, features: u16, count: u16, lba: u64, device: u8) -> CommandRegisters {
        CommandRegisters { command, features, count, lba, device }
    }

    #[test]
    fn read_dma_ext() {
        assert_eq!(describe_command(&regs(0x25, 0, 8, 0x1234, 0x40)), "Read DMA Ext - LBA: 4660 Count: 8");
    }

    #[test]
    fn zero_count_means_maximum_transfer() {
        assert_eq!(describe_command(&regs(0x25, 0, 0, 0x1234, 0x40)), "Read DMA Ext - LBA: 4660 Count: 65536");
        assert_eq!(describe_command(&regs(0xCA, 0, 0, 0x10, 0xE0)), "Write DMA - LBA: 16 Count: 256");
        assert_eq!(describe_command(&regs(0xCA, 0, 0x0100, 0x10, 0xE0)), "Write DMA - LBA: 16 Count: 256");
    }

    #[test]
    fn twenty_eight_bit_lba_uses_device_nibble() {
        assert_eq!(describe_command(&regs(0xC8, 0, 1, 0x10, 0xE1)), "Read DMA - LBA: 16777232 Count: 1");
    }

    #[test]
    fn chs_addressing() {
        assert_eq!(
            describe_command(&regs(0x20, 0, 1, 0x02_0103, 0xA5)),
            "Read Sectors - Cylinder: 513 Head: 5 Sector: 3 Count: 1"
        );
    }

    #[test]
    fn opcode_12_depends_on_count() {
        assert_eq!(describe_command(&regs(0x12, 0, 0, 0, 0)), "Recalibrate");
        assert!(describe_command(&regs(0x12, 0, 4, 0, 0)).starts_with("Get Physical Element Status"));
        assert_eq!(describe_command(&regs(0x1F, 0, 4, 0, 0)), "Recalibrate");
    }

    #[test]
    fn seventy_range_disambiguation() {
        assert!(describe_command(&regs(0x77, 0, 0, 1_700_000_000_000, 0x40)).starts_with("Set Date And Time Ext"));
        assert_eq!(describe_command(&regs(0x77, 0, 0, 0x100, 0x40)), "Seek - LBA: 256");
        assert!(describe_command(&regs(0x78, 1, 0, 5000, 0x40)).contains("Set Accessible Max Address Ext"));
        assert!(describe_command(&regs(0x78, 0, 0, 0, 0x40)).contains("Get Native Max Address Ext"));
        assert!(describe_command(&regs(0x7C, 0, 0, 0x1_0000_0000, 0x40)).starts_with("Remove And Truncate"));
        assert_eq!(describe_command(&regs(0x70, 0, 0, 7, 0x40)), "Seek - LBA: 7");
    }

    #[test]
    fn smart_signature_check() {
        assert_eq!(describe_command(&regs(0xB0, 0xD0, 1, 0xC2_4F00, 0xA0)), "SMART Read Data");
        assert_eq!(
            describe_command(&regs(0xB0, 0xD5, 1, 0xC2_4F01, 0xA0)),
            "SMART Read Log - Log: 01h (Summary SMART Error Log) Count: 1"
        );
        assert!(describe_command(&regs(0xB0, 0xDA, 0, 0, 0)).contains("invalid signature"));
    }

    #[test]
    fn sanitize_signatures() {
        assert_eq!(
            describe_command(&regs(0xB4, 0x12, 0, SANITIZE_BLOCK_KEY, 0x40)),
            "Sanitize Device - Block Erase Ext"
        );
        assert!(describe_command(&regs(0xB4, 0x11, 0, 0, 0x40)).ends_with("(invalid signature)"));
    }

    #[test]
    fn gpl_log_names() {
        assert_eq!(
            describe_command(&regs(0x2F, 0, 1, 0x03, 0x40)),
            "Read Log Ext - Log: 03h (Extended Comprehensive SMART Error Log) Page: 0 Count: 1 Feature: 0000h"
        );
    }

    #[test]
    fn set_features_tree() {
        assert_eq!(describe_command(&regs(0xEF, 0x03, 0x46, 0, 0)), "Set Features - Set Transfer Mode - Ultra DMA Mode 6");
        assert_eq!(
            describe_command(&regs(0xEF, 0x10, 0x06, 0, 0)),
            "Set Features - Enable SATA Feature - Software Settings Preservation"
        );
        assert_eq!(
            describe_command(&regs(0xEF, 0x4A, 0, 0x04, 0)),
            "Set Features - Extended Power Conditions - Enable EPC"
        );
    }

    #[test]
    fn timers() {
        assert_eq!(timer_period(0), "Disabled");
        assert_eq!(timer_period(6), "30 seconds");
        assert_eq!(timer_period(0x0C), "1 minutes");
        assert_eq!(timer_period(0xF1), "30 minutes");
        assert_eq!(timer_period(0xFC), "21 minutes");
        assert_eq!(timer_period(0xFD), "8 to 12 hours");
        assert_eq!(timer_period(0xFF), "21 minutes 15 seconds");
        assert_eq!(describe_command(&regs(0xE3, 0, 0xF2, 0, 0)), "Idle - Timer: 60 minutes");
    }

    #[test]
    fn vendor_ranges_are_labelled() {
        assert_eq!(describe_command(&regs(0x8A, 0, 0, 0, 0)), "Vendor Specific Command 8Ah");
        assert_eq!(describe_command(&regs(0xFA, 0, 0, 0, 0)), "Vendor Specific Command FAh");
        assert_eq!(describe_command(&regs(0x87, 0, 0, 0, 0)), "CFA Translate Sector");
    }

    #[test]
    fn fpdma_tag_and_count() {
        assert_eq!(
            describe_command(&regs(0x60, 16, 5 << 3, 2048, 0x40)),
            "Read FPDMA Queued - LBA: 2048 Count: 16 Tag: 5"
        );
    }
}
