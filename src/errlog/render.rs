use std::fmt::Write as _;

use super::command::{describe_command, CommandRegisters};
use super::error_info::{describe_error, ErrorContext};
use crate::models::errlog::{CommandRecord, ErrorEntry, ErrorLog, ResetKind};
use crate::util::human::fmt_ms_timestamp;

/// One command record as text; reset markers are named as such.
pub fn describe_record(c: &CommandRecord) -> String {
    match c.reset() {
        Some(ResetKind::Hardware) => "Hardware Reset".to_string(),
        Some(ResetKind::Software) => "Software Reset".to_string(),
        None => describe_command(&CommandRegisters {
            command:  c.command,
            features: c.features,
            count:    c.count,
            lba:      c.lba,
            device:   c.device,
        }),
    }
}

/// Error record of `entry` explained against the command that raised it.
pub fn describe_entry_error(entry: &ErrorEntry) -> String {
    let failing = entry.commands.iter().rev().find(|c| c.reset().is_none());
    let e = &entry.error;
    describe_error(&ErrorContext {
        command:            failing.map(|c| c.command).unwrap_or(0),
        command_device:     failing.map(|c| c.device).unwrap_or(e.device),
        status:             e.status,
        error:              e.error,
        count:              e.count,
        lba:                e.lba,
        device:             e.device,
        transport_specific: e.transport_specific,
    })
}

pub fn render_error_log(log: &ErrorLog) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} (version {})", log.source.label(), log.version);
    let _ = writeln!(out, "Device error count: {}", log.device_error_count);
    if !log.checksum_valid {
        let _ = writeln!(out, "Warning: log checksum is invalid");
    }
    if log.entries.is_empty() {
        let _ = writeln!(out, "No errors logged");
        return out;
    }
    if log.truncated {
        let _ = writeln!(out, "Warning: log could only be read partially");
    }

    for entry in &log.entries {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Error {} occurred at disk power-on lifetime: {} hours",
            entry.error_number, entry.error.life_hours
        );
        let _ = writeln!(out, "  Device state: {}", entry.error.state_label());
        let _ = writeln!(out, "  Error: {}", describe_entry_error(entry));
        if !entry.commands.is_empty() {
            let _ = writeln!(out, "  Commands leading to the error (oldest first):");
            let _ = writeln!(out, "    {:<18} Command", "Powered-up Time");
            for c in &entry.commands {
                let _ = writeln!(
                    out,
                    "    {:<18} {}",
                    fmt_ms_timestamp(u64::from(c.timestamp_ms)),
                    describe_record(c)
                );
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errlog::{ErrorLogSource, ErrorRecord};

    fn entry() -> ErrorEntry {
        ErrorEntry {
            error_number: 1,
            commands: vec![
                CommandRecord { device_control: 0xFF, ..Default::default() },
                CommandRecord { command: 0x25, count: 8, lba: 0x1234, device: 0x40, timestamp_ms: 1500, ..Default::default() },
            ],
            error: ErrorRecord {
                transport_specific: 0,
                error:              0x40,
                count:              8,
                lba:                0x1234,
                device:             0x40,
                status:             0x51,
                vendor_unique:      [0; 19],
                state:              3,
                life_hours:         42,
            },
        }
    }

    #[test]
    fn resets_are_named() {
        assert_eq!(describe_record(&entry().commands[0]), "Hardware Reset");
        assert_eq!(describe_record(&entry().commands[1]), "Read DMA Ext - LBA: 4660 Count: 8");
    }

    #[test]
    fn full_rendering() {
        let log = ErrorLog {
            source: ErrorLogSource::Summary,
            version: 1,
            index: 1,
            device_error_count: 1,
            checksum_valid: true,
            truncated: false,
            entries: vec![entry()],
        };
        let text = render_error_log(&log);
        assert!(text.contains("Error 1 occurred at disk power-on lifetime: 42 hours"));
        assert!(text.contains("Device state: Active/Idle"));
        assert!(text.contains("Error: Status: Error Reg Valid, Error: Uncorrectable Data  LBA: 4660  Device: 40"));
        assert!(text.contains("00:00:01.500"));
    }
}
