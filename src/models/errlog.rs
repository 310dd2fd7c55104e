use serde::Serialize;

/// Which ATA error log a result was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorLogSource {
    /// GPL log 0x03, 48-bit registers, four entries per page.
    ExtComprehensive,
    /// SMART log 0x02, 28-bit registers, five entries per page.
    Comprehensive,
    /// SMART log 0x01, single page holding the latest five entries.
    Summary,
}

impl ErrorLogSource {
    pub fn entries_per_page(&self) -> usize {
        match self {
            ErrorLogSource::ExtComprehensive => 4,
            _                                => 5,
        }
    }

    pub fn is_ext(&self) -> bool {
        matches!(self, ErrorLogSource::ExtComprehensive)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ErrorLogSource::ExtComprehensive => "Extended Comprehensive SMART Error Log",
            ErrorLogSource::Comprehensive    => "Comprehensive SMART Error Log",
            ErrorLogSource::Summary          => "Summary SMART Error Log",
        }
    }
}

/// Registers written for one command that preceded a logged error.
///
/// In 28-bit logs the `*_ext` fields are zero and `device_control` carries the
/// transport specific byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommandRecord {
    pub device_control: u8,
    pub features:       u16,
    pub count:          u16,
    pub lba:            u64,
    pub device:         u8,
    pub command:        u8,
    /// Milliseconds since power-on.
    pub timestamp_ms:   u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResetKind {
    Hardware,
    Software,
}

impl CommandRecord {
    pub fn is_empty(&self) -> bool {
        *self == CommandRecord::default()
    }

    /// A device-control value of 0xFF marks a hardware reset, the SRST bit a
    /// software reset.
    pub fn reset(&self) -> Option<ResetKind> {
        if self.device_control == 0xFF {
            Some(ResetKind::Hardware)
        } else if self.device_control & 0x04 != 0 {
            Some(ResetKind::Software)
        } else {
            None
        }
    }
}

/// Registers captured when the error was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub transport_specific: u8,
    pub error:              u8,
    pub count:              u16,
    pub lba:                u64,
    pub device:             u8,
    pub status:             u8,
    pub vendor_unique:      [u8; 19],
    /// Low nibble of the state byte.
    pub state:              u8,
    /// Power-on hours when the error occurred.
    pub life_hours:         u16,
}

impl ErrorRecord {
    pub fn state_label(&self) -> &'static str {
        match self.state & 0x0F {
            0x0 => "Unknown",
            0x1 => "Sleep",
            0x2 => "Standby",
            0x3 => "Active/Idle",
            0x4 => "Executing SMART offline or self-test",
            0x5..=0xA => "Reserved",
            _   => "Vendor Specific",
        }
    }
}

/// One ring slot: up to five commands (oldest first) and the error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    /// 1-based position of this entry counted back from the newest error.
    pub error_number: u32,
    pub commands:     Vec<CommandRecord>,
    pub error:        ErrorRecord,
}

/// Parsed error log, newest entry first.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorLog {
    pub source:             ErrorLogSource,
    pub version:            u8,
    /// 1-based index of the most recent entry; 0 when the log is empty.
    pub index:              u16,
    pub device_error_count: u16,
    pub checksum_valid:     bool,
    /// Set when a page read failed part way through the walk.
    pub truncated:          bool,
    pub entries:            Vec<ErrorEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_markers() {
        let mut c = CommandRecord { command: 0x25, ..Default::default() };
        assert_eq!(c.reset(), None);
        c.device_control = 0xFF;
        assert_eq!(c.reset(), Some(ResetKind::Hardware));
        c.device_control = 0x04;
        assert_eq!(c.reset(), Some(ResetKind::Software));
        assert!(CommandRecord::default().is_empty());
    }
}
