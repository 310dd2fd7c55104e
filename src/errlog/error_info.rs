//! Decoder for the error record captured when a command failed.

use super::command::{is_data_transfer, is_ext, is_recalibrate, is_streaming};

pub const STATUS_DEVICE_FAULT: u8 = 0x20;
pub const STATUS_DEFERRED_WRITE: u8 = 0x10;
pub const STATUS_ALIGNMENT: u8 = 0x04;
pub const STATUS_ERROR: u8 = 0x01;

pub const ERROR_ICRC: u8 = 0x80;
pub const ERROR_UNC: u8 = 0x40;
pub const ERROR_IDNF: u8 = 0x10;
pub const ERROR_ABORT: u8 = 0x04;
pub const ERROR_TK0NF: u8 = 0x02;
pub const ERROR_CCTO: u8 = 0x01;

/// Registers needed to explain one error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Opcode of the command that failed.
    pub command:            u8,
    /// Device register as written with that command.
    pub command_device:     u8,
    pub status:             u8,
    pub error:              u8,
    pub count:              u16,
    pub lba:                u64,
    pub device:             u8,
    pub transport_specific: u8,
}

fn status_bits(ctx: &ErrorContext) -> Vec<&'static str> {
    let mut out = Vec::new();
    if ctx.status & STATUS_DEVICE_FAULT != 0 {
        out.push("Device Fault");
    }
    if ctx.status & STATUS_ALIGNMENT != 0 {
        out.push("Alignment Error");
    }
    if is_streaming(ctx.command) && ctx.status & STATUS_DEFERRED_WRITE != 0 {
        out.push("Deferred Write Error");
    }
    if ctx.status & STATUS_ERROR != 0 {
        out.push("Error Reg Valid");
    }
    out
}

fn error_bits(ctx: &ErrorContext) -> Vec<&'static str> {
    let mut out = Vec::new();
    let e = ctx.error;
    if e & ERROR_ICRC != 0 {
        out.push("Interface CRC");
    }
    if e & ERROR_UNC != 0 {
        out.push("Uncorrectable Data");
    }
    if e & ERROR_IDNF != 0 {
        out.push("ID Not Found");
    }
    // ICRC is always reported together with ABRT
    if e & ERROR_ABORT != 0 && e & ERROR_ICRC == 0 {
        out.push("Abort");
    }
    if is_recalibrate(ctx.command) && e & ERROR_TK0NF != 0 {
        out.push("Track 0 Not Found");
    }
    if is_streaming(ctx.command) && e & ERROR_CCTO != 0 {
        out.push("Command Completion Timeout");
    }
    out
}

fn error_address(ctx: &ErrorContext) -> String {
    if is_ext(ctx.command) {
        format!("LBA: {}", ctx.lba)
    } else if ctx.command_device & 0x40 != 0 {
        let lba = (ctx.lba & 0x00FF_FFFF) | (u64::from(ctx.device & 0x0F) << 24);
        format!("LBA: {}", lba)
    } else {
        let cylinder = (ctx.lba >> 8) & 0xFFFF;
        let sector = ctx.lba & 0xFF;
        format!("Cylinder: {} Head: {} Sector: {}", cylinder, ctx.device & 0x0F, sector)
    }
}

/// Human description of an error record.
pub fn describe_error(ctx: &ErrorContext) -> String {
    let status = status_bits(ctx);
    let mut out = if status.is_empty() {
        format!("Status: {:02X}h", ctx.status)
    } else {
        format!("Status: {}", status.join(", "))
    };

    if ctx.status & STATUS_ERROR != 0 {
        let errors = error_bits(ctx);
        if errors.is_empty() {
            out.push_str(&format!(", Error: {:02X}h", ctx.error));
        } else {
            out.push_str(&format!(", Error: {}", errors.join(", ")));
        }
    }

    if is_data_transfer(ctx.command) {
        out.push_str(&format!("  {}", error_address(ctx)));
    }
    out.push_str(&format!("  Device: {:02X}", ctx.device));
    if ctx.transport_specific != 0 {
        out.push_str(&format!("  Transport Specific: {:02X}", ctx.transport_specific));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(command: u8, status: u8, error: u8) -> ErrorContext {
        ErrorContext {
            command,
            command_device: 0x40,
            status,
            error,
            count: 8,
            lba: 0x1234,
            device: 0x40,
            transport_specific: 0,
        }
    }

    #[test]
    fn uncorrectable_read() {
        assert_eq!(
            describe_error(&ctx(0x25, 0x51, 0x40)),
            "Status: Error Reg Valid, Error: Uncorrectable Data  LBA: 4660  Device: 40"
        );
    }

    #[test]
    fn crc_implies_abort() {
        let s = describe_error(&ctx(0x61, 0x41, 0x84));
        assert!(s.starts_with("Status: Error Reg Valid, Error: Interface CRC  LBA: 4660"));
        assert!(!s.contains("Abort"));
    }

    #[test]
    fn context_sensitive_bits() {
        // TK0NF only means something for recalibrate
        assert_eq!(describe_error(&ctx(0x10, 0x51, 0x02)), "Status: Error Reg Valid, Error: Track 0 Not Found  Device: 40");
        assert_eq!(describe_error(&ctx(0xE7, 0x51, 0x02)), "Status: Error Reg Valid, Error: 02h  Device: 40");
        assert_eq!(
            describe_error(&ctx(0x2A, 0x51, 0x01)),
            "Status: Deferred Write Error, Error Reg Valid, Error: Command Completion Timeout  LBA: 4660  Device: 40"
        );
    }

    #[test]
    fn fault_without_error_bit() {
        assert_eq!(describe_error(&ctx(0xEA, 0x20, 0x00)), "Status: Device Fault  Device: 40");
        assert_eq!(describe_error(&ctx(0xEA, 0x50, 0x00)), "Status: 50h  Device: 40");
    }
}
