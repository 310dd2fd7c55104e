//! Ring-buffer layout of the ATA error logs and the newest-first walk.

use log::warn;

use super::pages::PageCache;
use crate::models::errlog::{CommandRecord, ErrorEntry, ErrorLogSource, ErrorRecord};
use crate::util::bytes::{le_u16, le_u32};

const COMMANDS_PER_ENTRY: usize = 5;

const ENTRY_LEN: usize = 90;
const COMMAND_LEN: usize = 12;
const FIRST_ENTRY: usize = 2;
const ERROR_COUNT_OFFSET: usize = 452;

const EXT_ENTRY_LEN: usize = 124;
const EXT_COMMAND_LEN: usize = 18;
const EXT_FIRST_ENTRY: usize = 4;
const EXT_ERROR_COUNT_OFFSET: usize = 500;

/// Fields of page 0 shared by all three logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogHeader {
    pub version:            u8,
    pub index:              u16,
    pub device_error_count: u16,
}

impl LogHeader {
    pub fn parse(source: ErrorLogSource, page0: &[u8]) -> Self {
        if source.is_ext() {
            Self {
                version:            page0[0],
                index:              le_u16(page0, 2),
                device_error_count: le_u16(page0, EXT_ERROR_COUNT_OFFSET),
            }
        } else {
            Self {
                version:            page0[0],
                index:              u16::from(page0[1]),
                device_error_count: le_u16(page0, ERROR_COUNT_OFFSET),
            }
        }
    }
}

fn entry_span(ext: bool, slot: usize) -> (usize, usize) {
    if ext {
        let start = EXT_FIRST_ENTRY + slot * EXT_ENTRY_LEN;
        (start, start + EXT_ENTRY_LEN)
    } else {
        let start = FIRST_ENTRY + slot * ENTRY_LEN;
        (start, start + ENTRY_LEN)
    }
}

fn lba48(low: u8, mid: u8, high: u8, low_ext: u8, mid_ext: u8, high_ext: u8) -> u64 {
    u64::from(low)
        | u64::from(mid) << 8
        | u64::from(high) << 16
        | u64::from(low_ext) << 24
        | u64::from(mid_ext) << 32
        | u64::from(high_ext) << 40
}

pub fn parse_command(rec: &[u8], ext: bool) -> CommandRecord {
    if ext {
        CommandRecord {
            device_control: rec[0],
            features:       u16::from_le_bytes([rec[1], rec[2]]),
            count:          u16::from_le_bytes([rec[3], rec[4]]),
            lba:            lba48(rec[5], rec[7], rec[9], rec[6], rec[8], rec[10]),
            device:         rec[11],
            command:        rec[12],
            timestamp_ms:   le_u32(rec, 14),
        }
    } else {
        CommandRecord {
            device_control: rec[0],
            features:       u16::from(rec[1]),
            count:          u16::from(rec[2]),
            lba:            lba48(rec[3], rec[4], rec[5], 0, 0, 0),
            device:         rec[6],
            command:        rec[7],
            timestamp_ms:   le_u32(rec, 8),
        }
    }
}

pub fn parse_error(rec: &[u8], ext: bool) -> ErrorRecord {
    let mut vendor_unique = [0u8; 19];
    if ext {
        vendor_unique.copy_from_slice(&rec[12..31]);
        ErrorRecord {
            transport_specific: rec[0],
            error:              rec[1],
            count:              u16::from_le_bytes([rec[2], rec[3]]),
            lba:                lba48(rec[4], rec[6], rec[8], rec[5], rec[7], rec[9]),
            device:             rec[10],
            status:             rec[11],
            vendor_unique,
            state:              rec[31] & 0x0F,
            life_hours:         le_u16(rec, 32),
        }
    } else {
        vendor_unique.copy_from_slice(&rec[8..27]);
        ErrorRecord {
            transport_specific: rec[0],
            error:              rec[1],
            count:              u16::from(rec[2]),
            lba:                lba48(rec[3], rec[4], rec[5], 0, 0, 0),
            device:             rec[6],
            status:             rec[7],
            vendor_unique,
            state:              rec[27] & 0x0F,
            life_hours:         le_u16(rec, 28),
        }
    }
}

/// Decode one ring slot. All-zero slots are unused and yield `None`.
pub fn parse_entry(raw: &[u8], ext: bool) -> Option<(Vec<CommandRecord>, ErrorRecord)> {
    if raw.iter().all(|&b| b == 0) {
        return None;
    }
    let command_len = if ext { EXT_COMMAND_LEN } else { COMMAND_LEN };
    let commands = raw[..COMMANDS_PER_ENTRY * command_len]
        .chunks_exact(command_len)
        .map(|rec| parse_command(rec, ext))
        .filter(|c| !c.is_empty())
        .collect();
    let error = parse_error(&raw[COMMANDS_PER_ENTRY * command_len..], ext);
    Some((commands, error))
}

/// Walks the ring backwards from the most recent entry, loading pages
/// through the cache as it goes.
pub struct EntryIter<'c, 'd> {
    cache:     &'c mut PageCache<'d>,
    ext:       bool,
    per_page:  usize,
    capacity:  usize,
    /// Next ring slot to visit (0-based).
    slot:      usize,
    /// Slots still allowed to be visited.
    budget:    usize,
    collected: u32,
    truncated: bool,
}

impl<'c, 'd> EntryIter<'c, 'd> {
    /// `capacity` is the total number of slots in the ring. The walk visits
    /// at most `min(capacity, device_error_count)` slots and none when the
    /// index is 0.
    pub fn new(cache: &'c mut PageCache<'d>, header: LogHeader, capacity: usize) -> Self {
        let source = cache.source();
        let budget = if header.index == 0 || capacity == 0 {
            0
        } else {
            capacity.min(usize::from(header.device_error_count))
        };
        let slot = usize::from(header.index.max(1) - 1) % capacity.max(1);
        Self {
            cache,
            ext: source.is_ext(),
            per_page: source.entries_per_page(),
            capacity,
            slot,
            budget,
            collected: 0,
            truncated: false,
        }
    }

    /// True when a page read failed before the walk finished.
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

impl Iterator for EntryIter<'_, '_> {
    type Item = ErrorEntry;

    fn next(&mut self) -> Option<ErrorEntry> {
        while self.budget > 0 {
            self.budget -= 1;
            let slot = self.slot;
            self.slot = if slot == 0 { self.capacity - 1 } else { slot - 1 };

            let ext = self.ext;
            let page_index = (slot / self.per_page) as u16;
            let (start, end) = entry_span(ext, slot % self.per_page);
            let page = match self.cache.page(page_index) {
                Ok(p) => p,
                Err(e) => {
                    warn!("error log walk stopped at page {}: {}", page_index, e);
                    self.truncated = true;
                    self.budget = 0;
                    return None;
                }
            };
            if let Some((commands, error)) = page.get(start..end).and_then(|raw| parse_entry(raw, ext)) {
                self.collected += 1;
                return Some(ErrorEntry { error_number: self.collected, commands, error });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ext_command_layout() {
        let mut rec = [0u8; EXT_COMMAND_LEN];
        rec[0] = 0x08;
        rec[1] = 0x01;
        rec[3] = 0x08;
        rec[5] = 0x34;
        rec[6] = 0x01; // LBA low ext
        rec[7] = 0x12;
        rec[11] = 0x40;
        rec[12] = 0x25;
        rec[14..18].copy_from_slice(&1000u32.to_le_bytes());
        let c = parse_command(&rec, true);
        assert_eq!(c.lba, 0x0100_1234);
        assert_eq!(c.count, 8);
        assert_eq!(c.features, 1);
        assert_eq!(c.command, 0x25);
        assert_eq!(c.timestamp_ms, 1000);
    }

    #[test]
    fn error_record_layout() {
        let mut rec = [0u8; 30];
        rec[1] = 0x40;
        rec[2] = 8;
        rec[3] = 0x34;
        rec[4] = 0x12;
        rec[6] = 0x40;
        rec[7] = 0x51;
        rec[27] = 0x53;
        rec[28..30].copy_from_slice(&777u16.to_le_bytes());
        let e = parse_error(&rec, false);
        assert_eq!(e.lba, 0x1234);
        assert_eq!(e.status, 0x51);
        assert_eq!(e.state, 0x03);
        assert_eq!(e.life_hours, 777);
    }

    #[test]
    fn empty_slots_are_skipped() {
        assert!(parse_entry(&[0u8; ENTRY_LEN], false).is_none());
        let mut raw = [0u8; ENTRY_LEN];
        raw[4 * COMMAND_LEN + 7] = 0xC8;
        raw[5 * COMMAND_LEN + 7] = 0x51;
        let (commands, error) = parse_entry(&raw, false).unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].command, 0xC8);
        assert_eq!(error.status, 0x51);
    }
}
