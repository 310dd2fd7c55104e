//! SMART error-log decoding: source selection, page cache, ring walk,
//! register decoders and text rendering.

pub mod command;
pub mod directory;
pub mod error_info;
pub mod pages;
pub mod render;
pub mod ring;

use log::{debug, warn};

pub use command::{describe_command, CommandRegisters};
pub use directory::LogDirectory;
pub use error_info::{describe_error, ErrorContext};
pub use render::render_error_log;

use crate::error::{Error, Result};
use crate::models::errlog::{ErrorLog, ErrorLogSource};
use crate::transport::{AtaFeatures, AtaTransport};
use pages::{log_address, PageCache};
use ring::{EntryIter, LogHeader};

/// Logs worth trying, best first, with their page counts.
fn candidate_sources(dev: &dyn AtaTransport, features: &AtaFeatures) -> Vec<(ErrorLogSource, u16)> {
    let mut out = Vec::new();

    if features.gpl_supported {
        match directory::read_gpl_directory(dev) {
            Ok(dir) => {
                debug!("GPL log directory (address, pages): {:02x?}", dir.present().collect::<Vec<_>>());
                let pages = dir.pages(log_address(ErrorLogSource::ExtComprehensive));
                if pages > 0 {
                    out.push((ErrorLogSource::ExtComprehensive, pages));
                }
            }
            Err(e) => warn!("GPL log directory unavailable: {}", e),
        }
    }

    if features.smart_error_logging {
        match directory::read_smart_directory(dev) {
            Ok(dir) => {
                debug!("SMART log directory (address, pages): {:02x?}", dir.present().collect::<Vec<_>>());
                let pages = dir.pages(log_address(ErrorLogSource::Comprehensive));
                if pages > 0 {
                    out.push((ErrorLogSource::Comprehensive, pages));
                }
            }
            Err(e) => {
                debug!("SMART log directory unavailable ({}), assuming one comprehensive page", e);
                out.push((ErrorLogSource::Comprehensive, 1));
            }
        }
    }

    out.push((ErrorLogSource::Summary, 1));
    out
}

/// Parse one log source completely.
pub fn read_log_source(dev: &dyn AtaTransport, source: ErrorLogSource, pages: u16) -> Result<ErrorLog> {
    let mut cache = PageCache::new(dev, source);
    let header = LogHeader::parse(source, cache.page(0)?);
    let capacity = match source {
        ErrorLogSource::Summary => source.entries_per_page(),
        _ => usize::from(pages) * source.entries_per_page(),
    };
    if usize::from(header.index) > capacity {
        return Err(Error::Parse(format!(
            "{} index {} exceeds ring capacity {}",
            source.label(),
            header.index,
            capacity
        )));
    }

    let mut iter = EntryIter::new(&mut cache, header, capacity);
    let entries: Vec<_> = iter.by_ref().collect();
    let truncated = iter.truncated();
    debug!(
        "{}: index {}, device error count {}, {} entries, {} page(s) read",
        source.label(),
        header.index,
        header.device_error_count,
        entries.len(),
        cache.loaded()
    );

    Ok(ErrorLog {
        source,
        version: header.version,
        index: header.index,
        device_error_count: header.device_error_count,
        checksum_valid: cache.checksum_valid(),
        truncated,
        entries,
    })
}

/// Read the best error log the device offers: the extended comprehensive log
/// when GPL is available, then the comprehensive log, then the summary log.
pub fn read_error_log(dev: &dyn AtaTransport) -> Result<ErrorLog> {
    let features = dev.features();
    if !features.smart_enabled {
        return Err(Error::NotSupported("SMART is not enabled on this device".into()));
    }

    for (source, pages) in candidate_sources(dev, &features) {
        match read_log_source(dev, source, pages) {
            Ok(log) => return Ok(log),
            Err(e @ Error::MemoryFailure(_)) => return Err(e),
            Err(e) => warn!("{} unavailable: {}", source.label(), e),
        }
    }
    Err(Error::NotSupported("no SMART error log could be read".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device::{DeviceIdentity, DriveKind};
    use crate::smart::parse::fixtures::seal;
    use crate::transport::replay::{ata_log_key, smart_log_key, Manifest, ReplayDevice};
    use crate::transport::SECTOR;

    fn device(features: AtaFeatures) -> ReplayDevice {
        let identity = DeviceIdentity { model: "ST1".into(), serial: "S1".into(), firmware: "F1".into() };
        let mut manifest = Manifest::new(DriveKind::Ata, identity);
        manifest.ata = features;
        ReplayDevice::new(manifest)
    }

    fn summary_page() -> Vec<u8> {
        let mut page = vec![0u8; SECTOR];
        page[0] = 1;
        page[1] = 1;
        let entry = 2;
        let cmd = entry + 4 * 12;
        page[cmd + 2] = 8;
        page[cmd + 3] = 0x34;
        page[cmd + 4] = 0x12;
        page[cmd + 6] = 0x40;
        page[cmd + 7] = 0x25;
        page[cmd + 8..cmd + 12].copy_from_slice(&2500u32.to_le_bytes());
        let err = entry + 60;
        page[err + 1] = 0x40;
        page[err + 2] = 8;
        page[err + 3] = 0x34;
        page[err + 4] = 0x12;
        page[err + 6] = 0x40;
        page[err + 7] = 0x51;
        page[err + 27] = 0x03;
        page[err + 28..err + 30].copy_from_slice(&1200u16.to_le_bytes());
        page[452..454].copy_from_slice(&1u16.to_le_bytes());
        seal(&mut page);
        page
    }

    fn ext_slot(page: &mut [u8], slot: usize, lba: u8) {
        let entry = 4 + slot * 124;
        let cmd = entry + 4 * 18;
        page[cmd + 3] = 1;
        page[cmd + 5] = lba;
        page[cmd + 11] = 0x40;
        page[cmd + 12] = 0x25;
        let err = entry + 90;
        page[err + 1] = 0x40;
        page[err + 4] = lba;
        page[err + 11] = 0x51;
    }

    fn gpl_directory(ext_pages: u16) -> Vec<u8> {
        let mut dir = vec![0u8; SECTOR];
        dir[0] = 1;
        dir[6..8].copy_from_slice(&ext_pages.to_le_bytes());
        dir
    }

    fn ext_log() -> Vec<u8> {
        let mut log = vec![0u8; 2 * SECTOR];
        log[0] = 1;
        log[2..4].copy_from_slice(&2u16.to_le_bytes());
        log[500..502].copy_from_slice(&10u16.to_le_bytes());
        ext_slot(&mut log[..SECTOR], 0, 0x10);
        ext_slot(&mut log[..SECTOR], 1, 0x20);
        seal(&mut log[..SECTOR]);
        seal(&mut log[SECTOR..]);
        log
    }

    #[test]
    fn summary_log_decodes_latest_error() {
        let dev = device(AtaFeatures { smart_supported: true, smart_enabled: true, ..Default::default() })
            .with_page(smart_log_key(0x01), summary_page());
        let log = read_error_log(&dev).unwrap();
        assert_eq!(log.source, ErrorLogSource::Summary);
        assert!(log.checksum_valid);
        assert!(!log.truncated);
        assert_eq!(log.entries.len(), 1);

        let entry = &log.entries[0];
        assert_eq!(entry.error_number, 1);
        assert_eq!(entry.error.life_hours, 1200);
        assert_eq!(render::describe_record(&entry.commands[0]), "Read DMA Ext - LBA: 4660 Count: 8");
        assert_eq!(
            render::describe_entry_error(entry),
            "Status: Error Reg Valid, Error: Uncorrectable Data  LBA: 4660  Device: 40"
        );
    }

    #[test]
    fn extended_log_is_preferred_and_walked_newest_first() {
        let dev = device(AtaFeatures {
            smart_supported: true,
            smart_enabled: true,
            gpl_supported: true,
            ..Default::default()
        })
        .with_page(ata_log_key(0x00, 0), gpl_directory(2))
        .with_page(ata_log_key(0x03, 0), ext_log())
        .with_page(smart_log_key(0x01), summary_page());

        let log = read_error_log(&dev).unwrap();
        assert_eq!(log.source, ErrorLogSource::ExtComprehensive);
        assert_eq!(log.device_error_count, 10);
        assert_eq!(log.entries.len(), 2);
        assert_eq!(log.entries[0].error.lba, 0x20);
        assert_eq!(log.entries[1].error.lba, 0x10);
        assert_eq!(log.entries[1].error_number, 2);
        assert!(!log.truncated);
    }

    #[test]
    fn failed_page_truncates_the_walk() {
        let mut short = ext_log();
        short.truncate(SECTOR);
        let dev = device(AtaFeatures {
            smart_supported: true,
            smart_enabled: true,
            gpl_supported: true,
            ..Default::default()
        })
        .with_page(ata_log_key(0x00, 0), gpl_directory(2))
        .with_page(ata_log_key(0x03, 0), short);

        let log = read_error_log(&dev).unwrap();
        assert_eq!(log.entries.len(), 2);
        assert!(log.truncated);
    }

    #[test]
    fn index_beyond_ring_is_rejected() {
        let mut page = summary_page();
        page[1] = 6;
        seal(&mut page);
        let dev = device(AtaFeatures { smart_supported: true, smart_enabled: true, ..Default::default() })
            .with_page(smart_log_key(0x01), page);
        assert!(matches!(
            read_log_source(&dev, ErrorLogSource::Summary, 1),
            Err(Error::Parse(_))
        ));
        assert!(matches!(read_error_log(&dev), Err(Error::NotSupported(_))));
    }

    #[test]
    fn smart_disabled_is_not_supported() {
        let dev = device(AtaFeatures::default());
        assert!(matches!(read_error_log(&dev), Err(Error::NotSupported(_))));
        assert!(dev.requests().is_empty());
    }
}
