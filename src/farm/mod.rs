//! Combined FARM log assembler.
//!
//! Pulls every available FARM dataset from an ATA or SCSI drive and writes a
//! single self-describing container: a 256-byte header, one 32-byte
//! descriptor per dataset, zero padding to a 512-byte boundary, then the
//! payloads in emission order, each padded to the next boundary except the
//! last.

pub mod assembler;
pub mod layout;
pub mod reader;
pub mod sink;

pub use assembler::{pull_combined_farm, pull_combined_farm_to_dir, pull_datasets, Dataset, FarmOptions};
pub use layout::{plan, Layout};
pub use reader::FarmFile;
pub use sink::{FarmSink, FileSink, VecSink};

/// Container signature, bytes 0..16 of every combined file.
pub const COMBINED_SIGNATURE: &[u8; 16] = b"STX_FARM_COMBINE";

pub const VERSION_MAJOR: u16 = 1;
pub const VERSION_MINOR: u16 = 1;
pub const VERSION_PATCH: u16 = 0;

pub const HEADER_LEN: usize = 256;
pub const DESCRIPTOR_LEN: usize = 32;
pub const ALIGNMENT: u64 = 512;

/// Size of one ATA FARM frame.
pub const ATA_PAGE_UNIT: usize = 96 * 1024;
pub const ATA_WORKLOAD_TRACE_LEN: usize = 2 * 1024 * 1024;
/// Frames in one ATA time-series log read.
pub const ATA_TIME_SERIES_FRAMES: usize = 27;

pub const ATA_FARM_LOG: u8 = 0xA6;
pub const ATA_FARM_FEATURE_CURRENT: u16 = 0x0000;
pub const ATA_FARM_FEATURE_SAVED: u16 = 0x0002;
pub const ATA_FARM_FEATURE_FACTORY: u16 = 0x0003;

pub const ATA_FARM_TIME_SERIES_LOG: u8 = 0xC6;
pub const ATA_TIME_SERIES_FEATURE_DISC: u16 = 0x0000;
pub const ATA_TIME_SERIES_FEATURE_FLASH: u16 = 0x0001;
pub const ATA_TIME_SERIES_FEATURE_WORKLOAD: u16 = 0x0002;

pub const SCSI_FARM_LOG_PAGE: u8 = 0x3D;
pub const SCSI_FARM_SUBPAGE_CURRENT: u8 = 0x03;
pub const SCSI_FARM_SUBPAGE_FACTORY: u8 = 0x04;
pub const SCSI_FARM_SUBPAGES_TIME_SERIES: std::ops::RangeInclusive<u8> = 0x10..=0x1F;
pub const SCSI_FARM_SUBPAGES_LONG_SAVED: [u8; 2] = [0xC0, 0xC1];
pub const SCSI_FARM_SUBPAGES_STICKY: std::ops::RangeInclusive<u8> = 0xC2..=0xC7;
