//! Contracts consumed from the device transport, plus the two shipped backends.
//!
//! Every method takes `&self`: the engine borrows a handle read-only for the
//! duration of one operation and never keeps it afterwards.

pub mod replay;
#[cfg(target_os = "linux")]
pub mod linux;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::models::device::{AttachInterface, DeviceIdentity, DriveKind, VendorFamily};

pub type TResult<T> = std::result::Result<T, TransportError>;

pub const SECTOR: usize = 512;

/// FARM capability predicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FarmCapabilities {
    pub farm:        bool,
    pub factory:     bool,
    pub time_series: bool,
    pub long_saved:  bool,
    pub sticky:      bool,
}

impl FarmCapabilities {
    pub fn any(&self) -> bool {
        self.farm || self.factory || self.time_series || self.long_saved || self.sticky
    }
}

/// Feature state reported by IDENTIFY DEVICE.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtaFeatures {
    pub smart_supported:     bool,
    pub smart_enabled:       bool,
    pub smart_error_logging: bool,
    pub gpl_supported:       bool,
    pub sct_supported:       bool,
}

/// Output registers returned by a non-data ATA command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFile {
    pub error:    u8,
    pub count:    u8,
    pub lba_low:  u8,
    pub lba_mid:  u8,
    pub lba_high: u8,
    pub device:   u8,
    pub status:   u8,
}

/// MODE SENSE page control field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageControl {
    Current,
    Changeable,
    Default,
    Saved,
}

impl PageControl {
    pub fn bits(&self) -> u8 {
        match self {
            PageControl::Current    => 0,
            PageControl::Changeable => 1,
            PageControl::Default    => 2,
            PageControl::Saved      => 3,
        }
    }
}

/// Identity and routing information common to every device.
pub trait DeviceInfo {
    fn identity(&self) -> DeviceIdentity;
    fn kind(&self) -> DriveKind;
    fn interface(&self) -> AttachInterface;
    fn family(&self) -> VendorFamily;
    fn farm_capabilities(&self) -> FarmCapabilities;

    /// Minimum buffer alignment the transport needs for DMA transfers.
    fn dma_alignment(&self) -> usize {
        SECTOR
    }
}

pub trait AtaTransport: DeviceInfo {
    fn features(&self) -> AtaFeatures;

    /// GPL READ LOG EXT. Fills `buf` starting at `page`; `feature` selects a
    /// vendor sub-log. `xfer_hint` caps the sectors moved per command
    /// (0 = backend default).
    fn read_log(&self, log_address: u8, page: u16, feature: u16, buf: &mut [u8], xfer_hint: u32) -> TResult<()>;

    /// SMART READ LOG: fills `buf` with `buf.len() / 512` sectors starting at page 0.
    fn smart_read_log(&self, log_address: u8, buf: &mut [u8]) -> TResult<()>;

    fn smart_read_data(&self, buf: &mut [u8]) -> TResult<()>;
    fn smart_read_thresholds(&self, buf: &mut [u8]) -> TResult<()>;
    fn smart_return_status(&self) -> TResult<TaskFile>;

    /// SCT STATUS request (read of log 0xE0).
    fn sct_status(&self, buf: &mut [u8]) -> TResult<()>;

    /// SCSI view of the same device when it sits behind a translation layer.
    fn as_scsi(&self) -> Option<&dyn ScsiTransport> {
        None
    }
}

pub trait ScsiTransport: DeviceInfo {
    /// LOG SENSE; returns the number of bytes transferred.
    fn log_sense(&self, page: u8, subpage: u8, buf: &mut [u8]) -> TResult<usize>;
    /// Total length (header included) of a log page as reported by the device.
    fn log_sense_size(&self, page: u8, subpage: u8) -> TResult<u32>;
    fn mode_sense_6(&self, page: u8, control: PageControl, buf: &mut [u8]) -> TResult<usize>;
    fn mode_sense_10(&self, page: u8, control: PageControl, buf: &mut [u8]) -> TResult<usize>;
    /// MODE SELECT with a complete parameter list (header plus page).
    fn mode_select_6(&self, data: &[u8], save: bool) -> TResult<()>;
    fn mode_select_10(&self, data: &[u8], save: bool) -> TResult<()>;
    fn request_sense(&self, buf: &mut [u8]) -> TResult<usize>;
}

pub trait NvmeTransport: DeviceInfo {
    fn get_log_page(&self, lid: u8, nsid: u32, buf: &mut [u8]) -> TResult<()>;
}

/// A device handle borrowed for one operation.
#[derive(Clone, Copy)]
pub enum Device<'a> {
    Ata(&'a dyn AtaTransport),
    Scsi(&'a dyn ScsiTransport),
    Nvme(&'a dyn NvmeTransport),
}

impl Device<'_> {
    pub fn kind(&self) -> DriveKind {
        match self {
            Device::Ata(_)  => DriveKind::Ata,
            Device::Scsi(_) => DriveKind::Scsi,
            Device::Nvme(_) => DriveKind::Nvme,
        }
    }

    pub fn identity(&self) -> DeviceIdentity {
        match self {
            Device::Ata(d)  => d.identity(),
            Device::Scsi(d) => d.identity(),
            Device::Nvme(d) => d.identity(),
        }
    }

    pub fn interface(&self) -> AttachInterface {
        match self {
            Device::Ata(d)  => d.interface(),
            Device::Scsi(d) => d.interface(),
            Device::Nvme(d) => d.interface(),
        }
    }

    pub fn family(&self) -> VendorFamily {
        match self {
            Device::Ata(d)  => d.family(),
            Device::Scsi(d) => d.family(),
            Device::Nvme(d) => d.family(),
        }
    }

    pub fn farm_capabilities(&self) -> FarmCapabilities {
        match self {
            Device::Ata(d)  => d.farm_capabilities(),
            Device::Scsi(d) => d.farm_capabilities(),
            Device::Nvme(d) => d.farm_capabilities(),
        }
    }
}
