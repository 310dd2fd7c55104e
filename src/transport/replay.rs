//! Capture-directory transport.
//!
//! A replay device answers every request from pages captured earlier (or
//! built in memory by tests). The directory holds a `device.json` manifest
//! naming the identity, capabilities and one file per captured page:
//!
//! ```json
//! {
//!   "identity": { "model": "ST4000NM000A", "serial": "ZC1234", "firmware": "SN04" },
//!   "kind": "ata",
//!   "family": "seagate",
//!   "farm": { "farm": true, "time_series": true },
//!   "ata": { "smart_enabled": true, "gpl_supported": true },
//!   "return_status": [79, 194],
//!   "pages": { "ata-log:a6:0000": "farm_current.bin", "smart-data": "smart.bin" }
//! }
//! ```
//!
//! Page keys are built by the `*_key` helpers below. A request whose page is
//! missing fails with `TransportError::Unsupported`.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use super::{
    AtaFeatures, AtaTransport, Device, DeviceInfo, FarmCapabilities, NvmeTransport, PageControl,
    ScsiTransport, TResult, TaskFile, SECTOR,
};
use crate::error::{Error, Result, TransportError};
use crate::models::device::{AttachInterface, DeviceIdentity, DriveKind, VendorFamily};
use crate::util::bytes::{be_u16, put_be_u16};

pub const MANIFEST_NAME: &str = "device.json";

pub fn ata_log_key(address: u8, feature: u16) -> String {
    format!("ata-log:{:02x}:{:04x}", address, feature)
}

pub fn smart_log_key(address: u8) -> String {
    format!("smart-log:{:02x}", address)
}

pub fn scsi_log_key(page: u8, subpage: u8) -> String {
    format!("scsi-log:{:02x}:{:02x}", page, subpage)
}

pub fn scsi_mode_key(page: u8, control: PageControl) -> String {
    let pc = match control {
        PageControl::Saved => "saved",
        _                  => "current",
    };
    format!("scsi-mode:{:02x}:{}", page, pc)
}

pub fn nvme_log_key(lid: u8) -> String {
    format!("nvme-log:{:02x}", lid)
}

pub const SMART_DATA_KEY: &str = "smart-data";
pub const SMART_THRESHOLDS_KEY: &str = "smart-thresholds";
pub const SCT_STATUS_KEY: &str = "sct-status";
pub const REQUEST_SENSE_KEY: &str = "request-sense";

/// Behaviour switches for exercising fallback paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Quirks {
    /// MODE SENSE(10) / MODE SELECT(10) are rejected.
    pub no_mode_10: bool,
    /// MODE SELECT with the save bit set is rejected.
    pub mode_select_save_fails: bool,
    /// Log transfers must be a multiple of this many bytes (0 = any length).
    pub dma_alignment: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub identity: DeviceIdentity,
    pub kind: DriveKind,
    #[serde(default = "default_interface")]
    pub interface: AttachInterface,
    #[serde(default = "default_family")]
    pub family: VendorFamily,
    #[serde(default)]
    pub farm: FarmCapabilities,
    #[serde(default)]
    pub ata: AtaFeatures,
    /// LBA mid / LBA high returned by SMART RETURN STATUS.
    #[serde(default)]
    pub return_status: Option<[u8; 2]>,
    /// An ATA device that also answers SCSI commands through a translation layer.
    #[serde(default)]
    pub satl: bool,
    #[serde(default)]
    pub quirks: Quirks,
    /// Page key → file name relative to the manifest.
    #[serde(default)]
    pub pages: BTreeMap<String, String>,
}

fn default_interface() -> AttachInterface { AttachInterface::Unknown }
fn default_family() -> VendorFamily { VendorFamily::Default }

impl Manifest {
    pub fn new(kind: DriveKind, identity: DeviceIdentity) -> Self {
        let interface = match kind {
            DriveKind::Ata  => AttachInterface::Sata,
            DriveKind::Scsi => AttachInterface::Sas,
            DriveKind::Nvme => AttachInterface::Nvme,
        };
        Self {
            identity,
            kind,
            interface,
            family: VendorFamily::Default,
            farm: FarmCapabilities::default(),
            ata: AtaFeatures::default(),
            return_status: None,
            satl: false,
            quirks: Quirks::default(),
            pages: BTreeMap::new(),
        }
    }
}

/// MODE SELECT issued against a replay device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSelect {
    pub page: Vec<u8>,
    pub save: bool,
}

pub struct ReplayDevice {
    manifest: Manifest,
    pages:    RefCell<HashMap<String, Vec<u8>>>,
    selects:  RefCell<Vec<ModeSelect>>,
    requests: RefCell<Vec<String>>,
}

impl ReplayDevice {
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest,
            pages:    RefCell::new(HashMap::new()),
            selects:  RefCell::new(Vec::new()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Load `device.json` and every page file it names from `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_NAME);
        let text = fs::read_to_string(&manifest_path)
            .map_err(|source| Error::FileOpen { path: manifest_path.clone(), source })?;
        let manifest: Manifest = serde_json::from_str(&text)
            .map_err(|e| Error::Parse(format!("{}: {}", manifest_path.display(), e)))?;

        let mut pages = HashMap::new();
        for (key, file) in &manifest.pages {
            let path = dir.join(file);
            let data = fs::read(&path).map_err(|source| Error::FileOpen { path, source })?;
            pages.insert(key.clone(), data);
        }
        debug!("replay device {} loaded {} page(s)", dir.display(), pages.len());

        let dev = Self::new(manifest);
        *dev.pages.borrow_mut() = pages;
        Ok(dev)
    }

    pub fn with_page(self, key: impl Into<String>, data: Vec<u8>) -> Self {
        self.pages.borrow_mut().insert(key.into(), data);
        self
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn set_family(&mut self, family: VendorFamily) {
        self.manifest.family = family;
    }

    /// Borrow the device through the protocol its manifest declares.
    pub fn as_device(&self) -> Device<'_> {
        match self.manifest.kind {
            DriveKind::Ata  => Device::Ata(self),
            DriveKind::Scsi => Device::Scsi(self),
            DriveKind::Nvme => Device::Nvme(self),
        }
    }

    /// Mode selects issued so far, oldest first.
    pub fn mode_selects(&self) -> Vec<ModeSelect> {
        self.selects.borrow().clone()
    }

    /// Keys of every request served so far, in order, including failed ones.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub fn page(&self, key: &str) -> Option<Vec<u8>> {
        self.pages.borrow().get(key).cloned()
    }

    fn fetch(&self, key: &str) -> TResult<Vec<u8>> {
        self.requests.borrow_mut().push(key.to_string());
        self.pages.borrow().get(key).cloned().ok_or(TransportError::Unsupported)
    }

    fn check_alignment(&self, len: usize) -> TResult<()> {
        let align = self.manifest.quirks.dma_alignment;
        if align > 0 && len % align != 0 {
            return Err(TransportError::Other(format!("{}-byte transfer is not a multiple of {}", len, align)));
        }
        Ok(())
    }

    fn fill(&self, key: &str, offset: usize, buf: &mut [u8]) -> TResult<()> {
        let data = self.fetch(key)?;
        let end = offset + buf.len();
        if end > data.len() {
            return Err(TransportError::ShortTransfer {
                expected: buf.len(),
                actual:   data.len().saturating_sub(offset),
            });
        }
        buf.copy_from_slice(&data[offset..end]);
        Ok(())
    }

    fn mode_sense(&self, page: u8, control: PageControl, buf: &mut [u8], ten: bool) -> TResult<usize> {
        if ten && self.manifest.quirks.no_mode_10 {
            self.requests.borrow_mut().push(format!("mode-sense-10:{:02x}", page));
            return Err(TransportError::Sense { key: 5, asc: 0x20, ascq: 0 });
        }
        let body = self.fetch(&scsi_mode_key(page, control))?;
        let mut reply = Vec::with_capacity(body.len() + 8);
        if ten {
            reply.extend_from_slice(&[0u8; 8]);
            put_be_u16(&mut reply, 0, (body.len() + 6) as u16);
        } else {
            reply.extend_from_slice(&[(body.len() + 3) as u8, 0, 0, 0]);
        }
        reply.extend_from_slice(&body);
        let n = reply.len().min(buf.len());
        buf[..n].copy_from_slice(&reply[..n]);
        Ok(n)
    }

    fn mode_select(&self, data: &[u8], save: bool, ten: bool) -> TResult<()> {
        let tag = if ten { "mode-select-10" } else { "mode-select-6" };
        self.requests.borrow_mut().push(format!("{}:save={}", tag, save));
        if ten && self.manifest.quirks.no_mode_10 {
            return Err(TransportError::Sense { key: 5, asc: 0x20, ascq: 0 });
        }
        if save && self.manifest.quirks.mode_select_save_fails {
            return Err(TransportError::Sense { key: 5, asc: 0x26, ascq: 0 });
        }
        let start = if ten {
            if data.len() < 8 {
                return Err(TransportError::ShortTransfer { expected: 8, actual: data.len() });
            }
            8 + be_u16(data, 6) as usize
        } else {
            if data.len() < 4 {
                return Err(TransportError::ShortTransfer { expected: 4, actual: data.len() });
            }
            4 + data[3] as usize
        };
        let page = data.get(start..).unwrap_or_default().to_vec();
        if page.is_empty() {
            return Err(TransportError::ShortTransfer { expected: start + 2, actual: data.len() });
        }
        let code = page[0] & 0x3F;
        let mut pages = self.pages.borrow_mut();
        pages.insert(scsi_mode_key(code, PageControl::Current), page.clone());
        if save {
            pages.insert(scsi_mode_key(code, PageControl::Saved), page.clone());
        }
        self.selects.borrow_mut().push(ModeSelect { page, save });
        Ok(())
    }
}

impl DeviceInfo for ReplayDevice {
    fn identity(&self) -> DeviceIdentity { self.manifest.identity.clone() }
    fn kind(&self) -> DriveKind { self.manifest.kind }
    fn interface(&self) -> AttachInterface { self.manifest.interface }
    fn family(&self) -> VendorFamily { self.manifest.family }
    fn farm_capabilities(&self) -> FarmCapabilities { self.manifest.farm }

    fn dma_alignment(&self) -> usize {
        match self.manifest.quirks.dma_alignment {
            0 => SECTOR,
            n => n,
        }
    }
}

impl AtaTransport for ReplayDevice {
    fn features(&self) -> AtaFeatures {
        self.manifest.ata
    }

    fn read_log(&self, log_address: u8, page: u16, feature: u16, buf: &mut [u8], _xfer_hint: u32) -> TResult<()> {
        self.check_alignment(buf.len())?;
        self.fill(&ata_log_key(log_address, feature), usize::from(page) * SECTOR, buf)
    }

    fn smart_read_log(&self, log_address: u8, buf: &mut [u8]) -> TResult<()> {
        self.fill(&smart_log_key(log_address), 0, buf)
    }

    fn smart_read_data(&self, buf: &mut [u8]) -> TResult<()> {
        self.fill(SMART_DATA_KEY, 0, buf)
    }

    fn smart_read_thresholds(&self, buf: &mut [u8]) -> TResult<()> {
        self.fill(SMART_THRESHOLDS_KEY, 0, buf)
    }

    fn smart_return_status(&self) -> TResult<TaskFile> {
        self.requests.borrow_mut().push("smart-return-status".to_string());
        let [lba_mid, lba_high] = self.manifest.return_status.ok_or(TransportError::Unsupported)?;
        Ok(TaskFile { lba_mid, lba_high, status: 0x50, ..Default::default() })
    }

    fn sct_status(&self, buf: &mut [u8]) -> TResult<()> {
        self.fill(SCT_STATUS_KEY, 0, buf)
    }

    fn as_scsi(&self) -> Option<&dyn ScsiTransport> {
        if self.manifest.satl { Some(self) } else { None }
    }
}

impl ScsiTransport for ReplayDevice {
    fn log_sense(&self, page: u8, subpage: u8, buf: &mut [u8]) -> TResult<usize> {
        self.check_alignment(buf.len())?;
        let data = self.fetch(&scsi_log_key(page, subpage))?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }

    fn log_sense_size(&self, page: u8, subpage: u8) -> TResult<u32> {
        let key = scsi_log_key(page, subpage);
        self.requests.borrow_mut().push(format!("size:{}", key));
        self.pages
            .borrow()
            .get(&key)
            .map(|d| d.len() as u32)
            .ok_or(TransportError::Unsupported)
    }

    fn mode_sense_6(&self, page: u8, control: PageControl, buf: &mut [u8]) -> TResult<usize> {
        self.mode_sense(page, control, buf, false)
    }

    fn mode_sense_10(&self, page: u8, control: PageControl, buf: &mut [u8]) -> TResult<usize> {
        self.mode_sense(page, control, buf, true)
    }

    fn mode_select_6(&self, data: &[u8], save: bool) -> TResult<()> {
        self.mode_select(data, save, false)
    }

    fn mode_select_10(&self, data: &[u8], save: bool) -> TResult<()> {
        self.mode_select(data, save, true)
    }

    fn request_sense(&self, buf: &mut [u8]) -> TResult<usize> {
        let data = self.fetch(REQUEST_SENSE_KEY)?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }
}

impl NvmeTransport for ReplayDevice {
    fn get_log_page(&self, lid: u8, _nsid: u32, buf: &mut [u8]) -> TResult<()> {
        self.fill(&nvme_log_key(lid), 0, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> DeviceIdentity {
        DeviceIdentity { model: "ST1".into(), serial: "S1".into(), firmware: "F1".into() }
    }

    #[test]
    fn serves_log_pages_by_offset() {
        let mut log = vec![0u8; 3 * SECTOR];
        log[SECTOR] = 0xAA;
        let dev = ReplayDevice::new(Manifest::new(DriveKind::Ata, identity()))
            .with_page(ata_log_key(0x03, 0), log);
        let mut buf = [0u8; SECTOR];
        dev.read_log(0x03, 1, 0, &mut buf, 0).unwrap();
        assert_eq!(buf[0], 0xAA);
        assert!(matches!(
            dev.read_log(0x03, 3, 0, &mut buf, 0),
            Err(TransportError::ShortTransfer { .. })
        ));
        assert!(matches!(dev.read_log(0x04, 0, 0, &mut buf, 0), Err(TransportError::Unsupported)));
        assert_eq!(dev.requests().len(), 3);
    }

    #[test]
    fn alignment_quirk_rejects_odd_transfers() {
        let mut m = Manifest::new(DriveKind::Scsi, identity());
        m.quirks.dma_alignment = 4096;
        let dev = ReplayDevice::new(m).with_page(scsi_log_key(0x3D, 0x03), vec![7; 100]);
        assert_eq!(dev.dma_alignment(), 4096);
        let mut odd = [0u8; 100];
        assert!(matches!(dev.log_sense(0x3D, 0x03, &mut odd), Err(TransportError::Other(_))));
        let mut whole = vec![0u8; 4096];
        assert_eq!(dev.log_sense(0x3D, 0x03, &mut whole).unwrap(), 100);
        assert_eq!(ReplayDevice::new(Manifest::new(DriveKind::Scsi, identity())).dma_alignment(), SECTOR);
    }

    #[test]
    fn mode_select_updates_current_page() {
        let dev = ReplayDevice::new(Manifest::new(DriveKind::Scsi, identity()))
            .with_page(scsi_mode_key(0x1C, PageControl::Current), vec![0x1C, 0x0A, 0, 3, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut buf = [0u8; 64];
        let n = dev.mode_sense_10(0x1C, PageControl::Current, &mut buf).unwrap();
        assert_eq!(n, 20);
        assert_eq!(buf[8], 0x1C);
        assert_eq!(buf[11] & 0x0F, 3);

        let mut data = buf[..n].to_vec();
        data[11] = 6;
        dev.mode_select_10(&data, false).unwrap();
        dev.mode_sense_6(0x1C, PageControl::Current, &mut buf).unwrap();
        assert_eq!(buf[4 + 3], 6);
        assert_eq!(dev.mode_selects().len(), 1);
        assert!(!dev.mode_selects()[0].save);
    }

    #[test]
    fn manifest_loads_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("nvme.bin"), vec![0x04u8; 512]).unwrap();
        fs::write(
            dir.path().join(MANIFEST_NAME),
            r#"{
                "identity": { "model": "NV1", "serial": "N1", "firmware": "1.0" },
                "kind": "nvme",
                "pages": { "nvme-log:02": "nvme.bin" }
            }"#,
        )
        .unwrap();
        let dev = ReplayDevice::open(dir.path()).unwrap();
        assert_eq!(dev.kind(), DriveKind::Nvme);
        assert_eq!(dev.family(), VendorFamily::Default);
        let mut buf = [0u8; 512];
        dev.get_log_page(0x02, 0xFFFF_FFFF, &mut buf).unwrap();
        assert_eq!(buf[0], 0x04);
    }

    #[test]
    fn missing_manifest_is_a_file_open_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(ReplayDevice::open(dir.path()), Err(Error::FileOpen { .. })));
    }
}
