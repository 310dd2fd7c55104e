//! Linux backend.
//!
//! ATA and SCSI drives are driven through the sg `SG_IO` ioctl (ATA commands
//! wrapped in ATA PASS-THROUGH(16)), NVMe drives through the admin passthru
//! ioctl of the NVMe driver.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr;

use libc::{c_int, c_uchar, c_uint, c_ushort, c_void};
use log::{debug, trace};

use super::{
    AtaFeatures, AtaTransport, Device, DeviceInfo, FarmCapabilities, NvmeTransport, PageControl,
    ScsiTransport, TResult, TaskFile, SECTOR,
};
use crate::check::sense::SenseCodes;
use crate::errlog::directory::LogDirectory;
use crate::error::{Error, Result, TransportError};
use crate::farm::{
    ATA_FARM_LOG, ATA_FARM_TIME_SERIES_LOG, SCSI_FARM_LOG_PAGE, SCSI_FARM_SUBPAGES_LONG_SAVED,
    SCSI_FARM_SUBPAGES_STICKY, SCSI_FARM_SUBPAGES_TIME_SERIES, SCSI_FARM_SUBPAGE_CURRENT,
    SCSI_FARM_SUBPAGE_FACTORY,
};
use crate::models::device::{AttachInterface, DeviceIdentity, DriveKind, VendorFamily};
use crate::util::bytes::{ascii_field, ata_string, be_u16, le_u16, put_be_u16};

// ── ioctls ────────────────────────────────────────────────────────────

// SG_IO from <scsi/sg.h>
nix::ioctl_readwrite_bad!(sg_io, 0x2285, SgIoHdr);
nix::ioctl_readwrite!(nvme_admin_cmd, b'N', 0x41, NvmeAdminCmd);

const SG_DXFER_NONE: i32 = -1;
const SG_DXFER_TO_DEV: i32 = -2;
const SG_DXFER_FROM_DEV: i32 = -3;

const SENSE_LEN: usize = 64;
const DEFAULT_TIMEOUT_MS: u32 = 20_000;
const LOG_TIMEOUT_MS: u32 = 60_000;

/// `struct sg_io_hdr` from `<scsi/sg.h>`.
#[repr(C)]
struct SgIoHdr {
    interface_id:    c_int,
    dxfer_direction: c_int,
    cmd_len:         c_uchar,
    mx_sb_len:       c_uchar,
    iovec_count:     c_ushort,
    dxfer_len:       c_uint,
    dxferp:          *mut c_void,
    cmdp:            *mut u8,
    sbp:             *mut u8,
    timeout:         c_uint,
    flags:           c_uint,
    pack_id:         c_int,
    usr_ptr:         *mut c_void,
    status:          c_uchar,
    masked_status:   c_uchar,
    msg_status:      c_uchar,
    sb_len_wr:       c_uchar,
    host_status:     c_ushort,
    driver_status:   c_ushort,
    resid:           c_int,
    duration:        c_uint,
    info:            c_uint,
}

/// `struct nvme_passthru_cmd` from `<linux/nvme_ioctl.h>`.
#[repr(C)]
#[derive(Debug, Default)]
struct NvmeAdminCmd {
    opcode:       u8,
    flags:        u8,
    rsvd1:        u16,
    nsid:         u32,
    cdw2:         u32,
    cdw3:         u32,
    metadata:     u64,
    addr:         u64,
    metadata_len: u32,
    data_len:     u32,
    cdw10:        u32,
    cdw11:        u32,
    cdw12:        u32,
    cdw13:        u32,
    cdw14:        u32,
    cdw15:        u32,
    timeout_ms:   u32,
    result:       u32,
}

enum DataPhase<'b> {
    None,
    In(&'b mut [u8]),
    Out(&'b [u8]),
}

struct SgReply {
    status:      u8,
    host_status: u16,
    resid:       usize,
    sense:       Vec<u8>,
}

// ── ATA PASS-THROUGH(16) ──────────────────────────────────────────────

const ATA_16: u8 = 0x85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AtaProtocol {
    NonData,
    PioIn,
}

impl AtaProtocol {
    fn bits(&self) -> u8 {
        match self {
            AtaProtocol::NonData => 3,
            AtaProtocol::PioIn   => 4,
        }
    }
}

/// Registers of one ATA command.
#[derive(Debug, Clone, Copy, Default)]
struct AtaCommand {
    command:  u8,
    features: u16,
    count:    u16,
    lba:      u64,
    device:   u8,
    ext:      bool,
}

const ATA_IDENTIFY: u8 = 0xEC;
const ATA_READ_LOG_EXT: u8 = 0x2F;
const ATA_SMART: u8 = 0xB0;
const SMART_READ_DATA: u16 = 0xD0;
const SMART_READ_THRESHOLDS: u16 = 0xD1;
const SMART_READ_LOG: u16 = 0xD5;
const SMART_RETURN_STATUS: u16 = 0xDA;
const SMART_LBA_SIGNATURE: u64 = 0x00C2_4F00;

const SCT_STATUS_LOG: u8 = 0xE0;
const DEFAULT_XFER_SECTORS: usize = 128;

impl AtaCommand {
    fn smart(subcommand: u16) -> Self {
        Self { command: ATA_SMART, features: subcommand, lba: SMART_LBA_SIGNATURE, ..Default::default() }
    }

    fn cdb(&self, protocol: AtaProtocol, check_condition: bool) -> [u8; 16] {
        let mut cdb = [0u8; 16];
        cdb[0] = ATA_16;
        cdb[1] = (protocol.bits() << 1) | u8::from(self.ext);
        if protocol == AtaProtocol::PioIn {
            // T_DIR from device, BYT_BLOK, length in the count field
            cdb[2] = 0x08 | 0x04 | 0x02;
        }
        if check_condition {
            cdb[2] |= 0x20;
        }
        let [f_lo, f_hi] = self.features.to_le_bytes();
        let [c_lo, c_hi] = self.count.to_le_bytes();
        let lba = self.lba.to_le_bytes();
        cdb[3] = f_hi;
        cdb[4] = f_lo;
        cdb[5] = c_hi;
        cdb[6] = c_lo;
        cdb[7] = lba[3];
        cdb[8] = lba[0];
        cdb[9] = lba[4];
        cdb[10] = lba[1];
        cdb[11] = lba[5];
        cdb[12] = lba[2];
        cdb[13] = self.device;
        cdb[14] = self.command;
        cdb
    }
}

/// Output registers from the ATA Status Return sense descriptor.
fn ata_return_descriptor(sense: &[u8]) -> Option<TaskFile> {
    if sense.len() < 22 || sense[0] & 0x7F != 0x72 {
        return None;
    }
    let mut desc = &sense[8..];
    while desc.len() >= 2 {
        let len = usize::from(desc[1]) + 2;
        if desc[0] == 0x09 && desc.len() >= 14 {
            return Some(TaskFile {
                error:    desc[3],
                count:    desc[5],
                lba_low:  desc[7],
                lba_mid:  desc[9],
                lba_high: desc[11],
                device:   desc[12],
                status:   desc[13],
            });
        }
        desc = desc.get(len..)?;
    }
    None
}

fn nix_io(e: nix::Error) -> TransportError {
    TransportError::Io(io::Error::from(e))
}

// ── device ────────────────────────────────────────────────────────────

/// A drive opened through its `/dev` node.
pub struct LinuxDevice {
    path:      PathBuf,
    file:      File,
    kind:      DriveKind,
    interface: AttachInterface,
    identity:  DeviceIdentity,
    family:    VendorFamily,
    ata:       AtaFeatures,
    farm:      FarmCapabilities,
}

fn family_from_model(model: &str) -> VendorFamily {
    let upper = model.to_ascii_uppercase();
    if upper.starts_with("ST") {
        VendorFamily::Seagate
    } else if upper.contains("SAMSUNG") {
        VendorFamily::Samsung
    } else if upper.starts_with("MAXTOR") {
        VendorFamily::Maxtor
    } else {
        VendorFamily::Default
    }
}

impl LinuxDevice {
    /// Open `path` and work out which protocol the drive speaks.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .or_else(|_| OpenOptions::new().read(true).custom_flags(libc::O_NONBLOCK).open(path))
            .map_err(|source| Error::FileOpen { path: path.to_path_buf(), source })?;

        let mut dev = Self {
            path: path.to_path_buf(),
            file,
            kind: DriveKind::Scsi,
            interface: AttachInterface::Unknown,
            identity: DeviceIdentity::default(),
            family: VendorFamily::Default,
            ata: AtaFeatures::default(),
            farm: FarmCapabilities::default(),
        };

        let is_nvme = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.starts_with("nvme"));
        if is_nvme {
            dev.probe_nvme()?;
        } else {
            dev.probe_scsi_or_ata()?;
        }
        dev.family = family_from_model(&dev.identity.model);
        debug!(
            "{}: {} drive {} (serial {}, firmware {}, family {})",
            dev.path.display(),
            dev.kind.label(),
            dev.identity.model,
            dev.identity.serial,
            dev.identity.firmware,
            dev.family
        );
        Ok(dev)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_family(&mut self, family: VendorFamily) {
        self.family = family;
    }

    pub fn as_device(&self) -> Device<'_> {
        match self.kind {
            DriveKind::Ata  => Device::Ata(self),
            DriveKind::Scsi => Device::Scsi(self),
            DriveKind::Nvme => Device::Nvme(self),
        }
    }

    fn probe_nvme(&mut self) -> Result<()> {
        let mut id = vec![0u8; 4096];
        self.nvme_admin(0x06, 0, 1, 0, &mut id)?;
        self.kind = DriveKind::Nvme;
        self.interface = AttachInterface::Nvme;
        self.identity = DeviceIdentity {
            serial:   ascii_field(&id, 4, 20),
            model:    ascii_field(&id, 24, 40),
            firmware: ascii_field(&id, 64, 8),
        };
        Ok(())
    }

    fn probe_scsi_or_ata(&mut self) -> Result<()> {
        let mut inq = [0u8; 96];
        let n = self.scsi(&[0x12, 0, 0, 0, inq.len() as u8, 0], DataPhase::In(&mut inq), DEFAULT_TIMEOUT_MS)?;
        if n < 36 {
            return Err(Error::Parse(format!("INQUIRY returned {} bytes", n)));
        }
        let vendor = ascii_field(&inq, 8, 8);

        let mut identify = vec![0u8; SECTOR];
        let ata_ok = self
            .ata(&AtaCommand { command: ATA_IDENTIFY, count: 1, ..Default::default() }, AtaProtocol::PioIn, false, DataPhase::In(&mut identify), DEFAULT_TIMEOUT_MS)
            .is_ok();
        if ata_ok {
            self.apply_identify(&identify);
            self.interface = if vendor == "ATA" { AttachInterface::Sata } else { AttachInterface::Usb };
            self.farm = self.probe_ata_farm();
            return Ok(());
        }

        self.kind = DriveKind::Scsi;
        self.interface = AttachInterface::Sas;
        self.identity = DeviceIdentity {
            model:    format!("{} {}", vendor, ascii_field(&inq, 16, 16)).trim().to_string(),
            serial:   self.unit_serial().unwrap_or_default(),
            firmware: ascii_field(&inq, 32, 4),
        };
        self.farm = self.probe_scsi_farm();
        Ok(())
    }

    fn apply_identify(&mut self, id: &[u8]) {
        let word = |w: usize| le_u16(id, w * 2);
        self.kind = DriveKind::Ata;
        self.identity = DeviceIdentity {
            serial:   ata_string(id, 20, 20),
            firmware: ata_string(id, 46, 8),
            model:    ata_string(id, 54, 40),
        };
        self.ata = AtaFeatures {
            smart_supported:     word(82) & 0x0001 != 0,
            smart_enabled:       word(85) & 0x0001 != 0,
            smart_error_logging: word(84) & 0x0001 != 0 || word(87) & 0x0001 != 0,
            gpl_supported:       word(84) & 0x0020 != 0 || word(87) & 0x0020 != 0,
            sct_supported:       word(206) & 0x0001 != 0,
        };
    }

    fn probe_ata_farm(&self) -> FarmCapabilities {
        if !self.ata.gpl_supported {
            return FarmCapabilities::default();
        }
        let mut page = vec![0u8; SECTOR];
        let dir = match self.read_log(0x00, 0, 0, &mut page, 0) {
            Ok(()) => LogDirectory::parse(&page).ok(),
            Err(e) => {
                debug!("GPL directory unreadable: {}", e);
                None
            }
        };
        let (farm, series) = dir.map_or((false, false), |d| (d.pages(ATA_FARM_LOG) > 0, d.pages(ATA_FARM_TIME_SERIES_LOG) > 0));
        FarmCapabilities {
            farm,
            factory:     farm,
            time_series: series,
            long_saved:  series,
            sticky:      series,
        }
    }

    /// Supported log pages and subpages (page 0x00, subpage 0xFF).
    fn probe_scsi_farm(&self) -> FarmCapabilities {
        let mut buf = vec![0u8; 1024];
        let n = match self.log_sense(0x00, 0xFF, &mut buf) {
            Ok(n) => n,
            Err(e) => {
                debug!("supported log subpages unavailable: {}", e);
                return FarmCapabilities::default();
            }
        };
        let end = (usize::from(be_u16(&buf, 2)) + 4).min(n);
        let farm_subpages: Vec<u8> = buf
            .get(4..end)
            .unwrap_or_default()
            .chunks_exact(2)
            .filter(|pair| pair[0] & 0x3F == SCSI_FARM_LOG_PAGE)
            .map(|pair| pair[1])
            .collect();
        let has = |sub: u8| farm_subpages.contains(&sub);
        FarmCapabilities {
            farm:        has(SCSI_FARM_SUBPAGE_CURRENT),
            factory:     has(SCSI_FARM_SUBPAGE_FACTORY),
            time_series: SCSI_FARM_SUBPAGES_TIME_SERIES.into_iter().any(has),
            long_saved:  SCSI_FARM_SUBPAGES_LONG_SAVED.iter().copied().any(has),
            sticky:      SCSI_FARM_SUBPAGES_STICKY.into_iter().any(has),
        }
    }

    fn unit_serial(&self) -> Option<String> {
        let mut vpd = [0u8; 252];
        let n = self
            .scsi(&[0x12, 0x01, 0x80, 0, vpd.len() as u8, 0], DataPhase::In(&mut vpd), DEFAULT_TIMEOUT_MS)
            .ok()?;
        let len = usize::from(vpd[3]).min(n.saturating_sub(4));
        Some(ascii_field(&vpd, 4, len))
    }

    // ── transport plumbing ────────────────────────────────────────────

    fn execute(&self, cdb: &[u8], data: DataPhase<'_>, timeout_ms: u32) -> TResult<SgReply> {
        let mut cdb = cdb.to_vec();
        let mut sense = [0u8; SENSE_LEN];
        let (direction, ptr, len) = match data {
            DataPhase::None    => (SG_DXFER_NONE, ptr::null_mut(), 0),
            DataPhase::In(b)   => (SG_DXFER_FROM_DEV, b.as_mut_ptr() as *mut c_void, b.len()),
            DataPhase::Out(b)  => (SG_DXFER_TO_DEV, b.as_ptr() as *mut c_void, b.len()),
        };
        let mut hdr = SgIoHdr {
            interface_id:    i32::from(b'S'),
            dxfer_direction: direction,
            cmd_len:         cdb.len() as u8,
            mx_sb_len:       SENSE_LEN as u8,
            iovec_count:     0,
            dxfer_len:       len as u32,
            dxferp:          ptr,
            cmdp:            cdb.as_mut_ptr(),
            sbp:             sense.as_mut_ptr(),
            timeout:         timeout_ms,
            flags:           0,
            pack_id:         0,
            usr_ptr:         ptr::null_mut(),
            status:          0,
            masked_status:   0,
            msg_status:      0,
            sb_len_wr:       0,
            host_status:     0,
            driver_status:   0,
            resid:           0,
            duration:        0,
            info:            0,
        };
        trace!("SG_IO {:02x?}", cdb);
        // SAFETY: every pointer in `hdr` refers to a live buffer of the stated
        // length for the duration of the call.
        unsafe { sg_io(self.file.as_raw_fd(), &mut hdr) }.map_err(nix_io)?;

        let written = usize::from(hdr.sb_len_wr).min(SENSE_LEN);
        Ok(SgReply {
            status:      hdr.status,
            host_status: hdr.host_status,
            resid:       usize::try_from(hdr.resid).unwrap_or(0).min(len),
            sense:       sense[..written].to_vec(),
        })
    }

    /// Run a SCSI command; returns bytes transferred.
    fn scsi(&self, cdb: &[u8], data: DataPhase<'_>, timeout_ms: u32) -> TResult<usize> {
        let len = match &data {
            DataPhase::None   => 0,
            DataPhase::In(b)  => b.len(),
            DataPhase::Out(b) => b.len(),
        };
        let reply = self.execute(cdb, data, timeout_ms)?;
        if reply.host_status != 0 {
            return Err(TransportError::Other(format!("SG_IO host status {:#06x}", reply.host_status)));
        }
        if reply.status != 0 {
            return match SenseCodes::parse(&reply.sense) {
                // recovered error
                Some(s) if s.key == 0x01 => Ok(len - reply.resid),
                Some(s) => Err(TransportError::Sense { key: s.key, asc: s.asc, ascq: s.ascq }),
                None => Err(TransportError::Other(format!("SCSI status {:#04x}", reply.status))),
            };
        }
        Ok(len - reply.resid)
    }

    /// Run an ATA command through ATA PASS-THROUGH(16). With
    /// `check_condition` the output registers are returned.
    fn ata(
        &self,
        cmd: &AtaCommand,
        protocol: AtaProtocol,
        check_condition: bool,
        data: DataPhase<'_>,
        timeout_ms: u32,
    ) -> TResult<Option<TaskFile>> {
        let reply = self.execute(&cmd.cdb(protocol, check_condition), data, timeout_ms)?;
        if reply.host_status != 0 {
            return Err(TransportError::Other(format!("SG_IO host status {:#06x}", reply.host_status)));
        }
        let registers = ata_return_descriptor(&reply.sense);
        if let Some(tf) = registers {
            if tf.status & 0x01 != 0 {
                return Err(TransportError::Ata { status: tf.status, error: tf.error });
            }
        }
        if reply.status != 0 && registers.is_none() {
            return Err(match SenseCodes::parse(&reply.sense) {
                Some(s) => TransportError::Sense { key: s.key, asc: s.asc, ascq: s.ascq },
                None    => TransportError::Other(format!("SCSI status {:#04x}", reply.status)),
            });
        }
        Ok(registers)
    }

    fn smart_pio(&self, subcommand: u16, log_address: u8, buf: &mut [u8]) -> TResult<()> {
        if buf.len() % SECTOR != 0 || buf.is_empty() {
            return Err(TransportError::Other(format!("SMART transfer of {} bytes", buf.len())));
        }
        let mut cmd = AtaCommand::smart(subcommand);
        cmd.count = (buf.len() / SECTOR) as u16;
        cmd.lba |= u64::from(log_address);
        self.ata(&cmd, AtaProtocol::PioIn, false, DataPhase::In(buf), DEFAULT_TIMEOUT_MS)?;
        Ok(())
    }

    fn nvme_admin(&self, opcode: u8, nsid: u32, cdw10: u32, cdw11: u32, buf: &mut [u8]) -> TResult<()> {
        let mut cmd = NvmeAdminCmd {
            opcode,
            nsid,
            addr: buf.as_mut_ptr() as u64,
            data_len: buf.len() as u32,
            cdw10,
            cdw11,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            ..Default::default()
        };
        // SAFETY: `addr` points at `buf`, which outlives the call and is
        // `data_len` bytes long.
        let status = unsafe { nvme_admin_cmd(self.file.as_raw_fd(), &mut cmd) }.map_err(nix_io)?;
        if status != 0 {
            return Err(TransportError::Other(format!("NVMe admin opcode {:#04x} status {:#06x}", opcode, status)));
        }
        Ok(())
    }
}

impl DeviceInfo for LinuxDevice {
    fn identity(&self) -> DeviceIdentity { self.identity.clone() }
    fn kind(&self) -> DriveKind { self.kind }
    fn interface(&self) -> AttachInterface { self.interface }
    fn family(&self) -> VendorFamily { self.family }
    fn farm_capabilities(&self) -> FarmCapabilities { self.farm }
}

impl AtaTransport for LinuxDevice {
    fn features(&self) -> AtaFeatures {
        self.ata
    }

    fn read_log(&self, log_address: u8, page: u16, feature: u16, buf: &mut [u8], xfer_hint: u32) -> TResult<()> {
        if buf.len() % SECTOR != 0 {
            return Err(TransportError::Other(format!("log transfer of {} bytes", buf.len())));
        }
        let per_call = match xfer_hint {
            0 => DEFAULT_XFER_SECTORS,
            n => (n as usize).min(usize::from(u16::MAX)),
        };
        let mut page = usize::from(page);
        for chunk in buf.chunks_mut(per_call * SECTOR) {
            let sectors = chunk.len() / SECTOR;
            let page_bytes = (page as u64).to_le_bytes();
            let cmd = AtaCommand {
                command:  ATA_READ_LOG_EXT,
                features: feature,
                count:    sectors as u16,
                // LBA(7:0) log address, LBA(15:8) page low, LBA(39:32) page high
                lba:      u64::from(log_address) | u64::from(page_bytes[0]) << 8 | u64::from(page_bytes[1]) << 32,
                device:   0x40,
                ext:      true,
            };
            self.ata(&cmd, AtaProtocol::PioIn, false, DataPhase::In(chunk), LOG_TIMEOUT_MS)?;
            page += sectors;
        }
        Ok(())
    }

    fn smart_read_log(&self, log_address: u8, buf: &mut [u8]) -> TResult<()> {
        self.smart_pio(SMART_READ_LOG, log_address, buf)
    }

    fn smart_read_data(&self, buf: &mut [u8]) -> TResult<()> {
        self.smart_pio(SMART_READ_DATA, 0, &mut buf[..SECTOR])
    }

    fn smart_read_thresholds(&self, buf: &mut [u8]) -> TResult<()> {
        self.smart_pio(SMART_READ_THRESHOLDS, 0, &mut buf[..SECTOR])
    }

    fn smart_return_status(&self) -> TResult<TaskFile> {
        let cmd = AtaCommand::smart(SMART_RETURN_STATUS);
        self.ata(&cmd, AtaProtocol::NonData, true, DataPhase::None, DEFAULT_TIMEOUT_MS)?
            .ok_or_else(|| TransportError::Other("no ATA registers returned".into()))
    }

    fn sct_status(&self, buf: &mut [u8]) -> TResult<()> {
        if self.ata.gpl_supported {
            self.read_log(SCT_STATUS_LOG, 0, 0, &mut buf[..SECTOR], 1)
        } else {
            self.smart_read_log(SCT_STATUS_LOG, &mut buf[..SECTOR])
        }
    }

    fn as_scsi(&self) -> Option<&dyn ScsiTransport> {
        Some(self)
    }
}

fn alloc_len(buf: &[u8]) -> u16 {
    buf.len().min(usize::from(u16::MAX)) as u16
}

fn mode_select_6_cdb(len: usize, save: bool) -> TResult<[u8; 6]> {
    let len = u8::try_from(len)
        .map_err(|_| TransportError::Other(format!("MODE SELECT(6) list of {} bytes", len)))?;
    Ok([0x15, 0x10 | u8::from(save), 0, 0, len, 0])
}

fn mode_select_10_cdb(len: usize, save: bool) -> TResult<[u8; 10]> {
    let len = u16::try_from(len)
        .map_err(|_| TransportError::Other(format!("MODE SELECT(10) list of {} bytes", len)))?;
    let mut cdb = [0u8; 10];
    cdb[0] = 0x55;
    cdb[1] = 0x10 | u8::from(save);
    put_be_u16(&mut cdb, 7, len);
    Ok(cdb)
}

impl ScsiTransport for LinuxDevice {
    fn log_sense(&self, page: u8, subpage: u8, buf: &mut [u8]) -> TResult<usize> {
        let mut cdb = [0u8; 10];
        cdb[0] = 0x4D;
        // PC = cumulative values
        cdb[2] = 0x40 | (page & 0x3F);
        cdb[3] = subpage;
        put_be_u16(&mut cdb, 7, alloc_len(buf));
        let len = usize::from(alloc_len(buf));
        self.scsi(&cdb, DataPhase::In(&mut buf[..len]), LOG_TIMEOUT_MS)
    }

    fn log_sense_size(&self, page: u8, subpage: u8) -> TResult<u32> {
        let mut header = [0u8; 4];
        self.log_sense(page, subpage, &mut header)?;
        Ok(u32::from(be_u16(&header, 2)) + 4)
    }

    fn mode_sense_6(&self, page: u8, control: PageControl, buf: &mut [u8]) -> TResult<usize> {
        let len = buf.len().min(255);
        let cdb = [0x1A, 0x08, (control.bits() << 6) | (page & 0x3F), 0, len as u8, 0];
        self.scsi(&cdb, DataPhase::In(&mut buf[..len]), DEFAULT_TIMEOUT_MS)
    }

    fn mode_sense_10(&self, page: u8, control: PageControl, buf: &mut [u8]) -> TResult<usize> {
        let mut cdb = [0u8; 10];
        cdb[0] = 0x5A;
        cdb[1] = 0x08;
        cdb[2] = (control.bits() << 6) | (page & 0x3F);
        put_be_u16(&mut cdb, 7, alloc_len(buf));
        let len = usize::from(alloc_len(buf));
        self.scsi(&cdb, DataPhase::In(&mut buf[..len]), DEFAULT_TIMEOUT_MS)
    }

    fn mode_select_6(&self, data: &[u8], save: bool) -> TResult<()> {
        let cdb = mode_select_6_cdb(data.len(), save)?;
        self.scsi(&cdb, DataPhase::Out(data), DEFAULT_TIMEOUT_MS)?;
        Ok(())
    }

    fn mode_select_10(&self, data: &[u8], save: bool) -> TResult<()> {
        let cdb = mode_select_10_cdb(data.len(), save)?;
        self.scsi(&cdb, DataPhase::Out(data), DEFAULT_TIMEOUT_MS)?;
        Ok(())
    }

    fn request_sense(&self, buf: &mut [u8]) -> TResult<usize> {
        let len = buf.len().min(252);
        let cdb = [0x03, 0, 0, 0, len as u8, 0];
        self.scsi(&cdb, DataPhase::In(&mut buf[..len]), DEFAULT_TIMEOUT_MS)
    }
}

impl NvmeTransport for LinuxDevice {
    fn get_log_page(&self, lid: u8, nsid: u32, buf: &mut [u8]) -> TResult<()> {
        let dwords = (buf.len() / 4) as u32;
        if dwords == 0 {
            return Err(TransportError::Other("empty NVMe log transfer".into()));
        }
        let numd = dwords - 1;
        let cdw10 = ((numd & 0xFFFF) << 16) | u32::from(lid);
        let cdw11 = numd >> 16;
        self.nvme_admin(0x02, nsid, cdw10, cdw11, buf)
    }
}
