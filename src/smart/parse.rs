use log::{debug, warn};

use crate::error::{alloc_zeroed, Error, Result};
use crate::models::smart::{Attribute, AttributeFlags, AttributeTable, NvmeHealth};
use crate::transport::{AtaTransport, Device, NvmeTransport, SECTOR};
use crate::util::bytes::{checksum_ok, le_u16};

pub const ATTRIBUTE_SLOTS: usize = 30;
const RECORD_LEN: usize = 12;
const FIRST_RECORD: usize = 2;

pub const NVME_HEALTH_LOG: u8 = 0x02;
pub const NVME_ALL_NAMESPACES: u32 = 0xFFFF_FFFF;

/// SMART data for whichever protocol the device speaks.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum SmartData {
    Ata(AttributeTable),
    Nvme(NvmeHealth),
}

fn threshold_for(thresholds: &[u8], id: u8) -> Option<u8> {
    (0..ATTRIBUTE_SLOTS)
        .map(|i| FIRST_RECORD + i * RECORD_LEN)
        .filter(|&off| off + RECORD_LEN <= thresholds.len())
        .find(|&off| thresholds[off] == id)
        .map(|off| thresholds[off + 1])
}

/// Decode a SMART READ DATA sector, attaching thresholds when a threshold
/// sector is available.
pub fn parse_attribute_page(data: &[u8], thresholds: Option<&[u8]>) -> Result<AttributeTable> {
    if data.len() < SECTOR {
        return Err(Error::Parse(format!("SMART data is {} bytes, expected {}", data.len(), SECTOR)));
    }
    let attributes = (0..ATTRIBUTE_SLOTS)
        .map(|i| &data[FIRST_RECORD + i * RECORD_LEN..FIRST_RECORD + (i + 1) * RECORD_LEN])
        .filter(|rec| rec[0] != 0)
        .map(|rec| {
            let mut raw = [0u8; 7];
            raw.copy_from_slice(&rec[5..12]);
            Attribute {
                id:        rec[0],
                flags:     AttributeFlags(le_u16(rec, 1)),
                nominal:   rec[3],
                worst:     rec[4],
                raw,
                threshold: thresholds.and_then(|t| threshold_for(t, rec[0])),
            }
        })
        .collect();

    Ok(AttributeTable {
        version: le_u16(data, 0),
        attributes,
        thresholds_loaded: thresholds.is_some(),
        checksum_valid: checksum_ok(&data[..SECTOR]),
    })
}

/// Read attributes and thresholds from an ATA device. A missing threshold
/// sector only degrades the table.
pub fn read_attributes(dev: &dyn AtaTransport) -> Result<AttributeTable> {
    let features = dev.features();
    if !features.smart_supported && !features.smart_enabled {
        return Err(Error::NotSupported("SMART is not supported by this device".into()));
    }
    if !features.smart_enabled {
        return Err(Error::NotSupported("SMART is disabled on this device".into()));
    }

    let mut data = alloc_zeroed(SECTOR)?;
    dev.smart_read_data(&mut data)?;

    let mut thresholds = alloc_zeroed(SECTOR)?;
    let thresholds = match dev.smart_read_thresholds(&mut thresholds) {
        Ok(()) => Some(thresholds),
        Err(e) => {
            warn!("SMART thresholds unavailable: {}", e);
            None
        }
    };

    let table = parse_attribute_page(&data, thresholds.as_deref())?;
    debug!("parsed {} SMART attribute(s), version {}", table.attributes.len(), table.version);
    Ok(table)
}

pub fn read_nvme_health(dev: &dyn NvmeTransport) -> Result<NvmeHealth> {
    let mut page = alloc_zeroed(NvmeHealth::PAGE_LEN)?;
    dev.get_log_page(NVME_HEALTH_LOG, NVME_ALL_NAMESPACES, &mut page)?;
    NvmeHealth::parse(&page).ok_or_else(|| Error::Parse("short NVMe health page".into()))
}

pub fn read_smart(device: Device<'_>) -> Result<SmartData> {
    match device {
        Device::Ata(dev)  => read_attributes(dev).map(SmartData::Ata),
        Device::Nvme(dev) => read_nvme_health(dev).map(SmartData::Nvme),
        Device::Scsi(_)   => Err(Error::NotSupported("SCSI devices have no attribute table".into())),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Build a SMART data sector from (id, flags, nominal, worst, raw) records.
    pub fn data_page(records: &[(u8, u16, u8, u8, [u8; 7])]) -> Vec<u8> {
        let mut page = vec![0u8; SECTOR];
        page[0] = 0x10;
        for (i, (id, flags, nominal, worst, raw)) in records.iter().enumerate() {
            let off = FIRST_RECORD + i * RECORD_LEN;
            page[off] = *id;
            page[off + 1..off + 3].copy_from_slice(&flags.to_le_bytes());
            page[off + 3] = *nominal;
            page[off + 4] = *worst;
            page[off + 5..off + 12].copy_from_slice(raw);
        }
        seal(&mut page);
        page
    }

    pub fn threshold_page(records: &[(u8, u8)]) -> Vec<u8> {
        let mut page = vec![0u8; SECTOR];
        page[0] = 0x10;
        for (i, (id, threshold)) in records.iter().enumerate() {
            let off = FIRST_RECORD + i * RECORD_LEN;
            page[off] = *id;
            page[off + 1] = *threshold;
        }
        seal(&mut page);
        page
    }

    /// Fix up byte 511 so the page sums to zero.
    pub fn seal(page: &mut [u8]) {
        let last = page.len() - 1;
        page[last] = 0;
        let sum = page.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        page[last] = sum.wrapping_neg();
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::models::device::{DeviceIdentity, DriveKind};
    use crate::transport::replay::{Manifest, ReplayDevice, SMART_DATA_KEY, SMART_THRESHOLDS_KEY};
    use crate::transport::AtaFeatures;

    fn ata(with_thresholds: bool) -> ReplayDevice {
        let mut m = Manifest::new(DriveKind::Ata, DeviceIdentity::default());
        m.ata = AtaFeatures { smart_supported: true, smart_enabled: true, ..Default::default() };
        let dev = ReplayDevice::new(m).with_page(
            SMART_DATA_KEY,
            data_page(&[(1, 0x000F, 80, 64, [0; 7]), (0, 0, 0, 0, [0; 7]), (9, 0x0032, 95, 95, [0x10, 0, 0, 0, 0, 0, 0])]),
        );
        if with_thresholds {
            dev.with_page(SMART_THRESHOLDS_KEY, threshold_page(&[(9, 0), (1, 44)]))
        } else {
            dev
        }
    }

    #[test]
    fn attributes_skip_empty_slots_and_join_thresholds() {
        let table = read_attributes(&ata(true)).unwrap();
        assert_eq!(table.version, 0x10);
        assert_eq!(table.attributes.len(), 2);
        assert!(table.checksum_valid);
        assert_eq!(table.get(1).unwrap().threshold, Some(44));
        assert_eq!(table.get(9).unwrap().threshold, Some(0));
        assert_eq!(table.get(9).unwrap().raw_counter(), 0x10);
    }

    #[test]
    fn missing_thresholds_degrade_only() {
        let table = read_attributes(&ata(false)).unwrap();
        assert!(!table.thresholds_loaded);
        assert!(table.attributes.iter().all(|a| a.threshold.is_none()));
    }

    #[test]
    fn disabled_smart_is_not_supported() {
        let dev = ReplayDevice::new(Manifest::new(DriveKind::Ata, DeviceIdentity::default()));
        assert!(matches!(read_attributes(&dev), Err(Error::NotSupported(_))));
    }

    #[test]
    fn data_read_failure_is_surfaced() {
        let mut m = Manifest::new(DriveKind::Ata, DeviceIdentity::default());
        m.ata.smart_enabled = true;
        let dev = ReplayDevice::new(m);
        assert!(matches!(read_attributes(&dev), Err(Error::Transport(_))));
    }

    #[test]
    fn scsi_has_no_attributes() {
        let dev = ReplayDevice::new(Manifest::new(DriveKind::Scsi, DeviceIdentity::default()));
        assert!(matches!(read_smart(Device::Scsi(&dev)), Err(Error::NotSupported(_))));
    }
}
