use std::fs;
use std::path::Path;

use drivetel::check::{smart_check, CheckOptions};
use drivetel::errlog::{read_error_log, render_error_log};
use drivetel::models::device::{AttachInterface, DeviceIdentity, DriveKind, VendorFamily};
use drivetel::models::errlog::ErrorLogSource;
use drivetel::models::smart::AttributeFlags;
use drivetel::models::trip::CheckStatus;
use drivetel::smart::{read_smart, render_table, RenderMode, SmartData};
use drivetel::transport::replay::{
    nvme_log_key, scsi_log_key, smart_log_key, Manifest, ReplayDevice, MANIFEST_NAME, SMART_DATA_KEY,
    SMART_THRESHOLDS_KEY,
};
use drivetel::transport::{AtaFeatures, Device, SECTOR};

const NO_WAIT: CheckOptions = CheckOptions { ie_wait_ms: 0 };

fn seal(page: &mut [u8]) {
    let last = page.len() - 1;
    page[last] = 0;
    let sum = page.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    page[last] = sum.wrapping_neg();
}

fn smart_pages(records: &[(u8, u16, u8, u8, u8)]) -> (Vec<u8>, Vec<u8>) {
    let mut data = vec![0u8; SECTOR];
    let mut thresholds = vec![0u8; SECTOR];
    data[0] = 0x10;
    thresholds[0] = 0x10;
    for (i, &(id, flags, nominal, worst, threshold)) in records.iter().enumerate() {
        let off = 2 + i * 12;
        data[off] = id;
        data[off + 1..off + 3].copy_from_slice(&flags.to_le_bytes());
        data[off + 3] = nominal;
        data[off + 4] = worst;
        data[off + 5] = 3;
        thresholds[off] = id;
        thresholds[off + 1] = threshold;
    }
    seal(&mut data);
    seal(&mut thresholds);
    (data, thresholds)
}

/// One summary error-log entry: READ DMA EXT of 8 sectors at LBA 0x1234.
fn summary_error_log() -> Vec<u8> {
    let mut page = vec![0u8; SECTOR];
    page[0] = 1;
    page[1] = 1;
    let cmd = 2 + 4 * 12;
    page[cmd + 2] = 8;
    page[cmd + 3] = 0x34;
    page[cmd + 4] = 0x12;
    page[cmd + 6] = 0x40;
    page[cmd + 7] = 0x25;
    let err = 2 + 60;
    page[err + 1] = 0x40;
    page[err + 2] = 8;
    page[err + 3] = 0x34;
    page[err + 4] = 0x12;
    page[err + 6] = 0x40;
    page[err + 7] = 0x51;
    page[err + 27] = 0x03;
    page[err + 28..err + 30].copy_from_slice(&731u16.to_le_bytes());
    page[452..454].copy_from_slice(&1u16.to_le_bytes());
    seal(&mut page);
    page
}

fn write_capture(dir: &Path, mut manifest: Manifest, pages: &[(String, &str, Vec<u8>)]) {
    for (key, file, data) in pages {
        fs::write(dir.join(file), data).unwrap();
        manifest.pages.insert(key.clone(), file.to_string());
    }
    fs::write(dir.join(MANIFEST_NAME), serde_json::to_string_pretty(&manifest).unwrap()).unwrap();
}

fn ata_manifest() -> Manifest {
    let identity = DeviceIdentity { model: "ST4000NM000A".into(), serial: "ZC1234".into(), firmware: "SN04".into() };
    let mut m = Manifest::new(DriveKind::Ata, identity);
    m.family = VendorFamily::Seagate;
    m.return_status = Some([0x4F, 0xC2]);
    m.ata = AtaFeatures { smart_supported: true, smart_enabled: true, ..Default::default() };
    m
}

#[test]
fn captured_ata_drive_round_trips_through_disk() {
    let prefail = AttributeFlags::PREFAIL | AttributeFlags::ONLINE;
    let (data, thresholds) = smart_pages(&[(5, prefail, 100, 100, 36), (9, AttributeFlags::ONLINE, 90, 90, 0)]);
    let dir = tempfile::tempdir().unwrap();
    write_capture(
        dir.path(),
        ata_manifest(),
        &[
            (SMART_DATA_KEY.to_string(), "smart.bin", data),
            (SMART_THRESHOLDS_KEY.to_string(), "thresholds.bin", thresholds),
            (smart_log_key(0x01), "summary.bin", summary_error_log()),
        ],
    );

    let dev = ReplayDevice::open(dir.path()).unwrap();
    let device = dev.as_device();
    assert_eq!(device.kind(), DriveKind::Ata);
    assert_eq!(device.identity().serial, "ZC1234");

    let table = match read_smart(device).unwrap() {
        SmartData::Ata(t) => t,
        other => panic!("unexpected {:?}", other),
    };
    assert!(table.checksum_valid);
    assert!(table.thresholds_loaded);
    assert_eq!(table.get(5).unwrap().threshold, Some(36));
    let text = render_table(&table, device.family(), RenderMode::Hybrid);
    assert!(text.contains("Retired Sectors Count"), "{}", text);

    assert_eq!(smart_check(device, &NO_WAIT).unwrap().status, CheckStatus::Pass);

    let log = read_error_log(&dev).unwrap();
    assert_eq!(log.source, ErrorLogSource::Summary);
    assert_eq!(log.entries.len(), 1);
    let text = render_error_log(&log);
    assert!(text.contains("Error 1 occurred at disk power-on lifetime: 731 hours"), "{}", text);
    assert!(text.contains("Uncorrectable"), "{}", text);
}

#[test]
fn missing_page_file_is_a_file_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut m = ata_manifest();
    m.pages.insert(SMART_DATA_KEY.to_string(), "absent.bin".to_string());
    fs::write(dir.path().join(MANIFEST_NAME), serde_json::to_string(&m).unwrap()).unwrap();
    let err = ReplayDevice::open(dir.path()).err().unwrap();
    assert!(matches!(err, drivetel::Error::FileOpen { .. }));
}

#[test]
fn family_override_changes_attribute_names() {
    let (data, thresholds) = smart_pages(&[(5, AttributeFlags::ONLINE, 100, 100, 10)]);
    let mut dev = ReplayDevice::new(ata_manifest())
        .with_page(SMART_DATA_KEY, data)
        .with_page(SMART_THRESHOLDS_KEY, thresholds);
    let seagate = match read_smart(dev.as_device()).unwrap() {
        SmartData::Ata(t) => render_table(&t, dev.as_device().family(), RenderMode::Raw),
        other => panic!("unexpected {:?}", other),
    };
    assert!(seagate.contains("Retired Sectors Count"), "{}", seagate);

    dev.set_family(VendorFamily::Default);
    assert_eq!(dev.as_device().family(), VendorFamily::Default);
    let generic = match read_smart(dev.as_device()).unwrap() {
        SmartData::Ata(t) => render_table(&t, dev.as_device().family(), RenderMode::Raw),
        other => panic!("unexpected {:?}", other),
    };
    assert!(!generic.contains("Retired Sectors Count"), "{}", generic);
}

#[test]
fn tripped_attribute_fails_the_check() {
    let prefail = AttributeFlags::PREFAIL | AttributeFlags::ONLINE;
    let (data, thresholds) = smart_pages(&[(5, prefail, 36, 36, 36)]);
    let mut m = ata_manifest();
    m.return_status = None;
    let dev = ReplayDevice::new(m)
        .with_page(SMART_DATA_KEY, data)
        .with_page(SMART_THRESHOLDS_KEY, thresholds);

    let result = smart_check(dev.as_device(), &NO_WAIT).unwrap();
    assert_eq!(result.status, CheckStatus::Fail);
    assert_eq!(
        result.trip.unwrap().reason,
        "Retired Sectors Count [5] tripped! Current Value 36 below Threshold 36"
    );
}

#[test]
fn undecided_usb_bridge_falls_through_to_informational_exceptions() {
    let mut m = ata_manifest();
    m.return_status = None;
    m.interface = AttachInterface::Usb;
    m.satl = true;
    let mut ie_log = vec![0u8; 12];
    ie_log[0] = 0x2F;
    ie_log[8] = 0x5D;
    ie_log[9] = 0x10;
    let dev = ReplayDevice::new(m).with_page(scsi_log_key(0x2F, 0), ie_log);

    let result = smart_check(dev.as_device(), &NO_WAIT).unwrap();
    assert_eq!(result.status, CheckStatus::Fail);
    assert_eq!(result.trip.unwrap().reason, "Hardware Impending Failure - General Hard Drive Failure");
}

#[test]
fn nvme_critical_warning() {
    let identity = DeviceIdentity { model: "Nytro 5050".into(), serial: "N1".into(), firmware: "1".into() };
    let mut page = vec![0u8; 512];
    page[0] = 0x02;
    let dev = ReplayDevice::new(Manifest::new(DriveKind::Nvme, identity.clone())).with_page(nvme_log_key(0x02), page);
    let result = smart_check(dev.as_device(), &NO_WAIT).unwrap();
    assert_eq!(result.status, CheckStatus::Fail);
    assert_eq!(
        result.trip.unwrap().reason,
        "Temperature is above an over temperature threshold or below an under temperature threshold"
    );

    let healthy = ReplayDevice::new(Manifest::new(DriveKind::Nvme, identity)).with_page(nvme_log_key(0x02), vec![0u8; 512]);
    assert_eq!(smart_check(healthy.as_device(), &NO_WAIT).unwrap().status, CheckStatus::Pass);
    assert!(matches!(read_smart(healthy.as_device()).unwrap(), SmartData::Nvme(_)));
    assert!(matches!(healthy.as_device(), Device::Nvme(_)));
}
