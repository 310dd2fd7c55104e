use drivetel::farm::{
    pull_combined_farm, pull_combined_farm_to_dir, FarmFile, FarmOptions, VecSink, ATA_FARM_FEATURE_CURRENT,
    ATA_FARM_FEATURE_FACTORY, ATA_FARM_FEATURE_SAVED, ATA_FARM_LOG, ATA_FARM_TIME_SERIES_LOG, ATA_PAGE_UNIT,
    ATA_TIME_SERIES_FEATURE_DISC, ATA_TIME_SERIES_FEATURE_WORKLOAD, ATA_TIME_SERIES_FRAMES, ATA_WORKLOAD_TRACE_LEN,
    SCSI_FARM_LOG_PAGE, SCSI_FARM_SUBPAGE_CURRENT,
};
use drivetel::models::device::{DeviceIdentity, DriveKind};
use drivetel::models::farm::SubpageKind;
use drivetel::transport::replay::{ata_log_key, scsi_log_key, Manifest, ReplayDevice};
use drivetel::transport::FarmCapabilities;
use drivetel::Error;

fn identity() -> DeviceIdentity {
    DeviceIdentity { model: "ST18000NM000J".into(), serial: "ZR5 0A/1".into(), firmware: "SN02".into() }
}

fn marked(len: usize, marker: u8) -> Vec<u8> {
    let mut v = vec![0u8; len];
    v[0] = marker;
    v
}

fn full_ata_drive() -> ReplayDevice {
    let mut m = Manifest::new(DriveKind::Ata, identity());
    m.farm = FarmCapabilities { farm: true, time_series: true, ..Default::default() };
    ReplayDevice::new(m)
        .with_page(ata_log_key(ATA_FARM_LOG, ATA_FARM_FEATURE_CURRENT), marked(ATA_PAGE_UNIT, 0xC1))
        .with_page(ata_log_key(ATA_FARM_LOG, ATA_FARM_FEATURE_FACTORY), marked(ATA_PAGE_UNIT, 0xF1))
        .with_page(ata_log_key(ATA_FARM_LOG, ATA_FARM_FEATURE_SAVED), marked(ATA_PAGE_UNIT, 0x5A))
        .with_page(
            ata_log_key(ATA_FARM_TIME_SERIES_LOG, ATA_TIME_SERIES_FEATURE_DISC),
            marked(ATA_TIME_SERIES_FRAMES * ATA_PAGE_UNIT, 0x75),
        )
        .with_page(
            ata_log_key(ATA_FARM_TIME_SERIES_LOG, ATA_TIME_SERIES_FEATURE_WORKLOAD),
            marked(ATA_WORKLOAD_TRACE_LEN, 0x3C),
        )
}

#[test]
fn ata_disc_pull_writes_all_seven_datasets() {
    let dev = full_ata_drive();
    let dir = tempfile::tempdir().unwrap();
    let (path, summary) = pull_combined_farm_to_dir(dev.as_device(), &FarmOptions::default(), dir.path()).unwrap();

    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("ZR5_0A_1_"), "{}", name);
    assert!(name.ends_with(".frmc"));
    assert_eq!(summary.file_size, 4_751_872);

    let file = FarmFile::open(&path).unwrap();
    let s = &file.summary;
    assert_eq!(s.header_length, 480);
    assert_eq!(s.content_bitmap, 0x7F);
    assert_eq!(s.descriptors.len(), 7);
    assert_eq!(s.descriptors[0].kind, SubpageKind::Current);
    assert_eq!(s.descriptors[0].offset, 512);
    assert_eq!(s.file_size, 4_751_872);
    assert_eq!(s.interface, "SATA");
    assert_eq!(s.serial, "ZR5 0A/1");

    let order: Vec<SubpageKind> = s.descriptors.iter().map(|d| d.kind).collect();
    assert_eq!(order, SubpageKind::EMISSION_ORDER.to_vec());

    assert_eq!(file.payload(SubpageKind::Current).unwrap()[0], 0xC1);
    assert_eq!(file.payload(SubpageKind::Factory).unwrap()[0], 0xF1);
    assert_eq!(file.payload(SubpageKind::Save).unwrap()[0], 0x5A);
    assert_eq!(file.payload(SubpageKind::TimeSeries).unwrap().len(), 16 * ATA_PAGE_UNIT);
    assert_eq!(file.payload(SubpageKind::TimeSeries).unwrap()[0], 0x75);
    assert_eq!(file.payload(SubpageKind::LongSave).unwrap().len(), 2 * ATA_PAGE_UNIT);
    assert_eq!(file.payload(SubpageKind::Sticky).unwrap().len(), 6 * ATA_PAGE_UNIT);
    assert_eq!(file.payload(SubpageKind::WorkloadTrace).unwrap()[0], 0x3C);
}

#[test]
fn scsi_current_only() {
    let mut m = Manifest::new(DriveKind::Scsi, identity());
    m.farm = FarmCapabilities { farm: true, ..Default::default() };
    let dev = ReplayDevice::new(m)
        .with_page(scsi_log_key(SCSI_FARM_LOG_PAGE, SCSI_FARM_SUBPAGE_CURRENT), marked(16_384, 0x3D));

    let (sink, summary) =
        pull_combined_farm(dev.as_device(), &FarmOptions::default(), |_| Ok(VecSink::default())).unwrap();
    assert_eq!(summary.content_bitmap, 0x01);
    assert_eq!(summary.header_length, 288);
    assert_eq!(summary.file_size, 16_896);

    let file = FarmFile::parse(sink.data).unwrap();
    assert_eq!(file.bytes().len(), 16_896);
    assert_eq!(file.summary.interface, "SAS ");
    assert_eq!(file.summary.descriptors[0].offset, 512);
    assert_eq!(file.payload(SubpageKind::Current).unwrap()[0], 0x3D);
    assert!(file.payload(SubpageKind::Factory).is_none());
}

#[test]
fn unsupported_drive_leaves_no_file() {
    let dev = ReplayDevice::new(Manifest::new(DriveKind::Ata, identity()));
    let dir = tempfile::tempdir().unwrap();
    let err = pull_combined_farm_to_dir(dev.as_device(), &FarmOptions::default(), dir.path()).unwrap_err();
    assert!(matches!(err, Error::NotSupported(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
