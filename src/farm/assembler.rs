use std::path::{Path, PathBuf};

use chrono::Local;
use log::{debug, info, warn};

use super::layout::{emit, order_datasets};
use super::sink::{FarmSink, FileSink};
use super::*;
use crate::error::{alloc_zeroed, Error, Result};
use crate::models::device::DeviceIdentity;
use crate::models::farm::{CopySource, FarmSummary, SubpageKind};
use crate::transport::{AtaTransport, Device, ScsiTransport};

/// One pulled dataset, owned until it is emitted.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub kind:     SubpageKind,
    pub payload:  Vec<u8>,
    pub start_ms: u64,
    pub end_ms:   u64,
}

#[derive(Debug, Clone, Copy)]
pub struct FarmOptions {
    /// ATA only: which copy of the frames the drive should return.
    pub copy_source:   CopySource,
    /// Sectors per transfer passed through to the transport (0 = default).
    pub transfer_hint: u32,
}

impl Default for FarmOptions {
    fn default() -> Self {
        Self { copy_source: CopySource::Disc, transfer_hint: 0 }
    }
}

/// Zeroed transfer buffer of at least `len` bytes, rounded up to the
/// transport's DMA alignment.
fn transfer_buffer(len: usize, alignment: usize) -> Result<Vec<u8>> {
    let alignment = alignment.max(1);
    alloc_zeroed(len.div_ceil(alignment) * alignment)
}

fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Pull every dataset the device offers. Individual read failures are logged
/// and skipped; only capability and allocation problems fail the call.
pub fn pull_datasets(device: Device<'_>, opts: &FarmOptions) -> Result<Vec<Dataset>> {
    match device {
        Device::Ata(dev)  => pull_ata(dev, opts),
        Device::Scsi(dev) => pull_scsi(dev),
        Device::Nvme(_)   => Err(Error::NotSupported("FARM logs are not available on NVMe devices".into())),
    }
}

/// Pull, lay out and emit a combined FARM file into the sink returned by
/// `open_sink`. The sink is only created once at least one dataset was read.
pub fn pull_combined_farm<S, F>(device: Device<'_>, opts: &FarmOptions, open_sink: F) -> Result<(S, FarmSummary)>
where
    S: FarmSink,
    F: FnOnce(&DeviceIdentity) -> Result<S>,
{
    let mut datasets = pull_datasets(device, opts)?;
    if datasets.is_empty() {
        return Err(Error::Failure("no FARM dataset could be read from the device".into()));
    }
    order_datasets(&mut datasets);

    let identity = device.identity();
    let mut sink = open_sink(&identity)?;
    let summary = emit(&mut sink, device.kind(), &identity, &datasets)?;
    info!(
        "combined FARM for {} written: {} dataset(s), bitmap {:#04x}, {} bytes",
        identity.serial,
        summary.descriptors.len(),
        summary.content_bitmap,
        summary.file_size
    );
    Ok((sink, summary))
}

/// Convenience wrapper writing `SERIAL_DATE_TIME.frmc` under `dir`.
pub fn pull_combined_farm_to_dir(device: Device<'_>, opts: &FarmOptions, dir: &Path) -> Result<(PathBuf, FarmSummary)> {
    let (sink, summary) = pull_combined_farm(device, opts, |id| FileSink::create(dir, &id.serial, Local::now()))?;
    Ok((sink.path().to_path_buf(), summary))
}

// ── ATA ───────────────────────────────────────────────────────────────

struct Frames {
    data:     Vec<u8>,
    start_ms: u64,
    end_ms:   u64,
}

fn read_ata_log(dev: &dyn AtaTransport, log: u8, feature: u16, len: usize, hint: u32) -> Result<Option<Frames>> {
    let mut data = transfer_buffer(len, dev.dma_alignment())?;
    let start_ms = now_ms();
    match dev.read_log(log, 0, feature, &mut data, hint) {
        Ok(()) => {
            data.truncate(len);
            debug!("read log {:#04x} feature {:#06x}: {} bytes", log, feature, len);
            Ok(Some(Frames { data, start_ms, end_ms: now_ms() }))
        }
        Err(e) => {
            warn!("log {:#04x} feature {:#06x} unavailable: {}", log, feature, e);
            Ok(None)
        }
    }
}

fn whole(kind: SubpageKind, frames: Frames) -> Dataset {
    Dataset { kind, payload: frames.data, start_ms: frames.start_ms, end_ms: frames.end_ms }
}

/// Cut a time-series read into datasets. Each entry is (kind, first frame, frame count).
fn slice_frames(frames: &Frames, plan: &[(SubpageKind, usize, usize)]) -> Result<Vec<Dataset>> {
    let mut out = Vec::with_capacity(plan.len());
    for &(kind, first, count) in plan {
        let start = first * ATA_PAGE_UNIT;
        let end = start + count * ATA_PAGE_UNIT;
        let slice = frames.data.get(start..end).ok_or_else(|| {
            Error::Failure(format!("time-series read too short for {} frames {}..{}", kind.label(), first, first + count))
        })?;
        let mut payload = Vec::new();
        payload.try_reserve_exact(slice.len()).map_err(|_| Error::MemoryFailure(slice.len()))?;
        payload.extend_from_slice(slice);
        out.push(Dataset { kind, payload, start_ms: frames.start_ms, end_ms: frames.end_ms });
    }
    Ok(out)
}

const DISC_SLICES: [(SubpageKind, usize, usize); 3] = [
    (SubpageKind::TimeSeries, 0,  16),
    (SubpageKind::LongSave,   16, 2),
    (SubpageKind::Sticky,     18, 6),
];

const FLASH_SLICES: [(SubpageKind, usize, usize); 6] = [
    (SubpageKind::Current,    0,  1),
    (SubpageKind::Save,       1,  1),
    (SubpageKind::TimeSeries, 2,  16),
    (SubpageKind::LongSave,   18, 2),
    (SubpageKind::Sticky,     20, 6),
    (SubpageKind::Factory,    26, 1),
];

fn pull_ata(dev: &dyn AtaTransport, opts: &FarmOptions) -> Result<Vec<Dataset>> {
    let caps = dev.farm_capabilities();
    if !caps.farm && !caps.time_series {
        return Err(Error::NotSupported("device does not support FARM".into()));
    }
    let hint = opts.transfer_hint;
    let series_len = ATA_TIME_SERIES_FRAMES * ATA_PAGE_UNIT;
    let mut out = Vec::new();

    match opts.copy_source {
        CopySource::Disc => {
            if caps.farm {
                for (kind, feature) in [
                    (SubpageKind::Current, ATA_FARM_FEATURE_CURRENT),
                    (SubpageKind::Factory, ATA_FARM_FEATURE_FACTORY),
                    (SubpageKind::Save,    ATA_FARM_FEATURE_SAVED),
                ] {
                    if let Some(frames) = read_ata_log(dev, ATA_FARM_LOG, feature, ATA_PAGE_UNIT, hint)? {
                        out.push(whole(kind, frames));
                    }
                }
            }
            if caps.time_series {
                if let Some(frames) = read_ata_log(dev, ATA_FARM_TIME_SERIES_LOG, ATA_TIME_SERIES_FEATURE_DISC, series_len, hint)? {
                    out.extend(slice_frames(&frames, &DISC_SLICES)?);
                }
            }
        }
        CopySource::Flash => {
            if !caps.time_series {
                return Err(Error::NotSupported("flash FARM copy needs the time-series log".into()));
            }
            if let Some(frames) = read_ata_log(dev, ATA_FARM_TIME_SERIES_LOG, ATA_TIME_SERIES_FEATURE_FLASH, series_len, hint)? {
                out.extend(slice_frames(&frames, &FLASH_SLICES)?);
            }
        }
    }

    if let Some(frames) = read_ata_log(dev, ATA_FARM_TIME_SERIES_LOG, ATA_TIME_SERIES_FEATURE_WORKLOAD, ATA_WORKLOAD_TRACE_LEN, hint)? {
        out.push(whole(SubpageKind::WorkloadTrace, frames));
    }
    Ok(out)
}

// ── SCSI ──────────────────────────────────────────────────────────────

/// Read a run of FARM subpages and concatenate them in subpage order. Returns
/// `None` when none of them could be read.
fn pull_scsi_group(dev: &dyn ScsiTransport, kind: SubpageKind, subpages: &[u8]) -> Result<Option<Dataset>> {
    let mut payload = Vec::new();
    let mut start_ms = None;
    let mut end_ms = 0;

    for &sub in subpages {
        let size = match dev.log_sense_size(SCSI_FARM_LOG_PAGE, sub) {
            Ok(0) => {
                warn!("FARM subpage {:#04x} reports zero length, skipped", sub);
                continue;
            }
            Ok(n) => n as usize,
            Err(e) => {
                warn!("FARM subpage {:#04x} size unavailable: {}", sub, e);
                continue;
            }
        };
        let mut buf = transfer_buffer(size, dev.dma_alignment())?;
        let t0 = now_ms();
        match dev.log_sense(SCSI_FARM_LOG_PAGE, sub, &mut buf) {
            Ok(n) => {
                buf.truncate(n.min(size));
                debug!("FARM subpage {:#04x}: {} bytes", sub, n);
                payload.try_reserve(buf.len()).map_err(|_| Error::MemoryFailure(buf.len()))?;
                payload.extend_from_slice(&buf);
                start_ms.get_or_insert(t0);
                end_ms = now_ms();
            }
            Err(e) => warn!("FARM subpage {:#04x} read failed: {}", sub, e),
        }
    }

    Ok(start_ms.map(|start_ms| Dataset { kind, payload, start_ms, end_ms }))
}

fn pull_scsi(dev: &dyn ScsiTransport) -> Result<Vec<Dataset>> {
    let caps = dev.farm_capabilities();
    if !caps.any() {
        return Err(Error::NotSupported("device does not support FARM".into()));
    }

    let time_series: Vec<u8> = SCSI_FARM_SUBPAGES_TIME_SERIES.collect();
    let sticky: Vec<u8> = SCSI_FARM_SUBPAGES_STICKY.collect();
    let groups: [(bool, SubpageKind, &[u8]); 5] = [
        (caps.farm,        SubpageKind::Current,    &[SCSI_FARM_SUBPAGE_CURRENT]),
        (caps.factory,     SubpageKind::Factory,    &[SCSI_FARM_SUBPAGE_FACTORY]),
        (caps.time_series, SubpageKind::TimeSeries, &time_series),
        (caps.long_saved,  SubpageKind::LongSave,   &SCSI_FARM_SUBPAGES_LONG_SAVED),
        (caps.sticky,      SubpageKind::Sticky,     &sticky),
    ];

    let mut out = Vec::new();
    for (supported, kind, subpages) in groups {
        if !supported {
            continue;
        }
        if let Some(ds) = pull_scsi_group(dev, kind, subpages)? {
            out.push(ds);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::farm::sink::VecSink;
    use crate::models::device::DriveKind;
    use crate::transport::replay::{ata_log_key, scsi_log_key, Manifest, ReplayDevice};
    use crate::transport::FarmCapabilities;

    fn identity() -> DeviceIdentity {
        DeviceIdentity { model: "ST16000NM".into(), serial: "ZL2".into(), firmware: "SN03".into() }
    }

    fn frames_with_markers(n: usize) -> Vec<u8> {
        let mut v = vec![0u8; n * ATA_PAGE_UNIT];
        for i in 0..n {
            v[i * ATA_PAGE_UNIT] = i as u8;
        }
        v
    }

    #[test]
    fn nvme_is_not_supported() {
        let dev = ReplayDevice::new(Manifest::new(DriveKind::Nvme, identity()));
        let err = pull_datasets(Device::Nvme(&dev), &FarmOptions::default()).unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    #[test]
    fn flash_copy_slices_one_read() {
        let mut m = Manifest::new(DriveKind::Ata, identity());
        m.farm = FarmCapabilities { time_series: true, ..Default::default() };
        let dev = ReplayDevice::new(m)
            .with_page(ata_log_key(ATA_FARM_TIME_SERIES_LOG, ATA_TIME_SERIES_FEATURE_FLASH), frames_with_markers(27));
        let opts = FarmOptions { copy_source: CopySource::Flash, transfer_hint: 0 };
        let sets = pull_datasets(Device::Ata(&dev), &opts).unwrap();

        let find = |k: SubpageKind| sets.iter().find(|d| d.kind == k).unwrap();
        assert_eq!(find(SubpageKind::Current).payload[0], 0);
        assert_eq!(find(SubpageKind::Save).payload[0], 1);
        assert_eq!(find(SubpageKind::TimeSeries).payload.len(), 16 * ATA_PAGE_UNIT);
        assert_eq!(find(SubpageKind::TimeSeries).payload[0], 2);
        assert_eq!(find(SubpageKind::LongSave).payload[0], 18);
        assert_eq!(find(SubpageKind::LongSave).payload.len(), 2 * ATA_PAGE_UNIT);
        assert_eq!(find(SubpageKind::Sticky).payload[0], 20);
        assert_eq!(find(SubpageKind::Factory).payload[0], 26);
        // no workload trace captured: skipped, not fatal
        assert!(sets.iter().all(|d| d.kind != SubpageKind::WorkloadTrace));
    }

    #[test]
    fn flash_copy_without_time_series_is_not_supported() {
        let mut m = Manifest::new(DriveKind::Ata, identity());
        m.farm = FarmCapabilities { farm: true, ..Default::default() };
        let dev = ReplayDevice::new(m);
        let opts = FarmOptions { copy_source: CopySource::Flash, transfer_hint: 0 };
        assert!(matches!(pull_datasets(Device::Ata(&dev), &opts), Err(Error::NotSupported(_))));
    }

    #[test]
    fn scsi_group_survives_partial_failure() {
        let mut m = Manifest::new(DriveKind::Scsi, identity());
        m.farm = FarmCapabilities { sticky: true, ..Default::default() };
        let dev = ReplayDevice::new(m)
            .with_page(scsi_log_key(SCSI_FARM_LOG_PAGE, 0xC3), vec![3; 100])
            .with_page(scsi_log_key(SCSI_FARM_LOG_PAGE, 0xC5), vec![5; 50]);
        let sets = pull_datasets(Device::Scsi(&dev), &FarmOptions::default()).unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].kind, SubpageKind::Sticky);
        assert_eq!(sets[0].payload.len(), 150);
        assert_eq!(sets[0].payload[0], 3);
        assert_eq!(sets[0].payload[100], 5);
    }

    #[test]
    fn transfers_are_rounded_to_dma_alignment() {
        assert_eq!(transfer_buffer(100, 4096).unwrap().len(), 4096);
        assert_eq!(transfer_buffer(8192, 4096).unwrap().len(), 8192);
        assert_eq!(transfer_buffer(100, 0).unwrap().len(), 100);

        let mut m = Manifest::new(DriveKind::Scsi, identity());
        m.farm = FarmCapabilities { sticky: true, ..Default::default() };
        m.quirks.dma_alignment = 4096;
        let dev = ReplayDevice::new(m)
            .with_page(scsi_log_key(SCSI_FARM_LOG_PAGE, 0xC2), vec![2; 100])
            .with_page(scsi_log_key(SCSI_FARM_LOG_PAGE, 0xC4), vec![4; 50]);
        let sets = pull_datasets(Device::Scsi(&dev), &FarmOptions::default()).unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].payload.len(), 150);
        assert_eq!(sets[0].payload[99], 2);
        assert_eq!(sets[0].payload[100], 4);
    }

    #[test]
    fn nothing_read_produces_no_sink() {
        let mut m = Manifest::new(DriveKind::Scsi, identity());
        m.farm = FarmCapabilities { farm: true, factory: true, ..Default::default() };
        let dev = ReplayDevice::new(m);
        let mut opened = false;
        let err = pull_combined_farm(Device::Scsi(&dev), &FarmOptions::default(), |_| {
            opened = true;
            Ok(VecSink::default())
        })
        .unwrap_err();
        assert!(matches!(err, Error::Failure(_)));
        assert!(!opened);
    }
}
