use log::debug;

use super::assembler::Dataset;
use super::sink::FarmSink;
use super::{
    ALIGNMENT, COMBINED_SIGNATURE, DESCRIPTOR_LEN, HEADER_LEN, VERSION_MAJOR, VERSION_MINOR,
    VERSION_PATCH,
};
use crate::error::{Error, Result};
use crate::models::device::{DeviceIdentity, DriveKind};
use crate::models::farm::{DatasetDescriptor, FarmSummary, SubpageKind};
use crate::util::bytes::{put_le_u16, put_le_u32, put_le_u64, put_padded_ascii, round_up};

const ZEROS: [u8; ALIGNMENT as usize] = [0; ALIGNMENT as usize];

/// Byte-exact placement of every region of a combined file.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Header plus descriptors, excluding padding.
    pub header_length:  u16,
    pub header_padding: u64,
    pub content_bitmap: u32,
    /// Present datasets in emission order, offsets filled in.
    pub descriptors:    Vec<DatasetDescriptor>,
    /// Zero bytes following each payload; the last entry is always 0.
    pub payload_padding: Vec<u64>,
    pub file_size:      u64,
}

fn emission_rank(kind: SubpageKind) -> usize {
    SubpageKind::EMISSION_ORDER
        .iter()
        .position(|k| *k == kind)
        .unwrap_or(SubpageKind::EMISSION_ORDER.len())
}

/// Sort datasets into emission order. Duplicate kinds keep only the first.
pub fn order_datasets(datasets: &mut Vec<Dataset>) {
    datasets.sort_by_key(|d| emission_rank(d.kind));
    datasets.dedup_by_key(|d| d.kind);
}

/// Compute offsets and padding for `datasets`, which must already be in
/// emission order.
pub fn plan(datasets: &[Dataset]) -> Result<Layout> {
    let header_length = HEADER_LEN + DESCRIPTOR_LEN * datasets.len();
    let header_length = u16::try_from(header_length)
        .map_err(|_| Error::BadParameter(format!("{} datasets do not fit a header", datasets.len())))?;

    let mut offset = round_up(u64::from(header_length), ALIGNMENT);
    let header_padding = offset - u64::from(header_length);

    let mut content_bitmap = 0u32;
    let mut descriptors = Vec::with_capacity(datasets.len());
    let mut payload_padding = Vec::with_capacity(datasets.len());

    for (i, ds) in datasets.iter().enumerate() {
        let length = u32::try_from(ds.payload.len())
            .map_err(|_| Error::BadParameter(format!("{} payload too large", ds.kind.label())))?;
        let start = u32::try_from(offset)
            .map_err(|_| Error::BadParameter("combined file exceeds 4 GiB".to_string()))?;
        descriptors.push(DatasetDescriptor {
            kind:     ds.kind,
            offset:   start,
            length,
            start_ms: ds.start_ms,
            end_ms:   ds.end_ms,
        });
        content_bitmap |= 1 << ds.kind.bit();

        offset += u64::from(length);
        let pad = if i + 1 == datasets.len() {
            0
        } else {
            round_up(offset, ALIGNMENT) - offset
        };
        offset += pad;
        payload_padding.push(pad);
    }

    Ok(Layout {
        header_length,
        header_padding,
        content_bitmap,
        descriptors,
        payload_padding,
        file_size: offset,
    })
}

/// Encode the fixed 256-byte header.
pub fn encode_header(layout: &Layout, kind: DriveKind, identity: &DeviceIdentity) -> [u8; HEADER_LEN] {
    let mut h = [0u8; HEADER_LEN];
    h[0..16].copy_from_slice(COMBINED_SIGNATURE);
    put_le_u16(&mut h, 18, VERSION_PATCH);
    put_le_u16(&mut h, 20, VERSION_MINOR);
    put_le_u16(&mut h, 22, VERSION_MAJOR);
    h[24..28].copy_from_slice(kind.interface_tag().as_bytes());
    put_padded_ascii(&mut h, 32, 40, &identity.model);
    put_padded_ascii(&mut h, 80, 20, &identity.serial);
    put_padded_ascii(&mut h, 104, 8, &identity.firmware);
    put_le_u16(&mut h, 116, layout.header_length);
    put_le_u32(&mut h, 118, layout.content_bitmap);
    put_le_u16(&mut h, 252, layout.descriptors.len() as u16);
    put_le_u16(&mut h, 254, DESCRIPTOR_LEN as u16);
    h
}

pub fn encode_descriptor(d: &DatasetDescriptor) -> [u8; DESCRIPTOR_LEN] {
    let mut b = [0u8; DESCRIPTOR_LEN];
    b[0..8].copy_from_slice(d.kind.signature());
    put_le_u32(&mut b, 8, d.offset);
    put_le_u32(&mut b, 12, d.length);
    put_le_u64(&mut b, 16, d.start_ms);
    put_le_u64(&mut b, 24, d.end_ms);
    b
}

fn write_zeros(sink: &mut dyn FarmSink, mut n: u64) -> std::io::Result<()> {
    while n > 0 {
        let chunk = n.min(ALIGNMENT) as usize;
        sink.write(&ZEROS[..chunk])?;
        n -= chunk as u64;
    }
    Ok(())
}

fn emit_body(
    sink: &mut dyn FarmSink,
    layout: &Layout,
    kind: DriveKind,
    identity: &DeviceIdentity,
    datasets: &[Dataset],
) -> std::io::Result<()> {
    sink.write(&encode_header(layout, kind, identity))?;
    for d in &layout.descriptors {
        sink.write(&encode_descriptor(d))?;
    }
    write_zeros(sink, layout.header_padding)?;
    for (ds, pad) in datasets.iter().zip(&layout.payload_padding) {
        sink.write(&ds.payload)?;
        write_zeros(sink, *pad)?;
    }
    sink.flush()
}

/// Write a complete combined file to `sink` and close it. The sink is closed
/// on every path; a write failure is reported as `Error::Write`.
pub fn emit(
    sink: &mut dyn FarmSink,
    kind: DriveKind,
    identity: &DeviceIdentity,
    datasets: &[Dataset],
) -> Result<FarmSummary> {
    let layout = plan(datasets)?;
    debug!(
        "FARM layout: {} dataset(s), header {} + {} pad, {} bytes total",
        layout.descriptors.len(),
        layout.header_length,
        layout.header_padding,
        layout.file_size
    );

    let written = emit_body(sink, &layout, kind, identity, datasets);
    let closed = sink.close();
    written.map_err(Error::Write)?;
    closed.map_err(Error::Write)?;

    Ok(FarmSummary {
        version:        (VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH),
        interface:      kind.interface_tag().to_string(),
        model:          identity.model.clone(),
        serial:         identity.serial.clone(),
        firmware:       identity.firmware.clone(),
        header_length:  layout.header_length,
        content_bitmap: layout.content_bitmap,
        descriptors:    layout.descriptors,
        file_size:      layout.file_size,
    })
}
