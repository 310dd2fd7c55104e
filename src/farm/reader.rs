use std::fs;
use std::path::Path;

use super::{COMBINED_SIGNATURE, DESCRIPTOR_LEN, HEADER_LEN, VERSION_MAJOR};
use crate::error::{Error, Result};
use crate::models::farm::{DatasetDescriptor, FarmSummary, SubpageKind};
use crate::util::bytes::{ascii_field, le_u16, le_u32, le_u64};

/// A parsed combined FARM file held in memory.
#[derive(Debug, Clone)]
pub struct FarmFile {
    pub summary: FarmSummary,
    data:        Vec<u8>,
}

impl FarmFile {
    pub fn open(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|source| Error::FileOpen { path: path.to_path_buf(), source })?;
        Self::parse(data)
    }

    /// Validate the header and descriptor table. Files written by a newer
    /// major version are refused rather than guessed at.
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::Parse(format!("{} bytes is shorter than a FARM header", data.len())));
        }
        if &data[0..16] != COMBINED_SIGNATURE {
            return Err(Error::Parse("missing combined FARM signature".into()));
        }

        let patch = le_u16(&data, 18);
        let minor = le_u16(&data, 20);
        let major = le_u16(&data, 22);
        if major != VERSION_MAJOR {
            return Err(Error::NotSupported(format!("combined FARM version {}.{}.{}", major, minor, patch)));
        }

        let header_length = le_u16(&data, 116);
        let content_bitmap = le_u32(&data, 118);
        let count = usize::from(le_u16(&data, 252));
        let descriptor_len = usize::from(le_u16(&data, 254));
        if descriptor_len != DESCRIPTOR_LEN {
            return Err(Error::Parse(format!("descriptor size {} (expected {})", descriptor_len, DESCRIPTOR_LEN)));
        }
        let expected_header = HEADER_LEN + count * DESCRIPTOR_LEN;
        if usize::from(header_length) != expected_header || data.len() < expected_header {
            return Err(Error::Parse(format!(
                "header length {} does not match {} descriptor(s)",
                header_length, count
            )));
        }

        let mut descriptors = Vec::with_capacity(count);
        let mut seen = 0u32;
        for i in 0..count {
            let base = HEADER_LEN + i * DESCRIPTOR_LEN;
            let sig = &data[base..base + 8];
            let kind = SubpageKind::from_signature(sig).ok_or_else(|| {
                Error::Parse(format!("descriptor {} has unknown signature {:?}", i, String::from_utf8_lossy(sig)))
            })?;
            let offset = le_u32(&data, base + 8);
            let length = le_u32(&data, base + 12);
            let end = u64::from(offset) + u64::from(length);
            if end > data.len() as u64 || (offset as usize) < expected_header {
                return Err(Error::Parse(format!("{} payload lies outside the file", kind.label())));
            }
            seen |= 1 << kind.bit();
            descriptors.push(DatasetDescriptor {
                kind,
                offset,
                length,
                start_ms: le_u64(&data, base + 16),
                end_ms:   le_u64(&data, base + 24),
            });
        }
        if seen != content_bitmap {
            return Err(Error::Parse(format!(
                "content bitmap {:#04x} disagrees with descriptors ({:#04x})",
                content_bitmap, seen
            )));
        }

        let summary = FarmSummary {
            version:        (major, minor, patch),
            interface:      String::from_utf8_lossy(&data[24..28]).into_owned(),
            model:          ascii_field(&data, 32, 40),
            serial:         ascii_field(&data, 80, 20),
            firmware:       ascii_field(&data, 104, 8),
            header_length,
            content_bitmap,
            descriptors,
            file_size:      data.len() as u64,
        };
        Ok(Self { summary, data })
    }

    /// Payload of the dataset of `kind`, if present.
    pub fn payload(&self, kind: SubpageKind) -> Option<&[u8]> {
        self.summary
            .descriptors
            .iter()
            .find(|d| d.kind == kind)
            .map(|d| &self.data[d.offset as usize..(d.offset + d.length) as usize])
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}
