use std::collections::BTreeMap;

use log::debug;

use crate::error::{alloc_zeroed, Error, Result};
use crate::models::errlog::ErrorLogSource;
use crate::transport::{AtaTransport, SECTOR};
use crate::util::bytes::checksum_ok;

pub fn log_address(source: ErrorLogSource) -> u8 {
    match source {
        ErrorLogSource::ExtComprehensive => 0x03,
        ErrorLogSource::Comprehensive    => 0x02,
        ErrorLogSource::Summary          => 0x01,
    }
}

/// Error-log pages loaded on demand, one sector each, at most once.
pub struct PageCache<'d> {
    dev:            &'d dyn AtaTransport,
    source:         ErrorLogSource,
    pages:          BTreeMap<u16, Vec<u8>>,
    checksum_valid: bool,
}

impl<'d> PageCache<'d> {
    pub fn new(dev: &'d dyn AtaTransport, source: ErrorLogSource) -> Self {
        Self { dev, source, pages: BTreeMap::new(), checksum_valid: true }
    }

    pub fn source(&self) -> ErrorLogSource {
        self.source
    }

    /// False once any loaded page failed its checksum.
    pub fn checksum_valid(&self) -> bool {
        self.checksum_valid
    }

    pub fn loaded(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&mut self, index: u16) -> Result<&[u8]> {
        if !self.pages.contains_key(&index) {
            let page = self.load(index)?;
            if !checksum_ok(&page) {
                debug!("{} page {} has an invalid checksum", self.source.label(), index);
                self.checksum_valid = false;
            }
            self.pages.insert(index, page);
        }
        Ok(self.pages.get(&index).map(Vec::as_slice).unwrap_or_default())
    }

    fn load(&self, index: u16) -> Result<Vec<u8>> {
        let address = log_address(self.source);
        match self.source {
            ErrorLogSource::ExtComprehensive => {
                let mut buf = alloc_zeroed(SECTOR)?;
                self.dev.read_log(address, index, 0, &mut buf, 0)?;
                Ok(buf)
            }
            ErrorLogSource::Comprehensive => {
                // SMART READ LOG always starts at page 0
                let pages = usize::from(index) + 1;
                let mut buf = alloc_zeroed(pages * SECTOR)?;
                self.dev.smart_read_log(address, &mut buf)?;
                Ok(buf.split_off(usize::from(index) * SECTOR))
            }
            ErrorLogSource::Summary => {
                if index != 0 {
                    return Err(Error::BadParameter(format!("summary error log has no page {}", index)));
                }
                let mut buf = alloc_zeroed(SECTOR)?;
                self.dev.smart_read_log(address, &mut buf)?;
                Ok(buf)
            }
        }
    }
}
