use serde::Serialize;

use crate::error::{alloc_zeroed, Error, Result};
use crate::transport::{AtaTransport, SECTOR};
use crate::util::bytes::le_u16;

pub const LOG_DIRECTORY: u8 = 0x00;

/// GPL or SMART log directory: page count per log address.
#[derive(Debug, Clone, Serialize)]
pub struct LogDirectory {
    pub version: u16,
    /// Index = log address; entry 0 is unused.
    counts:      Vec<u16>,
}

impl LogDirectory {
    pub fn parse(page: &[u8]) -> Result<Self> {
        if page.len() < SECTOR {
            return Err(Error::Parse(format!("log directory is {} bytes", page.len())));
        }
        let mut counts = vec![0u16; 256];
        for (address, count) in counts.iter_mut().enumerate().skip(1) {
            *count = le_u16(page, address * 2);
        }
        Ok(Self { version: le_u16(page, 0), counts })
    }

    pub fn pages(&self, address: u8) -> u16 {
        self.counts[usize::from(address)]
    }

    /// Addresses holding at least one page, ascending.
    pub fn present(&self) -> impl Iterator<Item = (u8, u16)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, &n)| n > 0)
            .map(|(a, &n)| (a as u8, n))
    }
}

pub fn read_gpl_directory(dev: &dyn AtaTransport) -> Result<LogDirectory> {
    let mut page = alloc_zeroed(SECTOR)?;
    dev.read_log(LOG_DIRECTORY, 0, 0, &mut page, 0)?;
    LogDirectory::parse(&page)
}

pub fn read_smart_directory(dev: &dyn AtaTransport) -> Result<LogDirectory> {
    let mut page = alloc_zeroed(SECTOR)?;
    dev.smart_read_log(LOG_DIRECTORY, &mut page)?;
    LogDirectory::parse(&page)
}
