//! Informational Exceptions Control mode page and the scoped MRIE override.

use log::{debug, warn};

use crate::error::{alloc_zeroed, Error, Result};
use crate::transport::{PageControl, ScsiTransport, TResult};
use crate::util::bytes::{be_u16, be_u32, put_be_u32};

pub const IE_CONTROL_PAGE: u8 = 0x1C;
const IE_PAGE_LEN: usize = 12;
const MODE_BUFFER: usize = 256;

/// MRIE value that reports on REQUEST SENSE.
pub const MRIE_ON_REQUEST: u8 = 6;

/// Page 0x1C as returned by MODE SENSE, with the header it came with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IeModePage {
    /// Whether the 10-byte command form produced this copy.
    pub ten: bool,
    /// Mode parameter header plus block descriptors.
    header:  Vec<u8>,
    page:    Vec<u8>,
}

impl IeModePage {
    /// Split a MODE SENSE reply into header and page.
    pub fn parse(reply: &[u8], ten: bool) -> Result<Self> {
        let (total, start) = if ten {
            if reply.len() < 8 {
                return Err(Error::Parse("MODE SENSE(10) reply shorter than its header".into()));
            }
            (usize::from(be_u16(reply, 0)) + 2, 8 + usize::from(be_u16(reply, 6)))
        } else {
            if reply.len() < 4 {
                return Err(Error::Parse("MODE SENSE(6) reply shorter than its header".into()));
            }
            (usize::from(reply[0]) + 1, 4 + usize::from(reply[3]))
        };
        let end = total.min(reply.len());
        let page = reply.get(start..end).unwrap_or_default();
        if page.len() < IE_PAGE_LEN || page[0] & 0x3F != IE_CONTROL_PAGE {
            return Err(Error::Parse(format!(
                "informational exceptions page missing from {}-byte mode data",
                reply.len()
            )));
        }
        Ok(Self { ten, header: reply[..start].to_vec(), page: page.to_vec() })
    }

    /// MODE SENSE(10), falling back to MODE SENSE(6).
    pub fn read(dev: &dyn ScsiTransport, control: PageControl) -> Result<Self> {
        let mut buf = alloc_zeroed(MODE_BUFFER)?;
        match dev.mode_sense_10(IE_CONTROL_PAGE, control, &mut buf) {
            Ok(n) => return Self::parse(&buf[..n], true),
            Err(e) => debug!("MODE SENSE(10) page {:#04x} failed: {}, trying MODE SENSE(6)", IE_CONTROL_PAGE, e),
        }
        buf.fill(0);
        let n = dev.mode_sense_6(IE_CONTROL_PAGE, control, &mut buf)?;
        Self::parse(&buf[..n], false)
    }

    pub fn mrie(&self) -> u8 {
        self.page[3] & 0x0F
    }

    /// Polling interval in 100 ms units.
    pub fn interval(&self) -> u32 {
        be_u32(&self.page, 4)
    }

    pub fn report_count(&self) -> u32 {
        be_u32(&self.page, 8)
    }

    /// Copy of this page with the reporting fields replaced.
    pub fn with_reporting(&self, mrie: u8, interval: u32, report_count: u32) -> Self {
        let mut next = self.clone();
        next.page[3] = (next.page[3] & 0xF0) | (mrie & 0x0F);
        put_be_u32(&mut next.page, 4, interval);
        put_be_u32(&mut next.page, 8, report_count);
        next
    }

    /// Copy of this page carrying the reporting fields of `other`.
    pub fn with_reporting_of(&self, other: &IeModePage) -> Self {
        self.with_reporting(other.mrie(), other.interval(), other.report_count())
    }

    /// MODE SELECT parameter list: data length zeroed, PS bit cleared.
    pub fn select_data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.header.len() + self.page.len());
        data.extend_from_slice(&self.header);
        if self.ten {
            data[0] = 0;
            data[1] = 0;
        } else {
            data[0] = 0;
        }
        data.extend_from_slice(&self.page);
        let page_start = self.header.len();
        data[page_start] &= 0x7F;
        data
    }

    pub fn write(&self, dev: &dyn ScsiTransport, save: bool) -> TResult<()> {
        let data = self.select_data();
        if self.ten {
            dev.mode_select_10(&data, save)
        } else {
            dev.mode_select_6(&data, save)
        }
    }
}

/// Temporary MRIE override. Dropping the guard writes the restore page back,
/// first with the save bit and then without it.
pub struct IeOverride<'d> {
    dev:     &'d dyn ScsiTransport,
    restore: IeModePage,
    armed:   bool,
}

impl<'d> IeOverride<'d> {
    /// Switch the device to report on REQUEST SENSE every 100 ms with no
    /// report limit, without saving. `restore` is written back on drop.
    pub fn apply(dev: &'d dyn ScsiTransport, current: &IeModePage, restore: IeModePage) -> Result<Self> {
        let temporary = current.with_reporting(MRIE_ON_REQUEST, 1, 0);
        temporary.write(dev, false)?;
        debug!(
            "MRIE {} -> {} (interval {} -> 1, count {} -> 0)",
            current.mrie(),
            MRIE_ON_REQUEST,
            current.interval(),
            current.report_count()
        );
        Ok(Self { dev, restore, armed: true })
    }

    /// Restore now instead of at drop. Returns whether any write succeeded.
    pub fn restore(mut self) -> bool {
        self.put_back()
    }

    fn put_back(&mut self) -> bool {
        if !self.armed {
            return true;
        }
        self.armed = false;
        match self.restore.write(self.dev, true) {
            Ok(()) => return true,
            Err(e) => warn!("restoring informational exceptions page with save failed: {}", e),
        }
        match self.restore.write(self.dev, false) {
            Ok(()) => true,
            Err(e) => {
                warn!("restoring informational exceptions page failed: {}", e);
                false
            }
        }
    }
}

impl Drop for IeOverride<'_> {
    fn drop(&mut self) {
        self.put_back();
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::ie_page;
    use super::*;
    use crate::models::device::{DeviceIdentity, DriveKind};
    use crate::transport::replay::{scsi_mode_key, Manifest, ReplayDevice};

    fn device(manifest: Manifest) -> ReplayDevice {
        ReplayDevice::new(manifest)
            .with_page(scsi_mode_key(IE_CONTROL_PAGE, PageControl::Current), ie_page(3, 6000, 5))
            .with_page(scsi_mode_key(IE_CONTROL_PAGE, PageControl::Saved), ie_page(4, 9000, 2))
    }

    fn manifest() -> Manifest {
        Manifest::new(DriveKind::Scsi, DeviceIdentity::default())
    }

    #[test]
    fn parses_both_header_forms() {
        let mut ten = vec![0u8; 8];
        ten[1] = (6 + IE_PAGE_LEN) as u8;
        ten.extend(ie_page(3, 6000, 5));
        let p = IeModePage::parse(&ten, true).unwrap();
        assert_eq!((p.mrie(), p.interval(), p.report_count()), (3, 6000, 5));

        let mut six = vec![(3 + 8 + IE_PAGE_LEN) as u8, 0, 0, 8];
        six.extend([0u8; 8]);
        six.extend(ie_page(6, 1, 0));
        let p = IeModePage::parse(&six, false).unwrap();
        assert_eq!(p.mrie(), 6);
        assert_eq!(p.select_data().len(), 4 + 8 + IE_PAGE_LEN);

        assert!(IeModePage::parse(&[0, 10, 0, 0, 0, 0, 0, 0, 0x1A, 0x0A], true).is_err());
    }

    #[test]
    fn drop_restores_saved_values() {
        let dev = device(manifest());
        {
            let current = IeModePage::read(&dev, PageControl::Current).unwrap();
            let saved = IeModePage::read(&dev, PageControl::Saved).unwrap();
            let _guard = IeOverride::apply(&dev, &current, current.with_reporting_of(&saved)).unwrap();
            let now = IeModePage::read(&dev, PageControl::Current).unwrap();
            assert_eq!((now.mrie(), now.interval(), now.report_count()), (6, 1, 0));
        }
        let selects = dev.mode_selects();
        assert_eq!(selects.len(), 2);
        assert!(!selects[0].save);
        assert!(selects[1].save);
        let now = IeModePage::read(&dev, PageControl::Current).unwrap();
        assert_eq!((now.mrie(), now.interval(), now.report_count()), (4, 9000, 2));
    }

    #[test]
    fn restore_retries_without_save() {
        let mut m = manifest();
        m.quirks.mode_select_save_fails = true;
        m.quirks.no_mode_10 = true;
        let dev = device(m);
        let current = IeModePage::read(&dev, PageControl::Current).unwrap();
        assert!(!current.ten);
        let guard = IeOverride::apply(&dev, &current, current.clone()).unwrap();
        assert!(guard.restore());

        let requests = dev.requests();
        assert!(requests.iter().any(|r| r == "mode-select-6:save=true"));
        assert_eq!(requests.last().map(String::as_str), Some("mode-select-6:save=false"));
        let now = IeModePage::read(&dev, PageControl::Current).unwrap();
        assert_eq!(now.mrie(), 3);
    }
}
