use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::{Error, Result};

/// Byte sink receiving a combined FARM file.
pub trait FarmSink {
    fn write(&mut self, data: &[u8]) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
    fn close(&mut self) -> io::Result<()>;
}

/// File sink named `SERIAL_YYYYMMDD_HHMMSS.frmc`.
pub struct FileSink {
    path: PathBuf,
    out:  Option<BufWriter<File>>,
}

impl FileSink {
    pub fn create(dir: &Path, serial: &str, now: DateTime<Local>) -> Result<Self> {
        let path = dir.join(file_name(serial, now));
        let file = File::create(&path).map_err(|source| Error::FileOpen { path: path.clone(), source })?;
        Ok(Self { path, out: Some(BufWriter::new(file)) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn out(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.out
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "sink already closed"))
    }
}

impl FarmSink for FileSink {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.out()?.write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out()?.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        match self.out.take() {
            Some(mut w) => {
                w.flush()?;
                w.get_ref().sync_all()
            }
            None => Ok(()),
        }
    }
}

/// Build the output file name for a drive serial.
pub fn file_name(serial: &str, now: DateTime<Local>) -> String {
    let serial: String = serial
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let serial = if serial.is_empty() { "UNKNOWN".to_string() } else { serial };
    format!("{}_{}.frmc", serial, now.format("%Y%m%d_%H%M%S"))
}

/// In-memory sink.
#[derive(Debug, Default)]
pub struct VecSink {
    pub data:   Vec<u8>,
    pub closed: bool,
}

impl FarmSink for VecSink {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::Other, "sink already closed"));
        }
        self.data.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn names_follow_serial_date_time() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(file_name("ZL2ABC12", now), "ZL2ABC12_20240309_140507.frmc");
        assert_eq!(file_name("  ab/c d ", now), "ab_c_d_20240309_140507.frmc");
        assert_eq!(file_name("", now), "UNKNOWN_20240309_140507.frmc");
    }

    #[test]
    fn file_sink_writes_and_closes() {
        let dir = tempfile::tempdir().unwrap();
        let now = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let mut sink = FileSink::create(dir.path(), "SER", now).unwrap();
        sink.write(b"hello").unwrap();
        sink.flush().unwrap();
        sink.close().unwrap();
        assert!(sink.write(b"late").is_err());
        assert_eq!(std::fs::read(sink.path()).unwrap(), b"hello");
    }

    #[test]
    fn unwritable_directory_is_file_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does").join("not").join("exist");
        let err = FileSink::create(&missing, "SER", Local::now()).err().unwrap();
        assert!(matches!(err, Error::FileOpen { .. }));
    }
}
