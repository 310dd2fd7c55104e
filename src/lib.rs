//! ATA / SCSI / NVMe drive telemetry: combined FARM log assembly, SMART
//! attribute and error-log decoding, and SMART health checks.

pub mod check;
pub mod config;
pub mod errlog;
pub mod error;
pub mod farm;
pub mod models;
pub mod smart;
pub mod transport;
pub mod util;

pub use error::{Error, Result, ReturnCode};
