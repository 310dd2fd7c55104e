//! SMART attribute acquisition and rendering.
//!
//! Attribute names and raw interpretations are data: each vendor family maps
//! to a set of tables (see `tables`), and one renderer serves all three
//! display modes.

pub mod analyze;
pub mod parse;
pub mod raw;
pub mod render;
pub mod tables;

pub use parse::{parse_attribute_page, read_attributes, read_nvme_health, read_smart, SmartData};
pub use raw::RawFormat;
pub use render::{render_nvme, render_table, RenderMode};
pub use tables::{lookup, AttrSpec};
