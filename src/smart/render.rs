use std::fmt::Write as _;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::analyze::{analyze, decoder, flag_sentences};
use super::raw::hex;
use super::tables::{name, raw_format};
use crate::models::device::VendorFamily;
use crate::models::smart::{Attribute, AttributeTable, NvmeHealth, TripState};
use crate::util::human::{fmt_bytes_wide, fmt_celsius};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Raw,
    #[default]
    Hybrid,
    Analyzed,
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw"      => Ok(RenderMode::Raw),
            "hybrid"   => Ok(RenderMode::Hybrid),
            "analyzed" => Ok(RenderMode::Analyzed),
            other      => Err(format!("unknown render mode '{}'", other)),
        }
    }
}

/// Single-character marker combining the prefail bit with the trip state.
pub fn flag_marker(attr: &Attribute) -> char {
    let prefail = attr.flags.prefail();
    match (attr.trip_state(), prefail) {
        (TripState::Failing | TripState::AlwaysFailing, true)  => '!',
        (TripState::Failing | TripState::AlwaysFailing, false) => '%',
        (TripState::PreviouslyFailed, true)  => '^',
        (TripState::PreviouslyFailed, false) => '~',
        (TripState::Ok, true)  => '*',
        (TripState::Ok, false) => ' ',
    }
}

/// Threshold-style byte with the reserved values spelled out.
pub fn value_token(v: u8) -> String {
    match v {
        0x00 => "AP".to_string(),
        0xFF => "AF".to_string(),
        0xFE => "INV".to_string(),
        v    => v.to_string(),
    }
}

fn display_name(family: VendorFamily, id: u8) -> &'static str {
    name(family, id).unwrap_or("Vendor Specific")
}

pub fn render_table(table: &AttributeTable, family: VendorFamily, mode: RenderMode) -> String {
    match mode {
        RenderMode::Raw      => render_raw(table, family),
        RenderMode::Hybrid   => render_hybrid(table, family),
        RenderMode::Analyzed => render_analyzed(table, family),
    }
}

fn render_raw(table: &AttributeTable, family: VendorFamily) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:>3}  {:<32} {:>6}  {:>3}  {:>3}  {:>3}  {}",
        "ID", "Attribute", "Status", "Cur", "Wst", "Thr", "Raw"
    );
    for attr in &table.attributes {
        let threshold = attr.threshold.map(|t| t.to_string()).unwrap_or_else(|| "N/A".to_string());
        let _ = writeln!(
            out,
            "{} {:>3}  {:<32} {:>6}  {:>3}  {:>3}  {:>3}  {}",
            flag_marker(attr),
            attr.id,
            display_name(family, attr.id),
            format!("{:04X}", attr.flags.0),
            attr.nominal,
            attr.worst,
            threshold,
            hex(&attr.raw)
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "* pre-fail/warranty  ! failing (warranty)  % failing  ^ previously failed (warranty)  ~ previously failed");
    out
}

fn render_hybrid(table: &AttributeTable, family: VendorFamily) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:>3}  {:<32} {:>6}  {:>3}  {:>3}  {:>3}  {}",
        "ID", "Attribute", "Status", "Cur", "Wst", "Thr", "Value"
    );
    for attr in &table.attributes {
        let threshold = attr.threshold.map(value_token).unwrap_or_else(|| "N/A".to_string());
        let hint = if decoder(family, attr.id).is_some() { " ?" } else { "" };
        let _ = writeln!(
            out,
            "{} {:>3}  {:<32} {:>6}  {:>3}  {:>3}  {:>3}  {}{}",
            flag_marker(attr),
            attr.id,
            display_name(family, attr.id),
            format!("{:04X}", attr.flags.0),
            value_token(attr.nominal),
            value_token(attr.worst),
            threshold,
            raw_format(family, attr.id).render(attr),
            hint
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "AP always passing  AF always failing  INV invalid  ? analyzed view available");
    out
}

fn threshold_sentence(threshold: Option<u8>) -> String {
    match threshold {
        None       => "not available".to_string(),
        Some(0x00) => "0 (always passing)".to_string(),
        Some(0xFF) => "255 (always failing)".to_string(),
        Some(0xFE) => "254 (invalid)".to_string(),
        Some(t)    => t.to_string(),
    }
}

fn render_analyzed(table: &AttributeTable, family: VendorFamily) -> String {
    let mut out = String::new();
    for attr in &table.attributes {
        let _ = writeln!(out, "{} - {}", attr.id, display_name(family, attr.id));
        let _ = writeln!(out, "    Status flags: {:#06x}", attr.flags.0);
        for sentence in flag_sentences(attr.flags.0) {
            let _ = writeln!(out, "        {}", sentence);
        }
        let _ = writeln!(out, "    Current: {}", attr.nominal);
        let _ = writeln!(out, "    Worst: {}", attr.worst);
        let _ = writeln!(out, "    Threshold: {}", threshold_sentence(attr.threshold));
        match attr.trip_state() {
            TripState::Ok => {}
            TripState::Failing | TripState::AlwaysFailing => {
                let _ = writeln!(out, "    ** Threshold tripped **");
            }
            TripState::PreviouslyFailed => {
                let _ = writeln!(out, "    Worst value has reached the threshold in the past");
            }
        }
        let _ = writeln!(out, "    Raw: {}", hex(&attr.raw));
        if let Some(lines) = analyze(family, attr) {
            for line in lines {
                let _ = writeln!(out, "    {}", line);
            }
        }
        let _ = writeln!(out);
    }
    if !table.checksum_valid {
        let _ = writeln!(out, "Warning: SMART data checksum is invalid");
    }
    out
}

pub fn render_nvme(h: &NvmeHealth) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Critical Warning:            {:#04x}", h.critical_warning);
    let _ = writeln!(out, "Composite Temperature:       {}", fmt_celsius(h.temperature_celsius()));
    let _ = writeln!(out, "Available Spare:             {}%", h.available_spare_pct);
    let _ = writeln!(out, "Available Spare Threshold:   {}%", h.available_spare_threshold);
    let _ = writeln!(out, "Percentage Used:             {}%", h.percentage_used);
    let _ = writeln!(out, "Data Units Read:             {} [{}]", h.data_units_read, fmt_bytes_wide(h.bytes_read()));
    let _ = writeln!(out, "Data Units Written:          {} [{}]", h.data_units_written, fmt_bytes_wide(h.bytes_written()));
    let _ = writeln!(out, "Host Read Commands:          {}", h.host_read_commands);
    let _ = writeln!(out, "Host Write Commands:         {}", h.host_write_commands);
    let _ = writeln!(out, "Controller Busy Time:        {} min", h.controller_busy_minutes);
    let _ = writeln!(out, "Power Cycles:                {}", h.power_cycles);
    let _ = writeln!(out, "Power On Hours:              {}", h.power_on_hours);
    let _ = writeln!(out, "Unsafe Shutdowns:            {}", h.unsafe_shutdowns);
    let _ = writeln!(out, "Media and Data Integrity Errors: {}", h.media_errors);
    let _ = writeln!(out, "Error Information Log Entries:   {}", h.error_log_entries);
    let _ = writeln!(out, "Warning Temperature Time:    {} min", h.warning_temp_minutes);
    let _ = writeln!(out, "Critical Temperature Time:   {} min", h.critical_temp_minutes);
    for (i, k) in h.temperature_sensors.iter().enumerate() {
        let _ = writeln!(out, "Temperature Sensor {}:        {}", i + 1, fmt_celsius(i64::from(*k) - 273));
    }
    out
}
