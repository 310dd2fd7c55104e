/// Format a raw byte count into a human-readable string: "12.5 GB"
pub fn fmt_bytes(bytes: u64) -> String {
    fmt_bytes_f(bytes as f64)
}

/// Same as [`fmt_bytes`] for counts that can exceed `u64` (NVMe 128-bit counters).
pub fn fmt_bytes_wide(bytes: u128) -> String {
    fmt_bytes_f(bytes as f64)
}

fn fmt_bytes_f(b: f64) -> String {
    const PB: f64 = 1_125_899_906_842_624.0;
    const TB: f64 = 1_099_511_627_776.0;
    const GB: f64 = 1_073_741_824.0;
    const MB: f64 = 1_048_576.0;
    const KB: f64 = 1_024.0;
    if b >= PB      { format!("{:.2} PB", b / PB) }
    else if b >= TB { format!("{:.2} TB", b / TB) }
    else if b >= GB { format!("{:.2} GB", b / GB) }
    else if b >= MB { format!("{:.2} MB", b / MB) }
    else if b >= KB { format!("{:.2} KB", b / KB) }
    else            { format!("{:.0} B",  b) }
}

/// Format a duration given in hours plus a millisecond remainder:
/// "1234 hours, 5 minutes, 6 seconds"
pub fn fmt_hours_ms(hours: u64, remainder_ms: u64) -> String {
    let minutes = remainder_ms / 60_000;
    let seconds = (remainder_ms % 60_000) / 1000;
    format!("{} hours, {} minutes, {} seconds", hours, minutes, seconds)
}

/// Format a millisecond timestamp as "d days hh:mm:ss.mmm".
pub fn fmt_ms_timestamp(ms: u64) -> String {
    let days = ms / 86_400_000;
    let hours = (ms / 3_600_000) % 24;
    let minutes = (ms / 60_000) % 60;
    let seconds = (ms / 1000) % 60;
    let millis = ms % 1000;
    if days > 0 {
        format!("{}d {:02}:{:02}:{:02}.{:03}", days, hours, minutes, seconds, millis)
    } else {
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    }
}

/// Temperature in Celsius with Fahrenheit in brackets: "36 C (96.8 F)"
pub fn fmt_celsius(c: i64) -> String {
    format!("{} C ({:.1} F)", c, c as f64 * 9.0 / 5.0 + 32.0)
}
