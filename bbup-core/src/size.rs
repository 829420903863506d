const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Renders a byte count with binary (1024-based) units.
///
/// Plain byte counts are printed as integers, everything else with two
/// decimals. An unknown size renders as `0 Bytes`.
pub fn format_size<B: Into<Option<u64>>>(bytes: B) -> String {
    let Some(bytes) = bytes.into() else {
        return "0 Bytes".to_string();
    };
    if bytes < 1024 {
        return format!("{bytes} Bytes");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    // Compare the value as printed, so 1023.999 KB moves up to 1.00 MB.
    while round_cents(value) >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
