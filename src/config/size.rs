//! Human-readable byte sizes.

use anyhow::Context;

/// Parse a size like "500MB", "10GB", "64MiB" or "1048576" into bytes.
///
/// `KB`/`MB`/`GB`/`TB` are decimal; `KiB`/`MiB`/`GiB`/`TiB` are binary.
/// Fractions are allowed ("1.5GB"). Plain numbers are bytes.
pub fn parse_size(s: &str) -> anyhow::Result<i64> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty size string");
    }

    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let multiplier: f64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1.0,
        "KB" | "K" => 1e3,
        "MB" | "M" => 1e6,
        "GB" | "G" => 1e9,
        "TB" | "T" => 1e12,
        "KIB" => 1024.0,
        "MIB" => 1024.0 * 1024.0,
        "GIB" => 1024.0 * 1024.0 * 1024.0,
        "TIB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        other => anyhow::bail!("Unknown size unit '{other}' in '{s}'"),
    };

    let value: f64 = number
        .parse()
        .with_context(|| format!("Invalid size value: {s}"))?;
    let bytes = (value * multiplier).round();
    if bytes > i64::MAX as f64 {
        anyhow::bail!("Size too large: {s}");
    }
    Ok(bytes as i64)
}

/// Format bytes with a decimal unit, e.g. "12.3 MB".
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1048576").unwrap(), 1_048_576);
        assert_eq!(parse_size("500MB").unwrap(), 500_000_000);
        assert_eq!(parse_size("10GB").unwrap(), 10_000_000_000);
        assert_eq!(parse_size("10 mb").unwrap(), 10_000_000);
        assert_eq!(parse_size("64MiB").unwrap(), 64 * 1024 * 1024);
        assert_eq!(parse_size("1.5GB").unwrap(), 1_500_000_000);
    }

    #[test]
    fn test_parse_size_errors() {
        assert!(parse_size("").is_err());
        assert!(parse_size("MB").is_err());
        assert!(parse_size("10XB").is_err());
        assert!(parse_size("1.2.3GB").is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(10_000_000), "10.0 MB");
        assert_eq!(format_size(2_500_000_000), "2.5 GB");
    }
}
