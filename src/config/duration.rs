//! Duration parsing for command-line options.

use anyhow::Context;
use std::time::Duration;

/// Parse a duration like "1h", "30m", "300s", "250ms" or "300".
///
/// Plain numbers are seconds.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    if let Some(num_str) = s.strip_suffix("ms") {
        let millis: u64 = num_str
            .trim()
            .parse()
            .with_context(|| format!("Invalid milliseconds value: {num_str}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(num_str) = s.strip_suffix('h') {
        let hours: u64 = num_str
            .trim()
            .parse()
            .with_context(|| format!("Invalid hours value: {num_str}"))?;
        return Ok(Duration::from_secs(hours * 3600));
    }
    if let Some(num_str) = s.strip_suffix('m') {
        let minutes: u64 = num_str
            .trim()
            .parse()
            .with_context(|| format!("Invalid minutes value: {num_str}"))?;
        return Ok(Duration::from_secs(minutes * 60));
    }
    if let Some(num_str) = s.strip_suffix('s') {
        let secs: u64 = num_str
            .trim()
            .parse()
            .with_context(|| format!("Invalid seconds value: {num_str}"))?;
        return Ok(Duration::from_secs(secs));
    }

    let secs: u64 = s
        .parse()
        .with_context(|| format!("Invalid duration value: {s}"))?;
    Ok(Duration::from_secs(secs))
}
