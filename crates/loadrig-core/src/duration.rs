//! Human-friendly duration strings ("800ms", "100s", "5m").

use std::time::Duration;

/// Parse a duration string. Supports `ms`, `s`, and `m` suffixes; a bare
/// number is read as seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        return ms.trim().parse::<u64>().ok().map(Duration::from_millis);
    }
    if let Some(min) = s.strip_suffix('m') {
        return min
            .trim()
            .parse::<u64>()
            .ok()
            .map(|v| Duration::from_secs(v * 60));
    }
    let secs = s.strip_suffix('s').unwrap_or(s);
    secs.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Render a duration in the most compact suffix form accepted by
/// [`parse_duration`].
pub fn format_duration(d: &Duration) -> String {
    let ms = d.as_millis();
    if ms % 1000 != 0 {
        return format!("{ms}ms");
    }
    let secs = d.as_secs();
    if secs != 0 && secs % 60 == 0 {
        return format!("{}m", secs / 60);
    }
    format!("{secs}s")
}

/// Serde adapter for `Duration` fields written as duration strings in TOML.
pub mod duration_str {
    use super::{format_duration, parse_duration};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&format_duration(d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(de)?;
        parse_duration(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid duration {s:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(parse_duration("800ms"), Some(Duration::from_millis(800)));
        assert_eq!(parse_duration("100s"), Some(Duration::from_secs(100)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("42"), Some(Duration::from_secs(42)));
        assert_eq!(parse_duration(" 1s "), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("fast"), None);
        assert_eq!(parse_duration("12x"), None);
    }

    #[test]
    fn test_format_round_trips() {
        for s in ["800ms", "1s", "100s", "5m", "0s"] {
            let d = parse_duration(s).unwrap();
            assert_eq!(format_duration(&d), s);
            assert_eq!(parse_duration(&format_duration(&d)), Some(d));
        }
    }
}
