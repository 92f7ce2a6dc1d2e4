//! Human-friendly size and duration parsing
//!
//! Sizes accept a plain byte count or a number with a `K`, `M`, `G` suffix
//! (binary multiples, optional trailing `B`/`iB`). Durations accept compound
//! forms such as `1h30m`, with units `ms`, `s`, `m`, `h`, `d`, `w`; a plain
//! number is taken as seconds.

use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Parse a size such as `512`, `64K`, `10MB`, `1GiB`
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Empty size string".to_string());
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    if digits.is_empty() {
        return Err(format!("Invalid size format: {}", s));
    }

    let num: u64 = digits
        .parse()
        .map_err(|_| format!("Invalid number in size: {}", digits))?;

    let multiplier: u64 = match unit.trim().to_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1024,
        "m" | "mb" | "mib" => 1024 * 1024,
        "g" | "gb" | "gib" => 1024 * 1024 * 1024,
        other => return Err(format!("Unknown size unit: {}", other)),
    };

    num.checked_mul(multiplier)
        .ok_or_else(|| format!("Size too large: {}", s))
}

/// Parse a duration such as `30s`, `15m`, `1h30m`, `7d`, `250ms`
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return Err("Empty duration string".to_string());
    }

    let mut total = Duration::ZERO;
    let mut chars = s.chars().peekable();

    while chars.peek().is_some() {
        let mut num = String::new();
        while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
            num.push(c);
            chars.next();
        }

        let mut unit = String::new();
        while let Some(c) = chars.peek().copied().filter(char::is_ascii_alphabetic) {
            unit.push(c);
            chars.next();
        }

        if num.is_empty() {
            return Err(format!("Invalid duration format: {}", s));
        }
        let value: u64 = num
            .parse()
            .map_err(|_| format!("Invalid number in duration: {}", num))?;

        let part = match unit.as_str() {
            "ms" => Duration::from_millis(value),
            "" | "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value.saturating_mul(60)),
            "h" => Duration::from_secs(value.saturating_mul(3600)),
            "d" => Duration::from_secs(value.saturating_mul(86_400)),
            "w" => Duration::from_secs(value.saturating_mul(604_800)),
            _ => return Err(format!("Unknown duration unit: {}", unit)),
        };
        total = total.saturating_add(part);
    }

    Ok(total)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Quantity {
    Number(u64),
    Text(String),
}

/// Deserialize an optional size written as a number of bytes or a string
pub fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Quantity>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Quantity::Number(n)) => Ok(Some(n)),
        Some(Quantity::Text(s)) => parse_size(&s).map(Some).map_err(serde::de::Error::custom),
    }
}

/// Deserialize an optional duration written as seconds or a string
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Quantity>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Quantity::Number(n)) => Ok(Some(Duration::from_secs(n))),
        Some(Quantity::Text(s)) => parse_duration(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("100"), Ok(100));
        assert_eq!(parse_size("64K"), Ok(64 * 1024));
        assert_eq!(parse_size("10MB"), Ok(10 * 1024 * 1024));
        assert_eq!(parse_size("1GiB"), Ok(1024 * 1024 * 1024));
        assert_eq!(parse_size(" 2m "), Ok(2 * 1024 * 1024));
    }

    #[test]
    fn test_parse_size_errors() {
        assert!(parse_size("").is_err());
        assert!(parse_size("K").is_err());
        assert!(parse_size("10X").is_err());
        assert!(parse_size("99999999999999999999G").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("15m"), Ok(Duration::from_secs(900)));
        assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("7d"), Ok(Duration::from_secs(7 * 86_400)));
        assert_eq!(parse_duration("2w"), Ok(Duration::from_secs(14 * 86_400)));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("0s"), Ok(Duration::ZERO));
    }

    #[test]
    fn test_parse_duration_errors() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("5y").is_err());
    }

    #[test]
    fn test_deserialize_quantities() {
        #[derive(Deserialize)]
        struct Limits {
            #[serde(default, deserialize_with = "deserialize_size")]
            size: Option<u64>,
            #[serde(default, deserialize_with = "deserialize_duration")]
            age: Option<Duration>,
        }

        let limits: Limits = serde_json::from_str(r#"{"size": "1K", "age": 60}"#).unwrap();
        assert_eq!(limits.size, Some(1024));
        assert_eq!(limits.age, Some(Duration::from_secs(60)));

        let limits: Limits = serde_json::from_str(r#"{"size": 10, "age": "1h"}"#).unwrap();
        assert_eq!(limits.size, Some(10));
        assert_eq!(limits.age, Some(Duration::from_secs(3600)));

        let limits: Limits = serde_json::from_str("{}").unwrap();
        assert_eq!(limits.size, None);
        assert_eq!(limits.age, None);

        assert!(serde_json::from_str::<Limits>(r#"{"size": "lots"}"#).is_err());
    }
}
