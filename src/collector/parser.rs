//! Parsers for diagnostic tool output.
//!
//! These are pure functions that turn the text produced by `lsblk`,
//! `smartctl`, `nvme` and `iostat` into structured records. They are tolerant
//! by contract: a malformed line or field degrades to a default value and
//! never aborts the surrounding parse.

use chrono::{DateTime, Local};

use crate::storage::model::{HealthAttribute, KeyValueMetrics, PerformanceSnapshot};

/// Marker token of the SMART attribute table header row.
const HEALTH_HEADER_MARKER: &str = "ID#";

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Whitespace tokenizer that can hand back the untouched remainder of a line.
struct Fields<'a> {
    rest: &'a str,
}

impl<'a> Fields<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    fn next_token(&mut self) -> Option<&'a str> {
        let trimmed = self.rest.trim_start();
        if trimmed.is_empty() {
            self.rest = trimmed;
            return None;
        }
        let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        let (token, rest) = trimmed.split_at(end);
        self.rest = rest;
        Some(token)
    }

    fn parse_next<T: std::str::FromStr>(&mut self, name: &str) -> Result<T, ParseError> {
        let token = self
            .next_token()
            .ok_or_else(|| ParseError::new(format!("missing field {}", name)))?;
        token
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}: {:?}", name, token)))
    }

    fn skip(&mut self, count: usize) -> Result<(), ParseError> {
        for i in 0..count {
            self.next_token()
                .ok_or_else(|| ParseError::new(format!("missing skipped field {}", i)))?;
        }
        Ok(())
    }

    /// Rest of the line after the separator whitespace; trailing text is kept.
    fn remainder(&self) -> &'a str {
        self.rest.trim_start()
    }
}

/// Converts a size field to bytes by keeping only its ASCII digits.
///
/// Returns 0 for empty input, input without digits, or overflow.
pub fn parse_size_digits(size: &str) -> u64 {
    let digits: String = size.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Parses `lsblk -P` output (`KEY="value"` pairs per line).
///
/// Returns one vector of `(key, value)` pairs per non-empty line. Values may
/// be empty or contain spaces.
pub fn parse_lsblk_pairs(content: &str) -> Vec<Vec<(String, String)>> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_pairs_line)
        .collect()
}

fn parse_pairs_line(line: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut rest = line.trim();

    while let Some(eq) = rest.find("=\"") {
        let key = rest[..eq].trim().to_string();
        let after = &rest[eq + 2..];
        let Some(close) = after.find('"') else {
            pairs.push((key, after.to_string()));
            break;
        };
        pairs.push((key, after[..close].to_string()));
        rest = &after[close + 1..];
    }

    pairs
}

/// Parses a `smartctl -A` attribute table.
///
/// Everything up to and including the `ID#` header row is discarded. Rows
/// whose first token is not an integer are skipped. Attribute names may span
/// several tokens, or be empty; the first integer token after the id is the
/// current value. The hexadecimal FLAG column is not part of the name.
pub fn parse_health_attributes(content: &str) -> Vec<HealthAttribute> {
    content
        .lines()
        .skip_while(|line| !line.contains(HEALTH_HEADER_MARKER))
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_health_line)
        .collect()
}

fn parse_health_line(line: &str) -> Option<HealthAttribute> {
    let mut fields = Fields::new(line);
    let id: i32 = fields.next_token()?.parse().ok()?;

    let mut name_parts: Vec<&str> = Vec::new();
    let mut current = 0;
    while let Some(token) = fields.next_token() {
        if let Ok(value) = token.parse::<i32>() {
            current = value;
            break;
        }
        if is_hex_flag(token) {
            continue;
        }
        name_parts.push(token);
    }

    let mut attr = HealthAttribute {
        id,
        name: name_parts.join(" "),
        current,
        ..HealthAttribute::default()
    };

    match read_worst_threshold(&mut fields) {
        Ok((worst, threshold)) => {
            attr.worst = worst;
            attr.threshold = threshold;
            attr.raw = fields.remainder().to_string();
        }
        Err(_) => {
            attr.worst = 0;
            attr.threshold = 0;
            attr.raw = "N/A".to_string();
        }
    }

    Some(attr)
}

fn read_worst_threshold(fields: &mut Fields<'_>) -> Result<(i32, i32), ParseError> {
    let worst = fields.parse_next("worst")?;
    let threshold = fields.parse_next("threshold")?;
    Ok((worst, threshold))
}

fn is_hex_flag(token: &str) -> bool {
    token
        .strip_prefix("0x")
        .is_some_and(|hex| !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Parses colon-delimited `key: value` lines.
///
/// Each line is split at its first colon and both sides are trimmed. Lines
/// without a colon are ignored.
pub fn parse_key_values(content: &str) -> KeyValueMetrics {
    let mut metrics = KeyValueMetrics::new();

    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':') {
            metrics.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    metrics
}

/// Parses the leading numeric part of a value such as `"37%"` or `"1.5 C"`.
pub fn parse_leading_number(value: &str) -> Option<f64> {
    let value = value.trim();
    let end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

/// Parses the tail of an `iostat -xm <dev> 1 2` report for one device.
///
/// The first non-empty line mentioning `device_name` is decoded in fixed
/// column order: r/s, w/s, rMB/s, wMB/s, six skipped columns, r_await,
/// w_await, aqu-sz. If any of these reads fails, every numeric field is zero.
pub fn parse_performance(
    content: &str,
    device_name: &str,
    timestamp: DateTime<Local>,
) -> PerformanceSnapshot {
    let Some(line) = content
        .lines()
        .find(|line| !line.trim().is_empty() && line.contains(device_name))
    else {
        return PerformanceSnapshot::zeroed(timestamp);
    };

    read_performance_fields(line, timestamp)
        .unwrap_or_else(|_| PerformanceSnapshot::zeroed(timestamp))
}

fn read_performance_fields(
    line: &str,
    timestamp: DateTime<Local>,
) -> Result<PerformanceSnapshot, ParseError> {
    let mut fields = Fields::new(line);
    fields.skip(1)?;

    let read_iops = fields.parse_next("r/s")?;
    let write_iops = fields.parse_next("w/s")?;
    let read_throughput_mb = fields.parse_next("rMB/s")?;
    let write_throughput_mb = fields.parse_next("wMB/s")?;
    // rrqm/s wrqm/s %rrqm %wrqm and two more columns are not modeled
    fields.skip(6)?;
    let read_latency_ms = fields.parse_next("r_await")?;
    let write_latency_ms = fields.parse_next("w_await")?;
    let queue_depth = fields.parse_next("aqu-sz")?;

    Ok(PerformanceSnapshot {
        read_iops,
        write_iops,
        read_throughput_mb,
        write_throughput_mb,
        read_latency_ms,
        write_latency_ms,
        queue_depth,
        timestamp,
    })
}
