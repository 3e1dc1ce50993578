//! Relaxed version parsing: semver first, then normalization fallbacks for the
//! non-conformant strings registries are full of (`2.5.1.ds1-4`, `1.6.5+git20160407+5e5d3-1`).

use semver::Version;

use crate::error::ParseError;

/// Parse `raw` as a semantic version, retrying with normalization fallbacks.
///
/// Order of attempts:
/// 1. semver, accepting a leading `v` and padding a short numeric core (`1.2` → `1.2.0`);
/// 2. more than one `+`: keep the first two `+`-segments, join the rest with `-`, retry;
/// 3. more than two `.`: keep `major.minor`, join the rest with `-` as a pre-release, retry.
///
/// Each fallback strictly lowers the number of separators it rewrites, so the loop ends.
pub fn parse_relaxed(raw: &str) -> Result<Version, ParseError> {
    let mut candidate = raw.trim().to_string();
    loop {
        let err = match parse_lenient(&candidate) {
            Ok(v) => return Ok(v),
            Err(err) => err,
        };
        candidate = match collapse_build_segments(&candidate)
            .or_else(|| collapse_dot_segments(&candidate))
        {
            Some(next) => next,
            None => {
                return Err(ParseError::Version {
                    version: raw.to_string(),
                    reason: err.to_string(),
                });
            }
        };
    }
}

/// Semver parse that tolerates a `v` prefix and a one- or two-segment numeric core.
fn parse_lenient(s: &str) -> Result<Version, semver::Error> {
    let s = match s.strip_prefix(['v', 'V']) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => s,
    };
    match pad_numeric_core(s) {
        Some(padded) => Version::parse(&padded),
        None => Version::parse(s),
    }
}

/// `1` → `1.0.0`, `2.5-1` → `2.5.0-1`. None when the core is already full or not numeric.
fn pad_numeric_core(s: &str) -> Option<String> {
    let core_end = s.find(['-', '+']).unwrap_or(s.len());
    let (core, rest) = s.split_at(core_end);
    let segments: Vec<&str> = core.split('.').collect();
    if segments.len() >= 3
        || segments
            .iter()
            .any(|seg| seg.is_empty() || !seg.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    let mut padded = core.to_string();
    for _ in segments.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(rest);
    Some(padded)
}

/// `1.6.5+git20160407+5e5d3-1` → `1.6.5+git20160407-5e5d3-1`.
fn collapse_build_segments(s: &str) -> Option<String> {
    if s.matches('+').count() <= 1 {
        return None;
    }
    let parts: Vec<&str> = s.split('+').collect();
    let mut collapsed = format!("{}+{}", parts[0], parts[1]);
    for part in &parts[2..] {
        collapsed.push('-');
        collapsed.push_str(part);
    }
    Some(collapsed)
}

/// `2.5.1.ds1-4` → `2.5-1-ds1-4`.
fn collapse_dot_segments(s: &str) -> Option<String> {
    if s.matches('.').count() <= 2 {
        return None;
    }
    let parts: Vec<&str> = s.split('.').collect();
    let mut collapsed = format!("{}.{}", parts[0], parts[1]);
    for part in &parts[2..] {
        collapsed.push('-');
        collapsed.push_str(part);
    }
    Some(collapsed)
}
