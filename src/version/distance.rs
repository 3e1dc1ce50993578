use log::debug;
use semver::Version;
use std::cmp::Ordering;

use crate::VersionDistance;
use crate::error::ParseError;

use super::relaxed::parse_relaxed;

/// Distance between `used` and the newest of `known`.
///
/// `used` must parse (relaxed); entries of `known` that do not are skipped. The known versions
/// are sorted by precedence and `used` is inserted at its search position unless an equal
/// version is already there. `missed_releases` is the count of versions after that position;
/// the segment gaps subtract `used` from the greatest version.
pub fn version_distance<S: AsRef<str>>(
    used: &str,
    known: &[S],
) -> Result<VersionDistance, ParseError> {
    let used = parse_relaxed(used)?;

    let mut versions: Vec<Version> = known
        .iter()
        .filter_map(|raw| match parse_relaxed(raw.as_ref()) {
            Ok(v) => Some(v),
            Err(err) => {
                debug!("skipping known version: {}", err);
                None
            }
        })
        .collect();
    versions.sort_by(|a, b| a.cmp_precedence(b));

    let idx = versions.partition_point(|v| v.cmp_precedence(&used) == Ordering::Less);
    let present = versions
        .get(idx)
        .is_some_and(|v| v.cmp_precedence(&used) == Ordering::Equal);
    if !present {
        versions.insert(idx, used.clone());
    }

    // Never empty: `used` is in the sequence by now.
    let latest = &versions[versions.len() - 1];

    Ok(VersionDistance {
        missed_releases: (versions.len() - 1 - idx) as u64,
        missed_major: segment_gap(latest.major, used.major),
        missed_minor: segment_gap(latest.minor, used.minor),
        missed_patch: segment_gap(latest.patch, used.patch),
    })
}

/// `latest - used`, saturating at the `i64` bounds.
fn segment_gap(latest: u64, used: u64) -> i64 {
    let gap = i128::from(latest) - i128::from(used);
    i64::try_from(gap).unwrap_or(if gap < 0 { i64::MIN } else { i64::MAX })
}
