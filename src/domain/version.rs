use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ReleaseError, Result};

/// Human-readable form of the release-tag grammar, used in diagnostics.
pub const VERSION_GRAMMAR: &str =
    "R<major>.<minor>[.<bugfix>...] optionally followed by -<major2>.<minor2>[.<bugfix2>] (e.g. R1.2.3, R3.15.4-1.0)";

/// Weight ratio between successive numeric groups in [`ReleaseVersion::ordered_weight`].
const GROUP_SCALE: f64 = 100.0;

fn release_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^R\d+(?:\.\d+)+(?:-\d+(?:\.\d+)+)?$").expect("release grammar is a valid regex")
    })
}

/// A validated release version such as `R1.2.3` or `R7.0.2-2.0.1`.
///
/// Equality and `Ord` compare the numeric groups exactly. The floating
/// [`ordered_weight`](ReleaseVersion::ordered_weight) is an approximation used
/// only for sorting collections of releases.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion {
    raw: String,
    groups: Vec<u64>,
}

impl ReleaseVersion {
    /// Parse and validate a release tag.
    ///
    /// # Returns
    /// * `Ok(ReleaseVersion)` - The tag matches the release grammar
    /// * `Err(ReleaseError::InvalidVersion)` - Missing `R` prefix, fewer than two
    ///   numeric components, or non-numeric components
    pub fn parse(version: &str) -> Result<Self> {
        let invalid = || ReleaseError::InvalidVersion {
            version: version.to_string(),
        };

        if !release_pattern().is_match(version) {
            return Err(invalid());
        }

        let groups = numeric_groups(&version[1..]).ok_or_else(invalid)?;

        Ok(ReleaseVersion {
            raw: version.to_string(),
            groups,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric groups in order of appearance, e.g. `R3.15.4-1.0` -> `[3, 15, 4, 1, 0]`.
    pub fn groups(&self) -> &[u64] {
        &self.groups
    }

    /// Monotonic approximation of the version as a single float.
    ///
    /// The first group has weight 1 and each following group 1/100 of the
    /// previous one. Groups of 100 or more, or more than a handful of groups,
    /// exceed the representable precision and may collide.
    pub fn ordered_weight(&self) -> f64 {
        let mut weight = 0.0;
        let mut scale = 1.0;
        for group in &self.groups {
            weight += *group as f64 * scale;
            scale /= GROUP_SCALE;
        }
        weight
    }
}

/// Split on `.`, `_` and `-`, parsing every piece as a number.
fn numeric_groups(text: &str) -> Option<Vec<u64>> {
    text.split(['.', '_', '-'])
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.groups
            .cmp(&other.groups)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Assign every release a sort weight that is unique within `releases`.
///
/// Releases whose approximate weights collide are nudged down by a strictly
/// increasing number of float steps, in input order, so sorting by the
/// returned weights is a total order.
pub fn ordered_weights(releases: &[ReleaseVersion]) -> Vec<f64> {
    let mut assigned: Vec<f64> = Vec::with_capacity(releases.len());
    for release in releases {
        let mut weight = release.ordered_weight();
        while assigned.contains(&weight) {
            weight = next_down(weight);
        }
        assigned.push(weight);
    }
    assigned
}

/// Sort releases by ascending weight.
pub fn sort_releases(releases: &mut Vec<ReleaseVersion>) {
    let weights = ordered_weights(releases);
    let mut keyed: Vec<(f64, ReleaseVersion)> =
        weights.into_iter().zip(releases.drain(..)).collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    releases.extend(keyed.into_iter().map(|(_, release)| release));
}

fn next_down(value: f64) -> f64 {
    if value == 0.0 {
        return -f64::from_bits(1);
    }
    let bits = value.to_bits();
    if value > 0.0 {
        f64::from_bits(bits - 1)
    } else {
        f64::from_bits(bits + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ReleaseVersion {
        ReleaseVersion::parse(s).unwrap()
    }

    #[test]
    fn test_parse_plain_release() {
        let version = v("R1.2.3");
        assert_eq!(version.groups(), &[1, 2, 3]);
        assert_eq!(version.as_str(), "R1.2.3");
    }

    #[test]
    fn test_parse_base_dependent_release() {
        assert_eq!(v("R3.14.12-0.4.0").groups(), &[3, 14, 12, 0, 4, 0]);
        assert_eq!(v("R3.15.4-1.0").groups(), &[3, 15, 4, 1, 0]);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for bad in [
            "1.2.3", "v1.2.3", "R1", "R", "R1.", "R1.x.3", "R1.2-3", "R1.2.3-", "r1.2.3", "R1.2.3 ",
        ] {
            assert!(
                matches!(ReleaseVersion::parse(bad), Err(ReleaseError::InvalidVersion { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_weight_is_monotonic() {
        let ordered = ["R1.2.3", "R1.10.0", "R1.10.0-0.1.0", "R2.0.0", "R2.0.1", "R10.0.0"];
        for pair in ordered.windows(2) {
            assert!(
                v(pair[0]).ordered_weight() < v(pair[1]).ordered_weight(),
                "{} should weigh less than {}",
                pair[0],
                pair[1]
            );
            assert!(v(pair[0]) < v(pair[1]));
        }
    }

    #[test]
    fn test_ordered_weights_are_distinct() {
        // Trailing zero groups add nothing to the weight.
        let releases = vec![v("R1.2"), v("R1.2.0"), v("R1.2.0.0")];
        assert_eq!(releases[0].ordered_weight(), releases[1].ordered_weight());

        let weights = ordered_weights(&releases);
        assert!(weights[0] > weights[1]);
        assert!(weights[1] > weights[2]);
    }

    #[test]
    fn test_sort_releases() {
        let mut releases = vec![v("R2.0.0"), v("R1.10.0"), v("R1.2.3"), v("R1.2.3-1.0.0")];
        sort_releases(&mut releases);
        let sorted: Vec<&str> = releases.iter().map(|r| r.as_str()).collect();
        assert_eq!(sorted, vec!["R1.2.3", "R1.2.3-1.0.0", "R1.10.0", "R2.0.0"]);
    }

    #[test]
    fn test_display_round_trips_raw_string() {
        assert_eq!(v("R7.0.2-2.0.1").to_string(), "R7.0.2-2.0.1");
    }
}
