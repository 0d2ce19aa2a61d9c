//! Version string helpers.
//!
//! Upstream vendors publish every shape of version string: semver, four-part
//! Windows versions, zero-padded parts (`7.03`) and dates (`2025.10.13`,
//! `2025-09-16`). These helpers convert between the shapes `WinGet` expects and
//! order them.

use std::cmp::Ordering;

/// Strip leading zeros from every numeric dot-separated part.
///
/// Trailing zero parts are kept; non-numeric parts are left untouched.
///
/// ```
/// use wingetup_schema::version::normalize;
///
/// assert_eq!(normalize("7.03.51009.0"), "7.3.51009.0");
/// assert_eq!(normalize("10.01.100.001"), "10.1.100.1");
/// assert_eq!(normalize("1.0.0.0"), "1.0.0.0");
/// ```
pub fn normalize(version: &str) -> String {
    version
        .split('.')
        .map(|part| match part.parse::<u64>() {
            Ok(n) if part.chars().all(|c| c.is_ascii_digit()) => n.to_string(),
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Drop a single trailing `.0` (`2.4.4.0` becomes `2.4.4`).
pub fn short(version: &str) -> &str {
    version.strip_suffix(".0").unwrap_or(version)
}

/// Append `.0` to versions with exactly three parts.
///
/// Used for packages tagged `7.5.4` upstream but published as `7.5.4.0`.
pub fn append_dot_zero(version: &str) -> String {
    if version.split('.').count() == 3 {
        format!("{version}.0")
    } else {
        version.to_string()
    }
}

/// Strip the `v` prefix from a release tag.
///
/// Uppercase `V` is stripped as well, and so are repeated prefixes, so
/// `V1.2` and `vv1.2` both yield `1.2`.
pub fn strip_tag_prefix(tag: &str) -> &str {
    tag.trim_start_matches(['v', 'V'])
}

/// Ordering key for upstream version directories.
///
/// Splits on `.` and `-`; numeric parts compare as integers and anything
/// non-numeric counts as zero, so dates with either separator order
/// correctly next to plain numeric versions.
pub fn sort_key(version: &str) -> Vec<u64> {
    version
        .split(['.', '-'])
        .map(|p| p.parse::<u64>().unwrap_or(0))
        .collect()
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Num(u64),
    Text(&'a str),
}

impl Ord for Segment<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Num(a), Segment::Num(b)) => a.cmp(b),
            (Segment::Num(_), Segment::Text(_)) => Ordering::Greater,
            (Segment::Text(_), Segment::Num(_)) => Ordering::Less,
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Segment<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Split `1.2.4-beta.1` into release segments and an optional pre-release tail.
fn split_release(version: &str) -> (Vec<Segment<'_>>, Option<&str>) {
    let (release, pre) = match version.split_once('-') {
        Some((r, p)) if p.chars().next().is_some_and(|c| !c.is_ascii_digit()) => (r, Some(p)),
        _ => (version, None),
    };
    let segments = release
        .split(['.', '-', '_'])
        .map(|p| p.parse::<u64>().map_or(Segment::Text(p), Segment::Num))
        .collect();
    (segments, pre)
}

const ZERO: Segment<'static> = Segment::Num(0);

fn compare_segments(a: &str, b: &str) -> Ordering {
    let (a_rel, a_pre) = split_release(a);
    let (b_rel, b_pre) = split_release(b);

    let len = a_rel.len().max(b_rel.len());
    for i in 0..len {
        let left = a_rel.get(i).unwrap_or(&ZERO);
        let right = b_rel.get(i).unwrap_or(&ZERO);
        match left.cmp(right) {
            Ordering::Equal => {}
            other => return other,
        }
    }

    match (a_pre, b_pre) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp(y),
    }
}

/// Compare two version strings.
///
/// Strict semver is used when both sides parse; otherwise a segment-wise
/// comparison where missing parts count as zero and a pre-release suffix
/// orders below the release.
///
/// ```
/// use std::cmp::Ordering;
/// use wingetup_schema::version::compare;
///
/// assert_eq!(compare("1.2.10", "1.2.9"), Ordering::Greater);
/// assert_eq!(compare("2.4.4.0", "2.4.4"), Ordering::Equal);
/// assert_eq!(compare("1.2.4-beta", "1.2.4"), Ordering::Less);
/// ```
pub fn compare(a: &str, b: &str) -> Ordering {
    if let (Ok(va), Ok(vb)) = (semver::Version::parse(a), semver::Version::parse(b)) {
        return va.cmp(&vb);
    }
    compare_segments(a, b)
}

/// `true` when `candidate` is strictly newer than `current`.
pub fn is_newer(current: &str, candidate: &str) -> bool {
    compare(candidate, current) == Ordering::Greater
}

/// The newest version of a list, or `None` when the list is empty.
pub fn latest<S: AsRef<str>>(versions: &[S]) -> Option<&str> {
    versions
        .iter()
        .map(AsRef::as_ref)
        .max_by(|a, b| compare(a, b))
}
