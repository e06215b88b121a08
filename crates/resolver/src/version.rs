//! Semver range matching for the appVersion strategy
//!
//! Bundle targets are npm-style ranges (`1.2.x`, `~1.2.3`, `1.2.3 - 1.2.7`,
//! `>=1.0.0 <2.0.0 || 3.x`). They are translated into [`semver::VersionReq`]
//! alternatives; anything that fails to translate matches nothing.

use semver::{Version, VersionReq};
use std::collections::BTreeSet;

const OPERATOR_CHARS: &[char] = &['<', '>', '=', '~', '^'];

/// Whether a range accepts every version
pub fn is_wildcard_range(range: &str) -> bool {
    matches!(range.trim(), "" | "*" | "x" | "X")
}

/// Loosely read a device-reported version into `MAJOR.MINOR.PATCH`
///
/// Skips to the first digit, reads up to three dot-separated numbers and
/// fills missing parts with zero. Returns `None` when there is no digit.
pub fn coerce_version(input: &str) -> Option<Version> {
    let start = input.find(|c: char| c.is_ascii_digit())?;
    let mut rest = &input[start..];
    let mut parts = [0u64; 3];

    for (i, slot) in parts.iter_mut().enumerate() {
        let len = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        *slot = rest[..len].parse().ok()?;
        rest = &rest[len..];

        if i == 2 {
            break;
        }
        match rest.strip_prefix('.') {
            Some(next) if next.starts_with(|c: char| c.is_ascii_digit()) => rest = next,
            _ => break,
        }
    }

    Some(Version::new(parts[0], parts[1], parts[2]))
}

/// Whether `version` satisfies the npm-style `range`
pub fn semver_satisfies(range: &str, version: &str) -> bool {
    match coerce_version(version) {
        Some(version) => range_matches(range, &version),
        None => false,
    }
}

/// Subset of `ranges` satisfied by the device's app version
///
/// Duplicates are dropped. Concrete ranges come first in descending string
/// order, wildcard ranges last.
pub fn filter_compatible_app_versions(ranges: &[String], current_version: &str) -> Vec<String> {
    let Some(version) = coerce_version(current_version) else {
        return Vec::new();
    };

    let matching: BTreeSet<&str> = ranges
        .iter()
        .map(String::as_str)
        .filter(|r| range_matches(r, &version))
        .collect();

    let (wildcards, mut concrete): (Vec<&str>, Vec<&str>) =
        matching.into_iter().partition(|r| is_wildcard_range(r));
    concrete.reverse();

    concrete
        .into_iter()
        .chain(wildcards)
        .map(str::to_string)
        .collect()
}

fn range_matches(range: &str, version: &Version) -> bool {
    match parse_range(range) {
        Some(alternatives) => alternatives.iter().any(|req| req.matches(version)),
        None => false,
    }
}

fn parse_range(range: &str) -> Option<Vec<VersionReq>> {
    range.split("||").map(parse_comparator_set).collect()
}

fn parse_comparator_set(set: &str) -> Option<VersionReq> {
    let tokens = tokenize(set.trim());

    let comparators = match tokens.as_slice() {
        [low, dash, high] if *dash == "-" => {
            let mut out = Vec::new();
            out.extend(translate_comparator(&format!(">={}", low))?);
            out.extend(translate_comparator(&format!("<={}", high))?);
            out
        }
        _ => {
            let mut out = Vec::new();
            for token in &tokens {
                out.extend(translate_comparator(token)?);
            }
            out
        }
    };

    if comparators.is_empty() {
        return Some(VersionReq::STAR);
    }
    VersionReq::parse(&comparators.join(", ")).ok()
}

/// Split on whitespace, gluing a bare operator to the version after it
fn tokenize(set: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut pending = String::new();

    for word in set.split_whitespace() {
        if word != "-" && word.chars().all(|c| OPERATOR_CHARS.contains(&c)) {
            pending.push_str(word);
            continue;
        }
        tokens.push(format!("{}{}", pending, word));
        pending.clear();
    }
    if !pending.is_empty() {
        tokens.push(pending);
    }
    tokens
}

/// Translate one npm comparator
///
/// `Some(None)` means the comparator accepts everything and can be dropped;
/// `None` means it cannot be expressed.
fn translate_comparator(token: &str) -> Option<Option<String>> {
    let op_len = token
        .find(|c: char| !OPERATOR_CHARS.contains(&c))
        .unwrap_or(token.len());
    let (op, version) = token.split_at(op_len);
    let version = version.trim_start_matches(|c| c == 'v' || c == 'V');

    let (core, suffix) = match version.find(|c| c == '-' || c == '+') {
        Some(idx) => version.split_at(idx),
        None => (version, ""),
    };

    let parts: Vec<&str> = core
        .split('.')
        .take_while(|p| !is_wildcard_range(p))
        .collect();
    let truncated = parts.len() < core.split('.').count();

    if parts.is_empty() {
        // `*`, `>=*` and friends
        return match op {
            "" | "=" | ">=" | "<=" | "~" | "^" => Some(None),
            _ => None,
        };
    }

    let mut rendered = parts.join(".");
    if !truncated {
        rendered.push_str(suffix);
    }

    let op = if op.is_empty() { "=" } else { op };
    Some(Some(format!("{}{}", op, rendered)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_coerce_version() {
        assert_eq!(coerce_version("1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(coerce_version("1.0"), Some(Version::new(1, 0, 0)));
        assert_eq!(coerce_version("v2"), Some(Version::new(2, 0, 0)));
        assert_eq!(coerce_version("1.12"), Some(Version::new(1, 12, 0)));
        assert_eq!(coerce_version("1.2.3.4"), Some(Version::new(1, 2, 3)));
        assert_eq!(coerce_version("invalid.version"), None);
        assert_eq!(coerce_version(""), None);
    }

    #[test]
    fn test_exact_and_wildcards() {
        assert!(semver_satisfies("1.2.3", "1.2.3"));
        assert!(!semver_satisfies("1.2.3", "1.2.4"));
        assert!(semver_satisfies("*", "9.9.9"));
        assert!(semver_satisfies("1.x.x", "1.0"));
        assert!(semver_satisfies("1.x.x", "1.12"));
        assert!(semver_satisfies("1.2.x", "1.2.9"));
        assert!(!semver_satisfies("1.2.x", "1.3.0"));
        assert!(semver_satisfies("1.2", "1.2.4"));
        assert!(!semver_satisfies("1.2", "1.3.0"));
    }

    #[test]
    fn test_operator_ranges() {
        assert!(semver_satisfies(">=1.2.3 <1.2.7", "1.2.5"));
        assert!(!semver_satisfies(">=1.2.3 <1.2.7", "1.2.7"));
        assert!(semver_satisfies(">= 1.2.3", "1.4.0"));
        assert!(semver_satisfies("~1.2.3", "1.2.9"));
        assert!(!semver_satisfies("~1.2.3", "1.3.0"));
        assert!(semver_satisfies("^1.2.3", "1.9.0"));
        assert!(!semver_satisfies("^1.2.3", "2.0.0"));
    }

    #[test]
    fn test_hyphen_and_union() {
        assert!(semver_satisfies("1.2.3 - 1.2.7", "1.2.7"));
        assert!(!semver_satisfies("1.2.3 - 1.2.7", "1.2.8"));
        assert!(semver_satisfies("1.2.3 || 2.x", "2.5.0"));
        assert!(!semver_satisfies("1.2.3 || 2.x", "3.0.0"));
    }

    #[test]
    fn test_malformed_ranges_match_nothing() {
        assert!(!semver_satisfies("not-a-range", "1.0.0"));
        assert!(!semver_satisfies(">=abc", "1.0.0"));
        assert!(!semver_satisfies("1.0.0", "no digits"));
    }

    #[test]
    fn test_filter_compatible_app_versions() {
        let targets = ranges(&[
            "1.2.3",
            "*",
            "1.2.3 - 1.2.7",
            ">=1.2.3 <1.2.7",
            "~1.2.3",
            "^1.2.3",
            "1.2.x",
            "1.2",
        ]);

        assert_eq!(
            filter_compatible_app_versions(&targets, "1.2.4"),
            ranges(&[
                "~1.2.3",
                "^1.2.3",
                ">=1.2.3 <1.2.7",
                "1.2.x",
                "1.2.3 - 1.2.7",
                "1.2",
                "*",
            ])
        );
        assert_eq!(
            filter_compatible_app_versions(&targets, "1.3.0"),
            ranges(&["^1.2.3", "*"])
        );
        assert_eq!(filter_compatible_app_versions(&targets, "2.0.0"), ranges(&["*"]));
        assert!(filter_compatible_app_versions(&targets, "invalid.version").is_empty());
    }

    #[test]
    fn test_filter_deduplicates() {
        let targets = ranges(&["1.0.x", "1.0.x", "*"]);
        assert_eq!(
            filter_compatible_app_versions(&targets, "1.0.2"),
            ranges(&["1.0.x", "*"])
        );
    }
}
