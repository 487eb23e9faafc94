//! Dotted-numeric version comparison for versioned capability flags.

use std::cmp::Ordering;

/// Compare two dotted version strings numerically, segment by segment.
///
/// Missing segments count as zero, so `"17" == "17.0.0"`. Non-numeric
/// segments compare as zero, which keeps the comparison total for
/// malformed input instead of failing.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.').map(segment);
    let mut right = b.split('.').map(segment);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (l, r) => {
                let l = l.unwrap_or(0);
                let r = r.unwrap_or(0);
                match l.cmp(&r) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
        }
    }
}

/// Whether `actual` satisfies `required` as a minimum version.
pub fn meets_minimum(actual: &str, required: &str) -> bool {
    compare_versions(actual, required) != Ordering::Less
}

fn segment(s: &str) -> u64 {
    // "0-beta1" style suffixes truncate at the first non-digit.
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_versions() {
        assert_eq!(compare_versions("17.0.0", "17.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("17", "17.0.0"), Ordering::Equal);
    }

    #[test]
    fn numeric_not_lexicographic() {
        assert_eq!(compare_versions("10.0", "9.0"), Ordering::Greater);
        assert_eq!(compare_versions("2.10", "2.9"), Ordering::Greater);
    }

    #[test]
    fn minimum_check() {
        assert!(meets_minimum("18.0.1", "17.0.0"));
        assert!(meets_minimum("17.0.0", "17.0.0"));
        assert!(!meets_minimum("16.0.11", "17.0.0"));
    }

    #[test]
    fn suffixed_segments_compare_by_leading_digits() {
        assert_eq!(compare_versions("17.0.0-beta1", "17.0.0"), Ordering::Equal);
        assert!(meets_minimum("17.1-rc2", "17.1"));
    }
}
