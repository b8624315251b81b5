//! Heuristic media identification and metadata extraction from paths.
//!
//! Each media type is described by an ordered list of regular expressions.
//! Identification succeeds when any matcher finds a match anywhere in the
//! source path. Extraction walks the matchers in order; within one matcher the
//! rightmost match is used (text closer to the filename is more reliable than
//! directory-level hints), and across matchers the first one to supply a field
//! keeps it.

mod movie;
mod tv;

pub use movie::{DEFAULT_MOVIE_MATCHERS, MovieExtractor};
pub use tv::{DEFAULT_TV_MATCHERS, TvExtractor};

use regex::Regex;
use tracing::trace;

use crate::error::InitError;

/// Compile matcher patterns in order, rejecting the first invalid one.
pub fn compile_matchers<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>, InitError> {
    patterns
        .iter()
        .map(|pattern| {
            let pattern = pattern.as_ref();
            Regex::new(pattern).map_err(|source| InitError::InvalidMatcher {
                pattern: pattern.to_string(),
                source,
            })
        })
        .collect()
}

/// Ordered matcher list shared by the TV and movie extractors.
#[derive(Debug, Clone)]
pub(crate) struct Matchers {
    target: &'static str,
    matchers: Vec<Regex>,
}

impl Matchers {
    pub(crate) fn new<S: AsRef<str>>(
        target: &'static str,
        patterns: &[S],
    ) -> Result<Self, InitError> {
        Ok(Self {
            target,
            matchers: compile_matchers(patterns)?,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.matchers.len()
    }

    /// True when any matcher finds a match, trying them in order.
    pub(crate) fn identify(&self, haystack: &str) -> bool {
        for matcher in &self.matchers {
            if matcher.is_match(haystack) {
                trace!(stage = self.target, matcher = %matcher, path = haystack, "matched");
                return true;
            }
        }
        trace!(stage = self.target, path = haystack, "no matcher matched");
        false
    }

    /// Fill `N` positional fields from capture groups `1..=N`.
    ///
    /// Values are whitespace-trimmed; empty captures leave the field open
    /// for the next matcher. Scanning stops once every field is filled.
    pub(crate) fn fields<const N: usize>(&self, haystack: &str) -> [Option<String>; N] {
        let mut fields: [Option<String>; N] = std::array::from_fn(|_| None);

        for matcher in &self.matchers {
            if fields.iter().all(Option::is_some) {
                break;
            }

            let Some(captures) = matcher.captures_iter(haystack).last() else {
                continue;
            };

            for (idx, slot) in fields.iter_mut().enumerate() {
                if slot.is_some() {
                    continue;
                }
                let Some(group) = captures.get(idx + 1) else {
                    continue;
                };
                let value = group.as_str().trim();
                if !value.is_empty() {
                    trace!(
                        stage = self.target,
                        matcher = %matcher,
                        group = idx + 1,
                        value,
                        "extracted field"
                    );
                    *slot = Some(value.to_string());
                }
            }
        }

        fields
    }
}

/// Collapse every run of characters matched by `sanitizer` into one space.
pub(crate) fn sanitize(sanitizer: &Regex, value: &str) -> String {
    sanitizer.replace_all(value, " ").trim().to_string()
}

/// Parse a numeric capture, falling back to zero.
pub(crate) fn parse_number(value: Option<&str>) -> u32 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pattern_is_reported() {
        let err = compile_matchers(&["(unclosed"]).unwrap_err();
        assert!(matches!(err, InitError::InvalidMatcher { ref pattern, .. } if pattern == "(unclosed"));
    }

    #[test]
    fn rightmost_match_within_a_matcher() {
        let matchers = Matchers::new("test", &[r"(\d+)-(\d+)"]).unwrap();
        let [a, b] = matchers.fields::<2>("1-2 then 3-4");
        assert_eq!(a.as_deref(), Some("3"));
        assert_eq!(b.as_deref(), Some("4"));
    }

    #[test]
    fn first_matcher_to_fill_a_field_wins() {
        let matchers = Matchers::new("test", &[r"a(\d)(x)?", r"b(\d)(\d)"]).unwrap();
        let [first, second] = matchers.fields::<2>("a1 b23");
        assert_eq!(first.as_deref(), Some("1"));
        assert_eq!(second.as_deref(), Some("3"));
    }

    #[test]
    fn blank_captures_stay_open() {
        let matchers = Matchers::new("test", &[r"name=(\s*);", r"name=(\w+)"]).unwrap();
        let [name] = matchers.fields::<1>("name=  ; name=bob");
        assert_eq!(name.as_deref(), Some("bob"));
    }

    #[test]
    fn numbers_default_to_zero() {
        assert_eq!(parse_number(Some("07")), 7);
        assert_eq!(parse_number(Some("x")), 0);
        assert_eq!(parse_number(None), 0);
    }
}
