#![forbid(unsafe_code)]

//! State path resolution.
//!
//! A [`StatePath`] addresses a value inside a nested state snapshot. Paths
//! are written as dotted strings (`"todos.0.title"`) or built from segment
//! lists, which are joined with `.` and re-split so that a segment holding a
//! dot behaves exactly like the equivalent dotted string.
//!
//! # Invariants
//!
//! 1. Resolution never fails: a missing key, an out-of-range index, or a
//!    scalar in the middle of the path yields `None`.
//! 2. The empty path addresses the whole snapshot.
//! 3. Empty segments (`"a..b"`) are skipped.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Missing key | Object has no such key | `None` |
//! | Bad index | Array segment is not a decimal index or is out of range | `None` |
//! | Scalar parent | Intermediate value is a string/number/bool/null | `None` |

use std::fmt;

use serde_json::Value;

/// A parsed path into a state snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct StatePath {
    segments: Vec<String>,
}

impl StatePath {
    /// Parse a dotted path.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }

    /// Build a path from segments.
    ///
    /// Segments are normalized into a single dotted string first, so
    /// `["a.b", 0]` and `"a.b.0"` address the same value.
    ///
    /// ```
    /// use storelink_core::path::StatePath;
    ///
    /// let path = StatePath::from_segments(["todos", "0", "title"]);
    /// assert_eq!(path, StatePath::parse("todos.0.title"));
    /// ```
    #[must_use]
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: fmt::Display,
    {
        let joined = segments
            .into_iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(".");
        Self::parse(&joined)
    }

    /// The path addressing the whole snapshot.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Whether this path addresses the whole snapshot.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The normalized segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Resolve this path against `state`.
    #[must_use]
    pub fn resolve<'a>(&self, state: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(state, |current, segment| step(current, segment))
    }
}

fn step<'a>(current: &'a Value, segment: &str) -> Option<&'a Value> {
    match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl From<&str> for StatePath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<String> for StatePath {
    fn from(path: String) -> Self {
        Self::parse(&path)
    }
}

impl<S: fmt::Display> From<Vec<S>> for StatePath {
    fn from(segments: Vec<S>) -> Self {
        Self::from_segments(segments)
    }
}

/// Resolve `path` against `state`, returning `None` when any step is absent.
///
/// ```
/// use serde_json::json;
/// use storelink_core::path::resolve;
///
/// let state = json!({ "a": { "b": { "c": 5 } } });
/// assert_eq!(resolve(&state, "a.b.c"), Some(&json!(5)));
/// assert_eq!(resolve(&json!({ "a": {} }), "a.b.c"), None);
/// ```
#[must_use]
pub fn resolve<'a>(state: &'a Value, path: impl Into<StatePath>) -> Option<&'a Value> {
    path.into().resolve(state)
}

/// Like [`resolve`], but clones the result.
#[must_use]
pub fn resolve_owned(state: &Value, path: impl Into<StatePath>) -> Option<Value> {
    resolve(state, path).cloned()
}
