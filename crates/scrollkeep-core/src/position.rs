#![forbid(unsafe_code)]

//! Scroll offsets, navigation keys, and the stored-entry codec.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Prefix prepended to every navigation key before it touches session storage.
pub const STORAGE_KEY_PREFIX: &str = "scrollPos:";

/// A scroll offset in the scroll container's coordinate space.
///
/// Both components are non-negative and finite. Constructors sanitize input,
/// so a value obtained through this crate never carries `NaN` or a negative
/// offset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollPosition {
    /// Horizontal offset.
    pub x: f64,
    /// Vertical offset.
    pub y: f64,
}

impl ScrollPosition {
    /// The top-left origin, used whenever no stored entry is available.
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    /// Create a sanitized position.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: sanitize_axis(x),
            y: sanitize_axis(y),
        }
    }

    /// Whether this is the origin.
    #[must_use]
    pub fn is_origin(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

#[inline]
fn sanitize_axis(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Opaque identifier of one history entry, supplied by the host router.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NavigationKey(String);

impl NavigationKey {
    /// Wrap a host-supplied key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the raw key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Session-storage key under which this entry's position is kept.
    #[must_use]
    pub fn storage_key(&self) -> String {
        let mut out = String::with_capacity(STORAGE_KEY_PREFIX.len() + self.0.len());
        out.push_str(STORAGE_KEY_PREFIX);
        out.push_str(&self.0);
        out
    }
}

impl fmt::Display for NavigationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NavigationKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NavigationKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Encode a position as a compact JSON stored entry (`{"x":..,"y":..}`).
pub fn encode_entry(position: ScrollPosition) -> Result<String, serde_json::Error> {
    serde_json::to_string(&position)
}

/// Decode a stored entry.
///
/// Returns `None` for anything that is not a well-formed entry. Decoded
/// components go through the same sanitization as [`ScrollPosition::new`].
#[must_use]
pub fn decode_entry(raw: &str) -> Option<ScrollPosition> {
    let parsed: ScrollPosition = serde_json::from_str(raw).ok()?;
    Some(ScrollPosition::new(parsed.x, parsed.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn storage_key_is_prefixed() {
        assert_eq!(NavigationKey::new("a1b2c3").storage_key(), "scrollPos:a1b2c3");
        assert_eq!(NavigationKey::new("").storage_key(), "scrollPos:");
    }

    #[test]
    fn new_sanitizes_invalid_components() {
        assert_eq!(ScrollPosition::new(-4.0, 12.5), ScrollPosition::new(0.0, 12.5));
        assert_eq!(ScrollPosition::new(f64::NAN, f64::INFINITY), ScrollPosition::ORIGIN);
        assert!(ScrollPosition::new(-0.0, 0.0).is_origin());
    }

    #[test]
    fn entry_encoding_is_compact_json() {
        let raw = encode_entry(ScrollPosition::new(0.0, 500.0)).unwrap();
        assert_eq!(raw, r#"{"x":0.0,"y":500.0}"#);
    }

    #[test]
    fn decode_accepts_integer_literals() {
        assert_eq!(decode_entry(r#"{"x":3,"y":40}"#), Some(ScrollPosition::new(3.0, 40.0)));
    }

    #[test]
    fn decode_rejects_malformed_entries() {
        assert_eq!(decode_entry(""), None);
        assert_eq!(decode_entry("not json"), None);
        assert_eq!(decode_entry(r#"{"x":1}"#), None);
        assert_eq!(decode_entry(r#"{"x":"1","y":2}"#), None);
    }

    #[test]
    fn decode_sanitizes_negative_offsets() {
        assert_eq!(decode_entry(r#"{"x":-10,"y":7.25}"#), Some(ScrollPosition::new(0.0, 7.25)));
    }

    #[test]
    fn float_offsets_round_trip_exactly() {
        let position = ScrollPosition::new(0.1 + 0.2, 1234.567_890_123_4);
        let raw = encode_entry(position).unwrap();
        assert_eq!(decode_entry(&raw), Some(position));
    }
}
