#![forbid(unsafe_code)]

//! Browser bindings for `scrollkeep`.
//!
//! On `wasm32` this crate exports a [`ScrollRestoration`] class to JavaScript
//! that mounts a `scrollkeep_core` controller against `window.sessionStorage`,
//! window/element scrolling, `setTimeout`, `beforeunload` and a JS router
//! object:
//!
//! ```js
//! const restoration = new ScrollRestoration(router, { selector: "#main", delay: 200 });
//! // ...
//! restoration.free();
//! ```
//!
//! The router object needs `events.on(name, fn)` and `events.off(name, fn)`.
//! Its active key is read from `router.activeKey()` when present, otherwise
//! from `history.state.key`.
//!
//! Option decoding and log formatting live here and are tested natively.

use serde::Deserialize;

use scrollkeep_core::{ConfigError, NavigationKey, RestorationConfig, RestorationLogEntry};

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::ScrollRestoration;

/// Router event names the adapter listens on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterEventNames {
    /// Fired when a route change begins.
    pub start: String,
    /// Fired once the new route is mounted.
    pub complete: String,
}

impl Default for RouterEventNames {
    fn default() -> Self {
        Self {
            start: "routeChangeStart".into(),
            complete: "routeChangeComplete".into(),
        }
    }
}

/// The options object accepted by the JS constructor.
///
/// JS numbers are doubles, so the delay is decoded as `f64` and checked in
/// [`WebOptions::into_parts`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WebOptions {
    pub enabled: Option<bool>,
    pub selector: Option<String>,
    #[serde(alias = "delayMs")]
    pub delay: Option<f64>,
    pub events: RouterEventNames,
}

/// Decoded options, split into controller config and adapter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSettings {
    pub config: RestorationConfig,
    pub events: RouterEventNames,
}

impl WebOptions {
    /// Decode an options object serialized as JSON.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Convert into controller config, validating every field.
    ///
    /// Fractional delays are rounded to the nearest millisecond.
    pub fn into_parts(self) -> Result<WebSettings, ConfigError> {
        let mut errors = Vec::new();
        let delay_ms = match self.delay {
            None => None,
            Some(delay) if delay.is_finite() && delay >= 0.0 => Some(delay_to_millis(delay)),
            Some(delay) => {
                errors.push(format!("delay must be a non-negative finite number, got {delay}"));
                None
            }
        };
        if self.events.start.is_empty() || self.events.complete.is_empty() {
            errors.push("router event names must not be empty".into());
        }

        let config = RestorationConfig {
            enabled: self.enabled.unwrap_or(true),
            selector: self.selector,
            delay_ms,
        };
        errors.extend(config.validate());
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }
        Ok(WebSettings {
            config,
            events: self.events,
        })
    }
}

/// Decode and validate a JSON options object in one step.
pub fn parse_options(json: &str) -> Result<WebSettings, ConfigError> {
    WebOptions::from_json_str(json)?.into_parts()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn delay_to_millis(delay: f64) -> u64 {
    // Saturating float-to-int cast.
    delay.round() as u64
}

/// Key from a raw history-state value; empty keys count as absent.
#[must_use]
pub fn navigation_key_from_raw(raw: Option<String>) -> Option<NavigationKey> {
    raw.filter(|key| !key.is_empty()).map(NavigationKey::new)
}

/// Render log entries as JSON lines.
#[must_use]
pub fn log_to_jsonl(entries: &[RestorationLogEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.to_json().to_string());
        out.push('\n');
    }
    out
}
