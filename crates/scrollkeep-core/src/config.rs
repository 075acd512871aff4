#![forbid(unsafe_code)]

//! Controller configuration.
//!
//! [`RestorationConfig`] is plain data: it can be built in code or decoded
//! from the JSON options object a JS host passes in.
//!
//! ```json
//! { "enabled": true, "selector": "#content", "delay": 200 }
//! ```

use core::fmt;
use core::time::Duration;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::host::HostRouter;

/// Tunables for one mounted controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestorationConfig {
    /// When `false` no listener is attached and no side effect happens.
    pub enabled: bool,
    /// Selector of the scroll container; `None` tracks the page viewport.
    pub selector: Option<String>,
    /// Wait this long after navigation completes before restoring, to let
    /// late content settle the container height.
    #[serde(alias = "delay")]
    pub delay_ms: Option<u64>,
}

impl Default for RestorationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            selector: None,
            delay_ms: None,
        }
    }
}

impl RestorationConfig {
    /// Decode from a JSON options object and validate it.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Disabled configuration.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    #[must_use]
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    /// The restore delay, if one is configured. A zero delay means none.
    #[must_use]
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }

    /// Selector as a borrowed str.
    #[must_use]
    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }

    /// Drop a blank selector so the viewport is tracked instead.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.selector.as_deref().is_some_and(|s| s.trim().is_empty()) {
            self.selector = None;
        }
        self
    }

    /// Validate fields. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(selector) = &self.selector {
            if selector.trim().is_empty() {
                errors.push("selector must not be blank".into());
            }
        }
        errors
    }
}

/// Options accepted by [`crate::use_scroll_restoration`].
#[derive(Clone, Default)]
pub struct RestorationOptions {
    /// Router to use instead of the host bindings' router.
    pub router: Option<Rc<dyn HostRouter>>,
    pub config: RestorationConfig,
}

impl RestorationOptions {
    #[must_use]
    pub fn new(config: RestorationConfig) -> Self {
        Self {
            router: None,
            config,
        }
    }

    #[must_use]
    pub fn with_router(mut self, router: Rc<dyn HostRouter>) -> Self {
        self.router = Some(router);
        self
    }
}

impl fmt::Debug for RestorationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestorationOptions")
            .field("router_override", &self.router.is_some())
            .field("config", &self.config)
            .finish()
    }
}

/// Configuration decoding failure.
#[derive(Debug)]
pub enum ConfigError {
    /// The options object was not valid JSON for this schema.
    Json(serde_json::Error),
    /// Decoded fine but failed validation.
    Validation(Vec<String>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => write!(f, "validation errors: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
