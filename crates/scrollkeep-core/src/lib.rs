#![forbid(unsafe_code)]

//! Scroll restoration for client-side routed web applications.
//!
//! Client-side routers usually drop the scroll offset on every route change.
//! This crate saves the outgoing page's offset into session storage when a
//! navigation starts, and restores (then forgets) it when the navigation back
//! to that history entry completes.
//!
//! # Key Components
//!
//! - [`ScrollPositionStore`] - keyed save/restore/delete over session storage
//! - [`ScrollRestoration`] - navigation-lifecycle controller
//! - [`HostBindings`] - the capability traits the controller runs against
//! - [`DeterministicScheduler`] - host-driven timers for reproducible tests
//!
//! # Example
//!
//! ```
//! use scrollkeep_core::testing::TestHost;
//! use scrollkeep_core::{RestorationOptions, ScrollPosition, use_scroll_restoration};
//!
//! let host = TestHost::with_active_key("home");
//! let _controller = use_scroll_restoration(&host.bindings(), RestorationOptions::default());
//!
//! host.scroll.set_viewport(ScrollPosition::new(0.0, 640.0));
//! host.router.navigate("article");
//! assert_eq!(host.scroll.viewport(), ScrollPosition::ORIGIN);
//!
//! // Back to the first entry.
//! host.router.navigate("home");
//! assert_eq!(host.scroll.viewport(), ScrollPosition::new(0.0, 640.0));
//! ```

pub mod config;
pub mod controller;
pub mod host;
pub mod position;
pub mod store;
pub mod timer;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use config::{ConfigError, RestorationConfig, RestorationOptions};
pub use controller::{
    ControllerPhase, IgnoredReason, LifecycleSignal, RestorationLogEntry,
    RestorationOutcome, ScrollRestoration, use_scroll_restoration,
};
pub use host::{
    HostBindings, HostRouter, Listener, ListenerId, PageLifecycle, RouterSignal, ScrollSurface,
    SessionStorage, SignalHub, StorageError,
};
pub use position::{NavigationKey, STORAGE_KEY_PREFIX, ScrollPosition};
pub use store::{ScrollPositionStore, ScrollTarget};
pub use timer::{DeterministicScheduler, TimerId, TimerScheduler, TimerTask};
