#![forbid(unsafe_code)]

//! Capability interfaces the controller consumes from its host environment.
//!
//! Everything ambient in a browser (router events, the unload signal, scroll
//! offsets, `sessionStorage`, timers) is reached through the traits in this
//! module. The `scrollkeep-web` crate implements them on top of `web-sys`;
//! tests use the in-memory fakes from [`crate::testing`].
//!
//! All capabilities are single-threaded: hosts deliver signals sequentially on
//! one execution context, so listeners are `Rc` closures and no trait here
//! requires `Send`.

use core::fmt;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::position::{NavigationKey, ScrollPosition};
use crate::timer::TimerScheduler;

/// Callback attached to a host signal.
pub type Listener = Rc<dyn Fn()>;

/// Identifier returned by a subscription, used to detach the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Raw numeric id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Navigation lifecycle signals emitted by the host router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouterSignal {
    /// A route change has begun; the outgoing page is still mounted.
    NavigationStart,
    /// A route change finished and the new content is mounted.
    NavigationComplete,
}

impl RouterSignal {
    /// Stable label used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NavigationStart => "navigation_start",
            Self::NavigationComplete => "navigation_complete",
        }
    }
}

/// The embedding application's client-side router.
pub trait HostRouter {
    /// Key of the currently active history entry, if the router knows one.
    fn active_key(&self) -> Option<NavigationKey>;

    /// Attach `listener` to `signal`.
    fn subscribe(&self, signal: RouterSignal, listener: Listener) -> ListenerId;

    /// Detach a listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: ListenerId);
}

/// Source of the page `before-discard` (unload) signal.
pub trait PageLifecycle {
    /// Attach `listener` to the unload signal.
    fn subscribe_before_discard(&self, listener: Listener) -> ListenerId;

    /// Detach a listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: ListenerId);
}

/// Scroll-positioning capability for the page viewport and selectable elements.
///
/// The element methods report resolution failure instead of failing; the
/// viewport fallback policy lives in [`crate::store::ScrollPositionStore`].
pub trait ScrollSurface {
    /// Offset of the first element matching `selector`, or `None` if nothing matches.
    fn element_offset(&self, selector: &str) -> Option<ScrollPosition>;

    /// Current viewport offset.
    fn viewport_offset(&self) -> ScrollPosition;

    /// Scroll the first element matching `selector`. Returns `false` if nothing matches.
    fn scroll_element_to(&self, selector: &str, position: ScrollPosition) -> bool;

    /// Scroll the page viewport.
    fn scroll_viewport_to(&self, position: ScrollPosition);
}

/// Failure reported by a [`SessionStorage`] implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Storage is disabled or inaccessible in this environment.
    Unavailable,
    /// The write exceeded the storage quota.
    QuotaExceeded,
    /// Any other host-reported failure.
    Host(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => f.write_str("session storage unavailable"),
            Self::QuotaExceeded => f.write_str("session storage quota exceeded"),
            Self::Host(msg) => write!(f, "session storage error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Session-scoped string key-value storage.
pub trait SessionStorage {
    /// Read a value.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing an absent key succeeds.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// The full set of capabilities a controller is mounted against.
#[derive(Clone)]
pub struct HostBindings {
    pub router: Rc<dyn HostRouter>,
    pub lifecycle: Rc<dyn PageLifecycle>,
    pub scroll: Rc<dyn ScrollSurface>,
    pub storage: Rc<dyn SessionStorage>,
    pub timers: Rc<dyn TimerScheduler>,
}

impl HostBindings {
    /// Replace the router, keeping every other capability.
    #[must_use]
    pub fn with_router(mut self, router: Rc<dyn HostRouter>) -> Self {
        self.router = router;
        self
    }
}

impl fmt::Debug for HostBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBindings").finish_non_exhaustive()
    }
}

/// Listener registry with detach-by-id and re-entrancy-safe emission.
///
/// `S` distinguishes the signals a single hub carries (`()` for a hub with
/// just one signal). Ids are unique across all signals of one hub.
///
/// [`SignalHub::emit`] snapshots the matching listeners before invoking them,
/// so a listener may unsubscribe itself (or attach new listeners) while the
/// signal is being delivered; listeners attached during an emission are first
/// invoked on the next one.
pub struct SignalHub<S = ()> {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, S, Listener)>>,
}

impl<S> Default for SignalHub<S> {
    fn default() -> Self {
        Self {
            next_id: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        }
    }
}

impl<S: Copy + PartialEq> SignalHub<S> {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener to `signal`.
    pub fn subscribe(&self, signal: S, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.get().wrapping_add(1));
        self.next_id.set(id.0);
        self.listeners.borrow_mut().push((id, signal, listener));
        id
    }

    /// Detach a listener. Returns whether it was attached.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        // The removed listener is dropped after the borrow ends.
        let removed = {
            let mut listeners = self.listeners.borrow_mut();
            listeners
                .iter()
                .position(|(existing, _, _)| *existing == id)
                .map(|index| listeners.remove(index))
        };
        removed.is_some()
    }

    /// Whether `id` is currently attached.
    #[must_use]
    pub fn contains(&self, id: ListenerId) -> bool {
        self.listeners
            .borrow()
            .iter()
            .any(|(existing, _, _)| *existing == id)
    }

    /// Number of listeners attached to `signal`.
    #[must_use]
    pub fn count(&self, signal: S) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|(_, attached, _)| *attached == signal)
            .count()
    }

    /// Number of attached listeners across all signals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Whether no listener is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    /// Invoke every listener attached to `signal` when the emission starts.
    ///
    /// A listener detached by an earlier listener of the same emission is
    /// skipped.
    pub fn emit(&self, signal: S) {
        let snapshot: Vec<(ListenerId, Listener)> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, attached, _)| *attached == signal)
            .map(|(id, _, listener)| (*id, Rc::clone(listener)))
            .collect();
        for (id, listener) in snapshot {
            if self.contains(id) {
                listener();
            }
        }
    }
}

impl<S> fmt::Debug for SignalHub<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalHub")
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}
