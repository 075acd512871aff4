#![forbid(unsafe_code)]

//! In-memory host fakes for deterministic tests.
//!
//! Enabled for this crate's own tests and, for downstream crates, through the
//! `test-helpers` feature. [`TestHost`] bundles one of each fake and hands out
//! matching [`HostBindings`].

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::host::{
    HostBindings, HostRouter, Listener, ListenerId, PageLifecycle, RouterSignal, ScrollSurface,
    SessionStorage, SignalHub, StorageError,
};
use crate::position::{NavigationKey, ScrollPosition};
use crate::timer::DeterministicScheduler;

/// `sessionStorage` stand-in with injectable failures.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<BTreeMap<String, String>>,
    fail_all: RefCell<Option<StorageError>>,
    fail_writes: RefCell<Option<StorageError>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every operation with `error` (or stop failing with `None`).
    pub fn fail_with(&self, error: Option<StorageError>) {
        *self.fail_all.borrow_mut() = error;
    }

    /// Fail only `set_item` with `error`.
    pub fn fail_writes_with(&self, error: Option<StorageError>) {
        *self.fail_writes.borrow_mut() = error;
    }

    /// Raw stored value, bypassing failure injection.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    /// Whether an entry exists for `key`'s storage key.
    #[must_use]
    pub fn has_entry(&self, key: &str) -> bool {
        self.items.borrow().contains_key(&NavigationKey::new(key).storage_key())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    fn check(&self) -> Result<(), StorageError> {
        match &*self.fail_all.borrow() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        if let Some(err) = &*self.fail_writes.borrow() {
            return Err(err.clone());
        }
        self.items.borrow_mut().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// A scroll-to call observed by [`FakeScrollSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollCall {
    Viewport(ScrollPosition),
    Element {
        selector: String,
        position: ScrollPosition,
    },
}

/// Viewport plus a set of selector-addressable scroll containers.
#[derive(Debug, Default)]
pub struct FakeScrollSurface {
    viewport: Cell<ScrollPosition>,
    elements: RefCell<BTreeMap<String, ScrollPosition>>,
    calls: RefCell<Vec<ScrollCall>>,
}

impl FakeScrollSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the viewport offset as-is (unsanitized, e.g. rubber-band overscroll).
    pub fn set_viewport(&self, position: ScrollPosition) {
        self.viewport.set(position);
    }

    #[must_use]
    pub fn viewport(&self) -> ScrollPosition {
        self.viewport.get()
    }

    pub fn add_element(&self, selector: &str, position: ScrollPosition) {
        self.elements.borrow_mut().insert(selector.to_owned(), position);
    }

    pub fn set_element(&self, selector: &str, position: ScrollPosition) {
        if let Some(slot) = self.elements.borrow_mut().get_mut(selector) {
            *slot = position;
        }
    }

    pub fn remove_element(&self, selector: &str) {
        self.elements.borrow_mut().remove(selector);
    }

    #[must_use]
    pub fn element(&self, selector: &str) -> Option<ScrollPosition> {
        self.elements.borrow().get(selector).copied()
    }

    /// Scroll-to calls in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ScrollCall> {
        self.calls.borrow().clone()
    }
}

impl ScrollSurface for FakeScrollSurface {
    fn element_offset(&self, selector: &str) -> Option<ScrollPosition> {
        self.element(selector)
    }

    fn viewport_offset(&self) -> ScrollPosition {
        self.viewport.get()
    }

    fn scroll_element_to(&self, selector: &str, position: ScrollPosition) -> bool {
        let mut elements = self.elements.borrow_mut();
        let Some(slot) = elements.get_mut(selector) else {
            return false;
        };
        *slot = position;
        self.calls.borrow_mut().push(ScrollCall::Element {
            selector: selector.to_owned(),
            position,
        });
        true
    }

    fn scroll_viewport_to(&self, position: ScrollPosition) {
        self.viewport.set(position);
        self.calls.borrow_mut().push(ScrollCall::Viewport(position));
    }
}

/// Router fake: holds the active key and a hub for both route events.
#[derive(Debug, Default)]
pub struct FakeRouter {
    active: RefCell<Option<NavigationKey>>,
    events: SignalHub<RouterSignal>,
}

impl FakeRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_active_key(&self, key: Option<&str>) {
        *self.active.borrow_mut() = key.map(NavigationKey::new);
    }

    /// Emit navigation-start.
    pub fn start_navigation(&self) {
        self.events.emit(RouterSignal::NavigationStart);
    }

    /// Switch the active key, then emit navigation-complete.
    pub fn complete_navigation(&self, key: Option<&str>) {
        self.set_active_key(key);
        self.events.emit(RouterSignal::NavigationComplete);
    }

    /// Start/complete pair, as a router performs for one route change.
    pub fn navigate(&self, key: &str) {
        self.start_navigation();
        self.complete_navigation(Some(key));
    }

    /// Total listeners across both signals.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.events.len()
    }
}

impl HostRouter for FakeRouter {
    fn active_key(&self) -> Option<NavigationKey> {
        self.active.borrow().clone()
    }

    fn subscribe(&self, signal: RouterSignal, listener: Listener) -> ListenerId {
        self.events.subscribe(signal, listener)
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.events.unsubscribe(id);
    }
}

/// Page lifecycle fake.
#[derive(Debug, Default)]
pub struct FakeLifecycle {
    discard: SignalHub,
}

impl FakeLifecycle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit before-discard.
    pub fn discard(&self) {
        self.discard.emit(());
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.discard.len()
    }
}

impl PageLifecycle for FakeLifecycle {
    fn subscribe_before_discard(&self, listener: Listener) -> ListenerId {
        self.discard.subscribe((), listener)
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.discard.unsubscribe(id);
    }
}

/// One of each fake, sharing nothing with other `TestHost`s.
#[derive(Debug, Clone, Default)]
pub struct TestHost {
    pub router: Rc<FakeRouter>,
    pub lifecycle: Rc<FakeLifecycle>,
    pub scroll: Rc<FakeScrollSurface>,
    pub storage: Rc<MemoryStorage>,
    pub timers: Rc<DeterministicScheduler>,
}

impl TestHost {
    /// Host whose router has no active key yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Host whose router already reports `key`.
    #[must_use]
    pub fn with_active_key(key: &str) -> Self {
        let host = Self::new();
        host.router.set_active_key(Some(key));
        host
    }

    #[must_use]
    pub fn bindings(&self) -> HostBindings {
        HostBindings {
            router: self.router.clone(),
            lifecycle: self.lifecycle.clone(),
            scroll: self.scroll.clone(),
            storage: self.storage.clone(),
            timers: self.timers.clone(),
        }
    }

    /// Store a position for `key` directly in storage.
    pub fn seed_entry(&self, key: &str, position: ScrollPosition) {
        let raw = crate::position::encode_entry(position).unwrap_or_default();
        let _ = self
            .storage
            .set_item(&NavigationKey::new(key).storage_key(), &raw);
    }
}
