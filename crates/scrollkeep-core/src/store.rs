#![forbid(unsafe_code)]

//! Keyed scroll-position store over session storage.
//!
//! The store is best-effort: storage failures are logged and swallowed, and a
//! missing or malformed entry restores to the origin. A selector that does not
//! resolve to an element falls back to the page viewport for both saving and
//! restoring, so the two directions always agree on the container.

use std::rc::Rc;

use crate::host::{ScrollSurface, SessionStorage};
use crate::position::{NavigationKey, ScrollPosition, decode_entry, encode_entry};

/// The container a save or restore actually operated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollTarget {
    /// The element matched by the configured selector.
    Element,
    /// The page viewport (no selector, or the selector did not resolve).
    Viewport,
}

/// Save/restore/delete of scroll offsets keyed by navigation entry.
#[derive(Clone)]
pub struct ScrollPositionStore {
    storage: Rc<dyn SessionStorage>,
    surface: Rc<dyn ScrollSurface>,
}

impl ScrollPositionStore {
    #[must_use]
    pub fn new(storage: Rc<dyn SessionStorage>, surface: Rc<dyn ScrollSurface>) -> Self {
        Self { storage, surface }
    }

    /// Storage key for `key`.
    #[must_use]
    pub fn storage_key(key: &NavigationKey) -> String {
        key.storage_key()
    }

    /// Capture the selected container's offset and store it under `key`,
    /// overwriting any previous entry.
    pub fn save(&self, key: &NavigationKey, selector: Option<&str>) -> ScrollTarget {
        let (target, position) = self.read_offset(selector);
        let raw = match encode_entry(position) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(
                    target: "scrollkeep.store",
                    key = %key,
                    error = %err,
                    "scroll entry encode failed"
                );
                return target;
            }
        };
        match self.storage.set_item(&key.storage_key(), &raw) {
            Ok(()) => tracing::debug!(
                target: "scrollkeep.store",
                key = %key,
                x = position.x,
                y = position.y,
                container = ?target,
                "scroll position saved"
            ),
            Err(err) => tracing::warn!(
                target: "scrollkeep.store",
                key = %key,
                error = %err,
                "scroll position save failed"
            ),
        }
        target
    }

    /// Look up the stored position for `key` without touching the page.
    #[must_use]
    pub fn load(&self, key: &NavigationKey) -> Option<ScrollPosition> {
        let storage_key = key.storage_key();
        let raw = match self.storage.get_item(&storage_key) {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!(
                    target: "scrollkeep.store",
                    key = %key,
                    error = %err,
                    "scroll position read failed"
                );
                return None;
            }
        };
        let decoded = decode_entry(&raw);
        if decoded.is_none() {
            tracing::trace!(
                target: "scrollkeep.store",
                key = %key,
                raw = %raw,
                "malformed scroll entry ignored"
            );
        }
        decoded
    }

    /// Apply the stored position for `key` (or the origin when there is none).
    ///
    /// Returns the container scrolled and the position applied.
    pub fn restore(
        &self,
        key: &NavigationKey,
        selector: Option<&str>,
    ) -> (ScrollTarget, ScrollPosition) {
        let position = self.load(key).unwrap_or(ScrollPosition::ORIGIN);
        let target = self.scroll_to(selector, position);
        tracing::debug!(
            target: "scrollkeep.store",
            key = %key,
            x = position.x,
            y = position.y,
            container = ?target,
            "scroll position restored"
        );
        (target, position)
    }

    /// Forget the entry for `key`. Deleting an absent entry is not an error.
    pub fn delete(&self, key: &NavigationKey) {
        if let Err(err) = self.storage.remove_item(&key.storage_key()) {
            tracing::warn!(
                target: "scrollkeep.store",
                key = %key,
                error = %err,
                "scroll entry delete failed"
            );
        }
    }

    fn read_offset(&self, selector: Option<&str>) -> (ScrollTarget, ScrollPosition) {
        if let Some(selector) = selector {
            if let Some(position) = self.surface.element_offset(selector) {
                return (ScrollTarget::Element, ScrollPosition::new(position.x, position.y));
            }
            tracing::debug!(
                target: "scrollkeep.store",
                selector,
                "selector unresolved, saving viewport offset"
            );
        }
        let position = self.surface.viewport_offset();
        (ScrollTarget::Viewport, ScrollPosition::new(position.x, position.y))
    }

    fn scroll_to(&self, selector: Option<&str>, position: ScrollPosition) -> ScrollTarget {
        if let Some(selector) = selector {
            if self.surface.scroll_element_to(selector, position) {
                return ScrollTarget::Element;
            }
            tracing::debug!(
                target: "scrollkeep.store",
                selector,
                "selector unresolved, restoring viewport offset"
            );
        }
        self.surface.scroll_viewport_to(position);
        ScrollTarget::Viewport
    }
}

impl core::fmt::Debug for ScrollPositionStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScrollPositionStore").finish_non_exhaustive()
    }
}
