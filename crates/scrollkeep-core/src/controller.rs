#![forbid(unsafe_code)]

//! Navigation-lifecycle controller.
//!
//! [`ScrollRestoration`] listens to the host router and the page unload
//! signal and drives a [`ScrollPositionStore`]:
//!
//! | signal                | action                                              |
//! |-----------------------|-----------------------------------------------------|
//! | navigation start      | save the outgoing page under the outgoing key       |
//! | navigation complete   | adopt the new key, restore it then forget it        |
//! | before discard        | forget the current key and the router's active key  |
//!
//! # State machine
//!
//! ```text
//!            activate (key known)
//!   Idle ───────────────────────────▶ Tracking
//!    │                                   │
//!    └──────── teardown ──▶ TornDown ◀───┘
//!   Disabled ── teardown ──▶ TornDown
//! ```
//!
//! Listeners are only attached while `Tracking`. Every listener closes over a
//! snapshot of the key and selector it was built with; adopting a new key
//! rebuilds the listeners, always detaching the previous set first. Delayed
//! restorations close over their own snapshot, so a later completion never
//! redirects an already scheduled restore. Navigation start and teardown
//! revoke every pending one.

use core::time::Duration;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::config::{RestorationConfig, RestorationOptions};
use crate::host::{HostBindings, Listener, ListenerId, RouterSignal};
use crate::position::{NavigationKey, ScrollPosition};
use crate::store::ScrollPositionStore;
use crate::timer::TimerId;

/// Max log entries retained between [`ScrollRestoration::take_log`] calls.
pub const MAX_LOG_ENTRIES: usize = 256;

/// Controller lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    /// Enabled, but the router has not reported an active key yet.
    Idle,
    /// Key known and listeners attached.
    Tracking,
    /// Configured inactive; nothing is attached.
    Disabled,
    /// Consumer unmounted. Terminal.
    TornDown,
}

impl ControllerPhase {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Tracking => "tracking",
            Self::Disabled => "disabled",
            Self::TornDown => "torn_down",
        }
    }
}

/// Signal (or deferred continuation) a log entry was recorded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    NavigationStart,
    NavigationComplete,
    BeforeDiscard,
    /// A delayed restoration timer fired.
    DelayedRestore,
}

impl LifecycleSignal {
    /// Stable label used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NavigationStart => RouterSignal::NavigationStart.label(),
            Self::NavigationComplete => RouterSignal::NavigationComplete.label(),
            Self::BeforeDiscard => "before_discard",
            Self::DelayedRestore => "delayed_restore",
        }
    }
}

/// Why a signal produced no side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    /// No current key has been established yet.
    NoCurrentKey,
    /// The router reported no active key when navigation completed.
    NoActiveKey,
    /// The controller is disabled or torn down.
    Inactive,
}

/// What a dispatched signal did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RestorationOutcome {
    /// Outgoing position stored.
    Saved,
    /// Position applied and the entry forgotten.
    Restored(ScrollPosition),
    /// Restoration deferred by the given delay.
    RestoreScheduled(Duration),
    /// Entries removed on unload.
    Forgotten,
    Ignored(IgnoredReason),
}

impl RestorationOutcome {
    /// Stable label used in logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Restored(_) => "restored",
            Self::RestoreScheduled(_) => "restore_scheduled",
            Self::Forgotten => "forgotten",
            Self::Ignored(IgnoredReason::NoCurrentKey) => "ignored_no_current_key",
            Self::Ignored(IgnoredReason::NoActiveKey) => "ignored_no_active_key",
            Self::Ignored(IgnoredReason::Inactive) => "ignored_inactive",
        }
    }
}

/// Structured record of one controller dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct RestorationLogEntry {
    pub signal: LifecycleSignal,
    /// Key the dispatch operated on (for completion, the adopted key).
    pub key: Option<NavigationKey>,
    pub outcome: RestorationOutcome,
}

impl RestorationLogEntry {
    /// One JSON object per entry, for host-side JSONL collection.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "signal": self.signal.label(),
            "key": self.key.as_ref().map(NavigationKey::as_str),
            "outcome": self.outcome.label(),
        });
        match self.outcome {
            RestorationOutcome::Restored(position) => {
                value["x"] = position.x.into();
                value["y"] = position.y.into();
            }
            RestorationOutcome::RestoreScheduled(delay) => {
                value["delay_ms"] = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX).into();
            }
            _ => {}
        }
        value
    }
}

/// Immutable snapshot captured by listeners and delayed restorations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HandlerContext {
    key: NavigationKey,
    selector: Option<String>,
}

#[derive(Debug, Default)]
struct Subscriptions {
    navigation_start: Option<ListenerId>,
    navigation_complete: Option<ListenerId>,
    before_discard: Option<ListenerId>,
}

#[derive(Debug)]
struct ControllerState {
    phase: ControllerPhase,
    current_key: Option<NavigationKey>,
    subscriptions: Subscriptions,
    pending: Vec<TimerId>,
    log: VecDeque<RestorationLogEntry>,
}

struct Shared {
    host: HostBindings,
    store: ScrollPositionStore,
    config: RestorationConfig,
    state: RefCell<ControllerState>,
}

/// A mounted scroll-restoration controller.
///
/// Dropping the value tears the controller down: listeners are detached and
/// pending delayed restorations are revoked.
pub struct ScrollRestoration {
    shared: Rc<Shared>,
}

/// Mount a controller for one consumer.
///
/// `options.router`, when set, replaces the router in `host`. The returned
/// guard owns the controller for the consumer's lifetime.
pub fn use_scroll_restoration(
    host: &HostBindings,
    options: RestorationOptions,
) -> ScrollRestoration {
    ScrollRestoration::mount(host, options)
}

impl ScrollRestoration {
    /// Mount and, when enabled, activate immediately.
    #[must_use]
    pub fn mount(host: &HostBindings, options: RestorationOptions) -> Self {
        let RestorationOptions { router, config } = options;
        for problem in config.validate() {
            tracing::debug!(target: "scrollkeep.controller", %problem, "config field ignored");
        }
        let config = config.normalized();
        let host = match router {
            Some(router) => host.clone().with_router(router),
            None => host.clone(),
        };
        let phase = if config.enabled {
            ControllerPhase::Idle
        } else {
            ControllerPhase::Disabled
        };
        let store = ScrollPositionStore::new(Rc::clone(&host.storage), Rc::clone(&host.scroll));
        let shared = Rc::new(Shared {
            host,
            store,
            config,
            state: RefCell::new(ControllerState {
                phase,
                current_key: None,
                subscriptions: Subscriptions::default(),
                pending: Vec::new(),
                log: VecDeque::new(),
            }),
        });
        tracing::debug!(
            target: "scrollkeep.controller",
            enabled = shared.config.enabled,
            selector = shared.config.selector().unwrap_or(""),
            delay_ms = shared.config.delay_ms.unwrap_or(0),
            "scroll restoration mounted"
        );
        let controller = Self { shared };
        controller.activate();
        controller
    }

    /// Read the router's active key and start tracking if it is known.
    ///
    /// Only acts while [`ControllerPhase::Idle`]; returns the resulting phase.
    pub fn activate(&self) -> ControllerPhase {
        self.shared.activate()
    }

    #[must_use]
    pub fn phase(&self) -> ControllerPhase {
        self.shared.state.borrow().phase
    }

    #[must_use]
    pub fn current_key(&self) -> Option<NavigationKey> {
        self.shared.state.borrow().current_key.clone()
    }

    /// Delayed restorations scheduled and not yet fired.
    #[must_use]
    pub fn pending_restorations(&self) -> usize {
        self.shared.state.borrow().pending.len()
    }

    /// Number of host listeners currently attached by this controller.
    #[must_use]
    pub fn attached_listeners(&self) -> usize {
        let state = self.shared.state.borrow();
        let subs = &state.subscriptions;
        [subs.navigation_start, subs.navigation_complete, subs.before_discard]
            .iter()
            .filter(|id| id.is_some())
            .count()
    }

    /// Drain the dispatch log.
    pub fn take_log(&self) -> Vec<RestorationLogEntry> {
        self.shared.state.borrow_mut().log.drain(..).collect()
    }

    /// Detach every listener and revoke pending restorations. Idempotent.
    pub fn teardown(&self) {
        self.shared.teardown();
    }

    /// Tear this controller down and mount a fresh one with `config`.
    ///
    /// The new controller keeps the same host bindings (including any router
    /// override) and re-reads the active key.
    #[must_use]
    pub fn reconfigure(self, config: RestorationConfig) -> Self {
        self.teardown();
        Self::mount(&self.shared.host, RestorationOptions::new(config))
    }
}

impl Drop for ScrollRestoration {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

impl core::fmt::Debug for ScrollRestoration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("ScrollRestoration")
            .field("phase", &state.phase)
            .field("current_key", &state.current_key)
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl Shared {
    fn activate(self: &Rc<Self>) -> ControllerPhase {
        if self.state.borrow().phase != ControllerPhase::Idle {
            return self.state.borrow().phase;
        }
        let Some(key) = self.host.router.active_key() else {
            tracing::debug!(target: "scrollkeep.controller", "no active navigation key yet");
            return ControllerPhase::Idle;
        };
        {
            let mut state = self.state.borrow_mut();
            state.current_key = Some(key.clone());
            state.phase = ControllerPhase::Tracking;
        }
        tracing::debug!(target: "scrollkeep.controller", key = %key, "tracking navigation key");
        self.resubscribe();
        ControllerPhase::Tracking
    }

    /// Detach all listeners, then attach a fresh set closing over the current
    /// key. Calling it repeatedly never leaves more than one set attached.
    fn resubscribe(self: &Rc<Self>) {
        let previous = std::mem::take(&mut self.state.borrow_mut().subscriptions);
        self.detach(previous);

        let key = {
            let state = self.state.borrow();
            if state.phase != ControllerPhase::Tracking {
                return;
            }
            match &state.current_key {
                Some(key) => key.clone(),
                None => return,
            }
        };
        let ctx = Rc::new(HandlerContext {
            key,
            selector: self.config.selector.clone(),
        });

        let router = &self.host.router;
        let subscriptions = Subscriptions {
            navigation_start: Some(router.subscribe(
                RouterSignal::NavigationStart,
                self.listener(&ctx, Self::on_navigation_start),
            )),
            navigation_complete: Some(router.subscribe(
                RouterSignal::NavigationComplete,
                self.listener(&ctx, Self::on_navigation_complete),
            )),
            before_discard: Some(
                self.host
                    .lifecycle
                    .subscribe_before_discard(self.listener(&ctx, Self::on_before_discard)),
            ),
        };
        self.state.borrow_mut().subscriptions = subscriptions;
    }

    fn listener(
        self: &Rc<Self>,
        ctx: &Rc<HandlerContext>,
        handler: fn(&Rc<Self>, &HandlerContext),
    ) -> Listener {
        let weak: Weak<Self> = Rc::downgrade(self);
        let ctx = Rc::clone(ctx);
        Rc::new(move || {
            if let Some(shared) = weak.upgrade() {
                handler(&shared, &ctx);
            }
        })
    }

    fn detach(&self, subscriptions: Subscriptions) {
        if let Some(id) = subscriptions.navigation_start {
            self.host.router.unsubscribe(id);
        }
        if let Some(id) = subscriptions.navigation_complete {
            self.host.router.unsubscribe(id);
        }
        if let Some(id) = subscriptions.before_discard {
            self.host.lifecycle.unsubscribe(id);
        }
    }

    /// Reason a signal must be ignored in the current phase, if any.
    fn inactive_reason(&self) -> Option<IgnoredReason> {
        match self.state.borrow().phase {
            ControllerPhase::Tracking => None,
            ControllerPhase::Idle => Some(IgnoredReason::NoCurrentKey),
            ControllerPhase::Disabled | ControllerPhase::TornDown => Some(IgnoredReason::Inactive),
        }
    }

    fn on_navigation_start(self: &Rc<Self>, ctx: &HandlerContext) {
        let signal = LifecycleSignal::NavigationStart;
        if let Some(reason) = self.inactive_reason() {
            self.record(signal, Some(ctx.key.clone()), RestorationOutcome::Ignored(reason));
            return;
        }
        // The page any pending restore was meant for is being left.
        let revoked = self.revoke_pending();
        if revoked > 0 {
            tracing::debug!(
                target: "scrollkeep.controller",
                key = %ctx.key,
                revoked,
                "pending restorations revoked by navigation start"
            );
        }
        self.store.save(&ctx.key, ctx.selector.as_deref());
        self.record(signal, Some(ctx.key.clone()), RestorationOutcome::Saved);
    }

    fn on_navigation_complete(self: &Rc<Self>, ctx: &HandlerContext) {
        let signal = LifecycleSignal::NavigationComplete;
        if let Some(reason) = self.inactive_reason() {
            self.record(signal, Some(ctx.key.clone()), RestorationOutcome::Ignored(reason));
            return;
        }
        let Some(new_key) = self.host.router.active_key() else {
            self.record(signal, None, RestorationOutcome::Ignored(IgnoredReason::NoActiveKey));
            return;
        };

        self.state.borrow_mut().current_key = Some(new_key.clone());
        self.resubscribe();

        let snapshot = HandlerContext {
            key: new_key,
            selector: ctx.selector.clone(),
        };
        match self.config.delay() {
            None => {
                let position = self.restore_and_forget(&snapshot);
                self.record(signal, Some(snapshot.key), RestorationOutcome::Restored(position));
            }
            Some(delay) => {
                let key = snapshot.key.clone();
                self.schedule_restore(delay, snapshot);
                self.record(signal, Some(key), RestorationOutcome::RestoreScheduled(delay));
            }
        }
    }

    fn on_before_discard(self: &Rc<Self>, ctx: &HandlerContext) {
        let signal = LifecycleSignal::BeforeDiscard;
        if let Some(reason) = self.inactive_reason() {
            self.record(signal, Some(ctx.key.clone()), RestorationOutcome::Ignored(reason));
            return;
        }
        self.store.delete(&ctx.key);
        if let Some(active) = self.host.router.active_key() {
            if active != ctx.key {
                self.store.delete(&active);
            }
        }
        self.record(signal, Some(ctx.key.clone()), RestorationOutcome::Forgotten);
    }

    fn restore_and_forget(&self, snapshot: &HandlerContext) -> ScrollPosition {
        let (_, position) = self.store.restore(&snapshot.key, snapshot.selector.as_deref());
        self.store.delete(&snapshot.key);
        position
    }

    fn schedule_restore(self: &Rc<Self>, delay: Duration, snapshot: HandlerContext) {
        let weak = Rc::downgrade(self);
        let own_id: Rc<Cell<Option<TimerId>>> = Rc::new(Cell::new(None));
        let task = {
            let own_id = Rc::clone(&own_id);
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.on_delayed_restore(own_id.get(), &snapshot);
                }
            })
        };
        let id = self.host.timers.schedule(delay, task);
        own_id.set(Some(id));
        self.state.borrow_mut().pending.push(id);
    }

    fn on_delayed_restore(&self, id: Option<TimerId>, snapshot: &HandlerContext) {
        if let Some(id) = id {
            self.state.borrow_mut().pending.retain(|pending| *pending != id);
        }
        let signal = LifecycleSignal::DelayedRestore;
        if let Some(reason) = self.inactive_reason() {
            self.record(signal, Some(snapshot.key.clone()), RestorationOutcome::Ignored(reason));
            return;
        }
        let position = self.restore_and_forget(snapshot);
        self.record(signal, Some(snapshot.key.clone()), RestorationOutcome::Restored(position));
    }

    fn teardown(&self) {
        let subscriptions = {
            let mut state = self.state.borrow_mut();
            if state.phase == ControllerPhase::TornDown {
                return;
            }
            state.phase = ControllerPhase::TornDown;
            std::mem::take(&mut state.subscriptions)
        };
        self.detach(subscriptions);
        let revoked = self.revoke_pending();
        tracing::debug!(target: "scrollkeep.controller", revoked, "scroll restoration torn down");
    }

    /// Cancel every pending delayed restore. Returns how many were revoked.
    fn revoke_pending(&self) -> usize {
        let pending = std::mem::take(&mut self.state.borrow_mut().pending);
        for id in &pending {
            self.host.timers.cancel(*id);
        }
        pending.len()
    }

    fn record(
        &self,
        signal: LifecycleSignal,
        key: Option<NavigationKey>,
        outcome: RestorationOutcome,
    ) {
        tracing::debug!(
            target: "scrollkeep.controller",
            signal = signal.label(),
            key = key.as_ref().map(NavigationKey::as_str).unwrap_or(""),
            outcome = outcome.label(),
            "lifecycle signal dispatched"
        );
        let mut state = self.state.borrow_mut();
        if state.log.len() >= MAX_LOG_ENTRIES {
            state.log.pop_front();
        }
        state.log.push_back(RestorationLogEntry { signal, key, outcome });
    }
}
