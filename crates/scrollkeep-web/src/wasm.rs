#![forbid(unsafe_code)]

//! `wasm-bindgen` exports and `web-sys` capability implementations.
//!
//! Only compiled on `wasm32` targets.

use core::time::Duration;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::{Function, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Storage, Window};

use scrollkeep_core::{
    HostBindings, HostRouter, Listener, ListenerId, NavigationKey, PageLifecycle,
    RestorationOptions, RouterSignal, ScrollPosition, ScrollSurface, SessionStorage, SignalHub,
    StorageError, TimerId, TimerScheduler, TimerTask, use_scroll_restoration,
};

use crate::{RouterEventNames, WebSettings, log_to_jsonl, navigation_key_from_raw, parse_options};

/// Report panics on the browser console, then defer to the previous hook.
/// Installed once per module instance, on the first mount.
fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            web_sys::console::error_1(&JsValue::from_str(&format!("scrollkeep: {info}")));
            previous(info);
        }));
    });
}

fn js_error_name(err: &JsValue) -> Option<String> {
    Reflect::get(err, &"name".into()).ok()?.as_string()
}

fn method(obj: &JsValue, name: &str) -> Result<Function, JsValue> {
    Reflect::get(obj, &JsValue::from_str(name))?
        .dyn_into::<Function>()
        .map_err(|_| JsValue::from_str(&format!("{name} must be a function")))
}

fn key_from_js(value: &JsValue) -> Option<NavigationKey> {
    let raw = value
        .as_string()
        .or_else(|| value.as_f64().map(|n| n.to_string()));
    navigation_key_from_raw(raw)
}

/// `window.sessionStorage`, or nothing when the browser denies access.
struct WebSessionStorage {
    storage: Option<Storage>,
}

impl WebSessionStorage {
    fn new(window: &Window) -> Self {
        let storage = match window.session_storage() {
            Ok(storage) => storage,
            Err(err) => {
                tracing::warn!(
                    target: "scrollkeep.web",
                    error = ?err,
                    "sessionStorage access denied"
                );
                None
            }
        };
        Self { storage }
    }

    fn storage(&self) -> Result<&Storage, StorageError> {
        self.storage.as_ref().ok_or(StorageError::Unavailable)
    }
}

fn storage_error(err: &JsValue) -> StorageError {
    match js_error_name(err).as_deref() {
        Some("QuotaExceededError") => StorageError::QuotaExceeded,
        Some("SecurityError") => StorageError::Unavailable,
        Some(name) => StorageError::Host(name.to_owned()),
        None => StorageError::Host(format!("{err:?}")),
    }
}

impl SessionStorage for WebSessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage()?.get_item(key).map_err(|err| storage_error(&err))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage()?
            .set_item(key, value)
            .map_err(|err| storage_error(&err))
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.storage()?.remove_item(key).map_err(|err| storage_error(&err))
    }
}

/// Window viewport plus `document.querySelector` containers.
struct WebScrollSurface {
    window: Window,
}

impl WebScrollSurface {
    fn element(&self, selector: &str) -> Option<web_sys::Element> {
        let document = self.window.document()?;
        match document.query_selector(selector) {
            Ok(element) => element,
            Err(err) => {
                tracing::debug!(
                    target: "scrollkeep.web",
                    selector,
                    error = ?err,
                    "invalid selector"
                );
                None
            }
        }
    }
}

impl ScrollSurface for WebScrollSurface {
    fn element_offset(&self, selector: &str) -> Option<ScrollPosition> {
        let element = self.element(selector)?;
        let axis = |name: &str| {
            Reflect::get(&element, &JsValue::from_str(name))
                .ok()
                .and_then(|value| value.as_f64())
                .unwrap_or(0.0)
        };
        Some(ScrollPosition::new(axis("scrollLeft"), axis("scrollTop")))
    }

    fn viewport_offset(&self) -> ScrollPosition {
        ScrollPosition::new(
            self.window.scroll_x().unwrap_or(0.0),
            self.window.scroll_y().unwrap_or(0.0),
        )
    }

    fn scroll_element_to(&self, selector: &str, position: ScrollPosition) -> bool {
        let Some(element) = self.element(selector) else {
            return false;
        };
        element.scroll_to_with_x_and_y(position.x, position.y);
        true
    }

    fn scroll_viewport_to(&self, position: ScrollPosition) {
        self.window.scroll_to_with_x_and_y(position.x, position.y);
    }
}

/// `setTimeout`-backed scheduler.
///
/// Cancelling removes the task from the table; the browser timer still fires
/// and finds nothing to run.
struct WebTimers {
    window: Window,
    next_id: Cell<u64>,
    tasks: Rc<RefCell<HashMap<u64, TimerTask>>>,
}

impl WebTimers {
    fn new(window: Window) -> Self {
        Self {
            window,
            next_id: Cell::new(0),
            tasks: Rc::new(RefCell::new(HashMap::new())),
        }
    }
}

impl TimerScheduler for WebTimers {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerId {
        let id = self.next_id.get().wrapping_add(1);
        self.next_id.set(id);
        self.tasks.borrow_mut().insert(id, task);

        let tasks = Rc::clone(&self.tasks);
        let callback = Closure::once_into_js(move || {
            let task = tasks.borrow_mut().remove(&id);
            if let Some(task) = task {
                task();
            }
        });
        let timeout = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        let callback = callback.unchecked_ref::<Function>();
        if let Err(err) = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback, timeout)
        {
            tracing::warn!(
                target: "scrollkeep.web",
                error = ?err,
                "setTimeout failed, delayed restore dropped"
            );
            let dropped = self.tasks.borrow_mut().remove(&id);
            drop(dropped);
        }
        TimerId::new(id)
    }

    fn cancel(&self, id: TimerId) {
        let removed = self.tasks.borrow_mut().remove(&id.get());
        drop(removed);
    }
}

/// Adapter over a JS router object with `events.on`/`events.off`.
///
/// One JS closure is registered per event name for the adapter's lifetime;
/// controller listeners attach to the Rust-side hub it emits into.
struct JsHostRouter {
    window: Window,
    router: JsValue,
    events: JsValue,
    hub: Rc<SignalHub<RouterSignal>>,
    attached: Vec<(String, Closure<dyn Fn()>)>,
}

impl JsHostRouter {
    fn attach(router: JsValue, names: &RouterEventNames, window: Window) -> Result<Self, JsValue> {
        let events = Reflect::get(&router, &"events".into())?;
        let on = method(&events, "on")?;
        method(&events, "off")?;

        let mut adapter = Self {
            window,
            router,
            events,
            hub: Rc::new(SignalHub::new()),
            attached: Vec::with_capacity(2),
        };
        for (signal, name) in [
            (RouterSignal::NavigationStart, names.start.as_str()),
            (RouterSignal::NavigationComplete, names.complete.as_str()),
        ] {
            let hub = Rc::clone(&adapter.hub);
            let closure = Closure::<dyn Fn()>::new(move || hub.emit(signal));
            // Drop detaches every entry in `attached`, including this one if
            // registration fails.
            adapter.attached.push((name.to_owned(), closure));
            if let Some((_, closure)) = adapter.attached.last() {
                on.call2(&adapter.events, &JsValue::from_str(name), closure.as_ref())?;
            }
        }
        Ok(adapter)
    }
}

impl HostRouter for JsHostRouter {
    fn active_key(&self) -> Option<NavigationKey> {
        if let Ok(active_key) = method(&self.router, "activeKey") {
            return key_from_js(&active_key.call0(&self.router).ok()?);
        }
        let state = self.window.history().ok()?.state().ok()?;
        if state.is_null() || state.is_undefined() {
            return None;
        }
        key_from_js(&Reflect::get(&state, &"key".into()).ok()?)
    }

    fn subscribe(&self, signal: RouterSignal, listener: Listener) -> ListenerId {
        self.hub.subscribe(signal, listener)
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.hub.unsubscribe(id);
    }
}

impl Drop for JsHostRouter {
    fn drop(&mut self) {
        let Ok(off) = method(&self.events, "off") else {
            return;
        };
        for (name, closure) in &self.attached {
            if let Err(err) = off.call2(&self.events, &JsValue::from_str(name), closure.as_ref()) {
                tracing::warn!(
                    target: "scrollkeep.web",
                    event = %name,
                    error = ?err,
                    "router listener detach failed"
                );
            }
        }
    }
}

/// `beforeunload` on the window.
struct WindowLifecycle {
    window: Window,
    hub: Rc<SignalHub>,
    closure: Closure<dyn Fn()>,
}

impl WindowLifecycle {
    const EVENT: &'static str = "beforeunload";

    fn attach(window: Window) -> Result<Self, JsValue> {
        let hub: Rc<SignalHub> = Rc::new(SignalHub::new());
        let emitter = Rc::clone(&hub);
        let closure = Closure::<dyn Fn()>::new(move || emitter.emit(()));
        window.add_event_listener_with_callback(Self::EVENT, closure.as_ref().unchecked_ref())?;
        Ok(Self { window, hub, closure })
    }
}

impl PageLifecycle for WindowLifecycle {
    fn subscribe_before_discard(&self, listener: Listener) -> ListenerId {
        self.hub.subscribe((), listener)
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.hub.unsubscribe(id);
    }
}

impl Drop for WindowLifecycle {
    fn drop(&mut self) {
        let callback = self.closure.as_ref().unchecked_ref::<Function>();
        let _ = self.window.remove_event_listener_with_callback(Self::EVENT, callback);
    }
}

fn decode_options(options: &JsValue) -> Result<WebSettings, JsValue> {
    if options.is_null() || options.is_undefined() {
        return parse_options("{}").map_err(|err| JsValue::from_str(&err.to_string()));
    }
    let json: String = js_sys::JSON::stringify(options)?.into();
    parse_options(&json).map_err(|err| JsValue::from_str(&err.to_string()))
}

/// Scroll restoration mounted on the current page.
///
/// Call `free()` (or `teardown()`) when the owning component unmounts.
#[wasm_bindgen]
pub struct ScrollRestoration {
    controller: scrollkeep_core::ScrollRestoration,
}

#[wasm_bindgen]
impl ScrollRestoration {
    /// Mount against `router` with an optional options object
    /// (`{ enabled, selector, delay, events: { start, complete } }`).
    #[wasm_bindgen(constructor)]
    pub fn new(router: JsValue, options: JsValue) -> Result<ScrollRestoration, JsValue> {
        install_panic_hook();
        let settings = decode_options(&options)?;
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("window is unavailable"))?;

        let host = HostBindings {
            router: Rc::new(JsHostRouter::attach(router, &settings.events, window.clone())?),
            lifecycle: Rc::new(WindowLifecycle::attach(window.clone())?),
            scroll: Rc::new(WebScrollSurface {
                window: window.clone(),
            }),
            storage: Rc::new(WebSessionStorage::new(&window)),
            timers: Rc::new(WebTimers::new(window)),
        };
        let controller = use_scroll_restoration(&host, RestorationOptions::new(settings.config));
        tracing::debug!(target: "scrollkeep.web", phase = controller.phase().label(), "mounted");
        Ok(Self { controller })
    }

    /// Retry reading the active key; returns the phase label.
    pub fn activate(&self) -> String {
        self.controller.activate().label().to_owned()
    }

    /// `idle`, `tracking`, `disabled` or `torn_down`.
    pub fn phase(&self) -> String {
        self.controller.phase().label().to_owned()
    }

    #[wasm_bindgen(js_name = currentKey)]
    pub fn current_key(&self) -> Option<String> {
        self.controller.current_key().map(|key| key.as_str().to_owned())
    }

    /// Drain the dispatch log as JSON lines.
    #[wasm_bindgen(js_name = takeLogJsonl)]
    pub fn take_log_jsonl(&self) -> String {
        log_to_jsonl(&self.controller.take_log())
    }

    /// Detach listeners and revoke pending restorations. Idempotent.
    pub fn teardown(&self) {
        self.controller.teardown();
    }
}
