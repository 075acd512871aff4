#![cfg(target_arch = "wasm32")]
#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::{Function, Object, Reflect};
use scrollkeep_web::ScrollRestoration;
use wasm_bindgen::prelude::*;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

/// Minimal router object: `events.on/off` plus `activeKey()`.
struct JsRouterFixture {
    router: JsValue,
    listeners: Rc<RefCell<HashMap<String, Function>>>,
    active: Rc<RefCell<String>>,
}

impl JsRouterFixture {
    fn new(active_key: &str) -> Self {
        let listeners: Rc<RefCell<HashMap<String, Function>>> = Rc::default();
        let active = Rc::new(RefCell::new(active_key.to_owned()));

        let on = {
            let listeners = Rc::clone(&listeners);
            Closure::<dyn Fn(String, Function)>::new(move |name: String, f: Function| {
                listeners.borrow_mut().insert(name, f);
            })
        };
        let off = {
            let listeners = Rc::clone(&listeners);
            Closure::<dyn Fn(String, Function)>::new(move |name: String, _f: Function| {
                listeners.borrow_mut().remove(&name);
            })
        };
        let active_key_fn = {
            let active = Rc::clone(&active);
            Closure::<dyn Fn() -> JsValue>::new(move || JsValue::from_str(&active.borrow()))
        };

        let events = Object::new();
        Reflect::set(&events, &"on".into(), on.as_ref()).unwrap();
        Reflect::set(&events, &"off".into(), off.as_ref()).unwrap();
        let router = Object::new();
        Reflect::set(&router, &"events".into(), &events).unwrap();
        Reflect::set(&router, &"activeKey".into(), active_key_fn.as_ref()).unwrap();
        on.forget();
        off.forget();
        active_key_fn.forget();

        Self {
            router: router.into(),
            listeners,
            active,
        }
    }

    fn fire(&self, name: &str) {
        let listener = self.listeners.borrow().get(name).cloned();
        if let Some(listener) = listener {
            listener.call0(&JsValue::NULL).unwrap();
        }
    }

    fn navigate(&self, key: &str) {
        self.fire("routeChangeStart");
        *self.active.borrow_mut() = key.to_owned();
        self.fire("routeChangeComplete");
    }
}

fn session_storage() -> web_sys::Storage {
    web_sys::window().unwrap().session_storage().unwrap().unwrap()
}

#[wasm_bindgen_test]
fn mounts_and_tracks_active_key() {
    let fixture = JsRouterFixture::new("smoke-a");
    let restoration = ScrollRestoration::new(fixture.router.clone(), JsValue::UNDEFINED).unwrap();
    assert_eq!(restoration.phase(), "tracking");
    assert_eq!(restoration.current_key().as_deref(), Some("smoke-a"));
    assert_eq!(fixture.listeners.borrow().len(), 2);

    fixture.navigate("smoke-b");
    assert_eq!(restoration.current_key().as_deref(), Some("smoke-b"));
    assert!(session_storage().get_item("scrollPos:smoke-a").unwrap().is_some());
    assert!(session_storage().get_item("scrollPos:smoke-b").unwrap().is_none());

    let log = restoration.take_log_jsonl();
    assert_eq!(log.lines().count(), 2);

    drop(restoration);
    assert!(fixture.listeners.borrow().is_empty());
    session_storage().remove_item("scrollPos:smoke-a").unwrap();
}

#[wasm_bindgen_test]
fn disabled_option_has_no_side_effects() {
    let fixture = JsRouterFixture::new("smoke-c");
    let options: JsValue = js_sys::JSON::parse(r#"{"enabled":false}"#).unwrap();
    let restoration = ScrollRestoration::new(fixture.router.clone(), options).unwrap();
    assert_eq!(restoration.phase(), "disabled");

    fixture.navigate("smoke-d");
    assert!(session_storage().get_item("scrollPos:smoke-c").unwrap().is_none());
    assert!(restoration.take_log_jsonl().is_empty());
}

#[wasm_bindgen_test]
fn router_without_events_is_rejected() {
    let router: JsValue = Object::new().into();
    assert!(ScrollRestoration::new(router, JsValue::UNDEFINED).is_err());
}

#[wasm_bindgen_test]
fn invalid_options_are_rejected() {
    let fixture = JsRouterFixture::new("smoke-e");
    let options: JsValue = js_sys::JSON::parse(r#"{"delay":-1}"#).unwrap();
    let err = ScrollRestoration::new(fixture.router.clone(), options).err().unwrap();
    assert!(err.as_string().unwrap_or_default().contains("delay"));
}
