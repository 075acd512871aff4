#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use scrollkeep_core::testing::TestHost;
use scrollkeep_core::{
    ControllerPhase, RestorationConfig, RestorationOptions, ScrollPosition, use_scroll_restoration,
};

#[derive(Debug, Arbitrary)]
enum Op {
    Start,
    Complete(Option<u8>),
    Discard,
    Scroll(u16, u16),
    Advance(u8),
    Activate,
    Teardown,
}

#[derive(Debug, Arbitrary)]
struct Input {
    initial_key: Option<u8>,
    enabled: bool,
    with_selector: bool,
    delay_ms: Option<u8>,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    if input.ops.len() > 256 {
        return;
    }
    let host = TestHost::new();
    host.router
        .set_active_key(input.initial_key.map(|k| k.to_string()).as_deref());
    if input.with_selector {
        host.scroll.add_element("#main", ScrollPosition::ORIGIN);
    }

    let mut config = if input.enabled {
        RestorationConfig::default()
    } else {
        RestorationConfig::disabled()
    };
    if input.with_selector {
        config = config.with_selector("#main");
    }
    if let Some(delay) = input.delay_ms {
        config = config.with_delay_ms(u64::from(delay));
    }
    let controller = use_scroll_restoration(&host.bindings(), RestorationOptions::new(config));

    for op in input.ops {
        match op {
            Op::Start => host.router.start_navigation(),
            Op::Complete(key) => host
                .router
                .complete_navigation(key.map(|k| k.to_string()).as_deref()),
            Op::Discard => host.lifecycle.discard(),
            Op::Scroll(x, y) => host
                .scroll
                .set_viewport(ScrollPosition::new(f64::from(x), f64::from(y))),
            Op::Advance(ms) => {
                host.timers.advance(Duration::from_millis(u64::from(ms)));
            }
            Op::Activate => {
                controller.activate();
            }
            Op::Teardown => controller.teardown(),
        }

        // Never more than one listener set attached.
        assert!(host.router.listener_count() <= 2);
        assert!(host.lifecycle.listener_count() <= 1);
        if controller.phase() != ControllerPhase::Tracking {
            assert_eq!(host.router.listener_count(), 0);
        }
        if !input.enabled {
            assert!(host.storage.is_empty());
            assert!(host.scroll.calls().is_empty());
        }
    }

    drop(controller);
    assert_eq!(host.timers.pending_count(), 0);
});
