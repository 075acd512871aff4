#![forbid(unsafe_code)]

//! Property tests for the scroll-position store.
//!
//! 1. Any non-negative offset saved under a key restores exactly
//! 2. The last save for a key wins
//! 3. Restore-then-delete leaves no entry behind
//! 4. Arbitrary stored text never panics and restores a sanitized position

use std::rc::Rc;

use proptest::prelude::*;
use scrollkeep_core::testing::{FakeScrollSurface, MemoryStorage};
use scrollkeep_core::{NavigationKey, ScrollPosition, ScrollPositionStore, SessionStorage};

fn fixture() -> (Rc<MemoryStorage>, Rc<FakeScrollSurface>, ScrollPositionStore) {
    let storage = Rc::new(MemoryStorage::new());
    let surface = Rc::new(FakeScrollSurface::new());
    let store = ScrollPositionStore::new(storage.clone(), surface.clone());
    (storage, surface, store)
}

fn offset_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        (0u32..100_000).prop_map(f64::from),
        0.0f64..1.0e9,
    ]
}

fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,12}"
}

proptest! {
    #[test]
    fn saved_offset_restores_exactly(
        key in key_strategy(),
        x in offset_strategy(),
        y in offset_strategy(),
    ) {
        let (_storage, surface, store) = fixture();
        let key = NavigationKey::new(key);
        surface.set_viewport(ScrollPosition::new(x, y));
        store.save(&key, None);

        surface.set_viewport(ScrollPosition::ORIGIN);
        let (_, restored) = store.restore(&key, None);
        prop_assert_eq!(restored, ScrollPosition::new(x, y));
        prop_assert_eq!(surface.viewport(), ScrollPosition::new(x, y));
    }

    #[test]
    fn last_save_wins(key in key_strategy(), ys in prop::collection::vec(offset_strategy(), 1..8)) {
        let (storage, surface, store) = fixture();
        let key = NavigationKey::new(key);
        for y in &ys {
            surface.set_viewport(ScrollPosition::new(0.0, *y));
            store.save(&key, None);
        }
        prop_assert_eq!(storage.len(), 1);
        let last = ys.last().copied().unwrap_or_default();
        prop_assert_eq!(store.load(&key), Some(ScrollPosition::new(0.0, last)));
    }

    #[test]
    fn restore_then_delete_forgets(
        keys in prop::collection::btree_set(key_strategy(), 1..6),
        y in offset_strategy(),
    ) {
        let (storage, surface, store) = fixture();
        let keys: Vec<NavigationKey> = keys.into_iter().map(NavigationKey::new).collect();
        surface.set_viewport(ScrollPosition::new(0.0, y));
        for key in &keys {
            store.save(key, None);
        }
        for key in &keys {
            store.restore(key, None);
            store.delete(key);
            prop_assert_eq!(store.load(key), None);
        }
        prop_assert!(storage.is_empty());
    }

    #[test]
    fn arbitrary_entries_restore_sanitized(raw in ".{0,64}") {
        let (storage, surface, store) = fixture();
        let key = NavigationKey::new("fuzzed");
        storage.set_item(&key.storage_key(), &raw).unwrap();

        let (_, position) = store.restore(&key, None);
        prop_assert!(position.x.is_finite() && position.x >= 0.0);
        prop_assert!(position.y.is_finite() && position.y >= 0.0);
        prop_assert_eq!(surface.viewport(), position);
    }
}
