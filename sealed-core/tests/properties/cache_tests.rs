//! Property-based tests for the item cache partitions

use std::collections::HashSet;

use proptest::prelude::*;
use sealed_core::cache::ItemCache;
use sealed_core::{ItemId, ItemPayload, VaultItem};

fn item(id: u8, trashed: bool) -> VaultItem {
    VaultItem {
        id: ItemId::new(format!("id-{id}")),
        name: format!("Item {id}"),
        favorite: false,
        created: None,
        updated: None,
        notes: None,
        trashed,
        payload: ItemPayload::SecureNote,
    }
}

/// Strategy for generating a listing with possibly repeated ids
fn arb_listing() -> impl Strategy<Value = Vec<(u8, bool)>> {
    prop::collection::vec((0u8..20, any::<bool>()), 0..40)
}

fn ids(items: &[VaultItem]) -> Vec<ItemId> {
    items.iter().map(|i| i.id.clone()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: after a reload every id is in exactly one partition, and
    /// each partition only holds items with the matching trashed flag
    #[test]
    fn prop_partitions_are_disjoint(listing in arb_listing()) {
        let mut cache = ItemCache::new();
        cache.replace(listing.iter().map(|(id, trashed)| item(*id, *trashed)));

        let active = cache.list(false);
        let trashed = cache.list_trash();
        prop_assert!(active.iter().all(|i| !i.trashed));
        prop_assert!(trashed.iter().all(|i| i.trashed));

        let all = cache.list(true);
        let unique: HashSet<_> = ids(&all).into_iter().collect();
        prop_assert_eq!(unique.len(), all.len());

        let expected: HashSet<_> = listing.iter().map(|(id, _)| ItemId::new(format!("id-{id}"))).collect();
        prop_assert_eq!(unique, expected);
    }

    /// Property: including trashed items appends the trash after the active items
    #[test]
    fn prop_full_listing_is_active_then_trash(listing in arb_listing()) {
        let mut cache = ItemCache::new();
        cache.replace(listing.iter().map(|(id, trashed)| item(*id, *trashed)));

        let mut expected = ids(&cache.list(false));
        expected.extend(ids(&cache.list_trash()));
        prop_assert_eq!(ids(&cache.list(true)), expected);
    }

    /// Property: moving an item between partitions twice leaves the same state
    #[test]
    fn prop_repeated_move_is_idempotent(listing in arb_listing(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!listing.is_empty());
        let mut cache = ItemCache::new();
        cache.replace(listing.iter().map(|(id, trashed)| item(*id, *trashed)));

        let all = cache.list(true);
        let mut target = pick.get(&all).clone();
        target.trashed = !target.trashed;

        cache.upsert(target.clone());
        let once = (ids(&cache.list(false)), ids(&cache.list_trash()));
        cache.upsert(target.clone());
        let twice = (ids(&cache.list(false)), ids(&cache.list_trash()));

        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(cache.trashed_state(&target.id), Some(target.trashed));
        prop_assert_eq!(once.0.len() + once.1.len(), all.len());
    }

    /// Property: removed items are gone from both partitions
    #[test]
    fn prop_remove_clears_both_partitions(listing in arb_listing(), id in 0u8..20) {
        let mut cache = ItemCache::new();
        cache.replace(listing.iter().map(|(id, trashed)| item(*id, *trashed)));
        let id = ItemId::new(format!("id-{id}"));

        cache.remove(&id);
        prop_assert!(cache.get(&id).is_none());
        prop_assert!(cache.list(true).iter().all(|i| i.id != id));
    }
}
