//! Normalized Entity Store
//!
//! Id-indexed storage plus an ordered id list. Backed by an `IndexMap`, so the
//! key set and the order list can never drift apart: `ids()` is exactly the
//! key set, without duplicates, in insertion order.

use indexmap::IndexMap;

use crate::entity::Entity;

/// Keyed collection with a stable display order
#[derive(Debug, Clone)]
pub struct NormalizedStore<T: Entity> {
    by_id: IndexMap<T::Id, T>,
}

impl<T: Entity> Default for NormalizedStore<T> {
    fn default() -> Self {
        Self {
            by_id: IndexMap::new(),
        }
    }
}

impl<T: Entity> NormalizedStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a fetched list; later duplicates replace earlier
    /// values but keep the first position
    pub fn from_entities(entities: impl IntoIterator<Item = T>) -> Self {
        let mut store = Self::new();
        store.add_all(entities);
        store
    }

    // ========================
    // Mutations
    // ========================

    /// Upsert: replace the value in place if the id is known, else append
    pub fn add(&mut self, entity: T) {
        // IndexMap::insert keeps the existing slot for a known key
        self.by_id.insert(entity.id(), entity);
    }

    pub fn add_all(&mut self, entities: impl IntoIterator<Item = T>) {
        for entity in entities {
            self.add(entity);
        }
    }

    /// Replace a known entity; an unknown id is left alone and `false` returned
    pub fn update(&mut self, entity: T) -> bool {
        match self.by_id.get_mut(&entity.id()) {
            Some(slot) => {
                *slot = entity;
                true
            }
            None => false,
        }
    }

    /// Apply `f` to a known entity in place
    pub fn modify(&mut self, id: &T::Id, f: impl FnOnce(&mut T)) -> bool {
        match self.by_id.get_mut(id) {
            Some(slot) => {
                f(slot);
                true
            }
            None => false,
        }
    }

    /// Remove by id, preserving the order of the remaining ids
    pub fn remove(&mut self, id: &T::Id) -> Option<T> {
        self.by_id.shift_remove(id)
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
    }

    // ========================
    // Selectors
    // ========================

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.by_id.get(id)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.by_id.contains_key(id)
    }

    /// Ordered id list
    pub fn ids(&self) -> Vec<T::Id> {
        self.by_id.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.by_id.values()
    }

    /// Entities in id-list order; does not touch the store
    pub fn denormalize(&self) -> Vec<T> {
        self.by_id.values().cloned().collect()
    }

    /// Resolve a list of ids, `None` if any of them is unknown
    pub fn resolve(&self, ids: &[T::Id]) -> Option<Vec<T>> {
        ids.iter().map(|id| self.by_id.get(id).cloned()).collect()
    }

    /// Every id resolves and every key appears once
    pub fn check_invariants(&self) -> bool {
        let ids = self.ids();
        ids.len() == self.by_id.len()
            && ids
                .iter()
                .enumerate()
                .all(|(pos, id)| self.by_id.get_index_of(id) == Some(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;
    use proptest::prelude::*;

    fn task(id: u32, title: &str) -> Task {
        Task::new(id, title, 1, 0)
    }

    #[test]
    fn test_add_appends_new_ids() {
        let mut store = NormalizedStore::new();
        store.add(task(3, "c"));
        store.add(task(1, "a"));
        store.add(task(2, "b"));

        assert_eq!(store.ids(), vec![3, 1, 2]);
        assert_eq!(store.get(&1).unwrap().title, "a");
    }

    #[test]
    fn test_add_existing_replaces_in_place() {
        let mut store = NormalizedStore::from_entities(vec![task(1, "a"), task(2, "b")]);
        store.add(task(1, "a2"));

        assert_eq!(store.ids(), vec![1, 2]);
        assert_eq!(store.get(&1).unwrap().title, "a2");
    }

    #[test]
    fn test_update_absent_is_noop() {
        let mut store = NormalizedStore::from_entities(vec![task(1, "a")]);
        assert!(!store.update(task(9, "ghost")));

        assert_eq!(store.len(), 1);
        assert!(!store.contains(&9));
    }

    #[test]
    fn test_update_keeps_position() {
        let mut store = NormalizedStore::from_entities(vec![task(1, "a"), task(2, "b"), task(3, "c")]);
        assert!(store.update(task(2, "B")));

        let titles: Vec<_> = store.denormalize().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["a", "B", "c"]);
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut store = NormalizedStore::from_entities(vec![task(1, "a"), task(2, "b"), task(3, "c")]);
        assert!(store.remove(&2).is_some());
        assert!(store.remove(&2).is_none());

        assert_eq!(store.ids(), vec![1, 3]);
        assert!(store.check_invariants());
    }

    #[test]
    fn test_denormalize_is_repeatable() {
        let store = NormalizedStore::from_entities(vec![task(1, "a"), task(2, "b")]);
        assert_eq!(store.denormalize(), store.denormalize());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_resolve_requires_every_id() {
        let store = NormalizedStore::from_entities(vec![task(1, "a"), task(2, "b")]);
        assert_eq!(store.resolve(&[2, 1]).map(|v| v.len()), Some(2));
        assert!(store.resolve(&[2, 7]).is_none());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u32),
        Update(u32),
        Remove(u32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u32..20).prop_map(Op::Add),
            (0u32..20).prop_map(Op::Update),
            (0u32..20).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn prop_invariants_hold_after_any_sequence(ops in prop::collection::vec(op(), 0..60)) {
            let mut store = NormalizedStore::new();
            for op in ops {
                match op {
                    Op::Add(id) => store.add(task(id, "x")),
                    Op::Update(id) => { store.update(task(id, "y")); }
                    Op::Remove(id) => { store.remove(&id); }
                }
                prop_assert!(store.check_invariants());
            }
        }

        #[test]
        fn prop_add_appends_only_new_ids(seed in prop::collection::vec(0u32..30, 0..20), id in 0u32..30) {
            let mut store = NormalizedStore::from_entities(seed.iter().map(|&i| task(i, "s")));
            let before = store.ids();
            let entity = task(id, "new");
            store.add(entity.clone());

            prop_assert_eq!(store.get(&id), Some(&entity));
            prop_assert_eq!(store.ids().iter().filter(|&&i| i == id).count(), 1);
            if before.contains(&id) {
                prop_assert_eq!(store.ids(), before);
            } else {
                let mut expected = before.clone();
                expected.push(id);
                prop_assert_eq!(store.ids(), expected);
            }
        }

        #[test]
        fn prop_update_absent_leaves_store_unchanged(seed in prop::collection::vec(0u32..10, 0..10)) {
            let mut store = NormalizedStore::from_entities(seed.iter().map(|&i| task(i, "s")));
            let before = store.denormalize();
            store.update(task(99, "ghost"));
            prop_assert_eq!(store.denormalize(), before);
        }
    }
}
