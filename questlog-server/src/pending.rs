//! Pending offers awaiting a follow-up request
//!
//! Generated quests and evaluated skill proposals live here between the
//! request that produced them and the one that accepts or commits them.
//! Bounded LRU: under pressure the oldest offers are forgotten, which the
//! client sees as an expired offer.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Entry<T> {
    owner: Uuid,
    value: T,
}

#[derive(Debug)]
pub struct PendingStore<T> {
    entries: Mutex<LruCache<Uuid, Entry<T>>>,
}

impl<T: Clone> PendingStore<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Store `value` for `owner`, returning the new offer id
    pub fn insert(&self, owner: Uuid, value: T) -> Uuid {
        let id = Uuid::new_v4();
        self.entries.lock().put(id, Entry { owner, value });
        id
    }

    /// Copy of an offer, if it exists and belongs to `owner`
    pub fn get(&self, owner: Uuid, id: Uuid) -> Option<T> {
        let mut entries = self.entries.lock();
        match entries.get(&id) {
            Some(entry) if entry.owner == owner => Some(entry.value.clone()),
            _ => None,
        }
    }

    /// Remove and return an offer owned by `owner`. Other users' offers are
    /// left in place.
    pub fn take(&self, owner: Uuid, id: Uuid) -> Option<T> {
        let mut entries = self.entries.lock();
        match entries.peek(&id) {
            Some(entry) if entry.owner == owner => entries.pop(&id).map(|e| e.value),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_once() {
        let store = PendingStore::new(8);
        let user = Uuid::new_v4();
        let id = store.insert(user, "quest");
        assert_eq!(store.get(user, id), Some("quest"));
        assert_eq!(store.take(user, id), Some("quest"));
        assert_eq!(store.take(user, id), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_other_owner_cannot_take() {
        let store = PendingStore::new(8);
        let owner = Uuid::new_v4();
        let id = store.insert(owner, 7u32);
        assert_eq!(store.take(Uuid::new_v4(), id), None);
        assert_eq!(store.get(Uuid::new_v4(), id), None);
        assert_eq!(store.take(owner, id), Some(7));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let store = PendingStore::new(2);
        let user = Uuid::new_v4();
        let first = store.insert(user, 1);
        let _second = store.insert(user, 2);
        let _third = store.insert(user, 3);
        assert_eq!(store.len(), 2);
        assert_eq!(store.take(user, first), None);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let store = PendingStore::new(0);
        let user = Uuid::new_v4();
        let id = store.insert(user, ());
        assert_eq!(store.get(user, id), Some(()));
    }
}
