//! Store: the (sequence, key index) pair that a queue shares between copies.
//!
//! The index maps each key to the slots carrying it, in sequence order. Every
//! method orders its work so that user code (`K: Ord`, `K: Clone`) and fallible
//! reservations run before the first structural write; a failure or panic
//! therefore never leaves sequence and index out of step.

use crate::error::Error;
use crate::slot_list::{self, Slot, SlotList};
use core::borrow::Borrow;
use std::collections::btree_map::{self, BTreeMap};
use std::collections::VecDeque;

/// Slots sharing one key, in sequence order.
pub(crate) type Bucket = VecDeque<Slot>;

pub struct Store<K, V> {
    seq: SlotList<K, V>,
    index: BTreeMap<K, Bucket>,
}

impl<K, V> Default for Store<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Store<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seq: SlotList::with_capacity(capacity),
            index: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn front(&self) -> Option<Slot> {
        self.seq.front()
    }
    pub fn back(&self) -> Option<Slot> {
        self.seq.back()
    }

    pub fn get(&self, slot: Slot) -> Option<(&K, &V)> {
        self.seq.get(slot)
    }
    pub fn get_mut(&mut self, slot: Slot) -> Option<(&K, &mut V)> {
        self.seq.get_mut(slot)
    }

    pub fn iter(&self) -> slot_list::Iter<'_, K, V> {
        self.seq.iter()
    }

    pub(crate) fn keys(&self) -> btree_map::Keys<'_, K, Bucket> {
        self.index.keys()
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.index.len()
    }

    pub fn clear(&mut self) {
        self.seq.clear();
        self.index.clear();
    }
}

impl<K: Ord, V> Store<K, V> {
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.index.get(key).map_or(0, VecDeque::len)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.index.contains_key(key)
    }

    /// Earliest slot carrying `key`.
    pub fn first<Q>(&self, key: &Q) -> Option<Slot>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.index.get(key).and_then(|b| b.front().copied())
    }

    /// Latest slot carrying `key`.
    pub fn last<Q>(&self, key: &Q) -> Option<Slot>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.index.get(key).and_then(|b| b.back().copied())
    }

    /// Append `(key, value)` at the back and index it under `key`.
    pub fn push(&mut self, key: K, value: V) -> Result<Slot, Error>
    where
        K: Clone,
    {
        let index_key = key.clone();
        match self.index.entry(index_key) {
            btree_map::Entry::Occupied(mut o) => {
                o.get_mut().try_reserve(1)?;
                let slot = self.seq.push_back(key, value);
                o.get_mut().push_back(slot);
                Ok(slot)
            }
            btree_map::Entry::Vacant(v) => {
                let mut bucket = Bucket::new();
                bucket.try_reserve(1)?;
                let slot = self.seq.push_back(key, value);
                bucket.push_back(slot);
                v.insert(bucket);
                Ok(slot)
            }
        }
    }

    /// Remove the front entry.
    pub fn pop_front(&mut self) -> Option<(K, V)> {
        let slot = self.seq.front()?;
        self.unindex_head(slot);
        self.seq.remove(slot)
    }

    /// Remove the earliest entry carrying `key`.
    pub fn pop_key<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let slot = self.first(key)?;
        self.unindex_head(slot);
        self.seq.remove(slot)
    }

    /// Relink every entry carrying `key` at the back, keeping their order.
    /// Returns how many entries moved, or `None` if `key` is absent.
    pub fn move_to_back<Q>(&mut self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let bucket = self.index.get(key)?;
        for &slot in bucket {
            let moved = self.seq.move_to_back(slot);
            debug_assert!(moved, "indexed slot must be live");
        }
        Some(bucket.len())
    }

    /// Deep copy into fresh storage. The index is rebuilt from the copied
    /// sequence in one pass, so the fork never refers to slots of `self`.
    pub fn fork(&self) -> Self
    where
        K: Clone,
        V: Clone,
    {
        let mut next = Store::with_capacity(self.len());
        for (_slot, k, v) in self.seq.iter() {
            let slot = next.seq.push_back(k.clone(), v.clone());
            match next.index.get_mut(k) {
                Some(bucket) => bucket.push_back(slot),
                None => {
                    next.index.insert(k.clone(), Bucket::from([slot]));
                }
            }
        }
        next
    }

    // `slot` must head its key's bucket. Both index lookups happen before the
    // bucket or the map is changed.
    fn unindex_head(&mut self, slot: Slot) {
        let Some(key) = self.seq.key(slot) else {
            return;
        };
        let drained = match self.index.get_mut(key) {
            Some(bucket) if bucket.len() > 1 => {
                debug_assert_eq!(bucket.front(), Some(&slot));
                bucket.pop_front();
                false
            }
            Some(_) => true,
            None => false,
        };
        if drained {
            self.index.remove(key);
        }
    }

    /// Panics unless every bucket lists exactly the slots of its key, in
    /// sequence order, and no bucket is empty.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut expected: BTreeMap<&K, Vec<Slot>> = BTreeMap::new();
        for (slot, k, _v) in self.seq.iter() {
            expected.entry(k).or_default().push(slot);
        }
        assert_eq!(self.seq.iter().count(), self.seq.len());
        assert_eq!(expected.len(), self.index.len(), "distinct key count");
        for ((ek, slots), (ik, bucket)) in expected.iter().zip(self.index.iter()) {
            assert!(*ek == ik, "index keys follow sequence keys");
            assert!(!bucket.is_empty(), "empty bucket left in index");
            assert!(slots.iter().eq(bucket.iter()), "bucket order");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(s: &Store<u32, &'static str>) -> Vec<(u32, &'static str)> {
        s.iter().map(|(_slot, k, v)| (*k, *v)).collect()
    }

    /// Invariant: Pushing indexes each entry under its key in sequence order.
    #[test]
    fn push_indexes_by_key() {
        let mut s = Store::new();
        let a = s.push(1, "a").unwrap();
        s.push(2, "b").unwrap();
        let c = s.push(1, "c").unwrap();

        assert_eq!(s.len(), 3);
        assert_eq!(s.key_count(), 2);
        assert_eq!(s.count(&1), 2);
        assert_eq!(s.count(&2), 1);
        assert_eq!(s.count(&3), 0);
        assert_eq!(s.first(&1), Some(a));
        assert_eq!(s.last(&1), Some(c));
        assert!(s.first(&3).is_none());
        s.assert_consistent();
    }

    /// Invariant: `pop_front` drops the head from its bucket and removes the
    /// bucket once it is empty.
    #[test]
    fn pop_front_drops_empty_buckets() {
        let mut s = Store::new();
        s.push(1, "a").unwrap();
        s.push(2, "b").unwrap();
        s.push(1, "c").unwrap();

        assert_eq!(s.pop_front(), Some((1, "a")));
        assert_eq!(s.count(&1), 1);
        s.assert_consistent();
        assert_eq!(s.pop_front(), Some((2, "b")));
        assert!(!s.contains_key(&2));
        s.assert_consistent();
        assert_eq!(s.pop_front(), Some((1, "c")));
        assert_eq!(s.pop_front(), None);
        assert_eq!(s.key_count(), 0);
    }

    /// Invariant: `pop_key` removes the earliest entry for that key only,
    /// wherever it sits in the sequence.
    #[test]
    fn pop_key_removes_earliest_match() {
        let mut s = Store::new();
        s.push(1, "a").unwrap();
        s.push(2, "b").unwrap();
        s.push(3, "c").unwrap();
        s.push(2, "d").unwrap();

        assert_eq!(s.pop_key(&2), Some((2, "b")));
        assert_eq!(entries(&s), [(1, "a"), (3, "c"), (2, "d")]);
        assert_eq!(s.pop_key(&9), None);
        s.assert_consistent();
    }

    /// Invariant: `move_to_back` keeps the moved entries' mutual order and the
    /// order of everything else.
    #[test]
    fn move_to_back_keeps_relative_order() {
        let mut s = Store::new();
        for (k, v) in [(1, "a"), (2, "b"), (1, "c"), (3, "d"), (2, "e"), (1, "f")] {
            s.push(k, v).unwrap();
        }
        assert_eq!(s.move_to_back(&1), Some(3));
        assert_eq!(
            entries(&s),
            [(2, "b"), (3, "d"), (2, "e"), (1, "a"), (1, "c"), (1, "f")]
        );
        assert_eq!(s.move_to_back(&7), None);
        s.assert_consistent();

        // The head of the moved bucket becomes reachable via pop_front last.
        assert_eq!(s.pop_key(&1), Some((1, "a")));
        s.assert_consistent();
    }

    /// Invariant: Buckets never hold slots of removed entries, so every slot
    /// `move_to_back` relinks is live, also after removals and in a fork.
    #[test]
    fn move_to_back_only_sees_live_slots() {
        let mut s = Store::new();
        for (k, v) in [(1, "a"), (2, "b"), (1, "c"), (1, "d"), (2, "e")] {
            s.push(k, v).unwrap();
        }
        assert_eq!(s.pop_front(), Some((1, "a")));
        assert_eq!(s.pop_key(&2), Some((2, "b")));
        assert_eq!(s.move_to_back(&1), Some(2));
        assert_eq!(entries(&s), [(2, "e"), (1, "c"), (1, "d")]);

        let mut forked = s.fork();
        assert_eq!(forked.move_to_back(&2), Some(1));
        assert_eq!(entries(&forked), [(1, "c"), (1, "d"), (2, "e")]);
        forked.assert_consistent();
        s.assert_consistent();
    }

    /// Invariant: A fork has equal contents, a consistent index built over
    /// its own slots, and is independent from the original.
    #[test]
    fn fork_rebuilds_index() {
        let mut s = Store::new();
        for (k, v) in [(2, "a"), (1, "b"), (2, "c")] {
            s.push(k, v).unwrap();
        }
        s.pop_key(&1).unwrap();
        s.push(1, "d").unwrap();

        let mut f = s.fork();
        f.assert_consistent();
        assert_eq!(entries(&f), entries(&s));
        assert_eq!(f.count(&2), 2);

        f.pop_front().unwrap();
        f.push(3, "e").unwrap();
        assert_eq!(entries(&s), [(2, "a"), (2, "c"), (1, "d")]);
        assert_eq!(entries(&f), [(2, "c"), (1, "d"), (3, "e")]);
        s.assert_consistent();
        f.assert_consistent();
    }

    /// Invariant: Borrowed lookup works (store `String`, query with `&str`).
    #[test]
    fn borrowed_lookup_with_str() {
        let mut s: Store<String, i32> = Store::new();
        s.push("hello".to_string(), 1).unwrap();
        assert!(s.contains_key("hello"));
        assert_eq!(s.count("hello"), 1);
        assert!(s.first("world").is_none());
        assert_eq!(s.pop_key("hello"), Some(("hello".to_string(), 1)));
    }

    /// Invariant: A key whose `Clone` panics leaves the store untouched.
    #[test]
    fn panicking_key_clone_leaves_store_unchanged() {
        #[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
        struct Fragile(u32);
        impl Clone for Fragile {
            fn clone(&self) -> Self {
                if self.0 == 13 {
                    panic!("unlucky key");
                }
                Fragile(self.0)
            }
        }

        let mut s = Store::new();
        s.push(Fragile(1), 10).unwrap();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = s.push(Fragile(13), 20);
        }));
        assert!(res.is_err());
        assert_eq!(s.len(), 1);
        assert!(!s.contains_key(&Fragile(13)));
        s.assert_consistent();
    }
}
