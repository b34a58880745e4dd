//! KvFifo: public queue API over a copy-on-write `Store`.

use crate::cow::CowCell;
use crate::error::Error;
use crate::slot_list::{self, Slot};
use crate::store::{Bucket, Store};
use core::borrow::Borrow;
use core::fmt;
use core::iter::FusedIterator;
use std::collections::btree_map;

/// FIFO queue of key-value entries with an ordered index over keys.
///
/// Cloning is O(1): copies share storage until one of them is written to,
/// at which point the written copy forks into private storage.
///
/// ```
/// use kv_fifo::KvFifo;
///
/// let mut q = KvFifo::new();
/// q.push(1, "a").unwrap();
/// q.push(2, "b").unwrap();
/// q.push(1, "c").unwrap();
///
/// let snapshot = q.clone();
/// q.move_to_back(&2).unwrap();
///
/// assert_eq!(q.iter().map(|(_, v)| *v).collect::<Vec<_>>(), ["a", "c", "b"]);
/// assert_eq!(snapshot.iter().map(|(_, v)| *v).collect::<Vec<_>>(), ["a", "b", "c"]);
/// assert_eq!(q.last(&1).unwrap(), (&1, &"c"));
/// ```
pub struct KvFifo<K, V> {
    cell: CowCell<K, V>,
}

impl<K, V> KvFifo<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Queue whose storage holds `capacity` entries before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cell: CowCell::new(Store::with_capacity(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.cell.get().len()
    }
    pub fn is_empty(&self) -> bool {
        self.cell.get().is_empty()
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.cell.get().key_count()
    }

    /// The entry at the head of the queue.
    pub fn front(&self) -> Result<(&K, &V), Error> {
        let store = self.cell.get();
        store
            .front()
            .and_then(|slot| store.get(slot))
            .ok_or(Error::EmptyQueue)
    }

    /// The entry at the tail of the queue.
    pub fn back(&self) -> Result<(&K, &V), Error> {
        let store = self.cell.get();
        store
            .back()
            .and_then(|slot| store.get(slot))
            .ok_or(Error::EmptyQueue)
    }

    /// Remove every entry. Shared storage is left to the other copies.
    pub fn clear(&mut self) {
        self.cell.reset();
    }

    /// Distinct keys in ascending order.
    pub fn keys(&self) -> Keys<'_, K> {
        Keys {
            inner: self.cell.get().keys(),
        }
    }

    /// Entries in FIFO order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.cell.get().iter(),
        }
    }

    /// Whether another copy currently aliases this queue's storage.
    pub fn is_shared(&self) -> bool {
        self.cell.is_shared()
    }

    /// Whether `self` and `other` currently alias the same storage.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        self.cell.ptr_eq(&other.cell)
    }
}

impl<K: Ord, V> KvFifo<K, V> {
    /// Number of entries carrying `key`.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.cell.get().count(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.cell.get().contains_key(key)
    }

    /// The earliest entry carrying `key`.
    pub fn first<Q>(&self, key: &Q) -> Result<(&K, &V), Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let store = self.cell.get();
        store
            .first(key)
            .and_then(|slot| store.get(slot))
            .ok_or(Error::KeyNotFound)
    }

    /// The latest entry carrying `key`.
    pub fn last<Q>(&self, key: &Q) -> Result<(&K, &V), Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let store = self.cell.get();
        store
            .last(key)
            .and_then(|slot| store.get(slot))
            .ok_or(Error::KeyNotFound)
    }
}

impl<K, V> KvFifo<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    /// Append `(key, value)` at the back.
    pub fn push(&mut self, key: K, value: V) -> Result<(), Error> {
        self.cell.transact(|s| s.push(key, value)).map(drop)
    }

    /// Remove and return the front entry.
    pub fn pop(&mut self) -> Result<(K, V), Error> {
        if self.is_empty() {
            return Err(Error::EmptyQueue);
        }
        self.cell
            .transact(|s| s.pop_front().ok_or(Error::EmptyQueue))
    }

    /// Remove and return the earliest entry carrying `key`.
    pub fn pop_key<Q>(&mut self, key: &Q) -> Result<(K, V), Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        if !self.contains_key(key) {
            return Err(Error::KeyNotFound);
        }
        self.cell
            .transact(|s| s.pop_key(key).ok_or(Error::KeyNotFound))
    }

    /// Move every entry carrying `key` to the back, keeping their relative
    /// order and the relative order of all other entries.
    pub fn move_to_back<Q>(&mut self, key: &Q) -> Result<(), Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        if !self.contains_key(key) {
            return Err(Error::KeyNotFound);
        }
        self.cell
            .transact(|s| s.move_to_back(key).ok_or(Error::KeyNotFound))
            .map(drop)
    }

    /// Like [`front`](Self::front), with the value open for modification.
    pub fn front_mut(&mut self) -> Result<(&K, &mut V), Error> {
        self.locate_mut(Error::EmptyQueue, Store::front)
    }

    /// Like [`back`](Self::back), with the value open for modification.
    pub fn back_mut(&mut self) -> Result<(&K, &mut V), Error> {
        self.locate_mut(Error::EmptyQueue, Store::back)
    }

    /// Like [`first`](Self::first), with the value open for modification.
    pub fn first_mut<Q>(&mut self, key: &Q) -> Result<(&K, &mut V), Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.locate_mut(Error::KeyNotFound, |s| s.first(key))
    }

    /// Like [`last`](Self::last), with the value open for modification.
    pub fn last_mut<Q>(&mut self, key: &Q) -> Result<(&K, &mut V), Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.locate_mut(Error::KeyNotFound, |s| s.last(key))
    }

    // `locate` runs once against the current storage so a miss never forks,
    // then again inside `expose` against the private storage.
    fn locate_mut<F>(&mut self, missing: Error, locate: F) -> Result<(&K, &mut V), Error>
    where
        F: Fn(&Store<K, V>) -> Option<Slot>,
    {
        if locate(self.cell.get()).is_none() {
            return Err(missing);
        }
        match self.cell.expose(locate) {
            Some((store, slot)) => store.get_mut(slot).ok_or(missing),
            None => Err(missing),
        }
    }
}

impl<K, V> Default for KvFifo<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for KvFifo<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for KvFifo<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for KvFifo<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.shares_storage_with(other)
            || (self.len() == other.len() && self.iter().eq(other.iter()))
    }
}

impl<K: Eq, V: Eq> Eq for KvFifo<K, V> {}

impl<K, V> Extend<(K, V)> for KvFifo<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    /// Panics if storage cannot grow, like the std collections.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            if let Err(e) = self.push(k, v) {
                panic!("kv_fifo: extend failed: {e}");
            }
        }
    }
}

impl<K, V> FromIterator<(K, V)> for KvFifo<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut q = KvFifo::new();
        q.extend(iter);
        q
    }
}

impl<'a, K, V> IntoIterator for &'a KvFifo<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the distinct keys of a [`KvFifo`], in ascending order.
///
/// Reads the queue's key index directly; cloning restarts from the current
/// position.
pub struct Keys<'a, K> {
    inner: btree_map::Keys<'a, K, Bucket>,
}

impl<'a, K> Iterator for Keys<'a, K> {
    type Item = &'a K;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K> DoubleEndedIterator for Keys<'a, K> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<'a, K> ExactSizeIterator for Keys<'a, K> {}
impl<'a, K> FusedIterator for Keys<'a, K> {}

impl<'a, K> Clone for Keys<'a, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Iterator over the entries of a [`KvFifo`] in FIFO order.
pub struct Iter<'a, K, V> {
    inner: slot_list::Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_slot, k, v)| (k, v))
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_slot, k, v)| (k, v))
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}
impl<'a, K, V> FusedIterator for Iter<'a, K, V> {}

impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
