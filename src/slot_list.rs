//! SlotList: structural layer holding entries in FIFO order behind stable slots.

use slotmap::{DefaultKey, SlotMap};

/// Stable handle to one entry of a [`SlotList`]. Relinking an entry keeps
/// its slot; removing it invalidates the slot for good (generational keys).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Slot(DefaultKey);

impl Slot {
    pub(crate) fn new(k: DefaultKey) -> Self {
        Slot(k)
    }
    pub(crate) fn raw_handle(&self) -> DefaultKey {
        self.0
    }
}

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

/// Doubly linked list threaded through a slotmap arena.
pub struct SlotList<K, V> {
    nodes: SlotMap<DefaultKey, Node<K, V>>,
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

impl<K, V> Default for SlotList<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over entries in FIFO order.
pub struct Iter<'a, K, V> {
    nodes: &'a SlotMap<DefaultKey, Node<K, V>>,
    front: Option<DefaultKey>,
    back: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Slot, &'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let k = self.front?;
        let node = self.nodes.get(k)?;
        self.front = node.next;
        self.remaining -= 1;
        Some((Slot::new(k), &node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let k = self.back?;
        let node = self.nodes.get(k)?;
        self.back = node.prev;
        self.remaining -= 1;
        Some((Slot::new(k), &node.key, &node.value))
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}

impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<K, V> SlotList<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: SlotMap::with_capacity_and_key(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn front(&self) -> Option<Slot> {
        self.head.map(Slot::new)
    }
    pub fn back(&self) -> Option<Slot> {
        self.tail.map(Slot::new)
    }

    pub fn key(&self, slot: Slot) -> Option<&K> {
        self.nodes.get(slot.raw_handle()).map(|n| &n.key)
    }

    pub fn get(&self, slot: Slot) -> Option<(&K, &V)> {
        self.nodes
            .get(slot.raw_handle())
            .map(|n| (&n.key, &n.value))
    }

    /// Key stays shared, only the value is handed out mutably.
    pub fn get_mut(&mut self, slot: Slot) -> Option<(&K, &mut V)> {
        self.nodes
            .get_mut(slot.raw_handle())
            .map(|n| (&n.key, &mut n.value))
    }

    pub fn push_back(&mut self, key: K, value: V) -> Slot {
        let k = self.nodes.insert(Node {
            key,
            value,
            prev: None,
            next: None,
        });
        self.link_back(k);
        Slot::new(k)
    }

    pub fn remove(&mut self, slot: Slot) -> Option<(K, V)> {
        let k = slot.raw_handle();
        if !self.nodes.contains_key(k) {
            return None;
        }
        self.unlink(k);
        let node = self.nodes.remove(k)?;
        Some((node.key, node.value))
    }

    /// Relinks `slot` at the tail. Returns false for a stale slot.
    pub fn move_to_back(&mut self, slot: Slot) -> bool {
        let k = slot.raw_handle();
        if !self.nodes.contains_key(k) {
            return false;
        }
        if self.tail != Some(k) {
            self.unlink(k);
            self.link_back(k);
        }
        true
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head = None;
        self.tail = None;
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: &self.nodes,
            front: self.head,
            back: self.tail,
            remaining: self.nodes.len(),
        }
    }

    // Callers guarantee `k` is live and currently unlinked.
    fn link_back(&mut self, k: DefaultKey) {
        let old_tail = self.tail;
        if let Some(node) = self.nodes.get_mut(k) {
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail.and_then(|t| self.nodes.get_mut(t)) {
            Some(t) => t.next = Some(k),
            None => self.head = Some(k),
        }
        self.tail = Some(k);
    }

    fn unlink(&mut self, k: DefaultKey) {
        let (prev, next) = match self.nodes.get_mut(k) {
            Some(node) => (node.prev.take(), node.next.take()),
            None => return,
        };
        match prev.and_then(|p| self.nodes.get_mut(p)) {
            Some(p) => p.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.nodes.get_mut(n)) {
            Some(n) => n.prev = prev,
            None => self.tail = prev,
        }
    }
}
