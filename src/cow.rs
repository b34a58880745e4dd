//! CowCell: shared ownership of a `Store` with fork-on-write.
//!
//! A cell forks before a structural write, or before handing out a mutable
//! value reference, whenever its storage is aliased by another cell or a
//! mutable reference was handed out since the last fork. Writes run as a
//! transaction: if the write fails or unwinds, the cell goes back to the
//! storage it held before the call.

use crate::error::Error;
use crate::slot_list::Slot;
use crate::store::Store;
use scopeguard::ScopeGuard;
use std::rc::Rc;

pub(crate) struct CowCell<K, V> {
    store: Rc<Store<K, V>>,
    // A mutable value reference escaped since the last fork.
    refs_active: bool,
}

impl<K, V> CowCell<K, V> {
    pub(crate) fn new(store: Store<K, V>) -> Self {
        Self {
            store: Rc::new(store),
            refs_active: false,
        }
    }

    pub(crate) fn get(&self) -> &Store<K, V> {
        &self.store
    }

    pub(crate) fn is_shared(&self) -> bool {
        Rc::strong_count(&self.store) > 1
    }

    #[cfg(test)]
    pub(crate) fn refs_active(&self) -> bool {
        self.refs_active
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.store, &other.store)
    }

    fn needs_fork(&self) -> bool {
        self.is_shared() || self.refs_active
    }

    fn store_mut(&mut self) -> &mut Store<K, V> {
        Rc::get_mut(&mut self.store).expect("storage must be private after ensure_private")
    }

    fn rollback(&mut self, prior: Option<Rc<Store<K, V>>>, refs_active: bool) {
        if let Some(prior) = prior {
            log::trace!("kv_fifo: rolling back to pre-fork storage");
            self.store = prior;
        }
        self.refs_active = refs_active;
    }

    /// Empty the cell. Storage that would have to be forked is replaced by a
    /// fresh empty store instead of being copied and then cleared.
    pub(crate) fn reset(&mut self) {
        if self.needs_fork() {
            log::trace!(
                "kv_fifo: detaching {} entries on clear (shared: {}, refs exposed: {})",
                self.store.len(),
                self.is_shared(),
                self.refs_active
            );
            self.store = Rc::new(Store::new());
        } else {
            self.store_mut().clear();
        }
        self.refs_active = false;
    }
}

impl<K, V> CowCell<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    /// Fork into private storage if needed. Returns the storage held before
    /// the fork, if one happened.
    fn ensure_private(&mut self) -> Option<Rc<Store<K, V>>> {
        if !self.needs_fork() {
            return None;
        }
        log::trace!(
            "kv_fifo: forking {} entries (shared: {}, refs exposed: {})",
            self.store.len(),
            self.is_shared(),
            self.refs_active
        );
        let forked = Rc::new(self.store.fork());
        self.refs_active = false;
        Some(core::mem::replace(&mut self.store, forked))
    }

    /// Run a structural write on private storage. On error or unwind the
    /// cell is restored to the storage and flag it held before the call.
    pub(crate) fn transact<R, F>(&mut self, op: F) -> Result<R, Error>
    where
        F: FnOnce(&mut Store<K, V>) -> Result<R, Error>,
    {
        let refs_before = self.refs_active;
        let prior = self.ensure_private();
        let mut guard = scopeguard::guard(self, move |cell| cell.rollback(prior, refs_before));
        let out = op(guard.store_mut())?;
        let cell = ScopeGuard::into_inner(guard);
        cell.refs_active = false;
        Ok(out)
    }

    /// Private storage plus the slot `locate` picks in it, for handing out a
    /// mutable value reference. Slots do not survive a fork, so `locate` runs
    /// after it. If `locate` finds nothing or unwinds, the cell is restored
    /// to the storage and flag it held before the call.
    pub(crate) fn expose<F>(&mut self, locate: F) -> Option<(&mut Store<K, V>, Slot)>
    where
        F: FnOnce(&Store<K, V>) -> Option<Slot>,
    {
        let refs_before = self.refs_active;
        let prior = self.ensure_private();
        let guard = scopeguard::guard(self, move |cell| cell.rollback(prior, refs_before));
        let slot = locate(guard.get())?;
        let cell = ScopeGuard::into_inner(guard);
        cell.refs_active = true;
        Some((cell.store_mut(), slot))
    }
}

impl<K, V> Clone for CowCell<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    /// Alias the storage, unless a mutable reference into it escaped: then
    /// later writes through that reference must not show up in the copy, so
    /// the copy gets a deep fork of its own.
    fn clone(&self) -> Self {
        let store = if self.refs_active {
            log::trace!(
                "kv_fifo: copy forks {} entries with refs exposed",
                self.store.len()
            );
            Rc::new(self.store.fork())
        } else {
            Rc::clone(&self.store)
        };
        Self {
            store,
            refs_active: false,
        }
    }
}
