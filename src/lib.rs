//! kv-fifo: a single-threaded FIFO queue of key-value entries with an
//! ordered per-key index and copy-on-write value semantics.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: cheap copies that behave as fully independent queues, with
//!   O(log n) access to the entries sharing a key.
//! - Layers:
//!   - SlotList<K, V>: structural sequence. Entries live in a slotmap
//!     arena and are linked in FIFO order; stable `Slot` handles survive
//!     relinking.
//!   - Store<K, V>: pairs the sequence with a sorted index
//!     (`BTreeMap<K, VecDeque<Slot>>`) and owns every structural write.
//!   - CowCell<K, V>: shares a `Store` through `Rc`, forks it before
//!     writes, and rolls back to the pre-fork storage on failure.
//!   - KvFifo<K, V>: public API with `Keys` and `Iter`.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (the storage is behind `Rc`).
//!   Independent copies are the way to hand a queue to other code.
//! - Index buckets list exactly the slots carrying their key, in sequence
//!   order; a key disappears from the index with its last entry.
//! - A fork copies the sequence in order and rebuilds the index from the
//!   copy in one pass, so slots never cross between versions.
//!
//! When storage forks
//! - Before a structural write (`push`, `pop`, `pop_key`, `move_to_back`)
//!   or before handing out a mutable value reference (`front_mut`,
//!   `back_mut`, `first_mut`, `last_mut`), if the storage is aliased by
//!   another copy or a mutable value reference was handed out since the
//!   last fork.
//! - On `clone` only when the source handed out a mutable value reference
//!   since its last fork; otherwise the copy aliases the source and the
//!   first writer forks.
//! - Read-only operations never fork.
//!
//! Failure semantics
//! - Preconditions (`EmptyQueue`, `KeyNotFound`) are checked against the
//!   current storage before any fork, so failed calls leave aliasing as it
//!   was.
//! - Writes run as a transaction in `CowCell`: on error or unwind the cell
//!   returns to the pre-fork storage. Inside `Store`, user code (`K: Ord`,
//!   `K: Clone`) and fallible reservations run before the first structural
//!   write.
//! - `V: Clone` panics during a fork drop the partial copy; the original is
//!   untouched.
//!
//! Notes and non-goals
//! - References returned by accessors borrow the queue, so the borrow
//!   checker rules out using them across a later write or fork.
//! - Forks, copy-forks and rollbacks are reported through `log` at trace
//!   level.

mod cow;
mod error;
mod kv_fifo;
mod slot_list;
mod store;
mod store_proptest;

// Public surface
pub use error::Error;
pub use kv_fifo::{Iter, Keys, KvFifo};

// Internal layer, exposed for benchmarks only.
#[cfg(feature = "bench_internal")]
pub use slot_list::Slot;
#[cfg(feature = "bench_internal")]
pub use store::Store;
