#![cfg(test)]

// Property tests for Store kept inside the crate so they do not require
// feature gates to access internal modules.

use crate::store::Store;
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Push(u8, i32),
    PopFront,
    PopKey(u8),
    MoveToBack(u8),
    MutateFirst(u8, i32),
    MutateLast(u8, i32),
    Fork,
    Clear,
}

// Small key space so buckets hold several entries and keys come and go.
fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let key = 0u8..6;
    let op = prop_oneof![
        4 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::Push(k, v)),
        2 => Just(Op::PopFront),
        2 => key.clone().prop_map(Op::PopKey),
        2 => key.clone().prop_map(Op::MoveToBack),
        1 => (key.clone(), any::<i32>()).prop_map(|(k, d)| Op::MutateFirst(k, d)),
        1 => (key.clone(), any::<i32>()).prop_map(|(k, d)| Op::MutateLast(k, d)),
        1 => Just(Op::Fork),
        1 => Just(Op::Clear),
    ];
    proptest::collection::vec(op, 1..80)
}

fn snapshot(s: &Store<u8, i32>) -> Vec<(u8, i32)> {
    s.iter().map(|(_slot, k, v)| (*k, *v)).collect()
}

// Property: State-machine equivalence against a plain Vec of entries.
// Invariants exercised across random operation sequences:
// - FIFO contents equal the model after every operation.
// - `count`/`first`/`last` agree with a front-to-back scan of the model.
// - Buckets list exactly their key's slots in sequence order; no empty buckets.
// - A fork is indistinguishable from its source and independent of it.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(ops in arb_ops()) {
        let mut sut: Store<u8, i32> = Store::new();
        let mut model: Vec<(u8, i32)> = Vec::new();

        for op in ops {
            match op {
                Op::Push(k, v) => {
                    sut.push(k, v).expect("push succeeds");
                    model.push((k, v));
                }
                Op::PopFront => {
                    let expected = if model.is_empty() { None } else { Some(model.remove(0)) };
                    prop_assert_eq!(sut.pop_front(), expected);
                }
                Op::PopKey(k) => {
                    let at = model.iter().position(|e| e.0 == k);
                    let expected = at.map(|i| model.remove(i));
                    prop_assert_eq!(sut.pop_key(&k), expected);
                }
                Op::MoveToBack(k) => {
                    let (moved, mut rest): (Vec<_>, Vec<_>) = model.iter().copied().partition(|e| e.0 == k);
                    let expected = if moved.is_empty() { None } else { Some(moved.len()) };
                    rest.extend(moved);
                    model = rest;
                    prop_assert_eq!(sut.move_to_back(&k), expected);
                }
                Op::MutateFirst(k, d) => {
                    if let Some(slot) = sut.first(&k) {
                        let (_, v) = sut.get_mut(slot).expect("indexed slot resolves");
                        *v = v.wrapping_add(d);
                        let e = model.iter_mut().find(|e| e.0 == k).expect("model has key");
                        e.1 = e.1.wrapping_add(d);
                    } else {
                        prop_assert!(model.iter().all(|e| e.0 != k));
                    }
                }
                Op::MutateLast(k, d) => {
                    if let Some(slot) = sut.last(&k) {
                        let (_, v) = sut.get_mut(slot).expect("indexed slot resolves");
                        *v = v.wrapping_add(d);
                        let e = model.iter_mut().rev().find(|e| e.0 == k).expect("model has key");
                        e.1 = e.1.wrapping_add(d);
                    } else {
                        prop_assert!(model.iter().all(|e| e.0 != k));
                    }
                }
                Op::Fork => {
                    let mut forked = sut.fork();
                    prop_assert_eq!(snapshot(&forked), snapshot(&sut));
                    // Writes to the old version must not leak into the fork.
                    sut.clear();
                    prop_assert_eq!(snapshot(&forked), model.clone());
                    forked.assert_consistent();
                    sut = forked;
                }
                Op::Clear => {
                    sut.clear();
                    model.clear();
                }
            }

            sut.assert_consistent();
            prop_assert_eq!(snapshot(&sut), model.clone());
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
            for k in 0u8..6 {
                let count = model.iter().filter(|e| e.0 == k).count();
                prop_assert_eq!(sut.count(&k), count);
                let first = sut.first(&k).and_then(|s| sut.get(s)).map(|(k, v)| (*k, *v));
                let last = sut.last(&k).and_then(|s| sut.get(s)).map(|(k, v)| (*k, *v));
                prop_assert_eq!(first, model.iter().find(|e| e.0 == k).copied());
                prop_assert_eq!(last, model.iter().rev().find(|e| e.0 == k).copied());
            }
            prop_assert_eq!(
                sut.front().and_then(|s| sut.get(s)).map(|(k, v)| (*k, *v)),
                model.first().copied()
            );
            prop_assert_eq!(
                sut.back().and_then(|s| sut.get(s)).map(|(k, v)| (*k, *v)),
                model.last().copied()
            );
        }
    }
}
