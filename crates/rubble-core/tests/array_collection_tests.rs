// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Length invariants of the structure-of-arrays container.

use proptest::prelude::*;
use proptest::test_runner::{Config as PropConfig, RngAlgorithm, TestRng, TestRunner};
use rubble_core::ArrayCollection;

const SEED_BYTES: [u8; 32] = [
    0x41, 0x72, 0x72, 0x61, 0x79, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0,
];

fn pinned_runner() -> TestRunner {
    let rng = TestRng::from_seed(RngAlgorithm::ChaCha, &SEED_BYTES);
    TestRunner::new_with_rng(PropConfig::default(), rng)
}

#[derive(Debug, Clone)]
enum Op {
    Add(usize),
    Resize(usize),
    Register,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0_usize..8).prop_map(Op::Add),
        (0_usize..16).prop_map(Op::Resize),
        Just(Op::Register),
    ]
}

#[test]
fn every_array_tracks_collection_size() {
    let mut runner = pinned_runner();
    runner
        .run(&prop::collection::vec(op(), 1..40), |ops| {
            let mut c = ArrayCollection::new();
            let first = c.add_array_with(-1_i32);
            for op in ops {
                match op {
                    Op::Add(n) => {
                        let before = c.size();
                        prop_assert_eq!(c.add_elements(n), before);
                        prop_assert_eq!(c.size(), before + n);
                    }
                    Op::Resize(n) => {
                        c.resize(n);
                        prop_assert_eq!(c.size(), n);
                    }
                    Op::Register => {
                        let _ = c.add_array::<Option<usize>>();
                    }
                }
                let size = c.size();
                prop_assert!(c.array_lens().iter().all(|&len| len == size));
                prop_assert!(c.array(first).iter().all(|&v| v == -1));
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn elements_keep_their_slot_across_growth() {
    let mut c = ArrayCollection::new();
    let names = c.add_array::<String>();
    c.add_elements(2);
    c.array_mut(names)[1] = "kept".to_owned();
    c.add_elements(5);
    assert_eq!(c.array(names)[1], "kept");
    assert_eq!(c.array(names)[6], "");
    assert_eq!(c.num_arrays(), 1);
}

#[test]
fn fill_value_is_reported() {
    let mut c = ArrayCollection::new();
    let strain = c.add_array_with(f32::MAX);
    assert_eq!(*c.array(strain).fill(), f32::MAX);
    c.add_elements(1);
    assert_eq!(c.array(strain)[0], f32::MAX);
}
