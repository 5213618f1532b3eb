// Copyright 2025 SieveDB Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Installed SIMD kernels agree with the portable reference bit-for-bit
//!
//! Every (op, type) cell over lengths that straddle vector widths and tail
//! handling, with random inputs.

use rand::prelude::*;
use sievedb::simd::{self, reference, SimdElement};
use sievedb::CompareOp;

const LENGTHS: &[usize] = &[0, 1, 7, 8, 63, 64, 65, 4096];

const OPS: &[CompareOp] = &[
    CompareOp::Eq,
    CompareOp::Ne,
    CompareOp::Lt,
    CompareOp::Le,
    CompareOp::Gt,
    CompareOp::Ge,
];

fn reference_compare<T: PartialOrd + Copy>(op: CompareOp, src: &[T], val: T, out: &mut [bool]) {
    match op {
        CompareOp::Eq => reference::compare_eq(src, val, out),
        CompareOp::Ne => reference::compare_ne(src, val, out),
        CompareOp::Lt => reference::compare_lt(src, val, out),
        CompareOp::Le => reference::compare_le(src, val, out),
        CompareOp::Gt => reference::compare_gt(src, val, out),
        CompareOp::Ge => reference::compare_ge(src, val, out),
        CompareOp::PrefixMatch => unreachable!(),
    }
}

// narrow value range so equality hits occur often
macro_rules! check_int_type {
    ($t:ty, $rng:expr) => {
        for &len in LENGTHS {
            let src: Vec<$t> = (0..len).map(|_| $rng.random_range(-20..=20) as $t).collect();
            let val: $t = $rng.random_range(-20..=20) as $t;
            for &op in OPS {
                let mut fast = vec![false; len];
                let mut slow = vec![false; len];
                <$t>::compare_val(op, &src, val, &mut fast);
                reference_compare(op, &src, val, &mut slow);
                assert_eq!(
                    fast, slow,
                    "{} {} over {} elements diverged",
                    stringify!($t), op, len
                );
            }
            let probe: $t = $rng.random_range(-20..=20) as $t;
            assert_eq!(
                <$t>::find_term(&src, probe),
                reference::find_term(&src, probe),
                "{} find_term over {} elements diverged",
                stringify!($t),
                len
            );
        }
    };
}

macro_rules! check_float_type {
    ($t:ty, $rng:expr) => {
        for &len in LENGTHS {
            let mut src: Vec<$t> = (0..len)
                .map(|_| ($rng.random_range(-40..=40) as $t) / 4.0)
                .collect();
            // salt with specials where there is room
            if len >= 8 {
                src[1] = <$t>::NAN;
                src[3] = <$t>::INFINITY;
                src[5] = -0.0;
            }
            let val: $t = ($rng.random_range(-40..=40) as $t) / 4.0;
            for &op in OPS {
                let mut fast = vec![false; len];
                let mut slow = vec![false; len];
                <$t>::compare_val(op, &src, val, &mut fast);
                reference_compare(op, &src, val, &mut slow);
                assert_eq!(
                    fast, slow,
                    "{} {} over {} elements diverged",
                    stringify!($t), op, len
                );
            }
            assert_eq!(
                <$t>::find_term(&src, val),
                reference::find_term(&src, val),
                "{} find_term over {} elements diverged",
                stringify!($t),
                len
            );
        }
    };
}

#[test]
fn test_compare_cells_match_reference() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    check_int_type!(i8, rng);
    check_int_type!(i16, rng);
    check_int_type!(i32, rng);
    check_int_type!(i64, rng);
    check_float_type!(f32, rng);
    check_float_type!(f64, rng);
}

#[test]
fn test_bool_cells_match_reference() {
    let mut rng = StdRng::seed_from_u64(0xb001);
    for &len in LENGTHS {
        let src: Vec<bool> = (0..len).map(|_| rng.random_bool(0.5)).collect();
        for &op in OPS {
            for val in [false, true] {
                let mut fast = vec![false; len];
                let mut slow = vec![false; len];
                bool::compare_val(op, &src, val, &mut fast);
                reference_compare(op, &src, val, &mut slow);
                assert_eq!(fast, slow, "bool {} over {} elements diverged", op, len);
            }
        }
        assert_eq!(
            bool::find_term(&src, true),
            reference::find_term(&src, true)
        );
    }
}

#[test]
fn test_bitset_block_matches_reference() {
    let mut rng = StdRng::seed_from_u64(0xb17);
    for _ in 0..64 {
        let src: Vec<bool> = (0..64).map(|_| rng.random_bool(0.5)).collect();
        assert_eq!(simd::bitset_block(&src), reference::bitset_block(&src));
    }

    // degenerate blocks
    assert_eq!(simd::bitset_block(&[false; 64]), 0);
    assert_eq!(simd::bitset_block(&[true; 64]), u64::MAX);
    let mut one = [false; 64];
    one[0] = true;
    assert_eq!(simd::bitset_block(&one), 1);
    let mut top = [false; 64];
    top[63] = true;
    assert_eq!(simd::bitset_block(&top), 1 << 63);
}

#[test]
fn test_boundary_literals() {
    // extreme literals exercise the compare saturation paths
    let src: Vec<i64> = vec![i64::MIN, -1, 0, 1, i64::MAX];
    for &op in OPS {
        for val in [i64::MIN, -1, 0, 1, i64::MAX] {
            let mut fast = vec![false; src.len()];
            let mut slow = vec![false; src.len()];
            i64::compare_val(op, &src, val, &mut fast);
            reference_compare(op, &src, val, &mut slow);
            assert_eq!(fast, slow, "i64 {} with literal {}", op, val);
        }
    }
}
