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

//! Portable reference kernels
//!
//! Always present; higher ISA tiers override individual dispatch-table cells
//! and fall back here for the cells they do not implement. Every tiered
//! kernel must agree with these loops bit-for-bit.

/// `out[i] = src[i] == val`
pub fn compare_eq<T: PartialEq + Copy>(src: &[T], val: T, out: &mut [bool]) {
    for (o, &s) in out.iter_mut().zip(src.iter()) {
        *o = s == val;
    }
}

/// `out[i] = src[i] != val`
pub fn compare_ne<T: PartialEq + Copy>(src: &[T], val: T, out: &mut [bool]) {
    for (o, &s) in out.iter_mut().zip(src.iter()) {
        *o = s != val;
    }
}

/// `out[i] = src[i] < val`
pub fn compare_lt<T: PartialOrd + Copy>(src: &[T], val: T, out: &mut [bool]) {
    for (o, &s) in out.iter_mut().zip(src.iter()) {
        *o = s < val;
    }
}

/// `out[i] = src[i] <= val`
pub fn compare_le<T: PartialOrd + Copy>(src: &[T], val: T, out: &mut [bool]) {
    for (o, &s) in out.iter_mut().zip(src.iter()) {
        *o = s <= val;
    }
}

/// `out[i] = src[i] > val`
pub fn compare_gt<T: PartialOrd + Copy>(src: &[T], val: T, out: &mut [bool]) {
    for (o, &s) in out.iter_mut().zip(src.iter()) {
        *o = s > val;
    }
}

/// `out[i] = src[i] >= val`
pub fn compare_ge<T: PartialOrd + Copy>(src: &[T], val: T, out: &mut [bool]) {
    for (o, &s) in out.iter_mut().zip(src.iter()) {
        *o = s >= val;
    }
}

/// Whether `val` appears anywhere in `src`
pub fn find_term<T: PartialEq + Copy>(src: &[T], val: T) -> bool {
    src.iter().any(|&s| s == val)
}

/// Pack the first 64 booleans of `src` into one block, bit `i` = `src[i]`
pub fn bitset_block(src: &[bool]) -> u64 {
    debug_assert!(src.len() >= 64);
    let mut block = 0u64;
    for (i, &b) in src[..64].iter().enumerate() {
        block |= (b as u64) << i;
    }
    block
}
