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

//! 512-bit (AVX-512) kernel tier
//!
//! Requires F, BW, DQ and VL together (the 8/16-bit compares live in BW).
//! Compares produce lane masks directly, so results are written straight
//! from mask bits instead of a stored byte buffer.

#![allow(clippy::missing_safety_doc)]

use std::arch::x86_64::*;

use super::{CompareKernels, FindTermKernels, KernelTable};

macro_rules! avx512_cmp_int {
    ($fn_name:ident, $t:ty, $set1:ident, $load:ident, $cmp:ident,
     lanes = $lanes:expr, tail = $tail:expr) => {
        pub fn $fn_name(src: &[$t], val: $t, out: &mut [bool]) {
            #[target_feature(enable = "avx512f,avx512bw,avx512dq,avx512vl")]
            unsafe fn inner(src: &[$t], val: $t, out: &mut [bool]) {
                let n = src.len().min(out.len());
                let vv = $set1(val);
                let mut i = 0;
                while i + $lanes <= n {
                    let v = $load(src.as_ptr().add(i));
                    let mask = $cmp(v, vv) as u64;
                    for j in 0..$lanes {
                        out[i + j] = (mask >> j) & 1 == 1;
                    }
                    i += $lanes;
                }
                let tail: fn($t, $t) -> bool = $tail;
                while i < n {
                    out[i] = tail(src[i], val);
                    i += 1;
                }
            }
            unsafe { inner(src, val, out) }
        }
    };
}

macro_rules! avx512_cmp_float {
    ($fn_name:ident, $t:ty, $set1:ident, $load:ident, $cmp:ident, $imm:expr,
     lanes = $lanes:expr, tail = $tail:expr) => {
        pub fn $fn_name(src: &[$t], val: $t, out: &mut [bool]) {
            #[target_feature(enable = "avx512f,avx512bw,avx512dq,avx512vl")]
            unsafe fn inner(src: &[$t], val: $t, out: &mut [bool]) {
                let n = src.len().min(out.len());
                let vv = $set1(val);
                let mut i = 0;
                while i + $lanes <= n {
                    let v = $load(src.as_ptr().add(i));
                    let mask = $cmp::<{ $imm }>(v, vv) as u64;
                    for j in 0..$lanes {
                        out[i + j] = (mask >> j) & 1 == 1;
                    }
                    i += $lanes;
                }
                let tail: fn($t, $t) -> bool = $tail;
                while i < n {
                    out[i] = tail(src[i], val);
                    i += 1;
                }
            }
            unsafe { inner(src, val, out) }
        }
    };
}

macro_rules! avx512_find_term {
    ($fn_name:ident, $t:ty, $set1:ident, $load:ident, $cmpeq:ident, lanes = $lanes:expr) => {
        pub fn $fn_name(src: &[$t], val: $t) -> bool {
            #[target_feature(enable = "avx512f,avx512bw,avx512dq,avx512vl")]
            unsafe fn inner(src: &[$t], val: $t) -> bool {
                let n = src.len();
                let vv = $set1(val);
                let mut i = 0;
                while i + $lanes <= n {
                    let v = $load(src.as_ptr().add(i));
                    if $cmpeq(v, vv) != 0 {
                        return true;
                    }
                    i += $lanes;
                }
                src[i..n].iter().any(|&s| s == val)
            }
            unsafe { inner(src, val) }
        }
    };
}

avx512_cmp_int!(eq_i8, i8, _mm512_set1_epi8, _mm512_loadu_epi8, _mm512_cmpeq_epi8_mask,
    lanes = 64, tail = |s, v| s == v);
avx512_cmp_int!(ne_i8, i8, _mm512_set1_epi8, _mm512_loadu_epi8, _mm512_cmpneq_epi8_mask,
    lanes = 64, tail = |s, v| s != v);
avx512_cmp_int!(lt_i8, i8, _mm512_set1_epi8, _mm512_loadu_epi8, _mm512_cmplt_epi8_mask,
    lanes = 64, tail = |s, v| s < v);
avx512_cmp_int!(le_i8, i8, _mm512_set1_epi8, _mm512_loadu_epi8, _mm512_cmple_epi8_mask,
    lanes = 64, tail = |s, v| s <= v);
avx512_cmp_int!(gt_i8, i8, _mm512_set1_epi8, _mm512_loadu_epi8, _mm512_cmpgt_epi8_mask,
    lanes = 64, tail = |s, v| s > v);
avx512_cmp_int!(ge_i8, i8, _mm512_set1_epi8, _mm512_loadu_epi8, _mm512_cmpge_epi8_mask,
    lanes = 64, tail = |s, v| s >= v);

avx512_cmp_int!(eq_i16, i16, _mm512_set1_epi16, _mm512_loadu_epi16, _mm512_cmpeq_epi16_mask,
    lanes = 32, tail = |s, v| s == v);
avx512_cmp_int!(ne_i16, i16, _mm512_set1_epi16, _mm512_loadu_epi16, _mm512_cmpneq_epi16_mask,
    lanes = 32, tail = |s, v| s != v);
avx512_cmp_int!(lt_i16, i16, _mm512_set1_epi16, _mm512_loadu_epi16, _mm512_cmplt_epi16_mask,
    lanes = 32, tail = |s, v| s < v);
avx512_cmp_int!(le_i16, i16, _mm512_set1_epi16, _mm512_loadu_epi16, _mm512_cmple_epi16_mask,
    lanes = 32, tail = |s, v| s <= v);
avx512_cmp_int!(gt_i16, i16, _mm512_set1_epi16, _mm512_loadu_epi16, _mm512_cmpgt_epi16_mask,
    lanes = 32, tail = |s, v| s > v);
avx512_cmp_int!(ge_i16, i16, _mm512_set1_epi16, _mm512_loadu_epi16, _mm512_cmpge_epi16_mask,
    lanes = 32, tail = |s, v| s >= v);

avx512_cmp_int!(eq_i32, i32, _mm512_set1_epi32, _mm512_loadu_epi32, _mm512_cmpeq_epi32_mask,
    lanes = 16, tail = |s, v| s == v);
avx512_cmp_int!(ne_i32, i32, _mm512_set1_epi32, _mm512_loadu_epi32, _mm512_cmpneq_epi32_mask,
    lanes = 16, tail = |s, v| s != v);
avx512_cmp_int!(lt_i32, i32, _mm512_set1_epi32, _mm512_loadu_epi32, _mm512_cmplt_epi32_mask,
    lanes = 16, tail = |s, v| s < v);
avx512_cmp_int!(le_i32, i32, _mm512_set1_epi32, _mm512_loadu_epi32, _mm512_cmple_epi32_mask,
    lanes = 16, tail = |s, v| s <= v);
avx512_cmp_int!(gt_i32, i32, _mm512_set1_epi32, _mm512_loadu_epi32, _mm512_cmpgt_epi32_mask,
    lanes = 16, tail = |s, v| s > v);
avx512_cmp_int!(ge_i32, i32, _mm512_set1_epi32, _mm512_loadu_epi32, _mm512_cmpge_epi32_mask,
    lanes = 16, tail = |s, v| s >= v);

avx512_cmp_int!(eq_i64, i64, _mm512_set1_epi64, _mm512_loadu_epi64, _mm512_cmpeq_epi64_mask,
    lanes = 8, tail = |s, v| s == v);
avx512_cmp_int!(ne_i64, i64, _mm512_set1_epi64, _mm512_loadu_epi64, _mm512_cmpneq_epi64_mask,
    lanes = 8, tail = |s, v| s != v);
avx512_cmp_int!(lt_i64, i64, _mm512_set1_epi64, _mm512_loadu_epi64, _mm512_cmplt_epi64_mask,
    lanes = 8, tail = |s, v| s < v);
avx512_cmp_int!(le_i64, i64, _mm512_set1_epi64, _mm512_loadu_epi64, _mm512_cmple_epi64_mask,
    lanes = 8, tail = |s, v| s <= v);
avx512_cmp_int!(gt_i64, i64, _mm512_set1_epi64, _mm512_loadu_epi64, _mm512_cmpgt_epi64_mask,
    lanes = 8, tail = |s, v| s > v);
avx512_cmp_int!(ge_i64, i64, _mm512_set1_epi64, _mm512_loadu_epi64, _mm512_cmpge_epi64_mask,
    lanes = 8, tail = |s, v| s >= v);

avx512_cmp_float!(eq_f32, f32, _mm512_set1_ps, _mm512_loadu_ps, _mm512_cmp_ps_mask, _CMP_EQ_OQ,
    lanes = 16, tail = |s, v| s == v);
avx512_cmp_float!(ne_f32, f32, _mm512_set1_ps, _mm512_loadu_ps, _mm512_cmp_ps_mask, _CMP_NEQ_UQ,
    lanes = 16, tail = |s, v| s != v);
avx512_cmp_float!(lt_f32, f32, _mm512_set1_ps, _mm512_loadu_ps, _mm512_cmp_ps_mask, _CMP_LT_OQ,
    lanes = 16, tail = |s, v| s < v);
avx512_cmp_float!(le_f32, f32, _mm512_set1_ps, _mm512_loadu_ps, _mm512_cmp_ps_mask, _CMP_LE_OQ,
    lanes = 16, tail = |s, v| s <= v);
avx512_cmp_float!(gt_f32, f32, _mm512_set1_ps, _mm512_loadu_ps, _mm512_cmp_ps_mask, _CMP_GT_OQ,
    lanes = 16, tail = |s, v| s > v);
avx512_cmp_float!(ge_f32, f32, _mm512_set1_ps, _mm512_loadu_ps, _mm512_cmp_ps_mask, _CMP_GE_OQ,
    lanes = 16, tail = |s, v| s >= v);

avx512_cmp_float!(eq_f64, f64, _mm512_set1_pd, _mm512_loadu_pd, _mm512_cmp_pd_mask, _CMP_EQ_OQ,
    lanes = 8, tail = |s, v| s == v);
avx512_cmp_float!(ne_f64, f64, _mm512_set1_pd, _mm512_loadu_pd, _mm512_cmp_pd_mask, _CMP_NEQ_UQ,
    lanes = 8, tail = |s, v| s != v);
avx512_cmp_float!(lt_f64, f64, _mm512_set1_pd, _mm512_loadu_pd, _mm512_cmp_pd_mask, _CMP_LT_OQ,
    lanes = 8, tail = |s, v| s < v);
avx512_cmp_float!(le_f64, f64, _mm512_set1_pd, _mm512_loadu_pd, _mm512_cmp_pd_mask, _CMP_LE_OQ,
    lanes = 8, tail = |s, v| s <= v);
avx512_cmp_float!(gt_f64, f64, _mm512_set1_pd, _mm512_loadu_pd, _mm512_cmp_pd_mask, _CMP_GT_OQ,
    lanes = 8, tail = |s, v| s > v);
avx512_cmp_float!(ge_f64, f64, _mm512_set1_pd, _mm512_loadu_pd, _mm512_cmp_pd_mask, _CMP_GE_OQ,
    lanes = 8, tail = |s, v| s >= v);

avx512_find_term!(find_i8, i8, _mm512_set1_epi8, _mm512_loadu_epi8,
    _mm512_cmpeq_epi8_mask, lanes = 64);
avx512_find_term!(find_i16, i16, _mm512_set1_epi16, _mm512_loadu_epi16,
    _mm512_cmpeq_epi16_mask, lanes = 32);
avx512_find_term!(find_i32, i32, _mm512_set1_epi32, _mm512_loadu_epi32,
    _mm512_cmpeq_epi32_mask, lanes = 16);
avx512_find_term!(find_i64, i64, _mm512_set1_epi64, _mm512_loadu_epi64,
    _mm512_cmpeq_epi64_mask, lanes = 8);

/// find_term over f32 via an ordered-equal lane mask
pub fn find_f32(src: &[f32], val: f32) -> bool {
    #[target_feature(enable = "avx512f,avx512bw,avx512dq,avx512vl")]
    unsafe fn inner(src: &[f32], val: f32) -> bool {
        let n = src.len();
        let vv = _mm512_set1_ps(val);
        let mut i = 0;
        while i + 16 <= n {
            let v = _mm512_loadu_ps(src.as_ptr().add(i));
            if _mm512_cmp_ps_mask::<_CMP_EQ_OQ>(v, vv) != 0 {
                return true;
            }
            i += 16;
        }
        src[i..n].iter().any(|&s| s == val)
    }
    unsafe { inner(src, val) }
}

/// find_term over f64
pub fn find_f64(src: &[f64], val: f64) -> bool {
    #[target_feature(enable = "avx512f,avx512bw,avx512dq,avx512vl")]
    unsafe fn inner(src: &[f64], val: f64) -> bool {
        let n = src.len();
        let vv = _mm512_set1_pd(val);
        let mut i = 0;
        while i + 8 <= n {
            let v = _mm512_loadu_pd(src.as_ptr().add(i));
            if _mm512_cmp_pd_mask::<_CMP_EQ_OQ>(v, vv) != 0 {
                return true;
            }
            i += 8;
        }
        src[i..n].iter().any(|&s| s == val)
    }
    unsafe { inner(src, val) }
}

/// Pack 64 booleans into one block: a single byte-compare yields the mask
pub fn bitset_block(src: &[bool]) -> u64 {
    debug_assert!(src.len() >= 64);

    #[target_feature(enable = "avx512f,avx512bw,avx512dq,avx512vl")]
    unsafe fn inner(src: *const bool) -> u64 {
        let zero = _mm512_setzero_si512();
        let v = _mm512_loadu_epi8(src as *const i8);
        _mm512_cmpgt_epi8_mask(v, zero)
    }

    unsafe { inner(src.as_ptr()) }
}

/// Runtime check for the feature set this tier requires
pub fn supported() -> bool {
    is_x86_feature_detected!("avx512f")
        && is_x86_feature_detected!("avx512bw")
        && is_x86_feature_detected!("avx512dq")
        && is_x86_feature_detected!("avx512vl")
}

/// Install the AVX-512 cells into the dispatch table
pub fn install(table: &mut KernelTable) {
    table.cmp_i8 = CompareKernels {
        eq: eq_i8,
        ne: ne_i8,
        lt: lt_i8,
        le: le_i8,
        gt: gt_i8,
        ge: ge_i8,
    };
    table.cmp_i16 = CompareKernels {
        eq: eq_i16,
        ne: ne_i16,
        lt: lt_i16,
        le: le_i16,
        gt: gt_i16,
        ge: ge_i16,
    };
    table.cmp_i32 = CompareKernels {
        eq: eq_i32,
        ne: ne_i32,
        lt: lt_i32,
        le: le_i32,
        gt: gt_i32,
        ge: ge_i32,
    };
    table.cmp_i64 = CompareKernels {
        eq: eq_i64,
        ne: ne_i64,
        lt: lt_i64,
        le: le_i64,
        gt: gt_i64,
        ge: ge_i64,
    };
    table.cmp_f32 = CompareKernels {
        eq: eq_f32,
        ne: ne_f32,
        lt: lt_f32,
        le: le_f32,
        gt: gt_f32,
        ge: ge_f32,
    };
    table.cmp_f64 = CompareKernels {
        eq: eq_f64,
        ne: ne_f64,
        lt: lt_f64,
        le: le_f64,
        gt: gt_f64,
        ge: ge_f64,
    };
    table.find_term = FindTermKernels {
        find_bool: table.find_term.find_bool,
        find_i8,
        find_i16,
        find_i32,
        find_i64,
        find_f32,
        find_f64,
    };
    table.bitset_block = bitset_block;
}
