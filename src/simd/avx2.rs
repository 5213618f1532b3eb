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

//! 256-bit (AVX2) kernel tier
//!
//! Covers every compare cell including `i64`, the `find_term` cells, and the
//! bitset block kernel.

#![allow(clippy::missing_safety_doc)]

use std::arch::x86_64::*;

use super::{CompareKernels, FindTermKernels, KernelTable};

macro_rules! avx2_cmp_int {
    ($fn_name:ident, $t:ty, $set1:ident, $cmp:ident,
     swapped = $swapped:expr, invert = $invert:expr,
     lanes = $lanes:expr, lane_bytes = $lb:expr, tail = $tail:expr) => {
        pub fn $fn_name(src: &[$t], val: $t, out: &mut [bool]) {
            #[target_feature(enable = "avx2")]
            unsafe fn inner(src: &[$t], val: $t, out: &mut [bool]) {
                let n = src.len().min(out.len());
                let vv = $set1(val);
                let mut buf = [0u8; 32];
                let mut i = 0;
                while i + $lanes <= n {
                    let v = _mm256_loadu_si256(src.as_ptr().add(i) as *const __m256i);
                    let m = if $swapped { $cmp(vv, v) } else { $cmp(v, vv) };
                    _mm256_storeu_si256(buf.as_mut_ptr() as *mut __m256i, m);
                    for j in 0..$lanes {
                        let hit = buf[j * $lb] != 0;
                        out[i + j] = hit != $invert;
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

macro_rules! avx2_cmp_float {
    ($fn_name:ident, $t:ty, $set1:ident, $load:ident, $cast:ident, $cmp:ident, $imm:expr,
     lanes = $lanes:expr, lane_bytes = $lb:expr, tail = $tail:expr) => {
        pub fn $fn_name(src: &[$t], val: $t, out: &mut [bool]) {
            #[target_feature(enable = "avx2")]
            unsafe fn inner(src: &[$t], val: $t, out: &mut [bool]) {
                let n = src.len().min(out.len());
                let vv = $set1(val);
                let mut buf = [0u8; 32];
                let mut i = 0;
                while i + $lanes <= n {
                    let v = $load(src.as_ptr().add(i));
                    let m = $cast($cmp::<{ $imm }>(v, vv));
                    _mm256_storeu_si256(buf.as_mut_ptr() as *mut __m256i, m);
                    for j in 0..$lanes {
                        out[i + j] = buf[j * $lb] != 0;
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

macro_rules! avx2_find_term {
    ($fn_name:ident, $t:ty, $set1:ident, $cmpeq:ident, lanes = $lanes:expr) => {
        pub fn $fn_name(src: &[$t], val: $t) -> bool {
            #[target_feature(enable = "avx2")]
            unsafe fn inner(src: &[$t], val: $t) -> bool {
                let n = src.len();
                let vv = $set1(val);
                let mut i = 0;
                while i + $lanes <= n {
                    let v = _mm256_loadu_si256(src.as_ptr().add(i) as *const __m256i);
                    let m = $cmpeq(v, vv);
                    if _mm256_movemask_epi8(m) != 0 {
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

avx2_cmp_int!(eq_i8, i8, _mm256_set1_epi8, _mm256_cmpeq_epi8,
    swapped = false, invert = false, lanes = 32, lane_bytes = 1, tail = |s, v| s == v);
avx2_cmp_int!(ne_i8, i8, _mm256_set1_epi8, _mm256_cmpeq_epi8,
    swapped = false, invert = true, lanes = 32, lane_bytes = 1, tail = |s, v| s != v);
avx2_cmp_int!(gt_i8, i8, _mm256_set1_epi8, _mm256_cmpgt_epi8,
    swapped = false, invert = false, lanes = 32, lane_bytes = 1, tail = |s, v| s > v);
avx2_cmp_int!(le_i8, i8, _mm256_set1_epi8, _mm256_cmpgt_epi8,
    swapped = false, invert = true, lanes = 32, lane_bytes = 1, tail = |s, v| s <= v);
avx2_cmp_int!(lt_i8, i8, _mm256_set1_epi8, _mm256_cmpgt_epi8,
    swapped = true, invert = false, lanes = 32, lane_bytes = 1, tail = |s, v| s < v);
avx2_cmp_int!(ge_i8, i8, _mm256_set1_epi8, _mm256_cmpgt_epi8,
    swapped = true, invert = true, lanes = 32, lane_bytes = 1, tail = |s, v| s >= v);

avx2_cmp_int!(eq_i16, i16, _mm256_set1_epi16, _mm256_cmpeq_epi16,
    swapped = false, invert = false, lanes = 16, lane_bytes = 2, tail = |s, v| s == v);
avx2_cmp_int!(ne_i16, i16, _mm256_set1_epi16, _mm256_cmpeq_epi16,
    swapped = false, invert = true, lanes = 16, lane_bytes = 2, tail = |s, v| s != v);
avx2_cmp_int!(gt_i16, i16, _mm256_set1_epi16, _mm256_cmpgt_epi16,
    swapped = false, invert = false, lanes = 16, lane_bytes = 2, tail = |s, v| s > v);
avx2_cmp_int!(le_i16, i16, _mm256_set1_epi16, _mm256_cmpgt_epi16,
    swapped = false, invert = true, lanes = 16, lane_bytes = 2, tail = |s, v| s <= v);
avx2_cmp_int!(lt_i16, i16, _mm256_set1_epi16, _mm256_cmpgt_epi16,
    swapped = true, invert = false, lanes = 16, lane_bytes = 2, tail = |s, v| s < v);
avx2_cmp_int!(ge_i16, i16, _mm256_set1_epi16, _mm256_cmpgt_epi16,
    swapped = true, invert = true, lanes = 16, lane_bytes = 2, tail = |s, v| s >= v);

avx2_cmp_int!(eq_i32, i32, _mm256_set1_epi32, _mm256_cmpeq_epi32,
    swapped = false, invert = false, lanes = 8, lane_bytes = 4, tail = |s, v| s == v);
avx2_cmp_int!(ne_i32, i32, _mm256_set1_epi32, _mm256_cmpeq_epi32,
    swapped = false, invert = true, lanes = 8, lane_bytes = 4, tail = |s, v| s != v);
avx2_cmp_int!(gt_i32, i32, _mm256_set1_epi32, _mm256_cmpgt_epi32,
    swapped = false, invert = false, lanes = 8, lane_bytes = 4, tail = |s, v| s > v);
avx2_cmp_int!(le_i32, i32, _mm256_set1_epi32, _mm256_cmpgt_epi32,
    swapped = false, invert = true, lanes = 8, lane_bytes = 4, tail = |s, v| s <= v);
avx2_cmp_int!(lt_i32, i32, _mm256_set1_epi32, _mm256_cmpgt_epi32,
    swapped = true, invert = false, lanes = 8, lane_bytes = 4, tail = |s, v| s < v);
avx2_cmp_int!(ge_i32, i32, _mm256_set1_epi32, _mm256_cmpgt_epi32,
    swapped = true, invert = true, lanes = 8, lane_bytes = 4, tail = |s, v| s >= v);

avx2_cmp_int!(eq_i64, i64, _mm256_set1_epi64x, _mm256_cmpeq_epi64,
    swapped = false, invert = false, lanes = 4, lane_bytes = 8, tail = |s, v| s == v);
avx2_cmp_int!(ne_i64, i64, _mm256_set1_epi64x, _mm256_cmpeq_epi64,
    swapped = false, invert = true, lanes = 4, lane_bytes = 8, tail = |s, v| s != v);
avx2_cmp_int!(gt_i64, i64, _mm256_set1_epi64x, _mm256_cmpgt_epi64,
    swapped = false, invert = false, lanes = 4, lane_bytes = 8, tail = |s, v| s > v);
avx2_cmp_int!(le_i64, i64, _mm256_set1_epi64x, _mm256_cmpgt_epi64,
    swapped = false, invert = true, lanes = 4, lane_bytes = 8, tail = |s, v| s <= v);
avx2_cmp_int!(lt_i64, i64, _mm256_set1_epi64x, _mm256_cmpgt_epi64,
    swapped = true, invert = false, lanes = 4, lane_bytes = 8, tail = |s, v| s < v);
avx2_cmp_int!(ge_i64, i64, _mm256_set1_epi64x, _mm256_cmpgt_epi64,
    swapped = true, invert = true, lanes = 4, lane_bytes = 8, tail = |s, v| s >= v);

avx2_cmp_float!(eq_f32, f32, _mm256_set1_ps, _mm256_loadu_ps, _mm256_castps_si256,
    _mm256_cmp_ps, _CMP_EQ_OQ, lanes = 8, lane_bytes = 4, tail = |s, v| s == v);
avx2_cmp_float!(ne_f32, f32, _mm256_set1_ps, _mm256_loadu_ps, _mm256_castps_si256,
    _mm256_cmp_ps, _CMP_NEQ_UQ, lanes = 8, lane_bytes = 4, tail = |s, v| s != v);
avx2_cmp_float!(lt_f32, f32, _mm256_set1_ps, _mm256_loadu_ps, _mm256_castps_si256,
    _mm256_cmp_ps, _CMP_LT_OQ, lanes = 8, lane_bytes = 4, tail = |s, v| s < v);
avx2_cmp_float!(le_f32, f32, _mm256_set1_ps, _mm256_loadu_ps, _mm256_castps_si256,
    _mm256_cmp_ps, _CMP_LE_OQ, lanes = 8, lane_bytes = 4, tail = |s, v| s <= v);
avx2_cmp_float!(gt_f32, f32, _mm256_set1_ps, _mm256_loadu_ps, _mm256_castps_si256,
    _mm256_cmp_ps, _CMP_GT_OQ, lanes = 8, lane_bytes = 4, tail = |s, v| s > v);
avx2_cmp_float!(ge_f32, f32, _mm256_set1_ps, _mm256_loadu_ps, _mm256_castps_si256,
    _mm256_cmp_ps, _CMP_GE_OQ, lanes = 8, lane_bytes = 4, tail = |s, v| s >= v);

avx2_cmp_float!(eq_f64, f64, _mm256_set1_pd, _mm256_loadu_pd, _mm256_castpd_si256,
    _mm256_cmp_pd, _CMP_EQ_OQ, lanes = 4, lane_bytes = 8, tail = |s, v| s == v);
avx2_cmp_float!(ne_f64, f64, _mm256_set1_pd, _mm256_loadu_pd, _mm256_castpd_si256,
    _mm256_cmp_pd, _CMP_NEQ_UQ, lanes = 4, lane_bytes = 8, tail = |s, v| s != v);
avx2_cmp_float!(lt_f64, f64, _mm256_set1_pd, _mm256_loadu_pd, _mm256_castpd_si256,
    _mm256_cmp_pd, _CMP_LT_OQ, lanes = 4, lane_bytes = 8, tail = |s, v| s < v);
avx2_cmp_float!(le_f64, f64, _mm256_set1_pd, _mm256_loadu_pd, _mm256_castpd_si256,
    _mm256_cmp_pd, _CMP_LE_OQ, lanes = 4, lane_bytes = 8, tail = |s, v| s <= v);
avx2_cmp_float!(gt_f64, f64, _mm256_set1_pd, _mm256_loadu_pd, _mm256_castpd_si256,
    _mm256_cmp_pd, _CMP_GT_OQ, lanes = 4, lane_bytes = 8, tail = |s, v| s > v);
avx2_cmp_float!(ge_f64, f64, _mm256_set1_pd, _mm256_loadu_pd, _mm256_castpd_si256,
    _mm256_cmp_pd, _CMP_GE_OQ, lanes = 4, lane_bytes = 8, tail = |s, v| s >= v);

avx2_find_term!(find_i8, i8, _mm256_set1_epi8, _mm256_cmpeq_epi8, lanes = 32);
avx2_find_term!(find_i16, i16, _mm256_set1_epi16, _mm256_cmpeq_epi16, lanes = 16);
avx2_find_term!(find_i32, i32, _mm256_set1_epi32, _mm256_cmpeq_epi32, lanes = 8);
avx2_find_term!(find_i64, i64, _mm256_set1_epi64x, _mm256_cmpeq_epi64, lanes = 4);

/// find_term over f32 via an integer-compare of equal float lanes
pub fn find_f32(src: &[f32], val: f32) -> bool {
    #[target_feature(enable = "avx2")]
    unsafe fn inner(src: &[f32], val: f32) -> bool {
        let n = src.len();
        let vv = _mm256_set1_ps(val);
        let mut i = 0;
        while i + 8 <= n {
            let v = _mm256_loadu_ps(src.as_ptr().add(i));
            let m = _mm256_cmp_ps::<_CMP_EQ_OQ>(v, vv);
            if _mm256_movemask_ps(m) != 0 {
                return true;
            }
            i += 8;
        }
        src[i..n].iter().any(|&s| s == val)
    }
    unsafe { inner(src, val) }
}

/// find_term over f64
pub fn find_f64(src: &[f64], val: f64) -> bool {
    #[target_feature(enable = "avx2")]
    unsafe fn inner(src: &[f64], val: f64) -> bool {
        let n = src.len();
        let vv = _mm256_set1_pd(val);
        let mut i = 0;
        while i + 4 <= n {
            let v = _mm256_loadu_pd(src.as_ptr().add(i));
            let m = _mm256_cmp_pd::<_CMP_EQ_OQ>(v, vv);
            if _mm256_movemask_pd(m) != 0 {
                return true;
            }
            i += 4;
        }
        src[i..n].iter().any(|&s| s == val)
    }
    unsafe { inner(src, val) }
}

/// Pack 64 booleans into one block via two 32-byte movemasks
pub fn bitset_block(src: &[bool]) -> u64 {
    debug_assert!(src.len() >= 64);

    #[target_feature(enable = "avx2")]
    unsafe fn inner(src: *const bool) -> u64 {
        let zero = _mm256_setzero_si256();
        let lo = _mm256_loadu_si256(src as *const __m256i);
        let hi = _mm256_loadu_si256(src.add(32) as *const __m256i);
        let lo_mask = _mm256_movemask_epi8(_mm256_cmpgt_epi8(lo, zero)) as u32 as u64;
        let hi_mask = _mm256_movemask_epi8(_mm256_cmpgt_epi8(hi, zero)) as u32 as u64;
        lo_mask | (hi_mask << 32)
    }

    unsafe { inner(src.as_ptr()) }
}

/// Install the AVX2 cells into the dispatch table
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
