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

//! 128-bit (SSE2) kernel tier
//!
//! SSE2 has no packed 64-bit integer compare, so the `i64` cells stay at the
//! reference tier. Integer `lt/le/ge` derive from `cmpgt` with swapped or
//! inverted operands.

#![allow(clippy::missing_safety_doc)]

use std::arch::x86_64::*;

use super::{CompareKernels, KernelTable};

// Integer compare over 128-bit lanes. The compare mask is stored back to a
// byte buffer; lane j's low byte is 0xFF when the lane matched.
macro_rules! sse2_cmp_int {
    ($fn_name:ident, $t:ty, $set1:ident, $cmp:ident,
     swapped = $swapped:expr, invert = $invert:expr,
     lanes = $lanes:expr, lane_bytes = $lb:expr, tail = $tail:expr) => {
        pub fn $fn_name(src: &[$t], val: $t, out: &mut [bool]) {
            #[target_feature(enable = "sse2")]
            unsafe fn inner(src: &[$t], val: $t, out: &mut [bool]) {
                let n = src.len().min(out.len());
                let vv = $set1(val);
                let mut buf = [0u8; 16];
                let mut i = 0;
                while i + $lanes <= n {
                    let v = _mm_loadu_si128(src.as_ptr().add(i) as *const __m128i);
                    let m = if $swapped { $cmp(vv, v) } else { $cmp(v, vv) };
                    _mm_storeu_si128(buf.as_mut_ptr() as *mut __m128i, m);
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

// Float compare over 128-bit lanes; the SSE compare intrinsics already carry
// the ordered/unordered semantics that match Rust's native operators.
macro_rules! sse2_cmp_float {
    ($fn_name:ident, $t:ty, $set1:ident, $load:ident, $cast:ident, $cmp:ident,
     lanes = $lanes:expr, lane_bytes = $lb:expr, tail = $tail:expr) => {
        pub fn $fn_name(src: &[$t], val: $t, out: &mut [bool]) {
            #[target_feature(enable = "sse2")]
            unsafe fn inner(src: &[$t], val: $t, out: &mut [bool]) {
                let n = src.len().min(out.len());
                let vv = $set1(val);
                let mut buf = [0u8; 16];
                let mut i = 0;
                while i + $lanes <= n {
                    let v = $load(src.as_ptr().add(i));
                    let m = $cast($cmp(v, vv));
                    _mm_storeu_si128(buf.as_mut_ptr() as *mut __m128i, m);
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

sse2_cmp_int!(eq_i8, i8, _mm_set1_epi8, _mm_cmpeq_epi8,
    swapped = false, invert = false, lanes = 16, lane_bytes = 1, tail = |s, v| s == v);
sse2_cmp_int!(ne_i8, i8, _mm_set1_epi8, _mm_cmpeq_epi8,
    swapped = false, invert = true, lanes = 16, lane_bytes = 1, tail = |s, v| s != v);
sse2_cmp_int!(gt_i8, i8, _mm_set1_epi8, _mm_cmpgt_epi8,
    swapped = false, invert = false, lanes = 16, lane_bytes = 1, tail = |s, v| s > v);
sse2_cmp_int!(le_i8, i8, _mm_set1_epi8, _mm_cmpgt_epi8,
    swapped = false, invert = true, lanes = 16, lane_bytes = 1, tail = |s, v| s <= v);
sse2_cmp_int!(lt_i8, i8, _mm_set1_epi8, _mm_cmpgt_epi8,
    swapped = true, invert = false, lanes = 16, lane_bytes = 1, tail = |s, v| s < v);
sse2_cmp_int!(ge_i8, i8, _mm_set1_epi8, _mm_cmpgt_epi8,
    swapped = true, invert = true, lanes = 16, lane_bytes = 1, tail = |s, v| s >= v);

sse2_cmp_int!(eq_i16, i16, _mm_set1_epi16, _mm_cmpeq_epi16,
    swapped = false, invert = false, lanes = 8, lane_bytes = 2, tail = |s, v| s == v);
sse2_cmp_int!(ne_i16, i16, _mm_set1_epi16, _mm_cmpeq_epi16,
    swapped = false, invert = true, lanes = 8, lane_bytes = 2, tail = |s, v| s != v);
sse2_cmp_int!(gt_i16, i16, _mm_set1_epi16, _mm_cmpgt_epi16,
    swapped = false, invert = false, lanes = 8, lane_bytes = 2, tail = |s, v| s > v);
sse2_cmp_int!(le_i16, i16, _mm_set1_epi16, _mm_cmpgt_epi16,
    swapped = false, invert = true, lanes = 8, lane_bytes = 2, tail = |s, v| s <= v);
sse2_cmp_int!(lt_i16, i16, _mm_set1_epi16, _mm_cmpgt_epi16,
    swapped = true, invert = false, lanes = 8, lane_bytes = 2, tail = |s, v| s < v);
sse2_cmp_int!(ge_i16, i16, _mm_set1_epi16, _mm_cmpgt_epi16,
    swapped = true, invert = true, lanes = 8, lane_bytes = 2, tail = |s, v| s >= v);

sse2_cmp_int!(eq_i32, i32, _mm_set1_epi32, _mm_cmpeq_epi32,
    swapped = false, invert = false, lanes = 4, lane_bytes = 4, tail = |s, v| s == v);
sse2_cmp_int!(ne_i32, i32, _mm_set1_epi32, _mm_cmpeq_epi32,
    swapped = false, invert = true, lanes = 4, lane_bytes = 4, tail = |s, v| s != v);
sse2_cmp_int!(gt_i32, i32, _mm_set1_epi32, _mm_cmpgt_epi32,
    swapped = false, invert = false, lanes = 4, lane_bytes = 4, tail = |s, v| s > v);
sse2_cmp_int!(le_i32, i32, _mm_set1_epi32, _mm_cmpgt_epi32,
    swapped = false, invert = true, lanes = 4, lane_bytes = 4, tail = |s, v| s <= v);
sse2_cmp_int!(lt_i32, i32, _mm_set1_epi32, _mm_cmpgt_epi32,
    swapped = true, invert = false, lanes = 4, lane_bytes = 4, tail = |s, v| s < v);
sse2_cmp_int!(ge_i32, i32, _mm_set1_epi32, _mm_cmpgt_epi32,
    swapped = true, invert = true, lanes = 4, lane_bytes = 4, tail = |s, v| s >= v);

sse2_cmp_float!(eq_f32, f32, _mm_set1_ps, _mm_loadu_ps, _mm_castps_si128, _mm_cmpeq_ps,
    lanes = 4, lane_bytes = 4, tail = |s, v| s == v);
sse2_cmp_float!(ne_f32, f32, _mm_set1_ps, _mm_loadu_ps, _mm_castps_si128, _mm_cmpneq_ps,
    lanes = 4, lane_bytes = 4, tail = |s, v| s != v);
sse2_cmp_float!(lt_f32, f32, _mm_set1_ps, _mm_loadu_ps, _mm_castps_si128, _mm_cmplt_ps,
    lanes = 4, lane_bytes = 4, tail = |s, v| s < v);
sse2_cmp_float!(le_f32, f32, _mm_set1_ps, _mm_loadu_ps, _mm_castps_si128, _mm_cmple_ps,
    lanes = 4, lane_bytes = 4, tail = |s, v| s <= v);
sse2_cmp_float!(gt_f32, f32, _mm_set1_ps, _mm_loadu_ps, _mm_castps_si128, _mm_cmpgt_ps,
    lanes = 4, lane_bytes = 4, tail = |s, v| s > v);
sse2_cmp_float!(ge_f32, f32, _mm_set1_ps, _mm_loadu_ps, _mm_castps_si128, _mm_cmpge_ps,
    lanes = 4, lane_bytes = 4, tail = |s, v| s >= v);

sse2_cmp_float!(eq_f64, f64, _mm_set1_pd, _mm_loadu_pd, _mm_castpd_si128, _mm_cmpeq_pd,
    lanes = 2, lane_bytes = 8, tail = |s, v| s == v);
sse2_cmp_float!(ne_f64, f64, _mm_set1_pd, _mm_loadu_pd, _mm_castpd_si128, _mm_cmpneq_pd,
    lanes = 2, lane_bytes = 8, tail = |s, v| s != v);
sse2_cmp_float!(lt_f64, f64, _mm_set1_pd, _mm_loadu_pd, _mm_castpd_si128, _mm_cmplt_pd,
    lanes = 2, lane_bytes = 8, tail = |s, v| s < v);
sse2_cmp_float!(le_f64, f64, _mm_set1_pd, _mm_loadu_pd, _mm_castpd_si128, _mm_cmple_pd,
    lanes = 2, lane_bytes = 8, tail = |s, v| s <= v);
sse2_cmp_float!(gt_f64, f64, _mm_set1_pd, _mm_loadu_pd, _mm_castpd_si128, _mm_cmpgt_pd,
    lanes = 2, lane_bytes = 8, tail = |s, v| s > v);
sse2_cmp_float!(ge_f64, f64, _mm_set1_pd, _mm_loadu_pd, _mm_castpd_si128, _mm_cmpge_pd,
    lanes = 2, lane_bytes = 8, tail = |s, v| s >= v);

/// Pack 64 booleans into one block via byte-compare and movemask
pub fn bitset_block(src: &[bool]) -> u64 {
    debug_assert!(src.len() >= 64);

    #[target_feature(enable = "sse2")]
    unsafe fn inner(src: *const bool) -> u64 {
        let zero = _mm_setzero_si128();
        let mut block = 0u64;
        for k in 0..4 {
            let v = _mm_loadu_si128(src.add(k * 16) as *const __m128i);
            let m = _mm_cmpgt_epi8(v, zero);
            block |= (_mm_movemask_epi8(m) as u32 as u64) << (k * 16);
        }
        block
    }

    unsafe { inner(src.as_ptr()) }
}

/// Install the SSE2 cells into the dispatch table
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
    table.bitset_block = bitset_block;
    // i64 compares and the find_term cells stay at the lower tier
}
