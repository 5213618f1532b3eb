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

//! SIMD kernel layer with ISA-tier dispatch
//!
//! Stateless element-wise kernels: compare-with-scalar (`eq/ne/lt/le/gt/ge`),
//! `find_term`, and `bitset_block` (64 booleans packed into one 64-bit
//! block). The highest CPU-supported tier is detected once; a table of
//! function pointers per (kernel × type) cell is installed and subsequent
//! callers pay only an indirect call. A tier that does not implement a cell
//! leaves the next lower tier's pointer in place.
//!
//! Numeric semantics: integers compare as their native signed type; floats
//! use ordered comparison except `ne`, which is unordered (NaN != x is
//! true), matching the native operators. Widening of integer literals to 64
//! bits happens in the evaluators, not here.

pub mod reference;

#[cfg(target_arch = "x86_64")]
mod avx2;
#[cfg(target_arch = "x86_64")]
mod avx512;
#[cfg(target_arch = "x86_64")]
mod sse2;

use std::sync::OnceLock;

use crate::core::CompareOp;

/// ISA tier the dispatch table was installed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SimdTier {
    /// Portable scalar loops
    Reference,
    /// 128-bit x86 tier
    Sse2,
    /// 256-bit x86 tier
    Avx2,
    /// 512-bit x86 tier
    Avx512,
}

impl std::fmt::Display for SimdTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimdTier::Reference => write!(f, "REF"),
            SimdTier::Sse2 => write!(f, "SSE2"),
            SimdTier::Avx2 => write!(f, "AVX2"),
            SimdTier::Avx512 => write!(f, "AVX512"),
        }
    }
}

/// `out[i] = src[i] OP val`
pub type CompareFn<T> = fn(&[T], T, &mut [bool]);

/// Whether `val` appears in `src`
pub type FindTermFn<T> = fn(&[T], T) -> bool;

/// Pack the first 64 booleans of the slice into one block
pub type BitsetBlockFn = fn(&[bool]) -> u64;

/// The six compare cells for one element type
#[derive(Clone, Copy)]
pub struct CompareKernels<T: 'static> {
    pub eq: CompareFn<T>,
    pub ne: CompareFn<T>,
    pub lt: CompareFn<T>,
    pub le: CompareFn<T>,
    pub gt: CompareFn<T>,
    pub ge: CompareFn<T>,
}

impl<T> CompareKernels<T> {
    /// Select the kernel for an ordering operator
    pub fn select(&self, op: CompareOp) -> Option<CompareFn<T>> {
        match op {
            CompareOp::Eq => Some(self.eq),
            CompareOp::Ne => Some(self.ne),
            CompareOp::Lt => Some(self.lt),
            CompareOp::Le => Some(self.le),
            CompareOp::Gt => Some(self.gt),
            CompareOp::Ge => Some(self.ge),
            CompareOp::PrefixMatch => None,
        }
    }
}

/// The find_term cells
#[derive(Clone, Copy)]
pub struct FindTermKernels {
    pub find_bool: FindTermFn<bool>,
    pub find_i8: FindTermFn<i8>,
    pub find_i16: FindTermFn<i16>,
    pub find_i32: FindTermFn<i32>,
    pub find_i64: FindTermFn<i64>,
    pub find_f32: FindTermFn<f32>,
    pub find_f64: FindTermFn<f64>,
}

/// Full dispatch table, one pointer per (kernel × type) cell
#[derive(Clone, Copy)]
pub struct KernelTable {
    pub tier: SimdTier,
    pub cmp_i8: CompareKernels<i8>,
    pub cmp_i16: CompareKernels<i16>,
    pub cmp_i32: CompareKernels<i32>,
    pub cmp_i64: CompareKernels<i64>,
    pub cmp_f32: CompareKernels<f32>,
    pub cmp_f64: CompareKernels<f64>,
    pub find_term: FindTermKernels,
    pub bitset_block: BitsetBlockFn,
}

macro_rules! reference_compare_cells {
    ($t:ty) => {
        CompareKernels::<$t> {
            eq: reference::compare_eq::<$t>,
            ne: reference::compare_ne::<$t>,
            lt: reference::compare_lt::<$t>,
            le: reference::compare_le::<$t>,
            gt: reference::compare_gt::<$t>,
            ge: reference::compare_ge::<$t>,
        }
    };
}

impl KernelTable {
    /// Table with every cell at the portable reference tier
    pub fn reference() -> Self {
        KernelTable {
            tier: SimdTier::Reference,
            cmp_i8: reference_compare_cells!(i8),
            cmp_i16: reference_compare_cells!(i16),
            cmp_i32: reference_compare_cells!(i32),
            cmp_i64: reference_compare_cells!(i64),
            cmp_f32: reference_compare_cells!(f32),
            cmp_f64: reference_compare_cells!(f64),
            find_term: FindTermKernels {
                find_bool: reference::find_term::<bool>,
                find_i8: reference::find_term::<i8>,
                find_i16: reference::find_term::<i16>,
                find_i32: reference::find_term::<i32>,
                find_i64: reference::find_term::<i64>,
                find_f32: reference::find_term::<f32>,
                find_f64: reference::find_term::<f64>,
            },
            bitset_block: reference::bitset_block,
        }
    }
}

fn detect() -> KernelTable {
    #[allow(unused_mut)]
    let mut table = KernelTable::reference();

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("sse2") {
            sse2::install(&mut table);
            table.tier = SimdTier::Sse2;
        }
        if is_x86_feature_detected!("avx2") {
            avx2::install(&mut table);
            table.tier = SimdTier::Avx2;
        }
        if avx512::supported() {
            avx512::install(&mut table);
            table.tier = SimdTier::Avx512;
        }
    }

    table
}

static KERNELS: OnceLock<KernelTable> = OnceLock::new();

/// The process-wide dispatch table; detection runs on first use
pub fn kernels() -> &'static KernelTable {
    KERNELS.get_or_init(detect)
}

/// Tier the installed table was selected from
pub fn installed_tier() -> SimdTier {
    kernels().tier
}

/// Pack 64 booleans into one 64-bit block, bit `i` = `src[i]`
#[inline]
pub fn bitset_block(src: &[bool]) -> u64 {
    (kernels().bitset_block)(src)
}

/// Element types the kernel layer dispatches over
///
/// The evaluators' typed dispatch goes through this trait so the per-batch
/// code stays generic while every element loop is an installed kernel.
pub trait SimdElement: Copy + PartialOrd + Send + Sync + 'static {
    /// `out[i] = src[i] op val` for the six ordering operators
    fn compare_val(op: CompareOp, src: &[Self], val: Self, out: &mut [bool]);

    /// Whether `val` appears in `src`
    fn find_term(src: &[Self], val: Self) -> bool;
}

macro_rules! impl_simd_element {
    ($t:ty, $cmp_field:ident, $find_field:ident) => {
        impl SimdElement for $t {
            #[inline]
            fn compare_val(op: CompareOp, src: &[Self], val: Self, out: &mut [bool]) {
                match kernels().$cmp_field.select(op) {
                    Some(kernel) => kernel(src, val, out),
                    None => out[..src.len()].fill(false),
                }
            }

            #[inline]
            fn find_term(src: &[Self], val: Self) -> bool {
                (kernels().find_term.$find_field)(src, val)
            }
        }
    };
}

impl_simd_element!(i8, cmp_i8, find_i8);
impl_simd_element!(i16, cmp_i16, find_i16);
impl_simd_element!(i32, cmp_i32, find_i32);
impl_simd_element!(i64, cmp_i64, find_i64);
impl_simd_element!(f32, cmp_f32, find_f32);
impl_simd_element!(f64, cmp_f64, find_f64);

// bool takes the reference loops; no tiered kernel carries a bool compare
impl SimdElement for bool {
    #[inline]
    fn compare_val(op: CompareOp, src: &[Self], val: Self, out: &mut [bool]) {
        match op {
            CompareOp::Eq => reference::compare_eq(src, val, out),
            CompareOp::Ne => reference::compare_ne(src, val, out),
            CompareOp::Lt => reference::compare_lt(src, val, out),
            CompareOp::Le => reference::compare_le(src, val, out),
            CompareOp::Gt => reference::compare_gt(src, val, out),
            CompareOp::Ge => reference::compare_ge(src, val, out),
            CompareOp::PrefixMatch => out[..src.len()].fill(false),
        }
    }

    #[inline]
    fn find_term(src: &[Self], val: Self) -> bool {
        (kernels().find_term.find_bool)(src, val)
    }
}
