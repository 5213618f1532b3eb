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

//! Packed row-selection bitset
//!
//! One bit per row in 64-bit blocks; a set bit marks an included row. The
//! filter path appends one bool vector per batch: a partial trailing block
//! is filled bit-at-a-time, whole blocks go through the `bitset_block` SIMD
//! kernel, and the tail is again bit-at-a-time. Total bits appended always
//! equals the sum of the appended chunk lengths.

use crate::simd;

const BLOCK_BITS: usize = 64;

/// Packed array of one bit per row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitset {
    blocks: Vec<u64>,
    len: usize,
}

impl Bitset {
    /// Empty bitset
    pub fn new() -> Self {
        Bitset::default()
    }

    /// Empty bitset with room for `bits` before reallocation
    pub fn with_capacity(bits: usize) -> Self {
        Bitset {
            blocks: Vec::with_capacity(bits.div_ceil(BLOCK_BITS)),
            len: 0,
        }
    }

    /// All-clear bitset of fixed length
    pub fn zeros(len: usize) -> Self {
        Bitset {
            blocks: vec![0; len.div_ceil(BLOCK_BITS)],
            len,
        }
    }

    /// All-set bitset of fixed length
    pub fn ones(len: usize) -> Self {
        let mut set = Bitset {
            blocks: vec![u64::MAX; len.div_ceil(BLOCK_BITS)],
            len,
        };
        set.trim_tail();
        set
    }

    /// Number of bits
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Backing blocks, low bit of block 0 is row 0
    pub fn blocks(&self) -> &[u64] {
        &self.blocks
    }

    /// Read bit `i`; out-of-range reads as false
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        if i >= self.len {
            return false;
        }
        (self.blocks[i / BLOCK_BITS] >> (i % BLOCK_BITS)) & 1 == 1
    }

    /// Set bit `i`
    #[inline]
    pub fn set(&mut self, i: usize) {
        debug_assert!(i < self.len);
        self.blocks[i / BLOCK_BITS] |= 1u64 << (i % BLOCK_BITS);
    }

    /// Clear bit `i`
    #[inline]
    pub fn clear(&mut self, i: usize) {
        debug_assert!(i < self.len);
        self.blocks[i / BLOCK_BITS] &= !(1u64 << (i % BLOCK_BITS));
    }

    /// Append one bit
    pub fn push(&mut self, bit: bool) {
        let pos = self.len;
        if pos % BLOCK_BITS == 0 {
            self.blocks.push(0);
        }
        self.len += 1;
        if bit {
            self.blocks[pos / BLOCK_BITS] |= 1u64 << (pos % BLOCK_BITS);
        }
    }

    /// Append a bool chunk
    ///
    /// Head bits fill the partial trailing block, aligned whole blocks are
    /// packed by the SIMD kernel, the tail is bit-at-a-time.
    pub fn append_bools(&mut self, mut bools: &[bool]) {
        // head: fill up to a block boundary
        while self.len % BLOCK_BITS != 0 && !bools.is_empty() {
            self.push(bools[0]);
            bools = &bools[1..];
        }
        // whole blocks
        while bools.len() >= BLOCK_BITS {
            self.blocks.push(simd::bitset_block(bools));
            self.len += BLOCK_BITS;
            bools = &bools[BLOCK_BITS..];
        }
        // tail
        for &b in bools {
            self.push(b);
        }
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.blocks.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// True when no bit is set
    pub fn none(&self) -> bool {
        self.blocks.iter().all(|&b| b == 0)
    }

    /// True when every bit is set
    pub fn all(&self) -> bool {
        self.count_ones() == self.len
    }

    /// `self &= other`; lengths must match
    pub fn and_assign(&mut self, other: &Bitset) {
        debug_assert_eq!(self.len, other.len);
        for (l, r) in self.blocks.iter_mut().zip(other.blocks.iter()) {
            *l &= r;
        }
    }

    /// `self |= other`; lengths must match
    pub fn or_assign(&mut self, other: &Bitset) {
        debug_assert_eq!(self.len, other.len);
        for (l, r) in self.blocks.iter_mut().zip(other.blocks.iter()) {
            *l |= r;
        }
    }

    /// `self ^= other`; lengths must match
    pub fn xor_assign(&mut self, other: &Bitset) {
        debug_assert_eq!(self.len, other.len);
        for (l, r) in self.blocks.iter_mut().zip(other.blocks.iter()) {
            *l ^= r;
        }
    }

    /// Flip every bit
    pub fn negate(&mut self) {
        for b in self.blocks.iter_mut() {
            *b = !*b;
        }
        self.trim_tail();
    }

    /// Indices of the set bits, ascending
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.get(i))
    }

    /// Unpack into a bool vector
    pub fn to_bools(&self) -> Vec<bool> {
        (0..self.len).map(|i| self.get(i)).collect()
    }

    // zero the bits past len in the last block
    fn trim_tail(&mut self) {
        let tail = self.len % BLOCK_BITS;
        if tail != 0 {
            if let Some(last) = self.blocks.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_get() {
        let mut set = Bitset::new();
        for i in 0..130 {
            set.push(i % 3 == 0);
        }
        assert_eq!(set.len(), 130);
        for i in 0..130 {
            assert_eq!(set.get(i), i % 3 == 0, "bit {}", i);
        }
        assert!(!set.get(1000));
    }

    #[test]
    fn test_append_bools_is_bijective() {
        // chunk sizes straddle block boundaries in both directions
        let chunks: Vec<Vec<bool>> = vec![
            (0..7).map(|i| i % 2 == 0).collect(),
            (0..64).map(|i| i % 5 == 0).collect(),
            (0..1).map(|_| true).collect(),
            (0..129).map(|i| i % 7 == 3).collect(),
            vec![],
            (0..63).map(|i| i % 2 == 1).collect(),
        ];

        let mut set = Bitset::new();
        let mut expected = Vec::new();
        for chunk in &chunks {
            set.append_bools(chunk);
            expected.extend_from_slice(chunk);
        }

        assert_eq!(set.len(), expected.len());
        assert_eq!(set.to_bools(), expected);
        assert_eq!(
            set.count_ones(),
            expected.iter().filter(|&&b| b).count()
        );
    }

    #[test]
    fn test_ones_zeros() {
        let ones = Bitset::ones(70);
        assert_eq!(ones.count_ones(), 70);
        assert!(ones.all());
        assert!(!ones.none());

        let zeros = Bitset::zeros(70);
        assert_eq!(zeros.count_ones(), 0);
        assert!(zeros.none());
    }

    #[test]
    fn test_logical_ops() {
        let mut a = Bitset::new();
        let mut b = Bitset::new();
        let bits_a: Vec<bool> = (0..100).map(|i| i % 2 == 0).collect();
        let bits_b: Vec<bool> = (0..100).map(|i| i % 3 == 0).collect();
        a.append_bools(&bits_a);
        b.append_bools(&bits_b);

        let mut and = a.clone();
        and.and_assign(&b);
        let mut or = a.clone();
        or.or_assign(&b);
        let mut xor = a.clone();
        xor.xor_assign(&b);

        for i in 0..100 {
            assert_eq!(and.get(i), bits_a[i] && bits_b[i]);
            assert_eq!(or.get(i), bits_a[i] || bits_b[i]);
            assert_eq!(xor.get(i), bits_a[i] ^ bits_b[i]);
        }
    }

    #[test]
    fn test_negate_keeps_tail_clear() {
        let mut set = Bitset::zeros(70);
        set.negate();
        assert_eq!(set.count_ones(), 70);
        set.negate();
        assert_eq!(set.count_ones(), 0);
    }

    #[test]
    fn test_iter_ones() {
        let mut set = Bitset::zeros(10);
        set.set(1);
        set.set(4);
        set.set(9);
        assert_eq!(set.iter_ones().collect::<Vec<_>>(), vec![1, 4, 9]);
    }
}
