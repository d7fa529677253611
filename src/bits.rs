use crate::error::SieveError;

pub const WORD_BITS: usize = 64;

/// Number of u64 words needed to hold `bits` bits.
#[inline]
pub fn words_for(bits: usize) -> usize {
    bits.div_ceil(WORD_BITS)
}

/// Mask selecting the bits of the final word that belong to a bitset of
/// `len` bits. A length that is a whole number of words keeps every bit.
#[inline]
pub fn tail_mask(len: usize) -> u64 {
    match len % WORD_BITS {
        0 => !0_u64,
        rem => (1_u64 << rem) - 1,
    }
}

#[inline]
pub fn fill_ones(words: &mut [u64]) {
    words.fill(!0_u64);
}

#[inline]
pub fn test_bit(words: &[u64], idx: usize) -> bool {
    (words[idx / WORD_BITS] >> (idx % WORD_BITS)) & 1 == 1
}

#[inline]
pub fn clear_bit(words: &mut [u64], idx: usize) {
    words[idx / WORD_BITS] &= !(1_u64 << (idx % WORD_BITS));
}

/// Population count over a word slice.
#[inline]
pub fn popcount(words: &[u64]) -> u64 {
    words.iter().map(|w| u64::from(w.count_ones())).sum()
}

/// Position of the lowest set bit, or `None` for an all-zero word.
#[inline]
pub fn lowest_set_bit(word: u64) -> Option<u32> {
    if word == 0 {
        None
    } else {
        Some(word.trailing_zeros())
    }
}

/// Owned, fixed-capacity bit array.
///
/// A set bit means "still a candidate prime", a clear bit means "known
/// composite". The logical length can shrink below the allocated capacity so
/// one buffer can be reused for a short final segment; bits between `len` and
/// the end of the last word are never reported by `count_ones` or `iter_ones`.
pub struct BitSet {
    words: Vec<u64>,
    len: usize,
}

impl BitSet {
    /// Allocate room for `capacity` bits. The set starts empty (len 0).
    ///
    /// Allocation goes through `try_reserve_exact` so an oversized request
    /// surfaces as `SieveError::Allocation` instead of aborting the process.
    pub fn with_capacity(capacity: usize) -> Result<Self, SieveError> {
        let num_words = words_for(capacity);
        let mut words = Vec::new();
        words
            .try_reserve_exact(num_words)
            .map_err(|source| SieveError::Allocation {
                bits: capacity,
                source,
            })?;
        words.resize(num_words, 0);
        Ok(BitSet { words, len: 0 })
    }

    /// Allocate `len` bits, all marked as candidates.
    pub fn new_all_set(len: usize) -> Result<Self, SieveError> {
        let mut bits = Self::with_capacity(len)?;
        bits.reset(len);
        Ok(bits)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bits the buffer can hold without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.words.len() * WORD_BITS
    }

    /// Set the logical length and mark every bit in it as a candidate.
    ///
    /// # Panics
    /// Panics if `len` exceeds the allocated capacity.
    pub fn reset(&mut self, len: usize) {
        assert!(
            len <= self.capacity(),
            "BitSet reset beyond capacity: {} > {}",
            len,
            self.capacity()
        );
        self.len = len;
        fill_ones(&mut self.words[..words_for(len)]);
    }

    #[inline]
    pub fn test(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len, "BitSet index out of bounds: {} >= {}", idx, self.len);
        test_bit(&self.words, idx)
    }

    #[inline]
    pub fn clear(&mut self, idx: usize) {
        debug_assert!(idx < self.len, "BitSet index out of bounds: {} >= {}", idx, self.len);
        clear_bit(&mut self.words, idx);
    }

    /// Clear `start`, `start + step`, `start + 2·step`, ... below `len`.
    #[inline]
    pub fn clear_stride(&mut self, start: usize, step: usize) {
        debug_assert!(step > 0);
        let len = self.len;
        let words = &mut self.words;
        let mut idx = start;
        while idx < len {
            words[idx / WORD_BITS] &= !(1_u64 << (idx % WORD_BITS));
            idx += step;
        }
    }

    /// Count candidates: full words by popcount, the last partial word masked.
    pub fn count_ones(&self) -> u64 {
        if self.len == 0 {
            return 0;
        }
        let num_words = words_for(self.len);
        let full = popcount(&self.words[..num_words - 1]);
        let last = self.words[num_words - 1] & tail_mask(self.len);
        full + u64::from(last.count_ones())
    }

    /// Indices of all candidate bits in ascending order.
    pub fn iter_ones(&self) -> SetBits<'_> {
        let num_words = words_for(self.len);
        SetBits {
            words: &self.words[..num_words],
            len: self.len,
            word_idx: 0,
            current: if num_words > 0 { self.words[0] } else { 0 },
        }
    }
}

/// Iterator over set bits, one lowest-set-bit scan per yielded index.
pub struct SetBits<'a> {
    words: &'a [u64],
    len: usize,
    word_idx: usize,
    current: u64,
}

impl Iterator for SetBits<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if let Some(bit) = lowest_set_bit(self.current) {
                let idx = self.word_idx * WORD_BITS + bit as usize;
                if idx >= self.len {
                    return None;
                }
                self.current &= self.current - 1; // clear lowest set bit
                return Some(idx);
            }
            self.word_idx += 1;
            if self.word_idx >= self.words.len() {
                return None;
            }
            self.current = self.words[self.word_idx];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_for() {
        assert_eq!(words_for(0), 0);
        assert_eq!(words_for(1), 1);
        assert_eq!(words_for(64), 1);
        assert_eq!(words_for(65), 2);
        assert_eq!(words_for(128), 2);
    }

    #[test]
    fn test_tail_mask() {
        assert_eq!(tail_mask(64), !0_u64);
        assert_eq!(tail_mask(1), 1);
        assert_eq!(tail_mask(3), 0b111);
        assert_eq!(tail_mask(127), (1_u64 << 63) - 1);
    }

    #[test]
    fn test_word_primitives() {
        let mut words = vec![0_u64; 2];
        fill_ones(&mut words);
        assert_eq!(popcount(&words), 128);

        clear_bit(&mut words, 0);
        clear_bit(&mut words, 64);
        clear_bit(&mut words, 127);
        assert!(!test_bit(&words, 0));
        assert!(test_bit(&words, 1));
        assert!(!test_bit(&words, 64));
        assert!(!test_bit(&words, 127));
        assert_eq!(popcount(&words), 125);

        assert_eq!(lowest_set_bit(0), None);
        assert_eq!(lowest_set_bit(0b1000), Some(3));
        assert_eq!(lowest_set_bit(words[1]), Some(1));
    }

    #[test]
    fn test_count_masks_trailing_bits() {
        // 100 bits = one full word + 36 bits; reset fills all 128 physical bits
        let bits = BitSet::new_all_set(100).unwrap();
        assert_eq!(bits.len(), 100);
        assert_eq!(bits.capacity(), 128);
        assert_eq!(bits.count_ones(), 100);
        assert_eq!(bits.iter_ones().count(), 100);
        assert_eq!(bits.iter_ones().last(), Some(99));
    }

    #[test]
    fn test_clear_at_word_boundaries() {
        let mut bits = BitSet::new_all_set(130).unwrap();
        for idx in [0, 63, 64, 127, 128, 129] {
            bits.clear(idx);
            assert!(!bits.test(idx));
        }
        assert_eq!(bits.count_ones(), 124);
        let ones: Vec<usize> = bits.iter_ones().collect();
        assert_eq!(ones.len(), 124);
        assert_eq!(ones.first(), Some(&1));
        assert_eq!(ones.last(), Some(&126));
    }

    #[test]
    fn test_clear_stride() {
        let mut bits = BitSet::new_all_set(20).unwrap();
        bits.clear_stride(2, 3);
        let ones: Vec<usize> = bits.iter_ones().collect();
        assert_eq!(ones, vec![0, 1, 3, 4, 6, 7, 9, 10, 12, 13, 15, 16, 18, 19]);

        // start beyond the length clears nothing
        bits.clear_stride(25, 1);
        assert_eq!(bits.count_ones(), 14);
    }

    #[test]
    fn test_reset_reuses_buffer() {
        let mut bits = BitSet::with_capacity(256).unwrap();
        assert!(bits.is_empty());
        assert_eq!(bits.count_ones(), 0);
        assert_eq!(bits.iter_ones().next(), None);

        bits.reset(256);
        bits.clear_stride(0, 2);
        assert_eq!(bits.count_ones(), 128);

        // shrinking the logical length refills and hides the rest
        bits.reset(10);
        assert_eq!(bits.count_ones(), 10);
        assert_eq!(bits.iter_ones().collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    #[should_panic(expected = "beyond capacity")]
    fn test_reset_beyond_capacity_panics() {
        let mut bits = BitSet::with_capacity(64).unwrap();
        bits.reset(65);
    }

    #[test]
    fn test_allocation_failure_is_reported() {
        let err = BitSet::with_capacity(usize::MAX).err().unwrap();
        assert!(matches!(err, SieveError::Allocation { .. }));
    }
}
