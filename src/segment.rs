use crate::bits::BitSet;
use crate::error::SieveError;

/// Inclusive window `[lo, hi]` of odd integers.
///
/// Both ends are odd and `lo >= 3`, so bit i of the backing buffer maps to
/// `lo + 2·i` and the window holds `(hi - lo) / 2 + 1` odd numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentBounds {
    pub lo: u64,
    pub hi: u64,
}

impl SegmentBounds {
    /// # Panics
    /// Panics on an even bound, `lo < 3`, or `lo > hi`.
    pub fn new(lo: u64, hi: u64) -> Self {
        assert!(lo % 2 == 1 && hi % 2 == 1, "segment bounds must be odd: [{}, {}]", lo, hi);
        assert!(lo >= 3, "segment must start above 1: lo={}", lo);
        assert!(lo <= hi, "degenerate segment: lo={} > hi={}", lo, hi);
        SegmentBounds { lo, hi }
    }

    /// Window of `len` consecutive odd numbers starting at `lo`.
    pub fn from_odd_run(lo: u64, len: u64) -> Self {
        assert!(len > 0, "empty segment at lo={}", lo);
        Self::new(lo, lo + 2 * (len - 1))
    }

    /// Number of odd positions in the window.
    #[inline]
    pub fn len(&self) -> usize {
        ((self.hi - self.lo) / 2 + 1) as usize
    }
}

/// Reusable sieve window over the odd numbers.
///
/// The buffer is allocated once for `span` odd positions and re-initialized
/// for every window handed to it, so a worker keeps a single allocation for
/// its whole run. A final short window reuses the same buffer with a smaller
/// logical length.
pub struct Segment {
    bits: BitSet,
    bounds: Option<SegmentBounds>,
}

impl Segment {
    pub fn with_span(span: usize) -> Result<Self, SieveError> {
        assert!(span > 0, "segment span must be positive");
        Ok(Segment {
            bits: BitSet::with_capacity(span)?,
            bounds: None,
        })
    }

    /// Point the buffer at `bounds` and mark every odd number in it as a
    /// candidate.
    pub fn initialize(&mut self, bounds: SegmentBounds) {
        self.bits.reset(bounds.len());
        self.bounds = Some(bounds);
    }

    /// Clear every odd multiple of each odd seed prime inside the window.
    ///
    /// `seeds` must be increasing. For a seed p the first struck value is the
    /// smallest odd multiple of p that is ≥ max(lo, p²); after that the odd
    /// multiples sit exactly p bit positions apart because each bit already
    /// steps by 2 in value space. The scan stops at the first seed whose
    /// square exceeds `hi`.
    ///
    /// # Panics
    /// Panics if the segment was never initialized.
    pub fn sieve_against(&mut self, seeds: &[u64]) {
        let Some(SegmentBounds { lo, hi }) = self.bounds else {
            panic!("sieve_against called on an uninitialized segment");
        };

        for &p in seeds {
            if p < 3 {
                continue;
            }
            // p ≤ √N < 2^32, so p² fits in u64
            let square = p * p;
            if square > hi {
                break;
            }

            let mut first = if square >= lo {
                square
            } else {
                match lo % p {
                    0 => lo,
                    rem => lo + (p - rem),
                }
            };
            if first % 2 == 0 {
                first += p; // next odd multiple
            }

            let start = (first - lo) / 2;
            if start < self.bits.len() as u64 {
                self.bits.clear_stride(start as usize, p as usize);
            }
        }
    }

    /// Survivors in the window; bits past the window length are masked off.
    #[inline]
    pub fn count_candidates(&self) -> u64 {
        self.bits.count_ones()
    }

    /// Surviving values in increasing order.
    pub fn extract_candidates(&self) -> impl Iterator<Item = u64> + '_ {
        let lo = self.bounds.map_or(0, |b| b.lo);
        self.bits.iter_ones().map(move |i| lo + 2 * i as u64)
    }
}
