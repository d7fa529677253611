use std::collections::VecDeque;

use tracing::debug;

use crate::error::SieveError;
use crate::scheduler::{Partition, ScheduleOutcome};
use crate::segment::{Segment, SegmentBounds};

pub const DEFAULT_TAIL_LEN: usize = 5;

/// Odd positions sieved per pass of the tail scan.
const TAIL_SCAN_SPAN: u64 = 1 << 15;

/// Fixed-capacity buffer holding the last `capacity` values pushed.
///
/// Values must arrive in increasing order; the ring then always holds the
/// largest ones seen, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailRing {
    values: VecDeque<u64>,
    capacity: usize,
}

impl TailRing {
    pub fn new(capacity: usize) -> Self {
        TailRing {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: u64) {
        debug_assert!(
            self.values.back().is_none_or(|&last| last < value),
            "TailRing values out of order: {:?} then {}",
            self.values.back(),
            value
        );
        if self.capacity == 0 {
            return;
        }
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn into_vec(self) -> Vec<u64> {
        self.values.into()
    }
}

impl Extend<u64> for TailRing {
    fn extend<I: IntoIterator<Item = u64>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

/// Every prime below the segmented range: 2 and the seed primes.
///
/// The seed list already starts with 2 once √N ≥ 2; for N = 2 or 3 it is
/// empty and 2 is supplied here.
pub fn head_primes(limit: u64, seeds: &[u64]) -> Vec<u64> {
    if limit < 2 {
        return vec![];
    }
    if seeds.is_empty() {
        return vec![2];
    }
    seeds.to_vec()
}

/// π(N): head primes plus every worker's private count.
pub fn total_count(head: &[u64], outcome: &ScheduleOutcome) -> u64 {
    head.len() as u64 + outcome.count
}

/// Full ordered enumeration: head primes followed by the segmented range.
pub fn assemble_enumeration(head: &[u64], segmented: Vec<u64>) -> Vec<u64> {
    let mut primes = Vec::with_capacity(head.len() + segmented.len());
    primes.extend_from_slice(head);
    primes.extend(segmented);
    primes
}

/// Initial tail window width in integers: a few times K·ln N, which by prime
/// density holds well over K primes for any N large enough to have them.
pub fn default_window(limit: u64, k: usize) -> u64 {
    let ln = (limit.max(2) as f64).ln().ceil() as u64;
    8 * k as u64 * ln + 64
}

/// Outcome of the ordered tail scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailScan {
    /// The largest min(K, π(N)) primes ≤ N, increasing.
    pub primes: Vec<u64>,
    /// Lowest value covered by the final window.
    pub window_lo: u64,
    /// How many times the window had to double before K primes were found.
    pub widenings: u32,
}

/// Recover the K largest primes ≤ `limit` by sieving a window just below
/// `limit` in increasing order, starting from `default_window`.
pub fn scan_tail(
    limit: u64,
    k: usize,
    head: &[u64],
    seeds: &[u64],
    partition: &Partition,
) -> Result<TailScan, SieveError> {
    scan_tail_from(limit, k, head, seeds, partition, default_window(limit, k))
}

/// Tail scan with an explicit initial window width.
///
/// The window doubles until it holds K primes. Once it reaches the first
/// segment, the head primes are included as well, which covers the whole
/// prime sequence from 2, so the scan always terminates.
pub fn scan_tail_from(
    limit: u64,
    k: usize,
    head: &[u64],
    seeds: &[u64],
    partition: &Partition,
    initial_width: u64,
) -> Result<TailScan, SieveError> {
    let mut width = initial_width.max(1);
    let mut widenings = 0;

    loop {
        let mut ring = TailRing::new(k);

        // an empty window over a non-empty range is just too narrow
        let window = odd_window(limit, width, partition);
        let covers_range = partition.total_odds() == 0
            || window.is_some_and(|b| b.lo <= partition.first_lo());
        if covers_range {
            ring.extend(head.iter().copied());
        }
        if let Some(bounds) = window {
            sieve_window(bounds, seeds, &mut ring)?;
        }

        if ring.is_full() || covers_range {
            let window_lo = match window {
                Some(bounds) if !covers_range => bounds.lo,
                None if !covers_range => limit,
                _ => head.first().copied().unwrap_or(partition.first_lo()),
            };
            return Ok(TailScan {
                primes: ring.into_vec(),
                window_lo,
                widenings,
            });
        }

        widenings += 1;
        width = width.saturating_mul(2);
        debug!(limit, width, found = ring.len(), k, "widening tail window");
    }
}

/// Odd numbers of the segmented range within `width` of `limit`.
fn odd_window(limit: u64, width: u64, partition: &Partition) -> Option<SegmentBounds> {
    if partition.total_odds() == 0 {
        return None;
    }
    let first_lo = partition.first_lo();
    let lo = (limit.saturating_sub(width.saturating_sub(1)).max(first_lo)) | 1;
    let hi = if limit % 2 == 1 { limit } else { limit - 1 };
    (lo <= hi).then(|| SegmentBounds::new(lo, hi))
}

/// Sieve `bounds` in increasing order, pushing every survivor into `ring`.
fn sieve_window(bounds: SegmentBounds, seeds: &[u64], ring: &mut TailRing) -> Result<(), SieveError> {
    let odds = bounds.len() as u64;
    let mut segment = Segment::with_span(odds.min(TAIL_SCAN_SPAN) as usize)?;

    let mut offset = 0;
    while offset < odds {
        let len = (odds - offset).min(TAIL_SCAN_SPAN);
        segment.initialize(SegmentBounds::from_odd_run(bounds.lo + 2 * offset, len));
        segment.sieve_against(seeds);
        ring.extend(segment.extract_candidates());
        offset += len;
    }
    Ok(())
}
