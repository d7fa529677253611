use std::fmt;
use std::num::NonZeroUsize;
use std::thread;

use tracing::debug;

use crate::aggregate::{self, DEFAULT_TAIL_LEN};
use crate::base::{generate_seeds, isqrt};
use crate::error::SieveError;
use crate::scheduler::{self, Partition};

/// Largest supported N. Locating the first odd multiple of a seed p above a
/// segment start can look up to 2p past N, and p < 2^32.
pub const MAX_LIMIT: u64 = u64::MAX - (1 << 33);

/// 32KB segment buffer: fits in L1 data cache on virtually all x86/ARM.
pub const DEFAULT_SEGMENT_BYTES: usize = 32 * 1024;

/// Odd positions per segment at the default size (one bit each).
pub const DEFAULT_SEGMENT_SPAN: usize = DEFAULT_SEGMENT_BYTES * 8;

/// How segments are distributed. Has no effect on the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One reused segment buffer, segments in increasing order, no threads.
    Sequential,
    /// Scoped worker threads claiming segments from a shared atomic cursor.
    Parallel { workers: NonZeroUsize },
}

impl Strategy {
    /// Parallel across every available core, or sequential on a single core.
    pub fn detect() -> Self {
        match thread::available_parallelism() {
            Ok(workers) if workers.get() > 1 => Strategy::Parallel { workers },
            _ => Strategy::Sequential,
        }
    }

    /// Parallel with `workers` threads; zero means "detect".
    pub fn parallel(workers: usize) -> Self {
        NonZeroUsize::new(workers).map_or_else(Self::detect, |workers| Strategy::Parallel { workers })
    }

    pub fn workers(&self) -> NonZeroUsize {
        match self {
            Strategy::Sequential => NonZeroUsize::MIN,
            Strategy::Parallel { workers } => *workers,
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::detect()
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Sequential => write!(f, "sequential"),
            Strategy::Parallel { workers } => write!(f, "parallel({})", workers),
        }
    }
}

/// Run configuration, resolved once before the sieve starts.
///
/// None of these settings change the result, only how it is computed and
/// how much of it is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SieveConfig {
    /// Odd positions per segment.
    pub segment_span: usize,
    pub strategy: Strategy,
    /// K: how many of the largest primes to return.
    pub tail_len: usize,
    /// Also return every prime ≤ N in order.
    pub enumerate: bool,
}

impl Default for SieveConfig {
    fn default() -> Self {
        SieveConfig {
            segment_span: DEFAULT_SEGMENT_SPAN,
            strategy: Strategy::detect(),
            tail_len: DEFAULT_TAIL_LEN,
            enumerate: false,
        }
    }
}

impl SieveConfig {
    pub fn sequential() -> Self {
        SieveConfig {
            strategy: Strategy::Sequential,
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_segment_span(mut self, span: usize) -> Self {
        self.segment_span = span;
        self
    }

    /// Segment size in bytes of bit buffer; each byte covers 8 odd numbers.
    pub fn with_segment_bytes(mut self, bytes: usize) -> Self {
        self.segment_span = bytes * 8;
        self
    }

    pub fn with_tail_len(mut self, k: usize) -> Self {
        self.tail_len = k;
        self
    }

    pub fn with_enumeration(mut self, enumerate: bool) -> Self {
        self.enumerate = enumerate;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SieveResult {
    pub limit: u64,
    /// π(N).
    pub count: u64,
    /// The largest min(K, count) primes ≤ N, increasing.
    pub tail: Vec<u64>,
    /// Every prime ≤ N, increasing; only with enumeration on.
    pub primes: Option<Vec<u64>>,
    pub strategy: Strategy,
    /// Segments sieved in the parallel phase.
    pub segments: u64,
    /// Times the tail window had to double.
    pub tail_widenings: u32,
}

impl SieveResult {
    fn empty(limit: u64, config: &SieveConfig) -> Self {
        SieveResult {
            limit,
            count: 0,
            tail: vec![],
            primes: config.enumerate.then(Vec::new),
            strategy: config.strategy,
            segments: 0,
            tail_widenings: 0,
        }
    }
}

/// Count the primes ≤ `limit` and find the largest `config.tail_len` of them.
///
/// 1. Seed primes ≤ ⌊√N⌋ from the plain odd-only sieve
/// 2. Segmented phase over the odd numbers of (√N, N], sequential or
///    parallel per `config.strategy`
/// 3. Count = head primes (2 and the seeds) + segment counts
/// 4. Ordered tail scan near N for the last K primes
///
/// N < 2 is not an error and yields a zero count. Fails only when a worker
/// cannot be spawned, a worker panics, or a buffer cannot be allocated.
///
/// # Panics
/// Panics if `limit > MAX_LIMIT` or the segment span is zero.
pub fn sieve(limit: u64, config: &SieveConfig) -> Result<SieveResult, SieveError> {
    assert!(limit <= MAX_LIMIT, "limit {} exceeds MAX_LIMIT {}", limit, MAX_LIMIT);
    assert!(config.segment_span > 0, "segment span must be positive");

    if limit < 2 {
        return Ok(SieveResult::empty(limit, config));
    }

    let root = isqrt(limit);
    let seeds = generate_seeds(root)?;
    let head = aggregate::head_primes(limit, &seeds);
    debug!(limit, root, seeds = seeds.len(), "generated seed primes");

    let partition = Partition::new(limit, root, config.segment_span);
    let outcome = scheduler::run(&partition, &seeds, config.strategy.workers(), config.enumerate)?;
    let count = aggregate::total_count(&head, &outcome);

    let tail = aggregate::scan_tail(limit, config.tail_len, &head, &seeds, &partition)?;
    debug!(
        limit,
        count,
        window_lo = tail.window_lo,
        widenings = tail.widenings,
        "tail scan complete"
    );

    let primes = outcome
        .primes
        .map(|segmented| aggregate::assemble_enumeration(&head, segmented));
    debug_assert!(primes.as_ref().is_none_or(|p| p.len() as u64 == count));

    Ok(SieveResult {
        limit,
        count,
        tail: tail.primes,
        primes,
        strategy: config.strategy,
        segments: outcome.segments,
        tail_widenings: tail.widenings,
    })
}
