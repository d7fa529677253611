use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use tracing::{debug, trace};

use crate::error::SieveError;
use crate::segment::{Segment, SegmentBounds};

/// Split of the odd numbers in (root, limit] into fixed-span segments.
///
/// Offsets are measured in odd positions from `first_lo`, the first odd
/// number above `root`. Segment k covers offsets `[k·span, (k+1)·span)`, the
/// last one truncated at `limit`, so the segments tile the range without gaps
/// or overlaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    first_lo: u64,
    total_odds: u64,
    span: u64,
}

impl Partition {
    pub fn new(limit: u64, root: u64, span: usize) -> Self {
        assert!(span > 0, "segment span must be positive");
        let first_lo = (root + 1) | 1; // first odd above root
        let total_odds = if limit >= first_lo {
            (limit - first_lo) / 2 + 1
        } else {
            0
        };
        Partition {
            first_lo,
            total_odds,
            span: span as u64,
        }
    }

    #[inline]
    pub fn first_lo(&self) -> u64 {
        self.first_lo
    }

    /// Odd numbers in the segmented range.
    #[inline]
    pub fn total_odds(&self) -> u64 {
        self.total_odds
    }

    #[inline]
    pub fn span(&self) -> usize {
        self.span as usize
    }

    pub fn segment_count(&self) -> u64 {
        self.total_odds.div_ceil(self.span)
    }

    /// Segment starting `offset` odd positions past `first_lo`, or `None`
    /// once the offset is past the end of the range.
    pub fn segment_at(&self, offset: u64) -> Option<SegmentBounds> {
        if offset >= self.total_odds {
            return None;
        }
        let lo = self.first_lo + 2 * offset;
        let len = self.span.min(self.total_odds - offset);
        Some(SegmentBounds::from_odd_run(lo, len))
    }
}

/// What one worker produced after the cursor ran dry.
#[derive(Debug, Default)]
struct WorkerOutput {
    count: u64,
    segments: u64,
    // (offset, primes) per segment, only filled when enumerating
    primes: Vec<(u64, Vec<u64>)>,
}

/// Merged result of the segmented phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleOutcome {
    /// Primes found in the segmented range (seeds excluded).
    pub count: u64,
    pub segments: u64,
    /// Private count of each worker, in worker order.
    pub worker_counts: Vec<u64>,
    /// Every prime in the segmented range in increasing order, when requested.
    pub primes: Option<Vec<u64>>,
}

/// Sieve every segment of `partition` against `seeds`.
///
/// Workers claim segments on demand from one shared cursor with an atomic
/// fetch-add, so no two workers see the same offset and none is skipped.
/// Each worker owns its segment buffer and running count; counts are merged
/// only after every worker has joined. A single worker runs in the calling
/// thread as plain sequential iteration.
///
/// A worker that cannot be spawned or that panics fails the whole run.
pub fn run(
    partition: &Partition,
    seeds: &[u64],
    workers: NonZeroUsize,
    enumerate: bool,
) -> Result<ScheduleOutcome, SieveError> {
    let cursor = AtomicU64::new(0);

    debug!(
        first_lo = partition.first_lo(),
        odds = partition.total_odds(),
        span = partition.span(),
        segments = partition.segment_count(),
        workers = workers.get(),
        "partitioned segmented range"
    );

    let outputs = if workers.get() == 1 {
        vec![drain(0, partition, seeds, &cursor, enumerate)?]
    } else {
        let cursor = &cursor;
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers.get());
            let mut spawn_error = None;
            for worker in 0..workers.get() {
                let spawned = thread::Builder::new()
                    .name(format!("sieve-worker-{worker}"))
                    .spawn_scoped(scope, move || {
                        drain(worker, partition, seeds, cursor, enumerate)
                    });
                match spawned {
                    Ok(handle) => handles.push((worker, handle)),
                    Err(source) => {
                        halt(partition, cursor);
                        spawn_error = Some(SieveError::WorkerSpawn { worker, source });
                        break;
                    }
                }
            }

            let joined = handles
                .into_iter()
                .map(|(worker, handle)| (worker, handle.join()));
            collect_outputs(joined, spawn_error)
        })?
    };

    Ok(merge(outputs, enumerate))
}

/// Move the cursor past the end so running workers stop at their next claim.
fn halt(partition: &Partition, cursor: &AtomicU64) {
    cursor.fetch_max(partition.total_odds(), Ordering::Relaxed);
}

/// Consume every join result, then report the first failure if there was one.
///
/// A failure already recorded (a spawn error) takes precedence over anything
/// the joined workers report.
fn collect_outputs<I>(joined: I, first_error: Option<SieveError>) -> Result<Vec<WorkerOutput>, SieveError>
where
    I: IntoIterator<Item = (usize, thread::Result<Result<WorkerOutput, SieveError>>)>,
{
    let mut first_error = first_error;
    let mut outputs = Vec::new();
    for (worker, result) in joined {
        match result {
            Ok(Ok(output)) => outputs.push(output),
            Ok(Err(err)) => {
                first_error.get_or_insert(err);
            }
            Err(_) => {
                first_error.get_or_insert(SieveError::WorkerPanicked { worker });
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(outputs),
    }
}

/// Claim and sieve segments until the cursor passes the end of the range.
fn drain(
    worker: usize,
    partition: &Partition,
    seeds: &[u64],
    cursor: &AtomicU64,
    enumerate: bool,
) -> Result<WorkerOutput, SieveError> {
    let mut segment = match Segment::with_span(partition.span()) {
        Ok(segment) => segment,
        Err(err) => {
            halt(partition, cursor);
            return Err(err);
        }
    };
    let mut output = WorkerOutput::default();
    let step = partition.span() as u64;

    loop {
        let offset = cursor.fetch_add(step, Ordering::Relaxed);
        let Some(bounds) = partition.segment_at(offset) else {
            break;
        };
        trace!(worker, lo = bounds.lo, hi = bounds.hi, "claimed segment");

        segment.initialize(bounds);
        segment.sieve_against(seeds);
        output.count += segment.count_candidates();
        output.segments += 1;

        if enumerate {
            output.primes.push((offset, segment.extract_candidates().collect()));
        }
    }

    debug!(worker, segments = output.segments, count = output.count, "worker finished");
    Ok(output)
}

fn merge(outputs: Vec<WorkerOutput>, enumerate: bool) -> ScheduleOutcome {
    let worker_counts: Vec<u64> = outputs.iter().map(|o| o.count).collect();
    let count = worker_counts.iter().sum();
    let segments = outputs.iter().map(|o| o.segments).sum();

    let primes = enumerate.then(|| {
        let mut batches: Vec<(u64, Vec<u64>)> =
            outputs.into_iter().flat_map(|o| o.primes).collect();
        // segments finish in any order; offsets restore numeric order
        batches.sort_unstable_by_key(|(offset, _)| *offset);
        batches.into_iter().flat_map(|(_, primes)| primes).collect()
    });

    ScheduleOutcome {
        count,
        segments,
        worker_counts,
        primes,
    }
}
