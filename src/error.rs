use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

/// Fatal failures of a sieve run.
///
/// Only resource exhaustion is reported here. Degenerate input (N < 2) is a
/// normal result, and malformed segment bounds are contract violations that
/// trip assertions instead.
#[derive(Debug, Error)]
pub enum SieveError {
    #[error("failed to allocate a sieve buffer of {bits} bits")]
    Allocation {
        bits: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("failed to spawn sieve worker {worker}")]
    WorkerSpawn {
        worker: usize,
        #[source]
        source: io::Error,
    },

    #[error("sieve worker {worker} panicked")]
    WorkerPanicked { worker: usize },
}
