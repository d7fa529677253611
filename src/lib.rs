//! Segmented, bit-packed Sieve of Eratosthenes.
//!
//! Counts the primes ≤ N and returns the K largest of them, for N up to
//! [`MAX_LIMIT`] in bounded memory:
//!
//! - `base`: seed primes ≤ √N from a plain odd-only sieve
//! - `segment`: cache-sized windows of odd numbers struck against the seeds
//! - `scheduler`: segments claimed from a shared atomic cursor by scoped workers
//! - `aggregate`: count reduction and the ordered tail scan for the last K
//! - `engine`: the `sieve` entry point and its `Strategy` / `SieveConfig`
//!
//! Every set bit means "still a candidate"; bit i of a segment starting at
//! `lo` is the odd number `lo + 2·i`.

pub mod aggregate;
pub mod base;
pub mod bits;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod segment;
pub mod storage;
pub mod verify;

pub use engine::{
    DEFAULT_SEGMENT_BYTES, DEFAULT_SEGMENT_SPAN, MAX_LIMIT, SieveConfig, SieveResult, Strategy, sieve,
};
pub use error::SieveError;
