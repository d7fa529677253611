use rug::Integer;
use rug::integer::IsPrime;
use thiserror::Error;

/// Miller-Rabin rounds for the GMP probable-prime check.
pub const MR_ROUNDS: u32 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("tail is not strictly increasing at {previous} -> {next}")]
    OutOfOrder { previous: u64, next: u64 },

    #[error("{value} exceeds the limit {limit}")]
    AboveLimit { value: u64, limit: u64 },

    #[error("{0} is composite")]
    Composite(u64),

    #[error("missed prime {missed} between {last} and the limit")]
    MissedPrime { last: u64, missed: u64 },
}

/// Probable-prime test through GMP, independent of the sieve.
pub fn is_probable_prime(n: u64) -> bool {
    Integer::from(n).is_probably_prime(MR_ROUNDS) != IsPrime::No
}

/// Check a last-K list against GMP.
///
/// - strictly increasing and every element ≤ `limit`
/// - every element is a probable prime
/// - no probable prime lies between the last element and `limit`
///
/// An empty tail is accepted only when there is no prime ≤ `limit` at all.
pub fn verify_tail(limit: u64, tail: &[u64]) -> Result<(), VerifyError> {
    for pair in tail.windows(2) {
        if pair[0] >= pair[1] {
            return Err(VerifyError::OutOfOrder {
                previous: pair[0],
                next: pair[1],
            });
        }
    }

    for &value in tail {
        if value > limit {
            return Err(VerifyError::AboveLimit { value, limit });
        }
        if !is_probable_prime(value) {
            return Err(VerifyError::Composite(value));
        }
    }

    let last = tail.last().copied().unwrap_or(1);
    if let Some(missed) = (last + 1..=limit).find(|&n| is_probable_prime(n)) {
        return Err(VerifyError::MissedPrime { last, missed });
    }

    Ok(())
}
