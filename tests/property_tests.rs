//! Property-based tests for the segmented sieve.
//!
//! Every result is checked against GMP's Miller-Rabin (`rug`) rather than
//! against another sieve, so a shared indexing bug cannot hide.
//!
//! ```bash
//! cargo test --test property_tests
//! PROPTEST_CASES=1000 cargo test --test property_tests
//! ```

use std::num::NonZeroUsize;

use proptest::prelude::*;
use rug::Integer;
use rug::integer::IsPrime;

use segsieve::base::generate_seeds;
use segsieve::{SieveConfig, Strategy, sieve};

fn gmp_is_prime(n: u64) -> bool {
    Integer::from(n).is_probably_prime(30) != IsPrime::No
}

fn gmp_primes_up_to(limit: u64) -> Vec<u64> {
    (2..=limit).filter(|&n| gmp_is_prime(n)).collect()
}

fn strategy_for(workers: usize) -> Strategy {
    match NonZeroUsize::new(workers) {
        None => Strategy::Sequential,
        Some(workers) => Strategy::Parallel { workers },
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The whole enumeration, and therefore the count and tail, matches GMP.
    #[test]
    fn prop_enumeration_matches_gmp(
        limit in 0u64..20_000,
        span in 1usize..2_000,
        workers in 0usize..4,
    ) {
        let config = SieveConfig::default()
            .with_strategy(strategy_for(workers))
            .with_segment_span(span)
            .with_enumeration(true);
        let result = sieve(limit, &config).unwrap();
        let expected = gmp_primes_up_to(limit);

        prop_assert_eq!(result.count, expected.len() as u64);
        prop_assert_eq!(result.primes.as_deref(), Some(expected.as_slice()));
    }

    /// Strategy, worker count and segment size never change the answer.
    #[test]
    fn prop_result_independent_of_partitioning(
        limit in 2u64..300_000,
        span_a in 1usize..5_000,
        span_b in 1usize..5_000,
        workers in 1usize..6,
    ) {
        let sequential = sieve(limit, &SieveConfig::sequential().with_segment_span(span_a)).unwrap();
        let parallel = sieve(
            limit,
            &SieveConfig::default()
                .with_strategy(strategy_for(workers))
                .with_segment_span(span_b),
        )
        .unwrap();

        prop_assert_eq!(sequential.count, parallel.count);
        prop_assert_eq!(sequential.tail, parallel.tail);
    }

    /// The tail holds the min(K, π(N)) largest primes ≤ N, increasing, with
    /// no prime skipped between its last element and N.
    #[test]
    fn prop_tail_is_largest_primes(
        limit in 0u64..2_000_000,
        k in 0usize..60,
    ) {
        let result = sieve(limit, &SieveConfig::default().with_tail_len(k)).unwrap();
        let tail = &result.tail;

        prop_assert_eq!(tail.len() as u64, (k as u64).min(result.count));
        prop_assert!(tail.windows(2).all(|w| w[0] < w[1]));
        for &p in tail {
            prop_assert!(p <= limit);
            prop_assert!(gmp_is_prime(p), "{} is not prime", p);
        }
        if let Some(&last) = tail.last() {
            prop_assert!(!(last + 1..=limit).any(gmp_is_prime));
        }
        // consecutive: no prime strictly between two tail elements
        for pair in tail.windows(2) {
            prop_assert!(!(pair[0] + 1..pair[1]).any(gmp_is_prime));
        }
    }

    /// Seed primes are exactly the primes ≤ the seed limit.
    #[test]
    fn prop_seeds_match_gmp(limit in 0u64..50_000) {
        prop_assert_eq!(generate_seeds(limit).unwrap(), gmp_primes_up_to(limit));
    }

    /// Running twice with the same configuration gives identical results.
    #[test]
    fn prop_idempotent(limit in 0u64..500_000, workers in 0usize..5) {
        let config = SieveConfig::default().with_strategy(strategy_for(workers));
        prop_assert_eq!(sieve(limit, &config).unwrap(), sieve(limit, &config).unwrap());
    }
}

#[test]
fn segment_boundaries_on_prime_squares() {
    // limits and spans chosen so segment edges land on p² and on primes
    for limit in [9, 25, 49, 121, 169, 289, 361, 529, 841, 961, 1_369] {
        for span in [1, 2, 3, 5, 7, 8] {
            let config = SieveConfig::sequential()
                .with_segment_span(span)
                .with_enumeration(true);
            let result = sieve(limit, &config).unwrap();
            assert_eq!(
                result.primes.unwrap(),
                gmp_primes_up_to(limit),
                "limit={} span={}",
                limit,
                span
            );
        }
    }
}
