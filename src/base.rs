use crate::bits::BitSet;
use crate::error::SieveError;

/// Largest seed limit the odd-only base sieve is sized for (⌊√u64::MAX⌋ + 1).
pub const MAX_SEED_LIMIT: u64 = 1 << 32;

/// Integer square root, overflow-safe for all u64 values.
#[inline]
pub fn isqrt(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut x = (n as f64).sqrt() as u64;
    while x > 0 && x.checked_mul(x).is_none_or(|sq| sq > n) {
        x -= 1;
    }
    while (x + 1).checked_mul(x + 1).is_some_and(|sq| sq <= n) {
        x += 1;
    }
    x
}

/// Upper bound on π(n) for pre-allocation.
///
/// Rosser–Schoenfeld: π(x) < 1.25506·x / ln x for every x > 1.
#[inline]
pub fn prime_count_upper(n: u64) -> usize {
    if n < 10 {
        return 4;
    }
    let nf = n as f64;
    (1.25506 * nf / nf.ln()) as usize + 1
}

/// Seed primes: every prime ≤ `limit` in increasing order.
///
/// Plain (non-segmented) odd-only bit-packed sieve.
/// - Index mapping: bit i represents 2·i + 1, so bit 0 (the number 1) is
///   cleared before harvest
/// - The odd multiples of p = 2i + 1 start at p² whose index is 2i(i + 1),
///   and consecutive odd multiples are exactly p indices apart
/// - Memory: ⌊(limit + 1) / 2⌋ bits
///
/// Sized for `limit` ≤ `MAX_SEED_LIMIT`, which covers every N in u64.
pub fn generate_seeds(limit: u64) -> Result<Vec<u64>, SieveError> {
    debug_assert!(limit <= MAX_SEED_LIMIT, "seed limit {} too large", limit);

    if limit < 2 {
        return Ok(vec![]);
    }
    if limit == 2 {
        return Ok(vec![2]);
    }

    let positions = ((limit + 1) / 2) as usize;
    let mut bits = BitSet::new_all_set(positions)?;
    bits.clear(0); // 1 is not prime

    let last_root_idx = ((isqrt(limit) - 1) / 2) as usize;
    for i in 1..=last_root_idx {
        if bits.test(i) {
            let p = 2 * i + 1;
            bits.clear_stride(2 * i * (i + 1), p);
        }
    }

    let mut primes = Vec::with_capacity(prime_count_upper(limit));
    primes.push(2);
    primes.extend(bits.iter_ones().map(|i| 2 * i as u64 + 1));
    Ok(primes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial_division(limit: u64) -> Vec<u64> {
        (2..=limit)
            .filter(|&n| (2..n).take_while(|d| d * d <= n).all(|d| n % d != 0))
            .collect()
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(3), 1);
        assert_eq!(isqrt(4), 2);
        assert_eq!(isqrt(99), 9);
        assert_eq!(isqrt(100), 10);
        assert_eq!(isqrt(1_000_000_000), 31_622);
        assert_eq!(isqrt(u64::MAX), 4_294_967_295);
        assert_eq!(isqrt(1 << 52), 1 << 26);
        assert_eq!(isqrt((1 << 52) - 1), (1 << 26) - 1);
    }

    #[test]
    fn test_seed_edge_cases() {
        assert_eq!(generate_seeds(0).unwrap(), Vec::<u64>::new());
        assert_eq!(generate_seeds(1).unwrap(), Vec::<u64>::new());
        assert_eq!(generate_seeds(2).unwrap(), vec![2]);
        assert_eq!(generate_seeds(3).unwrap(), vec![2, 3]);
        assert_eq!(generate_seeds(4).unwrap(), vec![2, 3]);
        assert_eq!(generate_seeds(9).unwrap(), vec![2, 3, 5, 7]);
        assert_eq!(generate_seeds(10).unwrap(), vec![2, 3, 5, 7]);
        assert_eq!(generate_seeds(11).unwrap(), vec![2, 3, 5, 7, 11]);
    }

    #[test]
    fn test_seeds_match_trial_division() {
        for limit in 0..600 {
            assert_eq!(
                generate_seeds(limit).unwrap(),
                trial_division(limit),
                "Mismatch at limit={}",
                limit
            );
        }
    }

    #[test]
    fn test_seed_counts() {
        assert_eq!(generate_seeds(100).unwrap().len(), 25);
        assert_eq!(generate_seeds(1_000).unwrap().len(), 168);
        assert_eq!(generate_seeds(31_622).unwrap().len(), 3_401);
        assert_eq!(generate_seeds(65_536).unwrap().len(), 6_542);
    }

    #[test]
    fn test_prime_count_upper_is_an_upper_bound() {
        let primes = generate_seeds(200_000).unwrap();
        let mut pi = 0;
        for limit in 0..=200_000_u64 {
            if primes.get(pi) == Some(&limit) {
                pi += 1;
            }
            assert!(prime_count_upper(limit) >= pi, "π({}) = {} > {}", limit, pi, prime_count_upper(limit));
        }
        assert_eq!(prime_count_upper(1_000), 182);
    }
}
