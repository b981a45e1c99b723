//! Leaf collaborators of the game: the puzzle number generator and the factorizer.

use rand::Rng;

/// Uniform integer in `[low, high]` inclusive.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, low: u32, high: u32) -> u32 {
  debug_assert!(low <= high);
  rng.gen_range(low..=high)
}

/// Prime factorization by trial division, ascending with multiplicity.
/// Returns an empty vector for `n < 2`, which has no factorization.
pub fn factorize(mut n: u32) -> Vec<u32> {
  let mut factors = Vec::new();
  if n < 2 {
    return factors;
  }
  while n % 2 == 0 {
    factors.push(2);
    n /= 2;
  }
  let mut d = 3u32;
  while u64::from(d) * u64::from(d) <= u64::from(n) {
    while n % d == 0 {
      factors.push(d);
      n /= d;
    }
    d += 2;
  }
  if n > 1 {
    factors.push(n);
  }
  factors
}

/// Trial-division primality; callers keep `n` small, the loop bound never overflows.
pub fn is_prime(n: i64) -> bool {
  if n < 2 {
    return false;
  }
  if n % 2 == 0 {
    return n == 2;
  }
  let mut d = 3i64;
  while d <= n / d {
    if n % d == 0 {
      return false;
    }
    d += 2;
  }
  true
}
