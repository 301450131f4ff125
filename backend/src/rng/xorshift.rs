//! xorshift64* random number generator
//!
//! This is a fast, high-quality PRNG that is deterministic and suitable
//! for simulation purposes.
//!
//! # Algorithm
//!
//! xorshift64* is a variant of xorshift that passes TestU01's BigCrush
//! statistical tests. It uses 64-bit state and produces 64-bit output.
//!
//! # Determinism
//!
//! Same seed → same sequence of random numbers. Every consumer in the
//! simulator (population generators, backup strategies, failure timers)
//! owns its own stream, derived from the master seed with
//! [`RngManager::for_stream`], so draw order inside a stream depends only
//! on event order.

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use queue_simulator_core_rs::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let value = rng.next();
/// let gap = rng.exponential(2.0); // mean 0.5
/// assert!(gap > 0.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    /// Internal state (64-bit)
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    ///
    /// # Example
    /// ```
    /// use queue_simulator_core_rs::RngManager;
    ///
    /// let rng = RngManager::new(12345);
    /// ```
    pub fn new(seed: u64) -> Self {
        // Ensure seed is never zero (xorshift requirement)
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Create an independent stream derived from a master seed.
    ///
    /// The stream id is mixed into the seed with splitmix64 so that nearby
    /// ids yield uncorrelated starting states.
    ///
    /// # Example
    /// ```
    /// use queue_simulator_core_rs::RngManager;
    ///
    /// let mut a = RngManager::for_stream(42, 0);
    /// let mut b = RngManager::for_stream(42, 1);
    /// assert_ne!(a.next(), b.next());
    /// ```
    pub fn for_stream(master_seed: u64, stream: u64) -> Self {
        let mixed = splitmix64(master_seed ^ splitmix64(stream.wrapping_add(0x9E37_79B9_7F4A_7C15)));
        Self::new(mixed)
    }

    /// Generate next random u64 value
    pub fn next(&mut self) -> u64 {
        // xorshift64* algorithm
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Get current RNG state
    pub fn get_state(&self) -> u64 {
        self.state
    }

    /// Generate random f64 in range [0.0, 1.0)
    ///
    /// # Example
    /// ```
    /// use queue_simulator_core_rs::RngManager;
    ///
    /// let mut rng = RngManager::new(12345);
    /// let probability = rng.next_f64();
    /// assert!(probability >= 0.0 && probability < 1.0);
    /// ```
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        // Convert to [0.0, 1.0) by dividing by 2^53
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Sample an exponential variate with the given rate (mean `1 / rate`).
    ///
    /// Uses inversion on `(0, 1]` so the result is always finite and
    /// non-negative.
    ///
    /// # Panics
    /// Panics if `rate` is not strictly positive. Callers validate rates at
    /// configuration time.
    pub fn exponential(&mut self, rate: f64) -> f64 {
        assert!(rate > 0.0, "rate must be positive");
        let u = 1.0 - self.next_f64();
        -u.ln() / rate
    }

    /// Sample a uniform variate in `[min, max)`.
    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_f64()
    }

    /// Bernoulli trial: `true` with probability `p`.
    ///
    /// Always consumes exactly one draw, including for `p = 0` and `p = 1`,
    /// so the stream position does not depend on the parameter.
    pub fn bernoulli(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// splitmix64 finalizer, used for stream derivation
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
