use crate::config::FetchConfig;
use rand::Rng;
use std::time::Duration;

/// Exponential backoff with bounded additive jitter
///
/// The delay before retry `n` (1-based) is `base * 2^(n-1)` plus a jitter drawn from
/// `[0, nominal * jitter_ratio)`, capped at `max`. The ratio is clamped to at most 0.5, so
/// the largest possible delay for retry `n` is below the smallest possible delay for retry
/// `n + 1` until the cap is reached.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    jitter_ratio: f64,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration, jitter_ratio: f64) -> Self {
        Self {
            base,
            max,
            jitter_ratio: jitter_ratio.clamp(0.0, 0.5),
        }
    }

    /// Creates a backoff policy from the fetch configuration
    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(
            Duration::from_millis(config.backoff_base_ms),
            Duration::from_millis(config.backoff_max_ms),
            config.jitter_ratio,
        )
    }

    /// Returns the delay before retry `retry` without jitter (uncapped)
    pub fn nominal(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(20);
        self.base.saturating_mul(1u32 << exponent)
    }

    /// Returns the capped delay for `retry` given a jitter sample in `[0, 1)`
    ///
    /// # Arguments
    ///
    /// * `retry` - The 1-based retry number (the delay before attempt `retry + 1`)
    /// * `unit` - Jitter position within the allowed band
    pub fn delay_with_jitter(&self, retry: u32, unit: f64) -> Duration {
        let nominal = self.nominal(retry);
        let jitter = nominal.mul_f64(self.jitter_ratio * unit.clamp(0.0, 1.0));
        (nominal + jitter).min(self.max)
    }

    /// Returns the capped, randomly jittered delay for `retry`
    pub fn delay<R: Rng + ?Sized>(&self, retry: u32, rng: &mut R) -> Duration {
        let unit: f64 = rng.gen_range(0.0..1.0);
        self.delay_with_jitter(retry, unit)
    }

    pub fn max(&self) -> Duration {
        self.max
    }
}
