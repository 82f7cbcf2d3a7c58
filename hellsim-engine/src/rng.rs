//! Random draw primitive and per-trial generator.
//!
//! Every stochastic decision in a trial goes through [`draw`] (or its
//! fractional-bound sibling [`draw_frac`]) against the trial's own
//! [`TrialRng`]. Trials never share a generator: each one is seeded from the
//! batch seed and its trial id, so a batch run with a fixed seed is
//! reproducible and two batches with entropy seeds are independent.

use hmac::{Hmac, Mac};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use sha2::Sha256;

use crate::constants::ENCOUNTER_ROLL;
use crate::numbers::{floor_f64_to_i64, i64_to_f64};

type HmacSha256 = Hmac<Sha256>;

/// Uniform integer in `[min, max)`, computed as `floor(u * (max - min)) + min`.
///
/// An empty range (`max == min`) always yields `min`. The formula is applied
/// as-is for inverted ranges too, which keeps callers such as
/// `draw(0, wounded)` well defined when the bound is zero.
pub fn draw<R: Rng + ?Sized>(rng: &mut R, min: i64, max: i64) -> i64 {
    let width = i64_to_f64(max.saturating_sub(min));
    floor_f64_to_i64(rng.r#gen::<f64>() * width).saturating_add(min)
}

/// Same formula as [`draw`] with a non-integer upper bound.
///
/// `draw_frac(0, 2.25)` yields 0 and 1 with probability `1/2.25` each and 2
/// with the remaining `0.25/2.25`.
pub fn draw_frac<R: Rng + ?Sized>(rng: &mut R, min: i64, max: f64) -> i64 {
    let width = max - i64_to_f64(min);
    floor_f64_to_i64(rng.r#gen::<f64>() * width).saturating_add(min)
}

/// Derive the generator seed for one trial of a batch.
#[must_use]
pub fn derive_trial_seed(batch_seed: u64, trial_id: u64) -> u64 {
    let Ok(mut mac) = HmacSha256::new_from_slice(&batch_seed.to_le_bytes()) else {
        return batch_seed.rotate_left(17) ^ trial_id;
    };
    mac.update(b"hellsim-trial");
    mac.update(&trial_id.to_le_bytes());
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// Fresh batch seed from OS entropy.
#[must_use]
pub fn entropy_seed() -> u64 {
    rand::random::<u64>()
}

/// Seeded generator owned by a single trial, counting the draws it serves.
#[derive(Debug, Clone)]
pub struct TrialRng {
    rng: SmallRng,
    draws: u64,
}

impl TrialRng {
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }

    /// Generator for `trial_id` within the batch seeded by `batch_seed`.
    #[must_use]
    pub fn for_trial(batch_seed: u64, trial_id: u64) -> Self {
        Self::from_seed(derive_trial_seed(batch_seed, trial_id))
    }

    /// Number of raw draws served so far.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }

    /// Uniform integer in `[min, max)`.
    pub fn draw(&mut self, min: i64, max: i64) -> i64 {
        draw(self, min, max)
    }

    /// Uniform integer in `[min, max)` for a fractional upper bound.
    pub fn draw_frac(&mut self, min: i64, max: f64) -> i64 {
        draw_frac(self, min, max)
    }

    /// `draw(0, odds) == 0`: a one-in-`odds` roll.
    pub fn one_in(&mut self, odds: i64) -> bool {
        self.draw(0, odds) == 0
    }

    /// Encounter check shared by drones and patrols: `draw(0, threat) >= draw(0, 999)`.
    pub fn encounter(&mut self, threat: i64) -> bool {
        let pressure = self.draw(0, threat);
        pressure >= self.draw(0, ENCOUNTER_ROLL)
    }

    /// Uniform float in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.r#gen::<f64>()
    }
}

impl RngCore for TrialRng {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn draw_stays_in_half_open_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut seen = [false; 5];
        for _ in 0..2_000 {
            let value = draw(&mut rng, 10, 15);
            assert!((10..15).contains(&value));
            seen[usize::try_from(value - 10).unwrap()] = true;
        }
        assert!(seen.iter().all(|hit| *hit));
    }

    #[test]
    fn empty_range_returns_min() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(draw(&mut rng, 0, 0), 0);
            assert_eq!(draw(&mut rng, 42, 42), 42);
        }
    }

    #[test]
    fn fractional_bound_weights_last_bucket() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let samples = 20_000_u32;
        let mut top = 0_u32;
        for _ in 0..samples {
            let value = draw_frac(&mut rng, 0, 2.25);
            assert!((0..=2).contains(&value));
            if value == 2 {
                top += 1;
            }
        }
        let observed = f64::from(top) / f64::from(samples);
        let expected = 0.25 / 2.25;
        assert!(
            (observed - expected).abs() < 0.02,
            "top bucket share {observed:.4} drifted from {expected:.4}"
        );
    }

    #[test]
    fn trial_seeds_are_stable_and_distinct() {
        assert_eq!(derive_trial_seed(5, 1), derive_trial_seed(5, 1));
        assert_ne!(derive_trial_seed(5, 1), derive_trial_seed(5, 2));
        assert_ne!(derive_trial_seed(5, 1), derive_trial_seed(6, 1));
    }

    #[test]
    fn trial_rng_counts_draws_and_replays() {
        let mut first = TrialRng::for_trial(11, 3);
        let mut second = TrialRng::for_trial(11, 3);
        let a: Vec<i64> = (0..16).map(|_| first.draw(0, 1_000)).collect();
        let b: Vec<i64> = (0..16).map(|_| second.draw(0, 1_000)).collect();
        assert_eq!(a, b);
        assert_eq!(first.draws(), 16);
    }

    #[test]
    fn zero_threat_never_encounters() {
        let mut rng = TrialRng::from_seed(3);
        let hits = (0..500).filter(|_| rng.encounter(0)).count();
        // draw(0, 0) is 0 and draw(0, 999) is 0 only one time in 999
        assert!(hits < 10);
    }

    #[test]
    fn overwhelming_threat_almost_always_encounters() {
        let mut rng = TrialRng::from_seed(4);
        let hits = (0..500)
            .filter(|_| rng.encounter(ENCOUNTER_ROLL * 1_000))
            .count();
        assert!(hits >= 495);
        assert_eq!(rng.draws(), 1_000);
    }
}
