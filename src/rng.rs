//! Seeding and sampling helpers shared by landscape and population setup.

use crate::error::{Result, SimError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, LogNormal};

/// Large odd constant used to spread replicate seeds apart
const SEED_DERIVATION_PRIME: u64 = 0x9E37_79B9_7F4A_7C15;

/// Mixed into the base seed so habitat streams never coincide with run streams
const LANDSCAPE_STREAM: u64 = 0xD1B5_4A32_D192_ED03;

/// Draws allowed per requested sample before giving up
const MAX_DRAWS_PER_SAMPLE: usize = 10_000;

/// Create a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Derive the seed of one replicate so that runs draw independent streams.
pub fn derive_replicate_seed(base_seed: u64, replicate: usize) -> u64 {
    base_seed.wrapping_add((replicate as u64 + 1).wrapping_mul(SEED_DERIVATION_PRIME))
}

/// Seed of the habitat shared by every run of one parameter point.
pub fn derive_landscape_seed(base_seed: u64, point: usize) -> u64 {
    derive_replicate_seed(base_seed ^ LANDSCAPE_STREAM, point)
}

/// Draw `count` samples from `dist`, discarding those `accept` rejects.
///
/// Fails once the draw budget is spent, so a distribution that almost
/// never lands in the accepted range cannot stall setup.
pub fn rejection_samples<D, R, F>(dist: &D, count: usize, accept: F, rng: &mut R) -> Result<Vec<f64>>
where
    D: Distribution<f64>,
    R: Rng + ?Sized,
    F: Fn(f64) -> bool,
{
    let budget = count.max(1).saturating_mul(MAX_DRAWS_PER_SAMPLE);
    let mut samples = Vec::with_capacity(count);
    let mut draws = 0usize;
    while samples.len() < count {
        if draws == budget {
            return Err(SimError::config(format!(
                "accepted only {} of {} samples in {} draws; distribution is almost entirely out of range",
                samples.len(),
                count,
                budget
            )));
        }
        draws += 1;
        let value = dist.sample(rng);
        if accept(value) {
            samples.push(value);
        }
    }
    Ok(samples)
}

/// Per-axis speeds: log-normal magnitudes split evenly over two axes.
pub fn velocity_pool<R: Rng + ?Sized>(dist: &LogNormal<f64>, count: usize, rng: &mut R) -> Vec<f64> {
    (0..count)
        .map(|_| dist.sample(rng) / std::f64::consts::SQRT_2)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_distr::Normal;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = create_rng(11);
        let mut b = create_rng(11);
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    }

    #[test]
    fn test_replicate_seeds_differ() {
        assert_ne!(derive_replicate_seed(1, 0), derive_replicate_seed(1, 1));
        assert_ne!(derive_replicate_seed(1, 0), 1);
    }

    #[test]
    fn test_rejection_samples_respect_bounds() {
        let mut rng = create_rng(3);
        let normal = Normal::new(0.5, 0.26).unwrap();
        let samples = rejection_samples(&normal, 200, |v| v > 0.0 && v <= 1.0, &mut rng).unwrap();
        assert_eq!(samples.len(), 200);
        assert!(samples.iter().all(|&v| v > 0.0 && v <= 1.0));
    }

    #[test]
    fn test_rejection_samples_give_up() {
        let mut rng = create_rng(3);
        let normal = Normal::new(-500.0, 1.0).unwrap();
        let result = rejection_samples(&normal, 10, |v| v > 0.0, &mut rng);
        assert!(matches!(result, Err(SimError::Configuration(_))));
    }

    #[test]
    fn test_landscape_seed_separate_from_runs() {
        let base = 5;
        assert_eq!(derive_landscape_seed(base, 2), derive_landscape_seed(base, 2));
        assert_ne!(derive_landscape_seed(base, 0), derive_landscape_seed(base, 1));
        for run in 0..8 {
            assert_ne!(derive_landscape_seed(base, 0), derive_replicate_seed(base, run));
        }
    }

    #[test]
    fn test_velocity_pool_positive() {
        let mut rng = create_rng(5);
        let dist = LogNormal::new(2.59, 0.88).unwrap();
        let pool = velocity_pool(&dist, 50, &mut rng);
        assert_eq!(pool.len(), 50);
        assert!(pool.iter().all(|&v| v > 0.0));
    }
}
