//! # CHIRP
//!
//! Spatial individual-based model of alternative reproductive tactics in
//! tree crickets.
//!
//! Males either call, call through a leaf baffle (louder, stationary) or
//! stay silent; females listen and walk toward the loudest caller they can
//! hear. Replicates record per-tactic mating success across baffling
//! frequency, population density and sex ratio.
//!
//! ## Features
//!
//! - **Spatial**: patchy habitat with directed patch adjacency
//! - **Acoustic**: spherical-spreading decay with pressure-domain mixing
//! - **Parallel**: independent replicates fan out via Rayon
//! - **Configurable**: YAML configuration files
//! - **Reproducible**: Seeded random number generation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chirp::{Arena, Cohort, Config, World};
//!
//! let cohort = Cohort::from_population(500, 0.5, 0.2);
//! let mut world = World::new_with_seed(Config::default(), Arena::square(2000.0), cohort, 42)?;
//!
//! // One night
//! world.run(72);
//!
//! println!("Matings: {}", world.total_matings());
//! # Ok::<(), chirp::SimError>(())
//! ```
//!
//! ## Batch runs
//!
//! ```rust,no_run
//! use chirp::experiment::{simulate_and_save, BatchSpec, ParamPoint};
//! use chirp::Config;
//!
//! let spec = BatchSpec { runs: 2, population: 500, nights: 1, base_seed: 1 };
//! let points = [ParamPoint::new(0.2, 1.0, 0.5)];
//! let path = simulate_and_save(&Config::default(), &points, &spec, "output", "0")?;
//! println!("Results in {}", path.display());
//! # Ok::<(), chirp::SimError>(())
//! ```

pub mod acoustics;
pub mod analysis;
pub mod config;
pub mod dispersal;
pub mod error;
pub mod experiment;
pub mod landscape;
pub mod organism;
pub mod patch;
pub mod perception;
pub mod rng;
pub mod stats;
pub mod world;

// Re-export main types
pub use config::Config;
pub use error::{Result, SimError};
pub use landscape::{Arena, Landscape};
pub use organism::{Organism, Role, Tactic};
pub use world::{Cohort, World};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Time `steps` steps of a default-configured world of `population` agents
pub fn benchmark(steps: u64, population: usize, seed: u64) -> Result<BenchmarkResult> {
    use std::time::Instant;

    let point = experiment::ParamPoint::new(0.2, 1.0, 0.5);
    let arena = Arena::square(point.arena_side_cm(population));
    let mut world = World::new_with_seed(Config::default(), arena, point.cohort(population), seed)?;

    let start = Instant::now();
    world.run(steps);
    let elapsed = start.elapsed();

    Ok(BenchmarkResult {
        steps,
        population,
        patches: world.landscape.len(),
        matings: world.total_matings(),
        elapsed_secs: elapsed.as_secs_f64(),
        steps_per_second: steps as f64 / elapsed.as_secs_f64(),
    })
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub steps: u64,
    pub population: usize,
    pub patches: usize,
    pub matings: u64,
    pub elapsed_secs: f64,
    pub steps_per_second: f64,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Steps: {}", self.steps)?;
        writeln!(f, "Population: {} on {} patches", self.population, self.patches)?;
        writeln!(f, "Matings: {}", self.matings)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} steps/s", self.steps_per_second)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_quick_simulation() {
        let cohort = Cohort::from_population(50, 0.5, 0.2);
        let mut world = World::new_with_seed(Config::default(), Arena::square(700.0), cohort, 1).unwrap();

        world.run(100);

        assert!(world.time == 100);
    }

    #[test]
    fn test_benchmark() {
        let result = benchmark(20, 50, 7).unwrap();

        assert_eq!(result.steps, 20);
        assert!(result.steps_per_second > 0.0);
    }
}
