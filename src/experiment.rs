//! Replicate entrypoint and batch driver.
//!
//! A parameter point fixes baffling frequency, population density and sex
//! ratio. The arena is sized so the requested population has the requested
//! density. All runs of a point share one landscape and each run draws a
//! fresh population onto it.

use crate::analysis::summary::ReplicateSummary;
use crate::analysis::ExportSystem;
use crate::config::Config;
use crate::error::{Result, SimError};
use crate::landscape::{Arena, Landscape};
use crate::rng::{create_rng, derive_landscape_seed, derive_replicate_seed};
use crate::world::{Cohort, World};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// One point of the scanned parameter space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamPoint {
    /// Fraction of males carrying the baffling trait
    pub baffle_proportion: f64,
    /// Individuals per square metre
    pub density: f64,
    /// Fraction of the population that is male
    pub male_ratio: f64,
}

impl ParamPoint {
    pub fn new(baffle_proportion: f64, density: f64, male_ratio: f64) -> Self {
        Self {
            baffle_proportion,
            density,
            male_ratio,
        }
    }

    /// Fail fast on values no replicate can be built from
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.baffle_proportion) {
            return Err(SimError::config(format!(
                "baffle proportion must be within [0, 1], got {}",
                self.baffle_proportion
            )));
        }
        if !(0.0..=1.0).contains(&self.male_ratio) {
            return Err(SimError::config(format!(
                "sex ratio must be within [0, 1], got {}",
                self.male_ratio
            )));
        }
        if !(self.density > 0.0) || !self.density.is_finite() {
            return Err(SimError::config(format!(
                "density must be > 0, got {}",
                self.density
            )));
        }
        Ok(())
    }

    /// Arena area (m^2) holding `population` at this density
    pub fn area_m2(&self, population: usize) -> f64 {
        population as f64 / self.density
    }

    /// Side (cm) of the square arena
    pub fn arena_side_cm(&self, population: usize) -> f64 {
        self.area_m2(population).sqrt() * 100.0
    }

    pub fn cohort(&self, population: usize) -> Cohort {
        Cohort::from_population(population, self.male_ratio, self.baffle_proportion)
    }

    /// Leading columns of a result row
    pub fn parameters(&self, population: usize) -> [f64; 4] {
        [
            self.baffle_proportion,
            self.density,
            self.male_ratio,
            self.area_m2(population),
        ]
    }
}

/// Everything a batch needs besides the parameter points
#[derive(Debug, Clone)]
pub struct BatchSpec {
    /// Runs per parameter point
    pub runs: usize,
    /// Individuals per run
    pub population: usize,
    /// Nights per run
    pub nights: u32,
    pub base_seed: u64,
}

impl BatchSpec {
    pub fn validate(&self) -> Result<()> {
        if self.population == 0 {
            return Err(SimError::config("population size must be > 0"));
        }
        if self.runs == 0 {
            return Err(SimError::config("number of runs must be > 0"));
        }
        Ok(())
    }
}

/// Build and run one replicate on its own landscape for `timesteps` steps
pub fn run_replicate(
    config: &Config,
    point: &ParamPoint,
    population: usize,
    timesteps: u64,
    seed: u64,
) -> Result<World> {
    point.validate()?;
    if population == 0 {
        return Err(SimError::config("population size must be > 0"));
    }

    let arena = Arena::square(point.arena_side_cm(population));
    let mut world = World::new_with_seed(config.clone(), arena, point.cohort(population), seed)?;
    world.run(timesteps);
    Ok(world)
}

/// Habitat of a parameter point, sized for `population`
pub fn point_landscape(
    config: &Config,
    point: &ParamPoint,
    population: usize,
    seed: u64,
) -> Result<Landscape> {
    config.validate()?;
    point.validate()?;
    if population == 0 {
        return Err(SimError::config("population size must be > 0"));
    }

    let arena = Arena::square(point.arena_side_cm(population));
    Landscape::generate(arena, &config.habitat, &mut create_rng(seed))
}

/// Run every replicate of one point on a single shared landscape.
///
/// `point_index` keeps seeds distinct across points of the same batch.
pub fn point_replicates(
    config: &Config,
    point: &ParamPoint,
    point_index: usize,
    spec: &BatchSpec,
) -> Result<Vec<World>> {
    spec.validate()?;
    let timesteps = u64::from(spec.nights) * u64::from(config.timing.night_length);
    let landscape = point_landscape(
        config,
        point,
        spec.population,
        derive_landscape_seed(spec.base_seed, point_index),
    )?;
    log::debug!("{:?}: {} patches shared by {} runs", point, landscape.len(), spec.runs);

    (0..spec.runs)
        .map(|run| {
            let seed = derive_replicate_seed(spec.base_seed, point_index * spec.runs + run);
            let mut world = World::with_landscape(
                config.clone(),
                landscape.clone(),
                point.cohort(spec.population),
                seed,
            )?;
            world.run(timesteps);
            log::debug!(
                "Run {} of {:?}: {} matings over {} steps",
                run,
                point,
                world.total_matings(),
                timesteps
            );
            Ok(world)
        })
        .collect()
}

/// Run one parameter point `spec.runs` times, returning one row per run
pub fn combined_run(
    config: &Config,
    point: &ParamPoint,
    point_index: usize,
    spec: &BatchSpec,
) -> Result<Vec<Vec<f64>>> {
    let parameters = point.parameters(spec.population);
    Ok(point_replicates(config, point, point_index, spec)?
        .iter()
        .map(|world| ReplicateSummary::from_world(world).record(parameters))
        .collect())
}

/// Run every parameter point in parallel and stack the rows in input order
pub fn simulate(config: &Config, points: &[ParamPoint], spec: &BatchSpec) -> Result<Vec<Vec<f64>>> {
    config.validate()?;
    spec.validate()?;
    for point in points {
        point.validate()?;
    }

    let per_point: Vec<Vec<Vec<f64>>> = points
        .par_iter()
        .enumerate()
        .map(|(i, point)| {
            log::info!(
                "Point {}/{}: baffle={} density={} ratio={} ({} runs of {} individuals)",
                i + 1,
                points.len(),
                point.baffle_proportion,
                point.density,
                point.male_ratio,
                spec.runs,
                spec.population
            );
            combined_run(config, point, i, spec)
        })
        .collect::<Result<_>>()?;

    Ok(per_point.into_iter().flatten().collect())
}

/// Run a batch and write `output_{N}_individuals_array_{identifier}.csv`
/// into `out_dir`
pub fn simulate_and_save<P: AsRef<Path>>(
    config: &Config,
    points: &[ParamPoint],
    spec: &BatchSpec,
    out_dir: P,
    identifier: &str,
) -> Result<PathBuf> {
    let rows = simulate(config, points, spec)?;
    let path = ExportSystem::save_results(&rows, out_dir, spec.population, identifier)?;
    log::info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(path)
}

/// Cartesian product of the scanned axes
pub fn grid(baffle: &[f64], density: &[f64], ratio: &[f64]) -> Vec<ParamPoint> {
    let mut points = Vec::with_capacity(baffle.len() * density.len() * ratio.len());
    for &b in baffle {
        for &d in density {
            for &r in ratio {
                points.push(ParamPoint::new(b, d, r));
            }
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::RECORD_WIDTH;

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.timing.night_length = 12;
        config.timing.decision_interval = 12;
        config
    }

    #[test]
    fn test_arena_sizing() {
        let point = ParamPoint::new(0.2, 2.0, 0.5);
        assert!((point.area_m2(500) - 250.0).abs() < 1e-12);
        assert!((point.arena_side_cm(500) - 250.0_f64.sqrt() * 100.0).abs() < 1e-9);
        assert_eq!(point.parameters(500), [0.2, 2.0, 0.5, 250.0]);
    }

    #[test]
    fn test_invalid_points_rejected() {
        assert!(ParamPoint::new(1.5, 1.0, 0.5).validate().is_err());
        assert!(ParamPoint::new(0.5, 0.0, 0.5).validate().is_err());
        assert!(ParamPoint::new(0.5, -1.0, 0.5).validate().is_err());
        assert!(ParamPoint::new(0.5, 1.0, -0.1).validate().is_err());
        assert!(ParamPoint::new(0.5, 1.0, 0.5).validate().is_ok());
    }

    #[test]
    fn test_run_replicate() {
        let point = ParamPoint::new(0.2, 1.0, 0.5);
        let world = run_replicate(&fast_config(), &point, 40, 12, 3).unwrap();
        assert_eq!(world.population(), 40);
        assert_eq!(world.time, 12);
    }

    #[test]
    fn test_zero_population_rejected() {
        let point = ParamPoint::new(0.2, 1.0, 0.5);
        let result = run_replicate(&fast_config(), &point, 0, 12, 3);
        assert!(matches!(result, Err(SimError::Configuration(_))));
    }

    #[test]
    fn test_combined_run_rows() {
        let spec = BatchSpec {
            runs: 3,
            population: 30,
            nights: 1,
            base_seed: 9,
        };
        let rows = combined_run(&fast_config(), &ParamPoint::new(0.3, 1.0, 0.5), 0, &spec).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.len() == RECORD_WIDTH));
        assert!(rows.iter().all(|r| r[0] == 0.3 && r[3] == 30.0));
    }

    #[test]
    fn test_runs_of_a_point_share_the_landscape() {
        let spec = BatchSpec {
            runs: 3,
            population: 40,
            nights: 1,
            base_seed: 5,
        };
        let point = ParamPoint::new(0.2, 1.0, 0.5);
        let worlds = point_replicates(&fast_config(), &point, 0, &spec).unwrap();
        assert_eq!(worlds.len(), 3);

        let layout = |w: &World| -> Vec<(f64, f64, f64)> {
            w.landscape.patches().iter().map(|p| (p.center_x, p.center_y, p.size)).collect()
        };
        let first = layout(&worlds[0]);
        assert!(!first.is_empty());
        for world in &worlds[1..] {
            assert_eq!(layout(world), first);
        }

        // Populations still differ between runs
        let placement = |w: &World| -> Vec<(f64, f64)> { w.organisms.iter().map(|o| o.position()).collect() };
        assert_ne!(placement(&worlds[0]), placement(&worlds[1]));

        // Another point of the batch gets its own habitat
        let other = point_replicates(&fast_config(), &point, 1, &spec).unwrap();
        assert_ne!(layout(&other[0]), first);
    }

    #[test]
    fn test_simulate_is_deterministic() {
        let spec = BatchSpec {
            runs: 2,
            population: 30,
            nights: 1,
            base_seed: 17,
        };
        let points = grid(&[0.0, 0.5], &[1.0], &[0.5]);
        let a = simulate(&fast_config(), &points, &spec).unwrap();
        let b = simulate(&fast_config(), &points, &spec).unwrap();
        assert_eq!(a.len(), 4);
        for (ra, rb) in a.iter().zip(&b) {
            for (x, y) in ra.iter().zip(rb) {
                assert!(x == y || (x.is_nan() && y.is_nan()));
            }
        }
        // Rows keep input order
        assert_eq!(a[0][0], 0.0);
        assert_eq!(a[2][0], 0.5);
    }

    #[test]
    fn test_grid() {
        let points = grid(&[0.0, 0.5], &[1.0, 2.0], &[0.5]);
        assert_eq!(points.len(), 4);
        assert_eq!(points[1], ParamPoint::new(0.0, 2.0, 0.5));
    }
}
