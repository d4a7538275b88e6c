//! CHIRP - CLI Entry Point
//!
//! Tree cricket mating-tactic simulator.

use chirp::analysis::{ExportSystem, ReplicateSummary};
use chirp::experiment::{grid, simulate_and_save, BatchSpec, ParamPoint};
use chirp::{benchmark, Arena, Config, Tactic, World};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "chirp")]
#[command(version)]
#[command(about = "Individual-based model of calling, baffling and silent males in tree crickets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one parameter point (array-job entry)
    Run {
        /// Baffling trait frequency
        #[arg(short, long)]
        freq: f64,

        /// Population density (individuals / m^2)
        #[arg(short, long)]
        dens: f64,

        /// Fraction of males
        #[arg(short, long, default_value = "0.5")]
        ratio: f64,

        /// Unique identifier for the output file name
        #[arg(long)]
        file: String,

        /// Individuals per run
        #[arg(short = 'n', long, default_value = "500")]
        population: usize,

        /// Runs per parameter point
        #[arg(long, default_value = "2")]
        runs: usize,

        /// Nights per run
        #[arg(long, default_value = "1")]
        nights: u32,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Scan a grid of parameter points in parallel
    Sweep {
        /// Baffling frequencies (comma separated)
        #[arg(long, value_delimiter = ',', default_value = "0,0.25,0.5,0.75,1")]
        freqs: Vec<f64>,

        /// Densities (comma separated)
        #[arg(long, value_delimiter = ',', default_value = "0.5,1,2")]
        densities: Vec<f64>,

        /// Sex ratios (comma separated)
        #[arg(long, value_delimiter = ',', default_value = "0.5")]
        ratios: Vec<f64>,

        #[arg(long, default_value = "sweep")]
        file: String,

        #[arg(short = 'n', long, default_value = "500")]
        population: usize,

        #[arg(long, default_value = "2")]
        runs: usize,

        #[arg(long, default_value = "1")]
        nights: u32,

        /// Worker threads (defaults to all cores)
        #[arg(short, long)]
        threads: Option<usize>,

        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Run one replicate and export agents, matings and an SVG snapshot
    Visualize {
        #[arg(short, long, default_value = "0.2")]
        freq: f64,

        #[arg(short, long, default_value = "1")]
        dens: f64,

        #[arg(short, long, default_value = "0.5")]
        ratio: f64,

        #[arg(short = 'n', long, default_value = "200")]
        population: usize,

        /// Number of steps to simulate
        #[arg(short, long, default_value = "72")]
        steps: u64,

        #[arg(short, long, default_value = "snapshot")]
        output: PathBuf,

        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of steps
        #[arg(short, long, default_value = "720")]
        steps: u64,

        /// Population size
        #[arg(short, long, default_value = "1000")]
        population: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            freq,
            dens,
            ratio,
            file,
            population,
            runs,
            nights,
            output,
            config,
            seed,
        } => {
            let config = load_config(&config)?;
            let spec = BatchSpec {
                runs,
                population,
                nights,
                base_seed: seed.unwrap_or_else(rand::random),
            };
            run_batch(&config, &[ParamPoint::new(freq, dens, ratio)], &spec, &output, &file)
        }

        Commands::Sweep {
            freqs,
            densities,
            ratios,
            file,
            population,
            runs,
            nights,
            threads,
            output,
            config,
            seed,
        } => {
            let config = load_config(&config)?;
            if let Some(n) = threads {
                rayon::ThreadPoolBuilder::new().num_threads(n).build_global()?;
            }
            let spec = BatchSpec {
                runs,
                population,
                nights,
                base_seed: seed.unwrap_or_else(rand::random),
            };
            let points = grid(&freqs, &densities, &ratios);
            run_batch(&config, &points, &spec, &output, &file)
        }

        Commands::Visualize {
            freq,
            dens,
            ratio,
            population,
            steps,
            output,
            config,
            seed,
        } => {
            let config = load_config(&config)?;
            visualize(&config, ParamPoint::new(freq, dens, ratio), population, steps, &output, seed)
        }

        Commands::Benchmark { steps, population } => {
            init_logging(&Config::default());
            run_benchmark(steps, population)
        }

        Commands::Init { output } => generate_config(output),
    }
}

/// Load the YAML config if present, then start logging at its level
fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let config = if path.exists() {
        Config::from_file(path)?
    } else {
        Config::default()
    };
    init_logging(&config);
    if path.exists() {
        log::info!("Loaded config from {:?}", path);
    } else {
        log::info!("Using default configuration");
    }
    Ok(config)
}

fn init_logging(config: &Config) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.log_level.as_str()),
    )
    .init();
}

fn run_batch(
    config: &Config,
    points: &[ParamPoint],
    spec: &BatchSpec,
    output: &Path,
    identifier: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Starting batch");
    println!("  Parameter points: {}", points.len());
    println!("  Runs per point: {}", spec.runs);
    println!("  Individuals: {}", spec.population);
    println!("  Nights: {} x {} steps", spec.nights, config.timing.night_length);
    println!("  Base seed: {}", spec.base_seed);
    println!();

    let start = Instant::now();
    let path = simulate_and_save(config, points, spec, output, identifier)?;
    let elapsed = start.elapsed();

    println!("=== Batch Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Rows: {}", points.len() * spec.runs);
    println!("Results: {:?}", path);

    Ok(())
}

fn visualize(
    config: &Config,
    point: ParamPoint,
    population: usize,
    steps: u64,
    output: &Path,
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    point.validate()?;
    let arena = Arena::square(point.arena_side_cm(population));
    let mut world = World::new_with_seed(config.clone(), arena, point.cohort(population), seed)?;

    let night_length = u64::from(config.timing.night_length);
    world.run_with_callback(steps, |w, _| {
        if w.time % night_length == 0 {
            log::info!("Night {} done: {}", w.night(), w.stats.summary());
        }
    });

    let manifest = ExportSystem::export_full_state(&world, output)?;

    let summary = ReplicateSummary::from_world(&world);
    let counts = world.tactic_counts();

    println!("=== Replicate Summary (t = {}) ===", world.time);
    println!("Patches: {}", world.landscape.len());
    for (tactic, count) in Tactic::ALL.iter().zip(counts) {
        let name = format!("{}_success", tactic.label());
        let mean = summary.metric(&name).map_or(f64::NAN, |s| s.mean);
        println!("{:>7}: {:4} males, mean matings {:.3}", tactic.label(), count, mean);
    }
    println!("Total matings: {}", world.total_matings());
    println!();
    println!("Agents:   {:?}", manifest.agents_file);
    println!("Matings:  {:?}", manifest.matings_file);
    println!("Timeline: {:?}", manifest.timeline_file);
    println!("Snapshot: {:?}", manifest.snapshot_file);

    Ok(())
}

fn run_benchmark(steps: u64, population: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== CHIRP Benchmark ===");
    println!("Steps: {}", steps);
    println!("Population: {}", population);
    println!();

    let result = benchmark(steps, population, 42)?;
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}
