//! Data export for analysis in external tools.

use crate::analysis::summary::column_names;
use crate::organism::{Organism, Role, Tactic};
use crate::stats::StatsHistory;
use crate::world::World;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use std::fs::File;
use std::io::{self, BufWriter, Result, Write};
use std::path::{Path, PathBuf};

/// Grid step (cm) the snapshot extent is snapped to
const PLOT_STEP: f64 = 5.0;

/// Snapshot width in pixels; height follows the arena's aspect ratio
const SNAPSHOT_WIDTH: u32 = 800;

/// Agent marker radius in pixels
const AGENT_MARKER: i32 = 3;

/// Vertices used to outline an active space
const OUTLINE_VERTICES: usize = 64;

const BUSH: RGBColor = RGBColor(128, 128, 128);
const ORANGE: RGBColor = RGBColor(255, 165, 0);

/// Export system for saving simulation data
pub struct ExportSystem;

impl ExportSystem {
    /// Batch result file name for a population size and job identifier
    pub fn results_file_name(population: usize, identifier: &str) -> String {
        format!("output_{population}_individuals_array_{identifier}.csv")
    }

    /// Write replicate rows under the full results header
    pub fn write_results_csv<P: AsRef<Path>>(rows: &[Vec<f64>], path: P) -> Result<()> {
        let mut file = BufWriter::new(File::create(path)?);

        writeln!(file, "{}", column_names().join(","))?;
        for row in rows {
            let fields: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(file, "{}", fields.join(","))?;
        }

        file.flush()
    }

    /// Write the results file into `dir`, returning its path
    pub fn save_results<P: AsRef<Path>>(
        rows: &[Vec<f64>],
        dir: P,
        population: usize,
        identifier: &str,
    ) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(Self::results_file_name(population, identifier));
        Self::write_results_csv(rows, &path)?;
        Ok(path)
    }

    /// Export every agent's state and counters to CSV
    pub fn export_agents_csv<P: AsRef<Path>>(organisms: &[Organism], path: P) -> Result<()> {
        let mut file = BufWriter::new(File::create(path)?);

        writeln!(
            file,
            "id,kind,tactic,x,y,patch,spl,calling,call_instances,mating,mate_count,within_steps,within_distance,across_steps,across_distance,phonotaxis_steps,phonotaxis_distance"
        )?;

        for org in organisms {
            let (kind, tactic, spl, calling, calls, phono_steps, phono_distance) = match &org.role {
                Role::Signaller(s) => (
                    "signaller",
                    s.lifetime_tactic().label(),
                    format!("{:.2}", s.spl),
                    s.calling,
                    s.call_instances,
                    0,
                    0.0,
                ),
                Role::Receiver(r) => (
                    "receiver",
                    "",
                    String::new(),
                    false,
                    0,
                    r.phonotaxis.total_steps(),
                    r.phonotaxis.total_distance(),
                ),
            };
            let m = &org.movement;

            writeln!(
                file,
                "{},{},{},{:.2},{:.2},{},{},{},{},{},{},{},{:.2},{},{:.2},{},{:.2}",
                org.id,
                kind,
                tactic,
                org.x,
                org.y,
                org.patch,
                spl,
                calling,
                calls,
                org.mating,
                org.mate_count,
                m.within_steps,
                m.within_distance,
                m.across_steps,
                m.across_distance,
                phono_steps,
                phono_distance,
            )?;
        }

        file.flush()
    }

    /// Export every mating event as seen by receivers
    pub fn export_matings_csv<P: AsRef<Path>>(world: &World, path: P) -> Result<()> {
        let mut file = BufWriter::new(File::create(path)?);

        writeln!(file, "receiver,signaller,tactic,time")?;
        for (org, r) in world.receivers() {
            for record in &r.mate_history {
                writeln!(
                    file,
                    "{},{},{},{}",
                    org.id,
                    record.partner,
                    record.tactic.label(),
                    record.time
                )?;
            }
        }

        file.flush()
    }

    /// Export the per-night snapshots to CSV
    pub fn export_timeline_csv<P: AsRef<Path>>(history: &StatsHistory, path: P) -> Result<()> {
        let mut file = BufWriter::new(File::create(path)?);

        writeln!(file, "time,night,signallers,receivers,calling,mating,matings,total_matings")?;
        for s in &history.snapshots {
            writeln!(
                file,
                "{},{},{},{},{},{},{},{}",
                s.time, s.night, s.signallers, s.receivers, s.calling, s.mating, s.matings, s.total_matings
            )?;
        }

        file.flush()
    }

    /// Render patches, agents and calling active spaces as an SVG image.
    ///
    /// Bafflers are red, callers blue, silent males orange and receivers
    /// green; each male calling this instant gets an outline whose radius
    /// is his active space.
    pub fn export_svg<P: AsRef<Path>>(world: &World, path: P) -> Result<()> {
        let extent = world.landscape.plot_extent(PLOT_STEP);
        let width = extent.right - extent.left;
        let height = extent.top - extent.bottom;
        let threshold = world.config.acoustics.detection_threshold;
        let reference = world.config.acoustics.reference_distance;
        let pixels = (
            SNAPSHOT_WIDTH,
            ((f64::from(SNAPSHOT_WIDTH) * height / width).round() as u32).max(1),
        );

        let root = SVGBackend::new(path.as_ref(), pixels).into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;

        // Cartesian y grows upward, so the origin sits bottom-left
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(extent.left..extent.right, extent.bottom..extent.top)
            .map_err(plot_error)?;

        let patches = world.landscape.patches();
        chart
            .draw_series(patches.iter().map(|patch| {
                let b = patch.bounds();
                Rectangle::new([(b.left, b.bottom), (b.right, b.top)], BUSH.mix(0.3).filled())
            }))
            .map_err(plot_error)?;
        chart
            .draw_series(patches.iter().map(|patch| {
                let b = patch.bounds();
                Rectangle::new([(b.left, b.bottom), (b.right, b.top)], BLACK.stroke_width(1))
            }))
            .map_err(plot_error)?;

        let calling = world
            .organisms
            .iter()
            .filter_map(|org| org.as_signaller().filter(|s| s.calling).map(|s| (org, s)));
        chart
            .draw_series(calling.map(|(org, s)| {
                let radius = s.active_space(threshold, reference);
                PathElement::new(circle_outline(org.x, org.y, radius), marker_colour(org).stroke_width(1))
            }))
            .map_err(plot_error)?;

        chart
            .draw_series(
                world
                    .organisms
                    .iter()
                    .map(|org| Circle::new((org.x, org.y), AGENT_MARKER, marker_colour(org).filled())),
            )
            .map_err(plot_error)?;

        root.present().map_err(plot_error)?;
        log::debug!("Snapshot at t={} written to {}", world.time, path.as_ref().display());
        Ok(())
    }

    /// Export agents, matings, timeline and snapshot into one directory
    pub fn export_full_state<P: AsRef<Path>>(world: &World, base_path: P) -> Result<ExportManifest> {
        let base = base_path.as_ref();
        std::fs::create_dir_all(base)?;

        let agents_path = base.join("agents.csv");
        let matings_path = base.join("matings.csv");
        let timeline_path = base.join("timeline.csv");
        let snapshot_path = base.join("snapshot.svg");

        Self::export_agents_csv(&world.organisms, &agents_path)?;
        Self::export_matings_csv(world, &matings_path)?;
        Self::export_timeline_csv(&world.stats_history, &timeline_path)?;
        Self::export_svg(world, &snapshot_path)?;

        Ok(ExportManifest {
            time: world.time,
            agents_file: agents_path,
            matings_file: matings_path,
            timeline_file: timeline_path,
            snapshot_file: snapshot_path,
        })
    }
}

fn marker_colour(org: &Organism) -> RGBColor {
    match &org.role {
        Role::Signaller(s) => match s.lifetime_tactic() {
            Tactic::Baffler => RED,
            Tactic::Caller => BLUE,
            Tactic::Silent => ORANGE,
        },
        Role::Receiver(_) => GREEN,
    }
}

/// Closed polygon approximating a circle in arena coordinates
fn circle_outline(x: f64, y: f64, radius: f64) -> Vec<(f64, f64)> {
    (0..=OUTLINE_VERTICES)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / OUTLINE_VERTICES as f64;
            (x + radius * angle.cos(), y + radius * angle.sin())
        })
        .collect()
}

fn plot_error<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

/// Manifest of exported files
#[derive(Debug)]
pub struct ExportManifest {
    pub time: u64,
    pub agents_file: PathBuf,
    pub matings_file: PathBuf,
    pub timeline_file: PathBuf,
    pub snapshot_file: PathBuf,
}
