//! Per-tactic reduction of a finished replicate into one result row.
//!
//! Males are grouped by lifetime tactic. Each tracked counter becomes one
//! metric; each metric is summarised by the seven statistics of
//! [`Summary`], written statistic-major after four parameter columns and
//! followed by five mated proportions.

use crate::organism::{MovementCounters, Organism, Signaller, Tactic};
use crate::stats::{proportion_positive, Summary};
use crate::world::World;

/// Scanned parameters leading every row
pub const PARAMETER_COLUMNS: [&str; 4] = ["baffle_prop", "density", "prop_males", "area(m^2)"];

/// Statistic suffixes, in row order
pub const STATISTICS: [&str; 7] = ["mean", "sd", "kurtosis", "skew", "min", "max", "median"];

/// Metric names, in row order within each statistic block
pub const METRICS: [&str; 40] = [
    "baffle_success",
    "caller_success",
    "silent_success",
    "total_male_success",
    "total_female_success",
    "baffle_call_effort",
    "baffle_within_bush_steps",
    "baffle_within_bush_distance",
    "baffle_across_bush_steps",
    "baffle_across_bush_distance",
    "baffle_total_steps",
    "baffle_total_distance",
    "caller_call_effort",
    "caller_within_bush_steps",
    "caller_within_bush_distance",
    "caller_across_bush_steps",
    "caller_across_bush_distance",
    "caller_total_steps",
    "caller_total_distance",
    "silent_call_effort",
    "silent_within_bush_steps",
    "silent_within_bush_distance",
    "silent_across_bush_steps",
    "silent_across_bush_distance",
    "silent_total_steps",
    "silent_total_distance",
    "female_within_bush_random_steps",
    "female_within_bush_random_distance",
    "female_across_bush_random_steps",
    "female_across_bush_random_distance",
    "female_within_bush_phonotaxis_steps",
    "female_within_bush_phonotaxis_distance",
    "female_across_bush_phonotaxis_steps",
    "female_across_bush_phonotaxis_distance",
    "female_within_bush_total_steps",
    "female_within_bush_total_distance",
    "female_across_bush_total_steps",
    "female_across_bush_total_distance",
    "female_total_steps",
    "female_total_distance",
];

/// Groups reported with a mated proportion
pub const MATED_GROUPS: [&str; 5] = ["baffle", "caller", "silent", "total_male", "total_female"];

/// Width of one result row
pub const RECORD_WIDTH: usize =
    PARAMETER_COLUMNS.len() + STATISTICS.len() * METRICS.len() + MATED_GROUPS.len();

/// Raw counters of one tactic group
#[derive(Debug, Default)]
struct MaleColumns {
    matings: Vec<f64>,
    call_effort: Vec<f64>,
    within_steps: Vec<f64>,
    within_distance: Vec<f64>,
    across_steps: Vec<f64>,
    across_distance: Vec<f64>,
    total_steps: Vec<f64>,
    total_distance: Vec<f64>,
}

impl MaleColumns {
    fn push(&mut self, org: &Organism, signaller: &Signaller) {
        let m = &org.movement;
        self.matings.push(f64::from(org.mate_count));
        self.call_effort.push(f64::from(signaller.call_instances));
        self.within_steps.push(f64::from(m.within_steps));
        self.within_distance.push(m.within_distance);
        self.across_steps.push(f64::from(m.across_steps));
        self.across_distance.push(m.across_distance);
        self.total_steps.push(f64::from(m.total_steps()));
        self.total_distance.push(m.total_distance());
    }

    /// Everything but matings, in row order
    fn activity(&self) -> [&[f64]; 7] {
        [
            self.call_effort.as_slice(),
            self.within_steps.as_slice(),
            self.within_distance.as_slice(),
            self.across_steps.as_slice(),
            self.across_distance.as_slice(),
            self.total_steps.as_slice(),
            self.total_distance.as_slice(),
        ]
    }
}

#[derive(Debug, Default)]
struct FemaleColumns {
    matings: Vec<f64>,
    // (steps, distance) pairs, in row order
    counters: [Vec<f64>; 14],
}

impl FemaleColumns {
    fn push(&mut self, org: &Organism, phonotaxis: &MovementCounters) {
        let random = &org.movement;
        let within_steps = random.within_steps + phonotaxis.within_steps;
        let within_distance = random.within_distance + phonotaxis.within_distance;
        let across_steps = random.across_steps + phonotaxis.across_steps;
        let across_distance = random.across_distance + phonotaxis.across_distance;

        let values = [
            f64::from(random.within_steps),
            random.within_distance,
            f64::from(random.across_steps),
            random.across_distance,
            f64::from(phonotaxis.within_steps),
            phonotaxis.within_distance,
            f64::from(phonotaxis.across_steps),
            phonotaxis.across_distance,
            f64::from(within_steps),
            within_distance,
            f64::from(across_steps),
            across_distance,
            f64::from(within_steps + across_steps),
            within_distance + across_distance,
        ];

        self.matings.push(f64::from(org.mate_count));
        for (column, value) in self.counters.iter_mut().zip(values) {
            column.push(value);
        }
    }
}

/// Summary statistics of one finished replicate
#[derive(Debug, Clone)]
pub struct ReplicateSummary {
    /// One entry per name in [`METRICS`]
    pub metrics: Vec<Summary>,
    /// One entry per name in [`MATED_GROUPS`]
    pub proportion_mated: [f64; 5],
}

impl ReplicateSummary {
    pub fn from_world(world: &World) -> Self {
        let mut groups: [MaleColumns; 3] = Default::default();
        for (org, s) in world.signallers() {
            let idx = match s.lifetime_tactic() {
                Tactic::Baffler => 0,
                Tactic::Caller => 1,
                Tactic::Silent => 2,
            };
            groups[idx].push(org, s);
        }

        let mut females = FemaleColumns::default();
        for (org, r) in world.receivers() {
            females.push(org, &r.phonotaxis);
        }

        for (tactic, group) in Tactic::ALL.iter().zip(&groups) {
            if group.matings.is_empty() {
                log::warn!(
                    "No {} males at t={}; their statistics are NaN",
                    tactic.label(),
                    world.time
                );
            }
        }
        if females.matings.is_empty() {
            log::warn!("No receivers at t={}; their statistics are NaN", world.time);
        }

        let all_males: Vec<f64> = groups.iter().flat_map(|g| g.matings.iter().copied()).collect();

        let mut columns: Vec<&[f64]> = vec![
            groups[0].matings.as_slice(),
            groups[1].matings.as_slice(),
            groups[2].matings.as_slice(),
            all_males.as_slice(),
            females.matings.as_slice(),
        ];
        for group in &groups {
            columns.extend(group.activity());
        }
        columns.extend(females.counters.iter().map(Vec::as_slice));

        let metrics = columns.iter().map(|c| Summary::of(c)).collect();

        let proportion_mated = [
            proportion_positive(&groups[0].matings),
            proportion_positive(&groups[1].matings),
            proportion_positive(&groups[2].matings),
            proportion_positive(&all_males),
            proportion_positive(&females.matings),
        ];

        Self {
            metrics,
            proportion_mated,
        }
    }

    /// Summary of a metric by name
    pub fn metric(&self, name: &str) -> Option<&Summary> {
        METRICS
            .iter()
            .position(|&m| m == name)
            .and_then(|i| self.metrics.get(i))
    }

    /// Statistic-major values without the parameter columns
    pub fn values(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(RECORD_WIDTH - PARAMETER_COLUMNS.len());
        for stat in 0..STATISTICS.len() {
            out.extend(self.metrics.iter().map(|s| s.as_array()[stat]));
        }
        out.extend_from_slice(&self.proportion_mated);
        out
    }

    /// Full result row: parameters followed by [`Self::values`]
    pub fn record(&self, parameters: [f64; 4]) -> Vec<f64> {
        let mut row = Vec::with_capacity(RECORD_WIDTH);
        row.extend_from_slice(&parameters);
        row.extend(self.values());
        row
    }
}

/// Header matching [`ReplicateSummary::record`]
pub fn column_names() -> Vec<String> {
    let mut names: Vec<String> = PARAMETER_COLUMNS.iter().map(|s| s.to_string()).collect();
    for stat in STATISTICS {
        for metric in METRICS {
            names.push(format!("{metric}_{stat}"));
        }
    }
    for group in MATED_GROUPS {
        names.push(format!("{group}_proportion_mated"));
    }
    names
}
