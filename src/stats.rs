//! Statistics tracking for the simulation.
//!
//! [`Stats`] is the per-step snapshot kept by the world; [`Summary`]
//! reduces a group of per-agent counters to the descriptive statistics
//! written to result tables.

use crate::organism::{Organism, Role};
use serde::{Deserialize, Serialize};

/// Statistics snapshot for a simulation step
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Current simulation time
    pub time: u64,
    /// Night index (time / night length)
    pub night: u64,
    pub signallers: usize,
    pub receivers: usize,
    /// Males calling this instant
    pub calling: usize,
    /// Agents currently in a mating bout
    pub mating: usize,
    /// Pairings started this step
    pub matings: usize,
    /// Pairings since the start of the replicate
    pub total_matings: u64,
    /// Mean lifetime call instances per male
    pub call_instances_mean: f64,
    /// Mean undirected distance moved per agent (cm)
    pub distance_mean: f64,
}

impl Stats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats from current simulation state
    pub fn update(&mut self, organisms: &[Organism]) {
        self.signallers = 0;
        self.receivers = 0;
        self.calling = 0;
        self.mating = 0;

        let mut call_instances = 0u64;
        let mut distance = 0.0;

        for org in organisms {
            match &org.role {
                Role::Signaller(s) => {
                    self.signallers += 1;
                    self.calling += usize::from(s.calling);
                    call_instances += u64::from(s.call_instances);
                }
                Role::Receiver(_) => self.receivers += 1,
            }
            self.mating += usize::from(org.mating);
            distance += org.movement.total_distance();
        }

        self.call_instances_mean = if self.signallers > 0 {
            call_instances as f64 / self.signallers as f64
        } else {
            0.0
        };
        self.distance_mean = if organisms.is_empty() {
            0.0
        } else {
            distance / organisms.len() as f64
        };
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "T:{:6} | Night:{:3} | M:{:5} F:{:5} | Calling:{:4} | Mating:{:4} | Pairs:{:3} (total {}) | Dist:{:.1}",
            self.time,
            self.night,
            self.signallers,
            self.receivers,
            self.calling,
            self.mating,
            self.matings,
            self.total_matings,
            self.distance_mean,
        )
    }
}

/// Historical statistics tracker
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    /// All recorded stats snapshots
    pub snapshots: Vec<Stats>,
    /// Recording interval
    pub interval: u64,
}

impl StatsHistory {
    /// Create new history with recording interval
    pub fn new(interval: u64) -> Self {
        Self {
            snapshots: Vec::new(),
            interval: interval.max(1),
        }
    }

    /// Record a stats snapshot
    pub fn record(&mut self, stats: Stats) {
        self.snapshots.push(stats);
    }

    /// Whether a snapshot is due at `time`
    pub fn due(&self, time: u64) -> bool {
        time % self.interval == 0
    }

    /// Cumulative matings over time
    pub fn matings_series(&self) -> Vec<(u64, u64)> {
        self.snapshots
            .iter()
            .map(|s| (s.time, s.total_matings))
            .collect()
    }

    /// Number of callers over time
    pub fn calling_series(&self) -> Vec<(u64, usize)> {
        self.snapshots.iter().map(|s| (s.time, s.calling)).collect()
    }
}

/// Descriptive statistics of one group of values.
///
/// Moments follow the biased (population) conventions. An empty group
/// yields NaN everywhere; zero variance yields NaN skew and kurtosis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub sd: f64,
    /// Excess (Fisher) kurtosis
    pub kurtosis: f64,
    pub skew: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

impl Summary {
    pub const EMPTY: Summary = Summary {
        count: 0,
        mean: f64::NAN,
        sd: f64::NAN,
        kurtosis: f64::NAN,
        skew: f64::NAN,
        min: f64::NAN,
        max: f64::NAN,
        median: f64::NAN,
    };

    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::EMPTY;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;

        let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
        for &v in values {
            let d = v - mean;
            let d2 = d * d;
            m2 += d2;
            m3 += d2 * d;
            m4 += d2 * d2;
        }
        m2 /= n;
        m3 /= n;
        m4 /= n;

        let (skew, kurtosis) = if m2 > 0.0 {
            (m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0)
        } else {
            (f64::NAN, f64::NAN)
        };

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            0.5 * (sorted[mid - 1] + sorted[mid])
        } else {
            sorted[mid]
        };

        Self {
            count: values.len(),
            mean,
            sd: m2.sqrt(),
            kurtosis,
            skew,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            median,
        }
    }

    /// Values in result-table order: mean, sd, kurtosis, skew, min, max, median
    pub fn as_array(&self) -> [f64; 7] {
        [
            self.mean,
            self.sd,
            self.kurtosis,
            self.skew,
            self.min,
            self.max,
            self.median,
        ]
    }
}

/// Fraction of strictly positive values; NaN for an empty slice
pub fn proportion_positive(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().filter(|&&v| v > 0.0).count() as f64 / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organism::{Receiver, Signaller};

    #[test]
    fn test_stats_update() {
        let mut caller = Signaller::new(60.0, 0.5, false);
        caller.calling = true;
        caller.call_instances = 4;
        let mut female = Organism::new(1, 0, Role::Receiver(Receiver::default()));
        female.mating = true;
        female.movement.record_within(3.0);
        let organisms = vec![Organism::new(0, 0, Role::Signaller(caller)), female];

        let mut stats = Stats::new();
        stats.update(&organisms);

        assert_eq!(stats.signallers, 1);
        assert_eq!(stats.receivers, 1);
        assert_eq!(stats.calling, 1);
        assert_eq!(stats.mating, 1);
        assert_eq!(stats.call_instances_mean, 4.0);
        assert_eq!(stats.distance_mean, 1.5);
    }

    #[test]
    fn test_snapshot_only_carries_model_quantities() {
        let yaml = serde_yaml::to_string(&Stats::new()).unwrap();
        let keys: Vec<&str> = yaml.lines().filter_map(|l| l.split(':').next()).collect();
        assert_eq!(
            keys,
            [
                "time",
                "night",
                "signallers",
                "receivers",
                "calling",
                "mating",
                "matings",
                "total_matings",
                "call_instances_mean",
                "distance_mean",
            ]
        );
    }

    #[test]
    fn test_stats_history() {
        let mut history = StatsHistory::new(10);

        for i in 0..5 {
            let mut stats = Stats::new();
            stats.time = i * 10;
            stats.total_matings = i * 2;
            history.record(stats);
        }

        let series = history.matings_series();
        assert_eq!(series.len(), 5);
        assert_eq!(series[0], (0, 0));
        assert_eq!(series[4], (40, 8));
        assert!(history.due(20));
        assert!(!history.due(21));
    }

    #[test]
    fn test_summary_moments() {
        let s = Summary::of(&[1.0, 2.0, 3.0, 4.0, 10.0]);
        assert_eq!(s.count, 5);
        assert!((s.mean - 4.0).abs() < 1e-12);
        assert!((s.sd - 10.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(s.median, 3.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 10.0);
        // Right-skewed sample
        assert!(s.skew > 0.0);
        assert!((s.skew - 1.1384199576606167).abs() < 1e-9);
        assert!((s.kurtosis - (-0.212)).abs() < 1e-9);
    }

    #[test]
    fn test_summary_even_median() {
        assert_eq!(Summary::of(&[4.0, 1.0, 3.0, 2.0]).median, 2.5);
    }

    #[test]
    fn test_empty_group_is_nan() {
        let s = Summary::of(&[]);
        assert_eq!(s.count, 0);
        assert!(s.as_array().iter().all(|v| v.is_nan()));
        assert!(proportion_positive(&[]).is_nan());
    }

    #[test]
    fn test_constant_group() {
        let s = Summary::of(&[2.0, 2.0, 2.0]);
        assert_eq!(s.sd, 0.0);
        assert!(s.skew.is_nan());
        assert!(s.kurtosis.is_nan());
        assert_eq!(s.median, 2.0);
    }

    #[test]
    fn test_proportion_positive() {
        assert_eq!(proportion_positive(&[0.0, 1.0, 2.0, 0.0]), 0.5);
    }
}
