//! World simulation engine - main simulation loop.
//!
//! One `World` is one replicate: a landscape, a fixed population placed on
//! it, and a seeded RNG. Every timestep runs the same phase sequence:
//! call scheduling (at decision boundaries), calling, receiver movement,
//! signaller movement, mating, and the nightly reset.

use crate::config::Config;
use crate::dispersal;
use crate::error::{Result, SimError};
use crate::landscape::{Arena, Landscape};
use crate::organism::{AgentId, MatingRecord, Organism, Receiver, Role, Signaller, Tactic};
use crate::patch::PatchId;
use crate::perception::{self, choose_loudest, listen};
use crate::rng::{rejection_samples, velocity_pool};
use crate::stats::{Stats, StatsHistory};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::{LogNormal, Normal};

/// Head counts of one replicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cohort {
    pub signallers: usize,
    pub receivers: usize,
    /// Signallers carrying the baffling trait
    pub bafflers: usize,
}

impl Cohort {
    /// Split a population by sex ratio (fraction male) and baffling frequency
    pub fn from_population(population: usize, male_ratio: f64, baffle_proportion: f64) -> Self {
        let signallers = ((male_ratio * population as f64).round() as usize).min(population);
        let receivers = population - signallers;
        let bafflers = ((baffle_proportion * signallers as f64).round() as usize).min(signallers);
        Self {
            signallers,
            receivers,
            bafflers,
        }
    }

    pub fn population(&self) -> usize {
        self.signallers + self.receivers
    }
}

/// The simulation world
pub struct World {
    // Population; index == AgentId
    pub organisms: Vec<Organism>,

    // Environment
    pub landscape: Landscape,

    // State
    pub time: u64,

    // Configuration
    pub config: Config,

    // Statistics
    pub stats: Stats,
    pub stats_history: StatsHistory,

    // Iteration orders, reshuffled every step
    signaller_order: Vec<AgentId>,
    receiver_order: Vec<AgentId>,

    // Per-replicate draws
    male_velocities: Vec<f64>,
    female_dispersal: LogNormal<f64>,
    male_dispersal: LogNormal<f64>,

    // Random number generator (seeded for reproducibility)
    rng: ChaCha8Rng,
    seed: u64,

    matings_this_step: usize,
    total_matings: u64,
}

impl World {
    /// Create a new world with a random seed
    pub fn new(config: Config, arena: Arena, cohort: Cohort) -> Result<Self> {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, arena, cohort, seed)
    }

    /// Create a new world with a specific seed for reproducibility.
    ///
    /// The landscape is generated from the same RNG stream as the agents.
    pub fn new_with_seed(config: Config, arena: Arena, cohort: Cohort, seed: u64) -> Result<Self> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let landscape = Landscape::generate(arena, &config.habitat, &mut rng)?;
        Self::build(config, landscape, cohort, rng, seed)
    }

    /// Populate an existing landscape. Any previous occupants are dropped.
    pub fn with_landscape(
        config: Config,
        mut landscape: Landscape,
        cohort: Cohort,
        seed: u64,
    ) -> Result<Self> {
        config.validate()?;
        for patch in landscape.patches_mut() {
            patch.clear_occupants();
        }
        let rng = ChaCha8Rng::seed_from_u64(seed);
        Self::build(config, landscape, cohort, rng, seed)
    }

    fn build(
        config: Config,
        landscape: Landscape,
        cohort: Cohort,
        rng: ChaCha8Rng,
        seed: u64,
    ) -> Result<Self> {
        if landscape.is_empty() && cohort.population() > 0 {
            return Err(SimError::EmptyLandscape {
                width: landscape.arena.width(),
                height: landscape.arena.height(),
                density: config.habitat.patch_density,
            });
        }

        let m = &config.movement;
        let female_dispersal = log_normal(m.female_dispersal.mu, m.female_dispersal.sigma)?;
        let male_dispersal = log_normal(m.male_dispersal.mu, m.male_dispersal.sigma)?;
        let night_length = u64::from(config.timing.night_length);

        let mut world = Self {
            organisms: Vec::with_capacity(cohort.population()),
            landscape,
            time: 0,
            config,
            stats: Stats::new(),
            stats_history: StatsHistory::new(night_length),
            signaller_order: Vec::with_capacity(cohort.signallers),
            receiver_order: Vec::with_capacity(cohort.receivers),
            male_velocities: Vec::new(),
            female_dispersal,
            male_dispersal,
            rng,
            seed,
            matings_this_step: 0,
            total_matings: 0,
        };

        world.populate(cohort)?;
        world.stats.update(&world.organisms);

        log::debug!(
            "World seeded {}: {} signallers ({} bafflers), {} receivers on {} patches",
            seed,
            cohort.signallers,
            cohort.bafflers,
            cohort.receivers,
            world.landscape.len()
        );

        Ok(world)
    }

    /// Create every agent and drop it on a random patch
    fn populate(&mut self, cohort: Cohort) -> Result<()> {
        let acoustics = &self.config.acoustics;
        let calling = &self.config.calling;
        let movement = &self.config.movement;

        let spl = normal(acoustics.source_spl_mean, acoustics.source_spl_sd)?;
        let baffle_boost = normal(acoustics.baffle_advantage_mean, acoustics.baffle_advantage_sd)?;
        let effort = normal(calling.effort_mean, calling.effort_sd)?;
        let male_velocity = log_normal(movement.male_velocity.mu, movement.male_velocity.sigma)?;
        let female_velocity = log_normal(movement.female_velocity.mu, movement.female_velocity.sigma)?;

        self.male_velocities = velocity_pool(&male_velocity, cohort.signallers, &mut self.rng);
        let effort_pool = rejection_samples(
            &effort,
            cohort.signallers,
            |e| e > 0.0 && e <= 1.0,
            &mut self.rng,
        )?;

        for i in 0..cohort.signallers {
            let baffler = i < cohort.bafflers;
            let mut level = spl.sample(&mut self.rng);
            if baffler {
                level += baffle_boost.sample(&mut self.rng);
            }
            let call_effort = effort_pool.choose(&mut self.rng).copied().unwrap_or(calling.effort_mean);

            let id = self.organisms.len();
            let mut org = Organism::new(id, 0, Role::Signaller(Signaller::new(level, call_effort, baffler)));
            self.landscape.assign(&mut org, &mut self.rng);
            self.organisms.push(org);
            self.signaller_order.push(id);
        }

        let female_velocities = velocity_pool(&female_velocity, cohort.receivers, &mut self.rng);
        for _ in 0..cohort.receivers {
            let id = self.organisms.len();
            let mut org = Organism::new(id, 0, Role::Receiver(Receiver::default()));
            org.vel_x = female_velocities.choose(&mut self.rng).copied().unwrap_or(0.0);
            org.vel_y = female_velocities.choose(&mut self.rng).copied().unwrap_or(0.0);
            self.landscape.assign(&mut org, &mut self.rng);
            self.organisms.push(org);
            self.receiver_order.push(id);
        }

        self.signaller_order.shuffle(&mut self.rng);
        self.receiver_order.shuffle(&mut self.rng);
        Ok(())
    }

    /// Main simulation step
    pub fn step(&mut self) {
        self.matings_this_step = 0;

        self.signaller_order.shuffle(&mut self.rng);
        self.receiver_order.shuffle(&mut self.rng);

        // Phase 1: Nightly calling decisions
        if self.time % u64::from(self.config.timing.decision_interval) == 0 {
            self.decide_to_call();
        }

        // Phase 2: Calling
        self.call();

        // Phase 3: Movement (receivers first)
        self.move_receivers();
        self.move_signallers();

        // Phase 4: Mating
        self.mate();

        // Phase 5: Per-night reset
        if self.time % u64::from(self.config.timing.night_length) == 0 {
            self.reset_night();
        }

        self.update_stats();

        debug_assert!(
            self.verify_occupancy().is_ok(),
            "{:?}",
            self.verify_occupancy()
        );

        self.time += 1;
    }

    /// Split the non-bafflers into callers and silent males and draw
    /// tonight's call slots
    fn decide_to_call(&mut self) {
        let night_length = self.config.timing.night_length;
        let proportion = self.config.calling.call_proportion;

        let non_bafflers: Vec<AgentId> = self
            .signaller_order
            .iter()
            .copied()
            .filter(|&id| self.organisms[id].as_signaller().is_some_and(|s| !s.baffler))
            .collect();
        let num_callers = (non_bafflers.len() as f64 * proportion).round() as usize;
        let mut chosen = vec![false; self.organisms.len()];
        for &id in non_bafflers.choose_multiple(&mut self.rng, num_callers) {
            chosen[id] = true;
        }

        let mut scheduled = 0;
        for &id in &self.signaller_order {
            let org = &mut self.organisms[id];
            let Role::Signaller(s) = &mut org.role else {
                continue;
            };

            if s.baffler || chosen[id] {
                s.schedule(draw_call_slots(s.call_effort, night_length, &mut self.rng));
            } else {
                s.schedule(Vec::new());
            }

            if chosen[id] || !s.is_scheduled() {
                org.vel_x = self.male_velocities.choose(&mut self.rng).copied().unwrap_or(0.0);
                org.vel_y = self.male_velocities.choose(&mut self.rng).copied().unwrap_or(0.0);
            }
            if s.is_scheduled() {
                scheduled += 1;
            }
        }

        log::debug!(
            "t={} night {}: {} of {} males scheduled to call",
            self.time,
            self.night(),
            scheduled,
            self.signaller_order.len()
        );
    }

    /// Switch callers on or off for this instant, then refresh patch amplitudes
    fn call(&mut self) {
        let slot = (self.time % u64::from(self.config.timing.night_length)) as u32;

        for org in &mut self.organisms {
            let mating = org.mating;
            if let Role::Signaller(s) = &mut org.role {
                s.calling = s.is_scheduled() && !mating && s.call_slots.contains(&slot);
                if s.calling {
                    s.call_instances += 1;
                }
            }
        }

        for patch in self.landscape.patches_mut() {
            patch.refresh_amplitude(&self.organisms);
        }
    }

    fn move_receivers(&mut self) {
        let order = std::mem::take(&mut self.receiver_order);
        for &id in &order {
            self.receiver_turn(id);
        }
        self.receiver_order = order;
    }

    /// Phonotaxis decision of one receiver
    fn receiver_turn(&mut self, id: AgentId) {
        if self.organisms[id].mating {
            return;
        }
        let movement = &self.config.movement;
        let within = movement.female_within_patch;
        let across = movement.female_across_patch;
        let mated_phonotaxis = movement.mated_phonotaxis;
        let cross_patch = movement.cross_patch_movement;
        let mated = self.organisms[id]
            .as_receiver()
            .is_some_and(|r| r.nightly_mates > 0);

        if self.rng.gen::<f64>() <= within {
            if mated && self.rng.gen::<f64>() > mated_phonotaxis {
                self.wander(id);
                return;
            }

            let heard = listen(
                &self.organisms[id],
                &self.organisms,
                &self.landscape,
                &self.config.acoustics,
            );
            let tolerance = self.config.acoustics.preference_tolerance;
            match choose_loudest(&heard.callers, tolerance, &mut self.rng) {
                Some((target, best)) => {
                    let guaranteed = self.config.acoustics.guaranteed_movement_spl;
                    if perception::approaches(best, guaranteed, &mut self.rng) {
                        let goal = self.organisms[target.id].position();
                        self.approach(id, goal);
                    }
                }
                None => self.wander(id),
            }
            return;
        }

        if cross_patch && self.rng.gen::<f64>() <= across {
            self.receiver_dispersal(id, mated, mated_phonotaxis);
        }
    }

    /// Dormant cross-patch movement of a receiver
    fn receiver_dispersal(&mut self, id: AgentId, mated: bool, mated_phonotaxis: f64) {
        let home = self.organisms[id].patch;

        if mated && self.rng.gen::<f64>() > mated_phonotaxis {
            let dest = dispersal::random_destination(
                &self.landscape.patch(home).neighbors,
                &self.female_dispersal,
                &mut self.rng,
            );
            if let Some(dest) = dest {
                if let Some(d) = self.relocate(id, dest) {
                    self.organisms[id].movement.record_across(d);
                }
            }
            return;
        }

        let heard = listen(
            &self.organisms[id],
            &self.organisms,
            &self.landscape,
            &self.config.acoustics,
        );
        let dest = dispersal::phonotactic_destination(
            &heard.patches,
            self.config.acoustics.preference_tolerance,
            &self.female_dispersal,
            &mut self.rng,
        );
        if let Some(dest) = dest {
            if let Some(d) = self.relocate(id, dest) {
                if let Some(r) = self.organisms[id].as_receiver_mut() {
                    r.phonotaxis.record_across(d);
                }
            }
        }
    }

    /// Undirected males; bafflers and mating males stay put
    fn move_signallers(&mut self) {
        let within = self.config.movement.male_within_patch;
        let across = self.config.movement.male_across_patch;
        let cross_patch = self.config.movement.cross_patch_movement;

        let order = std::mem::take(&mut self.signaller_order);
        for &id in &order {
            let org = &self.organisms[id];
            if org.mating || org.as_signaller().is_some_and(|s| s.baffler) {
                continue;
            }

            if self.rng.gen::<f64>() <= within {
                self.wander(id);
                continue;
            }

            if cross_patch && self.rng.gen::<f64>() <= across {
                let dest = dispersal::random_destination(
                    &self.landscape.patch(org.patch).neighbors,
                    &self.male_dispersal,
                    &mut self.rng,
                );
                if let Some(dest) = dest {
                    if let Some(d) = self.relocate(id, dest) {
                        self.organisms[id].movement.record_across(d);
                    }
                }
            }
        }
        self.signaller_order = order;
    }

    /// Random within-patch step
    fn wander(&mut self, id: AgentId) {
        let patch = self.landscape.patch(self.organisms[id].patch);
        let goal = patch.random_point(&mut self.rng);
        let bounds = patch.bounds();
        let org = &mut self.organisms[id];
        let moved = org.move_towards(goal, &bounds);
        org.movement.record_within(moved);
    }

    /// Within-patch step toward a heard caller
    fn approach(&mut self, id: AgentId, goal: (f64, f64)) {
        let bounds = self.landscape.patch(self.organisms[id].patch).bounds();
        let org = &mut self.organisms[id];
        let moved = org.move_towards(goal, &bounds);
        if let Some(r) = org.as_receiver_mut() {
            r.phonotaxis.record_within(moved);
        }
    }

    fn relocate(&mut self, id: AgentId, dest: PatchId) -> Option<f64> {
        let jumped = self
            .landscape
            .relocate(&mut self.organisms[id], dest, &mut self.rng);
        if jumped.is_none() {
            log::error!(
                "agent {} missing from patch {} during relocation",
                id,
                self.organisms[id].patch
            );
        }
        jumped
    }

    /// Pair receivers with nearby free males, then tick mating timers
    fn mate(&mut self) {
        let reach = self.config.movement.mating_distance;
        let duration = self.config.timing.mating_duration;

        for i in 0..self.receiver_order.len() {
            let rid = self.receiver_order[i];
            if self.organisms[rid].mating {
                continue;
            }
            let (rx, ry) = self.organisms[rid].position();

            let close: Vec<AgentId> = self
                .signaller_order
                .iter()
                .copied()
                .filter(|&sid| {
                    let male = &self.organisms[sid];
                    !male.mating && male.distance_to(rx, ry) < reach
                })
                .collect();

            let Some(&sid) = close.choose(&mut self.rng) else {
                continue;
            };
            let Some(tactic) = self.organisms[sid].as_signaller().map(Signaller::tactic) else {
                continue;
            };

            self.organisms[sid].begin_mating();
            let female = &mut self.organisms[rid];
            female.begin_mating();
            if let Some(r) = female.as_receiver_mut() {
                r.nightly_mates += 1;
                r.mate_history.push(MatingRecord {
                    partner: sid,
                    tactic,
                    time: self.time,
                });
            }
            self.matings_this_step += 1;
            self.total_matings += 1;
        }

        for &sid in &self.signaller_order {
            self.organisms[sid].advance_mating(duration);
        }

        for i in 0..self.receiver_order.len() {
            let rid = self.receiver_order[i];
            if self.organisms[rid].advance_mating(duration) {
                let dest = self.landscape.random_patch(&mut self.rng);
                self.relocate(rid, dest);
            }
        }
    }

    fn reset_night(&mut self) {
        for org in &mut self.organisms {
            if let Some(r) = org.as_receiver_mut() {
                r.nightly_mates = 0;
            }
        }
    }

    /// Update statistics
    fn update_stats(&mut self) {
        self.stats.time = self.time;
        self.stats.night = self.night();
        self.stats.matings = self.matings_this_step;
        self.stats.total_matings = self.total_matings;
        self.stats.update(&self.organisms);

        if self.stats_history.due(self.time) {
            self.stats_history.record(self.stats.clone());
        }
    }

    /// Run simulation for specified number of steps
    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Run simulation with callback for progress updates
    pub fn run_with_callback<F>(&mut self, steps: u64, mut callback: F)
    where
        F: FnMut(&World, u64),
    {
        for i in 0..steps {
            self.step();
            callback(self, i);
        }
    }

    /// Check that every agent is listed by exactly one patch, that the
    /// patch is the one it points to, and that it sits inside that patch
    pub fn verify_occupancy(&self) -> Result<()> {
        let mut listed = vec![0usize; self.organisms.len()];

        for patch in self.landscape.patches() {
            let entries = patch
                .signallers()
                .map(|id| (id, true))
                .chain(patch.receivers().map(|id| (id, false)));
            for (id, as_signaller) in entries {
                let Some(org) = self.organisms.get(id) else {
                    return Err(SimError::InvariantViolation(format!(
                        "patch {} lists unknown agent {}",
                        patch.id, id
                    )));
                };
                if org.is_signaller() != as_signaller {
                    return Err(SimError::InvariantViolation(format!(
                        "patch {} lists agent {} under the wrong role",
                        patch.id, id
                    )));
                }
                if org.patch != patch.id {
                    return Err(SimError::InvariantViolation(format!(
                        "agent {} points to patch {} but is listed by patch {}",
                        id, org.patch, patch.id
                    )));
                }
                listed[id] += 1;
            }
        }

        for (id, &count) in listed.iter().enumerate() {
            if count != 1 {
                return Err(SimError::InvariantViolation(format!(
                    "agent {} is listed by {} patches",
                    id, count
                )));
            }
            let org = &self.organisms[id];
            if !self.landscape.patch(org.patch).contains(org.x, org.y) {
                return Err(SimError::InvariantViolation(format!(
                    "agent {} at ({:.2}, {:.2}) lies outside patch {}",
                    id, org.x, org.y, org.patch
                )));
            }
        }

        Ok(())
    }

    /// Night index of the current timestep
    pub fn night(&self) -> u64 {
        self.time / u64::from(self.config.timing.night_length)
    }

    /// Get current population count
    pub fn population(&self) -> usize {
        self.organisms.len()
    }

    pub fn signallers(&self) -> impl Iterator<Item = (&Organism, &Signaller)> + '_ {
        self.organisms
            .iter()
            .filter_map(|o| o.as_signaller().map(|s| (o, s)))
    }

    pub fn receivers(&self) -> impl Iterator<Item = (&Organism, &Receiver)> + '_ {
        self.organisms
            .iter()
            .filter_map(|o| o.as_receiver().map(|r| (o, r)))
    }

    /// Males per lifetime tactic, in [`Tactic::ALL`] order
    pub fn tactic_counts(&self) -> [usize; 3] {
        let mut counts = [0; 3];
        for (_, s) in self.signallers() {
            let idx = match s.lifetime_tactic() {
                Tactic::Baffler => 0,
                Tactic::Caller => 1,
                Tactic::Silent => 2,
            };
            counts[idx] += 1;
        }
        counts
    }

    /// Pairings since the start of the replicate
    pub fn total_matings(&self) -> u64 {
        self.total_matings
    }

    /// Get seed for reproducibility
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Call slots for one night: `round(effort * night)` draws with replacement
fn draw_call_slots<R: Rng + ?Sized>(effort: f64, night_length: u32, rng: &mut R) -> Vec<u32> {
    let count = (effort * f64::from(night_length)).round() as usize;
    (0..count).map(|_| rng.gen_range(0..night_length)).collect()
}

fn normal(mean: f64, sd: f64) -> Result<Normal<f64>> {
    Normal::new(mean, sd).map_err(|e| SimError::config(format!("normal({mean}, {sd}): {e}")))
}

fn log_normal(mu: f64, sigma: f64) -> Result<LogNormal<f64>> {
    LogNormal::new(mu, sigma).map_err(|e| SimError::config(format!("log-normal({mu}, {sigma}): {e}")))
}
