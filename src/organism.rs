//! Agent structure and behavior.
//!
//! Every agent shares position, velocity, patch membership, mating state
//! and movement counters. What differs between males and females lives in
//! [`Role`], fixed when the agent is created.

use crate::acoustics;
use crate::patch::{Bounds, PatchId};

/// Stable agent identifier; also the agent's index in the world's arena
pub type AgentId = usize;

/// Alternative reproductive tactic of a male
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tactic {
    /// Calls through a leaf baffle; louder and stationary
    Baffler,
    /// Calls without modification
    Caller,
    /// Does not call
    Silent,
}

impl Tactic {
    pub const ALL: [Tactic; 3] = [Tactic::Baffler, Tactic::Caller, Tactic::Silent];

    /// Column prefix used in result tables
    pub fn label(&self) -> &'static str {
        match self {
            Tactic::Baffler => "baffle",
            Tactic::Caller => "caller",
            Tactic::Silent => "silent",
        }
    }
}

/// Step and distance tallies for one kind of movement
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementCounters {
    pub within_steps: u32,
    pub within_distance: f64,
    pub across_steps: u32,
    pub across_distance: f64,
}

impl MovementCounters {
    pub fn record_within(&mut self, distance: f64) {
        self.within_steps += 1;
        self.within_distance += distance;
    }

    pub fn record_across(&mut self, distance: f64) {
        self.across_steps += 1;
        self.across_distance += distance;
    }

    pub fn total_steps(&self) -> u32 {
        self.within_steps + self.across_steps
    }

    pub fn total_distance(&self) -> f64 {
        self.within_distance + self.across_distance
    }
}

/// Male-specific state
#[derive(Debug, Clone)]
pub struct Signaller {
    /// Source level in dB SPL, baffle boost included
    pub spl: f64,
    pub baffler: bool,
    /// Fraction of the night this male intends to call
    pub call_effort: f64,
    /// Timesteps (modulo night length) scheduled for calling tonight
    pub call_slots: Vec<u32>,
    /// Calling at this instant
    pub calling: bool,
    /// Number of timesteps spent calling
    pub call_instances: u32,
    /// Scheduled to call on at least one night
    pub ever_scheduled: bool,
}

impl Signaller {
    pub fn new(spl: f64, call_effort: f64, baffler: bool) -> Self {
        Self {
            spl,
            baffler,
            call_effort,
            call_slots: Vec::new(),
            calling: false,
            call_instances: 0,
            ever_scheduled: false,
        }
    }

    /// Replace tonight's calling schedule
    pub fn schedule(&mut self, slots: Vec<u32>) {
        self.ever_scheduled |= !slots.is_empty();
        self.call_slots = slots;
    }

    #[inline]
    pub fn is_scheduled(&self) -> bool {
        !self.call_slots.is_empty()
    }

    /// Tactic on the current night
    pub fn tactic(&self) -> Tactic {
        if self.baffler {
            Tactic::Baffler
        } else if self.is_scheduled() {
            Tactic::Caller
        } else {
            Tactic::Silent
        }
    }

    /// Tactic over the whole replicate, used for result grouping
    pub fn lifetime_tactic(&self) -> Tactic {
        if self.baffler {
            Tactic::Baffler
        } else if self.ever_scheduled {
            Tactic::Caller
        } else {
            Tactic::Silent
        }
    }

    /// Level received at `distance`; 0 whenever the male is not calling
    pub fn decay(&self, distance: f64, reference: f64) -> f64 {
        if !self.calling {
            return 0.0;
        }
        acoustics::received_level(self.spl, distance, reference)
    }

    /// Radius within which this male is audible at `threshold`
    pub fn active_space(&self, threshold: f64, reference: f64) -> f64 {
        acoustics::active_space_radius(self.spl, threshold, reference)
    }
}

/// One mating event as seen by the female
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatingRecord {
    pub partner: AgentId,
    pub tactic: Tactic,
    pub time: u64,
}

/// Female-specific state
#[derive(Debug, Clone, Default)]
pub struct Receiver {
    /// Movement toward a heard caller or patch
    pub phonotaxis: MovementCounters,
    /// Matings since the last night boundary
    pub nightly_mates: u32,
    pub mate_history: Vec<MatingRecord>,
}

/// Variant-specific part of an agent
#[derive(Debug, Clone)]
pub enum Role {
    Signaller(Signaller),
    Receiver(Receiver),
}

/// An agent in the simulation
#[derive(Debug, Clone)]
pub struct Organism {
    pub id: AgentId,

    // Position (cm) and per-axis velocity (cm/timestep)
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,

    /// Patch this agent lives on; the patch is the authority
    pub patch: PatchId,

    pub mating: bool,
    pub mating_timer: u32,
    /// Lifetime number of matings
    pub mate_count: u32,

    /// Undirected movement
    pub movement: MovementCounters,

    pub role: Role,
}

impl Organism {
    pub fn new(id: AgentId, patch: PatchId, role: Role) -> Self {
        Self {
            id,
            x: 0.0,
            y: 0.0,
            vel_x: 0.0,
            vel_y: 0.0,
            patch,
            mating: false,
            mating_timer: 0,
            mate_count: 0,
            movement: MovementCounters::default(),
            role,
        }
    }

    #[inline]
    pub fn is_signaller(&self) -> bool {
        matches!(self.role, Role::Signaller(_))
    }

    #[inline]
    pub fn is_receiver(&self) -> bool {
        matches!(self.role, Role::Receiver(_))
    }

    pub fn as_signaller(&self) -> Option<&Signaller> {
        match &self.role {
            Role::Signaller(s) => Some(s),
            Role::Receiver(_) => None,
        }
    }

    pub fn as_signaller_mut(&mut self) -> Option<&mut Signaller> {
        match &mut self.role {
            Role::Signaller(s) => Some(s),
            Role::Receiver(_) => None,
        }
    }

    pub fn as_receiver(&self) -> Option<&Receiver> {
        match &self.role {
            Role::Receiver(r) => Some(r),
            Role::Signaller(_) => None,
        }
    }

    pub fn as_receiver_mut(&mut self) -> Option<&mut Receiver> {
        match &mut self.role {
            Role::Receiver(r) => Some(r),
            Role::Signaller(_) => None,
        }
    }

    #[inline]
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Euclidean distance to a point
    #[inline]
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }

    /// Received level of this agent's call at `distance` (receivers are silent)
    pub fn decay(&self, distance: f64, reference: f64) -> f64 {
        self.as_signaller()
            .map_or(0.0, |s| s.decay(distance, reference))
    }

    /// Advance one step toward `target`, then reflect off the patch edges.
    ///
    /// Each axis moves by its own velocity component along the unit vector
    /// to the target; the agent lands on the target instead of overshooting
    /// it. Returns the distance actually covered.
    pub fn move_towards(&mut self, target: (f64, f64), bounds: &Bounds) -> f64 {
        let (start_x, start_y) = (self.x, self.y);

        let dx = target.0 - self.x;
        let dy = target.1 - self.y;
        let dist = (dx * dx + dy * dy).sqrt();
        let (ux, uy) = if dist > 0.0 { (dx / dist, dy / dist) } else { (0.0, 0.0) };

        let step = ((ux * self.vel_x).powi(2) + (uy * self.vel_y).powi(2)).sqrt();
        if dist > step {
            self.x += ux * self.vel_x;
            self.y += uy * self.vel_y;
        } else {
            self.x = target.0;
            self.y = target.1;
        }

        self.reflect(bounds);

        ((self.x - start_x).powi(2) + (self.y - start_y).powi(2)).sqrt()
    }

    /// Mirror the position back across any edge it crossed, turning the
    /// matching velocity component inward.
    fn reflect(&mut self, b: &Bounds) {
        if self.x > b.right {
            self.x = 2.0 * b.right - self.x;
            if self.vel_x > 0.0 {
                self.vel_x = -self.vel_x;
            }
        }
        if self.x < b.left {
            self.x = 2.0 * b.left - self.x;
            if self.vel_x < 0.0 {
                self.vel_x = -self.vel_x;
            }
        }
        if self.y > b.top {
            self.y = 2.0 * b.top - self.y;
            if self.vel_y > 0.0 {
                self.vel_y = -self.vel_y;
            }
        }
        if self.y < b.bottom {
            self.y = 2.0 * b.bottom - self.y;
            if self.vel_y < 0.0 {
                self.vel_y = -self.vel_y;
            }
        }

        // A single mirror can still land past the opposite edge on small patches
        self.x = self.x.clamp(b.left, b.right);
        self.y = self.y.clamp(b.bottom, b.top);
    }

    /// Enter the mating state and count the mate
    pub fn begin_mating(&mut self) {
        self.mating = true;
        self.mating_timer = 0;
        self.mate_count += 1;
    }

    /// Tick the mating timer. Returns true on the step the mating ends.
    pub fn advance_mating(&mut self, duration: u32) -> bool {
        if !self.mating {
            return false;
        }
        self.mating_timer += 1;
        if self.mating_timer >= duration {
            self.mating = false;
            self.mating_timer = 0;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Patch;

    fn male(calling: bool) -> Organism {
        let mut s = Signaller::new(62.0, 0.5, false);
        s.calling = calling;
        Organism::new(0, 0, Role::Signaller(s))
    }

    #[test]
    fn test_silent_male_decay_is_zero() {
        let org = male(false);
        for d in [0.0, 1.0, 20.0, 500.0] {
            assert_eq!(org.decay(d, 20.0), 0.0);
        }
    }

    #[test]
    fn test_calling_male_decay_decreasing() {
        let org = male(true);
        assert_eq!(org.decay(0.0, 20.0), 62.0);
        let mut last = f64::INFINITY;
        for d in [0.5, 1.0, 10.0, 20.0, 100.0, 1000.0] {
            let level = org.decay(d, 20.0);
            assert!(level < last);
            last = level;
        }
    }

    #[test]
    fn test_move_stops_at_target() {
        let patch = Patch::new(0, 0.0, 0.0, 100.0);
        let mut org = male(false);
        org.vel_x = 50.0;
        org.vel_y = 50.0;
        let moved = org.move_towards((3.0, 4.0), &patch.bounds());
        assert_eq!(org.position(), (3.0, 4.0));
        assert!((moved - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_move_partial_step() {
        let patch = Patch::new(0, 0.0, 0.0, 100.0);
        let mut org = male(false);
        org.vel_x = 2.0;
        org.vel_y = 2.0;
        org.move_towards((40.0, 0.0), &patch.bounds());
        assert!((org.x - 2.0).abs() < 1e-12);
        assert_eq!(org.y, 0.0);
    }

    #[test]
    fn test_reflection_flips_outward_velocity() {
        let patch = Patch::new(0, 0.0, 0.0, 10.0);
        let mut org = male(false);
        org.x = 4.0;
        // Unequal axis speeds bend the path past the right edge
        org.vel_x = 10.0;
        org.vel_y = 0.1;
        org.move_towards((4.9, 4.9), &patch.bounds());
        assert!(patch.contains(org.x, org.y));
        assert!(org.x < 5.0);
        assert!(org.vel_x < 0.0);
    }

    #[test]
    fn test_reversed_velocity_reflects_inside() {
        let patch = Patch::new(0, 0.0, 0.0, 10.0);
        let mut org = male(false);
        org.x = -4.0;
        org.vel_x = -3.0;
        org.vel_y = 0.0;
        // Negative velocity pushes away from the target and over the left edge
        org.move_towards((4.0, 0.0), &patch.bounds());
        assert!(patch.contains(org.x, org.y));
        assert!((org.x - (-3.0)).abs() < 1e-12);
        assert!(org.vel_x > 0.0);
    }

    #[test]
    fn test_mating_timer() {
        let mut org = male(false);
        org.begin_mating();
        assert_eq!(org.mate_count, 1);
        for _ in 0..5 {
            assert!(!org.advance_mating(6));
            assert!(org.mating);
        }
        assert!(org.advance_mating(6));
        assert!(!org.mating);
        assert_eq!(org.mating_timer, 0);
    }

    #[test]
    fn test_tactic_classification() {
        let mut s = Signaller::new(60.0, 0.5, false);
        assert_eq!(s.tactic(), Tactic::Silent);
        s.schedule(vec![3, 7]);
        assert_eq!(s.tactic(), Tactic::Caller);
        s.schedule(Vec::new());
        assert_eq!(s.tactic(), Tactic::Silent);
        assert_eq!(s.lifetime_tactic(), Tactic::Caller);
        assert_eq!(Signaller::new(70.0, 0.5, true).lifetime_tactic(), Tactic::Baffler);
    }
}
