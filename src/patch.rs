//! Habitat patches ("bushes").
//!
//! A patch is a fixed square cell. It owns the index sets of the agents
//! living on it; agents keep only the patch id as a back-reference.

use crate::acoustics;
use crate::organism::{AgentId, Organism, Role};
use rand::Rng;
use std::collections::BTreeSet;

/// Index of a patch inside its landscape
pub type PatchId = usize;

/// Axis-aligned square boundary of a patch (inclusive)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

impl Bounds {
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.left <= x && x <= self.right && self.bottom <= y && y <= self.top
    }
}

/// Directed edge to a nearby patch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub patch: PatchId,
    /// Centre-to-centre distance (cm)
    pub distance: f64,
}

/// A square habitat cell holding agents and an aggregate call amplitude
#[derive(Debug, Clone)]
pub struct Patch {
    pub id: PatchId,
    pub center_x: f64,
    pub center_y: f64,
    /// Side length (cm)
    pub size: f64,
    /// Nearby patches, filled once by the landscape
    pub neighbors: Vec<Neighbor>,
    signallers: BTreeSet<AgentId>,
    receivers: BTreeSet<AgentId>,
    amplitude: f64,
}

impl Patch {
    pub fn new(id: PatchId, center_x: f64, center_y: f64, size: f64) -> Self {
        Self {
            id,
            center_x,
            center_y,
            size,
            neighbors: Vec::new(),
            signallers: BTreeSet::new(),
            receivers: BTreeSet::new(),
            amplitude: 0.0,
        }
    }

    pub fn bounds(&self) -> Bounds {
        let half = 0.5 * self.size;
        Bounds {
            left: self.center_x - half,
            right: self.center_x + half,
            bottom: self.center_y - half,
            top: self.center_y + half,
        }
    }

    /// Whether a point lies on the patch (edges included)
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.bounds().contains(x, y)
    }

    /// Centre-to-centre distance to another patch
    pub fn distance_to(&self, other: &Patch) -> f64 {
        ((self.center_x - other.center_x).powi(2) + (self.center_y - other.center_y).powi(2)).sqrt()
    }

    /// Uniform random point on the patch.
    ///
    /// Proposals are drawn from a square twice the patch side and rejected
    /// until one lands on the patch.
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> (f64, f64) {
        loop {
            let x = rng.gen_range(self.center_x - self.size..=self.center_x + self.size);
            let y = rng.gen_range(self.center_y - self.size..=self.center_y + self.size);
            if self.contains(x, y) {
                return (x, y);
            }
        }
    }

    /// Write a random on-patch location onto an agent
    pub fn place<R: Rng + ?Sized>(&self, organism: &mut Organism, rng: &mut R) {
        let (x, y) = self.random_point(rng);
        organism.x = x;
        organism.y = y;
    }

    /// Register an agent as a resident
    pub fn insert(&mut self, organism: &Organism) {
        match organism.role {
            Role::Signaller(_) => self.signallers.insert(organism.id),
            Role::Receiver(_) => self.receivers.insert(organism.id),
        };
    }

    /// Drop an agent from the residents. Returns false if it was not here.
    pub fn remove(&mut self, organism: &Organism) -> bool {
        match organism.role {
            Role::Signaller(_) => self.signallers.remove(&organism.id),
            Role::Receiver(_) => self.receivers.remove(&organism.id),
        }
    }

    /// Whether the agent is listed as a resident
    pub fn holds(&self, organism: &Organism) -> bool {
        match organism.role {
            Role::Signaller(_) => self.signallers.contains(&organism.id),
            Role::Receiver(_) => self.receivers.contains(&organism.id),
        }
    }

    pub fn signallers(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.signallers.iter().copied()
    }

    pub fn receivers(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.receivers.iter().copied()
    }

    pub fn signaller_count(&self) -> usize {
        self.signallers.len()
    }

    pub fn receiver_count(&self) -> usize {
        self.receivers.len()
    }

    pub fn clear_occupants(&mut self) {
        self.signallers.clear();
        self.receivers.clear();
        self.amplitude = 0.0;
    }

    /// Recompute the aggregate amplitude from residents calling right now
    pub fn refresh_amplitude(&mut self, organisms: &[Organism]) {
        self.amplitude = acoustics::combine_levels(
            self.signallers
                .iter()
                .filter_map(|&id| organisms[id].as_signaller())
                .filter(|s| s.calling)
                .map(|s| s.spl),
        );
    }

    /// Aggregate amplitude as of the last refresh; 0 when nobody calls
    #[inline]
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Patch amplitude heard at `distance` from the patch centre
    pub fn decay(&self, distance: f64, reference: f64) -> f64 {
        acoustics::received_level(self.amplitude, distance, reference)
    }
}
