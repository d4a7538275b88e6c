//! Cross-patch relocation.
//!
//! Only active when `movement.cross_patch_movement` is set. An agent draws
//! a log-normal cutoff and may only jump to neighbouring patches whose
//! centres lie within it.

use crate::patch::{Neighbor, PatchId};
use crate::perception::{loudest_ties, AudiblePatch};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, LogNormal};

/// Cutoff redraws allowed before phonotactic dispersal gives up on the
/// loudest patches
pub const MAX_CUTOFF_DRAWS: usize = 1000;

/// Maximum jump length for one dispersal attempt
pub fn sample_cutoff<R: Rng + ?Sized>(dist: &LogNormal<f64>, rng: &mut R) -> f64 {
    dist.sample(rng)
}

/// Undirected dispersal: one cutoff draw, then a uniform pick among the
/// neighbours within reach. `None` if nothing is reachable.
pub fn random_destination<R: Rng + ?Sized>(
    neighbors: &[Neighbor],
    cutoff: &LogNormal<f64>,
    rng: &mut R,
) -> Option<PatchId> {
    if neighbors.is_empty() {
        return None;
    }
    let reach = sample_cutoff(cutoff, rng);
    let reachable: Vec<PatchId> = neighbors
        .iter()
        .filter(|n| n.distance <= reach)
        .map(|n| n.patch)
        .collect();
    reachable.choose(rng).copied()
}

/// Phonotactic dispersal toward the loudest neighbouring patches.
///
/// Keeps redrawing the cutoff until at least one of the near-loudest
/// patches is in reach. Falls back to a uniform pick among them once
/// [`MAX_CUTOFF_DRAWS`] is exhausted.
pub fn phonotactic_destination<R: Rng + ?Sized>(
    audible: &[AudiblePatch],
    tolerance: f64,
    cutoff: &LogNormal<f64>,
    rng: &mut R,
) -> Option<PatchId> {
    let loud = loudest_ties(audible, tolerance);
    if loud.is_empty() {
        return None;
    }

    for _ in 0..MAX_CUTOFF_DRAWS {
        let reach = sample_cutoff(cutoff, rng);
        let reachable: Vec<PatchId> = loud
            .iter()
            .filter(|p| p.distance <= reach)
            .map(|p| p.patch)
            .collect();
        if let Some(&dest) = reachable.choose(rng) {
            return Some(dest);
        }
    }

    log::trace!("cutoff draws exhausted, choosing among {} loud patches", loud.len());
    loud.choose(rng).map(|p| p.patch)
}
