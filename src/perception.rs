//! What a receiver hears, and how she picks among what she hears.

use crate::config::AcousticConfig;
use crate::landscape::Landscape;
use crate::organism::{AgentId, Organism};
use crate::patch::PatchId;
use rand::seq::SliceRandom;
use rand::Rng;

/// A caller on the home patch loud enough to be detected
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudibleCaller {
    pub id: AgentId,
    /// Received level (dB SPL)
    pub level: f64,
}

/// Aggregate sound of a neighbouring patch, unfiltered
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudiblePatch {
    pub patch: PatchId,
    /// Centre-to-centre distance (cm)
    pub distance: f64,
    /// Patch amplitude decayed over `distance`
    pub level: f64,
}

/// Everything one receiver perceives at one instant
#[derive(Debug, Clone, Default)]
pub struct Soundscape {
    pub callers: Vec<AudibleCaller>,
    pub patches: Vec<AudiblePatch>,
}

/// Something a receiver can choose by loudness
pub trait Loudness {
    fn level(&self) -> f64;
}

impl Loudness for AudibleCaller {
    fn level(&self) -> f64 {
        self.level
    }
}

impl Loudness for AudiblePatch {
    fn level(&self) -> f64 {
        self.level
    }
}

/// Collect what `receiver` hears.
///
/// Home-patch signallers count when they are calling, not mating and heard
/// at or above the detection threshold. Every neighbouring patch is
/// reported with its decayed aggregate amplitude and no threshold.
pub fn listen(
    receiver: &Organism,
    organisms: &[Organism],
    landscape: &Landscape,
    acoustics: &AcousticConfig,
) -> Soundscape {
    let home = landscape.patch(receiver.patch);

    let callers = home
        .signallers()
        .filter_map(|id| {
            let caller = &organisms[id];
            let signaller = caller.as_signaller()?;
            if !signaller.calling || caller.mating {
                return None;
            }
            let distance = receiver.distance_to(caller.x, caller.y);
            let level = signaller.decay(distance, acoustics.reference_distance);
            (level >= acoustics.detection_threshold).then_some(AudibleCaller { id, level })
        })
        .collect();

    let patches = home
        .neighbors
        .iter()
        .map(|n| AudiblePatch {
            patch: n.patch,
            distance: n.distance,
            level: landscape
                .patch(n.patch)
                .decay(n.distance, acoustics.reference_distance),
        })
        .collect();

    Soundscape { callers, patches }
}

/// Candidates whose level lies strictly within `tolerance` of the loudest
pub fn loudest_ties<T: Loudness + Copy>(candidates: &[T], tolerance: f64) -> Vec<T> {
    let best = candidates
        .iter()
        .map(Loudness::level)
        .fold(f64::NEG_INFINITY, f64::max);
    candidates
        .iter()
        .copied()
        .filter(|c| (c.level() - best).abs() < tolerance)
        .collect()
}

/// Pick uniformly among the near-loudest candidates.
///
/// Returns the choice together with the maximum level heard, or `None`
/// when there is nothing to choose from.
pub fn choose_loudest<T, R>(candidates: &[T], tolerance: f64, rng: &mut R) -> Option<(T, f64)>
where
    T: Loudness + Copy,
    R: Rng + ?Sized,
{
    let best = candidates
        .iter()
        .map(Loudness::level)
        .fold(f64::NEG_INFINITY, f64::max);
    let ties = loudest_ties(candidates, tolerance);
    ties.choose(rng).map(|&c| (c, best))
}

/// Probability-weighted approach decision.
///
/// Movement is certain once `best` reaches the guaranteed level and
/// proportionally less likely below it.
pub fn approaches<R: Rng + ?Sized>(best: f64, guaranteed: f64, rng: &mut R) -> bool {
    best / guaranteed >= rng.gen::<f64>()
}
