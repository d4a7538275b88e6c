//! The arena and its patches.
//!
//! Patches are scattered uniformly over a rectangular arena, with side
//! lengths drawn from a normal distribution truncated to positive values.
//! Adjacency is computed once, before any agent moves.

use crate::config::HabitatConfig;
use crate::error::{Result, SimError};
use crate::organism::Organism;
use crate::patch::{Bounds, Neighbor, Patch, PatchId};
use crate::rng::rejection_samples;
use rand::Rng;
use rand_distr::Normal;

/// Rectangular simulation arena (cm)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Arena {
    /// Square arena with its lower-left corner at the origin
    pub fn square(side: f64) -> Self {
        Self {
            min_x: 0.0,
            max_x: side,
            min_y: 0.0,
            max_y: side,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Area in square metres
    pub fn area_m2(&self) -> f64 {
        self.width() * self.height() * 1e-4
    }
}

/// Patches plus their adjacency graph
#[derive(Debug, Clone)]
pub struct Landscape {
    pub arena: Arena,
    patches: Vec<Patch>,
}

impl Landscape {
    /// Scatter patches over the arena at the configured density
    pub fn generate<R: Rng + ?Sized>(arena: Arena, habitat: &HabitatConfig, rng: &mut R) -> Result<Self> {
        let count = (habitat.patch_density * arena.area_m2()).round() as usize;
        if count == 0 {
            return Err(SimError::EmptyLandscape {
                width: arena.width(),
                height: arena.height(),
                density: habitat.patch_density,
            });
        }

        let xs: Vec<f64> = (0..count).map(|_| rng.gen_range(arena.min_x..arena.max_x)).collect();
        let ys: Vec<f64> = (0..count).map(|_| rng.gen_range(arena.min_y..arena.max_y)).collect();

        let size_dist = Normal::new(habitat.patch_size_mean, habitat.patch_size_sd)
            .map_err(|e| SimError::config(format!("patch size distribution: {e}")))?;
        let sizes = rejection_samples(&size_dist, count, |s| s > 0.0, rng)?;

        let patches = xs
            .into_iter()
            .zip(ys)
            .zip(sizes)
            .enumerate()
            .map(|(id, ((x, y), size))| Patch::new(id, x, y, size))
            .collect();

        log::debug!(
            "Generated {} patches over {:.1} m^2 (density {})",
            count,
            arena.area_m2(),
            habitat.patch_density
        );

        Ok(Self::from_patches(arena, patches, habitat.adjacency_threshold))
    }

    /// Build a landscape from explicit patches. Patch ids are reassigned
    /// to match their position.
    pub fn from_patches(arena: Arena, mut patches: Vec<Patch>, adjacency_threshold: f64) -> Self {
        for (id, patch) in patches.iter_mut().enumerate() {
            patch.id = id;
            patch.neighbors.clear();
        }
        let mut landscape = Self { arena, patches };
        landscape.build_adjacency(adjacency_threshold);
        landscape
    }

    /// Record an edge A -> B for every ordered pair whose centres are
    /// closer than the threshold. Coincident centres are not neighbours.
    fn build_adjacency(&mut self, threshold: f64) {
        let n = self.patches.len();
        for a in 0..n {
            let mut neighbors = Vec::new();
            for b in 0..n {
                let distance = self.patches[a].distance_to(&self.patches[b]);
                if distance > 0.0 && distance < threshold {
                    neighbors.push(Neighbor { patch: b, distance });
                }
            }
            self.patches[a].neighbors = neighbors;
        }
    }

    #[inline]
    pub fn patch(&self, id: PatchId) -> &Patch {
        &self.patches[id]
    }

    #[inline]
    pub fn patch_mut(&mut self, id: PatchId) -> &mut Patch {
        &mut self.patches[id]
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn patches_mut(&mut self) -> &mut [Patch] {
        &mut self.patches
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Uniformly chosen patch
    pub fn random_patch<R: Rng + ?Sized>(&self, rng: &mut R) -> PatchId {
        rng.gen_range(0..self.patches.len())
    }

    /// Put a new agent on a random patch at a random spot
    pub fn assign<R: Rng + ?Sized>(&mut self, organism: &mut Organism, rng: &mut R) {
        let id = self.random_patch(rng);
        let patch = &mut self.patches[id];
        patch.place(organism, rng);
        patch.insert(organism);
        organism.patch = id;
    }

    /// Move an agent to a random spot on `destination`, updating both
    /// patches. Returns the straight-line distance jumped, or `None` if
    /// the agent was not listed on its recorded patch.
    pub fn relocate<R: Rng + ?Sized>(
        &mut self,
        organism: &mut Organism,
        destination: PatchId,
        rng: &mut R,
    ) -> Option<f64> {
        if !self.patches[organism.patch].remove(organism) {
            return None;
        }
        let (old_x, old_y) = organism.position();
        let patch = &mut self.patches[destination];
        patch.place(organism, rng);
        patch.insert(organism);
        organism.patch = destination;
        Some(organism.distance_to(old_x, old_y))
    }

    /// Plot extent snapped outward to a grid of `step` cm
    pub fn plot_extent(&self, step: f64) -> Bounds {
        let snap = |min: f64, max: f64| min + ((max - min) / step).ceil() * step;
        Bounds {
            left: self.arena.min_x,
            right: snap(self.arena.min_x, self.arena.max_x),
            bottom: self.arena.min_y,
            top: snap(self.arena.min_y, self.arena.max_y),
        }
    }

    /// Total number of residents over all patches
    pub fn occupant_count(&self) -> usize {
        self.patches
            .iter()
            .map(|p| p.signaller_count() + p.receiver_count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organism::{Receiver, Role};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_patch_count_matches_density() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let habitat = HabitatConfig::default();
        // 10 m x 10 m at 1.625 / m^2
        let landscape = Landscape::generate(Arena::square(1000.0), &habitat, &mut rng).unwrap();
        assert_eq!(landscape.len(), 163);
    }

    #[test]
    fn test_patch_sizes_positive() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let habitat = HabitatConfig {
            patch_size_mean: 5.0,
            patch_size_sd: 20.0,
            ..HabitatConfig::default()
        };
        let landscape = Landscape::generate(Arena::square(2000.0), &habitat, &mut rng).unwrap();
        assert!(landscape.patches().iter().all(|p| p.size > 0.0));
    }

    #[test]
    fn test_empty_arena_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let result = Landscape::generate(Arena::square(10.0), &HabitatConfig::default(), &mut rng);
        assert!(matches!(result, Err(SimError::EmptyLandscape { .. })));
    }

    #[test]
    fn test_adjacency_rule() {
        let patches = vec![
            Patch::new(0, 0.0, 0.0, 10.0),
            Patch::new(1, 300.0, 0.0, 10.0),
            Patch::new(2, 2000.0, 0.0, 10.0),
            Patch::new(3, 0.0, 0.0, 10.0),
        ];
        let landscape = Landscape::from_patches(Arena::square(3000.0), patches, 1000.0);

        for a in landscape.patches() {
            for b in landscape.patches() {
                let d = a.distance_to(b);
                let edges = a.neighbors.iter().filter(|n| n.patch == b.id).count();
                let expected = usize::from(d > 0.0 && d < 1000.0);
                assert_eq!(edges, expected, "edge {} -> {}", a.id, b.id);
            }
        }
        // Coincident centres are not neighbours
        assert!(landscape.patch(0).neighbors.iter().all(|n| n.patch != 3));
        assert_eq!(landscape.patch(2).neighbors.len(), 0);
    }

    #[test]
    fn test_assign_and_relocate() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let patches = vec![Patch::new(0, 50.0, 50.0, 20.0), Patch::new(1, 500.0, 500.0, 40.0)];
        let mut landscape = Landscape::from_patches(Arena::square(1000.0), patches, 1000.0);
        let mut org = Organism::new(0, 0, Role::Receiver(Receiver::default()));

        landscape.assign(&mut org, &mut rng);
        let home = org.patch;
        assert!(landscape.patch(home).holds(&org));
        assert!(landscape.patch(home).contains(org.x, org.y));

        let other = 1 - home;
        let jumped = landscape.relocate(&mut org, other, &mut rng);
        assert!(jumped.is_some());
        assert_eq!(org.patch, other);
        assert!(!landscape.patch(home).holds(&org));
        assert!(landscape.patch(other).holds(&org));
        assert!(landscape.patch(other).contains(org.x, org.y));
        assert_eq!(landscape.occupant_count(), 1);
    }

    #[test]
    fn test_plot_extent_snaps_to_grid() {
        let landscape = Landscape::from_patches(Arena::square(1002.0), Vec::new(), 1000.0);
        let extent = landscape.plot_extent(5.0);
        assert_eq!(extent.right, 1005.0);
        assert_eq!(extent.left, 0.0);
    }
}
