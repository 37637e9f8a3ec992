//! Uniform draws of transform components from configured ranges.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{PlanarRange, RangeSpec, SpatialRange};
use crate::scene::Transform;

/// Owns the run's random generator; every randomized value goes through here
#[derive(Debug, Clone)]
pub struct TransformSampler {
    rng: StdRng,
}

impl TransformSampler {
    /// Reproducible sampler
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniform value in the closed interval `[range.min, range.max]`
    pub fn sample(&mut self, range: &RangeSpec) -> f32 {
        if range.min >= range.max {
            return range.min;
        }
        self.rng.gen_range(range.min..=range.max)
    }

    /// Angle drawn in degrees, returned in radians
    pub fn sample_angle(&mut self, degrees: &RangeSpec) -> f32 {
        self.sample(degrees).to_radians()
    }

    /// Writes x and y; z is left untouched
    pub fn sample_planar_position(&mut self, transform: &mut Transform, range: &PlanarRange) {
        transform.location.x = self.sample(&range.x);
        transform.location.y = self.sample(&range.y);
    }

    pub fn sample_spatial_position(&mut self, transform: &mut Transform, range: &SpatialRange) {
        transform.location = Vec3::new(
            self.sample(&range.x),
            self.sample(&range.y),
            self.sample(&range.z),
        );
    }

    /// Independent x/y factors with z pinned to 1 so flat parts stay flat
    pub fn sample_planar_scale(&mut self, transform: &mut Transform, range: &PlanarRange) {
        transform.scale = Vec3::new(self.sample(&range.x), self.sample(&range.y), 1.0);
    }
}
