//! Minimum-distance audit between two posed meshes.

use log::debug;
use serde::Serialize;

use crate::error::Result;
use crate::geometry::{deformed_vertices, min_distance};
use crate::scene::{EntityId, SceneContext};

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct SafetyResult {
    pub violated: bool,
    pub distance: f32,
}

impl SafetyResult {
    /// Strictly below the threshold is a violation; equality is not
    pub fn classify(distance: f32, threshold: f32) -> Self {
        Self {
            violated: distance < threshold,
            distance,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct SafetyAuditor {
    threshold: f32,
}

impl SafetyAuditor {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Compares the posed vertex sets of `a` and `b`. Expects a synchronized
    /// scene; both entities must be meshes.
    pub fn audit(&self, scene: &SceneContext, a: EntityId, b: EntityId) -> Result<SafetyResult> {
        let first = deformed_vertices(scene, a)?;
        let second = deformed_vertices(scene, b)?;
        let distance = min_distance(&first, &second);
        let result = SafetyResult::classify(distance, self.threshold);
        debug!(
            "Safety audit `{}` ({} verts) vs `{}` ({} verts): {:.4} (threshold {:.4}, violated: {})",
            scene.name(a),
            first.len(),
            scene.name(b),
            second.len(),
            distance,
            self.threshold,
            result.violated
        );
        Ok(result)
    }
}
