use serde::Serialize;

use crate::safety::SafetyResult;

/// One row of the dataset log, created once per rendered image
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ImageRecord {
    pub image_index: u64,
    pub safety_violation: bool,
    pub min_distance: f32,
}

impl ImageRecord {
    pub fn new(image_index: u64, safety: &SafetyResult) -> Self {
        Self {
            image_index,
            safety_violation: safety.violated,
            min_distance: safety.distance,
        }
    }

    pub fn image_name(&self) -> String {
        image_name(self.image_index)
    }
}

/// `image_000042.jpg`
pub fn image_name(index: u64) -> String {
    format!("image_{index:06}.jpg")
}

/// Index embedded in an image file name, if it has the `image_N.ext` shape
pub fn parse_image_index(name: &str) -> Option<u64> {
    let stem = name.split('.').next()?;
    stem.strip_prefix("image_")?.parse().ok()
}

/// An iteration that produced no image
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IterationFailure {
    pub iteration: u32,
    pub reason: String,
}
