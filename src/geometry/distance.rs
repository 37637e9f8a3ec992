use glam::Vec3;

/// Smallest Euclidean distance over every pair drawn from `a` and `b`.
///
/// Brute force, O(n * m). Returns `f32::INFINITY` when either set is empty.
pub fn min_distance(a: &[Vec3], b: &[Vec3]) -> f32 {
    let mut best = f32::INFINITY;
    for &p in a {
        for &q in b {
            let d = p.distance_squared(q);
            if d < best {
                best = d;
            }
        }
    }
    best.sqrt()
}
