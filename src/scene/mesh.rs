use glam::{Mat4, Vec3};
use std::collections::HashMap;

use super::EntityId;
use crate::math::AABB;

/// Up to four joint influences per vertex
pub const MAX_INFLUENCES: usize = 4;

/// Rest-pose triangle mesh in entity-local space
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub skin: Option<SkinBinding>,
}

/// Linear-blend skinning data binding a mesh to an armature entity.
///
/// Joint slots are local to this binding: `joint_bones[slot]` is the bone index
/// inside the armature and `inverse_bind[slot]` takes bind-pose mesh space to
/// that bone's space.
#[derive(Clone, Debug)]
pub struct SkinBinding {
    pub armature: EntityId,
    pub joint_bones: Vec<usize>,
    pub inverse_bind: Vec<Mat4>,
    pub joints: Vec<[u16; MAX_INFLUENCES]>,
    pub weights: Vec<[f32; MAX_INFLUENCES]>,
}

impl SkinBinding {
    /// Every vertex fully weighted to a single bone
    pub fn rigid(armature: EntityId, bone: usize, inverse_bind: Mat4, vertex_count: usize) -> Self {
        Self {
            armature,
            joint_bones: vec![bone],
            inverse_bind: vec![inverse_bind],
            joints: vec![[0; MAX_INFLUENCES]; vertex_count],
            weights: vec![[1.0, 0.0, 0.0, 0.0]; vertex_count],
        }
    }
}

impl Mesh {
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            positions,
            triangles,
            skin: None,
        }
    }

    /// Closed box between two corners, twelve triangles
    pub fn cuboid(min: Vec3, max: Vec3) -> Self {
        let positions = AABB::new(min, max).corners().to_vec();
        // Corner index bits are (x, y, z)
        let triangles = vec![
            [0, 2, 3], [0, 3, 1], // -z
            [4, 5, 7], [4, 7, 6], // +z
            [0, 1, 5], [0, 5, 4], // -y
            [2, 6, 7], [2, 7, 3], // +y
            [0, 4, 6], [0, 6, 2], // -x
            [1, 3, 7], [1, 7, 5], // +x
        ];
        Self::new(positions, triangles)
    }

    /// Flat quad on the local XY plane
    pub fn plane(half_x: f32, half_y: f32) -> Self {
        let positions = vec![
            Vec3::new(-half_x, -half_y, 0.0),
            Vec3::new(half_x, -half_y, 0.0),
            Vec3::new(half_x, half_y, 0.0),
            Vec3::new(-half_x, half_y, 0.0),
        ];
        Self::new(positions, vec![[0, 1, 2], [0, 2, 3]])
    }

    pub fn with_skin(mut self, skin: SkinBinding) -> Self {
        self.skin = Some(skin);
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn local_bounds(&self) -> Option<AABB> {
        AABB::from_points(&self.positions)
    }

    /// Splits every triangle into `(cuts + 1)^2` triangles. Vertices on shared
    /// edges are shared, so neighbouring faces stay welded. Skin influences of
    /// new vertices are taken from the nearest original corner.
    pub fn subdivide(&mut self, cuts: u32) {
        if cuts == 0 || self.triangles.is_empty() {
            return;
        }
        let n = cuts + 1;

        let mut positions = self.positions.clone();
        let mut source_corner: Vec<u32> = (0..positions.len() as u32).collect();
        let mut lattice: HashMap<Vec<(u32, u32)>, u32> = HashMap::new();
        let mut triangles = Vec::with_capacity(self.triangles.len() * (n * n) as usize);

        for &[a, b, c] in &self.triangles {
            let corners = [a, b, c];
            // Index of lattice point (i, j) where i counts along a->b and j along a->c
            let mut point = |i: u32, j: u32| -> u32 {
                let weights = [n - i - j, i, j];
                let mut key: Vec<(u32, u32)> = corners
                    .iter()
                    .zip(weights)
                    .filter(|(_, w)| *w > 0)
                    .map(|(&v, w)| (v, w))
                    .collect();
                key.sort_unstable();
                if let [(vertex, _)] = key.as_slice() {
                    return *vertex;
                }
                *lattice.entry(key).or_insert_with(|| {
                    let p = corners
                        .iter()
                        .zip(weights)
                        .map(|(&v, w)| self.positions[v as usize] * w as f32)
                        .sum::<Vec3>()
                        / n as f32;
                    let heaviest = corners
                        .iter()
                        .zip(weights)
                        .max_by_key(|(_, w)| *w)
                        .map(|(&v, _)| v)
                        .unwrap_or(a);
                    positions.push(p);
                    source_corner.push(heaviest);
                    (positions.len() - 1) as u32
                })
            };

            for i in 0..n {
                for j in 0..(n - i) {
                    let p0 = point(i, j);
                    let p1 = point(i + 1, j);
                    let p2 = point(i, j + 1);
                    triangles.push([p0, p1, p2]);
                    if i + j + 1 < n {
                        let p3 = point(i + 1, j + 1);
                        triangles.push([p1, p3, p2]);
                    }
                }
            }
        }

        if let Some(skin) = self.skin.as_mut() {
            skin.joints = source_corner.iter().map(|&v| skin.joints[v as usize]).collect();
            skin.weights = source_corner.iter().map(|&v| skin.weights[v as usize]).collect();
        }
        self.positions = positions;
        self.triangles = triangles;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_bounds() {
        let mesh = Mesh::cuboid(Vec3::new(-1.0, -2.0, 0.0), Vec3::new(1.0, 2.0, 0.5));
        let bounds = mesh.local_bounds().unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 2.0, 0.5));
        assert_eq!(mesh.triangles.len(), 12);
    }

    #[test]
    fn subdivide_plane_counts() {
        // A quad with 10 cuts becomes an 11x11 grid: 12x12 vertices, 242 triangles
        let mut mesh = Mesh::plane(0.5, 0.5);
        mesh.subdivide(10);
        assert_eq!(mesh.vertex_count(), 144);
        assert_eq!(mesh.triangles.len(), 2 * 121);
    }

    #[test]
    fn subdivide_keeps_bounds() {
        let mut mesh = Mesh::plane(2.0, 1.0);
        let before = mesh.local_bounds().unwrap();
        mesh.subdivide(3);
        let after = mesh.local_bounds().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn subdivide_adds_interior_points() {
        let mut mesh = Mesh::plane(1.0, 1.0);
        mesh.subdivide(1);
        assert!(mesh.positions.iter().any(|p| p.x.abs() < 1e-6 && p.y.abs() < 1e-6));
    }

    #[test]
    fn subdivide_zero_cuts_is_noop() {
        let mut mesh = Mesh::plane(1.0, 1.0);
        mesh.subdivide(0);
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn subdivide_extends_skin_influences() {
        let mut mesh = Mesh::plane(1.0, 1.0);
        mesh.skin = Some(SkinBinding::rigid(EntityId(0), 0, Mat4::IDENTITY, 4));
        mesh.subdivide(2);
        let skin = mesh.skin.as_ref().unwrap();
        assert_eq!(skin.weights.len(), mesh.vertex_count());
        assert_eq!(skin.joints.len(), mesh.vertex_count());
    }
}
