use std::collections::HashMap;
use std::f32::consts::{PI, TAU};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::types::Transform;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn merge(&mut self, other: &Aabb) {
        if other.is_empty() {
            return;
        }
        self.extend(other.min);
        self.extend(other.max);
    }

    pub fn from_points(points: &[Vec3]) -> Self {
        let mut bounds = Self::empty();
        for &p in points {
            bounds.extend(p);
        }
        bounds
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        (self.max - self.min) * 0.5
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Bounds of this box after moving it into another frame.
    pub fn transformed(&self, transform: &Transform) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let points = self.corners().map(|c| transform.transform_point(c));
        Aabb::from_points(&points)
    }
}

/// Closed triangle mesh. Faces are wound counter-clockwise seen from outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<[u32; 3]>,
    pub bounds: Aabb,
}

impl TriangleMesh {
    pub fn builder(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> MeshBuilder {
        MeshBuilder::new(vertices, indices)
    }

    /// Iterates the faces as vertex triples, skipping faces with out-of-range indices.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.iter().filter_map(|tri| {
            Some([
                *self.vertices.get(tri[0] as usize)?,
                *self.vertices.get(tri[1] as usize)?,
                *self.vertices.get(tri[2] as usize)?,
            ])
        })
    }

    /// Largest projection of any vertex onto `direction`.
    pub fn support(&self, direction: Vec3) -> f32 {
        self.vertices
            .iter()
            .map(|v| v.dot(direction))
            .fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn transformed(&self, transform: &Transform) -> TriangleMesh {
        let vertices: Vec<Vec3> = self
            .vertices
            .iter()
            .map(|v| transform.transform_point(*v))
            .collect();
        TriangleMesh {
            bounds: Aabb::from_points(&vertices),
            vertices,
            indices: self.indices.clone(),
        }
    }

    /// Axis-aligned box centred on the origin.
    pub fn cuboid(half_extents: Vec3) -> TriangleMesh {
        let h = half_extents;
        let vertices = (0..8)
            .map(|i| {
                Vec3::new(
                    if i & 1 == 0 { -h.x } else { h.x },
                    if i & 2 == 0 { -h.y } else { h.y },
                    if i & 4 == 0 { -h.z } else { h.z },
                )
            })
            .collect();
        let indices = vec![
            [0, 4, 6],
            [0, 6, 2],
            [1, 3, 7],
            [1, 7, 5],
            [0, 1, 5],
            [0, 5, 4],
            [2, 6, 7],
            [2, 7, 3],
            [0, 2, 3],
            [0, 3, 1],
            [4, 5, 7],
            [4, 7, 6],
        ];
        MeshBuilder::new(vertices, indices).build()
    }

    /// Latitude/longitude sphere centred on the origin with poles on ±Y.
    pub fn uv_sphere(radius: f32, segments: u32, stacks: u32) -> TriangleMesh {
        let segments = segments.max(3);
        let stacks = stacks.max(2);
        let mut vertices = vec![Vec3::Y * radius, -Vec3::Y * radius];
        for i in 1..stacks {
            let theta = PI * i as f32 / stacks as f32;
            for j in 0..segments {
                let phi = TAU * j as f32 / segments as f32;
                vertices.push(
                    Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin())
                        * radius,
                );
            }
        }

        let ring = |i: u32, j: u32| 2 + (i - 1) * segments + (j % segments);
        let mut indices = Vec::new();
        for j in 0..segments {
            indices.push([0, ring(1, j + 1), ring(1, j)]);
            indices.push([ring(stacks - 1, j), ring(stacks - 1, j + 1), 1]);
        }
        for i in 1..stacks - 1 {
            for j in 0..segments {
                let a = ring(i, j);
                let b = ring(i + 1, j);
                let c = ring(i + 1, j + 1);
                let d = ring(i, j + 1);
                indices.push([a, d, b]);
                indices.push([d, c, b]);
            }
        }
        MeshBuilder::new(vertices, indices).build()
    }

    /// Closed cylinder along Y centred on the origin.
    pub fn cylinder(radius: f32, half_height: f32, segments: u32) -> TriangleMesh {
        let segments = segments.max(3);
        let mut vertices = vec![Vec3::new(0.0, -half_height, 0.0), Vec3::new(0.0, half_height, 0.0)];
        for j in 0..segments {
            let phi = TAU * j as f32 / segments as f32;
            let (s, c) = phi.sin_cos();
            vertices.push(Vec3::new(radius * c, -half_height, radius * s));
            vertices.push(Vec3::new(radius * c, half_height, radius * s));
        }

        let bottom = |j: u32| 2 + 2 * (j % segments);
        let top = |j: u32| 3 + 2 * (j % segments);
        let mut indices = Vec::new();
        for j in 0..segments {
            indices.push([bottom(j), top(j), bottom(j + 1)]);
            indices.push([top(j), top(j + 1), bottom(j + 1)]);
            indices.push([1, top(j + 1), top(j)]);
            indices.push([0, bottom(j), bottom(j + 1)]);
        }
        MeshBuilder::new(vertices, indices).build()
    }
}

/// Helper used to cook triangle meshes from raw vertex/index buffers.
#[derive(Debug, Clone)]
pub struct MeshBuilder {
    vertices: Vec<Vec3>,
    indices: Vec<[u32; 3]>,
}

impl MeshBuilder {
    pub fn new(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Self {
        Self { vertices, indices }
    }

    /// Deduplicates vertices using a quantized grid for stability.
    pub fn weld_vertices(mut self, epsilon: f32) -> Self {
        if epsilon <= 0.0 || self.vertices.is_empty() {
            return self;
        }

        let inv = 1.0 / epsilon;
        let mut map: HashMap<(i32, i32, i32), u32> = HashMap::new();
        let mut welded: Vec<Vec3> = Vec::new();
        let mut remap: Vec<u32> = Vec::with_capacity(self.vertices.len());

        for v in &self.vertices {
            let key = (
                (v.x * inv).round() as i32,
                (v.y * inv).round() as i32,
                (v.z * inv).round() as i32,
            );
            let index = *map.entry(key).or_insert_with(|| {
                welded.push(*v);
                (welded.len() - 1) as u32
            });
            remap.push(index);
        }

        for tri in &mut self.indices {
            for corner in tri.iter_mut() {
                if let Some(&mapped) = remap.get(*corner as usize) {
                    *corner = mapped;
                }
            }
        }
        // Faces that collapsed to an edge or a point carry no volume.
        self.indices
            .retain(|t| t[0] != t[1] && t[1] != t[2] && t[0] != t[2]);

        self.vertices = welded;
        self
    }

    /// Flips every face, turning an inward-wound mesh outward.
    pub fn flip_winding(mut self) -> Self {
        for tri in &mut self.indices {
            tri.swap(1, 2);
        }
        self
    }

    /// Recenters vertices around their centroid.
    pub fn recenter(mut self) -> Self {
        if self.vertices.is_empty() {
            return self;
        }
        let centroid: Vec3 =
            self.vertices.iter().copied().sum::<Vec3>() / self.vertices.len() as f32;
        for vertex in &mut self.vertices {
            *vertex -= centroid;
        }
        self
    }

    pub fn build(self) -> TriangleMesh {
        TriangleMesh {
            bounds: Aabb::from_points(&self.vertices),
            vertices: self.vertices,
            indices: self.indices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_volume(mesh: &TriangleMesh) -> f32 {
        mesh.triangles()
            .map(|[a, b, c]| a.dot(b.cross(c)) / 6.0)
            .sum()
    }

    #[test]
    fn primitives_are_wound_outward() {
        assert!((signed_volume(&TriangleMesh::cuboid(Vec3::new(1.0, 2.0, 3.0))) - 48.0).abs() < 1e-4);
        assert!(signed_volume(&TriangleMesh::uv_sphere(1.0, 24, 12)) > 3.9);
        assert!(signed_volume(&TriangleMesh::cylinder(1.0, 1.0, 24)) > 6.0);
    }

    #[test]
    fn weld_drops_collapsed_faces() {
        let vertices = vec![Vec3::ZERO, Vec3::splat(1e-5), Vec3::X, Vec3::Y];
        let mesh = TriangleMesh::builder(vertices, vec![[0, 1, 2], [0, 2, 3]])
            .weld_vertices(0.01)
            .build();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices.len(), 1);
    }

    #[test]
    fn transformed_bounds_contain_rotated_box() {
        let aabb = Aabb::from_half_extents(Vec3::ZERO, Vec3::new(1.0, 0.5, 0.5));
        let rotated = aabb.transformed(&Transform::from_rotation(glam::Quat::from_rotation_z(
            std::f32::consts::FRAC_PI_2,
        )));
        assert!((rotated.half_extents().y - 1.0).abs() < 1e-5);
        assert!((rotated.half_extents().x - 0.5).abs() < 1e-5);
    }
}
