//! Geometry of a solid as a tagged variant, with free functions dispatched on the tag.

use std::f32::consts::PI;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::mesh::{Aabb, TriangleMesh};
use super::solid::Compound;
use crate::dynamics::inertia::{self, InertiaTensor};

/// Enumeration of supported solid geometries. Analytic shapes are centred on the geometry
/// origin; cylinders and tori have their symmetry axis along Y.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeKind {
    Sphere {
        radius: f32,
    },
    Box {
        half_extents: Vec3,
    },
    Cylinder {
        radius: f32,
        half_height: f32,
    },
    Torus {
        major_radius: f32,
        minor_radius: f32,
    },
    /// Closed triangle mesh; a wall thickness turns it into a hollow shell.
    Mesh {
        mesh: TriangleMesh,
        wall_thickness: Option<f32>,
    },
    Compound(Compound),
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Sphere { .. } => "sphere",
            ShapeKind::Box { .. } => "box",
            ShapeKind::Cylinder { .. } => "cylinder",
            ShapeKind::Torus { .. } => "torus",
            ShapeKind::Mesh { .. } => "mesh",
            ShapeKind::Compound(_) => "compound",
        }
    }
}

/// Enclosed volume and its centroid in the geometry frame. Shells enclose the same
/// volume as the solid they wrap. Compounds count their buoyant parts.
pub fn enclosed_volume(shape: &ShapeKind) -> (f32, Vec3) {
    match shape {
        ShapeKind::Sphere { radius } => (4.0 / 3.0 * PI * radius.powi(3), Vec3::ZERO),
        ShapeKind::Box { half_extents } => (8.0 * half_extents.x * half_extents.y * half_extents.z, Vec3::ZERO),
        ShapeKind::Cylinder { radius, half_height } => {
            (PI * radius * radius * 2.0 * half_height, Vec3::ZERO)
        }
        ShapeKind::Torus {
            major_radius,
            minor_radius,
        } => (2.0 * PI * PI * major_radius * minor_radius * minor_radius, Vec3::ZERO),
        ShapeKind::Mesh { mesh, .. } => {
            let (volume, centroid) = inertia::mesh_volume_and_centroid(mesh);
            (volume.max(0.0) as f32, centroid.as_vec3())
        }
        ShapeKind::Compound(compound) => {
            let mut volume = 0.0;
            let mut weighted = Vec3::ZERO;
            for part in compound.parts.iter().filter(|part| part.solid.buoyant) {
                volume += part.solid.volume;
                weighted += part.solid.volume * part.origin.transform_point(part.solid.center_of_buoyancy);
            }
            if volume > 0.0 {
                (volume, weighted / volume)
            } else {
                (0.0, Vec3::ZERO)
            }
        }
    }
}

/// Bounds in the geometry frame.
pub fn local_aabb(shape: &ShapeKind) -> Aabb {
    match shape {
        ShapeKind::Sphere { radius } => Aabb::from_half_extents(Vec3::ZERO, Vec3::splat(*radius)),
        ShapeKind::Box { half_extents } => Aabb::from_half_extents(Vec3::ZERO, *half_extents),
        ShapeKind::Cylinder { radius, half_height } => {
            Aabb::from_half_extents(Vec3::ZERO, Vec3::new(*radius, *half_height, *radius))
        }
        ShapeKind::Torus {
            major_radius,
            minor_radius,
        } => {
            let outer = major_radius + minor_radius;
            Aabb::from_half_extents(Vec3::ZERO, Vec3::new(outer, *minor_radius, outer))
        }
        ShapeKind::Mesh { mesh, .. } => mesh.bounds,
        ShapeKind::Compound(compound) => {
            let mut bounds = Aabb::empty();
            for part in &compound.parts {
                bounds.merge(&local_aabb(&part.solid.shape).transformed(&part.origin));
            }
            bounds
        }
    }
}

/// Largest projection of the shape onto the unit `direction`, in the geometry frame.
pub fn support(shape: &ShapeKind, direction: Vec3) -> f32 {
    match shape {
        ShapeKind::Sphere { radius } => *radius,
        ShapeKind::Box { half_extents } => direction.abs().dot(*half_extents),
        ShapeKind::Cylinder { radius, half_height } => {
            half_height * direction.y.abs()
                + radius * (direction.x * direction.x + direction.z * direction.z).sqrt()
        }
        ShapeKind::Torus {
            major_radius,
            minor_radius,
        } => major_radius * (direction.x * direction.x + direction.z * direction.z).sqrt() + minor_radius,
        ShapeKind::Mesh { mesh, .. } => mesh.support(direction),
        ShapeKind::Compound(compound) => compound
            .parts
            .iter()
            .map(|part| {
                let local = part.origin.inverse_transform_vector(direction);
                part.origin.position.dot(direction) + support(&part.solid.shape, local)
            })
            .fold(f32::NEG_INFINITY, f32::max),
    }
}

/// Points whose bounds describe the shape's extent; used for proxy fitting.
pub fn outline_points(shape: &ShapeKind) -> Vec<Vec3> {
    match shape {
        ShapeKind::Mesh { mesh, .. } => mesh.vertices.clone(),
        ShapeKind::Compound(compound) => compound
            .parts
            .iter()
            .filter(|part| part.solid.buoyant)
            .flat_map(|part| {
                outline_points(&part.solid.shape)
                    .into_iter()
                    .map(|p| part.origin.transform_point(p))
                    .collect::<Vec<_>>()
            })
            .collect(),
        analytic => local_aabb(analytic).corners().to_vec(),
    }
}

/// Inertia of a single uniform shape. Compounds carry their own part materials and are
/// accumulated by the solid that owns them.
pub fn inertia(shape: &ShapeKind, density: f32) -> InertiaTensor {
    let density = density as f64;
    match shape {
        ShapeKind::Sphere { radius } => inertia::sphere_inertia(*radius as f64, density),
        ShapeKind::Box { half_extents } => inertia::box_inertia(half_extents.as_dvec3(), density),
        ShapeKind::Cylinder { radius, half_height } => {
            inertia::cylinder_inertia(*radius as f64, *half_height as f64, density)
        }
        ShapeKind::Torus {
            major_radius,
            minor_radius,
        } => inertia::torus_inertia(*major_radius as f64, *minor_radius as f64, density),
        ShapeKind::Mesh {
            mesh,
            wall_thickness: Some(thickness),
        } => inertia::shell_mesh_inertia(mesh, *thickness as f64, density),
        ShapeKind::Mesh {
            mesh,
            wall_thickness: None,
        } => inertia::solid_mesh_inertia(mesh, density),
        ShapeKind::Compound(compound) => inertia::combine(
            compound
                .parts
                .iter()
                .map(|part| (&part.solid.mass_properties, &part.origin)),
        ),
    }
}
