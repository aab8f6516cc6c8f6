//! Rigid solids: geometry, material and the mass/buoyancy data derived from them.

use glam::Vec3;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::mesh::{Aabb, TriangleMesh};
use super::shape::{self, ShapeKind};
use super::types::{MassProperties, Material, Transform};
use crate::config::MASS_EPSILON;
use crate::dynamics::proxy::{HydrodynamicProxy, ProxyKind};
use crate::error::AssemblyError;

/// Role of a part inside a compound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartKind {
    /// Contributes mass, inertia and buoyancy only.
    Internal,
    /// Also forms the outer skin: collision and drag.
    External,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundPart {
    pub solid: RigidSolid,
    /// Pose of the part's geometry frame in the compound's geometry frame.
    pub origin: Transform,
    pub kind: PartKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Compound {
    pub parts: Vec<CompoundPart>,
}

/// A rigid solid with everything the dynamics and the fluid model need precomputed.
///
/// Mass properties are diagonalised once on construction (and on every compound
/// addition); `cg_origin` then places the principal frame inside the geometry frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidSolid {
    pub name: String,
    pub shape: ShapeKind,
    pub material: Material,
    pub mass_properties: MassProperties,
    /// Geometry frame → centre-of-mass principal frame.
    pub cg_origin: Transform,
    /// Geometry frame → collision frame.
    pub collision_origin: Transform,
    pub buoyant: bool,
    /// Displaced volume when fully submerged.
    pub volume: f32,
    /// Centre of buoyancy in the geometry frame.
    pub center_of_buoyancy: Vec3,
    pub local_aabb: Aabb,
    pub proxy: HydrodynamicProxy,
    requested_proxy: Option<ProxyKind>,
}

impl RigidSolid {
    pub fn new(
        name: impl Into<String>,
        shape: ShapeKind,
        material: Material,
        buoyant: bool,
    ) -> Result<Self, AssemblyError> {
        let mut solid = Self {
            name: name.into(),
            shape,
            material,
            mass_properties: MassProperties::default(),
            cg_origin: Transform::IDENTITY,
            collision_origin: Transform::IDENTITY,
            buoyant,
            volume: 0.0,
            center_of_buoyancy: Vec3::ZERO,
            local_aabb: Aabb::empty(),
            proxy: HydrodynamicProxy::NONE,
            requested_proxy: None,
        };
        solid.rebuild()?;
        debug!(
            "solid `{}` ({}): mass {:.4} kg, volume {:.5} m³, proxy {:?}",
            solid.name,
            solid.shape.name(),
            solid.mass_properties.mass,
            solid.volume,
            solid.proxy.kind
        );
        Ok(solid)
    }

    pub fn sphere(name: impl Into<String>, radius: f32, material: Material) -> Result<Self, AssemblyError> {
        Self::new(name, ShapeKind::Sphere { radius }, material, true)
    }

    pub fn cuboid(name: impl Into<String>, half_extents: Vec3, material: Material) -> Result<Self, AssemblyError> {
        Self::new(name, ShapeKind::Box { half_extents }, material, true)
    }

    pub fn cylinder(
        name: impl Into<String>,
        radius: f32,
        half_height: f32,
        material: Material,
    ) -> Result<Self, AssemblyError> {
        Self::new(name, ShapeKind::Cylinder { radius, half_height }, material, true)
    }

    pub fn torus(
        name: impl Into<String>,
        major_radius: f32,
        minor_radius: f32,
        material: Material,
    ) -> Result<Self, AssemblyError> {
        Self::new(
            name,
            ShapeKind::Torus {
                major_radius,
                minor_radius,
            },
            material,
            true,
        )
    }

    pub fn mesh(name: impl Into<String>, mesh: TriangleMesh, material: Material) -> Result<Self, AssemblyError> {
        Self::new(
            name,
            ShapeKind::Mesh {
                mesh,
                wall_thickness: None,
            },
            material,
            true,
        )
    }

    /// Hollow mesh with walls of the given thickness. Displaces its full enclosed volume.
    pub fn shell(
        name: impl Into<String>,
        mesh: TriangleMesh,
        wall_thickness: f32,
        material: Material,
    ) -> Result<Self, AssemblyError> {
        Self::new(
            name,
            ShapeKind::Mesh {
                mesh,
                wall_thickness: Some(wall_thickness),
            },
            material,
            true,
        )
    }

    /// Starts a compound from its first part. The compound is buoyant; which of its parts
    /// displace fluid follows each part's own flag.
    pub fn compound(
        name: impl Into<String>,
        first: RigidSolid,
        origin: Transform,
        kind: PartKind,
    ) -> Result<Self, AssemblyError> {
        let material = first.material.clone();
        let compound = Compound {
            parts: vec![CompoundPart {
                solid: first,
                origin,
                kind,
            }],
        };
        Self::new(name, ShapeKind::Compound(compound), material, true)
    }

    /// Adds a part and recomputes every derived quantity.
    pub fn add_part(
        &mut self,
        solid: RigidSolid,
        origin: Transform,
        kind: PartKind,
    ) -> Result<(), AssemblyError> {
        let ShapeKind::Compound(compound) = &mut self.shape else {
            warn!("`{}` is a {}, cannot add part `{}`", self.name, self.shape.name(), solid.name);
            return Err(AssemblyError::NotCompound(self.name.clone()));
        };
        compound.parts.push(CompoundPart {
            solid,
            origin,
            kind,
        });
        self.rebuild()
    }

    /// Refits the hydrodynamic proxy with a requested shape.
    pub fn with_proxy(mut self, kind: ProxyKind) -> Self {
        self.requested_proxy = Some(kind);
        self.refit_proxy();
        self
    }

    pub fn set_buoyant(&mut self, buoyant: bool) {
        self.buoyant = buoyant;
        self.refit_proxy();
    }

    pub fn mass(&self) -> f32 {
        self.mass_properties.mass
    }

    pub fn is_compound(&self) -> bool {
        matches!(self.shape, ShapeKind::Compound(_))
    }

    /// Parts of a compound, or nothing for a plain solid.
    pub fn parts(&self) -> &[CompoundPart] {
        match &self.shape {
            ShapeKind::Compound(compound) => &compound.parts,
            _ => &[],
        }
    }

    /// Solids forming the collision skin with their poses in the geometry frame.
    pub fn collision_parts(&self) -> Vec<(&RigidSolid, Transform)> {
        match &self.shape {
            ShapeKind::Compound(compound) => compound
                .parts
                .iter()
                .filter(|part| part.kind == PartKind::External)
                .map(|part| (&part.solid, self.collision_origin.combine(&part.origin)))
                .collect(),
            _ => vec![(self, self.collision_origin)],
        }
    }

    /// Pose of the geometry frame given the pose of the centre-of-mass frame.
    pub fn geometry_pose(&self, com_pose: &Transform) -> Transform {
        com_pose.combine(&self.cg_origin.inverse())
    }

    /// Half-width of the geometry along a unit direction in the geometry frame, measured
    /// from the bounds centre.
    pub fn support_extent(&self, direction: Vec3) -> f32 {
        shape::support(&self.shape, direction) - self.local_aabb.center().dot(direction)
    }

    fn rebuild(&mut self) -> Result<(), AssemblyError> {
        let props = shape::inertia(&self.shape, self.material.density).to_mass_properties();
        if !(props.mass > MASS_EPSILON) || !props.principal_inertia.is_finite() {
            warn!("solid `{}` has degenerate geometry (mass {})", self.name, props.mass);
            return Err(AssemblyError::DegenerateGeometry {
                name: self.name.clone(),
                mass: props.mass,
            });
        }
        self.mass_properties = props;
        self.cg_origin = Transform::new(props.center_of_mass, props.principal_axes);
        self.local_aabb = shape::local_aabb(&self.shape);

        let (volume, center) = match shape::enclosed_volume(&self.shape) {
            (volume, _) if volume <= 0.0 => (0.0, props.center_of_mass),
            enclosed => enclosed,
        };
        self.volume = volume;
        self.center_of_buoyancy = center;
        self.refit_proxy();
        Ok(())
    }

    fn refit_proxy(&mut self) {
        if !self.buoyant || self.volume <= 0.0 {
            self.proxy = HydrodynamicProxy::NONE;
            return;
        }
        let points: Vec<Vec3> = shape::outline_points(&self.shape)
            .into_iter()
            .map(|p| self.cg_origin.inverse_transform_point(p))
            .collect();
        self.proxy = HydrodynamicProxy::fit(&points, self.requested_proxy);
    }
}
