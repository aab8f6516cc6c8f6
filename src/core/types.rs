use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::{FRESH_WATER_DENSITY, WATER_DENSITY};

/// Position and orientation of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_translation(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    /// Applies another transform on top of this one, returning the composition.
    pub fn combine(&self, other: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * other.position,
            rotation: (self.rotation * other.rotation).normalize(),
        }
    }

    pub fn inverse(&self) -> Transform {
        let rotation = self.rotation.inverse();
        Transform {
            position: -(rotation * self.position),
            rotation,
        }
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * point
    }

    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * vector
    }

    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.position)
    }

    pub fn inverse_transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation.inverse() * vector
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite()
    }
}

/// Linear and angular velocity of a rigid body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub linear: Vec3,
    pub angular: Vec3,
}

impl Velocity {
    pub fn new(linear: Vec3, angular: Vec3) -> Self {
        Self { linear, angular }
    }
}

/// Force and torque pair, both in world coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Wrench {
    pub force: Vec3,
    pub torque: Vec3,
}

impl Wrench {
    pub const ZERO: Wrench = Wrench {
        force: Vec3::ZERO,
        torque: Vec3::ZERO,
    };

    pub fn new(force: Vec3, torque: Vec3) -> Self {
        Self { force, torque }
    }

    /// Force applied at `point`, with the torque taken about `reference`.
    pub fn at_point(force: Vec3, point: Vec3, reference: Vec3) -> Self {
        Self {
            force,
            torque: (point - reference).cross(force),
        }
    }

    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            force: self.force * factor,
            torque: self.torque * factor,
        }
    }

    /// Returns the wrench, or zero if any component is NaN or infinite.
    pub fn finite_or_zero(self) -> Self {
        if self.force.is_finite() && self.torque.is_finite() {
            self
        } else {
            Self::ZERO
        }
    }
}

impl std::ops::Add for Wrench {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            force: self.force + other.force,
            torque: self.torque + other.torque,
        }
    }
}

impl std::ops::AddAssign for Wrench {
    fn add_assign(&mut self, other: Self) {
        self.force += other.force;
        self.torque += other.torque;
    }
}

/// Mass distribution of a solid, always expressed along its principal axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassProperties {
    pub mass: f32,
    /// Center of mass in the geometry frame.
    pub center_of_mass: Vec3,
    /// Moments of inertia about the principal axes through the center of mass.
    pub principal_inertia: Vec3,
    /// Rotation from the principal frame into the geometry frame.
    pub principal_axes: Quat,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self {
            mass: 0.0,
            center_of_mass: Vec3::ZERO,
            principal_inertia: Vec3::ZERO,
            principal_axes: Quat::IDENTITY,
        }
    }
}

/// Bulk material of a solid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub name: String,
    /// Density in kg/m³.
    pub density: f32,
    pub restitution: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".into(),
            density: FRESH_WATER_DENSITY,
            restitution: 0.1,
        }
    }
}

impl Material {
    pub fn new(name: &str, density: f32, restitution: f32) -> Self {
        Self {
            name: name.into(),
            density,
            restitution,
        }
    }

    pub fn steel() -> Self {
        Self::new("steel", 7800.0, 0.4)
    }

    pub fn aluminium() -> Self {
        Self::new("aluminium", 2700.0, 0.3)
    }

    /// Same density as sea water; neither sinks nor floats.
    pub fn neutral() -> Self {
        Self::new("neutral", WATER_DENSITY, 0.1)
    }

    pub fn foam() -> Self {
        Self::new("foam", 150.0, 0.05)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn transform_inverse_round_trips_points() {
        let t = Transform::new(
            Vec3::new(1.0, -2.0, 0.5),
            Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0).normalize(), 0.7),
        );
        let p = Vec3::new(0.3, 0.2, -4.0);
        let back = t.inverse().transform_point(t.transform_point(p));
        assert_relative_eq!(back.x, p.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-5);
        assert_relative_eq!(back.z, p.z, epsilon = 1e-5);

        let composed = t.combine(&t.inverse());
        assert!(composed.position.length() < 1e-5);
    }

    #[test]
    fn wrench_at_point_produces_lever_torque() {
        let w = Wrench::at_point(Vec3::Y, Vec3::X, Vec3::ZERO);
        assert_relative_eq!(w.torque.z, 1.0);
        let bad = Wrench::new(Vec3::splat(f32::NAN), Vec3::ZERO);
        assert_eq!(bad.finite_or_zero(), Wrench::ZERO);
    }
}
