//! Buoyancy, drag and added mass acting on a rigid solid immersed in a fluid.
//!
//! Everything is evaluated from the solid's pose and motion at the end of the previous
//! step, so bodies are independent of each other and can be processed in parallel.

use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};

use super::fluid::FluidVolume;
use super::proxy::Submersion;
use crate::config::{HydrodynamicSettings, MAX_ADDED_MASS_RATIO};
use crate::core::shape::ShapeKind;
use crate::core::solid::{PartKind, RigidSolid};
use crate::core::types::{Transform, Velocity, Wrench};

/// Submersion state of a body relative to the free surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Regime {
    #[default]
    OutsideFluid,
    FullySubmerged,
    CrossingSurface,
}

/// Hydrodynamic loads of one step, in world coordinates with torques about the body's
/// centre of mass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HydrodynamicState {
    pub regime: Regime,
    /// Share of the displaced volume currently below the surface.
    pub submerged_fraction: f32,
    pub center_of_buoyancy: Vec3,
    pub buoyancy: Wrench,
    pub skin_drag: Wrench,
    pub pressure_drag: Wrench,
    pub added_mass: Wrench,
}

impl HydrodynamicState {
    pub fn total(&self) -> Wrench {
        self.buoyancy + self.skin_drag + self.pressure_drag + self.added_mass
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn accumulate(&mut self, other: &HydrodynamicState) {
        self.buoyancy += other.buoyancy;
        self.skin_drag += other.skin_drag;
        self.pressure_drag += other.pressure_drag;
        self.added_mass += other.added_mass;
    }
}

/// Pose and motion of a body's centre-of-mass frame, all in world coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyMotion {
    pub pose: Transform,
    pub velocity: Velocity,
    pub acceleration: Velocity,
}

impl BodyMotion {
    pub fn at_rest(pose: Transform) -> Self {
        Self {
            pose,
            ..Self::default()
        }
    }

    /// Motion of a point rigidly attached to the body.
    fn at_point(&self, point: Vec3) -> (Vec3, Vec3) {
        let r = point - self.pose.position;
        let w = self.velocity.angular;
        let velocity = self.velocity.linear + w.cross(r);
        let acceleration = self.acceleration.linear
            + self.acceleration.angular.cross(r)
            + w.cross(w.cross(r));
        (velocity, acceleration)
    }
}

/// Evaluates hydrodynamic loads for solids.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HydrodynamicForceModel {
    pub settings: HydrodynamicSettings,
}

/// A solid or compound part placed in the world.
struct Piece<'a> {
    solid: &'a RigidSolid,
    geometry: Transform,
    com: Transform,
    exterior: bool,
}

impl HydrodynamicForceModel {
    pub fn new(settings: HydrodynamicSettings) -> Self {
        Self { settings }
    }

    /// Computes the loads on `solid` whose centre-of-mass frame moves as `motion`.
    pub fn evaluate(
        &self,
        solid: &RigidSolid,
        motion: &BodyMotion,
        fluid: &dyn FluidVolume,
        gravity: Vec3,
    ) -> HydrodynamicState {
        let geometry = solid.geometry_pose(&motion.pose);
        let mass_limit = MAX_ADDED_MASS_RATIO * solid.mass();

        let mut state = match &solid.shape {
            _ if !solid.buoyant => HydrodynamicState::default(),
            ShapeKind::Compound(compound) => {
                let mut total = HydrodynamicState::default();
                let mut volume = 0.0;
                let mut submerged = 0.0;
                let mut weighted = Vec3::ZERO;
                let mut regime = None;
                for part in compound.parts.iter().filter(|part| part.solid.buoyant) {
                    let part_geometry = geometry.combine(&part.origin);
                    let piece = Piece {
                        solid: &part.solid,
                        com: part_geometry.combine(&part.solid.cg_origin),
                        geometry: part_geometry,
                        exterior: part.kind == PartKind::External,
                    };
                    let partial = self.evaluate_piece(&piece, motion, fluid, gravity, mass_limit);
                    let displaced = part.solid.volume * partial.submerged_fraction;
                    volume += part.solid.volume;
                    submerged += displaced;
                    weighted += partial.center_of_buoyancy * displaced;
                    total.accumulate(&partial);
                    regime = Some(match regime {
                        Some(current) if current != partial.regime => Regime::CrossingSurface,
                        _ => partial.regime,
                    });
                }
                total.regime = regime.unwrap_or_default();
                if volume > 0.0 {
                    total.submerged_fraction = submerged / volume;
                }
                total.center_of_buoyancy = if submerged > 0.0 {
                    weighted / submerged
                } else {
                    geometry.transform_point(solid.center_of_buoyancy)
                };
                total
            }
            _ => {
                let piece = Piece {
                    solid,
                    geometry,
                    com: motion.pose,
                    exterior: true,
                };
                self.evaluate_piece(&piece, motion, fluid, gravity, mass_limit)
            }
        };

        state.buoyancy = state.buoyancy.finite_or_zero();
        state.skin_drag = state.skin_drag.finite_or_zero();
        state.pressure_drag = state.pressure_drag.finite_or_zero();
        state.added_mass = state.added_mass.finite_or_zero();
        if !state.center_of_buoyancy.is_finite() {
            state.center_of_buoyancy = motion.pose.position;
        }
        state
    }

    fn evaluate_piece(
        &self,
        piece: &Piece<'_>,
        motion: &BodyMotion,
        fluid: &dyn FluidVolume,
        gravity: Vec3,
        mass_limit: f32,
    ) -> HydrodynamicState {
        let solid = piece.solid;
        let up = fluid.up();
        let full_cob = piece.geometry.transform_point(solid.center_of_buoyancy);
        let mut state = HydrodynamicState {
            center_of_buoyancy: full_cob,
            ..HydrodynamicState::default()
        };

        // Extremes of the geometry along the surface normal.
        let center = piece.geometry.transform_point(solid.local_aabb.center());
        let up_local = piece.geometry.inverse_transform_vector(up);
        let top = center + up * solid.support_extent(up_local);
        let bottom = center - up * solid.support_extent(-up_local);
        let (high, low) = (fluid.depth(top), fluid.depth(bottom));

        let proxy_pose = piece.com.combine(&solid.proxy.origin);
        let submersion = if high > 0.0 && low > 0.0 {
            state.regime = Regime::OutsideFluid;
            return state;
        } else if high <= 0.0 && low <= 0.0 {
            state.regime = Regime::FullySubmerged;
            Submersion {
                fraction: 1.0,
                centroid: Vec3::ZERO,
            }
        } else {
            state.regime = Regime::CrossingSurface;
            let immersion = (-low / (high - low)).clamp(0.0, 1.0);
            if solid.proxy.is_none() {
                Submersion {
                    fraction: immersion,
                    centroid: Vec3::ZERO,
                }
            } else {
                let up_proxy = proxy_pose.inverse_transform_vector(up);
                let extent = solid.proxy.support(up_proxy);
                solid
                    .proxy
                    .submersion(up_proxy, extent * (2.0 * immersion - 1.0))
            }
        };

        let fraction = submersion.fraction;
        state.submerged_fraction = fraction;
        if fraction <= 0.0 {
            return state;
        }
        let reference = motion.pose.position;
        let density = fluid.density();

        if self.settings.buoyancy {
            let cob = full_cob + proxy_pose.transform_vector(submersion.centroid);
            let force = -density * solid.volume * fraction * gravity;
            state.center_of_buoyancy = cob;
            state.buoyancy = Wrench::at_point(force, cob, reference);
        }

        if !piece.exterior || solid.proxy.is_none() {
            return state;
        }
        let proxy = &solid.proxy;
        let (velocity, acceleration) = motion.at_point(piece.com.position);
        let relative = velocity - fluid.velocity(piece.com.position);

        if self.settings.drag {
            let cd = self.settings.pressure_drag_coefficient;
            let k = proxy.drag_coefficients();
            let areas = proxy.projected_areas();
            let local = proxy_pose.inverse_transform_vector(relative);
            let pressure = -0.5 * density * cd * fraction * k * areas * local.abs() * local;

            let omega = proxy_pose.inverse_transform_vector(motion.velocity.angular);
            let arms = proxy.lever_arms();
            let spin = -0.5 * density * cd * fraction * k * areas * arms.powf(3.0) * omega.abs() * omega;

            let pressure_force = proxy_pose.transform_vector(pressure);
            state.pressure_drag = Wrench::at_point(pressure_force, piece.com.position, reference)
                + Wrench::new(Vec3::ZERO, proxy_pose.transform_vector(spin));

            let cf = self.settings.skin_friction_coefficient;
            let skin = -0.5 * density * cf * fraction * proxy.wetted_area() * relative.length() * relative;
            state.skin_drag = Wrench::at_point(skin, piece.com.position, reference);
        }

        if self.settings.added_mass {
            let coefficients = proxy.added_mass_coefficients();
            let mut masses = coefficients * density * solid.volume * fraction;
            if masses.max_element() > mass_limit {
                debug!(
                    "added mass of `{}` clamped from {:.3} to {:.3} kg",
                    solid.name,
                    masses.max_element(),
                    mass_limit
                );
                masses = masses.min(Vec3::splat(mass_limit));
            }
            let local = proxy_pose.inverse_transform_vector(acceleration);
            let force = proxy_pose.transform_vector(-masses * local);
            state.added_mass = Wrench::at_point(force, piece.com.position, reference);
        }

        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WATER_DENSITY;
    use crate::core::types::Material;
    use crate::dynamics::fluid::Ocean;
    use approx::assert_relative_eq;
    use glam::Quat;
    use std::f32::consts::PI;

    const G: Vec3 = Vec3::new(0.0, -9.81, 0.0);

    fn buoy() -> RigidSolid {
        RigidSolid::sphere("buoy", 0.5, Material::foam()).unwrap()
    }

    fn at(y: f32) -> BodyMotion {
        BodyMotion::at_rest(Transform::from_translation(Vec3::new(0.0, y, 0.0)))
    }

    #[test]
    fn dry_body_feels_nothing() {
        let model = HydrodynamicForceModel::default();
        let state = model.evaluate(&buoy(), &at(2.0), &Ocean::new(0.0), G);
        assert_eq!(state.regime, Regime::OutsideFluid);
        assert_eq!(state.total(), Wrench::ZERO);
    }

    #[test]
    fn submerged_sphere_gets_archimedes() {
        let model = HydrodynamicForceModel::default();
        let state = model.evaluate(&buoy(), &at(-3.0), &Ocean::new(0.0), G);
        assert_eq!(state.regime, Regime::FullySubmerged);
        let expected = WATER_DENSITY * 4.0 / 3.0 * PI * 0.125 * 9.81;
        assert_relative_eq!(state.buoyancy.force.y, expected, max_relative = 1e-4);
        assert!(state.buoyancy.torque.length() < 1e-3);
    }

    #[test]
    fn half_submerged_sphere_displaces_half() {
        let model = HydrodynamicForceModel::default();
        let state = model.evaluate(&buoy(), &at(0.0), &Ocean::new(0.0), G);
        assert_eq!(state.regime, Regime::CrossingSurface);
        assert_relative_eq!(state.submerged_fraction, 0.5, epsilon = 1e-5);
        assert_relative_eq!(state.center_of_buoyancy.y, -3.0 / 16.0, epsilon = 1e-4);
    }

    #[test]
    fn drag_opposes_relative_motion() {
        let model = HydrodynamicForceModel::default();
        let mut motion = at(-3.0);
        motion.velocity.linear = Vec3::new(1.0, 0.0, 0.0);
        let ocean = Ocean::new(0.0);
        let state = model.evaluate(&buoy(), &motion, &ocean, G);
        assert!(state.pressure_drag.force.x < 0.0);
        assert!(state.skin_drag.force.x < 0.0);

        // Drifting with the current produces no drag.
        let drifting = Ocean::new(0.0).with_current(crate::dynamics::fluid::Current::Uniform(Vec3::X));
        let state = model.evaluate(&buoy(), &motion, &drifting, G);
        assert!(state.pressure_drag.force.length() < 1e-6);
    }

    #[test]
    fn added_mass_is_clamped_to_body_mass() {
        let model = HydrodynamicForceModel::default();
        let solid = buoy();
        let mut motion = at(-3.0);
        motion.acceleration.linear = Vec3::new(10.0, 0.0, 0.0);
        let state = model.evaluate(&solid, &motion, &Ocean::new(0.0), G);
        let limit = MAX_ADDED_MASS_RATIO * solid.mass() * 10.0;
        assert!(state.added_mass.force.x < 0.0);
        assert!(-state.added_mass.force.x <= limit * (1.0 + 1e-5));
    }

    #[test]
    fn tilted_hull_crossing_is_continuous() {
        let hull = RigidSolid::cuboid("hull", Vec3::new(1.5, 0.25, 0.5), Material::foam()).unwrap();
        let model = HydrodynamicForceModel::new(HydrodynamicSettings::buoyancy_only());
        let ocean = Ocean::new(0.0);
        let rotation = Quat::from_rotation_z(0.4);
        let full = hull.volume * WATER_DENSITY * 9.81;

        let mut previous = None;
        for i in 0..=400 {
            let y = 2.0 - 4.0 * i as f32 / 400.0;
            let motion = BodyMotion::at_rest(Transform::new(Vec3::new(0.0, y, 0.0), rotation));
            let force = model.evaluate(&hull, &motion, &ocean, G).buoyancy.force.y;
            if let Some(last) = previous {
                assert!((force - last) < 0.05 * full, "jump at y = {y}");
            }
            previous = Some(force);
        }
        assert_relative_eq!(previous.unwrap_or_default(), full, max_relative = 1e-4);
    }

    #[test]
    fn compound_with_buoyancy_switched_off_feels_nothing() {
        let model = HydrodynamicForceModel::default();
        let ocean = Ocean::new(0.0);
        let mut raft = RigidSolid::compound("raft", buoy(), Transform::IDENTITY, PartKind::External).unwrap();
        let wet = model.evaluate(&raft, &at(-3.0), &ocean, G);
        assert!(wet.buoyancy.force.y > 0.0);

        raft.set_buoyant(false);
        let moving = BodyMotion {
            velocity: Velocity::new(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO),
            ..at(-3.0)
        };
        let state = model.evaluate(&raft, &moving, &ocean, G);
        assert_eq!(state.total(), Wrench::ZERO);
        assert_eq!(state.submerged_fraction, 0.0);
    }
}
