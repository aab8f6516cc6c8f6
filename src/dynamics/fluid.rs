//! Fluid volumes bodies can be immersed in.

use std::f32::consts::TAU;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_GRAVITY, WATER_DENSITY};

/// Body of fluid with a free surface.
///
/// Queries are read-only so the force model can evaluate many bodies in parallel;
/// `update` advances any time-dependent surface between steps.
pub trait FluidVolume: Send + Sync {
    /// Signed distance of `point` from the surface along [`FluidVolume::up`].
    /// Negative below the surface.
    fn depth(&self, point: Vec3) -> f32;

    /// Fluid velocity at `point`.
    fn velocity(&self, point: Vec3) -> Vec3;

    fn density(&self) -> f32;

    /// Unit vector pointing out of the fluid.
    fn up(&self) -> Vec3;

    fn update(&mut self, time: f32);
}

/// Sinusoidal surface wave travelling along a horizontal direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    pub amplitude: f32,
    pub wavelength: f32,
    pub direction: Vec3,
    pub phase: f32,
}

impl Wave {
    pub fn new(amplitude: f32, wavelength: f32, direction: Vec3) -> Self {
        Self {
            amplitude,
            wavelength,
            direction: direction.normalize_or_zero(),
            phase: 0.0,
        }
    }

    /// Elevation at a horizontal position; deep-water dispersion sets the speed.
    fn elevation(&self, point: Vec3, time: f32, gravity: f32) -> f32 {
        if self.wavelength <= 0.0 {
            return 0.0;
        }
        let k = TAU / self.wavelength;
        let omega = (gravity * k).sqrt();
        self.amplitude * (k * self.direction.dot(point) - omega * time + self.phase).sin()
    }
}

/// Flow imposed on the fluid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum Current {
    #[default]
    None,
    Uniform(Vec3),
    /// Flow along `direction` whose speed falls off parabolically to zero at `radius`
    /// from the jet axis.
    Jet {
        origin: Vec3,
        direction: Vec3,
        radius: f32,
        speed: f32,
    },
}

impl Current {
    pub fn velocity(&self, point: Vec3) -> Vec3 {
        match *self {
            Current::None => Vec3::ZERO,
            Current::Uniform(v) => v,
            Current::Jet {
                origin,
                direction,
                radius,
                speed,
            } => {
                let axis = direction.normalize_or_zero();
                let offset = point - origin;
                let radial = offset - axis * offset.dot(axis);
                if radius <= 0.0 {
                    return Vec3::ZERO;
                }
                let falloff = 1.0 - radial.length_squared() / (radius * radius);
                axis * speed * falloff.max(0.0)
            }
        }
    }
}

/// Open water: a free surface at `level` along `up`, optionally perturbed by waves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ocean {
    pub level: f32,
    pub density: f32,
    pub up: Vec3,
    pub waves: Vec<Wave>,
    pub current: Current,
    time: f32,
}

impl Default for Ocean {
    fn default() -> Self {
        Self {
            level: 0.0,
            density: WATER_DENSITY,
            up: Vec3::Y,
            waves: Vec::new(),
            current: Current::None,
            time: 0.0,
        }
    }
}

impl Ocean {
    /// Calm sea water with its surface at `level`.
    pub fn new(level: f32) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn with_up(mut self, up: Vec3) -> Self {
        self.up = up.try_normalize().unwrap_or(Vec3::Y);
        self
    }

    pub fn with_wave(mut self, wave: Wave) -> Self {
        self.waves.push(wave);
        self
    }

    pub fn with_current(mut self, current: Current) -> Self {
        self.current = current;
        self
    }

    /// Height of the surface above `level` at the horizontal position of `point`.
    pub fn surface_elevation(&self, point: Vec3) -> f32 {
        let gravity = Vec3::from_array(DEFAULT_GRAVITY).length();
        self.waves
            .iter()
            .map(|wave| wave.elevation(point, self.time, gravity))
            .sum()
    }
}

impl FluidVolume for Ocean {
    fn depth(&self, point: Vec3) -> f32 {
        self.up.dot(point) - self.level - self.surface_elevation(point)
    }

    fn velocity(&self, point: Vec3) -> Vec3 {
        self.current.velocity(point)
    }

    fn density(&self) -> f32 {
        self.density
    }

    fn up(&self) -> Vec3 {
        self.up
    }

    fn update(&mut self, time: f32) {
        self.time = time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn calm_ocean_depth_is_height_above_level() {
        let ocean = Ocean::new(2.0);
        assert_relative_eq!(ocean.depth(Vec3::new(5.0, 3.0, -1.0)), 1.0);
        assert!(ocean.depth(Vec3::new(0.0, 1.0, 0.0)) < 0.0);
    }

    #[test]
    fn waves_move_with_time() {
        let mut ocean = Ocean::new(0.0).with_wave(Wave::new(0.5, 10.0, Vec3::X));
        let probe = Vec3::new(2.5, 0.0, 0.0);
        let before = ocean.depth(probe);
        ocean.update(1.0);
        assert!((ocean.depth(probe) - before).abs() > 1e-3);
        assert!(ocean.surface_elevation(probe).abs() <= 0.5 + 1e-6);
    }

    #[test]
    fn jet_is_fastest_on_its_axis() {
        let jet = Current::Jet {
            origin: Vec3::ZERO,
            direction: Vec3::X,
            radius: 1.0,
            speed: 2.0,
        };
        assert_relative_eq!(jet.velocity(Vec3::new(3.0, 0.0, 0.0)).x, 2.0);
        assert_relative_eq!(jet.velocity(Vec3::new(3.0, 0.5, 0.0)).x, 1.5);
        assert_eq!(jet.velocity(Vec3::new(0.0, 2.0, 0.0)), Vec3::ZERO);
    }
}
