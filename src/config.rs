//! Global configuration constants and serializable settings for the Hydrobody engine.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Default gravity vector applied in the simulation (Y-up).
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

/// Default integration timestep (in seconds).
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 240.0;

/// Density of sea water (kg/m³).
pub const WATER_DENSITY: f32 = 1025.0;

/// Density of fresh water (kg/m³).
pub const FRESH_WATER_DENSITY: f32 = 1000.0;

/// Default quadratic pressure-drag coefficient applied along each proxy axis.
pub const DEFAULT_PRESSURE_DRAG_COEFFICIENT: f32 = 0.5;

/// Default skin-friction coefficient applied over the proxy wetted area.
pub const DEFAULT_SKIN_FRICTION_COEFFICIENT: f32 = 0.01;

/// Axial drag of a cylinder proxy relative to its cross-flow drag.
pub const CYLINDER_AXIAL_DRAG_RATIO: f32 = 0.7;

/// Relative spread under which two half extents count as equal when fitting proxies.
pub const PROXY_ISOTROPY_TOLERANCE: f32 = 0.1;

/// Upper bound on the added mass along any axis, as a fraction of the body mass.
pub const MAX_ADDED_MASS_RATIO: f32 = 0.9;

/// Joint speeds below this are treated as zero by Coulomb damping.
pub const JOINT_VELOCITY_EPSILON: f32 = 1e-4;

/// Relative threshold for treating off-diagonal inertia terms as zero.
pub const INERTIA_OFF_DIAGONAL_EPSILON: f64 = 1e-9;

/// Masses and volumes below this are considered degenerate.
pub const MASS_EPSILON: f32 = 1e-9;

/// Tunables of the hydrodynamic force model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrodynamicSettings {
    pub buoyancy: bool,
    pub drag: bool,
    pub added_mass: bool,
    pub pressure_drag_coefficient: f32,
    pub skin_friction_coefficient: f32,
}

impl Default for HydrodynamicSettings {
    fn default() -> Self {
        Self {
            buoyancy: true,
            drag: true,
            added_mass: true,
            pressure_drag_coefficient: DEFAULT_PRESSURE_DRAG_COEFFICIENT,
            skin_friction_coefficient: DEFAULT_SKIN_FRICTION_COEFFICIENT,
        }
    }
}

impl HydrodynamicSettings {
    /// Buoyancy only; drag and added mass disabled.
    pub fn buoyancy_only() -> Self {
        Self {
            drag: false,
            added_mass: false,
            ..Self::default()
        }
    }
}

/// Settings of one simulation instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub time_step: f32,
    pub gravity: Vec3,
    pub hydrodynamics: HydrodynamicSettings,
    /// Evaluate per-body hydrodynamics on the rayon pool (requires the `parallel` feature).
    pub parallel: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            time_step: DEFAULT_TIME_STEP,
            gravity: Vec3::from_array(DEFAULT_GRAVITY),
            hydrodynamics: HydrodynamicSettings::default(),
            parallel: cfg!(feature = "parallel"),
        }
    }
}

impl SimulationSettings {
    pub fn with_time_step(mut self, time_step: f32) -> Self {
        self.time_step = time_step;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_hydrodynamics(mut self, hydrodynamics: HydrodynamicSettings) -> Self {
        self.hydrodynamics = hydrodynamics;
        self
    }
}
