//! Hydrobody – articulated rigid bodies moving through water.
//!
//! Solids carry exact mass properties and a fitted hydrodynamic proxy. Articulated
//! bodies are trees of such solids joined by revolute, prismatic and fixed joints,
//! integrated by a reduced-coordinate backend while buoyancy, drag and added mass are
//! evaluated against a [`FluidVolume`] every step.

pub mod config;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod utils;
pub mod world;

pub use glam::{Mat3, Quat, Vec3};

pub use config::{HydrodynamicSettings, SimulationSettings};
pub use core::{
    articulations::{ArticulatedBody, JointKind, JointLimit, JointMotor, KinematicJoint, KinematicLink},
    mesh::TriangleMesh,
    shape::ShapeKind,
    solid::{PartKind, RigidSolid},
    types::{MassProperties, Material, Transform, Velocity, Wrench},
};
pub use dynamics::{
    aba::FeatherstoneBackend,
    backend::DynamicsBackend,
    fluid::{Current, FluidVolume, Ocean, Wave},
    hydrodynamics::{HydrodynamicForceModel, HydrodynamicState, Regime},
    proxy::{HydrodynamicProxy, ProxyKind},
};
pub use error::AssemblyError;
pub use world::{BodyId, SceneSnapshot, Simulation, SnapshotReader};

/// High-level convenience wrapper owning a [`Simulation`] on the built-in
/// [`FeatherstoneBackend`].
pub struct HydroEngine {
    simulation: Simulation,
}

impl HydroEngine {
    /// Creates an engine with default settings and the provided fixed timestep.
    pub fn new(timestep: f32) -> Self {
        Self::with_settings(SimulationSettings::default().with_time_step(timestep))
    }

    pub fn with_settings(settings: SimulationSettings) -> Self {
        Self {
            simulation: Simulation::new(settings, Box::new(FeatherstoneBackend::new()), None),
        }
    }

    /// Replaces the fluid every body is immersed in.
    pub fn set_fluid(&mut self, fluid: impl FluidVolume + 'static) {
        self.simulation.set_fluid(Some(Box::new(fluid)));
    }

    /// Adds a free-floating solid placed with its geometry frame at `origin`.
    pub fn add_solid(&mut self, solid: RigidSolid, origin: Transform) -> Result<BodyId, AssemblyError> {
        self.simulation.add_solid(solid, origin)
    }

    pub fn add_articulated_body(&mut self, body: ArticulatedBody) -> Result<BodyId, AssemblyError> {
        self.simulation.add_articulated_body(body)
    }

    /// Advances the simulation by the provided delta time.
    pub fn step(&mut self, dt: f32) {
        self.simulation.step(dt);
    }

    /// Enables or disables parallel evaluation of hydrodynamic loads.
    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.simulation.set_parallel_enabled(enabled);
    }

    pub fn parallel_enabled(&self) -> bool {
        self.simulation.parallel_enabled()
    }

    pub fn body(&self, id: BodyId) -> Option<&ArticulatedBody> {
        self.simulation.body(id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut ArticulatedBody> {
        self.simulation.body_mut(id)
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }
}
