use std::sync::Arc;

use glam::Vec3;
use log::{debug, warn};
use parking_lot::Mutex;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::{SimulationSettings, DEFAULT_TIME_STEP},
    core::{
        articulations::ArticulatedBody,
        solid::RigidSolid,
        types::{Transform, Velocity},
    },
    dynamics::{
        backend::DynamicsBackend,
        fluid::FluidVolume,
        hydrodynamics::{HydrodynamicForceModel, HydrodynamicState},
    },
    error::AssemblyError,
    utils::{
        logging::{warn_if_behind_real_time, ScopedTimer},
        math::is_valid_step,
    },
};

/// Index of a body inside a [`Simulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyId(pub usize);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkSnapshot {
    pub name: String,
    /// World pose of the link geometry.
    pub transform: Transform,
    pub center_of_mass: Vec3,
    pub velocity: Velocity,
    pub hydro: HydrodynamicState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointSnapshot {
    pub name: String,
    pub position: f32,
    pub velocity: f32,
    pub effort: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub name: String,
    pub links: Vec<LinkSnapshot>,
    pub joints: Vec<JointSnapshot>,
}

/// Everything a reader needs to draw or log one instant of the simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub time: f32,
    pub tick: u64,
    pub bodies: Vec<BodySnapshot>,
}

impl SceneSnapshot {
    fn capture(time: f32, tick: u64, bodies: &[ArticulatedBody]) -> Self {
        let bodies = bodies
            .iter()
            .map(|body| BodySnapshot {
                name: body.name.clone(),
                links: body
                    .links()
                    .iter()
                    .map(|link| LinkSnapshot {
                        name: link.name.clone(),
                        transform: link.geometry_transform(),
                        center_of_mass: link.transform.position,
                        velocity: link.velocity,
                        hydro: link.hydro,
                    })
                    .collect(),
                joints: body
                    .joints()
                    .iter()
                    .map(|joint| JointSnapshot {
                        name: joint.name.clone(),
                        position: joint.position,
                        velocity: joint.velocity,
                        effort: joint.applied_effort,
                    })
                    .collect(),
            })
            .collect();
        Self { time, tick, bodies }
    }
}

/// Cloneable handle other threads use to read the last published snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    shared: Arc<Mutex<SceneSnapshot>>,
}

impl SnapshotReader {
    /// Copy of the last complete snapshot.
    pub fn latest(&self) -> SceneSnapshot {
        self.shared.lock().clone()
    }

    pub fn time(&self) -> f32 {
        self.shared.lock().time
    }
}

/// Central simulation container: bodies, the fluid they move in and the backend
/// integrating them.
pub struct Simulation {
    settings: SimulationSettings,
    backend: Box<dyn DynamicsBackend>,
    fluid: Option<Box<dyn FluidVolume>>,
    bodies: Vec<ArticulatedBody>,
    model: HydrodynamicForceModel,
    time: f32,
    time_accumulated: f32,
    ticks: u64,
    snapshot: Arc<Mutex<SceneSnapshot>>,
}

impl Simulation {
    pub fn new(
        settings: SimulationSettings,
        backend: Box<dyn DynamicsBackend>,
        fluid: Option<Box<dyn FluidVolume>>,
    ) -> Self {
        let mut settings = settings;
        if !is_valid_step(settings.time_step) || settings.time_step == 0.0 {
            warn!("invalid time step {}; using {DEFAULT_TIME_STEP}", settings.time_step);
            settings.time_step = DEFAULT_TIME_STEP;
        }
        Self {
            model: HydrodynamicForceModel::new(settings.hydrodynamics),
            settings,
            backend,
            fluid,
            bodies: Vec::new(),
            time: 0.0,
            time_accumulated: 0.0,
            ticks: 0,
            snapshot: Arc::new(Mutex::new(SceneSnapshot::default())),
        }
    }

    /// Adds a free-floating solid as a single-link tree.
    pub fn add_solid(&mut self, solid: RigidSolid, origin: Transform) -> Result<BodyId, AssemblyError> {
        let body = ArticulatedBody::new(solid.name.clone(), solid, origin, false);
        self.add_articulated_body(body)
    }

    /// Registers the body with the backend; its topology is frozen from here on.
    pub fn add_articulated_body(&mut self, mut body: ArticulatedBody) -> Result<BodyId, AssemblyError> {
        body.register(self.backend.as_mut())?;
        body.read_back(self.backend.as_ref());
        self.bodies.push(body);
        self.publish();
        Ok(BodyId(self.bodies.len() - 1))
    }

    pub fn body(&self, id: BodyId) -> Option<&ArticulatedBody> {
        self.bodies.get(id.0)
    }

    /// Mutable access for targets, loads and initial conditions between steps.
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut ArticulatedBody> {
        self.bodies.get_mut(id.0)
    }

    pub fn bodies(&self) -> &[ArticulatedBody] {
        &self.bodies
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn fluid(&self) -> Option<&dyn FluidVolume> {
        self.fluid.as_deref()
    }

    pub fn set_fluid(&mut self, fluid: Option<Box<dyn FluidVolume>>) {
        self.fluid = fluid;
    }

    pub fn backend(&self) -> &dyn DynamicsBackend {
        self.backend.as_ref()
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.settings.parallel = enabled;
    }

    pub fn parallel_enabled(&self) -> bool {
        cfg!(feature = "parallel") && self.settings.parallel
    }

    pub fn snapshot_reader(&self) -> SnapshotReader {
        SnapshotReader {
            shared: Arc::clone(&self.snapshot),
        }
    }

    /// Advances the simulation using a fixed timestep accumulator.
    ///
    /// Pending initial conditions are applied first, so even a zero-length step makes
    /// them visible through the body queries and the snapshot.
    pub fn step(&mut self, dt: f32) {
        if !is_valid_step(dt) {
            warn!("ignoring step of {dt} s");
            return;
        }
        if self.flush_initial_conditions() {
            for body in &mut self.bodies {
                body.read_back(self.backend.as_ref());
            }
            self.publish();
        }

        self.time_accumulated += dt;
        let timer = ScopedTimer::new("step");
        let mut simulated = 0.0;
        while self.time_accumulated >= self.settings.time_step {
            self.time_accumulated -= self.settings.time_step;
            self.tick();
            simulated += self.settings.time_step;
        }
        warn_if_behind_real_time(timer.elapsed(), simulated);
    }

    fn flush_initial_conditions(&mut self) -> bool {
        let mut flushed = false;
        for body in &mut self.bodies {
            flushed |= body.flush_initial_conditions(self.backend.as_mut());
        }
        flushed
    }

    fn tick(&mut self) {
        let time_step = self.settings.time_step;
        let gravity = self.settings.gravity;
        self.flush_initial_conditions();

        {
            let _timer = ScopedTimer::new("hydrodynamics");
            self.compute_hydrodynamics();
        }
        {
            let _timer = ScopedTimer::new("actuation");
            for body in &mut self.bodies {
                body.apply_actuation(self.backend.as_mut(), gravity);
            }
        }
        {
            let _timer = ScopedTimer::new("integrate");
            self.backend.step_integrate(time_step);
        }
        {
            let _timer = ScopedTimer::new("read_back");
            for body in &mut self.bodies {
                body.read_back(self.backend.as_ref());
            }
        }

        self.time += time_step;
        self.ticks += 1;
        if let Some(fluid) = self.fluid.as_mut() {
            fluid.update(self.time);
        }
        self.publish();
    }

    /// Forces from the state at the end of the previous tick; bodies are independent.
    fn compute_hydrodynamics(&mut self) {
        let gravity = self.settings.gravity;
        let model = self.model;
        let Some(fluid) = self.fluid.as_deref() else {
            for body in &mut self.bodies {
                body.clear_hydrodynamics();
            }
            return;
        };

        #[cfg(feature = "parallel")]
        if self.settings.parallel {
            self.bodies
                .par_iter_mut()
                .for_each(|body| body.compute_hydrodynamics(fluid, gravity, &model));
            return;
        }

        for body in &mut self.bodies {
            body.compute_hydrodynamics(fluid, gravity, &model);
        }
    }

    /// Swaps in a fresh snapshot under a single lock.
    fn publish(&self) {
        let snapshot = {
            let _timer = ScopedTimer::new("snapshot");
            SceneSnapshot::capture(self.time, self.ticks, &self.bodies)
        };
        *self.snapshot.lock() = snapshot;
        if self.ticks % 1000 == 0 && self.ticks > 0 {
            debug!("t = {:.3} s after {} ticks", self.time, self.ticks);
        }
    }
}
