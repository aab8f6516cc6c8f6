use std::collections::VecDeque;

use glam::{Quat, Vec3};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::solid::RigidSolid;
use super::types::{Transform, Velocity, Wrench};
use crate::config::JOINT_VELOCITY_EPSILON;
use crate::dynamics::backend::{
    BodyDescription, DynamicsBackend, JointDescription, LinkHandle, TreeHandle,
};
use crate::dynamics::fluid::FluidVolume;
use crate::dynamics::hydrodynamics::{BodyMotion, HydrodynamicForceModel, HydrodynamicState};
use crate::error::AssemblyError;
use crate::utils::spatial::SpatialVec;

/// Type of joint connecting a link to its parent in reduced coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JointKind {
    /// 1-DOF rotation about an axis through the pivot.
    Revolute,
    /// 1-DOF translation along the axis.
    Prismatic,
    /// 0-DOF rigid connection.
    Fixed,
}

impl JointKind {
    /// Returns the number of degrees of freedom for this joint type.
    pub fn dofs(&self) -> usize {
        match self {
            JointKind::Revolute | JointKind::Prismatic => 1,
            JointKind::Fixed => 0,
        }
    }

    /// Displacement of the child frame at joint position `q`, expressed in the child frame
    /// at `q = 0`. `pivot` and the unit `axis` are child-frame quantities.
    pub fn displacement(&self, pivot: Vec3, axis: Vec3, q: f32) -> Transform {
        match self {
            JointKind::Revolute => {
                let rotation = Quat::from_axis_angle(axis, q);
                Transform::new(pivot - rotation * pivot, rotation)
            }
            JointKind::Prismatic => Transform::from_translation(axis * q),
            JointKind::Fixed => Transform::IDENTITY,
        }
    }

    /// Motion subspace `S` in the child frame; `None` for a rigid connection.
    pub fn motion_subspace(&self, pivot: Vec3, axis: Vec3) -> Option<SpatialVec> {
        match self {
            JointKind::Revolute => Some(SpatialVec::new(axis, pivot.cross(axis))),
            JointKind::Prismatic => Some(SpatialVec::new(Vec3::ZERO, axis)),
            JointKind::Fixed => None,
        }
    }
}

/// Position range of a joint. Only exists when `lower < upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimit {
    pub lower: f32,
    pub upper: f32,
}

impl JointLimit {
    pub fn new(lower: f32, upper: f32) -> Option<Self> {
        (lower < upper).then_some(Self { lower, upper })
    }

    pub fn clamp(&self, position: f32) -> f32 {
        position.clamp(self.lower, self.upper)
    }
}

/// Explicit PD servo driving a joint towards a position and/or velocity target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointMotor {
    pub max_effort: f32,
    pub target_position: Option<f32>,
    pub target_velocity: Option<f32>,
    pub kp: f32,
    pub kd: f32,
}

impl JointMotor {
    pub fn new(max_effort: f32) -> Self {
        Self {
            max_effort: max_effort.abs(),
            target_position: None,
            target_velocity: None,
            kp: 0.0,
            kd: 0.0,
        }
    }

    /// Effort for the current joint state, saturated at `max_effort`. Position targets
    /// outside the limit range are pulled back into it.
    pub fn effort(&self, position: f32, velocity: f32, limit: Option<&JointLimit>) -> f32 {
        let effort = match (self.target_position, self.target_velocity) {
            (None, None) => 0.0,
            (None, Some(target)) => self.kd * (target - velocity),
            (Some(target), target_velocity) => {
                let target = limit.map_or(target, |l| l.clamp(target));
                self.kp * (target - position) + self.kd * (target_velocity.unwrap_or(0.0) - velocity)
            }
        };
        if effort.is_finite() {
            effort.clamp(-self.max_effort, self.max_effort)
        } else {
            0.0
        }
    }
}

/// Coulomb plus viscous joint friction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JointDamping {
    pub constant: f32,
    pub viscous: f32,
}

impl JointDamping {
    pub fn effort(&self, velocity: f32) -> f32 {
        let coulomb = if velocity.abs() < JOINT_VELOCITY_EPSILON {
            0.0
        } else {
            -self.constant * velocity.signum()
        };
        coulomb - self.viscous * velocity
    }
}

/// A single node in the articulated body tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinematicLink {
    pub name: String,
    pub solid: RigidSolid,
    /// World pose of the geometry frame at assembly.
    pub origin: Transform,
    /// World pose of the centre-of-mass frame.
    pub transform: Transform,
    pub velocity: Velocity,
    pub acceleration: Velocity,
    pub hydro: HydrodynamicState,
    pub applied_force: Vec3,
    pub applied_torque: Vec3,
}

impl KinematicLink {
    fn new(name: &str, solid: RigidSolid, origin: Transform) -> Self {
        let transform = origin.combine(&solid.cg_origin);
        Self {
            name: name.into(),
            solid,
            origin,
            transform,
            velocity: Velocity::default(),
            acceleration: Velocity::default(),
            hydro: HydrodynamicState::default(),
            applied_force: Vec3::ZERO,
            applied_torque: Vec3::ZERO,
        }
    }

    /// World pose of the geometry frame.
    pub fn geometry_transform(&self) -> Transform {
        self.solid.geometry_pose(&self.transform)
    }

    fn motion(&self) -> BodyMotion {
        BodyMotion {
            pose: self.transform,
            velocity: self.velocity,
            acceleration: self.acceleration,
        }
    }

    fn description(&self) -> BodyDescription {
        BodyDescription {
            mass: self.solid.mass(),
            principal_inertia: self.solid.mass_properties.principal_inertia,
            pose: self.transform,
        }
    }
}

/// Joint attaching `child` to `parent`. Pivot and axis live in the child's centre-of-mass
/// frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinematicJoint {
    pub name: String,
    pub kind: JointKind,
    pub parent: usize,
    pub child: usize,
    pub pivot: Vec3,
    pub axis: Vec3,
    pub limit: Option<JointLimit>,
    pub motor: Option<JointMotor>,
    pub damping: JointDamping,
    pub position: f32,
    pub velocity: f32,
    /// Total effort sent to the backend on the last step.
    pub applied_effort: f32,
    pub reaction_force: Vec3,
    pub reaction_torque: Vec3,
    user_effort: f32,
}

impl KinematicJoint {
    fn description(&self) -> JointDescription {
        JointDescription {
            kind: self.kind,
            pivot: self.pivot,
            axis: self.axis,
        }
    }

    /// Motor and damping effort for the current state.
    fn actuation(&self) -> f32 {
        if self.kind.dofs() == 0 {
            return 0.0;
        }
        let motor = self
            .motor
            .map_or(0.0, |m| m.effort(self.position, self.velocity, self.limit.as_ref()));
        motor + self.damping.effort(self.velocity) + self.user_effort
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Registration {
    tree: TreeHandle,
    handles: Vec<LinkHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct InitialCondition {
    joint: usize,
    position: f32,
    velocity: f32,
}

/// A tree of rigid links connected by joints, rooted at link 0.
///
/// Topology is built up front and frozen by [`ArticulatedBody::register`]. Afterwards the
/// body only exchanges state with its backend once per step.
#[derive(Debug, Clone)]
pub struct ArticulatedBody {
    pub name: String,
    fixed_base: bool,
    links: Vec<KinematicLink>,
    joints: Vec<KinematicJoint>,
    registration: Option<Registration>,
    pending_ic: Vec<InitialCondition>,
    pending_base_pose: Option<Transform>,
    pending_base_velocity: Option<Velocity>,
    limits_dirty: bool,
}

impl ArticulatedBody {
    /// Creates a body from its base link. A fixed base is moved kinematically only.
    pub fn new(name: impl Into<String>, base: RigidSolid, origin: Transform, fixed_base: bool) -> Self {
        let base_name = format!("{}_base", base.name);
        Self {
            name: name.into(),
            fixed_base,
            links: vec![KinematicLink::new(&base_name, base, origin)],
            joints: Vec::new(),
            registration: None,
            pending_ic: Vec::new(),
            pending_base_pose: None,
            pending_base_velocity: None,
            limits_dirty: false,
        }
    }

    pub fn add_link(
        &mut self,
        name: &str,
        solid: RigidSolid,
        origin: Transform,
    ) -> Result<usize, AssemblyError> {
        self.ensure_unregistered()?;
        self.links.push(KinematicLink::new(name, solid, origin));
        Ok(self.links.len() - 1)
    }

    pub fn add_revolute_joint(
        &mut self,
        name: &str,
        parent: usize,
        child: usize,
        pivot: Vec3,
        axis: Vec3,
    ) -> Result<usize, AssemblyError> {
        self.add_joint(name, JointKind::Revolute, parent, child, pivot, axis)
    }

    pub fn add_prismatic_joint(
        &mut self,
        name: &str,
        parent: usize,
        child: usize,
        axis: Vec3,
    ) -> Result<usize, AssemblyError> {
        let pivot = self
            .links
            .get(child)
            .map_or(Vec3::ZERO, |link| link.transform.position);
        self.add_joint(name, JointKind::Prismatic, parent, child, pivot, axis)
    }

    pub fn add_fixed_joint(
        &mut self,
        name: &str,
        parent: usize,
        child: usize,
    ) -> Result<usize, AssemblyError> {
        let pivot = self
            .links
            .get(child)
            .map_or(Vec3::ZERO, |link| link.transform.position);
        self.add_joint(name, JointKind::Fixed, parent, child, pivot, Vec3::X)
    }

    /// Joins two links; `pivot` and `axis` are given in world coordinates at assembly.
    pub fn add_joint(
        &mut self,
        name: &str,
        kind: JointKind,
        parent: usize,
        child: usize,
        pivot: Vec3,
        axis: Vec3,
    ) -> Result<usize, AssemblyError> {
        let result = self.validate_joint(kind, parent, child, axis);
        if let Err(err) = &result {
            warn!("{}: rejected joint `{name}`: {err}", self.name);
        }
        result?;

        let frame = self.links[child].transform;
        let joint = KinematicJoint {
            name: name.into(),
            kind,
            parent,
            child,
            pivot: frame.inverse_transform_point(pivot),
            axis: frame.inverse_transform_vector(axis).normalize_or_zero(),
            limit: None,
            motor: None,
            damping: JointDamping::default(),
            position: 0.0,
            velocity: 0.0,
            applied_effort: 0.0,
            reaction_force: Vec3::ZERO,
            reaction_torque: Vec3::ZERO,
            user_effort: 0.0,
        };
        self.joints.push(joint);
        debug!("{}: joint `{name}` ({kind:?}) {parent} -> {child}", self.name);
        Ok(self.joints.len() - 1)
    }

    fn validate_joint(
        &self,
        kind: JointKind,
        parent: usize,
        child: usize,
        axis: Vec3,
    ) -> Result<(), AssemblyError> {
        self.ensure_unregistered()?;
        let count = self.links.len();
        for index in [parent, child] {
            if index >= count {
                return Err(AssemblyError::LinkOutOfRange { index, count });
            }
        }
        if parent == child {
            return Err(AssemblyError::SelfJoint(parent));
        }
        if child == 0 {
            return Err(AssemblyError::BaseAsChild);
        }
        if self.parent_of(child).is_some() {
            return Err(AssemblyError::ChildAlreadyAttached(child));
        }
        let mut ancestor = Some(parent);
        while let Some(link) = ancestor {
            if link == child {
                return Err(AssemblyError::CycleDetected { parent, child });
            }
            ancestor = self.parent_of(link);
        }
        if kind.dofs() > 0 && !(axis.length_squared() > 0.0 && axis.is_finite()) {
            return Err(AssemblyError::DegenerateAxis);
        }
        Ok(())
    }

    fn parent_of(&self, link: usize) -> Option<usize> {
        self.joints.iter().find(|j| j.child == link).map(|j| j.parent)
    }

    fn ensure_unregistered(&self) -> Result<(), AssemblyError> {
        if self.registration.is_some() {
            return Err(AssemblyError::AlreadyRegistered(self.name.clone()));
        }
        Ok(())
    }

    fn joint_mut(&mut self, joint: usize) -> Result<&mut KinematicJoint, AssemblyError> {
        let count = self.joints.len();
        self.joints
            .get_mut(joint)
            .ok_or(AssemblyError::JointOutOfRange { index: joint, count })
    }

    /// Enables a limit when `lower < upper`; any other pair removes it.
    pub fn add_joint_limit(&mut self, joint: usize, lower: f32, upper: f32) -> Result<(), AssemblyError> {
        self.joint_mut(joint)?.limit = JointLimit::new(lower, upper);
        self.limits_dirty = true;
        Ok(())
    }

    pub fn add_joint_motor(&mut self, joint: usize, max_effort: f32) -> Result<(), AssemblyError> {
        self.joint_mut(joint)?.motor = Some(JointMotor::new(max_effort));
        Ok(())
    }

    /// Sets the servo target. With a position the motor is a PD controller, with only a
    /// velocity it tracks that velocity with `kd`. A joint without a motor gets an
    /// unbounded one.
    pub fn set_motor_target(
        &mut self,
        joint: usize,
        position: Option<f32>,
        velocity: Option<f32>,
        kp: f32,
        kd: f32,
    ) -> Result<(), AssemblyError> {
        let target = self.joint_mut(joint)?;
        let motor = target.motor.get_or_insert(JointMotor::new(f32::INFINITY));
        motor.target_position = position;
        motor.target_velocity = velocity;
        motor.kp = kp;
        motor.kd = kd;
        Ok(())
    }

    pub fn set_joint_damping(&mut self, joint: usize, constant: f32, viscous: f32) -> Result<(), AssemblyError> {
        self.joint_mut(joint)?.damping = JointDamping { constant, viscous };
        Ok(())
    }

    /// Sets a joint's position and velocity; reaches the backend at the next flush.
    pub fn set_joint_ic(&mut self, joint: usize, position: f32, velocity: f32) -> Result<(), AssemblyError> {
        let target = self.joint_mut(joint)?;
        target.position = position;
        target.velocity = velocity;
        self.pending_ic.retain(|ic| ic.joint != joint);
        self.pending_ic.push(InitialCondition {
            joint,
            position,
            velocity,
        });
        Ok(())
    }

    /// Moves the base so its geometry frame sits at `pose`. Before registration the whole
    /// assembly moves with it.
    pub fn set_base_pose(&mut self, pose: Transform) {
        let target = pose.combine(&self.links[0].solid.cg_origin);
        if self.registration.is_none() {
            let delta = target.combine(&self.links[0].transform.inverse());
            for link in &mut self.links {
                link.origin = delta.combine(&link.origin);
                link.transform = delta.combine(&link.transform);
            }
        } else {
            self.links[0].transform = target;
        }
        self.pending_base_pose = Some(target);
    }

    /// World-frame velocity of the base centre of mass.
    pub fn set_base_velocity(&mut self, velocity: Velocity) {
        self.links[0].velocity = velocity;
        self.pending_base_velocity = Some(velocity);
    }

    /// World-frame force at the link's centre of mass for the next step.
    pub fn apply_link_force(&mut self, link: usize, force: Vec3) {
        if let Some(link) = self.links.get_mut(link) {
            link.applied_force += force;
        }
    }

    pub fn apply_link_torque(&mut self, link: usize, torque: Vec3) {
        if let Some(link) = self.links.get_mut(link) {
            link.applied_torque += torque;
        }
    }

    pub fn apply_joint_effort(&mut self, joint: usize, effort: f32) {
        if let Some(joint) = self.joints.get_mut(joint) {
            joint.user_effort += effort;
        }
    }

    /// Registers links breadth-first from the base and freezes the topology.
    pub fn register(&mut self, backend: &mut dyn DynamicsBackend) -> Result<TreeHandle, AssemblyError> {
        self.ensure_unregistered()?;

        let mut order = Vec::with_capacity(self.joints.len());
        let mut reached = vec![false; self.links.len()];
        reached[0] = true;
        let mut queue = VecDeque::from([0usize]);
        while let Some(link) = queue.pop_front() {
            for (j, joint) in self.joints.iter().enumerate().filter(|(_, j)| j.parent == link) {
                reached[joint.child] = true;
                order.push(j);
                queue.push_back(joint.child);
            }
        }
        if let Some(orphan) = reached.iter().position(|r| !r) {
            warn!("{}: link {orphan} is not connected to the base", self.name);
            return Err(AssemblyError::Disconnected(orphan));
        }

        let tree = backend.register_tree(&self.links[0].description(), !self.fixed_base);
        let mut handles = vec![LinkHandle { tree: tree.0, link: 0 }; self.links.len()];
        for j in order {
            let joint = &self.joints[j];
            let registered = backend.register_body(
                tree,
                &self.links[joint.child].description(),
                handles[joint.parent].link,
                &joint.description(),
            );
            let Some(handle) = registered else {
                warn!("{}: backend rejected link {}", self.name, joint.child);
                backend.remove_tree(tree);
                return Err(AssemblyError::BackendRejected(joint.child));
            };
            handles[joint.child] = handle;
        }

        self.registration = Some(Registration { tree, handles });
        self.limits_dirty = true;
        if self.links[0].velocity != Velocity::default() {
            self.pending_base_velocity = Some(self.links[0].velocity);
        }
        self.flush_initial_conditions(backend);
        debug!(
            "{}: registered {} links and {} joints",
            self.name,
            self.links.len(),
            self.joints.len()
        );
        Ok(tree)
    }

    fn handle(&self, link: usize) -> Option<LinkHandle> {
        self.registration.as_ref()?.handles.get(link).copied()
    }

    /// Pushes pending poses, velocities and joint states to the backend.
    /// Returns whether anything was sent.
    pub fn flush_initial_conditions(&mut self, backend: &mut dyn DynamicsBackend) -> bool {
        let Some(registration) = &self.registration else {
            return false;
        };
        let tree = registration.tree;
        let mut flushed = false;
        if let Some(pose) = self.pending_base_pose.take() {
            backend.set_base_transform(tree, pose);
            flushed = true;
        }
        if let Some(velocity) = self.pending_base_velocity.take() {
            backend.set_base_velocity(tree, velocity);
            flushed = true;
        }
        for ic in std::mem::take(&mut self.pending_ic) {
            let Some(handle) = self.joints.get(ic.joint).and_then(|j| self.handle(j.child)) else {
                continue;
            };
            backend.set_joint_state(handle, ic.position, ic.velocity);
            flushed = true;
        }
        flushed
    }

    /// Hydrodynamic loads of every link from its current (previous-step) state.
    pub fn compute_hydrodynamics(
        &mut self,
        fluid: &dyn FluidVolume,
        gravity: Vec3,
        model: &HydrodynamicForceModel,
    ) {
        for link in &mut self.links {
            link.hydro = model.evaluate(&link.solid, &link.motion(), fluid, gravity);
        }
    }

    pub fn clear_hydrodynamics(&mut self) {
        for link in &mut self.links {
            link.hydro.reset();
        }
    }

    /// Sends gravity, hydrodynamic loads, user loads and joint efforts to the backend.
    pub fn apply_actuation(&mut self, backend: &mut dyn DynamicsBackend, gravity: Vec3) {
        let Some(registration) = self.registration.clone() else {
            return;
        };

        if std::mem::take(&mut self.limits_dirty) {
            for joint in &self.joints {
                let limit = joint.limit.map(|l| (l.lower, l.upper));
                backend.set_joint_limit(registration.handles[joint.child], limit);
            }
        }

        for (link, &handle) in self.links.iter_mut().zip(&registration.handles) {
            let hydro = link.hydro.total();
            let force = gravity * link.solid.mass() + hydro.force + link.applied_force;
            backend.add_link_force(handle, force);
            backend.add_link_torque(handle, hydro.torque + link.applied_torque);
            link.applied_force = Vec3::ZERO;
            link.applied_torque = Vec3::ZERO;
        }

        for joint in &mut self.joints {
            let effort = joint.actuation();
            joint.applied_effort = effort;
            joint.user_effort = 0.0;
            if joint.kind.dofs() > 0 {
                backend.add_joint_torque(registration.handles[joint.child], effort);
            }
        }
    }

    /// Copies link and joint state back from the backend.
    pub fn read_back(&mut self, backend: &dyn DynamicsBackend) {
        let Some(registration) = &self.registration else {
            return;
        };
        for (link, &handle) in self.links.iter_mut().zip(&registration.handles) {
            link.transform = backend.link_transform(handle);
            link.velocity = Velocity::new(
                backend.link_linear_velocity(handle),
                backend.link_angular_velocity(handle),
            );
            link.acceleration = Velocity::new(
                backend.link_linear_acceleration(handle),
                backend.link_angular_acceleration(handle),
            );
        }
        for joint in &mut self.joints {
            let handle = registration.handles[joint.child];
            joint.position = backend.joint_position(handle);
            joint.velocity = backend.joint_velocity(handle);
            let reaction = backend.joint_reaction(handle);
            joint.reaction_force = reaction.force;
            joint.reaction_torque = reaction.torque;
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }

    pub fn tree(&self) -> Option<TreeHandle> {
        self.registration.as_ref().map(|r| r.tree)
    }

    pub fn has_fixed_base(&self) -> bool {
        self.fixed_base
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn links(&self) -> &[KinematicLink] {
        &self.links
    }

    pub fn joints(&self) -> &[KinematicJoint] {
        &self.joints
    }

    pub fn link(&self, index: usize) -> Option<&KinematicLink> {
        self.links.get(index)
    }

    pub fn joint(&self, index: usize) -> Option<&KinematicJoint> {
        self.joints.get(index)
    }

    pub fn total_mass(&self) -> f32 {
        self.links.iter().map(|l| l.solid.mass()).sum()
    }

    pub fn link_transform(&self, index: usize) -> Transform {
        self.links.get(index).map_or(Transform::IDENTITY, |l| l.transform)
    }

    pub fn link_velocity(&self, index: usize) -> Velocity {
        self.links.get(index).map_or(Velocity::default(), |l| l.velocity)
    }

    pub fn link_acceleration(&self, index: usize) -> Velocity {
        self.links.get(index).map_or(Velocity::default(), |l| l.acceleration)
    }

    pub fn hydrodynamic_state(&self, index: usize) -> HydrodynamicState {
        self.links.get(index).map_or(HydrodynamicState::default(), |l| l.hydro)
    }

    pub fn joint_position(&self, index: usize) -> f32 {
        self.joints.get(index).map_or(0.0, |j| j.position)
    }

    pub fn joint_velocity(&self, index: usize) -> f32 {
        self.joints.get(index).map_or(0.0, |j| j.velocity)
    }

    pub fn joint_effort(&self, index: usize) -> f32 {
        self.joints.get(index).map_or(0.0, |j| j.applied_effort)
    }

    pub fn joint_reaction(&self, index: usize) -> Wrench {
        self.joints
            .get(index)
            .map_or(Wrench::ZERO, |j| Wrench::new(j.reaction_force, j.reaction_torque))
    }
}
