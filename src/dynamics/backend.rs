//! Interface between articulated bodies and the engine integrating them.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::articulations::JointKind;
use crate::core::types::{Transform, Velocity, Wrench};

/// Handle of a kinematic tree inside a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeHandle(pub usize);

/// Handle of a link inside a tree. The joint attaching a link to its parent shares the
/// link's handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkHandle {
    pub tree: usize,
    pub link: usize,
}

/// Inertial description of a link. The link frame is the body's principal frame at its
/// centre of mass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyDescription {
    pub mass: f32,
    pub principal_inertia: Vec3,
    /// World pose of the link frame in the assembly configuration.
    pub pose: Transform,
}

/// Joint attaching a link to its parent, expressed in the child link frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointDescription {
    pub kind: JointKind,
    pub pivot: Vec3,
    pub axis: Vec3,
}

/// Reduced-coordinate dynamics engine.
///
/// Links are registered parent first. Invalid handles are ignored by setters and read as
/// zero or identity by queries. Forces and torques are world-frame, act at the link's
/// centre of mass and are cleared by [`DynamicsBackend::step_integrate`].
pub trait DynamicsBackend: Send {
    fn register_tree(&mut self, base: &BodyDescription, floating: bool) -> TreeHandle;

    /// Adds a link to `tree` below the link at `parent`; `None` if the parent is unknown.
    fn register_body(
        &mut self,
        tree: TreeHandle,
        body: &BodyDescription,
        parent: usize,
        joint: &JointDescription,
    ) -> Option<LinkHandle>;
    /// Drops every link of `tree`; its handles then read as invalid.
    fn remove_tree(&mut self, tree: TreeHandle);

    fn set_base_transform(&mut self, tree: TreeHandle, transform: Transform);
    /// World-frame velocity of the base centre of mass.
    fn set_base_velocity(&mut self, tree: TreeHandle, velocity: Velocity);

    fn set_joint_state(&mut self, joint: LinkHandle, position: f32, velocity: f32);
    /// Position range the joint is projected back into after integration.
    fn set_joint_limit(&mut self, joint: LinkHandle, limit: Option<(f32, f32)>);

    fn add_joint_torque(&mut self, joint: LinkHandle, effort: f32);
    fn add_link_force(&mut self, link: LinkHandle, force: Vec3);
    fn add_link_torque(&mut self, link: LinkHandle, torque: Vec3);

    fn joint_position(&self, joint: LinkHandle) -> f32;
    fn joint_velocity(&self, joint: LinkHandle) -> f32;
    /// Wrench the parent exerts on the child through the joint, in the child link frame.
    fn joint_reaction(&self, joint: LinkHandle) -> Wrench;

    fn link_transform(&self, link: LinkHandle) -> Transform;
    fn link_linear_velocity(&self, link: LinkHandle) -> Vec3;
    fn link_angular_velocity(&self, link: LinkHandle) -> Vec3;
    fn link_linear_acceleration(&self, link: LinkHandle) -> Vec3;
    fn link_angular_acceleration(&self, link: LinkHandle) -> Vec3;

    fn step_integrate(&mut self, dt: f32);
}
