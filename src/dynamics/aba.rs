//! Featherstone articulated-body algorithm behind the [`DynamicsBackend`] interface.
//!
//! Every link frame sits at the link's centre of mass along its principal axes, so link
//! inertias are diagonal. Velocities and accelerations are stored as spatial vectors in
//! link coordinates.

use glam::Vec3;
use log::{debug, warn};

use super::backend::{BodyDescription, DynamicsBackend, JointDescription, LinkHandle, TreeHandle};
use crate::core::articulations::JointKind;
use crate::core::types::{Transform, Velocity, Wrench};
use crate::utils::math::{integrate_rotation, is_valid_step};
use crate::utils::spatial::{Plucker, SpatialInertia, SpatialMat, SpatialVec};

#[derive(Debug, Clone, Copy)]
struct Link {
    parent: Option<usize>,
    joint: JointDescription,
    inertia: SpatialMat,
    /// Link frame relative to the parent link frame at zero joint position.
    offset: Transform,
    limit: Option<(f32, f32)>,
    q: f32,
    qd: f32,
    qdd: f32,
    tau: f32,
    force: Vec3,
    torque: Vec3,
    pose: Transform,
    velocity: SpatialVec,
    acceleration: SpatialVec,
    reaction: SpatialVec,
}

impl Link {
    fn new(body: &BodyDescription, parent: Option<usize>, joint: JointDescription, offset: Transform) -> Self {
        Self {
            parent,
            joint,
            inertia: SpatialInertia::principal(body.mass, body.principal_inertia).to_mat(),
            offset,
            limit: None,
            q: 0.0,
            qd: 0.0,
            qdd: 0.0,
            tau: 0.0,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            pose: body.pose,
            velocity: SpatialVec::ZERO,
            acceleration: SpatialVec::ZERO,
            reaction: SpatialVec::ZERO,
        }
    }

    /// Transform from the parent link frame into this one at the current position.
    fn parent_transform(&self) -> Plucker {
        let motion = self.joint.kind.displacement(self.joint.pivot, self.joint.axis, self.q);
        Plucker::from_pose(&self.offset.combine(&motion))
    }

    fn subspace(&self) -> Option<SpatialVec> {
        self.joint.kind.motion_subspace(self.joint.pivot, self.joint.axis)
    }
}

#[derive(Debug, Clone)]
struct Tree {
    floating: bool,
    links: Vec<Link>,
}

impl Tree {
    /// Recomputes poses and velocities of every non-base link from the joint state.
    fn update_kinematics(&mut self) {
        for i in 1..self.links.len() {
            let Some(parent) = self.links[i].parent else {
                continue;
            };
            let (parent_pose, parent_velocity) = (self.links[parent].pose, self.links[parent].velocity);
            let link = &mut self.links[i];
            let motion = link.joint.kind.displacement(link.joint.pivot, link.joint.axis, link.q);
            let relative = link.offset.combine(&motion);
            link.pose = parent_pose.combine(&relative);
            let mut velocity = Plucker::from_pose(&relative).motion(parent_velocity);
            if let Some(s) = link.subspace() {
                velocity += s * link.qd;
            }
            link.velocity = velocity;
        }
    }

    fn step(&mut self, dt: f32) {
        let n = self.links.len();
        let mut transforms = vec![Plucker::IDENTITY; n];
        let mut subspaces: Vec<Option<SpatialVec>> = vec![None; n];
        let mut bias = vec![SpatialVec::ZERO; n];
        let mut external = vec![SpatialVec::ZERO; n];
        let mut i_a = vec![SpatialMat::default(); n];
        let mut p_a = vec![SpatialVec::ZERO; n];
        let mut u_vec = vec![SpatialVec::ZERO; n];
        let mut d_inv = vec![0.0f32; n];
        let mut effort = vec![0.0f32; n];

        // --- Pass 1: Outward ---
        // Bias velocities and forces from the current state.
        for (i, link) in self.links.iter().enumerate() {
            let to_link = link.pose.rotation.inverse();
            external[i] = SpatialVec::new(to_link * link.torque, to_link * link.force);
            if link.parent.is_some() {
                transforms[i] = link.parent_transform();
                subspaces[i] = link.subspace();
                if let Some(s) = subspaces[i] {
                    bias[i] = link.velocity.cross_motion(&(s * link.qd));
                }
            }
            let v = link.velocity;
            i_a[i] = link.inertia;
            p_a[i] = v.cross_force(&link.inertia.mul_vec(v)) - external[i];
        }

        // --- Pass 2: Inward ---
        for i in (1..n).rev() {
            let Some(parent) = self.links[i].parent else {
                continue;
            };
            let (inertia_up, force_up) = match subspaces[i] {
                Some(s) => {
                    let u_i = i_a[i].mul_vec(s);
                    let d = s.dot(&u_i);
                    let di = if d.abs() > 1e-9 { 1.0 / d } else { 0.0 };
                    u_vec[i] = u_i;
                    d_inv[i] = di;
                    effort[i] = self.links[i].tau - s.dot(&p_a[i]);

                    let reduced = i_a[i] - SpatialMat::outer_product(u_i) * di;
                    let force = p_a[i] + reduced.mul_vec(bias[i]) + u_i * (di * effort[i]);
                    (reduced, force)
                }
                None => (i_a[i], p_a[i] + i_a[i].mul_vec(bias[i])),
            };
            i_a[parent] = i_a[parent] + transforms[i].inertia_to_parent(&inertia_up);
            p_a[parent] += transforms[i].force_to_parent(force_up);
        }

        // --- Pass 3: Outward ---
        let mut accelerations = vec![SpatialVec::ZERO; n];
        if self.floating && n > 0 {
            accelerations[0] = i_a[0].solve(-p_a[0]).unwrap_or_else(|| {
                debug!("singular articulated inertia at the base; holding its velocity");
                SpatialVec::ZERO
            });
        }
        for i in 1..n {
            let Some(parent) = self.links[i].parent else {
                continue;
            };
            let a_hat = transforms[i].motion(accelerations[parent]) + bias[i];
            accelerations[i] = match subspaces[i] {
                Some(s) => {
                    let mut qdd = d_inv[i] * (effort[i] - u_vec[i].dot(&a_hat));
                    if !qdd.is_finite() {
                        qdd = 0.0;
                    }
                    self.links[i].qdd = qdd;
                    a_hat + s * qdd
                }
                None => a_hat,
            };
        }

        // Joint reactions by a Newton–Euler backward sweep.
        let mut wrenches: Vec<SpatialVec> = self
            .links
            .iter()
            .enumerate()
            .map(|(i, link)| {
                let v = link.velocity;
                link.inertia.mul_vec(accelerations[i])
                    + v.cross_force(&link.inertia.mul_vec(v))
                    - external[i]
            })
            .collect();
        for i in (1..n).rev() {
            if let Some(parent) = self.links[i].parent {
                let up = transforms[i].force_to_parent(wrenches[i]);
                wrenches[parent] += up;
            }
        }

        for (i, link) in self.links.iter_mut().enumerate() {
            link.acceleration = accelerations[i];
            link.reaction = if wrenches[i].is_finite() {
                wrenches[i]
            } else {
                SpatialVec::ZERO
            };
        }

        self.integrate(dt);
        self.update_kinematics();

        for link in &mut self.links {
            link.force = Vec3::ZERO;
            link.torque = Vec3::ZERO;
            link.tau = 0.0;
        }
    }

    /// Semi-implicit Euler: velocities first, then positions from the new velocities.
    fn integrate(&mut self, dt: f32) {
        if let Some(base) = self.links.first_mut() {
            if self.floating {
                base.velocity += base.acceleration * dt;
            }
            let v = base.velocity;
            if !v.is_finite() {
                warn!("non-finite base velocity; resetting to rest");
                base.velocity = SpatialVec::ZERO;
            } else {
                base.pose.position += base.pose.rotation * v.lin * dt;
                base.pose.rotation = integrate_rotation(base.pose.rotation, v.ang, dt);
            }
        }

        for link in self.links.iter_mut().skip(1) {
            if link.joint.kind.dofs() == 0 {
                continue;
            }
            link.qd += link.qdd * dt;
            link.q += link.qd * dt;
            if let Some((lower, upper)) = link.limit {
                if link.q < lower {
                    link.q = lower;
                    link.qd = link.qd.max(0.0);
                } else if link.q > upper {
                    link.q = upper;
                    link.qd = link.qd.min(0.0);
                }
            }
        }
    }
}

/// Reduced-coordinate backend running Featherstone's articulated-body algorithm per tree.
#[derive(Debug, Clone, Default)]
pub struct FeatherstoneBackend {
    trees: Vec<Tree>,
}

impl FeatherstoneBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn link_count(&self, tree: TreeHandle) -> usize {
        self.trees.get(tree.0).map_or(0, |t| t.links.len())
    }

    fn link(&self, handle: LinkHandle) -> Option<&Link> {
        self.trees.get(handle.tree)?.links.get(handle.link)
    }

    fn link_mut(&mut self, handle: LinkHandle) -> Option<&mut Link> {
        self.trees.get_mut(handle.tree)?.links.get_mut(handle.link)
    }

    fn joint_mut(&mut self, handle: LinkHandle) -> Option<&mut Link> {
        self.link_mut(handle).filter(|link| link.parent.is_some())
    }
}

impl DynamicsBackend for FeatherstoneBackend {
    fn register_tree(&mut self, base: &BodyDescription, floating: bool) -> TreeHandle {
        let joint = JointDescription {
            kind: JointKind::Fixed,
            pivot: Vec3::ZERO,
            axis: Vec3::ZERO,
        };
        self.trees.push(Tree {
            floating,
            links: vec![Link::new(base, None, joint, Transform::IDENTITY)],
        });
        debug!("registered tree {} ({} base)", self.trees.len() - 1, if floating { "floating" } else { "fixed" });
        TreeHandle(self.trees.len() - 1)
    }

    fn register_body(
        &mut self,
        tree: TreeHandle,
        body: &BodyDescription,
        parent: usize,
        joint: &JointDescription,
    ) -> Option<LinkHandle> {
        let links = &mut self.trees.get_mut(tree.0)?.links;
        let parent_link = links.get(parent)?;
        // Assembly happens at zero joint positions.
        let offset = parent_link.pose.inverse().combine(&body.pose);
        let mut joint = *joint;
        joint.axis = joint.axis.normalize_or_zero();
        links.push(Link::new(body, Some(parent), joint, offset));
        Some(LinkHandle {
            tree: tree.0,
            link: links.len() - 1,
        })
    }

    fn remove_tree(&mut self, tree: TreeHandle) {
        if let Some(tree) = self.trees.get_mut(tree.0) {
            tree.links.clear();
        }
    }

    fn set_base_transform(&mut self, tree: TreeHandle, transform: Transform) {
        if let Some(tree) = self.trees.get_mut(tree.0) {
            if let Some(base) = tree.links.first_mut() {
                base.pose = transform;
            }
            tree.update_kinematics();
        }
    }

    fn set_base_velocity(&mut self, tree: TreeHandle, velocity: Velocity) {
        if let Some(tree) = self.trees.get_mut(tree.0) {
            if let Some(base) = tree.links.first_mut() {
                let to_link = base.pose.rotation.inverse();
                base.velocity = SpatialVec::new(to_link * velocity.angular, to_link * velocity.linear);
            }
            tree.update_kinematics();
        }
    }

    fn set_joint_state(&mut self, joint: LinkHandle, position: f32, velocity: f32) {
        let Some(link) = self.joint_mut(joint) else {
            return;
        };
        if link.joint.kind.dofs() == 0 {
            return;
        }
        link.q = position;
        link.qd = velocity;
        if let Some(tree) = self.trees.get_mut(joint.tree) {
            tree.update_kinematics();
        }
    }

    fn set_joint_limit(&mut self, joint: LinkHandle, limit: Option<(f32, f32)>) {
        if let Some(link) = self.joint_mut(joint) {
            link.limit = limit.filter(|(lower, upper)| lower < upper);
        }
    }

    fn add_joint_torque(&mut self, joint: LinkHandle, effort: f32) {
        if let Some(link) = self.joint_mut(joint) {
            link.tau += effort;
        }
    }

    fn add_link_force(&mut self, link: LinkHandle, force: Vec3) {
        if let Some(link) = self.link_mut(link) {
            link.force += force;
        }
    }

    fn add_link_torque(&mut self, link: LinkHandle, torque: Vec3) {
        if let Some(link) = self.link_mut(link) {
            link.torque += torque;
        }
    }

    fn joint_position(&self, joint: LinkHandle) -> f32 {
        self.link(joint).filter(|l| l.parent.is_some()).map_or(0.0, |l| l.q)
    }

    fn joint_velocity(&self, joint: LinkHandle) -> f32 {
        self.link(joint).filter(|l| l.parent.is_some()).map_or(0.0, |l| l.qd)
    }

    fn joint_reaction(&self, joint: LinkHandle) -> Wrench {
        self.link(joint)
            .filter(|l| l.parent.is_some())
            .map_or(Wrench::ZERO, |l| Wrench::new(l.reaction.lin, l.reaction.ang))
    }

    fn link_transform(&self, link: LinkHandle) -> Transform {
        self.link(link).map_or(Transform::IDENTITY, |l| l.pose)
    }

    fn link_linear_velocity(&self, link: LinkHandle) -> Vec3 {
        self.link(link).map_or(Vec3::ZERO, |l| l.pose.rotation * l.velocity.lin)
    }

    fn link_angular_velocity(&self, link: LinkHandle) -> Vec3 {
        self.link(link).map_or(Vec3::ZERO, |l| l.pose.rotation * l.velocity.ang)
    }

    fn link_linear_acceleration(&self, link: LinkHandle) -> Vec3 {
        self.link(link).map_or(Vec3::ZERO, |l| {
            let classical = l.acceleration.lin + l.velocity.ang.cross(l.velocity.lin);
            l.pose.rotation * classical
        })
    }

    fn link_angular_acceleration(&self, link: LinkHandle) -> Vec3 {
        self.link(link).map_or(Vec3::ZERO, |l| l.pose.rotation * l.acceleration.ang)
    }

    fn step_integrate(&mut self, dt: f32) {
        if !is_valid_step(dt) {
            warn!("ignoring integration step of {dt} s");
            return;
        }
        for tree in self.trees.iter_mut().filter(|tree| !tree.links.is_empty()) {
            tree.step(dt);
        }
    }
}
