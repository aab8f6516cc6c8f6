use approx::assert_relative_eq;
use glam::Vec3;
use hydrobody::dynamics::backend::{BodyDescription, DynamicsBackend, JointDescription, LinkHandle};
use hydrobody::{
    ArticulatedBody, AssemblyError, FeatherstoneBackend, JointKind, Material, RigidSolid, Simulation,
    SimulationSettings, Transform,
};

fn rod(name: &str) -> RigidSolid {
    RigidSolid::cuboid(name, Vec3::new(0.5, 0.05, 0.05), Material::new("light", 100.0, 0.1)).unwrap()
}

fn chain(links: usize) -> ArticulatedBody {
    let mut body = ArticulatedBody::new("chain", rod("base"), Transform::IDENTITY, true);
    for i in 1..links {
        body.add_link(
            &format!("link{i}"),
            rod("link"),
            Transform::from_translation(Vec3::X * i as f32),
        )
        .unwrap();
    }
    body
}

fn expected(parent: usize, child: usize, count: usize) -> Result<(), AssemblyError> {
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
    Ok(())
}

#[test]
fn every_index_pair_is_validated_for_every_joint_kind() {
    let count = 3;
    for kind in [JointKind::Revolute, JointKind::Prismatic, JointKind::Fixed] {
        for parent in 0..count + 2 {
            for child in 0..count + 2 {
                let mut body = chain(count);
                let result = body
                    .add_joint("j", kind, parent, child, Vec3::ZERO, Vec3::Z)
                    .map(|_| ());
                assert_eq!(result, expected(parent, child, count), "{kind:?} {parent} -> {child}");
                assert_eq!(body.joint_count(), usize::from(result.is_ok()));
            }
        }
    }
}

#[test]
fn topology_rejects_second_parents_cycles_and_bad_axes() {
    let mut body = chain(4);
    body.add_revolute_joint("a", 1, 2, Vec3::new(1.5, 0.0, 0.0), Vec3::Z).unwrap();
    assert_eq!(
        body.add_revolute_joint("b", 3, 2, Vec3::ZERO, Vec3::Z),
        Err(AssemblyError::ChildAlreadyAttached(2))
    );
    assert_eq!(
        body.add_revolute_joint("c", 2, 1, Vec3::ZERO, Vec3::Z),
        Err(AssemblyError::CycleDetected { parent: 2, child: 1 })
    );
    assert_eq!(
        body.add_revolute_joint("d", 0, 3, Vec3::ZERO, Vec3::ZERO),
        Err(AssemblyError::DegenerateAxis)
    );
    // Fixed joints carry no axis.
    assert!(body.add_fixed_joint("e", 0, 3).is_ok());
    assert_eq!(
        body.add_joint_limit(7, -1.0, 1.0),
        Err(AssemblyError::JointOutOfRange { index: 7, count: 2 })
    );
}

#[test]
fn disconnected_links_fail_registration() {
    let mut body = chain(3);
    body.add_revolute_joint("a", 0, 1, Vec3::new(0.5, 0.0, 0.0), Vec3::Z).unwrap();
    let mut backend = FeatherstoneBackend::new();
    assert_eq!(body.register(&mut backend), Err(AssemblyError::Disconnected(2)));
    assert!(!body.is_registered());
}

#[test]
fn topology_is_frozen_after_registration() {
    let mut body = chain(2);
    body.add_revolute_joint("a", 0, 1, Vec3::new(0.5, 0.0, 0.0), Vec3::Z).unwrap();
    let mut backend = FeatherstoneBackend::new();
    body.register(&mut backend).unwrap();
    assert!(matches!(
        body.add_link("late", rod("late"), Transform::IDENTITY),
        Err(AssemblyError::AlreadyRegistered(_))
    ));
    assert!(matches!(
        body.register(&mut backend),
        Err(AssemblyError::AlreadyRegistered(_))
    ));
}

#[test]
fn motor_drives_joint_to_target_without_exceeding_effort() {
    let mut body = chain(2);
    let joint = body
        .add_revolute_joint("shoulder", 0, 1, Vec3::new(0.5, 0.0, 0.0), Vec3::Y)
        .unwrap();
    body.add_joint_motor(joint, 5.0).unwrap();
    body.set_motor_target(joint, Some(std::f32::consts::FRAC_PI_2), None, 20.0, 5.0)
        .unwrap();

    let mut sim = Simulation::new(
        SimulationSettings::default().with_time_step(1.0 / 240.0),
        Box::new(FeatherstoneBackend::new()),
        None,
    );
    let id = sim.add_articulated_body(body).unwrap();
    let dt = 1.0 / 240.0;
    for _ in 0..1200 {
        sim.step(dt);
        let effort = sim.body(id).unwrap().joint_effort(joint);
        assert!(effort.abs() <= 5.0 + 1e-4, "effort {effort}");
    }
    let body = sim.body(id).unwrap();
    assert_relative_eq!(body.joint_position(joint), std::f32::consts::FRAC_PI_2, epsilon = 0.01);
    assert!(body.joint_velocity(joint).abs() < 0.05);
}

#[test]
fn joint_limits_hold_under_gravity() {
    let mut body = chain(2);
    let joint = body
        .add_revolute_joint("hinge", 0, 1, Vec3::new(0.5, 0.0, 0.0), Vec3::Z)
        .unwrap();
    body.add_joint_limit(joint, -0.3, 0.3).unwrap();
    let mut sim = Simulation::new(
        SimulationSettings::default(),
        Box::new(FeatherstoneBackend::new()),
        None,
    );
    let id = sim.add_articulated_body(body).unwrap();
    sim.step(2.0);
    let position = sim.body(id).unwrap().joint_position(joint);
    assert!((-0.3 - 1e-5..=0.3 + 1e-5).contains(&position), "position {position}");
    assert_relative_eq!(position.abs(), 0.3, epsilon = 1e-4);
}

#[test]
fn initial_conditions_round_trip_on_a_zero_step() {
    let mut body = chain(2);
    let joint = body
        .add_revolute_joint("hinge", 0, 1, Vec3::new(0.5, 0.0, 0.0), Vec3::Z)
        .unwrap();
    let mut sim = Simulation::new(
        SimulationSettings::default(),
        Box::new(FeatherstoneBackend::new()),
        None,
    );
    let id = sim.add_articulated_body(body).unwrap();
    sim.body_mut(id).unwrap().set_joint_ic(joint, 0.7, -0.25).unwrap();
    sim.step(0.0);

    let body = sim.body(id).unwrap();
    assert_relative_eq!(body.joint_position(joint), 0.7, epsilon = 1e-6);
    assert_relative_eq!(body.joint_velocity(joint), -0.25, epsilon = 1e-6);
    // The link moved with the joint: its centre swung about the pivot at x = 0.5.
    let center = body.link_transform(1).position;
    assert_relative_eq!(center.x, 0.5 + 0.7f32.cos() * 0.5, epsilon = 1e-4);
    assert_relative_eq!(center.y, 0.7f32.sin() * 0.5, epsilon = 1e-4);
}

#[test]
fn backend_state_survives_a_zero_length_integration() {
    let mut backend = FeatherstoneBackend::new();
    let base = BodyDescription {
        mass: 2.0,
        principal_inertia: Vec3::splat(0.1),
        pose: Transform::IDENTITY,
    };
    let tree = backend.register_tree(&base, false);
    let arm = BodyDescription {
        mass: 1.0,
        principal_inertia: Vec3::new(0.002, 0.08, 0.08),
        pose: Transform::from_translation(Vec3::X),
    };
    let joint = JointDescription {
        kind: JointKind::Prismatic,
        pivot: Vec3::new(-0.5, 0.0, 0.0),
        axis: Vec3::X,
    };
    let handle = backend.register_body(tree, &arm, 0, &joint).unwrap();
    backend.set_joint_state(handle, 0.2, 1.5);
    backend.step_integrate(0.0);
    assert_relative_eq!(backend.joint_position(handle), 0.2, epsilon = 1e-6);
    assert_relative_eq!(backend.joint_velocity(handle), 1.5, epsilon = 1e-6);
    assert_relative_eq!(backend.link_transform(handle).position.x, 1.2, epsilon = 1e-5);

    let stale = LinkHandle { tree: tree.0, link: 5 };
    assert_eq!(backend.joint_position(stale), 0.0);
}

#[test]
fn fixed_joint_welds_links_together() {
    let mut body = chain(2);
    body.add_fixed_joint("weld", 0, 1).unwrap();
    let mut sim = Simulation::new(
        SimulationSettings::default(),
        Box::new(FeatherstoneBackend::new()),
        None,
    );
    let id = sim.add_articulated_body(body).unwrap();
    sim.step(1.0);
    let body = sim.body(id).unwrap();
    assert!((body.link_transform(1).position - Vec3::X).length() < 1e-4);
    // The weld carries the link's weight.
    let weight = body.link(1).unwrap().solid.mass() * 9.81;
    assert_relative_eq!(body.joint_reaction(0).force.length(), weight, max_relative = 1e-3);
}
