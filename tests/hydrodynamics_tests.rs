use approx::assert_relative_eq;
use glam::{Quat, Vec3};
use hydrobody::dynamics::hydrodynamics::BodyMotion;
use hydrobody::{
    FeatherstoneBackend, FluidVolume, HydrodynamicForceModel, HydrodynamicSettings, Material, Ocean,
    Regime, RigidSolid, Simulation, SimulationSettings, Transform, Velocity,
};

const G: Vec3 = Vec3::new(0.0, -9.81, 0.0);

fn buoyancy_sweep(solid: &RigidSolid, rotation: Quat) -> Vec<(f32, f32, Regime)> {
    let model = HydrodynamicForceModel::new(HydrodynamicSettings::buoyancy_only());
    let ocean = Ocean::new(0.0);
    (0..=200)
        .map(|i| {
            let height = 1.0 - i as f32 * 0.01;
            let pose = Transform::new(Vec3::Y * height, rotation);
            let state = model.evaluate(solid, &BodyMotion::at_rest(pose), &ocean, G);
            (height, state.buoyancy.force.y, state.regime)
        })
        .collect()
}

#[test]
fn buoyancy_is_continuous_across_the_surface() {
    let ball = RigidSolid::sphere("ball", 0.5, Material::foam()).unwrap();
    let full = 1025.0 * 9.81 * ball.volume;
    let sweep = buoyancy_sweep(&ball, Quat::IDENTITY);

    // Steepest slope is rho g A at the equator.
    let max_jump = 1025.0 * 9.81 * std::f32::consts::PI * 0.25 * 0.01 * 1.05;
    for pair in sweep.windows(2) {
        let jump = pair[1].1 - pair[0].1;
        assert!(jump >= -1e-3, "buoyancy decreased going down at {}", pair[1].0);
        assert!(jump <= max_jump, "jump of {jump} N at {}", pair[1].0);
    }
    assert_eq!(sweep.first().unwrap().1, 0.0);
    assert_eq!(sweep.first().unwrap().2, Regime::OutsideFluid);
    let (_, deepest, regime) = *sweep.last().unwrap();
    assert_eq!(regime, Regime::FullySubmerged);
    assert_relative_eq!(deepest, full, max_relative = 1e-4);

    let (_, half, _) = sweep[100];
    assert_relative_eq!(half, 0.5 * full, max_relative = 1e-3);
}

#[test]
fn tilted_cylinder_crosses_without_steps() {
    let drum = RigidSolid::cylinder("drum", 0.2, 0.4, Material::aluminium()).unwrap();
    let sweep = buoyancy_sweep(&drum, Quat::from_rotation_z(0.6));
    let full = 1025.0 * 9.81 * drum.volume;
    for pair in sweep.windows(2) {
        assert!((pair[1].1 - pair[0].1).abs() < 0.05 * full, "step at {}", pair[1].0);
    }
    assert_relative_eq!(sweep.last().unwrap().1, full, max_relative = 1e-3);
}

#[test]
fn neutrally_buoyant_sphere_keeps_its_velocity() {
    let settings = SimulationSettings::default().with_hydrodynamics(HydrodynamicSettings::buoyancy_only());
    let mut sim = Simulation::new(
        settings,
        Box::new(FeatherstoneBackend::new()),
        Some(Box::new(Ocean::new(0.0))),
    );
    let ball = RigidSolid::sphere("ball", 0.2, Material::neutral()).unwrap();
    let id = sim.add_solid(ball, Transform::from_translation(Vec3::new(0.0, -5.0, 0.0))).unwrap();
    sim.body_mut(id)
        .unwrap()
        .set_base_velocity(Velocity::new(Vec3::new(0.3, 0.0, 0.0), Vec3::ZERO));

    sim.step(2.0);
    let body = sim.body(id).unwrap();
    let velocity = body.link_velocity(0);
    assert_relative_eq!(velocity.linear.x, 0.3, epsilon = 1e-3);
    assert!(velocity.linear.y.abs() < 1e-3);
    assert!(velocity.angular.length() < 1e-3);
    let position = body.link_transform(0).position;
    assert_relative_eq!(position.x, 0.6, epsilon = 5e-3);
    assert_relative_eq!(position.y, -5.0, epsilon = 1e-3);
    assert_eq!(body.hydrodynamic_state(0).regime, Regime::FullySubmerged);
}

#[test]
fn drag_opposes_motion_through_still_water() {
    let model = HydrodynamicForceModel::new(HydrodynamicSettings::default());
    let ocean = Ocean::new(0.0);
    let ball = RigidSolid::sphere("ball", 0.3, Material::steel()).unwrap();
    let motion = BodyMotion {
        pose: Transform::from_translation(Vec3::Y * -2.0),
        velocity: Velocity::new(Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO),
        ..BodyMotion::default()
    };
    let state = model.evaluate(&ball, &motion, &ocean, G);
    assert!(state.pressure_drag.force.x < 0.0);
    assert!(state.skin_drag.force.x <= 0.0);
    assert!(state.pressure_drag.force.y.abs() < 1e-3);

    // Moving with the fluid there is nothing to resist.
    let drifting = Ocean::new(0.0).with_current(hydrobody::Current::Uniform(Vec3::new(2.0, 0.0, 0.0)));
    let state = model.evaluate(&ball, &motion, &drifting, G);
    assert!(state.pressure_drag.force.length() < 1e-3);
    assert_eq!(drifting.density(), 1025.0);
}

#[test]
fn dry_solids_feel_nothing() {
    let model = HydrodynamicForceModel::new(HydrodynamicSettings::default());
    let ball = RigidSolid::sphere("ball", 0.3, Material::steel()).unwrap();
    let motion = BodyMotion {
        pose: Transform::from_translation(Vec3::Y * 3.0),
        velocity: Velocity::new(Vec3::new(5.0, -1.0, 0.0), Vec3::Z),
        acceleration: Velocity::new(G, Vec3::ZERO),
    };
    let state = model.evaluate(&ball, &motion, &Ocean::new(0.0), G);
    assert_eq!(state.regime, Regime::OutsideFluid);
    assert_eq!(state.total().force, Vec3::ZERO);
    assert_eq!(state.submerged_fraction, 0.0);
}
