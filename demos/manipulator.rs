//! Two-joint underwater arm servoing through a list of targets.

use hydrobody::{ArticulatedBody, HydroEngine, Material, Ocean, RigidSolid, Transform, Vec3};
use log::info;

fn segment(name: &str) -> Result<RigidSolid, hydrobody::AssemblyError> {
    RigidSolid::cuboid(name, Vec3::new(0.4, 0.06, 0.06), Material::aluminium())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut arm = ArticulatedBody::new(
        "arm",
        RigidSolid::cylinder("pedestal", 0.2, 0.1, Material::steel())?,
        Transform::IDENTITY,
        true,
    );
    let upper = arm.add_link("upper", segment("upper")?, Transform::from_translation(Vec3::new(0.4, 0.2, 0.0)))?;
    let fore = arm.add_link("fore", segment("fore")?, Transform::from_translation(Vec3::new(1.2, 0.2, 0.0)))?;
    let shoulder = arm.add_revolute_joint("shoulder", 0, upper, Vec3::new(0.0, 0.2, 0.0), Vec3::Z)?;
    let elbow = arm.add_revolute_joint("elbow", upper, fore, Vec3::new(0.8, 0.2, 0.0), Vec3::Z)?;
    for joint in [shoulder, elbow] {
        arm.add_joint_limit(joint, -2.0, 2.0)?;
        arm.add_joint_motor(joint, 60.0)?;
        arm.set_joint_damping(joint, 0.2, 0.5)?;
    }

    let mut engine = HydroEngine::new(1.0 / 240.0);
    engine.set_fluid(Ocean::new(10.0));
    let id = engine.add_articulated_body(arm)?;

    let targets = [(0.8, -1.2), (-0.5, 1.0), (0.0, 0.0)];
    for (shoulder_target, elbow_target) in targets {
        if let Some(arm) = engine.body_mut(id) {
            arm.set_motor_target(shoulder, Some(shoulder_target), None, 120.0, 15.0)?;
            arm.set_motor_target(elbow, Some(elbow_target), None, 80.0, 10.0)?;
        }
        engine.step(3.0);
        if let Some(arm) = engine.body(id) {
            info!(
                "target ({shoulder_target:5.2}, {elbow_target:5.2})  reached ({:5.2}, {:5.2})  efforts ({:6.2}, {:6.2}) N·m  shoulder load {:.1} N",
                arm.joint_position(shoulder),
                arm.joint_position(elbow),
                arm.joint_effort(shoulder),
                arm.joint_effort(elbow),
                arm.joint_reaction(shoulder).force.length()
            );
        }
    }
    Ok(())
}
