//! Drops a steel box and a foam box into calm water and prints their depth.

use hydrobody::{HydroEngine, Material, Ocean, RigidSolid, Transform, Vec3};
use log::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut engine = HydroEngine::new(1.0 / 240.0);
    engine.set_fluid(Ocean::new(0.0));

    let half = Vec3::new(0.3, 0.2, 0.25);
    let steel = engine.add_solid(
        RigidSolid::cuboid("steel", half, Material::steel())?,
        Transform::from_translation(Vec3::new(-1.0, 1.0, 0.0)),
    )?;
    let foam = engine.add_solid(
        RigidSolid::cuboid("foam", half, Material::foam())?,
        Transform::from_translation(Vec3::new(1.0, 1.0, 0.0)),
    )?;

    for frame in 0..=40 {
        if frame > 0 {
            engine.step(0.25);
        }
        let (Some(a), Some(b)) = (engine.body(steel), engine.body(foam)) else {
            break;
        };
        info!(
            "t = {:5.2} s  steel y = {:7.3} ({:?})  foam y = {:6.3} ({:?}, {:.0}% wet)",
            engine.simulation().time(),
            a.link_transform(0).position.y,
            a.hydrodynamic_state(0).regime,
            b.link_transform(0).position.y,
            b.hydrodynamic_state(0).regime,
            b.hydrodynamic_state(0).submerged_fraction * 100.0
        );
    }
    Ok(())
}
