//! A ballasted compound hull riding a wave train, streamed as JSON snapshots.

use std::thread;
use std::time::Duration;

use hydrobody::{
    Current, HydroEngine, Material, Ocean, PartKind, RigidSolid, Transform, Vec3, Wave,
};
use log::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let skin = RigidSolid::cuboid("skin", Vec3::new(2.0, 0.4, 0.6), Material::new("composite", 180.0, 0.2))?;
    let mut hull = RigidSolid::compound("hull", skin, Transform::IDENTITY, PartKind::External)?;
    let mut keel = RigidSolid::cuboid("keel", Vec3::new(1.0, 0.1, 0.1), Material::steel())?;
    keel.set_buoyant(false);
    hull.add_part(keel, Transform::from_translation(Vec3::new(0.0, -0.3, 0.0)), PartKind::Internal)?;
    info!(
        "hull mass {:.1} kg, displacement {:.3} m³, proxy {:?}",
        hull.mass(),
        hull.volume,
        hull.proxy.kind
    );

    let ocean = Ocean::new(0.0)
        .with_wave(Wave::new(0.25, 12.0, Vec3::X))
        .with_wave(Wave::new(0.1, 5.0, Vec3::new(1.0, 0.0, 1.0)))
        .with_current(Current::Uniform(Vec3::new(0.2, 0.0, 0.0)));

    let mut engine = HydroEngine::new(1.0 / 240.0);
    engine.set_fluid(ocean);
    engine.add_solid(hull, Transform::from_translation(Vec3::Y * 0.5))?;

    let reader = engine.simulation().snapshot_reader();
    let printer = thread::spawn(move || -> Result<(), serde_json::Error> {
        for _ in 0..10 {
            thread::sleep(Duration::from_millis(50));
            println!("{}", serde_json::to_string(&reader.latest())?);
        }
        Ok(())
    });

    for _ in 0..600 {
        engine.step(1.0 / 60.0);
    }
    printer.join().map_err(|_| "snapshot printer panicked")??;
    Ok(())
}
