use approx::assert_relative_eq;
use glam::{Mat3, Quat, Vec3};
use hydrobody::core::mesh::TriangleMesh;
use hydrobody::{Material, PartKind, RigidSolid, Transform};

fn sorted(moments: Vec3) -> [f32; 3] {
    let mut values = moments.to_array();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

fn assert_close(mesh: &RigidSolid, exact: &RigidSolid, tolerance: f32) {
    assert_relative_eq!(mesh.mass(), exact.mass(), max_relative = tolerance);
    assert!(mesh.mass_properties.center_of_mass.length() < 1e-3);
    for (a, b) in sorted(mesh.mass_properties.principal_inertia)
        .into_iter()
        .zip(sorted(exact.mass_properties.principal_inertia))
    {
        assert_relative_eq!(a, b, max_relative = tolerance);
    }
}

#[test]
fn tessellated_sphere_matches_analytic_sphere() {
    let material = Material::aluminium();
    let mesh = RigidSolid::mesh("mesh", TriangleMesh::uv_sphere(0.3, 64, 32), material.clone()).unwrap();
    let exact = RigidSolid::sphere("exact", 0.3, material).unwrap();
    assert_close(&mesh, &exact, 0.02);
}

#[test]
fn tessellated_cylinder_matches_analytic_cylinder() {
    let material = Material::steel();
    let mesh = RigidSolid::mesh("mesh", TriangleMesh::cylinder(0.2, 0.6, 96), material.clone()).unwrap();
    let exact = RigidSolid::cylinder("exact", 0.2, 0.6, material).unwrap();
    assert_close(&mesh, &exact, 0.02);
    assert_relative_eq!(mesh.volume, exact.volume, max_relative = 0.02);
}

#[test]
fn symmetric_compound_has_centered_mass() {
    let block = RigidSolid::cuboid("block", Vec3::new(0.2, 0.1, 0.1), Material::aluminium()).unwrap();
    let offset = 0.75;
    let mut pair = RigidSolid::compound(
        "pair",
        block.clone(),
        Transform::from_translation(Vec3::X * offset),
        PartKind::External,
    )
    .unwrap();
    pair.add_part(block.clone(), Transform::from_translation(-Vec3::X * offset), PartKind::External)
        .unwrap();

    assert_relative_eq!(pair.mass(), 2.0 * block.mass(), max_relative = 1e-5);
    assert!(pair.mass_properties.center_of_mass.length() < 1e-5);

    // The trace is invariant under the principal rotation.
    let block_trace = block.mass_properties.principal_inertia.element_sum();
    let expected = 2.0 * block_trace + 2.0 * block.mass() * 2.0 * offset * offset;
    assert_relative_eq!(
        pair.mass_properties.principal_inertia.element_sum(),
        expected,
        max_relative = 1e-4
    );
    assert_relative_eq!(pair.volume, 2.0 * block.volume, max_relative = 1e-5);
}

#[test]
fn principal_axes_follow_a_rotated_symmetry_axis() {
    let block = RigidSolid::cuboid("block", Vec3::new(0.2, 0.1, 0.05), Material::aluminium()).unwrap();
    let rotation = Quat::from_rotation_z(0.6);
    let axis = rotation * Vec3::X;
    let offset = 0.75;
    let mut pair = RigidSolid::compound(
        "pair",
        block.clone(),
        Transform::new(axis * offset, rotation),
        PartKind::External,
    )
    .unwrap();
    pair.add_part(block.clone(), Transform::new(-axis * offset, rotation), PartKind::External)
        .unwrap();

    let com = pair.mass_properties.center_of_mass;
    assert!(com.dot(axis).abs() < 1e-5);
    assert!(com.length() < 1e-5);

    let frame = Mat3::from_quat(pair.cg_origin.rotation);
    let alignment = [frame.x_axis, frame.y_axis, frame.z_axis]
        .into_iter()
        .map(|column| column.dot(axis).abs())
        .fold(0.0_f32, f32::max);
    assert_relative_eq!(alignment, 1.0, epsilon = 1e-4);

    // About the line through both blocks only their own inertia remains.
    let smallest = sorted(pair.mass_properties.principal_inertia)[0];
    let block_smallest = sorted(block.mass_properties.principal_inertia)[0];
    assert_relative_eq!(smallest, 2.0 * block_smallest, max_relative = 1e-3);
}

#[test]
fn mass_properties_are_reproducible() {
    let build = || {
        RigidSolid::mesh(
            "hull",
            TriangleMesh::cylinder(0.4, 1.5, 48).transformed(&Transform::from_translation(Vec3::new(0.3, -0.2, 0.1))),
            Material::new("composite", 1600.0, 0.2),
        )
        .unwrap()
    };
    let first = build();
    let second = build();
    assert_eq!(first.mass_properties, second.mass_properties);
    assert_eq!(first.cg_origin, second.cg_origin);
    assert_eq!(first.proxy, second.proxy);
    assert_relative_eq!(first.mass_properties.center_of_mass.x, 0.3, epsilon = 1e-4);
}

#[test]
fn shell_is_lighter_but_displaces_the_same_volume() {
    let solid = RigidSolid::mesh("solid", TriangleMesh::cuboid(Vec3::splat(0.5)), Material::steel()).unwrap();
    let shell = RigidSolid::shell("shell", TriangleMesh::cuboid(Vec3::splat(0.5)), 0.01, Material::steel()).unwrap();
    assert!(shell.mass() < 0.1 * solid.mass());
    assert_relative_eq!(shell.volume, solid.volume, max_relative = 1e-5);
}
