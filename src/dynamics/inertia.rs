//! Mass, centre of mass, and principal inertia of meshes, analytic shapes, and compounds.
//!
//! Integrals are accumulated in double precision and converted back to `f32` once the
//! tensor has been diagonalized. Every function here is pure: evaluating the same input
//! twice produces bit-identical output.

use std::f64::consts::PI;

use glam::{DMat3, DVec3, Quat};
use log::warn;

use crate::config::INERTIA_OFF_DIAGONAL_EPSILON;
use crate::core::mesh::TriangleMesh;
use crate::core::types::{MassProperties, Transform};

/// Full inertia tensor about the centre of mass, in the geometry frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InertiaTensor {
    pub mass: f64,
    pub center_of_mass: DVec3,
    pub tensor: DMat3,
}

impl InertiaTensor {
    pub const ZERO: InertiaTensor = InertiaTensor {
        mass: 0.0,
        center_of_mass: DVec3::ZERO,
        tensor: DMat3::ZERO,
    };

    /// Diagonalizes the tensor into principal-frame mass properties.
    pub fn to_mass_properties(&self) -> MassProperties {
        let principal = diagonalize(self.tensor);
        MassProperties {
            mass: self.mass as f32,
            center_of_mass: self.center_of_mass.as_vec3(),
            principal_inertia: principal.moments.as_vec3(),
            principal_axes: principal.rotation(),
        }
    }
}

/// Eigen-decomposition of a symmetric inertia tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrincipalInertia {
    pub moments: DVec3,
    /// Columns are the principal axes, matching `moments` component by component.
    pub axes: DMat3,
}

impl PrincipalInertia {
    pub fn rotation(&self) -> Quat {
        let rotation = Quat::from_mat3(&self.axes.as_mat3()).normalize();
        if rotation.is_finite() {
            rotation
        } else {
            Quat::IDENTITY
        }
    }
}

/// Enclosed volume and its centroid, from signed tetrahedra spanned by each face and the origin.
pub fn mesh_volume_and_centroid(mesh: &TriangleMesh) -> (f64, DVec3) {
    let mut volume = 0.0;
    let mut weighted = DVec3::ZERO;
    for [a, b, c] in mesh.triangles() {
        let (a, b, c) = (a.as_dvec3(), b.as_dvec3(), c.as_dvec3());
        let v = a.dot(b.cross(c)) / 6.0;
        volume += v;
        weighted += v * (a + b + c) / 4.0;
    }
    if volume <= 0.0 {
        warn!("mesh encloses non-positive volume ({volume}); centroid set to origin");
        return (volume, DVec3::ZERO);
    }
    (volume, weighted / volume)
}

fn subexpressions(w0: f64, w1: f64, w2: f64) -> (f64, f64, f64, f64, f64, f64) {
    let temp0 = w0 + w1;
    let f1 = temp0 + w2;
    let temp1 = w0 * w0;
    let temp2 = temp1 + w1 * temp0;
    let f2 = temp2 + w2 * f1;
    let f3 = w0 * temp1 + w1 * temp2 + w2 * f2;
    let g0 = f2 + w0 * (f1 + w0);
    let g1 = f2 + w1 * (f1 + w1);
    let g2 = f2 + w2 * (f1 + w2);
    (f1, f2, f3, g0, g1, g2)
}

/// Inertia of a uniformly filled closed mesh.
///
/// Products of inertia come from the closed-form polyhedral moment integrals
/// (divergence theorem over each face).
pub fn solid_mesh_inertia(mesh: &TriangleMesh, density: f64) -> InertiaTensor {
    let (volume, centroid) = mesh_volume_and_centroid(mesh);
    if volume <= 0.0 {
        return InertiaTensor::ZERO;
    }

    // x², y², z², xy, yz, zx
    let mut moments = [0.0f64; 6];
    for [p0, p1, p2] in mesh.triangles() {
        let (p0, p1, p2) = (p0.as_dvec3(), p1.as_dvec3(), p2.as_dvec3());
        let d = (p1 - p0).cross(p2 - p0);
        let (_, _, f3x, g0x, g1x, g2x) = subexpressions(p0.x, p1.x, p2.x);
        let (_, _, f3y, g0y, g1y, g2y) = subexpressions(p0.y, p1.y, p2.y);
        let (_, _, f3z, g0z, g1z, g2z) = subexpressions(p0.z, p1.z, p2.z);

        moments[0] += d.x * f3x;
        moments[1] += d.y * f3y;
        moments[2] += d.z * f3z;
        moments[3] += d.x * (p0.y * g0x + p1.y * g1x + p2.y * g2x);
        moments[4] += d.y * (p0.z * g0y + p1.z * g1y + p2.z * g2y);
        moments[5] += d.z * (p0.x * g0z + p1.x * g1z + p2.x * g2z);
    }
    let [pxx, pyy, pzz] = [moments[0], moments[1], moments[2]].map(|m| density * m / 60.0);
    let [pxy, pyz, pxz] = [moments[3], moments[4], moments[5]].map(|m| density * m / 120.0);

    let about_origin = DMat3::from_cols(
        DVec3::new(pyy + pzz, -pxy, -pxz),
        DVec3::new(-pxy, pxx + pzz, -pyz),
        DVec3::new(-pxz, -pyz, pxx + pyy),
    );
    let mass = density * volume;
    InertiaTensor {
        mass,
        center_of_mass: centroid,
        tensor: about_origin - parallel_axis(mass, centroid),
    }
}

/// Inertia of a hollow mesh whose walls have the given thickness.
pub fn shell_mesh_inertia(mesh: &TriangleMesh, thickness: f64, density: f64) -> InertiaTensor {
    let mut area = 0.0;
    let mut weighted = DVec3::ZERO;
    let mut second_moment = DMat3::ZERO;
    for [a, b, c] in mesh.triangles() {
        let (a, b, c) = (a.as_dvec3(), b.as_dvec3(), c.as_dvec3());
        let tri_area = 0.5 * (b - a).cross(c - a).length();
        let sum = a + b + c;
        area += tri_area;
        weighted += tri_area * sum / 3.0;
        second_moment += (outer(a, a) + outer(b, b) + outer(c, c) + outer(sum, sum))
            * (tri_area / 12.0);
    }

    let mass = area * thickness * density;
    if mass <= 0.0 {
        warn!("shell mesh has non-positive mass ({mass}); centre of mass set to origin");
        return InertiaTensor::ZERO;
    }
    let center_of_mass = weighted / area;
    let second_moment = second_moment * (thickness * density);
    let trace = second_moment.x_axis.x + second_moment.y_axis.y + second_moment.z_axis.z;
    let about_origin = DMat3::from_diagonal(DVec3::splat(trace)) - second_moment;
    InertiaTensor {
        mass,
        center_of_mass,
        tensor: about_origin - parallel_axis(mass, center_of_mass),
    }
}

pub fn sphere_inertia(radius: f64, density: f64) -> InertiaTensor {
    let mass = density * 4.0 / 3.0 * PI * radius.powi(3);
    centered(mass, DVec3::splat(0.4 * mass * radius * radius))
}

pub fn box_inertia(half_extents: DVec3, density: f64) -> InertiaTensor {
    let h = half_extents;
    let mass = density * 8.0 * h.x * h.y * h.z;
    let k = mass / 3.0;
    centered(
        mass,
        DVec3::new(
            k * (h.y * h.y + h.z * h.z),
            k * (h.x * h.x + h.z * h.z),
            k * (h.x * h.x + h.y * h.y),
        ),
    )
}

/// Solid cylinder with its axis along Y.
pub fn cylinder_inertia(radius: f64, half_height: f64, density: f64) -> InertiaTensor {
    let mass = density * PI * radius * radius * 2.0 * half_height;
    let radial = mass * (3.0 * radius * radius + 4.0 * half_height * half_height) / 12.0;
    centered(mass, DVec3::new(radial, 0.5 * mass * radius * radius, radial))
}

/// Solid torus with its symmetry axis along Y.
pub fn torus_inertia(major_radius: f64, minor_radius: f64, density: f64) -> InertiaTensor {
    let (big, small) = (major_radius, minor_radius);
    let mass = density * 2.0 * PI * PI * big * small * small;
    let axial = mass * (big * big + 0.75 * small * small);
    let radial = mass * (0.5 * big * big + 0.625 * small * small);
    centered(mass, DVec3::new(radial, axial, radial))
}

/// Accumulates children, each given by its principal mass properties and the transform of
/// its geometry frame in the common frame, into one tensor about the aggregate centre of mass.
pub fn combine<'a, I>(children: I) -> InertiaTensor
where
    I: IntoIterator<Item = (&'a MassProperties, &'a Transform)>,
{
    let placed: Vec<(f64, DVec3, DMat3)> = children
        .into_iter()
        .map(|(props, origin)| {
            let rotation =
                glam::Mat3::from_quat((origin.rotation * props.principal_axes).normalize())
                    .as_dmat3();
            let tensor = rotation
                * DMat3::from_diagonal(props.principal_inertia.as_dvec3())
                * rotation.transpose();
            let com = origin.transform_point(props.center_of_mass).as_dvec3();
            (props.mass as f64, com, tensor)
        })
        .collect();

    let mass: f64 = placed.iter().map(|(m, _, _)| m).sum();
    if mass <= 0.0 {
        warn!("compound has non-positive total mass ({mass}); centre of mass set to origin");
        return InertiaTensor::ZERO;
    }
    let center_of_mass = placed.iter().map(|(m, c, _)| *c * *m).sum::<DVec3>() / mass;
    let tensor = placed
        .iter()
        .fold(DMat3::ZERO, |acc, (m, c, t)| {
            acc + *t + parallel_axis(*m, *c - center_of_mass)
        });

    InertiaTensor {
        mass,
        center_of_mass,
        tensor,
    }
}

/// Principal moments and axes of a symmetric 3×3 tensor.
///
/// Eigenvalues come from the trigonometric solution of the characteristic cubic
/// `λ³ − Tλ² + I₂λ − det = 0`; two axes are null-space vectors of `(I − λI₃)` and the
/// third is their cross product. Moments are returned in ascending order unless the
/// tensor was already diagonal, in which case it is returned as is.
pub fn diagonalize(tensor: DMat3) -> PrincipalInertia {
    let (xx, yy, zz) = (tensor.x_axis.x, tensor.y_axis.y, tensor.z_axis.z);
    let (xy, xz, yz) = (tensor.y_axis.x, tensor.z_axis.x, tensor.z_axis.y);
    let scale = xx.abs().max(yy.abs()).max(zz.abs()).max(f64::MIN_POSITIVE);
    let off_diagonal = xy * xy + xz * xz + yz * yz;

    if off_diagonal.sqrt() <= INERTIA_OFF_DIAGONAL_EPSILON * scale || !off_diagonal.is_finite() {
        return PrincipalInertia {
            moments: DVec3::new(xx, yy, zz),
            axes: DMat3::IDENTITY,
        };
    }

    let trace = xx + yy + zz;
    let second = xx * yy + yy * zz + zz * xx - off_diagonal;
    let det = tensor.determinant();

    // Depressed cubic x³ + p·x + q = 0 with λ = x + T/3.
    let p = second - trace * trace / 3.0;
    let q = -2.0 * trace.powi(3) / 27.0 + trace * second / 3.0 - det;
    let mean = trace / 3.0;
    if p >= -f64::EPSILON * scale * scale {
        return PrincipalInertia {
            moments: DVec3::splat(mean),
            axes: DMat3::IDENTITY,
        };
    }

    let amplitude = 2.0 * (-p / 3.0).sqrt();
    let argument = ((3.0 * q / (2.0 * p)) * (-3.0 / p).sqrt()).clamp(-1.0, 1.0);
    let phi = argument.acos() / 3.0;
    let mut eigen = [0, 1, 2].map(|k| mean + amplitude * (phi - 2.0 * PI * k as f64 / 3.0).cos());
    eigen.sort_by(|a, b| a.total_cmp(b));

    let tolerance = 1e-7 * scale;
    let low_gap = eigen[1] - eigen[0];
    let high_gap = eigen[2] - eigen[1];

    let axes = if low_gap >= high_gap {
        let v0 = null_vector(tensor, eigen[0]).unwrap_or(DVec3::X);
        let v1 = if high_gap > tolerance {
            null_vector(tensor, eigen[1])
                .and_then(|v| (v - v0 * v0.dot(v)).try_normalize())
                .unwrap_or_else(|| v0.any_orthonormal_vector())
        } else {
            v0.any_orthonormal_vector()
        };
        DMat3::from_cols(v0, v1, v0.cross(v1))
    } else {
        let v2 = null_vector(tensor, eigen[2]).unwrap_or(DVec3::Z);
        let v0 = if low_gap > tolerance {
            null_vector(tensor, eigen[0])
                .and_then(|v| (v - v2 * v2.dot(v)).try_normalize())
                .unwrap_or_else(|| v2.any_orthonormal_vector())
        } else {
            v2.any_orthonormal_vector()
        };
        DMat3::from_cols(v0, v2.cross(v0), v2)
    };

    PrincipalInertia {
        moments: DVec3::from_array(eigen),
        axes,
    }
}

/// Unit vector spanning the null space of `tensor − λI₃`, from the largest row cross product.
fn null_vector(tensor: DMat3, lambda: f64) -> Option<DVec3> {
    // Symmetric, so the columns double as rows.
    let shifted = tensor - DMat3::from_diagonal(DVec3::splat(lambda));
    let (r0, r1, r2) = (shifted.x_axis, shifted.y_axis, shifted.z_axis);
    [r0.cross(r1), r0.cross(r2), r1.cross(r2)]
        .into_iter()
        .max_by(|a, b| a.length_squared().total_cmp(&b.length_squared()))
        .and_then(|v| v.try_normalize())
}

/// `m (|d|² I − d dᵀ)`: the tensor term added when moving an axis by `d`.
fn parallel_axis(mass: f64, offset: DVec3) -> DMat3 {
    (DMat3::from_diagonal(DVec3::splat(offset.length_squared())) - outer(offset, offset)) * mass
}

fn outer(a: DVec3, b: DVec3) -> DMat3 {
    DMat3::from_cols(a * b.x, a * b.y, a * b.z)
}

fn centered(mass: f64, moments: DVec3) -> InertiaTensor {
    InertiaTensor {
        mass,
        center_of_mass: DVec3::ZERO,
        tensor: DMat3::from_diagonal(moments),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec3;

    #[test]
    fn box_mesh_matches_closed_form() {
        let half = Vec3::new(0.5, 1.0, 1.5);
        let mesh = TriangleMesh::cuboid(half);
        let numeric = solid_mesh_inertia(&mesh, 2.0);
        let exact = box_inertia(half.as_dvec3(), 2.0);
        assert_relative_eq!(numeric.mass, exact.mass, max_relative = 1e-9);
        assert!(numeric.center_of_mass.length() < 1e-9);
        for i in 0..3 {
            assert_relative_eq!(
                numeric.tensor.col(i)[i],
                exact.tensor.col(i)[i],
                max_relative = 1e-9
            );
        }
        assert!(numeric.tensor.y_axis.x.abs() < 1e-9);
    }

    #[test]
    fn diagonalize_recovers_rotated_box() {
        let rotation = Quat::from_euler(glam::EulerRot::XYZ, 0.3, -0.7, 1.1);
        let mesh = TriangleMesh::cuboid(Vec3::new(0.2, 0.5, 1.0))
            .transformed(&Transform::from_rotation(rotation));
        let tensor = solid_mesh_inertia(&mesh, 1.0);
        let principal = diagonalize(tensor.tensor);

        let exact = box_inertia(DVec3::new(0.2, 0.5, 1.0), 1.0);
        let mut expected = [exact.tensor.x_axis.x, exact.tensor.y_axis.y, exact.tensor.z_axis.z];
        expected.sort_by(|a, b| a.total_cmp(b));
        for i in 0..3 {
            assert_relative_eq!(principal.moments[i], expected[i], max_relative = 1e-5);
        }

        // Axes are orthonormal, right-handed, and reproduce the tensor.
        assert_relative_eq!(principal.axes.determinant(), 1.0, epsilon = 1e-9);
        let rebuilt = principal.axes
            * DMat3::from_diagonal(principal.moments)
            * principal.axes.transpose();
        for c in 0..3 {
            for r in 0..3 {
                assert_relative_eq!(
                    rebuilt.col(c)[r],
                    tensor.tensor.col(c)[r],
                    epsilon = 1e-6
                );
            }
        }
    }

    #[test]
    fn diagonalize_handles_repeated_moments() {
        // Axially symmetric tensor tilted about X.
        let r = DMat3::from_rotation_x(0.4);
        let tensor = r * DMat3::from_diagonal(DVec3::new(2.0, 2.0, 5.0)) * r.transpose();
        let principal = diagonalize(tensor);
        assert_relative_eq!(principal.moments.x, 2.0, epsilon = 1e-6);
        assert_relative_eq!(principal.moments.y, 2.0, epsilon = 1e-6);
        assert_relative_eq!(principal.moments.z, 5.0, epsilon = 1e-6);
        assert_relative_eq!(principal.axes.z_axis.dot(r.z_axis).abs(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn diagonal_tensor_keeps_identity_axes() {
        let principal = diagonalize(DMat3::from_diagonal(DVec3::new(3.0, 1.0, 2.0)));
        assert_eq!(principal.axes, DMat3::IDENTITY);
        assert_eq!(principal.moments, DVec3::new(3.0, 1.0, 2.0));
    }

    #[test]
    fn inside_out_mesh_reports_zero() {
        let mesh = TriangleMesh::builder(
            TriangleMesh::cuboid(Vec3::ONE).vertices,
            TriangleMesh::cuboid(Vec3::ONE).indices,
        )
        .flip_winding()
        .build();
        let result = solid_mesh_inertia(&mesh, 1.0);
        assert_eq!(result, InertiaTensor::ZERO);
    }

    #[test]
    fn shell_of_thin_box_approaches_plate_formula() {
        let mesh = TriangleMesh::cuboid(Vec3::new(1.0, 1.0, 1.0));
        let shell = shell_mesh_inertia(&mesh, 0.01, 1000.0);
        // Six faces of 4 m², 1 cm thick.
        assert_relative_eq!(shell.mass, 240.0, max_relative = 1e-9);
        // Hollow cube: I = 10/9 · m · a² for half side a.
        assert_relative_eq!(shell.tensor.x_axis.x, 10.0 / 9.0 * 240.0, max_relative = 1e-9);
    }
}
