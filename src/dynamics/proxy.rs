//! Coarse sphere/cylinder/ellipsoid stand-ins fitted to a solid.
//!
//! A proxy only scales drag and added mass and shapes the submerged fraction of a body
//! crossing the free surface. It never takes part in collision, and the buoyant volume
//! always comes from the real geometry.

use std::f64::consts::PI as PI64;
use std::f32::consts::PI;

use glam::{DVec3, Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::{CYLINDER_AXIAL_DRAG_RATIO, PROXY_ISOTROPY_TOLERANCE};
use crate::core::mesh::Aabb;
use crate::core::types::Transform;

/// Axial slices used to locate the submerged centroid of a tilted cylinder.
const CYLINDER_CENTROID_SLICES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProxyKind {
    #[default]
    None,
    Sphere,
    Cylinder,
    Ellipsoid,
}

/// Fitted proxy. The proxy frame has its longitudinal axis along +Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HydrodynamicProxy {
    pub kind: ProxyKind,
    /// Semi-axes along the proxy frame axes. Cylinders store `(r, r, half_length)`.
    pub radii: Vec3,
    /// Proxy frame expressed in the body's centre-of-mass frame.
    pub origin: Transform,
}

impl Default for HydrodynamicProxy {
    fn default() -> Self {
        Self::NONE
    }
}

/// Portion of a proxy lying below a plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Submersion {
    /// Submerged share of the proxy volume, in `[0, 1]`.
    pub fraction: f32,
    /// Centroid of the submerged part relative to the proxy centre, in the proxy frame.
    pub centroid: Vec3,
}

impl Submersion {
    const DRY: Submersion = Submersion {
        fraction: 0.0,
        centroid: Vec3::ZERO,
    };
    const FULL: Submersion = Submersion {
        fraction: 1.0,
        centroid: Vec3::ZERO,
    };
}

impl HydrodynamicProxy {
    pub const NONE: HydrodynamicProxy = HydrodynamicProxy {
        kind: ProxyKind::None,
        radii: Vec3::ZERO,
        origin: Transform::IDENTITY,
    };

    /// Fits a proxy to points given in the body's centre-of-mass frame.
    ///
    /// Without a request the shape follows the half extents: all alike gives a sphere,
    /// two alike a cylinder along the odd axis, otherwise an ellipsoid along the longest.
    pub fn fit(points: &[Vec3], request: Option<ProxyKind>) -> Self {
        let bounds = Aabb::from_points(points);
        let half = bounds.half_extents();
        let largest = half.max_element();
        if bounds.is_empty() || !largest.is_finite() || largest <= f32::EPSILON {
            return Self::NONE;
        }
        let half = half.max(Vec3::splat(largest * 1e-3));

        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| half[a].total_cmp(&half[b]));
        let [small, mid, large] = order.map(|i| half[i]);
        let alike = |a: f32, b: f32| (b - a) <= PROXY_ISOTROPY_TOLERANCE * b;

        let kind = request.unwrap_or(if alike(small, large) {
            ProxyKind::Sphere
        } else if alike(small, mid) || alike(mid, large) {
            ProxyKind::Cylinder
        } else {
            ProxyKind::Ellipsoid
        });

        let longitudinal = match kind {
            ProxyKind::Cylinder if (mid - small) >= (large - mid) => order[0],
            _ => order[2],
        };
        let rotation = longitudinal_rotation(longitudinal);
        let permuted = rotation.inverse() * half;
        let permuted = permuted.abs();

        let radii = match kind {
            ProxyKind::None => return Self::NONE,
            ProxyKind::Sphere => Vec3::splat((half.x + half.y + half.z) / 3.0),
            ProxyKind::Cylinder => {
                let radius = 0.5 * (permuted.x + permuted.y);
                Vec3::new(radius, radius, permuted.z)
            }
            ProxyKind::Ellipsoid => permuted,
        };

        Self {
            kind,
            radii,
            origin: Transform::new(bounds.center(), rotation),
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind == ProxyKind::None
    }

    pub fn volume(&self) -> f32 {
        let r = self.radii;
        match self.kind {
            ProxyKind::None => 0.0,
            ProxyKind::Sphere | ProxyKind::Ellipsoid => 4.0 / 3.0 * PI * r.x * r.y * r.z,
            ProxyKind::Cylinder => PI * r.x * r.x * 2.0 * r.z,
        }
    }

    /// Directional drag scaling along the proxy axes; the largest entry is 1.
    pub fn drag_coefficients(&self) -> Vec3 {
        match self.kind {
            ProxyKind::None => Vec3::ZERO,
            ProxyKind::Sphere => Vec3::ONE,
            ProxyKind::Cylinder => Vec3::new(1.0, 1.0, CYLINDER_AXIAL_DRAG_RATIO),
            ProxyKind::Ellipsoid => Vec3::splat(self.radii.min_element()) / self.radii,
        }
    }

    /// Frontal area seen by a flow along each proxy axis.
    pub fn projected_areas(&self) -> Vec3 {
        let r = self.radii;
        match self.kind {
            ProxyKind::None => Vec3::ZERO,
            ProxyKind::Sphere | ProxyKind::Ellipsoid => {
                Vec3::new(PI * r.y * r.z, PI * r.x * r.z, PI * r.x * r.y)
            }
            ProxyKind::Cylinder => {
                let side = 4.0 * r.x * r.z;
                Vec3::new(side, side, PI * r.x * r.x)
            }
        }
    }

    pub fn wetted_area(&self) -> f32 {
        let r = self.radii;
        match self.kind {
            ProxyKind::None => 0.0,
            ProxyKind::Sphere => 4.0 * PI * r.x * r.x,
            ProxyKind::Cylinder => 2.0 * PI * r.x * (2.0 * r.z) + 2.0 * PI * r.x * r.x,
            ProxyKind::Ellipsoid => {
                // Knud Thomsen's approximation.
                let p = 1.6075f32;
                let (a, b, c) = (r.x.powf(p), r.y.powf(p), r.z.powf(p));
                4.0 * PI * ((a * b + a * c + b * c) / 3.0).powf(1.0 / p)
            }
        }
    }

    /// Added mass along each proxy axis as a multiple of the displaced fluid mass.
    pub fn added_mass_coefficients(&self) -> Vec3 {
        let r = self.radii;
        match self.kind {
            ProxyKind::None => Vec3::ZERO,
            ProxyKind::Sphere => Vec3::splat(0.5),
            ProxyKind::Cylinder => Vec3::new(1.0, 1.0, (r.x / (3.0 * r.z)).min(1.0)),
            ProxyKind::Ellipsoid => Vec3::new(
                (r.y * r.z).sqrt() / (2.0 * r.x),
                (r.x * r.z).sqrt() / (2.0 * r.y),
                (r.x * r.y).sqrt() / (2.0 * r.z),
            ),
        }
    }

    /// Mean distance of the surface from each proxy axis, used for rotational drag.
    pub fn lever_arms(&self) -> Vec3 {
        let r = self.radii;
        match self.kind {
            ProxyKind::None => Vec3::ZERO,
            ProxyKind::Cylinder => Vec3::new(0.5 * (r.x + r.z), 0.5 * (r.x + r.z), r.x),
            _ => Vec3::new(0.5 * (r.y + r.z), 0.5 * (r.x + r.z), 0.5 * (r.x + r.y)),
        }
    }

    /// Half-width of the proxy along the unit `direction`, given in the proxy frame.
    pub fn support(&self, direction: Vec3) -> f32 {
        let r = self.radii;
        match self.kind {
            ProxyKind::None => 0.0,
            ProxyKind::Sphere | ProxyKind::Ellipsoid => (r * direction).length(),
            ProxyKind::Cylinder => {
                r.z * direction.z.abs()
                    + r.x * (direction.x * direction.x + direction.y * direction.y).sqrt()
            }
        }
    }

    /// Part of the proxy below the plane `{x : up·x ≤ offset}`; `up` is a unit vector in
    /// the proxy frame and `offset` is measured from the proxy centre.
    pub fn submersion(&self, up: Vec3, offset: f32) -> Submersion {
        let extent = self.support(up);
        if self.is_none() || extent <= 0.0 {
            return Submersion::DRY;
        }
        if offset >= extent {
            return Submersion::FULL;
        }
        if offset <= -extent {
            return Submersion::DRY;
        }
        match self.kind {
            ProxyKind::None => Submersion::DRY,
            ProxyKind::Sphere | ProxyKind::Ellipsoid => self.ellipsoid_submersion(up, offset),
            ProxyKind::Cylinder => self.cylinder_submersion(up, offset),
        }
    }

    /// Spherical cap mapped through the ellipsoid's axis scaling.
    fn ellipsoid_submersion(&self, up: Vec3, offset: f32) -> Submersion {
        let scaled = (self.radii * up).as_dvec3();
        let norm = scaled.length();
        let normal = scaled / norm;
        let height = (1.0 + offset as f64 / norm).clamp(0.0, 2.0);
        let fraction = height * height * (3.0 - height) / 4.0;
        if fraction <= 0.0 {
            return Submersion::DRY;
        }
        let depth = 3.0 * (2.0 - height).powi(2) / (4.0 * (3.0 - height));
        let centroid = self.radii.as_dvec3() * (-normal * depth);
        Submersion {
            fraction: fraction as f32,
            centroid: centroid.as_vec3(),
        }
    }

    /// Closed-form volume of a cylinder under a tilted plane; the centroid is integrated
    /// over axial slices.
    fn cylinder_submersion(&self, up: Vec3, offset: f32) -> Submersion {
        let radius = self.radii.x as f64;
        let half_length = self.radii.z as f64;
        let full = PI64 * radius * radius * 2.0 * half_length;
        let up = up.as_dvec3();
        let offset = offset as f64;
        let axial = up.z;
        let lateral = (up.x * up.x + up.y * up.y).sqrt();

        if lateral < 1e-9 {
            // Plane perpendicular to the axis.
            let limit = offset / axial;
            let length = if axial > 0.0 {
                limit + half_length
            } else {
                half_length - limit
            }
            .clamp(0.0, 2.0 * half_length);
            let center = -axial.signum() * (half_length - 0.5 * length);
            return Submersion {
                fraction: (length / (2.0 * half_length)) as f32,
                centroid: Vec3::new(0.0, 0.0, center as f32),
            };
        }

        let across = DVec3::new(up.x / lateral, up.y / lateral, 0.0);
        let chord = |s: f64| (offset - axial * s) / lateral;
        let (low, high) = (chord(-half_length), chord(half_length));

        let volume = if (high - low).abs() < 1e-9 * radius {
            2.0 * half_length * segment_area(radius, low)
        } else {
            (segment_integral(radius, high) - segment_integral(radius, low))
                / (-axial / lateral)
        };
        let fraction = (volume / full).clamp(0.0, 1.0);
        if fraction <= 0.0 {
            return Submersion::DRY;
        }

        let slice = 2.0 * half_length / CYLINDER_CENTROID_SLICES as f64;
        let mut weight = 0.0;
        let mut moment = DVec3::ZERO;
        for i in 0..CYLINDER_CENTROID_SLICES {
            let s = -half_length + (i as f64 + 0.5) * slice;
            let tau = chord(s);
            let area = segment_area(radius, tau);
            if area <= 0.0 {
                continue;
            }
            let first = -(2.0 / 3.0) * (radius * radius - tau.clamp(-radius, radius).powi(2)).powf(1.5);
            weight += area;
            moment += DVec3::new(0.0, 0.0, s) * area + across * first;
        }
        let centroid = if weight > 0.0 { moment / weight } else { DVec3::ZERO };

        Submersion {
            fraction: fraction as f32,
            centroid: centroid.as_vec3(),
        }
    }
}

/// Rotation taking proxy +Z onto the body axis `index`, cycling the other two.
fn longitudinal_rotation(index: usize) -> Quat {
    match index {
        0 => Quat::from_mat3(&Mat3::from_cols(Vec3::Y, Vec3::Z, Vec3::X)),
        1 => Quat::from_mat3(&Mat3::from_cols(Vec3::Z, Vec3::X, Vec3::Y)),
        _ => Quat::IDENTITY,
    }
}

/// Area of the part of a disk of `radius` with `y ≤ chord`.
fn segment_area(radius: f64, chord: f64) -> f64 {
    if chord <= -radius {
        return 0.0;
    }
    if chord >= radius {
        return PI64 * radius * radius;
    }
    radius * radius * (-chord / radius).acos() + chord * (radius * radius - chord * chord).sqrt()
}

/// Antiderivative of [`segment_area`] with respect to the chord position.
fn segment_integral(radius: f64, chord: f64) -> f64 {
    let r2 = radius * radius;
    if chord <= -radius {
        return 0.0;
    }
    if chord >= radius {
        return PI64 * r2 * radius + PI64 * r2 * (chord - radius);
    }
    let rest = r2 - chord * chord;
    r2 * chord * (-chord / radius).acos() + r2 * rest.sqrt() - rest.powf(1.5) / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn box_points(half: Vec3) -> Vec<Vec3> {
        Aabb::from_half_extents(Vec3::ZERO, half).corners().to_vec()
    }

    #[test]
    fn fit_picks_shape_from_extents() {
        let sphere = HydrodynamicProxy::fit(&box_points(Vec3::new(1.0, 1.05, 0.98)), None);
        assert_eq!(sphere.kind, ProxyKind::Sphere);

        let rod = HydrodynamicProxy::fit(&box_points(Vec3::new(0.2, 2.0, 0.2)), None);
        assert_eq!(rod.kind, ProxyKind::Cylinder);
        assert_relative_eq!(rod.radii.z, 2.0);
        // Proxy +Z lies along body Y.
        assert_relative_eq!((rod.origin.rotation * Vec3::Z).y, 1.0, epsilon = 1e-6);

        let disc = HydrodynamicProxy::fit(&box_points(Vec3::new(1.0, 0.1, 1.0)), None);
        assert_eq!(disc.kind, ProxyKind::Cylinder);
        assert_relative_eq!((disc.origin.rotation * Vec3::Z).y.abs(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(disc.radii.x, 1.0);

        let hull = HydrodynamicProxy::fit(&box_points(Vec3::new(3.0, 0.5, 1.0)), None);
        assert_eq!(hull.kind, ProxyKind::Ellipsoid);
        assert_relative_eq!((hull.origin.rotation * Vec3::Z).x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(hull.radii.z, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn ellipsoid_coefficients_are_normalised() {
        let hull = HydrodynamicProxy::fit(&box_points(Vec3::new(3.0, 0.5, 1.0)), None);
        let k = hull.drag_coefficients();
        assert_relative_eq!(k.max_element(), 1.0);
        // The long axis gets the smallest coefficient.
        assert_relative_eq!(k.z, 0.5 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn sphere_half_submerged_matches_hemisphere() {
        let proxy = HydrodynamicProxy {
            kind: ProxyKind::Sphere,
            radii: Vec3::splat(2.0),
            origin: Transform::IDENTITY,
        };
        let half = proxy.submersion(Vec3::Y, 0.0);
        assert_relative_eq!(half.fraction, 0.5, epsilon = 1e-6);
        assert_relative_eq!(half.centroid.y, -0.75, epsilon = 1e-5);
        assert_eq!(proxy.submersion(Vec3::Y, 2.0).fraction, 1.0);
        assert_eq!(proxy.submersion(Vec3::Y, -2.0).fraction, 0.0);
    }

    #[test]
    fn tilted_cylinder_volume_is_continuous_and_symmetric() {
        let proxy = HydrodynamicProxy {
            kind: ProxyKind::Cylinder,
            radii: Vec3::new(0.5, 0.5, 2.0),
            origin: Transform::IDENTITY,
        };
        let up = Vec3::new(0.6, 0.0, 0.8);
        let extent = proxy.support(up);
        assert_relative_eq!(proxy.submersion(up, 0.0).fraction, 0.5, epsilon = 1e-5);

        let mut previous = 0.0;
        for i in 0..=200 {
            let offset = -extent + 2.0 * extent * i as f32 / 200.0;
            let f = proxy.submersion(up, offset).fraction;
            assert!(f + 1e-6 >= previous, "fraction must grow with the plane");
            assert!(f - previous < 0.05, "no jumps");
            previous = f;
        }
        assert_relative_eq!(previous, 1.0, epsilon = 1e-6);
        let near_top = proxy.submersion(up, extent * 0.9999).fraction;
        assert!(near_top > 0.999);
    }

    #[test]
    fn horizontal_cylinder_uses_segment_area() {
        let proxy = HydrodynamicProxy {
            kind: ProxyKind::Cylinder,
            radii: Vec3::new(1.0, 1.0, 3.0),
            origin: Transform::IDENTITY,
        };
        let s = proxy.submersion(Vec3::Y, 0.0);
        assert_relative_eq!(s.fraction, 0.5, epsilon = 1e-6);
        assert_relative_eq!(s.centroid.y, -4.0 / (3.0 * PI), epsilon = 1e-4);
    }

    #[test]
    fn upright_cylinder_fills_linearly() {
        let proxy = HydrodynamicProxy {
            kind: ProxyKind::Cylinder,
            radii: Vec3::new(1.0, 1.0, 2.0),
            origin: Transform::IDENTITY,
        };
        let s = proxy.submersion(Vec3::Z, 1.0);
        assert_relative_eq!(s.fraction, 0.75, epsilon = 1e-6);
        assert_relative_eq!(s.centroid.z, -0.5, epsilon = 1e-6);
    }
}
