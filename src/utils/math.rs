//! Small math helpers layered on top of `glam`.

use glam::{Quat, Vec3};

/// Rotates `rotation` by a body-frame angular velocity held for `dt` seconds.
pub fn integrate_rotation(rotation: Quat, angular: Vec3, dt: f32) -> Quat {
    let angle = angular.length() * dt;
    if angle.abs() < 1e-9 {
        return rotation;
    }
    (rotation * Quat::from_axis_angle(angular / angular.length(), angle)).normalize()
}

/// Whether `dt` can advance a simulation: finite and not negative.
pub fn is_valid_step(dt: f32) -> bool {
    dt.is_finite() && dt >= 0.0
}
