use glam::{Mat3, Quat, Vec3};

use crate::core::types::Transform;

/// A 6D spatial vector combining angular and linear components.
/// In motion space, angular is velocity and linear is translation.
/// In force space, angular is torque and linear is force.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpatialVec {
    pub ang: Vec3,
    pub lin: Vec3,
}

impl SpatialVec {
    pub const ZERO: SpatialVec = SpatialVec {
        ang: Vec3::ZERO,
        lin: Vec3::ZERO,
    };

    pub fn new(ang: Vec3, lin: Vec3) -> Self {
        Self { ang, lin }
    }

    pub fn dot(&self, other: &SpatialVec) -> f32 {
        self.ang.dot(other.ang) + self.lin.dot(other.lin)
    }

    /// Spatial motion cross product: v1 x_m v2
    pub fn cross_motion(&self, other: &SpatialVec) -> SpatialVec {
        SpatialVec {
            ang: self.ang.cross(other.ang),
            lin: self.ang.cross(other.lin) + self.lin.cross(other.ang),
        }
    }

    /// Spatial force cross product: v x_f f
    pub fn cross_force(&self, other: &SpatialVec) -> SpatialVec {
        SpatialVec {
            ang: self.ang.cross(other.ang) + self.lin.cross(other.lin),
            lin: self.ang.cross(other.lin),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.ang.is_finite() && self.lin.is_finite()
    }
}

impl std::ops::Add for SpatialVec {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            ang: self.ang + other.ang,
            lin: self.lin + other.lin,
        }
    }
}

impl std::ops::AddAssign for SpatialVec {
    fn add_assign(&mut self, other: Self) {
        self.ang += other.ang;
        self.lin += other.lin;
    }
}

impl std::ops::Sub for SpatialVec {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            ang: self.ang - other.ang,
            lin: self.lin - other.lin,
        }
    }
}

impl std::ops::Neg for SpatialVec {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            ang: -self.ang,
            lin: -self.lin,
        }
    }
}

impl std::ops::Mul<f32> for SpatialVec {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self {
            ang: self.ang * rhs,
            lin: self.lin * rhs,
        }
    }
}

/// A 6x6 spatial matrix represented as 4 3x3 blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpatialMat {
    pub m00: Mat3,
    pub m01: Mat3,
    pub m10: Mat3,
    pub m11: Mat3,
}

impl SpatialMat {
    pub fn new(m00: Mat3, m01: Mat3, m10: Mat3, m11: Mat3) -> Self {
        Self { m00, m01, m10, m11 }
    }

    pub fn mul_vec(&self, v: SpatialVec) -> SpatialVec {
        SpatialVec {
            ang: self.m00 * v.ang + self.m01 * v.lin,
            lin: self.m10 * v.ang + self.m11 * v.lin,
        }
    }

    /// Computes the outer product (v * v.T) as a 6x6 matrix.
    pub fn outer_product(v: SpatialVec) -> Self {
        Self {
            m00: outer_vec3(v.ang, v.ang),
            m01: outer_vec3(v.ang, v.lin),
            m10: outer_vec3(v.lin, v.ang),
            m11: outer_vec3(v.lin, v.lin),
        }
    }

    pub fn transpose(&self) -> Self {
        Self {
            m00: self.m00.transpose(),
            m01: self.m10.transpose(),
            m10: self.m01.transpose(),
            m11: self.m11.transpose(),
        }
    }

    /// Solves `self * x = rhs` by Gaussian elimination with partial pivoting.
    /// Returns `None` for a singular matrix.
    pub fn solve(&self, rhs: SpatialVec) -> Option<SpatialVec> {
        let mut a = [[0.0f32; 7]; 6];
        for r in 0..3 {
            for c in 0..3 {
                a[r][c] = self.m00.col(c)[r];
                a[r][c + 3] = self.m01.col(c)[r];
                a[r + 3][c] = self.m10.col(c)[r];
                a[r + 3][c + 3] = self.m11.col(c)[r];
            }
            a[r][6] = rhs.ang[r];
            a[r + 3][6] = rhs.lin[r];
        }

        let scale = a
            .iter()
            .flat_map(|row| row[..6].iter())
            .fold(0.0f32, |m, v| m.max(v.abs()));
        if !(scale > 0.0) || !scale.is_finite() {
            return None;
        }

        for col in 0..6 {
            let pivot = (col..6).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
            if a[pivot][col].abs() <= scale * 1e-9 {
                return None;
            }
            a.swap(col, pivot);
            for row in col + 1..6 {
                let factor = a[row][col] / a[col][col];
                for k in col..7 {
                    a[row][k] -= factor * a[col][k];
                }
            }
        }

        let mut x = [0.0f32; 6];
        for row in (0..6).rev() {
            let tail: f32 = (row + 1..6).map(|k| a[row][k] * x[k]).sum();
            x[row] = (a[row][6] - tail) / a[row][row];
        }
        let solution = SpatialVec::new(Vec3::new(x[0], x[1], x[2]), Vec3::new(x[3], x[4], x[5]));
        solution.is_finite().then_some(solution)
    }
}

fn outer_vec3(a: Vec3, b: Vec3) -> Mat3 {
    Mat3::from_cols(a * b.x, a * b.y, a * b.z)
}

impl std::ops::Add for SpatialMat {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            m00: self.m00 + other.m00,
            m01: self.m01 + other.m01,
            m10: self.m10 + other.m10,
            m11: self.m11 + other.m11,
        }
    }
}

impl std::ops::Sub for SpatialMat {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            m00: self.m00 - other.m00,
            m01: self.m01 - other.m01,
            m10: self.m10 - other.m10,
            m11: self.m11 - other.m11,
        }
    }
}

impl std::ops::Mul for SpatialMat {
    type Output = Self;
    fn mul(self, o: Self) -> Self {
        Self {
            m00: self.m00 * o.m00 + self.m01 * o.m10,
            m01: self.m00 * o.m01 + self.m01 * o.m11,
            m10: self.m10 * o.m00 + self.m11 * o.m10,
            m11: self.m10 * o.m01 + self.m11 * o.m11,
        }
    }
}

impl std::ops::Mul<f32> for SpatialMat {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self {
            m00: self.m00 * rhs,
            m01: self.m01 * rhs,
            m10: self.m10 * rhs,
            m11: self.m11 * rhs,
        }
    }
}

/// Helper to transform a motion vector between frames.
pub fn transform_motion(v: SpatialVec, rotation: Quat, translation: Vec3) -> SpatialVec {
    let ang = rotation * v.ang;
    let lin = rotation * (v.lin - translation.cross(v.ang));
    SpatialVec { ang, lin }
}

/// Helper to transform a force vector between frames.
pub fn transform_force(f: SpatialVec, rotation: Quat, translation: Vec3) -> SpatialVec {
    let lin = rotation * f.lin;
    let ang = rotation * (f.ang - translation.cross(f.lin));
    SpatialVec { ang, lin }
}

/// Plücker transform from a parent frame to a child frame.
///
/// `rotation` takes parent coordinates to child coordinates and `translation` is the
/// child origin expressed in the parent frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plucker {
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Default for Plucker {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Plucker {
    pub const IDENTITY: Plucker = Plucker {
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
    };

    /// Transform into a frame whose pose relative to the parent is `pose`.
    pub fn from_pose(pose: &Transform) -> Self {
        Self {
            rotation: pose.rotation.inverse(),
            translation: pose.position,
        }
    }

    pub fn motion(&self, v: SpatialVec) -> SpatialVec {
        transform_motion(v, self.rotation, self.translation)
    }

    pub fn force(&self, f: SpatialVec) -> SpatialVec {
        transform_force(f, self.rotation, self.translation)
    }

    /// Child-to-parent force transform, `Xᵀ f`.
    pub fn force_to_parent(&self, f: SpatialVec) -> SpatialVec {
        let back = self.rotation.inverse();
        transform_force(f, back, -(self.rotation * self.translation))
    }

    /// Child-to-parent motion transform, `X⁻¹ v`.
    pub fn motion_to_parent(&self, v: SpatialVec) -> SpatialVec {
        let back = self.rotation.inverse();
        transform_motion(v, back, -(self.rotation * self.translation))
    }

    pub fn to_mat(&self) -> SpatialMat {
        let e = Mat3::from_quat(self.rotation);
        SpatialMat {
            m00: e,
            m01: Mat3::ZERO,
            m10: -(e * skew(self.translation)),
            m11: e,
        }
    }

    /// Articulated inertia moved from the child frame to the parent frame, `Xᵀ I X`.
    pub fn inertia_to_parent(&self, inertia: &SpatialMat) -> SpatialMat {
        let x = self.to_mat();
        x.transpose() * *inertia * x
    }
}

/// Cross-product matrix: `skew(a) * b == a.cross(b)`.
pub fn skew(v: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, v.z, -v.y),
        Vec3::new(-v.z, 0.0, v.x),
        Vec3::new(v.y, -v.x, 0.0),
    )
}

/// A spatial inertia tensor representing mass, center of mass, and rotational inertia.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialInertia {
    pub mass: f32,
    pub com: Vec3,
    pub inertia: Mat3, // Rotational inertia at COM
}

impl SpatialInertia {
    pub fn new(mass: f32, com: Vec3, inertia: Mat3) -> Self {
        Self { mass, com, inertia }
    }

    /// Inertia of a body whose frame sits at its centre of mass along its principal axes.
    pub fn principal(mass: f32, moments: Vec3) -> Self {
        Self::new(mass, Vec3::ZERO, Mat3::from_diagonal(moments))
    }

    /// Converts this spatial inertia to its 6x6 matrix representation.
    pub fn to_mat(&self) -> SpatialMat {
        let m = self.mass;
        let c_skew = skew(self.com);
        let mc_skew = c_skew * m;

        // I_fixed = I_com - m * c_skew * c_skew
        let i_fixed = self.inertia - c_skew * c_skew * m;

        SpatialMat {
            m00: i_fixed,
            m01: mc_skew,
            m10: mc_skew.transpose(),
            m11: Mat3::IDENTITY * m,
        }
    }
}
