use super::Vec3;

/// Row-major 4x4 matrix used for the camera-to-world transform and the
/// absolute pitch/yaw rotation rebuild.
#[derive(Debug, Clone, Copy)]
pub struct Mat4 {
    value: [f64; 16],
}

impl Mat4 {
    pub fn identity() -> Mat4 {
        Mat4 {
            value: [
                1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    /// Assemble a transform whose columns are the given basis vectors and
    /// whose translation is `origin`: the `{right, up, forward, origin}`
    /// camera-to-world form.
    pub fn from_basis(right: Vec3, up: Vec3, forward: Vec3, origin: Vec3) -> Mat4 {
        Mat4 {
            value: [
                right.x, up.x, forward.x, origin.x, //
                right.y, up.y, forward.y, origin.y, //
                right.z, up.z, forward.z, origin.z, //
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    pub fn rotation_x(angle: f64) -> Mat4 {
        let cos_t = angle.cos();
        let sin_t = angle.sin();
        Mat4 {
            value: [
                1.0, 0.0, 0.0, 0.0, //
                0.0, cos_t, sin_t, 0.0, //
                0.0, -sin_t, cos_t, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    pub fn rotation_y(angle: f64) -> Mat4 {
        let cos_t = angle.cos();
        let sin_t = angle.sin();
        Mat4 {
            value: [
                cos_t, 0.0, sin_t, 0.0, //
                0.0, 1.0, 0.0, 0.0, //
                -sin_t, 0.0, cos_t, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    pub fn rotation_z(angle: f64) -> Mat4 {
        let cos_t = angle.cos();
        let sin_t = angle.sin();
        Mat4 {
            value: [
                cos_t, -sin_t, 0.0, 0.0, //
                sin_t, cos_t, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    /// Euler rotation `Ry(yaw) * Rx(pitch) * Rz(roll)`, applied to column
    /// vectors. With a positive pitch the rotated forward vector tilts up.
    pub fn rotation(pitch: f64, yaw: f64, roll: f64) -> Mat4 {
        Mat4::rotation_z(roll)
            .then(&Mat4::rotation_x(pitch))
            .then(&Mat4::rotation_y(yaw))
    }

    /// Composition `other * self`: applying the result is applying `self`
    /// first, then `other`.
    pub fn then(&self, other: &Mat4) -> Mat4 {
        let mut value = [0.0; 16];
        for row in 0..4 {
            for col in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += other.value[row * 4 + k] * self.value[k * 4 + col];
                }
                value[row * 4 + col] = sum;
            }
        }
        Mat4 { value }
    }

    /// Transform a position: rotation plus translation.
    pub fn transform_point(&self, v: Vec3) -> Vec3 {
        let m = &self.value;
        Vec3::new(
            m[0] * v.x + m[1] * v.y + m[2] * v.z + m[3],
            m[4] * v.x + m[5] * v.y + m[6] * v.z + m[7],
            m[8] * v.x + m[9] * v.y + m[10] * v.z + m[11],
        )
    }

    /// Transform a direction: rotation only, the translation column is
    /// ignored.
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        let m = &self.value;
        Vec3::new(
            m[0] * v.x + m[1] * v.y + m[2] * v.z,
            m[4] * v.x + m[5] * v.y + m[6] * v.z,
            m[8] * v.x + m[9] * v.y + m[10] * v.z,
        )
    }
}
