use super::input::InputState;
use super::math::{Mat4, Vec3};

const MOVE_SPEED: f64 = 10.0;
const ROT_SPEED: f64 = 15.0;

/// Below this squared length the world-up cross product is considered
/// collapsed (forward parallel to world up).
const DEGENERATE_EPSILON: f64 = 1e-12;

/// View position and orientation. The orientation basis is rebuilt from the
/// absolute accumulated pitch/yaw every update, never composed
/// incrementally, so repeated rotation input cannot drift.
#[derive(Debug, Clone)]
pub struct Camera {
    pub origin: Vec3,
    /// Vertical field of view in degrees, strictly positive.
    pub fov_angle: f64,
    pub forward: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    pub total_pitch: f64,
    pub total_yaw: f64,
    camera_to_world: Mat4,
}

impl Camera {
    pub fn new(origin: Vec3, fov_angle: f64) -> Self {
        debug_assert!(fov_angle > 0.0);
        let mut camera = Self {
            origin,
            fov_angle,
            forward: Vec3::z_axis(),
            up: Vec3::y_axis(),
            right: Vec3::x_axis(),
            total_pitch: 0.0,
            total_yaw: 0.0,
            camera_to_world: Mat4::identity(),
        };
        camera.calculate_camera_to_world();
        camera
    }

    /// Creates a camera at `origin` facing `target`. The look direction is
    /// decomposed into absolute pitch/yaw so later pointer input continues
    /// from the same angles.
    pub fn look_at(origin: Vec3, target: Vec3, fov_angle: f64) -> Self {
        let direction = (target - origin).normalize();
        let mut camera = Self::new(origin, fov_angle);
        camera.total_yaw = direction.x.atan2(direction.z);
        camera.total_pitch = direction.y.clamp(-1.0, 1.0).asin();
        camera.rebuild_forward();
        camera
    }

    /// Recompute the orthonormal basis from `forward` and assemble the
    /// `{right, up, forward, origin}` transform. This is the sole source of
    /// truth for camera orientation and runs once per frame, at the end of
    /// `update`.
    ///
    /// When `forward` is parallel to world up the cross product collapses to
    /// a zero vector; the world X axis is substituted before normalizing so
    /// the basis stays defined.
    pub fn calculate_camera_to_world(&mut self) -> Mat4 {
        let mut right = Vec3::y_axis().cross(self.forward);
        if right.squared_len() < DEGENERATE_EPSILON {
            right = Vec3::x_axis();
        }
        self.right = right.normalize();
        self.up = self.forward.cross(self.right).normalize();
        self.camera_to_world = Mat4::from_basis(self.right, self.up, self.forward, self.origin);
        self.camera_to_world
    }

    /// The transform cached by the last `calculate_camera_to_world` call.
    pub fn camera_to_world(&self) -> Mat4 {
        self.camera_to_world
    }

    /// Apply one frame of sampled input.
    ///
    /// Keyboard translation moves along the world Z/X axes regardless of
    /// facing direction; this axis-aligned movement is a deliberate
    /// simplification, kept as-is. Pointer drags accumulate into the
    /// absolute pitch/yaw (both buttons held maps to vertical translation
    /// instead of rotation).
    pub fn update(&mut self, input: &InputState, elapsed: f64) {
        let step = MOVE_SPEED * elapsed;
        if input.move_forward {
            self.origin.z += step;
        }
        if input.move_backward {
            self.origin.z -= step;
        }
        if input.move_left {
            self.origin.x -= step;
        }
        if input.move_right {
            self.origin.x += step;
        }

        if input.left_button && input.right_button {
            self.origin.y -= input.pointer_dy * step;
        } else if input.left_button {
            self.origin.z -= input.pointer_dy * step;
            self.total_yaw += input.pointer_dx * ROT_SPEED * elapsed;
        } else if input.right_button {
            self.total_yaw += input.pointer_dx * ROT_SPEED * elapsed;
            self.total_pitch -= input.pointer_dy * ROT_SPEED * elapsed;
        }

        self.rebuild_forward();
    }

    fn rebuild_forward(&mut self) {
        let rotation = Mat4::rotation(self.total_pitch, self.total_yaw, 0.0);
        self.forward = rotation.transform_vector(Vec3::z_axis()).normalize();
        self.calculate_camera_to_world();
    }
}
