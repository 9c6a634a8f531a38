/// Camera with drag-style controls
/// Mouse-drag look/dolly/pan and WASD movement
use anyhow::{ensure, Result};
use glam::{Mat4, Quat, Vec2, Vec3};

/// Pitch is kept just short of straight up/down so the derived
/// up vector never degenerates.
const MAX_PITCH: f32 = 89.99 * (std::f32::consts::PI / 180.0);

pub struct Camera {
    pub position: Vec3,
    /// Accumulated rotation around the camera-local X axis (radians).
    pub total_pitch: f32,
    /// Accumulated rotation around the world Y axis (radians).
    pub total_yaw: f32,

    /// Vertical field of view in radians.
    pub fov_angle: f32,
    /// Cached tan(fov/2); the projection is parameterized by this.
    fov_tan: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,

    // Orthonormal basis, re-derived from pitch/yaw every update
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,

    pub move_speed: f32,
    pub sprint_multiplier: f32,

    view: Mat4,
    inv_view: Mat4,
}

impl Camera {
    pub fn new(fov_degrees: f32, aspect_ratio: f32, position: Vec3) -> Result<Self> {
        ensure!(
            aspect_ratio.is_finite() && aspect_ratio > 0.0,
            "aspect ratio must be positive, got {}",
            aspect_ratio
        );
        ensure!(
            fov_degrees > 0.0 && fov_degrees < 180.0,
            "field of view must be in (0, 180) degrees, got {}",
            fov_degrees
        );

        let fov_angle = fov_degrees.to_radians();
        let mut camera = Self {
            position,
            total_pitch: 0.0,
            total_yaw: 0.0,
            fov_angle,
            fov_tan: (fov_angle / 2.0).tan(),
            aspect_ratio,
            near: 0.1,
            far: 100.0,
            forward: Vec3::Z,
            right: Vec3::X,
            up: Vec3::Y,
            move_speed: 10.0,
            sprint_multiplier: 3.0,
            view: Mat4::IDENTITY,
            inv_view: Mat4::IDENTITY,
        };
        camera.calculate_view_matrix();

        Ok(camera)
    }

    /// Advance position and orientation by one frame of input.
    ///
    /// Movement integrates along the basis derived on the previous update;
    /// the basis is then recomputed from the new pitch/yaw so it stays
    /// orthonormal regardless of accumulated error.
    pub fn update(&mut self, dt: f32, input: &CameraInput) {
        let mut move_speed = self.move_speed * dt;
        if input.sprint {
            move_speed += self.sprint_multiplier * move_speed;
        }
        let rot_speed = (self.move_speed * 3.0).to_radians() * dt;

        if input.move_forward {
            self.position += self.forward * move_speed;
        }
        if input.move_backward {
            self.position -= self.forward * move_speed;
        }
        if input.move_left {
            self.position -= self.right * move_speed;
        }
        if input.move_right {
            self.position += self.right * move_speed;
        }
        if input.move_down {
            self.position -= self.up * move_speed;
        }
        if input.move_up {
            self.position += self.up * move_speed;
        }

        let Vec2 { x: dx, y: dy } = input.mouse_delta;
        match (input.left_button, input.right_button) {
            // Both buttons: vertical pan
            (true, true) => {
                self.position -= self.up * (move_speed / 3.0) * dy;
            }
            // Left only: dolly along the view direction + yaw
            (true, false) => {
                self.position -= self.forward * move_speed * dy;
                self.total_yaw += rot_speed * dx;
            }
            // Right only: look around
            (false, true) => {
                self.total_pitch = (self.total_pitch - rot_speed * dy).clamp(-MAX_PITCH, MAX_PITCH);
                self.total_yaw += rot_speed * dx;
            }
            (false, false) => {}
        }

        self.calculate_view_matrix();
    }

    /// Rebuild forward from pitch/yaw, re-orthonormalize the basis and
    /// refresh the cached view matrices. Pitch rotates first (camera-local
    /// X), then yaw (world Y).
    fn calculate_view_matrix(&mut self) {
        self.forward = Quat::from_rotation_y(self.total_yaw)
            * Quat::from_rotation_x(self.total_pitch)
            * Vec3::Z;
        self.right = Vec3::Y.cross(self.forward).normalize();
        self.up = self.forward.cross(self.right);

        self.inv_view = Mat4::from_cols(
            self.right.extend(0.0),
            self.up.extend(0.0),
            self.forward.extend(0.0),
            self.position.extend(1.0),
        );
        self.view = self.inv_view.inverse();
    }

    /// World-to-camera matrix (cached, refreshed by `update`).
    #[inline]
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// Camera-to-world matrix built directly from the orthonormal basis.
    #[inline]
    pub fn inverse_view_matrix(&self) -> Mat4 {
        self.inv_view
    }

    /// Left-handed perspective projection mapping depth to [0, 1].
    pub fn projection_matrix(&self) -> Mat4 {
        let t = self.fov_tan;
        let depth_scale = self.far / (self.far - self.near);

        Mat4::from_cols(
            glam::Vec4::new(1.0 / (self.aspect_ratio * t), 0.0, 0.0, 0.0),
            glam::Vec4::new(0.0, 1.0 / t, 0.0, 0.0),
            glam::Vec4::new(0.0, 0.0, depth_scale, 1.0),
            glam::Vec4::new(0.0, 0.0, -depth_scale * self.near, 0.0),
        )
    }

    /// Combined view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view
    }

    /// Update aspect ratio (call when the surface resizes).
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            self.aspect_ratio = aspect_ratio;
        }
    }

    pub fn set_fov_degrees(&mut self, fov_degrees: f32) {
        if fov_degrees > 0.0 && fov_degrees < 180.0 {
            self.fov_angle = fov_degrees.to_radians();
            self.fov_tan = (self.fov_angle / 2.0).tan();
        }
    }
}

/// One frame of camera input, assembled by the window loop.
#[derive(Copy, Clone, Debug, Default)]
pub struct CameraInput {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub move_up: bool,
    pub move_down: bool,
    pub sprint: bool,
    pub left_button: bool,
    pub right_button: bool,
    /// Relative mouse motion since the previous frame, in pixels.
    pub mouse_delta: Vec2,
}

/// Accumulates window events into per-frame camera input.
#[derive(Default)]
pub struct CameraController {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub move_up: bool,
    pub move_down: bool,
    pub sprint: bool,
    pub left_button: bool,
    pub right_button: bool,
    mouse_delta: Vec2,
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a mouse motion event into the pending delta.
    pub fn accumulate_mouse(&mut self, dx: f32, dy: f32) {
        self.mouse_delta += Vec2::new(dx, dy);
    }

    /// Snapshot the input for this frame and reset the mouse delta.
    /// Key and button states persist until their release events arrive.
    pub fn take_input(&mut self) -> CameraInput {
        let input = CameraInput {
            move_forward: self.move_forward,
            move_backward: self.move_backward,
            move_left: self.move_left,
            move_right: self.move_right,
            move_up: self.move_up,
            move_down: self.move_down,
            sprint: self.sprint,
            left_button: self.left_button,
            right_button: self.right_button,
            mouse_delta: self.mouse_delta,
        };
        self.mouse_delta = Vec2::ZERO;

        input
    }
}
