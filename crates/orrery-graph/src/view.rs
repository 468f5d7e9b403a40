//! Viewer orientation and projection.
//!
//! The viewer sits at the origin of observer space; only its orientation and
//! lens matter to the graph. Looks down -Z with +Y up, like the GPU camera.

use glam::{DMat4, DQuat, DVec2, DVec3, Mat4};
use std::f64::consts::{FRAC_PI_2, PI};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewParams {
    pub orientation: DQuat,
    /// Vertical field of view (radians)
    pub fov_y: f64,
    /// Viewport size in pixels
    pub width: f64,
    pub height: f64,
    /// Near plane for the reverse-Z projection (meters)
    pub near: f32,
    /// Radians per pixel of pointer motion
    pub sensitivity: f64,

    // Euler angles for FPS-style control
    yaw: f64,
    pitch: f64,
}

impl ViewParams {
    pub fn new(width: f64, height: f64, fov_y_degrees: f64) -> Self {
        Self {
            orientation: DQuat::IDENTITY,
            fov_y: fov_y_degrees.to_radians(),
            width: width.max(1.0),
            height: height.max(1.0),
            near: 1.0,
            sensitivity: 0.003,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    pub fn forward(&self) -> DVec3 {
        self.orientation * DVec3::NEG_Z
    }

    pub fn right(&self) -> DVec3 {
        self.orientation * DVec3::X
    }

    pub fn up(&self) -> DVec3 {
        self.orientation * DVec3::Y
    }

    /// Update orientation from pointer delta
    pub fn rotate(&mut self, dx: f64, dy: f64) {
        self.yaw += dx * self.sensitivity;
        let limit = FRAC_PI_2 - 0.01;
        self.pitch = (self.pitch + dy * self.sensitivity).clamp(-limit, limit);
        self.orientation = DQuat::from_rotation_y(self.yaw) * DQuat::from_rotation_x(self.pitch);
    }

    /// Turn to face `direction` (observer space); zero vectors are ignored
    pub fn look_at(&mut self, direction: DVec3) {
        let Some(dir) = direction.try_normalize() else {
            return;
        };
        self.pitch = dir.y.clamp(-1.0, 1.0).asin();
        self.yaw = (-dir.x).atan2(-dir.z);
        self.orientation = DQuat::from_rotation_y(self.yaw) * DQuat::from_rotation_x(self.pitch);
    }

    /// Half angle of the cone enclosing the whole viewport (to its corners)
    pub fn half_fov(&self) -> f64 {
        let tan_y = (self.fov_y / 2.0).tan();
        let tan_x = tan_y * self.aspect();
        (tan_x * tan_x + tan_y * tan_y).sqrt().atan()
    }

    /// Whether a sphere seen under `half_angle` around `direction` can touch the view cone
    pub fn in_cone(&self, direction: DVec3, half_angle: f64) -> bool {
        let limit = self.half_fov() + half_angle;
        if limit >= PI {
            return true;
        }
        match direction.try_normalize() {
            Some(dir) => self.forward().dot(dir) >= limit.cos(),
            None => true,
        }
    }

    /// Pixel position of an observer-space point, `None` when behind the viewer
    pub fn project(&self, point: DVec3) -> Option<DVec2> {
        let cam = self.orientation.inverse() * point;
        if cam.z >= 0.0 {
            return None;
        }
        let f = 1.0 / (self.fov_y / 2.0).tan();
        let ndc_x = f / self.aspect() * cam.x / -cam.z;
        let ndc_y = f * cam.y / -cam.z;
        Some(DVec2::new(
            (ndc_x + 1.0) * 0.5 * self.width,
            (1.0 - ndc_y) * 0.5 * self.height,
        ))
    }

    /// Screen radius in pixels of an object seen under `half_angle`
    pub fn angular_to_pixels(&self, half_angle: f64) -> f64 {
        if half_angle >= FRAC_PI_2 {
            return self.width.max(self.height);
        }
        let f = 1.0 / (self.fov_y / 2.0).tan();
        half_angle.tan() * f * self.height * 0.5
    }

    /// Observer space to camera space
    pub fn view_rotation(&self) -> DMat4 {
        DMat4::from_quat(self.orientation.inverse())
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view_rotation().as_mat4()
    }

    /// Reverse-Z projection with an infinite far plane
    #[rustfmt::skip]
    pub fn projection_matrix(&self) -> Mat4 {
        let f = 1.0 / (self.fov_y as f32 / 2.0).tan();
        let aspect = self.aspect() as f32;
        Mat4::from_cols_array(&[
            f / aspect, 0.0, 0.0, 0.0,
            0.0, f, 0.0, 0.0,
            0.0, 0.0, 0.0, -1.0,
            0.0, 0.0, self.near, 0.0,
        ])
    }
}

impl Default for ViewParams {
    fn default() -> Self {
        Self::new(1920.0, 1080.0, 60.0)
    }
}
