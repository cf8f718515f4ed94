//! Fly camera for ray generation.

use lumen_core::CameraSetup;
use lumen_math::{Ray, Vec3};

/// Anything that can turn a screen position into a world-space ray.
///
/// `u` runs left to right and `v` top to bottom, both in [0, 1].
pub trait RayGenerator: Send + Sync {
    fn ray_through_screen_at(&self, u: f32, v: f32, aspect_ratio: f32) -> Ray;
}

/// Horizontal movement directions for [`Camera::move_camera`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
}

/// Pinhole camera driven by yaw/pitch angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Rotation around +Y in radians, 0 looks down -Z
    pub yaw: f32,
    /// Elevation in radians
    pub pitch: f32,
    /// Vertical field of view in degrees
    pub vfov: f32,
    /// Radians per unit of mouse motion
    pub sensitivity: f32,
    last_mouse: Option<(f64, f64)>,
}

impl Camera {
    /// Keeps the basis well defined.
    const PITCH_LIMIT: f32 = 89.0 * std::f32::consts::PI / 180.0;

    pub fn new(position: Vec3, yaw: f32, pitch: f32, vfov: f32) -> Self {
        Self {
            position,
            yaw,
            pitch: pitch.clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT),
            vfov,
            sensitivity: 0.003,
            last_mouse: None,
        }
    }

    pub fn with_sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn forward(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(sin_yaw * cos_pitch, sin_pitch, -cos_yaw * cos_pitch)
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward())
    }

    /// Move `speed` world units along the view direction or sideways.
    pub fn move_camera(&mut self, direction: MoveDirection, speed: f32) {
        let offset = match direction {
            MoveDirection::Forward => self.forward(),
            MoveDirection::Backward => -self.forward(),
            MoveDirection::Left => -self.right(),
            MoveDirection::Right => self.right(),
        };
        self.position += offset * speed;
    }

    /// Turn by the cursor delta since the previous call.
    ///
    /// The first call only records the cursor position. Returns true when
    /// the orientation changed.
    pub fn rotate_camera(&mut self, mouse_x: f64, mouse_y: f64) -> bool {
        let Some((last_x, last_y)) = self.last_mouse.replace((mouse_x, mouse_y)) else {
            return false;
        };

        let dx = (mouse_x - last_x) as f32;
        let dy = (mouse_y - last_y) as f32;
        if dx == 0.0 && dy == 0.0 {
            return false;
        }

        self.yaw += dx * self.sensitivity;
        // Screen y grows downwards
        self.pitch = (self.pitch - dy * self.sensitivity).clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
        true
    }
}

impl Default for Camera {
    fn default() -> Self {
        CameraSetup::default().into()
    }
}

impl From<CameraSetup> for Camera {
    fn from(setup: CameraSetup) -> Self {
        Camera::new(setup.position, setup.yaw, setup.pitch, setup.vfov)
    }
}

impl RayGenerator for Camera {
    fn ray_through_screen_at(&self, u: f32, v: f32, aspect_ratio: f32) -> Ray {
        let half_height = (self.vfov.to_radians() / 2.0).tan();
        let half_width = half_height * aspect_ratio;

        let x = (2.0 * u - 1.0) * half_width;
        let y = (1.0 - 2.0 * v) * half_height;

        let direction = self.forward() + self.right() * x + self.up() * y;
        Ray::new(self.position, direction.normalize())
    }
}
