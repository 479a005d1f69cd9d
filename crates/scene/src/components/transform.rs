use foundation::math::{Mat4, Vec3};

/// Local transform relative to the parent node: `T * Ry * S`.
///
/// Only Y rotation is carried; every spin in the globe scene is about the
/// polar axis. Free camera orientation lives in `OrbitControls` instead.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation_y: f64,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation_y: 0.0,
            scale: Vec3::ONE,
        }
    }

    pub fn translate(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    pub fn with_rotation_y(mut self, angle_rad: f64) -> Self {
        self.rotation_y = angle_rad;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::translation(self.position) * Mat4::rotation_y(self.rotation_y) * Mat4::scale(self.scale)
    }
}
