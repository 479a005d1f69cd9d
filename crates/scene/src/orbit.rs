use foundation::math::{Mat4, Vec3};

const PITCH_LIMIT: f64 = std::f64::consts::FRAC_PI_2 - 1e-3;

/// Orbit/zoom/pan camera input, expressed in the camera's parent space.
///
/// The eye sits at `target + distance * (cos(pitch) sin(yaw), sin(pitch), cos(pitch) cos(yaw))`
/// and always looks at `target` with +Y up.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,
    yaw: f64,
    pitch: f64,
    distance: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    /// Radians per pointer pixel.
    pub rotate_speed: f64,
    /// Exponent per wheel delta unit.
    pub zoom_speed: f64,
    pub enable_zoom: bool,
    pub enable_pan: bool,
}

impl OrbitControls {
    /// Starts from an eye position looking at `target`.
    pub fn new(eye: Vec3, target: Vec3, min_distance: f64, max_distance: f64) -> Self {
        let offset = eye - target;
        let distance = offset.length();
        let (yaw, pitch) = if distance > 0.0 {
            (
                offset.x.atan2(offset.z),
                (offset.y / distance).clamp(-1.0, 1.0).asin(),
            )
        } else {
            (0.0, 0.0)
        };

        Self {
            target,
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            distance: distance.clamp(min_distance, max_distance),
            min_distance,
            max_distance,
            rotate_speed: 0.005,
            zoom_speed: 0.0015,
            enable_zoom: true,
            enable_pan: true,
        }
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn eye(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        self.target + Vec3::new(cp * sy, sp, cp * cy) * self.distance
    }

    /// Drag by pointer pixels. Dragging right spins the view left around the target.
    pub fn rotate(&mut self, dx_px: f64, dy_px: f64) {
        self.yaw -= dx_px * self.rotate_speed;
        self.pitch = (self.pitch + dy_px * self.rotate_speed).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Wheel zoom: positive deltas move away from the target.
    pub fn zoom(&mut self, wheel_delta: f64) {
        if !self.enable_zoom {
            return;
        }
        let scaled = self.distance * (wheel_delta * self.zoom_speed).exp();
        self.distance = scaled.clamp(self.min_distance, self.max_distance);
    }

    /// Screen-space pan: moves the target so the point under the pointer tracks it.
    pub fn pan(&mut self, dx_px: f64, dy_px: f64, viewport_height_px: f64, fov_y_deg: f64) {
        if !self.enable_pan || viewport_height_px <= 0.0 {
            return;
        }
        let view_height = 2.0 * self.distance * (0.5 * fov_y_deg.to_radians()).tan();
        let units_per_px = view_height / viewport_height_px;

        let forward = (self.target - self.eye()).normalize();
        let Some(forward) = forward else { return };
        let Some(right) = forward.cross(Vec3::Y).normalize() else {
            return;
        };
        let up = right.cross(forward);

        self.target = self.target + right * (-dx_px * units_per_px) + up * (dy_px * units_per_px);
    }

    /// Camera-to-parent matrix (the inverse of the view matrix).
    pub fn local_matrix(&self) -> Mat4 {
        let eye = self.eye();
        Mat4::look_at_rh(eye, self.target, Vec3::Y)
            .and_then(|view| view.inverse())
            .unwrap_or_else(|| Mat4::translation(eye))
    }
}

#[cfg(test)]
mod tests {
    use super::OrbitControls;
    use foundation::math::Vec3;

    fn assert_vec_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-9, "expected {a:?} ~= {b:?}");
    }

    fn rig() -> OrbitControls {
        OrbitControls::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -320.0), 160.0, 640.0)
    }

    #[test]
    fn starts_at_the_given_eye() {
        let controls = rig();
        assert_eq!(controls.distance(), 320.0);
        assert_vec_close(controls.eye(), Vec3::ZERO);
    }

    #[test]
    fn zoom_is_clamped_to_distance_range() {
        let mut controls = rig();
        controls.zoom(-10_000.0);
        assert_eq!(controls.distance(), 160.0);
        controls.zoom(10_000.0);
        assert_eq!(controls.distance(), 640.0);
    }

    #[test]
    fn rotation_keeps_distance_and_clamps_pitch() {
        let mut controls = rig();
        controls.rotate(250.0, 10_000.0);
        assert!(((controls.eye() - controls.target).length() - 320.0).abs() < 1e-9);
        assert!(controls.pitch() < std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn local_matrix_places_camera_at_eye_facing_target() {
        let controls = rig();
        let m = controls.local_matrix();
        assert_vec_close(m.translation_part(), controls.eye());
        // Camera looks down its local -Z.
        let forward = m.transform_vector(Vec3::new(0.0, 0.0, -1.0));
        assert_vec_close(forward, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn pan_moves_target_sideways() {
        let mut controls = rig();
        controls.pan(100.0, 0.0, 800.0, 45.0);
        assert!(controls.target.x < 0.0);
        assert!((controls.target.z + 320.0).abs() < 1e-9);

        controls.enable_pan = false;
        let before = controls.target;
        controls.pan(100.0, 0.0, 800.0, 45.0);
        assert_eq!(controls.target, before);
    }
}
