use foundation::math::Mat4;

/// Perspective camera with a lazily refreshed projection.
///
/// Changing any parameter marks the projection dirty; the render loop calls
/// [`PerspectiveCamera::update_projection_if_needed`] once per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    fov_y_deg: f64,
    aspect: f64,
    near: f64,
    far: f64,
    projection: Mat4,
    dirty: bool,
}

impl PerspectiveCamera {
    pub fn new(fov_y_deg: f64, aspect: f64, near: f64, far: f64) -> Self {
        let mut camera = Self {
            fov_y_deg,
            aspect: sanitize_aspect(aspect),
            near,
            far,
            projection: Mat4::IDENTITY,
            dirty: true,
        };
        camera.update_projection_if_needed();
        camera
    }

    pub fn fov_y_deg(&self) -> f64 {
        self.fov_y_deg
    }

    pub fn aspect(&self) -> f64 {
        self.aspect
    }

    pub fn near(&self) -> f64 {
        self.near
    }

    pub fn far(&self) -> f64 {
        self.far
    }

    pub fn set_aspect(&mut self, aspect: f64) {
        let aspect = sanitize_aspect(aspect);
        if aspect != self.aspect {
            self.aspect = aspect;
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Recomputes the cached projection if a parameter changed. Returns
    /// whether a recompute happened.
    pub fn update_projection_if_needed(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.projection = self.compute_projection();
        self.dirty = false;
        true
    }

    /// Current projection, computed on the fly if the cache is stale.
    pub fn projection(&self) -> Mat4 {
        if self.dirty {
            self.compute_projection()
        } else {
            self.projection
        }
    }

    fn compute_projection(&self) -> Mat4 {
        Mat4::perspective_rh_z0(self.fov_y_deg.to_radians(), self.aspect, self.near, self.far)
    }
}

// A zero-height surface (minimised window) would otherwise yield inf/NaN.
fn sanitize_aspect(aspect: f64) -> f64 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}
