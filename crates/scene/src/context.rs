use foundation::math::{GeoPoint, Mat4, Vec2, Vec3};
use tracing::{debug, info, warn};

use crate::World;
use crate::assets::AssetManifest;
use crate::camera::PerspectiveCamera;
use crate::config::GlobeConfig;
use crate::entity::EntityId;
use crate::geolocation::GeolocationError;
use crate::interaction::{SurfaceRect, screen_to_ndc};
use crate::orbit::OrbitControls;
use crate::picking::Ray;
use crate::prefabs::marker::{create_marker, spawn_marker};
use crate::rotation::RotationState;

/// Well-known entities of the globe scene.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobeNodes {
    /// Camera-rig pivot; spins slowly every frame.
    pub base: EntityId,
    /// Child of `base`; parent space of the orbit controls.
    pub camera_anchor: EntityId,
    /// Planet pivot; its angle comes from the rotation state.
    pub world_pivot: EntityId,
    pub earth: EntityId,
    pub clouds: EntityId,
    pub glow: EntityId,
    pub skybox: EntityId,
    pub sun: EntityId,
    pub clickable_marker: EntityId,
    pub live_marker: Option<EntityId>,
}

/// Owned state of one globe session.
///
/// Built once by [`crate::prefabs::build_globe_scene`], then handed to the
/// animation loop and the interaction layer.
#[derive(Debug)]
pub struct SceneContext {
    pub config: GlobeConfig,
    pub world: World,
    pub camera: PerspectiveCamera,
    pub orbit: OrbitControls,
    pub assets: AssetManifest,
    pub rotation: RotationState,
    pub surface: SurfaceRect,
    pub nodes: GlobeNodes,
}

impl SceneContext {
    /// New surface size in pixels. The projection refreshes on the next frame.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.surface.width = width;
        self.surface.height = height;
        if width > 0.0 && height > 0.0 {
            self.camera.set_aspect(width / height);
        }
    }

    /// Moves the surface origin (e.g. after page layout changes).
    pub fn set_surface(&mut self, surface: SurfaceRect) {
        self.resize(surface.width, surface.height);
        self.surface = surface;
    }

    /// Outcome of the one-shot location lookup.
    ///
    /// Success adds the non-clickable live marker (once; later successes are
    /// ignored). Failure is logged and otherwise has no effect.
    pub fn apply_live_location(
        &mut self,
        location: Result<GeoPoint, GeolocationError>,
    ) -> Option<EntityId> {
        let geo = match location {
            Ok(geo) => geo,
            Err(err) => {
                warn!(%err, "live location unavailable; only the reference marker is shown");
                return None;
            }
        };

        if let Some(existing) = self.nodes.live_marker {
            debug!("live marker already placed");
            return Some(existing);
        }

        let marker = create_marker(
            self.config.live_label.clone(),
            self.config.live_color,
            geo,
            self.config.earth_radius,
            false,
        );
        let entity = spawn_marker(&mut self.world, self.nodes.earth, marker);
        self.nodes.live_marker = Some(entity);
        info!(lat = geo.lat_deg, lon = geo.lon_deg, "live location marker added");
        Some(entity)
    }

    pub fn camera_world_matrix(&self) -> Mat4 {
        self.world.world_matrix(self.nodes.camera_anchor) * self.orbit.local_matrix()
    }

    pub fn camera_position(&self) -> Vec3 {
        self.camera_world_matrix().translation_part()
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.camera_world_matrix().inverse().unwrap_or_default()
    }

    pub fn view_projection(&self) -> Mat4 {
        self.camera.projection() * self.view_matrix()
    }

    /// Surface pixel coordinates of a world point, or `None` if it is behind the camera.
    pub fn project_to_surface(&self, point: Vec3) -> Option<Vec2> {
        let ndc = self.view_projection().project_point(point)?;
        let s = &self.surface;
        Some(Vec2::new(
            s.left + (ndc.x + 1.0) * 0.5 * s.width,
            s.top + (1.0 - ndc.y) * 0.5 * s.height,
        ))
    }

    /// World-space ray from the camera through a normalized device coordinate.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Option<Ray> {
        let inv = self.view_projection().inverse()?;
        let far = inv.project_point(Vec3::new(ndc.x, ndc.y, 1.0))?;
        let origin = self.camera_position();
        let dir = (far - origin).normalize()?;
        Some(Ray::new(origin, dir))
    }

    /// World-space ray through a client-space pixel.
    pub fn screen_ray(&self, x: f64, y: f64) -> Option<Ray> {
        self.ray_from_ndc(screen_to_ndc(&self.surface, x, y)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::GlobeConfig;
    use crate::geolocation::GeolocationError;
    use crate::prefabs::build_globe_scene;
    use foundation::math::{GeoPoint, Vec3};
    use foundation::time::FixedUtcClock;

    fn scene() -> crate::SceneContext {
        build_globe_scene(GlobeConfig::default(), &FixedUtcClock::at_hm(8, 30), 1000.0, 500.0)
    }

    #[test]
    fn live_location_success_adds_one_non_clickable_marker() {
        let mut ctx = scene();
        let first = ctx
            .apply_live_location(Ok(GeoPoint::new(48.85, 2.35)))
            .expect("placed");
        let again = ctx.apply_live_location(Ok(GeoPoint::new(0.0, 0.0)));
        assert_eq!(again, Some(first));

        let markers = ctx.world.markers();
        assert_eq!(markers.len(), 2);
        let live = ctx.world.marker(first).expect("marker");
        assert!(!live.clickable);
        assert_eq!(live.label, "UserLocation");
        assert_eq!(ctx.world.parent(first), Some(ctx.nodes.earth));
        assert_eq!(markers.iter().filter(|(_, m)| m.clickable).count(), 1);
    }

    #[test]
    fn live_location_failure_is_ignored() {
        let mut ctx = scene();
        assert!(ctx.apply_live_location(Err(GeolocationError::PermissionDenied)).is_none());
        assert!(ctx.nodes.live_marker.is_none());
        assert_eq!(ctx.world.markers().len(), 1);
    }

    #[test]
    fn camera_starts_four_radii_out_looking_at_the_centre() {
        let ctx = scene();
        let eye = ctx.camera_position();
        assert!((eye - Vec3::new(0.0, 0.0, 320.0)).length() < 1e-9);

        let centre = ctx.project_to_surface(Vec3::ZERO).expect("in front");
        assert!((centre.x - 500.0).abs() < 1e-6);
        assert!((centre.y - 250.0).abs() < 1e-6);
    }

    #[test]
    fn resize_defers_projection_to_next_frame() {
        let mut ctx = scene();
        ctx.resize(400.0, 400.0);
        assert!(ctx.camera.is_dirty());
        assert_eq!(ctx.camera.aspect(), 1.0);
        assert_eq!(ctx.surface.width, 400.0);

        ctx.resize(400.0, 0.0);
        assert_eq!(ctx.camera.aspect(), 1.0);
    }

    #[test]
    fn screen_ray_through_centre_points_at_the_globe() {
        let ctx = scene();
        let ray = ctx.screen_ray(500.0, 250.0).expect("ray");
        assert!((ray.dir - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-9);
    }
}
