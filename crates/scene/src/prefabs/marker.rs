use foundation::math::{GeoPoint, project};

use crate::World;
use crate::components::{Drawable3D, Marker, Material, Rgb, Transform};
use crate::entity::EntityId;

pub const MARKER_RADIUS: f64 = 2.5;
pub const MARKER_SEGMENTS: u32 = 16;
/// Markers float this far above the surface so they never z-fight with it.
pub const SURFACE_OFFSET: f64 = 1.0;

/// Builds marker data for a point on a sphere of `sphere_radius`.
pub fn create_marker(
    label: impl Into<String>,
    color_hex: u32,
    geo: GeoPoint,
    sphere_radius: f64,
    clickable: bool,
) -> Marker {
    Marker {
        label: label.into(),
        color: Rgb::from_hex(color_hex),
        geo,
        position: project(geo.lat_deg, geo.lon_deg, sphere_radius + SURFACE_OFFSET),
        clickable,
    }
}

/// Spawns `marker` as a small unlit sphere owned by `parent`.
///
/// Allocates a new entity per call; not meant for per-frame use.
pub fn spawn_marker(world: &mut World, parent: EntityId, marker: Marker) -> EntityId {
    let entity = world.spawn_child(parent);
    world.set_transform(entity, Transform::translate(marker.position));
    world.set_drawable_3d(
        entity,
        Drawable3D::sphere(MARKER_RADIUS, MARKER_SEGMENTS, Material::basic(marker.color)),
    );
    world.set_marker(entity, marker);
    entity
}

#[cfg(test)]
mod tests {
    use super::{MARKER_RADIUS, create_marker, spawn_marker};
    use crate::World;
    use crate::components::{Material, Rgb, Shape3D};
    use foundation::math::GeoPoint;

    #[test]
    fn marker_sits_just_above_the_surface() {
        let marker = create_marker("India", 0xff9933, GeoPoint::new(20.5937, 78.9629), 80.0, true);
        assert!((marker.position.length() - 81.0).abs() < 1e-9);
        assert_eq!(marker.color, Rgb::from_hex(0xff9933));
    }

    #[test]
    fn spawned_marker_is_owned_by_parent() {
        let mut world = World::new();
        let earth = world.spawn();
        let marker = create_marker("Here", 0x3399ff, GeoPoint::new(0.0, 0.0), 80.0, false);
        let e = spawn_marker(&mut world, earth, marker);

        assert_eq!(world.parent(e), Some(earth));
        assert_eq!(world.marker(e).map(|m| m.label.as_str()), Some("Here"));
        let drawable = world.drawable_3d(e).expect("drawable");
        assert!(matches!(drawable.shape, Shape3D::Sphere { radius, .. } if radius == MARKER_RADIUS));
        assert_eq!(drawable.material, Material::basic(Rgb::from_hex(0x3399ff)));
    }
}
