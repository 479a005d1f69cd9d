use foundation::math::{Vec3, project};
use foundation::time::UtcClock;
use tracing::info;

use crate::World;
use crate::assets::{AssetManifest, TextureRole};
use crate::camera::PerspectiveCamera;
use crate::components::{
    Blending, Drawable3D, Light, Material, PhongMaterial, Rgb, Transform,
};
use crate::config::GlobeConfig;
use crate::context::{GlobeNodes, SceneContext};
use crate::entity::EntityId;
use crate::interaction::SurfaceRect;
use crate::orbit::OrbitControls;
use crate::prefabs::marker::{create_marker, spawn_marker};
use crate::rotation::RotationState;

pub const EARTH_SEGMENTS: u32 = 128;
pub const CLOUD_ALTITUDE: f64 = 0.2;
pub const GLOW_SCALE: f64 = 2.5;
pub const SKYBOX_SIZE: f64 = 2000.0;
pub const SUN_RADIUS: f64 = 100.0;
pub const SUN_POSITION: Vec3 = Vec3::new(-9500.0, 0.0, 0.0);
pub const CAMERA_FOV_DEG: f64 = 45.0;
pub const CAMERA_NEAR: f64 = 1.0;
pub const CAMERA_FAR: f64 = 10_000.0;

/// Turns the texture so the prime meridian faces the camera at rotation zero.
pub fn earth_initial_rotation() -> f64 {
    -(8.7 * std::f64::consts::PI / 17.0)
}

/// Builds the whole globe scene for a `width` x `height` surface.
///
/// Texture URLs are only recorded in the returned manifest; nothing is
/// fetched here. The live-location marker is not created either, see
/// [`SceneContext::apply_live_location`].
pub fn build_globe_scene(
    config: GlobeConfig,
    clock: &impl UtcClock,
    width: f64,
    height: f64,
) -> SceneContext {
    let mut world = World::new();
    let mut assets = AssetManifest::new();
    let r = config.earth_radius;

    spawn_lights(&mut world);

    // Camera rig: base pivot spins slowly, the anchor holds the orbiting camera.
    let base = world.spawn();
    world.set_transform(base, Transform::identity());
    let camera_anchor = world.spawn_child(base);
    world.set_transform(camera_anchor, Transform::translate(Vec3::new(0.0, 0.0, 4.0 * r)));

    let rotation = RotationState::from_clock(clock, config.degree_offset);
    let world_pivot = world.spawn();
    world.set_transform(
        world_pivot,
        Transform::identity().with_rotation_y(rotation.radians()),
    );

    let color = assets.add_texture(TextureRole::Color, config.texture_url("ColorMap.jpg"));
    let bump = assets.add_texture(TextureRole::Bump, config.texture_url("Bump.jpg"));
    let spec = assets.add_texture(TextureRole::Specular, config.texture_url("SpecMask.jpg"));
    let alpha = assets.add_texture(TextureRole::CloudAlpha, config.texture_url("alphaMap.jpg"));
    let glow_map = assets.add_texture(TextureRole::Glow, config.texture_url("glow.png"));
    let sky = assets.add_cube(std::array::from_fn(|_| config.texture_url("test.jpg")));

    let earth = world.spawn_child(world_pivot);
    world.set_transform(
        earth,
        Transform::identity().with_rotation_y(earth_initial_rotation()),
    );
    world.set_drawable_3d(
        earth,
        Drawable3D::sphere(
            r,
            EARTH_SEGMENTS,
            Material::Phong(PhongMaterial {
                color: Rgb::WHITE,
                specular: Rgb::from_hex(0x666666),
                shininess: 5.0,
                map: Some(color),
                bump_map: Some(bump),
                specular_map: Some(spec),
                ..PhongMaterial::default()
            }),
        ),
    );

    let clouds = world.spawn_child(earth);
    world.set_transform(clouds, Transform::identity());
    world.set_drawable_3d(
        clouds,
        Drawable3D::sphere(
            r + CLOUD_ALTITUDE,
            EARTH_SEGMENTS,
            Material::Phong(PhongMaterial {
                alpha_map: Some(alpha),
                transparent: true,
                ..PhongMaterial::default()
            }),
        ),
    );

    let glow = world.spawn_child(clouds);
    world.set_transform(glow, Transform::identity());
    world.set_drawable_3d(
        glow,
        Drawable3D::sprite(
            GLOW_SCALE * r,
            GLOW_SCALE * r,
            Material::Sprite {
                color: Rgb::from_hex(0x0099ff),
                map: Some(glow_map),
                blending: Blending::Additive,
            },
        ),
    );

    let skybox = world.spawn();
    world.set_transform(skybox, Transform::identity());
    world.set_drawable_3d(skybox, Drawable3D::cube(SKYBOX_SIZE, Material::Skybox { cube: sky }));

    let sun = spawn_sun(&mut world);

    let reference = create_marker(
        config.reference_label.clone(),
        config.reference_color,
        config.reference_location,
        r,
        true,
    );
    let clickable_marker = spawn_marker(&mut world, earth, reference);

    let camera = PerspectiveCamera::new(CAMERA_FOV_DEG, width / height, CAMERA_NEAR, CAMERA_FAR);
    // The camera starts at the anchor origin looking back at the globe centre.
    let orbit = OrbitControls::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -4.0 * r), 2.0 * r, 8.0 * r);

    info!(
        entities = world.len(),
        textures = assets.textures().len(),
        degrees = rotation.degrees(),
        "globe scene built"
    );

    SceneContext {
        config,
        world,
        camera,
        orbit,
        assets,
        rotation,
        surface: SurfaceRect::sized(width, height),
        nodes: GlobeNodes {
            base,
            camera_anchor,
            world_pivot,
            earth,
            clouds,
            glow,
            skybox,
            sun,
            clickable_marker,
            live_marker: None,
        },
    }
}

fn spawn_lights(world: &mut World) {
    let ambient = world.spawn();
    world.set_light(ambient, Light::ambient(0x222222));

    // The sun is much larger than a point light; four fillers around the key light fake its size.
    let key = (Vec3::new(-400.0, 0.0, 100.0), Light::point(0xffeecc, 1.0, 5000.0));
    let fillers = [
        Vec3::new(-400.0, 0.0, 250.0),
        Vec3::new(-400.0, 0.0, -150.0),
        Vec3::new(-400.0, 150.0, 100.0),
        Vec3::new(-400.0, -150.0, 100.0),
    ]
    .map(|p| (p, Light::point(0xffffff, 0.6, 4000.0)));

    for (position, light) in std::iter::once(key).chain(fillers) {
        let e = world.spawn();
        world.set_transform(e, Transform::translate(position));
        world.set_light(e, light);
    }
}

fn spawn_sun(world: &mut World) -> EntityId {
    let sun = world.spawn();
    world.set_transform(
        sun,
        Transform::translate(SUN_POSITION).with_rotation_y(std::f64::consts::PI),
    );
    let yellow = Rgb::from_hex(0xffff55);
    world.set_drawable_3d(
        sun,
        Drawable3D::sphere(
            SUN_RADIUS,
            16,
            Material::Lambert {
                color: yellow,
                emissive: yellow,
            },
        ),
    );
    sun
}

#[cfg(test)]
mod tests {
    use super::{build_globe_scene, project};
    use crate::assets::TextureRole;
    use crate::components::{Light, Material, Shape3D};
    use crate::config::GlobeConfig;
    use foundation::math::Vec3;
    use foundation::time::FixedUtcClock;

    fn scene() -> crate::SceneContext {
        build_globe_scene(GlobeConfig::default(), &FixedUtcClock::at_hm(0, 0), 1200.0, 800.0)
    }

    #[test]
    fn reference_marker_is_the_only_clickable_one() {
        let ctx = scene();
        let markers = ctx.world.markers();
        assert_eq!(markers.len(), 1);
        let (entity, marker) = markers[0];
        assert_eq!(entity, ctx.nodes.clickable_marker);
        assert!(marker.clickable);
        assert_eq!(marker.label, "India");
        assert_eq!(marker.geo.lat_deg, 20.5937);
        assert_eq!(marker.geo.lon_deg, 78.9629);
        assert_eq!(ctx.world.parent(entity), Some(ctx.nodes.earth));
    }

    #[test]
    fn graph_ownership_matches_the_rig() {
        let ctx = scene();
        let n = &ctx.nodes;
        assert_eq!(ctx.world.parent(n.earth), Some(n.world_pivot));
        assert_eq!(ctx.world.parent(n.clouds), Some(n.earth));
        assert_eq!(ctx.world.parent(n.glow), Some(n.clouds));
        assert_eq!(ctx.world.parent(n.camera_anchor), Some(n.base));
        assert_eq!(ctx.world.parent(n.world_pivot), None);
        assert_eq!(ctx.world.parent(n.base), None);
    }

    #[test]
    fn textures_are_recorded_not_fetched() {
        let ctx = scene();
        assert_eq!(ctx.assets.textures().len(), 5);
        assert_eq!(ctx.assets.cubes().len(), 1);
        let color = ctx.assets.find_role(TextureRole::Color).expect("color map");
        assert_eq!(
            ctx.assets.texture(color).map(|t| t.url.as_str()),
            Some("https://s3-us-west-2.amazonaws.com/s.cdpn.io/123879/ColorMap.jpg")
        );
    }

    #[test]
    fn lights_are_ambient_plus_five_points() {
        let ctx = scene();
        let lights = ctx.world.lights();
        assert_eq!(lights.len(), 6);
        let ambient = lights
            .iter()
            .filter(|(_, _, l)| matches!(l, Light::Ambient { .. }))
            .count();
        assert_eq!(ambient, 1);
    }

    #[test]
    fn earth_and_clouds_have_expected_geometry() {
        let ctx = scene();
        let earth = ctx.world.drawable_3d(ctx.nodes.earth).expect("earth");
        assert!(matches!(earth.shape, Shape3D::Sphere { radius, width_segments: 128, .. } if radius == 80.0));
        let clouds = ctx.world.drawable_3d(ctx.nodes.clouds).expect("clouds");
        assert!(clouds.material.is_transparent());
        let sky = ctx.world.drawable_3d(ctx.nodes.skybox).expect("skybox");
        assert!(matches!(sky.material, Material::Skybox { .. }));
    }

    #[test]
    fn reference_marker_world_position_follows_the_earth() {
        let ctx = scene();
        let marker = ctx
            .world
            .world_matrix(ctx.nodes.clickable_marker)
            .translation_part();
        let expected = ctx
            .world
            .world_matrix(ctx.nodes.earth)
            .transform_point(project(20.5937, 78.9629, 81.0));
        assert!((marker - expected).length() < 1e-9);
        assert!((marker.length() - 81.0).abs() < 1e-9);
        assert!(marker != Vec3::ZERO);
    }
}
