use foundation::math::Vec3;
use foundation::math::precision::stable_total_cmp_f64;

use crate::World;
use crate::entity::EntityId;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir * t
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickHit {
    pub entity: EntityId,
    pub distance: f64,
    pub point: Vec3,
}

/// Deterministic ray picking restricted to `candidates`.
///
/// Each candidate is tested against the bounding sphere of its drawable in
/// world space; entities without a drawable are skipped. Nothing outside the
/// candidate list is considered, so other geometry never occludes a hit.
///
/// Ordering contract:
/// - The closest hit along the (normalized) ray wins.
/// - If multiple entities are hit at the same distance, the lower `EntityId::index()` wins.
pub fn pick_ray(world: &World, ray: Ray, candidates: &[EntityId]) -> Option<PickHit> {
    let dir = ray.dir.normalize()?;
    let ray = Ray::new(ray.origin, dir);

    let mut best: Option<(f64, EntityId)> = None;
    for &entity in candidates {
        let Some(drawable) = world.drawable_3d(entity) else {
            continue;
        };
        let m = world.world_matrix(entity);
        let center = m.translation_part();
        let s = m.scale_part();
        let radius = drawable.bounding_radius() * s.x.max(s.y).max(s.z);

        let Some(t) = ray_sphere_hit_t(&ray, center, radius) else {
            continue;
        };

        best = match best {
            None => Some((t, entity)),
            Some((bt, be)) => {
                let ord = stable_total_cmp_f64(t, bt).then_with(|| entity.index().cmp(&be.index()));
                if ord.is_lt() {
                    Some((t, entity))
                } else {
                    Some((bt, be))
                }
            }
        };
    }

    let (t, entity) = best?;
    Some(PickHit {
        entity,
        distance: t,
        point: ray.at(t),
    })
}

/// Entry distance of a normalized ray into a sphere; the exit distance when
/// the origin is inside. `None` if the sphere is missed or entirely behind.
fn ray_sphere_hit_t(ray: &Ray, center: Vec3, radius: f64) -> Option<f64> {
    let oc = ray.origin - center;
    let b = oc.dot(ray.dir);
    let c = oc.dot(oc) - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let near = -b - sq;
    let far = -b + sq;
    if near >= 0.0 {
        Some(near)
    } else if far >= 0.0 {
        Some(far)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{Ray, pick_ray};
    use crate::World;
    use crate::components::{Drawable3D, Material, Rgb, Transform};
    use crate::entity::EntityId;
    use foundation::math::Vec3;

    fn ball(world: &mut World, at: Vec3, radius: f64) -> EntityId {
        let e = world.spawn();
        world.set_transform(e, Transform::translate(at));
        world.set_drawable_3d(e, Drawable3D::sphere(radius, 8, Material::basic(Rgb::WHITE)));
        e
    }

    #[test]
    fn ray_picks_nearest_hit() {
        let mut world = World::new();
        let a = ball(&mut world, Vec3::new(5.0, 0.0, 0.0), 1.0);
        let b = ball(&mut world, Vec3::new(10.0, 0.0, 0.0), 1.0);

        let ray = Ray::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0));
        let hit = pick_ray(&world, ray, &[b, a]).expect("hit");
        assert_eq!(hit.entity, a);
        assert!((hit.distance - 4.0).abs() < 1e-12);
        assert!((hit.point - Vec3::new(4.0, 0.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn tie_breaks_by_entity_index() {
        let mut world = World::new();
        let first = ball(&mut world, Vec3::new(5.0, 0.0, 0.0), 1.0);
        let second = ball(&mut world, Vec3::new(5.0, 0.0, 0.0), 1.0);

        let ray = Ray::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        let hit = pick_ray(&world, ray, &[second, first]).expect("hit");
        assert_eq!(hit.entity, first);
    }

    #[test]
    fn only_candidates_are_tested() {
        let mut world = World::new();
        let blocker = ball(&mut world, Vec3::new(3.0, 0.0, 0.0), 1.0);
        let target = ball(&mut world, Vec3::new(10.0, 0.0, 0.0), 1.0);

        let ray = Ray::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        let hit = pick_ray(&world, ray, &[target]).expect("hit");
        assert_eq!(hit.entity, target);
        assert_ne!(hit.entity, blocker);
    }

    #[test]
    fn misses_and_spheres_behind_the_origin_are_ignored() {
        let mut world = World::new();
        let behind = ball(&mut world, Vec3::new(-5.0, 0.0, 0.0), 1.0);
        let off_axis = ball(&mut world, Vec3::new(5.0, 3.0, 0.0), 1.0);

        let ray = Ray::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        assert!(pick_ray(&world, ray, &[behind, off_axis]).is_none());
        assert!(pick_ray(&world, Ray::new(Vec3::ZERO, Vec3::ZERO), &[off_axis]).is_none());
    }

    #[test]
    fn scaled_parents_grow_the_hit_radius() {
        let mut world = World::new();
        let parent = world.spawn();
        world.set_transform(
            parent,
            Transform::identity().with_scale(Vec3::new(3.0, 3.0, 3.0)),
        );
        let child = world.spawn_child(parent);
        world.set_transform(child, Transform::translate(Vec3::new(0.0, 0.0, -4.0)));
        world.set_drawable_3d(child, Drawable3D::sphere(1.0, 8, Material::basic(Rgb::WHITE)));

        // Centre lands at z = -12 with radius 3; a ray offset by 2 still hits.
        let ray = Ray::new(Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(pick_ray(&world, ray, &[child]).is_some());
    }
}
