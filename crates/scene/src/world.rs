use foundation::math::Mat4;

use crate::components::{Drawable3D, Light, Marker, Transform};
use crate::entity::EntityId;

/// Columnar scene graph.
///
/// Every entity has a slot in each column; a `None` means "component
/// absent". Parent links make it a tree: an entity's world matrix is its
/// parent's world matrix times its local [`Transform`].
#[derive(Debug, Default)]
pub struct World {
    next_index: u32,
    transforms: Vec<Option<Transform>>,
    parents: Vec<Option<EntityId>>,
    drawables_3d: Vec<Option<Drawable3D>>,
    lights: Vec<Option<Light>>,
    markers: Vec<Option<Marker>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.next_index as usize
    }

    pub fn is_empty(&self) -> bool {
        self.next_index == 0
    }

    pub fn spawn(&mut self) -> EntityId {
        let id = EntityId::from_index(self.next_index);
        self.next_index += 1;
        self.ensure_capacity(id.index() as usize);
        id
    }

    pub fn spawn_child(&mut self, parent: EntityId) -> EntityId {
        let id = self.spawn();
        self.parents[id.index() as usize] = Some(parent);
        id
    }

    pub fn parent(&self, entity: EntityId) -> Option<EntityId> {
        self.parents.get(entity.index() as usize).and_then(|p| *p)
    }

    pub fn set_transform(&mut self, entity: EntityId, transform: Transform) {
        self.ensure_capacity(entity.index() as usize);
        self.transforms[entity.index() as usize] = Some(transform);
    }

    pub fn transform(&self, entity: EntityId) -> Option<Transform> {
        self.transforms.get(entity.index() as usize).and_then(|t| *t)
    }

    pub fn transform_mut(&mut self, entity: EntityId) -> Option<&mut Transform> {
        self.transforms
            .get_mut(entity.index() as usize)
            .and_then(|t| t.as_mut())
    }

    pub fn set_drawable_3d(&mut self, entity: EntityId, drawable: Drawable3D) {
        self.ensure_capacity(entity.index() as usize);
        self.drawables_3d[entity.index() as usize] = Some(drawable);
    }

    pub fn drawable_3d(&self, entity: EntityId) -> Option<Drawable3D> {
        self.drawables_3d.get(entity.index() as usize).and_then(|d| *d)
    }

    pub fn set_light(&mut self, entity: EntityId, light: Light) {
        self.ensure_capacity(entity.index() as usize);
        self.lights[entity.index() as usize] = Some(light);
    }

    pub fn set_marker(&mut self, entity: EntityId, marker: Marker) {
        self.ensure_capacity(entity.index() as usize);
        self.markers[entity.index() as usize] = Some(marker);
    }

    pub fn marker(&self, entity: EntityId) -> Option<&Marker> {
        self.markers
            .get(entity.index() as usize)
            .and_then(|m| m.as_ref())
    }

    pub fn markers(&self) -> Vec<(EntityId, &Marker)> {
        self.markers
            .iter()
            .enumerate()
            .filter_map(|(idx, m)| m.as_ref().map(|m| (EntityId::from_index(idx as u32), m)))
            .collect()
    }

    /// Local-to-world matrix, composed along the parent chain.
    pub fn world_matrix(&self, entity: EntityId) -> Mat4 {
        let mut m = Mat4::IDENTITY;
        for e in self.ancestors_and_self(entity) {
            let local = self.transform(e).map(|t| t.matrix()).unwrap_or_default();
            m = local * m;
        }
        m
    }

    /// Drawables in entity order, each with its world matrix.
    pub fn drawables_3d(&self) -> Vec<(EntityId, Mat4, Drawable3D)> {
        self.drawables_3d
            .iter()
            .enumerate()
            .filter_map(|(idx, d)| {
                let d = (*d)?;
                let e = EntityId::from_index(idx as u32);
                Some((e, self.world_matrix(e), d))
            })
            .collect()
    }

    pub fn lights(&self) -> Vec<(EntityId, Mat4, Light)> {
        self.lights
            .iter()
            .enumerate()
            .filter_map(|(idx, l)| {
                let l = (*l)?;
                let e = EntityId::from_index(idx as u32);
                Some((e, self.world_matrix(e), l))
            })
            .collect()
    }

    /// Walks from `entity` up to its root. Bounded by the entity count so a
    /// corrupted parent column cannot loop forever.
    fn ancestors_and_self(&self, entity: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        let limit = self.len() + 1;
        std::iter::successors(Some(entity), |e| self.parent(*e)).take(limit)
    }

    fn ensure_capacity(&mut self, idx: usize) {
        if self.transforms.len() <= idx {
            let new_len = idx + 1;
            self.transforms.resize(new_len, None);
            self.parents.resize(new_len, None);
            self.drawables_3d.resize(new_len, None);
            self.lights.resize(new_len, None);
            self.markers.resize(new_len, None);
        }
    }
}
