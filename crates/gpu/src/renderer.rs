use foundation::math::{Mat4, Vec3};
use scene::SceneContext;
use scene::components::{Blending, Light, Material, Rgb, Shape3D};
use scene::entity::EntityId;

/// Draw order. Passes run in declaration order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderPass {
    /// Background, no depth writes.
    Skybox,
    Opaque,
    /// Alpha-blended, depth-tested but not written.
    Transparent,
    /// Additive camera-facing sprites.
    Additive,
}

impl RenderPass {
    pub fn for_material(material: &Material) -> Self {
        match material {
            Material::Skybox { .. } => Self::Skybox,
            Material::Sprite {
                blending: Blending::Additive,
                ..
            } => Self::Additive,
            Material::Sprite { .. } => Self::Transparent,
            m if m.is_transparent() => Self::Transparent,
            _ => Self::Opaque,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    /// Inverse of `projection * rotation-only view`; maps clip space to
    /// world directions for the skybox.
    pub skybox_inv_view_projection: Mat4,
    pub camera_position: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LightCommand {
    Ambient {
        color: Rgb,
    },
    Point {
        position: Vec3,
        color: Rgb,
        intensity: f32,
        distance: f32,
    },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderCommand {
    pub entity: EntityId,
    pub pass: RenderPass,
    pub world: Mat4,
    pub shape: Shape3D,
    pub material: Material,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub view: ViewUniforms,
    pub lights: Vec<LightCommand>,
    pub commands: Vec<RenderCommand>,
}

impl RenderFrame {
    /// Sum of all ambient contributions.
    pub fn ambient(&self) -> Rgb {
        self.lights.iter().fold(Rgb::BLACK, |acc, l| match l {
            LightCommand::Ambient { color } => {
                Rgb::new(acc.r + color.r, acc.g + color.g, acc.b + color.b)
            }
            LightCommand::Point { .. } => acc,
        })
    }

    pub fn point_lights(&self) -> impl Iterator<Item = &LightCommand> {
        self.lights
            .iter()
            .filter(|l| matches!(l, LightCommand::Point { .. }))
    }

    pub fn pass(&self, pass: RenderPass) -> impl Iterator<Item = &RenderCommand> {
        self.commands.iter().filter(move |c| c.pass == pass)
    }
}

/// Backend-agnostic frame collection.
pub struct Renderer;

impl Renderer {
    /// Snapshot of everything a backend needs to draw `ctx` this frame.
    ///
    /// Commands are ordered by pass, then by entity index, so the output is
    /// deterministic for a given scene state.
    pub fn collect(ctx: &SceneContext) -> RenderFrame {
        let view = ctx.view_matrix();
        let projection = ctx.camera.projection();
        let view_projection = projection * view;
        let skybox_inv_view_projection = (projection * view.without_translation())
            .inverse()
            .unwrap_or_default();

        let lights = ctx
            .world
            .lights()
            .into_iter()
            .map(|(_, world, light)| match light {
                Light::Ambient { color } => LightCommand::Ambient { color },
                Light::Point {
                    color,
                    intensity,
                    distance,
                } => LightCommand::Point {
                    position: world.translation_part(),
                    color,
                    intensity,
                    distance,
                },
            })
            .collect();

        let mut commands: Vec<RenderCommand> = ctx
            .world
            .drawables_3d()
            .into_iter()
            .map(|(entity, world, drawable)| RenderCommand {
                entity,
                pass: RenderPass::for_material(&drawable.material),
                world,
                shape: drawable.shape,
                material: drawable.material,
            })
            .collect();
        commands.sort_by_key(|c| (c.pass, c.entity.index()));

        RenderFrame {
            view: ViewUniforms {
                view,
                projection,
                view_projection,
                skybox_inv_view_projection,
                camera_position: ctx.camera_position(),
            },
            lights,
            commands,
        }
    }
}
