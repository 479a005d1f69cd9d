use scene::assets::TextureId;
use scene::components::Material;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("surface acquire failed: {0}")]
    Surface(String),
    #[error("renderer unavailable: {0}")]
    Unavailable(String),
}

/// Point lights the shader can evaluate per fragment.
pub const MAX_POINT_LIGHTS: usize = 5;

/// What a cached material bind group was built from: the four sampled
/// texture slots (map, bump, specular, alpha) and the upload generation
/// their views were resolved at. Colors live in the uniform buffer and
/// never force a rebuild.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MaterialBindingKey {
    pub textures: [Option<TextureId>; 4],
    pub generation: u64,
}

impl MaterialBindingKey {
    pub fn new(material: &Material, generation: u64) -> Self {
        let textures = match material {
            Material::Phong(p) => [p.map, p.bump_map, p.specular_map, p.alpha_map],
            Material::Sprite { map, .. } => [*map, None, None, None],
            _ => [None; 4],
        };
        Self {
            textures,
            generation,
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod imp {
    use std::borrow::Cow;
    use std::collections::HashMap;

    use ::wgpu::util::DeviceExt;
    use gpu::{LightCommand, RenderCommand, RenderFrame, RenderPass, Renderer, SphereMesh};
    use scene::SceneContext;
    use scene::animation::FrameRenderer;
    use scene::assets::{CubeTextureId, DecodedImage, TextureId, TextureRole, TextureSlot};
    use scene::components::{Material, Shape3D};
    use tracing::{debug, warn};
    use wasm_bindgen::prelude::*;

    use super::{MAX_POINT_LIGHTS, MaterialBindingKey, RenderError};
    use crate::textures::{UploadQueue, resize_square};

    const GLOBALS_WGSL: &str = r#"
struct PointLight {
    // xyz = world position, w = range (0 = infinite)
    position: vec4<f32>,
    // rgb = color * intensity
    color: vec4<f32>,
};

struct Globals {
    view_proj: mat4x4<f32>,
    skybox_inv_view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    camera_right: vec4<f32>,
    camera_up: vec4<f32>,
    // rgb = summed ambient, w = point light count
    ambient: vec4<f32>,
    lights: array<PointLight, 5>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;
"#;

    const MATERIAL_WGSL: &str = r#"
struct Material {
    model: mat4x4<f32>,
    // rgb = diffuse color, a = opacity
    color: vec4<f32>,
    // rgb = specular color, w = shininess
    specular: vec4<f32>,
    emissive: vec4<f32>,
    // x = lighting model (0 unlit, 1 lambert, 2 phong), y = has map, z = bump scale, w = has alpha map
    flags: vec4<f32>,
    // x = has specular map, yz = sprite size
    extra: vec4<f32>,
};

@group(1) @binding(0)
var<uniform> material: Material;
@group(1) @binding(1)
var color_map: texture_2d<f32>;
@group(1) @binding(2)
var bump_map: texture_2d<f32>;
@group(1) @binding(3)
var specular_map: texture_2d<f32>;
@group(1) @binding(4)
var alpha_map: texture_2d<f32>;
@group(1) @binding(5)
var material_sampler: sampler;
"#;

    const MESH_WGSL: &str = r#"
struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
) -> VsOut {
    let world = material.model * vec4<f32>(position, 1.0);
    let n = (material.model * vec4<f32>(normal, 0.0)).xyz;
    return VsOut(globals.view_proj * world, world.xyz, n, uv);
}

fn perturb_normal(n: vec3<f32>, pos: vec3<f32>, uv: vec2<f32>, scale: f32) -> vec3<f32> {
    let duv_dx = dpdx(uv);
    let duv_dy = dpdy(uv);
    let h = textureSample(bump_map, material_sampler, uv).x;
    let db_dx = textureSample(bump_map, material_sampler, uv + duv_dx).x - h;
    let db_dy = textureSample(bump_map, material_sampler, uv + duv_dy).x - h;

    let sigma_x = dpdx(pos);
    let sigma_y = dpdy(pos);
    let r1 = cross(sigma_y, n);
    let r2 = cross(n, sigma_x);
    let det = dot(sigma_x, r1);
    let grad = sign(det) * (db_dx * r1 + db_dy * r2);
    return normalize(abs(det) * n - grad * scale);
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let texel = textureSample(color_map, material_sampler, in.uv);
    let spec_mask = textureSample(specular_map, material_sampler, in.uv).x;
    let alpha_texel = textureSample(alpha_map, material_sampler, in.uv).y;

    let base_n = normalize(in.normal);
    let bumped = perturb_normal(base_n, in.world_pos, in.uv, material.flags.z);
    let n = select(base_n, bumped, material.flags.z > 0.0);

    let base = material.color.rgb * mix(vec3<f32>(1.0), texel.rgb, material.flags.y);
    let opacity = material.color.a * mix(1.0, alpha_texel, material.flags.w);
    let model = u32(material.flags.x + 0.5);

    if model == 0u {
        return vec4<f32>(base, opacity);
    }

    let v = normalize(globals.camera_pos.xyz - in.world_pos);
    var diffuse = vec3<f32>(0.0);
    var specular = vec3<f32>(0.0);
    let count = u32(globals.ambient.w + 0.5);
    for (var i = 0u; i < 5u; i = i + 1u) {
        if i >= count {
            break;
        }
        let light = globals.lights[i];
        let to_light = light.position.xyz - in.world_pos;
        let d = length(to_light);
        let l = to_light / max(d, 1e-4);
        var attenuation = 1.0;
        if light.position.w > 0.0 {
            attenuation = clamp(1.0 - d / light.position.w, 0.0, 1.0);
        }
        let ndotl = max(dot(n, l), 0.0);
        diffuse = diffuse + light.color.rgb * ndotl * attenuation;
        let h = normalize(l + v);
        let shininess = max(material.specular.w, 1.0);
        specular = specular + light.color.rgb * pow(max(dot(n, h), 0.0), shininess) * attenuation;
    }

    var lit = base * (globals.ambient.rgb + diffuse) + material.emissive.rgb;
    if model == 2u {
        let mask = mix(1.0, spec_mask, material.extra.x);
        lit = lit + material.specular.rgb * specular * mask;
    }
    return vec4<f32>(lit, opacity);
}
"#;

    const SPRITE_WGSL: &str = r#"
struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vid: u32) -> VsOut {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-0.5, -0.5),
        vec2<f32>(0.5, -0.5),
        vec2<f32>(0.5, 0.5),
        vec2<f32>(-0.5, -0.5),
        vec2<f32>(0.5, 0.5),
        vec2<f32>(-0.5, 0.5),
    );
    let corner = corners[vid];
    let centre = (material.model * vec4<f32>(0.0, 0.0, 0.0, 1.0)).xyz;
    let world = centre
        + globals.camera_right.xyz * corner.x * material.extra.y
        + globals.camera_up.xyz * corner.y * material.extra.z;
    return VsOut(globals.view_proj * vec4<f32>(world, 1.0), vec2<f32>(corner.x + 0.5, 0.5 - corner.y));
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let texel = textureSample(color_map, material_sampler, in.uv);
    let tint = mix(vec4<f32>(1.0), texel, material.flags.y);
    return vec4<f32>(material.color.rgb * tint.rgb, material.color.a * tint.a);
}
"#;

    const SKYBOX_WGSL: &str = r#"
@group(1) @binding(0)
var sky_texture: texture_cube<f32>;
@group(1) @binding(1)
var sky_sampler: sampler;

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) dir: vec3<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) idx: u32) -> VsOut {
    // Fullscreen triangle.
    let uv = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));
    let ndc = uv * 2.0 - 1.0;
    let far = globals.skybox_inv_view_proj * vec4<f32>(ndc.x, ndc.y, 1.0, 1.0);
    return VsOut(vec4<f32>(ndc.x, ndc.y, 1.0, 1.0), far.xyz / far.w);
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return vec4<f32>(textureSample(sky_texture, sky_sampler, normalize(in.dir)).rgb, 1.0);
}
"#;

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct Vertex {
        position: [f32; 3],
        normal: [f32; 3],
        uv: [f32; 2],
    }

    #[repr(C)]
    #[derive(Copy, Clone, Default, bytemuck::Pod, bytemuck::Zeroable)]
    struct GpuPointLight {
        position: [f32; 4],
        color: [f32; 4],
    }

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct Globals {
        view_proj: [[f32; 4]; 4],
        skybox_inv_view_proj: [[f32; 4]; 4],
        camera_pos: [f32; 4],
        camera_right: [f32; 4],
        camera_up: [f32; 4],
        ambient: [f32; 4],
        lights: [GpuPointLight; MAX_POINT_LIGHTS],
    }

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct MaterialUniform {
        model: [[f32; 4]; 4],
        color: [f32; 4],
        specular: [f32; 4],
        emissive: [f32; 4],
        flags: [f32; 4],
        extra: [f32; 4],
    }

    struct GpuMesh {
        vertex_buffer: ::wgpu::Buffer,
        index_buffer: ::wgpu::Buffer,
        index_count: u32,
    }

    struct CubeUpload {
        texture: ::wgpu::Texture,
        size: u32,
        faces_done: u8,
    }

    /// Per-draw uniform buffer and material bind group, reused across frames
    /// by draw position.
    struct DrawSlot {
        buffer: ::wgpu::Buffer,
        binding: Option<(MaterialBindingKey, ::wgpu::BindGroup)>,
    }

    pub struct GlobeGpu {
        _instance: &'static ::wgpu::Instance,
        surface: ::wgpu::Surface<'static>,
        device: ::wgpu::Device,
        queue: ::wgpu::Queue,
        config: ::wgpu::SurfaceConfiguration,
        depth_view: ::wgpu::TextureView,
        globals_buffer: ::wgpu::Buffer,
        globals_bind_group: ::wgpu::BindGroup,
        material_layout: ::wgpu::BindGroupLayout,
        sky_layout: ::wgpu::BindGroupLayout,
        opaque_pipeline: ::wgpu::RenderPipeline,
        transparent_pipeline: ::wgpu::RenderPipeline,
        additive_pipeline: ::wgpu::RenderPipeline,
        skybox_pipeline: ::wgpu::RenderPipeline,
        sampler: ::wgpu::Sampler,
        white: ::wgpu::TextureView,
        meshes: HashMap<(u32, u32), GpuMesh>,
        textures: HashMap<TextureId, ::wgpu::TextureView>,
        cubes: HashMap<CubeTextureId, CubeUpload>,
        sky_bind_group: Option<::wgpu::BindGroup>,
        slots: Vec<DrawSlot>,
        /// Bumped whenever a 2D texture view is replaced.
        texture_generation: u64,
        uploads: UploadQueue,
    }

    impl std::fmt::Debug for GlobeGpu {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("GlobeGpu")
                .field("width", &self.config.width)
                .field("height", &self.config.height)
                .field("textures", &self.textures.len())
                .field("meshes", &self.meshes.len())
                .finish()
        }
    }

    fn create_depth_view(
        device: &::wgpu::Device,
        config: &::wgpu::SurfaceConfiguration,
    ) -> ::wgpu::TextureView {
        let tex = device.create_texture(&::wgpu::TextureDescriptor {
            label: Some("globe-depth"),
            size: ::wgpu::Extent3d {
                width: config.width.max(1),
                height: config.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: ::wgpu::TextureDimension::D2,
            format: ::wgpu::TextureFormat::Depth24Plus,
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        tex.create_view(&::wgpu::TextureViewDescriptor::default())
    }

    fn texture_entry(binding: u32) -> ::wgpu::BindGroupLayoutEntry {
        ::wgpu::BindGroupLayoutEntry {
            binding,
            visibility: ::wgpu::ShaderStages::FRAGMENT,
            ty: ::wgpu::BindingType::Texture {
                sample_type: ::wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: ::wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }
    }

    fn uniform_entry(binding: u32) -> ::wgpu::BindGroupLayoutEntry {
        ::wgpu::BindGroupLayoutEntry {
            binding,
            visibility: ::wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: ::wgpu::BindingType::Buffer {
                ty: ::wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }
    }

    fn upload_rgba(
        device: &::wgpu::Device,
        queue: &::wgpu::Queue,
        label: &str,
        image: &DecodedImage,
        format: ::wgpu::TextureFormat,
    ) -> ::wgpu::TextureView {
        let size = ::wgpu::Extent3d {
            width: image.width.max(1),
            height: image.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&::wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: ::wgpu::TextureDimension::D2,
            format,
            usage: ::wgpu::TextureUsages::TEXTURE_BINDING | ::wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            ::wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: ::wgpu::Origin3d::ZERO,
                aspect: ::wgpu::TextureAspect::All,
            },
            &image.rgba,
            ::wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.width),
                rows_per_image: None,
            },
            size,
        );
        texture.create_view(&::wgpu::TextureViewDescriptor::default())
    }

    #[allow(clippy::too_many_arguments)]
    fn mesh_pipeline(
        device: &::wgpu::Device,
        layout: &::wgpu::PipelineLayout,
        module: &::wgpu::ShaderModule,
        label: &str,
        format: ::wgpu::TextureFormat,
        blend: ::wgpu::BlendState,
        depth_write: bool,
        with_vertices: bool,
    ) -> ::wgpu::RenderPipeline {
        let vertex_layout = [::wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as ::wgpu::BufferAddress,
            step_mode: ::wgpu::VertexStepMode::Vertex,
            attributes: &::wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2],
        }];
        let buffers: &[::wgpu::VertexBufferLayout] = if with_vertices { &vertex_layout } else { &[] };
        device.create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: ::wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers,
            },
            fragment: Some(::wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(::wgpu::ColorTargetState {
                    format,
                    blend: Some(blend),
                    write_mask: ::wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: ::wgpu::PrimitiveState {
                topology: ::wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: ::wgpu::FrontFace::Ccw,
                cull_mode: if with_vertices {
                    Some(::wgpu::Face::Back)
                } else {
                    None
                },
                polygon_mode: ::wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(::wgpu::DepthStencilState {
                format: ::wgpu::TextureFormat::Depth24Plus,
                depth_write_enabled: depth_write,
                depth_compare: ::wgpu::CompareFunction::LessEqual,
                stencil: ::wgpu::StencilState::default(),
                bias: ::wgpu::DepthBiasState::default(),
            }),
            multisample: ::wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }

    impl GlobeGpu {
        pub async fn new(
            canvas: web_sys::HtmlCanvasElement,
            uploads: UploadQueue,
        ) -> Result<Self, JsValue> {
            let width = canvas.width();
            let height = canvas.height();

            // `wgpu::Surface` must not outlive its `wgpu::Instance`; the instance
            // is leaked for the lifetime of the page.
            let instance: &'static ::wgpu::Instance = Box::leak(Box::new(::wgpu::Instance::new(
                &::wgpu::InstanceDescriptor {
                    backends: ::wgpu::Backends::BROWSER_WEBGPU | ::wgpu::Backends::GL,
                    ..Default::default()
                },
            )));

            let surface = instance
                .create_surface(::wgpu::SurfaceTarget::Canvas(canvas))
                .map_err(|e| JsValue::from_str(&format!("surface error: {e}")))?;

            let adapter = instance
                .request_adapter(&::wgpu::RequestAdapterOptions {
                    power_preference: ::wgpu::PowerPreference::HighPerformance,
                    compatible_surface: Some(&surface),
                    force_fallback_adapter: false,
                })
                .await
                .map_err(|e| JsValue::from_str(&format!("adapter error: {e}")))?;

            let (device, queue) = adapter
                .request_device(&::wgpu::DeviceDescriptor {
                    label: Some("globe-device"),
                    required_features: ::wgpu::Features::empty(),
                    required_limits: ::wgpu::Limits::downlevel_webgl2_defaults(),
                    ..Default::default()
                })
                .await
                .map_err(|e| JsValue::from_str(&format!("device error: {e}")))?;

            let caps = surface.get_capabilities(&adapter);
            let format = caps
                .formats
                .iter()
                .copied()
                .find(|f| f.is_srgb())
                .or_else(|| caps.formats.first().copied())
                .ok_or_else(|| JsValue::from_str("surface reports no formats"))?;
            let alpha_mode = caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(::wgpu::CompositeAlphaMode::Auto);

            let config = ::wgpu::SurfaceConfiguration {
                usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
                format,
                width: width.max(1),
                height: height.max(1),
                desired_maximum_frame_latency: 2,
                present_mode: ::wgpu::PresentMode::Fifo,
                alpha_mode,
                view_formats: vec![],
            };
            surface.configure(&device, &config);
            let depth_view = create_depth_view(&device, &config);

            let globals_layout = device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
                label: Some("globe-globals-bgl"),
                entries: &[uniform_entry(0)],
            });
            let material_layout =
                device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
                    label: Some("globe-material-bgl"),
                    entries: &[
                        uniform_entry(0),
                        texture_entry(1),
                        texture_entry(2),
                        texture_entry(3),
                        texture_entry(4),
                        ::wgpu::BindGroupLayoutEntry {
                            binding: 5,
                            visibility: ::wgpu::ShaderStages::FRAGMENT,
                            ty: ::wgpu::BindingType::Sampler(::wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ],
                });
            let sky_layout = device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
                label: Some("globe-sky-bgl"),
                entries: &[
                    ::wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: ::wgpu::ShaderStages::FRAGMENT,
                        ty: ::wgpu::BindingType::Texture {
                            sample_type: ::wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: ::wgpu::TextureViewDimension::Cube,
                            multisampled: false,
                        },
                        count: None,
                    },
                    ::wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: ::wgpu::ShaderStages::FRAGMENT,
                        ty: ::wgpu::BindingType::Sampler(::wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

            let globals_buffer = device.create_buffer(&::wgpu::BufferDescriptor {
                label: Some("globe-globals"),
                size: std::mem::size_of::<Globals>() as u64,
                usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let globals_bind_group = device.create_bind_group(&::wgpu::BindGroupDescriptor {
                label: Some("globe-globals-bg"),
                layout: &globals_layout,
                entries: &[::wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                }],
            });

            let shader = |label: &str, body: &str| {
                device.create_shader_module(::wgpu::ShaderModuleDescriptor {
                    label: Some(label),
                    source: ::wgpu::ShaderSource::Wgsl(Cow::Owned(format!(
                        "{GLOBALS_WGSL}{MATERIAL_WGSL}{body}"
                    ))),
                })
            };
            let mesh_shader = shader("globe-mesh-shader", MESH_WGSL);
            let sprite_shader = shader("globe-sprite-shader", SPRITE_WGSL);
            let sky_shader = device.create_shader_module(::wgpu::ShaderModuleDescriptor {
                label: Some("globe-skybox-shader"),
                source: ::wgpu::ShaderSource::Wgsl(Cow::Owned(format!("{GLOBALS_WGSL}{SKYBOX_WGSL}"))),
            });

            let material_pipeline_layout =
                device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
                    label: Some("globe-material-pipeline-layout"),
                    bind_group_layouts: &[&globals_layout, &material_layout],
                    immediate_size: 0,
                });
            let sky_pipeline_layout =
                device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
                    label: Some("globe-sky-pipeline-layout"),
                    bind_group_layouts: &[&globals_layout, &sky_layout],
                    immediate_size: 0,
                });

            let additive = ::wgpu::BlendState {
                color: ::wgpu::BlendComponent {
                    src_factor: ::wgpu::BlendFactor::SrcAlpha,
                    dst_factor: ::wgpu::BlendFactor::One,
                    operation: ::wgpu::BlendOperation::Add,
                },
                alpha: ::wgpu::BlendComponent {
                    src_factor: ::wgpu::BlendFactor::One,
                    dst_factor: ::wgpu::BlendFactor::One,
                    operation: ::wgpu::BlendOperation::Add,
                },
            };

            let opaque_pipeline = mesh_pipeline(
                &device,
                &material_pipeline_layout,
                &mesh_shader,
                "globe-opaque-pipeline",
                format,
                ::wgpu::BlendState::REPLACE,
                true,
                true,
            );
            let transparent_pipeline = mesh_pipeline(
                &device,
                &material_pipeline_layout,
                &mesh_shader,
                "globe-transparent-pipeline",
                format,
                ::wgpu::BlendState::ALPHA_BLENDING,
                false,
                true,
            );
            let additive_pipeline = mesh_pipeline(
                &device,
                &material_pipeline_layout,
                &sprite_shader,
                "globe-additive-pipeline",
                format,
                additive,
                false,
                false,
            );

            let skybox_pipeline = device.create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
                label: Some("globe-skybox-pipeline"),
                layout: Some(&sky_pipeline_layout),
                vertex: ::wgpu::VertexState {
                    module: &sky_shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                fragment: Some(::wgpu::FragmentState {
                    module: &sky_shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(::wgpu::ColorTargetState {
                        format,
                        blend: Some(::wgpu::BlendState::REPLACE),
                        write_mask: ::wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: ::wgpu::PrimitiveState::default(),
                // Background: never writes depth, always passes.
                depth_stencil: Some(::wgpu::DepthStencilState {
                    format: ::wgpu::TextureFormat::Depth24Plus,
                    depth_write_enabled: false,
                    depth_compare: ::wgpu::CompareFunction::Always,
                    stencil: ::wgpu::StencilState::default(),
                    bias: ::wgpu::DepthBiasState::default(),
                }),
                multisample: ::wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

            let sampler = device.create_sampler(&::wgpu::SamplerDescriptor {
                label: Some("globe-sampler"),
                address_mode_u: ::wgpu::AddressMode::Repeat,
                address_mode_v: ::wgpu::AddressMode::ClampToEdge,
                mag_filter: ::wgpu::FilterMode::Linear,
                min_filter: ::wgpu::FilterMode::Linear,
                mipmap_filter: ::wgpu::MipmapFilterMode::Nearest,
                ..Default::default()
            });

            let white = upload_rgba(
                &device,
                &queue,
                "globe-white",
                &DecodedImage::solid(1, 1, [255, 255, 255, 255]),
                ::wgpu::TextureFormat::Rgba8Unorm,
            );

            Ok(Self {
                _instance: instance,
                surface,
                device,
                queue,
                config,
                depth_view,
                globals_buffer,
                globals_bind_group,
                material_layout,
                sky_layout,
                opaque_pipeline,
                transparent_pipeline,
                additive_pipeline,
                skybox_pipeline,
                sampler,
                white,
                meshes: HashMap::new(),
                textures: HashMap::new(),
                cubes: HashMap::new(),
                sky_bind_group: None,
                slots: Vec::new(),
                texture_generation: 0,
                uploads,
            })
        }

        fn resize_if_needed(&mut self, width: u32, height: u32) {
            let (width, height) = (width.max(1), height.max(1));
            if width == self.config.width && height == self.config.height {
                return;
            }
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
            debug!(width, height, "surface reconfigured");
        }

        fn drain_uploads(&mut self, ctx: &SceneContext) {
            let pending: Vec<_> = self.uploads.borrow_mut().drain(..).collect();
            for (slot, image) in pending {
                match slot {
                    TextureSlot::Texture(id) => {
                        let srgb = matches!(
                            ctx.assets.texture(id).map(|t| t.role),
                            Some(TextureRole::Color | TextureRole::Glow)
                        );
                        let format = if srgb {
                            ::wgpu::TextureFormat::Rgba8UnormSrgb
                        } else {
                            ::wgpu::TextureFormat::Rgba8Unorm
                        };
                        let view =
                            upload_rgba(&self.device, &self.queue, "globe-texture", &image, format);
                        self.textures.insert(id, view);
                        self.texture_generation += 1;
                    }
                    TextureSlot::CubeFace { cube, face } => self.upload_cube_face(cube, face, &image),
                }
            }
        }

        fn upload_cube_face(&mut self, cube: CubeTextureId, face: u8, image: &DecodedImage) {
            let (face_width, face_height) = (image.width, image.height);
            let size = face_width.min(face_height).max(1);
            let device = &self.device;
            let upload = self.cubes.entry(cube).or_insert_with(|| CubeUpload {
                texture: device.create_texture(&::wgpu::TextureDescriptor {
                    label: Some("globe-skybox-cube"),
                    size: ::wgpu::Extent3d {
                        width: size,
                        height: size,
                        depth_or_array_layers: 6,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: ::wgpu::TextureDimension::D2,
                    format: ::wgpu::TextureFormat::Rgba8UnormSrgb,
                    usage: ::wgpu::TextureUsages::TEXTURE_BINDING | ::wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                }),
                size,
                faces_done: 0,
            });

            let Some(image) = resize_square(image, upload.size) else {
                warn!(
                    face,
                    width = image.width,
                    height = image.height,
                    "cube face pixels do not match its size; face skipped"
                );
                return;
            };
            if image.width != face_width || image.height != face_height {
                debug!(face, size = upload.size, "cube face resampled to square");
            }

            self.queue.write_texture(
                ::wgpu::TexelCopyTextureInfo {
                    texture: &upload.texture,
                    mip_level: 0,
                    origin: ::wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: u32::from(face),
                    },
                    aspect: ::wgpu::TextureAspect::All,
                },
                &image.rgba,
                ::wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * upload.size),
                    rows_per_image: Some(upload.size),
                },
                ::wgpu::Extent3d {
                    width: upload.size,
                    height: upload.size,
                    depth_or_array_layers: 1,
                },
            );
            upload.faces_done |= 1 << face;

            if upload.faces_done == 0b11_1111 && self.sky_bind_group.is_none() {
                let view = upload.texture.create_view(&::wgpu::TextureViewDescriptor {
                    dimension: Some(::wgpu::TextureViewDimension::Cube),
                    ..Default::default()
                });
                self.sky_bind_group = Some(self.device.create_bind_group(&::wgpu::BindGroupDescriptor {
                    label: Some("globe-sky-bg"),
                    layout: &self.sky_layout,
                    entries: &[
                        ::wgpu::BindGroupEntry {
                            binding: 0,
                            resource: ::wgpu::BindingResource::TextureView(&view),
                        },
                        ::wgpu::BindGroupEntry {
                            binding: 1,
                            resource: ::wgpu::BindingResource::Sampler(&self.sampler),
                        },
                    ],
                }));
                debug!("skybox cube texture complete");
            }
        }

        fn mesh(&mut self, width_segments: u32, height_segments: u32) -> &GpuMesh {
            let device = &self.device;
            self.meshes
                .entry((width_segments, height_segments))
                .or_insert_with(|| {
                    let mesh = SphereMesh::generate(width_segments, height_segments);
                    let vertices: Vec<Vertex> = mesh
                        .vertices
                        .iter()
                        .map(|v| Vertex {
                            position: v.position,
                            normal: v.normal,
                            uv: v.uv,
                        })
                        .collect();
                    GpuMesh {
                        vertex_buffer: device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                            label: Some("globe-sphere-vertices"),
                            contents: bytemuck::cast_slice(&vertices),
                            usage: ::wgpu::BufferUsages::VERTEX,
                        }),
                        index_buffer: device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                            label: Some("globe-sphere-indices"),
                            contents: bytemuck::cast_slice(&mesh.indices),
                            usage: ::wgpu::BufferUsages::INDEX,
                        }),
                        index_count: mesh.index_count(),
                    }
                })
        }

        fn globals(frame: &RenderFrame) -> Globals {
            let mut lights = [GpuPointLight::default(); MAX_POINT_LIGHTS];
            let mut count = 0usize;
            for light in frame.point_lights().take(MAX_POINT_LIGHTS) {
                if let LightCommand::Point {
                    position,
                    color,
                    intensity,
                    distance,
                } = *light
                {
                    let p = position.to_f32();
                    lights[count] = GpuPointLight {
                        position: [p[0], p[1], p[2], distance],
                        color: [color.r * intensity, color.g * intensity, color.b * intensity, 1.0],
                    };
                    count += 1;
                }
            }

            // Camera basis vectors are the first two columns of the inverse view matrix.
            let cam = frame.view.view.inverse().unwrap_or_default();
            let right = cam.transform_vector(foundation::math::Vec3::new(1.0, 0.0, 0.0)).to_f32();
            let up = cam.transform_vector(foundation::math::Vec3::Y).to_f32();
            let eye = frame.view.camera_position.to_f32();
            let ambient = frame.ambient();

            Globals {
                view_proj: frame.view.view_projection.to_f32_cols(),
                skybox_inv_view_proj: frame.view.skybox_inv_view_projection.to_f32_cols(),
                camera_pos: [eye[0], eye[1], eye[2], 1.0],
                camera_right: [right[0], right[1], right[2], 0.0],
                camera_up: [up[0], up[1], up[2], 0.0],
                ambient: [ambient.r, ambient.g, ambient.b, count as f32],
                lights,
            }
        }

        fn material_uniform(cmd: &RenderCommand) -> MaterialUniform {
            let mut u = MaterialUniform {
                model: cmd.world.to_f32_cols(),
                color: [1.0, 1.0, 1.0, 1.0],
                specular: [0.0; 4],
                emissive: [0.0; 4],
                flags: [0.0; 4],
                extra: [0.0; 4],
            };

            if let Shape3D::Sphere { radius, .. } = cmd.shape {
                let scale = foundation::math::Mat4::scale(foundation::math::Vec3::new(radius, radius, radius));
                u.model = (cmd.world * scale).to_f32_cols();
            }
            if let Shape3D::Sprite { width, height } = cmd.shape {
                let s = cmd.world.scale_part();
                u.extra[1] = (width * s.x) as f32;
                u.extra[2] = (height * s.y) as f32;
            }

            match cmd.material {
                Material::Basic { color } => {
                    u.color = [color.r, color.g, color.b, 1.0];
                }
                Material::Phong(p) => {
                    u.color = [p.color.r, p.color.g, p.color.b, 1.0];
                    u.specular = [p.specular.r, p.specular.g, p.specular.b, p.shininess];
                    u.flags = [
                        2.0,
                        flag(p.map.is_some()),
                        if p.bump_map.is_some() { 1.0 } else { 0.0 },
                        flag(p.alpha_map.is_some()),
                    ];
                    u.extra[0] = flag(p.specular_map.is_some());
                }
                Material::Lambert { color, emissive } => {
                    u.color = [color.r, color.g, color.b, 1.0];
                    u.emissive = [emissive.r, emissive.g, emissive.b, 0.0];
                    u.flags[0] = 1.0;
                }
                Material::Sprite { color, map, .. } => {
                    u.color = [color.r, color.g, color.b, 1.0];
                    u.flags[1] = flag(map.is_some());
                }
                Material::Skybox { .. } => {}
            }
            u
        }

        fn material_bind_group(
            &self,
            buffer: &::wgpu::Buffer,
            key: &MaterialBindingKey,
        ) -> ::wgpu::BindGroup {
            let [map, bump, spec, alpha] = key.textures.map(|id| {
                id.and_then(|id| self.textures.get(&id)).unwrap_or(&self.white)
            });
            self.device.create_bind_group(&::wgpu::BindGroupDescriptor {
                label: Some("globe-material-bg"),
                layout: &self.material_layout,
                entries: &[
                    ::wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    },
                    ::wgpu::BindGroupEntry {
                        binding: 1,
                        resource: ::wgpu::BindingResource::TextureView(map),
                    },
                    ::wgpu::BindGroupEntry {
                        binding: 2,
                        resource: ::wgpu::BindingResource::TextureView(bump),
                    },
                    ::wgpu::BindGroupEntry {
                        binding: 3,
                        resource: ::wgpu::BindingResource::TextureView(spec),
                    },
                    ::wgpu::BindGroupEntry {
                        binding: 4,
                        resource: ::wgpu::BindingResource::TextureView(alpha),
                    },
                    ::wgpu::BindGroupEntry {
                        binding: 5,
                        resource: ::wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            })
        }

        pub fn draw(&mut self, ctx: &SceneContext) -> Result<(), RenderError> {
            self.resize_if_needed(ctx.surface.width as u32, ctx.surface.height as u32);
            self.drain_uploads(ctx);

            let frame = Renderer::collect(ctx);
            self.queue
                .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&Self::globals(&frame)));

            let draws: Vec<&RenderCommand> = frame
                .commands
                .iter()
                .filter(|c| c.pass != RenderPass::Skybox)
                .collect();
            for cmd in &draws {
                if let Shape3D::Sphere {
                    width_segments,
                    height_segments,
                    ..
                } = cmd.shape
                {
                    self.mesh(width_segments, height_segments);
                }
            }
            while self.slots.len() < draws.len() {
                self.slots.push(DrawSlot {
                    buffer: self.device.create_buffer(&::wgpu::BufferDescriptor {
                        label: Some("globe-material"),
                        size: std::mem::size_of::<MaterialUniform>() as u64,
                        usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
                        mapped_at_creation: false,
                    }),
                    binding: None,
                });
            }

            for (i, cmd) in draws.iter().enumerate() {
                self.queue.write_buffer(
                    &self.slots[i].buffer,
                    0,
                    bytemuck::bytes_of(&Self::material_uniform(cmd)),
                );
                let key = MaterialBindingKey::new(&cmd.material, self.texture_generation);
                if self.slots[i].binding.as_ref().map(|(k, _)| k) != Some(&key) {
                    let bind_group = self.material_bind_group(&self.slots[i].buffer, &key);
                    self.slots[i].binding = Some((key, bind_group));
                }
            }

            let surface_texture = match self.surface.get_current_texture() {
                Ok(t) => t,
                Err(e) => {
                    self.surface.configure(&self.device, &self.config);
                    return Err(RenderError::Surface(e.to_string()));
                }
            };
            let view = surface_texture
                .texture
                .create_view(&::wgpu::TextureViewDescriptor::default());

            let mut encoder = self
                .device
                .create_command_encoder(&::wgpu::CommandEncoderDescriptor {
                    label: Some("globe-encoder"),
                });
            {
                let mut rpass = encoder.begin_render_pass(&::wgpu::RenderPassDescriptor {
                    label: Some("globe-pass"),
                    color_attachments: &[Some(::wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        depth_slice: None,
                        ops: ::wgpu::Operations {
                            load: ::wgpu::LoadOp::Clear(::wgpu::Color::BLACK),
                            store: ::wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(::wgpu::RenderPassDepthStencilAttachment {
                        view: &self.depth_view,
                        depth_ops: Some(::wgpu::Operations {
                            load: ::wgpu::LoadOp::Clear(1.0),
                            store: ::wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                    multiview_mask: None,
                });
                rpass.set_bind_group(0, &self.globals_bind_group, &[]);

                if let Some(sky) = &self.sky_bind_group
                    && frame.pass(RenderPass::Skybox).next().is_some()
                {
                    rpass.set_pipeline(&self.skybox_pipeline);
                    rpass.set_bind_group(1, sky, &[]);
                    rpass.draw(0..3, 0..1);
                }

                for (cmd, slot) in draws.iter().zip(&self.slots) {
                    let Some((_, bind_group)) = &slot.binding else {
                        continue;
                    };
                    rpass.set_bind_group(1, bind_group, &[]);
                    match (cmd.pass, cmd.shape) {
                        (RenderPass::Additive, _) | (_, Shape3D::Sprite { .. }) => {
                            rpass.set_pipeline(&self.additive_pipeline);
                            rpass.draw(0..6, 0..1);
                        }
                        (
                            pass,
                            Shape3D::Sphere {
                                width_segments,
                                height_segments,
                                ..
                            },
                        ) => {
                            let Some(mesh) = self.meshes.get(&(width_segments, height_segments)) else {
                                continue;
                            };
                            let pipeline = if pass == RenderPass::Transparent {
                                &self.transparent_pipeline
                            } else {
                                &self.opaque_pipeline
                            };
                            rpass.set_pipeline(pipeline);
                            rpass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                            rpass.set_index_buffer(mesh.index_buffer.slice(..), ::wgpu::IndexFormat::Uint16);
                            rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
                        }
                        // Boxes only appear as the skybox, drawn above.
                        (_, Shape3D::Box { .. }) => {}
                    }
                }
            }

            self.queue.submit(std::iter::once(encoder.finish()));
            surface_texture.present();
            Ok(())
        }
    }

    fn flag(on: bool) -> f32 {
        if on { 1.0 } else { 0.0 }
    }

    impl FrameRenderer for GlobeGpu {
        type Error = RenderError;

        fn render(&mut self, ctx: &SceneContext) -> Result<(), RenderError> {
            self.draw(ctx)
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    use scene::SceneContext;
    use scene::animation::FrameRenderer;
    use wasm_bindgen::prelude::JsValue;

    use super::RenderError;
    use crate::textures::UploadQueue;

    #[derive(Debug, Default)]
    pub struct GlobeGpu;

    impl GlobeGpu {
        pub async fn new(
            _canvas: web_sys::HtmlCanvasElement,
            _uploads: UploadQueue,
        ) -> Result<Self, JsValue> {
            Err(JsValue::from_str(
                "wgpu initialization is only available on wasm32 targets",
            ))
        }
    }

    impl FrameRenderer for GlobeGpu {
        type Error = RenderError;

        fn render(&mut self, _ctx: &SceneContext) -> Result<(), RenderError> {
            Err(RenderError::Unavailable(
                "wgpu rendering is only available on wasm32 targets".to_string(),
            ))
        }
    }
}

pub use imp::GlobeGpu;

#[cfg(test)]
mod tests {
    use super::MaterialBindingKey;
    use scene::assets::TextureId;
    use scene::components::{Material, PhongMaterial, Rgb};

    fn earth() -> Material {
        Material::Phong(PhongMaterial {
            map: Some(TextureId(0)),
            bump_map: Some(TextureId(1)),
            ..PhongMaterial::default()
        })
    }

    #[test]
    fn colour_changes_reuse_the_bind_group() {
        let red = MaterialBindingKey::new(&Material::basic(Rgb::from_hex(0xff0000)), 3);
        let blue = MaterialBindingKey::new(&Material::basic(Rgb::from_hex(0x0000ff)), 3);
        assert_eq!(red, blue);
        assert_eq!(MaterialBindingKey::new(&earth(), 3), MaterialBindingKey::new(&earth(), 3));
    }

    #[test]
    fn texture_upload_invalidates_the_bind_group() {
        let before = MaterialBindingKey::new(&earth(), 0);
        let after = MaterialBindingKey::new(&earth(), 1);
        assert_ne!(before, after);
        assert_eq!(before.textures, [Some(TextureId(0)), Some(TextureId(1)), None, None]);
    }

    #[test]
    fn different_maps_get_different_bind_groups() {
        let sprite = Material::Sprite {
            color: Rgb::WHITE,
            map: Some(TextureId(4)),
            blending: scene::components::Blending::Additive,
        };
        let key = MaterialBindingKey::new(&sprite, 0);
        assert_eq!(key.textures, [Some(TextureId(4)), None, None, None]);
        assert_ne!(key, MaterialBindingKey::new(&earth(), 0));
    }
}
