use crate::assets::{CubeTextureId, TextureId};

/// Linear RGB in `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// `0xRRGGBB`.
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
        Self::new(channel(16), channel(8), channel(0))
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Blending {
    Normal,
    Additive,
}

/// Blinn-Phong surface with optional texture layers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PhongMaterial {
    pub color: Rgb,
    pub specular: Rgb,
    pub shininess: f32,
    pub map: Option<TextureId>,
    pub bump_map: Option<TextureId>,
    pub specular_map: Option<TextureId>,
    pub alpha_map: Option<TextureId>,
    pub transparent: bool,
}

impl Default for PhongMaterial {
    fn default() -> Self {
        Self {
            color: Rgb::WHITE,
            specular: Rgb::from_hex(0x111111),
            shininess: 30.0,
            map: None,
            bump_map: None,
            specular_map: None,
            alpha_map: None,
            transparent: false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Material {
    /// Unlit flat color.
    Basic { color: Rgb },
    Phong(PhongMaterial),
    /// Diffuse-only, with a self-illumination term.
    Lambert { color: Rgb, emissive: Rgb },
    Sprite {
        color: Rgb,
        map: Option<TextureId>,
        blending: Blending,
    },
    /// Cube-mapped background, drawn behind everything without depth writes.
    Skybox { cube: CubeTextureId },
}

impl Material {
    pub fn basic(color: Rgb) -> Self {
        Self::Basic { color }
    }

    pub fn is_transparent(&self) -> bool {
        match self {
            Self::Phong(p) => p.transparent,
            _ => false,
        }
    }

    pub fn blending(&self) -> Blending {
        match self {
            Self::Sprite { blending, .. } => *blending,
            _ => Blending::Normal,
        }
    }
}
