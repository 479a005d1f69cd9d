//! Texture manifest and the loader driver.
//!
//! The scene only records *which* images it wants; hosts supply a
//! [`TextureSource`] that fetches and decodes them, and a sink that uploads
//! the pixels wherever they need to go.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CubeTextureId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureRole {
    Color,
    Bump,
    Specular,
    CloudAlpha,
    Glow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureEntry {
    pub role: TextureRole,
    pub url: String,
}

/// Six face URLs in `+X, -X, +Y, -Y, +Z, -Z` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CubeTextureEntry {
    pub faces: [String; 6],
}

/// Where a decoded image should be uploaded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Texture(TextureId),
    CubeFace { cube: CubeTextureId, face: u8 },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    textures: Vec<TextureEntry>,
    cubes: Vec<CubeTextureEntry>,
}

impl AssetManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_texture(&mut self, role: TextureRole, url: impl Into<String>) -> TextureId {
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(TextureEntry {
            role,
            url: url.into(),
        });
        id
    }

    pub fn add_cube(&mut self, faces: [String; 6]) -> CubeTextureId {
        let id = CubeTextureId(self.cubes.len() as u32);
        self.cubes.push(CubeTextureEntry { faces });
        id
    }

    pub fn texture(&self, id: TextureId) -> Option<&TextureEntry> {
        self.textures.get(id.0 as usize)
    }

    pub fn cube(&self, id: CubeTextureId) -> Option<&CubeTextureEntry> {
        self.cubes.get(id.0 as usize)
    }

    pub fn textures(&self) -> &[TextureEntry] {
        &self.textures
    }

    pub fn cubes(&self) -> &[CubeTextureEntry] {
        &self.cubes
    }

    pub fn find_role(&self, role: TextureRole) -> Option<TextureId> {
        self.textures
            .iter()
            .position(|t| t.role == role)
            .map(|idx| TextureId(idx as u32))
    }

    /// Every upload target with its source URL, 2D textures first.
    pub fn slots(&self) -> Vec<(TextureSlot, &str)> {
        let flat = self
            .textures
            .iter()
            .enumerate()
            .map(|(idx, t)| (TextureSlot::Texture(TextureId(idx as u32)), t.url.as_str()));
        let faces = self.cubes.iter().enumerate().flat_map(|(idx, c)| {
            c.faces.iter().enumerate().map(move |(face, url)| {
                (
                    TextureSlot::CubeFace {
                        cube: CubeTextureId(idx as u32),
                        face: face as u8,
                    },
                    url.as_str(),
                )
            })
        });
        flat.chain(faces).collect()
    }
}

/// Tightly packed RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let n = (width as usize) * (height as usize);
        Self {
            width,
            height,
            rgba: rgba.repeat(n),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("failed to decode {url}: {reason}")]
    Decode { url: String, reason: String },
}

#[allow(async_fn_in_trait)]
pub trait TextureSource {
    async fn load(&self, url: &str) -> Result<DecodedImage, AssetError>;
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub failed: usize,
}

/// Loads every image in `manifest` and hands each to `sink`.
///
/// Each distinct URL is fetched once. Failures are logged and counted but
/// never returned: a missing texture only degrades its material.
pub async fn load_textures<S, F>(manifest: &AssetManifest, source: &S, mut sink: F) -> LoadReport
where
    S: TextureSource,
    F: FnMut(TextureSlot, &DecodedImage),
{
    let mut cache: HashMap<&str, Option<DecodedImage>> = HashMap::new();
    let mut report = LoadReport::default();

    for (slot, url) in manifest.slots() {
        if !cache.contains_key(url) {
            let image = match source.load(url).await {
                Ok(image) => {
                    debug!(url, width = image.width, height = image.height, "texture loaded");
                    Some(image)
                }
                Err(err) => {
                    warn!(%err, "texture unavailable; material renders without it");
                    None
                }
            };
            cache.insert(url, image);
        }

        match cache.get(url) {
            Some(Some(image)) => {
                sink(slot, image);
                report.loaded += 1;
            }
            _ => report.failed += 1,
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::{
        AssetError, AssetManifest, DecodedImage, LoadReport, TextureRole, TextureSlot,
        TextureSource, load_textures,
    };
    use std::cell::RefCell;

    struct FakeSource {
        missing: &'static str,
        requests: RefCell<Vec<String>>,
    }

    impl TextureSource for FakeSource {
        async fn load(&self, url: &str) -> Result<DecodedImage, AssetError> {
            self.requests.borrow_mut().push(url.to_string());
            if url == self.missing {
                return Err(AssetError::Fetch {
                    url: url.to_string(),
                    reason: "404".to_string(),
                });
            }
            Ok(DecodedImage::solid(2, 2, [255, 255, 255, 255]))
        }
    }

    fn manifest() -> AssetManifest {
        let mut m = AssetManifest::new();
        m.add_texture(TextureRole::Color, "color.jpg");
        m.add_texture(TextureRole::Bump, "bump.jpg");
        m.add_cube(std::array::from_fn(|_| "sky.jpg".to_string()));
        m
    }

    #[test]
    fn failures_are_counted_not_propagated() {
        let source = FakeSource {
            missing: "bump.jpg",
            requests: RefCell::new(Vec::new()),
        };
        let mut delivered = Vec::new();
        let report = pollster::block_on(load_textures(&manifest(), &source, |slot, _| {
            delivered.push(slot)
        }));

        assert_eq!(report, LoadReport { loaded: 7, failed: 1 });
        assert_eq!(delivered.len(), 7);
        assert!(delivered.contains(&TextureSlot::CubeFace {
            cube: super::CubeTextureId(0),
            face: 5,
        }));
    }

    #[test]
    fn shared_urls_are_fetched_once() {
        let source = FakeSource {
            missing: "",
            requests: RefCell::new(Vec::new()),
        };
        let _ = pollster::block_on(load_textures(&manifest(), &source, |_, _| {}));
        assert_eq!(source.requests.borrow().len(), 3);
    }

    #[test]
    fn roles_are_discoverable() {
        let m = manifest();
        let bump = m.find_role(TextureRole::Bump).expect("bump");
        assert_eq!(m.texture(bump).map(|t| t.url.as_str()), Some("bump.jpg"));
        assert!(m.find_role(TextureRole::Glow).is_none());
        assert_eq!(m.slots().len(), 8);
    }
}
