//! Texture fetching and decoding for the browser host.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_net::http::Request;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use scene::assets::{AssetError, DecodedImage, TextureSlot, TextureSource};

/// WebGL2's guaranteed 2D texture limit.
pub const MAX_TEXTURE_SIZE: u32 = 2048;

/// Decoded images waiting for the GPU; drained by the renderer each frame.
pub type UploadQueue = Rc<RefCell<Vec<(TextureSlot, DecodedImage)>>>;

/// Fetches over HTTP (CORS) and decodes PNG/JPEG.
#[derive(Debug, Default, Copy, Clone)]
pub struct HttpTextureSource;

impl TextureSource for HttpTextureSource {
    async fn load(&self, url: &str) -> Result<DecodedImage, AssetError> {
        let fetch_err = |reason: String| AssetError::Fetch {
            url: url.to_string(),
            reason,
        };

        let resp = Request::get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        if !resp.ok() {
            return Err(fetch_err(format!("HTTP {}", resp.status())));
        }
        let bytes = resp.binary().await.map_err(|e| fetch_err(e.to_string()))?;
        decode(url, &bytes)
    }
}

/// Decodes to RGBA8, shrinking anything larger than [`MAX_TEXTURE_SIZE`].
pub fn decode(url: &str, bytes: &[u8]) -> Result<DecodedImage, AssetError> {
    let image = image::load_from_memory(bytes).map_err(|e| AssetError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    Ok(to_decoded(fit_to_limit(image)))
}

fn fit_to_limit(image: DynamicImage) -> DynamicImage {
    if image.width() <= MAX_TEXTURE_SIZE && image.height() <= MAX_TEXTURE_SIZE {
        return image;
    }
    image.resize(MAX_TEXTURE_SIZE, MAX_TEXTURE_SIZE, FilterType::Triangle)
}

/// Stretches `image` to `size` x `size`. Cube faces must all share one square
/// size, so mismatched faces are resampled instead of dropped.
///
/// `None` if the pixel buffer does not match the stated dimensions.
pub fn resize_square(image: &DecodedImage, size: u32) -> Option<DecodedImage> {
    if image.width == size && image.height == size {
        return Some(image.clone());
    }
    let rgba = RgbaImage::from_raw(image.width, image.height, image.rgba.clone())?;
    let resized = imageops::resize(&rgba, size, size, FilterType::Triangle);
    Some(DecodedImage {
        width: size,
        height: size,
        rgba: resized.into_raw(),
    })
}

fn to_decoded(image: DynamicImage) -> DecodedImage {
    let rgba = image.to_rgba8();
    DecodedImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    }
}
