use foundation::math::Vec2;
use tracing::debug;

use crate::context::SceneContext;
use crate::picking::pick_ray;

/// Render surface bounds in client pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl SurfaceRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Surface anchored at the client origin.
    pub fn sized(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }
}

/// Client pixels to normalized device coordinates (`[-1, 1]`, +Y up).
///
/// `None` for an empty surface.
pub fn screen_to_ndc(rect: &SurfaceRect, x: f64, y: f64) -> Option<Vec2> {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return None;
    }
    Some(Vec2::new(
        ((x - rect.left) / rect.width) * 2.0 - 1.0,
        -((y - rect.top) / rect.height) * 2.0 + 1.0,
    ))
}

/// Request to leave the globe for another page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationIntent {
    pub href: String,
}

/// Casts a ray through the click and tests it against the clickable marker
/// only. A hit yields the configured navigation target.
pub fn handle_click(ctx: &SceneContext, x: f64, y: f64) -> Option<NavigationIntent> {
    let ray = ctx.screen_ray(x, y)?;
    let hit = pick_ray(&ctx.world, ray, &[ctx.nodes.clickable_marker])?;
    debug!(distance = hit.distance, "clickable marker hit");
    Some(NavigationIntent {
        href: ctx.config.navigation_target.clone(),
    })
}

/// [`handle_click`] against the surface bounds as they are at click time.
///
/// Scrolling or a layout shift moves the canvas without a resize, so the
/// stored rect is replaced before the ray is cast.
pub fn handle_click_on(
    ctx: &mut SceneContext,
    surface: SurfaceRect,
    x: f64,
    y: f64,
) -> Option<NavigationIntent> {
    ctx.set_surface(surface);
    handle_click(ctx, x, y)
}
