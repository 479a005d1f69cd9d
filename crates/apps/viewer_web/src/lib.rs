use console_error_panic_hook::set_once;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use foundation::time::SystemUtcClock;
use scene::animation::AnimationLoop;
use scene::assets::load_textures;
use scene::geolocation::Geolocator;
use scene::interaction::{SurfaceRect, handle_click_on};
use scene::prefabs::{CAMERA_FOV_DEG, build_globe_scene};
use scene::rotation::{REFRESH_INTERVAL_SECS, run_rotation_refresh};
use scene::{GlobeConfig, SceneContext};
use tracing::{debug, error, info};

mod browser;
mod textures;
mod wgpu;

use browser::{BrowserGeolocation, RafScheduler, TimeoutTimer, navigate};
use textures::{HttpTextureSource, UploadQueue};
use wgpu::GlobeGpu;

pub const DEFAULT_CANVAS_ID: &str = "globe-canvas";

thread_local! {
    static SCENE: RefCell<Option<Rc<RefCell<SceneContext>>>> = const { RefCell::new(None) };
}

fn with_scene(f: impl FnOnce(&mut SceneContext)) {
    SCENE.with(|slot| {
        if let Some(ctx) = slot.borrow().as_ref() {
            f(&mut ctx.borrow_mut());
        }
    });
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    tracing_wasm::set_as_global_default();
    Ok(())
}

/// Builds the globe on `canvas_id` and starts the frame loop.
#[wasm_bindgen]
pub fn run_globe(canvas_id: Option<String>) {
    let canvas_id = canvas_id.unwrap_or_else(|| DEFAULT_CANVAS_ID.to_string());
    spawn_local(async move {
        if let Err(err) = run_globe_inner(&canvas_id).await {
            error!(?err, "globe startup failed");
        }
    });
}

/// Surface size in CSS pixels; call from the page's resize handler.
#[wasm_bindgen]
pub fn set_canvas_size(width: f64, height: f64) {
    with_scene(|ctx| ctx.resize(width, height));
}

/// Orbit around the globe.
///
/// Intended usage: call with pointer delta in pixels.
#[wasm_bindgen]
pub fn camera_orbit(delta_x_px: f64, delta_y_px: f64) {
    with_scene(|ctx| ctx.orbit.rotate(delta_x_px, delta_y_px));
}

/// Pan the orbit target.
#[wasm_bindgen]
pub fn camera_pan(delta_x_px: f64, delta_y_px: f64) {
    with_scene(|ctx| {
        let height = ctx.surface.height;
        ctx.orbit.pan(delta_x_px, delta_y_px, height, CAMERA_FOV_DEG);
    });
}

/// Zoom (dolly) in/out.
///
/// Intended usage: call with wheel deltaY.
#[wasm_bindgen]
pub fn camera_zoom(wheel_delta_y: f64) {
    with_scene(|ctx| ctx.orbit.zoom(wheel_delta_y));
}

fn canvas_rect(canvas: &web_sys::HtmlCanvasElement) -> SurfaceRect {
    let rect = canvas.get_bounding_client_rect();
    SurfaceRect::new(rect.left(), rect.top(), rect.width(), rect.height())
}

async fn run_globe_inner(canvas_id: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("window missing"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("document missing"))?;
    let canvas: web_sys::HtmlCanvasElement = document
        .get_element_by_id(canvas_id)
        .ok_or_else(|| JsValue::from_str(&format!("canvas #{canvas_id} not found")))?
        .dyn_into()?;

    let width = window.inner_width()?.as_f64().unwrap_or(1280.0);
    let height = window.inner_height()?.as_f64().unwrap_or(720.0);
    canvas.set_width(width as u32);
    canvas.set_height(height as u32);

    let mut ctx = build_globe_scene(GlobeConfig::default(), &SystemUtcClock, width, height);
    ctx.set_surface(canvas_rect(&canvas));
    let offset = ctx.config.degree_offset;
    let rotation = ctx.rotation.clone();
    let manifest = ctx.assets.clone();

    let ctx = Rc::new(RefCell::new(ctx));
    SCENE.with(|slot| *slot.borrow_mut() = Some(ctx.clone()));

    spawn_local(run_rotation_refresh(
        rotation,
        SystemUtcClock,
        offset,
        TimeoutTimer::every_secs(REFRESH_INTERVAL_SECS),
    ));

    let uploads: UploadQueue = Rc::default();
    {
        let uploads = uploads.clone();
        spawn_local(async move {
            let report = load_textures(&manifest, &HttpTextureSource, |slot, image| {
                uploads.borrow_mut().push((slot, image.clone()));
            })
            .await;
            info!(loaded = report.loaded, failed = report.failed, "texture loading finished");
        });
    }

    {
        let ctx = ctx.clone();
        spawn_local(async move {
            let location = BrowserGeolocation.current_position().await;
            ctx.borrow_mut().apply_live_location(location);
        });
    }

    install_listeners(&window, &canvas, &ctx)?;

    let mut renderer = GlobeGpu::new(canvas, uploads).await?;
    debug!(?renderer, "renderer ready");
    let mut scheduler = RafScheduler::new();
    AnimationLoop::new().run(&ctx, &mut scheduler, &mut renderer).await;
    Ok(())
}

fn install_listeners(
    window: &web_sys::Window,
    canvas: &web_sys::HtmlCanvasElement,
    ctx: &Rc<RefCell<SceneContext>>,
) -> Result<(), JsValue> {
    let on_click = {
        let ctx = ctx.clone();
        let canvas = canvas.clone();
        Closure::<dyn FnMut(web_sys::MouseEvent)>::new(move |event: web_sys::MouseEvent| {
            let intent = handle_click_on(
                &mut ctx.borrow_mut(),
                canvas_rect(&canvas),
                f64::from(event.client_x()),
                f64::from(event.client_y()),
            );
            if let Some(intent) = intent {
                info!(href = %intent.href, "marker clicked");
                if let Err(err) = navigate(&intent.href) {
                    error!(?err, "navigation failed");
                }
            }
        })
    };
    canvas.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
    on_click.forget();

    let on_resize = {
        let ctx = ctx.clone();
        let canvas = canvas.clone();
        let window = window.clone();
        Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
            let width = window.inner_width().ok().and_then(|v| v.as_f64());
            let height = window.inner_height().ok().and_then(|v| v.as_f64());
            if let (Some(width), Some(height)) = (width, height) {
                canvas.set_width(width as u32);
                canvas.set_height(height as u32);
            }
            ctx.borrow_mut().set_surface(canvas_rect(&canvas));
        })
    };
    window.add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())?;
    on_resize.forget();

    Ok(())
}
