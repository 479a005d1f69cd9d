//! Browser implementations of the scene's host interfaces.

use foundation::math::GeoPoint;
use js_sys::{Promise, Reflect};
use runtime::{Frame, FrameScheduler, IntervalTimer};
use scene::geolocation::{GeolocationError, Geolocator};
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

/// One frame per `requestAnimationFrame` callback.
#[derive(Debug, Default)]
pub struct RafScheduler {
    next_index: u64,
    prev_time_s: Option<f64>,
}

impl RafScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameScheduler for RafScheduler {
    async fn next_frame(&mut self) -> Option<Frame> {
        let timestamp_ms = match animation_frame().await {
            Ok(ts) => ts,
            Err(err) => {
                warn!(?err, "requestAnimationFrame unavailable; stopping the frame loop");
                return None;
            }
        };
        let time_s = timestamp_ms / 1000.0;
        let frame = Frame::at(self.next_index, time_s, self.prev_time_s);
        self.next_index += 1;
        self.prev_time_s = Some(time_s);
        Some(frame)
    }
}

async fn animation_frame() -> Result<f64, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("window missing"))?;
    let mut scheduled = Ok(0);
    let promise = Promise::new(&mut |resolve, _reject| {
        scheduled = window.request_animation_frame(&resolve);
    });
    scheduled?;
    let ts = JsFuture::from(promise).await?;
    Ok(ts.as_f64().unwrap_or_default())
}

/// `setTimeout`-driven interval; never exhausts while a window exists.
#[derive(Debug, Clone)]
pub struct TimeoutTimer {
    interval_ms: i32,
}

impl TimeoutTimer {
    pub fn every_secs(secs: u32) -> Self {
        Self {
            interval_ms: (secs.saturating_mul(1000)).min(i32::MAX as u32) as i32,
        }
    }
}

impl IntervalTimer for TimeoutTimer {
    async fn tick(&mut self) -> bool {
        match sleep_ms(self.interval_ms).await {
            Ok(()) => true,
            Err(err) => {
                warn!(?err, "setTimeout unavailable; stopping the timer");
                false
            }
        }
    }
}

async fn sleep_ms(ms: i32) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("window missing"))?;
    let mut scheduled = Ok(0);
    let promise = Promise::new(&mut |resolve, _reject| {
        scheduled = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms);
    });
    scheduled?;
    JsFuture::from(promise).await?;
    Ok(())
}

/// `navigator.geolocation.getCurrentPosition`, as a future.
#[derive(Debug, Default, Copy, Clone)]
pub struct BrowserGeolocation;

impl Geolocator for BrowserGeolocation {
    async fn current_position(&self) -> Result<GeoPoint, GeolocationError> {
        let geolocation = web_sys::window()
            .and_then(|w| w.navigator().geolocation().ok())
            .ok_or(GeolocationError::Unsupported)?;

        let promise = Promise::new(&mut |resolve, reject| {
            if let Err(err) = geolocation.get_current_position_with_error_callback(&resolve, Some(&reject)) {
                let _ = reject.call1(&JsValue::NULL, &err);
            }
        });

        match JsFuture::from(promise).await {
            Ok(position) => read_position(&position),
            Err(err) => Err(position_error(&err)),
        }
    }
}

fn read_position(position: &JsValue) -> Result<GeoPoint, GeolocationError> {
    let coords = Reflect::get(position, &JsValue::from_str("coords"))
        .map_err(|_| GeolocationError::Unavailable("position without coords".to_string()))?;
    let field = |name: &str| {
        Reflect::get(&coords, &JsValue::from_str(name))
            .ok()
            .and_then(|v| v.as_f64())
            .ok_or_else(|| GeolocationError::Unavailable(format!("missing {name}")))
    };
    Ok(GeoPoint::new(field("latitude")?, field("longitude")?))
}

fn position_error(err: &JsValue) -> GeolocationError {
    let code = Reflect::get(err, &JsValue::from_str("code"))
        .ok()
        .and_then(|v| v.as_f64());
    let message = Reflect::get(err, &JsValue::from_str("message"))
        .ok()
        .and_then(|v| v.as_string())
        .unwrap_or_default();
    error_from_code(code, message)
}

/// Maps a `GeolocationPositionError.code` to the scene's error type.
pub(crate) fn error_from_code(code: Option<f64>, message: String) -> GeolocationError {
    match code.map(|c| c as u32) {
        Some(1) => GeolocationError::PermissionDenied,
        Some(3) => GeolocationError::Timeout,
        _ => GeolocationError::Unavailable(message),
    }
}

/// Full page navigation.
pub fn navigate(href: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("window missing"))?;
    window.location().set_href(href)
}

#[cfg(test)]
mod tests {
    use super::{TimeoutTimer, error_from_code};
    use scene::geolocation::GeolocationError;

    #[test]
    fn position_error_codes_map_to_variants() {
        assert_eq!(error_from_code(Some(1.0), String::new()), GeolocationError::PermissionDenied);
        assert_eq!(error_from_code(Some(3.0), String::new()), GeolocationError::Timeout);
        assert_eq!(
            error_from_code(Some(2.0), "no fix".to_string()),
            GeolocationError::Unavailable("no fix".to_string())
        );
        assert_eq!(
            error_from_code(None, "odd".to_string()),
            GeolocationError::Unavailable("odd".to_string())
        );
    }

    #[test]
    fn timer_interval_saturates() {
        assert_eq!(TimeoutTimer::every_secs(60).interval_ms, 60_000);
        assert_eq!(TimeoutTimer::every_secs(u32::MAX).interval_ms, i32::MAX);
    }
}
