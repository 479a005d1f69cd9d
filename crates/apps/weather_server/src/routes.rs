use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::WeatherError;
use crate::rate_limit::{limit_by_ip, RateLimiter};
use crate::upstream::{WeatherClient, WeatherQuery};

#[derive(Clone)]
pub struct AppState {
    pub api_key: Option<Arc<str>>,
    pub weather: WeatherClient,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn from_config(config: &ServerConfig, http: reqwest::Client) -> Self {
        Self {
            api_key: config.api_key().map(Arc::from),
            weather: WeatherClient::new(http, config.upstream_url.clone(), config.upstream_timeout()),
            limiter: Arc::new(RateLimiter::new(
                config.rate_limit_max,
                config.rate_limit_window(),
            )),
        }
    }
}

/// `/health` at the root, everything else under the rate-limited `/api`.
///
/// Serve with `into_make_service_with_connect_info::<SocketAddr>()`; the
/// limiter keys on the peer address.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/weather", get(get_weather))
        .fallback(api_not_found)
        .layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            limit_by_ip,
        ));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

async fn get_weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<serde_json::Value>, WeatherError> {
    let api_key = state.api_key.as_deref().ok_or(WeatherError::MissingApiKey)?;
    let location = query.location()?;
    let data = state.weather.current(&location, api_key).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

async fn api_not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::{router, AppState};
    use crate::config::ServerConfig;
    use crate::rate_limit::REJECTION_MESSAGE;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn spawn(app: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("serve");
        });
        addr
    }

    /// Fake upstream: `city=Nowhere` is 404, `city=Slow` and `lat=10&lon=10`
    /// stall, key `bad` is 401, `city=Broken` is 503, everything else echoes
    /// the query.
    async fn spawn_upstream(hits: Arc<AtomicUsize>) -> SocketAddr {
        let app = Router::new().route(
            "/data/2.5/weather",
            get(move |Query(q): Query<HashMap<String, String>>| {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    if q.get("appid").map(String::as_str) == Some("bad") {
                        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid API key" })));
                    }
                    let stalled_coords = q.get("lat").map(String::as_str) == Some("10")
                        && q.get("lon").map(String::as_str) == Some("10");
                    if stalled_coords {
                        tokio::time::sleep(Duration::from_secs(2)).await;
                        return (StatusCode::OK, Json(json!({})));
                    }
                    match q.get("q").map(String::as_str) {
                        Some("Nowhere") => {
                            (StatusCode::NOT_FOUND, Json(json!({ "message": "city not found" })))
                        }
                        Some("Broken") => (StatusCode::SERVICE_UNAVAILABLE, Json(json!({}))),
                        Some("Slow") => {
                            tokio::time::sleep(Duration::from_secs(2)).await;
                            (StatusCode::OK, Json(json!({})))
                        }
                        _ => (StatusCode::OK, Json(json!({ "echo": q.clone() }))),
                    }
                }
            }),
        );
        spawn(app).await
    }

    struct Harness {
        base: String,
        upstream_hits: Arc<AtomicUsize>,
        http: reqwest::Client,
    }

    async fn harness(api_key: Option<&str>, rate_limit_max: u32) -> Harness {
        let upstream_hits = Arc::new(AtomicUsize::new(0));
        let upstream = spawn_upstream(upstream_hits.clone()).await;
        let config = ServerConfig {
            api_key: api_key.map(str::to_string),
            upstream_url: format!("http://{upstream}"),
            upstream_timeout_ms: 200,
            rate_limit_max,
            ..ServerConfig::default()
        };
        let http = reqwest::Client::new();
        let addr = spawn(router(AppState::from_config(&config, http.clone()))).await;
        Harness {
            base: format!("http://{addr}"),
            upstream_hits,
            http,
        }
    }

    impl Harness {
        async fn get(&self, path: &str) -> (StatusCode, Value) {
            let resp = self
                .http
                .get(format!("{}{path}", self.base))
                .send()
                .await
                .expect("request");
            let status = StatusCode::from_u16(resp.status().as_u16()).expect("status");
            let body = resp.json::<Value>().await.unwrap_or(Value::Null);
            (status, body)
        }
    }

    #[tokio::test]
    async fn missing_location_is_400() {
        let h = harness(Some("key"), 100).await;
        let (status, body) = h.get("/api/weather").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Lat/lon or city name required");

        let (status, _) = h.get("/api/weather?lat=10").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(h.upstream_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn city_lookup_wraps_upstream_payload() {
        let h = harness(Some("key"), 100).await;
        let (status, body) = h.get("/api/weather?city=Paris&lat=1&lon=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["echo"]["q"], "Paris");
        assert_eq!(body["data"]["echo"]["appid"], "key");
        assert!(body["data"]["echo"].get("lat").is_none());
    }

    #[tokio::test]
    async fn coordinates_are_forwarded_verbatim() {
        let h = harness(Some("key"), 100).await;
        let (status, body) = h.get("/api/weather?lat=10.50&lon=-003").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["echo"]["lat"], "10.50");
        assert_eq!(body["data"]["echo"]["lon"], "-003");
    }

    #[tokio::test]
    async fn unknown_city_is_404() {
        let h = harness(Some("key"), 100).await;
        let (status, body) = h.get("/api/weather?city=Nowhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "City not found");
    }

    #[tokio::test]
    async fn slow_upstream_is_408() {
        let h = harness(Some("key"), 100).await;
        let (status, body) = h.get("/api/weather?city=Slow").await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body["error"], "Request timeout");

        let (status, body) = h.get("/api/weather?lat=10&lon=10").await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body["error"], "Request timeout");
        assert_eq!(h.upstream_hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn upstream_failures_are_masked_as_500() {
        let h = harness(Some("bad"), 100).await;
        let (status, body) = h.get("/api/weather?city=Paris").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Server authentication error");

        let h = harness(Some("key"), 100).await;
        let (status, body) = h.get("/api/weather?city=Broken").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch weather data");
    }

    #[tokio::test]
    async fn missing_key_is_500_before_validation() {
        let h = harness(None, 100).await;
        let (status, body) = h.get("/api/weather").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Server configuration error");
        assert_eq!(h.upstream_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn health_reports_iso_timestamp() {
        let h = harness(None, 100).await;
        let (status, body) = h.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        let ts = body["timestamp"].as_str().expect("timestamp string");
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok(), "bad timestamp {ts}");
        assert!(ts.ends_with('Z'));
    }

    #[tokio::test]
    async fn unknown_api_path_is_json_404() {
        let h = harness(Some("key"), 100).await;
        let (status, body) = h.get("/api/forecast").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found");
    }

    #[tokio::test]
    async fn request_past_the_ceiling_never_reaches_upstream() {
        let h = harness(Some("key"), 100).await;
        for _ in 0..100 {
            let (status, _) = h.get("/api/weather?city=Paris").await;
            assert_eq!(status, StatusCode::OK);
        }

        let resp = h
            .http
            .get(format!("{}/api/weather?city=Paris", h.base))
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status().as_u16(), 429);
        assert!(resp.headers().contains_key("retry-after"));
        assert_eq!(resp.headers()["ratelimit-remaining"], "0");
        assert_eq!(resp.text().await.expect("body"), REJECTION_MESSAGE);
        assert_eq!(h.upstream_hits.load(Ordering::SeqCst), 100);

        // Health is outside the limited prefix.
        let (status, _) = h.get("/health").await;
        assert_eq!(status, StatusCode::OK);
    }
}
