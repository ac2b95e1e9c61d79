pub use crate::common::RouteResult;

use std::env;

use axum::{extract::FromRef, routing::on, Router};
use playback::DispatcherRef;
use tokio::net::TcpListener;

use crate::common::{route_not_found, METHOD_FILTER_ALL};

pub mod api;
pub mod common;
pub mod hateoas;
pub mod middleware;

#[derive(Clone, FromRef)]
pub struct WebState {
    pub dispatcher: DispatcherRef,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_owned(),
        }
    }
}

impl ServerConfig {
    /// Reads `WEB_BIND_ADDRESS`, falling back to `0.0.0.0:8080`.
    pub fn from_env() -> Self {
        match env::var("WEB_BIND_ADDRESS") {
            Ok(bind_address) if !bind_address.trim().is_empty() => Self {
                bind_address: bind_address.trim().to_owned(),
            },
            _ => Self::default(),
        }
    }
}

pub fn app(state: WebState) -> Router {
    Router::new()
        .nest_service("/api", api::routes(state))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

pub async fn start_web_server(config: ServerConfig, state: WebState) -> std::io::Result<()> {
    let listener = TcpListener::bind(&config.bind_address).await?;
    log::info!("control surface listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state).into_make_service()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use model::{route::Route, ExampleData};
    use playback::{Dispatcher, LogSink, PlaybackConfig, ProviderSpec};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    fn test_app() -> Router {
        let dispatcher = Dispatcher::new(
            Arc::new(LogSink),
            ProviderSpec::defaults(),
            PlaybackConfig::default(),
        )
        .spawn();
        app(WebState { dispatcher })
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn ping() {
        let app = test_app();
        let (status, body) = call(&app, Method::GET, "/api/ping", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "message": "pong!", "version": env!("CARGO_PKG_VERSION") })
        );
    }

    #[tokio::test]
    async fn api_index_links_to_versions() {
        let app = test_app();
        let (status, body) = call(&app, Method::GET, "/api", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["apiVersions"], json!(["v1"]));
        assert_eq!(body["links"][1]["rel"], "v1");
        assert_eq!(body["links"][1]["href"], "http://localhost/api/v1");
    }

    #[tokio::test]
    async fn timeline_spanning_too_long_is_rejected() {
        let app = test_app();
        let sample = |timestamp_ms: f64| {
            json!({
                "segmentId": "seg-1",
                "coordinate": { "latitude": 30.0, "longitude": 120.0 },
                "distanceFromStartM": 0.0,
                "timestampMs": timestamp_ms,
                "speedMps": 2.5
            })
        };
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/simulation/start",
            Some(json!({ "timeline": [sample(0.0), sample(1e300)] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "offset out of range");
    }

    #[tokio::test]
    async fn unknown_routes_are_json_404s() {
        let app = test_app();
        let (status, body) = call(&app, Method::GET, "/api/v1/nothing-here", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["requestedUri"], "/api/v1/nothing-here");
        assert_eq!(body["httpMethod"], "GET");
    }

    #[tokio::test]
    async fn builds_timeline_for_example_route() {
        let app = test_app();
        let request = json!({
            "route": Route::example_data(),
            "startAtMs": 1_000.0
        });
        let (status, body) = call(&app, Method::POST, "/api/v1/timeline", Some(request)).await;
        assert_eq!(status, StatusCode::OK);

        let samples = body["samples"].as_array().unwrap();
        assert!(samples.len() > 2);
        assert_eq!(samples[0]["timestampMs"], 1_000.0);
        assert!(body["summary"]["totalDistanceKm"].as_f64().unwrap() > 0.0);
        assert_eq!(body["links"][0]["rel"], "schema");
        assert!(body["debugInfo"]["benchmark"]["numSamples"].is_u64());
    }

    #[tokio::test]
    async fn missing_route_gives_empty_timeline() {
        let app = test_app();
        let (status, body) = call(&app, Method::POST, "/api/v1/timeline", Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["samples"], json!([]));
        assert_eq!(body["summary"]["averagePace"], 6.0);
    }

    #[tokio::test]
    async fn timeline_schema() {
        let app = test_app();
        let (status, body) = call(&app, Method::GET, "/api/v1/timeline/schema", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Timeline");

        let (status, _) = call(
            &app,
            Method::GET,
            "/api/v1/timeline/schema?exampleData=true",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn start_without_input_is_rejected() {
        let app = test_app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/simulation/start",
            Some(json!({ "timeline": [], "options": {} })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "missing input");
        assert_eq!(body["requestedUri"], "/api/v1/simulation/start");
    }

    #[tokio::test]
    async fn jump_without_target_is_rejected() {
        let app = test_app();
        let (status, body) =
            call(&app, Method::POST, "/api/v1/simulation/jump", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "missing input");
    }

    #[tokio::test]
    async fn simulation_lifecycle() {
        let app = test_app();

        let (status, body) = call(&app, Method::GET, "/api/v1/simulation/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "idle");

        let target = json!({ "targetCoordinate": { "latitude": 30.259, "longitude": 120.151 } });
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/simulation/start",
            Some(json!({ "options": target })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"], 1);
        assert_eq!(body["targetBroadcast"], true);
        assert_eq!(body["armed"].as_array().unwrap().len(), 3);

        let (_, body) = call(&app, Method::GET, "/api/v1/simulation/status", None).await;
        assert_eq!(body["state"], "active");
        assert_eq!(body["deliveriesPending"], true);

        let (status, body) = call(&app, Method::POST, "/api/v1/simulation/stop", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["session"], 1);
        assert_eq!(body["disarmed"].as_array().unwrap().len(), 3);

        let (_, body) = call(&app, Method::GET, "/api/v1/simulation/status", None).await;
        assert_eq!(body["state"], "idle");
    }

    #[test]
    fn server_config_defaults() {
        assert_eq!(ServerConfig::default().bind_address, "0.0.0.0:8080");
    }
}
