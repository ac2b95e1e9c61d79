use std::sync::Arc;

use axum::{
    extract::{OriginalUri, State},
    http::Method,
    routing::{get, on, post},
    Extension, Json, Router,
};
use model::{simulation::SimulationOptions, timeline::Sample};
use playback::{StartReport, Status, StopReport};
use serde::Deserialize;

use crate::{
    common::{route_not_found, schema, HateoasResult, RouteErrorResponse, METHOD_FILTER_ALL},
    hateoas,
    middleware::base_url::BaseUrl,
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/simulation{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/start", post(start))
        .route("/jump", post(jump))
        .route("/stop", post(stop))
        .route("/status", get(status))
        .route("/options/schema", get(schema::<SimulationOptions>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest {
    #[serde(default)]
    timeline: Vec<Sample>,
    #[serde(default)]
    options: SimulationOptions,
}

async fn start(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { dispatcher }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(request): Json<StartRequest>,
) -> HateoasResult<StartReport> {
    dispatcher
        .start(request.timeline, request.options)
        .await
        .map(|report| started_hateoas(report, base_url).json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::POST)
                .with_uri(original_uri.path())
        })
}

async fn jump(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { dispatcher }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(options): Json<SimulationOptions>,
) -> HateoasResult<StartReport> {
    dispatcher
        .jump_to(options)
        .await
        .map(|report| started_hateoas(report, base_url).json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::POST)
                .with_uri(original_uri.path())
        })
}

async fn stop(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { dispatcher }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<StopReport> {
    dispatcher
        .stop()
        .await
        .map(|report| {
            hateoas::Response::builder(report, base_url)
                .link("status", resource!("/status"))
                .link("start", resource!("/start"))
                .build()
                .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::POST)
                .with_uri(original_uri.path())
        })
}

async fn status(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { dispatcher }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<Status> {
    dispatcher
        .status()
        .await
        .map(|status| {
            hateoas::Response::builder(status, base_url)
                .link("self", resource!("/status"))
                .link("start", resource!("/start"))
                .link("jump", resource!("/jump"))
                .link("stop", resource!("/stop"))
                .build()
                .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

fn started_hateoas(report: StartReport, base_url: Arc<BaseUrl>) -> hateoas::Response<StartReport> {
    hateoas::Response::builder(report, base_url)
        .link("status", resource!("/status"))
        .link("stop", resource!("/stop"))
        .build()
}
