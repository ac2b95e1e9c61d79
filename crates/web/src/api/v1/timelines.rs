use std::{sync::Arc, time::Instant};

use axum::{
    extract::OriginalUri,
    http::Method,
    routing::{get, on, post},
    Extension, Json, Router,
};
use model::{route::Route, timeline::Timeline};
use serde::{Deserialize, Serialize};
use timeline::BuildOptions;

use crate::{
    common::{route_not_found, schema, HateoasResult, RouteErrorResponse, METHOD_FILTER_ALL},
    hateoas,
    middleware::base_url::BaseUrl,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/timeline{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes() -> Router {
    Router::new()
        .route("/", post(build_timeline))
        .route("/schema", get(schema::<Timeline>))
        .route("/route/schema", get(schema::<Route>))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildRequest {
    #[serde(default)]
    route: Option<Route>,
    #[serde(default)]
    start_at_ms: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildBenchmark {
    build_secs: f64,
    num_samples: usize,
}

async fn build_timeline(
    OriginalUri(original_uri): OriginalUri,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(request): Json<BuildRequest>,
) -> HateoasResult<Timeline> {
    let now = Instant::now();
    let options = BuildOptions {
        start_at_ms: request.start_at_ms,
    };
    let timeline = timeline::build(request.route.as_ref(), options).map_err(|why| {
        RouteErrorResponse::from(why)
            .with_method(&Method::POST)
            .with_uri(original_uri.path())
    })?;

    let benchmark = BuildBenchmark {
        build_secs: now.elapsed().as_secs_f64(),
        num_samples: timeline.samples.len(),
    };

    Ok(hateoas::Response::builder(timeline, base_url)
        .link("schema", resource!("/schema"))
        .link("start", super::simulation::resource!("/start"))
        .debug_info("benchmark", benchmark)
        .build()
        .json())
}
