use std::sync::Arc;

use axum::{
    routing::{get, on},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::{
    common::{route_not_found, METHOD_FILTER_ALL},
    hateoas,
    middleware::base_url::BaseUrl,
    WebState,
};

mod simulation;
mod timelines;

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::resource!("/v1{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/", get(index))
        .nest_service("/timeline", timelines::routes())
        .nest_service("/simulation", simulation::routes(state))
        .layer(TraceLayer::new_for_http())
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn index(Extension(base_url): Extension<Arc<BaseUrl>>) -> Json<hateoas::Response<Value>> {
    hateoas::Response::builder(json!({ "version": "v1" }), base_url)
        .link("timeline", timelines::resource!(""))
        .link("timelineSchema", timelines::resource!("/schema"))
        .link("simulationStatus", simulation::resource!("/status"))
        .build()
        .json()
}
