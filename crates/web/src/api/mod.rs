use std::sync::Arc;

use axum::{
    routing::{get, on},
    Extension, Json, Router,
};
use serde::Serialize;

pub mod v1;

use crate::{
    common::{route_not_found, METHOD_FILTER_ALL},
    hateoas,
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        format!("/api{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub fn routes(state: WebState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ping", get(ping))
        .nest_service("/v1", v1::routes(state))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiInfo {
    service: &'static str,
    version: &'static str,
    api_versions: Vec<&'static str>,
}

/// Entry point for clients: what is running and where the versioned API lives.
async fn index(Extension(base_url): Extension<Arc<BaseUrl>>) -> Json<hateoas::Response<ApiInfo>> {
    let info = ApiInfo {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        api_versions: vec!["v1"],
    };
    hateoas::Response::builder(info, base_url)
        .link("ping", resource!("/ping"))
        .link("v1", v1::resource!(""))
        .build()
        .json()
}

#[derive(Debug, Serialize)]
struct Pong {
    message: &'static str,
    version: &'static str,
}

async fn ping() -> Json<Pong> {
    Json(Pong {
        message: "pong!",
        version: env!("CARGO_PKG_VERSION"),
    })
}
