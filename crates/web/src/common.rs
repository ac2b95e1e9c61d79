use axum::{
    extract::{OriginalUri, Query, Request},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::MethodFilter,
    Json,
};
use model::ExampleData;
use playback::{DispatcherError, StartError};
use schemars::{schema_for, schema_for_value, JsonSchema};
use serde::{Deserialize, Serialize};
use timeline::TimelineError;

use crate::hateoas;

pub type RouteResult<O> = Result<O, RouteErrorResponse>;
pub type HateoasResult<O> = RouteResult<Json<hateoas::Response<O>>>;

/// A `MethodFilter` that matches all http methods.
pub(crate) const METHOD_FILTER_ALL: MethodFilter = MethodFilter::GET
    .or(MethodFilter::POST)
    .or(MethodFilter::PATCH)
    .or(MethodFilter::PUT)
    .or(MethodFilter::DELETE);

// - Services returning commonly used responses -

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SchemaParams {
    #[serde(default = "Default::default")]
    example_data: bool,
}

pub(crate) async fn schema<T: ExampleData + JsonSchema + Serialize>(
    Query(params): Query<SchemaParams>,
) -> impl IntoResponse {
    if params.example_data {
        Json(schema_for_value!(T::example_data()))
    } else {
        Json(schema_for!(T))
    }
}

pub(crate) async fn route_not_found(
    OriginalUri(original_uri): OriginalUri,
    req: Request,
) -> impl IntoResponse {
    RouteErrorResponse::not_found(req.method(), original_uri.path())
}

// - Commonly used responeses -

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteErrorResponse {
    #[serde(skip)]
    pub status_code: StatusCode,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_uri: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_information: Option<String>,
}

impl RouteErrorResponse {
    pub fn new(status_code: StatusCode) -> Self {
        Self {
            status_code,
            http_method: None,
            requested_uri: None,
            message: None,
            detailed_information: None,
        }
    }

    pub fn not_found(method: &Method, uri: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND)
            .with_method(method)
            .with_uri(uri)
            .with_default_message()
    }

    pub fn with_method(mut self, method: &Method) -> Self {
        self.http_method = Some(method.to_string());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.requested_uri = Some(uri.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_default_message(self) -> Self {
        let message = self
            .status_code
            .canonical_reason()
            .unwrap_or("i dunno what happened here :/");
        self.with_message(message)
    }

    pub fn with_detailed_information(mut self, message: impl Into<String>) -> Self {
        self.detailed_information = Some(message.into());
        self
    }
}

impl From<TimelineError> for RouteErrorResponse {
    fn from(value: TimelineError) -> Self {
        Self::new(StatusCode::BAD_REQUEST)
            .with_message(value.reason())
            .with_detailed_information(value.to_string())
    }
}

impl From<StartError> for RouteErrorResponse {
    fn from(value: StartError) -> Self {
        let status_code = match value {
            StartError::MissingInput
            | StartError::NonFiniteCoordinate
            | StartError::OffsetOutOfRange => StatusCode::BAD_REQUEST,
            StartError::SinkArmFailure(_) => StatusCode::BAD_GATEWAY,
            StartError::Dispatcher(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status_code)
            .with_message(value.reason())
            .with_detailed_information(value.to_string())
    }
}

impl From<DispatcherError> for RouteErrorResponse {
    fn from(value: DispatcherError) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE)
            .with_message("dispatcher unavailable")
            .with_detailed_information(value.to_string())
    }
}

impl IntoResponse for RouteErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status_code, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use model::route::Segment;
    use playback::{ProviderOutcome, SinkError};

    use super::*;

    #[test]
    fn start_errors_map_to_status_codes() {
        let missing = RouteErrorResponse::from(StartError::MissingInput);
        assert_eq!(missing.status_code, StatusCode::BAD_REQUEST);
        assert_eq!(missing.message.as_deref(), Some("missing input"));

        let arm_failure = RouteErrorResponse::from(StartError::SinkArmFailure(vec![
            ProviderOutcome::new("gps", Err(SinkError::Unavailable("no permission".into()))),
        ]));
        assert_eq!(arm_failure.status_code, StatusCode::BAD_GATEWAY);
        assert_eq!(arm_failure.message.as_deref(), Some("sink arm failure"));

        let out_of_range = RouteErrorResponse::from(StartError::OffsetOutOfRange);
        assert_eq!(out_of_range.status_code, StatusCode::BAD_REQUEST);
        assert_eq!(out_of_range.message.as_deref(), Some("offset out of range"));

        let gone = RouteErrorResponse::from(StartError::Dispatcher(DispatcherError::Closed));
        assert_eq!(gone.status_code, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn timeline_errors_are_bad_requests() {
        let response = RouteErrorResponse::from(TimelineError::NonFiniteCoordinate {
            segment_id: Segment::new("seg-1", vec![]).id,
            index: 2,
        });
        assert_eq!(response.status_code, StatusCode::BAD_REQUEST);
        assert_eq!(response.message.as_deref(), Some("non-finite coordinate"));
    }

    #[test]
    fn error_body_skips_missing_fields() {
        let body = serde_json::to_value(RouteErrorResponse::not_found(&Method::GET, "/api/nope"))
            .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "httpMethod": "GET",
                "requestedUri": "/api/nope",
                "message": "Not Found"
            })
        );
    }
}
