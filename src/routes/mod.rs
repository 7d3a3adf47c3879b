use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa_swagger_ui::SwaggerUi;

use crate::openapi::openapi_with_security;
use crate::state::AppState;

pub mod condition_checks;
pub mod documents;
pub mod drivers;
pub mod flow_records;
pub mod health;
pub mod inspections;
pub mod pending;
pub mod reports;
pub mod upload;
pub mod vehicles;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", openapi_with_security()))
        .merge(health::routes())
        .merge(vehicles::routes())
        .merge(drivers::routes())
        .merge(documents::routes())
        .merge(flow_records::routes())
        .merge(inspections::routes())
        .merge(pending::routes())
        .merge(condition_checks::routes())
        .merge(reports::routes())
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_request(|_request: &axum::http::Request<_>, _span: &tracing::Span| {
                    tracing::debug!("request started");
                })
                .on_response(|response: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                    tracing::info!(
                        status = %response.status(),
                        latency_ms = latency.as_millis(),
                        "request completed"
                    );
                })
        )
        .with_state(state)
}
