use std::{any::Any, time::Duration};

use axum::{
    Router,
    http::{HeaderName, Request, Uri},
    response::{IntoResponse, Response},
    routing::get,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    services::{
        catalog_service::{BrandResource, CategoryResource, ProductResource},
        feedback_service::{AnswerResource, CommentResource, QuestionResource},
        history_service::{AdminLogResource, AuthHistoryResource},
        marketing_service::{BannerResource, CouponResource},
        order_service::{BasketResource, OrderResource, PaymentResource, TransactionResource},
        role_service::RoleResource,
        user_service::UserResource,
    },
    state::AppState,
};

use self::resources::ResourceRouter;

pub mod auth;
pub mod doc;
pub mod health;
pub mod params;
pub mod resources;
pub mod website;

const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_BODY_BYTES: usize = 1024 * 1024;
const MAX_IN_FLIGHT: usize = 100;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/website", website::router())
        .nest("/roles", ResourceRouter::<RoleResource>::crud().into_router())
        .nest(
            "/users",
            ResourceRouter::<UserResource>::new()
                .with_update()
                .with_delete()
                .into_router(),
        )
        .nest("/categories", ResourceRouter::<CategoryResource>::crud().into_router())
        .nest("/brands", ResourceRouter::<BrandResource>::crud().into_router())
        .nest("/products", ResourceRouter::<ProductResource>::crud().into_router())
        .nest("/coupons", ResourceRouter::<CouponResource>::crud().into_router())
        .nest("/banners", ResourceRouter::<BannerResource>::crud().into_router())
        .nest("/baskets", ResourceRouter::<BasketResource>::crud().into_router())
        .nest("/orders", ResourceRouter::<OrderResource>::crud().into_router())
        .nest("/payments", ResourceRouter::<PaymentResource>::crud().into_router())
        .nest(
            "/transactions",
            ResourceRouter::<TransactionResource>::new().into_router(),
        )
        .nest("/comments", ResourceRouter::<CommentResource>::crud().into_router())
        .nest("/questions", ResourceRouter::<QuestionResource>::crud().into_router())
        .nest("/answers", ResourceRouter::<AnswerResource>::crud().into_router())
        .nest(
            "/admin-logs",
            ResourceRouter::<AdminLogResource>::new().into_router(),
        )
        .nest(
            "/auth-histories",
            ResourceRouter::<AuthHistoryResource>::new().into_router(),
        )
}

/// The whole application: API, health, docs, fallback and the tower middleware stack.
pub fn create_app(state: AppState) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id
            )
        })
        .on_request(|request: &Request<_>, _span: &tracing::Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "request started"
            );
        })
        .on_response(|response: &Response<_>, latency: Duration, _span: &tracing::Span| {
            tracing::info!(
                status = %response.status(),
                ms = %latency.as_millis(),
                "request finished"
            );
        });

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(trace_layer)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(ConcurrencyLimitLayer::new(MAX_IN_FLIGHT))
        .with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    tracing::debug!(path = %uri.path(), "no route matched");
    AppError::NotFound
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    AppError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}
