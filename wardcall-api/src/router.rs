use std::sync::Arc;

use axum::{http::Method, routing::get, Router};
use sqlx::PgPool;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};
use webpush::WebPushClient;

use crate::{
    app_state::AppState,
    config::Settings,
    domain::NotificationDispatcher,
    repositories::{DeliveryLogRepositoryImpl, SubscriptionRepositoryImpl},
    routes,
};

pub fn create(connection_pool: PgPool, config: Settings) -> Router<()> {
    let vapid = config
        .vapid
        .signer()
        .expect("Invalid VAPID key material in configuration");
    if vapid.is_none() {
        tracing::warn!("VAPID keys are not configured; dispatch requests will be rejected");
    }

    let dispatcher = NotificationDispatcher::new(
        Arc::new(SubscriptionRepositoryImpl::new(connection_pool.clone())),
        Arc::new(DeliveryLogRepositoryImpl::new(connection_pool)),
        vapid,
        WebPushClient::new(),
        config.application.utc_offset,
    );
    let app_state = AppState::new(dispatcher);

    let app_url = config.application.app_url;
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(["content-type".parse().unwrap()])
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            origin.to_str().unwrap_or_default() == app_url
        }));

    Router::new()
        .route("/", get(|| async { "wardcall api is running" }))
        .nest("/notifications", routes::notifications::router())
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}
