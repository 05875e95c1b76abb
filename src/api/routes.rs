use super::{games, wallet, AppState};
use crate::auth::{api as auth_api, auth_middleware, AuthState, JwtHandler};
use crate::middleware::{rate_limit_middleware, request_logging, RateLimitLayer};
use crate::settlement::NumberRules;
use crate::store::Store;
use anyhow::{Context, Result};
use axum::{
    http::HeaderValue,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Everything the HTTP surface needs.
pub struct RouterConfig {
    pub store: Arc<Store>,
    pub jwt_handler: Arc<JwtHandler>,
    pub rules: NumberRules,
    pub limiter: RateLimitLayer,
    pub cors: CorsLayer,
}

/// Create the API router.
///
/// `/health` is public and not rate limited. `/register` and `/token` are
/// public but rate limited. Everything else requires a bearer token.
pub fn create_router(config: RouterConfig) -> Router {
    let RouterConfig {
        store,
        jwt_handler,
        rules,
        limiter,
        cors,
    } = config;

    let auth_routes = Router::new()
        .route("/register", post(auth_api::register))
        .route("/token", post(auth_api::login))
        .with_state(AuthState {
            store: store.clone(),
            jwt_handler: jwt_handler.clone(),
        });

    let protected_routes = Router::new()
        .route("/me", get(auth_api::me))
        .route(
            "/games",
            get(games::list_games)
                .post(games::create_games)
                .delete(games::delete_game),
        )
        .route("/wallet", get(wallet::get_wallet))
        .route("/update_wallet", post(wallet::update_wallet))
        .route_layer(middleware::from_fn_with_state(jwt_handler, auth_middleware))
        .with_state(AppState { store, rules });

    let limited_routes = Router::new()
        .merge(auth_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));

    Router::new()
        .route("/health", get(health_check))
        .merge(limited_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// CORS for the configured frontend origin(s), comma-separated.
/// `*` allows any origin without credentials.
pub fn cors_layer(origins: &str) -> Result<CorsLayer> {
    if origins.trim() == "*" {
        return Ok(CorsLayer::permissive());
    }

    let origins = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin: {}", o)))
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
