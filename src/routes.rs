use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{internal, protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security.cors_origins);

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(public_routes())
        // Protected API
        .merge(protected_routes(state.clone()))
        .merge(internal_routes(state.clone()))
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/public/companies/:company/leads", post(public::lead_capture))
        .route("/webhooks/whatsapp/:company", post(public::whatsapp_webhook))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{auth, companies, leads, meta, whatsapp};

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        // Companies and users
        .route("/api/companies", post(companies::company_create))
        .route("/api/companies/:company", get(companies::company_get))
        .route("/api/companies/:company/whatsapp", put(companies::whatsapp_credentials_put))
        .route("/api/companies/:company/users", post(companies::user_create))
        .route("/api/companies/:company/leads", get(leads::leads_list))
        .route("/api/companies/:company/whatsapp/messages", post(whatsapp::message_send))
        // Ads platform
        .route("/api/meta/sync", post(meta::sync_post))
        .route("/api/meta/token", get(meta::token_get).put(meta::token_put))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn internal_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/internal/queue", post(internal::queue_consume))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
