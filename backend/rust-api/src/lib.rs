use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Permissive CORS for the SPA client; auth travels in the header.
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        // Auth endpoints (mixed: some public, some protected)
        .nest("/api/auth", auth_routes(app_state.clone()))
        // Quiz endpoints are public: this is a practice tool, attempts carry
        // their own user attribution
        .nest("/api/quiz", quiz_routes())
        .nest(
            "/api/stats",
            stats_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .nest(
            "/api/ai",
            ai_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn auth_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    let protected_routes = Router::new()
        .route("/me", get(handlers::auth::me))
        .route("/change-password", post(handlers::auth::change_password))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            middlewares::auth::auth_middleware,
        ));

    // Role mutation requires an admin or super-admin identity.
    let admin_routes = Router::new()
        .route("/users/{id}/role", put(handlers::auth::update_role))
        .route_layer(middleware::from_fn(
            middlewares::auth::admin_guard_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ));

    public_routes.merge(protected_routes).merge(admin_routes)
}

fn quiz_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/questions/{year_level}",
            get(handlers::quiz::get_questions),
        )
        .route("/start", post(handlers::quiz::start_quiz))
        .route("/submit/{attempt_id}", post(handlers::quiz::submit_quiz))
}

fn stats_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/user-overview/{user_id}",
        get(handlers::stats::user_overview),
    )
}

fn ai_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::ai::ai_health))
        .route(
            "/analyze-attempt/{attempt_id}",
            post(handlers::ai::analyze_attempt),
        )
        .route("/generate-question", post(handlers::ai::generate_question))
}
