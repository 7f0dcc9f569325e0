// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, elaboration, progress, review},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Learner routes (stacks, challenges, reviews) require a valid token.
/// * Admin routes additionally require the 'admin' role.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let stack_routes = Router::new().route("/{id}", get(progress::get_stack_overview));

    let challenge_routes = Router::new()
        .route("/{id}", get(progress::get_challenge))
        .route(
            "/{id}/elaboration",
            get(elaboration::get_my_elaboration).put(elaboration::save_draft),
        )
        .route("/{id}/elaboration/submit", post(elaboration::submit))
        .route("/{id}/review", get(review::open_review))
        .route("/{id}/received-reviews", get(review::received_reviews));

    let review_routes = Router::new()
        .route("/{id}/submit", post(review::submit_review))
        .route("/{id}/evaluation", put(review::evaluate_review));

    let admin_routes = Router::new()
        .route("/stacks", post(admin::create_stack))
        .route("/challenges", post(admin::create_challenge))
        .route(
            "/challenges/{id}/questions",
            post(admin::create_review_question),
        )
        // Auth runs first, then the role check
        .layer(middleware::from_fn(admin_middleware));

    let api = Router::new()
        .nest("/stacks", stack_routes)
        .nest("/challenges", challenge_routes)
        .nest("/reviews", review_routes)
        .nest("/admin", admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", api)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
