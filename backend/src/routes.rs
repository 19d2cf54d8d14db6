// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, users, verification},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Public routes: registration, email verification, login.
/// * Authenticated routes: user CRUD, password change, relationship lookups.
/// * Admin routes: the full user listing.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    // The frontend the verification redirect points at is the one allowed origin.
    let origin = state.config.verify_redirect_url.origin().ascii_serialization();
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);
    match origin.parse::<HeaderValue>() {
        Ok(value) => cors = cors.allow_origin(value),
        Err(_) => tracing::warn!("CORS origin '{}' is not a valid header value", origin),
    }

    let public_routes = Router::new()
        .route("/users", post(users::register))
        .route("/verify/{token}", get(verification::verify))
        .route("/resend/{user}", post(verification::resend))
        .route("/auth/login", post(auth::login));

    let user_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route(
            "/users/{id}",
            get(users::show_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{id}/password", put(users::change_password))
        .route("/users/{id}/post", get(users::user_posts))
        .route(
            "/users/{id}/post/{offset}/{limit}",
            get(users::user_posts_page),
        )
        .route("/users/{id}/follower", get(users::followers))
        .route("/users/{id}/following", get(users::following))
        .route("/users/{id}/like", get(users::user_likes))
        .route("/users/{id}/comment", get(users::user_comments))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/users", get(users::list_users))
        // Auth first, then Admin check
        .route_layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                ))
                .layer(middleware::from_fn(admin_middleware)),
        );

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
