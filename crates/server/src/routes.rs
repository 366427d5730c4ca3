//! Route configuration.

use crate::auth::auth_middleware;
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let review_routes = Router::new()
        .route("/review", post(handlers::create_review))
        // Title search (intentionally public)
        .route("/review/{title}", get(handlers::search_reviews))
        .route("/update/review/{id}", put(handlers::update_review))
        .route("/delete/review/{id}", put(handlers::delete_review))
        .route("/undelete/review/{id}", put(handlers::undelete_review))
        .route("/reviews/{max}/{offset}", get(handlers::list_reviews))
        .route("/getReview/{id}", get(handlers::get_review))
        .route("/softDeletedReviews", get(handlers::list_soft_deleted))
        .route("/tally/{id}", get(handlers::review_tally));

    let engagement_routes = Router::new()
        .route("/like", post(handlers::like_review))
        // POST kept for older clients
        .route(
            "/dislike",
            put(handlers::dislike_review).post(handlers::dislike_review),
        )
        .route("/liked/{user_id}", get(handlers::liked_reviews));

    let account_routes = Router::new()
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/whoami", get(handlers::whoami))
        .route("/auth/updateUser/{id}", put(handlers::update_user))
        .route("/users", get(handlers::list_users))
        .route("/user/{id}", get(handlers::get_user))
        .route("/block/user/{id}", put(handlers::block_user))
        .route("/unblock/user/{id}", put(handlers::unblock_user));

    let catalog_routes = Router::new()
        .route(
            "/genres",
            get(handlers::list_genres).post(handlers::create_genre),
        )
        .route("/genres/top", get(handlers::top_genres))
        .route(
            "/medias",
            get(handlers::list_media).post(handlers::create_media),
        )
        .route(
            "/platforms",
            get(handlers::list_platforms).post(handlers::create_platform),
        )
        .route("/roles", get(handlers::list_roles));

    let mut router = Router::new()
        // Health check (intentionally unauthenticated for load balancers/k8s probes)
        .route("/health", get(handlers::health_check))
        .merge(review_routes)
        .merge(engagement_routes)
        .merge(account_routes)
        .merge(catalog_routes);

    // SECURITY: When enabled, this endpoint MUST be network-restricted
    // to authorized Prometheus scraper IPs only.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    // Order of execution: TraceLayer -> Auth -> Handler
    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
