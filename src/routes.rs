use axum::http::HeaderValue;
use axum::routing::{delete, get, patch, post};
use axum::{middleware, response::Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::SecurityConfig;
use crate::database::PoolManager;
use crate::error::ApiError;
use crate::handlers::{admin, protected, public};
use crate::middleware::auth::authenticate;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_routes())
        .merge(content_routes())
        .merge(account_routes())
        .merge(admin_routes())
        // Resolve presented credentials once, for every route
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(TraceLayer::new_for_http());

    let security = &crate::config::config().security;
    if security.enable_cors {
        router = router.layer(cors_layer(security));
    }

    router.with_state(state)
}

/// Cross-origin policy from configuration: only the configured origins are
/// allowed, unless a literal "*" is configured (development convenience).
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(public::auth::register))
        .route("/auth/login", post(public::auth::login))
}

/// Posts, comments, likes and categories. Reads are open to anonymous callers
/// (row-level policy decides what they see); writes require a credential.
fn content_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/posts",
            get(public::posts::list_posts).post(protected::posts::create_post),
        )
        .route(
            "/api/posts/:id",
            get(public::posts::get_post)
                .patch(protected::posts::update_post)
                .delete(protected::posts::delete_post),
        )
        .route(
            "/api/posts/:id/comments",
            get(public::posts::list_comments).post(protected::comments::create_comment),
        )
        .route("/api/posts/:id/like", post(protected::likes::toggle))
        .route("/api/comments/:id", delete(protected::comments::delete_comment))
        .route("/api/categories", get(public::posts::list_categories))
}

fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/me",
            get(protected::users::me).patch(protected::users::update_me),
        )
        .route(
            "/api/notifications",
            get(protected::notifications::list_notifications),
        )
        .route(
            "/api/notifications/read-all",
            post(protected::notifications::read_all),
        )
        .route(
            "/api/notifications/:id/read",
            post(protected::notifications::mark_read),
        )
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/categories", post(admin::categories::create_category))
        .route(
            "/api/admin/categories/:id",
            delete(admin::categories::delete_category),
        )
        .route("/api/admin/users", get(admin::users::list_users))
        .route("/api/admin/users/:id/role", patch(admin::users::set_role))
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "quill-api",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Blog platform API",
        "endpoints": {
            "health": "/health",
            "auth": "/auth/*",
            "api": "/api/*"
        }
    }))
}

async fn health() -> Result<Json<Value>, ApiError> {
    let database = match PoolManager::health_check().await {
        Ok(()) => "up",
        Err(e) => {
            tracing::warn!("health check failed: {}", e);
            return Err(ApiError::service_unavailable("Database unreachable"));
        }
    };

    Ok(Json(json!({
        "success": true,
        "data": {
            "status": "healthy",
            "database": database,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }
    })))
}
