mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use planner_core::{Clock, SystemClock};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::assistant::ConversationStore;
use crate::db::Database;

pub use middleware::SecurityConfig;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub conversations: ConversationStore,
    /// Supplies "today" for plan generation and the dashboard.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            conversations: ConversationStore::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_conversations(mut self, conversations: ConversationStore) -> Self {
        self.conversations = conversations;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

/// Router without authentication or rate limiting, for local use and tests.
pub fn create_router(state: AppState) -> Router {
    create_router_with_security(state, SecurityConfig::disabled())
}

pub fn create_router_with_security(state: AppState, security: SecurityConfig) -> Router {
    let mut api = Router::new()
        // Users
        .route("/users", post(handlers::create_user))
        .route("/users/{id}", get(handlers::get_user))
        .route("/users/{id}/plans", get(handlers::list_user_plans))
        // Plans
        .route("/plans", post(handlers::create_plan))
        .route(
            "/plans/{id}",
            get(handlers::get_plan)
                .put(handlers::update_plan)
                .delete(handlers::delete_plan),
        )
        .route("/plans/{id}/generate", post(handlers::generate_schedule))
        .route("/plans/{id}/topics", get(handlers::list_topics))
        .route("/plans/{id}/topics/parse", post(handlers::parse_topics))
        .route("/plans/{id}/sessions", get(handlers::list_sessions))
        .route("/plans/{id}/dashboard", get(handlers::get_dashboard))
        .route(
            "/plans/{id}/materials",
            get(handlers::list_materials).post(handlers::add_material),
        )
        // Sessions
        .route("/sessions/{id}/complete", post(handlers::complete_session))
        // Chat history
        .route(
            "/conversations/{user_id}/{plan_id}",
            get(handlers::get_conversation)
                .post(handlers::record_exchange)
                .delete(handlers::clear_conversation),
        )
        .route(
            "/conversations/{user_id}/{plan_id}/context",
            get(handlers::get_conversation_context),
        );

    if let Some(limiter) = security.rate_limiter.clone() {
        api = api.layer(from_fn_with_state(limiter, middleware::rate_limit_middleware));
    }
    api = api.layer(from_fn_with_state(
        security.clone(),
        middleware::auth_middleware,
    ));

    // Added after the auth layer so health checks stay unauthenticated.
    let api = api.route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&security))
        .with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    match &security.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    }
}
