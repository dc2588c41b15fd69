//! `api` crate — the HTTP surface over the flow engine.
//!
//! Exposes:
//!   GET    /api/v1/projects            GET/POST  /api/v1/projects
//!   GET    /api/v1/projects/:id        DELETE    /api/v1/projects/:id
//!   GET    /api/v1/workflows           POST      /api/v1/workflows
//!   GET    /api/v1/workflows/:id       DELETE    /api/v1/workflows/:id
//!   GET    /api/v1/workflows/:id/plan
//!   POST   /api/v1/workflows/:id/execute
//!   GET    /api/v1/executions/:id
//!   POST   /api/v1/executions/:id/{pause,resume,abort}
//!   POST   /hooks/{agent-complete,file-changed,agent-error,checkpoint}
//!   POST   /review/:node_id
//!   GET    /ws                         (events subscription, see handlers::events)
//!   GET    /healthz

pub mod auth;
pub mod config;
pub mod handlers;
pub mod processor;
pub mod state;
pub mod supervisor_bridge;

use axum::{
    routing::{get, post},
    Router,
};
use db::DbPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let projects = Router::new()
        .route("/projects", get(handlers::projects::list).post(handlers::projects::create))
        .route("/projects/:id", get(handlers::projects::get).delete(handlers::projects::delete));

    let workflows = Router::new()
        .route("/workflows", get(handlers::workflows::list).post(handlers::workflows::create))
        .route("/workflows/:id", get(handlers::workflows::get).delete(handlers::workflows::delete))
        .route("/workflows/:id/plan", get(handlers::workflows::plan))
        .route("/workflows/:id/execute", post(handlers::executions::execute));

    let executions = Router::new()
        .route("/executions/:id", get(handlers::executions::get))
        .route("/executions/:id/pause", post(handlers::executions::pause))
        .route("/executions/:id/resume", post(handlers::executions::resume))
        .route("/executions/:id/abort", post(handlers::executions::abort));

    let api_router = Router::new().merge(projects).merge(workflows).merge(executions);

    let hooks_router = Router::new()
        .route("/agent-complete", post(handlers::hooks::agent_complete))
        .route("/file-changed", post(handlers::hooks::file_changed))
        .route("/agent-error", post(handlers::hooks::agent_error))
        .route("/checkpoint", post(handlers::hooks::checkpoint));

    Router::new()
        .nest("/api/v1", api_router)
        .nest("/hooks", hooks_router)
        .route("/review/:node_id", post(handlers::hooks::review))
        .route("/ws", get(handlers::events::subscribe))
        .route("/healthz", get(handlers::health::healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the application state and serve forever. Also spawns the
/// supervisor-event bridge so raw subprocess log/status events make it
/// into the event multiplexer.
pub async fn serve(bind: &str, pool: DbPool, config: &Config) -> Result<(), std::io::Error> {
    let (state, supervisor_events) = AppState::new(pool, config);
    tokio::spawn(supervisor_bridge::run(supervisor_events, state.registry.clone(), state.events.clone()));

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await
}
