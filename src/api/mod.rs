use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::finder::GritBinTool;

pub mod handlers;
pub mod models;

pub fn create_router(tool: Arc<dyn GritBinTool>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/mcp/v1/execute", post(handlers::execute_handler))
        .route("/api/mcp/v1/tools", get(handlers::tools_handler))
        .with_state(tool)
        .layer(cors)
}
