//! Admin status API.
//!
//! - `GET /admin/status`: `{version, alive, total}`
//! - `GET /admin/backends`: liveness of every backend, in pool order
//! - `POST /admin/backends/status`: override one backend's liveness

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::load_balancer::ServerPool;
use self::auth::admin_auth_middleware;
use self::handlers::*;

#[derive(Clone)]
pub struct AdminState {
    pub pool: Arc<ServerPool>,
    pub api_key: Option<Arc<str>>,
}

impl AdminState {
    pub fn new(pool: Arc<ServerPool>, api_key: Option<String>) -> Self {
        Self {
            pool,
            api_key: api_key.map(Arc::from),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/backends", get(get_backends))
        .route("/admin/backends/status", post(set_backend_status))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
