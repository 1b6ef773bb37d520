/// API routes and handlers
pub mod audit;
pub mod comunicaciones;
pub mod health;
pub mod middleware;
pub mod reports;
pub mod session;
pub mod socios;
pub mod users;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(session::routes())
        .merge(socios::routes())
        .merge(users::routes())
        .merge(comunicaciones::routes())
        .merge(audit::routes())
        .merge(reports::routes())
}
