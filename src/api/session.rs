/// Session endpoints: login, logout, registration and session info
use crate::{
    account::{LoginRequest, RegisterRequest, SessionInfo, SessionResponse},
    audit::RequestContext,
    auth::AuthContext,
    context::AppContext,
    error::AppResult,
};
use axum::{extract::State, routing::post, Json, Router};
use serde_json::json;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/session", post(login).get(get_session).delete(logout))
        .route("/api/register", post(register))
}

/// Authenticate and open a session
async fn login(
    State(ctx): State<AppContext>,
    req_ctx: RequestContext,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<SessionResponse>> {
    let session = ctx
        .session_manager
        .login(&req.email, &req.password, &req_ctx)
        .await?;

    tracing::info!("login: session opened for {}", req.email);
    Ok(Json(session))
}

/// Current session with a freshly resolved profile and permission set
async fn get_session(auth: AuthContext) -> AppResult<Json<SessionInfo>> {
    Ok(Json(SessionInfo {
        email: auth.session.email.clone(),
        user: auth.user,
        permissions: auth.permissions,
    }))
}

/// Close the current session
async fn logout(
    State(ctx): State<AppContext>,
    req_ctx: RequestContext,
    auth: AuthContext,
) -> AppResult<Json<serde_json::Value>> {
    ctx.session_manager.logout(&auth.session, &req_ctx).await?;
    Ok(Json(json!({ "ok": true })))
}

/// Allow-list gated self-registration
async fn register(
    State(ctx): State<AppContext>,
    req_ctx: RequestContext,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<serde_json::Value>> {
    ctx.session_manager
        .register(&req.email, &req.password, &req_ctx)
        .await?;

    tracing::info!("register: credential created for {}", req.email);
    Ok(Json(json!({ "ok": true })))
}
