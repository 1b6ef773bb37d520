/// Audit log read endpoints: filtered queries, activity statistics and
/// inactivity detection. Admin-only; the full system log is reserved for the
/// super administrator.
use crate::{
    audit::{ActivityStats, AuditEntry, AuditFilters, InactiveUser},
    auth::AuthContext,
    context::AppContext,
    error::{AppError, AppResult},
};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/audit", get(query))
        .route("/api/audit/recientes", get(recientes))
        .route("/api/audit/todos", get(todos))
        .route("/api/audit/inactivos", get(inactivos))
        .route("/api/audit/usuarios/:email/stats", get(user_stats))
}

#[derive(Debug, Deserialize)]
struct RecentParams {
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StatsParams {
    days: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct InactivityParams {
    minutos: Option<i64>,
}

fn require_admin(auth: &AuthContext) -> AppResult<()> {
    if !auth.is_admin() {
        return Err(AppError::Authorization("Admin role required".to_string()));
    }
    Ok(())
}

/// Filtered query: by actor email or id, role, action and date range
async fn query(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(filters): Query<AuditFilters>,
) -> AppResult<Json<Vec<AuditEntry>>> {
    require_admin(&auth)?;

    Ok(Json(ctx.audit.query(&filters).await?))
}

async fn recientes(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(params): Query<RecentParams>,
) -> AppResult<Json<Vec<AuditEntry>>> {
    require_admin(&auth)?;

    let limit = params.limit.unwrap_or(100);
    Ok(Json(ctx.audit.recent(limit).await?))
}

/// Full system log, capped, newest first
async fn todos(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<Json<Vec<AuditEntry>>> {
    if !auth.is_super_admin() {
        return Err(AppError::Authorization(
            "Super admin role required".to_string(),
        ));
    }

    Ok(Json(ctx.audit.all().await?))
}

async fn user_stats(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(email): Path<String>,
    Query(params): Query<StatsParams>,
) -> AppResult<Json<ActivityStats>> {
    require_admin(&auth)?;

    let days = params.days.unwrap_or(7);
    Ok(Json(ctx.audit.activity_stats(&email, days).await?))
}

async fn inactivos(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(params): Query<InactivityParams>,
) -> AppResult<Json<Vec<InactiveUser>>> {
    require_admin(&auth)?;

    Ok(Json(ctx.audit.inactive_users(params.minutos).await?))
}
