/// Communication endpoints: drafts, edits, delivery bookkeeping and totals
use crate::{
    auth::AuthContext,
    comunicaciones::{
        Comunicacion, ComunicacionStats, ComunicacionUpdate, CreadoPor, EstadisticasEnvio,
        NuevaComunicacion, TipoComunicacion,
    },
    context::AppContext,
    error::{AppError, AppResult},
    require_permission,
    roles::Permission,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/comunicaciones", get(list).post(create))
        .route("/api/comunicaciones/stats", get(stats))
        .route(
            "/api/comunicaciones/:id",
            get(detalle).put(actualizar).delete(eliminar),
        )
        .route("/api/comunicaciones/:id/enviar", post(enviar))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<i64>,
    tipo: Option<String>,
}

async fn list(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Vec<Comunicacion>>> {
    require_permission!(auth, Permission::SociosView);

    let comunicaciones = match params.tipo.as_deref() {
        Some(raw) => {
            let tipo = TipoComunicacion::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("Tipo \"{}\" no es válido", raw)))?;
            ctx.comunicaciones.by_tipo(tipo).await?
        }
        None => ctx.comunicaciones.list(params.limit.unwrap_or(50)).await?,
    };

    Ok(Json(comunicaciones))
}

async fn create(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(nueva): Json<NuevaComunicacion>,
) -> AppResult<Json<Comunicacion>> {
    require_permission!(auth, Permission::SociosEdit);

    let creado_por = match auth.user {
        Some(ref user) => CreadoPor {
            id: Some(user.id.clone()),
            email: Some(user.email.clone()),
            nombre: Some(user.display_name()),
        },
        None => CreadoPor {
            id: None,
            email: Some(auth.session.email.clone()),
            nombre: None,
        },
    };

    Ok(Json(ctx.comunicaciones.create(nueva, creado_por).await?))
}

async fn detalle(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<Comunicacion>> {
    require_permission!(auth, Permission::SociosView);

    let comunicacion = ctx
        .comunicaciones
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comunicación {} no encontrada", id)))?;

    Ok(Json(comunicacion))
}

async fn actualizar(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(cambios): Json<ComunicacionUpdate>,
) -> AppResult<Json<Comunicacion>> {
    require_permission!(auth, Permission::SociosEdit);

    Ok(Json(ctx.comunicaciones.update(&id, cambios).await?))
}

async fn eliminar(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    require_permission!(auth, Permission::SociosEdit);

    ctx.comunicaciones.delete(&id).await?;
    Ok(Json(json!({ "ok": true })))
}

/// Record a delivery run's statistics and mark the communication sent
async fn enviar(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(estadisticas): Json<EstadisticasEnvio>,
) -> AppResult<Json<Comunicacion>> {
    require_permission!(auth, Permission::SociosEdit);

    Ok(Json(ctx.comunicaciones.marcar_enviada(&id, estadisticas).await?))
}

async fn stats(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<Json<ComunicacionStats>> {
    require_permission!(auth, Permission::DashboardView);

    Ok(Json(ctx.comunicaciones.stats(1000).await?))
}
