/// Socio CRUD, DNI lookup, bulk import and registry statistics
use crate::{
    audit::{ActorInfo, AuditAction, RequestContext},
    auth::AuthContext,
    context::AppContext,
    error::{AppError, AppResult},
    report::{plantilla_importacion, Workbook},
    require_permission,
    roles::Permission,
    socios::{
        ImportOutcome, NuevoSocio, Socio, SocioEstadisticas, SocioFilters, SocioImporter,
        SocioUpdate,
    },
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/socios", get(list).post(create))
        .route("/api/socios/estadisticas", get(estadisticas))
        .route("/api/socios/plantilla", get(plantilla))
        .route("/api/socios/importar", post(importar))
        .route("/api/socios/dni/:dni", get(por_dni))
        .route(
            "/api/socios/:id",
            get(detalle).put(actualizar).delete(eliminar),
        )
        .route("/api/socios/:id/actividad", post(tocar_actividad))
}

fn actor(auth: &AuthContext) -> ActorInfo {
    auth.user
        .as_ref()
        .map(ActorInfo::from_user)
        .unwrap_or_else(|| ActorInfo::unknown(Some(auth.session.email.clone())))
}

async fn list(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    req_ctx: RequestContext,
    Query(filters): Query<SocioFilters>,
) -> AppResult<Json<Vec<Socio>>> {
    require_permission!(auth, Permission::SociosView);

    let socios = ctx.socios.list(&filters).await?;
    ctx.audit
        .record(
            AuditAction::SearchSocios,
            &actor(&auth),
            json!({ "resultsCount": socios.len() }),
            &req_ctx,
        )
        .await;

    Ok(Json(socios))
}

async fn create(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    req_ctx: RequestContext,
    Json(nuevo): Json<NuevoSocio>,
) -> AppResult<Json<Socio>> {
    require_permission!(auth, Permission::SociosCreate);

    let socio = ctx.socios.create(nuevo).await?;
    ctx.audit
        .record(
            AuditAction::CreateSocio,
            &actor(&auth),
            json!({
                "socioId": socio.id,
                "socioName": format!("{} {}", socio.nombre, socio.apellido),
                "dni": socio.dni,
            }),
            &req_ctx,
        )
        .await;

    Ok(Json(socio))
}

async fn detalle(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    req_ctx: RequestContext,
    Path(id): Path<String>,
) -> AppResult<Json<Socio>> {
    require_permission!(auth, Permission::SociosView);

    let socio = ctx
        .socios
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Socio {} no encontrado", id)))?;

    ctx.audit
        .record(
            AuditAction::ViewSocio,
            &actor(&auth),
            json!({ "socioId": socio.id }),
            &req_ctx,
        )
        .await;

    Ok(Json(socio))
}

/// Quick-validation lookup by the unique DNI key
async fn por_dni(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    req_ctx: RequestContext,
    Path(dni): Path<String>,
) -> AppResult<Json<Option<Socio>>> {
    require_permission!(auth, Permission::ValidacionView);

    let socio = ctx.socios.find_by_dni(&dni).await?;
    ctx.audit
        .record(
            AuditAction::SearchValidacion,
            &actor(&auth),
            json!({ "searchTerm": dni, "found": socio.is_some() }),
            &req_ctx,
        )
        .await;

    Ok(Json(socio))
}

async fn actualizar(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    req_ctx: RequestContext,
    Path(id): Path<String>,
    Json(cambios): Json<SocioUpdate>,
) -> AppResult<Json<Socio>> {
    require_permission!(auth, Permission::SociosEdit);

    let socio = ctx.socios.update(&id, cambios).await?;
    ctx.audit
        .record(
            AuditAction::EditSocio,
            &actor(&auth),
            json!({ "socioId": socio.id }),
            &req_ctx,
        )
        .await;

    Ok(Json(socio))
}

async fn eliminar(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    req_ctx: RequestContext,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    require_permission!(auth, Permission::SociosDelete);

    ctx.socios.delete(&id).await?;
    ctx.audit
        .record(
            AuditAction::DeleteSocio,
            &actor(&auth),
            json!({ "socioId": id }),
            &req_ctx,
        )
        .await;

    Ok(Json(json!({ "ok": true })))
}

/// Stamp the socio's last-activity time (quick-validation desk)
async fn tocar_actividad(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    require_permission!(auth, Permission::ValidacionEdit);

    ctx.socios.touch_actividad(&id).await;
    Ok(Json(json!({ "ok": true })))
}

async fn estadisticas(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<Json<SocioEstadisticas>> {
    require_permission!(auth, Permission::DashboardView);

    Ok(Json(ctx.socios.estadisticas().await?))
}

/// Import template: fixed header plus two example rows
async fn plantilla(auth: AuthContext) -> AppResult<Json<Workbook>> {
    require_permission!(auth, Permission::SociosCreate);

    Ok(Json(plantilla_importacion()))
}

async fn importar(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    req_ctx: RequestContext,
    Json(workbook): Json<Workbook>,
) -> AppResult<Json<ImportOutcome>> {
    require_permission!(auth, Permission::SociosCreate);

    let importer = SocioImporter::new(ctx.socios.clone());
    let outcome = importer.importar(&workbook).await;

    ctx.audit
        .record(
            AuditAction::ImportSocios,
            &actor(&auth),
            json!({
                "exitosos": outcome.exitosos,
                "rechazados": outcome.rechazados,
            }),
            &req_ctx,
        )
        .await;

    Ok(Json(outcome))
}
