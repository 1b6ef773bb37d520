/// Report export endpoints
///
/// Exports return tabular structures (workbook / paginated document); the
/// client serializes them to its spreadsheet or PDF format of choice.
use crate::{
    audit::{ActorInfo, AuditAction, RequestContext},
    auth::AuthContext,
    context::AppContext,
    error::AppResult,
    report::{filtrar_por_fechas, Document, ReportBuilder, ReportFilters, ReporteMensual, Workbook},
    require_permission,
    roles::Permission,
    socios::{Socio, SocioFilters},
};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/reportes/planilla", get(planilla))
        .route("/api/reportes/documento", get(documento))
        .route("/api/reportes/mensual", get(mensual))
}

fn actor(auth: &AuthContext) -> ActorInfo {
    auth.user
        .as_ref()
        .map(ActorInfo::from_user)
        .unwrap_or_else(|| ActorInfo::unknown(Some(auth.session.email.clone())))
}

async fn socios_filtrados(ctx: &AppContext, filtros: &ReportFilters) -> AppResult<Vec<Socio>> {
    let socios = ctx
        .socios
        .list(&SocioFilters {
            estado: filtros.estado,
            sector: filtros.sector,
            barrio: filtros.barrio.clone(),
        })
        .await?;

    Ok(filtrar_por_fechas(
        socios,
        filtros.fecha_desde,
        filtros.fecha_hasta,
    ))
}

/// Spreadsheet-shaped export: main sheet plus derived statistics sheets
async fn planilla(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    req_ctx: RequestContext,
    Query(filtros): Query<ReportFilters>,
) -> AppResult<Json<Workbook>> {
    require_permission!(auth, Permission::ReportesExport);

    let socios = socios_filtrados(&ctx, &filtros).await?;
    let workbook = ReportBuilder::workbook(&socios, &filtros);

    ctx.audit
        .record(
            AuditAction::ExportData,
            &actor(&auth),
            json!({ "reportType": "planilla", "total": socios.len() }),
            &req_ctx,
        )
        .await;

    Ok(Json(workbook))
}

/// Print-shaped export: header block, paginated table, per-sector summary
async fn documento(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    req_ctx: RequestContext,
    Query(filtros): Query<ReportFilters>,
) -> AppResult<Json<Document>> {
    require_permission!(auth, Permission::ReportesExport);

    let socios = socios_filtrados(&ctx, &filtros).await?;
    let documento = ReportBuilder::documento(&socios, &filtros);

    ctx.audit
        .record(
            AuditAction::GenerateReport,
            &actor(&auth),
            json!({ "reportType": "documento", "total": socios.len() }),
            &req_ctx,
        )
        .await;

    Ok(Json(documento))
}

/// Current-month intake summary
async fn mensual(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<Json<ReporteMensual>> {
    require_permission!(auth, Permission::ReportesView);

    let socios = ctx.socios.list(&SocioFilters::default()).await?;
    Ok(Json(ReportBuilder::mensual(
        &socios,
        Utc::now().date_naive(),
    )))
}
