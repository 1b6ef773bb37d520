/// User administration endpoints
///
/// Role and status changes are guarded twice: by permission, and by the role
/// hierarchy (an actor may only manage users it outranks).
use crate::{
    audit::{ActorInfo, AuditAction, RequestContext},
    auth::AuthContext,
    context::AppContext,
    db::user::User,
    error::{AppError, AppResult},
    require_permission,
    roles::{Permission, Role},
    users::{NuevoUsuario, UsuarioUpdate},
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/users", get(list).post(create))
        .route("/api/users/:id", get(detalle).put(actualizar).delete(eliminar))
        .route("/api/users/:id/rol", post(cambiar_rol))
        .route("/api/users/:id/estado", post(cambiar_estado))
}

#[derive(Debug, Deserialize)]
struct CambioRol {
    rol: Role,
}

#[derive(Debug, Deserialize)]
struct CambioEstado {
    activo: bool,
}

fn actor(auth: &AuthContext) -> ActorInfo {
    auth.user
        .as_ref()
        .map(ActorInfo::from_user)
        .unwrap_or_else(|| ActorInfo::unknown(Some(auth.session.email.clone())))
}

/// Hierarchy check: the actor must outrank the target user
fn check_can_manage(auth: &AuthContext, target: &User) -> AppResult<()> {
    let actor_role = auth
        .role()
        .ok_or_else(|| AppError::Authorization("No role assigned".to_string()))?;
    let target_role = target.role().unwrap_or(Role::Validador);

    if !actor_role.can_manage(target_role) {
        return Err(AppError::Authorization(format!(
            "Cannot manage a user with role {}",
            target.rol
        )));
    }

    Ok(())
}

async fn list(State(ctx): State<AppContext>, auth: AuthContext) -> AppResult<Json<Vec<User>>> {
    require_permission!(auth, Permission::UsersView);

    Ok(Json(ctx.users.list().await?))
}

async fn detalle(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<User>> {
    require_permission!(auth, Permission::UsersView);

    let user = ctx
        .users
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Usuario {} no encontrado", id)))?;

    Ok(Json(user))
}

async fn create(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    req_ctx: RequestContext,
    Json(nuevo): Json<NuevoUsuario>,
) -> AppResult<Json<User>> {
    require_permission!(auth, Permission::UsersCreate);

    let user = ctx.users.create(nuevo).await?;
    ctx.audit
        .record(
            AuditAction::CreateUser,
            &actor(&auth),
            json!({
                "targetUserId": user.id,
                "targetUserEmail": user.email,
                "rol": user.rol,
            }),
            &req_ctx,
        )
        .await;

    Ok(Json(user))
}

async fn actualizar(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    req_ctx: RequestContext,
    Path(id): Path<String>,
    Json(cambios): Json<UsuarioUpdate>,
) -> AppResult<Json<User>> {
    require_permission!(auth, Permission::UsersEdit);

    let target = ctx
        .users
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Usuario {} no encontrado", id)))?;
    check_can_manage(&auth, &target)?;

    let user = ctx.users.update(&id, cambios).await?;
    ctx.audit
        .record(
            AuditAction::EditUser,
            &actor(&auth),
            json!({ "targetUserId": user.id, "targetUserEmail": user.email }),
            &req_ctx,
        )
        .await;

    Ok(Json(user))
}

async fn eliminar(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    req_ctx: RequestContext,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    require_permission!(auth, Permission::UsersDelete);

    let target = ctx
        .users
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Usuario {} no encontrado", id)))?;
    check_can_manage(&auth, &target)?;

    ctx.users.delete(&id).await?;
    ctx.audit
        .record(
            AuditAction::ToggleUserStatus,
            &actor(&auth),
            json!({ "targetUserId": id, "activo": false, "eliminado": true }),
            &req_ctx,
        )
        .await;

    Ok(Json(json!({ "ok": true })))
}

async fn cambiar_rol(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    req_ctx: RequestContext,
    Path(id): Path<String>,
    Json(cambio): Json<CambioRol>,
) -> AppResult<Json<serde_json::Value>> {
    require_permission!(auth, Permission::UsersEdit);

    let target = ctx
        .users
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Usuario {} no encontrado", id)))?;
    check_can_manage(&auth, &target)?;

    ctx.users.change_rol(&id, cambio.rol).await?;
    ctx.audit
        .record(
            AuditAction::ChangeUserRole,
            &actor(&auth),
            json!({
                "targetUserId": id,
                "targetUserEmail": target.email,
                "rolAnterior": target.rol,
                "rolNuevo": cambio.rol.as_str(),
            }),
            &req_ctx,
        )
        .await;

    Ok(Json(json!({ "ok": true })))
}

async fn cambiar_estado(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    req_ctx: RequestContext,
    Path(id): Path<String>,
    Json(cambio): Json<CambioEstado>,
) -> AppResult<Json<serde_json::Value>> {
    require_permission!(auth, Permission::UsersEdit);

    let target = ctx
        .users
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Usuario {} no encontrado", id)))?;
    check_can_manage(&auth, &target)?;

    ctx.users.toggle_activo(&id, cambio.activo).await?;
    ctx.audit
        .record(
            AuditAction::ToggleUserStatus,
            &actor(&auth),
            json!({ "targetUserId": id, "activo": cambio.activo }),
            &req_ctx,
        )
        .await;

    Ok(Json(json!({ "ok": true })))
}
