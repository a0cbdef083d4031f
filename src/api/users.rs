use crate::auth::auth::AuthUser;
use crate::engine::balances::AccrualSummary;
use crate::engine::{accounts, balances, today};
use crate::error::AppError;
use crate::model::role::Role;
use crate::model::user::{NewUser, User};
use crate::store::audit::AuditEvent;
use actix_web::{HttpResponse, web};
use chrono::Datelike;
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct UserListQuery {
    /// Include archived accounts
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct RoleChange {
    pub role: Role,
}

#[derive(Deserialize, ToSchema)]
pub struct BalanceAdjustment {
    /// signed whole days; the balance never drops below zero
    #[schema(example = -2)]
    pub delta: i64,
    #[serde(default)]
    #[schema(example = "payroll correction")]
    pub note: String,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AuditQuery {
    /// Most recent events to return (max 500)
    #[schema(example = 50)]
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "The caller's account", body = User),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn me(auth: AuthUser, pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    let user = accounts::get_user(pool.get_ref(), &auth, auth.user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Accounts by last name", body = [User]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<UserListQuery>,
) -> Result<HttpResponse, AppError> {
    let users = accounts::list_users(pool.get_ref(), &auth, query.include_archived).await?;
    Ok(HttpResponse::Ok().json(users))
}

#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body(content = NewUser, content_type = "application/json"),
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Username already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<NewUser>,
) -> Result<HttpResponse, AppError> {
    let user = accounts::create_user(pool.get_ref(), &auth, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

/// Partial profile update
#[utoipa::path(
    patch,
    path = "/api/admin/users/{user_id}",
    params(("user_id" = i64, Path, description = "Account to update")),
    request_body(
        content = Object,
        description = "Any of first_name, last_name, rank, squad, call_sign, sector, skills, start_time",
        example = json!({ "rank": "Sergeant", "squad": "B", "start_time": "19:00" })
    ),
    responses(
        (status = 200, description = "Updated account", body = User),
        (status = 400, description = "Unknown or invalid field"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let user = accounts::update_profile(pool.get_ref(), &auth, path.into_inner(), &payload).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{user_id}/role",
    params(("user_id" = i64, Path, description = "Account to change")),
    request_body(content = RoleChange, content_type = "application/json"),
    responses(
        (status = 200, description = "Role changed", body = User),
        (status = 403, description = "Webmaster only"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn set_role(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<RoleChange>,
) -> Result<HttpResponse, AppError> {
    let user = accounts::set_role(pool.get_ref(), &auth, path.into_inner(), payload.role).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{user_id}/archive",
    params(("user_id" = i64, Path, description = "Account to archive")),
    responses(
        (status = 200, description = "Account archived", body = User),
        (status = 400, description = "Cannot archive yourself"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn archive_user(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = accounts::archive_user(pool.get_ref(), &auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{user_id}/unarchive",
    params(("user_id" = i64, Path, description = "Account to restore")),
    responses(
        (status = 200, description = "Account restored", body = User),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn unarchive_user(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = accounts::unarchive_user(pool.get_ref(), &auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{user_id}/adjust-vacation",
    params(("user_id" = i64, Path, description = "Account to adjust")),
    request_body(content = BalanceAdjustment, content_type = "application/json"),
    responses(
        (status = 200, description = "Balance adjusted", body = User),
        (status = 400, description = "Zero delta"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn adjust_vacation(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<BalanceAdjustment>,
) -> Result<HttpResponse, AppError> {
    let user = balances::adjust_vacation(
        pool.get_ref(),
        &auth,
        path.into_inner(),
        payload.delta,
        &payload.note,
    )
    .await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{user_id}/adjust-sick",
    params(("user_id" = i64, Path, description = "Account to adjust")),
    request_body(content = BalanceAdjustment, content_type = "application/json"),
    responses(
        (status = 200, description = "Balance adjusted", body = User),
        (status = 400, description = "Zero delta"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn adjust_sick(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<BalanceAdjustment>,
) -> Result<HttpResponse, AppError> {
    let user = balances::adjust_sick(
        pool.get_ref(),
        &auth,
        path.into_inner(),
        payload.delta,
        &payload.note,
    )
    .await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{user_id}/audit",
    params(("user_id" = i64, Path, description = "Account whose trail to read"), AuditQuery),
    responses(
        (status = 200, description = "Audit events, newest first", body = [AuditEvent]),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn audit_trail(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    query: web::Query<AuditQuery>,
) -> Result<HttpResponse, AppError> {
    let events = accounts::audit_trail(
        pool.get_ref(),
        &auth,
        path.into_inner(),
        query.limit.unwrap_or(100),
    )
    .await?;
    Ok(HttpResponse::Ok().json(events))
}

#[utoipa::path(
    post,
    path = "/api/admin/reset-sick-ytd",
    responses(
        (status = 200, description = "Year-to-date sick usage cleared", body = Object,
         example = json!({ "reset": 42 })),
        (status = 403, description = "Webmaster only")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn reset_sick_ytd(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, AppError> {
    let reset = balances::reset_sick_ytd(pool.get_ref(), &auth).await?;
    Ok(HttpResponse::Ok().json(json!({ "reset": reset })))
}

#[derive(Deserialize, ToSchema)]
pub struct AccrualRun {
    /// Defaults to the current year
    #[schema(example = 2026)]
    pub year: Option<i32>,
}

#[utoipa::path(
    post,
    path = "/api/admin/vacation-accrual",
    request_body(content = AccrualRun, content_type = "application/json"),
    responses(
        (status = 200, description = "Entitlement credited, carryover capped", body = AccrualSummary),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Accrual already ran for that year")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn run_accrual(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<AccrualRun>,
) -> Result<HttpResponse, AppError> {
    let year = payload.year.unwrap_or_else(|| today().year());
    let summary = balances::run_accrual(pool.get_ref(), &auth, year).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{bearer, peer, test_app};
    use crate::db::test_pool;
    use crate::engine::testing::{admin, officer};
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn admin_provisions_and_adjusts() {
        let pool = test_pool().await;
        let sgt = admin(&pool).await;
        let me = officer(&pool, "jdoe", 3, 0).await;
        let app = test_app!(pool);

        let req = test::TestRequest::post()
            .uri("/api/admin/users")
            .peer_addr(peer())
            .insert_header(bearer(&sgt))
            .set_json(json!({ "username": "rookie", "password": "pw", "squad": "D" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri(&format!("/api/admin/users/{}/adjust-vacation", me.user_id))
            .peer_addr(peer())
            .insert_header(bearer(&sgt))
            .set_json(json!({ "delta": -5, "note": "overdrawn" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["vacation_left"], 0);

        let req = test::TestRequest::patch()
            .uri(&format!("/api/admin/users/{}", me.user_id))
            .peer_addr(peer())
            .insert_header(bearer(&sgt))
            .set_json(json!({ "role": "admin" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri(&format!("/api/admin/users/{}/audit", me.user_id))
            .peer_addr(peer())
            .insert_header(bearer(&sgt))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["action"], "balance_adjusted");

        let req = test::TestRequest::get()
            .uri("/api/me")
            .peer_addr(peer())
            .insert_header(bearer(&me))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["username"], "jdoe");
    }

    #[actix_web::test]
    async fn reset_needs_webmaster() {
        let pool = test_pool().await;
        let sgt = admin(&pool).await;
        let app = test_app!(pool);

        let req = test::TestRequest::post()
            .uri("/api/admin/reset-sick-ytd")
            .peer_addr(peer())
            .insert_header(bearer(&sgt))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "not_authorized");
    }

    #[actix_web::test]
    async fn accrual_runs_once_per_year() {
        let pool = test_pool().await;
        let sgt = admin(&pool).await;
        let me = officer(&pool, "jdoe", 12, 0).await;
        let app = test_app!(pool);

        let req = test::TestRequest::post()
            .uri("/api/admin/vacation-accrual")
            .peer_addr(peer())
            .insert_header(bearer(&me))
            .set_json(json!({ "year": 2031 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/api/admin/vacation-accrual")
            .peer_addr(peer())
            .insert_header(bearer(&sgt))
            .set_json(json!({ "year": 2031 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["year"], 2031);
        assert_eq!(body["processed"], 2);

        let req = test::TestRequest::post()
            .uri("/api/admin/vacation-accrual")
            .peer_addr(peer())
            .insert_header(bearer(&sgt))
            .set_json(json!({ "year": 2031 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
