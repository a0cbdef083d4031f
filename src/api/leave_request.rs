use crate::auth::auth::AuthUser;
use crate::engine::{leave, today};
use crate::engine::leave::HistoryPage;
use crate::error::AppError;
use crate::model::leave_request::{DateRange, LeaveRequest, LeaveType, RequestStatus};
use crate::store::request_log::HistoryFilter;
use actix_web::{HttpResponse, web};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct TimeOffRequest {
    #[schema(example = "vacation")]
    pub leave_type: LeaveType,
    #[schema(example = "2026-07-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    /// defaults to `start_date` for a single day
    #[schema(example = "2026-07-05", format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub note: String,
    /// file the request even if it overlaps days already on file
    #[serde(default)]
    pub force: bool,
    /// admins may file on behalf of another user
    pub user_id: Option<i64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct YearQuery {
    /// Defaults to the current year
    #[schema(example = 2026)]
    pub year: Option<i32>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct HistoryQuery {
    /// Filter by requester
    pub user_id: Option<i64>,
    /// Filter by request status
    pub status: Option<RequestStatus>,
    /// Filter by leave type
    pub leave_type: Option<LeaveType>,
    /// Requests ending on or after this day
    #[schema(format = "date", value_type = Option<String>)]
    pub date_from: Option<NaiveDate>,
    /// Requests starting on or before this day
    #[schema(format = "date", value_type = Option<String>)]
    pub date_to: Option<NaiveDate>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u32>,
    /// Pagination per page number
    #[schema(example = 25)]
    pub per_page: Option<u32>,
}

/* =========================
Submit time off
========================= */
/// Sick leave is logged and debited immediately; vacation is filed as pending.
#[utoipa::path(
    post,
    path = "/api/request-time-off",
    request_body(
        content = TimeOffRequest,
        description = "Time off payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Request recorded", body = LeaveRequest),
        (status = 400, description = "Invalid date range or insufficient balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Overlaps dates already requested")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn request_time_off(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<TimeOffRequest>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let user_id = payload.user_id.unwrap_or(auth.user_id);
    let range = match payload.end_date {
        Some(end) => DateRange::new(payload.start_date, end)?,
        None => DateRange::single(payload.start_date),
    };

    let request = match payload.leave_type {
        LeaveType::Sick => {
            leave::submit_sick(
                pool.get_ref(),
                &auth,
                user_id,
                range,
                &payload.note,
                payload.force,
            )
            .await?
        }
        LeaveType::Vacation => {
            leave::submit_vacation(
                pool.get_ref(),
                &auth,
                user_id,
                range,
                &payload.note,
                payload.force,
            )
            .await?
        }
    };

    Ok(HttpResponse::Created().json(request))
}

#[utoipa::path(
    get,
    path = "/api/my-requests",
    params(YearQuery),
    responses(
        (status = 200, description = "The caller's requests", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn my_requests(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<YearQuery>,
) -> Result<HttpResponse, AppError> {
    let year = query.year.unwrap_or_else(|| today().year());
    let requests = leave::my_requests(pool.get_ref(), &auth, year).await?;
    Ok(HttpResponse::Ok().json(requests))
}

#[utoipa::path(
    post,
    path = "/api/requests/{request_id}/cancel",
    params(("request_id" = i64, Path, description = "ID of the pending vacation request")),
    responses(
        (status = 200, description = "Request cancelled", body = LeaveRequest),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already resolved")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_request(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let request = leave::cancel_vacation(pool.get_ref(), &auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Admin queue
========================= */
#[utoipa::path(
    get,
    path = "/api/admin/requests",
    responses(
        (status = 200, description = "Pending requests, earliest first", body = [LeaveRequest]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn pending_requests(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, AppError> {
    let requests = leave::list_pending(pool.get_ref(), &auth).await?;
    Ok(HttpResponse::Ok().json(requests))
}

/// Swagger doc for approve endpoint
#[utoipa::path(
    put,
    path = "/api/admin/requests/{request_id}/approve",
    params(("request_id" = i64, Path, description = "ID of the request to approve")),
    responses(
        (status = 200, description = "Request approved", body = LeaveRequest),
        (status = 400, description = "Insufficient vacation balance"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already resolved")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_request(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let request = leave::approve_vacation(pool.get_ref(), &auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

/// Swagger doc for deny endpoint
#[utoipa::path(
    put,
    path = "/api/admin/requests/{request_id}/deny",
    params(("request_id" = i64, Path, description = "ID of the request to deny")),
    responses(
        (status = 200, description = "Request denied", body = LeaveRequest),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already resolved")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn deny_request(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let request = leave::deny_vacation(pool.get_ref(), &auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    get,
    path = "/api/admin/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Paginated request history", body = HistoryPage),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn request_history(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let filter = HistoryFilter {
        user_id: query.user_id,
        status: query.status,
        leave_type: query.leave_type,
        date_from: query.date_from,
        date_to: query.date_to,
    };

    let page = leave::history(
        pool.get_ref(),
        &auth,
        &filter,
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(25),
    )
    .await?;

    Ok(HttpResponse::Ok().json(page))
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{bearer, peer, test_app};
    use crate::db::test_pool;
    use crate::engine::testing::{admin, officer};
    use crate::engine::today;
    use actix_web::{http::StatusCode, test};
    use chrono::Duration;
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn vacation_round_trip_over_http() {
        let pool = test_pool().await;
        let me = officer(&pool, "jdoe", 80, 0).await;
        let sgt = admin(&pool).await;
        let app = test_app!(pool);

        let start = today() + Duration::days(7);
        let req = test::TestRequest::post()
            .uri("/api/request-time-off")
            .peer_addr(peer())
            .insert_header(bearer(&me))
            .set_json(json!({
                "leave_type": "vacation",
                "start_date": start,
                "end_date": start + Duration::days(4),
                "note": "family"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["status"], "pending");
        assert_eq!(created["days"], 5);
        let id = created["id"].as_i64().unwrap();

        // officers cannot decide
        let req = test::TestRequest::put()
            .uri(&format!("/api/admin/requests/{id}/approve"))
            .peer_addr(peer())
            .insert_header(bearer(&me))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::put()
            .uri(&format!("/api/admin/requests/{id}/approve"))
            .peer_addr(peer())
            .insert_header(bearer(&sgt))
            .to_request();
        let approved: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(approved["status"], "approved");

        let req = test::TestRequest::put()
            .uri(&format!("/api/admin/requests/{id}/approve"))
            .peer_addr(peer())
            .insert_header(bearer(&sgt))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "already_resolved");
    }

    #[actix_web::test]
    async fn sick_over_balance_is_bad_request() {
        let pool = test_pool().await;
        let me = officer(&pool, "jdoe", 0, 2).await;
        let app = test_app!(pool);

        let req = test::TestRequest::post()
            .uri("/api/request-time-off")
            .peer_addr(peer())
            .insert_header(bearer(&me))
            .set_json(json!({
                "leave_type": "sick",
                "start_date": today(),
                "end_date": today() + Duration::days(2)
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "insufficient_balance");
    }

    #[actix_web::test]
    async fn missing_token_is_unauthorized() {
        let pool = test_pool().await;
        let app = test_app!(pool);

        let req = test::TestRequest::get()
            .uri("/api/my-requests")
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
