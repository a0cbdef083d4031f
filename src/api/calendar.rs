use crate::auth::auth::AuthUser;
use crate::engine::calendar::{self, DayDetail, DaySummary};
use crate::engine::today;
use crate::error::AppError;
use actix_web::{HttpResponse, web};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct MonthQuery {
    /// Defaults to the current year
    #[schema(example = 2026)]
    pub year: Option<i32>,
    /// 1-12, defaults to the current month
    #[schema(example = 7)]
    pub month: Option<u32>,
    /// Whose calendar; admins only for anyone but themselves
    pub user_id: Option<i64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct DayQuery {
    pub user_id: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct MonthResponse {
    pub user_id: i64,
    pub display_name: String,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 7)]
    pub month: u32,
    /// blank cells before the 1st in a Sunday-first grid
    #[schema(example = 3)]
    pub leading_weekday: u32,
    #[schema(value_type = Vec<i32>, example = json!([2026, 6]))]
    pub prev: (i32, u32),
    #[schema(value_type = Vec<i32>, example = json!([2026, 8]))]
    pub next: (i32, u32),
    pub days: Vec<DaySummary>,
}

#[utoipa::path(
    get,
    path = "/api/calendar",
    params(MonthQuery),
    responses(
        (status = 200, description = "Month of shifts and statuses", body = MonthResponse),
        (status = 403, description = "Another user's calendar"),
        (status = 404, description = "Unknown user or month")
    ),
    security(("bearer_auth" = [])),
    tag = "Calendar"
)]
pub async fn month(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, AppError> {
    let now = today();
    let user_id = query.user_id.unwrap_or(auth.user_id);
    let view = calendar::get_month(
        pool.get_ref(),
        &auth,
        user_id,
        query.year.unwrap_or_else(|| now.year()),
        query.month.unwrap_or_else(|| now.month()),
    )
    .await?;

    Ok(HttpResponse::Ok().json(MonthResponse {
        user_id,
        display_name: view.user().display_name(),
        year: view.year(),
        month: view.month(),
        leading_weekday: view.leading_weekday(),
        prev: view.prev_month(),
        next: view.next_month(),
        days: view.days().collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/calendar/{date}",
    params(
        ("date" = String, Path, description = "Day as YYYY-MM-DD"),
        DayQuery
    ),
    responses(
        (status = 200, description = "Shift and status for one day", body = DayDetail),
        (status = 403, description = "Another user's calendar"),
        (status = 404, description = "Unknown user or invalid date")
    ),
    security(("bearer_auth" = [])),
    tag = "Calendar"
)]
pub async fn day(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
    query: web::Query<DayQuery>,
) -> Result<HttpResponse, AppError> {
    let date = calendar::parse_day(&path.into_inner())?;
    let user_id = query.user_id.unwrap_or(auth.user_id);
    let detail = calendar::get_day(pool.get_ref(), &auth, user_id, date).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{bearer, peer, test_app};
    use crate::db::test_pool;
    use crate::engine::testing::officer;
    use actix_web::{http::StatusCode, test};
    use serde_json::Value;

    #[actix_web::test]
    async fn month_and_day_over_http() {
        let pool = test_pool().await;
        let me = officer(&pool, "jdoe", 0, 0).await;
        let other = officer(&pool, "rroe", 0, 0).await;
        let app = test_app!(pool);

        let req = test::TestRequest::get()
            .uri("/api/calendar?year=2026&month=7")
            .peer_addr(peer())
            .insert_header(bearer(&me))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["days"].as_array().unwrap().len(), 31);
        assert_eq!(body["days"][3]["holiday"], "Independence Day");
        assert_eq!(body["prev"], serde_json::json!([2026, 6]));

        let req = test::TestRequest::get()
            .uri("/api/calendar/2026-07-04")
            .peer_addr(peer())
            .insert_header(bearer(&me))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["day"]["status"], "Off");

        let req = test::TestRequest::get()
            .uri("/api/calendar/2026-02-30")
            .peer_addr(peer())
            .insert_header(bearer(&me))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri(&format!("/api/calendar?user_id={}", other.user_id))
            .peer_addr(peer())
            .insert_header(bearer(&me))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
