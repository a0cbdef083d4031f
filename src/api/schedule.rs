use crate::auth::auth::AuthUser;
use crate::engine::day_status::{self, DayStatusOutcome};
use crate::engine::schedule;
use crate::error::AppError;
use crate::model::leave_request::DateRange;
use crate::model::shift::{ShiftKind, Squad};
use crate::model::status_entry::StatusLabel;
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct DayStatusUpdate {
    pub user_id: i64,
    #[schema(example = "2026-07-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-07-03", format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    /// Available, Off, Training or Other
    #[schema(example = "Training")]
    pub status: StatusLabel,
    #[serde(default)]
    pub note: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ShiftAssignment {
    #[schema(example = "2026-07-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub squad: Squad,
    pub shift: ShiftKind,
}

#[utoipa::path(
    post,
    path = "/api/admin/day-status",
    request_body(content = DayStatusUpdate, content_type = "application/json"),
    responses(
        (status = 200, description = "Days updated; leave days skipped", body = DayStatusOutcome),
        (status = 400, description = "Outside today..today+30 or a leave status"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn set_day_status(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<DayStatusUpdate>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let range = match payload.end_date {
        Some(end) => DateRange::new(payload.start_date, end)?,
        None => DateRange::single(payload.start_date),
    };

    let outcome = day_status::set_day_status(
        pool.get_ref(),
        &auth,
        payload.user_id,
        range,
        payload.status,
        &payload.note,
    )
    .await?;

    Ok(HttpResponse::Ok().json(outcome))
}

#[utoipa::path(
    put,
    path = "/api/admin/shifts",
    request_body(content = ShiftAssignment, content_type = "application/json"),
    responses(
        (status = 200, description = "Shift recorded", body = Object,
         example = json!({ "message": "Shift recorded" })),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn set_shift(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<ShiftAssignment>,
) -> Result<HttpResponse, AppError> {
    schedule::set_shift(
        pool.get_ref(),
        &auth,
        payload.date,
        payload.squad,
        payload.shift,
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Shift recorded" })))
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
    async fn day_status_over_http() {
        let pool = test_pool().await;
        let sgt = admin(&pool).await;
        let me = officer(&pool, "jdoe", 0, 0).await;
        let app = test_app!(pool);

        let req = test::TestRequest::post()
            .uri("/api/admin/day-status")
            .peer_addr(peer())
            .insert_header(bearer(&sgt))
            .set_json(json!({
                "user_id": me.user_id,
                "start_date": today(),
                "end_date": today() + Duration::days(1),
                "status": "Training"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["updated"].as_array().unwrap().len(), 2);

        let req = test::TestRequest::put()
            .uri("/api/admin/shifts")
            .peer_addr(peer())
            .insert_header(bearer(&me))
            .set_json(json!({ "date": today(), "squad": "A", "shift": "day" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
