use crate::auth::auth::AuthUser;
use crate::engine::{active_user, status_entry, today};
use crate::error::AppError;
use crate::model::leave_request::DateRange;
use crate::model::status_entry::StatusLabel;
use crate::store::{audit, status_log};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;
use utoipa::ToSchema;

/// Furthest day ahead a manual status may be set.
pub const DAY_STATUS_HORIZON_DAYS: i64 = 30;

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct DayStatusOutcome {
    pub updated: Vec<String>,
    /// days kept because they already carry approved leave
    pub skipped: Vec<String>,
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Sets an admin-managed status on each day of `range`. Days holding leave
/// (Vacation or Sick) are reported back as skipped.
pub async fn set_day_status(
    pool: &SqlitePool,
    caller: &AuthUser,
    user_id: i64,
    range: DateRange,
    status: StatusLabel,
    note: &str,
) -> Result<DayStatusOutcome, AppError> {
    caller.require_admin()?;

    if status.is_protected() {
        return Err(AppError::InvalidInput(format!(
            "{status} is set through leave requests"
        )));
    }

    let first = today();
    let last = first + Duration::days(DAY_STATUS_HORIZON_DAYS);
    if range.start() < first || range.end() > last {
        return Err(AppError::InvalidDateRange(format!(
            "day status can only be set between {first} and {last}"
        )));
    }

    let mut tx = pool.begin().await?;
    let user = active_user(&mut tx, user_id).await?;

    let mut outcome = DayStatusOutcome::default();
    for day in range.days() {
        let current = status_log::find(&mut *tx, user_id, day).await?;
        if current.is_some_and(|e| e.status.is_protected()) {
            outcome.skipped.push(iso(day));
            continue;
        }

        let entry = status_entry(&mut tx, &user, day, status).await?;
        status_log::upsert(&mut *tx, &entry).await?;
        outcome.updated.push(iso(day));
    }

    if !outcome.updated.is_empty() {
        audit::append(
            &mut tx,
            user_id,
            Some(caller.user_id),
            "day_status_updated",
            json!({
                "status": status,
                "dates": outcome.updated,
                "skipped": outcome.skipped,
                "note": note,
            }),
        )
        .await?;
    }

    tx.commit().await?;

    info!(
        user_id,
        admin_id = caller.user_id,
        %status,
        updated = outcome.updated.len(),
        skipped = outcome.skipped.len(),
        "Day status set"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::engine::leave::submit_sick;
    use crate::engine::testing::{admin, officer};

    fn ahead(days: i64, len: i64) -> DateRange {
        let start = today() + Duration::days(days);
        DateRange::new(start, start + Duration::days(len - 1)).unwrap()
    }

    #[actix_web::test]
    async fn leave_days_are_protected() {
        let pool = test_pool().await;
        let me = officer(&pool, "jdoe", 0, 5).await;
        let sgt = admin(&pool).await;

        submit_sick(&pool, &me, me.user_id, ahead(1, 1), "", false).await.unwrap();

        let outcome = set_day_status(&pool, &sgt, me.user_id, ahead(0, 3), StatusLabel::Training, "range")
            .await
            .unwrap();
        assert_eq!(outcome.updated.len(), 2);
        assert_eq!(outcome.skipped, vec![iso(today() + Duration::days(1))]);

        let sick_day = status_log::find(&pool, me.user_id, today() + Duration::days(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sick_day.status, StatusLabel::Sick);

        let training = status_log::find(&pool, me.user_id, today() + Duration::days(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(training.status, StatusLabel::Training);
    }

    #[actix_web::test]
    async fn window_is_today_to_thirty_days_out() {
        let pool = test_pool().await;
        let me = officer(&pool, "jdoe", 0, 0).await;
        let sgt = admin(&pool).await;

        assert!(matches!(
            set_day_status(&pool, &sgt, me.user_id, ahead(-1, 1), StatusLabel::Off, "").await,
            Err(AppError::InvalidDateRange(_))
        ));
        assert!(matches!(
            set_day_status(&pool, &sgt, me.user_id, ahead(30, 2), StatusLabel::Off, "").await,
            Err(AppError::InvalidDateRange(_))
        ));
        assert!(set_day_status(&pool, &sgt, me.user_id, ahead(30, 1), StatusLabel::Off, "")
            .await
            .is_ok());
    }

    #[actix_web::test]
    async fn leave_labels_cannot_be_set_by_hand() {
        let pool = test_pool().await;
        let me = officer(&pool, "jdoe", 0, 0).await;
        let sgt = admin(&pool).await;

        assert!(matches!(
            set_day_status(&pool, &sgt, me.user_id, ahead(0, 1), StatusLabel::Vacation, "").await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            set_day_status(&pool, &me, me.user_id, ahead(0, 1), StatusLabel::Off, "").await,
            Err(AppError::NotAuthorized { .. })
        ));
    }
}
