use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::shift::{ShiftKind, Squad};
use crate::store::shifts;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::info;

/// Records the squad's scheduled shift for `date`, replacing any earlier one.
pub async fn set_shift(
    pool: &SqlitePool,
    caller: &AuthUser,
    date: NaiveDate,
    squad: Squad,
    kind: ShiftKind,
) -> Result<(), AppError> {
    caller.require_admin()?;

    shifts::upsert(pool, date, squad, kind).await?;

    info!(%date, %squad, %kind, admin_id = caller.user_id, "Shift scheduled");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::engine::testing::{admin, officer};

    #[actix_web::test]
    async fn later_assignment_replaces_earlier() {
        let pool = test_pool().await;
        let sgt = admin(&pool).await;
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        set_shift(&pool, &sgt, date, Squad::B, ShiftKind::Day).await.unwrap();
        set_shift(&pool, &sgt, date, Squad::B, ShiftKind::Night).await.unwrap();

        assert_eq!(
            shifts::find(&pool, Squad::B, date).await.unwrap(),
            Some(ShiftKind::Night)
        );
        assert_eq!(shifts::find(&pool, Squad::C, date).await.unwrap(), None);
    }

    #[actix_web::test]
    async fn officers_cannot_schedule() {
        let pool = test_pool().await;
        let me = officer(&pool, "jdoe", 0, 0).await;
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        assert!(matches!(
            set_shift(&pool, &me, date, Squad::A, ShiftKind::Day).await,
            Err(AppError::NotAuthorized { .. })
        ));
    }
}
