use crate::error::AppError;
use sqlx::{Executor, Sqlite};

pub const SICK_YTD_YEAR: &str = "sick_ytd_year";
pub const VACATION_ACCRUAL_YEAR: &str = "vacation_accrual_year";

pub async fn get<'e, E>(executor: E, key: &str) -> Result<Option<String>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    Ok(
        sqlx::query_scalar::<_, String>("SELECT value FROM app_meta WHERE key = ?")
            .bind(key)
            .fetch_optional(executor)
            .await?,
    )
}

pub async fn set<'e, E>(executor: E, key: &str, value: &str) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO app_meta (key, value) VALUES (?, ?)
        ON CONFLICT (key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(executor)
    .await?;

    Ok(())
}
