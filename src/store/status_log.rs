use crate::error::AppError;
use crate::model::status_entry::{StatusEntry, StatusRow};
use chrono::NaiveDate;
use sqlx::{Executor, Sqlite};

/// Writes the entry for (user, date), replacing any earlier one.
pub async fn upsert<'e, E>(executor: E, entry: &StatusEntry) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO status_entries (user_id, date, status, shift, start_time, end_time)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (user_id, date) DO UPDATE SET
            status = excluded.status,
            shift = excluded.shift,
            start_time = excluded.start_time,
            end_time = excluded.end_time
        "#,
    )
    .bind(entry.user_id)
    .bind(entry.date)
    .bind(entry.status.as_ref())
    .bind(entry.shift.as_ref())
    .bind(&entry.start_time)
    .bind(&entry.end_time)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn find<'e, E>(
    executor: E,
    user_id: i64,
    date: NaiveDate,
) -> Result<Option<StatusEntry>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, StatusRow>(
        r#"
        SELECT user_id, date, status, shift, start_time, end_time
        FROM status_entries
        WHERE user_id = ? AND date = ?
        "#,
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(executor)
    .await?
    .map(StatusEntry::try_from)
    .transpose()
}

/// Entries of one user between `from` and `to` inclusive, by date.
pub async fn range<'e, E>(
    executor: E,
    user_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<StatusEntry>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, StatusRow>(
        r#"
        SELECT user_id, date, status, shift, start_time, end_time
        FROM status_entries
        WHERE user_id = ? AND date BETWEEN ? AND ?
        ORDER BY date
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_all(executor)
    .await?
    .into_iter()
    .map(StatusEntry::try_from)
    .collect()
}
