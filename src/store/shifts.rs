use crate::error::AppError;
use crate::model::shift::{ShiftKind, Squad};
use chrono::NaiveDate;
use sqlx::{Executor, Sqlite};

fn parse_kind(raw: &str) -> Result<ShiftKind, AppError> {
    raw.parse().map_err(|_| {
        AppError::Storage(sqlx::Error::Decode(
            format!("unknown shift kind {raw:?}").into(),
        ))
    })
}

pub async fn upsert<'e, E>(
    executor: E,
    date: NaiveDate,
    squad: Squad,
    kind: ShiftKind,
) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO shifts (date, squad, shift)
        VALUES (?, ?, ?)
        ON CONFLICT (date, squad) DO UPDATE SET shift = excluded.shift
        "#,
    )
    .bind(date)
    .bind(squad.as_ref())
    .bind(kind.as_ref())
    .execute(executor)
    .await?;

    Ok(())
}

/// Scheduled shift of `squad` on `date`, if the schedule has one.
pub async fn find<'e, E>(
    executor: E,
    squad: Squad,
    date: NaiveDate,
) -> Result<Option<ShiftKind>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar::<_, String>("SELECT shift FROM shifts WHERE date = ? AND squad = ?")
        .bind(date)
        .bind(squad.as_ref())
        .fetch_optional(executor)
        .await?
        .as_deref()
        .map(parse_kind)
        .transpose()
}

pub async fn range<'e, E>(
    executor: E,
    squad: Squad,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<(NaiveDate, ShiftKind)>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, (NaiveDate, String)>(
        r#"
        SELECT date, shift
        FROM shifts
        WHERE squad = ? AND date BETWEEN ? AND ?
        ORDER BY date
        "#,
    )
    .bind(squad.as_ref())
    .bind(from)
    .bind(to)
    .fetch_all(executor)
    .await?
    .into_iter()
    .map(|(date, raw)| Ok((date, parse_kind(&raw)?)))
    .collect()
}
