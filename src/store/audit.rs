use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, Sqlite, SqliteConnection};
use utoipa::ToSchema;

/// Events kept per user; older ones are pruned on append.
pub const AUDIT_RETENTION: i64 = 500;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuditEvent {
    pub id: i64,
    pub user_id: i64,
    pub actor_id: Option<i64>,
    #[schema(example = "vacation_decision")]
    pub action: String,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: i64,
    user_id: i64,
    actor_id: Option<i64>,
    action: String,
    details: String,
    created_at: DateTime<Utc>,
}

pub async fn append(
    conn: &mut SqliteConnection,
    user_id: i64,
    actor_id: Option<i64>,
    action: &str,
    details: serde_json::Value,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (user_id, actor_id, action, details, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(actor_id)
    .bind(action)
    .bind(details.to_string())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        DELETE FROM audit_log
        WHERE user_id = ?
        AND id NOT IN (
            SELECT id FROM audit_log WHERE user_id = ? ORDER BY id DESC LIMIT ?
        )
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .bind(AUDIT_RETENTION)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Newest first.
pub async fn list_for_user<'e, E>(
    executor: E,
    user_id: i64,
    limit: i64,
) -> Result<Vec<AuditEvent>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, AuditRow>(
        r#"
        SELECT id, user_id, actor_id, action, details, created_at
        FROM audit_log
        WHERE user_id = ?
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| AuditEvent {
            id: row.id,
            user_id: row.user_id,
            actor_id: row.actor_id,
            action: row.action,
            // rows are only written by `append`, so this is valid JSON
            details: serde_json::from_str(&row.details).unwrap_or(serde_json::Value::Null),
            created_at: row.created_at,
        })
        .collect())
}
