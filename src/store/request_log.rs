use crate::error::AppError;
use crate::model::leave_request::{DateRange, LeaveRequest, LeaveRow, LeaveType, RequestStatus};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

const LEAVE_COLUMNS: &str = "id, user_id, leave_type, start_date, end_date, days, note, status, \
     created_at, resolver_id, resolved_at";

pub struct NewLeave<'a> {
    pub user_id: i64,
    pub leave_type: LeaveType,
    pub range: DateRange,
    pub note: &'a str,
    pub status: RequestStatus,
    pub resolver_id: Option<i64>,
    pub now: DateTime<Utc>,
}

/// Filters for the admin history listing; every field is optional.
#[derive(Debug, Default, Clone)]
pub struct HistoryFilter {
    pub user_id: Option<i64>,
    pub status: Option<RequestStatus>,
    pub leave_type: Option<LeaveType>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    I64(i64),
    Str(&'a str),
    Date(NaiveDate),
}

fn into_requests(rows: Vec<LeaveRow>) -> Result<Vec<LeaveRequest>, AppError> {
    rows.into_iter().map(LeaveRequest::try_from).collect()
}

pub async fn insert<'e, E>(executor: E, leave: NewLeave<'_>) -> Result<LeaveRequest, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let resolved_at = leave.resolver_id.map(|_| leave.now);
    let sql = format!(
        r#"
        INSERT INTO leave_requests
            (user_id, leave_type, start_date, end_date, days, note, status, created_at,
             resolver_id, resolved_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {LEAVE_COLUMNS}
        "#
    );

    let row = sqlx::query_as::<_, LeaveRow>(&sql)
        .bind(leave.user_id)
        .bind(leave.leave_type.as_ref())
        .bind(leave.range.start())
        .bind(leave.range.end())
        .bind(leave.range.len())
        .bind(leave.note)
        .bind(leave.status.as_ref())
        .bind(leave.now)
        .bind(leave.resolver_id)
        .bind(resolved_at)
        .fetch_one(executor)
        .await?;

    row.try_into()
}

pub async fn find<'e, E>(executor: E, id: i64) -> Result<Option<LeaveRequest>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");
    sqlx::query_as::<_, LeaveRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .map(LeaveRequest::try_from)
        .transpose()
}

/// Moves a pending vacation request to `status`, optionally only when it
/// belongs to `owner`. Returns `None` when the request is missing, not a
/// vacation request, not the owner's, or no longer pending; the caller tells
/// those apart.
pub async fn resolve_pending<'e, E>(
    executor: E,
    id: i64,
    status: RequestStatus,
    owner: Option<i64>,
    resolver_id: i64,
    now: DateTime<Utc>,
) -> Result<Option<LeaveRequest>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        r#"
        UPDATE leave_requests
        SET status = ?, resolver_id = ?, resolved_at = ?
        WHERE id = ?
        AND leave_type = 'vacation'
        AND status = 'pending'
        AND (? IS NULL OR user_id = ?)
        RETURNING {LEAVE_COLUMNS}
        "#
    );

    sqlx::query_as::<_, LeaveRow>(&sql)
        .bind(status.as_ref())
        .bind(resolver_id)
        .bind(now)
        .bind(id)
        .bind(owner)
        .bind(owner)
        .fetch_optional(executor)
        .await?
        .map(LeaveRequest::try_from)
        .transpose()
}

/// Pending or approved requests of `user_id` that share at least one day with `range`.
pub async fn overlapping<'e, E>(
    executor: E,
    user_id: i64,
    range: &DateRange,
) -> Result<Vec<LeaveRequest>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        r#"
        SELECT {LEAVE_COLUMNS}
        FROM leave_requests
        WHERE user_id = ?
        AND status IN ('pending', 'approved')
        AND start_date <= ?
        AND end_date >= ?
        ORDER BY start_date
        "#
    );

    let rows = sqlx::query_as::<_, LeaveRow>(&sql)
        .bind(user_id)
        .bind(range.end())
        .bind(range.start())
        .fetch_all(executor)
        .await?;

    into_requests(rows)
}

pub async fn list_pending<'e, E>(executor: E) -> Result<Vec<LeaveRequest>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        r#"
        SELECT {LEAVE_COLUMNS}
        FROM leave_requests
        WHERE status = 'pending'
        ORDER BY start_date, id
        "#
    );

    let rows = sqlx::query_as::<_, LeaveRow>(&sql).fetch_all(executor).await?;
    into_requests(rows)
}

/// Requests of one user touching `window`, newest first.
pub async fn list_for_user<'e, E>(
    executor: E,
    user_id: i64,
    window: &DateRange,
) -> Result<Vec<LeaveRequest>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        r#"
        SELECT {LEAVE_COLUMNS}
        FROM leave_requests
        WHERE user_id = ?
        AND start_date <= ?
        AND end_date >= ?
        ORDER BY start_date DESC, id DESC
        "#
    );

    let rows = sqlx::query_as::<_, LeaveRow>(&sql)
        .bind(user_id)
        .bind(window.end())
        .bind(window.start())
        .fetch_all(executor)
        .await?;

    into_requests(rows)
}

/// One page of history plus the total number of matching rows.
pub async fn list_history(
    pool: &SqlitePool,
    filter: &HistoryFilter,
    limit: i64,
    offset: i64,
) -> Result<(Vec<LeaveRequest>, i64), AppError> {
    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(user_id) = filter.user_id {
        where_sql.push_str(" AND user_id = ?");
        args.push(FilterValue::I64(user_id));
    }

    if let Some(status) = filter.status.as_ref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status.as_ref()));
    }

    if let Some(leave_type) = filter.leave_type.as_ref() {
        where_sql.push_str(" AND leave_type = ?");
        args.push(FilterValue::Str(leave_type.as_ref()));
    }

    // requests overlapping the window count as inside it
    if let Some(from) = filter.date_from {
        where_sql.push_str(" AND end_date >= ?");
        args.push(FilterValue::Date(from));
    }

    if let Some(to) = filter.date_to {
        where_sql.push_str(" AND start_date <= ?");
        args.push(FilterValue::Date(to));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{where_sql}");

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::I64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
            FilterValue::Date(d) => count_q.bind(*d),
        };
    }

    let total = count_q.fetch_one(pool).await?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT {LEAVE_COLUMNS}
        FROM leave_requests
        {where_sql}
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#
    );

    let mut data_q = sqlx::query_as::<_, LeaveRow>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::I64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
            FilterValue::Date(d) => data_q.bind(d),
        };
    }

    let rows = data_q.bind(limit).bind(offset).fetch_all(pool).await?;

    Ok((into_requests(rows)?, total))
}
