//! Sick and vacation requests: validation, quota debits, status entries and
//! the request log, each applied in a single transaction.

use crate::auth::auth::AuthUser;
use crate::engine::{active_user, status_entry, today};
use crate::error::AppError;
use crate::model::leave_request::{DateRange, LeaveRequest, LeaveType, RequestStatus};
use crate::model::role::Role;
use crate::model::status_entry::StatusLabel;
use crate::store::request_log::{self, HistoryFilter, NewLeave};
use crate::store::{audit, status_log, users};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryPage {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 25)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/// Tells apart why a pending-only update matched nothing.
async fn not_pending(conn: &mut SqliteConnection, request_id: i64) -> AppError {
    match request_log::find(conn, request_id).await {
        Ok(Some(request)) => AppError::AlreadyResolved {
            request_id,
            status: request.status,
        },
        Ok(None) => AppError::not_found(format!("request {request_id}")),
        Err(e) => e,
    }
}

/// Longest span one request may cover.
pub const MAX_REQUEST_DAYS: i64 = 366;

fn check_length(range: &DateRange) -> Result<(), AppError> {
    if range.len() > MAX_REQUEST_DAYS {
        return Err(AppError::InvalidDateRange(format!(
            "{} days requested, at most {MAX_REQUEST_DAYS} per request",
            range.len()
        )));
    }
    Ok(())
}

/// Days of `range` already covered by a pending or approved request of the user.
async fn days_on_file(
    conn: &mut SqliteConnection,
    user_id: i64,
    range: &DateRange,
) -> Result<Vec<NaiveDate>, AppError> {
    let mut dates: Vec<NaiveDate> = request_log::overlapping(conn, user_id, range)
        .await?
        .iter()
        .flat_map(|existing| range.overlap(&existing.range()))
        .collect();
    dates.sort();
    dates.dedup();
    Ok(dates)
}

async fn write_status(
    conn: &mut SqliteConnection,
    user_id: i64,
    range: &DateRange,
    label: StatusLabel,
) -> Result<(), AppError> {
    let user = users::find_by_id(&mut *conn, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;

    for day in range.days() {
        let entry = status_entry(conn, &user, day, label).await?;
        status_log::upsert(&mut *conn, &entry).await?;
    }
    Ok(())
}

/// Logs sick leave for `user_id`: debited and marked on the calendar at once.
/// Days already on file are refused unless `force` is set.
pub async fn submit_sick(
    pool: &SqlitePool,
    caller: &AuthUser,
    user_id: i64,
    range: DateRange,
    note: &str,
    force: bool,
) -> Result<LeaveRequest, AppError> {
    caller.require_self_or_admin(user_id)?;
    check_length(&range)?;

    let days = range.len();
    let mut tx = pool.begin().await?;
    let user = active_user(&mut tx, user_id).await?;

    if !force {
        let dates = days_on_file(&mut tx, user_id, &range).await?;
        if !dates.is_empty() {
            return Err(AppError::DuplicateDates { dates });
        }
    }

    if user.sick_left < days {
        return Err(AppError::InsufficientBalance {
            requested: days,
            available: user.sick_left,
        });
    }

    if users::debit_sick(&mut *tx, user_id, days).await? == 0 {
        return Err(AppError::InsufficientBalance {
            requested: days,
            available: user.sick_left,
        });
    }

    write_status(&mut tx, user_id, &range, StatusLabel::Sick).await?;

    let request = request_log::insert(
        &mut *tx,
        NewLeave {
            user_id,
            leave_type: LeaveType::Sick,
            range,
            note,
            status: RequestStatus::Approved,
            resolver_id: Some(caller.user_id),
            now: Utc::now(),
        },
    )
    .await?;

    audit::append(
        &mut tx,
        user_id,
        Some(caller.user_id),
        "sick_logged",
        json!({
            "request_id": request.id,
            "start_date": range.start(),
            "end_date": range.end(),
            "days": days,
            "sick_left_before": user.sick_left,
            "sick_left_after": user.sick_left - days,
            "forced": force,
        }),
    )
    .await?;

    tx.commit().await?;

    info!(request_id = request.id, user_id, days, "Sick leave logged");
    Ok(request)
}

/// Files a pending vacation request. No quota moves until an admin approves.
pub async fn submit_vacation(
    pool: &SqlitePool,
    caller: &AuthUser,
    user_id: i64,
    range: DateRange,
    note: &str,
    force: bool,
) -> Result<LeaveRequest, AppError> {
    caller.require_self_or_admin(user_id)?;
    check_length(&range)?;

    if range.start() < today() {
        return Err(AppError::InvalidDateRange(format!(
            "vacation cannot start in the past ({})",
            range.start()
        )));
    }

    let mut tx = pool.begin().await?;
    active_user(&mut tx, user_id).await?;

    if !force {
        let dates = days_on_file(&mut tx, user_id, &range).await?;
        if !dates.is_empty() {
            return Err(AppError::DuplicateDates { dates });
        }
    }

    let request = request_log::insert(
        &mut *tx,
        NewLeave {
            user_id,
            leave_type: LeaveType::Vacation,
            range,
            note,
            status: RequestStatus::Pending,
            resolver_id: None,
            now: Utc::now(),
        },
    )
    .await?;

    audit::append(
        &mut tx,
        user_id,
        Some(caller.user_id),
        "vacation_requested",
        json!({
            "request_id": request.id,
            "start_date": range.start(),
            "end_date": range.end(),
            "days": request.days,
            "forced": force,
        }),
    )
    .await?;

    tx.commit().await?;

    info!(request_id = request.id, user_id, days = request.days, "Vacation requested");
    Ok(request)
}

/// Approves a pending vacation request and debits the requester.
///
/// The status flip runs first: of two concurrent approvals only one matches
/// `status = 'pending'`, the other gets `AlreadyResolved`. When the balance
/// cannot cover the request the transaction is dropped and it stays pending.
pub async fn approve_vacation(
    pool: &SqlitePool,
    caller: &AuthUser,
    request_id: i64,
) -> Result<LeaveRequest, AppError> {
    caller.require_admin()?;

    let mut tx = pool.begin().await?;

    let request = match request_log::resolve_pending(
        &mut *tx,
        request_id,
        RequestStatus::Approved,
        None,
        caller.user_id,
        Utc::now(),
    )
    .await?
    {
        Some(request) => request,
        None => return Err(not_pending(&mut tx, request_id).await),
    };

    if users::debit_vacation(&mut *tx, request.user_id, request.days).await? == 0 {
        let available = users::find_by_id(&mut *tx, request.user_id)
            .await?
            .map(|u| u.vacation_left)
            .unwrap_or_default();
        warn!(
            request_id,
            user_id = request.user_id,
            requested = request.days,
            available,
            "Approval rejected: insufficient vacation"
        );
        return Err(AppError::InsufficientBalance {
            requested: request.days,
            available,
        });
    }

    write_status(&mut tx, request.user_id, &request.range(), StatusLabel::Vacation).await?;

    audit::append(
        &mut tx,
        request.user_id,
        Some(caller.user_id),
        "vacation_decision",
        json!({
            "request_id": request_id,
            "decision": RequestStatus::Approved,
            "days": request.days,
        }),
    )
    .await?;

    tx.commit().await?;

    info!(request_id, admin_id = caller.user_id, days = request.days, "Vacation approved");
    Ok(request)
}

pub async fn deny_vacation(
    pool: &SqlitePool,
    caller: &AuthUser,
    request_id: i64,
) -> Result<LeaveRequest, AppError> {
    caller.require_admin()?;

    let mut tx = pool.begin().await?;

    let request = match request_log::resolve_pending(
        &mut *tx,
        request_id,
        RequestStatus::Denied,
        None,
        caller.user_id,
        Utc::now(),
    )
    .await?
    {
        Some(request) => request,
        None => return Err(not_pending(&mut tx, request_id).await),
    };

    audit::append(
        &mut tx,
        request.user_id,
        Some(caller.user_id),
        "vacation_decision",
        json!({
            "request_id": request_id,
            "decision": RequestStatus::Denied,
            "days": request.days,
        }),
    )
    .await?;

    tx.commit().await?;

    info!(request_id, admin_id = caller.user_id, "Vacation denied");
    Ok(request)
}

/// Withdraws a pending vacation request; open to its owner and to admins.
pub async fn cancel_vacation(
    pool: &SqlitePool,
    caller: &AuthUser,
    request_id: i64,
) -> Result<LeaveRequest, AppError> {
    // users may only flip their own requests; admins any
    let owner = (!caller.role.allows(Role::Admin)).then_some(caller.user_id);

    let mut tx = pool.begin().await?;

    let request = match request_log::resolve_pending(
        &mut *tx,
        request_id,
        RequestStatus::Cancelled,
        owner,
        caller.user_id,
        Utc::now(),
    )
    .await?
    {
        Some(request) => request,
        None => {
            let existing = request_log::find(&mut *tx, request_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("request {request_id}")))?;
            caller.require_self_or_admin(existing.user_id)?;
            return Err(AppError::AlreadyResolved {
                request_id,
                status: existing.status,
            });
        }
    };

    audit::append(
        &mut tx,
        request.user_id,
        Some(caller.user_id),
        "vacation_cancelled",
        json!({ "request_id": request_id }),
    )
    .await?;

    tx.commit().await?;

    info!(request_id, actor_id = caller.user_id, "Vacation cancelled");
    Ok(request)
}

pub async fn list_pending(pool: &SqlitePool, caller: &AuthUser) -> Result<Vec<LeaveRequest>, AppError> {
    caller.require_admin()?;
    request_log::list_pending(pool).await
}

pub async fn history(
    pool: &SqlitePool,
    caller: &AuthUser,
    filter: &HistoryFilter,
    page: u32,
    per_page: u32,
) -> Result<HistoryPage, AppError> {
    caller.require_admin()?;

    let page = page.max(1);
    let per_page = per_page.clamp(1, 200);
    let offset = (page as i64 - 1) * per_page as i64;

    let (data, total) = request_log::list_history(pool, filter, per_page as i64, offset).await?;

    Ok(HistoryPage {
        data,
        page,
        per_page,
        total,
    })
}

/// The caller's own requests touching `year`, newest first.
pub async fn my_requests(
    pool: &SqlitePool,
    caller: &AuthUser,
    year: i32,
) -> Result<Vec<LeaveRequest>, AppError> {
    let window = match (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) {
        (Some(start), Some(end)) => DateRange::new(start, end)?,
        _ => return Err(AppError::InvalidInput(format!("year {year} out of range"))),
    };

    request_log::list_for_user(pool, caller.user_id, &window).await
}
