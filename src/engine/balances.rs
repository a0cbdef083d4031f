use crate::auth::auth::AuthUser;
use crate::engine::today;
use crate::error::AppError;
use crate::model::user::User;
use crate::store::{audit, meta, users};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;
use strum_macros::{AsRefStr, Display};
use tracing::{info, warn};
use utoipa::ToSchema;

/// Leave thresholds are agreed in hours; balances are kept in days.
const HOURS_PER_DAY: i64 = 8;
/// Carryover kept without supervisor approval (560 hours).
pub const CARRYOVER_CAP_DAYS: i64 = 560 / HOURS_PER_DAY;
/// Carryover up to 240 hours needs 40 hours used in the year, more needs 80.
const LOW_CARRYOVER_DAYS: i64 = 240 / HOURS_PER_DAY;
const MIN_USE_LOW_DAYS: i64 = 40 / HOURS_PER_DAY;
const MIN_USE_HIGH_DAYS: i64 = 80 / HOURS_PER_DAY;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Quota {
    Vacation,
    Sick,
}

/// Applies a signed correction to one balance; the result never drops below zero.
/// Sick corrections leave `sick_used_ytd` alone.
pub async fn adjust(
    pool: &SqlitePool,
    caller: &AuthUser,
    user_id: i64,
    quota: Quota,
    delta: i64,
    note: &str,
) -> Result<User, AppError> {
    caller.require_admin()?;

    if delta == 0 {
        return Err(AppError::InvalidInput("delta must be non-zero".into()));
    }

    let mut tx = pool.begin().await?;

    let user = users::find_by_id(&mut *tx, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;

    let before = match quota {
        Quota::Vacation => user.vacation_left,
        Quota::Sick => user.sick_left,
    };
    let after = before.saturating_add(delta).max(0);

    match quota {
        Quota::Vacation => users::set_vacation_left(&mut *tx, user_id, after).await?,
        Quota::Sick => users::set_sick_left(&mut *tx, user_id, after).await?,
    }

    audit::append(
        &mut tx,
        user_id,
        Some(caller.user_id),
        "balance_adjusted",
        json!({
            "quota": quota.as_ref(),
            "delta": delta,
            "before": before,
            "after": after,
            "note": note,
        }),
    )
    .await?;

    let updated = users::find_by_id(&mut *tx, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;

    tx.commit().await?;

    info!(user_id, admin_id = caller.user_id, %quota, delta, before, after, "Balance adjusted");
    Ok(updated)
}

pub async fn adjust_vacation(
    pool: &SqlitePool,
    caller: &AuthUser,
    user_id: i64,
    delta: i64,
    note: &str,
) -> Result<User, AppError> {
    adjust(pool, caller, user_id, Quota::Vacation, delta, note).await
}

pub async fn adjust_sick(
    pool: &SqlitePool,
    caller: &AuthUser,
    user_id: i64,
    delta: i64,
    note: &str,
) -> Result<User, AppError> {
    adjust(pool, caller, user_id, Quota::Sick, delta, note).await
}

/// Zeroes every user's year-to-date sick usage. Returns how many changed.
pub async fn reset_sick_ytd(pool: &SqlitePool, caller: &AuthUser) -> Result<u64, AppError> {
    caller.require_webmaster()?;

    let mut tx = pool.begin().await?;
    let changed = users::reset_sick_ytd(&mut *tx).await?;
    meta::set(&mut *tx, meta::SICK_YTD_YEAR, &today().year().to_string()).await?;
    tx.commit().await?;

    info!(changed, actor_id = caller.user_id, "Sick YTD reset");
    Ok(changed)
}

/// Start-up check: zero `sick_used_ytd` once per calendar year.
/// Returns true when a rollover happened.
pub async fn rollover_sick_ytd_if_needed(pool: &SqlitePool, year: i32) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;

    let recorded = meta::get(&mut *tx, meta::SICK_YTD_YEAR)
        .await?
        .and_then(|v| v.parse::<i32>().ok());

    if recorded.is_some_and(|y| y >= year) {
        return Ok(false);
    }

    let changed = users::reset_sick_ytd(&mut *tx).await?;
    meta::set(&mut *tx, meta::SICK_YTD_YEAR, &year.to_string()).await?;
    tx.commit().await?;

    info!(year, changed, previous = ?recorded, "Sick YTD rolled over");
    Ok(true)
}

/// Whole years of service completed on `at`.
pub fn years_of_service(seniority: NaiveDate, at: NaiveDate) -> i64 {
    let mut years = i64::from(at.year() - seniority.year());
    if (at.month(), at.day()) < (seniority.month(), seniority.day()) {
        years -= 1;
    }
    years.max(0)
}

/// Vacation days earned for `year`, by the years of service reached on Dec 31.
pub fn entitlement_days(seniority: Option<NaiveDate>, year: i32) -> i64 {
    let (Some(seniority), Some(dec31)) = (seniority, NaiveDate::from_ymd_opt(year, 12, 31)) else {
        return 0;
    };

    match years_of_service(seniority, dec31) {
        0 => 0,
        1..=4 => 10,
        5..=9 => 15,
        10..=14 => 20,
        years => 25 + (years - 15),
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Carryover {
    pub days: i64,
    pub min_required: i64,
    pub supervisor_alert: bool,
}

/// Caps the balance carried into the new year and derives its minimum use.
pub fn carryover(prior_days: i64, over_cap_approved: bool) -> Carryover {
    let prior = prior_days.max(0);
    let (days, supervisor_alert) = if prior > CARRYOVER_CAP_DAYS && !over_cap_approved {
        (CARRYOVER_CAP_DAYS, true)
    } else {
        (prior, false)
    };

    let min_required = if days <= LOW_CARRYOVER_DAYS {
        MIN_USE_LOW_DAYS
    } else {
        MIN_USE_HIGH_DAYS
    };

    Carryover {
        days,
        min_required,
        supervisor_alert,
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccrualSummary {
    #[schema(example = 2026)]
    pub year: i32,
    /// active accounts credited
    #[schema(example = 42)]
    pub processed: usize,
    /// accounts whose carryover was capped without approval
    #[schema(example = 1)]
    pub flagged: usize,
}

/// Opens `year` for every active account: carryover is capped, the yearly
/// entitlement is added and the minimum use recorded. Runs once per year.
pub async fn run_accrual(
    pool: &SqlitePool,
    caller: &AuthUser,
    year: i32,
) -> Result<AccrualSummary, AppError> {
    caller.require_admin()?;

    let mut tx = pool.begin().await?;

    let recorded = meta::get(&mut *tx, meta::VACATION_ACCRUAL_YEAR)
        .await?
        .and_then(|v| v.parse::<i32>().ok());
    if recorded.is_some_and(|y| y >= year) {
        return Err(AppError::Conflict(format!(
            "vacation accrual already ran for {}",
            recorded.unwrap_or(year)
        )));
    }

    let accounts = users::list(&mut *tx, false).await?;
    let mut flagged = 0;

    for user in &accounts {
        let entitlement = entitlement_days(user.seniority_date, year);
        let carry = carryover(user.vacation_left, user.vacation_over_cap_approved);
        let balance = carry.days + entitlement;

        users::apply_accrual(
            &mut *tx,
            user.id,
            balance,
            carry.min_required,
            carry.supervisor_alert,
        )
        .await?;

        audit::append(
            &mut tx,
            user.id,
            Some(caller.user_id),
            "vacation_accrual",
            json!({
                "year": year,
                "entitlement_days": entitlement,
                "carryover_in": user.vacation_left,
                "carryover_out": carry.days,
                "min_required": carry.min_required,
                "over_cap_approved": user.vacation_over_cap_approved,
                "supervisor_alert": carry.supervisor_alert,
                "vacation_left": balance,
            }),
        )
        .await?;

        if carry.supervisor_alert {
            flagged += 1;
            warn!(
                user_id = user.id,
                carryover_in = user.vacation_left,
                cap = CARRYOVER_CAP_DAYS,
                "Carryover capped without approval"
            );
        }
    }

    meta::set(&mut *tx, meta::VACATION_ACCRUAL_YEAR, &year.to_string()).await?;
    tx.commit().await?;

    info!(year, processed = accounts.len(), flagged, admin_id = caller.user_id, "Vacation accrual applied");
    Ok(AccrualSummary {
        year,
        processed: accounts.len(),
        flagged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::engine::testing::{account, admin, officer, seed};
    use crate::model::role::Role;
    use crate::store::users::InsertUser;

    #[actix_web::test]
    async fn adjustment_clamps_at_zero() {
        let pool = test_pool().await;
        let me = officer(&pool, "jdoe", 5, 3).await;
        let sgt = admin(&pool).await;

        let user = adjust_vacation(&pool, &sgt, me.user_id, -8, "correction")
            .await
            .unwrap();
        assert_eq!(user.vacation_left, 0);

        let user = adjust_vacation(&pool, &sgt, me.user_id, 12, "carryover")
            .await
            .unwrap();
        assert_eq!(user.vacation_left, 12);

        let events = audit::list_for_user(&pool, me.user_id, 10).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].details["before"], 5);
        assert_eq!(events[1].details["after"], 0);
    }

    #[actix_web::test]
    async fn sick_adjustment_keeps_ytd() {
        let pool = test_pool().await;
        let sgt = admin(&pool).await;
        let me = seed(
            &pool,
            InsertUser {
                sick_left: 4,
                sick_used_ytd: 6,
                ..account("jdoe", Role::User)
            },
        )
        .await;

        let user = adjust_sick(&pool, &sgt, me.user_id, 2, "").await.unwrap();
        assert_eq!(user.sick_left, 6);
        assert_eq!(user.sick_used_ytd, 6);
    }

    #[actix_web::test]
    async fn zero_delta_and_non_admins_are_rejected() {
        let pool = test_pool().await;
        let me = officer(&pool, "jdoe", 5, 3).await;
        let sgt = admin(&pool).await;

        assert!(matches!(
            adjust_vacation(&pool, &sgt, me.user_id, 0, "").await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            adjust_vacation(&pool, &me, me.user_id, 5, "").await,
            Err(AppError::NotAuthorized { .. })
        ));
        assert!(matches!(
            adjust_sick(&pool, &sgt, 999, 1, "").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn reset_is_webmaster_only() {
        let pool = test_pool().await;
        let sgt = admin(&pool).await;
        let web = seed(&pool, account("web", Role::Webmaster)).await;
        seed(
            &pool,
            InsertUser {
                sick_used_ytd: 4,
                ..account("jdoe", Role::User)
            },
        )
        .await;

        assert!(matches!(
            reset_sick_ytd(&pool, &sgt).await,
            Err(AppError::NotAuthorized {
                required: Role::Webmaster
            })
        ));
        assert_eq!(reset_sick_ytd(&pool, &web).await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn rollover_runs_once_per_year() {
        let pool = test_pool().await;
        let me = seed(
            &pool,
            InsertUser {
                sick_left: 5,
                sick_used_ytd: 7,
                ..account("jdoe", Role::User)
            },
        )
        .await;

        assert!(rollover_sick_ytd_if_needed(&pool, 2026).await.unwrap());
        let user = users::find_by_id(&pool, me.user_id).await.unwrap().unwrap();
        assert_eq!(user.sick_used_ytd, 0);
        assert_eq!(user.sick_left, 5);

        assert!(!rollover_sick_ytd_if_needed(&pool, 2026).await.unwrap());
        assert!(rollover_sick_ytd_if_needed(&pool, 2027).await.unwrap());
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn entitlement_follows_service_tiers() {
        assert_eq!(entitlement_days(None, 2026), 0);
        assert_eq!(entitlement_days(Some(d(2025, 6, 1)), 2025), 0);
        assert_eq!(entitlement_days(Some(d(2025, 6, 1)), 2026), 10);
        assert_eq!(entitlement_days(Some(d(2021, 1, 1)), 2025), 10);
        assert_eq!(entitlement_days(Some(d(2021, 1, 1)), 2026), 15);
        assert_eq!(entitlement_days(Some(d(2016, 12, 31)), 2026), 20);
        assert_eq!(entitlement_days(Some(d(2011, 12, 31)), 2026), 25);
        assert_eq!(entitlement_days(Some(d(2011, 12, 31)), 2027), 26);
        assert_eq!(entitlement_days(Some(d(2000, 3, 1)), 2026), 36);
    }

    #[test]
    fn service_counts_completed_years() {
        assert_eq!(years_of_service(d(2010, 6, 15), d(2026, 6, 14)), 15);
        assert_eq!(years_of_service(d(2010, 6, 15), d(2026, 6, 15)), 16);
        assert_eq!(years_of_service(d(2030, 1, 1), d(2026, 12, 31)), 0);
    }

    #[test]
    fn carryover_is_capped_unless_approved() {
        assert_eq!(
            carryover(30, false),
            Carryover { days: 30, min_required: 5, supervisor_alert: false }
        );
        assert_eq!(carryover(31, false).min_required, 10);
        assert_eq!(
            carryover(CARRYOVER_CAP_DAYS + 1, false),
            Carryover { days: CARRYOVER_CAP_DAYS, min_required: 10, supervisor_alert: true }
        );
        assert_eq!(
            carryover(CARRYOVER_CAP_DAYS + 1, true),
            Carryover { days: CARRYOVER_CAP_DAYS + 1, min_required: 10, supervisor_alert: false }
        );
        assert_eq!(carryover(-3, false).days, 0);
    }

    #[actix_web::test]
    async fn accrual_credits_active_accounts_once() {
        let pool = test_pool().await;
        let sgt = admin(&pool).await;
        let senior = seed(
            &pool,
            InsertUser {
                vacation_left: 100,
                seniority_date: Some(d(2010, 6, 1)),
                ..account("senior", Role::User)
            },
        )
        .await;
        let approved = seed(
            &pool,
            InsertUser {
                vacation_left: 100,
                seniority_date: Some(d(2010, 6, 1)),
                vacation_over_cap_approved: true,
                ..account("approved", Role::User)
            },
        )
        .await;
        let rookie = officer(&pool, "rookie", 12, 0).await;
        let archived = seed(
            &pool,
            InsertUser {
                vacation_left: 3,
                is_active: false,
                ..account("gone", Role::User)
            },
        )
        .await;

        assert!(matches!(
            run_accrual(&pool, &rookie, 2026).await,
            Err(AppError::NotAuthorized { .. })
        ));

        let summary = run_accrual(&pool, &sgt, 2026).await.unwrap();
        assert_eq!(summary.processed, 4);
        assert_eq!(summary.flagged, 1);

        let user = users::find_by_id(&pool, senior.user_id).await.unwrap().unwrap();
        assert_eq!(user.vacation_left, CARRYOVER_CAP_DAYS + 26);
        assert_eq!(user.vacation_min_required, 10);
        assert!(user.supervisor_alert);

        let user = users::find_by_id(&pool, approved.user_id).await.unwrap().unwrap();
        assert_eq!(user.vacation_left, 126);
        assert!(!user.supervisor_alert);

        let user = users::find_by_id(&pool, rookie.user_id).await.unwrap().unwrap();
        assert_eq!(user.vacation_left, 12);
        assert_eq!(user.vacation_min_required, 5);

        let user = users::find_by_id(&pool, archived.user_id).await.unwrap().unwrap();
        assert_eq!(user.vacation_left, 3);

        let events = audit::list_for_user(&pool, senior.user_id, 10).await.unwrap();
        assert_eq!(events[0].action, "vacation_accrual");
        assert_eq!(events[0].details["carryover_in"], 100);
        assert_eq!(events[0].details["carryover_out"], CARRYOVER_CAP_DAYS);

        assert!(matches!(
            run_accrual(&pool, &sgt, 2026).await,
            Err(AppError::Conflict(_))
        ));
    }
}
