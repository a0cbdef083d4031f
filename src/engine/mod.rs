pub mod accounts;
pub mod balances;
pub mod calendar;
pub mod day_status;
pub mod holidays;
pub mod leave;
pub mod schedule;

use crate::error::AppError;
use crate::model::shift::{self, ShiftKind};
use crate::model::status_entry::{StatusEntry, StatusLabel};
use crate::model::user::User;
use crate::store::{shifts, users};
use chrono::{Local, NaiveDate};
use sqlx::SqliteConnection;

/// Local calendar day; date-window checks are made against it.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Loads an account that may still act: archived users count as absent.
pub(crate) async fn active_user(conn: &mut SqliteConnection, user_id: i64) -> Result<User, AppError> {
    match users::find_by_id(&mut *conn, user_id).await? {
        Some(user) if user.is_active => Ok(user),
        _ => Err(AppError::not_found(format!("user {user_id}"))),
    }
}

/// Scheduled shift of the user's squad; unassigned users and unscheduled days are off.
pub(crate) async fn scheduled_shift(
    conn: &mut SqliteConnection,
    user: &User,
    date: NaiveDate,
) -> Result<ShiftKind, AppError> {
    match user.squad {
        Some(squad) => Ok(shifts::find(&mut *conn, squad, date)
            .await?
            .unwrap_or(ShiftKind::Off)),
        None => Ok(ShiftKind::Off),
    }
}

/// Status entry carrying the shift metadata in effect for that day.
pub(crate) async fn status_entry(
    conn: &mut SqliteConnection,
    user: &User,
    date: NaiveDate,
    status: StatusLabel,
) -> Result<StatusEntry, AppError> {
    let kind = scheduled_shift(conn, user, date).await?;

    Ok(StatusEntry {
        user_id: user.id,
        date,
        status,
        shift: kind,
        start_time: shift::format_hhmm(user.start_time),
        end_time: shift::format_hhmm(shift::end_time(user.start_time)),
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::auth::auth::AuthUser;
    use crate::model::role::Role;
    use crate::store::users::{self, InsertUser};
    use sqlx::SqlitePool;

    pub fn account(username: &str, role: Role) -> InsertUser {
        InsertUser {
            username: username.to_string(),
            password_hash: None,
            legacy_password: None,
            first_name: "Test".into(),
            last_name: username.to_string(),
            rank: "Officer".into(),
            squad: None,
            call_sign: String::new(),
            sector: String::new(),
            skills: Vec::new(),
            start_time: "07:00".into(),
            role,
            vacation_left: 0,
            vacation_used_today: 0,
            sick_left: 0,
            sick_used_ytd: 0,
            seniority_date: None,
            vacation_over_cap_approved: false,
            is_active: true,
        }
    }

    /// Inserts the account and returns the identity it would log in with.
    pub async fn seed(pool: &SqlitePool, user: InsertUser) -> AuthUser {
        let id = users::insert(pool, &user).await.unwrap();
        AuthUser {
            user_id: id,
            username: user.username,
            role: user.role,
        }
    }

    pub async fn officer(pool: &SqlitePool, username: &str, vacation: i64, sick: i64) -> AuthUser {
        seed(
            pool,
            InsertUser {
                vacation_left: vacation,
                sick_left: sick,
                ..account(username, Role::User)
            },
        )
        .await
    }

    pub async fn admin(pool: &SqlitePool) -> AuthUser {
        seed(pool, account("sgt", Role::Admin)).await
    }
}
