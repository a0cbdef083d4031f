use crate::error::AppError;
use crate::model::role::Role;
use crate::model::shift::Squad;
use crate::model::user::{Credentials, User, UserRow};
use chrono::NaiveDate;
use sqlx::{Executor, Sqlite};

const USER_COLUMNS: &str = "id, username, first_name, last_name, rank, squad, call_sign, sector, \
     skills, start_time, role, vacation_left, vacation_used_today, sick_left, sick_used_ytd, \
     seniority_date, vacation_over_cap_approved, vacation_min_required, supervisor_alert, is_active";

/// Full account record as written on provisioning or legacy import.
#[derive(Debug, Clone)]
pub struct InsertUser {
    pub username: String,
    pub password_hash: Option<String>,
    pub legacy_password: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub rank: String,
    pub squad: Option<Squad>,
    pub call_sign: String,
    pub sector: String,
    pub skills: Vec<String>,
    pub start_time: String,
    pub role: Role,
    pub vacation_left: i64,
    pub vacation_used_today: i64,
    pub sick_left: i64,
    pub sick_used_ytd: i64,
    pub seniority_date: Option<NaiveDate>,
    pub vacation_over_cap_approved: bool,
    pub is_active: bool,
}

pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<User>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .map(User::try_from)
        .transpose()
}

pub async fn list<'e, E>(executor: E, include_archived: bool) -> Result<Vec<User>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users WHERE is_active = 1 OR ? ORDER BY last_name, first_name"
    );
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(include_archived)
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
}

pub async fn count<'e, E>(executor: E) -> Result<i64, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(executor)
        .await?)
}

pub async fn find_credentials<'e, E>(
    executor: E,
    username: &str,
) -> Result<Option<Credentials>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    Ok(sqlx::query_as::<_, Credentials>(
        r#"
        SELECT id, username, password_hash, legacy_password, role, is_active
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(executor)
    .await?)
}

pub async fn insert<'e, E>(executor: E, user: &InsertUser) -> Result<i64, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let skills = serde_json::to_string(&user.skills)
        .map_err(|e| AppError::InvalidInput(format!("skills: {e}")))?;

    let result = sqlx::query(
        r#"
        INSERT INTO users
            (username, password_hash, legacy_password, first_name, last_name, rank, squad,
             call_sign, sector, skills, start_time, role, vacation_left, vacation_used_today,
             sick_left, sick_used_ytd, seniority_date, vacation_over_cap_approved, is_active)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(&user.legacy_password)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.rank)
    .bind(user.squad.map(|s| s.to_string()).unwrap_or_default())
    .bind(&user.call_sign)
    .bind(&user.sector)
    .bind(skills)
    .bind(&user.start_time)
    .bind(user.role.as_ref())
    .bind(user.vacation_left)
    .bind(user.vacation_used_today)
    .bind(user.sick_left)
    .bind(user.sick_used_ytd)
    .bind(user.seniority_date)
    .bind(user.vacation_over_cap_approved)
    .bind(user.is_active)
    .execute(executor)
    .await;

    match result {
        Ok(done) => Ok(done.last_insert_rowid()),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            AppError::Conflict(format!("username {} already exists", user.username)),
        ),
        Err(e) => Err(e.into()),
    }
}

/// Debits sick leave only if the balance covers it. Returns rows affected.
pub async fn debit_sick<'e, E>(executor: E, id: i64, days: i64) -> Result<u64, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET sick_left = sick_left - ?,
            sick_used_ytd = sick_used_ytd + ?
        WHERE id = ?
        AND is_active = 1
        AND sick_left >= ?
        "#,
    )
    .bind(days)
    .bind(days)
    .bind(id)
    .bind(days)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Debits vacation only if the balance covers it. Returns rows affected.
pub async fn debit_vacation<'e, E>(executor: E, id: i64, days: i64) -> Result<u64, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET vacation_left = vacation_left - ?,
            vacation_used_today = vacation_used_today + ?
        WHERE id = ?
        AND vacation_left >= ?
        "#,
    )
    .bind(days)
    .bind(days)
    .bind(id)
    .bind(days)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

pub async fn set_vacation_left<'e, E>(executor: E, id: i64, value: i64) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE users SET vacation_left = ? WHERE id = ?")
        .bind(value)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn set_sick_left<'e, E>(executor: E, id: i64, value: i64) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE users SET sick_left = ? WHERE id = ?")
        .bind(value)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn set_role<'e, E>(executor: E, id: i64, role: Role) -> Result<u64, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role.as_ref())
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn set_active<'e, E>(executor: E, id: i64, active: bool) -> Result<u64, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
        .bind(active)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn reset_sick_ytd<'e, E>(executor: E) -> Result<u64, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE users SET sick_used_ytd = 0 WHERE sick_used_ytd <> 0")
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Replaces any credential with an argon2 hash.
pub async fn store_password_hash<'e, E>(executor: E, id: i64, hash: &str) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE users SET password_hash = ?, legacy_password = NULL WHERE id = ?")
        .bind(hash)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Writes the outcome of a yearly accrual for one account.
pub async fn apply_accrual<'e, E>(
    executor: E,
    id: i64,
    vacation_left: i64,
    min_required: i64,
    supervisor_alert: bool,
) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        UPDATE users
        SET vacation_left = ?,
            vacation_min_required = ?,
            supervisor_alert = ?
        WHERE id = ?
        "#,
    )
    .bind(vacation_left)
    .bind(min_required)
    .bind(supervisor_alert)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}
