use crate::auth::auth::AuthUser;
use crate::auth::password::{hash_password, verify_password};
use crate::error::AppError;
use crate::model::role::Role;
use crate::model::shift::{self, Squad};
use crate::model::user::{NewUser, User};
use crate::store::audit::{self, AuditEvent};
use crate::store::users::{self, InsertUser};
use crate::utils::db_utils::{build_update_sql, execute_update};
use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Profile columns an admin may edit through [`update_profile`].
pub const PROFILE_FIELDS: &[&str] = &[
    "first_name",
    "last_name",
    "rank",
    "squad",
    "call_sign",
    "sector",
    "skills",
    "start_time",
    "seniority_date",
    "vacation_over_cap_approved",
];

async fn load(pool: &SqlitePool, user_id: i64) -> Result<User, AppError> {
    users::find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {user_id}")))
}

pub async fn get_user(pool: &SqlitePool, caller: &AuthUser, user_id: i64) -> Result<User, AppError> {
    caller.require_self_or_admin(user_id)?;
    load(pool, user_id).await
}

pub async fn list_users(
    pool: &SqlitePool,
    caller: &AuthUser,
    include_archived: bool,
) -> Result<Vec<User>, AppError> {
    caller.require_admin()?;
    users::list(pool, include_archived).await
}

pub async fn create_user(
    pool: &SqlitePool,
    caller: &AuthUser,
    new_user: NewUser,
) -> Result<User, AppError> {
    caller.require_admin()?;
    // nobody hands out more than they hold
    caller.require(new_user.role)?;

    let username = new_user.username.trim().to_lowercase();
    if username.is_empty() || new_user.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Username and password must not be empty".into(),
        ));
    }
    if new_user.vacation_left < 0 || new_user.sick_left < 0 {
        return Err(AppError::InvalidInput("Balances cannot be negative".into()));
    }

    let start_time = match new_user.start_time.as_deref() {
        None | Some("") => shift::DEFAULT_START.to_string(),
        Some(raw) => shift::parse_hhmm(raw)
            .map(shift::format_hhmm)
            .ok_or_else(|| AppError::InvalidInput(format!("start_time {raw:?} is not HH:MM")))?,
    };

    let password_hash = hash_password(&new_user.password)
        .map_err(|e| AppError::InvalidInput(format!("password could not be hashed: {e}")))?;

    let mut tx = pool.begin().await?;

    let id = users::insert(
        &mut *tx,
        &InsertUser {
            username: username.clone(),
            password_hash: Some(password_hash),
            legacy_password: None,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            rank: new_user.rank,
            squad: new_user.squad,
            call_sign: new_user.call_sign,
            sector: new_user.sector,
            skills: new_user.skills,
            start_time,
            role: new_user.role,
            vacation_left: new_user.vacation_left,
            vacation_used_today: 0,
            sick_left: new_user.sick_left,
            sick_used_ytd: 0,
            seniority_date: new_user.seniority_date,
            vacation_over_cap_approved: false,
            is_active: true,
        },
    )
    .await?;

    audit::append(
        &mut tx,
        id,
        Some(caller.user_id),
        "account_created",
        json!({ "username": username, "role": new_user.role }),
    )
    .await?;

    let user = users::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {id}")))?;

    tx.commit().await?;

    info!(user_id = id, %username, admin_id = caller.user_id, "Account created");
    Ok(user)
}

/// Checks and normalizes each profile value before it reaches the update builder.
fn normalize_profile(payload: &Value) -> Result<Value, AppError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AppError::InvalidInput("Payload must be a JSON object".into()))?;

    let mut out = Map::new();
    for (key, value) in obj {
        let normalized = match (key.as_str(), value) {
            ("squad", Value::Null) => Value::String(String::new()),
            ("squad", Value::String(s)) if s.trim().is_empty() => Value::String(String::new()),
            ("squad", Value::String(s)) => {
                let squad: Squad = s
                    .trim()
                    .parse()
                    .map_err(|_| AppError::InvalidInput(format!("unknown squad {s:?}")))?;
                Value::String(squad.to_string())
            }
            ("start_time", Value::String(s)) => shift::parse_hhmm(s)
                .map(|t| Value::String(shift::format_hhmm(t)))
                .ok_or_else(|| AppError::InvalidInput(format!("start_time {s:?} is not HH:MM")))?,
            ("skills", Value::Array(items)) if items.iter().all(Value::is_string) => value.clone(),
            ("skills", _) => {
                return Err(AppError::InvalidInput("skills must be a list of strings".into()));
            }
            ("seniority_date", Value::Null) => Value::Null,
            ("seniority_date", Value::String(s)) if s.trim().is_empty() => Value::Null,
            ("seniority_date", Value::String(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(|d| Value::String(d.to_string()))
                .map_err(|_| AppError::InvalidInput(format!("seniority_date {s:?} is not YYYY-MM-DD")))?,
            ("vacation_over_cap_approved", Value::Bool(_)) => value.clone(),
            ("vacation_over_cap_approved", _) => {
                return Err(AppError::InvalidInput(
                    "vacation_over_cap_approved must be a boolean".into(),
                ));
            }
            (_, Value::String(_)) => value.clone(),
            (field, _) => {
                return Err(AppError::InvalidInput(format!("{field} must be a string")));
            }
        };
        out.insert(key.clone(), normalized);
    }

    Ok(Value::Object(out))
}

/// Partial profile update; only [`PROFILE_FIELDS`] may be set.
pub async fn update_profile(
    pool: &SqlitePool,
    caller: &AuthUser,
    user_id: i64,
    payload: &Value,
) -> Result<User, AppError> {
    caller.require_admin()?;

    let normalized = normalize_profile(payload)?;
    let update = build_update_sql("users", &normalized, PROFILE_FIELDS, "id", user_id)?;

    let mut tx = pool.begin().await?;

    if execute_update(&mut *tx, update).await? == 0 {
        return Err(AppError::not_found(format!("user {user_id}")));
    }

    audit::append(
        &mut tx,
        user_id,
        Some(caller.user_id),
        "profile_updated",
        normalized,
    )
    .await?;

    let user = users::find_by_id(&mut *tx, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;

    tx.commit().await?;

    info!(user_id, admin_id = caller.user_id, "Profile updated");
    Ok(user)
}

pub async fn set_role(
    pool: &SqlitePool,
    caller: &AuthUser,
    user_id: i64,
    role: Role,
) -> Result<User, AppError> {
    caller.require_webmaster()?;

    let mut tx = pool.begin().await?;

    let before = users::find_by_id(&mut *tx, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;
    users::set_role(&mut *tx, user_id, role).await?;

    audit::append(
        &mut tx,
        user_id,
        Some(caller.user_id),
        "role_changed",
        json!({ "before": before.role, "after": role }),
    )
    .await?;

    tx.commit().await?;

    info!(user_id, %role, actor_id = caller.user_id, "Role changed");
    Ok(User { role, ..before })
}

async fn set_active(
    pool: &SqlitePool,
    caller: &AuthUser,
    user_id: i64,
    active: bool,
) -> Result<User, AppError> {
    caller.require_admin()?;

    if !active && caller.user_id == user_id {
        return Err(AppError::InvalidInput("You cannot archive your own account".into()));
    }

    let mut tx = pool.begin().await?;

    let before = users::find_by_id(&mut *tx, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;
    users::set_active(&mut *tx, user_id, active).await?;

    let action = if active { "account_restored" } else { "account_archived" };
    audit::append(&mut tx, user_id, Some(caller.user_id), action, json!({})).await?;

    tx.commit().await?;

    info!(user_id, active, admin_id = caller.user_id, "Account state changed");
    Ok(User {
        is_active: active,
        ..before
    })
}

/// Soft delete: the account stays on file but cannot log in or appear on the calendar.
pub async fn archive_user(pool: &SqlitePool, caller: &AuthUser, user_id: i64) -> Result<User, AppError> {
    set_active(pool, caller, user_id, false).await
}

pub async fn unarchive_user(pool: &SqlitePool, caller: &AuthUser, user_id: i64) -> Result<User, AppError> {
    set_active(pool, caller, user_id, true).await
}

pub async fn audit_trail(
    pool: &SqlitePool,
    caller: &AuthUser,
    user_id: i64,
    limit: i64,
) -> Result<Vec<AuditEvent>, AppError> {
    caller.require_admin()?;
    load(pool, user_id).await?;
    audit::list_for_user(pool, user_id, limit.clamp(1, audit::AUDIT_RETENTION)).await
}

/// Checks a username/password pair. `None` covers unknown users, archived
/// accounts and wrong passwords alike.
///
/// Accounts imported with a plaintext password get it replaced by an argon2
/// hash on their first successful login.
pub async fn authenticate(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<Option<AuthUser>, AppError> {
    let username = username.trim().to_lowercase();

    let creds = match users::find_credentials(pool, &username).await? {
        Some(c) => c,
        None => {
            debug!(%username, "Unknown username");
            return Ok(None);
        }
    };

    if !creds.is_active {
        info!(user_id = creds.id, "Login refused: account archived");
        return Ok(None);
    }

    let verified = match (&creds.password_hash, &creds.legacy_password) {
        (Some(hash), _) => match verify_password(password, hash) {
            Ok(ok) => ok,
            Err(e) => {
                warn!(user_id = creds.id, error = %e, "Stored password hash is unreadable");
                false
            }
        },
        (None, Some(legacy)) => {
            let ok = !legacy.is_empty() && legacy == password;
            if ok {
                match hash_password(password) {
                    Ok(hash) => {
                        users::store_password_hash(pool, creds.id, &hash).await?;
                        info!(user_id = creds.id, "Legacy password migrated");
                    }
                    // the login still succeeds; migration is retried next time
                    Err(e) => warn!(user_id = creds.id, error = %e, "Password migration failed"),
                }
            }
            ok
        }
        (None, None) => false,
    };

    if !verified {
        return Ok(None);
    }

    let role = creds.role.parse::<Role>().map_err(|_| {
        AppError::Storage(sqlx::Error::Decode(
            format!("unknown role {:?}", creds.role).into(),
        ))
    })?;

    Ok(Some(AuthUser {
        user_id: creds.id,
        username: creds.username,
        role,
    }))
}

/// One record of a legacy `users.json` (username → record).
#[derive(Debug, Deserialize)]
struct LegacyUser {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    rank: String,
    #[serde(default)]
    squad: String,
    #[serde(default)]
    call_sign: String,
    #[serde(default)]
    sector: String,
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default)]
    start_time: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    vacation_left: f64,
    #[serde(default)]
    vacation_used_today: f64,
    #[serde(default)]
    sick_left: f64,
    #[serde(default)]
    sick_used_ytd: f64,
    #[serde(default)]
    seniority_date: String,
    #[serde(default)]
    vacation_over_cap_approved: bool,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

fn whole_days(value: f64) -> i64 {
    if value.is_finite() {
        value.round().max(0.0) as i64
    } else {
        0
    }
}

fn legacy_role(username: &str, raw: &str) -> Role {
    match raw.trim().to_lowercase().as_str() {
        "" | "user" => Role::User,
        // squad-scoped powers have no counterpart here; an admin grants them explicitly
        "supervisor" => {
            warn!(%username, "Legacy supervisor imported as user");
            Role::User
        }
        other => other.parse().unwrap_or_else(|_| {
            warn!(role = other, "Unknown legacy role, importing as user");
            Role::User
        }),
    }
}

impl LegacyUser {
    fn into_insert(self, username: &str) -> InsertUser {
        let start_time = shift::format_hhmm(shift::start_time_or_default(&self.start_time));

        InsertUser {
            username: username.trim().to_lowercase(),
            password_hash: None,
            legacy_password: Some(self.password).filter(|p| !p.is_empty()),
            first_name: self.first_name,
            last_name: self.last_name,
            rank: self.rank,
            squad: self.squad.trim().parse().ok(),
            call_sign: self.call_sign,
            sector: self.sector,
            skills: self.skills,
            start_time,
            role: legacy_role(username, &self.role),
            vacation_left: whole_days(self.vacation_left),
            vacation_used_today: whole_days(self.vacation_used_today),
            sick_left: whole_days(self.sick_left),
            sick_used_ytd: whole_days(self.sick_used_ytd),
            seniority_date: NaiveDate::parse_from_str(self.seniority_date.trim(), "%Y-%m-%d").ok(),
            vacation_over_cap_approved: self.vacation_over_cap_approved,
            is_active: self.is_active,
        }
    }
}

/// Seeds an empty user table from a legacy `users.json`. Returns the number
/// of accounts imported; a populated table is left untouched.
pub async fn import_legacy_users(pool: &SqlitePool, path: &Path) -> anyhow::Result<usize> {
    if users::count(pool).await? > 0 {
        debug!("User table already populated, skipping import");
        return Ok(0);
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records: BTreeMap<String, LegacyUser> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let mut tx = pool.begin().await?;
    let mut imported = 0;

    for (username, record) in records {
        if username.trim().is_empty() {
            warn!("Skipping legacy record with empty username");
            continue;
        }
        users::insert(&mut *tx, &record.into_insert(&username))
            .await
            .with_context(|| format!("Failed to import {username}"))?;
        imported += 1;
    }

    tx.commit().await?;

    info!(imported, path = %path.display(), "Legacy users imported");
    Ok(imported)
}
