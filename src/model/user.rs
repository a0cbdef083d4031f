use crate::error::AppError;
use crate::model::role::Role;
use crate::model::shift::{self, Squad};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "username": "jdoe",
        "first_name": "John",
        "last_name": "Doe",
        "rank": "Officer",
        "squad": "A",
        "call_sign": "2A14",
        "sector": "North",
        "skills": ["K9"],
        "start_time": "07:00",
        "role": "user",
        "vacation_left": 80,
        "vacation_used_today": 0,
        "sick_left": 40,
        "sick_used_ytd": 0,
        "seniority_date": "2015-03-01",
        "vacation_over_cap_approved": false,
        "vacation_min_required": 5,
        "supervisor_alert": false,
        "is_active": true
    })
)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub rank: String,
    pub squad: Option<Squad>,
    pub call_sign: String,
    pub sector: String,
    pub skills: Vec<String>,
    #[serde(with = "shift::hhmm")]
    #[schema(value_type = String, example = "07:00")]
    pub start_time: NaiveTime,
    pub role: Role,
    pub vacation_left: i64,
    pub vacation_used_today: i64,
    pub sick_left: i64,
    pub sick_used_ytd: i64,
    #[schema(example = "2015-03-01", format = "date", value_type = Option<String>)]
    pub seniority_date: Option<NaiveDate>,
    /// carryover above the cap was cleared by a supervisor
    pub vacation_over_cap_approved: bool,
    /// days that must be used this year, set by the yearly accrual
    pub vacation_min_required: i64,
    /// carryover hit the cap without approval at the last accrual
    pub supervisor_alert: bool,
    pub is_active: bool,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.last_name, self.rank)
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub rank: String,
    pub squad: String,
    pub call_sign: String,
    pub sector: String,
    pub skills: String,
    pub start_time: String,
    pub role: String,
    pub vacation_left: i64,
    pub vacation_used_today: i64,
    pub sick_left: i64,
    pub sick_used_ytd: i64,
    pub seniority_date: Option<NaiveDate>,
    pub vacation_over_cap_approved: bool,
    pub vacation_min_required: i64,
    pub supervisor_alert: bool,
    pub is_active: bool,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row.role.parse().map_err(|_| {
            AppError::Storage(sqlx::Error::Decode(
                format!("unknown role {:?}", row.role).into(),
            ))
        })?;
        let skills = serde_json::from_str(&row.skills)
            .map_err(|e| AppError::Storage(sqlx::Error::Decode(Box::new(e))))?;

        Ok(User {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            rank: row.rank,
            // unknown squads are treated as unassigned
            squad: row.squad.parse().ok(),
            call_sign: row.call_sign,
            sector: row.sector,
            skills,
            start_time: shift::start_time_or_default(&row.start_time),
            role,
            vacation_left: row.vacation_left,
            vacation_used_today: row.vacation_used_today,
            sick_left: row.sick_left,
            sick_used_ytd: row.sick_used_ytd,
            seniority_date: row.seniority_date,
            vacation_over_cap_approved: row.vacation_over_cap_approved,
            vacation_min_required: row.vacation_min_required,
            supervisor_alert: row.supervisor_alert,
            is_active: row.is_active,
        })
    }
}

/// Stored credential for login; at most one of the two is set after migration.
#[derive(Debug, sqlx::FromRow)]
pub struct Credentials {
    pub id: i64,
    pub username: String,
    pub password_hash: Option<String>,
    pub legacy_password: Option<String>,
    pub role: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewUser {
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "correct-horse")]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub rank: String,
    pub squad: Option<Squad>,
    #[serde(default)]
    pub call_sign: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[schema(example = "07:00")]
    pub start_time: Option<String>,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub vacation_left: i64,
    #[serde(default)]
    pub sick_left: i64,
    #[schema(example = "2015-03-01", format = "date", value_type = Option<String>)]
    #[serde(default)]
    pub seniority_date: Option<NaiveDate>,
}

fn default_role() -> Role {
    Role::User
}
