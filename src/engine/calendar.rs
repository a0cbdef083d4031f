use crate::auth::auth::AuthUser;
use crate::engine::holidays::holiday_name;
use crate::error::AppError;
use crate::model::shift::{self, ShiftKind, Squad};
use crate::model::status_entry::{StatusEntry, StatusLabel};
use crate::model::user::User;
use crate::store::{shifts, status_log, users};
use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DaySummary {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub shift: ShiftKind,
    /// `HH:MM`; absent on days off without an entry
    #[schema(example = "07:00")]
    pub start_time: Option<String>,
    #[schema(example = "18:15")]
    pub end_time: Option<String>,
    pub status: StatusLabel,
    /// true when a status entry overrides the schedule
    pub overridden: bool,
    #[schema(example = "New Year's Day", value_type = Option<String>)]
    pub holiday: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DayDetail {
    pub user_id: i64,
    pub display_name: String,
    pub squad: Option<Squad>,
    pub call_sign: String,
    pub day: DaySummary,
}

fn summarize(
    date: NaiveDate,
    scheduled: ShiftKind,
    entry: Option<&StatusEntry>,
    start: NaiveTime,
) -> DaySummary {
    let holiday = holiday_name(date);
    match entry {
        Some(entry) => DaySummary {
            date,
            shift: entry.shift,
            start_time: Some(entry.start_time.clone()),
            end_time: Some(entry.end_time.clone()),
            status: entry.status,
            overridden: true,
            holiday,
        },
        None => {
            let on = scheduled.is_on();
            DaySummary {
                date,
                shift: scheduled,
                start_time: on.then(|| shift::format_hhmm(start)),
                end_time: on.then(|| shift::format_hhmm(shift::end_time(start))),
                status: StatusLabel::scheduled(scheduled),
                overridden: false,
                holiday,
            }
        }
    }
}

/// One user's month. Holds the rows it was built from; [`MonthView::days`]
/// derives the summaries on demand and can be called any number of times.
#[derive(Debug, Clone)]
pub struct MonthView {
    user: User,
    first: NaiveDate,
    last: NaiveDate,
    schedule: HashMap<NaiveDate, ShiftKind>,
    entries: HashMap<NaiveDate, StatusEntry>,
}

impl MonthView {
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    /// Blank cells before the 1st in a Sunday-first grid.
    pub fn leading_weekday(&self) -> u32 {
        self.first.weekday().num_days_from_sunday()
    }

    pub fn prev_month(&self) -> (i32, u32) {
        match self.month() {
            1 => (self.year() - 1, 12),
            m => (self.year(), m - 1),
        }
    }

    pub fn next_month(&self) -> (i32, u32) {
        match self.month() {
            12 => (self.year() + 1, 1),
            m => (self.year(), m + 1),
        }
    }

    pub fn days(&self) -> MonthDays<'_> {
        MonthDays {
            view: self,
            next: Some(self.first),
        }
    }

    fn summary(&self, date: NaiveDate) -> DaySummary {
        let scheduled = self
            .schedule
            .get(&date)
            .copied()
            .unwrap_or(ShiftKind::Off);
        summarize(date, scheduled, self.entries.get(&date), self.user.start_time)
    }
}

/// Lazy walk over a [`MonthView`], first day to last.
pub struct MonthDays<'a> {
    view: &'a MonthView,
    next: Option<NaiveDate>,
}

impl Iterator for MonthDays<'_> {
    type Item = DaySummary;

    fn next(&mut self) -> Option<DaySummary> {
        let date = self.next.filter(|d| *d <= self.view.last)?;
        self.next = date.succ_opt();
        Some(self.view.summary(date))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = match self.next {
            Some(d) if d <= self.view.last => (self.view.last - d).num_days() as usize + 1,
            _ => 0,
        };
        (left, Some(left))
    }
}

impl<'a> IntoIterator for &'a MonthView {
    type Item = DaySummary;
    type IntoIter = MonthDays<'a>;

    fn into_iter(self) -> MonthDays<'a> {
        self.days()
    }
}

/// Accounts shown on the calendar; archived ones are hidden.
async fn visible_user(pool: &SqlitePool, user_id: i64) -> Result<User, AppError> {
    match users::find_by_id(pool, user_id).await? {
        Some(user) if user.is_active => Ok(user),
        _ => Err(AppError::not_found(format!("user {user_id}"))),
    }
}

pub fn parse_day(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::not_found(format!("date {raw}")))
}

pub async fn get_month(
    pool: &SqlitePool,
    caller: &AuthUser,
    user_id: i64,
    year: i32,
    month: u32,
) -> Result<MonthView, AppError> {
    caller.require_self_or_admin(user_id)?;

    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::not_found(format!("month {year}-{month:02}")))?;
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| AppError::not_found(format!("month {year}-{month:02}")))?;

    let user = visible_user(pool, user_id).await?;

    let schedule = match user.squad {
        Some(squad) => shifts::range(pool, squad, first, last)
            .await?
            .into_iter()
            .collect(),
        None => HashMap::new(),
    };
    let entries = status_log::range(pool, user_id, first, last)
        .await?
        .into_iter()
        .map(|e| (e.date, e))
        .collect();

    Ok(MonthView {
        user,
        first,
        last,
        schedule,
        entries,
    })
}

pub async fn get_day(
    pool: &SqlitePool,
    caller: &AuthUser,
    user_id: i64,
    date: NaiveDate,
) -> Result<DayDetail, AppError> {
    caller.require_self_or_admin(user_id)?;

    let user = visible_user(pool, user_id).await?;

    let scheduled = match user.squad {
        Some(squad) => shifts::find(pool, squad, date)
            .await?
            .unwrap_or(ShiftKind::Off),
        None => ShiftKind::Off,
    };
    let entry = status_log::find(pool, user_id, date).await?;

    Ok(DayDetail {
        user_id,
        display_name: user.display_name(),
        squad: user.squad,
        call_sign: user.call_sign.clone(),
        day: summarize(date, scheduled, entry.as_ref(), user.start_time),
    })
}
