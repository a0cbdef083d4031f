use crate::error::AppError;
use crate::model::shift::ShiftKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum StatusLabel {
    Available,
    Sick,
    Vacation,
    Off,
    Training,
    Other,
}

impl StatusLabel {
    /// Statuses written by approved leave; manual day-status edits never replace them.
    pub fn is_protected(self) -> bool {
        matches!(self, StatusLabel::Sick | StatusLabel::Vacation)
    }

    /// Status shown when no entry exists for the day.
    pub fn scheduled(shift: ShiftKind) -> Self {
        if shift.is_on() {
            StatusLabel::Available
        } else {
            StatusLabel::Off
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatusEntry {
    pub user_id: i64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub status: StatusLabel,
    pub shift: ShiftKind,
    #[schema(example = "07:00")]
    pub start_time: String,
    #[schema(example = "18:15")]
    pub end_time: String,
}

#[derive(Debug, sqlx::FromRow)]
pub struct StatusRow {
    pub user_id: i64,
    pub date: NaiveDate,
    pub status: String,
    pub shift: String,
    pub start_time: String,
    pub end_time: String,
}

impl TryFrom<StatusRow> for StatusEntry {
    type Error = AppError;

    fn try_from(row: StatusRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| {
            AppError::Storage(sqlx::Error::Decode(
                format!("unknown status label {:?}", row.status).into(),
            ))
        })?;
        let shift = row.shift.parse().map_err(|_| {
            AppError::Storage(sqlx::Error::Decode(
                format!("unknown shift kind {:?}", row.shift).into(),
            ))
        })?;

        Ok(StatusEntry {
            user_id: row.user_id,
            date: row.date,
            status,
            shift,
            start_time: row.start_time,
            end_time: row.end_time,
        })
    }
}
