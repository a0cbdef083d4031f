use crate::error::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LeaveType {
    Vacation,
    Sick,
}

/// Vacation: pending -> approved | denied | cancelled.
/// Sick requests are written as approved.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RequestStatus {
    Pending,
    Approved,
    Denied,
    Cancelled,
}

/// Inclusive, non-empty range of calendar days.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        if end < start {
            return Err(AppError::InvalidDateRange(format!(
                "end date {end} is before start date {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days in the range; always at least 1.
    pub fn len(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// Days present in both ranges, in order.
    pub fn overlap(&self, other: &DateRange) -> Vec<NaiveDate> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        match DateRange::new(start, end) {
            Ok(shared) => shared.days().collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = 1000)]
    pub user_id: i64,
    pub leave_type: LeaveType,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    /// number of days covered by the request
    #[schema(example = 5)]
    pub days: i64,
    pub note: String,
    pub status: RequestStatus,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    /// admin who decided the request, or the requester for sick leave
    pub resolver_id: Option<i64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl LeaveRequest {
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct LeaveRow {
    pub id: i64,
    pub user_id: i64,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i64,
    pub note: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub resolver_id: Option<i64>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = AppError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        let leave_type = row.leave_type.parse().map_err(|_| {
            AppError::Storage(sqlx::Error::Decode(
                format!("unknown leave type {:?}", row.leave_type).into(),
            ))
        })?;
        let status = row.status.parse().map_err(|_| {
            AppError::Storage(sqlx::Error::Decode(
                format!("unknown request status {:?}", row.status).into(),
            ))
        })?;

        Ok(LeaveRequest {
            id: row.id,
            user_id: row.user_id,
            leave_type,
            start_date: row.start_date,
            end_date: row.end_date,
            days: row.days,
            note: row.note,
            status,
            created_at: row.created_at,
            resolver_id: row.resolver_id,
            resolved_at: row.resolved_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn range_counts_both_ends() {
        let range = DateRange::new(d(2026, 2, 27), d(2026, 3, 2)).unwrap();
        assert_eq!(range.len(), 4);
        assert_eq!(
            range.days().collect::<Vec<_>>(),
            vec![d(2026, 2, 27), d(2026, 2, 28), d(2026, 3, 1), d(2026, 3, 2)]
        );
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = DateRange::new(d(2026, 3, 2), d(2026, 3, 1)).unwrap_err();
        assert!(matches!(err, AppError::InvalidDateRange(_)));
    }

    #[test]
    fn overlap_of_disjoint_ranges_is_empty() {
        let a = DateRange::new(d(2026, 1, 1), d(2026, 1, 3)).unwrap();
        let b = DateRange::new(d(2026, 1, 3), d(2026, 1, 9)).unwrap();
        let c = DateRange::new(d(2026, 1, 4), d(2026, 1, 9)).unwrap();

        assert_eq!(a.overlap(&b), vec![d(2026, 1, 3)]);
        assert!(a.overlap(&c).is_empty());
    }

    #[test]
    fn statuses_parse_in_any_case() {
        assert_eq!("Approved".parse::<RequestStatus>().unwrap(), RequestStatus::Approved);
        assert_eq!(RequestStatus::Cancelled.as_ref(), "cancelled");
        assert_eq!("SICK".parse::<LeaveType>().unwrap(), LeaveType::Sick);
    }
}
