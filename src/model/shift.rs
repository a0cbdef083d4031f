use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum Squad {
    A,
    B,
    C,
    D,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ShiftKind {
    Day,
    Night,
    Off,
}

impl ShiftKind {
    pub fn is_on(self) -> bool {
        self != ShiftKind::Off
    }
}

/// Length of a patrol shift: 11h15m.
pub fn shift_length() -> Duration {
    Duration::hours(11) + Duration::minutes(15)
}

pub fn end_time(start: NaiveTime) -> NaiveTime {
    // wraps past midnight for night shifts
    start.overflowing_add_signed(shift_length()).0
}

pub const DEFAULT_START: &str = "07:00";

pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Parses a stored start time, falling back to 07:00 for blank or malformed values.
pub fn start_time_or_default(value: &str) -> NaiveTime {
    parse_hhmm(value).unwrap_or_else(|| NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default())
}

pub fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Serde adapter for `HH:MM` times.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_hhmm(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_hhmm(&raw).ok_or_else(|| D::Error::custom(format!("expected HH:MM, got {raw:?}")))
    }
}
