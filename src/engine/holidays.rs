use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// First year Election Day is observed; it recurs every other year.
const ELECTION_BASE_YEAR: i32 = 2025;

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let last = if month == 12 {
        NaiveDate::from_ymd_opt(year, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?.pred_opt()?
    };
    let back = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    Some(last - Duration::days(back as i64))
}

/// Western Easter Sunday (anonymous Gregorian algorithm).
fn easter(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Tuesday after the first Monday of November.
fn election_day(year: i32) -> Option<NaiveDate> {
    Some(nth_weekday(year, 11, Weekday::Mon, 1)? + Duration::days(1))
}

/// Observed holidays of `year`, sorted by date.
pub fn holidays(year: i32) -> Vec<(NaiveDate, &'static str)> {
    let fixed = |month, day| NaiveDate::from_ymd_opt(year, month, day);
    let thanksgiving = nth_weekday(year, 11, Weekday::Thu, 4);

    let mut days = vec![
        (fixed(1, 1), "New Year's Day"),
        (nth_weekday(year, 1, Weekday::Mon, 3), "Martin Luther King's Birthday"),
        (fixed(2, 12), "Lincoln's Birthday"),
        (nth_weekday(year, 2, Weekday::Mon, 3), "Washington's Birthday"),
        (easter(year).map(|e| e - Duration::days(2)), "Good Friday"),
        (last_weekday(year, 5, Weekday::Mon), "Memorial Day"),
        (fixed(7, 4), "Independence Day"),
        (nth_weekday(year, 9, Weekday::Mon, 1), "Labor Day"),
        (nth_weekday(year, 10, Weekday::Mon, 2), "Columbus Day"),
        (fixed(11, 11), "Veterans' Day"),
        (thanksgiving, "Thanksgiving Day"),
        (thanksgiving.and_then(|t| t.succ_opt()), "Day after Thanksgiving Day"),
        (fixed(12, 24), "Christmas Eve Day (4 hours)"),
        (fixed(12, 25), "Christmas Day"),
    ];

    if year >= ELECTION_BASE_YEAR && (year - ELECTION_BASE_YEAR) % 2 == 0 {
        days.push((election_day(year), "Election Day"));
    }

    let mut days: Vec<_> = days
        .into_iter()
        .filter_map(|(date, name)| date.map(|d| (d, name)))
        .collect();
    days.sort_by_key(|(date, _)| *date);
    days
}

pub fn holiday_name(date: NaiveDate) -> Option<&'static str> {
    holidays(date.year())
        .into_iter()
        .find(|(d, _)| *d == date)
        .map(|(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn floating_holidays_2025() {
        assert_eq!(holiday_name(d(2025, 1, 20)), Some("Martin Luther King's Birthday"));
        assert_eq!(holiday_name(d(2025, 2, 17)), Some("Washington's Birthday"));
        assert_eq!(holiday_name(d(2025, 4, 18)), Some("Good Friday"));
        assert_eq!(holiday_name(d(2025, 5, 26)), Some("Memorial Day"));
        assert_eq!(holiday_name(d(2025, 9, 1)), Some("Labor Day"));
        assert_eq!(holiday_name(d(2025, 10, 13)), Some("Columbus Day"));
        assert_eq!(holiday_name(d(2025, 11, 27)), Some("Thanksgiving Day"));
        assert_eq!(holiday_name(d(2025, 11, 28)), Some("Day after Thanksgiving Day"));
    }

    #[test]
    fn election_day_every_other_year() {
        assert_eq!(holiday_name(d(2025, 11, 4)), Some("Election Day"));
        assert_eq!(holiday_name(d(2027, 11, 2)), Some("Election Day"));
        assert!(holidays(2026).iter().all(|(_, name)| *name != "Election Day"));
        assert!(holidays(2023).iter().all(|(_, name)| *name != "Election Day"));
    }

    #[test]
    fn good_friday_tracks_easter() {
        // Easter 2026 is April 5
        assert_eq!(holiday_name(d(2026, 4, 3)), Some("Good Friday"));
        assert_eq!(holiday_name(d(2026, 4, 5)), None);
    }

    #[test]
    fn list_is_sorted() {
        let days = holidays(2026);
        assert_eq!(days.first().map(|(d, _)| *d), Some(d(2026, 1, 1)));
        assert!(days.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
