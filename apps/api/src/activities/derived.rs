//! Fields computed from user input and never accepted from the client.

use chrono::{Datelike, NaiveDate};

/// Quarter bucket: Jan-Mar → 1, Apr-Jun → 2, Jul-Sep → 3, Oct-Dec → 4.
pub fn sprint_for_date(date: NaiveDate) -> i32 {
    (date.month0() / 3 + 1) as i32
}

pub fn year_for_date(date: NaiveDate) -> i32 {
    date.year()
}

/// Key enforcing one activity per (name, date, creator).
pub fn unique_identifier(name: &str, date: NaiveDate, creator_id: i64) -> String {
    let slug = name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    format!("{slug}_{date}_{creator_id}")
}
