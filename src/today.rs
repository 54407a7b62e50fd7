use chrono::{Local, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::normalize::CanonicalRow;

/// Calendar date right now in the named IANA zone, falling back to the local
/// zone when the name is empty or unknown. Called on every render pass.
pub fn current_date(timezone: Option<&str>) -> NaiveDate {
    match timezone.and_then(parse_timezone) {
        Some(tz) => Utc::now().with_timezone(&tz).date_naive(),
        None => Local::now().date_naive(),
    }
}

pub fn parse_timezone(name: &str) -> Option<Tz> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<Tz>().ok()
}

/// Sort key of the row dated `today`, if the window contains one.
pub fn today_marker(rows: &[CanonicalRow], today: NaiveDate) -> Option<&str> {
    rows.binary_search_by(|row| row.date.cmp(&today))
        .ok()
        .map(|idx| rows[idx].sort_key.as_str())
}
