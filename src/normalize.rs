use std::collections::BTreeMap;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

use crate::characteristic::Characteristic;
use crate::command::{RawField, RawRecord};

const SORT_KEY_FORMAT: &str = "%Y-%m-%d";
const DISPLAY_LABEL_FORMAT: &str = "%b %-d";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("malformed date `{date}`")]
    MalformedDate { date: String },
}

/// One day of weather, every characteristic numeric or absent.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRow {
    pub date: NaiveDate,
    pub sort_key: String,
    pub display_label: String,
    values: [Option<f64>; 6],
}

impl CanonicalRow {
    pub fn new(date: NaiveDate) -> Self {
        CanonicalRow {
            date,
            sort_key: date.format(SORT_KEY_FORMAT).to_string(),
            display_label: date.format(DISPLAY_LABEL_FORMAT).to_string(),
            values: [None; 6],
        }
    }

    pub fn value(&self, characteristic: Characteristic) -> Option<f64> {
        self.values[characteristic.index()]
    }

    pub fn set_value(&mut self, characteristic: Characteristic, value: Option<f64>) {
        self.values[characteristic.index()] = value.filter(|v| v.is_finite());
    }

    pub fn with_value(mut self, characteristic: Characteristic, value: f64) -> Self {
        self.set_value(characteristic, Some(value));
        self
    }

    #[cfg(test)]
    pub fn to_raw_record(&self) -> RawRecord {
        let mut record = RawRecord::new(self.sort_key.clone());
        for characteristic in Characteristic::ALL {
            record.set_field(
                characteristic,
                self.value(characteristic).map(RawField::Number),
            );
        }
        record
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub rows: Vec<CanonicalRow>,
    pub rejected: Vec<NormalizeError>,
}

pub fn normalize_records(records: &[RawRecord]) -> Normalized {
    let mut by_date: BTreeMap<NaiveDate, CanonicalRow> = BTreeMap::new();
    let mut rejected = Vec::new();
    for record in records {
        let Some(date) = parse_record_date(&record.date) else {
            warn!(date = %record.date, "dropping record with malformed date");
            rejected.push(NormalizeError::MalformedDate {
                date: record.date.clone(),
            });
            continue;
        };
        let mut row = CanonicalRow::new(date);
        for characteristic in Characteristic::ALL {
            row.set_value(characteristic, coerce_field(record.field(characteristic)));
        }
        if by_date.insert(date, row).is_some() {
            debug!(sort_key = %date, "duplicate date, keeping the later record");
        }
    }
    Normalized {
        rows: by_date.into_values().collect(),
        rejected,
    }
}

/// Reads the leading year-month-day of a date string, ignoring any time or
/// zone suffix.
pub fn parse_record_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let prefix: String = trimmed.chars().take(10).collect();
    if let Ok(date) = NaiveDate::parse_from_str(&prefix, SORT_KEY_FORMAT) {
        return Some(date);
    }
    NaiveDate::parse_and_remainder(trimmed, SORT_KEY_FORMAT)
        .ok()
        .filter(|(_, rest)| {
            rest.chars()
                .next()
                .map(|c| !c.is_ascii_digit())
                .unwrap_or(true)
        })
        .map(|(date, _)| date)
}

fn coerce_field(field: Option<&RawField>) -> Option<f64> {
    let value = match field? {
        RawField::Number(value) => *value,
        RawField::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
    };
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn sorts_records_and_coerces_strings() {
        let records = vec![
            RawRecord::new("2024-01-03").with_field(
                Characteristic::TemperatureMax,
                RawField::Text("22".to_string()),
            ),
            RawRecord::new("2024-01-01")
                .with_field(Characteristic::TemperatureMax, RawField::Number(20.0)),
        ];
        let normalized = normalize_records(&records);
        assert!(normalized.rejected.is_empty());
        let keys: Vec<_> = normalized.rows.iter().map(|r| r.sort_key.as_str()).collect();
        assert_eq!(keys, ["2024-01-01", "2024-01-03"]);
        assert_eq!(
            normalized.rows[0].value(Characteristic::TemperatureMax),
            Some(20.0)
        );
        assert_eq!(
            normalized.rows[1].value(Characteristic::TemperatureMax),
            Some(22.0)
        );
        assert_eq!(normalized.rows[0].display_label, "Jan 1");
    }

    #[test]
    fn missing_and_garbage_fields_are_absent_not_zero() {
        let records = vec![
            RawRecord::new("2024-02-10")
                .with_field(Characteristic::TemperatureMax, RawField::Text(" ".to_string()))
                .with_field(Characteristic::PressureMean, RawField::Text("n/a".to_string()))
                .with_field(Characteristic::WindSpeedMax, RawField::Number(f64::NAN))
                .with_field(Characteristic::HumidityMax, RawField::Text(" 81 ".to_string())),
        ];
        let row = &normalize_records(&records).rows[0];
        assert_eq!(row.value(Characteristic::TemperatureMax), None);
        assert_eq!(row.value(Characteristic::PrecipitationSum), None);
        assert_eq!(row.value(Characteristic::PressureMean), None);
        assert_eq!(row.value(Characteristic::WindSpeedMax), None);
        assert_eq!(row.value(Characteristic::HumidityMax), Some(81.0));
    }

    #[test]
    fn tolerates_time_suffixes_and_unpadded_dates() {
        assert_eq!(parse_record_date("2024-03-05T00:00:00Z"), Some(ymd(2024, 3, 5)));
        assert_eq!(
            parse_record_date("2024-03-05 12:00+02:00"),
            Some(ymd(2024, 3, 5))
        );
        assert_eq!(parse_record_date("2024-3-5T06:00"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_record_date("2024-3-5"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_record_date(""), None);
        assert_eq!(parse_record_date("yesterday"), None);
        assert_eq!(parse_record_date("2024-13-40"), None);
    }

    #[test]
    fn malformed_dates_drop_only_their_record() {
        let records = vec![
            RawRecord::new("not a date"),
            RawRecord::new("2024-01-02"),
            RawRecord::new(""),
            RawRecord::new("2024-01-01"),
        ];
        let normalized = normalize_records(&records);
        assert_eq!(normalized.rows.len(), 2);
        assert_eq!(
            normalized.rejected,
            vec![
                NormalizeError::MalformedDate {
                    date: "not a date".to_string()
                },
                NormalizeError::MalformedDate {
                    date: String::new()
                },
            ]
        );
    }

    #[test]
    fn output_is_strictly_ascending_and_never_longer_than_input() {
        let dates = [
            "2024-05-09",
            "2024-05-01T10:00",
            "garbage",
            "2024-05-03",
            "2024-05-01",
            "2023-12-31",
        ];
        let records: Vec<_> = dates.iter().map(|d| RawRecord::new(*d)).collect();
        let normalized = normalize_records(&records);
        assert!(normalized.rows.len() <= records.len());
        for pair in normalized.rows.windows(2) {
            assert!(pair[0].sort_key < pair[1].sort_key);
        }
    }

    #[test]
    fn later_duplicate_date_wins() {
        let records = vec![
            RawRecord::new("2024-01-01")
                .with_field(Characteristic::PrecipitationSum, RawField::Number(1.0)),
            RawRecord::new("2024-01-01T18:00")
                .with_field(Characteristic::PrecipitationSum, RawField::Number(4.0)),
        ];
        let rows = normalize_records(&records).rows;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value(Characteristic::PrecipitationSum), Some(4.0));
    }

    #[test]
    fn renormalizing_canonical_rows_is_idempotent() {
        let records = vec![
            RawRecord::new("2024-06-02")
                .with_field(Characteristic::TemperatureMin, RawField::Text("9.5".to_string())),
            RawRecord::new("2024-06-01")
                .with_field(Characteristic::PressureMean, RawField::Number(1013.0)),
        ];
        let first = normalize_records(&records).rows;
        let round_trip: Vec<_> = first.iter().map(CanonicalRow::to_raw_record).collect();
        let second = normalize_records(&round_trip).rows;
        assert_eq!(first, second);
    }
}
