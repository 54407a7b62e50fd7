use std::fmt;

use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::characteristic::Characteristic;

#[derive(Debug, Clone)]
pub enum Command {
    WeatherLoaded(WeatherPayload),
    FetchFailed { city: String, message: String },
    Error(String),
    Exit,
}

/// Upstream response for one city.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WeatherPayload {
    pub city: String,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub records: Vec<RawRecord>,
}

/// A characteristic value as it arrived on the wire.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum RawField {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    #[serde(default, deserialize_with = "deserialize_record_date")]
    pub date: String,
    #[serde(default, deserialize_with = "deserialize_raw_field")]
    pub temperature2m_max_c: Option<RawField>,
    #[serde(default, deserialize_with = "deserialize_raw_field")]
    pub temperature2m_min_c: Option<RawField>,
    #[serde(default, deserialize_with = "deserialize_raw_field")]
    pub precipitation_sum_mm: Option<RawField>,
    #[serde(default, deserialize_with = "deserialize_raw_field")]
    pub pressure_msl_mean_hpa: Option<RawField>,
    #[serde(default, deserialize_with = "deserialize_raw_field")]
    pub wind_speed10m_max_kmh: Option<RawField>,
    #[serde(default, deserialize_with = "deserialize_raw_field")]
    pub relative_humidity2m_max_pct: Option<RawField>,
}

impl RawRecord {
    #[cfg(test)]
    pub fn new(date: impl Into<String>) -> Self {
        RawRecord {
            date: date.into(),
            ..RawRecord::default()
        }
    }

    pub fn field(&self, characteristic: Characteristic) -> Option<&RawField> {
        match characteristic {
            Characteristic::TemperatureMax => self.temperature2m_max_c.as_ref(),
            Characteristic::TemperatureMin => self.temperature2m_min_c.as_ref(),
            Characteristic::PrecipitationSum => self.precipitation_sum_mm.as_ref(),
            Characteristic::PressureMean => self.pressure_msl_mean_hpa.as_ref(),
            Characteristic::WindSpeedMax => self.wind_speed10m_max_kmh.as_ref(),
            Characteristic::HumidityMax => self.relative_humidity2m_max_pct.as_ref(),
        }
    }

    #[cfg(test)]
    pub fn set_field(&mut self, characteristic: Characteristic, value: Option<RawField>) {
        let slot = match characteristic {
            Characteristic::TemperatureMax => &mut self.temperature2m_max_c,
            Characteristic::TemperatureMin => &mut self.temperature2m_min_c,
            Characteristic::PrecipitationSum => &mut self.precipitation_sum_mm,
            Characteristic::PressureMean => &mut self.pressure_msl_mean_hpa,
            Characteristic::WindSpeedMax => &mut self.wind_speed10m_max_kmh,
            Characteristic::HumidityMax => &mut self.relative_humidity2m_max_pct,
        };
        *slot = value;
    }

    #[cfg(test)]
    pub fn with_field(mut self, characteristic: Characteristic, value: RawField) -> Self {
        self.set_field(characteristic, Some(value));
        self
    }
}

/// Any JSON value decodes; non-date values become text the normalizer rejects.
fn deserialize_record_date<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct RecordDateVisitor;
    impl<'de> Visitor<'de> for RecordDateVisitor {
        type Value = String;
        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a date string")
        }
        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }
        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value)
        }
        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }
        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }
        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }
        fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }
        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(String::new())
        }
        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(String::new())
        }
        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok(String::new())
        }
        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
            Ok(String::new())
        }
    }
    deserializer.deserialize_any(RecordDateVisitor)
}

fn deserialize_raw_field<'de, D>(deserializer: D) -> Result<Option<RawField>, D::Error>
where
    D: Deserializer<'de>,
{
    struct RawFieldVisitor;
    impl<'de> Visitor<'de> for RawFieldVisitor {
        type Value = Option<RawField>;
        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number, a numeric string or null")
        }
        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(RawField::Number(value)))
        }
        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(RawField::Number(value as f64)))
        }
        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(RawField::Number(value as f64)))
        }
        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(RawField::Text(value.to_string())))
        }
        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(RawField::Text(value)))
        }
        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
        fn visit_bool<E>(self, _value: bool) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok(None)
        }
        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
            Ok(None)
        }
    }
    deserializer.deserialize_any(RawFieldVisitor)
}
