use std::time::Duration;

use anyhow::Result as AnyResult;
use chrono::{Days, NaiveDate};
use rand::Rng;
use reqwest::{Client, ClientBuilder, StatusCode, Url};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task;
use tracing::{info, warn};

use crate::characteristic::Characteristic;
use crate::command::{Command, WeatherPayload};
use crate::normalize::CanonicalRow;

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid weather api base `{base}`")]
    InvalidBase { base: String },
    #[error("requesting weather for {city}: {source}")]
    Request {
        city: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("weather service answered {status} for {city}")]
    Status { city: String, status: StatusCode },
    #[error("decoding weather for {city}: {source}")]
    Decode {
        city: String,
        #[source]
        source: reqwest::Error,
    },
}

pub fn build_http_client(timeout: Duration) -> AnyResult<Client> {
    Ok(ClientBuilder::new()
        .connect_timeout(Duration::from_secs(5).min(timeout))
        .read_timeout(timeout)
        .timeout(timeout)
        .build()?)
}

/// `{api_base}/{city}` with the city as one encoded path segment.
pub fn weather_url(api_base: &str, city: &str) -> Result<Url, FetchError> {
    let invalid = || FetchError::InvalidBase {
        base: api_base.to_string(),
    };
    let mut url = Url::parse(api_base.trim().trim_end_matches('/')).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .push(city);
    Ok(url)
}

pub async fn fetch_weather(
    client: &Client,
    api_base: &str,
    api_key: Option<&str>,
    city: &str,
) -> Result<WeatherPayload, FetchError> {
    let url = weather_url(api_base, city)?;
    let mut request = client.get(url);
    if let Some(key) = api_key.map(str::trim).filter(|key| !key.is_empty()) {
        request = request.header(API_KEY_HEADER, key);
    }
    let response = request.send().await.map_err(|source| FetchError::Request {
        city: city.to_string(),
        source,
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            city: city.to_string(),
            status,
        });
    }
    let mut payload = response
        .json::<WeatherPayload>()
        .await
        .map_err(|source| FetchError::Decode {
            city: city.to_string(),
            source,
        })?;
    if payload.city.trim().is_empty() {
        payload.city = city.to_string();
    }
    Ok(payload)
}

/// Handle on the upstream service shared by every fetch the UI starts.
#[derive(Clone, Debug)]
pub struct WeatherClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
}

impl WeatherClient {
    pub fn new(timeout: Duration, api_base: String, api_key: Option<String>) -> AnyResult<Self> {
        Ok(WeatherClient {
            client: build_http_client(timeout)?,
            api_base,
            api_key,
        })
    }

    pub async fn fetch(&self, city: &str) -> Result<WeatherPayload, FetchError> {
        fetch_weather(&self.client, &self.api_base, self.api_key.as_deref(), city).await
    }

    /// Runs one fetch on the runtime and reports the outcome on `tx`.
    pub fn spawn_fetch(&self, city: String, tx: broadcast::Sender<Command>) {
        let source = self.clone();
        task::spawn(async move {
            info!(%city, "fetching weather");
            let command = match source.fetch(&city).await {
                Ok(payload) => {
                    info!(%city, records = payload.records.len(), "weather loaded");
                    Command::WeatherLoaded(payload)
                }
                Err(err) => {
                    warn!(%city, error = %err, "weather fetch failed");
                    Command::FetchFailed {
                        city,
                        message: err.to_string(),
                    }
                }
            };
            let _ = tx.send(command);
        });
    }
}

/// `days` consecutive rows ending at `today`, filled with plausible values.
pub fn mock_rows<R: Rng + ?Sized>(days: usize, today: NaiveDate, rng: &mut R) -> Vec<CanonicalRow> {
    (0..days)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset as u64)))
        .map(|date| {
            let mut roll = |low: i32, high: i32| f64::from(rng.random_range(low..high));
            CanonicalRow::new(date)
                .with_value(Characteristic::TemperatureMax, roll(20, 30))
                .with_value(Characteristic::TemperatureMin, roll(8, 14))
                .with_value(Characteristic::PrecipitationSum, roll(0, 10))
                .with_value(Characteristic::PressureMean, roll(1000, 1030))
                .with_value(Characteristic::WindSpeedMax, roll(5, 30))
                .with_value(Characteristic::HumidityMax, roll(40, 80))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn city_is_one_encoded_path_segment() {
        let url = weather_url("http://localhost:8089/v1/weather/", "New York").expect("url");
        assert_eq!(url.as_str(), "http://localhost:8089/v1/weather/New%20York");
        let url = weather_url("https://api.example.com/weather", "a/b").expect("url");
        assert_eq!(url.as_str(), "https://api.example.com/weather/a%2Fb");
    }

    #[test]
    fn rejects_unusable_bases() {
        assert!(matches!(
            weather_url("not a url", "London"),
            Err(FetchError::InvalidBase { .. })
        ));
        assert!(matches!(
            weather_url("mailto:someone@example.com", "London"),
            Err(FetchError::InvalidBase { .. })
        ));
    }

    #[test]
    fn status_error_names_city_and_code() {
        let err = FetchError::Status {
            city: "Paris".to_string(),
            status: StatusCode::UNAUTHORIZED,
        };
        assert_eq!(
            err.to_string(),
            "weather service answered 401 Unauthorized for Paris"
        );
    }

    #[test]
    fn mock_rows_end_today_within_ranges() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).expect("valid");
        let mut rng = StdRng::seed_from_u64(7);
        let rows = mock_rows(14, today, &mut rng);
        assert_eq!(rows.len(), 14);
        assert_eq!(rows[0].sort_key, "2024-02-26");
        assert_eq!(rows[13].sort_key, "2024-03-10");
        for row in &rows {
            let max = row.value(Characteristic::TemperatureMax).expect("present");
            let min = row.value(Characteristic::TemperatureMin).expect("present");
            let pressure = row.value(Characteristic::PressureMean).expect("present");
            let humidity = row.value(Characteristic::HumidityMax).expect("present");
            assert!((20.0..30.0).contains(&max));
            assert!((8.0..14.0).contains(&min));
            assert!((1000.0..1030.0).contains(&pressure));
            assert!((40.0..80.0).contains(&humidity));
        }
        for pair in rows.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
    }

    #[tokio::test]
    async fn unreachable_service_reports_request_error() {
        let source = WeatherClient::new(
            Duration::from_secs(2),
            "http://127.0.0.1:9/v1/weather".to_string(),
            None,
        )
        .expect("client");
        let result = source.fetch("London").await;
        assert!(matches!(result, Err(FetchError::Request { .. })));
    }

    #[tokio::test]
    async fn spawned_fetch_reports_failure_on_the_channel() {
        let source = WeatherClient::new(
            Duration::from_secs(2),
            "http://127.0.0.1:9/v1/weather".to_string(),
            Some("secret".to_string()),
        )
        .expect("client");
        let (tx, mut rx) = broadcast::channel(4);
        source.spawn_fetch("Oslo".to_string(), tx);
        match rx.recv().await.expect("command") {
            Command::FetchFailed { city, .. } => assert_eq!(city, "Oslo"),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
