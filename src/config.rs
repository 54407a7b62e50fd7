use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;

use crate::characteristic::{Characteristic, Selection, UnknownCharacteristicError};
use crate::chart::{ChartType, DisplayConfig};

#[derive(Parser, Clone, Debug)]
#[command(version, about = "Terminal chart of two weeks of daily weather")]
pub struct CliParams {
    /// City to load on startup
    #[clap(short = 'c', long = "city", default_value = "London")]
    pub city: String,

    /// Weather service base URL; the city is appended as a path segment
    #[clap(
        long = "api-base",
        env = "WEATHER_API_BASE",
        default_value = "http://localhost:8089/v1/weather"
    )]
    pub api_base: String,

    /// API key sent as the x-api-key header
    #[clap(long = "api-key", env = "WEATHER_API_KEY")]
    pub api_key: Option<String>,

    /// Characteristics to plot; comma separated or pass multiple times
    #[clap(
        short = 's',
        long = "select",
        value_delimiter = ',',
        num_args = 1..,
        default_values_t = vec![Characteristic::TemperatureMax.id().to_string()]
    )]
    pub select: Vec<String>,

    /// Chart type (line, bar, or area)
    #[clap(long = "chart-type", default_value = "line")]
    pub chart_type: ChartType,

    /// Hide the background grid
    #[clap(long = "no-grid")]
    pub no_grid: bool,

    /// Hide data point dots on line charts
    #[clap(long = "no-dots")]
    pub no_dots: bool,

    /// Draw straight segments instead of smoothed curves
    #[clap(long = "no-smooth")]
    pub no_smooth: bool,

    /// Skip the entry animation
    #[clap(long = "no-animation")]
    pub no_animation: bool,

    /// Request timeout (e.g., 20s, 1m)
    #[clap(long = "timeout", value_name = "DURATION", default_value = "20s")]
    pub timeout: DurationSpec,

    /// Keep the previous rows when a fetch fails instead of showing mock data
    #[clap(long = "no-mock-fallback")]
    pub no_mock_fallback: bool,

    /// Do not contact the weather service; show generated data
    #[clap(long = "offline")]
    pub offline: bool,

    /// Number of days of generated data
    #[clap(long = "mock-days", default_value_t = 14)]
    pub mock_days: usize,

    /// IANA time zone used to decide which day is today (e.g., Europe/London)
    #[clap(long = "timezone")]
    pub timezone: Option<String>,

    /// File receiving the application log
    #[clap(long = "log-file", default_value = "weather_chart.log")]
    pub log_file: PathBuf,
}

impl CliParams {
    /// Blank input falls back to the default characteristic.
    pub fn selection(&self) -> Result<Selection, UnknownCharacteristicError> {
        let selection = Selection::from_ids(
            self.select
                .iter()
                .map(|id| id.trim())
                .filter(|id| !id.is_empty()),
        )?;
        if selection.is_empty() {
            return Ok(Selection::with_default(Characteristic::TemperatureMax));
        }
        Ok(selection)
    }

    pub fn display_config(&self) -> DisplayConfig {
        DisplayConfig {
            chart_type: self.chart_type,
            grid: !self.no_grid,
            dots: !self.no_dots,
            smoothing: !self.no_smooth,
            animation: !self.no_animation,
        }
    }

    pub fn api_base(&self) -> String {
        self.api_base.trim().trim_end_matches('/').to_string()
    }

    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }

    pub fn request_timeout(&self) -> Duration {
        self.timeout.as_duration()
    }

    pub fn mock_fallback(&self) -> bool {
        !self.no_mock_fallback
    }
}

#[derive(Copy, Clone, Debug)]
pub struct DurationSpec(Duration);

impl DurationSpec {
    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl FromStr for DurationSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let duration = parse_duration_spec(s)?;
        Ok(DurationSpec(duration))
    }
}

fn parse_duration_spec(input: &str) -> Result<Duration, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("duration spec cannot be empty (examples: 20s, 1m)".to_string());
    }
    let split_idx = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .ok_or_else(|| "duration spec must end with a unit like ms, s, or m".to_string())?;
    if split_idx == 0 {
        return Err("duration spec must start with a number (examples: 20s, 1m)".to_string());
    }
    let (value_part, unit_part) = trimmed.split_at(split_idx);
    let value: f64 = value_part.parse().map_err(|_| {
        format!("invalid numeric portion `{value_part}` in duration spec `{trimmed}`")
    })?;
    let millis_multiplier = match unit_part.trim().to_lowercase().as_str() {
        "ms" | "msec" | "millis" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => 1000.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60.0 * 1000.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 60.0 * 60.0 * 1000.0,
        "" => return Err("duration spec missing unit (use ms, s, m, or h)".to_string()),
        other => {
            return Err(format!(
                "unsupported duration unit `{other}` (use ms, s, m, or h)"
            ));
        }
    };
    let seconds = value * millis_multiplier / 1000.0;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(format!("duration must be positive: `{trimmed}`"));
    }
    if seconds > Duration::MAX.as_secs_f64() {
        return Err(format!("duration `{trimmed}` is too large"));
    }
    Ok(Duration::from_secs_f64(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_startup() {
        let params = CliParams::parse_from(["weather-chart"]);
        assert_eq!(params.city, "London");
        assert_eq!(params.request_timeout(), Duration::from_secs(20));
        assert_eq!(params.mock_days, 14);
        assert!(params.mock_fallback());
        assert_eq!(params.display_config(), DisplayConfig::default());
        let selection = params.selection().expect("default selection");
        assert_eq!(selection.as_slice(), &[Characteristic::TemperatureMax]);
    }

    #[test]
    fn flags_feed_display_config_and_selection() {
        let params = CliParams::parse_from([
            "weather-chart",
            "--chart-type",
            "area",
            "--no-grid",
            "--no-smooth",
            "-s",
            "precipitation_sum,pressure_msl_mean",
            "--api-base",
            "https://example.com/weather/",
            "--api-key",
            "  ",
        ]);
        let config = params.display_config();
        assert_eq!(config.chart_type, ChartType::Area);
        assert!(!config.grid);
        assert!(!config.smoothing);
        assert!(config.dots);
        assert_eq!(params.api_base(), "https://example.com/weather");
        assert_eq!(params.api_key(), None);
        let selection = params.selection().expect("known ids");
        assert_eq!(
            selection.as_slice(),
            &[Characteristic::PrecipitationSum, Characteristic::PressureMean]
        );
    }

    #[test]
    fn blank_selection_uses_the_default() {
        let params = CliParams::parse_from(["weather-chart", "-s", " "]);
        let selection = params.selection().expect("blank is allowed");
        assert_eq!(selection.as_slice(), &[Characteristic::TemperatureMax]);
    }

    #[test]
    fn unknown_characteristic_is_reported() {
        let params = CliParams::parse_from(["weather-chart", "-s", "snowfall"]);
        assert!(params.selection().is_err());
    }

    #[test]
    fn bad_chart_type_is_a_parse_error() {
        assert!(CliParams::try_parse_from(["weather-chart", "--chart-type", "pie"]).is_err());
    }

    #[test]
    fn duration_specs() {
        assert_eq!(parse_duration_spec("20s"), Ok(Duration::from_secs(20)));
        assert_eq!(parse_duration_spec("1.5m"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration_spec("250ms"), Ok(Duration::from_millis(250)));
        assert!(parse_duration_spec("").is_err());
        assert!(parse_duration_spec("15").is_err());
        assert!(parse_duration_spec("m").is_err());
        assert!(parse_duration_spec("0s").is_err());
        assert!(parse_duration_spec("3w").is_err());
    }
}
