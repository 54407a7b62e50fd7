mod axis;
mod characteristic;
mod chart;
mod command;
mod config;
mod logging;
mod normalize;
mod table;
mod today;
mod tui;
mod weather_api;

use anyhow::anyhow;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::command::Command;
use crate::tui::{AppOptions, TuiApp};
use crate::weather_api::WeatherClient;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let param = config::CliParams::parse();
    let _log_guard = logging::init_logging(&param.log_file)?;
    let selection = param.selection()?;
    info!(
        city = %param.city,
        chart_type = %param.chart_type,
        offline = param.offline,
        "starting weather chart"
    );

    let (tx, mut rx) = broadcast::channel::<Command>(16);
    let source = if param.offline {
        None
    } else {
        Some(WeatherClient::new(
            param.request_timeout(),
            param.api_base(),
            param.api_key(),
        )?)
    };
    let options = AppOptions {
        city: param.city.clone(),
        selection,
        display: param.display_config(),
        timezone: param.timezone.clone(),
        mock_fallback: param.mock_fallback(),
        mock_days: param.mock_days,
    };
    if let Some(name) = param.timezone.as_deref() {
        if today::parse_timezone(name).is_none() {
            warn!(timezone = name, "unknown time zone override");
            let _ = tx.send(Command::Error(format!(
                "Unknown time zone `{name}`, using the local zone"
            )));
        }
    }
    let mut app = TuiApp::new(options, source, tx.clone());
    app.request_city(&param.city);

    let app_result = tokio::select! {
        result = app.run(&mut rx) => result,
        _ = tokio::signal::ctrl_c() => Ok(()),
    };
    let _ = tx.send(Command::Exit);
    app.dispose();
    if let Err(err) = &app_result {
        error!(error = %err, "terminal loop failed");
    }
    app_result.map_err(|err| anyhow!(err.to_string()))?;
    info!("weather chart stopped");
    Ok(())
}
