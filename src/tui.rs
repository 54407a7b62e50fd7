use std::time::{Duration, Instant};

use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Wrap};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::axis::{AxisAssignment, AxisTag};
use crate::characteristic::{Characteristic, Selection, UnknownCharacteristicError};
use crate::chart::{
    ChartInput, ChartScene, ChartType, ChartView, DisplayConfig, build_tooltip, draw_chart,
    render_key,
};
use crate::command::{Command, WeatherPayload};
use crate::normalize::{CanonicalRow, normalize_records};
use crate::table::{TableModel, draw_table};
use crate::today::{current_date, today_marker};
use crate::weather_api::{WeatherClient, mock_rows};

const LOADING_SPINNER_FRAMES: [char; 4] = ['|', '/', '-', '\\'];
const TABLE_HEIGHT: u16 = 12;
const MIN_CHART_HEIGHT: u16 = 10;

struct LoadingOverlay {
    message: String,
    spinner_index: usize,
    last_tick: Instant,
}

impl LoadingOverlay {
    fn new(message: impl Into<String>) -> Self {
        LoadingOverlay {
            message: message.into(),
            spinner_index: 0,
            last_tick: Instant::now(),
        }
    }

    fn tick(&mut self) -> bool {
        let interval = Duration::from_millis(120);
        if self.last_tick.elapsed() < interval {
            return false;
        }
        self.spinner_index = (self.spinner_index + 1) % LOADING_SPINNER_FRAMES.len();
        self.last_tick = Instant::now();
        true
    }

    fn spinner(&self) -> char {
        LOADING_SPINNER_FRAMES[self.spinner_index % LOADING_SPINNER_FRAMES.len()]
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Startup choices resolved from the command line.
#[derive(Clone, Debug)]
pub struct AppOptions {
    pub city: String,
    pub selection: Selection,
    pub display: DisplayConfig,
    pub timezone: Option<String>,
    pub mock_fallback: bool,
    pub mock_days: usize,
}

pub struct TuiApp {
    city: String,
    city_input: Option<String>,
    payload_timezone: String,
    timezone_override: Option<String>,
    rows: Vec<CanonicalRow>,
    selection: Selection,
    display: DisplayConfig,
    view: ChartView,
    picker_collapsed: bool,
    fullscreen: bool,
    source: Option<WeatherClient>,
    tx: broadcast::Sender<Command>,
    mock_fallback: bool,
    mock_days: usize,
    last_draw: Instant,
    min_redraw_gap: Duration,
    status_message: Option<String>,
    status_visible_until: Option<Instant>,
    status_is_error: bool,
    exit_confirmation: bool,
    loading_overlay: Option<LoadingOverlay>,
}

impl TuiApp {
    /// `source` is `None` in offline mode; every load then uses generated rows.
    pub fn new(
        options: AppOptions,
        source: Option<WeatherClient>,
        tx: broadcast::Sender<Command>,
    ) -> TuiApp {
        let min_redraw_gap = Duration::from_millis(50);
        TuiApp {
            city: options.city,
            city_input: None,
            payload_timezone: String::new(),
            timezone_override: options.timezone,
            rows: Vec::new(),
            selection: options.selection,
            display: options.display,
            view: ChartView::default(),
            picker_collapsed: false,
            fullscreen: false,
            source,
            tx,
            mock_fallback: options.mock_fallback,
            mock_days: options.mock_days,
            last_draw: Instant::now() - min_redraw_gap,
            min_redraw_gap,
            status_message: None,
            status_visible_until: None,
            status_is_error: false,
            exit_confirmation: false,
            loading_overlay: None,
        }
    }

    fn is_exit_key(key: &KeyEvent) -> bool {
        matches!(
            key.code,
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc
        ) || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
    }

    pub fn toggle_characteristic(&mut self, id: &str) -> Result<bool, UnknownCharacteristicError> {
        let selected = self.selection.toggle_id(id)?;
        debug!(id, selected, "characteristic toggled");
        Ok(selected)
    }

    pub fn set_chart_type(&mut self, chart_type: ChartType) {
        self.display.chart_type = chart_type;
    }

    pub fn set_grid(&mut self, enabled: bool) {
        self.display.grid = enabled;
    }

    pub fn set_dots(&mut self, enabled: bool) {
        self.display.dots = enabled;
    }

    pub fn set_smoothing(&mut self, enabled: bool) {
        self.display.smoothing = enabled;
    }

    pub fn set_animation(&mut self, enabled: bool) {
        self.display.animation = enabled;
    }

    #[cfg(test)]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[cfg(test)]
    pub fn display(&self) -> &DisplayConfig {
        &self.display
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[CanonicalRow] {
        &self.rows
    }

    pub fn is_loading(&self) -> bool {
        self.loading_overlay.is_some()
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_visible_until = Some(Instant::now() + Duration::from_secs(3));
        self.status_is_error = false;
    }

    fn set_error_status_message(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_visible_until = Some(Instant::now() + Duration::from_secs(5));
        self.status_is_error = true;
    }

    fn clear_status_if_expired(&mut self) -> bool {
        match self.status_visible_until {
            Some(visible_until) if Instant::now() >= visible_until => {
                self.status_message = None;
                self.status_visible_until = None;
                self.status_is_error = false;
                true
            }
            _ => false,
        }
    }

    pub fn dispose(&self) {
        ratatui::restore();
    }

    /// Starts loading `city`. Refused while another load is in flight.
    pub fn request_city(&mut self, city: &str) -> bool {
        let city = city.trim();
        if city.is_empty() {
            self.set_error_status_message("City name cannot be empty");
            return false;
        }
        if self.is_loading() {
            self.set_status_message("Still loading, please wait for the current request");
            return false;
        }
        self.city = city.to_string();
        match &self.source {
            Some(source) => {
                info!(city, "requesting weather");
                self.loading_overlay = Some(LoadingOverlay::new(format!(
                    "Loading weather for {city}..."
                )));
                source.spawn_fetch(self.city.clone(), self.tx.clone());
            }
            None => {
                self.load_mock();
                self.set_status_message(format!("Offline: showing generated data for {city}"));
            }
        }
        true
    }

    pub fn apply_payload(&mut self, payload: WeatherPayload) {
        self.loading_overlay = None;
        let normalized = normalize_records(&payload.records);
        if !normalized.rejected.is_empty() {
            warn!(
                dropped = normalized.rejected.len(),
                "some records had malformed dates"
            );
        }
        self.city = payload.city;
        self.payload_timezone = payload.timezone;
        self.rows = normalized.rows;
        if self.rows.is_empty() {
            self.set_status_message(format!("No weather data for {}", self.city));
        } else {
            self.set_status_message(format!(
                "Loaded {} days for {}",
                self.rows.len(),
                self.city
            ));
        }
    }

    pub fn apply_fetch_failure(&mut self, city: &str, message: &str) {
        self.loading_overlay = None;
        if self.mock_fallback {
            self.city = city.to_string();
            self.load_mock();
            self.set_error_status_message(format!("{message}; showing generated data"));
        } else {
            self.set_error_status_message(message.to_string());
        }
    }

    fn load_mock(&mut self) {
        self.payload_timezone.clear();
        self.rows = mock_rows(self.mock_days, self.today(), &mut rand::rng());
    }

    fn today(&self) -> chrono::NaiveDate {
        let timezone = self
            .timezone_override
            .as_deref()
            .or(Some(self.payload_timezone.as_str()));
        current_date(timezone)
    }

    pub async fn run(&mut self, rx: &mut broadcast::Receiver<Command>) -> Result<()> {
        color_eyre::install()?;
        let mut terminal = ratatui::init();
        let mut input_tick = tokio::time::interval(self.min_redraw_gap);
        terminal.draw(|frame| self.render(frame))?;
        self.last_draw = Instant::now();
        loop {
            tokio::select! {
                biased;
                _ = input_tick.tick() => {
                    let mut should_redraw = false;
                    if let Some(overlay) = &mut self.loading_overlay {
                        should_redraw |= overlay.tick();
                    }
                    should_redraw |= self.clear_status_if_expired();
                    should_redraw |= self.view.is_animating(self.display.animation);
                    match self.poll_input()? {
                        InputOutcome::Exit => return Ok(()),
                        InputOutcome::Changed => should_redraw = true,
                        InputOutcome::Idle => {}
                    }
                    if should_redraw && self.last_draw.elapsed() >= self.min_redraw_gap {
                        terminal.draw(|frame| self.render(frame))?;
                        self.last_draw = Instant::now();
                    }
                }
                result = rx.recv() => {
                    match result {
                        Ok(Command::WeatherLoaded(payload)) => self.apply_payload(payload),
                        Ok(Command::FetchFailed { city, message }) => {
                            self.apply_fetch_failure(&city, &message);
                        }
                        Ok(Command::Error(message)) => self.set_error_status_message(message),
                        Ok(Command::Exit) => break,
                        Err(broadcast::error::RecvError::Closed) => break,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    }
                    terminal.draw(|frame| self.render(frame))?;
                    self.last_draw = Instant::now();
                }
            }
        }
        Ok(())
    }

    fn poll_input(&mut self) -> Result<InputOutcome> {
        let mut outcome = InputOutcome::Idle;
        while event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if self.handle_key_event(key) {
                    return Ok(InputOutcome::Exit);
                }
                outcome = InputOutcome::Changed;
            } else {
                outcome = InputOutcome::Changed;
            }
        }
        Ok(outcome)
    }

    /// Returns true when the app should exit.
    fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        if self.exit_confirmation {
            return self.handle_exit_confirmation_key(key);
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.prompt_exit_confirmation();
            return false;
        }
        if self.city_input.is_some() {
            self.handle_city_input_key(key);
            return false;
        }
        if Self::is_exit_key(&key) {
            self.prompt_exit_confirmation();
            return false;
        }
        self.handle_chart_key(key);
        false
    }

    fn prompt_exit_confirmation(&mut self) {
        if self.exit_confirmation {
            return;
        }
        self.exit_confirmation = true;
        self.set_status_message("Exit? Y/Enter to confirm, N/Esc to cancel");
    }

    fn handle_exit_confirmation_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.exit_confirmation = false;
            return true;
        }
        match key.code {
            KeyCode::Char('y')
            | KeyCode::Char('Y')
            | KeyCode::Char('q')
            | KeyCode::Char('Q')
            | KeyCode::Enter => {
                self.exit_confirmation = false;
                true
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.exit_confirmation = false;
                self.set_status_message("Exit cancelled");
                false
            }
            _ => false,
        }
    }

    fn handle_city_input_key(&mut self, key: KeyEvent) {
        let Some(input) = self.city_input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.city_input = None;
                self.set_status_message("City edit cancelled");
            }
            KeyCode::Enter => {
                let city = input.clone();
                if self.request_city(&city) {
                    self.city_input = None;
                }
            }
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) if !c.is_control() => {
                input.push(c);
            }
            _ => {}
        }
    }

    fn handle_chart_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c @ '1'..='6') => {
                let Some(characteristic) = Characteristic::from_hotkey(c) else {
                    return;
                };
                if let Err(err) = self.toggle_characteristic(characteristic.id()) {
                    self.set_error_status_message(err.to_string());
                    return;
                }
                let axes = AxisAssignment::allocate(&self.selection);
                let placement = match axes.axis_for(characteristic) {
                    Some(AxisTag::Secondary) => "shown on the right axis",
                    Some(AxisTag::Primary) => "shown",
                    None => "hidden",
                };
                self.set_status_message(format!("{} {placement} ({c})", characteristic.label()));
            }
            KeyCode::Char('l') | KeyCode::Char('L') => self.switch_chart_type(ChartType::Line),
            KeyCode::Char('b') | KeyCode::Char('B') => self.switch_chart_type(ChartType::Bar),
            KeyCode::Char('a') | KeyCode::Char('A') => self.switch_chart_type(ChartType::Area),
            KeyCode::Char('g') | KeyCode::Char('G') => {
                self.set_grid(!self.display.grid);
                self.announce_toggle("Grid", self.display.grid, 'G');
            }
            KeyCode::Char('d') | KeyCode::Char('D') => {
                self.set_dots(!self.display.dots);
                self.announce_toggle("Dots", self.display.dots, 'D');
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                self.set_smoothing(!self.display.smoothing);
                self.announce_toggle("Smoothing", self.display.smoothing, 'S');
            }
            KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_animation(!self.display.animation);
                self.announce_toggle("Animation", self.display.animation, 'N');
            }
            KeyCode::Char('c') | KeyCode::Char('C') => {
                self.picker_collapsed = !self.picker_collapsed;
            }
            KeyCode::Char('f') | KeyCode::Char('F') => {
                self.fullscreen = !self.fullscreen;
            }
            KeyCode::Left => self.view.move_cursor(-1, self.rows.len()),
            KeyCode::Right => self.view.move_cursor(1, self.rows.len()),
            KeyCode::Char('x') | KeyCode::Char('X') => self.view.clear_cursor(),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.view.zoom_in();
                self.set_status_message(format!(
                    "Zoomed in Y axis (Zoom {:.2}x)",
                    self.view.y_zoom()
                ));
            }
            KeyCode::Char('-') => {
                self.view.zoom_out();
                self.set_status_message(format!(
                    "Zoomed out Y axis (Zoom {:.2}x)",
                    self.view.y_zoom()
                ));
            }
            KeyCode::Char('0') => {
                self.view.reset_zoom();
                self.set_status_message("Reset Y axis (0)");
            }
            KeyCode::Char('/') | KeyCode::Char('e') | KeyCode::Char('E') => {
                self.city_input = Some(String::new());
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                let city = self.city.clone();
                self.request_city(&city);
            }
            _ => {}
        }
    }

    fn switch_chart_type(&mut self, chart_type: ChartType) {
        self.set_chart_type(chart_type);
        self.set_status_message(format!("{} chart", chart_type.label()));
    }

    fn announce_toggle(&mut self, label: &str, enabled: bool, key: char) {
        let state = if enabled { "on" } else { "off" };
        self.set_status_message(format!("{label} {state} ({key})"));
    }

    fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let status_height = if self.status_message.is_some() { 3 } else { 0 };
        let picker_height = if self.picker_collapsed { 3 } else { 4 };
        let show_table = !self.fullscreen
            && area.height >= picker_height + status_height + MIN_CHART_HEIGHT + TABLE_HEIGHT;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(picker_height),
                Constraint::Min(MIN_CHART_HEIGHT),
                Constraint::Length(if show_table { TABLE_HEIGHT } else { 0 }),
                Constraint::Length(status_height),
            ])
            .split(area);

        self.render_header(frame, chunks[0]);

        let key = render_key(self.display.chart_type, &self.city, &self.rows);
        if self.view.sync(&key) {
            debug!(render_key = %key, "chart view reset");
        }
        let today = self.today();
        let today_key = today_marker(&self.rows, today);
        let axes = AxisAssignment::allocate(&self.selection);
        let input = ChartInput {
            city: &self.city,
            rows: &self.rows,
            selection: &self.selection,
            axes: &axes,
            config: &self.display,
            today_key,
        };
        let scene = ChartScene::build(&input, self.view.progress(self.display.animation));
        let tooltip = build_tooltip(&self.rows, &self.selection, today_key, self.view.cursor());
        draw_chart(
            frame,
            chunks[1],
            &scene,
            &self.display,
            &self.view,
            tooltip.as_ref(),
        );
        if show_table {
            let table = TableModel::build(&self.rows, today_key);
            draw_table(frame, chunks[2], &table, self.view.cursor());
        }
        if status_height > 0 {
            self.render_status(frame, chunks[3]);
        }
        if self.exit_confirmation {
            self.render_exit_confirmation(frame);
        }
        if self.loading_overlay.is_some() {
            self.render_loading_overlay(frame);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let mut lines = Vec::new();
        let city_line = match &self.city_input {
            Some(input) => Line::from(vec![
                Span::styled("City: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("{input}█"),
                    Style::default().fg(Color::LightYellow),
                ),
                Span::styled(
                    "  Enter load · Esc cancel",
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
            None => Line::from(vec![
                Span::styled("City: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(self.city.clone()),
                Span::styled(
                    "  / edit · r reload · l/b/a type · g d s n toggles · ←/→ inspect · f fullscreen · q quit",
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
        };
        lines.push(city_line);
        if !self.picker_collapsed {
            lines.push(self.picker_line());
        }
        let title = if self.picker_collapsed {
            format!("Characteristics ({} selected, c to expand)", self.selection.len())
        } else {
            "Characteristics (c to collapse)".to_string()
        };
        let paragraph = Paragraph::new(lines).block(Block::bordered().title(title));
        frame.render_widget(paragraph, area);
    }

    fn picker_line(&self) -> Line<'static> {
        let mut spans = Vec::new();
        for (idx, characteristic) in Characteristic::ALL.iter().enumerate() {
            let selected = self.selection.contains(*characteristic);
            let style = if selected {
                Style::default()
                    .fg(characteristic.color())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let marker = if selected { '●' } else { '○' };
            if idx > 0 {
                spans.push(Span::raw("  "));
            }
            spans.push(Span::styled(
                format!("{}:{marker} {}", idx + 1, characteristic.label()),
                style,
            ));
        }
        Line::from(spans)
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        if let Some(message) = &self.status_message {
            let color = if self.status_is_error {
                Color::Red
            } else {
                Color::Yellow
            };
            let status = Paragraph::new(message.as_str())
                .style(Style::default().fg(color))
                .alignment(Alignment::Left)
                .block(Block::bordered().title("Status"));
            frame.render_widget(status, area);
        }
    }

    fn render_exit_confirmation(&self, frame: &mut Frame) {
        let area = frame.area();
        if area.width < 24 || area.height < 5 {
            return;
        }
        let popup_width = area.width.saturating_sub(20).clamp(28, 50);
        let popup_height = 5;
        let left = area.x + (area.width.saturating_sub(popup_width)) / 2;
        let top = area.y + (area.height.saturating_sub(popup_height)) / 2;
        let popup = Rect::new(left, top, popup_width, popup_height);
        let lines = vec![
            Line::from(Span::styled(
                "Quit the weather chart?",
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from("Y/Enter confirm · N/Esc cancel"),
            Line::from("Ctrl+C quits immediately"),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .block(Block::bordered().title("Confirm Exit"));
        frame.render_widget(Clear, popup);
        frame.render_widget(paragraph, popup);
    }

    fn render_loading_overlay(&self, frame: &mut Frame) {
        if let Some(overlay) = &self.loading_overlay {
            let area = frame.area();
            if area.width < 24 || area.height < 5 {
                return;
            }
            let popup_width = area.width.saturating_sub(10).clamp(30, 50);
            let popup_height = 4;
            let left = area.x + area.width.saturating_sub(popup_width + 2);
            let top = area.y + 1;
            let popup = Rect::new(left, top, popup_width, popup_height);
            let message = format!("{} {}", overlay.spinner(), overlay.message());
            let lines = vec![Line::from(Span::styled(
                message,
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ))];
            let paragraph = Paragraph::new(lines)
                .alignment(Alignment::Left)
                .wrap(Wrap { trim: true })
                .block(Block::bordered().title("Loading"));
            frame.render_widget(Clear, popup);
            frame.render_widget(paragraph, popup);
        }
    }
}

enum InputOutcome {
    Idle,
    Changed,
    Exit,
}
