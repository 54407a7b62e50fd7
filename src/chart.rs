use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Chart, Clear, Dataset, GraphType, LegendPosition, Paragraph};

use crate::axis::{AxisAssignment, AxisTag};
use crate::characteristic::{Characteristic, Selection};
use crate::normalize::CanonicalRow;

pub const TODAY_COLOR: Color = Color::Rgb(0xf5, 0x9e, 0x42);
pub const EMPTY_DATA_MESSAGE: &str = "No weather data available. Please fetch data first.";
const NO_SELECTION_MESSAGE: &str = "Select at least one characteristic (1-6) to plot.";
const ANIMATION_DURATION: Duration = Duration::from_millis(600);
const CURVE_SAMPLES: usize = 8;
const FILL_STEP: f64 = 1.0 / 16.0;
const BAR_SLOT: f64 = 0.8;
const BAR_SPREAD: [f64; 3] = [-0.3, 0.0, 0.3];
const GRID_DIVISIONS: usize = 4;
const GRID_DOT_STEP: f64 = 0.125;
const GRID_VERTICAL_DOTS: usize = 16;
const NICE_STEPS: [f64; 11] = [1.0, 1.2, 1.5, 2.0, 2.5, 3.0, 4.0, 5.0, 6.0, 8.0, 10.0];
const X_LABEL_WIDTH: u16 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartType {
    #[default]
    Line,
    Bar,
    Area,
}

impl ChartType {
    pub const ALL: [ChartType; 3] = [ChartType::Line, ChartType::Bar, ChartType::Area];

    pub fn id(self) -> &'static str {
        match self {
            ChartType::Line => "line",
            ChartType::Bar => "bar",
            ChartType::Area => "area",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChartType::Line => "Line",
            ChartType::Bar => "Bar",
            ChartType::Area => "Area",
        }
    }

    pub fn supports_dots(self) -> bool {
        matches!(self, ChartType::Line)
    }

    pub fn supports_smoothing(self) -> bool {
        matches!(self, ChartType::Line | ChartType::Area)
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        ChartType::ALL
            .iter()
            .copied()
            .find(|t| t.id() == normalized)
            .ok_or_else(|| format!("unsupported chart type `{s}` (use line, bar, or area)"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConfig {
    pub chart_type: ChartType,
    pub grid: bool,
    pub dots: bool,
    pub smoothing: bool,
    pub animation: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            chart_type: ChartType::Line,
            grid: true,
            dots: true,
            smoothing: true,
            animation: true,
        }
    }
}

/// Identity of a plot build. Any change means the previous visual state is
/// stale and must be thrown away.
pub fn render_key(chart_type: ChartType, city: &str, rows: &[CanonicalRow]) -> String {
    let first = rows.first().map(|row| row.sort_key.as_str()).unwrap_or("");
    let last = rows.last().map(|row| row.sort_key.as_str()).unwrap_or("");
    format!("{}-{}-{}-{}-{}", chart_type.id(), city, rows.len(), first, last)
}

pub fn chart_title(selection: &Selection, city: &str) -> String {
    match selection.as_slice() {
        [only] => format!("{} in {} - Last 2 Weeks", only.label(), city),
        _ => format!("Weather Comparison in {city} - Last 2 Weeks"),
    }
}

/// Per-plot state that survives redraws but not a render key change.
#[derive(Debug, Clone)]
pub struct ChartView {
    render_key: Option<String>,
    started: Instant,
    cursor: Option<usize>,
    y_zoom: f64,
}

impl Default for ChartView {
    fn default() -> Self {
        ChartView {
            render_key: None,
            started: Instant::now(),
            cursor: None,
            y_zoom: 1.0,
        }
    }
}

impl ChartView {
    /// Returns true when the key changed and the view was rebuilt.
    pub fn sync(&mut self, key: &str) -> bool {
        if self.render_key.as_deref() == Some(key) {
            return false;
        }
        *self = ChartView {
            render_key: Some(key.to_string()),
            ..ChartView::default()
        };
        true
    }

    pub fn progress(&self, animate: bool) -> f64 {
        if !animate {
            return 1.0;
        }
        animation_progress(self.started.elapsed())
    }

    pub fn is_animating(&self, animate: bool) -> bool {
        animate && self.started.elapsed() < ANIMATION_DURATION
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn move_cursor(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.cursor = None;
            return;
        }
        let last = len as isize - 1;
        let next = match self.cursor {
            Some(current) => (current.min(len - 1) as isize + delta).clamp(0, last),
            None if delta < 0 => last,
            None => 0,
        };
        self.cursor = Some(next as usize);
    }

    pub fn clear_cursor(&mut self) {
        self.cursor = None;
    }

    pub fn y_zoom(&self) -> f64 {
        self.y_zoom
    }

    pub fn zoom_in(&mut self) {
        self.y_zoom = (self.y_zoom * 1.25).min(100.0);
    }

    pub fn zoom_out(&mut self) {
        self.y_zoom = (self.y_zoom / 1.25).max(0.05);
    }

    pub fn reset_zoom(&mut self) {
        self.y_zoom = 1.0;
    }
}

pub fn animation_progress(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() / ANIMATION_DURATION.as_secs_f64()).clamp(0.0, 1.0)
}

fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

pub struct ChartInput<'a> {
    pub city: &'a str,
    pub rows: &'a [CanonicalRow],
    pub selection: &'a Selection,
    pub axes: &'a AxisAssignment,
    pub config: &'a DisplayConfig,
    pub today_key: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartScene {
    Empty,
    NoSelection { title: String },
    Plot(PlotScene),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotScene {
    pub title: String,
    pub chart_type: ChartType,
    pub grid: bool,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub primary: AxisScale,
    pub secondary: Option<AxisScale>,
    pub x_ticks: Vec<XTick>,
    pub series: Vec<SeriesScene>,
    pub today_index: Option<usize>,
}

/// Plot space is shared by both axes: `value = plot * scale`, so zero sits at
/// the same height on either side.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisScale {
    pub tag: AxisTag,
    pub unit_label: String,
    pub scale: f64,
}

impl AxisScale {
    fn fit(tag: AxisTag, axes: &AxisAssignment, rows: &[CanonicalRow]) -> Option<AxisScale> {
        let unit_label = axes.unit_label(tag)?;
        let max_abs = axes
            .members(tag)
            .flat_map(|c| rows.iter().filter_map(move |row| row.value(c)))
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        Some(AxisScale {
            tag,
            unit_label,
            scale: nice_ceiling(max_abs),
        })
    }

    pub fn to_plot(&self, value: f64) -> f64 {
        value / self.scale
    }

    pub fn to_value(&self, plot: f64) -> f64 {
        plot * self.scale
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct XTick {
    pub label: String,
    pub is_today: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Outline,
    Fill,
    Bars,
    Dots,
    TodayPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub kind: LayerKind,
    pub points: Vec<(f64, f64)>,
}

impl Layer {
    fn new(kind: LayerKind, points: Vec<(f64, f64)>) -> Self {
        Layer { kind, points }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesScene {
    pub characteristic: Characteristic,
    pub color: Color,
    pub axis: AxisTag,
    /// Present values as `(row index, value)`; absent rows are skipped.
    pub values: Vec<(usize, f64)>,
    pub layers: Vec<Layer>,
}

impl SeriesScene {
    pub fn layer(&self, kind: LayerKind) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.kind == kind)
    }
}

impl ChartScene {
    /// `progress` is the linear animation position in `[0, 1]`.
    pub fn build(input: &ChartInput<'_>, progress: f64) -> ChartScene {
        if input.rows.is_empty() {
            return ChartScene::Empty;
        }
        let title = chart_title(input.selection, input.city);
        if input.axes.is_empty() {
            return ChartScene::NoSelection { title };
        }
        let Some(primary) = AxisScale::fit(AxisTag::Primary, input.axes, input.rows) else {
            return ChartScene::NoSelection { title };
        };
        let secondary = if input.axes.has_secondary() {
            AxisScale::fit(AxisTag::Secondary, input.axes, input.rows)
        } else {
            None
        };
        let eased = ease_in_out(progress);
        let config = input.config;
        let today_index = input
            .today_key
            .and_then(|key| input.rows.iter().position(|row| row.sort_key == key));
        let series_count = input.axes.entries().len();

        let mut has_negative = false;
        let mut has_positive = false;
        let mut series = Vec::with_capacity(series_count);
        for (slot, (characteristic, tag)) in input.axes.entries().iter().copied().enumerate() {
            let scale = match (tag, &secondary) {
                (AxisTag::Secondary, Some(secondary)) => secondary,
                _ => &primary,
            };
            let values: Vec<(usize, f64)> = input
                .rows
                .iter()
                .enumerate()
                .filter_map(|(idx, row)| row.value(characteristic).map(|v| (idx, v)))
                .collect();
            has_negative |= values.iter().any(|(_, v)| *v < 0.0);
            has_positive |= values.iter().any(|(_, v)| *v > 0.0);
            let plotted: Vec<(f64, f64)> = values
                .iter()
                .map(|(idx, v)| (*idx as f64, scale.to_plot(*v) * eased))
                .collect();

            let mut layers = match config.chart_type {
                ChartType::Line => {
                    let mut layers = vec![Layer::new(
                        LayerKind::Outline,
                        curve_path(&plotted, config.smoothing),
                    )];
                    if config.dots {
                        layers.push(Layer::new(LayerKind::Dots, plotted.clone()));
                    }
                    layers
                }
                ChartType::Area => {
                    let outline = curve_path(&plotted, config.smoothing);
                    vec![
                        Layer::new(LayerKind::Fill, fill_path(&outline)),
                        Layer::new(LayerKind::Outline, outline),
                    ]
                }
                ChartType::Bar => vec![Layer::new(
                    LayerKind::Bars,
                    bar_columns(&plotted, slot, series_count),
                )],
            };
            if let Some(today) = today_index {
                if let Some((x, y)) = plotted.iter().copied().find(|(x, _)| *x as usize == today) {
                    let x = match config.chart_type {
                        ChartType::Bar => bar_center(x, slot, series_count),
                        ChartType::Line | ChartType::Area => x,
                    };
                    layers.push(Layer::new(LayerKind::TodayPoint, vec![(x, y)]));
                }
            }

            series.push(SeriesScene {
                characteristic,
                color: characteristic.color(),
                axis: tag,
                values,
                layers,
            });
        }

        let y_low = if has_negative { -1.0 } else { 0.0 };
        let y_high = if has_positive || !has_negative { 1.0 } else { 0.0 };
        let x_ticks = input
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| XTick {
                label: row.display_label.clone(),
                is_today: Some(idx) == today_index,
            })
            .collect();

        ChartScene::Plot(PlotScene {
            title,
            chart_type: config.chart_type,
            grid: config.grid,
            x_bounds: [-0.5, input.rows.len() as f64 - 0.5],
            y_bounds: [y_low, y_high],
            primary,
            secondary,
            x_ticks,
            series,
            today_index,
        })
    }
}

impl PlotScene {
    /// Dotted horizontal and vertical guide lines, empty when the grid is off.
    pub fn grid_lines(&self, y_bounds: [f64; 2]) -> Vec<Vec<(f64, f64)>> {
        if !self.grid {
            return Vec::new();
        }
        let [x_low, x_high] = self.x_bounds;
        let [y_low, y_high] = y_bounds;
        let mut lines = Vec::new();
        for step in 1..=GRID_DIVISIONS {
            let y = y_low + (y_high - y_low) * step as f64 / GRID_DIVISIONS as f64;
            let count = ((x_high - x_low) / GRID_DOT_STEP).ceil() as usize;
            lines.push(dotted(x_low, x_high, count, |x| (x, y)));
        }
        for idx in 0..self.x_ticks.len() {
            let x = idx as f64;
            lines.push(dotted(y_low, y_high, GRID_VERTICAL_DOTS, |y| (x, y)));
        }
        lines
    }

    pub fn today_line(&self, y_bounds: [f64; 2]) -> Option<Vec<(f64, f64)>> {
        self.today_index
            .map(|idx| vec![(idx as f64, y_bounds[0]), (idx as f64, y_bounds[1])])
    }

    pub fn axis_ticks(&self, axis: &AxisScale, y_bounds: [f64; 2]) -> [f64; 3] {
        let [low, high] = y_bounds;
        [
            axis.to_value(low),
            axis.to_value((low + high) / 2.0),
            axis.to_value(high),
        ]
    }
}

fn dotted(from: f64, to: f64, count: usize, point: impl Fn(f64) -> (f64, f64)) -> Vec<(f64, f64)> {
    let count = count.max(1);
    (0..=count)
        .map(|i| from + (to - from) * i as f64 / count as f64)
        .map(point)
        .collect()
}

fn bar_center(x: f64, slot: usize, count: usize) -> f64 {
    let width = BAR_SLOT / count.max(1) as f64;
    x - BAR_SLOT / 2.0 + width * (slot as f64 + 0.5)
}

fn bar_columns(points: &[(f64, f64)], slot: usize, count: usize) -> Vec<(f64, f64)> {
    let width = BAR_SLOT / count.max(1) as f64;
    points
        .iter()
        .flat_map(|(x, y)| {
            let center = bar_center(*x, slot, count);
            BAR_SPREAD
                .iter()
                .map(move |offset| (center + width * offset, *y))
        })
        .collect()
}

fn curve_path(points: &[(f64, f64)], smoothing: bool) -> Vec<(f64, f64)> {
    if smoothing {
        monotone_path(points, CURVE_SAMPLES)
    } else {
        points.to_vec()
    }
}

/// Samples along straight segments densely enough for column fill.
fn fill_path(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut path = Vec::new();
    for pair in points.windows(2) {
        let (x1, y1) = pair[0];
        let (x2, y2) = pair[1];
        let steps = (((x2 - x1) / FILL_STEP).ceil() as usize).max(1);
        for i in 0..steps {
            let t = i as f64 / steps as f64;
            path.push((x1 + (x2 - x1) * t, y1 + (y2 - y1) * t));
        }
    }
    if let Some(last) = points.last() {
        path.push(*last);
    }
    path
}

/// Monotone cubic Hermite interpolation (Fritsch-Carlson); never overshoots
/// the data between two neighbouring points.
fn monotone_path(points: &[(f64, f64)], samples: usize) -> Vec<(f64, f64)> {
    let n = points.len();
    if n < 3 || samples < 2 {
        return points.to_vec();
    }
    let secants: Vec<f64> = points
        .windows(2)
        .map(|pair| {
            let dx = pair[1].0 - pair[0].0;
            if dx.abs() < f64::EPSILON {
                0.0
            } else {
                (pair[1].1 - pair[0].1) / dx
            }
        })
        .collect();
    let mut tangents = vec![0.0; n];
    tangents[0] = secants[0];
    tangents[n - 1] = secants[n - 2];
    for k in 1..n - 1 {
        tangents[k] = if secants[k - 1] * secants[k] <= 0.0 {
            0.0
        } else {
            (secants[k - 1] + secants[k]) / 2.0
        };
    }
    for k in 0..n - 1 {
        if secants[k].abs() < f64::EPSILON {
            tangents[k] = 0.0;
            tangents[k + 1] = 0.0;
            continue;
        }
        let a = tangents[k] / secants[k];
        let b = tangents[k + 1] / secants[k];
        let s = a * a + b * b;
        if s > 9.0 {
            let t = 3.0 / s.sqrt();
            tangents[k] = t * a * secants[k];
            tangents[k + 1] = t * b * secants[k];
        }
    }

    let mut path = Vec::with_capacity((n - 1) * samples + 1);
    for k in 0..n - 1 {
        let (x0, y0) = points[k];
        let (x1, y1) = points[k + 1];
        let h = x1 - x0;
        for i in 0..samples {
            let t = i as f64 / samples as f64;
            let t2 = t * t;
            let t3 = t2 * t;
            let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
            let h10 = t3 - 2.0 * t2 + t;
            let h01 = -2.0 * t3 + 3.0 * t2;
            let h11 = t3 - t2;
            let y = h00 * y0 + h10 * h * tangents[k] + h01 * y1 + h11 * h * tangents[k + 1];
            path.push((x0 + h * t, y));
        }
    }
    path.push(points[n - 1]);
    path
}

fn nice_ceiling(value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 1.0;
    }
    let magnitude = 10f64.powf(value.log10().floor());
    let fraction = value / magnitude;
    let step = NICE_STEPS
        .iter()
        .copied()
        .find(|step| fraction <= *step + 1e-9)
        .unwrap_or(10.0);
    step * magnitude
}

pub fn format_value(value: f64) -> String {
    let mut formatted = format!("{value:.2}");
    if formatted.contains('.') {
        formatted = formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string();
    }
    if formatted == "-0" {
        formatted = "0".to_string();
    }
    formatted
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub title: String,
    pub is_today: bool,
    pub entries: Vec<TooltipEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TooltipEntry {
    pub name: &'static str,
    pub color: Color,
    pub text: String,
}

pub fn build_tooltip(
    rows: &[CanonicalRow],
    selection: &Selection,
    today_key: Option<&str>,
    cursor: Option<usize>,
) -> Option<Tooltip> {
    let row = rows.get(cursor?)?;
    let entries = selection
        .iter()
        .map(|c| TooltipEntry {
            name: c.label(),
            color: c.color(),
            text: tooltip_value(c.label(), row.value(c)),
        })
        .collect();
    Some(Tooltip {
        title: row.display_label.clone(),
        is_today: today_key == Some(row.sort_key.as_str()),
        entries,
    })
}

/// Formats a hovered value, finding the unit through the series name.
pub fn tooltip_value(series_name: &str, value: Option<f64>) -> String {
    let Some(value) = value else {
        return "--".to_string();
    };
    match Characteristic::from_label(series_name) {
        Some(characteristic) => format!("{}{}", format_value(value), characteristic.unit()),
        None => format_value(value),
    }
}

pub fn draw_chart(
    frame: &mut Frame,
    area: Rect,
    scene: &ChartScene,
    config: &DisplayConfig,
    view: &ChartView,
    tooltip: Option<&Tooltip>,
) {
    match scene {
        ChartScene::Empty => draw_placeholder(frame, area, "Weather Chart", EMPTY_DATA_MESSAGE),
        ChartScene::NoSelection { title } => {
            draw_placeholder(frame, area, title, NO_SELECTION_MESSAGE)
        }
        ChartScene::Plot(plot) => draw_plot(frame, area, plot, config, view, tooltip),
    }
}

fn draw_placeholder(frame: &mut Frame, area: Rect, title: &str, message: &str) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        message.to_string(),
        Style::default().fg(Color::DarkGray),
    )))
    .alignment(Alignment::Center)
    .block(Block::bordered().title(Span::styled(
        title.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    frame.render_widget(paragraph, area);
}

fn draw_plot(
    frame: &mut Frame,
    area: Rect,
    plot: &PlotScene,
    config: &DisplayConfig,
    view: &ChartView,
    tooltip: Option<&Tooltip>,
) {
    let (chart_area, axis_area) = if plot.secondary.is_some() && area.width > 60 {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(40), Constraint::Length(22)])
            .split(area);
        (chunks[0], Some(chunks[1]))
    } else {
        (area, None)
    };

    let y_bounds = apply_y_zoom(plot.y_bounds, view.y_zoom());
    let grid = plot.grid_lines(y_bounds);
    let today_line = plot.today_line(y_bounds);
    let cursor_line = view
        .cursor()
        .filter(|idx| *idx < plot.x_ticks.len())
        .map(|idx| vec![(idx as f64, y_bounds[0]), (idx as f64, y_bounds[1])]);

    let mut datasets: Vec<Dataset> = Vec::new();
    for line in &grid {
        datasets.push(
            Dataset::default()
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(Color::DarkGray))
                .data(line),
        );
    }
    if let Some(line) = &cursor_line {
        datasets.push(
            Dataset::default()
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Gray))
                .data(line),
        );
    }
    for series in &plot.series {
        if let Some(fill) = series.layer(LayerKind::Fill) {
            datasets.push(
                Dataset::default()
                    .marker(symbols::Marker::Braille)
                    .graph_type(GraphType::Bar)
                    .style(
                        Style::default()
                            .fg(series.color)
                            .add_modifier(Modifier::DIM),
                    )
                    .data(&fill.points),
            );
        }
    }
    for series in &plot.series {
        let mut named = false;
        for layer in &series.layers {
            let (graph_type, marker, style) = match layer.kind {
                LayerKind::Fill | LayerKind::TodayPoint => continue,
                LayerKind::Outline => (
                    GraphType::Line,
                    symbols::Marker::Braille,
                    Style::default().fg(series.color),
                ),
                LayerKind::Bars => (
                    GraphType::Bar,
                    symbols::Marker::HalfBlock,
                    Style::default().fg(series.color),
                ),
                LayerKind::Dots => (
                    GraphType::Scatter,
                    symbols::Marker::Dot,
                    Style::default().fg(series.color),
                ),
            };
            let mut dataset = Dataset::default()
                .marker(marker)
                .graph_type(graph_type)
                .style(style)
                .data(&layer.points);
            if !named && layer.kind != LayerKind::Dots {
                dataset = dataset.name(series_legend(series, plot));
                named = true;
            }
            datasets.push(dataset);
        }
    }
    if let Some(line) = &today_line {
        datasets.push(
            Dataset::default()
                .name("Today")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(TODAY_COLOR))
                .data(line),
        );
    }
    for series in &plot.series {
        if let Some(point) = series.layer(LayerKind::TodayPoint) {
            datasets.push(
                Dataset::default()
                    .marker(symbols::Marker::Block)
                    .graph_type(GraphType::Scatter)
                    .style(Style::default().fg(TODAY_COLOR))
                    .data(&point.points),
            );
        }
    }

    let axis_style = Style::default().fg(Color::Gray);
    let [low, mid, high] = plot.axis_ticks(&plot.primary, y_bounds);
    let y_labels = vec![
        Span::styled(format_value(low), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format_value(mid)),
        Span::styled(format_value(high), Style::default().add_modifier(Modifier::BOLD)),
    ];
    let plot_width = chart_area.width.saturating_sub(10);
    let x_labels = x_axis_labels(&plot.x_ticks, plot_width);

    let mut block = Block::bordered().title(title_line(plot, config));
    if let (None, Some(secondary)) = (axis_area, &plot.secondary) {
        block = block.title_bottom(
            Line::from(Span::styled(
                secondary_summary(plot, secondary, y_bounds),
                Style::default().add_modifier(Modifier::BOLD),
            ))
            .right_aligned(),
        );
    }

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title(x_axis_title(&plot.x_ticks))
                .style(axis_style)
                .labels(x_labels)
                .labels_alignment(Alignment::Center)
                .bounds(plot.x_bounds),
        )
        .y_axis(
            Axis::default()
                .title(plot.primary.unit_label.clone())
                .style(axis_style)
                .labels(y_labels)
                .bounds(y_bounds),
        )
        .legend_position(Some(LegendPosition::TopRight))
        .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)));
    frame.render_widget(chart, chart_area);

    if let (Some(axis_area), Some(secondary)) = (axis_area, &plot.secondary) {
        draw_secondary_axis(frame, axis_area, plot, secondary, y_bounds);
    }
    if let Some(tooltip) = tooltip {
        draw_tooltip(frame, chart_area, tooltip);
    }
}

fn series_legend(series: &SeriesScene, plot: &PlotScene) -> String {
    let label = series.characteristic.label();
    if plot.secondary.is_some() && series.axis == AxisTag::Secondary {
        format!("{label} (R)")
    } else {
        label.to_string()
    }
}

fn title_line(plot: &PlotScene, config: &DisplayConfig) -> Line<'static> {
    let mut spans = vec![Span::styled(
        plot.title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    for badge in mode_badges(plot.chart_type, config) {
        spans.push(Span::raw(" "));
        spans.push(badge);
    }
    Line::from(spans)
}

fn mode_badges(chart_type: ChartType, config: &DisplayConfig) -> Vec<Span<'static>> {
    let on = Style::default()
        .fg(Color::LightGreen)
        .add_modifier(Modifier::BOLD);
    let off = Style::default().fg(Color::DarkGray);
    let mut badges = vec![Span::styled(
        format!("[{}]", chart_type.label()),
        Style::default()
            .fg(Color::LightMagenta)
            .add_modifier(Modifier::BOLD),
    )];
    let mut toggle = |label: &'static str, enabled: bool| {
        badges.push(Span::styled(
            format!("[{label}]"),
            if enabled { on } else { off },
        ));
    };
    toggle("Grid", config.grid);
    if chart_type.supports_dots() {
        toggle("Dots", config.dots);
    }
    if chart_type.supports_smoothing() {
        toggle("Smooth", config.smoothing);
    }
    toggle("Anim", config.animation);
    badges
}

/// One label per row, thinned to what fits. The today label is always kept.
/// ratatui pins the first and last labels to the axis edges rather than the
/// outer rows, so those two stay blank and the date span goes in the title.
fn x_axis_labels(ticks: &[XTick], plot_width: u16) -> Vec<Span<'static>> {
    let len = ticks.len().max(1);
    let per_row = (plot_width as usize / len).max(1);
    let step = (X_LABEL_WIDTH as usize).div_ceil(per_row).max(1);
    let last = ticks.len().saturating_sub(1);
    let today = ticks.iter().position(|tick| tick.is_today);
    ticks
        .iter()
        .enumerate()
        .map(|(idx, tick)| {
            if idx == 0 || idx == last {
                return Span::raw("");
            }
            if tick.is_today {
                return Span::styled(
                    tick.label.clone(),
                    Style::default()
                        .fg(TODAY_COLOR)
                        .add_modifier(Modifier::BOLD),
                );
            }
            let near_today = today.map(|t| t.abs_diff(idx) < step).unwrap_or(false);
            if (idx - 1) % step == 0 && !near_today {
                Span::raw(tick.label.clone())
            } else {
                Span::raw("")
            }
        })
        .collect()
}

fn x_axis_title(ticks: &[XTick]) -> String {
    match (ticks.first(), ticks.last()) {
        (Some(first), Some(last)) if ticks.len() > 1 => {
            format!("Date ({} to {})", first.label, last.label)
        }
        (Some(only), _) => format!("Date ({})", only.label),
        _ => "Date".to_string(),
    }
}

/// Right-axis unit and range for plots too narrow for the side panel.
fn secondary_summary(plot: &PlotScene, secondary: &AxisScale, y_bounds: [f64; 2]) -> String {
    let [low, _, high] = plot.axis_ticks(secondary, y_bounds);
    format!(
        " R: {} {}..{} ",
        secondary.unit_label,
        format_value(low),
        format_value(high)
    )
}

fn apply_y_zoom(bounds: [f64; 2], zoom: f64) -> [f64; 2] {
    let [min, max] = bounds;
    if (max - min).abs() < f64::EPSILON {
        return [min - 1.0, max + 1.0];
    }
    let center = (min + max) / 2.0;
    let half_range = (max - min) / 2.0;
    let zoom = zoom.clamp(0.05, 100.0);
    let adjusted_half = (half_range / zoom).max(half_range * 0.01);
    [center - adjusted_half, center + adjusted_half]
}

fn draw_secondary_axis(
    frame: &mut Frame,
    area: Rect,
    plot: &PlotScene,
    secondary: &AxisScale,
    y_bounds: [f64; 2],
) {
    let [low, mid, high] = plot.axis_ticks(secondary, y_bounds);
    let mut lines = vec![
        Line::from(Span::styled(
            secondary.unit_label.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("↑ {}", format_value(high))),
        Line::from(format!("• {}", format_value(mid))),
        Line::from(format!("↓ {}", format_value(low))),
        Line::from(" "),
    ];
    for series in plot.series.iter().filter(|s| s.axis == AxisTag::Secondary) {
        lines.push(Line::from(Span::styled(
            series.characteristic.label(),
            Style::default().fg(series.color),
        )));
    }
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .block(Block::bordered().title("Right Axis"));
    frame.render_widget(paragraph, area);
}

fn draw_tooltip(frame: &mut Frame, chart_area: Rect, tooltip: &Tooltip) {
    let width = tooltip
        .entries
        .iter()
        .map(|entry| entry.name.len() + entry.text.len() + 2)
        .max()
        .unwrap_or(0)
        .max(tooltip.title.len() + 8) as u16
        + 2;
    let height = tooltip.entries.len() as u16 + 3;
    if chart_area.width < width + 12 || chart_area.height < height + 2 {
        return;
    }
    let popup = Rect::new(chart_area.x + 10, chart_area.y + 1, width, height);
    let title_style = if tooltip.is_today {
        Style::default()
            .fg(TODAY_COLOR)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    let mut lines = vec![Line::from(Span::styled(
        if tooltip.is_today {
            format!("{} (Today)", tooltip.title)
        } else {
            tooltip.title.clone()
        },
        title_style,
    ))];
    for entry in &tooltip.entries {
        lines.push(Line::from(vec![
            Span::styled(entry.name, Style::default().fg(entry.color)),
            Span::raw(format!(": {}", entry.text)),
        ]));
    }
    let paragraph = Paragraph::new(lines).block(Block::bordered());
    frame.render_widget(Clear, popup);
    frame.render_widget(paragraph, popup);
}
