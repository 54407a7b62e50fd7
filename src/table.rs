use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::characteristic::Characteristic;
use crate::chart::format_value;
use crate::normalize::CanonicalRow;

const DATE_COLUMN_WIDTH: usize = 10;
const MIN_VALUE_COLUMN_WIDTH: usize = 8;

/// The canonical rows as displayed text, one column per registry entry
/// regardless of what the chart currently plots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableModel {
    pub header: Vec<String>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<String>,
    pub is_today: bool,
}

impl TableModel {
    pub fn build(rows: &[CanonicalRow], today_key: Option<&str>) -> TableModel {
        let header = std::iter::once("Date".to_string())
            .chain(
                Characteristic::ALL
                    .iter()
                    .map(|c| format!("{} ({})", c.label(), c.unit())),
            )
            .collect();
        let rows = rows
            .iter()
            .map(|row| {
                let cells = std::iter::once(row.sort_key.clone())
                    .chain(
                        Characteristic::ALL
                            .iter()
                            .map(|c| row.value(*c).map(format_value).unwrap_or_default()),
                    )
                    .collect();
                TableRow {
                    cells,
                    is_today: today_key == Some(row.sort_key.as_str()),
                }
            })
            .collect();
        TableModel { header, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn today_index(&self) -> Option<usize> {
        self.rows.iter().position(|row| row.is_today)
    }

    fn column_widths(&self, total_width: usize) -> Vec<usize> {
        let value_columns = self.header.len().saturating_sub(1).max(1);
        let available = total_width.saturating_sub(DATE_COLUMN_WIDTH + value_columns);
        let share = (available / value_columns).max(MIN_VALUE_COLUMN_WIDTH);
        std::iter::once(DATE_COLUMN_WIDTH)
            .chain(std::iter::repeat_n(share, value_columns))
            .collect()
    }
}

#[derive(Clone, Copy)]
enum ColumnAlign {
    Left,
    Right,
}

fn column_align(idx: usize) -> ColumnAlign {
    if idx == 0 {
        ColumnAlign::Left
    } else {
        ColumnAlign::Right
    }
}

fn row_style(is_today: bool, selected: bool) -> Style {
    match (is_today, selected) {
        (_, true) => Style::default()
            .bg(Color::LightCyan)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
        (true, false) => Style::default()
            .bg(Color::Yellow)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
        (false, false) => Style::default(),
    }
}

/// Renders the table below the chart. `cursor` is the hovered chart row, if
/// any; the window scrolls to keep it (or today) visible.
pub fn draw_table(frame: &mut Frame, area: Rect, table: &TableModel, cursor: Option<usize>) {
    let block = Block::bordered().title("Daily Values");
    if area.height < 3 || area.width < 10 {
        return;
    }
    let inner_width = area.width.saturating_sub(2) as usize;
    let widths = table.column_widths(inner_width);
    let mut lines = Vec::new();
    let header: Vec<_> = table
        .header
        .iter()
        .enumerate()
        .map(|(idx, title)| (title.as_str(), column_align(idx), widths[idx]))
        .collect();
    lines.push(Line::from(Span::styled(
        format_columns(&header),
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::BOLD),
    )));

    if table.is_empty() {
        lines.push(Line::from(Span::styled(
            "No rows",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        let visible = (area.height as usize).saturating_sub(3);
        let anchor = cursor.or(table.today_index()).unwrap_or(0);
        let (start, end) = visible_range(table.rows.len(), visible, anchor);
        for (idx, row) in table.rows[start..end].iter().enumerate() {
            let columns: Vec<_> = row
                .cells
                .iter()
                .enumerate()
                .map(|(col, cell)| (cell.as_str(), column_align(col), widths[col]))
                .collect();
            let selected = cursor == Some(start + idx);
            lines.push(Line::from(Span::styled(
                format_columns(&columns),
                row_style(row.is_today, selected),
            )));
        }
    }
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn format_columns(columns: &[(&str, ColumnAlign, usize)]) -> String {
    let mut row = String::new();
    for (idx, (value, align, width)) in columns.iter().enumerate() {
        let clipped = clip_to_width(value, *width);
        row.push_str(&pad_to_width(&clipped, *width, *align));
        if idx + 1 != columns.len() {
            row.push(' ');
        }
    }
    row
}

fn clip_to_width(value: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(value) <= width {
        return value.to_string();
    }
    let mut result = String::new();
    let mut remaining = width.saturating_sub(1);
    for ch in value.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if ch_width > remaining {
            break;
        }
        result.push(ch);
        remaining = remaining.saturating_sub(ch_width);
    }
    result.push('…');
    result
}

fn pad_to_width(value: &str, width: usize, align: ColumnAlign) -> String {
    let current = UnicodeWidthStr::width(value);
    if current >= width {
        return value.to_string();
    }
    let padding = " ".repeat(width - current);
    match align {
        ColumnAlign::Left => format!("{value}{padding}"),
        ColumnAlign::Right => format!("{padding}{value}"),
    }
}

/// Half-open window of `visible` rows that contains `selected`.
fn visible_range(len: usize, visible: usize, selected: usize) -> (usize, usize) {
    if len == 0 || visible == 0 {
        return (0, 0);
    }
    if len <= visible {
        return (0, len);
    }
    let max_start = len - visible;
    let clamped = selected.min(len - 1);
    let start = clamped.saturating_sub(visible / 2).min(max_start);
    (start, start + visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;

    fn find_text(buffer: &Buffer, needle: &str) -> Option<(u16, u16)> {
        let len = needle.chars().count() as u16;
        let area = buffer.area;
        (0..area.height).find_map(|y| {
            (0..area.width.saturating_sub(len)).find_map(|x| {
                let text: String = (x..x + len).map(|col| buffer[(col, y)].symbol()).collect();
                (text == needle).then_some((x, y))
            })
        })
    }

    fn row(day: u32) -> CanonicalRow {
        CanonicalRow::new(NaiveDate::from_ymd_opt(2024, 3, day).expect("valid"))
    }

    #[test]
    fn header_lists_every_characteristic_with_unit() {
        let table = TableModel::build(&[], None);
        assert_eq!(table.header.len(), 7);
        assert_eq!(table.header[0], "Date");
        assert_eq!(table.header[1], "Temperature Max (°C)");
        assert_eq!(table.header[6], "Humidity Max (%)");
        assert!(table.is_empty());
    }

    #[test]
    fn absent_cells_are_blank_and_today_is_flagged() {
        let rows = vec![
            row(1).with_value(Characteristic::PrecipitationSum, 2.5),
            row(2).with_value(Characteristic::PressureMean, 1013.0),
        ];
        let table = TableModel::build(&rows, Some("2024-03-02"));
        assert_eq!(table.rows[0].cells[0], "2024-03-01");
        assert_eq!(table.rows[0].cells[3], "2.5");
        assert_eq!(table.rows[0].cells[4], "");
        assert_eq!(table.rows[1].cells[4], "1013");
        assert!(!table.rows[0].is_today);
        assert!(table.rows[1].is_today);
        assert_eq!(table.today_index(), Some(1));
    }

    #[test]
    fn today_flag_missing_outside_window() {
        let table = TableModel::build(&[row(1)], Some("2030-01-01"));
        assert_eq!(table.today_index(), None);
    }

    #[test]
    fn window_follows_selection() {
        assert_eq!(visible_range(0, 5, 0), (0, 0));
        assert_eq!(visible_range(3, 5, 2), (0, 3));
        assert_eq!(visible_range(14, 4, 0), (0, 4));
        assert_eq!(visible_range(14, 4, 7), (5, 9));
        assert_eq!(visible_range(14, 4, 40), (10, 14));
    }

    #[test]
    fn columns_clip_and_pad_by_display_width() {
        assert_eq!(clip_to_width("Temperature", 5), "Temp…");
        assert_eq!(pad_to_width("°C", 4, ColumnAlign::Right), "  °C");
        assert_eq!(
            format_columns(&[("a", ColumnAlign::Left, 2), ("1", ColumnAlign::Right, 3)]),
            "a    1"
        );
    }

    #[test]
    fn draws_rows_into_buffer() {
        let rows = vec![row(1).with_value(Characteristic::WindSpeedMax, 14.0)];
        let table = TableModel::build(&rows, Some("2024-03-01"));
        let mut terminal = Terminal::new(TestBackend::new(120, 8)).expect("terminal");
        terminal
            .draw(|frame| draw_table(frame, frame.area(), &table, None))
            .expect("draw");
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("Daily Values"));
        assert!(text.contains("2024-03-01"));
        assert!(text.contains("14"));

        let buffer = terminal.backend().buffer();
        let (x, y) = find_text(buffer, "2024-03-01").expect("today row drawn");
        let cell = &buffer[(x, y)];
        assert_eq!(cell.bg, Color::Yellow);
        assert_eq!(cell.fg, Color::Black);
        assert!(cell.modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn plain_rows_are_not_highlighted() {
        let table = TableModel::build(&[row(1)], None);
        let mut terminal = Terminal::new(TestBackend::new(120, 8)).expect("terminal");
        terminal
            .draw(|frame| draw_table(frame, frame.area(), &table, None))
            .expect("draw");
        let buffer = terminal.backend().buffer();
        let (x, y) = find_text(buffer, "2024-03-01").expect("row drawn");
        assert_ne!(buffer[(x, y)].bg, Color::Yellow);
    }
}
