use globewatch_core::summary::{CityInfrastructure, SeverityCounts};
use globewatch_core::{Alert, Severity};
use macroquad::prelude::*;

use crate::marker::severity_color;

pub const PANEL_COLOR: Color = Color::from_rgba(30, 41, 59, 255);
pub const PANEL_BORDER: Color = Color::from_rgba(51, 65, 85, 255);
pub const TEXT_PRIMARY: Color = Color::from_rgba(226, 232, 240, 255);
pub const TEXT_MUTED: Color = Color::from_rgba(148, 163, 184, 255);
pub const ACCENT: Color = Color::from_rgba(56, 189, 248, 255);

const TITLE_SIZE: f32 = 22.0;
const BODY_SIZE: f32 = 18.0;
const ROW_HEIGHT: f32 = 26.0;
pub const FEED_ENTRY_HEIGHT: f32 = 58.0;

/// `1_250_000` -> `1.3M`, `850` -> `850`.
pub fn format_count(value: f64) -> String {
    let value = value.max(0.0);
    if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{}", value.round() as u64)
    }
}

pub fn format_percent(fraction: f64) -> String {
    format!("{}%", (fraction * 100.0).round() as i64)
}

/// Truncates to whole characters so the text fits `max_chars`.
pub fn ellipsize(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// Greedy word wrap by character count.
pub fn wrap_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Area below a panel's title.
pub fn panel_body(rect: Rect) -> Rect {
    Rect::new(
        rect.x + 12.0,
        rect.y + 44.0,
        (rect.w - 24.0).max(0.0),
        (rect.h - 56.0).max(0.0),
    )
}

pub fn draw_panel(rect: Rect, title: &str) -> Rect {
    draw_rectangle(rect.x, rect.y, rect.w, rect.h, PANEL_COLOR);
    draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 1.0, PANEL_BORDER);
    draw_text(title, rect.x + 12.0, rect.y + 28.0, TITLE_SIZE, TEXT_PRIMARY);
    panel_body(rect)
}

/// Index of the feed entry under `point` for a feed drawn in `rect`.
pub fn feed_entry_at(rect: Rect, point: Vec2, entries: usize) -> Option<usize> {
    let body = panel_body(rect);
    if !body.contains(point) {
        return None;
    }
    let index = ((point.y - body.y) / FEED_ENTRY_HEIGHT) as usize;
    let fits = body.y + (index + 1) as f32 * FEED_ENTRY_HEIGHT <= body.y + body.h;
    (index < entries && fits).then_some(index)
}

pub fn draw_metric_card(rect: Rect, label: &str, value: &str, accent: Color) {
    draw_rectangle(rect.x, rect.y, rect.w, rect.h, PANEL_COLOR);
    draw_rectangle(rect.x, rect.y, 4.0, rect.h, accent);
    draw_text(label, rect.x + 14.0, rect.y + 22.0, BODY_SIZE - 2.0, TEXT_MUTED);
    draw_text(value, rect.x + 14.0, rect.y + rect.h - 14.0, 30.0, TEXT_PRIMARY);
}

pub fn draw_severity_bars(rect: Rect, counts: &SeverityCounts) {
    let body = draw_panel(rect, "Hotspots by severity");
    let max = counts.iter().map(|(_, count)| count).max().unwrap_or(0).max(1);
    let label_w = 90.0;
    for (row, (severity, count)) in counts.iter().enumerate() {
        let y = body.y + row as f32 * (ROW_HEIGHT + 8.0);
        if y + ROW_HEIGHT > body.y + body.h {
            break;
        }
        draw_text(severity.label(), body.x, y + 18.0, BODY_SIZE, TEXT_PRIMARY);
        let bar_w = (body.w - label_w - 40.0).max(0.0) * count as f32 / max as f32;
        draw_rectangle(body.x + label_w, y + 4.0, bar_w, ROW_HEIGHT - 8.0, severity_color(severity));
        draw_text(
            &count.to_string(),
            body.x + label_w + bar_w + 8.0,
            y + 18.0,
            BODY_SIZE,
            TEXT_MUTED,
        );
    }
}

/// Horizontal bars for `(label, value)` rows, largest value spanning the
/// full width.
pub fn draw_value_bars(rect: Rect, title: &str, rows: &[(String, f64)], color: Color) {
    let body = draw_panel(rect, title);
    let max = rows.iter().map(|(_, value)| *value).fold(0.0, f64::max);
    let label_w = (body.w * 0.35).min(180.0);
    for (index, (label, value)) in rows.iter().enumerate() {
        let y = body.y + index as f32 * (ROW_HEIGHT + 6.0);
        if y + ROW_HEIGHT > body.y + body.h {
            break;
        }
        draw_text(&ellipsize(label, 20), body.x, y + 18.0, BODY_SIZE, TEXT_PRIMARY);
        let fraction = if max > 0.0 { (value / max) as f32 } else { 0.0 };
        let bar_w = (body.w - label_w - 70.0).max(0.0) * fraction;
        draw_rectangle(body.x + label_w, y + 4.0, bar_w, ROW_HEIGHT - 8.0, color);
        draw_text(
            &format_count(*value),
            body.x + label_w + bar_w + 8.0,
            y + 18.0,
            BODY_SIZE,
            TEXT_MUTED,
        );
    }
}

/// Row of the infrastructure table under `point`, if one is drawn there.
pub fn table_row_at(rect: Rect, point: Vec2, rows: usize) -> Option<usize> {
    let body = panel_body(rect);
    let top = body.y + 18.0;
    if !body.contains(point) || point.y < top {
        return None;
    }
    let index = ((point.y - top) / ROW_HEIGHT) as usize;
    let baseline = body.y + 12.0 + (index + 1) as f32 * ROW_HEIGHT;
    (index < rows && baseline <= body.y + body.h).then_some(index)
}

pub fn draw_infrastructure_table(rect: Rect, rows: &[CityInfrastructure], selected: Option<usize>) {
    let body = draw_panel(rect, "Infrastructure status by city");
    let columns = [
        ("City", 0.0),
        ("Nodes", 0.42),
        ("Links", 0.54),
        ("Offline", 0.66),
        ("Critical", 0.8),
    ];
    for (label, offset) in columns {
        draw_text(label, body.x + body.w * offset, body.y + 12.0, BODY_SIZE, TEXT_MUTED);
    }

    if rows.is_empty() {
        draw_text(
            "No infrastructure data loaded",
            body.x,
            body.y + 12.0 + ROW_HEIGHT * 1.5,
            BODY_SIZE,
            TEXT_MUTED,
        );
        return;
    }

    for (index, row) in rows.iter().enumerate() {
        let y = body.y + 12.0 + (index + 1) as f32 * ROW_HEIGHT;
        if y > body.y + body.h {
            break;
        }
        if selected == Some(index) {
            draw_rectangle(
                body.x - 4.0,
                y - ROW_HEIGHT + 8.0,
                body.w + 8.0,
                ROW_HEIGHT - 2.0,
                Color::new(ACCENT.r, ACCENT.g, ACCENT.b, 0.15),
            );
        }
        draw_circle(body.x + 5.0, y - 5.0, 4.0, severity_color(row.severity));
        draw_text(&ellipsize(&row.name, 28), body.x + 14.0, y, BODY_SIZE, TEXT_PRIMARY);
        let cells = [
            (row.nodes.to_string(), 0.42),
            (row.edges.to_string(), 0.54),
            (row.status("offline").to_string(), 0.66),
            (row.status("critical").to_string(), 0.8),
        ];
        for (text, offset) in cells {
            draw_text(&text, body.x + body.w * offset, y, BODY_SIZE, TEXT_PRIMARY);
        }
    }
}

pub fn draw_alert_feed(rect: Rect, feed: &[&Alert]) {
    let body = draw_panel(rect, "Live alerts");
    if feed.is_empty() {
        draw_text("No active alerts", body.x, body.y + 18.0, BODY_SIZE, TEXT_MUTED);
        return;
    }
    let entry_h = FEED_ENTRY_HEIGHT;
    let max_chars = ((body.w - 16.0) / 9.0).max(8.0) as usize;
    for (index, alert) in feed.iter().enumerate() {
        let y = body.y + index as f32 * entry_h;
        if y + entry_h > body.y + body.h {
            break;
        }
        draw_rectangle(body.x, y + 4.0, 4.0, entry_h - 12.0, severity_color(alert.severity));
        draw_text(&ellipsize(&alert.name, max_chars), body.x + 12.0, y + 20.0, BODY_SIZE, TEXT_PRIMARY);
        draw_text(
            &format!(
                "{} · {} displaced · {} confidence",
                alert.severity.label(),
                format_count(alert.displaced * 1_000.0),
                format_percent(alert.confidence)
            ),
            body.x + 12.0,
            y + 42.0,
            BODY_SIZE - 3.0,
            TEXT_MUTED,
        );
    }
}

pub fn draw_chip(rect: Rect, label: &str, active: bool) {
    let fill = if active {
        ACCENT
    } else {
        Color::from_rgba(51, 65, 85, 220)
    };
    draw_rectangle(rect.x, rect.y, rect.w, rect.h, fill);
    let text_color = if active { BLACK } else { TEXT_PRIMARY };
    draw_text(label, rect.x + 8.0, rect.y + rect.h - 8.0, BODY_SIZE - 2.0, text_color);
}

/// Row of evenly sized chips starting at `(x, y)`, wrapping at `max_width`.
pub fn chip_rects(count: usize, x: f32, y: f32, chip_w: f32, max_width: f32) -> Vec<Rect> {
    let chip_h = 26.0;
    let gap = 6.0;
    let per_row = (((max_width + gap) / (chip_w + gap)).floor() as usize).max(1);
    (0..count)
        .map(|index| {
            let column = index % per_row;
            let row = index / per_row;
            Rect::new(
                x + column as f32 * (chip_w + gap),
                y + row as f32 * (chip_h + gap),
                chip_w,
                chip_h,
            )
        })
        .collect()
}

pub fn severity_legend(x: f32, y: f32) {
    for (index, severity) in Severity::ALL.iter().enumerate() {
        let cx = x + index as f32 * 90.0;
        draw_circle(cx + 6.0, y - 5.0, 5.0, severity_color(*severity));
        draw_text(severity.label(), cx + 16.0, y, BODY_SIZE - 3.0, TEXT_MUTED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rows_hit_below_header() {
        let rect = Rect::new(0.0, 0.0, 400.0, 200.0);
        let body = panel_body(rect);
        assert_eq!(table_row_at(rect, vec2(50.0, body.y + 10.0), 5), None);
        assert_eq!(table_row_at(rect, vec2(50.0, body.y + 30.0), 5), Some(0));
        assert_eq!(table_row_at(rect, vec2(50.0, body.y + 50.0), 5), Some(1));
        assert_eq!(table_row_at(rect, vec2(50.0, body.y + 50.0), 1), None);
        assert_eq!(table_row_at(rect, vec2(50.0, body.y + body.h - 1.0), 50), Some(4));
        assert_eq!(table_row_at(rect, vec2(450.0, body.y + 30.0), 5), None);
    }

    #[test]
    fn formats_counts_compactly() {
        assert_eq!(format_count(850.0), "850");
        assert_eq!(format_count(1_260.0), "1.3K");
        assert_eq!(format_count(2_400_000.0), "2.4M");
        assert_eq!(format_count(-3.0), "0");
        assert_eq!(format_percent(0.94), "94%");
    }

    #[test]
    fn ellipsize_respects_char_budget() {
        assert_eq!(ellipsize("Manila", 10), "Manila");
        assert_eq!(ellipsize("Dubai, United Arab Emirates", 8), "Dubai, …");
        assert_eq!(ellipsize("Dubai, United Arab Emirates", 8).chars().count(), 8);
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap_words("Severe flooding affecting multiple emirates", 18);
        assert_eq!(lines, ["Severe flooding", "affecting multiple", "emirates"]);
        assert!(wrap_words("", 10).is_empty());
    }

    #[test]
    fn feed_entry_lookup_matches_drawn_rows() {
        let rect = Rect::new(0.0, 0.0, 300.0, 300.0);
        assert_eq!(feed_entry_at(rect, vec2(50.0, 50.0), 6), Some(0));
        assert_eq!(feed_entry_at(rect, vec2(50.0, 44.0 + 58.0 * 2.5), 6), Some(2));
        assert_eq!(feed_entry_at(rect, vec2(50.0, 44.0 + 58.0 * 2.5), 2), None);
        assert_eq!(feed_entry_at(rect, vec2(50.0, 10.0), 6), None);
    }

    #[test]
    fn chips_wrap_to_next_row() {
        let rects = chip_rects(5, 10.0, 20.0, 100.0, 320.0);
        assert_eq!(rects[0].x, 10.0);
        assert_eq!(rects[2].x, 222.0);
        assert_eq!(rects[3].x, 10.0);
        assert_eq!(rects[3].y, 52.0);
    }
}
