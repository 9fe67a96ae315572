use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthStr;

use crate::format::{format_optional, format_optional_kb, format_percent, truncate_unicode};
use crate::system::process::ProcessRecord;
use crate::ui::theme::Theme;

/// One-line summary of the selected process; the metrics stay
/// right-aligned and the name is truncated first when space runs out.
pub fn render(frame: &mut Frame, area: Rect, selected: Option<&ProcessRecord>, theme: &Theme) {
    let style = Style::default()
        .bg(theme.statusbar_bg)
        .fg(theme.text_primary);
    let width = area.width as usize;
    let line = match selected {
        Some(record) => format_selection_line(record, width),
        None => " ".repeat(width),
    };

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(line, style))).style(style),
        area,
    );
}

fn format_selection_line(record: &ProcessRecord, width: usize) -> String {
    if width == 0 {
        return String::new();
    }

    let metrics = format!(
        "{}  VIRT {}  THR {}  CPU {}",
        record.state,
        format_optional_kb(record.virtual_memory_kb),
        format_optional(record.thread_count),
        format_percent(record.cpu_usage_percent),
    );
    if metrics.width() > width {
        let metrics = truncate_unicode(&metrics, width);
        let pad = width.saturating_sub(metrics.width());
        return format!("{}{}", " ".repeat(pad), metrics);
    }

    let metrics_width = metrics.width();
    let left_capacity = width.saturating_sub(metrics_width + 1);
    let label = truncate_unicode(&format!("{} {}", record.pid, record.name), left_capacity);
    let gap = width.saturating_sub(label.width() + metrics_width);
    format!("{label}{}{metrics}", " ".repeat(gap))
}
