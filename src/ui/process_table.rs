use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState};

use crate::format::{format_optional, format_optional_kb, format_percent, truncate_unicode};
use crate::system::process::ProcessRecord;
use crate::ui::theme::Theme;
use crate::view::{SortKey, ViewState};

const COLUMNS: [(SortKey, &str); 6] = [
    (SortKey::Pid, "PID"),
    (SortKey::Name, "Name"),
    (SortKey::State, "State"),
    (SortKey::Memory, "VIRT"),
    (SortKey::Threads, "THR"),
    (SortKey::Cpu, "CPU%"),
];

const NAME_WIDTH: usize = 24;

pub fn render(
    frame: &mut Frame,
    area: Rect,
    rows: &[&ProcessRecord],
    total: usize,
    view: &ViewState,
    theme: &Theme,
    state: &mut TableState,
) {
    let mut title = format!(" Processes {}/{} ", rows.len(), total);
    if !view.filter().is_empty() {
        title.push_str(&format!("[{}] ", view.filter()));
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.overlay_border))
        .title(Span::styled(
            title,
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ));

    if rows.is_empty() {
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let message = if total == 0 {
            " Waiting for first sample\u{2026}"
        } else {
            " No processes match the filter"
        };
        frame.render_widget(
            Paragraph::new(message).style(Style::default().fg(theme.text_secondary)),
            inner,
        );
        return;
    }

    let header = Row::new(COLUMNS.iter().map(|(key, label)| {
        let text = if *key == view.sort_key() {
            let arrow = if view.descending() { "\u{25bc}" } else { "\u{25b2}" };
            format!("{label}{arrow}")
        } else {
            (*label).to_string()
        };
        Cell::from(text)
    }))
    .style(
        Style::default()
            .fg(theme.table_header_fg)
            .add_modifier(Modifier::BOLD),
    );

    let threshold = view.cpu_highlight_threshold();
    let body = rows.iter().map(|p| {
        let cpu_style = Style::default().fg(theme.cpu_color(p.cpu_usage_percent, threshold));
        let row = Row::new(vec![
            Cell::from(p.pid.to_string()),
            Cell::from(truncate_unicode(&p.name, NAME_WIDTH)),
            Cell::from(p.state.label()),
            Cell::from(format_optional_kb(p.virtual_memory_kb)),
            Cell::from(format_optional(p.thread_count)),
            Cell::from(format_percent(p.cpu_usage_percent)).style(cpu_style),
        ]);
        if view.is_highlighted(p) {
            row.style(Style::default().fg(theme.hot_fg).add_modifier(Modifier::BOLD))
        } else {
            row.style(Style::default().fg(theme.text_primary))
        }
    });

    let widths = [
        Constraint::Length(8),
        Constraint::Min(12),
        Constraint::Length(13),
        Constraint::Length(10),
        Constraint::Length(5),
        Constraint::Length(8),
    ];

    let table = Table::new(body, widths)
        .header(header)
        .block(block)
        .row_highlight_style(
            Style::default()
                .bg(theme.selection_bg)
                .fg(theme.selection_fg)
                .add_modifier(Modifier::BOLD),
        );

    state.select(view.selected_index(rows));
    frame.render_stateful_widget(table, area, state);
}
