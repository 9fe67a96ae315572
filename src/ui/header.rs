use std::time::Duration;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Gauge, Paragraph};

use crate::format::format_kb;
use crate::system::snapshot::{HostMetrics, Snapshot};
use crate::ui::theme::Theme;

pub fn render(
    frame: &mut Frame,
    area: Rect,
    snapshot: &Snapshot,
    refresh_interval: Duration,
    theme: &Theme,
) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ])
        .split(area);

    render_branding(frame, chunks[0], snapshot, refresh_interval, theme);
    render_memory_gauge(frame, chunks[1], &snapshot.host, theme);
    render_cpu_gauge(frame, chunks[2], &snapshot.host, theme);
}

fn bordered(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.overlay_border))
}

fn gauge_title(text: String, theme: &Theme) -> Span<'static> {
    Span::styled(
        text,
        Style::default()
            .fg(theme.text_secondary)
            .add_modifier(Modifier::BOLD),
    )
}

fn render_branding(
    frame: &mut Frame,
    area: Rect,
    snapshot: &Snapshot,
    refresh_interval: Duration,
    theme: &Theme,
) {
    let block = bordered(theme);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let secondary = Style::default().fg(theme.text_secondary);
    let line = Line::from(vec![
        Span::styled(
            " procwatch ",
            Style::default()
                .fg(theme.header_accent_fg)
                .bg(theme.header_accent_bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(format!("Procs: {}", snapshot.processes.len()), secondary),
        Span::raw("  "),
        Span::styled(
            format!("Every {:.1}s", refresh_interval.as_secs_f32()),
            secondary,
        ),
    ]);
    frame.render_widget(Paragraph::new(line), inner);
}

fn render_memory_gauge(frame: &mut Frame, area: Rect, host: &HostMetrics, theme: &Theme) {
    let ratio = (host.memory_usage_percent as f64 / 100.0).clamp(0.0, 1.0);
    let used_kb = host.memory_total_kb.saturating_sub(host.memory_available_kb);

    let gauge = Gauge::default()
        .block(bordered(theme).title(gauge_title(" MEM ".to_string(), theme)))
        .gauge_style(
            Style::default()
                .fg(theme.gauge_filled)
                .bg(theme.gauge_unfilled),
        )
        .ratio(ratio)
        .label(format!(
            "{}/{} ({:.0}%)",
            format_kb(used_kb),
            format_kb(host.memory_total_kb),
            host.memory_usage_percent
        ));

    frame.render_widget(gauge, area);
}

fn render_cpu_gauge(frame: &mut Frame, area: Rect, host: &HostMetrics, theme: &Theme) {
    let ratio = (host.cpu_usage_percent as f64 / 100.0).clamp(0.0, 1.0);

    let gauge = Gauge::default()
        .block(bordered(theme).title(gauge_title(
            format!(" CPU \u{00d7}{} ", host.core_count),
            theme,
        )))
        .gauge_style(
            Style::default()
                .fg(theme.gauge_filled)
                .bg(theme.gauge_unfilled),
        )
        .ratio(ratio)
        .label(format!("{:.1}%", host.cpu_usage_percent));

    frame.render_widget(gauge, area);
}
