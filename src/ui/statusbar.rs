use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::{InputMode, ResolvedKeybinds, StatusMessage, key_label};
use crate::ui::theme::Theme;

type Hint = (String, &'static str);

/// Bottom line: a pending status message, otherwise the mode's prompt
/// followed by key hints.
pub fn render(
    frame: &mut Frame,
    area: Rect,
    input_mode: InputMode,
    filter_text: &str,
    status: Option<&StatusMessage>,
    keybinds: &ResolvedKeybinds,
    theme: &Theme,
) {
    let line = match status {
        Some(status) => status_line(status, theme),
        None => {
            let mut spans = prompt(input_mode, filter_text, keybinds, theme);
            spans.extend(
                hints(input_mode, filter_text, keybinds)
                    .into_iter()
                    .flat_map(|(key, desc)| pill(key, desc, theme)),
            );
            Line::from(spans)
        }
    };

    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(theme.statusbar_bg)),
        area,
    );
}

fn status_line(status: &StatusMessage, theme: &Theme) -> Line<'static> {
    let fg = if status.is_error {
        theme.status_err
    } else {
        theme.status_ok
    };
    Line::from(Span::styled(
        format!(" {}", status.text),
        Style::default().fg(fg).add_modifier(Modifier::BOLD),
    ))
}

fn prompt(
    mode: InputMode,
    filter_text: &str,
    keybinds: &ResolvedKeybinds,
    theme: &Theme,
) -> Vec<Span<'static>> {
    let text = Style::default().fg(theme.pill_desc_fg);
    match mode {
        InputMode::Filter => vec![
            Span::styled(format!(" {} ", key_label(keybinds.filter)), key_style(theme)),
            Span::styled(format!(" {filter_text}"), text),
            Span::styled("\u{2588}", Style::default().fg(theme.pill_key_bg)),
        ],
        InputMode::Normal if !filter_text.is_empty() => vec![
            Span::styled(
                " Filter: ",
                Style::default()
                    .fg(theme.pill_key_bg)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(filter_text.to_string(), text),
        ],
        InputMode::Normal | InputMode::Help => Vec::new(),
    }
}

fn hints(mode: InputMode, filter_text: &str, kb: &ResolvedKeybinds) -> Vec<Hint> {
    match mode {
        InputMode::Filter => vec![
            ("Esc".to_string(), "Cancel"),
            ("Enter".to_string(), "Apply"),
        ],
        InputMode::Help => vec![(key_label(kb.help), "Close help")],
        InputMode::Normal if !filter_text.is_empty() => vec![
            ("Esc".to_string(), "Clear"),
            (key_label(kb.filter), "Edit"),
            (key_label(kb.kill), "Kill"),
        ],
        InputMode::Normal => vec![
            (key_label(kb.quit), "Quit"),
            (key_label(kb.filter), "Filter"),
            (key_label(kb.cycle_sort), "Sort"),
            (key_label(kb.kill), "Kill"),
            (key_label(kb.force_kill), "Force"),
            (key_label(kb.refresh), "Refresh"),
            (key_label(kb.help), "Help"),
        ],
    }
}

fn key_style(theme: &Theme) -> Style {
    Style::default()
        .fg(theme.pill_key_fg)
        .bg(theme.pill_key_bg)
        .add_modifier(Modifier::BOLD)
}

fn pill(key: String, desc: &'static str, theme: &Theme) -> [Span<'static>; 3] {
    [
        Span::raw(" "),
        Span::styled(format!(" {key} "), key_style(theme)),
        Span::styled(
            format!(" {desc}"),
            Style::default().fg(theme.pill_desc_fg).bg(theme.surface_bg),
        ),
    ]
}
