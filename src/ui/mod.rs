pub mod header;
pub mod help;
pub mod process_table;
pub mod selection_bar;
pub mod statusbar;
pub mod theme;

use std::sync::Arc;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};

use crate::app::App;

pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let snapshot = Arc::clone(&app.snapshot);

    header::render(
        frame,
        chunks[0],
        &snapshot,
        app.refresh_interval,
        &app.theme,
    );

    app.table_area = Some(chunks[1]);
    let rows = app.view.rows(&snapshot);
    process_table::render(
        frame,
        chunks[1],
        &rows,
        snapshot.processes.len(),
        &app.view,
        &app.theme,
        &mut app.table_state,
    );

    selection_bar::render(
        frame,
        chunks[2],
        app.view.selection().map(|s| &s.record),
        &app.theme,
    );
    statusbar::render(
        frame,
        chunks[3],
        app.input_mode,
        app.view.filter(),
        app.status_message.as_ref(),
        &app.keybinds,
        &app.theme,
    );

    // Help overlay, rendered last to appear on top
    if app.show_help() {
        help::render(
            frame,
            frame.area(),
            &app.help_entries(),
            app.view.cpu_highlight_threshold(),
            &app.theme,
        );
    }
}
