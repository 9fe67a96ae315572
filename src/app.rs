use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Rect;
use ratatui::widgets::TableState;

use crate::action::{Action, Direction};
use crate::config::{Config, KeybindsConfig, parse_key};
use crate::system::kill::{TerminateError, Termination};
use crate::system::snapshot::Snapshot;
use crate::ui::theme::Theme;
use crate::view::{SortKey, ViewState};

const STATUS_TTL: Duration = Duration::from_secs(3);
const THRESHOLD_STEP: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Filter,
    Help,
}

/// Transient line shown in place of the key hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    pub created: Instant,
}

/// Work the event loop performs on the app's behalf after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Terminate { pid: u32, force: bool },
    Refresh,
}

#[derive(Debug, Clone)]
pub struct ResolvedKeybinds {
    pub quit: KeyCode,
    pub filter: KeyCode,
    pub kill: KeyCode,
    pub force_kill: KeyCode,
    pub cycle_sort: KeyCode,
    pub reverse_sort: KeyCode,
    pub clear_selection: KeyCode,
    pub threshold_up: KeyCode,
    pub threshold_down: KeyCode,
    pub help: KeyCode,
    pub refresh: KeyCode,
}

impl ResolvedKeybinds {
    pub fn from_config(kb: &KeybindsConfig) -> Self {
        Self {
            quit: parse_key(&kb.quit).unwrap_or(KeyCode::Char('q')),
            filter: parse_key(&kb.filter).unwrap_or(KeyCode::Char('/')),
            kill: parse_key(&kb.kill).unwrap_or(KeyCode::Char('k')),
            force_kill: parse_key(&kb.force_kill).unwrap_or(KeyCode::Char('K')),
            cycle_sort: parse_key(&kb.cycle_sort).unwrap_or(KeyCode::Char('s')),
            reverse_sort: parse_key(&kb.reverse_sort).unwrap_or(KeyCode::Char('S')),
            clear_selection: parse_key(&kb.clear_selection).unwrap_or(KeyCode::Char('c')),
            threshold_up: parse_key(&kb.threshold_up).unwrap_or(KeyCode::Char('+')),
            threshold_down: parse_key(&kb.threshold_down).unwrap_or(KeyCode::Char('-')),
            help: parse_key(&kb.help).unwrap_or(KeyCode::Char('?')),
            refresh: parse_key(&kb.refresh).unwrap_or(KeyCode::Char('r')),
        }
    }

    /// Returns (key_label, description) pairs for all configurable keybinds.
    pub fn help_entries(&self) -> Vec<(String, &'static str)> {
        let mut entries = vec![
            (key_label(self.quit), "Quit"),
            (key_label(self.filter), "Filter by name or PID"),
            (key_label(self.kill), "Terminate (SIGTERM)"),
            (key_label(self.force_kill), "Force kill (SIGKILL)"),
            (key_label(self.cycle_sort), "Cycle sort column"),
            (key_label(self.reverse_sort), "Reverse sort order"),
            (key_label(self.clear_selection), "Clear selection"),
            (key_label(self.threshold_up), "Raise CPU highlight"),
            (key_label(self.threshold_down), "Lower CPU highlight"),
            (key_label(self.refresh), "Refresh now"),
            (key_label(self.help), "Toggle help"),
        ];
        entries.push(("↑↓".to_string(), "Move selection"));
        entries.push(("PgUp/PgDn".to_string(), "Page"));
        entries.push(("Ctrl+C".to_string(), "Quit (always)"));
        entries
    }
}

pub fn key_label(code: KeyCode) -> String {
    match code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Backspace => "Bksp".to_string(),
        KeyCode::Delete => "Del".to_string(),
        KeyCode::F(n) => format!("F{n}"),
        _ => "?".to_string(),
    }
}

pub struct App {
    pub running: bool,
    pub snapshot: Arc<Snapshot>,
    pub view: ViewState,
    pub input_mode: InputMode,
    pub theme: Theme,
    pub status_message: Option<StatusMessage>,
    pub table_area: Option<Rect>,
    pub table_state: TableState,
    pub refresh_interval: Duration,
    pub keybinds: ResolvedKeybinds,
}

impl App {
    pub fn new(config: &Config, snapshot: Arc<Snapshot>, refresh_interval: Duration) -> Self {
        let view = ViewState::new(
            SortKey::from_str_config(&config.general.default_sort),
            config.general.sort_descending,
            config.general.cpu_highlight_threshold,
        );

        App {
            running: true,
            snapshot,
            view,
            input_mode: InputMode::Normal,
            theme: Theme::from_config(&config.colors.theme),
            status_message: None,
            table_area: None,
            table_state: TableState::default(),
            refresh_interval,
            keybinds: ResolvedKeybinds::from_config(&config.keybinds),
        }
    }

    pub fn on_snapshot(&mut self, snapshot: Arc<Snapshot>) {
        self.snapshot = snapshot;
        self.view.reconcile(&self.snapshot);
        self.expire_status();
    }

    pub fn on_terminated(&mut self, pid: u32, outcome: Result<Termination, TerminateError>) {
        match outcome {
            Ok(Termination::Graceful) => {
                self.set_status(format!("Sent SIGTERM to PID {pid}"), false)
            }
            Ok(Termination::Forced) => {
                self.set_status(format!("Sent SIGKILL to PID {pid}"), false)
            }
            Err(err) => self.set_status(err.to_string(), true),
        }
    }

    pub fn on_tick(&mut self) {
        self.expire_status();
    }

    pub fn set_status(&mut self, text: impl Into<String>, is_error: bool) {
        self.status_message = Some(StatusMessage {
            text: text.into(),
            is_error,
            created: Instant::now(),
        });
    }

    fn expire_status(&mut self) {
        if let Some(status) = &self.status_message
            && status.created.elapsed() >= STATUS_TTL
        {
            self.status_message = None;
        }
    }

    pub fn map_key(&self, key: KeyEvent) -> Action {
        // Ctrl+C always quits (hardwired safety)
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Action::Quit;
        }

        match self.input_mode {
            InputMode::Normal => self.map_key_normal(key),
            InputMode::Filter => self.map_key_filter(key),
            InputMode::Help => self.map_key_help(key),
        }
    }

    fn map_key_normal(&self, key: KeyEvent) -> Action {
        let code = key.code;
        let kb = &self.keybinds;

        // Navigation keys are hardwired (not configurable)
        match code {
            KeyCode::Up => return Action::Navigate(Direction::Up),
            KeyCode::Down => return Action::Navigate(Direction::Down),
            KeyCode::PageUp => return Action::Navigate(Direction::PageUp),
            KeyCode::PageDown => return Action::Navigate(Direction::PageDown),
            KeyCode::Home => return Action::Navigate(Direction::Top),
            KeyCode::End => return Action::Navigate(Direction::Bottom),
            _ => {}
        }

        if code == kb.quit {
            return Action::Quit;
        }
        if code == kb.filter {
            return Action::EnterFilterMode;
        }
        if code == kb.kill {
            return match self.view.selected_pid() {
                Some(pid) => Action::Kill(pid),
                None => Action::None,
            };
        }
        if code == kb.force_kill {
            return match self.view.selected_pid() {
                Some(pid) => Action::ForceKill(pid),
                None => Action::None,
            };
        }
        if code == kb.cycle_sort {
            return Action::CycleSort;
        }
        if code == kb.reverse_sort {
            return Action::ReverseSort;
        }
        if code == kb.clear_selection {
            return Action::ClearSelection;
        }
        if code == kb.threshold_up {
            return Action::AdjustThreshold(THRESHOLD_STEP);
        }
        if code == kb.threshold_down {
            return Action::AdjustThreshold(-THRESHOLD_STEP);
        }
        if code == kb.help {
            return Action::ToggleHelp;
        }
        if code == kb.refresh {
            return Action::Refresh;
        }
        if code == KeyCode::Esc && !self.view.filter().is_empty() {
            return Action::ClearFilter;
        }

        Action::None
    }

    fn map_key_help(&self, key: KeyEvent) -> Action {
        let code = key.code;
        // In help mode, only the help key and Esc dismiss, everything else is ignored
        if code == self.keybinds.help || code == KeyCode::Esc {
            return Action::ToggleHelp;
        }
        Action::None
    }

    fn map_key_filter(&self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => Action::ClearFilter,
            KeyCode::Enter => Action::ExitFilterMode,
            KeyCode::Backspace => {
                let mut text = self.view.filter().to_string();
                text.pop();
                Action::UpdateFilter(text)
            }
            KeyCode::Char(c) => {
                let mut text = self.view.filter().to_string();
                text.push(c);
                Action::UpdateFilter(text)
            }
            _ => Action::None,
        }
    }

    pub fn dispatch(&mut self, action: Action) -> Option<Effect> {
        match action {
            Action::Quit => self.running = false,
            Action::Navigate(dir) => self.navigate(dir),
            Action::EnterFilterMode => self.input_mode = InputMode::Filter,
            Action::ExitFilterMode => self.input_mode = InputMode::Normal,
            Action::ClearFilter => {
                self.view.set_filter("");
                self.input_mode = InputMode::Normal;
            }
            Action::UpdateFilter(text) => self.view.set_filter(text),
            Action::ClearSelection => self.view.clear_selection(),
            Action::Kill(pid) => return Some(Effect::Terminate { pid, force: false }),
            Action::ForceKill(pid) => return Some(Effect::Terminate { pid, force: true }),
            Action::ToggleHelp => {
                self.input_mode = if self.input_mode == InputMode::Help {
                    InputMode::Normal
                } else {
                    InputMode::Help
                };
            }
            Action::CycleSort => self.view.cycle_sort(),
            Action::ReverseSort => self.view.reverse_sort(),
            Action::AdjustThreshold(delta) => {
                let next = (self.view.cpu_highlight_threshold() + delta).clamp(0.0, 100.0);
                self.view.set_cpu_highlight_threshold(next);
            }
            Action::Refresh => return Some(Effect::Refresh),
            Action::SelectRow(row) => self.select_row(row),
            Action::None => {}
        }
        None
    }

    fn navigate(&mut self, direction: Direction) {
        let snapshot = Arc::clone(&self.snapshot);
        let rows = self.view.rows(&snapshot);
        let page = self.page_size() as isize;
        let delta = match direction {
            Direction::Up => -1,
            Direction::Down => 1,
            Direction::PageUp => -page,
            Direction::PageDown => page,
            Direction::Top => {
                if let Some(first) = rows.first() {
                    self.view.select(first);
                }
                return;
            }
            Direction::Bottom => {
                if let Some(last) = rows.last() {
                    self.view.select(last);
                }
                return;
            }
        };
        self.view.move_selection(&rows, delta);
    }

    /// Rows visible in the table body: area minus borders and header.
    fn page_size(&self) -> usize {
        self.table_area
            .map(|a| a.height.saturating_sub(3) as usize)
            .unwrap_or(10)
            .max(1)
    }

    fn select_row(&mut self, row: u16) {
        let Some(area) = self.table_area else {
            return;
        };
        // Border and header occupy the first two lines.
        let body_top = area.y + 2;
        if row < body_top || row >= area.y + area.height.saturating_sub(1) {
            return;
        }
        let index = self.table_state.offset() + (row - body_top) as usize;
        let snapshot = Arc::clone(&self.snapshot);
        let rows = self.view.rows(&snapshot);
        if let Some(record) = rows.get(index) {
            self.view.select(record);
        }
    }

    pub fn show_help(&self) -> bool {
        self.input_mode == InputMode::Help
    }

    pub fn help_entries(&self) -> Vec<(String, &'static str)> {
        self.keybinds.help_entries()
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::time::SystemTime;

    use super::*;
    use crate::system::process::{ProcessRecord, ProcessState};
    use crate::system::snapshot::HostMetrics;

    fn make_test_process(pid: u32, name: &str, cpu: f32) -> ProcessRecord {
        ProcessRecord {
            pid,
            name: name.to_string(),
            state: ProcessState::Running,
            virtual_memory_kb: Some(1024 * pid as u64),
            thread_count: Some(1),
            cpu_usage_percent: cpu,
        }
    }

    fn make_test_app(procs: Vec<ProcessRecord>) -> App {
        let snapshot = Arc::new(Snapshot {
            sequence: 1,
            captured_at: SystemTime::UNIX_EPOCH,
            host: HostMetrics::default(),
            processes: procs,
        });
        App::new(&Config::default(), snapshot, Duration::from_secs(2))
    }

    fn press(app: &mut App, code: KeyCode) -> Option<Effect> {
        let action = app.map_key(KeyEvent::new(code, KeyModifiers::NONE));
        app.dispatch(action)
    }

    #[test]
    fn default_keybinds_map_to_actions() {
        let app = make_test_app(vec![make_test_process(1, "init", 0.0)]);

        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(app.map_key(key), Action::Quit);

        let key = KeyEvent::new(KeyCode::Char('/'), KeyModifiers::NONE);
        assert_eq!(app.map_key(key), Action::EnterFilterMode);

        let key = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE);
        assert_eq!(app.map_key(key), Action::CycleSort);

        let key = KeyEvent::new(KeyCode::Char('S'), KeyModifiers::SHIFT);
        assert_eq!(app.map_key(key), Action::ReverseSort);

        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(app.map_key(key), Action::Quit);

        let key = KeyEvent::new(KeyCode::Up, KeyModifiers::NONE);
        assert_eq!(app.map_key(key), Action::Navigate(Direction::Up));
    }

    #[test]
    fn custom_keybind_remap_works() {
        let mut app = make_test_app(vec![make_test_process(1, "init", 0.0)]);
        app.keybinds.quit = KeyCode::Char('x');

        let key = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE);
        assert_eq!(app.map_key(key), Action::Quit);

        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(app.map_key(key), Action::None);
    }

    #[test]
    fn kill_requires_a_selection() {
        let mut app = make_test_app(vec![make_test_process(7, "sleep", 0.0)]);
        assert_eq!(press(&mut app, KeyCode::Char('k')), None);

        press(&mut app, KeyCode::Down);
        assert_eq!(
            press(&mut app, KeyCode::Char('k')),
            Some(Effect::Terminate {
                pid: 7,
                force: false
            })
        );
        assert_eq!(
            press(&mut app, KeyCode::Char('K')),
            Some(Effect::Terminate { pid: 7, force: true })
        );
    }

    #[test]
    fn filter_mode_edits_view_filter() {
        let mut app = make_test_app(vec![
            make_test_process(1, "init", 0.0),
            make_test_process(2, "bash", 0.0),
        ]);
        press(&mut app, KeyCode::Char('/'));
        assert_eq!(app.input_mode, InputMode::Filter);
        press(&mut app, KeyCode::Char('b'));
        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.view.filter(), "ba");
        assert_eq!(app.view.rows(&app.snapshot).len(), 1);

        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.view.filter(), "b");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.view.filter(), "b");

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.view.filter(), "");
    }

    #[test]
    fn threshold_keys_step_and_clamp() {
        let mut app = make_test_app(vec![]);
        assert_eq!(app.view.cpu_highlight_threshold(), 50.0);
        press(&mut app, KeyCode::Char('+'));
        assert_eq!(app.view.cpu_highlight_threshold(), 55.0);
        for _ in 0..20 {
            press(&mut app, KeyCode::Char('-'));
        }
        assert_eq!(app.view.cpu_highlight_threshold(), 0.0);
    }

    #[test]
    fn refresh_key_requests_refresh() {
        let mut app = make_test_app(vec![]);
        assert_eq!(press(&mut app, KeyCode::Char('r')), Some(Effect::Refresh));
    }

    #[test]
    fn navigation_follows_sorted_rows() {
        let mut app = make_test_app(vec![
            make_test_process(1, "idle", 0.0),
            make_test_process(2, "busy", 90.0),
            make_test_process(3, "mid", 40.0),
        ]);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.view.selected_pid(), Some(2));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.view.selected_pid(), Some(3));
        press(&mut app, KeyCode::End);
        assert_eq!(app.view.selected_pid(), Some(1));
        press(&mut app, KeyCode::Home);
        assert_eq!(app.view.selected_pid(), Some(2));
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.view.selected_pid(), None);
    }

    #[test]
    fn mouse_click_selects_row_under_cursor() {
        let mut app = make_test_app(vec![
            make_test_process(1, "idle", 0.0),
            make_test_process(2, "busy", 90.0),
        ]);
        app.table_area = Some(Rect::new(0, 4, 80, 10));
        app.dispatch(Action::SelectRow(7));
        assert_eq!(app.view.selected_pid(), Some(1));
        app.dispatch(Action::SelectRow(4));
        assert_eq!(app.view.selected_pid(), Some(1));
    }

    #[test]
    fn vanished_selection_is_dropped_on_new_snapshot() {
        let mut app = make_test_app(vec![make_test_process(1, "init", 0.0)]);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.view.selected_pid(), Some(1));

        app.on_snapshot(Arc::new(Snapshot {
            sequence: 2,
            captured_at: SystemTime::UNIX_EPOCH,
            host: HostMetrics::default(),
            processes: vec![make_test_process(2, "bash", 0.0)],
        }));
        assert_eq!(app.view.selected_pid(), None);
    }

    #[test]
    fn termination_outcomes_become_status_messages() {
        let mut app = make_test_app(vec![]);
        app.on_terminated(9, Ok(Termination::Graceful));
        let status = app.status_message.clone().unwrap();
        assert_eq!(status.text, "Sent SIGTERM to PID 9");
        assert!(!status.is_error);

        app.on_terminated(9, Err(TerminateError::NotFound(9)));
        let status = app.status_message.clone().unwrap();
        assert_eq!(status.text, "process 9 not found");
        assert!(status.is_error);

        app.on_terminated(
            9,
            Err(TerminateError::KillFailed {
                pid: 9,
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            }),
        );
        let status = app.status_message.clone().unwrap();
        assert!(status.text.starts_with("failed to kill process 9"));
        assert!(status.is_error);
    }

    #[test]
    fn help_mode_blocks_other_keys() {
        let mut app = make_test_app(vec![]);
        app.dispatch(Action::ToggleHelp);
        assert!(app.show_help());

        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(app.map_key(key), Action::None);

        let key = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(app.map_key(key), Action::ToggleHelp);

        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(app.map_key(key), Action::Quit);

        app.dispatch(Action::ToggleHelp);
        assert_eq!(app.input_mode, InputMode::Normal);
    }
}
