//! Filtering, sorting and selection over a published snapshot.
//!
//! Nothing here touches the collector: a `ViewState` only reads snapshots,
//! so the same snapshot can back any number of differently-configured views.

use std::cmp::Ordering;

use crate::system::process::ProcessRecord;
use crate::system::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    Pid,
    Name,
    State,
    Memory,
    Threads,
    #[default]
    Cpu,
}

impl SortKey {
    pub fn next(self) -> Self {
        match self {
            SortKey::Pid => SortKey::Name,
            SortKey::Name => SortKey::State,
            SortKey::State => SortKey::Memory,
            SortKey::Memory => SortKey::Threads,
            SortKey::Threads => SortKey::Cpu,
            SortKey::Cpu => SortKey::Pid,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Pid => "PID",
            SortKey::Name => "Name",
            SortKey::State => "State",
            SortKey::Memory => "VIRT",
            SortKey::Threads => "Threads",
            SortKey::Cpu => "CPU%",
        }
    }

    pub fn from_str_config(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pid" => SortKey::Pid,
            "name" => SortKey::Name,
            "state" => SortKey::State,
            "memory" | "mem" | "virt" => SortKey::Memory,
            "threads" => SortKey::Threads,
            _ => SortKey::Cpu,
        }
    }

    fn compare(self, a: &ProcessRecord, b: &ProcessRecord) -> Ordering {
        match self {
            SortKey::Pid => a.pid.cmp(&b.pid),
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::State => a.state.label().cmp(b.state.label()),
            SortKey::Memory => a.virtual_memory_kb.cmp(&b.virtual_memory_kb),
            SortKey::Threads => a.thread_count.cmp(&b.thread_count),
            SortKey::Cpu => a.cpu_usage_percent.total_cmp(&b.cpu_usage_percent),
        }
    }
}

/// The highlighted process and the last record seen for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub pid: u32,
    pub record: ProcessRecord,
}

#[derive(Debug, Clone)]
pub struct ViewState {
    filter: String,
    filter_lower: String,
    sort_key: SortKey,
    descending: bool,
    cpu_highlight_threshold: f32,
    selection: Option<Selection>,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState::new(SortKey::default(), true, 50.0)
    }
}

impl ViewState {
    pub fn new(sort_key: SortKey, descending: bool, cpu_highlight_threshold: f32) -> Self {
        ViewState {
            filter: String::new(),
            filter_lower: String::new(),
            sort_key,
            descending,
            cpu_highlight_threshold: cpu_highlight_threshold.max(0.0),
            selection: None,
        }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
        self.filter_lower = self.filter.to_lowercase();
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn descending(&self) -> bool {
        self.descending
    }

    pub fn set_sort(&mut self, key: SortKey, descending: bool) {
        self.sort_key = key;
        self.descending = descending;
    }

    pub fn cycle_sort(&mut self) {
        self.sort_key = self.sort_key.next();
    }

    pub fn reverse_sort(&mut self) {
        self.descending = !self.descending;
    }

    pub fn cpu_highlight_threshold(&self) -> f32 {
        self.cpu_highlight_threshold
    }

    pub fn set_cpu_highlight_threshold(&mut self, percent: f32) {
        self.cpu_highlight_threshold = if percent.is_finite() {
            percent.max(0.0)
        } else {
            0.0
        };
    }

    /// A threshold of 0 disables highlighting.
    pub fn is_highlighted(&self, record: &ProcessRecord) -> bool {
        self.cpu_highlight_threshold > 0.0
            && record.cpu_usage_percent >= self.cpu_highlight_threshold
    }

    /// Visible rows: filtered, then sorted by the active key. Ties keep pid
    /// order so rows do not jump between refreshes.
    pub fn rows<'a>(&self, snapshot: &'a Snapshot) -> Vec<&'a ProcessRecord> {
        let mut rows: Vec<&ProcessRecord> = snapshot
            .processes
            .iter()
            .filter(|p| p.matches_filter(&self.filter_lower))
            .collect();
        rows.sort_by(|a, b| {
            let primary = self.sort_key.compare(a, b);
            let primary = if self.descending {
                primary.reverse()
            } else {
                primary
            };
            primary.then_with(|| a.pid.cmp(&b.pid))
        });
        rows
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn selected_pid(&self) -> Option<u32> {
        self.selection.as_ref().map(|s| s.pid)
    }

    pub fn select(&mut self, record: &ProcessRecord) {
        self.selection = Some(Selection {
            pid: record.pid,
            record: record.clone(),
        });
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Refreshes the cached record from a new snapshot, or drops the
    /// selection once its pid is gone.
    pub fn reconcile(&mut self, snapshot: &Snapshot) {
        let Some(selection) = &mut self.selection else {
            return;
        };
        match snapshot.process(selection.pid) {
            Some(record) => selection.record = record.clone(),
            None => self.selection = None,
        }
    }

    /// Moves the selection by `delta` rows within `rows`, clamping at both
    /// ends. With nothing selected, down selects the first row and up the last.
    pub fn move_selection(&mut self, rows: &[&ProcessRecord], delta: isize) {
        if rows.is_empty() {
            return;
        }
        let current = self
            .selected_pid()
            .and_then(|pid| rows.iter().position(|r| r.pid == pid));
        let target = match current {
            Some(index) => index.saturating_add_signed(delta).min(rows.len() - 1),
            None if delta < 0 => rows.len() - 1,
            None => 0,
        };
        self.select(rows[target]);
    }

    /// Index of the selected row within `rows`, if it is visible.
    pub fn selected_index(&self, rows: &[&ProcessRecord]) -> Option<usize> {
        let pid = self.selected_pid()?;
        rows.iter().position(|r| r.pid == pid)
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::system::process::ProcessState;
    use crate::system::snapshot::HostMetrics;

    fn record(pid: u32, name: &str, vm: Option<u64>, cpu: f32) -> ProcessRecord {
        ProcessRecord {
            pid,
            name: name.to_string(),
            state: ProcessState::Sleeping,
            virtual_memory_kb: vm,
            thread_count: Some(1),
            cpu_usage_percent: cpu,
        }
    }

    fn snapshot(processes: Vec<ProcessRecord>) -> Snapshot {
        Snapshot {
            sequence: 1,
            captured_at: SystemTime::UNIX_EPOCH,
            host: HostMetrics::default(),
            processes,
        }
    }

    fn sample() -> Snapshot {
        snapshot(vec![
            record(30, "firefox", Some(4_000_000), 35.0),
            record(1, "systemd", Some(170_000), 0.1),
            record(2, "kthreadd", None, 0.0),
            record(400, "Xorg", Some(900_000), 35.0),
        ])
    }

    fn pids(rows: &[&ProcessRecord]) -> Vec<u32> {
        rows.iter().map(|r| r.pid).collect()
    }

    #[test]
    fn default_sort_is_cpu_descending_with_pid_tiebreak() {
        let snap = sample();
        let view = ViewState::default();
        assert_eq!(pids(&view.rows(&snap)), vec![30, 400, 1, 2]);
    }

    #[test]
    fn memory_sort_puts_unavailable_last_when_descending() {
        let snap = sample();
        let mut view = ViewState::default();
        view.set_sort(SortKey::Memory, true);
        assert_eq!(pids(&view.rows(&snap)), vec![30, 400, 1, 2]);
        view.reverse_sort();
        assert_eq!(pids(&view.rows(&snap)), vec![2, 1, 400, 30]);
    }

    #[test]
    fn name_sort_ignores_case() {
        let snap = sample();
        let mut view = ViewState::default();
        view.set_sort(SortKey::Name, false);
        assert_eq!(pids(&view.rows(&snap)), vec![30, 2, 1, 400]);
    }

    #[test]
    fn filter_matches_name_or_pid() {
        let snap = sample();
        let mut view = ViewState::default();
        view.set_filter("SYS");
        assert_eq!(pids(&view.rows(&snap)), vec![1]);
        view.set_filter("40");
        assert_eq!(pids(&view.rows(&snap)), vec![400]);
    }

    #[test]
    fn filter_without_matches_leaves_snapshot_untouched() {
        let snap = sample();
        let mut view = ViewState::default();
        view.set_filter("no-such-process");
        assert!(view.rows(&snap).is_empty());
        assert_eq!(snap.processes.len(), 4);
    }

    #[test]
    fn sort_key_cycles_through_all_columns() {
        let mut key = SortKey::Pid;
        for _ in 0..6 {
            key = key.next();
        }
        assert_eq!(key, SortKey::Pid);
        assert_eq!(SortKey::from_str_config("MEM"), SortKey::Memory);
        assert_eq!(SortKey::from_str_config("whatever"), SortKey::Cpu);
    }

    #[test]
    fn highlight_threshold() {
        let mut view = ViewState::default();
        view.set_cpu_highlight_threshold(30.0);
        assert!(view.is_highlighted(&record(1, "a", None, 35.0)));
        assert!(!view.is_highlighted(&record(1, "a", None, 29.9)));
        view.set_cpu_highlight_threshold(0.0);
        assert!(!view.is_highlighted(&record(1, "a", None, 99.0)));
        view.set_cpu_highlight_threshold(f32::NAN);
        assert_eq!(view.cpu_highlight_threshold(), 0.0);
    }

    #[test]
    fn selection_survives_refresh_and_tracks_new_record() {
        let mut view = ViewState::default();
        let first = sample();
        view.select(first.process(30).unwrap());

        let mut next = sample();
        next.processes[0].cpu_usage_percent = 80.0;
        view.reconcile(&next);
        let selection = view.selection().unwrap();
        assert_eq!(selection.pid, 30);
        assert_eq!(selection.record.cpu_usage_percent, 80.0);
    }

    #[test]
    fn selection_cleared_when_process_disappears() {
        let mut view = ViewState::default();
        view.select(&record(30, "firefox", None, 1.0));
        view.reconcile(&snapshot(vec![record(1, "systemd", None, 0.0)]));
        assert!(view.selection().is_none());
    }

    #[test]
    fn move_selection_clamps_at_edges() {
        let snap = sample();
        let mut view = ViewState::default();
        let rows = view.rows(&snap);

        view.move_selection(&rows, 1);
        assert_eq!(view.selected_pid(), Some(30));
        view.move_selection(&rows, -1);
        assert_eq!(view.selected_pid(), Some(30));
        view.move_selection(&rows, 10);
        assert_eq!(view.selected_pid(), Some(2));
        assert_eq!(view.selected_index(&rows), Some(3));

        view.clear_selection();
        view.move_selection(&rows, -1);
        assert_eq!(view.selected_pid(), Some(2));
    }
}
