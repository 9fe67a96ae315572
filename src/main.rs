use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, KeyEventKind, MouseButton, MouseEventKind,
};
use crossterm::execute;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

use procwatch::action::Action;
use procwatch::app::{App, Effect};
use procwatch::config::{self, Config, load_config, load_config_from_path};
use procwatch::event::{Event, EventHandler};
use procwatch::logging;
use procwatch::system::collector::Collector;
use procwatch::system::cpu::CpuMode;
use procwatch::system::kill::{OsSignaller, Terminator};
use procwatch::system::process::ProcessRecord;
use procwatch::system::procfs::ProcFs;
use procwatch::system::scheduler::{RefreshHandle, RefreshScheduler};
use procwatch::system::snapshot::HostMetrics;
use procwatch::ui;
use procwatch::view::{SortKey, ViewState};

const UI_TICK: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(
    name = "procwatch",
    about = "Terminal process monitor backed by procfs"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Refresh rate in milliseconds
    #[arg(long)]
    refresh_rate: Option<u64>,

    /// Sort column: pid, name, state, memory, threads, cpu
    #[arg(long)]
    sort: Option<String>,

    /// Sort ascending instead of descending
    #[arg(long, default_value_t = false)]
    ascending: bool,

    /// Initial filter on process name or PID
    #[arg(long)]
    filter: Option<String>,

    /// Root of the procfs mount to sample
    #[arg(long)]
    proc_root: Option<PathBuf>,

    /// Per-process CPU: lifetime (average since start) or interval
    #[arg(long)]
    cpu_mode: Option<String>,

    /// Print N snapshots as JSON lines and exit, without the terminal UI.
    #[arg(long, value_name = "N")]
    dump: Option<u64>,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli);

    if let Some(target) = logging::resolve_target(config.logging.file.as_deref(), cli.dump.is_some())
    {
        logging::init(&config.logging, target)?;
    }

    let proc_root = &config.sampling.proc_root;
    if !proc_root.is_dir() {
        return Err(eyre!("proc root {} is not a directory", proc_root.display()));
    }

    let collector = Collector::new(ProcFs::new(proc_root))
        .with_cpu_mode(CpuMode::from_str_config(&config.general.cpu_mode));
    let (handle, task) =
        RefreshScheduler::new(collector, config.general.refresh_interval()).spawn();
    info!(
        proc_root = %proc_root.display(),
        interval_ms = handle.refresh_interval().as_millis() as u64,
        "sampling started"
    );

    let result = match cli.dump {
        Some(count) => dump(&config, cli.filter.as_deref(), &handle, count).await,
        None => run_terminal(&config, cli.filter.as_deref(), &handle).await,
    };

    handle.stop(task).await;
    result
}

async fn run_terminal(config: &Config, filter: Option<&str>, handle: &RefreshHandle) -> Result<()> {
    let mut terminal = ratatui::init();
    execute!(stdout(), EnableMouseCapture)?;

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = execute!(std::io::stdout(), DisableMouseCapture);
        ratatui::restore();
        original_hook(panic_info);
    }));

    let result = run(&mut terminal, config, filter, handle).await;

    execute!(stdout(), DisableMouseCapture)?;
    ratatui::restore();

    result
}

async fn run(
    terminal: &mut ratatui::DefaultTerminal,
    config: &Config,
    filter: Option<&str>,
    handle: &RefreshHandle,
) -> Result<()> {
    let mut app = App::new(config, handle.snapshot(), handle.refresh_interval());
    if let Some(filter) = filter {
        app.view.set_filter(filter);
    }
    let terminator = Terminator::new(OsSignaller, config.termination.grace_period());
    let mut events = EventHandler::new(handle.subscribe(), UI_TICK);
    let events_tx = events.sender();

    terminal.draw(|frame| ui::draw(frame, &mut app))?;

    while app.running {
        let Some(event) = events.next().await else {
            break;
        };
        let mut should_draw = true;
        match event {
            Event::Key(key) => {
                if key.kind == KeyEventKind::Press {
                    let action = app.map_key(key);
                    if let Some(effect) = app.dispatch(action) {
                        perform(effect, handle, &terminator, &events_tx);
                    }
                } else {
                    should_draw = false;
                }
            }
            Event::Mouse(mouse) => {
                if mouse.kind == MouseEventKind::Down(MouseButton::Left) {
                    app.dispatch(Action::SelectRow(mouse.row));
                } else {
                    should_draw = false;
                }
            }
            Event::Snapshot(snapshot) => app.on_snapshot(snapshot),
            Event::Terminated { pid, outcome } => {
                app.on_terminated(pid, outcome);
                handle.request_refresh();
            }
            Event::Tick => {
                let had_status = app.status_message.is_some();
                app.on_tick();
                should_draw = had_status && app.status_message.is_none();
            }
            Event::Resize => {}
        }
        if should_draw {
            terminal.draw(|frame| ui::draw(frame, &mut app))?;
        }
    }

    Ok(())
}

/// Termination blocks for up to the grace period, so it runs on the
/// blocking pool and reports back through the event channel.
fn perform(
    effect: Effect,
    handle: &RefreshHandle,
    terminator: &Terminator,
    events: &mpsc::UnboundedSender<Event>,
) {
    match effect {
        Effect::Refresh => handle.request_refresh(),
        Effect::Terminate { pid, force } => {
            let terminator = terminator.clone();
            let events = events.clone();
            tokio::task::spawn_blocking(move || {
                let outcome = if force {
                    terminator.force_kill(pid)
                } else {
                    terminator.terminate(pid)
                };
                let _ = events.send(Event::Terminated { pid, outcome });
            });
        }
    }
}

#[derive(Serialize)]
struct DumpLine<'a> {
    sequence: u64,
    captured_at: SystemTime,
    host: &'a HostMetrics,
    processes: Vec<&'a ProcessRecord>,
}

/// Headless mode: prints `count` consecutive snapshots, filtered and sorted
/// like the table would show them.
async fn dump(config: &Config, filter: Option<&str>, handle: &RefreshHandle, count: u64) -> Result<()> {
    let mut view = ViewState::new(
        SortKey::from_str_config(&config.general.default_sort),
        config.general.sort_descending,
        config.general.cpu_highlight_threshold,
    );
    if let Some(filter) = filter {
        view.set_filter(filter);
    }

    let mut snapshots = handle.subscribe();
    let mut printed = 0;
    while printed < count {
        snapshots
            .changed()
            .await
            .map_err(|_| eyre!("refresh loop stopped before {count} snapshots"))?;
        let snapshot = Arc::clone(&snapshots.borrow_and_update());
        let line = DumpLine {
            sequence: snapshot.sequence,
            captured_at: snapshot.captured_at,
            host: &snapshot.host,
            processes: view.rows(&snapshot),
        };
        println!("{}", serde_json::to_string(&line)?);
        printed += 1;
    }
    Ok(())
}

fn load_config_for_cli(cli: &Cli) -> config::Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(rate) = cli.refresh_rate {
        config.general.refresh_rate_ms = rate;
    }
    if let Some(ref sort) = cli.sort {
        config.general.default_sort = sort.clone();
    }
    if cli.ascending {
        config.general.sort_descending = false;
    }
    if let Some(ref root) = cli.proc_root {
        config.sampling.proc_root = root.clone();
    }
    if let Some(ref mode) = cli.cpu_mode {
        config.general.cpu_mode = mode.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.logging.file = Some(file.clone());
    }

    config
}
