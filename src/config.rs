use std::path::{Path, PathBuf};
use std::time::Duration;

use crossterm::event::KeyCode;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub sampling: SamplingConfig,
    pub termination: TerminationConfig,
    pub logging: LoggingConfig,
    pub colors: ColorsConfig,
    pub keybinds: KeybindsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub refresh_rate_ms: u64,
    pub default_sort: String,
    pub sort_descending: bool,
    pub cpu_highlight_threshold: f32,
    pub cpu_mode: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            refresh_rate_ms: 2000,
            default_sort: "cpu".to_string(),
            sort_descending: true,
            cpu_highlight_threshold: 50.0,
            cpu_mode: "lifetime".to_string(),
        }
    }
}

impl GeneralConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_rate_ms)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub proc_root: PathBuf,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            proc_root: PathBuf::from("/proc"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TerminationConfig {
    pub grace_period_ms: u64,
}

impl Default for TerminationConfig {
    fn default() -> Self {
        TerminationConfig {
            grace_period_ms: 1000,
        }
    }
}

impl TerminationConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// No file means no subscriber while the terminal UI is up.
    pub file: Option<PathBuf>,
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            file: None,
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    pub theme: String,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        ColorsConfig {
            theme: "dark".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct KeybindsConfig {
    pub quit: String,
    pub filter: String,
    pub kill: String,
    pub force_kill: String,
    pub cycle_sort: String,
    pub reverse_sort: String,
    pub clear_selection: String,
    pub threshold_up: String,
    pub threshold_down: String,
    pub help: String,
    pub refresh: String,
}

impl Default for KeybindsConfig {
    fn default() -> Self {
        KeybindsConfig {
            quit: "q".to_string(),
            filter: "/".to_string(),
            kill: "k".to_string(),
            force_kill: "K".to_string(),
            cycle_sort: "s".to_string(),
            reverse_sort: "S".to_string(),
            clear_selection: "c".to_string(),
            threshold_up: "+".to_string(),
            threshold_down: "-".to_string(),
            help: "?".to_string(),
            refresh: "r".to_string(),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("procwatch").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
        Err(_) => Config::default(),
    }
}

/// Parses a key as written in the config file: a single character
/// (`"q"`, `"K"`, `"?"`) or a named key (`"Enter"`, `"Esc"`, `"F5"`).
pub fn parse_key(raw: &str) -> Option<KeyCode> {
    let mut chars = raw.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(KeyCode::Char(c));
    }

    match raw.to_lowercase().as_str() {
        "enter" | "return" => Some(KeyCode::Enter),
        "esc" | "escape" => Some(KeyCode::Esc),
        "tab" => Some(KeyCode::Tab),
        "backspace" => Some(KeyCode::Backspace),
        "delete" | "del" => Some(KeyCode::Delete),
        "space" => Some(KeyCode::Char(' ')),
        other => other
            .strip_prefix('f')
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| (1..=12).contains(n))
            .map(KeyCode::F),
    }
}
