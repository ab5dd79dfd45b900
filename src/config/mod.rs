#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::DaybookError;
use crate::task::Priority;
use crate::task::calendar::DateLocale;
use crate::task::view::StatsRange;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub ui: UiConfig,
    pub tasks: TasksConfig,
    pub stats: StatsConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub icons: bool,
    pub locale: DateLocale,
    /// Whether the "Late" section on the Today tab starts expanded.
    pub show_late: bool,
    pub start_tab: StartTab,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            icons: true,
            locale: DateLocale::default(),
            show_late: true,
            start_tab: StartTab::Today,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StartTab {
    #[default]
    Today,
    Upcoming,
    History,
    Stats,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TasksConfig {
    pub default_priority: u8,
    pub demo_data: bool,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_priority: Priority::default().value(),
            demo_data: true,
        }
    }
}

impl TasksConfig {
    /// Falls back to the lowest priority if the file holds something odd.
    #[must_use]
    pub fn default_priority(&self) -> Priority {
        Priority::try_from(self.default_priority).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatsConfig {
    pub default_range: StatsRange,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// Empty disables file logging.
    pub file: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            file: String::new(),
        }
    }
}

pub const LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_file: PathBuf,
}

pub fn default_paths() -> anyhow::Result<ConfigPaths> {
    let unix = home_config_path_unix();
    if !cfg!(windows) {
        return Ok(ConfigPaths { config_file: unix });
    }

    // Windows: prefer the Unix-style path if present for portability.
    if unix.exists() {
        return Ok(ConfigPaths { config_file: unix });
    }

    let proj = ProjectDirs::from("com", "daybook", "daybook")
        .context("failed to determine platform config directory")?;
    Ok(ConfigPaths {
        config_file: proj.config_dir().join("config.toml"),
    })
}

fn home_config_path_unix() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("~"));
    home.join(".config").join("daybook").join("config.toml")
}

fn home_dir() -> Option<PathBuf> {
    if let Some(v) = std::env::var_os("HOME") {
        return Some(PathBuf::from(v));
    }
    if let Some(v) = std::env::var_os("USERPROFILE") {
        return Some(PathBuf::from(v));
    }
    let drive = std::env::var_os("HOMEDRIVE");
    let path = std::env::var_os("HOMEPATH");
    match (drive, path) {
        (Some(d), Some(p)) => Some(PathBuf::from(d).join(PathBuf::from(p))),
        _ => None,
    }
}

#[must_use]
pub fn expand_tilde(input: &str) -> String {
    if let Some(rest) = input.strip_prefix("~/")
        && let Some(home) = home_dir()
    {
        return home.join(rest).to_string_lossy().to_string();
    }
    input.to_owned()
}

#[must_use]
pub fn tilde_path(input: &str) -> String {
    let Some(home) = home_dir() else {
        return input.to_owned();
    };
    let home_str = home.to_string_lossy();
    if let Some(rest) = input.strip_prefix(home_str.as_ref()) {
        if rest.is_empty() {
            return "~".to_owned();
        }
        if rest.starts_with(std::path::MAIN_SEPARATOR) {
            return format!("~{rest}");
        }
    }
    input.to_owned()
}

pub fn expand_path(input: &str) -> anyhow::Result<PathBuf> {
    let expanded = expand_env_vars(&expand_tilde(input));
    let p = PathBuf::from(expanded);
    if p.is_absolute() {
        return Ok(p);
    }
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    Ok(cwd.join(p))
}

fn expand_env_vars(input: &str) -> String {
    // $VAR and ${VAR}; unknown vars stay as written.
    let Ok(re) = regex::Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?") else {
        return input.to_owned();
    };
    re.replace_all(input, |caps: &regex::Captures<'_>| {
        let key = &caps[1];
        std::env::var(key).unwrap_or_else(|_| caps[0].to_owned())
    })
    .to_string()
}

pub fn load() -> anyhow::Result<(Config, ConfigPaths)> {
    let paths = default_paths()?;
    let cfg = load_at_path(&paths.config_file)?;
    Ok((cfg, paths))
}

pub fn load_at_path(path: &Path) -> anyhow::Result<Config> {
    let (_doc, cfg) = load_from_file(path)?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn list_resolved_toml() -> anyhow::Result<String> {
    let (cfg, _paths) = load()?;
    Ok(toml::to_string_pretty(&cfg)?)
}

pub fn get_value_string(key: &str) -> anyhow::Result<Option<String>> {
    let paths = default_paths()?;
    get_value_string_at_path(&paths.config_file, key)
}

pub fn set_value_string(key: &str, value: &str) -> anyhow::Result<()> {
    let paths = default_paths()?;
    set_value_string_at_path(&paths.config_file, key, value)
}

fn load_from_file(path: &Path) -> anyhow::Result<(toml_edit::DocumentMut, Config)> {
    if !path.exists() {
        return Ok((toml_edit::DocumentMut::new(), Config::default()));
    }
    let raw = std::fs::read_to_string(path).map_err(|source| DaybookError::IoPath {
        path: path.to_path_buf(),
        source,
    })?;

    let doc = raw
        .parse::<toml_edit::DocumentMut>()
        .with_context(|| format!("failed to parse TOML in {}", path.display()))?;

    let cfg: Config = toml::from_str(&raw)
        .with_context(|| format!("failed to deserialize TOML in {}", path.display()))?;
    Ok((doc, cfg))
}

pub fn get_value_string_at_path(path: &Path, key: &str) -> anyhow::Result<Option<String>> {
    let (_doc, cfg) = load_from_file(path)?;
    cfg.validate()?;

    let norm = normalize_key(key);
    let value = lookup_value(&cfg, &norm);
    Ok(value.map(format_value_for_stdout))
}

pub fn set_value_string_at_path(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let (mut doc, cfg) = load_from_file(path)?;
    cfg.validate()?;

    let (norm_key, value_item) = normalize_key_and_parse_value(key, value)?;
    apply_set(&mut doc, &norm_key, value_item)?;

    // Re-parse so a bad value never reaches disk.
    let new_raw = doc.to_string();
    let new_cfg: Config = toml::from_str(&new_raw)
        .with_context(|| format!("config update produced invalid TOML for {}", path.display()))?;
    new_cfg.validate()?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, new_raw.as_bytes()).map_err(|source| DaybookError::IoPath {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(key = %norm_key, path = %path.display(), "config updated");
    Ok(())
}

impl Config {
    pub fn validate(&self) -> Result<(), DaybookError> {
        if Priority::try_from(self.tasks.default_priority).is_err() {
            return Err(DaybookError::Config(format!(
                "tasks.default_priority must be 1-4, got {}",
                self.tasks.default_priority
            )));
        }
        if !LOG_LEVELS.contains(&self.log.level.trim()) {
            return Err(DaybookError::Config(format!(
                "log.level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyType {
    Bool,
    Int,
    String,
    Enum(&'static [&'static str]),
}

fn normalize_key(key: &str) -> String {
    match key {
        "locale" => "ui.locale",
        "start_tab" => "ui.start_tab",
        "priority" | "tasks.priority" => "tasks.default_priority",
        "demo" => "tasks.demo_data",
        "stats.range" => "stats.default_range",
        "log_level" => "log.level",
        _ => key,
    }
    .to_owned()
}

fn normalize_key_and_parse_value(
    key: &str,
    value: &str,
) -> anyhow::Result<(String, toml_edit::Item)> {
    let norm = normalize_key(key);
    let key_type = key_type(&norm).ok_or_else(|| DaybookError::InvalidConfigKey(key.to_owned()))?;
    let invalid = |msg: String| DaybookError::InvalidConfigValue {
        key: key.to_owned(),
        msg,
    };
    let item = match key_type {
        KeyType::Bool => toml_edit::value(parse_bool(value).map_err(invalid)?),
        KeyType::Int => toml_edit::value(parse_int(value).map_err(invalid)?),
        KeyType::String => toml_edit::value(value),
        KeyType::Enum(allowed) => {
            let v = value.trim();
            if !allowed.contains(&v) {
                return Err(invalid(format!("must be one of: {}", allowed.join(", "))).into());
            }
            toml_edit::value(v)
        }
    };

    Ok((norm, item))
}

fn key_type(key: &str) -> Option<KeyType> {
    Some(match key {
        "log.file" => KeyType::String,

        "ui.icons" | "ui.show_late" | "tasks.demo_data" => KeyType::Bool,

        "tasks.default_priority" => KeyType::Int,

        "ui.locale" => KeyType::Enum(&["en-US", "pt-BR"]),
        "ui.start_tab" => KeyType::Enum(&["today", "upcoming", "history", "stats"]),
        "stats.default_range" => KeyType::Enum(&["7d", "30d", "1y"]),
        "log.level" => KeyType::Enum(LOG_LEVELS),

        _ => return None,
    })
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(format!("expected true|false, got '{other}'")),
    }
}

fn parse_int(s: &str) -> Result<i64, String> {
    s.trim()
        .parse::<i64>()
        .map_err(|e| format!("expected integer, got '{s}': {e}"))
}

fn apply_set(
    doc: &mut toml_edit::DocumentMut,
    key: &str,
    value: toml_edit::Item,
) -> anyhow::Result<()> {
    let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
    let Some((leaf, tables)) = parts.split_last() else {
        return Err(DaybookError::InvalidConfigKey(key.to_owned()).into());
    };

    let mut cur = doc.as_table_mut();
    for &seg in tables {
        if !cur.contains_key(seg) {
            let mut t = toml_edit::Table::new();
            t.set_implicit(true);
            cur.insert(seg, toml_edit::Item::Table(t));
        }
        cur = cur[seg].as_table_mut().ok_or_else(|| {
            DaybookError::Config(format!("cannot set {key}: '{seg}' is not a table"))
        })?;
    }

    cur.insert(leaf, value);
    Ok(())
}

fn lookup_value(cfg: &Config, key: &str) -> Option<serde_json::Value> {
    let mut v = serde_json::to_value(cfg).ok()?;
    for seg in key.split('.').filter(|s| !s.is_empty()) {
        match v {
            serde_json::Value::Object(mut map) => {
                v = map.remove(seg)?;
            }
            _ => return None,
        }
    }
    Some(v)
}

fn format_value_for_stdout(v: serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_owned(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s,
        other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
        assert_eq!(Config::default().tasks.default_priority(), Priority::P4);
    }

    #[test]
    fn config_validation_catches_invalid_values() {
        let mut cfg = Config::default();
        cfg.tasks.default_priority = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.log.level = "loud".to_owned();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_set_and_get_dot_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        set_value_string_at_path(&path, "ui.icons", "false").unwrap();
        assert_eq!(
            get_value_string_at_path(&path, "ui.icons")
                .unwrap()
                .as_deref(),
            Some("false")
        );

        set_value_string_at_path(&path, "locale", "pt-BR").unwrap();
        assert_eq!(
            get_value_string_at_path(&path, "ui.locale")
                .unwrap()
                .as_deref(),
            Some("pt-BR")
        );

        set_value_string_at_path(&path, "priority", "2").unwrap();
        set_value_string_at_path(&path, "stats.default_range", "30d").unwrap();

        let cfg = load_at_path(&path).unwrap();
        assert!(!cfg.ui.icons);
        assert_eq!(cfg.ui.locale, DateLocale::PtBr);
        assert_eq!(cfg.tasks.default_priority(), Priority::P2);
        assert_eq!(cfg.stats.default_range, StatsRange::Month);
    }

    #[test]
    fn config_set_rejects_bad_keys_and_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        assert!(set_value_string_at_path(&path, "ui.colour", "red").is_err());
        assert!(set_value_string_at_path(&path, "ui.locale", "fr-FR").is_err());
        assert!(set_value_string_at_path(&path, "ui.icons", "yes").is_err());
        // Parses as an int but fails validation, so nothing is written.
        assert!(set_value_string_at_path(&path, "tasks.default_priority", "7").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn config_set_keeps_existing_comments() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# mine\n[ui]\nicons = true # keep\n").unwrap();

        set_value_string_at_path(&path, "ui.show_late", "false").unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("# mine"));
        assert!(raw.contains("# keep"));
        assert!(!load_at_path(&path).unwrap().ui.show_late);
    }

    #[test]
    fn expand_path_resolves_env_vars() {
        let Ok(home) = std::env::var("HOME") else {
            return;
        };
        let p = expand_path("${HOME}/daybook.log").unwrap();
        assert_eq!(p, PathBuf::from(home).join("daybook.log"));

        let untouched = expand_env_vars("$DAYBOOK_SURELY_UNSET_VAR/x");
        assert_eq!(untouched, "$DAYBOOK_SURELY_UNSET_VAR/x");
    }
}
