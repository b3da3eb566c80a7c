//! Application configuration.
//!
//! Values are looked up by `(section, key)` through a [`ConfigSource`], which
//! is either a TOML file or a snapshot of the process environment. The
//! source is chosen once at startup and turned into an explicit
//! [`Settings`] value that is passed by reference to whoever needs it.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{NaiveTime, Weekday};

use crate::error::{AppError, Result};

/// Where configuration values come from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Parsed TOML file, sections as tables
    File { path: PathBuf, table: toml::Table },

    /// Environment variables named `SECTION_KEY`
    Env(HashMap<String, String>),
}

impl ConfigSource {
    /// Read a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let table: toml::Table = toml::from_str(&content)?;
        Ok(Self::File {
            path: path.to_path_buf(),
            table,
        })
    }

    /// Snapshot the current process environment.
    pub fn from_env() -> Self {
        Self::Env(std::env::vars().collect())
    }

    /// Use the file when it exists and parses, the environment otherwise.
    pub fn select(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            log::info!(
                "No config file at {}, reading environment variables",
                path.display()
            );
            return Self::from_env();
        }

        Self::from_file(path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {}: {}. Falling back to environment variables.",
                path.display(),
                e
            );
            Self::from_env()
        })
    }

    /// Look up a value. Empty values count as missing.
    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        let raw = match self {
            Self::File { table, .. } => match table.get(section)?.get(key)? {
                toml::Value::String(s) => s.clone(),
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Datetime(d) => d.to_string(),
                toml::Value::Array(_) | toml::Value::Table(_) => return None,
            },
            Self::Env(vars) => vars.get(&env_key(section, key))?.clone(),
        };

        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    fn get_or(&self, section: &str, key: &str, default: impl FnOnce() -> String) -> String {
        self.get(section, key).unwrap_or_else(default)
    }

    fn get_parsed<T: FromStr>(&self, section: &str, key: &str) -> Result<Option<T>> {
        match self.get(section, key) {
            Some(raw) => raw.parse().map(Some).map_err(|_| {
                AppError::config(format!("{section}.{key} has an invalid value: {raw:?}"))
            }),
            None => Ok(None),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { path, .. } => write!(f, "file {}", path.display()),
            Self::Env(_) => f.write_str("environment variables"),
        }
    }
}

/// Environment variable name for a `(section, key)` pair.
pub fn env_key(section: &str, key: &str) -> String {
    format!("{section}_{key}").to_ascii_uppercase()
}

/// Root application configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub search: SearchSettings,
    pub serpapi: SerpApiSettings,
    pub email: EmailSettings,
    pub history: HistorySettings,
    pub backup: BackupTarget,
    pub schedule: ScheduleSettings,
    pub logging: LoggingSettings,
}

/// What to search for.
#[derive(Debug, Clone, Default)]
pub struct SearchSettings {
    pub query: String,
}

/// SerpAPI access.
#[derive(Debug, Clone)]
pub struct SerpApiSettings {
    pub api_key: String,

    /// Search endpoint, overridable for testing against a stub server
    pub endpoint: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SerpApiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: defaults::serpapi_endpoint(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// SMTP delivery settings.
#[derive(Debug, Clone, Default)]
pub struct EmailSettings {
    pub sender_email: String,
    pub sender_password: String,
    pub recipient_email: String,
    pub smtp_server: String,
    pub smtp_port: Option<u16>,
}

/// When a novel link is recorded as sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkSeen {
    /// Record before handing the report to the transport (at-most-once)
    #[default]
    BeforeSend,

    /// Record only once the transport accepted the report (at-least-once)
    AfterSend,
}

impl FromStr for MarkSeen {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "before_send" | "at_most_once" => Ok(Self::BeforeSend),
            "after_send" | "at_least_once" => Ok(Self::AfterSend),
            other => Err(AppError::config(format!(
                "history.mark_seen must be before_send or after_send, got {other:?}"
            ))),
        }
    }
}

/// Local history file settings.
#[derive(Debug, Clone)]
pub struct HistorySettings {
    pub path: PathBuf,
    pub mark_seen: MarkSeen,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(defaults::history_path()),
            mark_seen: MarkSeen::default(),
        }
    }
}

/// Remote backup destination for the history file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackupTarget {
    #[default]
    None,

    /// Commit into a git working copy and push
    Git {
        repo_dir: PathBuf,
        remote: String,
        branch: String,
    },

    /// Upload as a single S3 object
    S3 { bucket: String, key: String },
}

/// Weekly trigger settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    pub day: Weekday,
    pub time: NaiveTime,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            day: Weekday::Mon,
            time: defaults::schedule_time(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

impl Settings {
    /// Select a source for `path` and build settings from it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_source(&ConfigSource::select(path))
    }

    /// Build settings from a source.
    ///
    /// Only malformed values fail here. Missing required values are reported
    /// by [`Settings::validate`] so that a run can fail at its first stage.
    pub fn from_source(source: &ConfigSource) -> Result<Self> {
        let search = SearchSettings {
            query: source.get_or("search", "query", String::new),
        };

        let serpapi = SerpApiSettings {
            api_key: source.get_or("serpapi", "api_key", String::new),
            endpoint: source.get_or("serpapi", "endpoint", defaults::serpapi_endpoint),
            timeout_secs: source
                .get_parsed("serpapi", "timeout_secs")?
                .unwrap_or_else(defaults::timeout),
        };

        let email = EmailSettings {
            sender_email: source.get_or("email", "sender_email", String::new),
            sender_password: source.get_or("email", "sender_password", String::new),
            recipient_email: source.get_or("email", "recipient_email", String::new),
            smtp_server: source.get_or("email", "smtp_server", String::new),
            smtp_port: source.get_parsed("email", "smtp_port")?,
        };

        let history = HistorySettings {
            path: PathBuf::from(source.get_or("history", "path", defaults::history_path)),
            mark_seen: source
                .get_parsed("history", "mark_seen")?
                .unwrap_or_default(),
        };

        Ok(Self {
            search,
            serpapi,
            email,
            backup: Self::backup_from_source(source, &history.path)?,
            history,
            schedule: Self::schedule_from_source(source),
            logging: LoggingSettings {
                level: source.get_or("logging", "level", defaults::log_level),
            },
        })
    }

    fn backup_from_source(source: &ConfigSource, history_path: &Path) -> Result<BackupTarget> {
        let kind = source.get_or("backup", "kind", || "none".to_string());
        match kind.to_ascii_lowercase().as_str() {
            "none" => Ok(BackupTarget::None),
            "git" => {
                let repo_dir = source
                    .get("backup", "repo_dir")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| match history_path.parent() {
                        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                        _ => PathBuf::from("."),
                    });
                Ok(BackupTarget::Git {
                    repo_dir,
                    remote: source.get_or("backup", "remote", || "origin".to_string()),
                    branch: source.get_or("backup", "branch", || "main".to_string()),
                })
            }
            "s3" => {
                let bucket = source.get("backup", "bucket").ok_or_else(|| {
                    AppError::config("backup.bucket is required when backup.kind = \"s3\"")
                })?;
                Ok(BackupTarget::S3 {
                    bucket,
                    key: source.get_or("backup", "key", defaults::history_path),
                })
            }
            other => Err(AppError::config(format!(
                "backup.kind must be none, git or s3, got {other:?}"
            ))),
        }
    }

    fn schedule_from_source(source: &ConfigSource) -> ScheduleSettings {
        let fallback = ScheduleSettings::default();

        let day = match source.get("schedule", "day") {
            Some(raw) => raw.parse::<Weekday>().unwrap_or_else(|_| {
                log::warn!("Invalid schedule day: {raw}. Defaulting to Monday.");
                fallback.day
            }),
            None => fallback.day,
        };

        let time = match source.get("schedule", "time") {
            Some(raw) => NaiveTime::parse_from_str(&raw, "%H:%M").unwrap_or_else(|_| {
                log::warn!("Invalid schedule time: {raw}. Defaulting to 07:00.");
                fallback.time
            }),
            None => fallback.time,
        };

        ScheduleSettings { day, time }
    }

    /// Check that every value a run needs is present.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("search.query", &self.search.query),
            ("serpapi.api_key", &self.serpapi.api_key),
            ("email.sender_email", &self.email.sender_email),
            ("email.sender_password", &self.email.sender_password),
            ("email.recipient_email", &self.email.recipient_email),
            ("email.smtp_server", &self.email.smtp_server),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::config(format!("{name} is not configured")));
            }
        }
        if self.email.smtp_port.is_none() {
            return Err(AppError::config("email.smtp_port is not configured"));
        }
        Ok(())
    }
}

mod defaults {
    use chrono::NaiveTime;

    pub fn serpapi_endpoint() -> String {
        "https://serpapi.com/search.json".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn history_path() -> String {
        "sent_links.json".into()
    }
    pub fn schedule_time() -> NaiveTime {
        NaiveTime::from_hms_opt(7, 0, 0).unwrap_or(NaiveTime::MIN)
    }
    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETE: &str = r#"
        [search]
        query = "vacation scheme 2027 law"

        [serpapi]
        api_key = "serp-key"

        [email]
        sender_email = "agent@example.com"
        sender_password = "app-password"
        recipient_email = "me@example.com"
        smtp_server = "smtp.example.com"
        smtp_port = 587
    "#;

    fn file_source(content: &str) -> ConfigSource {
        ConfigSource::File {
            path: PathBuf::from("config.toml"),
            table: toml::from_str(content).unwrap(),
        }
    }

    fn env_source(pairs: &[(&str, &str)]) -> ConfigSource {
        ConfigSource::Env(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_file_source_reads_strings_and_integers() {
        let source = file_source(COMPLETE);
        assert_eq!(
            source.get("search", "query").as_deref(),
            Some("vacation scheme 2027 law")
        );
        assert_eq!(source.get("email", "smtp_port").as_deref(), Some("587"));
        assert!(source.get("email", "missing").is_none());
        assert!(source.get("nosection", "query").is_none());
    }

    #[test]
    fn test_env_source_uses_upper_snake_names() {
        let source = env_source(&[("SERPAPI_API_KEY", "k"), ("SEARCH_QUERY", "  ")]);
        assert_eq!(source.get("serpapi", "api_key").as_deref(), Some("k"));
        assert!(source.get("search", "query").is_none());
    }

    #[test]
    fn test_complete_file_validates() {
        let settings = Settings::from_source(&file_source(COMPLETE)).unwrap();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.email.smtp_port, Some(587));
        assert_eq!(settings.history.path, PathBuf::from("sent_links.json"));
        assert_eq!(settings.history.mark_seen, MarkSeen::BeforeSend);
        assert_eq!(settings.backup, BackupTarget::None);
        assert_eq!(settings.schedule, ScheduleSettings::default());
    }

    #[test]
    fn test_validate_names_first_missing_value() {
        let settings = Settings::from_source(&env_source(&[
            ("SEARCH_QUERY", "vacation scheme"),
            ("SERPAPI_API_KEY", "k"),
        ]))
        .unwrap();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("email.sender_email"));
    }

    #[test]
    fn test_validate_rejects_empty_query() {
        let source = file_source(&COMPLETE.replace("vacation scheme 2027 law", ""));
        let settings = Settings::from_source(&source).unwrap();
        assert!(matches!(settings.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_non_integer_port_is_config_error() {
        let source = file_source(&COMPLETE.replace("smtp_port = 587", "smtp_port = \"tls\""));
        assert!(matches!(
            Settings::from_source(&source),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_mark_seen_parses_both_spellings() {
        assert_eq!("after_send".parse::<MarkSeen>().unwrap(), MarkSeen::AfterSend);
        assert_eq!("AT_MOST_ONCE".parse::<MarkSeen>().unwrap(), MarkSeen::BeforeSend);
        assert!("sometimes".parse::<MarkSeen>().is_err());
    }

    #[test]
    fn test_git_backup_defaults_to_history_directory() {
        let source = file_source(&format!(
            "{COMPLETE}\n[history]\npath = \"state/sent_links.json\"\n[backup]\nkind = \"git\"\n"
        ));
        let settings = Settings::from_source(&source).unwrap();
        assert_eq!(
            settings.backup,
            BackupTarget::Git {
                repo_dir: PathBuf::from("state"),
                remote: "origin".into(),
                branch: "main".into(),
            }
        );
    }

    #[test]
    fn test_s3_backup_requires_bucket() {
        let source = env_source(&[("BACKUP_KIND", "s3")]);
        assert!(Settings::from_source(&source).is_err());

        let source = env_source(&[("BACKUP_KIND", "s3"), ("BACKUP_BUCKET", "agent-state")]);
        let settings = Settings::from_source(&source).unwrap();
        assert_eq!(
            settings.backup,
            BackupTarget::S3 {
                bucket: "agent-state".into(),
                key: "sent_links.json".into(),
            }
        );
    }

    #[test]
    fn test_invalid_schedule_falls_back_to_monday_morning() {
        let source = env_source(&[("SCHEDULE_DAY", "someday"), ("SCHEDULE_TIME", "25:99")]);
        let settings = Settings::from_source(&source).unwrap();
        assert_eq!(settings.schedule, ScheduleSettings::default());

        let source = env_source(&[("SCHEDULE_DAY", "Friday"), ("SCHEDULE_TIME", "18:30")]);
        let settings = Settings::from_source(&source).unwrap();
        assert_eq!(settings.schedule.day, Weekday::Fri);
        assert_eq!(settings.schedule.time, NaiveTime::from_hms_opt(18, 30, 0).unwrap());
    }

    #[test]
    fn test_select_prefers_well_formed_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, COMPLETE).unwrap();
        assert!(matches!(ConfigSource::select(&path), ConfigSource::File { .. }));

        fs::write(&path, "[search\nquery = ").unwrap();
        assert!(matches!(ConfigSource::select(&path), ConfigSource::Env(_)));

        let missing = dir.path().join("absent.toml");
        assert!(matches!(ConfigSource::select(&missing), ConfigSource::Env(_)));
    }
}
