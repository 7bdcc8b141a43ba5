//! Configuration file parser for ~/.config/feedbell/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`,
//! which polls nothing. Unknown keys are silently ignored by serde, though we
//! log a warning when the file contains potential typos.
//!
//! [`Config`] is the raw file contents; [`Settings::from_config`] validates it
//! into the form the service runs with. An interval string that does not
//! parse is a fatal error: the poller never starts.
use crate::feed::DEFAULT_USER_AGENT;
use crate::notify::IrcSettings;
use crate::util::{parse_duration, DurationError};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Environment variable that overrides `irc.password` from the file.
pub const IRC_PASSWORD_ENV: &str = "FEEDBELL_IRC_PASSWORD";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid poll interval {value:?}: {source}")]
    InvalidInterval {
        value: String,
        #[source]
        source: DurationError,
    },

    #[error("Poll interval must be greater than zero")]
    ZeroInterval,

    #[error("Invalid feed URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Queue capacity must be at least 1")]
    ZeroQueueCapacity,

    #[error("Fetch timeout must be greater than zero")]
    ZeroFetchTimeout,

    #[error("IRC server address is missing")]
    MissingIrcServer,
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration file.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed addresses to poll.
    pub urls: Vec<String>,

    /// Time between polling rounds, e.g. "0h15m" or "90s".
    pub interval: String,

    /// Capacity of the queue between the poller and the delivery sink.
    pub queue_capacity: usize,

    /// Per-request HTTP timeout in seconds. Unset = transport defaults.
    pub fetch_timeout_secs: Option<u64>,

    /// User-Agent header sent with feed requests.
    pub user_agent: String,

    /// Chat server to announce entries on. Unset = stdout only.
    pub irc: Option<IrcConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            interval: "0h15m".to_string(),
            queue_capacity: 64,
            fetch_timeout_secs: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            irc: None,
        }
    }
}

/// `[irc]` table.
///
/// Custom Debug impl masks `password` to prevent secret leakage in logs.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct IrcConfig {
    /// `host:port` of the IRC server.
    pub server: String,
    pub nick: String,
    /// Defaults to the nick.
    pub user: Option<String>,
    pub realname: String,
    /// Server password; the FEEDBELL_IRC_PASSWORD env var takes precedence.
    pub password: Option<String>,
    pub channels: Vec<String>,
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            nick: "feedbell".to_string(),
            user: None,
            realname: "feedbell".to_string(),
            password: None,
            channels: Vec::new(),
        }
    }
}

impl std::fmt::Debug for IrcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrcConfig")
            .field("server", &self.server)
            .field("nick", &self.nick)
            .field("user", &self.user)
            .field("realname", &self.realname)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("channels", &self.channels)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to avoid loading something huge
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let config = Self::parse(&content)?;
        tracing::info!(
            path = %path.display(),
            feeds = config.urls.len(),
            interval = %config.interval,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "urls",
                "interval",
                "queue_capacity",
                "fetch_timeout_secs",
                "user_agent",
                "irc",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        Ok(toml::from_str(content)?)
    }
}

// ============================================================================
// Validated Settings
// ============================================================================

/// Validated runtime configuration.
#[derive(Debug)]
pub struct Settings {
    /// Normalized, de-duplicated feed URLs in file order.
    pub feeds: Vec<String>,
    pub interval: Duration,
    pub queue_capacity: usize,
    pub fetch_timeout: Option<Duration>,
    pub user_agent: String,
    pub irc: Option<IrcSettings>,
}

impl Settings {
    /// Validates `config`, reading the IRC password override from the
    /// environment.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        Self::resolve(config, std::env::var(IRC_PASSWORD_ENV).ok())
    }

    fn resolve(config: Config, env_password: Option<String>) -> Result<Self, ConfigError> {
        let interval =
            parse_duration(&config.interval).map_err(|source| ConfigError::InvalidInterval {
                value: config.interval.clone(),
                source,
            })?;
        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }

        if config.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }

        if config.fetch_timeout_secs == Some(0) {
            return Err(ConfigError::ZeroFetchTimeout);
        }

        let mut feeds: Vec<String> = Vec::with_capacity(config.urls.len());
        for raw in &config.urls {
            let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl {
                url: raw.clone(),
                source,
            })?;
            let url = url.to_string();
            if feeds.contains(&url) {
                tracing::warn!(feed = %url, "Duplicate feed URL in config, ignoring");
                continue;
            }
            feeds.push(url);
        }

        let irc = config
            .irc
            .map(|irc| {
                if irc.server.trim().is_empty() {
                    return Err(ConfigError::MissingIrcServer);
                }
                if irc.channels.is_empty() {
                    tracing::warn!("No IRC channels configured, notices will be dropped");
                }
                let password = env_password.or(irc.password).map(SecretString::from);
                Ok(IrcSettings {
                    user: irc.user.unwrap_or_else(|| irc.nick.clone()),
                    server: irc.server,
                    nick: irc.nick,
                    realname: irc.realname,
                    password,
                    channels: irc.channels,
                })
            })
            .transpose()?;

        Ok(Self {
            feeds,
            interval,
            queue_capacity: config.queue_capacity,
            fetch_timeout: config.fetch_timeout_secs.map(Duration::from_secs),
            user_agent: config.user_agent,
            irc,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("feedbell_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.urls.is_empty());
        assert_eq!(config.interval, "0h15m");
        assert_eq!(config.queue_capacity, 64);
        assert!(config.fetch_timeout_secs.is_none());
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert!(config.irc.is_none());
    }

    #[test]
    fn test_default_interval_is_fifteen_minutes() {
        let settings = Settings::resolve(Config::default(), None).unwrap();
        assert_eq!(settings.interval, crate::poll::DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/feedbell_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.interval, "0h15m");
    }

    #[test]
    fn test_empty_file_returns_default() {
        let path = write_config("empty", "");
        let config = Config::load(&path).unwrap();
        assert!(config.urls.is_empty());
        cleanup(&path);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let path = write_config("whitespace", "   \n  \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.interval, "0h15m");
        cleanup(&path);
    }

    #[test]
    fn test_full_config() {
        let content = r##"
urls = ["https://example.com/feed.xml", "https://blog.example.org/atom"]
interval = "1h30m"
queue_capacity = 16
fetch_timeout_secs = 20
user_agent = "custom/1.0"

[irc]
server = "irc.example.net:6667"
nick = "newsbot"
realname = "News Bot"
password = "from-file"
channels = ["#news", "#dev"]
"##;
        let path = write_config("full", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.urls.len(), 2);
        assert_eq!(config.interval, "1h30m");
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.fetch_timeout_secs, Some(20));
        assert_eq!(config.user_agent, "custom/1.0");
        let irc = config.irc.as_ref().unwrap();
        assert_eq!(irc.server, "irc.example.net:6667");
        assert_eq!(irc.nick, "newsbot");
        assert_eq!(irc.channels, vec!["#news", "#dev"]);

        let settings = Settings::resolve(config, None).unwrap();
        assert_eq!(settings.interval, Duration::from_secs(90 * 60));
        assert_eq!(settings.fetch_timeout, Some(Duration::from_secs(20)));
        let irc = settings.irc.unwrap();
        assert_eq!(irc.user, "newsbot");
        assert_eq!(irc.realname, "News Bot");
        assert_eq!(
            irc.password.as_ref().map(|p| p.expose_secret().to_string()),
            Some("from-file".to_string())
        );

        cleanup(&path);
    }

    #[test]
    fn test_env_password_takes_precedence() {
        let config = Config::parse(
            "[irc]\nserver = \"irc.example.net:6667\"\npassword = \"from-file\"\n",
        )
        .unwrap();
        let settings = Settings::resolve(config, Some("from-env".to_string())).unwrap();
        let irc = settings.irc.unwrap();
        assert_eq!(
            irc.password.as_ref().map(|p| p.expose_secret().to_string()),
            Some("from-env".to_string())
        );
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let path = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        cleanup(&path);
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let config = Config::parse("interval = \"5m\"\ntotally_fake_key = 1\n").unwrap();
        assert_eq!(config.interval, "5m");
    }

    #[test]
    fn test_wrong_type_returns_error() {
        assert!(Config::parse("urls = \"not-a-list\"\n").is_err());
    }

    #[test]
    fn test_too_large_file_rejected() {
        let path = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
        cleanup(&path);
    }

    #[test]
    fn test_invalid_interval_is_fatal() {
        let config = Config::parse("interval = \"fifteen minutes\"\n").unwrap();
        let err = Settings::resolve(config, None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInterval { .. }));
        assert!(err.to_string().contains("fifteen minutes"));
    }

    #[test]
    fn test_interval_without_unit_is_fatal() {
        let config = Config::parse("interval = \"15\"\n").unwrap();
        assert!(matches!(
            Settings::resolve(config, None),
            Err(ConfigError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = Config::parse("interval = \"0s\"\n").unwrap();
        assert!(matches!(
            Settings::resolve(config, None),
            Err(ConfigError::ZeroInterval)
        ));
    }

    #[test]
    fn test_zero_queue_capacity_rejected() {
        let config = Config::parse("queue_capacity = 0\n").unwrap();
        assert!(matches!(
            Settings::resolve(config, None),
            Err(ConfigError::ZeroQueueCapacity)
        ));
    }

    #[test]
    fn test_zero_fetch_timeout_rejected() {
        let config = Config::parse("fetch_timeout_secs = 0\n").unwrap();
        let err = Settings::resolve(config, None).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroFetchTimeout));
        assert!(err.to_string().contains("Fetch timeout"));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = Config::parse("urls = [\"not a url\"]\n").unwrap();
        let err = Settings::resolve(config, None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
        assert!(err.to_string().contains("not a url"));
    }

    #[test]
    fn test_duplicate_urls_collapsed_in_order() {
        let config = Config::parse(
            r#"urls = ["https://b.example/rss", "https://a.example/rss", "https://b.example/rss"]"#,
        )
        .unwrap();
        let settings = Settings::resolve(config, None).unwrap();
        assert_eq!(
            settings.feeds,
            vec!["https://b.example/rss", "https://a.example/rss"]
        );
    }

    #[test]
    fn test_missing_irc_server_rejected() {
        let config = Config::parse("[irc]\nchannels = [\"#news\"]\n").unwrap();
        assert!(matches!(
            Settings::resolve(config, None),
            Err(ConfigError::MissingIrcServer)
        ));
    }

    #[test]
    fn test_debug_masks_password() {
        let config = Config::parse(
            "[irc]\nserver = \"irc.example.net:6667\"\npassword = \"super-secret-12345\"\n",
        )
        .unwrap();
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-12345"));
        assert!(debug_output.contains("[REDACTED]"));

        let settings = Settings::resolve(config, None).unwrap();
        let debug_output = format!("{:?}", settings);
        assert!(!debug_output.contains("super-secret-12345"));
    }
}
