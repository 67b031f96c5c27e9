use std::time::Duration;
use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub storage: StorageConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twilio: Option<TwilioConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pause after a check cycle is enqueued before the next one starts
    pub check_interval_seconds: u64,
    /// Pause after a log rotation pass before the next one starts
    pub rotation_interval_seconds: u64,
    /// Upper bound on probes running at the same time
    pub max_concurrent_probes: usize,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: path::PathBuf,
    pub logs_dir: path::PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwilioConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub from_phone: String,
    #[serde(default = "default_twilio_api_base")]
    pub api_base: String,
}

fn default_twilio_api_base() -> String {
    "https://api.twilio.com".into()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: 60,
            rotation_interval_seconds: 24 * 60 * 60,
            max_concurrent_probes: 32,
            user_agent: concat!("uptime-service/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: ".data".into(), logs_dir: ".logs".into() }
    }
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_phone: String::new(),
            api_base: default_twilio_api_base(),
        }
    }
}

impl EngineConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds.max(1))
    }

    pub fn rotation_interval(&self) -> Duration {
        Duration::from_secs(self.rotation_interval_seconds.max(1))
    }
}

impl TwilioConfig {
    /// Whether every credential needed to send a message is present
    pub fn is_complete(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_phone.is_empty()
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/uptime/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("uptime/config.toml"))
}

fn mask(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "********" }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Engine")?;
        write_1(f, "Check Interval (s)", &self.engine.check_interval_seconds)?;
        write_1(f, "Rotation Interval (s)", &self.engine.rotation_interval_seconds)?;
        write_1(f, "Max Concurrent Probes", &self.engine.max_concurrent_probes)?;
        write_1(f, "User Agent", &self.engine.user_agent)?;
        write_title_1(f, "Storage")?;
        write_1(f, "Data Directory", &self.storage.data_dir.display())?;
        write_1(f, "Logs Directory", &self.storage.logs_dir.display())?;
        write_title_1(f, "Twilio")?;
        match &self.twilio {
            Some(twilio) => {
                write_1(f, "Account SID", &twilio.account_sid)?;
                write_1(f, "Auth Token", &mask(&twilio.auth_token))?;
                write_1(f, "From", &twilio.from_phone)?;
                write_1(f, "API Base", &twilio.api_base)?;
            }
            None => write_1(f, "Status", &"not configured, alerts go to the log")?,
        }

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/uptime/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```rust,ignore
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(ConfigError::ReadFailed)?;
            toml::from_str(raw_string.as_str()).map_err(|err| ConfigError::ParseFailed(err.to_string()))
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let config_str: String =
            toml::to_string_pretty(self).map_err(|err| ConfigError::ParseFailed(err.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::WriteFailed)?;
        }

        std::fs::write(path, config_str).map_err(ConfigError::WriteFailed)
    }

    /// Let `TWILIO_*` environment variables fill in or replace credentials
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| env::var(name).ok().filter(|value| !value.is_empty()));
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let sid = lookup("TWILIO_ACCOUNT_SID");
        let token = lookup("TWILIO_AUTH_TOKEN");
        let from = lookup("TWILIO_FROM_PHONE");

        if self.twilio.is_none() && sid.is_none() && token.is_none() && from.is_none() {
            return;
        }

        let twilio = self.twilio.get_or_insert_with(TwilioConfig::default);
        if let Some(sid) = sid {
            twilio.account_sid = sid;
        }
        if let Some(token) = token {
            twilio.auth_token = token;
        }
        if let Some(from) = from {
            twilio.from_phone = from;
        }
    }
}
