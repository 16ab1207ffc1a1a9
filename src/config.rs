use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is malformed: {source}")]
    Malformed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Settings of the command line tool. Later sources override earlier ones:
/// the defaults, then the settings file, then the `DATABASE_URL` and
/// `RUST_LOG` environment variables, then command line flags.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub database_url: String,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: "tally.sqlite3".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn load(
        file: Option<&Path>,
        database_url: Option<String>,
    ) -> Result<Self, SettingsError> {
        Self::load_with_env(file, database_url, |key| std::env::var(key).ok())
    }

    pub fn load_with_env(
        file: Option<&Path>,
        database_url: Option<String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        let mut settings = match file {
            Some(path) => {
                let contents = std::fs::read_to_string(path).map_err(|source| {
                    SettingsError::Read {
                        path: path.display().to_string(),
                        source,
                    }
                })?;
                toml::from_str::<Settings>(&contents).map_err(|source| {
                    SettingsError::Malformed {
                        path: path.display().to_string(),
                        source,
                    }
                })?
            }
            None => Settings::default(),
        };

        if let Some(url) = env("DATABASE_URL") {
            settings.database_url = url;
        }
        if let Some(filter) = env("RUST_LOG") {
            settings.log_filter = filter;
        }
        if let Some(url) = database_url {
            settings.database_url = url;
        }

        Ok(settings)
    }

    /// Installs the global tracing subscriber. Logs go to stderr so that
    /// command output on stdout stays machine-readable.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_new(&self.log_filter).unwrap_or_else(|e| {
            eprintln!("ignoring log filter {:?}: {e}", self.log_filter);
            EnvFilter::new("info")
        });

        #[allow(unexpected_cfgs)]
        let filter = if cfg!(fuzzing) { EnvFilter::new("off") } else { filter };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
