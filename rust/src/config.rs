//! Configuration for the roadmap compiler.

use std::path::PathBuf;
use thiserror::Error;

use crate::library::{EmbeddedSource, FileSource, RuleSource};
use crate::logging::{self, VERBOSITY_CHANGES, VERBOSITY_DEBUG};

pub const ENV_LIBRARY_PATH: &str = "ROADMAP_LIBRARY_PATH";
pub const ENV_VERBOSITY: &str = "ROADMAP_VERBOSITY";
pub const ENV_NARRATIVE: &str = "ROADMAP_NARRATIVE";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be an integer between 0 and {max}, got {value:?}")]
    InvalidVerbosity {
        var: &'static str,
        value: String,
        max: u8,
    },
    #[error("{var} must be a boolean, got {value:?}")]
    InvalidFlag { var: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Rule library JSON on disk; the embedded catalog when unset.
    pub library_path: Option<PathBuf>,
    /// 0 silent, 1 changes, 2 checks, 3 debug
    pub verbosity: u8,
    /// Delegate data-gap narratives to a configured generator.
    pub narrative_enabled: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            verbosity: VERBOSITY_CHANGES,
            narrative_enabled: true,
        }
    }
}

impl CompilerConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let library_path = lookup(ENV_LIBRARY_PATH)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .or(defaults.library_path);

        let verbosity = match lookup(ENV_VERBOSITY) {
            Some(raw) => match raw.trim().parse::<u8>() {
                Ok(v) if v <= VERBOSITY_DEBUG => v,
                _ => {
                    return Err(ConfigError::InvalidVerbosity {
                        var: ENV_VERBOSITY,
                        value: raw,
                        max: VERBOSITY_DEBUG,
                    })
                }
            },
            None => defaults.verbosity,
        };

        let narrative_enabled = match lookup(ENV_NARRATIVE) {
            Some(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidFlag {
                var: ENV_NARRATIVE,
                value: raw,
            })?,
            None => defaults.narrative_enabled,
        };

        Ok(Self {
            library_path,
            verbosity,
            narrative_enabled,
        })
    }

    /// `EnvFilter` directive for the configured verbosity.
    pub fn log_filter(&self) -> &'static str {
        logging::filter_directive(self.verbosity)
    }

    /// Install the stderr subscriber at the configured verbosity. Returns
    /// false if one was already installed.
    pub fn init_logging(&self) -> bool {
        logging::init_logging(self.verbosity)
    }

    pub fn rule_source(&self) -> Box<dyn RuleSource> {
        match &self.library_path {
            Some(path) => Box::new(FileSource::new(path.clone())),
            None => Box::new(EmbeddedSource),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
