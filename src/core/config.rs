/*!
 * Kernel Configuration
 *
 * Defaults come from `core::limits`. A JSON file named by `KERNEL_CONFIG`
 * is applied first, then individual environment variables:
 *
 * - `KERNEL_PHYS_PAGES`
 * - `KERNEL_STACK_PAGES`
 * - `KERNEL_MAX_PROCESSES`
 * - `KERNEL_IMAGE_DIR`
 * - `KERNEL_CONSOLE_ECHO` (`1`/`true`)
 */

use super::limits::{DEFAULT_MAX_PROCESSES, DEFAULT_PHYS_PAGES, DEFAULT_STACK_PAGES};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    #[diagnostic(code(config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    #[diagnostic(code(config::parse), help("The config file must be a JSON object."))]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: {value:?}")]
    #[diagnostic(code(config::invalid_value))]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct KernelConfig {
    /// Size of the physical frame pool in pages
    pub phys_pages: usize,
    pub stack_pages: usize,
    /// Cap on live process records
    pub max_processes: usize,
    /// Host directory searched for executable images
    pub image_dir: Option<PathBuf>,
    /// Mirror console output to the host stdout
    pub console_echo: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            phys_pages: DEFAULT_PHYS_PAGES,
            stack_pages: DEFAULT_STACK_PAGES,
            max_processes: DEFAULT_MAX_PROCESSES,
            image_dir: None,
            console_echo: false,
        }
    }
}

impl KernelConfig {
    #[must_use]
    pub fn with_phys_pages(mut self, pages: usize) -> Self {
        self.phys_pages = pages;
        self
    }

    #[must_use]
    pub fn with_stack_pages(mut self, pages: usize) -> Self {
        self.stack_pages = pages;
        self
    }

    #[must_use]
    pub fn with_max_processes(mut self, max: usize) -> Self {
        self.max_processes = max;
        self
    }

    #[must_use]
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_console_echo(mut self, echo: bool) -> Self {
        self.console_echo = echo;
        self
    }

    /// Load from `KERNEL_CONFIG` (if set) and environment overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, but starting from `base` when no file is named
    pub fn from_env_over(base: Self) -> Result<Self, ConfigError> {
        Self::from_lookup_over(base, |key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup_over(Self::default(), lookup)
    }

    pub fn from_lookup_over<F>(base: Self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("KERNEL_CONFIG") {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => base,
        };

        if let Some(v) = lookup("KERNEL_PHYS_PAGES") {
            config.phys_pages = parse_positive("KERNEL_PHYS_PAGES", v)?;
        }
        if let Some(v) = lookup("KERNEL_STACK_PAGES") {
            config.stack_pages = parse_positive("KERNEL_STACK_PAGES", v)?;
        }
        if let Some(v) = lookup("KERNEL_MAX_PROCESSES") {
            config.max_processes = parse_positive("KERNEL_MAX_PROCESSES", v)?;
        }
        if let Some(v) = lookup("KERNEL_IMAGE_DIR") {
            config.image_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("KERNEL_CONSOLE_ECHO") {
            config.console_echo = v == "1" || v.eq_ignore_ascii_case("true");
        }

        Ok(config)
    }

    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path, source })
    }
}

fn parse_positive<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(ConfigError::InvalidValue { key, value }),
    }
}
