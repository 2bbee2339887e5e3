//! Service configuration loaded from the environment.

use std::env;

use serde::{Deserialize, Serialize};

/// Runtime configuration of the optimization service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Socket address the HTTP API binds to.
    pub bind_addr: String,
    /// Buffered progress events per tournament before slow subscribers lag.
    pub progress_buffer: usize,
    /// Stack size of each optimization worker thread in bytes.
    pub worker_stack_size: usize,
    /// Optional JSON file with named settings presets.
    pub settings_file: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            progress_buffer: 256,
            worker_stack_size: 8 * 1024 * 1024,
            settings_file: None,
        }
    }
}

impl ServiceConfig {
    /// Builder-style bind address override.
    #[must_use]
    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Builder-style progress buffer override.
    #[must_use]
    pub const fn with_progress_buffer(mut self, capacity: usize) -> Self {
        self.progress_buffer = capacity;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.bind_addr.trim().is_empty() {
            return Err("bind_addr must not be empty".into());
        }
        if self.progress_buffer == 0 {
            return Err("progress_buffer must be greater than 0".into());
        }
        if self.worker_stack_size < 64 * 1024 {
            return Err("worker_stack_size must be at least 64 KiB".into());
        }
        Ok(())
    }

    /// Load configuration from `REGATTA_*` environment variables (after
    /// reading a `.env` file when present), falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns a message when a variable cannot be parsed or validation fails.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let cfg = Self {
            bind_addr: env::var("REGATTA_BIND_ADDR").unwrap_or(defaults.bind_addr),
            progress_buffer: parse_var("REGATTA_PROGRESS_BUFFER", defaults.progress_buffer)?,
            worker_stack_size: parse_var("REGATTA_WORKER_STACK_SIZE", defaults.worker_stack_size)?,
            settings_file: env::var("REGATTA_SETTINGS_FILE").ok(),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var(name: &str, default: usize) -> Result<usize, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("{name} is not a valid number: {e}")),
        Err(_) => Ok(default),
    }
}
