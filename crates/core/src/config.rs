//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the record client.
//! Core code never reads process-wide environment variables itself; binaries collect the raw
//! values into [`StoreEnv`] and hand them over.

use crate::constants::DEFAULT_TIMEOUT_SECS;
use crate::error::{RecordError, RecordResult};
use crate::store::{HttpRecordStore, InMemoryRecordStore, RecordStore};
use std::sync::Arc;
use std::time::Duration;

/// Connection settings for the hosted record store.
#[derive(Clone, Debug)]
pub struct RemoteStoreConfig {
    base_url: String,
    project_id: String,
    public_key: String,
    timeout: Duration,
}

impl RemoteStoreConfig {
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        public_key: impl Into<String>,
        timeout: Duration,
    ) -> RecordResult<Self> {
        let base_url = base_url.into().trim().to_owned();
        let project_id = project_id.into().trim().to_owned();
        let public_key = public_key.into().trim().to_owned();

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(RecordError::InvalidInput(format!(
                "store base URL must start with http:// or https://, got '{base_url}'"
            )));
        }
        if project_id.is_empty() {
            return Err(RecordError::InvalidInput(
                "store project id cannot be empty".into(),
            ));
        }
        if public_key.is_empty() {
            return Err(RecordError::InvalidInput(
                "store public key cannot be empty".into(),
            ));
        }
        if timeout.is_zero() {
            return Err(RecordError::InvalidInput(
                "store timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            base_url,
            project_id,
            public_key,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Which record store backs the repositories.
#[derive(Clone, Debug)]
pub enum StoreConfig {
    Remote(RemoteStoreConfig),
    /// Process-local tables; contents are lost on exit.
    InMemory,
}

/// Raw, unvalidated configuration values as read from the environment.
#[derive(Clone, Debug, Default)]
pub struct StoreEnv {
    /// `WARD_STORE`: `remote` (default) or `memory`.
    pub mode: Option<String>,
    /// `APPER_BASE_URL`
    pub base_url: Option<String>,
    /// `APPER_PROJECT_ID`
    pub project_id: Option<String>,
    /// `APPER_PUBLIC_KEY`
    pub public_key: Option<String>,
    /// `APPER_TIMEOUT_SECS`
    pub timeout_secs: Option<String>,
}

impl StoreEnv {
    /// Collect the raw values from the process environment.
    ///
    /// Intended for binaries at startup only.
    pub fn from_process_env() -> Self {
        let var = |name: &str| std::env::var(name).ok();
        Self {
            mode: var("WARD_STORE"),
            base_url: var("APPER_BASE_URL"),
            project_id: var("APPER_PROJECT_ID"),
            public_key: var("APPER_PUBLIC_KEY"),
            timeout_secs: var("APPER_TIMEOUT_SECS"),
        }
    }
}

impl StoreConfig {
    /// Validate raw values into a store configuration.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidInput` if the mode is unknown, a remote setting is
    /// missing, or the timeout does not parse.
    pub fn from_env(env: StoreEnv) -> RecordResult<Self> {
        let mode = non_blank(env.mode).unwrap_or_else(|| "remote".into());

        match mode.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreConfig::InMemory),
            "remote" => {
                let require = |value: Option<String>, name: &str| {
                    non_blank(value).ok_or_else(|| {
                        RecordError::InvalidInput(format!("{name} must be set for the remote store"))
                    })
                };
                let base_url = require(env.base_url, "APPER_BASE_URL")?;
                let project_id = require(env.project_id, "APPER_PROJECT_ID")?;
                let public_key = require(env.public_key, "APPER_PUBLIC_KEY")?;
                let timeout = timeout_from_env_value(env.timeout_secs)?;

                Ok(StoreConfig::Remote(RemoteStoreConfig::new(
                    base_url, project_id, public_key, timeout,
                )?))
            }
            other => Err(RecordError::InvalidInput(format!(
                "WARD_STORE must be 'remote' or 'memory', got '{other}'"
            ))),
        }
    }

    /// Build the configured store.
    pub fn open(&self) -> RecordResult<Arc<dyn RecordStore>> {
        match self {
            StoreConfig::Remote(cfg) => {
                tracing::info!(base_url = cfg.base_url(), "using remote record store");
                Ok(Arc::new(HttpRecordStore::new(cfg)?))
            }
            StoreConfig::InMemory => {
                tracing::warn!("using in-memory record store; data is not persisted");
                Ok(Arc::new(InMemoryRecordStore::new()))
            }
        }
    }
}

/// Parse the request timeout from an optional string of whole seconds.
///
/// If `value` is `None` or empty/whitespace, returns the default timeout.
pub fn timeout_from_env_value(value: Option<String>) -> RecordResult<Duration> {
    let Some(raw) = non_blank(value) else {
        return Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    };
    let secs = raw.parse::<u64>().map_err(|_| {
        RecordError::InvalidInput(format!(
            "APPER_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'"
        ))
    })?;
    Ok(Duration::from_secs(secs))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
