use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::fetch::FetchSettings;

/// Produces the `processed_at` stamp for results.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

pub const DEFAULT_WORKER_COUNT: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fetch: FetchSettings,
    pub worker_count: usize,
    /// Encoding forced onto fetched pages and `.txt` files, ahead of any
    /// header, meta tag or detection.
    pub declared_encoding: Option<String>,
    /// Try well-known content selectors when scoring finds nothing.
    pub selector_fallback: bool,
    /// Apply kind-specific cleanup to batch results.
    pub post_process: bool,
    #[serde(skip, default = "system_clock")]
    pub clock: Clock,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchSettings::default(),
            worker_count: DEFAULT_WORKER_COUNT,
            declared_encoding: None,
            selector_fallback: false,
            post_process: false,
            clock: system_clock(),
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("fetch", &self.fetch)
            .field("worker_count", &self.worker_count)
            .field("declared_encoding", &self.declared_encoding)
            .field("selector_fallback", &self.selector_fallback)
            .field("post_process", &self.post_process)
            .finish_non_exhaustive()
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: EngineConfig = ron::from_str(text)?;
        config.worker_count = config.worker_count.max(1);
        Ok(config)
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> String {
        (self.clock)()
    }
}

/// Current UTC time, RFC 3339.
pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().to_rfc3339())
}

/// Always returns `stamp`. Useful for reproducible output.
pub fn fixed_clock(stamp: impl Into<String>) -> Clock {
    let stamp = stamp.into();
    Arc::new(move || stamp.clone())
}
