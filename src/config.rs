use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::error::{ObservatoryError, Result};
use crate::metrics::Sample;

/// Hook invoked after each sample is stored, e.g. for forwarding elsewhere.
pub type RecordHook = Arc<dyn Fn(&Sample) + Send + Sync>;

// ─── Defaults ────────────────────────────────────────────────────

pub const DEFAULT_RETENTION_MS: u64 = 3_600_000;
pub const DEFAULT_MAX_PER_ENDPOINT: usize = 10_000;
pub const DEFAULT_PERCENTILES: [f64; 3] = [50.0, 95.0, 99.0];
pub const DEFAULT_MOUNT_PATH: &str = "/_observatory";
pub const DEFAULT_EVICTION_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Observatory configuration.
///
/// Build it with the setters or read it from `OBSERVATORY_*` environment
/// variables:
///
/// ```ignore
/// let config = ObservatoryConfig::new()
///     .retention_ms(60_000)
///     .percentiles(vec![50.0, 90.0, 99.9])
///     .capture_schemas(true)
///     .exclude_path("/health");
/// ```
#[derive(Clone)]
pub struct ObservatoryConfig {
    /// Trailing window that counts toward aggregation (ms).
    pub retention_ms: u64,
    /// Ring buffer capacity per endpoint.
    pub max_per_endpoint: usize,
    /// Percentiles reported for every endpoint.
    pub percentiles: Vec<f64>,
    /// Infer request/response JSON schemas.
    pub capture_schemas: bool,
    /// Where the dashboard routes are nested.
    pub mount_path: String,
    /// Only track these route patterns (glob). Empty = all.
    pub include_paths: Vec<String>,
    /// Skip these route patterns (glob). `None` = the mount path and everything under it.
    pub exclude_paths: Option<Vec<String>>,
    /// Extra exclusions added on top of `exclude_paths` or the mount defaults.
    pub extra_exclude_paths: Vec<String>,
    /// How often fully idle endpoints are evicted.
    pub eviction_interval: Duration,
    /// Bodies larger than this are not buffered for schema capture.
    pub max_body_bytes: usize,
    pub on_record: Option<RecordHook>,
}

impl Default for ObservatoryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObservatoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservatoryConfig")
            .field("retention_ms", &self.retention_ms)
            .field("max_per_endpoint", &self.max_per_endpoint)
            .field("percentiles", &self.percentiles)
            .field("capture_schemas", &self.capture_schemas)
            .field("mount_path", &self.mount_path)
            .field("include_paths", &self.include_paths)
            .field("exclude_paths", &self.resolved_exclude_paths())
            .field("eviction_interval", &self.eviction_interval)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("on_record", &self.on_record.is_some())
            .finish()
    }
}

impl ObservatoryConfig {
    pub fn new() -> Self {
        Self {
            retention_ms: DEFAULT_RETENTION_MS,
            max_per_endpoint: DEFAULT_MAX_PER_ENDPOINT,
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            capture_schemas: false,
            mount_path: DEFAULT_MOUNT_PATH.to_string(),
            include_paths: Vec::new(),
            exclude_paths: None,
            extra_exclude_paths: Vec::new(),
            eviction_interval: DEFAULT_EVICTION_INTERVAL,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            on_record: None,
        }
    }

    /// Defaults overridden by whatever `OBSERVATORY_*` variables are set.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Same as [`from_env`](Self::from_env) over an explicit set of variables.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env: EnvOverrides = envy::prefixed(ENV_PREFIX).from_iter(vars)?;
        let config = env.apply(Self::new());
        config.validate()?;
        Ok(config)
    }

    // ── Builder setters ─────────────────────────────────────────

    pub fn retention_ms(mut self, ms: u64) -> Self {
        self.retention_ms = ms;
        self
    }

    pub fn max_per_endpoint(mut self, capacity: usize) -> Self {
        self.max_per_endpoint = capacity;
        self
    }

    pub fn percentiles(mut self, percentiles: Vec<f64>) -> Self {
        self.percentiles = percentiles;
        self
    }

    pub fn capture_schemas(mut self, enabled: bool) -> Self {
        self.capture_schemas = enabled;
        self
    }

    /// Trailing slashes are dropped, so `"/ops/"` mounts at `"/ops"`.
    pub fn mount_path(mut self, path: impl Into<String>) -> Self {
        self.mount_path = trim_mount(&path.into());
        self
    }

    pub fn include_path(mut self, pattern: impl Into<String>) -> Self {
        self.include_paths.push(pattern.into());
        self
    }

    /// Adds an exclusion on top of the mount-path defaults.
    pub fn exclude_path(mut self, pattern: impl Into<String>) -> Self {
        self.extra_exclude_paths.push(pattern.into());
        self
    }

    /// Replaces the mount-path defaults. Extras from `exclude_path` still apply.
    pub fn exclude_paths(mut self, patterns: Vec<String>) -> Self {
        self.exclude_paths = Some(patterns);
        self
    }

    pub fn eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = interval;
        self
    }

    pub fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    pub fn on_record<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Sample) + Send + Sync + 'static,
    {
        self.on_record = Some(Arc::new(hook));
        self
    }

    // ── Derived values ──────────────────────────────────────────

    /// Explicit exclusions, or `[{mount}/**, {mount}]` when none were set,
    /// followed by the extras.
    pub fn resolved_exclude_paths(&self) -> Vec<String> {
        let mut paths = match &self.exclude_paths {
            Some(paths) => paths.clone(),
            None => vec![format!("{}/**", self.mount_path), self.mount_path.clone()],
        };
        paths.extend(self.extra_exclude_paths.iter().cloned());
        paths
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_per_endpoint < 1 {
            return Err(ObservatoryError::InvalidCapacity(self.max_per_endpoint));
        }
        if !self.mount_path.starts_with('/') || self.mount_path.len() < 2 {
            return Err(ObservatoryError::InvalidMountPath(self.mount_path.clone()));
        }
        if let Some(&bad) = self
            .percentiles
            .iter()
            .find(|p| !p.is_finite() || **p < 0.0 || **p > 100.0)
        {
            return Err(ObservatoryError::InvalidPercentile(bad));
        }
        Ok(())
    }
}

fn trim_mount(path: &str) -> String {
    path.trim().trim_end_matches('/').to_string()
}

// ─── Environment ─────────────────────────────────────────────────

const ENV_PREFIX: &str = "OBSERVATORY_";

/// `OBSERVATORY_*` variables; anything unset keeps the builder default.
/// Lists are comma separated.
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    retention_ms: Option<u64>,
    max_per_endpoint: Option<usize>,
    percentiles: Option<Vec<f64>>,
    #[serde(default, deserialize_with = "flag")]
    capture_schemas: Option<bool>,
    mount_path: Option<String>,
    include_paths: Option<Vec<String>>,
    exclude_paths: Option<Vec<String>>,
    #[serde(default, deserialize_with = "millis")]
    eviction_interval_ms: Option<Duration>,
    max_body_bytes: Option<usize>,
}

impl EnvOverrides {
    fn apply(self, mut config: ObservatoryConfig) -> ObservatoryConfig {
        if let Some(ms) = self.retention_ms {
            config.retention_ms = ms;
        }
        if let Some(capacity) = self.max_per_endpoint {
            config.max_per_endpoint = capacity;
        }
        if let Some(percentiles) = self.percentiles {
            config.percentiles = percentiles;
        }
        if let Some(enabled) = self.capture_schemas {
            config.capture_schemas = enabled;
        }
        if let Some(path) = self.mount_path {
            config.mount_path = trim_mount(&path);
        }
        if let Some(paths) = self.include_paths {
            config.include_paths = non_empty(paths);
        }
        if let Some(paths) = self.exclude_paths {
            config.exclude_paths = Some(non_empty(paths));
        }
        if let Some(interval) = self.eviction_interval_ms {
            config.eviction_interval = interval;
        }
        if let Some(bytes) = self.max_body_bytes {
            config.max_body_bytes = bytes;
        }
        config
    }
}

fn non_empty(patterns: Vec<String>) -> Vec<String> {
    patterns
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// `1/true/yes/on` and `0/false/no/off`, any case.
fn flag<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" | "" => Ok(Some(false)),
        _ => Err(de::Error::custom(format!("invalid flag {raw:?}"))),
    }
}

fn millis<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}
