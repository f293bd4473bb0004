use thiserror::Error;

/// Errors raised while building the observatory.
///
/// Only configuration problems are fatal. Everything on the request path
/// (malformed bodies, unknown endpoints) degrades to a no-op or `None`.
#[derive(Debug, Error)]
pub enum ObservatoryError {
    #[error("ring buffer capacity must be >= 1, got {0}")]
    InvalidCapacity(usize),

    #[error("percentile must be a finite number in [0, 100], got {0}")]
    InvalidPercentile(f64),

    #[error("mount path must start with '/' and not be the root, got {0:?}")]
    InvalidMountPath(String),

    #[error("invalid OBSERVATORY_* environment: {0}")]
    InvalidEnv(#[from] envy::Error),

    #[error("invalid path pattern {pattern:?}: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

pub type Result<T, E = ObservatoryError> = std::result::Result<T, E>;
