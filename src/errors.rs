/// Domain-specific error types for the scanning engine.
/// Only fatal conditions live here. Candidates that cannot be priced are
/// dropped silently by the scanner and never surface as errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid expiry {0:?}: expected YYYY-MM-DD")]
    InvalidExpiry(String),

    #[error("historical returns are empty; resampling has no source distribution")]
    EmptyReturns,

    #[error("model computation error: {0}")]
    Model(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("scan cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

impl From<rand_distr::NormalError> for EngineError {
    fn from(e: rand_distr::NormalError) -> Self {
        EngineError::Model(format!("normal distribution: {e}"))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
