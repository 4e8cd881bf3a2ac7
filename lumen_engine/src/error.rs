use thiserror::Error;

/// Errors surfaced by the fallible engine entry points. Everything else in
/// the engine degrades and logs instead of erroring.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid concert document: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    #[error("missing \"objectType\" tag")]
    MissingObjectType,

    #[error("unknown object type '{0}'")]
    UnknownObjectType(String),
}
