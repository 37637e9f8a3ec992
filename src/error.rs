use thiserror::Error;

/// Errors raised by the randomization and validation pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// A range, threshold or setting is missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A named role, entity or bone is absent from the loaded scene.
    #[error("scene entity `{0}` is missing")]
    MissingEntity(String),
    /// An operation needing mesh geometry received another kind of entity.
    #[error("entity `{0}` is not a mesh")]
    NonMesh(String),
    /// The placement search ran out of attempts.
    #[error("no collision-free placement for `{entity}` after {attempts} attempts")]
    RetryExhausted { entity: String, attempts: u32 },
    /// Geometry was read after a transform write without a synchronize.
    #[error("scene geometry read before synchronize()")]
    Unsynchronized,
    #[error("asset error: {0}")]
    Asset(String),
    /// The existing dataset log cannot be continued without reusing an index.
    #[error("dataset log error: {0}")]
    DatasetLog(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Errors that only invalidate the current image rather than the whole run
    pub fn is_iteration_failure(&self) -> bool {
        matches!(
            self,
            Error::MissingEntity(_) | Error::NonMesh(_) | Error::RetryExhausted { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
