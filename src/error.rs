use crate::overlay::OverlayKind;
use crate::table::RowId;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// A required document could not be fetched. `status` is `None` for
    /// transport-level failures.
    #[error("failed to get {resource} (status {status:?}): {message}")]
    FetchFailure {
        resource: String,
        status: Option<u16>,
        message: String,
    },

    #[error("failed to parse {resource}: {message}")]
    MalformedInput { resource: String, message: String },

    #[error("stop {code} is not in the stop table")]
    LookupFailure { code: String },

    #[error("row {0} does not exist")]
    UnknownRow(RowId),

    #[error("row {row} has no {kind} to display")]
    KindUnavailable { row: RowId, kind: OverlayKind },

    #[error("sample index {index} is outside a sequence of {len} samples")]
    SampleIndexOutOfRange { index: usize, len: usize },

    #[error("cannot derive a dataset from {0:?}")]
    InvalidLocation(String),
}

impl ViewerError {
    /// Blocking alert text shown when setup is aborted.
    pub fn notification(&self) -> String {
        match self {
            ViewerError::FetchFailure {
                resource,
                status: Some(status),
                ..
            } => format!("Failed to get {resource} - status {status}"),
            ViewerError::FetchFailure {
                resource, message, ..
            } => format!("Failed to get {resource} - {message}"),
            ViewerError::MalformedInput { resource, .. } => {
                format!("Failed to get {resource} - invalid data")
            }
            other => other.to_string(),
        }
    }

    /// Errors that abort setup rather than a single row.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ViewerError::FetchFailure { .. }
                | ViewerError::MalformedInput { .. }
                | ViewerError::InvalidLocation(_)
        )
    }
}
