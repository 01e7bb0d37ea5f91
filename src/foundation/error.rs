use crate::store::StoreError;

/// Convenience result type used across darkroom.
pub type DarkroomResult<T> = Result<T, DarkroomError>;

/// Top-level error taxonomy used by provisioning and bake APIs.
#[derive(thiserror::Error, Debug)]
pub enum DarkroomError {
    /// Invalid user-provided configuration or arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// Schema or bucket setup failed before a bake run.
    #[error("provisioning error: {0}")]
    Provisioning(String),

    /// A single row apply failed while baking a column.
    #[error("execution error at column {column}, row {row}: {source}")]
    Execution {
        column: u32,
        row: u32,
        #[source]
        source: StoreError,
    },

    /// The periodic ticker could not be established.
    #[error("timer error: {0}")]
    Timer(String),

    /// The source image could not be read or decoded.
    #[error("image error: {0}")]
    Image(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DarkroomError {
    /// Build a [`DarkroomError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`DarkroomError::Provisioning`] value.
    pub fn provisioning(msg: impl Into<String>) -> Self {
        Self::Provisioning(msg.into())
    }

    /// Build a [`DarkroomError::Timer`] value.
    pub fn timer(msg: impl Into<String>) -> Self {
        Self::Timer(msg.into())
    }

    /// Build a [`DarkroomError::Image`] value.
    pub fn image(msg: impl Into<String>) -> Self {
        Self::Image(msg.into())
    }

    /// Build a [`DarkroomError::Execution`] for `(column, row)`.
    pub fn execution(column: u32, row: u32, source: StoreError) -> Self {
        Self::Execution {
            column,
            row,
            source,
        }
    }

    /// `(column, row)` of a failed row apply, if this is an execution error.
    pub fn failed_cell(&self) -> Option<(u32, u32)> {
        match self {
            Self::Execution { column, row, .. } => Some((*column, *row)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
