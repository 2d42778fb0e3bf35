use thiserror::Error;

/// Errors raised while importing catalog data.
#[derive(Debug, Error)]
pub enum CategoryImportError {
    /// A path segment has no matching child and auto-create is disabled.
    /// Recoverable: nothing was written for the offending path.
    #[error("category not found: {0}")]
    CategoryNotFound(String),

    /// An attribute code the importer writes is missing from the attribute
    /// metadata. Fatal: continuing would produce malformed EAV rows.
    #[error("category attribute not found: {0}")]
    UnknownAttribute(String),

    /// Storage failure, propagated unmodified. Retry policy belongs to the
    /// surrounding batch pipeline.
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}
