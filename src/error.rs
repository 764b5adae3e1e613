use thiserror::Error;

/// Failure kinds surfaced to callers of the regroup/materialize operations.
///
/// `InvalidReference` is recoverable (ask the user for a proper link);
/// `Fetch` and `Materialize` abort the current operation. A `Fetch` error at
/// any point of a paginated fetch invalidates the whole reconstruction, so
/// callers never see partial data.
#[derive(Debug, Error)]
pub enum RegroupError {
    #[error("invalid playlist reference: {0:?}")]
    InvalidReference(String),

    #[error("catalog fetch failed")]
    Fetch(#[source] anyhow::Error),

    #[error("playlist materialization failed")]
    Materialize(#[source] anyhow::Error),
}
