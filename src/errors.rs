use thiserror::Error;

/// Library-level error type shared by the reconciliation pipeline and the
/// job manager. Checker errors never surface here — every checker catches
/// its own I/O and returns a `CheckResult` instead (see `checkers::mod`).
#[derive(Error, Debug)]
pub enum Error {
    #[error("kube API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("finalizer error: {0}")]
    Finalizer(#[source] Box<kube::runtime::finalizer::Error<kube::Error>>),

    #[error("resource failed validation: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("RRULE parse error: {0}")]
    Rrule(String),

    #[error("unknown monitor type for target variant")]
    MismatchedTarget,
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<kube::runtime::finalizer::Error<kube::Error>> for Error {
    fn from(e: kube::runtime::finalizer::Error<kube::Error>) -> Self {
        Error::Finalizer(Box::new(e))
    }
}
