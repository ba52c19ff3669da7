use thiserror::Error;

#[derive(Error, Debug)]
/// Batch error
pub enum BatchError {
    /// The underlying stream failed while reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The format description is not usable.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A format could not be loaded from its JSON description.
    #[error("Format configuration: {0}")]
    Configuration(#[from] serde_json::Error),

    /// A writer was asked to emit a header row that was never provided.
    #[error("CsvFormat.headers must be filled to write a document with headers")]
    MissingHeaders,

    /// Set-wise processing was requested on a handler that cannot process sets,
    /// or a set handler was used without a set size.
    #[error("Incompatible handler: {0}")]
    IncompatibleHandler(String),

    /// A handler failed and the run was configured to abort.
    #[error("Handler failed at line {line}: {source}")]
    Handler {
        line: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl BatchError {
    /// Line position at which a handler aborted the run, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            BatchError::Handler { line, .. } => Some(*line),
            _ => None,
        }
    }
}
