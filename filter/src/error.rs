use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error for filter {name:?}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("filter {name:?} does not exist and create_if_absent was false")]
    NotFound { name: String },

    #[error("corrupt header for filter {name:?}: {reason}")]
    CorruptHeader { name: String, reason: String },

    #[error("invalid filter parameters: {0}")]
    InvalidParams(String),
}
