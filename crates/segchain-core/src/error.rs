/// Errors shared by every segchain crate.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("missing or empty {what}")]
    InvalidAddress { what: &'static str },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("out of memory (requested {requested} bytes)")]
    OutOfMemory { requested: usize },

    #[error("index {index} out of range (len={len})")]
    OutOfRange { index: usize, len: usize },

    #[error("singular line fit")]
    Singular,
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

/// Convenience alias used across the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Check `index < len`, reporting `OutOfRange` otherwise.
#[inline]
pub fn check_index(index: usize, len: usize) -> Result<usize> {
    if index < len {
        Ok(index)
    } else {
        Err(Error::OutOfRange { index, len })
    }
}
