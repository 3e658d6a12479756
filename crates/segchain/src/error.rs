/// Errors produced by the facade helpers and the command line tool.
#[derive(thiserror::Error, Debug)]
pub enum SegchainError {
    #[error(transparent)]
    Core(#[from] segchain_core::Error),

    #[cfg(feature = "image")]
    #[error("image: {0}")]
    Image(#[from] image::ImageError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
