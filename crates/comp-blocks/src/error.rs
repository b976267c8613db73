//! Error types for comp-blocks

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Filesystem error: {0}")]
    Fs(#[from] comp_fs::Error),

    #[error("Block not found: {id}")]
    BlockNotFound { id: String },

    #[error("Invalid block id: {id}")]
    InvalidId { id: String },
}
