#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("graph already contains a cell with id {id}")]
    DuplicateCell { id: String },
    #[error("graph contains no cell with id {id}")]
    MissingCell { id: String },
    #[error("invalid cell: {reason}")]
    InvalidCell { reason: String },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
