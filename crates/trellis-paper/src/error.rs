use trellis_graph::CellId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("link {link} references a missing {end} cell: {id}")]
    MissingEndpoint {
        link: CellId,
        end: &'static str,
        id: CellId,
    },
    #[error("unknown connector: {name}")]
    UnknownConnector { name: String },
    #[error("unknown layer: {id}")]
    UnknownLayer { id: String },
    #[error("layer {id} is built in and cannot be removed")]
    ImplicitLayer { id: String },
    #[error("layer already exists: {id}")]
    DuplicateLayer { id: String },
    #[error("invalid paper options: {reason}")]
    InvalidOptions { reason: String },
    #[error(transparent)]
    Graph(#[from] trellis_graph::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
