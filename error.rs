use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database Pool Error: {0}")]
    DbPool(#[from] r2d2::Error),

    #[error("Database Error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path Error: {0}")]
    Path(String),

    #[error("Unknown location: {0}")]
    UnknownLocation(String),

    #[error("Unknown container: {0}")]
    UnknownContainer(String),

    #[error("Container {container_id} does not belong to location {location_id}")]
    ContainerMismatch {
        container_id: String,
        location_id: String,
    },

    #[error("Unknown AI model: {0}")]
    UnknownModel(String),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Recognition Failed: {0}")]
    Recognition(String),
}
