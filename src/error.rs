use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlantError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(#[source] image::ImageError),

    #[error("Failed to write image {path}: {source}")]
    ImageEncode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Record store {path}: {reason}")]
    RecordStore { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PlantError>;
