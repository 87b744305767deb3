use thiserror::Error;

use md_core::ConfigError;

#[derive(Debug, Error)]
pub enum RoadError {
    #[error("road configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("road file parse error: {0}")]
    Parse(String),

    #[error("road has no segments")]
    Empty,
}

pub type RoadResult<T> = Result<T, RoadError>;
