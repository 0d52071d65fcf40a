use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid snapshot root: {0}")]
    InvalidRoot(String),
}
