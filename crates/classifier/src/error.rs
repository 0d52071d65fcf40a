use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClassifierError>;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Invalid taxonomy: {0}")]
    InvalidTaxonomy(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ClassifierError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidTaxonomy(msg.into())
    }
}
