use thiserror::Error;

/// Result type for extractor configuration
pub type Result<T> = std::result::Result<T, ExtractorError>;

/// Errors that make an extractor unusable
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ExtractorError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Problems found while scanning one file.
///
/// These never abort a pass: the offending file or construct is dropped,
/// logged and counted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractIssue {
    #[error("unreadable file {path}: {reason}")]
    UnreadableFile { path: String, reason: String },

    #[error("file {path} exceeds scan allowance ({size} > {limit} bytes)")]
    OversizedFile {
        path: String,
        size: usize,
        limit: usize,
    },

    #[error("malformed candidate in {path}@{offset} ({matcher}): {reason}")]
    MalformedCandidate {
        path: String,
        matcher: String,
        offset: usize,
        reason: String,
    },
}

impl ExtractIssue {
    pub fn malformed(
        path: impl Into<String>,
        matcher: impl Into<String>,
        offset: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedCandidate {
            path: path.into(),
            matcher: matcher.into(),
            offset,
            reason: reason.into(),
        }
    }
}
