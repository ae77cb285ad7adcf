use std::io;

/// Everything that can go wrong while converting embed markers.
///
/// The first four variants are scoped to one field value: the caller abandons that value
/// and carries on with its siblings. `Io` and `Backend` come from collaborators and are
/// passed through untouched.
#[derive(Debug, thiserror::Error)]
pub enum ShardError {
    /// A required marker attribute or record field is absent or empty.
    #[error("missing data: {0}")]
    MissingData(String),

    /// A value failed a validity check (bad identity, unknown view mode, negative index...).
    #[error("unexpected value: {0}")]
    UnexpectedValue(String),

    /// A referenced record or entity does not resolve.
    #[error("not found: {0}")]
    NotFound(String),

    /// A value does not have the expected primitive shape, e.g. a non-numeric id.
    #[error("bad data type: {0}")]
    BadDataType(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("backend failure: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl ShardError {
    pub fn missing(message: impl Into<String>) -> Self {
        Self::MissingData(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedValue(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn bad_type(message: impl Into<String>) -> Self {
        Self::BadDataType(message.into())
    }

    /// Collaborator failures abort the whole operation; everything else only the current
    /// field value.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Backend(_))
    }

    /// Short machine-readable code, used for diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingData(_) => "missing-data",
            Self::UnexpectedValue(_) => "unexpected-value",
            Self::NotFound(_) => "not-found",
            Self::BadDataType(_) => "bad-data-type",
            Self::Io(_) => "io",
            Self::Backend(_) => "backend",
        }
    }
}

pub type Result<T> = std::result::Result<T, ShardError>;
