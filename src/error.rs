use serde::Serialize;
use thiserror::Error;

/// Stable error-code identifiers, one per taxonomy entry.
///
/// These are the `code` strings that travel with a [`TransclusionErrorRecord`]
/// to external collaborators (loggers, formatters, CI tooling) that match on
/// error kind rather than parsing `Display` text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NullByte,
    AbsolutePath,
    PathTraversal,
    OutsideBase,
    FileNotFound,
    NotAFile,
    BinaryFile,
    FileTooLarge,
    ReadError,
    CircularReference,
    MaxDepthExceeded,
    HeadingNotFound,
    UndefinedVariable,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NullByte => "NULL_BYTE",
            Self::AbsolutePath => "ABSOLUTE_PATH",
            Self::PathTraversal => "PATH_TRAVERSAL",
            Self::OutsideBase => "OUTSIDE_BASE",
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::NotAFile => "NOT_A_FILE",
            Self::BinaryFile => "BINARY_FILE",
            Self::FileTooLarge => "FILE_TOO_LARGE",
            Self::ReadError => "READ_ERROR",
            Self::CircularReference => "CIRCULAR_REFERENCE",
            Self::MaxDepthExceeded => "MAX_DEPTH_EXCEEDED",
            Self::HeadingNotFound => "HEADING_NOT_FOUND",
            Self::UndefinedVariable => "UNDEFINED_VARIABLE",
        }
    }
}

/// Every fallible outcome in the engine, one variant per §7 taxonomy entry.
///
/// Variants carry just enough structured context (`path`, sometimes a
/// human-facing detail) to build a [`TransclusionErrorRecord`] without
/// re-parsing the `Display` string.
#[derive(Debug, Error)]
pub enum TransclusionError {
    #[error("null byte in reference: {path}")]
    NullByte { path: String },

    #[error("absolute paths are not allowed: {path}")]
    AbsolutePath { path: String },

    #[error("path traversal via URL-encoding detected: {path}")]
    PathTraversal { path: String },

    #[error("resolved path escapes base directory: {path}")]
    OutsideBase { path: String },

    #[error("file not found: {path}")]
    FileNotFound { path: String },

    #[error("not a regular file: {path}")]
    NotAFile { path: String },

    #[error("binary file cannot be transcluded: {path}")]
    BinaryFile { path: String },

    #[error("file too large ({size} bytes, max {max}): {path}")]
    FileTooLarge { path: String, size: u64, max: u64 },

    #[error("failed to read {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Circular reference detected: {chain}")]
    CircularReference { chain: String },

    #[error("Maximum transclusion depth ({max_depth}) exceeded")]
    MaxDepthExceeded { max_depth: u32, path: String },

    #[error("heading not found: {heading} in {path}")]
    HeadingNotFound { heading: String, path: String },

    #[error("undefined variable: {name}")]
    UndefinedVariable { name: String },
}

impl TransclusionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NullByte { .. } => ErrorCode::NullByte,
            Self::AbsolutePath { .. } => ErrorCode::AbsolutePath,
            Self::PathTraversal { .. } => ErrorCode::PathTraversal,
            Self::OutsideBase { .. } => ErrorCode::OutsideBase,
            Self::FileNotFound { .. } => ErrorCode::FileNotFound,
            Self::NotAFile { .. } => ErrorCode::NotAFile,
            Self::BinaryFile { .. } => ErrorCode::BinaryFile,
            Self::FileTooLarge { .. } => ErrorCode::FileTooLarge,
            Self::ReadError { .. } => ErrorCode::ReadError,
            Self::CircularReference { .. } => ErrorCode::CircularReference,
            Self::MaxDepthExceeded { .. } => ErrorCode::MaxDepthExceeded,
            Self::HeadingNotFound { .. } => ErrorCode::HeadingNotFound,
            Self::UndefinedVariable { .. } => ErrorCode::UndefinedVariable,
        }
    }

    /// The path this error is about, if any (absent for variable errors,
    /// which are not path-scoped).
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::NullByte { path }
            | Self::AbsolutePath { path }
            | Self::PathTraversal { path }
            | Self::OutsideBase { path }
            | Self::FileNotFound { path }
            | Self::NotAFile { path }
            | Self::BinaryFile { path }
            | Self::FileTooLarge { path, .. }
            | Self::ReadError { path, .. }
            | Self::MaxDepthExceeded { path, .. }
            | Self::HeadingNotFound { path, .. } => Some(path),
            Self::CircularReference { .. } | Self::UndefinedVariable { .. } => None,
        }
    }

    /// True when this failure means "nothing was there" rather than "a
    /// security or processing error occurred" — controls whether the inline
    /// marker reads `Missing:` or `Error:` (§4.6 step 8).
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound { .. }
                | Self::AbsolutePath { .. }
                | Self::PathTraversal { .. }
                | Self::OutsideBase { .. }
                | Self::NullByte { .. }
        )
    }

    /// Build the serializable [`TransclusionErrorRecord`] for this error, as
    /// recorded on the engine's error list (§3 Transclusion Error).
    pub fn to_record(&self, line: Option<u64>) -> TransclusionErrorRecord {
        TransclusionErrorRecord {
            message: self.to_string(),
            path: self.path().unwrap_or("unknown").to_string(),
            line,
            code: self.code().as_str().to_string(),
        }
    }
}

/// Serializable failure record, matching the §3 "Transclusion Error" entity
/// and the §6 error-object contract (`message`, `path`, `line?`, `code`).
#[derive(Debug, Clone, Serialize)]
pub struct TransclusionErrorRecord {
    pub message: String,
    pub path: String,
    pub line: Option<u64>,
    pub code: String,
}
