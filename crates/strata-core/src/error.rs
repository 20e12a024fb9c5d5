//! Error types for strata-core

use thiserror::Error;

/// Result type alias using strata-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Backup error taxonomy
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input or caller bug
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Destination string is semantically wrong for its storage kind
    #[error("Invalid backup destination: {message}")]
    InvalidBackupDestination { message: String },

    /// Encoded or decoded buffer would exceed its bound
    #[error("Size overflow: {message}")]
    SizeOverflow { message: String },

    /// Allocator exhaustion
    #[error("Allocate memory failed: {message}")]
    AllocateMemoryFailed { message: String },

    /// Data corruption detected
    #[error("Checksum error: {message}")]
    ChecksumError { message: String },

    /// Illegal log archive state transition
    #[error("Log archive status not match: {message}")]
    LogArchiveStatusNotMatch { message: String },

    /// Transition target carries inconsistent timestamps
    #[error("Invalid log archive status: {message}")]
    InvalidLogArchiveStatus { message: String },

    /// String-to-enum lookup failed
    #[error("Entry not found: {message}")]
    EntryNotFound { message: String },

    /// Two info records that should be identical diverge
    #[error("Backup info not match: {message}")]
    BackupInfoNotMatch { message: String },

    /// Internal invariant broken
    #[error("Unexpected error: {message}")]
    ErrUnexpected { message: String },

    /// Object used before it was initialized
    #[error("Not initialized: {message}")]
    NotInit { message: String },

    /// Persisted bytes failed structural validation
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Backup password does not match
    #[error("Invalid backup password")]
    BackupInvalidPassword,

    /// Deadline expired
    #[error("Timeout: {message}")]
    Timeout { message: String },

    /// Transient condition, try again later
    #[error("Try again: {message}")]
    Again { message: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fieldless mirror of [`Error`] used for classification and comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidBackupDestination,
    SizeOverflow,
    AllocateMemoryFailed,
    ChecksumError,
    LogArchiveStatusNotMatch,
    InvalidLogArchiveStatus,
    EntryNotFound,
    BackupInfoNotMatch,
    ErrUnexpected,
    NotInit,
    InvalidData,
    BackupInvalidPassword,
    Timeout,
    Again,
    InvalidConfig,
    YamlParse,
    Io,
}

impl ErrorKind {
    /// Whether a failure of this kind is worth retrying by an external scheduler.
    ///
    /// Caller bugs, corruption and state mismatches never heal on their own;
    /// only transient resource and timing failures are retryable.
    pub fn is_need_retry(self) -> bool {
        match self {
            ErrorKind::AllocateMemoryFailed
            | ErrorKind::Timeout
            | ErrorKind::Again
            | ErrorKind::Io => true,
            ErrorKind::InvalidArgument
            | ErrorKind::InvalidBackupDestination
            | ErrorKind::SizeOverflow
            | ErrorKind::ChecksumError
            | ErrorKind::LogArchiveStatusNotMatch
            | ErrorKind::InvalidLogArchiveStatus
            | ErrorKind::EntryNotFound
            | ErrorKind::BackupInfoNotMatch
            | ErrorKind::ErrUnexpected
            | ErrorKind::NotInit
            | ErrorKind::InvalidData
            | ErrorKind::BackupInvalidPassword
            | ErrorKind::InvalidConfig
            | ErrorKind::YamlParse => false,
        }
    }
}

impl Error {
    /// Returns the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Error::InvalidBackupDestination { .. } => ErrorKind::InvalidBackupDestination,
            Error::SizeOverflow { .. } => ErrorKind::SizeOverflow,
            Error::AllocateMemoryFailed { .. } => ErrorKind::AllocateMemoryFailed,
            Error::ChecksumError { .. } => ErrorKind::ChecksumError,
            Error::LogArchiveStatusNotMatch { .. } => ErrorKind::LogArchiveStatusNotMatch,
            Error::InvalidLogArchiveStatus { .. } => ErrorKind::InvalidLogArchiveStatus,
            Error::EntryNotFound { .. } => ErrorKind::EntryNotFound,
            Error::BackupInfoNotMatch { .. } => ErrorKind::BackupInfoNotMatch,
            Error::ErrUnexpected { .. } => ErrorKind::ErrUnexpected,
            Error::NotInit { .. } => ErrorKind::NotInit,
            Error::InvalidData { .. } => ErrorKind::InvalidData,
            Error::BackupInvalidPassword => ErrorKind::BackupInvalidPassword,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Again { .. } => ErrorKind::Again,
            Error::InvalidConfig { .. } => ErrorKind::InvalidConfig,
            Error::YamlParse(_) => ErrorKind::YamlParse,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether the external scheduler should retry after this error
    pub fn is_need_retry(&self) -> bool {
        self.kind().is_need_retry()
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an invalid backup destination error
    pub fn invalid_backup_dest(message: impl Into<String>) -> Self {
        Self::InvalidBackupDestination {
            message: message.into(),
        }
    }

    /// Create a size overflow error
    pub fn size_overflow(message: impl Into<String>) -> Self {
        Self::SizeOverflow {
            message: message.into(),
        }
    }

    /// Create an allocation failure error
    pub fn allocate_memory_failed(message: impl Into<String>) -> Self {
        Self::AllocateMemoryFailed {
            message: message.into(),
        }
    }

    /// Create a checksum error
    pub fn checksum_error(message: impl Into<String>) -> Self {
        Self::ChecksumError {
            message: message.into(),
        }
    }

    /// Create a log archive status mismatch error
    pub fn log_archive_status_not_match(message: impl Into<String>) -> Self {
        Self::LogArchiveStatusNotMatch {
            message: message.into(),
        }
    }

    /// Create an invalid log archive status error
    pub fn invalid_log_archive_status(message: impl Into<String>) -> Self {
        Self::InvalidLogArchiveStatus {
            message: message.into(),
        }
    }

    /// Create an entry not found error
    pub fn entry_not_found(message: impl Into<String>) -> Self {
        Self::EntryNotFound {
            message: message.into(),
        }
    }

    /// Create a backup info mismatch error
    pub fn backup_info_not_match(message: impl Into<String>) -> Self {
        Self::BackupInfoNotMatch {
            message: message.into(),
        }
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::ErrUnexpected {
            message: message.into(),
        }
    }

    /// Create a not initialized error
    pub fn not_init(message: impl Into<String>) -> Self {
        Self::NotInit {
            message: message.into(),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a try-again error
    pub fn again(message: impl Into<String>) -> Self {
        Self::Again {
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
