//! # strata-backup
//!
//! Data model of the Strata backup subsystem providing:
//! - Backup destination parsing, formatting and identity
//! - Restore path lists with plain and hex catalog encodings
//! - The per-tenant log archive status state machine
//! - Backup pieces, file status transitions and archive destination attributes
//! - Job and task attributes with validated assignment and stats roll-up
//! - The common header that prefixes every backup data file

pub mod archive;
pub mod dest;
pub mod header;
pub mod job;
pub mod names;
pub mod path_list;
pub mod set_desc;
pub mod task;

pub use archive::{
    ArchiveStatus, FileStatus, LogArchiveDestAttr, LogArchiveStatus, PieceInfo, PieceInfoKey,
    PieceStatus,
};
pub use dest::{BackupDest, StorageInfo, StorageKind};
pub use header::{BackupCommonHeader, BackupFileType, CompressorType};
pub use job::{BackupJobAttr, BackupStats, BackupStatus, BaseBackupInfo, EncryptionMode};
pub use names::NamedEnum;
pub use path_list::{BackupPathString, ListCodec, PathListKind, RestoreBackupDestList};
pub use set_desc::{BackupSetDesc, BackupType};
pub use task::{BackupLSTaskAttr, BackupSetFileDesc, BackupSetTaskAttr};

/// Version of strata-backup
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
