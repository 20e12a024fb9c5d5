//! Continuous log archive: per-tenant status, pieces and destination attributes

pub mod dest_attr;
pub mod piece;
pub mod status;

pub use dest_attr::{Binding, ConfigItem, DestState, LogArchiveDestAttr};
pub use piece::{FileStatus, NonFrozenBackupPieceInfo, PieceInfo, PieceInfoKey, PieceStatus};
pub use status::{ArchiveCompatible, ArchiveStatus, LogArchiveBackupInfo, LogArchiveStatus};
