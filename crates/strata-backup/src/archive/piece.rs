//! Backup pieces: bounded time windows of the continuous log archive.

use crate::archive::status::ArchiveCompatible;
use crate::dest::BackupDest;
use crate::names::NamedEnum;
use crate::path_list::BackupPathString;
use serde::{Deserialize, Serialize};
use std::fmt;
use strata_core::{Error, Result};
use tracing::warn;

/// The first incarnation of a cluster
pub const START_INCARNATION: i64 = 1;
/// Tenant id of the system tenant
pub const SYS_TENANT_ID: u64 = 1;

/// Identity of a piece; ordered by incarnation, tenant, round, piece, copy
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PieceInfoKey {
    pub incarnation: i64,
    pub tenant_id: u64,
    pub round_id: i64,
    pub backup_piece_id: i64,
    pub copy_id: i64,
}

impl PieceInfoKey {
    pub fn is_valid(&self) -> bool {
        self.incarnation == START_INCARNATION
            && self.tenant_id > 0
            && self.round_id > 0
            && self.backup_piece_id >= 0
            && self.copy_id >= 0
    }
}

impl fmt::Display for PieceInfoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "incarnation={} tenant={} round={} piece={} copy={}",
            self.incarnation, self.tenant_id, self.round_id, self.backup_piece_id, self.copy_id
        )
    }
}

/// Lifecycle of a piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceStatus {
    Active,
    Freezing,
    Frozen,
    Inactive,
}

impl NamedEnum for PieceStatus {
    const ALL: &'static [Self] = &[
        PieceStatus::Active,
        PieceStatus::Freezing,
        PieceStatus::Frozen,
        PieceStatus::Inactive,
    ];
    const TYPE_NAME: &'static str = "backup piece status";

    fn name(self) -> &'static str {
        match self {
            PieceStatus::Active => "ACTIVE",
            PieceStatus::Freezing => "FREEZING",
            PieceStatus::Frozen => "FROZEN",
            PieceStatus::Inactive => "INACTIVE",
        }
    }
}

impl PieceStatus {
    /// Only pieces that no longer receive logs may be deleted
    pub fn can_be_deleted(self) -> bool {
        matches!(self, PieceStatus::Frozen | PieceStatus::Inactive)
    }
}

impl fmt::Display for PieceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// State of the files backing a piece or backup set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileStatus {
    #[default]
    Available,
    Copying,
    Incomplete,
    Deleting,
    Expired,
    Broken,
    Deleted,
}

impl NamedEnum for FileStatus {
    const ALL: &'static [Self] = &[
        FileStatus::Available,
        FileStatus::Copying,
        FileStatus::Incomplete,
        FileStatus::Deleting,
        FileStatus::Expired,
        FileStatus::Broken,
        FileStatus::Deleted,
    ];
    const TYPE_NAME: &'static str = "backup file status";

    fn name(self) -> &'static str {
        match self {
            FileStatus::Available => "AVAILABLE",
            FileStatus::Copying => "COPYING",
            FileStatus::Incomplete => "INCOMPLETE",
            FileStatus::Deleting => "DELETING",
            FileStatus::Expired => "EXPIRED",
            FileStatus::Broken => "BROKEN",
            FileStatus::Deleted => "DELETED",
        }
    }
}

impl FileStatus {
    /// Check that files may move from `self` to `to`
    pub fn check_can_change_status(self, to: FileStatus) -> Result<()> {
        use FileStatus::*;
        let allowed = match self {
            Available => matches!(to, Available | Broken | Expired | Deleting | Incomplete),
            Incomplete => matches!(to, Incomplete | Copying | Deleting),
            Copying => matches!(to, Copying | Available | Incomplete),
            Broken => matches!(to, Broken | Deleting),
            Expired => matches!(to, Expired | Available | Deleting),
            Deleting => matches!(to, Deleting | Deleted),
            Deleted => to == Deleted,
        };
        if allowed {
            Ok(())
        } else {
            warn!("Backup file status cannot change from {} to {}", self, to);
            Err(Error::unexpected(format!(
                "backup file status cannot change from {} to {}",
                self, to
            )))
        }
    }

    /// Whether restore preview lists files in this state
    pub fn can_show_in_preview(self) -> bool {
        matches!(
            self,
            FileStatus::Available | FileStatus::Deleting | FileStatus::Deleted
        )
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Persisted metadata of one backup piece
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceInfo {
    pub key: PieceInfoKey,
    pub create_date: i64,
    pub start_ts: i64,
    pub checkpoint_ts: i64,
    pub max_ts: i64,
    pub status: PieceStatus,
    pub file_status: FileStatus,
    pub backup_dest: BackupPathString,
    pub compatible: ArchiveCompatible,
    pub start_piece_id: i64,
}

impl PieceInfo {
    pub fn is_valid(&self) -> bool {
        self.key.is_valid()
            && self.create_date >= 0
            && self.start_ts >= 0
            && self.checkpoint_ts >= 0
            && self.max_ts >= 0
            && !self.backup_dest.is_empty()
            && self.start_piece_id >= 0
    }

    /// Copy a system tenant piece for a user tenant
    pub fn init_from_sys_piece(sys_piece: &PieceInfo, tenant_id: u64) -> Result<Self> {
        if !sys_piece.is_valid() || tenant_id == 0 || sys_piece.key.tenant_id != SYS_TENANT_ID {
            return Err(Error::invalid_argument(format!(
                "cannot init piece of tenant {} from {}",
                tenant_id, sys_piece.key
            )));
        }
        let mut piece = sys_piece.clone();
        piece.key.tenant_id = tenant_id;
        Ok(piece)
    }

    pub fn backup_dest(&self) -> Result<BackupDest> {
        if self.backup_dest.is_empty() {
            return Err(Error::invalid_argument("backup piece has no backup dest"));
        }
        BackupDest::parse(self.backup_dest.as_str())
    }
}

/// The pieces on either side of a piece switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonFrozenBackupPieceInfo {
    pub prev_piece_info: Option<PieceInfo>,
    pub cur_piece_info: PieceInfo,
}

impl NonFrozenBackupPieceInfo {
    pub fn is_valid(&self) -> bool {
        if !self.cur_piece_info.is_valid() {
            return false;
        }
        match &self.prev_piece_info {
            None => true,
            Some(prev) => prev.is_valid() && prev.status != PieceStatus::Active,
        }
    }

    /// Id of the piece currently receiving logs
    pub fn backup_piece_id(&self) -> Result<i64> {
        self.check_valid()?;
        Ok(self.cur_piece_info.key.backup_piece_id)
    }

    /// Id and create date of the piece currently receiving logs
    pub fn backup_piece_info(&self) -> Result<(i64, i64)> {
        self.check_valid()?;
        Ok((
            self.cur_piece_info.key.backup_piece_id,
            self.cur_piece_info.create_date,
        ))
    }

    fn check_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            warn!("Invalid non-frozen piece info: {:?}", self);
            Err(Error::unexpected("invalid non-frozen piece info"))
        }
    }
}
