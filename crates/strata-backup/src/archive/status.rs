//! Per-tenant log archive status and its transition rules.
//!
//! ```text
//! STOP        -> STOP
//! BEGINNING   -> BEGINNING | DOING | STOPPING | STOP | INTERRUPTED
//! DOING       -> DOING | STOPPING | STOP | INTERRUPTED | PAUSED
//! STOPPING    -> STOPPING | STOP
//! INTERRUPTED -> INTERRUPTED | STOPPING | STOP
//! PAUSED      -> INTERRUPTED (ignored) | DOING | STOP
//! ```
//!
//! MIXED only appears when statuses of several tenants are aggregated for
//! display; it is never a legal transition source or target.

use crate::archive::piece::PieceInfoKey;
use crate::names::NamedEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use strata_core::{Error, Result};
use tracing::{debug, warn};

/// Tenant id that marks an unset record
pub const INVALID_TENANT_ID: u64 = 0;

/// Log archive state of one tenant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveStatus {
    #[default]
    Invalid,
    Stop,
    Beginning,
    Doing,
    Stopping,
    Interrupted,
    Mixed,
    Paused,
}

impl NamedEnum for ArchiveStatus {
    const ALL: &'static [Self] = &[
        ArchiveStatus::Invalid,
        ArchiveStatus::Stop,
        ArchiveStatus::Beginning,
        ArchiveStatus::Doing,
        ArchiveStatus::Stopping,
        ArchiveStatus::Interrupted,
        ArchiveStatus::Mixed,
        ArchiveStatus::Paused,
    ];
    const TYPE_NAME: &'static str = "log archive status";

    fn name(self) -> &'static str {
        match self {
            ArchiveStatus::Invalid => "INVALID",
            ArchiveStatus::Stop => "STOP",
            ArchiveStatus::Beginning => "BEGINNING",
            ArchiveStatus::Doing => "DOING",
            ArchiveStatus::Stopping => "STOPPING",
            ArchiveStatus::Interrupted => "INTERRUPTED",
            ArchiveStatus::Mixed => "MIXED",
            ArchiveStatus::Paused => "PAUSED",
        }
    }
}

impl ArchiveStatus {
    pub fn is_valid(self) -> bool {
        self != ArchiveStatus::Invalid
    }

    /// Name for an ordinal read from an untrusted source; `UNKNOWN` when out of range
    pub fn name_of_ordinal(ordinal: i64) -> &'static str {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| Self::ALL.get(i))
            .map(|s| s.name())
            .unwrap_or("UNKNOWN")
    }
}

impl fmt::Display for ArchiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// On-disk layout generation of the archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArchiveCompatible {
    #[default]
    None,
    Version1,
    Version2,
}

/// What an accepted update does to the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    /// Accepted without changing status or timestamps
    Keep,
    /// Adopt the new status
    Adopt,
    /// Adopt the new status plus start and checkpoint timestamps
    Start,
    /// Stay DOING and advance the checkpoint
    Advance,
}

/// The allowed-transition table, keyed on (current, requested)
fn transition(current: ArchiveStatus, requested: ArchiveStatus) -> Option<Transition> {
    use ArchiveStatus::*;
    match (current, requested) {
        (Stop, Stop) => Some(Transition::Keep),

        (Beginning, Doing) => Some(Transition::Start),
        (Beginning, Beginning) => Some(Transition::Keep),
        (Beginning, Stopping | Stop | Interrupted) => Some(Transition::Adopt),

        (Doing, Doing) => Some(Transition::Advance),
        (Doing, Stopping | Stop | Interrupted | Paused) => Some(Transition::Adopt),

        (Stopping, Stopping) => Some(Transition::Keep),
        (Stopping, Stop) => Some(Transition::Adopt),

        (Interrupted, Interrupted) => Some(Transition::Keep),
        (Interrupted, Stopping | Stop) => Some(Transition::Adopt),

        // PAUSED -> INTERRUPTED is accepted and ignored
        (Paused, Interrupted) => Some(Transition::Keep),
        (Paused, Doing | Stop) => Some(Transition::Adopt),

        _ => None,
    }
}

/// Archive progress of one tenant within one incarnation and round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogArchiveStatus {
    pub tenant_id: u64,
    pub copy_id: i64,
    pub start_ts: i64,
    pub checkpoint_ts: i64,
    pub incarnation: i64,
    pub round: i64,
    pub status: ArchiveStatus,
    pub is_mark_deleted: bool,
    pub is_mount_file_created: bool,
    pub compatible: ArchiveCompatible,
    pub backup_piece_id: i64,
    pub start_piece_id: i64,
}

impl Default for LogArchiveStatus {
    fn default() -> Self {
        Self {
            tenant_id: INVALID_TENANT_ID,
            copy_id: 0,
            start_ts: 0,
            checkpoint_ts: 0,
            incarnation: 0,
            round: 0,
            status: ArchiveStatus::Invalid,
            is_mark_deleted: false,
            is_mount_file_created: false,
            compatible: ArchiveCompatible::None,
            backup_piece_id: 0,
            start_piece_id: 0,
        }
    }
}

impl LogArchiveStatus {
    pub fn is_valid(&self) -> bool {
        self.tenant_id != INVALID_TENANT_ID
            && self.copy_id >= 0
            && self.status.is_valid()
            && self.incarnation >= 0
            && self.round >= 0
            && self.start_ts >= -1
            && self.checkpoint_ts >= -1
            && self.backup_piece_id >= 0
            && self.start_piece_id >= 0
    }

    /// Identity of the archive stream this status belongs to
    pub fn key(&self) -> (u64, i64, i64) {
        (self.tenant_id, self.incarnation, self.round)
    }

    pub fn status_str(&self) -> &'static str {
        self.status.name()
    }

    /// Apply a status report to this record.
    ///
    /// The update is all-or-nothing: on any error the receiver is unchanged.
    pub fn update(&mut self, new_status: &LogArchiveStatus) -> Result<()> {
        if !self.is_valid() {
            return Err(Error::not_init(format!("log archive status is not valid: {:?}", self)));
        }
        if !new_status.is_valid()
            || new_status.incarnation != self.incarnation
            || new_status.round != self.round
            || new_status.tenant_id != self.tenant_id
            || new_status.compatible != self.compatible
        {
            warn!(
                "Rejecting log archive status update for tenant {}: new status {:?} does not belong to this stream",
                self.tenant_id, new_status
            );
            return Err(Error::invalid_argument(format!(
                "new status does not match tenant {} incarnation {} round {}",
                self.tenant_id, self.incarnation, self.round
            )));
        }
        if self.is_mount_file_created && !new_status.is_mount_file_created {
            warn!(
                "Rejecting log archive status update for tenant {}: mount file flag cannot be cleared",
                self.tenant_id
            );
            return Err(Error::invalid_argument("is_mount_file_created cannot change back to false"));
        }

        let Some(step) = transition(self.status, new_status.status) else {
            warn!(
                "Log archive status of tenant {} cannot move from {} to {}",
                self.tenant_id, self.status, new_status.status
            );
            return Err(Error::log_archive_status_not_match(format!(
                "{} cannot move to {}",
                self.status, new_status.status
            )));
        };

        match step {
            Transition::Start if new_status.start_ts <= 0 || new_status.checkpoint_ts <= 0 => {
                return Err(Error::invalid_log_archive_status(format!(
                    "start_ts {} and checkpoint_ts {} must be positive to start archiving",
                    new_status.start_ts, new_status.checkpoint_ts
                )));
            }
            Transition::Advance if new_status.start_ts < self.start_ts => {
                return Err(Error::invalid_log_archive_status(format!(
                    "start_ts {} must not be less than {}",
                    new_status.start_ts, self.start_ts
                )));
            }
            Transition::Advance if new_status.checkpoint_ts < self.checkpoint_ts => {
                return Err(Error::invalid_log_archive_status(format!(
                    "checkpoint_ts {} must not be less than {}",
                    new_status.checkpoint_ts, self.checkpoint_ts
                )));
            }
            _ => {}
        }

        self.is_mount_file_created = new_status.is_mount_file_created;
        match step {
            Transition::Keep => {}
            Transition::Adopt => {
                debug!(
                    "Log archive status of tenant {} moves from {} to {}",
                    self.tenant_id, self.status, new_status.status
                );
                self.status = new_status.status;
            }
            Transition::Start => {
                debug!(
                    "Log archive of tenant {} starts at {} with checkpoint {}",
                    self.tenant_id, new_status.start_ts, new_status.checkpoint_ts
                );
                self.status = new_status.status;
                self.start_ts = new_status.start_ts;
                self.checkpoint_ts = new_status.checkpoint_ts;
            }
            Transition::Advance => {
                self.checkpoint_ts = new_status.checkpoint_ts;
            }
        }
        Ok(())
    }

    /// Whether a piece switch is pending
    pub fn need_switch_piece(&self) -> bool {
        self.start_piece_id > 0
    }

    /// Piece identity derived from this status; piece id 0 means no switch
    pub fn piece_key(&self) -> PieceInfoKey {
        PieceInfoKey {
            incarnation: self.incarnation,
            tenant_id: self.tenant_id,
            round_id: self.round,
            backup_piece_id: if self.need_switch_piece() {
                self.backup_piece_id
            } else {
                0
            },
            copy_id: self.copy_id,
        }
    }
}

impl fmt::Display for LogArchiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tenant={} incarnation={} round={} status={} checkpoint_ts={}",
            self.tenant_id, self.incarnation, self.round, self.status, self.checkpoint_ts
        )
    }
}

/// Archive status paired with the destination it writes to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogArchiveBackupInfo {
    pub status: LogArchiveStatus,
    pub backup_dest: String,
}

impl LogArchiveBackupInfo {
    pub fn is_valid(&self) -> bool {
        self.status.is_valid()
    }

    /// Whether two infos describe the same archive progress at the same destination
    pub fn is_same(&self, other: &LogArchiveBackupInfo) -> bool {
        self.backup_dest == other.backup_dest
            && self.status.tenant_id == other.status.tenant_id
            && self.status.start_ts == other.status.start_ts
            && self.status.checkpoint_ts == other.status.checkpoint_ts
            && self.status.incarnation == other.status.incarnation
            && self.status.round == other.status.round
            && self.status.status == other.status.status
            && self.status.is_mark_deleted == other.status.is_mark_deleted
    }

    pub fn is_oss(&self) -> bool {
        self.backup_dest.starts_with(crate::dest::StorageKind::Oss.prefix())
    }

    pub fn backup_dest(&self) -> Result<&str> {
        if self.backup_dest.is_empty() {
            return Err(Error::invalid_argument("log archive backup dest is empty"));
        }
        Ok(&self.backup_dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::ErrorKind;

    fn status(s: ArchiveStatus) -> LogArchiveStatus {
        LogArchiveStatus {
            tenant_id: 1001,
            incarnation: 1,
            round: 3,
            start_ts: 100,
            checkpoint_ts: 200,
            status: s,
            ..Default::default()
        }
    }

    #[test]
    fn test_status_table() {
        let names: Vec<_> = ArchiveStatus::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            ["INVALID", "STOP", "BEGINNING", "DOING", "STOPPING", "INTERRUPTED", "MIXED", "PAUSED"]
        );
        assert_eq!(ArchiveStatus::name_of_ordinal(3), "DOING");
        assert_eq!(ArchiveStatus::name_of_ordinal(8), "UNKNOWN");
        assert_eq!(ArchiveStatus::name_of_ordinal(-1), "UNKNOWN");
    }

    #[test]
    fn test_update_requires_valid_receiver() {
        let mut current = LogArchiveStatus::default();
        let err = current.update(&status(ArchiveStatus::Stop)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInit);
    }

    #[test]
    fn test_beginning_to_doing_adopts_timestamps() {
        let mut current = status(ArchiveStatus::Beginning);
        let mut next = status(ArchiveStatus::Doing);
        next.start_ts = 500;
        next.checkpoint_ts = 600;
        current.update(&next).unwrap();
        assert_eq!(current.status, ArchiveStatus::Doing);
        assert_eq!(current.start_ts, 500);
        assert_eq!(current.checkpoint_ts, 600);
    }

    #[test]
    fn test_beginning_to_doing_requires_positive_ts() {
        let mut current = status(ArchiveStatus::Beginning);
        let mut next = status(ArchiveStatus::Doing);
        next.checkpoint_ts = 0;
        let before = current.clone();
        let err = current.update(&next).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidLogArchiveStatus);
        assert_eq!(current, before);
    }

    #[test]
    fn test_doing_advances_checkpoint_only() {
        let mut current = status(ArchiveStatus::Doing);
        let mut next = status(ArchiveStatus::Doing);
        next.start_ts = 150;
        next.checkpoint_ts = 300;
        current.update(&next).unwrap();
        assert_eq!(current.checkpoint_ts, 300);
        assert_eq!(current.start_ts, 100);
    }

    #[test]
    fn test_doing_rejects_regression() {
        let mut current = status(ArchiveStatus::Doing);
        let mut next = status(ArchiveStatus::Doing);
        next.checkpoint_ts = 199;
        assert_eq!(
            current.update(&next).unwrap_err().kind(),
            ErrorKind::InvalidLogArchiveStatus
        );
        let mut next = status(ArchiveStatus::Doing);
        next.start_ts = 99;
        assert_eq!(
            current.update(&next).unwrap_err().kind(),
            ErrorKind::InvalidLogArchiveStatus
        );
    }

    #[test]
    fn test_paused_ignores_interrupted() {
        // Accepted as a no-op even though PAUSED never moves to INTERRUPTED
        let mut current = status(ArchiveStatus::Paused);
        current.update(&status(ArchiveStatus::Interrupted)).unwrap();
        assert_eq!(current.status, ArchiveStatus::Paused);
    }

    #[test]
    fn test_stop_only_accepts_stop() {
        let mut current = status(ArchiveStatus::Stop);
        let err = current.update(&status(ArchiveStatus::Doing)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LogArchiveStatusNotMatch);
        current.update(&status(ArchiveStatus::Stop)).unwrap();
    }

    #[test]
    fn test_foreign_stream_rejected() {
        let mut current = status(ArchiveStatus::Doing);
        let mut next = status(ArchiveStatus::Doing);
        next.round = 4;
        assert_eq!(current.update(&next).unwrap_err().kind(), ErrorKind::InvalidArgument);
        let mut next = status(ArchiveStatus::Doing);
        next.compatible = ArchiveCompatible::Version2;
        assert_eq!(current.update(&next).unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_mount_flag_is_monotonic() {
        let mut current = status(ArchiveStatus::Doing);
        let mut next = status(ArchiveStatus::Doing);
        next.is_mount_file_created = true;
        current.update(&next).unwrap();
        assert!(current.is_mount_file_created);

        let before = current.clone();
        let err = current.update(&status(ArchiveStatus::Doing)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(current, before);
    }

    #[test]
    fn test_rejected_transition_keeps_mount_flag() {
        let mut current = status(ArchiveStatus::Stop);
        let mut next = status(ArchiveStatus::Doing);
        next.is_mount_file_created = true;
        assert!(current.update(&next).is_err());
        assert!(!current.is_mount_file_created);
    }

    #[test]
    fn test_piece_key() {
        let mut current = status(ArchiveStatus::Doing);
        current.backup_piece_id = 7;
        assert!(!current.need_switch_piece());
        assert_eq!(current.piece_key().backup_piece_id, 0);
        current.start_piece_id = 5;
        assert!(current.need_switch_piece());
        let key = current.piece_key();
        assert_eq!(key.backup_piece_id, 7);
        assert_eq!((key.tenant_id, key.round_id, key.incarnation), (1001, 3, 1));
    }

    #[test]
    fn test_backup_info() {
        let mut info = LogArchiveBackupInfo {
            status: status(ArchiveStatus::Doing),
            backup_dest: String::new(),
        };
        assert_eq!(info.backup_dest().unwrap_err().kind(), ErrorKind::InvalidArgument);
        info.backup_dest = "oss://bucket/archive?host=h".to_string();
        assert!(info.is_oss());
        let mut other = info.clone();
        assert!(info.is_same(&other));
        other.status.checkpoint_ts += 1;
        assert!(!info.is_same(&other));
    }
}
