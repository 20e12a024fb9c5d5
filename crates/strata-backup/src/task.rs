//! Set-level and LS-level backup task records.

use crate::archive::piece::FileStatus;
use crate::archive::status::INVALID_TENANT_ID;
use crate::job::{BackupDataType, BackupStats, BackupStatus, EncryptionMode};
use crate::names::{on_off, parse_on_off, NamedEnum};
use crate::path_list::BackupPathString;
use crate::set_desc::BackupType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use strata_core::utils::check_passwd;
use strata_core::{Error, Result};
use tracing::warn;

/// Scheduling status of an LS task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupTaskStatus {
    Init,
    Pending,
    Doing,
    Finish,
}

impl NamedEnum for BackupTaskStatus {
    const ALL: &'static [Self] = &[
        BackupTaskStatus::Init,
        BackupTaskStatus::Pending,
        BackupTaskStatus::Doing,
        BackupTaskStatus::Finish,
    ];
    const TYPE_NAME: &'static str = "backup task status";

    fn name(self) -> &'static str {
        match self {
            BackupTaskStatus::Init => "INIT",
            BackupTaskStatus::Pending => "PENDING",
            BackupTaskStatus::Doing => "DOING",
            BackupTaskStatus::Finish => "FINISH",
        }
    }
}

impl fmt::Display for BackupTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Kind of work an LS task performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupDataTaskType {
    BackupDataSys,
    BackupDataMinor,
    BackupDataMajor,
    PlusArchiveLog,
    BuildIndex,
    BackupMeta,
}

impl NamedEnum for BackupDataTaskType {
    const ALL: &'static [Self] = &[
        BackupDataTaskType::BackupDataSys,
        BackupDataTaskType::BackupDataMinor,
        BackupDataTaskType::BackupDataMajor,
        BackupDataTaskType::PlusArchiveLog,
        BackupDataTaskType::BuildIndex,
        BackupDataTaskType::BackupMeta,
    ];
    const TYPE_NAME: &'static str = "backup data task type";

    fn name(self) -> &'static str {
        match self {
            BackupDataTaskType::BackupDataSys => "BACKUP_DATA_SYS",
            BackupDataTaskType::BackupDataMinor => "BACKUP_DATA_MINOR",
            BackupDataTaskType::BackupDataMajor => "BACKUP_DATA_MAJOR",
            BackupDataTaskType::PlusArchiveLog => "PLUS_ARCHIVE_LOG",
            BackupDataTaskType::BuildIndex => "BUILD_INDEX",
            BackupDataTaskType::BackupMeta => "BACKUP_META",
        }
    }
}

impl BackupDataTaskType {
    pub fn is_backup_data(self) -> bool {
        matches!(
            self,
            BackupDataTaskType::BackupDataSys
                | BackupDataTaskType::BackupDataMinor
                | BackupDataTaskType::BackupDataMajor
        )
    }

    pub fn backup_data_type(self) -> Result<BackupDataType> {
        match self {
            BackupDataTaskType::BackupDataSys => Ok(BackupDataType::Sys),
            BackupDataTaskType::BackupDataMinor => Ok(BackupDataType::Minor),
            BackupDataTaskType::BackupDataMajor => Ok(BackupDataType::Major),
            other => Err(Error::invalid_argument(format!(
                "task type {} does not back up data",
                other.name()
            ))),
        }
    }
}

/// Outcome of a backup set as recorded in its file descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupSetFileStatus {
    Doing,
    Success,
    Failed,
}

impl NamedEnum for BackupSetFileStatus {
    const ALL: &'static [Self] = &[
        BackupSetFileStatus::Doing,
        BackupSetFileStatus::Success,
        BackupSetFileStatus::Failed,
    ];
    const TYPE_NAME: &'static str = "backup set status";

    fn name(self) -> &'static str {
        match self {
            BackupSetFileStatus::Doing => "DOING",
            BackupSetFileStatus::Success => "SUCCESS",
            BackupSetFileStatus::Failed => "FAILED",
        }
    }
}

/// Why a tablet was skipped by a backup turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupSkippedType {
    Deleted,
    Transfer,
}

impl NamedEnum for BackupSkippedType {
    const ALL: &'static [Self] = &[BackupSkippedType::Deleted, BackupSkippedType::Transfer];
    const TYPE_NAME: &'static str = "backup skipped type";

    fn name(self) -> &'static str {
        match self {
            BackupSkippedType::Deleted => "DELETED",
            BackupSkippedType::Transfer => "TRANSFER",
        }
    }
}

impl BackupSkippedType {
    pub fn parse(value: &str) -> Result<Self> {
        Self::from_name_ignore_case(value).map_err(|e| {
            warn!("Invalid backup skipped type {:?}", value);
            Error::invalid_argument(e.to_string())
        })
    }
}

/// One backup set task; identity is `(job_id, backup_set_id)`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSetTaskAttr {
    pub task_id: i64,
    pub tenant_id: u64,
    pub incarnation_id: i64,
    pub job_id: i64,
    pub backup_set_id: i64,
    pub start_ts: i64,
    pub end_ts: i64,
    pub start_scn: u64,
    pub end_scn: u64,
    pub user_ls_start_scn: u64,
    pub data_turn_id: i64,
    pub meta_turn_id: i64,
    pub status: Option<BackupStatus>,
    pub encryption_mode: EncryptionMode,
    pub passwd: String,
    pub stats: BackupStats,
    pub backup_path: Option<BackupPathString>,
    pub retry_cnt: i64,
    pub result: i32,
}

impl BackupSetTaskAttr {
    pub fn is_valid(&self) -> bool {
        self.tenant_id != INVALID_TENANT_ID
            && self.task_id > 0
            && self.job_id > 0
            && self.backup_set_id > 0
            && self.backup_path.as_ref().is_some_and(|p| !p.is_empty())
            && self.status.is_some()
    }

    pub fn assign(&mut self, other: &BackupSetTaskAttr) -> Result<()> {
        if !other.is_valid() {
            warn!(
                "Refusing to assign invalid backup set task {} of job {}",
                other.task_id, other.job_id
            );
            return Err(Error::invalid_argument(format!(
                "invalid backup set task attr {}",
                other.task_id
            )));
        }
        self.clone_from(other);
        Ok(())
    }
}

/// One LS backup task; identity is `(task_id, ls_id)`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupLSTaskAttr {
    pub task_id: i64,
    pub tenant_id: u64,
    pub ls_id: i64,
    pub job_id: i64,
    pub backup_set_id: i64,
    pub backup_type: BackupType,
    pub task_type: Option<BackupDataTaskType>,
    pub status: Option<BackupTaskStatus>,
    pub start_ts: i64,
    pub end_ts: i64,
    pub backup_date: i64,
    /// Replicas excluded from running this task
    pub black_servers: Vec<SocketAddr>,
    pub dst: Option<SocketAddr>,
    pub task_trace_id: String,
    pub stats: BackupStats,
    pub start_turn_id: i64,
    pub turn_id: i64,
    pub retry_id: i64,
    pub result: i32,
}

impl BackupLSTaskAttr {
    pub fn key(&self) -> (i64, i64) {
        (self.task_id, self.ls_id)
    }

    pub fn is_valid(&self) -> bool {
        self.task_id > 0
            && self.tenant_id != INVALID_TENANT_ID
            && self.job_id > 0
            && self.backup_set_id > 0
            && self.ls_id >= 0
            && self.backup_type.is_valid()
            && self.status.is_some()
            && self.start_ts > 0
            && self.turn_id > 0
    }

    /// Copy every field, the black list included, from `other`
    pub fn assign(&mut self, other: &BackupLSTaskAttr) -> Result<()> {
        if !other.is_valid() {
            warn!("Refusing to assign invalid LS task {:?}", other.key());
            return Err(Error::invalid_argument(format!(
                "invalid backup ls task attr {:?}",
                other.key()
            )));
        }
        self.clone_from(other);
        Ok(())
    }
}

/// Persisted descriptor of one backup set; identity is
/// `(tenant_id, backup_set_id, incarnation, dest_id)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSetFileDesc {
    pub backup_set_id: i64,
    pub incarnation: i64,
    pub tenant_id: u64,
    pub dest_id: i64,
    pub backup_type: BackupType,
    pub plus_archivelog: bool,
    pub date: i64,
    pub prev_full_backup_set_id: i64,
    pub prev_inc_backup_set_id: i64,
    pub stats: BackupStats,
    pub start_time: i64,
    pub end_time: i64,
    pub status: Option<BackupSetFileStatus>,
    pub result: i32,
    pub encryption_mode: Option<EncryptionMode>,
    pub passwd: String,
    pub file_status: Option<FileStatus>,
    pub backup_path: String,
    pub start_replay_scn: u64,
    pub min_restore_scn: u64,
    pub tenant_compatible: u64,
    pub backup_compatible: u32,
    pub data_turn_id: i64,
    pub meta_turn_id: i64,
    pub cluster_version: u64,
}

impl Default for BackupSetFileDesc {
    fn default() -> Self {
        Self {
            backup_set_id: 0,
            incarnation: 0,
            tenant_id: INVALID_TENANT_ID,
            dest_id: -1,
            backup_type: BackupType::Empty,
            plus_archivelog: false,
            date: 0,
            prev_full_backup_set_id: 0,
            prev_inc_backup_set_id: 0,
            stats: BackupStats::default(),
            start_time: 0,
            end_time: 0,
            status: None,
            result: 0,
            encryption_mode: None,
            passwd: String::new(),
            file_status: None,
            backup_path: String::new(),
            start_replay_scn: 0,
            min_restore_scn: 0,
            tenant_compatible: 0,
            backup_compatible: 0,
            data_turn_id: 0,
            meta_turn_id: 0,
            cluster_version: 0,
        }
    }
}

impl BackupSetFileDesc {
    pub fn is_key_valid(&self) -> bool {
        self.tenant_id != INVALID_TENANT_ID
            && self.backup_set_id > 0
            && self.incarnation > 0
            && self.dest_id >= 0
    }

    pub fn is_valid(&self) -> bool {
        self.is_key_valid()
            && self.status.is_some()
            && self.encryption_mode.is_some()
            && self.file_status.is_some()
    }

    /// Whether both descriptors have the same identity
    pub fn is_same_task(&self, other: &BackupSetFileDesc) -> bool {
        self.tenant_id == other.tenant_id
            && self.backup_set_id == other.backup_set_id
            && self.incarnation == other.incarnation
            && self.dest_id == other.dest_id
    }

    pub fn status_str(&self) -> &'static str {
        self.status.map_or("UNKNOWN", BackupSetFileStatus::name)
    }

    /// Exact, case-sensitive status parse
    pub fn set_backup_set_status(&mut self, value: &str) -> Result<()> {
        self.status = Some(BackupSetFileStatus::from_name(value)?);
        Ok(())
    }

    pub fn plus_archivelog_str(&self) -> &'static str {
        on_off(self.plus_archivelog)
    }

    pub fn set_plus_archivelog(&mut self, value: &str) -> Result<()> {
        self.plus_archivelog = parse_on_off(value)?;
        Ok(())
    }

    /// Check this set's password against the comma-joined passwords supplied for restore
    pub fn check_passwd(&self, passwd_array: &str) -> Result<()> {
        check_passwd(passwd_array, &self.passwd)
    }

    pub fn assign(&mut self, other: &BackupSetFileDesc) -> Result<()> {
        if !other.is_valid() {
            warn!(
                "Refusing to assign invalid backup set file desc: tenant {} set {}",
                other.tenant_id, other.backup_set_id
            );
            return Err(Error::invalid_argument(format!(
                "invalid backup set file desc {}",
                other.backup_set_id
            )));
        }
        self.clone_from(other);
        Ok(())
    }
}

/// A tablet that a backup turn did not copy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSkipTabletAttr {
    pub task_id: i64,
    pub tenant_id: u64,
    pub turn_id: i64,
    pub retry_id: i64,
    pub backup_set_id: i64,
    pub tablet_id: u64,
    pub ls_id: i64,
    pub skipped_type: Option<BackupSkippedType>,
}

impl BackupSkipTabletAttr {
    pub fn is_valid(&self) -> bool {
        self.task_id > 0
            && self.tenant_id != INVALID_TENANT_ID
            && self.turn_id > 0
            && self.retry_id > 0
            && self.tablet_id != 0
            && self.backup_set_id > 0
            && self.ls_id >= 0
            && self.skipped_type.is_some()
    }
}

/// Progress of one LS task for one turn and retry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupLSTaskInfoAttr {
    pub task_id: i64,
    pub tenant_id: u64,
    pub ls_id: i64,
    pub turn_id: i64,
    pub retry_id: i64,
    pub backup_data_type: Option<BackupDataType>,
    pub backup_set_id: i64,
    pub stats: BackupStats,
    pub max_file_id: i64,
    pub is_final: bool,
}

impl BackupLSTaskInfoAttr {
    pub fn is_valid(&self) -> bool {
        self.task_id > 0
            && self.tenant_id != INVALID_TENANT_ID
            && self.ls_id >= 0
            && self.turn_id > 0
            && self.retry_id >= 0
            && self.backup_data_type.is_some()
            && self.stats.is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::ErrorKind;

    fn set_task() -> BackupSetTaskAttr {
        BackupSetTaskAttr {
            task_id: 11,
            tenant_id: 1002,
            incarnation_id: 1,
            job_id: 7,
            backup_set_id: 3,
            start_ts: 1,
            status: Some(BackupStatus::BackupDataMinor),
            backup_path: Some(BackupPathString::new("file:///backup").unwrap()),
            ..BackupSetTaskAttr::default()
        }
    }

    fn ls_task() -> BackupLSTaskAttr {
        BackupLSTaskAttr {
            task_id: 11,
            tenant_id: 1002,
            ls_id: 1001,
            job_id: 7,
            backup_set_id: 3,
            backup_type: BackupType::Incremental,
            task_type: Some(BackupDataTaskType::BackupDataMinor),
            status: Some(BackupTaskStatus::Doing),
            start_ts: 1,
            black_servers: vec!["127.0.0.1:2882".parse().unwrap()],
            turn_id: 1,
            ..BackupLSTaskAttr::default()
        }
    }

    fn file_desc() -> BackupSetFileDesc {
        BackupSetFileDesc {
            backup_set_id: 3,
            incarnation: 1,
            tenant_id: 1002,
            dest_id: 1,
            backup_type: BackupType::Full,
            status: Some(BackupSetFileStatus::Success),
            encryption_mode: Some(EncryptionMode::Password),
            passwd: "secret".to_string(),
            file_status: Some(FileStatus::Available),
            backup_path: "file:///backup".to_string(),
            ..BackupSetFileDesc::default()
        }
    }

    #[test]
    fn test_task_type_tables() {
        assert_eq!(BackupTaskStatus::Finish.ordinal(), 3);
        assert_eq!(
            BackupTaskStatus::from_name_ignore_case("pending").unwrap(),
            BackupTaskStatus::Pending
        );
        assert!(BackupDataTaskType::BackupDataSys.is_backup_data());
        assert!(!BackupDataTaskType::BuildIndex.is_backup_data());
        assert_eq!(
            BackupDataTaskType::BackupMeta.backup_data_type().unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_set_task_assign() {
        let mut target = BackupSetTaskAttr::default();
        target.assign(&set_task()).unwrap();
        assert_eq!(target, set_task());

        let invalid = BackupSetTaskAttr { backup_path: None, ..set_task() };
        assert!(!invalid.is_valid());
        assert_eq!(target.assign(&invalid).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(target, set_task());
    }

    #[test]
    fn test_ls_task_assign_replaces_black_list() {
        let mut target = ls_task();
        target.black_servers.push("127.0.0.2:2882".parse().unwrap());
        target.assign(&ls_task()).unwrap();
        assert_eq!(target.black_servers.len(), 1);

        let invalid = BackupLSTaskAttr { turn_id: 0, ..ls_task() };
        assert!(target.assign(&invalid).is_err());
        assert_eq!(target, ls_task());
    }

    #[test]
    fn test_file_desc_validity() {
        let desc = file_desc();
        assert!(desc.is_valid());
        assert!(!BackupSetFileDesc::default().is_key_valid());
        assert!(!BackupSetFileDesc { file_status: None, ..file_desc() }.is_valid());
        assert!(desc.is_same_task(&BackupSetFileDesc { result: -4012, ..file_desc() }));
        assert!(!desc.is_same_task(&BackupSetFileDesc { dest_id: 2, ..file_desc() }));
    }

    #[test]
    fn test_file_desc_status_strings() {
        let mut desc = file_desc();
        desc.set_backup_set_status("FAILED").unwrap();
        assert_eq!(desc.status_str(), "FAILED");
        let err = desc.set_backup_set_status("failed").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EntryNotFound);
        assert_eq!(BackupSetFileDesc::default().status_str(), "UNKNOWN");

        desc.set_plus_archivelog("ON").unwrap();
        assert_eq!(desc.plus_archivelog_str(), "ON");
    }

    #[test]
    fn test_file_desc_check_passwd() {
        let desc = file_desc();
        desc.check_passwd("other,secret").unwrap();
        let err = desc.check_passwd("other").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackupInvalidPassword);
        BackupSetFileDesc { passwd: String::new(), ..file_desc() }
            .check_passwd("")
            .unwrap();
    }

    #[test]
    fn test_file_desc_assign() {
        let mut target = BackupSetFileDesc::default();
        target.assign(&file_desc()).unwrap();
        assert_eq!(target, file_desc());
        assert!(target.assign(&BackupSetFileDesc::default()).is_err());
        assert_eq!(target, file_desc());
    }

    #[test]
    fn test_skip_tablet_attr() {
        let attr = BackupSkipTabletAttr {
            task_id: 1,
            tenant_id: 1002,
            turn_id: 1,
            retry_id: 1,
            backup_set_id: 3,
            tablet_id: 200001,
            ls_id: 1001,
            skipped_type: Some(BackupSkippedType::parse("transfer").unwrap()),
        };
        assert!(attr.is_valid());
        assert!(!BackupSkipTabletAttr { retry_id: 0, ..attr.clone() }.is_valid());
        assert_eq!(
            BackupSkippedType::parse("moved").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_ls_task_info_attr() {
        let info = BackupLSTaskInfoAttr {
            task_id: 1,
            tenant_id: 1002,
            ls_id: 1,
            turn_id: 1,
            retry_id: 0,
            backup_data_type: Some(BackupDataType::Major),
            backup_set_id: 3,
            ..BackupLSTaskInfoAttr::default()
        };
        assert!(info.is_valid());
        let mut bad_stats = info.clone();
        bad_stats.stats.input_bytes = -1;
        assert!(!bad_stats.is_valid());
        assert!(!BackupLSTaskInfoAttr { backup_data_type: None, ..info }.is_valid());
    }
}
