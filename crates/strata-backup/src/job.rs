//! Backup job attributes, statistics and the enums stored with them.

use crate::archive::status::INVALID_TENANT_ID;
use crate::names::{on_off, parse_on_off, NamedEnum};
use crate::set_desc::BackupType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use strata_core::{Error, Result};
use tracing::warn;

/// Status of a backup job, including the per-phase statuses of a set task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupStatus {
    Init,
    Doing,
    Completed,
    Failed,
    Canceling,
    Canceled,
    BackupSysMeta,
    BackupUserMeta,
    BackupDataSys,
    BackupDataMinor,
    BackupDataMajor,
    BackupLog,
}

impl NamedEnum for BackupStatus {
    const ALL: &'static [Self] = &[
        BackupStatus::Init,
        BackupStatus::Doing,
        BackupStatus::Completed,
        BackupStatus::Failed,
        BackupStatus::Canceling,
        BackupStatus::Canceled,
        BackupStatus::BackupSysMeta,
        BackupStatus::BackupUserMeta,
        BackupStatus::BackupDataSys,
        BackupStatus::BackupDataMinor,
        BackupStatus::BackupDataMajor,
        BackupStatus::BackupLog,
    ];
    const TYPE_NAME: &'static str = "backup status";

    fn name(self) -> &'static str {
        match self {
            BackupStatus::Init => "INIT",
            BackupStatus::Doing => "DOING",
            BackupStatus::Completed => "COMPLETED",
            BackupStatus::Failed => "FAILED",
            BackupStatus::Canceling => "CANCELING",
            BackupStatus::Canceled => "CANCELED",
            BackupStatus::BackupSysMeta => "BACKUP_SYS_META",
            BackupStatus::BackupUserMeta => "BACKUP_USER_META",
            BackupStatus::BackupDataSys => "BACKUP_DATA_SYS",
            BackupStatus::BackupDataMinor => "BACKUP_DATA_MINOR",
            BackupStatus::BackupDataMajor => "BACKUP_DATA_MAJOR",
            BackupStatus::BackupLog => "BACKUP_LOG",
        }
    }
}

impl BackupStatus {
    /// Case-insensitive parse of a catalog status string
    pub fn parse(value: &str) -> Result<Self> {
        Self::from_name_ignore_case(value)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BackupStatus::Completed | BackupStatus::Failed | BackupStatus::Canceled
        )
    }

    /// Data type backed up during a data phase
    pub fn backup_data_type(self) -> Result<BackupDataType> {
        match self {
            BackupStatus::BackupDataSys => Ok(BackupDataType::Sys),
            BackupStatus::BackupDataMinor => Ok(BackupDataType::Minor),
            BackupStatus::BackupDataMajor => Ok(BackupDataType::Major),
            other => Err(Error::invalid_argument(format!(
                "backup status {} has no data type",
                other
            ))),
        }
    }
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Class of tablet data copied by a data phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupDataType {
    Sys,
    Minor,
    Major,
}

impl NamedEnum for BackupDataType {
    const ALL: &'static [Self] = &[BackupDataType::Sys, BackupDataType::Minor, BackupDataType::Major];
    const TYPE_NAME: &'static str = "backup data type";

    fn name(self) -> &'static str {
        match self {
            BackupDataType::Sys => "SYS",
            BackupDataType::Minor => "MINOR",
            BackupDataType::Major => "MAJOR",
        }
    }
}

/// Scope a backup job was started at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupLevel {
    #[default]
    Cluster,
    SysTenant,
    UserTenant,
}

impl NamedEnum for BackupLevel {
    const ALL: &'static [Self] = &[
        BackupLevel::Cluster,
        BackupLevel::SysTenant,
        BackupLevel::UserTenant,
    ];
    const TYPE_NAME: &'static str = "backup level";

    fn name(self) -> &'static str {
        match self {
            BackupLevel::Cluster => "CLUSTER",
            BackupLevel::SysTenant => "SYS_TENANT",
            BackupLevel::UserTenant => "USER_TENANT",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncryptionMode {
    #[default]
    None,
    Password,
    PasswordEncryption,
    TransparentEncryption,
    DualMode,
}

impl NamedEnum for EncryptionMode {
    const ALL: &'static [Self] = &[
        EncryptionMode::None,
        EncryptionMode::Password,
        EncryptionMode::PasswordEncryption,
        EncryptionMode::TransparentEncryption,
        EncryptionMode::DualMode,
    ];
    const TYPE_NAME: &'static str = "encryption mode";

    fn name(self) -> &'static str {
        match self {
            EncryptionMode::None => "NONE",
            EncryptionMode::Password => "PASSWORD",
            EncryptionMode::PasswordEncryption => "PASSWORD_ENCRYPTION",
            EncryptionMode::TransparentEncryption => "TRANSPARENT_ENCRYPTION",
            EncryptionMode::DualMode => "DUAL_MODE",
        }
    }
}

impl EncryptionMode {
    /// Whether restoring requires the backup password
    pub fn need_passwd(self) -> bool {
        matches!(
            self,
            EncryptionMode::Password | EncryptionMode::PasswordEncryption | EncryptionMode::DualMode
        )
    }
}

/// Progress counters rolled up from LS tasks into set tasks and jobs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackupStats {
    pub input_bytes: i64,
    pub output_bytes: i64,
    pub tablet_count: i64,
    pub finish_tablet_count: i64,
    pub macro_block_count: i64,
    pub finish_macro_block_count: i64,
    pub extra_bytes: i64,
    pub finish_file_count: i64,
}

impl BackupStats {
    pub fn is_valid(&self) -> bool {
        self.input_bytes >= 0
            && self.output_bytes >= 0
            && self.tablet_count >= 0
            && self.finish_tablet_count >= 0
            && self.macro_block_count >= 0
            && self.finish_macro_block_count >= 0
            && self.extra_bytes >= 0
            && self.finish_file_count >= 0
    }

    /// Element-wise sum; on overflow `self` is left unchanged
    pub fn cum_with(&mut self, other: &BackupStats) -> Result<()> {
        let add = |field: &str, a: i64, b: i64| {
            a.checked_add(b).ok_or_else(|| {
                warn!("Backup stats {} overflows: {} + {}", field, a, b);
                Error::size_overflow(format!("backup stats {} overflows: {} + {}", field, a, b))
            })
        };
        *self = BackupStats {
            input_bytes: add("input_bytes", self.input_bytes, other.input_bytes)?,
            output_bytes: add("output_bytes", self.output_bytes, other.output_bytes)?,
            tablet_count: add("tablet_count", self.tablet_count, other.tablet_count)?,
            finish_tablet_count: add(
                "finish_tablet_count",
                self.finish_tablet_count,
                other.finish_tablet_count,
            )?,
            macro_block_count: add(
                "macro_block_count",
                self.macro_block_count,
                other.macro_block_count,
            )?,
            finish_macro_block_count: add(
                "finish_macro_block_count",
                self.finish_macro_block_count,
                other.finish_macro_block_count,
            )?,
            extra_bytes: add("extra_bytes", self.extra_bytes, other.extra_bytes)?,
            finish_file_count: add(
                "finish_file_count",
                self.finish_file_count,
                other.finish_file_count,
            )?,
        };
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Parse a comma-separated tenant id list
pub fn parse_tenant_ids(value: &str) -> Result<BTreeSet<u64>> {
    if value.is_empty() {
        return Err(Error::invalid_argument("tenant id list is empty"));
    }
    value
        .split(',')
        .filter(|token| !token.is_empty())
        .map(|token| {
            token.trim().parse::<u64>().map_err(|_| {
                Error::invalid_argument(format!("invalid tenant id {:?} in {:?}", token, value))
            })
        })
        .collect()
}

/// Render tenant ids as a comma-separated list, ascending
pub fn format_tenant_ids(ids: &BTreeSet<u64>) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// One row of the backup job table; identity is `(tenant_id, job_id)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupJobAttr {
    pub job_id: i64,
    pub tenant_id: u64,
    pub incarnation_id: i64,
    pub backup_set_id: i64,
    pub initiator_tenant_id: u64,
    pub initiator_job_id: i64,
    pub executor_tenant_ids: BTreeSet<u64>,
    pub plus_archivelog: bool,
    pub backup_level: BackupLevel,
    pub backup_type: BackupType,
    pub encryption_mode: EncryptionMode,
    pub passwd: String,
    pub backup_path: String,
    pub description: String,
    pub start_ts: i64,
    pub end_ts: i64,
    pub status: Option<BackupStatus>,
    pub result: i32,
    pub can_retry: bool,
    pub retry_count: i64,
}

impl Default for BackupJobAttr {
    fn default() -> Self {
        Self {
            job_id: 0,
            tenant_id: INVALID_TENANT_ID,
            incarnation_id: 0,
            backup_set_id: 0,
            initiator_tenant_id: INVALID_TENANT_ID,
            initiator_job_id: 0,
            executor_tenant_ids: BTreeSet::new(),
            plus_archivelog: false,
            backup_level: BackupLevel::default(),
            backup_type: BackupType::Empty,
            encryption_mode: EncryptionMode::None,
            passwd: String::new(),
            backup_path: String::new(),
            description: String::new(),
            start_ts: 0,
            end_ts: 0,
            status: None,
            result: 0,
            can_retry: true,
            retry_count: 0,
        }
    }
}

impl BackupJobAttr {
    pub fn key(&self) -> (u64, i64) {
        (self.tenant_id, self.job_id)
    }

    /// Enough set to act as a template for per-tenant jobs
    pub fn is_template_valid(&self) -> bool {
        self.tenant_id != INVALID_TENANT_ID && self.initiator_tenant_id != INVALID_TENANT_ID
    }

    pub fn is_valid(&self) -> bool {
        self.is_template_valid()
            && self.backup_type.is_valid()
            && self.incarnation_id > 0
            && self.start_ts > 0
            && self.status.is_some()
    }

    /// Copy every field from `other`; an invalid source leaves `self` untouched
    pub fn assign(&mut self, other: &BackupJobAttr) -> Result<()> {
        if !other.is_valid() {
            warn!("Refusing to assign invalid backup job: {:?}", other.key());
            return Err(Error::invalid_argument(format!(
                "invalid backup job attr (tenant {}, job {})",
                other.tenant_id, other.job_id
            )));
        }
        self.clone_from(other);
        Ok(())
    }

    pub fn plus_archivelog_str(&self) -> &'static str {
        on_off(self.plus_archivelog)
    }

    pub fn set_plus_archivelog(&mut self, value: &str) -> Result<()> {
        self.plus_archivelog = parse_on_off(value)?;
        Ok(())
    }

    /// Replace the executor tenants from a comma-separated list
    pub fn set_executor_tenant_ids(&mut self, value: &str) -> Result<()> {
        self.executor_tenant_ids = parse_tenant_ids(value)?;
        Ok(())
    }

    pub fn executor_tenant_ids_str(&self) -> String {
        format_tenant_ids(&self.executor_tenant_ids)
    }

    pub fn status_str(&self) -> &'static str {
        self.status.map_or("UNKNOWN", BackupStatus::name)
    }
}

/// Scheduler state of the cluster-level backup info
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupInfoStatus {
    #[default]
    Stop,
    Prepare,
    Schedule,
    Doing,
    Cancel,
    Cleanup,
}

impl NamedEnum for BackupInfoStatus {
    const ALL: &'static [Self] = &[
        BackupInfoStatus::Stop,
        BackupInfoStatus::Prepare,
        BackupInfoStatus::Schedule,
        BackupInfoStatus::Doing,
        BackupInfoStatus::Cancel,
        BackupInfoStatus::Cleanup,
    ];
    const TYPE_NAME: &'static str = "backup info status";

    fn name(self) -> &'static str {
        match self {
            BackupInfoStatus::Stop => "STOP",
            BackupInfoStatus::Prepare => "PREPARE",
            BackupInfoStatus::Schedule => "SCHEDULE",
            BackupInfoStatus::Doing => "DOING",
            BackupInfoStatus::Cancel => "CANCEL",
            BackupInfoStatus::Cleanup => "CLEANUP",
        }
    }
}

/// Backup info shared by the leader and followers; compared to detect divergence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseBackupInfo {
    pub backup_dest: String,
    pub tenant_id: u64,
    pub backup_set_id: i64,
    pub incarnation: i64,
    pub backup_snapshot_version: i64,
    pub backup_schema_version: i64,
    pub backup_data_version: i64,
    pub backup_type: BackupType,
    pub backup_status: BackupInfoStatus,
    pub backup_task_id: i64,
    pub encryption_mode: EncryptionMode,
    pub passwd: String,
}

impl BaseBackupInfo {
    pub fn is_valid(&self) -> bool {
        self.tenant_id != INVALID_TENANT_ID
    }

    /// Whether a stopped info has been fully cleared
    pub fn has_cleaned(&self) -> bool {
        self.is_valid()
            && self.backup_status == BackupInfoStatus::Stop
            && self.backup_snapshot_version == 0
            && self.backup_schema_version == 0
            && self.backup_data_version == 0
            && self.backup_type == BackupType::Empty
    }

    pub fn assign(&mut self, other: &BaseBackupInfo) -> Result<()> {
        if !other.is_valid() {
            return Err(Error::invalid_argument("invalid base backup info"));
        }
        self.clone_from(other);
        Ok(())
    }

    /// Fail with `BackupInfoNotMatch` when any persisted field differs
    pub fn check_backup_info_match(&self, other: &BaseBackupInfo) -> Result<()> {
        if !other.is_valid() {
            return Err(Error::invalid_argument("invalid base backup info"));
        }
        let matched = self.backup_dest == other.backup_dest
            && self.tenant_id == other.tenant_id
            && self.backup_set_id == other.backup_set_id
            && self.incarnation == other.incarnation
            && self.backup_snapshot_version == other.backup_snapshot_version
            && self.backup_schema_version == other.backup_schema_version
            && self.backup_data_version == other.backup_data_version
            && self.backup_type == other.backup_type
            && self.backup_status == other.backup_status
            && self.encryption_mode == other.encryption_mode
            && self.passwd == other.passwd;
        if !matched {
            warn!(
                "Backup info does not match: tenant {} set {} vs tenant {} set {}",
                self.tenant_id, self.backup_set_id, other.tenant_id, other.backup_set_id
            );
            return Err(Error::backup_info_not_match(format!(
                "backup info of tenant {} does not match",
                self.tenant_id
            )));
        }
        Ok(())
    }
}
