//! Backup set identity: id plus full/incremental type

use crate::names::NamedEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use strata_core::{Error, Result};

/// Whether a backup set is a full or incremental copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupType {
    /// Unset
    #[default]
    Empty,
    Full,
    Incremental,
}

impl NamedEnum for BackupType {
    const ALL: &'static [Self] = &[BackupType::Empty, BackupType::Full, BackupType::Incremental];
    const TYPE_NAME: &'static str = "backup type";

    fn name(self) -> &'static str {
        match self {
            BackupType::Empty => "",
            BackupType::Full => "FULL",
            BackupType::Incremental => "INC",
        }
    }
}

impl BackupType {
    pub fn is_valid(self) -> bool {
        self != BackupType::Empty
    }

    pub fn is_full(self) -> bool {
        self == BackupType::Full
    }
}

impl fmt::Display for BackupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Identity of one backup set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackupSetDesc {
    pub backup_set_id: i64,
    pub backup_type: BackupType,
}

impl BackupSetDesc {
    pub fn new(backup_set_id: i64, backup_type: BackupType) -> Self {
        Self {
            backup_set_id,
            backup_type,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.backup_set_id > 0
    }

    /// Copy from `other`, refusing an invalid source
    pub fn assign(&mut self, other: &BackupSetDesc) -> Result<()> {
        if !other.is_valid() {
            return Err(Error::invalid_argument(format!(
                "invalid backup set desc {:?}",
                other
            )));
        }
        *self = *other;
        Ok(())
    }
}
