//! Backup destination addressing.
//!
//! A destination is a storage URI plus the credentials needed to reach it:
//!
//! ```text
//! oss://bucket/backup?host=oss.example.com&access_id=AK&access_key=SK&delete_mode=tagging
//! file:///data/backup
//! ```
//!
//! FILE destinations never carry credentials; every other kind must.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use strata_core::utils::trim_right_slash;
use strata_core::{Error, Result};
use tracing::{debug, warn};

/// Maximum length of a full destination string (exclusive)
pub const MAX_BACKUP_DEST_LENGTH: usize = 2048;
/// Maximum length of the root path part (exclusive)
pub const MAX_BACKUP_PATH_LENGTH: usize = 1024;
/// Maximum length of the query part (exclusive)
pub const MAX_BACKUP_STORAGE_INFO_LENGTH: usize = 1536;

const HOST: &str = "host=";
const ACCESS_ID: &str = "access_id=";
const ACCESS_KEY: &str = "access_key=";
const APPID: &str = "appid=";
const DELETE_MODE: &str = "delete_mode=";

/// Storage backend, derived from the URI scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKind {
    File,
    Oss,
    Cos,
    S3,
}

impl StorageKind {
    pub fn prefix(self) -> &'static str {
        match self {
            StorageKind::File => "file://",
            StorageKind::Oss => "oss://",
            StorageKind::Cos => "cos://",
            StorageKind::S3 => "s3://",
        }
    }

    /// Derive the storage kind from a URI scheme
    pub fn from_uri(uri: &str) -> Result<Self> {
        [
            StorageKind::File,
            StorageKind::Oss,
            StorageKind::Cos,
            StorageKind::S3,
        ]
        .into_iter()
        .find(|kind| uri.starts_with(kind.prefix()))
        .ok_or_else(|| Error::invalid_backup_dest(format!("unknown storage scheme in {:?}", uri)))
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StorageKind::File => "FILE",
            StorageKind::Oss => "OSS",
            StorageKind::Cos => "COS",
            StorageKind::S3 => "S3",
        };
        write!(f, "{}", s)
    }
}

/// How OSS removes expired objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeleteMode {
    Delete,
    Tagging,
}

impl DeleteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DeleteMode::Delete => "delete",
            DeleteMode::Tagging => "tagging",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "delete" => Ok(DeleteMode::Delete),
            "tagging" => Ok(DeleteMode::Tagging),
            other => Err(Error::invalid_argument(format!(
                "delete_mode must be delete or tagging, got {:?}",
                other
            ))),
        }
    }
}

/// Endpoint and access key pair of a remote store
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credentials {
    pub endpoint: String,
    pub access_id: String,
    pub access_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("access_id", &self.access_id)
            .field("access_key", &"<redacted>")
            .finish()
    }
}

/// Kind-specific trailing parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageExtension {
    /// COS application id
    AppId(String),
    /// OSS object removal mode
    DeleteMode(DeleteMode),
}

impl fmt::Display for StorageExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageExtension::AppId(appid) => write!(f, "{}{}", APPID, appid),
            StorageExtension::DeleteMode(mode) => write!(f, "{}{}", DELETE_MODE, mode.as_str()),
        }
    }
}

/// Parsed query part of a destination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageInfo {
    kind: StorageKind,
    credentials: Option<Credentials>,
    extension: Option<StorageExtension>,
}

impl StorageInfo {
    /// Storage info of a FILE destination
    pub fn file() -> Self {
        Self {
            kind: StorageKind::File,
            credentials: None,
            extension: None,
        }
    }

    /// Parse an `&`-delimited `key=value` list for the given storage kind.
    ///
    /// Unknown keys are ignored.
    pub fn parse(kind: StorageKind, info: &str) -> Result<Self> {
        if info.len() >= MAX_BACKUP_STORAGE_INFO_LENGTH {
            return Err(Error::invalid_backup_dest(format!(
                "storage info is too long: {}",
                info.len()
            )));
        }
        if info.is_empty() {
            return if kind == StorageKind::File {
                Ok(Self::file())
            } else {
                Err(Error::invalid_backup_dest(format!(
                    "{} destination requires storage info",
                    kind
                )))
            };
        }

        let mut endpoint = None;
        let mut access_id = None;
        let mut access_key = None;
        let mut extension = None;
        for token in info.split('&').filter(|t| !t.is_empty()) {
            if let Some(value) = token.strip_prefix(HOST) {
                endpoint = Some(value.to_string());
            } else if let Some(value) = token.strip_prefix(ACCESS_ID) {
                access_id = Some(value.to_string());
            } else if let Some(value) = token.strip_prefix(ACCESS_KEY) {
                access_key = Some(value.to_string());
            } else if let (StorageKind::Cos, Some(value)) = (kind, token.strip_prefix(APPID)) {
                extension = Some(StorageExtension::AppId(value.to_string()));
            } else if let (StorageKind::Oss, Some(value)) = (kind, token.strip_prefix(DELETE_MODE))
            {
                extension = Some(StorageExtension::DeleteMode(DeleteMode::parse(value)?));
            } else {
                debug!("Ignoring unknown storage info key in {:?}", token);
            }
        }

        let non_empty = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        let credentials = match kind {
            StorageKind::File => {
                if non_empty(&endpoint) || non_empty(&access_id) || non_empty(&access_key) {
                    return Err(Error::invalid_backup_dest(
                        "FILE destination must not carry host, access_id or access_key",
                    ));
                }
                None
            }
            _ => match (endpoint, access_id, access_key) {
                (Some(endpoint), Some(access_id), Some(access_key))
                    if !endpoint.is_empty() && !access_id.is_empty() && !access_key.is_empty() =>
                {
                    Some(Credentials {
                        endpoint,
                        access_id,
                        access_key,
                    })
                }
                _ => {
                    return Err(Error::invalid_backup_dest(format!(
                        "{} destination requires host, access_id and access_key",
                        kind
                    )))
                }
            },
        };
        if kind == StorageKind::Cos && extension.is_none() {
            return Err(Error::invalid_backup_dest("COS destination requires appid"));
        }

        Ok(Self {
            kind,
            credentials,
            extension,
        })
    }

    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn extension(&self) -> Option<&StorageExtension> {
        self.extension.as_ref()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.endpoint.as_str())
    }

    /// Render `host=..&access_id=..&access_key=..[&ext]`; empty for FILE
    pub fn to_query(&self) -> String {
        let mut query = String::new();
        if let Some(c) = &self.credentials {
            query = format!(
                "{}{}&{}{}&{}{}",
                HOST, c.endpoint, ACCESS_ID, c.access_id, ACCESS_KEY, c.access_key
            );
        }
        if let Some(ext) = &self.extension {
            if !query.is_empty() {
                query.push('&');
            }
            query.push_str(&ext.to_string());
        }
        query
    }
}

/// A validated backup destination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackupDest {
    root_path: String,
    storage_info: StorageInfo,
}

impl BackupDest {
    /// Parse `<root_path>[?<storage info>]`
    pub fn parse(dest: &str) -> Result<Self> {
        if dest.is_empty() {
            return Err(Error::invalid_argument("backup dest is empty"));
        }
        if dest.len() >= MAX_BACKUP_DEST_LENGTH {
            return Err(Error::invalid_backup_dest(format!(
                "backup dest is too long: {}",
                dest.len()
            )));
        }
        let kind = StorageKind::from_uri(dest)?;
        let (root_path, info) = dest.split_once('?').unwrap_or((dest, ""));
        Self::from_parts(kind, root_path, info).inspect_err(|e| {
            warn!("Failed to parse backup dest {}: {}", Self::redact(dest), e);
        })
    }

    /// Build a destination from a root path and a separate storage info string
    pub fn with_storage_info(root_path: &str, storage_info: &str) -> Result<Self> {
        let kind = StorageKind::from_uri(root_path)?;
        Self::from_parts(kind, root_path, storage_info)
    }

    fn from_parts(kind: StorageKind, root_path: &str, info: &str) -> Result<Self> {
        if root_path.len() >= MAX_BACKUP_PATH_LENGTH {
            return Err(Error::invalid_backup_dest(format!(
                "backup root path is too long: {}",
                root_path.len()
            )));
        }
        let trimmed = trim_right_slash(root_path);
        if trimmed.len() <= kind.prefix().len() || !trimmed.starts_with(kind.prefix()) {
            return Err(Error::invalid_backup_dest(format!(
                "backup root path {:?} has no path after the scheme",
                root_path
            )));
        }
        let storage_info = StorageInfo::parse(kind, info)?;
        Ok(Self {
            root_path: trimmed.to_string(),
            storage_info,
        })
    }

    fn redact(dest: &str) -> &str {
        dest.split_once('?').map(|(root, _)| root).unwrap_or(dest)
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn storage_info(&self) -> &StorageInfo {
        &self.storage_info
    }

    pub fn kind(&self) -> StorageKind {
        self.storage_info.kind
    }

    /// Full destination string including credentials
    pub fn format(&self) -> String {
        let query = self.storage_info.to_query();
        if query.is_empty() {
            self.root_path.clone()
        } else {
            format!("{}?{}", self.root_path, query)
        }
    }

    /// Root path plus endpoint, without secrets
    pub fn path_str(&self) -> String {
        match self.storage_info.endpoint() {
            Some(endpoint) => format!("{}?{}{}", self.root_path, HOST, endpoint),
            None => self.root_path.clone(),
        }
    }

    /// Whether two destinations point at the same place, ignoring credentials
    pub fn is_backup_path_equal(&self, other: &BackupDest) -> bool {
        self.root_path == other.root_path
            && self.storage_info.endpoint() == other.storage_info.endpoint()
    }

    pub fn is_root_path_equal(&self, other: &BackupDest) -> bool {
        self.root_path == other.root_path
    }

    /// 64-bit dedup hash combining the root path and storage info hashes.
    ///
    /// Built on `DefaultHasher`, so the value is only stable within one process
    /// and must not be persisted.
    pub fn hash_value(&self) -> u64 {
        let mut root = DefaultHasher::new();
        self.root_path.hash(&mut root);
        let mut info = DefaultHasher::new();
        self.storage_info.hash(&mut info);
        root.finish().wrapping_add(info.finish())
    }
}

impl fmt::Display for BackupDest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_str())
    }
}

impl std::str::FromStr for BackupDest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::ErrorKind;

    #[test]
    fn test_parse_file_dest_trims_slashes() {
        let dest = BackupDest::parse("file:///data/backup//").unwrap();
        assert_eq!(dest.root_path(), "file:///data/backup");
        assert_eq!(dest.kind(), StorageKind::File);
        assert!(dest.storage_info().credentials().is_none());
        assert_eq!(dest.format(), "file:///data/backup");
    }

    #[test]
    fn test_root_only_dest_rejected() {
        for dest in [
            "file:///",
            "file://",
            "oss:///?host=h&access_id=a&access_key=k",
            "s3://?host=h&access_id=a&access_key=k",
        ] {
            let err = BackupDest::parse(dest).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidBackupDestination, "dest {:?}", dest);
        }
        let err = BackupDest::with_storage_info("cos:///", "host=h&access_id=a&access_key=k&appid=1")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidBackupDestination);

        let dest = BackupDest::parse("file:///a/").unwrap();
        assert_eq!(dest.root_path(), "file:///a");
        assert_eq!(BackupDest::parse(&dest.format()).unwrap(), dest);
    }

    #[test]
    fn test_parse_oss_dest() {
        let dest = BackupDest::parse(
            "oss://bucket/backup/?host=oss.example.com&access_id=AK&access_key=SK&delete_mode=tagging",
        )
        .unwrap();
        assert_eq!(dest.root_path(), "oss://bucket/backup");
        let creds = dest.storage_info().credentials().unwrap();
        assert_eq!(creds.endpoint, "oss.example.com");
        assert_eq!(creds.access_key, "SK");
        assert_eq!(
            dest.storage_info().extension(),
            Some(&StorageExtension::DeleteMode(DeleteMode::Tagging))
        );
        assert_eq!(
            dest.format(),
            "oss://bucket/backup?host=oss.example.com&access_id=AK&access_key=SK&delete_mode=tagging"
        );
        assert_eq!(dest.path_str(), "oss://bucket/backup?host=oss.example.com");
    }

    #[test]
    fn test_field_order_is_normalized() {
        let dest =
            BackupDest::parse("oss://b/p?access_key=SK&unknown=1&host=h&access_id=AK").unwrap();
        assert_eq!(dest.format(), "oss://b/p?host=h&access_id=AK&access_key=SK");
    }

    #[test]
    fn test_bad_delete_mode() {
        let err =
            BackupDest::parse("oss://b/p?host=h&access_id=a&access_key=k&delete_mode=purge")
                .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_appid_only_for_cos() {
        let oss = BackupDest::parse("oss://b/p?host=h&access_id=a&access_key=k&appid=9").unwrap();
        assert!(oss.storage_info().extension().is_none());

        let cos = BackupDest::parse("cos://b/p?host=h&access_id=a&access_key=k&appid=9").unwrap();
        assert_eq!(
            cos.storage_info().extension(),
            Some(&StorageExtension::AppId("9".to_string()))
        );
    }

    #[test]
    fn test_file_rejects_credentials() {
        let err = BackupDest::parse("file:///data?host=h").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidBackupDestination);
    }

    #[test]
    fn test_unknown_scheme() {
        let err = BackupDest::parse("ftp://x/y").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidBackupDestination);
        assert_eq!(BackupDest::parse("").unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_length_limits() {
        let long_root = format!("file:///{}", "a".repeat(MAX_BACKUP_PATH_LENGTH));
        let err = BackupDest::parse(&long_root).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidBackupDestination);

        let long_dest = format!("file:///{}", "a".repeat(MAX_BACKUP_DEST_LENGTH));
        let err = BackupDest::parse(&long_dest).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidBackupDestination);
    }

    #[test]
    fn test_backup_path_equal_ignores_keys() {
        let a = BackupDest::parse("oss://b/p?host=h&access_id=a&access_key=k1").unwrap();
        let b = BackupDest::parse("oss://b/p/?host=h&access_id=a&access_key=k2").unwrap();
        assert!(a.is_backup_path_equal(&b));
        assert_ne!(a, b);
        assert_ne!(a.hash_value(), b.hash_value());
    }

    #[test]
    fn test_equal_dests_hash_equal() {
        let a = BackupDest::parse("cos://b/p?host=h&access_id=a&access_key=k&appid=1").unwrap();
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a.hash_value(), b.hash_value());
    }

    #[test]
    fn test_debug_redacts_access_key() {
        let dest = BackupDest::parse("oss://b/p?host=h&access_id=a&access_key=secret").unwrap();
        let debug = format!("{:?}", dest);
        assert!(!debug.contains("secret"));
        assert!(!dest.to_string().contains("secret"));
    }
}
