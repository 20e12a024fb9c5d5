//! Ordered destination path lists and their catalog encodings.
//!
//! Restore reads its sources from three independent path lists (backup set
//! paths, backup piece paths and log paths) plus one backup set descriptor
//! per backup set path. Each list persists into a bounded text column in
//! one of two encodings:
//!
//! - plain: `path1,path2` or `1:FULL,2:INC`
//! - hex: the bincode-serialized list rendered as uppercase hex digits

use crate::dest::MAX_BACKUP_DEST_LENGTH;
use crate::names::NamedEnum;
use crate::set_desc::{BackupSetDesc, BackupType};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use strata_core::config::{CodecConfig, MAX_LONGTEXT_LENGTH};
use strata_core::{Error, Result};
use tracing::warn;

const SEPARATOR: char = ',';
/// Longest backup type name accepted in a descriptor token
const MAX_TYPE_TOKEN_LEN: usize = 5;

/// Owned destination path, bounded by the destination length limit
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BackupPathString(String);

impl BackupPathString {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if path.len() >= MAX_BACKUP_DEST_LENGTH {
            return Err(Error::size_overflow(format!(
                "backup path is too long: {}",
                path.len()
            )));
        }
        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<String> for BackupPathString {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<BackupPathString> for String {
    fn from(value: BackupPathString) -> Self {
        value.0
    }
}

impl fmt::Display for BackupPathString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An element that can live in a comma-separated plain list
pub trait PlainToken: Sized {
    fn encode_token(&self) -> Result<String>;
    fn decode_token(token: &str) -> Result<Self>;
}

impl PlainToken for BackupPathString {
    fn encode_token(&self) -> Result<String> {
        if self.0.is_empty() || self.0.contains(SEPARATOR) {
            return Err(Error::invalid_argument(format!(
                "path {:?} cannot be stored in a plain list",
                self.0
            )));
        }
        Ok(self.0.clone())
    }

    fn decode_token(token: &str) -> Result<Self> {
        Self::new(token)
    }
}

impl PlainToken for BackupSetDesc {
    fn encode_token(&self) -> Result<String> {
        if !self.backup_type.is_valid() {
            return Err(Error::invalid_argument(format!(
                "backup set {} has no backup type",
                self.backup_set_id
            )));
        }
        Ok(format!("{}:{}", self.backup_set_id, self.backup_type.name()))
    }

    /// Scan `<id>:<type>` where the id must be positive and the type is read as at most
    /// five non-blank characters
    fn decode_token(token: &str) -> Result<Self> {
        let malformed =
            || Error::invalid_argument(format!("invalid backup set desc token {:?}", token));
        let (id, rest) = token.split_once(':').ok_or_else(malformed)?;
        let backup_set_id: i64 = id.trim_start().parse().map_err(|_| malformed())?;
        if backup_set_id <= 0 {
            return Err(malformed());
        }
        let type_str: String = rest
            .trim_start()
            .chars()
            .take_while(|c| !c.is_whitespace())
            .take(MAX_TYPE_TOKEN_LEN)
            .collect();
        if type_str.is_empty() {
            return Err(malformed());
        }
        let backup_type = match BackupType::from_name(&type_str) {
            Ok(t) if t.is_valid() => t,
            _ => return Err(malformed()),
        };
        Ok(BackupSetDesc::new(backup_set_id, backup_type))
    }
}

/// Plain and hex list codec bounded by the catalog text column size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListCodec {
    max_text_length: usize,
}

impl Default for ListCodec {
    fn default() -> Self {
        Self {
            max_text_length: MAX_LONGTEXT_LENGTH,
        }
    }
}

impl ListCodec {
    pub fn new(config: &CodecConfig) -> Self {
        Self::with_max_text_length(config.max_text_length)
    }

    pub fn with_max_text_length(max_text_length: usize) -> Self {
        Self { max_text_length }
    }

    pub fn max_text_length(&self) -> usize {
        self.max_text_length
    }

    fn check_fits(&self, size: usize, what: &str) -> Result<()> {
        if size > self.max_text_length {
            warn!(
                "Encoded {} needs {} bytes, limit is {}",
                what, size, self.max_text_length
            );
            return Err(Error::size_overflow(format!(
                "{} needs {} bytes, limit is {}",
                what, size, self.max_text_length
            )));
        }
        Ok(())
    }

    fn encode_tokens<T: PlainToken>(items: &[T]) -> Result<Vec<String>> {
        items.iter().map(PlainToken::encode_token).collect()
    }

    /// Byte length of the plain encoding of `items`
    pub fn plain_required_size<T: PlainToken>(&self, items: &[T]) -> Result<usize> {
        let tokens = Self::encode_tokens(items)?;
        Ok(tokens.iter().map(String::len).sum::<usize>() + tokens.len().saturating_sub(1))
    }

    /// Comma-join the items; an empty list encodes to an empty string
    pub fn encode_plain<T: PlainToken>(&self, items: &[T]) -> Result<String> {
        let tokens = Self::encode_tokens(items)?;
        let size = tokens.iter().map(String::len).sum::<usize>() + tokens.len().saturating_sub(1);
        self.check_fits(size, "plain list")?;
        let mut out = String::with_capacity(size);
        for (i, token) in tokens.iter().enumerate() {
            if i > 0 {
                out.push(SEPARATOR);
            }
            out.push_str(token);
        }
        Ok(out)
    }

    /// Split on `,`, skipping empty tokens, and parse each token
    pub fn decode_plain<T: PlainToken>(&self, text: &str) -> Result<Vec<T>> {
        self.check_fits(text.len(), "plain list")?;
        text.split(SEPARATOR)
            .filter(|token| !token.is_empty())
            .map(T::decode_token)
            .collect()
    }

    /// Byte length of the hex encoding of `items`
    pub fn hex_required_size<T: Serialize>(&self, items: &[T]) -> Result<usize> {
        let size = bincode::serialized_size(items)
            .map_err(|e| Error::invalid_argument(format!("failed to size list: {}", e)))?;
        usize::try_from(size)
            .ok()
            .and_then(|s| s.checked_mul(2))
            .ok_or_else(|| Error::size_overflow(format!("list serializes to {} bytes", size)))
    }

    /// Serialize with bincode and render as uppercase hex
    pub fn encode_hex<T: Serialize>(&self, items: &[T]) -> Result<String> {
        let size = self.hex_required_size(items)?;
        self.check_fits(size, "hex list")?;
        let bytes = bincode::serialize(items)
            .map_err(|e| Error::invalid_argument(format!("failed to serialize list: {}", e)))?;
        Ok(hex::encode_upper(bytes))
    }

    /// Inverse of [`ListCodec::encode_hex`]; empty input decodes to an empty list
    pub fn decode_hex<T: Serialize + DeserializeOwned>(&self, text: &str) -> Result<Vec<T>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        self.check_fits(text.len(), "hex list")?;
        let bytes = hex::decode(text)
            .map_err(|e| Error::invalid_argument(format!("invalid hex list: {}", e)))?;
        let items: Vec<T> = bincode::deserialize(&bytes).map_err(|e| match *e {
            bincode::ErrorKind::Io(ref io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                Error::size_overflow(format!("hex list is truncated: {}", e))
            }
            _ => Error::invalid_argument(format!("failed to deserialize hex list: {}", e)),
        })?;
        let consumed = bincode::serialized_size(&items)
            .map_err(|e| Error::invalid_argument(format!("failed to size list: {}", e)))?;
        if consumed != bytes.len() as u64 {
            return Err(Error::invalid_argument(format!(
                "hex list has {} trailing bytes",
                bytes.len() as u64 - consumed.min(bytes.len() as u64)
            )));
        }
        Ok(items)
    }
}

/// One backup set path paired with its descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreBackupSetBriefInfo {
    pub backup_set_path: BackupPathString,
    pub backup_set_desc: BackupSetDesc,
}

/// Which path list of a [`RestoreBackupDestList`] to address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathListKind {
    BackupSet,
    BackupPiece,
    LogPath,
}

/// Sources a physical restore reads from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreBackupDestList {
    backup_set_paths: Vec<BackupPathString>,
    backup_set_descs: Vec<BackupSetDesc>,
    backup_piece_paths: Vec<BackupPathString>,
    log_paths: Vec<BackupPathString>,
}

impl RestoreBackupDestList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all lists; set paths and descriptors come from the brief infos in order
    pub fn set(
        &mut self,
        backup_sets: &[RestoreBackupSetBriefInfo],
        backup_piece_paths: &[BackupPathString],
        log_paths: &[BackupPathString],
    ) {
        self.backup_set_paths = backup_sets
            .iter()
            .map(|info| info.backup_set_path.clone())
            .collect();
        self.backup_set_descs = backup_sets.iter().map(|info| info.backup_set_desc).collect();
        self.backup_piece_paths = backup_piece_paths.to_vec();
        self.log_paths = log_paths.to_vec();
    }

    pub fn paths(&self, kind: PathListKind) -> &[BackupPathString] {
        match kind {
            PathListKind::BackupSet => &self.backup_set_paths,
            PathListKind::BackupPiece => &self.backup_piece_paths,
            PathListKind::LogPath => &self.log_paths,
        }
    }

    fn paths_mut(&mut self, kind: PathListKind) -> &mut Vec<BackupPathString> {
        match kind {
            PathListKind::BackupSet => &mut self.backup_set_paths,
            PathListKind::BackupPiece => &mut self.backup_piece_paths,
            PathListKind::LogPath => &mut self.log_paths,
        }
    }

    pub fn backup_set_descs(&self) -> &[BackupSetDesc] {
        &self.backup_set_descs
    }

    /// Zip set descriptors with set paths
    pub fn brief_info_list(&self) -> Result<Vec<RestoreBackupSetBriefInfo>> {
        if self.backup_set_descs.len() != self.backup_set_paths.len() {
            return Err(Error::unexpected(format!(
                "backup set desc list has {} entries but backup set path list has {}",
                self.backup_set_descs.len(),
                self.backup_set_paths.len()
            )));
        }
        Ok(self
            .backup_set_paths
            .iter()
            .zip(&self.backup_set_descs)
            .map(|(path, desc)| RestoreBackupSetBriefInfo {
                backup_set_path: path.clone(),
                backup_set_desc: *desc,
            })
            .collect())
    }

    pub fn format_str(&self, codec: &ListCodec, kind: PathListKind) -> Result<String> {
        codec.encode_plain(self.paths(kind))
    }

    pub fn format_str_len(&self, codec: &ListCodec, kind: PathListKind) -> Result<usize> {
        codec.plain_required_size(self.paths(kind))
    }

    pub fn hex_str(&self, codec: &ListCodec, kind: PathListKind) -> Result<String> {
        codec.encode_hex(self.paths(kind))
    }

    pub fn hex_str_len(&self, codec: &ListCodec, kind: PathListKind) -> Result<usize> {
        codec.hex_required_size(self.paths(kind))
    }

    /// Replace a path list from its plain encoding; the list is untouched on failure
    pub fn assign_with_format_str(
        &mut self,
        codec: &ListCodec,
        kind: PathListKind,
        text: &str,
    ) -> Result<()> {
        *self.paths_mut(kind) = codec.decode_plain(text)?;
        Ok(())
    }

    /// Replace a path list from its hex encoding; the list is untouched on failure
    pub fn assign_with_hex_str(
        &mut self,
        codec: &ListCodec,
        kind: PathListKind,
        text: &str,
    ) -> Result<()> {
        *self.paths_mut(kind) = codec.decode_hex(text)?;
        Ok(())
    }

    pub fn backup_set_desc_format_str(&self, codec: &ListCodec) -> Result<String> {
        codec.encode_plain(&self.backup_set_descs)
    }

    pub fn backup_set_desc_hex_str(&self, codec: &ListCodec) -> Result<String> {
        codec.encode_hex(&self.backup_set_descs)
    }

    pub fn backup_set_desc_assign_with_format_str(
        &mut self,
        codec: &ListCodec,
        text: &str,
    ) -> Result<()> {
        self.backup_set_descs = codec.decode_plain(text)?;
        Ok(())
    }

    pub fn backup_set_desc_assign_with_hex_str(
        &mut self,
        codec: &ListCodec,
        text: &str,
    ) -> Result<()> {
        self.backup_set_descs = codec.decode_hex(text)?;
        Ok(())
    }
}
