//! Fixed binary header that prefixes every backup data file.
//!
//! Layout (48 bytes, little endian):
//!
//! | offset | size | field           |
//! |--------|------|-----------------|
//! | 0      | 2    | header_version  |
//! | 2      | 1    | compressor_type |
//! | 3      | 1    | reserved        |
//! | 4      | 2    | data_type       |
//! | 6      | 2    | header_length   |
//! | 8      | 8    | data_length     |
//! | 16     | 8    | data_zlength    |
//! | 24     | 8    | data_checksum   |
//! | 32     | 8    | align_length    |
//! | 40     | 2    | header_checksum |
//! | 42     | 6    | reserved        |

use crc::{Crc, CRC_64_ECMA_182};
use serde::{Deserialize, Serialize};
use strata_core::{Error, Result};
use tracing::warn;

pub const COMMON_HEADER_VERSION: u16 = 1;
pub const COMMON_HEADER_LENGTH: usize = 48;

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

/// CRC64 (ECMA-182) of a payload, as stored in `data_checksum`
pub fn crc64(buf: &[u8]) -> i64 {
    CRC64.checksum(buf) as i64
}

/// Compression applied to the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum CompressorType {
    Invalid = 0,
    None = 1,
    Lz4 = 2,
    Snappy = 3,
    Zlib = 4,
    Zstd = 5,
}

impl CompressorType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CompressorType::Invalid),
            1 => Some(CompressorType::None),
            2 => Some(CompressorType::Lz4),
            3 => Some(CompressorType::Snappy),
            4 => Some(CompressorType::Zlib),
            5 => Some(CompressorType::Zstd),
            _ => None,
        }
    }
}

/// Kind of payload following the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum BackupFileType {
    TenantMeta = 0,
    LsMeta = 1,
    TabletMeta = 2,
    MacroData = 3,
    MacroIndex = 4,
    MetaIndex = 5,
    ArchiveLog = 6,
    ArchiveIndex = 7,
    PieceInfo = 8,
}

impl BackupFileType {
    /// Exclusive upper bound of valid data type codes
    pub const MAX: u16 = 9;
}

/// Header as persisted; fields stay raw so corrupt input can be represented and rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupCommonHeader {
    pub header_version: u16,
    pub compressor_type: u8,
    pub data_type: u16,
    pub header_length: u16,
    pub data_length: i64,
    pub data_zlength: i64,
    pub data_checksum: i64,
    pub align_length: i64,
    pub header_checksum: i16,
}

impl Default for BackupCommonHeader {
    fn default() -> Self {
        Self {
            header_version: COMMON_HEADER_VERSION,
            compressor_type: CompressorType::Invalid as u8,
            data_type: BackupFileType::MAX,
            header_length: COMMON_HEADER_LENGTH as u16,
            data_length: 0,
            data_zlength: 0,
            data_checksum: 0,
            align_length: 0,
            header_checksum: 0,
        }
    }
}

fn fold_i64(value: i64, checksum: &mut i16) {
    for i in 0..4 {
        *checksum ^= ((value >> (i * 16)) & 0xFFFF) as i16;
    }
}

impl BackupCommonHeader {
    /// Header for an uncompressed payload of the given type
    pub fn new(data_type: BackupFileType) -> Self {
        Self {
            compressor_type: CompressorType::None as u8,
            data_type: data_type as u16,
            ..Self::default()
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn compressor(&self) -> Option<CompressorType> {
        CompressorType::from_u8(self.compressor_type)
    }

    /// 16-bit XOR fold over every field except the checksum itself
    pub fn calc_header_checksum(&self) -> i16 {
        let mut checksum: i16 = 0;
        checksum ^= self.header_version as i16;
        checksum ^= self.compressor_type as i16;
        checksum ^= self.data_type as i16;
        checksum ^= self.header_length as i16;
        fold_i64(self.data_length, &mut checksum);
        fold_i64(self.data_zlength, &mut checksum);
        fold_i64(self.data_checksum, &mut checksum);
        fold_i64(self.align_length, &mut checksum);
        checksum
    }

    pub fn set_header_checksum(&mut self) {
        self.header_checksum = self.calc_header_checksum();
    }

    /// Record the payload checksum; `buf` must be the stored (compressed) payload
    pub fn set_checksum(&mut self, buf: &[u8]) -> Result<()> {
        if buf.len() as i64 != self.data_zlength {
            return Err(Error::invalid_argument(format!(
                "payload length {} does not match data_zlength {}",
                buf.len(),
                self.data_zlength
            )));
        }
        self.data_checksum = crc64(buf);
        self.set_header_checksum();
        Ok(())
    }

    pub fn check_header_checksum(&self) -> Result<()> {
        let checksum = self.calc_header_checksum();
        if checksum != self.header_checksum {
            warn!(
                "Backup header checksum mismatch: stored {} computed {}",
                self.header_checksum, checksum
            );
            return Err(Error::checksum_error(format!(
                "header checksum {} does not match computed {}",
                self.header_checksum, checksum
            )));
        }
        Ok(())
    }

    /// Structural validation followed by the header checksum
    pub fn check_valid(&self) -> Result<()> {
        let compressor = self.compressor();
        let reason = if self.header_version != COMMON_HEADER_VERSION {
            Some("unknown header version")
        } else if matches!(compressor, None | Some(CompressorType::Invalid)) {
            Some("invalid compressor")
        } else if compressor == Some(CompressorType::None) && self.data_length != self.data_zlength {
            Some("uncompressed payload with differing lengths")
        } else if self.data_type >= BackupFileType::MAX {
            Some("data type out of range")
        } else if self.header_length as usize != COMMON_HEADER_LENGTH {
            Some("unexpected header length")
        } else if self.align_length < 0 {
            Some("negative align length")
        } else {
            None
        };
        if let Some(reason) = reason {
            warn!("Invalid backup header ({}): {:?}", reason, self);
            return Err(Error::invalid_data(format!("invalid backup header: {}", reason)));
        }
        self.check_header_checksum()
    }

    pub fn is_compressed_data(&self) -> bool {
        self.data_length != self.data_zlength
            || self.compressor_type > CompressorType::None as u8
    }

    /// Verify the stored payload against `data_zlength` and `data_checksum`
    pub fn check_data_checksum(&self, buf: &[u8]) -> Result<()> {
        if buf.is_empty()
            && (self.data_length != 0 || self.data_zlength != 0 || self.data_checksum != 0)
        {
            return Err(Error::invalid_argument(
                "empty payload but header records data",
            ));
        }
        if buf.len() as i64 != self.data_zlength {
            return Err(Error::invalid_argument(format!(
                "payload length {} does not match data_zlength {}",
                buf.len(),
                self.data_zlength
            )));
        }
        let checksum = crc64(buf);
        if checksum != self.data_checksum {
            warn!(
                "Backup payload checksum mismatch: stored {} computed {}",
                self.data_checksum, checksum
            );
            return Err(Error::checksum_error(format!(
                "data checksum {} does not match computed {}",
                self.data_checksum, checksum
            )));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; COMMON_HEADER_LENGTH] {
        let mut out = [0u8; COMMON_HEADER_LENGTH];
        out[0..2].copy_from_slice(&self.header_version.to_le_bytes());
        out[2] = self.compressor_type;
        out[4..6].copy_from_slice(&self.data_type.to_le_bytes());
        out[6..8].copy_from_slice(&self.header_length.to_le_bytes());
        out[8..16].copy_from_slice(&self.data_length.to_le_bytes());
        out[16..24].copy_from_slice(&self.data_zlength.to_le_bytes());
        out[24..32].copy_from_slice(&self.data_checksum.to_le_bytes());
        out[32..40].copy_from_slice(&self.align_length.to_le_bytes());
        out[40..42].copy_from_slice(&self.header_checksum.to_le_bytes());
        out
    }

    /// Decode the leading header bytes of `buf` without validating them
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let bytes: &[u8; COMMON_HEADER_LENGTH] = buf
            .get(..COMMON_HEADER_LENGTH)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| {
                Error::size_overflow(format!(
                    "need {} header bytes, got {}",
                    COMMON_HEADER_LENGTH,
                    buf.len()
                ))
            })?;
        let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        let i64_at = |i: usize| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[i..i + 8]);
            i64::from_le_bytes(raw)
        };
        Ok(Self {
            header_version: u16_at(0),
            compressor_type: bytes[2],
            data_type: u16_at(4),
            header_length: u16_at(6),
            data_length: i64_at(8),
            data_zlength: i64_at(16),
            data_checksum: i64_at(24),
            align_length: i64_at(32),
            header_checksum: i16::from_le_bytes([bytes[40], bytes[41]]),
        })
    }
}
