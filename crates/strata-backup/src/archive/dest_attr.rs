//! Attributes of a log archive destination as set by the operator

use crate::dest::BackupDest;
use crate::names::NamedEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use strata_core::config::ArchiveConfig;
use strata_core::utils::{parse_time_us, timestamp_to_timestr, US_PER_DAY, US_PER_SEC};
use strata_core::{Error, Result};

pub const MIN_PIECE_SWITCH_INTERVAL_US: i64 = US_PER_DAY;
pub const DEFAULT_PIECE_SWITCH_INTERVAL_US: i64 = US_PER_DAY;
pub const MIN_LAG_TARGET_US: i64 = US_PER_SEC;
pub const MAX_LAG_TARGET_US: i64 = 7200 * US_PER_SEC;
pub const DEFAULT_LAG_TARGET_US: i64 = 120 * US_PER_SEC;

/// Whether the primary must wait on this destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Binding {
    #[default]
    Optional,
    Mandatory,
}

impl NamedEnum for Binding {
    const ALL: &'static [Self] = &[Binding::Optional, Binding::Mandatory];
    const TYPE_NAME: &'static str = "binding";

    fn name(self) -> &'static str {
        match self {
            Binding::Optional => "OPTIONAL",
            Binding::Mandatory => "MANDATORY",
        }
    }
}

/// Whether archiving to the destination is active
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestState {
    #[default]
    Enable,
    Defer,
}

impl NamedEnum for DestState {
    const ALL: &'static [Self] = &[DestState::Enable, DestState::Defer];
    const TYPE_NAME: &'static str = "log archive dest state";

    fn name(self) -> &'static str {
        match self {
            DestState::Enable => "ENABLE",
            DestState::Defer => "DEFER",
        }
    }
}

/// One generated `(name, value)` configuration row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub name: String,
    pub value: String,
}

impl ConfigItem {
    fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogArchiveDestAttr {
    pub dest: Option<BackupDest>,
    pub binding: Binding,
    pub dest_id: i64,
    pub piece_switch_interval: i64,
    pub lag_target: i64,
    pub state: DestState,
}

impl Default for LogArchiveDestAttr {
    fn default() -> Self {
        Self {
            dest: None,
            binding: Binding::Optional,
            dest_id: 0,
            piece_switch_interval: DEFAULT_PIECE_SWITCH_INTERVAL_US,
            lag_target: DEFAULT_LAG_TARGET_US,
            state: DestState::Enable,
        }
    }
}

impl LogArchiveDestAttr {
    /// Attributes with interval defaults taken from runtime configuration
    pub fn from_config(config: &ArchiveConfig) -> Result<Self> {
        let mut attr = Self::default();
        attr.set_piece_switch_interval(&config.piece_switch_interval)?;
        attr.set_lag_target(&config.lag_target)?;
        Ok(attr)
    }

    pub fn set_log_archive_dest(&mut self, dest: &str) -> Result<()> {
        if dest.is_empty() {
            return Err(Error::invalid_argument("log archive dest is empty"));
        }
        self.dest = Some(BackupDest::parse(dest)?);
        Ok(())
    }

    pub fn set_binding(&mut self, value: &str) -> Result<()> {
        self.binding = Binding::from_name_ignore_case(value)
            .map_err(|e| Error::invalid_argument(e.to_string()))?;
        Ok(())
    }

    pub fn set_state(&mut self, value: &str) -> Result<()> {
        self.state = DestState::from_name_ignore_case(value)
            .map_err(|e| Error::invalid_argument(e.to_string()))?;
        Ok(())
    }

    /// Parse and set the piece switch interval; the old value is kept on failure
    pub fn set_piece_switch_interval(&mut self, value: &str) -> Result<()> {
        let interval = parse_time_us(value)?;
        if interval < MIN_PIECE_SWITCH_INTERVAL_US {
            return Err(Error::invalid_argument(format!(
                "piece_switch_interval {:?} is below the minimum of 1d",
                value
            )));
        }
        self.piece_switch_interval = interval;
        Ok(())
    }

    /// Parse and set the lag target; the old value is kept on failure
    pub fn set_lag_target(&mut self, value: &str) -> Result<()> {
        let lag = parse_time_us(value)?;
        if !(MIN_LAG_TARGET_US..=MAX_LAG_TARGET_US).contains(&lag) {
            return Err(Error::invalid_argument(format!(
                "lag_target {:?} must be between 1s and 7200s",
                value
            )));
        }
        self.lag_target = lag;
        Ok(())
    }

    pub fn is_piece_switch_interval_valid(&self) -> bool {
        self.piece_switch_interval >= MIN_PIECE_SWITCH_INTERVAL_US
    }

    pub fn is_lag_target_valid(&self) -> bool {
        (MIN_LAG_TARGET_US..=MAX_LAG_TARGET_US).contains(&self.lag_target)
    }

    pub fn is_valid(&self) -> bool {
        self.dest.is_some()
            && self.dest_id > 0
            && self.is_piece_switch_interval_valid()
            && self.is_lag_target_valid()
    }

    pub fn assign(&mut self, other: &LogArchiveDestAttr) -> Result<()> {
        if !other.is_valid() {
            return Err(Error::invalid_argument(format!(
                "invalid log archive dest attr: {}",
                other
            )));
        }
        *self = other.clone();
        Ok(())
    }

    /// Every attribute as a configuration row
    pub fn gen_config_items(&self) -> Result<Vec<ConfigItem>> {
        if !self.is_valid() {
            return Err(Error::invalid_argument(format!(
                "invalid log archive dest attr: {}",
                self
            )));
        }
        let mut items = self.gen_path_config_items()?;
        items.push(ConfigItem::new("binding", self.binding.name()));
        items.push(ConfigItem::new("dest_id", self.dest_id.to_string()));
        items.push(ConfigItem::new(
            "piece_switch_interval",
            timestamp_to_timestr(self.piece_switch_interval)?,
        ));
        items.push(ConfigItem::new(
            "lag_target",
            timestamp_to_timestr(self.lag_target)?,
        ));
        items.push(ConfigItem::new("state", self.state.name()));
        Ok(items)
    }

    /// Only the destination path row
    pub fn gen_path_config_items(&self) -> Result<Vec<ConfigItem>> {
        let dest = self
            .dest
            .as_ref()
            .ok_or_else(|| Error::invalid_argument("log archive dest is not set"))?;
        Ok(vec![ConfigItem::new("path", dest.format())])
    }
}

impl fmt::Display for LogArchiveDestAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.dest.as_ref().map(BackupDest::path_str).unwrap_or_default();
        write!(
            f,
            "path={} binding={} dest_id={} state={}",
            path,
            self.binding.name(),
            self.dest_id,
            self.state.name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::ErrorKind;

    fn attr() -> LogArchiveDestAttr {
        let mut attr = LogArchiveDestAttr::default();
        attr.set_log_archive_dest("file:///archive/").unwrap();
        attr.dest_id = 1001;
        attr
    }

    #[test]
    fn test_defaults_match_config_defaults() {
        let from_config = LogArchiveDestAttr::from_config(&ArchiveConfig::default()).unwrap();
        assert_eq!(from_config, LogArchiveDestAttr::default());
    }

    #[test]
    fn test_setters() {
        let mut attr = attr();
        attr.set_binding("mandatory").unwrap();
        attr.set_state("Defer").unwrap();
        assert_eq!(attr.binding, Binding::Mandatory);
        assert_eq!(attr.state, DestState::Defer);
        assert_eq!(attr.set_binding("").unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(attr.set_state("off").unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_interval_bounds() {
        let mut attr = attr();
        attr.set_piece_switch_interval("2d").unwrap();
        assert_eq!(attr.piece_switch_interval, 2 * US_PER_DAY);
        assert!(attr.set_piece_switch_interval("12h").is_err());
        assert_eq!(attr.piece_switch_interval, 2 * US_PER_DAY);

        attr.set_lag_target("1s").unwrap();
        attr.set_lag_target("2h").unwrap();
        assert!(attr.set_lag_target("2h1s").is_err());
        assert!(attr.set_lag_target("500ms").is_err());
        assert!(attr.set_lag_target("3h").is_err());
    }

    #[test]
    fn test_gen_config_items() {
        let items = attr().gen_config_items().unwrap();
        let pairs: Vec<_> = items
            .iter()
            .map(|i| (i.name.as_str(), i.value.as_str()))
            .collect();
        assert_eq!(
            pairs,
            [
                ("path", "file:///archive"),
                ("binding", "OPTIONAL"),
                ("dest_id", "1001"),
                ("piece_switch_interval", "1d"),
                ("lag_target", "2m"),
                ("state", "ENABLE"),
            ]
        );
        let path_only = attr().gen_path_config_items().unwrap();
        assert_eq!(path_only.len(), 1);
    }

    #[test]
    fn test_invalid_attr_rejected() {
        let invalid = LogArchiveDestAttr::default();
        assert!(invalid.gen_config_items().is_err());
        let mut target = attr();
        assert!(target.assign(&invalid).is_err());
        assert_eq!(target.dest_id, 1001);
    }
}
