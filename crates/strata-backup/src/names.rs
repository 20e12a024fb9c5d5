//! String tables for persisted enums
//!
//! Every status-like enum is stored in catalog rows by name. The table order
//! is the enum ordinal and must never be rearranged.

use strata_core::{Error, Result};

/// An enum persisted by name through a fixed, ordered string table
pub trait NamedEnum: Sized + Copy + PartialEq + 'static {
    /// Every variant, in ordinal order
    const ALL: &'static [Self];

    /// Human-readable type name used in error messages
    const TYPE_NAME: &'static str;

    /// Name stored in catalog rows
    fn name(self) -> &'static str;

    /// Ordinal of this variant in the string table
    fn ordinal(self) -> usize {
        Self::ALL.iter().position(|v| *v == self).unwrap_or(Self::ALL.len())
    }

    /// Exact, case-sensitive lookup
    fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.name() == name)
            .ok_or_else(|| Error::entry_not_found(format!("unknown {} {:?}", Self::TYPE_NAME, name)))
    }

    /// Case-insensitive lookup; empty input is an invalid argument
    fn from_name_ignore_case(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::invalid_argument(format!(
                "empty {} string",
                Self::TYPE_NAME
            )));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::entry_not_found(format!("unknown {} {:?}", Self::TYPE_NAME, name)))
    }
}

/// Render a boolean switch as `ON`/`OFF`
pub fn on_off(value: bool) -> &'static str {
    if value {
        "ON"
    } else {
        "OFF"
    }
}

/// Parse an `ON`/`OFF` switch, ignoring case
pub fn parse_on_off(value: &str) -> Result<bool> {
    if value.eq_ignore_ascii_case("ON") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("OFF") {
        Ok(false)
    } else {
        Err(Error::invalid_argument(format!(
            "expected ON or OFF, got {:?}",
            value
        )))
    }
}
