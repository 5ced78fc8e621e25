//! Parameter domains and a `Params` struct with safe defaults.
//!
//! Notes:
//! - Every key is optional on the wire; missing keys take the defaults below.
//! - `validate_domains` is the single gate for range checks; loaders call it
//!   right after deserialization and the CLI calls it again after overrides.

use crate::errors::CoreError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const DEFAULT_BUDGET: u32 = 100;
pub const MAX_BUDGET: u32 = 10_000;
pub const DEFAULT_SHARE_TOLERANCE: f64 = 1e-9;
pub const MAX_SHARE_TOLERANCE: f64 = 1e-3;

/// Order in which a bucket's entries are walked during remainder distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TieBreak {
    /// Subregion name, then state name (the layout order of the wave chart).
    #[default]
    SubregionThenName,
    /// State code, lexicographic.
    StateCode,
}

impl TieBreak {
    pub fn as_token(self) -> &'static str {
        match self {
            TieBreak::SubregionThenName => "subregion_then_name",
            TieBreak::StateCode => "state_code",
        }
    }

    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "subregion_then_name" => Some(TieBreak::SubregionThenName),
            "state_code" => Some(TieBreak::StateCode),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct Params {
    /// Waves distributed across the states of one bucket.
    pub budget: u32,
    pub tie_break: TieBreak,
    /// Tolerance for the share-sum self-check.
    pub share_tolerance: f64,
    /// Initial autoplay state of the view.
    pub autoplay: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            budget: DEFAULT_BUDGET,
            tie_break: TieBreak::default(),
            share_tolerance: DEFAULT_SHARE_TOLERANCE,
            autoplay: true,
        }
    }
}

/// Range checks for every numeric parameter.
pub fn validate_domains(p: &Params) -> Result<(), CoreError> {
    if p.budget == 0 || p.budget > MAX_BUDGET {
        return Err(CoreError::DomainOutOfRange("budget"));
    }
    if !(p.share_tolerance > 0.0 && p.share_tolerance <= MAX_SHARE_TOLERANCE) {
        return Err(CoreError::DomainOutOfRange("share_tolerance"));
    }
    Ok(())
}
