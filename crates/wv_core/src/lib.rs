//! wv_core: Core types, parameter domains, and ordering helpers.
//!
//! This crate is **I/O-free**. It defines stable types/APIs used across the
//! engine (`wv_io`, `wv_algo`, `wv_pipeline`, `wv_report`, `wv_cli`).
//!
//! - Registry tokens: `StateCode`
//! - Bucket keys: `BucketKey` (`"year|class"`)
//! - Records and per-bucket shapes: `RawRecord`, `StateAggregate`, `ShareEntry`, `NormalizedBucket`
//! - Parameter domains: `Params`, `TieBreak`
//! - Deterministic ordering helpers for allocation
//!
//! Serialization derives are gated behind the `serde` feature.

#![forbid(unsafe_code)]

pub mod errors {
    use thiserror::Error;

    /// Minimal error set for core-domain validation & parsing.
    #[derive(Clone, Debug, Eq, PartialEq, Error)]
    pub enum CoreError {
        #[error("invalid token: {0}")]
        InvalidToken(String),
        #[error("invalid bucket key: {0}")]
        InvalidKey(String),
        #[error("domain out of range: {0}")]
        DomainOutOfRange(&'static str),
    }
}

pub mod tokens {
    //! Registry token types.

    use crate::errors::CoreError;
    use core::fmt;
    use core::str::FromStr;

    /// Non-empty, no surrounding whitespace, no control characters.
    fn is_token(s: &str) -> bool {
        !s.is_empty() && s.trim() == s && !s.chars().any(char::is_control)
    }

    /// State/territory code as it appears in the record set (e.g. `"WA"`, `"NSW"`, `"Wallis & Futuna"`).
    #[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize))]
    pub struct StateCode(String);

    impl StateCode {
        pub fn as_str(&self) -> &str { &self.0 }
    }

    impl fmt::Display for StateCode {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
    }

    impl FromStr for StateCode {
        type Err = CoreError;
        fn from_str(s: &str) -> Result<Self, Self::Err> {
            if is_token(s) { Ok(Self(s.to_string())) } else { Err(CoreError::InvalidToken(s.to_string())) }
        }
    }

    #[cfg(feature = "serde")]
    impl<'de> serde::Deserialize<'de> for StateCode {
        fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
            use serde::de::{Error as _, Unexpected};
            let s = String::deserialize(d)?;
            if is_token(&s) { Ok(StateCode(s)) }
            else { Err(D::Error::invalid_value(Unexpected::Str(&s), &"non-empty state code without surrounding whitespace")) }
        }
    }
}

pub mod entities;
pub mod determinism;
pub mod variables;

pub use entities::{BucketKey, ClassNum, NormalizedBucket, RawRecord, ShareEntry, StateAggregate, Year};
pub use tokens::StateCode;
pub use variables::{Params, TieBreak};

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    #[test]
    fn state_code_shape() {
        assert!(StateCode::from_str("NSW").is_ok());
        assert!(StateCode::from_str("AU-QLD").is_ok());
        assert!(StateCode::from_str("Wallis & Futuna").is_ok());
        assert!(StateCode::from_str("Nouvelle-Calédonie").is_ok());
        assert!(StateCode::from_str("ABCDEFGHIJKLMNOPQRSTUVWXYZ").is_ok());
        assert!(StateCode::from_str("").is_err());
        assert!(StateCode::from_str("   ").is_err());
        assert!(StateCode::from_str(" NSW").is_err());
        assert!(StateCode::from_str("NS\tW").is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn state_code_rejects_bad_wire_value() {
        let ok: Result<StateCode, _> = serde_json::from_str("\"FJI\"");
        assert_eq!(ok.unwrap().as_str(), "FJI");
        let bad: Result<StateCode, _> = serde_json::from_str("\"FJI \"");
        assert!(bad.is_err());
    }
}
