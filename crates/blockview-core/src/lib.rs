use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod error;
pub mod geometry;
pub mod model;
pub mod source;

pub use error::{ViewError, report_invariant_violation};
pub use geometry::{Rect, Vec2};
pub use model::{
    BasicBlock, FunctionGraph, Instruction, InstructionKind, Operand, PhiVariable, Terminator,
    Variable,
};
pub use source::{AnalysisSource, ProgramSnapshot};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub u64);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid address literal: {0:?}")]
pub struct AddressParseError(pub String);

impl FromStr for Address {
    type Err = AddressParseError;

    /// Accepts `0x`-prefixed hex or plain decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            u64::from_str_radix(hex, 16)
        } else {
            trimmed.parse::<u64>()
        };
        parsed
            .map(Address)
            .map_err(|_| AddressParseError(s.to_string()))
    }
}

/// Rendering classification of a control-flow edge.
///
/// Only used for coloring; the layouter sets `BackEdge`, the classifier sets
/// the branch kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeClass {
    #[default]
    Normal,
    TrueBranch,
    FalseBranch,
    BackEdge,
}

impl EdgeClass {
    pub fn label(self) -> &'static str {
        match self {
            EdgeClass::Normal => "normal",
            EdgeClass::TrueBranch => "true",
            EdgeClass::FalseBranch => "false",
            EdgeClass::BackEdge => "back",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display_is_zero_padded_hex() {
        assert_eq!(Address(0x4010).to_string(), "00004010");
        assert_eq!(format!("{:#x}", Address(0x4010)), "0x4010");
    }

    #[test]
    fn test_address_parse_accepts_hex_and_decimal() {
        assert_eq!("0x401000".parse::<Address>().unwrap(), Address(0x401000));
        assert_eq!("4096".parse::<Address>().unwrap(), Address(4096));
        assert!("0xzz".parse::<Address>().is_err());
    }

    #[test]
    fn test_address_serializes_as_plain_number() {
        let json = serde_json::to_string(&Address(16)).unwrap();
        assert_eq!(json, "16");
    }
}
