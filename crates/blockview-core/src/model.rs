//! Read-only data pulled from the analysis engine.
//!
//! The engine owns disassembly and the knowledge base; these types are the
//! snapshot the view works from and are rebuilt on every reload.

use crate::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionKind {
    #[default]
    Normal,
    Branch,
    Call,
    Return,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operand {
    pub text: String,
    /// Name of the variable this operand refers to, if the engine recovered one.
    #[serde(default)]
    pub variable: Option<String>,
}

impl Operand {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            variable: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub addr: Address,
    pub mnemonic: String,
    #[serde(default)]
    pub operands: Vec<Operand>,
    #[serde(default)]
    pub kind: InstructionKind,
    /// Operand index holding the branch or call target.
    #[serde(default)]
    pub branch_target_operand: Option<usize>,
    #[serde(default)]
    pub indirect: bool,
}

impl Instruction {
    pub fn new(addr: u64, mnemonic: &str, operands: &[&str]) -> Self {
        Self {
            addr: Address(addr),
            mnemonic: mnemonic.to_string(),
            operands: operands.iter().map(|op| Operand::new(*op)).collect(),
            ..Default::default()
        }
    }

    pub fn is_branch_target_operand(&self, index: usize) -> bool {
        matches!(self.kind, InstructionKind::Branch | InstructionKind::Call)
            && self.branch_target_operand == Some(index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default)]
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhiVariable {
    pub name: String,
    pub sources: Vec<String>,
    /// Register-backed phi nodes are tracked by the engine but never displayed.
    #[serde(default)]
    pub register: bool,
}

/// How control leaves a basic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Terminator {
    Fallthrough {
        next: Address,
    },
    Jump {
        target: Address,
    },
    Conditional {
        taken: Address,
        fallthrough: Address,
    },
    Call {
        target: Address,
        return_to: Address,
    },
    #[default]
    Return,
    Indirect,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub addr: Address,
    pub instructions: Vec<Instruction>,
    #[serde(default)]
    pub phi_variables: Vec<PhiVariable>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub terminator: Terminator,
}

impl BasicBlock {
    pub fn new(addr: u64, instructions: Vec<Instruction>, terminator: Terminator) -> Self {
        Self {
            addr: Address(addr),
            instructions,
            terminator,
            ..Default::default()
        }
    }

    pub fn contains(&self, addr: Address) -> bool {
        self.instructions.iter().any(|insn| insn.addr == addr)
    }
}

/// Control-flow graph of one function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionGraph {
    pub function: Address,
    pub entry: Address,
    pub blocks: Vec<BasicBlock>,
    /// Successor relation as (source block, target block).
    #[serde(default)]
    pub edges: Vec<(Address, Address)>,
}

impl FunctionGraph {
    pub fn block(&self, addr: Address) -> Option<&BasicBlock> {
        self.blocks.iter().find(|block| block.addr == addr)
    }

    pub fn block_containing(&self, insn_addr: Address) -> Option<&BasicBlock> {
        self.blocks.iter().find(|block| block.contains(insn_addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminator_json_shape() {
        let term = Terminator::Conditional {
            taken: Address(0x10),
            fallthrough: Address(0x20),
        };
        let json = serde_json::to_string(&term).unwrap();
        assert_eq!(json, r#"{"kind":"conditional","taken":16,"fallthrough":32}"#);
        let back: Terminator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, term);
    }

    #[test]
    fn test_branch_target_operand_requires_branch_kind() {
        let mut insn = Instruction::new(0x10, "jne", &["0x40"]);
        insn.branch_target_operand = Some(0);
        assert!(!insn.is_branch_target_operand(0));
        insn.kind = InstructionKind::Branch;
        assert!(insn.is_branch_target_operand(0));
        assert!(!insn.is_branch_target_operand(1));
    }
}
