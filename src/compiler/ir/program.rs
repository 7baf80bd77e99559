//! Compiled program: the document handed from the code generator to the VM

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::instruction::Quadruple;
use crate::error::Result;

/// Function directory sizes plus the flat quadruple list
///
/// `func_dir[i]` is the number of slots a frame of segment `i` needs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompiledProgram {
    /// Frame size per segment id
    pub func_dir: Vec<usize>,
    /// Instructions in execution order
    pub quads: Vec<Quadruple>,
}

impl CompiledProgram {
    /// Create a program from its two halves
    pub fn new(func_dir: Vec<usize>, quads: Vec<Quadruple>) -> Self {
        CompiledProgram { func_dir, quads }
    }

    /// Serialize to the persisted JSON document
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a persisted JSON document
    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Read a program file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_json(&source)
    }

    /// Write a program file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Human-readable listing, one numbered quadruple per line
    pub fn listing(&self) -> String {
        self.quads
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{:>4}: {}\n", i, q))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ir::{Address, OpCode, Operand};

    #[test]
    fn test_document_round_trip() {
        let program = CompiledProgram::new(
            vec![2],
            vec![
                Quadruple::new(
                    OpCode::Const,
                    Some(Operand::Literal(crate::compiler::ir::Literal::Int(5))),
                    None,
                    Some(Address::new(0, 0).into()),
                ),
                Quadruple::new(OpCode::Print, None, None, Some(Address::new(0, 0).into())),
            ],
        );
        let json = program.to_json().unwrap();
        assert!(json.contains("\"func_dir\""));
        assert_eq!(CompiledProgram::from_json(&json).unwrap(), program);
    }

    #[test]
    fn test_rejects_unknown_opcode() {
        let err = CompiledProgram::from_json(r#"{"func_dir": [1], "quads": [["JUMP", null, null, 0]]}"#)
            .unwrap_err();
        assert_eq!(err.phase(), crate::ErrorPhase::Io);
    }

    #[test]
    fn test_listing_numbers_quadruples() {
        let program = CompiledProgram::new(
            vec![0],
            vec![Quadruple::new(OpCode::Goto, None, None, Some(Operand::index(1)))],
        );
        assert_eq!(program.listing(), "   0: GOTO _ _ 1\n");
    }
}
