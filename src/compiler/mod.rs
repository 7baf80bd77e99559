//! # Parhl Compiler - AST to Quadruples
//!
//! ## Architecture
//!
//! ```text
//! AST (JSON or built in code) → CodeGenerator (FuncDir + TypeOracle) → CompiledProgram
//! ```
//!
//! ## Usage
//!
//! ```
//! use parhl::ast::{Expression, Program, Statement};
//! use parhl::compiler::{CompileOptions, Compiler};
//! use parhl::types::DataType;
//!
//! let program = Program::new(vec![
//!     Statement::declare("x", DataType::Int, Some(Expression::int(2))),
//!     Statement::print(vec![Expression::var("x")]),
//! ]);
//! let compiled = Compiler::new(CompileOptions::default()).compile(&program)?;
//! assert_eq!(compiled.func_dir, vec![2]);
//! # Ok::<(), parhl::Error>(())
//! ```

pub mod func_dir;
pub mod ir;

pub use func_dir::{Block, BlockId, Func, FuncDir, FuncId, Typed, Var, GLOBAL_NAME};
pub use ir::{Address, CodeGenerator, CompiledProgram, Literal, OpCode, Operand, Quadruple};

use crate::ast::Program;
use crate::error::Result;
use crate::types::{SemanticCube, TypeOracle};

/// Compilation options
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Log the numbered quadruple listing at debug level
    pub log_listing: bool,
}

/// AST to quadruple compiler
pub struct Compiler {
    options: CompileOptions,
    oracle: Box<dyn TypeOracle>,
}

impl Compiler {
    /// Compiler checking types against the standard semantic cube
    pub fn new(options: CompileOptions) -> Self {
        Self::with_oracle(options, Box::new(SemanticCube::new()))
    }

    /// Compiler checking types against a custom oracle
    pub fn with_oracle(options: CompileOptions, oracle: Box<dyn TypeOracle>) -> Self {
        Compiler { options, oracle }
    }

    /// Compile a program
    pub fn compile(&self, program: &Program) -> Result<CompiledProgram> {
        let compiled = CodeGenerator::new(self.oracle.as_ref()).generate(program)?;
        if self.options.log_listing {
            tracing::debug!("quadruples:\n{}", compiled.listing());
        }
        Ok(compiled)
    }

    /// Compile a JSON-serialized AST
    pub fn compile_json(&self, source: &str) -> Result<CompiledProgram> {
        let program: Program = serde_json::from_str(source)?;
        self.compile(&program)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}
