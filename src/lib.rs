//! # Parhl - Quadruple Compiler and Virtual Machine
//!
//! Parhl is a small statically typed, imperative language with scalar and
//! tensor variables, functions (including recursion), `if`/`elseif`/`else`,
//! `while` and `for` loops, and built-in I/O. This crate holds its back half:
//!
//! - a **code generator** lowering the AST to quadruples, checking scopes and
//!   types on the way;
//! - a **stack virtual machine** executing the quadruples over segmented
//!   memory with active and dormant frames.
//!
//! ## Quick Start
//!
//! ```rust
//! use parhl::ast::{Expression, Program, Statement};
//! use parhl::runtime::{BufferedConsole, VirtualMachine};
//! use parhl::types::{DataType, Operator};
//! use parhl::{CompileOptions, Compiler};
//!
//! # fn main() -> parhl::Result<()> {
//! // let x: INT = 2; let y: INT = 3; print(x + y)
//! let program = Program::new(vec![
//!     Statement::declare("x", DataType::Int, Some(Expression::int(2))),
//!     Statement::declare("y", DataType::Int, Some(Expression::int(3))),
//!     Statement::print(vec![Expression::binary(
//!         Operator::Plus,
//!         Expression::var("x"),
//!         Expression::var("y"),
//!     )]),
//! ]);
//!
//! let compiled = Compiler::new(CompileOptions::default()).compile(&program)?;
//!
//! let mut vm = VirtualMachine::new(&compiled, BufferedConsole::new());
//! vm.run()?;
//! assert_eq!(vm.console().output(), ["5"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! AST → CodeGenerator (FuncDir + SemanticCube) → CompiledProgram (JSON) → VirtualMachine
//! ```
//!
//! ### Main Components
//!
//! - [`ast`] - Tree consumed by the code generator
//! - [`FuncDir`](compiler::FuncDir) - Scoped symbol table and segment layout
//! - [`SemanticCube`](types::SemanticCube) - Operator/type compatibility table
//! - [`CodeGenerator`](compiler::CodeGenerator) - AST to quadruples
//! - [`CompiledProgram`] - Frame sizes plus quadruples, the persisted document
//! - [`MemoryManager`](runtime::MemoryManager) - Active/dormant frame stacks
//! - [`VirtualMachine`](runtime::VirtualMachine) - Quadruple interpreter
//!
//! ## Error Handling
//!
//! Every failure is fatal. Compile errors abort generation; runtime errors
//! are wrapped with the index and opcode of every instruction on the call
//! path:
//!
//! ```rust
//! use parhl::{CompiledProgram, Error};
//! use parhl::runtime::{BufferedConsole, VirtualMachine};
//!
//! let program = CompiledProgram::from_json(r#"{"func_dir": [2], "quads": [
//!     ["CONST", 3, null, [0, 0, false]],
//!     ["CONST", 3, null, [0, 1, false]],
//!     ["VERIFY", [0, 0, false], null, [0, 1, false]]
//! ]}"#).unwrap();
//!
//! let mut vm = VirtualMachine::new(&program, BufferedConsole::new());
//! let err = vm.run().unwrap_err();
//! assert!(err.to_string().contains("op 2 (VERIFY)"));
//! assert_eq!(err.root_cause(), &Error::IndexOutOfBounds { index: 3, bound: 3 });
//! ```

/// Version of the Parhl toolchain
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod ast;
pub mod compiler;
pub mod error;
pub mod runtime;
pub mod types;

// Re-export main types
pub use compiler::{CompileOptions, CompiledProgram, Compiler};
pub use error::{Error, ErrorPhase, Result};
pub use runtime::{Value, VirtualMachine, VmOptions};
