//! # Quadruple Intermediate Representation
//!
//! The code generator lowers the AST to a flat list of quadruples
//! `(opcode, operand1, operand2, result)`. Operands are memory addresses,
//! literals, instruction indices or segment ids.
//!
//! ## Module Structure
//!
//! ```text
//! ir/
//! ├── mod.rs          # This file - module definition and re-exports
//! ├── instruction.rs  # Address, Literal, Operand, OpCode, Quadruple
//! ├── program.rs      # CompiledProgram (frame sizes + quadruples, JSON form)
//! └── generator.rs    # CodeGenerator: one rule per AST node, back-patching
//! ```
//!
//! ## Opcode Categories
//!
//! | Category | Opcodes |
//! |----------|---------|
//! | Data | `ASSIGN`, `PARAM`, `CONST`, `ADDR` |
//! | Arithmetic | `PLUS`, `MINUS`, `MULT`, `DIV`, `EXP`, `MOD` |
//! | Relational | `EQ`, `NOT_EQ`, `GEQT`, `LEQT`, `GT`, `LT` |
//! | Logical | `AND`, `OR`, `NOT` |
//! | Checks / I/O | `VERIFY`, `PRINT`, `READ_LINE`, `READ_FILE` |
//! | Control | `GOTO`, `GOTOF`, `STRTBLK`, `ENDBLK`, `ERA`, `GOSUB`, `RETURN`, `ENDFUNC` |

mod generator;
mod instruction;
mod program;

pub use generator::CodeGenerator;
pub use instruction::{Address, Literal, OpCode, Operand, Quadruple};
pub use program::CompiledProgram;
