//! # Parhl Type Tags
//!
//! Every declared variable, temporary and function carries a [`DataType`].
//! Types are only enforced while generating code: the virtual machine works
//! on untyped [`Value`](crate::runtime::Value)s.
//!
//! GPU-tagged types behave exactly like their host counterparts; they only
//! carry a different tag so a later backend could dispatch on them.
//!
//! Whether an operator may be applied to a pair of types is decided by a
//! [`TypeOracle`], by default the [`SemanticCube`] table.

pub mod cube;

pub use cube::{SemanticCube, TypeOracle};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a variable, temporary or function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Float,
    /// Boolean
    Bool,
    /// UTF-8 text
    String,
    /// GPU-tagged integer
    GpuInt,
    /// GPU-tagged float
    GpuFloat,
    /// GPU-tagged boolean
    GpuBool,
    /// No value (function return type, missing unary operand)
    Void,
}

impl DataType {
    /// All value-carrying types, in temporary-counter order
    pub const VALUE_TYPES: [DataType; 7] = [
        DataType::Int,
        DataType::Float,
        DataType::Bool,
        DataType::String,
        DataType::GpuInt,
        DataType::GpuFloat,
        DataType::GpuBool,
    ];

    /// Canonical upper-case name
    pub fn name(self) -> &'static str {
        match self {
            DataType::Int => "INT",
            DataType::Float => "FLOAT",
            DataType::Bool => "BOOL",
            DataType::String => "STRING",
            DataType::GpuInt => "GPU_INT",
            DataType::GpuFloat => "GPU_FLOAT",
            DataType::GpuBool => "GPU_BOOL",
            DataType::Void => "VOID",
        }
    }

    /// True for the GPU-tagged variants
    pub fn is_gpu(self) -> bool {
        matches!(self, DataType::GpuInt | DataType::GpuFloat | DataType::GpuBool)
    }

    /// Host counterpart of a GPU-tagged type (identity otherwise)
    pub fn host(self) -> Self {
        match self {
            DataType::GpuInt => DataType::Int,
            DataType::GpuFloat => DataType::Float,
            DataType::GpuBool => DataType::Bool,
            other => other,
        }
    }

    /// GPU counterpart of a host type, if it has one
    pub fn gpu(self) -> Option<Self> {
        match self {
            DataType::Int | DataType::GpuInt => Some(DataType::GpuInt),
            DataType::Float | DataType::GpuFloat => Some(DataType::GpuFloat),
            DataType::Bool | DataType::GpuBool => Some(DataType::GpuBool),
            _ => None,
        }
    }

    /// True for BOOL and GPU_BOOL
    pub fn is_boolean(self) -> bool {
        self.host() == DataType::Bool
    }

    /// True for INT and GPU_INT
    pub fn is_integer(self) -> bool {
        self.host() == DataType::Int
    }

    /// True for integer and float types, GPU-tagged or not
    pub fn is_numeric(self) -> bool {
        matches!(self.host(), DataType::Int | DataType::Float)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Source-level operator, as seen by the semantic cube
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    /// `+` (binary or unary)
    Plus,
    /// `-` (binary or unary)
    Minus,
    /// `*`
    Mult,
    /// `/`
    Div,
    /// `**`
    Exp,
    /// `%`
    Mod,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `>=`
    Geqt,
    /// `<=`
    Leqt,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `and`
    And,
    /// `or`
    Or,
    /// `not` (unary)
    Not,
    /// `=`, also used for returns and parameter passing
    Assign,
}

impl Operator {
    /// Canonical upper-case name
    pub fn name(self) -> &'static str {
        match self {
            Operator::Plus => "PLUS",
            Operator::Minus => "MINUS",
            Operator::Mult => "MULT",
            Operator::Div => "DIV",
            Operator::Exp => "EXP",
            Operator::Mod => "MOD",
            Operator::Eq => "EQ",
            Operator::NotEq => "NOT_EQ",
            Operator::Geqt => "GEQT",
            Operator::Leqt => "LEQT",
            Operator::Gt => "GT",
            Operator::Lt => "LT",
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
            Operator::Assign => "ASSIGN",
        }
    }

    /// True for `+ - * / ** %`
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Operator::Plus
                | Operator::Minus
                | Operator::Mult
                | Operator::Div
                | Operator::Exp
                | Operator::Mod
        )
    }

    /// True for `>= <= > <`
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            Operator::Geqt | Operator::Leqt | Operator::Gt | Operator::Lt
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
