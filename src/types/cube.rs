//! Semantic cube: the `(operator, left, right) -> result` type table
//!
//! Unary operators are looked up with [`DataType::Void`] as the right type.
//! For [`Operator::Assign`] the left type is the destination and the right
//! type the source; the result is the destination type.

use std::collections::HashMap;

use lazy_static::lazy_static;

use super::{DataType, Operator};
use crate::error::{Error, Result};

/// Type-compatibility capability consulted by the code generator
pub trait TypeOracle {
    /// Result type of `left op right`, or a type error if undefined
    fn lookup(&self, op: Operator, left: DataType, right: DataType) -> Result<DataType>;
}

lazy_static! {
    static ref STANDARD_TABLE: HashMap<(Operator, DataType, DataType), DataType> =
        build_standard_table();
}

const BINARY_OPERATORS: [Operator; 15] = [
    Operator::Plus,
    Operator::Minus,
    Operator::Mult,
    Operator::Div,
    Operator::Exp,
    Operator::Mod,
    Operator::Eq,
    Operator::NotEq,
    Operator::Geqt,
    Operator::Leqt,
    Operator::Gt,
    Operator::Lt,
    Operator::And,
    Operator::Or,
    Operator::Assign,
];

/// Table-driven [`TypeOracle`]
#[derive(Debug, Clone)]
pub struct SemanticCube {
    table: HashMap<(Operator, DataType, DataType), DataType>,
}

impl SemanticCube {
    /// The standard Parhl rules
    pub fn new() -> Self {
        SemanticCube {
            table: STANDARD_TABLE.clone(),
        }
    }

    /// A cube with no legal combinations
    pub fn empty() -> Self {
        SemanticCube {
            table: HashMap::new(),
        }
    }

    /// Define (or redefine) one combination
    pub fn insert(&mut self, op: Operator, left: DataType, right: DataType, result: DataType) {
        self.table.insert((op, left, right), result);
    }

    /// Number of legal combinations
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True if no combination is legal
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for SemanticCube {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeOracle for SemanticCube {
    fn lookup(&self, op: Operator, left: DataType, right: DataType) -> Result<DataType> {
        self.table
            .get(&(op, left, right))
            .copied()
            .ok_or_else(|| Error::TypeMismatch {
                op: op.to_string(),
                left: left.to_string(),
                right: right.to_string(),
            })
    }
}

fn build_standard_table() -> HashMap<(Operator, DataType, DataType), DataType> {
    let mut table = HashMap::new();

    for left in DataType::VALUE_TYPES {
        for right in DataType::VALUE_TYPES {
            for op in BINARY_OPERATORS {
                if let Some(result) = binary_rule(op, left, right) {
                    table.insert((op, left, right), result);
                }
            }
        }

        for op in [Operator::Plus, Operator::Minus, Operator::Not] {
            if let Some(result) = unary_rule(op, left) {
                table.insert((op, left, DataType::Void), result);
            }
        }
    }

    table
}

/// GPU tag is contagious: a mixed host/GPU expression yields a GPU type
fn tagged(base: DataType, left: DataType, right: DataType) -> DataType {
    if left.is_gpu() || right.is_gpu() {
        base.gpu().unwrap_or(base)
    } else {
        base
    }
}

fn binary_rule(op: Operator, left: DataType, right: DataType) -> Option<DataType> {
    let (l, r) = (left.host(), right.host());
    let both_numeric = left.is_numeric() && right.is_numeric();

    match op {
        Operator::Assign => {
            if l == r || (l == DataType::Float && r == DataType::Int) {
                Some(left)
            } else {
                None
            }
        }
        Operator::Plus if l == DataType::String && r == DataType::String => Some(DataType::String),
        op if op.is_arithmetic() && both_numeric => {
            let base = if l == DataType::Float || r == DataType::Float {
                DataType::Float
            } else {
                DataType::Int
            };
            Some(tagged(base, left, right))
        }
        op if op.is_ordering() && both_numeric => Some(tagged(DataType::Bool, left, right)),
        Operator::Eq | Operator::NotEq
            if both_numeric || (l == r && matches!(l, DataType::Bool | DataType::String)) =>
        {
            Some(tagged(DataType::Bool, left, right))
        }
        Operator::And | Operator::Or if left.is_boolean() && right.is_boolean() => {
            Some(tagged(DataType::Bool, left, right))
        }
        _ => None,
    }
}

fn unary_rule(op: Operator, operand: DataType) -> Option<DataType> {
    match op {
        Operator::Plus | Operator::Minus if operand.is_numeric() => Some(operand),
        Operator::Not if operand.is_boolean() => Some(operand),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_promotion() {
        let cube = SemanticCube::new();
        assert_eq!(
            cube.lookup(Operator::Plus, DataType::Int, DataType::Int).unwrap(),
            DataType::Int
        );
        assert_eq!(
            cube.lookup(Operator::Mult, DataType::Int, DataType::Float).unwrap(),
            DataType::Float
        );
        assert_eq!(
            cube.lookup(Operator::Minus, DataType::GpuInt, DataType::Float)
                .unwrap(),
            DataType::GpuFloat
        );
    }

    #[test]
    fn test_relational_and_logical() {
        let cube = SemanticCube::new();
        assert_eq!(
            cube.lookup(Operator::Lt, DataType::Int, DataType::Float).unwrap(),
            DataType::Bool
        );
        assert_eq!(
            cube.lookup(Operator::And, DataType::Bool, DataType::GpuBool)
                .unwrap(),
            DataType::GpuBool
        );
        assert_eq!(
            cube.lookup(Operator::Eq, DataType::String, DataType::String)
                .unwrap(),
            DataType::Bool
        );
        assert!(cube
            .lookup(Operator::Gt, DataType::String, DataType::String)
            .is_err());
    }

    #[test]
    fn test_assignment_compatibility() {
        let cube = SemanticCube::new();
        assert!(cube
            .lookup(Operator::Assign, DataType::Float, DataType::Int)
            .is_ok());
        assert!(cube
            .lookup(Operator::Assign, DataType::GpuInt, DataType::Int)
            .is_ok());
        assert!(cube
            .lookup(Operator::Assign, DataType::Int, DataType::Float)
            .is_err());
        assert!(cube
            .lookup(Operator::Assign, DataType::Int, DataType::String)
            .is_err());
    }

    #[test]
    fn test_unary_entries_use_void() {
        let cube = SemanticCube::new();
        assert_eq!(
            cube.lookup(Operator::Minus, DataType::Float, DataType::Void)
                .unwrap(),
            DataType::Float
        );
        assert_eq!(
            cube.lookup(Operator::Not, DataType::Bool, DataType::Void).unwrap(),
            DataType::Bool
        );
        assert!(cube
            .lookup(Operator::Not, DataType::Int, DataType::Void)
            .is_err());
    }

    #[test]
    fn test_custom_cube() {
        let mut cube = SemanticCube::empty();
        assert!(cube.is_empty());
        cube.insert(Operator::Plus, DataType::Bool, DataType::Bool, DataType::Int);
        assert_eq!(
            cube.lookup(Operator::Plus, DataType::Bool, DataType::Bool)
                .unwrap(),
            DataType::Int
        );
        let err = cube
            .lookup(Operator::Plus, DataType::Int, DataType::Int)
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }
}
