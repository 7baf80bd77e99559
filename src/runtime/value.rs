use std::fmt;

use crate::compiler::ir::{Address, Literal, OpCode};
use crate::error::{Error, Result};

/// Runtime value held in a frame slot
///
/// Values are untyped at run time; operators dispatch on the variant.
/// `Address` values are the pointers written by `ADDR` and followed by
/// indirect addresses.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Boolean
    Bool(bool),
    /// UTF-8 text
    Text(String),
    /// Pointer to another slot
    Address(Address),
}

/// Operand pair after numeric promotion
enum Numeric {
    Int(i64, i64),
    Float(f64, f64),
}

impl Value {
    /// Returns the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Text(_) => "string",
            Value::Address(_) => "address",
        }
    }

    /// Truth value for `GOTOF`
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Address(_) => true,
        }
    }

    /// Integer value, for indices and bounds
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            _ => Err(self.invalid("as_int", None)),
        }
    }

    /// Text value, for file paths
    pub fn as_text(&self) -> Result<&str> {
        match self {
            Value::Text(s) => Ok(s),
            _ => Err(self.invalid("as_text", None)),
        }
    }

    fn invalid(&self, op: &str, other: Option<&Value>) -> Error {
        Error::InvalidOperation {
            op: op.to_string(),
            left: self.type_name().to_string(),
            right: other.map_or("none", Value::type_name).to_string(),
        }
    }

    fn numeric(&self, other: &Value) -> Option<Numeric> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(Numeric::Int(*a, *b)),
            (Value::Int(a), Value::Float(b)) => Some(Numeric::Float(*a as f64, *b)),
            (Value::Float(a), Value::Int(b)) => Some(Numeric::Float(*a, *b as f64)),
            (Value::Float(a), Value::Float(b)) => Some(Numeric::Float(*a, *b)),
            _ => None,
        }
    }

    /// Apply a binary operator opcode
    pub fn binary(op: OpCode, left: &Value, right: &Value) -> Result<Value> {
        let invalid = || left.invalid(op.name(), Some(right));

        match op {
            OpCode::Plus => match (left, right) {
                (Value::Text(a), Value::Text(b)) => Ok(Value::Text(format!("{}{}", a, b))),
                _ => match left.numeric(right).ok_or_else(invalid)? {
                    Numeric::Int(a, b) => Ok(Value::Int(a.wrapping_add(b))),
                    Numeric::Float(a, b) => Ok(Value::Float(a + b)),
                },
            },

            OpCode::Minus => match left.numeric(right).ok_or_else(invalid)? {
                Numeric::Int(a, b) => Ok(Value::Int(a.wrapping_sub(b))),
                Numeric::Float(a, b) => Ok(Value::Float(a - b)),
            },

            OpCode::Mult => match left.numeric(right).ok_or_else(invalid)? {
                Numeric::Int(a, b) => Ok(Value::Int(a.wrapping_mul(b))),
                Numeric::Float(a, b) => Ok(Value::Float(a * b)),
            },

            OpCode::Div => match left.numeric(right).ok_or_else(invalid)? {
                Numeric::Int(_, 0) => Err(Error::DivisionByZero),
                Numeric::Int(a, b) => Ok(Value::Int(a.wrapping_div(b))),
                Numeric::Float(_, b) if b == 0.0 => Err(Error::DivisionByZero),
                Numeric::Float(a, b) => Ok(Value::Float(a / b)),
            },

            OpCode::Mod => match left.numeric(right).ok_or_else(invalid)? {
                Numeric::Int(_, 0) => Err(Error::DivisionByZero),
                Numeric::Int(a, b) => Ok(Value::Int(a.wrapping_rem(b))),
                Numeric::Float(_, b) if b == 0.0 => Err(Error::DivisionByZero),
                Numeric::Float(a, b) => Ok(Value::Float(a % b)),
            },

            OpCode::Exp => match left.numeric(right).ok_or_else(invalid)? {
                Numeric::Int(a, b) => match u32::try_from(b) {
                    Ok(exp) => Ok(Value::Int(a.wrapping_pow(exp))),
                    // negative (or huge) exponents leave the integers
                    Err(_) => Ok(Value::Float((a as f64).powf(b as f64))),
                },
                Numeric::Float(a, b) => Ok(Value::Float(a.powf(b))),
            },

            OpCode::Eq | OpCode::NotEq => {
                let equal = match (left, right) {
                    (Value::Bool(a), Value::Bool(b)) => a == b,
                    (Value::Text(a), Value::Text(b)) => a == b,
                    _ => match left.numeric(right).ok_or_else(invalid)? {
                        Numeric::Int(a, b) => a == b,
                        Numeric::Float(a, b) => a == b,
                    },
                };
                Ok(Value::Bool(if op == OpCode::Eq { equal } else { !equal }))
            }

            OpCode::Gt | OpCode::Lt | OpCode::Geqt | OpCode::Leqt => {
                let ordering = match (left, right) {
                    (Value::Text(a), Value::Text(b)) => a.partial_cmp(b),
                    _ => match left.numeric(right).ok_or_else(invalid)? {
                        Numeric::Int(a, b) => a.partial_cmp(&b),
                        Numeric::Float(a, b) => a.partial_cmp(&b),
                    },
                };
                // NaN compares false against everything
                let Some(ordering) = ordering else {
                    return Ok(Value::Bool(false));
                };
                Ok(Value::Bool(match op {
                    OpCode::Gt => ordering.is_gt(),
                    OpCode::Lt => ordering.is_lt(),
                    OpCode::Geqt => ordering.is_ge(),
                    _ => ordering.is_le(),
                }))
            }

            OpCode::And | OpCode::Or => match (left, right) {
                (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if op == OpCode::And {
                    *a && *b
                } else {
                    *a || *b
                })),
                _ => Err(invalid()),
            },

            _ => Err(Error::malformed(op.name(), "not a binary operator")),
        }
    }

    /// Apply a unary operator opcode (`PLUS`, `MINUS`, `NOT` with no operand2)
    pub fn unary(op: OpCode, operand: &Value) -> Result<Value> {
        match (op, operand) {
            (OpCode::Plus, Value::Int(_) | Value::Float(_)) => Ok(operand.clone()),
            (OpCode::Minus, Value::Int(n)) => Ok(Value::Int(n.wrapping_neg())),
            (OpCode::Minus, Value::Float(x)) => Ok(Value::Float(-x)),
            (OpCode::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (OpCode::Plus | OpCode::Minus | OpCode::Not, _) => Err(operand.invalid(op.name(), None)),
            _ => Err(Error::malformed(op.name(), "not a unary operator")),
        }
    }
}

impl From<&Literal> for Value {
    fn from(lit: &Literal) -> Self {
        match lit {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(n) => Value::Int(*n),
            Literal::Float(x) => Value::Float(*x),
            Literal::Text(s) => Value::Text(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{}", s),
            Value::Address(addr) => write!(f, "{}", addr),
        }
    }
}
