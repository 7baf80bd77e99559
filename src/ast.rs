//! Abstract syntax tree consumed by the code generator
//!
//! The tree is produced by an external front end (or deserialized from JSON)
//! and walked exactly once by [`CodeGenerator`](crate::compiler::CodeGenerator).

use serde::{Deserialize, Serialize};

use crate::compiler::ir::Literal;
use crate::types::{DataType, Operator};

/// Complete Parhl program
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    /// Top-level statements in source order
    pub statements: Vec<Statement>,
}

impl Program {
    /// Create a program from its statements
    pub fn new(statements: Vec<Statement>) -> Self {
        Program { statements }
    }
}

/// Statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Variable declaration: `let name: TYPE(d0)(d1) = init`
    VarDecl {
        /// Name of the new variable
        name: String,
        /// Element type
        ty: DataType,
        /// Tensor dimensions (empty for scalars)
        #[serde(default)]
        dims: Vec<usize>,
        /// Optional initializer (scalars only)
        #[serde(default)]
        init: Option<Expression>,
    },

    /// Assignment: `name[i]... = value`
    Assign {
        /// Destination
        target: LValue,
        /// Value to store
        value: Expression,
    },

    /// if / elseif / else chain
    If(Conditional),

    /// While loop
    While {
        /// Loop condition, evaluated before every iteration
        condition: Expression,
        /// Loop body
        body: Vec<Statement>,
    },

    /// For loop: `for (init; condition; step) { body }`
    For {
        /// Induction variable declaration
        init: Box<Statement>,
        /// Loop condition
        condition: Expression,
        /// Step assignment, run after the body
        step: Box<Statement>,
        /// Loop body
        body: Vec<Statement>,
    },

    /// Function declaration
    FuncDecl {
        /// Function name
        name: String,
        /// Declared return type (`VOID` for procedures)
        return_type: DataType,
        /// Parameters in call order
        params: Vec<Param>,
        /// Function body
        body: Vec<Statement>,
    },

    /// `return value`
    Return {
        /// Returned expression
        value: Expression,
    },

    /// Expression evaluated for its side effects (calls, print)
    Expression(Expression),
}

/// Assignable location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LValue {
    /// Variable name
    pub name: String,
    /// One index per tensor dimension (empty for scalars)
    #[serde(default)]
    pub indices: Vec<Expression>,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub ty: DataType,
}

/// One link of an if / elseif / else chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    /// Guard of this link
    pub condition: Expression,
    /// Statements run when the guard holds
    pub body: Vec<Statement>,
    /// Next link, tried when the guard is false
    #[serde(default)]
    pub alternative: Option<Box<Alternative>>,
}

/// What follows a conditional link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Alternative {
    /// `elseif` link
    ElseIf(Conditional),
    /// Final `else` body
    Else(Vec<Statement>),
}

impl Conditional {
    /// Single `if` link
    pub fn new(condition: Expression, body: Vec<Statement>) -> Self {
        Conditional {
            condition,
            body,
            alternative: None,
        }
    }

    /// Append `last` after the final link of the chain
    ///
    /// A chain already closed by an `else` is returned unchanged: nothing can
    /// follow the `else` body, so `last` is dropped.
    pub fn with_last(mut self, last: Alternative) -> Self {
        self.append(last);
        self
    }

    fn append(&mut self, last: Alternative) {
        match self.alternative.as_deref_mut() {
            None => self.alternative = Some(Box::new(last)),
            Some(Alternative::ElseIf(next)) => next.append(last),
            // already closed by an else
            Some(Alternative::Else(_)) => {}
        }
    }

    /// Append an `elseif` link (no-op once closed by [`Conditional::otherwise`])
    pub fn else_if(self, condition: Expression, body: Vec<Statement>) -> Self {
        self.with_last(Alternative::ElseIf(Conditional::new(condition, body)))
    }

    /// Close the chain with an `else` body (no-op if already closed)
    pub fn otherwise(self, body: Vec<Statement>) -> Self {
        self.with_last(Alternative::Else(body))
    }
}

/// Built-in I/O routines lowered to dedicated opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Builtin {
    /// `print(e, ...)`: one PRINT per argument
    Print,
    /// `read_line()`: STRING
    ReadLine,
    /// `read_file(path)`: STRING
    ReadFile,
}

impl Builtin {
    /// Source name
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::ReadLine => "read_line",
            Builtin::ReadFile => "read_file",
        }
    }
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Constant
    Literal(Literal),

    /// Variable or tensor element
    Variable {
        /// Variable name
        name: String,
        /// One index per tensor dimension (empty for scalars)
        #[serde(default)]
        indices: Vec<Expression>,
    },

    /// Binary operation
    Binary {
        /// Operator
        op: Operator,
        /// Left operand
        left: Box<Expression>,
        /// Right operand
        right: Box<Expression>,
    },

    /// Unary operation (`+`, `-`, `not`)
    Unary {
        /// Operator
        op: Operator,
        /// Operand
        operand: Box<Expression>,
    },

    /// User function call
    Call {
        /// Function name
        name: String,
        /// Arguments in parameter order
        args: Vec<Expression>,
    },

    /// Built-in I/O call
    Builtin {
        /// Which built-in
        func: Builtin,
        /// Arguments
        args: Vec<Expression>,
    },
}

impl Expression {
    /// Integer literal
    pub fn int(value: i64) -> Self {
        Expression::Literal(Literal::Int(value))
    }

    /// Float literal
    pub fn float(value: f64) -> Self {
        Expression::Literal(Literal::Float(value))
    }

    /// Boolean literal
    pub fn boolean(value: bool) -> Self {
        Expression::Literal(Literal::Bool(value))
    }

    /// Text literal
    pub fn text(value: impl Into<String>) -> Self {
        Expression::Literal(Literal::Text(value.into()))
    }

    /// Scalar variable reference
    pub fn var(name: impl Into<String>) -> Self {
        Expression::Variable {
            name: name.into(),
            indices: Vec::new(),
        }
    }

    /// Tensor element reference
    pub fn index(name: impl Into<String>, indices: Vec<Expression>) -> Self {
        Expression::Variable {
            name: name.into(),
            indices,
        }
    }

    /// Binary operation
    pub fn binary(op: Operator, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Unary operation
    pub fn unary(op: Operator, operand: Expression) -> Self {
        Expression::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// User function call
    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Call {
            name: name.into(),
            args,
        }
    }

    /// Built-in call
    pub fn builtin(func: Builtin, args: Vec<Expression>) -> Self {
        Expression::Builtin { func, args }
    }
}

impl Statement {
    /// `let name: ty = init`
    pub fn declare(name: impl Into<String>, ty: DataType, init: Option<Expression>) -> Self {
        Statement::VarDecl {
            name: name.into(),
            ty,
            dims: Vec::new(),
            init,
        }
    }

    /// `let name: ty(d0)(d1)...`
    pub fn declare_tensor(name: impl Into<String>, ty: DataType, dims: Vec<usize>) -> Self {
        Statement::VarDecl {
            name: name.into(),
            ty,
            dims,
            init: None,
        }
    }

    /// `name = value`
    pub fn assign(name: impl Into<String>, value: Expression) -> Self {
        Statement::Assign {
            target: LValue {
                name: name.into(),
                indices: Vec::new(),
            },
            value,
        }
    }

    /// `name[i]... = value`
    pub fn assign_index(name: impl Into<String>, indices: Vec<Expression>, value: Expression) -> Self {
        Statement::Assign {
            target: LValue {
                name: name.into(),
                indices,
            },
            value,
        }
    }

    /// `while (condition) { body }`
    pub fn while_loop(condition: Expression, body: Vec<Statement>) -> Self {
        Statement::While { condition, body }
    }

    /// `for (init; condition; step) { body }`
    pub fn for_loop(
        init: Statement,
        condition: Expression,
        step: Statement,
        body: Vec<Statement>,
    ) -> Self {
        Statement::For {
            init: Box::new(init),
            condition,
            step: Box::new(step),
            body,
        }
    }

    /// Function declaration
    pub fn function(
        name: impl Into<String>,
        return_type: DataType,
        params: Vec<(&str, DataType)>,
        body: Vec<Statement>,
    ) -> Self {
        Statement::FuncDecl {
            name: name.into(),
            return_type,
            params: params
                .into_iter()
                .map(|(name, ty)| Param {
                    name: name.to_string(),
                    ty,
                })
                .collect(),
            body,
        }
    }

    /// `return value`
    pub fn ret(value: Expression) -> Self {
        Statement::Return { value }
    }

    /// Call statement
    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Statement::Expression(Expression::call(name, args))
    }

    /// `print(args...)`
    pub fn print(args: Vec<Expression>) -> Self {
        Statement::Expression(Expression::builtin(Builtin::Print, args))
    }
}
