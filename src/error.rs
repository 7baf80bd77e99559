//! Error types for the Parhl compiler and virtual machine

use thiserror::Error;

use crate::compiler::ir::Address;

/// Parhl compilation and execution errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Declaration errors
    /// Name declared twice in the same scope
    ///
    /// **Triggered by:** a variable or function whose name already exists as a
    /// variable or function of the innermost scope
    /// **Example:** `let x: INT; let x: FLOAT;`
    /// **Prevention:** shadow in a nested block instead of redeclaring
    #[error("Redeclaration of '{name}' in the same scope")]
    Redeclaration {
        /// Offending identifier
        name: String,
    },

    /// Variable not found in any enclosing scope
    #[error("Unresolved identifier: {name}")]
    UnresolvedIdentifier {
        /// Identifier that could not be resolved
        name: String,
    },

    /// Function not found in any enclosing scope
    #[error("Unresolved function: {name}")]
    UnresolvedFunction {
        /// Function name that could not be resolved
        name: String,
    },

    // Type errors
    /// The semantic cube has no entry for this operator/operand combination
    ///
    /// **Triggered by:** `1 + true`, assigning a `STRING` to an `INT`, passing a
    /// `BOOL` where an `INT` parameter is declared
    #[error("Type mismatch: {op} is not defined for {left} and {right}")]
    TypeMismatch {
        /// Operator name
        op: String,
        /// Left (or destination) operand type
        left: String,
        /// Right (or source) operand type
        right: String,
    },

    /// Condition of an if/while/for is not boolean
    #[error("Condition must be BOOL, found {found}")]
    NonBooleanCondition {
        /// Type of the condition expression
        found: String,
    },

    /// Tensor index expression is not an integer
    #[error("Tensor index must be INT, found {found}")]
    NonIntegerIndex {
        /// Type of the index expression
        found: String,
    },

    /// A void function call used where a value is required
    #[error("Function {function} returns void and cannot be used as a value")]
    VoidValue {
        /// Function name
        function: String,
    },

    /// Number of indices does not match the declared tensor rank
    #[error("Tensor {name} has {expected} dimension(s), indexed with {got}")]
    TensorShape {
        /// Tensor name
        name: String,
        /// Declared number of dimensions
        expected: usize,
        /// Number of index expressions supplied
        got: usize,
    },

    /// Variable or temporary whose slots cannot be addressed in its segment
    #[error("Storage for {name} does not fit in its segment")]
    StorageOverflow {
        /// Variable or temporary name
        name: String,
    },

    // Structural errors
    /// Non-void function whose last generated instruction is not RETURN
    #[error("Function {function} is missing a return value")]
    MissingReturn {
        /// Function name
        function: String,
    },

    /// `return` inside a void function
    #[error("Function {function} is void and cannot return a value")]
    VoidReturn {
        /// Function name
        function: String,
    },

    /// `return` at global scope
    #[error("Return statement outside of a function")]
    ReturnOutsideFunction,

    /// Call with the wrong number of arguments
    #[error("Function {function} expects {expected} argument(s), got {got}")]
    ArityMismatch {
        /// Function name
        function: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// Attempt to leave the global scope
    #[error("Scope stack underflow")]
    ScopeUnderflow,

    // Runtime errors
    /// Tensor index outside `0..bound`
    ///
    /// **Triggered by:** `a[3]` for `let a: INT(3)`
    /// **Prevention:** keep indices below the declared dimension
    #[error("Index out of bounds: tensor index with value {index} must be lower than {bound}")]
    IndexOutOfBounds {
        /// Requested index
        index: i64,
        /// Exclusive upper bound
        bound: i64,
    },

    /// An indirection chain revisits an address
    #[error("Cyclic indirection through {address}")]
    CyclicIndirection {
        /// First address seen twice
        address: Address,
    },

    /// An indirect address points at a slot that does not hold an address
    #[error("Indirect address {address} does not hold an address")]
    InvalidIndirection {
        /// Indirect address being resolved
        address: Address,
    },

    /// Read of a slot that was never written
    #[error("Read of uninitialized memory at {address}")]
    UninitializedMemory {
        /// Resolved address
        address: Address,
    },

    /// Offset outside of the frame of its segment
    #[error("Address {address} is outside a frame of {size} slot(s)")]
    InvalidOffset {
        /// Resolved address
        address: Address,
        /// Frame size of the segment
        size: usize,
    },

    /// Segment addressed while it has no active frame
    #[error("Segment {segment} has no active frame")]
    NoActiveFrame {
        /// Segment id
        segment: usize,
    },

    /// Activation or parameter write without a reserved frame
    #[error("Segment {segment} has no dormant frame")]
    NoDormantFrame {
        /// Segment id
        segment: usize,
    },

    /// Segment id not present in the function directory
    #[error("Unknown segment {segment}")]
    UnknownSegment {
        /// Segment id
        segment: usize,
    },

    /// Integer division or modulo by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Operator applied to runtime values it does not support
    #[error("Invalid operation: {op} on {left} and {right}")]
    InvalidOperation {
        /// Operator name
        op: String,
        /// Left operand description
        left: String,
        /// Right operand description
        right: String,
    },

    /// Quadruple whose operands do not fit its opcode
    #[error("Malformed {opcode} quadruple: {reason}")]
    MalformedQuadruple {
        /// Opcode name
        opcode: String,
        /// What is wrong with it
        reason: String,
    },

    /// Dynamic call depth exceeded the configured limit
    #[error("Call depth exceeded (limit: {limit})")]
    CallDepthExceeded {
        /// Configured maximum depth
        limit: usize,
    },

    /// Failure while executing a specific instruction
    #[error("Error executing op {index} ({opcode}): {cause}")]
    Execution {
        /// Instruction index
        index: usize,
        /// Opcode name
        opcode: String,
        /// Underlying error
        cause: Box<Error>,
    },

    // External errors
    /// Filesystem or console failure
    #[error("I/O error: {0}")]
    Io(String),

    /// Malformed JSON document
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Stage of the pipeline an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPhase {
    /// Redeclared or unresolved names
    Declaration,
    /// Semantic cube and operand type failures
    Type,
    /// Missing returns, arity, scope shape
    Structural,
    /// Failures inside the virtual machine
    Runtime,
    /// Filesystem, console and document format failures
    Io,
}

impl Error {
    /// Classify the error by pipeline stage
    pub fn phase(&self) -> ErrorPhase {
        match self {
            Error::Redeclaration { .. }
            | Error::UnresolvedIdentifier { .. }
            | Error::UnresolvedFunction { .. } => ErrorPhase::Declaration,

            Error::TypeMismatch { .. }
            | Error::NonBooleanCondition { .. }
            | Error::NonIntegerIndex { .. }
            | Error::VoidValue { .. }
            | Error::TensorShape { .. }
            | Error::StorageOverflow { .. } => ErrorPhase::Type,

            Error::MissingReturn { .. }
            | Error::VoidReturn { .. }
            | Error::ReturnOutsideFunction
            | Error::ArityMismatch { .. }
            | Error::ScopeUnderflow => ErrorPhase::Structural,

            Error::Io(_) | Error::Serialization(_) => ErrorPhase::Io,

            Error::Execution { cause, .. } => cause.phase(),

            _ => ErrorPhase::Runtime,
        }
    }

    /// Error underneath any number of per-instruction wrappers
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Execution { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// Wrap an error with the instruction that raised it
    pub fn at_instruction(self, index: usize, opcode: impl Into<String>) -> Self {
        Error::Execution {
            index,
            opcode: opcode.into(),
            cause: Box::new(self),
        }
    }

    /// Create a malformed-quadruple error
    pub fn malformed(opcode: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedQuadruple {
            opcode: opcode.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type for Parhl operations
pub type Result<T> = std::result::Result<T, Error>;
