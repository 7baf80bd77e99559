//! Quadruple instruction definitions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::types::{DataType, Operator};

/// Memory address: `(segment, offset, indirect)`
///
/// `segment` is the function directory index owning the slot (0 = global).
/// An indirect address names a slot that itself holds another address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(usize, usize, bool)", into = "(usize, usize, bool)")]
pub struct Address {
    /// Segment (function) id
    pub segment: usize,
    /// Slot offset inside the segment's frame
    pub offset: usize,
    /// The slot holds a further address to follow
    pub indirect: bool,
}

impl Address {
    /// Direct address
    pub fn new(segment: usize, offset: usize) -> Self {
        Address {
            segment,
            offset,
            indirect: false,
        }
    }

    /// Address whose slot holds the real address
    pub fn indirect(segment: usize, offset: usize) -> Self {
        Address {
            segment,
            offset,
            indirect: true,
        }
    }

    /// Same slot, marked direct
    pub fn direct(self) -> Self {
        Address {
            indirect: false,
            ..self
        }
    }
}

impl From<(usize, usize, bool)> for Address {
    fn from((segment, offset, indirect): (usize, usize, bool)) -> Self {
        Address {
            segment,
            offset,
            indirect,
        }
    }
}

impl From<Address> for (usize, usize, bool) {
    fn from(addr: Address) -> Self {
        (addr.segment, addr.offset, addr.indirect)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.indirect {
            write!(f, "*({}, {})", self.segment, self.offset)
        } else {
            write!(f, "({}, {})", self.segment, self.offset)
        }
    }
}

/// Compile-time constant carried inside a quadruple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// Boolean constant
    Bool(bool),
    /// Integer constant; also encodes jump targets and segment ids
    Int(i64),
    /// Float constant
    Float(f64),
    /// Text constant
    Text(String),
}

impl Literal {
    /// Host type of the literal
    pub fn data_type(&self) -> DataType {
        match self {
            Literal::Bool(_) => DataType::Bool,
            Literal::Int(_) => DataType::Int,
            Literal::Float(_) => DataType::Float,
            Literal::Text(_) => DataType::String,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(n) => write!(f, "{}", n),
            Literal::Float(x) => write!(f, "{}", x),
            Literal::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// One operand slot of a quadruple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    /// Memory address triple
    Address(Address),
    /// Literal value, instruction index or segment id
    Literal(Literal),
}

impl Operand {
    /// Operand holding an instruction index or segment id
    pub fn index(index: usize) -> Self {
        Operand::Literal(Literal::Int(index as i64))
    }
}

impl From<Address> for Operand {
    fn from(addr: Address) -> Self {
        Operand::Address(addr)
    }
}

impl From<Literal> for Operand {
    fn from(lit: Literal) -> Self {
        Operand::Literal(lit)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Address(addr) => write!(f, "{}", addr),
            Operand::Literal(lit) => write!(f, "{}", lit),
        }
    }
}

/// Quadruple operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpCode {
    // Data movement
    /// result = operand1
    #[serde(alias = "ASSIG")]
    Assign,
    /// dormant(result) = operand1
    Param,
    /// result = literal operand1
    Const,
    /// result = pointer to operand1 (base) advanced by value of operand2
    Addr,

    // Arithmetic, relational, logical (operand2 is absent for unary forms)
    /// result = operand1 + operand2, or +operand1
    Plus,
    /// result = operand1 - operand2, or -operand1
    Minus,
    /// result = operand1 * operand2
    Mult,
    /// result = operand1 / operand2
    Div,
    /// result = operand1 ** operand2
    Exp,
    /// result = operand1 % operand2
    Mod,
    /// result = operand1 == operand2
    Eq,
    /// result = operand1 != operand2
    NotEq,
    /// result = operand1 >= operand2
    Geqt,
    /// result = operand1 <= operand2
    Leqt,
    /// result = operand1 > operand2
    Gt,
    /// result = operand1 < operand2
    Lt,
    /// result = operand1 and operand2
    And,
    /// result = operand1 or operand2
    Or,
    /// result = not operand1
    Not,

    // Checks and I/O
    /// fail unless 0 <= value(result) < value(operand1)
    Verify,
    /// print value(result)
    Print,
    /// result = one line of input
    ReadLine,
    /// result = contents of the file named by operand1
    ReadFile,

    // Control flow
    /// jump to result
    Goto,
    /// jump to result when operand1 is false
    Gotof,
    /// reserve and activate a frame of segment result
    #[serde(rename = "STRTBLK")]
    StartBlock,
    /// deactivate the frame of segment result
    #[serde(rename = "ENDBLK")]
    EndBlock,
    /// reserve a dormant frame of segment result
    Era,
    /// activate segment result and run from operand1
    Gosub,
    /// copy operand1 into result and end the invocation
    Return,
    /// end the invocation
    #[serde(rename = "ENDFUNC")]
    EndFunc,
}

impl OpCode {
    /// Canonical upper-case name, as persisted
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Assign => "ASSIGN",
            OpCode::Param => "PARAM",
            OpCode::Const => "CONST",
            OpCode::Addr => "ADDR",
            OpCode::Plus => "PLUS",
            OpCode::Minus => "MINUS",
            OpCode::Mult => "MULT",
            OpCode::Div => "DIV",
            OpCode::Exp => "EXP",
            OpCode::Mod => "MOD",
            OpCode::Eq => "EQ",
            OpCode::NotEq => "NOT_EQ",
            OpCode::Geqt => "GEQT",
            OpCode::Leqt => "LEQT",
            OpCode::Gt => "GT",
            OpCode::Lt => "LT",
            OpCode::And => "AND",
            OpCode::Or => "OR",
            OpCode::Not => "NOT",
            OpCode::Verify => "VERIFY",
            OpCode::Print => "PRINT",
            OpCode::ReadLine => "READ_LINE",
            OpCode::ReadFile => "READ_FILE",
            OpCode::Goto => "GOTO",
            OpCode::Gotof => "GOTOF",
            OpCode::StartBlock => "STRTBLK",
            OpCode::EndBlock => "ENDBLK",
            OpCode::Era => "ERA",
            OpCode::Gosub => "GOSUB",
            OpCode::Return => "RETURN",
            OpCode::EndFunc => "ENDFUNC",
        }
    }

    /// Jumps whose target is back-patched
    pub fn is_jump(self) -> bool {
        matches!(self, OpCode::Goto | OpCode::Gotof)
    }
}

impl From<Operator> for OpCode {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Plus => OpCode::Plus,
            Operator::Minus => OpCode::Minus,
            Operator::Mult => OpCode::Mult,
            Operator::Div => OpCode::Div,
            Operator::Exp => OpCode::Exp,
            Operator::Mod => OpCode::Mod,
            Operator::Eq => OpCode::Eq,
            Operator::NotEq => OpCode::NotEq,
            Operator::Geqt => OpCode::Geqt,
            Operator::Leqt => OpCode::Leqt,
            Operator::Gt => OpCode::Gt,
            Operator::Lt => OpCode::Lt,
            Operator::And => OpCode::And,
            Operator::Or => OpCode::Or,
            Operator::Not => OpCode::Not,
            Operator::Assign => OpCode::Assign,
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One linear IR instruction: opcode + operand1 + operand2 + result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "QuadrupleRepr", into = "QuadrupleRepr")]
pub struct Quadruple {
    /// Operation
    pub op: OpCode,
    /// First operand
    pub operand1: Option<Operand>,
    /// Second operand (absent for unary forms)
    pub operand2: Option<Operand>,
    /// Destination address, jump target or segment id
    pub result: Option<Operand>,
}

/// Persisted shape: `[opcode, operand1, operand2, result]`
#[derive(Serialize, Deserialize)]
struct QuadrupleRepr(OpCode, Option<Operand>, Option<Operand>, Option<Operand>);

impl From<QuadrupleRepr> for Quadruple {
    fn from(QuadrupleRepr(op, operand1, operand2, result): QuadrupleRepr) -> Self {
        Quadruple {
            op,
            operand1,
            operand2,
            result,
        }
    }
}

impl From<Quadruple> for QuadrupleRepr {
    fn from(quad: Quadruple) -> Self {
        QuadrupleRepr(quad.op, quad.operand1, quad.operand2, quad.result)
    }
}

impl Quadruple {
    /// Build a quadruple from its four fields
    pub fn new(
        op: OpCode,
        operand1: Option<Operand>,
        operand2: Option<Operand>,
        result: Option<Operand>,
    ) -> Self {
        Quadruple {
            op,
            operand1,
            operand2,
            result,
        }
    }

    /// Jump with an unpatched target
    pub fn jump(op: OpCode, condition: Option<Address>) -> Self {
        Quadruple::new(op, condition.map(Operand::Address), None, None)
    }

    /// Fill in (or overwrite) the result field with an instruction index
    pub fn set_target(&mut self, target: usize) {
        self.result = Some(Operand::index(target));
    }

    /// Address in operand1
    pub fn address1(&self) -> Result<Address> {
        self.expect_address(&self.operand1, "operand1")
    }

    /// Address in operand2
    pub fn address2(&self) -> Result<Address> {
        self.expect_address(&self.operand2, "operand2")
    }

    /// Address in the result field
    pub fn result_address(&self) -> Result<Address> {
        self.expect_address(&self.result, "result")
    }

    /// Literal in operand1
    pub fn literal1(&self) -> Result<&Literal> {
        match &self.operand1 {
            Some(Operand::Literal(lit)) => Ok(lit),
            _ => Err(Error::malformed(self.op.name(), "operand1 must be a literal")),
        }
    }

    /// Instruction index in operand1
    pub fn index1(&self) -> Result<usize> {
        self.expect_index(&self.operand1, "operand1")
    }

    /// Instruction index or segment id in the result field
    pub fn result_index(&self) -> Result<usize> {
        self.expect_index(&self.result, "result")
    }

    fn expect_address(&self, operand: &Option<Operand>, field: &str) -> Result<Address> {
        match operand {
            Some(Operand::Address(addr)) => Ok(*addr),
            _ => Err(Error::malformed(
                self.op.name(),
                format!("{} must be an address", field),
            )),
        }
    }

    fn expect_index(&self, operand: &Option<Operand>, field: &str) -> Result<usize> {
        match operand {
            Some(Operand::Literal(Literal::Int(n))) if *n >= 0 => Ok(*n as usize),
            _ => Err(Error::malformed(
                self.op.name(),
                format!("{} must be a non-negative index", field),
            )),
        }
    }
}

impl fmt::Display for Quadruple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |operand: &Option<Operand>| match operand {
            Some(op) => op.to_string(),
            None => "_".to_string(),
        };
        write!(
            f,
            "{} {} {} {}",
            self.op,
            show(&self.operand1),
            show(&self.operand2),
            show(&self.result)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadruple_persisted_shape() {
        let quad = Quadruple::new(
            OpCode::Plus,
            Some(Address::new(0, 1).into()),
            Some(Address::indirect(2, 3).into()),
            Some(Address::new(0, 4).into()),
        );
        let json = serde_json::to_string(&quad).unwrap();
        assert_eq!(json, r#"["PLUS",[0,1,false],[2,3,true],[0,4,false]]"#);
    }

    #[test]
    fn test_parse_jump_and_const() {
        let goto: Quadruple = serde_json::from_str(r#"["GOTO", null, null, 12]"#).unwrap();
        assert_eq!(goto.op, OpCode::Goto);
        assert_eq!(goto.result_index().unwrap(), 12);
        assert!(goto.operand1.is_none());

        let konst: Quadruple =
            serde_json::from_str(r#"["CONST", 2.5, null, [1, 0, false]]"#).unwrap();
        assert_eq!(konst.literal1().unwrap(), &Literal::Float(2.5));
        assert_eq!(konst.result_address().unwrap(), Address::new(1, 0));

        let text: Quadruple =
            serde_json::from_str(r#"["CONST", "hi", null, [0, 0, false]]"#).unwrap();
        assert_eq!(text.literal1().unwrap(), &Literal::Text("hi".into()));
    }

    #[test]
    fn test_legacy_and_block_opcode_names() {
        let assig: Quadruple =
            serde_json::from_str(r#"["ASSIG", [0, 0, false], null, [0, 1, false]]"#).unwrap();
        assert_eq!(assig.op, OpCode::Assign);

        let blk: Quadruple = serde_json::from_str(r#"["STRTBLK", null, null, 3]"#).unwrap();
        assert_eq!(blk.op, OpCode::StartBlock);
        assert_eq!(
            serde_json::to_string(&OpCode::EndFunc).unwrap(),
            "\"ENDFUNC\""
        );
    }

    #[test]
    fn test_accessor_errors_name_the_opcode() {
        let quad = Quadruple::jump(OpCode::Gotof, None);
        let err = quad.address1().unwrap_err();
        assert!(err.to_string().contains("GOTOF"));
        assert!(quad.result_index().is_err());
    }
}
