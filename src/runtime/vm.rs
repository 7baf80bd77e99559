//! Quadruple interpreter
//!
//! A fetch-decode-execute loop driven by an instruction pointer. Calls do not
//! recurse on the host: `GOSUB` pushes a call frame onto the machine's own
//! call stack and jumps to the callee, `RETURN`/`ENDFUNC` pop it and resume
//! after the call site. The stack is bounded by [`VmOptions::max_call_depth`].

use super::console::Console;
use super::memory::MemoryManager;
use super::value::Value;
use crate::compiler::ir::{Address, CompiledProgram, OpCode, Quadruple};
use crate::error::{Error, Result};

/// Virtual machine configuration
#[derive(Debug, Clone)]
pub struct VmOptions {
    /// Maximum number of nested `GOSUB`s
    pub max_call_depth: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        VmOptions {
            max_call_depth: 1024,
        }
    }
}

/// Interpreter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    /// Dispatching instructions (also the state before the first run)
    Running,
    /// A `RETURN` or `ENDFUNC` with no caller ended the program
    Returned,
    /// The instruction pointer ran past the last quadruple, or an
    /// instruction failed
    Halted,
}

/// What the dispatch loop does after one instruction
enum Flow {
    Next,
    Jump(usize),
    Call { entry: usize, segment: usize },
    Return,
}

/// One pending invocation on the machine's call stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CallFrame {
    /// Index of the `GOSUB` that made the call
    call_site: usize,
    /// Segment whose frame the callee runs in
    segment: usize,
}

/// Stack-based quadruple interpreter
pub struct VirtualMachine<'p, C: Console> {
    program: &'p CompiledProgram,
    memory: MemoryManager,
    console: C,
    options: VmOptions,
    state: ExecState,
    executed: u64,
}

impl<'p, C: Console> VirtualMachine<'p, C> {
    /// Machine with default options
    pub fn new(program: &'p CompiledProgram, console: C) -> Self {
        Self::with_options(program, console, VmOptions::default())
    }

    /// Machine with explicit options
    pub fn with_options(program: &'p CompiledProgram, console: C, options: VmOptions) -> Self {
        VirtualMachine {
            program,
            memory: MemoryManager::new(program.func_dir.clone()),
            console,
            options,
            state: ExecState::Running,
            executed: 0,
        }
    }

    /// Frame memory
    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    /// Console used by the I/O opcodes
    pub fn console(&self) -> &C {
        &self.console
    }

    /// Give back the console
    pub fn into_console(self) -> C {
        self.console
    }

    /// Current state
    pub fn state(&self) -> ExecState {
        self.state
    }

    /// Number of instructions dispatched so far
    pub fn instructions_executed(&self) -> u64 {
        self.executed
    }

    /// Run the program from instruction 0 inside a fresh global frame
    pub fn run(&mut self) -> Result<()> {
        tracing::debug!(
            quads = self.program.quads.len(),
            segments = self.program.func_dir.len(),
            "starting virtual machine"
        );
        self.state = ExecState::Running;

        let outcome = self.enter_global().and_then(|()| self.dispatch());
        let state = match outcome {
            Ok(state) => state,
            Err(err) => {
                self.state = ExecState::Halted;
                return Err(err);
            }
        };

        self.state = state;
        self.memory.deactivate(0)?;
        tracing::debug!(executed = self.executed, ?state, "stopped");
        Ok(())
    }

    fn enter_global(&mut self) -> Result<()> {
        self.memory.reserve(0)?;
        self.memory.activate(0)
    }

    /// Dispatch until the program halts or returns from its outermost level
    fn dispatch(&mut self) -> Result<ExecState> {
        let program = self.program;
        let mut calls: Vec<CallFrame> = Vec::new();
        let mut ip = 0;

        while let Some(quad) = program.quads.get(ip) {
            tracing::trace!(ip, depth = calls.len(), %quad, "dispatch");
            self.executed += 1;

            let flow = self
                .execute(quad)
                .and_then(|flow| self.transfer(flow, ip, &mut calls))
                .map_err(|err| Self::call_path(err.at_instruction(ip, quad.op.name()), &calls))?;

            match flow {
                Some(next) => ip = next,
                None => return Ok(ExecState::Returned),
            }
        }
        // running off the end is terminal even inside a callee
        Ok(ExecState::Halted)
    }

    /// Next instruction pointer after `flow`, or `None` when the outermost
    /// level returns
    fn transfer(
        &mut self,
        flow: Flow,
        ip: usize,
        calls: &mut Vec<CallFrame>,
    ) -> Result<Option<usize>> {
        match flow {
            Flow::Next => Ok(Some(ip + 1)),
            Flow::Jump(target) => Ok(Some(target)),
            Flow::Call { entry, segment } => {
                if calls.len() >= self.options.max_call_depth {
                    return Err(Error::CallDepthExceeded {
                        limit: self.options.max_call_depth,
                    });
                }
                self.memory.activate(segment)?;
                calls.push(CallFrame {
                    call_site: ip,
                    segment,
                });
                Ok(Some(entry))
            }
            Flow::Return => match calls.pop() {
                Some(frame) => {
                    self.memory.deactivate(frame.segment)?;
                    Ok(Some(frame.call_site + 1))
                }
                None => Ok(None),
            },
        }
    }

    /// Wrap an error with every pending call site, innermost first
    fn call_path(err: Error, calls: &[CallFrame]) -> Error {
        calls
            .iter()
            .rev()
            .fold(err, |err, frame| err.at_instruction(frame.call_site, OpCode::Gosub.name()))
    }

    fn read(&self, address: Address) -> Result<Value> {
        self.memory.read(address)
    }

    fn write(&mut self, address: Address, value: Value) -> Result<()> {
        self.memory.write(address, value)
    }

    fn execute(&mut self, quad: &Quadruple) -> Result<Flow> {
        match quad.op {
            // control flow
            OpCode::Goto => Ok(Flow::Jump(quad.result_index()?)),

            OpCode::Gotof => {
                if self.read(quad.address1()?)?.is_truthy() {
                    Ok(Flow::Next)
                } else {
                    Ok(Flow::Jump(quad.result_index()?))
                }
            }

            OpCode::StartBlock => {
                let segment = quad.result_index()?;
                self.memory.reserve(segment)?;
                self.memory.activate(segment)?;
                Ok(Flow::Next)
            }

            OpCode::EndBlock => {
                self.memory.deactivate(quad.result_index()?)?;
                Ok(Flow::Next)
            }

            OpCode::Era => {
                self.memory.reserve(quad.result_index()?)?;
                Ok(Flow::Next)
            }

            OpCode::Gosub => Ok(Flow::Call {
                entry: quad.index1()?,
                segment: quad.result_index()?,
            }),

            OpCode::Return => {
                let value = self.read(quad.address1()?)?;
                self.write(quad.result_address()?, value)?;
                Ok(Flow::Return)
            }

            OpCode::EndFunc => Ok(Flow::Return),

            // data movement
            OpCode::Assign => {
                let value = self.read(quad.address1()?)?;
                self.write(quad.result_address()?, value)?;
                Ok(Flow::Next)
            }

            OpCode::Param => {
                self.memory
                    .write_into_dormant(quad.address1()?, quad.result_address()?)?;
                Ok(Flow::Next)
            }

            OpCode::Const => {
                let value = Value::from(quad.literal1()?);
                self.write(quad.result_address()?, value)?;
                Ok(Flow::Next)
            }

            OpCode::Addr => {
                let base = self.memory.resolve(quad.address1()?)?;
                let offset = self.read(quad.address2()?)?.as_int()?;
                let offset = usize::try_from(offset)
                    .map_err(|_| Error::malformed(quad.op.name(), "negative element offset"))?;
                let pointer = Address::new(base.segment, base.offset + offset);
                self.write(quad.result_address()?, Value::Address(pointer))?;
                Ok(Flow::Next)
            }

            // checks and I/O
            OpCode::Verify => {
                let bound = self.read(quad.address1()?)?.as_int()?;
                let index = self.read(quad.result_address()?)?.as_int()?;
                if index < 0 || index >= bound {
                    return Err(Error::IndexOutOfBounds { index, bound });
                }
                Ok(Flow::Next)
            }

            OpCode::Print => {
                let value = self.read(quad.result_address()?)?;
                self.console.print(&value)?;
                Ok(Flow::Next)
            }

            OpCode::ReadLine => {
                let line = self.console.read_line()?;
                self.write(quad.result_address()?, Value::Text(line))?;
                Ok(Flow::Next)
            }

            OpCode::ReadFile => {
                let path = self.read(quad.address1()?)?;
                let contents = self.console.read_file(path.as_text()?)?;
                self.write(quad.result_address()?, Value::Text(contents))?;
                Ok(Flow::Next)
            }

            // operators
            OpCode::Plus
            | OpCode::Minus
            | OpCode::Mult
            | OpCode::Div
            | OpCode::Exp
            | OpCode::Mod
            | OpCode::Eq
            | OpCode::NotEq
            | OpCode::Geqt
            | OpCode::Leqt
            | OpCode::Gt
            | OpCode::Lt
            | OpCode::And
            | OpCode::Or
            | OpCode::Not => {
                let left = self.read(quad.address1()?)?;
                let value = match quad.operand2 {
                    None => Value::unary(quad.op, &left)?,
                    Some(_) => Value::binary(quad.op, &left, &self.read(quad.address2()?)?)?,
                };
                self.write(quad.result_address()?, value)?;
                Ok(Flow::Next)
            }
        }
    }
}
