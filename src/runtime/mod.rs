//! Stack-based virtual machine for compiled Parhl programs

mod console;
mod memory;
mod value;
mod vm;

pub use console::{BufferedConsole, Console, StdConsole};
pub use memory::{Frame, MemoryManager};
pub use value::Value;
pub use vm::{ExecState, VirtualMachine, VmOptions};
