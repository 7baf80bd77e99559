//! I/O behind the `PRINT`, `READ_LINE` and `READ_FILE` opcodes

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::{self, BufRead, Write};

use super::value::Value;
use crate::error::{Error, Result};

/// Side-effecting I/O used by the virtual machine
pub trait Console {
    /// Print one value on its own line
    fn print(&mut self, value: &Value) -> Result<()>;

    /// Read one line of input, without its line terminator
    fn read_line(&mut self) -> Result<String>;

    /// Read a whole file as text
    fn read_file(&mut self, path: &str) -> Result<String> {
        Ok(fs::read_to_string(path)?)
    }
}

/// Process stdin / stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl Console for StdConsole {
    fn print(&mut self, value: &Value) -> Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", value)?;
        out.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(Error::Io("end of input".to_string()));
        }
        Ok(line.trim_end_matches(['\n', '\r']).to_string())
    }
}

/// In-memory console: scripted input lines and files, captured output
#[derive(Debug, Default, Clone)]
pub struct BufferedConsole {
    input: VecDeque<String>,
    files: HashMap<String, String>,
    output: Vec<String>,
}

impl BufferedConsole {
    /// Console with no input
    pub fn new() -> Self {
        Self::default()
    }

    /// Console answering `read_line` with the given lines in order
    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        BufferedConsole {
            input: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Serve `contents` for `read_file(path)`
    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    /// Printed lines so far
    pub fn output(&self) -> &[String] {
        &self.output
    }
}

impl Console for BufferedConsole {
    fn print(&mut self, value: &Value) -> Result<()> {
        self.output.push(value.to_string());
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        self.input
            .pop_front()
            .ok_or_else(|| Error::Io("end of input".to_string()))
    }

    fn read_file(&mut self, path: &str) -> Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| Error::Io(format!("no such file: {}", path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_console() {
        let mut console = BufferedConsole::with_input(["first", "second"]).with_file("a.txt", "abc");
        assert_eq!(console.read_line().unwrap(), "first");
        assert_eq!(console.read_line().unwrap(), "second");
        assert!(console.read_line().is_err());

        assert_eq!(console.read_file("a.txt").unwrap(), "abc");
        assert!(matches!(console.read_file("b.txt"), Err(Error::Io(_))));

        console.print(&Value::Int(1)).unwrap();
        console.print(&Value::Text("two".into())).unwrap();
        assert_eq!(console.output(), ["1", "two"]);
    }
}
