// This file is part of pol_spec_scan.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use log::info;
use std::io::{self, BufRead, BufReader, Write};

use crate::error::ScanResult;

/// Block the run until the operator allows it to proceed.
pub trait OperatorGate {
    /// Wait for the operator.
    ///
    /// # Arguments
    /// * `prompt` - What the operator should do before proceeding.
    ///
    /// # Errors
    /// If the confirmation can not be read.
    fn wait_for_proceed(&mut self, prompt: &str) -> ScanResult<()>;
}

/// Gate that asks on the console and waits for the Enter key.
pub struct ConsoleGate {
    _reader: Box<dyn BufRead>,
    _writer: Box<dyn Write>,
}

impl ConsoleGate {
    /// Gate on the standard input and output.
    ///
    /// # Returns
    /// A new console gate.
    pub fn new() -> Self {
        Self::with_io(
            Box::new(BufReader::new(io::stdin())),
            Box::new(io::stdout()),
        )
    }

    /// Gate on the given reader and writer.
    ///
    /// # Arguments
    /// * `reader` - Source of the confirmation.
    /// * `writer` - Destination of the prompt.
    ///
    /// # Returns
    /// A new console gate.
    pub fn with_io(reader: Box<dyn BufRead>, writer: Box<dyn Write>) -> Self {
        Self {
            _reader: reader,
            _writer: writer,
        }
    }
}

impl Default for ConsoleGate {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorGate for ConsoleGate {
    fn wait_for_proceed(&mut self, prompt: &str) -> ScanResult<()> {
        write!(self._writer, "{prompt} Press Enter to proceed: ")?;
        self._writer.flush()?;

        let mut line = String::new();
        if self._reader.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "standard input is closed before the confirmation",
            )
            .into());
        }

        info!("Operator confirmed: {prompt}");

        Ok(())
    }
}

/// Gate that proceeds immediately. It records the prompts.
#[derive(Default)]
pub struct AutoProceedGate {
    pub prompts: Vec<String>,
}

impl AutoProceedGate {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OperatorGate for AutoProceedGate {
    fn wait_for_proceed(&mut self, prompt: &str) -> ScanResult<()> {
        info!("Proceed without the operator: {prompt}");
        self.prompts.push(String::from(prompt));

        Ok(())
    }
}
