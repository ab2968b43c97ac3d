//! Parser contract.
//!
//! The compiler core does not parse. A [`Frontend`] turns source text into
//! a stream of top-level units; the session compiles and runs each unit
//! before asking for the next one.

use std::fmt;
use std::path::Path;

use vela_ir::NodeRef;

/// Syntax error at a source position (1-based).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl ParseError {
    pub fn new(line: u32, column: u32, message: impl Into<String>) -> Self {
        ParseError {
            line,
            column,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Stream of units from one source file.
pub trait UnitSource {
    /// The next `ast_unit` node, `Ok(None)` at end of input.
    fn next_unit(&mut self) -> Result<Option<NodeRef>, ParseError>;
}

pub trait Frontend {
    fn open(&self, path: &Path, text: String) -> Box<dyn UnitSource>;
}

/// Units already built in memory.
pub struct NodeSource {
    units: std::vec::IntoIter<NodeRef>,
}

impl NodeSource {
    pub fn new(units: Vec<NodeRef>) -> Self {
        NodeSource {
            units: units.into_iter(),
        }
    }
}

impl UnitSource for NodeSource {
    fn next_unit(&mut self) -> Result<Option<NodeRef>, ParseError> {
        Ok(self.units.next())
    }
}
