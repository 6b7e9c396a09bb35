use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} column {}", self.line, self.column)
    }
}

#[derive(Debug, Error)]
pub enum MungeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type MungeResult<T> = Result<T, MungeError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected character {character:?} at {location}")]
    UnexpectedCharacter { character: char, location: Location },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unexpected token. Expected {expected}, got {found} at {location}")]
    UnexpectedToken {
        expected: String,
        found: String,
        location: Location,
    },
    #[error("Integer literal '{literal}' is out of range at {location}")]
    IntegerOutOfRange { literal: String, location: Location },
    #[error("Function '{function}' cannot define nested function at {location}")]
    NestedFunction { function: String, location: Location },
    #[error("Return outside of function at {location}")]
    ReturnOutsideFunction { location: Location },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Function '{name}' has already been defined")]
    DuplicateFunction { name: String },
    #[error("Function '{name}' is undefined")]
    UndefinedFunction { name: String },
    #[error(
        "Function '{function}' does not return enough variables to unpack. Function returns {returned}, you expected {requested}"
    )]
    Arity {
        function: String,
        returned: usize,
        requested: usize,
    },
    #[error("Function '{name}' invokes itself while being evaluated")]
    RecursiveInvocation { name: String },
    #[error(transparent)]
    Document(#[from] DocumentError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

impl From<DocumentError> for MungeError {
    fn from(value: DocumentError) -> Self {
        MungeError::Runtime(RuntimeError::Document(value))
    }
}

pub fn byte_offset_to_line(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .chars()
        .filter(|&c| c == '\n')
        .count()
        + 1
}

pub fn byte_offset_to_location(source: &str, offset: usize) -> Location {
    let prefix = &source[..offset.min(source.len())];
    let column = prefix.chars().rev().take_while(|&c| c != '\n').count() + 1;
    Location::new(byte_offset_to_line(source, offset), column)
}
