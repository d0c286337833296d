//! Assembly diagnostics: a `ParseWarning` is collected and
//! reported alongside a successful assembly; an `AssembleError` aborts it.

use std::fmt;

/// A non-fatal diagnostic collected during assembly. None of these stop the
/// assembler — a duplicate label keeps the first binding, an unresolved
/// label leaves its referencing instructions' ADDR fields at zero, an
/// unrecognized line is skipped — but the driver surfaces them to whoever
/// loaded the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// Line `line` could not be parsed as an instruction or label
    /// definition.
    Malformed { line: usize, message: String },
    /// Line `line` named a mnemonic not in the opcode table.
    UnknownMnemonic { line: usize, text: String },
    /// Line `line` redefined a label already bound earlier in the program;
    /// the earlier binding is kept.
    DuplicateLabel { line: usize, name: String },
    /// A label was referenced but never defined anywhere in the program.
    UnresolvedLabel { name: String },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { line, message } => write!(f, "line {line}: {message}"),
            Self::UnknownMnemonic { line, text } => {
                write!(f, "line {line}: unknown mnemonic '{text}'")
            }
            Self::DuplicateLabel { line, name } => {
                write!(f, "line {line}: label '{name}' already defined, keeping first definition")
            }
            Self::UnresolvedLabel { name } => write!(f, "label '{name}' was never defined"),
        }
    }
}

impl std::error::Error for ParseWarning {}

/// A fatal assembly error: the source could not produce a program at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
    /// The source contained no instruction lines.
    Empty,
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "source contains no instructions"),
        }
    }
}

impl std::error::Error for AssembleError {}
