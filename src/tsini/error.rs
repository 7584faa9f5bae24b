//! Error types for INI parsing

use std::fmt;

/// Errors that stop a parse. Unrecognised syntax is not one of them: it becomes
/// [`Line::Unknown`](crate::tsini::line::Line::Unknown).
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The source file could not be read
    Io { path: String, message: String },
    /// A field used a type tag missing from the data-type table
    UnknownDataType { line: usize, tag: String },
    /// A `$key` override with no matching `#define`
    UndefinedOverride { line: usize, key: String },
    /// A `$key` override matching more than one `#define`
    AmbiguousDefine { key: String, lines: Vec<usize> },
    /// `$key` overrides that lead back to themselves
    OverrideCycle { chain: Vec<String> },
    /// `#else` / `#endif` with no open `#if`
    UnmatchedConditional { line: usize, text: String },
    /// A second `#else` in the same `#if` block
    DuplicateElse { line: usize },
    /// End of input reached inside an `#if` block
    UnterminatedConditional { line: usize, condition: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Io { path, message } => write!(f, "Failed to read {}: {}", path, message),
            ParseError::UnknownDataType { line, tag } => {
                write!(f, "Line {}: unsupported data type '{}'", line, tag)
            }
            ParseError::UndefinedOverride { line, key } => {
                write!(f, "Line {}: code override references undefined key '{}'", line, key)
            }
            ParseError::AmbiguousDefine { key, lines } => write!(
                f,
                "Override key '{}' is defined more than once (lines {:?})",
                key, lines
            ),
            ParseError::OverrideCycle { chain } => {
                write!(f, "Code override cycle: {}", chain.join(" -> "))
            }
            ParseError::UnmatchedConditional { line, text } => {
                write!(f, "Line {}: '{}' without a matching #if", line, text)
            }
            ParseError::DuplicateElse { line } => {
                write!(f, "Line {}: second #else in the same #if block", line)
            }
            ParseError::UnterminatedConditional { line, condition } => {
                write!(f, "Line {}: '#if {}' is never closed", line, condition)
            }
        }
    }
}

impl std::error::Error for ParseError {}
