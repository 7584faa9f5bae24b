//! Conditional Coalescer
//!
//! Folds `#if / #else / #endif` runs into single [`ConditionalBlock`] entries. Conditions
//! are kept as text and never evaluated; both branches survive as data.
//!
//! The pass is a stack machine over the record stream, so nested blocks come out as
//! entries of the enclosing branch. Malformed structure (a stray `#else` or `#endif`, a
//! second `#else`, an `#if` left open at end of input) fails with the offending line.

use super::error::ParseError;
use super::line::{Line, Record};
use serde::Serialize;

/// An item of a document section: a plain record or a coalesced conditional
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Entry {
    Line(Record),
    Conditional(ConditionalBlock),
}

impl Entry {
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Entry::Line(record) => Some(record),
            Entry::Conditional(_) => None,
        }
    }

    pub fn as_line(&self) -> Option<&Line> {
        self.as_record().map(|record| &record.line)
    }
}

/// A coalesced `#if` block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionalBlock {
    pub condition: String,
    /// Line number of the `#if`
    pub line_no: usize,
    pub if_entries: Vec<Entry>,
    pub else_entries: Vec<Entry>,
}

impl ConditionalBlock {
    fn new(condition: String, line_no: usize) -> Self {
        ConditionalBlock {
            condition,
            line_no,
            if_entries: Vec::new(),
            else_entries: Vec::new(),
        }
    }

    /// Records of the `#if` branch, descending into nested blocks' `#if` branches
    pub fn if_records(&self) -> Vec<&Record> {
        let mut records = Vec::new();
        collect_if_records(&self.if_entries, &mut records);
        records
    }
}

/// Flatten entries into records, taking the `#if` branch of every conditional
pub fn collect_if_records<'a>(entries: &'a [Entry], out: &mut Vec<&'a Record>) {
    for entry in entries {
        match entry {
            Entry::Line(record) => out.push(record),
            Entry::Conditional(block) => collect_if_records(&block.if_entries, out),
        }
    }
}

struct OpenBlock {
    block: ConditionalBlock,
    in_else: bool,
}

impl OpenBlock {
    fn push(&mut self, entry: Entry) {
        if self.in_else {
            self.block.else_entries.push(entry);
        } else {
            self.block.if_entries.push(entry);
        }
    }
}

/// Replace every `#if ... [#else ...] #endif` run with one [`Entry::Conditional`]
pub fn coalesce_conditionals(records: Vec<Record>) -> Result<Vec<Entry>, ParseError> {
    let mut entries = Vec::new();
    let mut open: Vec<OpenBlock> = Vec::new();

    for Record { line_no, line } in records {
        match line {
            Line::BeginConditional(condition) => open.push(OpenBlock {
                block: ConditionalBlock::new(condition, line_no),
                in_else: false,
            }),
            Line::ConditionalElse => {
                let current = open.last_mut().ok_or(ParseError::UnmatchedConditional {
                    line: line_no,
                    text: "#else".to_string(),
                })?;
                if current.in_else {
                    return Err(ParseError::DuplicateElse { line: line_no });
                }
                current.in_else = true;
            }
            Line::EndConditional => {
                let closed = open.pop().ok_or(ParseError::UnmatchedConditional {
                    line: line_no,
                    text: "#endif".to_string(),
                })?;
                push_entry(&mut entries, &mut open, Entry::Conditional(closed.block));
            }
            line => push_entry(&mut entries, &mut open, Entry::Line(Record { line_no, line })),
        }
    }

    match open.pop() {
        Some(unclosed) => Err(ParseError::UnterminatedConditional {
            line: unclosed.block.line_no,
            condition: unclosed.block.condition,
        }),
        None => Ok(entries),
    }
}

fn push_entry(entries: &mut Vec<Entry>, open: &mut [OpenBlock], entry: Entry) {
    match open.last_mut() {
        Some(block) => block.push(entry),
        None => entries.push(entry),
    }
}
