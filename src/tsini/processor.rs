//! File processing API for the INI dialect
//!
//! Every output the CLI can produce is a named format. A format picks a stage (the flat
//! record stream or the grouped document) and a rendering (simple text, JSON, YAML or
//! generated code):
//!
//! - `lines-simple`, `lines-json`: one entry per source line, overrides resolved
//! - `document-simple`, `document-json`, `document-yaml`: the sectioned document
//! - `print-page-ascii`: the generated print-page source
//!
//! ```rust,ignore
//! use tsini::tsini::processor::{process_file, ProcessOptions, ProcessingSpec};
//!
//! let spec = ProcessingSpec::from_string("document-json")?;
//! let json = process_file("speeduino.ini", &spec, &ProcessOptions::default())?;
//! ```

use super::codegen::{print_page_ascii, CodegenError, PrintPageOptions};
use super::conditionals::Entry;
use super::document::Document;
use super::error::ParseError;
use super::line::{Line, Record};
use super::reader::{DocumentReader, ParseOptions};
use std::fmt::{self, Write};
use std::path::Path;

/// What data to extract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    Lines,
    Document,
    PrintPage,
}

/// How to render it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Simple,
    Json,
    Yaml,
    Ascii,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingSpec {
    pub stage: ProcessingStage,
    pub format: OutputFormat,
}

const SPECS: &[(&str, ProcessingStage, OutputFormat)] = &[
    ("lines-simple", ProcessingStage::Lines, OutputFormat::Simple),
    ("lines-json", ProcessingStage::Lines, OutputFormat::Json),
    ("document-simple", ProcessingStage::Document, OutputFormat::Simple),
    ("document-json", ProcessingStage::Document, OutputFormat::Json),
    ("document-yaml", ProcessingStage::Document, OutputFormat::Yaml),
    ("print-page-ascii", ProcessingStage::PrintPage, OutputFormat::Ascii),
];

impl ProcessingSpec {
    /// Parse a format string like "document-json"
    pub fn from_string(format_str: &str) -> Result<Self, ProcessingError> {
        SPECS
            .iter()
            .find(|(name, _, _)| *name == format_str)
            .map(|&(_, stage, format)| ProcessingSpec { stage, format })
            .ok_or_else(|| ProcessingError::InvalidFormat(format_str.to_string()))
    }

    pub fn name(&self) -> &'static str {
        SPECS
            .iter()
            .find(|(_, stage, format)| *stage == self.stage && *format == self.format)
            .map(|(name, _, _)| *name)
            .unwrap_or("unknown")
    }
}

/// Get all available format strings
pub fn available_formats() -> Vec<String> {
    SPECS.iter().map(|(name, _, _)| name.to_string()).collect()
}

/// Options threaded through to the parser and the generator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessOptions {
    pub parse: ParseOptions,
    pub print_page: PrintPageOptions,
}

/// Errors that can occur during processing
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingError {
    InvalidFormat(String),
    Parse(ParseError),
    Codegen(CodegenError),
    Serialization(String),
}

impl std::error::Error for ProcessingError {}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingError::InvalidFormat(format) => write!(f, "Invalid format: {}", format),
            ProcessingError::Parse(err) => write!(f, "{}", err),
            ProcessingError::Codegen(err) => write!(f, "{}", err),
            ProcessingError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl From<ParseError> for ProcessingError {
    fn from(err: ParseError) -> Self {
        ProcessingError::Parse(err)
    }
}

impl From<CodegenError> for ProcessingError {
    fn from(err: CodegenError) -> Self {
        ProcessingError::Codegen(err)
    }
}

impl From<fmt::Error> for ProcessingError {
    fn from(err: fmt::Error) -> Self {
        ProcessingError::Serialization(err.to_string())
    }
}

/// Process an INI file according to the given specification
pub fn process_file<P: AsRef<Path>>(
    file_path: P,
    spec: &ProcessingSpec,
    options: &ProcessOptions,
) -> Result<String, ProcessingError> {
    let reader = DocumentReader::from_path(file_path)?;
    process(&reader, spec, options)
}

/// Process already loaded source
pub fn process(
    reader: &DocumentReader,
    spec: &ProcessingSpec,
    options: &ProcessOptions,
) -> Result<String, ProcessingError> {
    match spec.stage {
        ProcessingStage::Lines => {
            let (records, _) = reader.resolved_records()?;
            format_records(&records, spec.format)
        }
        ProcessingStage::Document | ProcessingStage::PrintPage => {
            let document = reader.parse_with(&options.parse)?;
            render(&document, spec, options)
        }
    }
}

/// Render an already parsed document. The lines stage needs the source and fails here.
pub fn render(
    document: &Document,
    spec: &ProcessingSpec,
    options: &ProcessOptions,
) -> Result<String, ProcessingError> {
    match spec.stage {
        ProcessingStage::Lines => Err(ProcessingError::InvalidFormat(format!(
            "{} needs the source lines, not a document",
            spec.name()
        ))),
        ProcessingStage::Document => format_document(document, spec.format),
        ProcessingStage::PrintPage => Ok(print_page_ascii(document, &options.print_page)?),
    }
}

/// Render the flat record stream
pub fn format_records(records: &[Record], format: OutputFormat) -> Result<String, ProcessingError> {
    match format {
        OutputFormat::Simple => {
            let mut result = String::new();
            for record in records {
                writeln!(
                    result,
                    "{:>5} <{}> {}",
                    record.line_no,
                    record.line.kind_name(),
                    record.line
                )?;
            }
            Ok(result)
        }
        OutputFormat::Json => serde_json::to_string_pretty(records)
            .map_err(|e| ProcessingError::Serialization(e.to_string())),
        other => Err(ProcessingError::InvalidFormat(format!(
            "{:?} is not available for lines",
            other
        ))),
    }
}

/// Render a parsed document
pub fn format_document(document: &Document, format: OutputFormat) -> Result<String, ProcessingError> {
    match format {
        OutputFormat::Simple => {
            let mut result = String::new();
            for section in document.sections() {
                writeln!(result, "[{}]", section.name)?;
                write_entries(&mut result, &section.entries, 1)?;
            }
            Ok(result)
        }
        OutputFormat::Json => serde_json::to_string_pretty(document)
            .map_err(|e| ProcessingError::Serialization(e.to_string())),
        OutputFormat::Yaml => {
            serde_yaml::to_string(document).map_err(|e| ProcessingError::Serialization(e.to_string()))
        }
        OutputFormat::Ascii => Err(ProcessingError::InvalidFormat(
            "ascii output only exists for print-page".to_string(),
        )),
    }
}

fn write_entries(out: &mut String, entries: &[Entry], depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    for entry in entries {
        match entry {
            Entry::Line(Record {
                line: Line::Blank, ..
            }) => {}
            Entry::Line(record) => writeln!(out, "{}<{}> {}", indent, record.line.kind_name(), record.line)?,
            Entry::Conditional(block) => {
                writeln!(out, "{}#if {}", indent, block.condition)?;
                write_entries(out, &block.if_entries, depth + 1)?;
                if !block.else_entries.is_empty() {
                    writeln!(out, "{}#else", indent)?;
                    write_entries(out, &block.else_entries, depth + 1)?;
                }
                writeln!(out, "{}#endif", indent)?;
            }
        }
    }
    Ok(())
}
