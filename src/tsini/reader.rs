//! Document reading
//!
//! [`DocumentReader`] loads INI source from a file or a string and runs the pipeline:
//!
//! 1. classify every line
//! 2. resolve `$key` code overrides (the only in-place mutation)
//! 3. coalesce `#if` blocks
//! 4. group into sections
//!
//! Any failure aborts the whole parse; there is no partial document.
//!
//! # Example
//!
//! ```rust,ignore
//! use tsini::tsini::reader::DocumentReader;
//!
//! let doc = DocumentReader::from_path("speeduino.ini")?.parse()?;
//! if let Some(constants) = doc.get("Constants") {
//!     println!("{} constants", constants.len());
//! }
//! ```

use super::classify::classify_line;
use super::conditionals::coalesce_conditionals;
use super::document::{group_sections, Document, DuplicateSections};
use super::error::ParseError;
use super::line::Record;
use super::overrides::{resolve_overrides, OverrideCache};
use std::fs;
use std::path::Path;

/// Knobs for the section grouping stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub duplicate_sections: DuplicateSections,
}

/// A document together with the override memo built while parsing it
#[derive(Debug, Clone)]
pub struct ParsedIni {
    pub document: Document,
    pub overrides: OverrideCache,
}

pub struct DocumentReader {
    source: String,
}

impl DocumentReader {
    /// Read the whole file. The handle is released before this returns.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| ParseError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(DocumentReader { source })
    }

    pub fn from_string<S: Into<String>>(source: S) -> Self {
        DocumentReader {
            source: source.into(),
        }
    }

    /// Classify every line, without any post-pass
    pub fn records(&self) -> Result<Vec<Record>, ParseError> {
        self.source
            .lines()
            .enumerate()
            .map(|(i, text)| classify_line(text, i + 1).map(|line| Record::new(i + 1, line)))
            .collect()
    }

    /// Classified lines with overrides linked
    pub fn resolved_records(&self) -> Result<(Vec<Record>, OverrideCache), ParseError> {
        let mut records = self.records()?;
        let overrides = resolve_overrides(&mut records)?;
        Ok((records, overrides))
    }

    /// Run the full pipeline with default options
    pub fn parse(&self) -> Result<Document, ParseError> {
        self.parse_with(&ParseOptions::default())
    }

    pub fn parse_with(&self, options: &ParseOptions) -> Result<Document, ParseError> {
        Ok(self.load(options)?.document)
    }

    /// Run the full pipeline and keep the override memo
    pub fn load(&self, options: &ParseOptions) -> Result<ParsedIni, ParseError> {
        let (records, overrides) = self.resolved_records()?;
        let entries = coalesce_conditionals(records)?;
        let document = group_sections(entries, options.duplicate_sections);
        Ok(ParsedIni {
            document,
            overrides,
        })
    }
}

/// Parse the INI file at `path` with default options
pub fn read<P: AsRef<Path>>(path: P) -> Result<Document, ParseError> {
    DocumentReader::from_path(path)?.parse()
}
