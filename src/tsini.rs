//! Reader for the TunerStudio INI dialect
//!
//! The pipeline runs in a fixed order:
//!
//! - [`classify`]: one typed [`Line`] per source line
//! - [`overrides`]: `$key` code overrides linked to their `#define`
//! - [`conditionals`]: `#if / #else / #endif` folded into blocks
//! - [`document`]: entries grouped into named sections
//!
//! [`overlap`] and [`codegen`] work on the finished [`Document`].

pub mod classify;
pub mod codegen;
pub mod conditionals;
pub mod datatype;
pub mod document;
pub mod error;
pub mod line;
pub mod overlap;
pub mod overrides;
pub mod processor;
pub mod reader;

pub use codegen::{print_page_ascii, CodegenError, PrintPageOptions};
pub use conditionals::{ConditionalBlock, Entry};
pub use datatype::DataType;
pub use document::{Document, DuplicateSections, Section};
pub use error::ParseError;
pub use line::{CodeOverride, Field, FieldKind, FieldShape, Line, Record, Table};
pub use overlap::{group_overlapping, ByteSpan};
pub use reader::{read, DocumentReader, ParseOptions};
