//! Print-page code generator
//!
//! Emits C++ that prints every configuration page as ASCII text. The generated file relies
//! on the firmware's own helpers (`print_array`, `serial_print_3dtable`) and assumes:
//!
//! - each non-table page is a struct named `<prefix>N`, e.g. `configPage2`,
//! - each 3-D table is declared under its table identifier (after code overrides).
//!
//! Fields come from the constants section, split into pages at `page = N`. Conditional
//! blocks contribute their `#if` branch. Fields backing a table (named by a key-value in
//! the table editor section) are printed through the table instead of one by one.
//!
//! Overlapping fields are collapsed to one representative per overlap group: the widest
//! non-bit field, or every bit field when the group has nothing else. This also means the
//! INI file can declare extra views of the same storage that only this generator uses.

use super::document::Document;
use super::line::{Field, FieldShape, Line, Record, Table};
use super::overlap::{group_overlapping, ByteSpan};
use std::fmt::{self, Write};

/// Naming knobs for the generated code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintPageOptions {
    /// Name of the `Print &` parameter
    pub output_var: String,
    /// Prefix of the per-page config struct
    pub page_struct_prefix: String,
    /// Section holding the page fields
    pub constants_section: String,
    /// Section holding the table declarations
    pub tables_section: String,
}

impl Default for PrintPageOptions {
    fn default() -> Self {
        PrintPageOptions {
            output_var: "target".to_string(),
            page_struct_prefix: "configPage".to_string(),
            constants_section: "Constants".to_string(),
            tables_section: "TableEditor".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CodegenError {
    /// A section the generator needs is absent
    MissingSection(String),
    Format(String),
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodegenError::MissingSection(name) => write!(f, "Section [{}] not found", name),
            CodegenError::Format(msg) => write!(f, "Formatting error: {}", msg),
        }
    }
}

impl std::error::Error for CodegenError {}

impl From<fmt::Error> for CodegenError {
    fn from(err: fmt::Error) -> Self {
        CodegenError::Format(err.to_string())
    }
}

/// A table declaration and the lines that follow it up to the next one
struct TableGroup<'a> {
    table: &'a Table,
    members: Vec<&'a Line>,
}

impl TableGroup<'_> {
    /// Whether a key-value in this group names `field` as its first value (bins, z-values)
    fn backs(&self, field: &Field) -> bool {
        self.members.iter().any(|line| match line {
            Line::KeyValue(kv) => kv.first_value() == Some(field.name.as_str()),
            _ => false,
        })
    }
}

struct Page<'a> {
    number: String,
    fields: Vec<&'a Field>,
}

fn content_records(records: Vec<&Record>) -> impl Iterator<Item = &Line> {
    records
        .into_iter()
        .map(|record| &record.line)
        .filter(|line| !line.is_trivia())
}

fn table_groups<'a>(document: &'a Document, options: &PrintPageOptions) -> Result<Vec<TableGroup<'a>>, CodegenError> {
    let section = document
        .section(&options.tables_section)
        .ok_or_else(|| CodegenError::MissingSection(options.tables_section.clone()))?;

    let mut groups: Vec<TableGroup<'a>> = Vec::new();
    for line in content_records(section.if_records()) {
        match line {
            Line::Table(table) => groups.push(TableGroup {
                table,
                members: Vec::new(),
            }),
            // Lines ahead of the first table belong to no table
            other => {
                if let Some(group) = groups.last_mut() {
                    group.members.push(other);
                }
            }
        }
    }
    Ok(groups)
}

fn pages<'a>(document: &'a Document, options: &PrintPageOptions) -> Result<Vec<Page<'a>>, CodegenError> {
    let section = document
        .section(&options.constants_section)
        .ok_or_else(|| CodegenError::MissingSection(options.constants_section.clone()))?;

    let mut pages: Vec<Page<'a>> = Vec::new();
    let mut current: Option<Page<'a>> = None;
    for line in content_records(section.if_records()) {
        match line {
            Line::KeyValue(kv) if kv.key == "page" => {
                let number = kv.first_value().unwrap_or_default().to_string();
                if let Some(done) = current.replace(Page {
                    number,
                    fields: Vec::new(),
                }) {
                    add_page(&mut pages, done);
                }
            }
            Line::Field(field) => {
                if let Some(page) = current.as_mut() {
                    page.fields.push(field);
                }
            }
            _ => {}
        }
    }
    if let Some(done) = current {
        add_page(&mut pages, done);
    }
    Ok(pages)
}

/// A repeated page number replaces the earlier page
fn add_page<'a>(pages: &mut Vec<Page<'a>>, page: Page<'a>) {
    match pages.iter_mut().find(|p| p.number == page.number) {
        Some(existing) => *existing = page,
        None => pages.push(page),
    }
}

/// The fields to print for one overlap group
fn representatives(group: Vec<&Field>) -> Vec<&Field> {
    let widest = group
        .iter()
        .copied()
        .filter(|field| !field.is_bits())
        .fold(None::<&Field>, |best, field| match best {
            Some(b) if b.offset_end() - b.offset() >= field.offset_end() - field.offset() => Some(b),
            _ => Some(field),
        });
    match widest {
        Some(field) => vec![field],
        // A group of bit fields only: they share a byte but not bits
        None => group,
    }
}

fn function_name(page_number: &str) -> String {
    format!("printPage{}", page_number)
}

fn write_field(out: &mut String, page: &Page, field: &Field, options: &PrintPageOptions) -> fmt::Result {
    let target = &options.output_var;
    let full_name = format!("{}{}.{}", options.page_struct_prefix, page.number, field.code_name());
    match field.shape {
        FieldShape::Scalar | FieldShape::Bits { .. } => {
            writeln!(out, "\t{}.println({});", target, full_name)
        }
        FieldShape::Array { .. } => writeln!(out, "\tprint_array({}, {});", target, full_name),
        FieldShape::Array2d { .. } => writeln!(out, "\t// Unknown field: {}", field.name),
    }
}

fn write_page(out: &mut String, page: &Page, tables: &[TableGroup], options: &PrintPageOptions) -> fmt::Result {
    let target = &options.output_var;
    let table_of = |field: &Field| tables.iter().position(|group| group.backs(field));

    writeln!(out, "static void {}(Print &{}) {{", function_name(&page.number), target)?;
    writeln!(out, "\t{}.println(F(\"\\nPg {} Cfg\"));", target, page.number)?;

    let plain = page
        .fields
        .iter()
        .copied()
        .filter(|field| !field.is_unused() && table_of(*field).is_none());
    for group in group_overlapping(plain) {
        for field in representatives(group) {
            write_field(out, page, field, options)?;
        }
    }

    // One print per run of consecutive fields backing the same table
    let mut last_table = None;
    for index in page.fields.iter().filter_map(|field| table_of(*field)) {
        if last_table == Some(index) {
            continue;
        }
        last_table = Some(index);
        let table = tables[index].table;
        writeln!(out, "\t{}.println(F(\"\\n{}\"));", target, table.title_text())?;
        writeln!(out, "\tserial_print_3dtable({}, {});", target, table.code_name())?;
    }

    writeln!(out, "}}")?;
    writeln!(out)
}

/// Generate the print-page source for `document`
pub fn print_page_ascii(document: &Document, options: &PrintPageOptions) -> Result<String, CodegenError> {
    let tables = table_groups(document, options)?;
    let pages = pages(document, options)?;
    let target = &options.output_var;

    let mut out = String::new();
    writeln!(out, "/*")?;
    writeln!(out, "DO NOT EDIT THIS FILE.")?;
    writeln!(out)?;
    writeln!(out, "It is auto generated and your edits will be overwritten")?;
    writeln!(out, "*/")?;
    writeln!(out)?;

    for page in &pages {
        write_page(&mut out, page, &tables, options)?;
    }

    writeln!(out, "void printPageAscii(byte pageNum, Print &{}) {{", target)?;
    writeln!(out, "\tswitch(pageNum) {{")?;
    for page in &pages {
        writeln!(out, "\t\tcase {}:", page.number)?;
        writeln!(out, "\t\t{}({});", function_name(&page.number), target)?;
        writeln!(out, "\t\tbreak;")?;
    }
    writeln!(out, "\t}}")?;
    writeln!(out, "}}")?;

    Ok(out)
}
