//! Line records
//!
//! Every physical line of an INI file becomes exactly one [`Line`]. The set of variants is
//! closed: consumers match on it exhaustively instead of probing for capabilities.
//!
//! The four memory-mapped field syntaxes (scalar, bits, 1-D array, 2-D array) share one
//! payload, [`Field`], and are told apart by its [`FieldShape`]. Strings, tables and the
//! remaining line kinds carry their own payloads.
//!
//! Each line renders back to a canonical form through `Display`. For fields that form
//! re-classifies to an equal record, which is what the CLI's simple formats print.

use super::datatype::DataType;
use super::overlap::ByteSpan;
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

/// Offset reported by [`ByteSpan`] for a field declared without one
pub const UNPOSITIONED: i64 = -1;

/// Attribute prefix carrying a code override directive
pub const CODE_OVERRIDE_TAG: &str = "%code_override=";

/// A classified line plus the 1-based line number it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub line_no: usize,
    pub line: Line,
}

impl Record {
    pub fn new(line_no: usize, line: Line) -> Self {
        Record { line_no, line }
    }
}

/// One classified INI line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Line {
    /// Empty or whitespace only
    Blank,
    /// `; text`, stored without the leading `;`
    Comment(String),
    /// `[Name]`
    Section(String),
    /// scalar, bits, array or 2-D array field
    Field(Field),
    /// `name = string, encoding, length`
    StringField(StringField),
    /// Generic `key = a, b, c`
    KeyValue(KeyValue),
    /// `#define condition = value`
    Define(Define),
    /// `#if condition`
    BeginConditional(String),
    /// `#else`
    ConditionalElse,
    /// `#endif`
    EndConditional,
    /// `table = id, map, "title", page`
    Table(Table),
    /// Anything the classifier did not recognise, kept verbatim
    Unknown(String),
}

/// Structural kind of a field-like line, as seen by code generators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldKind {
    Scalar,
    Bits,
    Array,
    Array2d,
    String,
    Table,
}

impl Line {
    /// Short name of the variant, used by the simple output formats
    pub fn kind_name(&self) -> &'static str {
        match self {
            Line::Blank => "blank",
            Line::Comment(_) => "comment",
            Line::Section(_) => "section",
            Line::Field(field) => match field.shape {
                FieldShape::Scalar => "scalar",
                FieldShape::Bits { .. } => "bits",
                FieldShape::Array { .. } => "array",
                FieldShape::Array2d { .. } => "array2d",
            },
            Line::StringField(_) => "string",
            Line::KeyValue(_) => "key-value",
            Line::Define(_) => "define",
            Line::BeginConditional(_) => "if",
            Line::ConditionalElse => "else",
            Line::EndConditional => "endif",
            Line::Table(_) => "table",
            Line::Unknown(_) => "unknown",
        }
    }

    /// The structural kind, for field-like lines only
    pub fn field_kind(&self) -> Option<FieldKind> {
        match self {
            Line::Field(field) => Some(field.kind()),
            Line::StringField(string) => Some(string.kind()),
            Line::Table(_) => Some(FieldKind::Table),
            _ => None,
        }
    }

    /// The override slot of a field or table, if it has one
    pub fn code_override(&self) -> Option<&CodeOverride> {
        match self {
            Line::Field(field) => field.code_override.as_ref(),
            Line::Table(table) => table.code_override.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn code_override_mut(&mut self) -> Option<&mut CodeOverride> {
        match self {
            Line::Field(field) => field.code_override.as_mut(),
            Line::Table(table) => table.code_override.as_mut(),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Line::Field(field) => Some(field),
            _ => None,
        }
    }

    /// Lines that carry no content for code generation
    pub fn is_trivia(&self) -> bool {
        matches!(self, Line::Blank | Line::Comment(_) | Line::Unknown(_))
    }
}

/// A code override directive (`%code_override=...`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CodeOverride {
    /// `name=<ident>`: use `ident` verbatim in generated code
    Name(String),
    /// `unused`: the field has no counterpart in code
    Unused,
    /// `$key`: refers to `#define key = ...`, not yet resolved
    Indirect(String),
    /// An indirect reference after resolution. Targets are shared per key.
    Resolved { key: String, target: Rc<Line> },
    /// Any other value
    Other(String),
}

impl CodeOverride {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if let Some(key) = value.strip_prefix('$') {
            CodeOverride::Indirect(key.trim().to_string())
        } else if let Some(name) = value.strip_prefix("name=") {
            CodeOverride::Name(name.trim().to_string())
        } else if value == "unused" {
            CodeOverride::Unused
        } else {
            CodeOverride::Other(value.to_string())
        }
    }

    /// Finds the first override directive among a field's trailing attributes
    pub fn from_attributes(attributes: &[String]) -> Option<Self> {
        attributes
            .iter()
            .find_map(|attribute| attribute.strip_prefix(CODE_OVERRIDE_TAG))
            .map(CodeOverride::parse)
    }
}

impl fmt::Display for CodeOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeOverride::Name(name) => write!(f, "name={}", name),
            CodeOverride::Unused => f.write_str("unused"),
            CodeOverride::Indirect(key) | CodeOverride::Resolved { key, .. } => {
                write!(f, "${}", key)
            }
            CodeOverride::Other(text) => f.write_str(text),
        }
    }
}

/// Identifier used in source code for a field or table declared as `declared`
fn effective_name<'a>(declared: &'a str, code_override: Option<&'a CodeOverride>) -> &'a str {
    match code_override {
        Some(CodeOverride::Name(name)) => name,
        // One level of indirection only: the target's own declared name.
        Some(CodeOverride::Resolved { target, .. }) => match target.as_ref() {
            Line::Field(field) => &field.name,
            Line::Table(table) => &table.id,
            _ => declared,
        },
        _ => declared,
    }
}

/// Geometry of a memory-mapped field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldShape {
    Scalar,
    Bits { start: u32, end: u32 },
    Array { length: u32 },
    Array2d { cols: u32, rows: u32 },
}

/// A memory-mapped field: scalar, bits, or array
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// Raw key text
    pub name: String,
    pub data_type: DataType,
    /// Byte offset within the page, if the line declares one
    pub position: Option<u32>,
    pub shape: FieldShape,
    /// Trailing comma-separated tokens after the shape
    pub attributes: Vec<String>,
    pub code_override: Option<CodeOverride>,
}

impl Field {
    pub fn new(
        name: impl Into<String>,
        data_type: DataType,
        position: Option<u32>,
        shape: FieldShape,
        attributes: Vec<String>,
    ) -> Self {
        let code_override = CodeOverride::from_attributes(&attributes);
        Field {
            name: name.into(),
            data_type,
            position,
            shape,
            attributes,
            code_override,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self.shape {
            FieldShape::Scalar => FieldKind::Scalar,
            FieldShape::Bits { .. } => FieldKind::Bits,
            FieldShape::Array { .. } => FieldKind::Array,
            FieldShape::Array2d { .. } => FieldKind::Array2d,
        }
    }

    pub fn is_positioned(&self) -> bool {
        self.position.is_some()
    }

    pub fn is_bits(&self) -> bool {
        matches!(self.shape, FieldShape::Bits { .. })
    }

    pub fn is_unused(&self) -> bool {
        matches!(self.code_override, Some(CodeOverride::Unused))
    }

    /// Identifier of this field in source code, after overrides
    pub fn code_name(&self) -> &str {
        effective_name(&self.name, self.code_override.as_ref())
    }

    /// Distance in bytes from `Offset` to `OffsetEnd`
    fn extent(&self) -> i64 {
        let width = i64::from(self.data_type.width());
        match self.shape {
            FieldShape::Scalar | FieldShape::Bits { .. } => 0,
            FieldShape::Array { length } => i64::from(length.saturating_sub(1)) * width,
            FieldShape::Array2d { cols, rows } => i64::from(cols) * i64::from(rows) * width,
        }
    }
}

impl ByteSpan for Field {
    fn offset(&self) -> i64 {
        self.position.map_or(UNPOSITIONED, i64::from)
    }

    fn offset_end(&self) -> i64 {
        self.offset() + self.extent()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self.shape {
            FieldShape::Scalar => "scalar",
            FieldShape::Bits { .. } => "bits",
            FieldShape::Array { .. } | FieldShape::Array2d { .. } => "array",
        };
        write!(f, "{} = {}, {}", self.name, shape, self.data_type)?;
        if let Some(position) = self.position {
            write!(f, ", {}", position)?;
        }
        match self.shape {
            FieldShape::Scalar => {}
            FieldShape::Bits { start, end } => write!(f, ", [{}:{}]", start, end)?,
            FieldShape::Array { length } => write!(f, ", [{}]", length)?,
            FieldShape::Array2d { cols, rows } => write!(f, ", [{}x{}]", cols, rows)?,
        }
        for attribute in &self.attributes {
            write!(f, ", {}", attribute)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StringField {
    pub name: String,
    pub encoding: String,
    pub length: u32,
}

impl StringField {
    pub fn kind(&self) -> FieldKind {
        FieldKind::String
    }

    /// Strings take no code override, so this is always the declared name
    pub fn code_name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyValue {
    pub key: String,
    pub values: Vec<String>,
}

impl KeyValue {
    pub fn first_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Define {
    pub condition: String,
    pub value: String,
}

/// A 3-D table declaration. Its backing fields are ordinary field lines elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub id: String,
    pub map_id: String,
    /// Title including its surrounding quotes
    pub title: String,
    pub page: Option<u32>,
    pub code_override: Option<CodeOverride>,
}

impl Table {
    /// Title without the surrounding quotes
    pub fn title_text(&self) -> &str {
        self.title.trim_matches('"')
    }

    pub fn code_name(&self) -> &str {
        effective_name(&self.id, self.code_override.as_ref())
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Blank => Ok(()),
            Line::Comment(text) => write!(f, ";{}", text),
            Line::Section(name) => write!(f, "[{}]", name),
            Line::Field(field) => fmt::Display::fmt(field, f),
            Line::StringField(string) => write!(
                f,
                "{} = string, {}, {}",
                string.name, string.encoding, string.length
            ),
            Line::KeyValue(kv) => write!(f, "{} = {}", kv.key, kv.values.join(", ")),
            Line::Define(define) => write!(f, "#define {} = {}", define.condition, define.value),
            Line::BeginConditional(condition) => write!(f, "#if {}", condition),
            Line::ConditionalElse => f.write_str("#else"),
            Line::EndConditional => f.write_str("#endif"),
            Line::Table(table) => {
                write!(f, "table = {}, {}, {}, ", table.id, table.map_id, table.title)?;
                if let Some(page) = table.page {
                    write!(f, "{}", page)?;
                }
                if let Some(code_override) = &table.code_override {
                    write!(f, ", {}{}", CODE_OVERRIDE_TAG, code_override)?;
                }
                Ok(())
            }
            Line::Unknown(text) => f.write_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(name: &str, attributes: &[&str]) -> Field {
        Field::new(
            name,
            DataType::U08,
            Some(4),
            FieldShape::Scalar,
            attributes.iter().map(|a| a.to_string()).collect(),
        )
    }

    #[test]
    fn test_override_parsing() {
        assert_eq!(
            CodeOverride::parse("name=realName"),
            CodeOverride::Name("realName".to_string())
        );
        assert_eq!(CodeOverride::parse(" unused "), CodeOverride::Unused);
        assert_eq!(
            CodeOverride::parse("$egoKey"),
            CodeOverride::Indirect("egoKey".to_string())
        );
        assert_eq!(
            CodeOverride::parse("something"),
            CodeOverride::Other("something".to_string())
        );
    }

    #[test]
    fn test_code_name_follows_overrides() {
        assert_eq!(scalar("plain", &["\"ms\""]).code_name(), "plain");
        assert_eq!(
            scalar("iniName", &["\"ms\"", "%code_override=name=codeName"]).code_name(),
            "codeName"
        );

        let mut field = scalar("iniName", &["%code_override=$key"]);
        assert_eq!(field.code_name(), "iniName");
        field.code_override = Some(CodeOverride::Resolved {
            key: "key".to_string(),
            target: Rc::new(Line::Field(scalar("targetName", &[]))),
        });
        assert_eq!(field.code_name(), "targetName");
    }

    #[test]
    fn test_resolved_non_field_keeps_declared_name() {
        let mut field = scalar("iniName", &[]);
        field.code_override = Some(CodeOverride::Resolved {
            key: "key".to_string(),
            target: Rc::new(Line::Unknown("garbage".to_string())),
        });
        assert_eq!(field.code_name(), "iniName");
    }

    #[test]
    fn test_unused_marker() {
        assert!(scalar("spare", &["%code_override=unused"]).is_unused());
        assert!(!scalar("spare", &[]).is_unused());
    }

    #[test]
    fn test_array_offsets() {
        let one_dim = Field::new("a", DataType::U16, Some(10), FieldShape::Array { length: 4 }, vec![]);
        assert_eq!(one_dim.offset(), 10);
        assert_eq!(one_dim.offset_end(), 16);

        let two_dim = Field::new(
            "b",
            DataType::U08,
            Some(0),
            FieldShape::Array2d { cols: 4, rows: 3 },
            vec![],
        );
        assert_eq!(two_dim.offset_end(), 12);
    }

    #[test]
    fn test_unpositioned_field() {
        let field = Field::new("c", DataType::U08, None, FieldShape::Scalar, vec![]);
        assert!(!field.is_positioned());
        assert_eq!(field.offset(), UNPOSITIONED);
        assert_eq!(field.offset_end(), UNPOSITIONED);
    }

    #[test]
    fn test_empty_array_does_not_end_before_it_starts() {
        let field = Field::new("d", DataType::U16, Some(8), FieldShape::Array { length: 0 }, vec![]);
        assert_eq!(field.offset_end(), 8);
    }

    #[test]
    fn test_string_field_accessors() {
        let string = StringField {
            name: "ecuName".to_string(),
            encoding: "ASCII".to_string(),
            length: 20,
        };
        assert_eq!(string.kind(), FieldKind::String);
        assert_eq!(string.code_name(), "ecuName");
        assert_eq!(Line::StringField(string).field_kind(), Some(FieldKind::String));
    }

    #[test]
    fn test_table_names() {
        let table = Table {
            id: "veTable1Tbl".to_string(),
            map_id: "veTable1Map".to_string(),
            title: "\"VE Table\"".to_string(),
            page: Some(2),
            code_override: Some(CodeOverride::parse("name=fuelTable")),
        };
        assert_eq!(table.title_text(), "VE Table");
        assert_eq!(table.code_name(), "fuelTable");
        assert_eq!(
            Line::Table(table).to_string(),
            "table = veTable1Tbl, veTable1Map, \"VE Table\", 2, %code_override=name=fuelTable"
        );
    }
}
