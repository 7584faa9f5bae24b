//! Line Classifier
//!
//! Turns one raw text line into one [`Line`]. Classification is ordered-priority regex
//! matching: patterns are tried in declaration order and the first full-line match wins.
//!
//! The order matters because the generic key-value shape is a superset of every field and
//! table shape, so it has to come last:
//!
//! 1. define (`#define a = b` would otherwise look like a key-value)
//! 2. comment
//! 3. section
//! 4. scalar, bits, 2-D array, 1-D array, string
//! 5. `#if` / `#else` / `#endif`
//! 6. table
//! 7. key-value
//!
//! Blank lines are detected before any pattern runs. A line that matches nothing becomes
//! [`Line::Unknown`]; the only failure is a field typed with a tag missing from the
//! data-type table.

use super::datatype::DataType;
use super::error::ParseError;
use super::line::{
    CodeOverride, Define, Field, FieldShape, KeyValue, Line, StringField, Table,
};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Comma with optional whitespace around it
const COMMA: &str = r"\s*,\s*";
/// Key up to the first `=`, then the `=`
const KEY: &str = r"^\s*(?P<key>[^;\s=\[#][^=]*?)\s*=\s*";
/// Type tag; validated against the data-type table after matching
const TYPE: &str = r"(?P<type>[SU]\d+)";
/// Optional comma-prefixed byte offset
const OFFSET: &str = r"(?:\s*,\s*(?P<offset>\d+))?";
/// Optional comma-prefixed remainder
const OTHER: &str = r"(?:\s*,\s*(?P<other>[^;]*?))?";
/// Optional inline comment, then end of line
const TRAILER: &str = r"\s*(?:;.*)?$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    Define,
    Comment,
    Section,
    Scalar,
    Bits,
    Array2d,
    Array,
    StringField,
    BeginConditional,
    ConditionalElse,
    EndConditional,
    Table,
    KeyValue,
}

/// Line patterns in precedence order
static LINE_PATTERNS: Lazy<Vec<(Pattern, Regex)>> = Lazy::new(|| {
    [
        (
            Pattern::Define,
            format!(r"^\s*#define\s+(?P<condition>[^=]+?)\s*=\s*(?P<value>[^;]*?){TRAILER}"),
        ),
        (Pattern::Comment, r"^\s*;(?P<comment>.*)$".to_string()),
        (
            Pattern::Section,
            format!(r"^\s*\[\s*(?P<name>[^\]]+?)\s*\]{TRAILER}"),
        ),
        (
            Pattern::Scalar,
            format!(r"{KEY}scalar{COMMA}{TYPE}{OFFSET}{OTHER}{TRAILER}"),
        ),
        (
            Pattern::Bits,
            format!(
                r"{KEY}bits{COMMA}{TYPE}{OFFSET}{COMMA}\[\s*(?P<start>\d+)\s*:\s*(?P<end>\d+)\s*\]{OTHER}{TRAILER}"
            ),
        ),
        (
            Pattern::Array2d,
            format!(
                r"{KEY}array{COMMA}{TYPE}{OFFSET}{COMMA}\[\s*(?P<cols>\d+)\s*x\s*(?P<rows>\d+)\s*\]{OTHER}{TRAILER}"
            ),
        ),
        (
            Pattern::Array,
            format!(r"{KEY}array{COMMA}{TYPE}{OFFSET}{COMMA}\[\s*(?P<length>\d+)\s*\]{OTHER}{TRAILER}"),
        ),
        (
            Pattern::StringField,
            format!(r"{KEY}string{COMMA}(?P<encoding>[^,;]+?){COMMA}(?P<length>\d+){TRAILER}"),
        ),
        (
            Pattern::BeginConditional,
            format!(r"^\s*#if\s+(?P<condition>[^;]*?){TRAILER}"),
        ),
        (Pattern::ConditionalElse, format!(r"^\s*#else{TRAILER}")),
        (Pattern::EndConditional, format!(r"^\s*#endif{TRAILER}")),
        (
            Pattern::Table,
            format!(
                r#"^\s*table\s*=\s*(?P<id>[^,;]+?){COMMA}(?P<map>[^,;]+?){COMMA}(?P<title>"[^"]*"){COMMA}(?P<page>\d*)(?:{COMMA}%code_override=(?P<code_override>[^;]*?))?{TRAILER}"#
            ),
        ),
        (Pattern::KeyValue, format!(r"{KEY}(?P<value>[^;]*?){TRAILER}")),
    ]
    .into_iter()
    .map(|(pattern, source)| {
        let regex = Regex::new(&source)
            .unwrap_or_else(|e| panic!("line pattern {:?} must compile: {}", pattern, e));
        (pattern, regex)
    })
    .collect()
});

/// Classify one line of INI text. `line_no` is only used for error reporting.
pub fn classify_line(text: &str, line_no: usize) -> Result<Line, ParseError> {
    let text = text.trim_end_matches(['\r', '\n']);
    if text.trim().is_empty() {
        return Ok(Line::Blank);
    }

    for (pattern, regex) in LINE_PATTERNS.iter() {
        if let Some(caps) = regex.captures(text) {
            if let Some(line) = build_line(*pattern, &caps, line_no)? {
                return Ok(line);
            }
        }
    }

    Ok(Line::Unknown(text.to_string()))
}

/// Build the record for a matched pattern. `None` means the match was unusable (a number
/// too large to represent) and the next pattern should be tried.
fn build_line(pattern: Pattern, caps: &Captures, line_no: usize) -> Result<Option<Line>, ParseError> {
    let line = match pattern {
        Pattern::Define => Line::Define(Define {
            condition: text(caps, "condition"),
            value: text(caps, "value"),
        }),
        Pattern::Comment => Line::Comment(caps["comment"].trim_end().to_string()),
        Pattern::Section => Line::Section(text(caps, "name")),
        Pattern::Scalar => return field(caps, Some(FieldShape::Scalar), line_no),
        Pattern::Bits => {
            let shape = match (number(caps, "start"), number(caps, "end")) {
                (Some(start), Some(end)) => Some(FieldShape::Bits { start, end }),
                _ => None,
            };
            return field(caps, shape, line_no);
        }
        Pattern::Array2d => {
            let shape = match (number(caps, "cols"), number(caps, "rows")) {
                (Some(cols), Some(rows)) => Some(FieldShape::Array2d { cols, rows }),
                _ => None,
            };
            return field(caps, shape, line_no);
        }
        Pattern::Array => {
            let shape = number(caps, "length").map(|length| FieldShape::Array { length });
            return field(caps, shape, line_no);
        }
        Pattern::StringField => {
            let Some(length) = number(caps, "length") else {
                return Ok(None);
            };
            Line::StringField(StringField {
                name: text(caps, "key"),
                encoding: text(caps, "encoding"),
                length,
            })
        }
        Pattern::BeginConditional => Line::BeginConditional(text(caps, "condition")),
        Pattern::ConditionalElse => Line::ConditionalElse,
        Pattern::EndConditional => Line::EndConditional,
        Pattern::Table => Line::Table(Table {
            id: text(caps, "id"),
            map_id: text(caps, "map"),
            title: text(caps, "title"),
            page: number(caps, "page"),
            code_override: caps
                .name("code_override")
                .map(|m| CodeOverride::parse(m.as_str())),
        }),
        Pattern::KeyValue => Line::KeyValue(KeyValue {
            key: text(caps, "key"),
            values: split_values(caps.name("value").map_or("", |m| m.as_str())),
        }),
    };
    Ok(Some(line))
}

fn field(caps: &Captures, shape: Option<FieldShape>, line_no: usize) -> Result<Option<Line>, ParseError> {
    let Some(shape) = shape else {
        return Ok(None);
    };
    let data_type = caps["type"]
        .parse::<DataType>()
        .map_err(|tag| ParseError::UnknownDataType { line: line_no, tag })?;
    let position = match caps.name("offset") {
        Some(m) => match m.as_str().parse() {
            Ok(position) => Some(position),
            Err(_) => return Ok(None),
        },
        None => None,
    };
    let attributes = caps
        .name("other")
        .map(|m| split_values(m.as_str()))
        .unwrap_or_default();

    Ok(Some(Line::Field(Field::new(
        text(caps, "key"),
        data_type,
        position,
        shape,
        attributes,
    ))))
}

fn text(caps: &Captures, name: &str) -> String {
    caps.name(name)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn number(caps: &Captures, name: &str) -> Option<u32> {
    caps.name(name).and_then(|m| m.as_str().parse().ok())
}

/// Split a comma-separated value list, keeping double-quoted commas inside their token
pub fn split_values(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in text.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => values.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    values.push(current.trim().to_string());
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tsini::overlap::ByteSpan;
    use rstest::rstest;

    fn classify(text: &str) -> Line {
        classify_line(text, 1).unwrap()
    }

    fn field_of(text: &str) -> Field {
        match classify(text) {
            Line::Field(field) => field,
            other => panic!("expected a field for {:?}, got {:?}", text, other),
        }
    }

    #[rstest]
    #[case("", "blank")]
    #[case("   \t ", "blank")]
    #[case("; a comment", "comment")]
    #[case("   ;indented = scalar, U08, 0", "comment")]
    #[case("[Constants]", "section")]
    #[case("[ TableEditor ] ; trailing", "section")]
    #[case("#define fuelUnits = \"ms\", \"us\"", "define")]
    #[case("#if CELSIUS", "if")]
    #[case("#else", "else")]
    #[case("  #endif ; done", "endif")]
    #[case("reqFuel = scalar, U08, 24, \"ms\", 0.1, 0.0, 0.0, 25.5, 1", "scalar")]
    #[case("nCylinders = bits, U08, 2, [4:7], \"INVALID\", \"1\"", "bits")]
    #[case("veTable = array, U08, 0, [16x16], \"%\", 1.0, 0, 0, 255, 0", "array2d")]
    #[case("rpmBins = array, U08, 256, [ 16], \"RPM\", 100.0", "array")]
    #[case("signature = string, ASCII, 20", "string")]
    #[case("table = veTable1Tbl, veTable1Map, \"VE Table\", 2", "table")]
    #[case("page = 1", "key-value")]
    #[case("xBins = rpmBins, rpm", "key-value")]
    #[case("just some stray text", "unknown")]
    #[case("#pragma once", "unknown")]
    fn test_classification_kinds(#[case] text: &str, #[case] kind: &str) {
        assert_eq!(classify(text).kind_name(), kind, "classifying {:?}", text);
    }

    #[test]
    fn test_scalar_attributes() {
        let field = field_of("reqFuel = scalar, U16, 24, \"ms\", 0.1 ; inline");
        assert_eq!(field.name, "reqFuel");
        assert_eq!(field.data_type, DataType::U16);
        assert_eq!(field.position, Some(24));
        assert_eq!(field.attributes, vec!["\"ms\"", "0.1"]);
        assert_eq!(field.code_override, None);
    }

    #[test]
    fn test_scalar_without_offset() {
        let field = field_of("lastValue = scalar, S08, \"C\", 1.0");
        assert_eq!(field.position, None);
        assert_eq!(field.attributes, vec!["\"C\"", "1.0"]);
        assert_eq!(field.offset(), -1);
    }

    #[test]
    fn test_bit_field() {
        let field = field_of("injLayout = bits, U08, 13, [6:7], \"Paired\", \"Semi\"");
        assert_eq!(field.shape, FieldShape::Bits { start: 6, end: 7 });
        assert_eq!(field.offset(), 13);
        assert_eq!(field.offset_end(), 13);
    }

    #[test]
    fn test_one_dim_array_end() {
        let field = field_of("foo = array, U16, 10, [4]");
        assert_eq!(field.shape, FieldShape::Array { length: 4 });
        assert_eq!(field.offset(), 10);
        assert_eq!(field.offset_end(), 16);
    }

    #[test]
    fn test_two_dim_array_end() {
        let field = field_of("foo = array, U08, 0, [4x3]");
        assert_eq!(field.shape, FieldShape::Array2d { cols: 4, rows: 3 });
        assert_eq!(field.offset_end(), 12);
    }

    #[test]
    fn test_code_override_attribute() {
        let field = field_of("iniName = scalar, U08, 3, \"ms\", %code_override=name=codeName");
        assert_eq!(field.code_name(), "codeName");

        let field = field_of("spare = scalar, U08, 4, %code_override=$spareKey");
        assert_eq!(
            field.code_override,
            Some(CodeOverride::Indirect("spareKey".to_string()))
        );
    }

    #[test]
    fn test_unsupported_data_type_is_fatal() {
        let err = classify_line("big = scalar, U32, 0", 7).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownDataType {
                line: 7,
                tag: "U32".to_string()
            }
        );
    }

    #[test]
    fn test_non_integer_type_is_not_a_field() {
        // F32 is not an integer tag shape at all, so the line is a plain key-value
        assert_eq!(classify("ratio = scalar, F32, 0").kind_name(), "key-value");
    }

    #[test]
    fn test_define_and_conditionals() {
        assert_eq!(
            classify("#define egoKey = egoName = scalar, U08, 5 ; note"),
            Line::Define(Define {
                condition: "egoKey".to_string(),
                value: "egoName = scalar, U08, 5".to_string(),
            })
        );
        assert_eq!(
            classify("#if LAMBDA ; alt units"),
            Line::BeginConditional("LAMBDA".to_string())
        );
    }

    #[test]
    fn test_table_line() {
        let line = classify(
            "table = veTable1Tbl, veTable1Map, \"VE Table\", 2, %code_override=name=fuelTable",
        );
        let Line::Table(table) = line else {
            panic!("expected a table");
        };
        assert_eq!(table.id, "veTable1Tbl");
        assert_eq!(table.map_id, "veTable1Map");
        assert_eq!(table.title_text(), "VE Table");
        assert_eq!(table.page, Some(2));
        assert_eq!(table.code_name(), "fuelTable");
    }

    #[test]
    fn test_key_value_keeps_quoted_commas() {
        let Line::KeyValue(kv) = classify("units = \"a, b\", c ; comment") else {
            panic!("expected a key-value");
        };
        assert_eq!(kv.key, "units");
        assert_eq!(kv.values, vec!["\"a, b\"", "c"]);
    }

    #[test]
    fn test_empty_key_value() {
        let Line::KeyValue(kv) = classify("empty =") else {
            panic!("expected a key-value");
        };
        assert!(kv.values.is_empty());
    }

    #[test]
    fn test_unknown_keeps_text() {
        assert_eq!(
            classify("stray garbage\r"),
            Line::Unknown("stray garbage".to_string())
        );
    }

    #[rstest]
    #[case("reqFuel = scalar, U08, 24, \"ms\", 0.1")]
    #[case("nCylinders = bits, U08, 2, [4:7], \"INVALID\", \"1\"")]
    #[case("rpmBins = array, U08, 256, [16], \"RPM\"")]
    #[case("veTable = array, S16, 0, [16x16]")]
    #[case("floating = scalar, U16, \"ms\"")]
    fn test_canonical_rendering_reclassifies(#[case] text: &str) {
        let line = classify(text);
        let rendered = line.to_string();
        assert_eq!(classify(&rendered), line, "rendered as {:?}", rendered);
    }

    #[test]
    fn test_canonical_rendering_normalises_whitespace() {
        insta::assert_snapshot!(
            classify("  rpmBins=array,U08,  256 ,[ 16 ],\"RPM\"").to_string(),
            @r#"rpmBins = array, U08, 256, [16], "RPM""#
        );
    }
}
