//! Section Grouper and the Document model
//!
//! The coalesced entry stream is split at every `[Section]` marker. Lines before the first
//! marker land in a synthetic `"None"` section. Section order follows first appearance.
//!
//! A section name that appears twice replaces the earlier entries by default. This mirrors
//! how the dialect's consumers have always treated repeated headers; callers that want the
//! entries accumulated instead opt into [`DuplicateSections::Append`].

use super::conditionals::{collect_if_records, Entry};
use super::line::{Line, Record};
use serde::Serialize;

/// Name of the section holding lines that precede the first header
pub const PREAMBLE_SECTION: &str = "None";

/// What to do when a section header repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DuplicateSections {
    /// The later group wholly replaces the earlier one
    #[default]
    Replace,
    /// The later group's entries are appended to the earlier one
    Append,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub name: String,
    pub entries: Vec<Entry>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Section {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Records of this section with the `#if` branch of every conditional taken
    pub fn if_records(&self) -> Vec<&Record> {
        let mut records = Vec::new();
        collect_if_records(&self.entries, &mut records);
        records
    }
}

/// A parsed INI file: ordered sections of ordered entries
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    sections: Vec<Section>,
}

impl Document {
    /// Entries of the named section
    pub fn get(&self, name: &str) -> Option<&[Entry]> {
        self.section(name).map(|section| section.entries.as_slice())
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|section| section.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    fn insert(&mut self, section: Section, policy: DuplicateSections) {
        match self.sections.iter_mut().find(|s| s.name == section.name) {
            Some(existing) => match policy {
                DuplicateSections::Replace => existing.entries = section.entries,
                DuplicateSections::Append => existing.entries.extend(section.entries),
            },
            None => self.sections.push(section),
        }
    }
}

/// Split `entries` into sections at every top-level section marker
pub fn group_sections(entries: Vec<Entry>, policy: DuplicateSections) -> Document {
    let mut document = Document::default();
    let mut current: Option<Section> = None;

    for entry in entries {
        match entry {
            Entry::Line(Record {
                line: Line::Section(name),
                ..
            }) => {
                if let Some(done) = current.replace(Section::new(name)) {
                    document.insert(done, policy);
                }
            }
            entry => current
                .get_or_insert_with(|| Section::new(PREAMBLE_SECTION))
                .entries
                .push(entry),
        }
    }
    if let Some(done) = current {
        document.insert(done, policy);
    }

    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tsini::classify::classify_line;
    use crate::tsini::conditionals::coalesce_conditionals;

    fn entries(source: &str) -> Vec<Entry> {
        let records = source
            .lines()
            .enumerate()
            .map(|(i, text)| Record::new(i + 1, classify_line(text, i + 1).unwrap()))
            .collect();
        coalesce_conditionals(records).unwrap()
    }

    fn texts(entries: &[Entry]) -> Vec<String> {
        entries
            .iter()
            .filter_map(Entry::as_line)
            .map(|line| line.to_string())
            .collect()
    }

    #[test]
    fn test_sections_in_order() {
        let doc = group_sections(entries("[A]\na = 1\n[B]\nb = 2\nc = 3"), DuplicateSections::Replace);
        assert_eq!(doc.section_names().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(texts(doc.get("A").unwrap()), vec!["a = 1"]);
        assert_eq!(texts(doc.get("B").unwrap()), vec!["b = 2", "c = 3"]);
        assert!(doc.get("C").is_none());
    }

    #[test]
    fn test_preamble_goes_to_none_section() {
        let doc = group_sections(entries("; header\nversion = 3\n[A]\n"), DuplicateSections::Replace);
        assert_eq!(doc.section_names().collect::<Vec<_>>(), vec!["None", "A"]);
        assert_eq!(texts(doc.get(PREAMBLE_SECTION).unwrap()), vec!["; header", "version = 3"]);
    }

    #[test]
    fn test_no_preamble_when_first_line_is_a_section() {
        let doc = group_sections(entries("[A]\na = 1"), DuplicateSections::Replace);
        assert!(doc.get(PREAMBLE_SECTION).is_none());
    }

    #[test]
    fn test_empty_input_gives_empty_document() {
        let doc = group_sections(Vec::new(), DuplicateSections::Replace);
        assert!(doc.is_empty());
    }

    #[test]
    fn test_repeated_section_last_write_wins() {
        let doc = group_sections(entries("[Foo]\na=1\n[Bar]\n[Foo]\nb=2"), DuplicateSections::Replace);
        assert_eq!(texts(doc.get("Foo").unwrap()), vec!["b = 2"]);
        // The replaced section keeps its first position
        assert_eq!(doc.section_names().collect::<Vec<_>>(), vec!["Foo", "Bar"]);
    }

    #[test]
    fn test_repeated_section_append_policy() {
        let doc = group_sections(entries("[Foo]\na=1\n[Foo]\nb=2"), DuplicateSections::Append);
        assert_eq!(texts(doc.get("Foo").unwrap()), vec!["a = 1", "b = 2"]);
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_section_markers_inside_conditionals_stay_in_the_block() {
        let doc = group_sections(
            entries("[A]\n#if X\n[B]\nb = 1\n#endif\na = 2"),
            DuplicateSections::Replace,
        );
        assert_eq!(doc.len(), 1);
        let section = doc.section("A").unwrap();
        assert_eq!(section.entries.len(), 2);
        let taken: Vec<String> = section.if_records().iter().map(|r| r.line.to_string()).collect();
        assert_eq!(taken, vec!["[B]", "b = 1", "a = 2"]);
    }
}
