//! # tsini
//!
//! A parser for the TunerStudio INI dialect used by engine-management firmware to describe
//! its configuration pages, plus the print-page code generator built on top of it.
//!
//! ```rust,ignore
//! use tsini::tsini::{group_overlapping, read};
//!
//! let doc = read("speeduino.ini")?;
//! for section in doc.sections() {
//!     println!("[{}] {} entries", section.name, section.entries.len());
//! }
//! ```

pub mod tsini;
