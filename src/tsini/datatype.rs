//! Data-type tags
//!
//! The dialect tags every memory-mapped field with a fixed-width integer type. The table
//! here is closed: a tag that is not listed is an authoring error, never a guess.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A field's storage type, as written in the INI file (`U08`, `S16`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataType {
    S08,
    S16,
    U08,
    U16,
}

impl DataType {
    /// The C type used for this tag in generated source
    pub fn c_type(self) -> &'static str {
        match self {
            DataType::S08 => "int8_t",
            DataType::S16 => "int16_t",
            DataType::U08 => "uint8_t",
            DataType::U16 => "uint16_t",
        }
    }

    /// Width in bytes
    pub fn width(self) -> u32 {
        match self {
            DataType::S08 | DataType::U08 => 1,
            DataType::S16 | DataType::U16 => 2,
        }
    }

    /// The tag as written in the INI file
    pub fn tag(self) -> &'static str {
        match self {
            DataType::S08 => "S08",
            DataType::S16 => "S16",
            DataType::U08 => "U08",
            DataType::U16 => "U16",
        }
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "S08" => Ok(DataType::S08),
            "S16" => Ok(DataType::S16),
            "U08" => Ok(DataType::U08),
            "U16" => Ok(DataType::U16),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
