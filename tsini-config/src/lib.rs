//! Configuration loader for the tsini tools.
//!
//! `defaults/tsini.default.toml` is embedded into the binary so that the documented
//! defaults and runtime behavior stay in sync. Callers layer user files and `--set`
//! overrides on top of it via [`Loader`] before deserializing into [`TsiniConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/tsini.default.toml");

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TsiniConfig {
    pub parser: ParserConfig,
    pub codegen: CodegenConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParserConfig {
    pub duplicate_sections: DuplicateSections,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateSections {
    Replace,
    Append,
}

/// Names used by the print-page generator.
#[derive(Debug, Clone, Deserialize)]
pub struct CodegenConfig {
    pub output_var: String,
    pub page_struct_prefix: String,
    pub constants_section: String,
    pub tables_section: String,
}

/// Stacks configuration sources, later ones winning, on top of the embedded defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// A loader holding only `tsini.default.toml`.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Add a TOML file that must exist.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Add a TOML file, skipped when it is not there.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Pin one dotted key (`codegen.output_var`) to a value, above every file.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Apply a `key=value` assignment as given on the command line.
    pub fn set_assignment(self, assignment: &str) -> Result<Self, ConfigError> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            ConfigError::Message(format!("expected key=value, got '{}'", assignment))
        })?;
        self.set_override(key.trim(), value.trim())
    }

    /// Merge every source and deserialize into [`TsiniConfig`].
    pub fn build(self) -> Result<TsiniConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// The embedded defaults with nothing layered on top.
pub fn load_defaults() -> Result<TsiniConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.parser.duplicate_sections, DuplicateSections::Replace);
        assert_eq!(config.codegen.output_var, "target");
        assert_eq!(config.codegen.page_struct_prefix, "configPage");
        assert_eq!(config.codegen.constants_section, "Constants");
        assert_eq!(config.codegen.tables_section, "TableEditor");
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("parser.duplicate_sections", "append")
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.parser.duplicate_sections, DuplicateSections::Append);
    }

    #[test]
    fn supports_cli_assignments() {
        let config = Loader::new()
            .set_assignment("codegen.output_var = Serial")
            .expect("assignment to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.codegen.output_var, "Serial");

        assert!(Loader::new().set_assignment("no-equals-sign").is_err());
    }

    #[test]
    fn rejects_unknown_policy() {
        let result = Loader::new()
            .set_override("parser.duplicate_sections", "merge")
            .expect("override to apply")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn layers_user_files() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("tsini.toml");
        fs::write(&path, "[codegen]\npage_struct_prefix = \"page\"\n").expect("write config");

        let config = Loader::new().with_file(&path).build().expect("config to build");
        assert_eq!(config.codegen.page_struct_prefix, "page");
        assert_eq!(config.codegen.output_var, "target");

        let missing = dir.path().join("absent.toml");
        assert!(Loader::new().with_file(&missing).build().is_err());
        assert!(Loader::new().with_optional_file(&missing).build().is_ok());
    }
}
