//! RustF Schema IR - Schema intermediate representation builder
//!
//! This crate turns a database's structural metadata (columns, constraints,
//! foreign-key catalogs, indexes) into a normalized, relationship-aware
//! intermediate representation that code generators can emit from mechanically.
//!
//! # Features
//!
//! - **Type mapping** from raw database types to field kinds, tagged options
//!   and wire-schema descriptors
//! - **Relationship inference** for many-to-one keys and many-to-many
//!   association tables, with name-conflict resolution
//! - **Constraint resolution** re-expressed in terms of final field and
//!   relationship names
//! - **Diagnostics** for every degraded decision instead of hard failures
//! - **Snapshot loading** from YAML or JSON introspection dumps
//!
//! # Example
//!
//! ```rust
//! use rustf_schema_ir::{Column, IrBuilder, Table};
//!
//! # fn example() -> rustf_schema_ir::Result<()> {
//! let author = Table::new("author")
//!     .column(Column::new("id", "integer").primary_key())
//!     .column(Column::new("name", "varchar").not_null());
//! let post = Table::new("post")
//!     .column(Column::new("id", "integer").primary_key())
//!     .column(Column::new("title", "varchar").not_null())
//!     .column(Column::new("author_id", "integer").not_null().references("author", "id"));
//!
//! let output = IrBuilder::new().build(&[author, post])?;
//! let post_ir = output.table("post").unwrap();
//! assert_eq!(post_ir.relationships[0].name, "author");
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

pub mod builder;
pub mod config;
pub mod constraints;
pub mod ir;
pub mod mapping;
pub mod naming;
pub mod parser;
pub mod relationships;
pub mod types;
pub mod validator;

pub use builder::{BuildOutput, Diagnostic, DiagnosticKind, Diagnostics, IrBuilder};
pub use config::BuilderConfig;
pub use ir::*;
pub use mapping::{FieldKind, FieldOptions, MatchSource, TypeMapper, TypeMatch, WireSchema};
pub use parser::SnapshotParser;
pub use types::*;
pub use validator::IrValidator;

/// Schema IR errors
#[derive(Error, Debug)]
pub enum SchemaIrError {
    #[error("Malformed input for table '{table}': {message}")]
    MalformedInput { table: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaIrError {
    pub(crate) fn malformed(table: &str, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            table: table.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchemaIrError>;

/// Validation result containing all errors and warnings
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Create a new empty validation result
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add a validation error
    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    /// Add a validation warning
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Merge another validation result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn total_issues(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }

    /// Convert to a single error if there are validation errors
    pub fn into_result(self) -> Result<()> {
        if self.has_errors() {
            Err(SchemaIrError::Validation(format!(
                "IR validation failed with {} error(s):\n{}",
                self.errors.len(),
                self.errors.join("\n")
            )))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_result_into_result() {
        let mut result = ValidationResult::new();
        result.add_warning("minor".to_string());
        assert!(result.clone().into_result().is_ok());

        result.add_error("broken".to_string());
        let err = result.into_result().unwrap_err();
        assert!(err.to_string().contains("1 error(s)"));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_validation_result_merge() {
        let mut a = ValidationResult::new();
        a.add_error("a".to_string());
        let mut b = ValidationResult::new();
        b.add_warning("b".to_string());
        a.merge(b);
        assert_eq!(a.total_issues(), 2);
        assert!(a.has_warnings());
    }
}
