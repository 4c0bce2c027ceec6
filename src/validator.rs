//! IR validation system
//!
//! Checks a finished IR against the guarantees the builder makes to emitters,
//! and checks raw input against the inbound contract.

use crate::ir::{MetaConstraintKind, TableIr};
use crate::naming;
use crate::types::Table;
use crate::{Result, ValidationResult};
use std::collections::{HashMap, HashSet};

/// IR validator
pub struct IrValidator;

impl IrValidator {
    /// Validate a finished IR, failing on the first batch of errors
    pub fn validate_strict(tables: &[TableIr]) -> Result<()> {
        Self::validate(tables).into_result()
    }

    /// Validate a finished IR and return all findings
    pub fn validate(tables: &[TableIr]) -> ValidationResult {
        let mut result = ValidationResult::new();

        for table in tables {
            result.merge(Self::validate_identifiers(table));
            result.merge(Self::validate_field_options(table));
            result.merge(Self::validate_resolution(table));
            if table.has_primary_key {
                result.merge(Self::validate_column_coverage(table));
            }
            if table.has_composite_primary_key {
                result.merge(Self::validate_composite_key(table));
            }
        }

        result.merge(Self::validate_association_symmetry(tables));
        result
    }

    /// Check raw input against the inbound contract
    pub fn validate_input(tables: &[Table]) -> ValidationResult {
        let mut result = ValidationResult::new();

        for (table, message) in Self::input_violations(tables) {
            result.add_error(format!("Table '{}': {}", table, message));
        }

        let names: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        for table in tables {
            for (column, target) in &table.foreign_keys().single {
                if !names.contains(target.table.as_str()) {
                    result.add_warning(format!(
                        "Foreign key '{}.{}' references unknown table '{}'",
                        table.name, column, target.table
                    ));
                }
            }
            for (name, constraint) in &table.constraints {
                let unknown = constraint
                    .columns
                    .iter()
                    .flatten()
                    .filter(|c| table.get_column(c).is_none())
                    .collect::<Vec<_>>();
                if let Some(column) = unknown.first() {
                    result.add_warning(format!(
                        "Constraint '{}' on '{}' references unknown column '{}'",
                        name, table.name, column
                    ));
                }
            }
            if !table.has_primary_key() {
                result.add_warning(format!("Table '{}' has no primary key", table.name));
            }
        }

        result
    }

    /// Contract violations as `(table, message)`, in input order
    pub(crate) fn input_violations(tables: &[Table]) -> Vec<(String, String)> {
        let mut violations = Vec::new();
        let mut seen_tables = HashSet::new();

        for table in tables {
            if !seen_tables.insert(table.name.as_str()) {
                violations.push((table.name.clone(), "table name is defined more than once".to_string()));
            }

            let mut seen_columns = HashSet::new();
            for column in &table.columns {
                if !seen_columns.insert(column.name.as_str()) {
                    violations.push((table.name.clone(), format!("duplicate column '{}'", column.name)));
                }
            }

            for pk in &table.primary_key_columns {
                if !seen_columns.contains(pk.as_str()) {
                    violations.push((
                        table.name.clone(),
                        format!("primary-key column '{}' is not a column of the table", pk),
                    ));
                }
            }

            for (name, constraint) in &table.constraints {
                if constraint.columns.is_none() {
                    violations.push((table.name.clone(), format!("constraint '{}' has no column list", name)));
                }
            }
        }

        violations
    }

    /// Names are valid identifiers, unique, and fields never share a name
    /// with relationships
    fn validate_identifiers(table: &TableIr) -> ValidationResult {
        let mut result = ValidationResult::new();
        let mut field_names = HashSet::new();

        for field in &table.fields {
            if !naming::is_valid_identifier(&field.name) {
                result.add_error(format!("Field '{}.{}' is not a valid identifier", table.name(), field.name));
            }
            if !field_names.insert(field.name.as_str()) {
                result.add_error(format!("Field name '{}.{}' is not unique", table.name(), field.name));
            }
        }

        let mut relationship_names = HashSet::new();
        for relationship in &table.relationships {
            if !naming::is_valid_identifier(&relationship.name) {
                result.add_error(format!(
                    "Relationship '{}.{}' is not a valid identifier",
                    table.name(),
                    relationship.name
                ));
            }
            if !relationship_names.insert(relationship.name.as_str()) {
                result.add_error(format!(
                    "Relationship name '{}.{}' is not unique",
                    table.name(),
                    relationship.name
                ));
            }
            if field_names.contains(relationship.name.as_str()) {
                result.add_error(format!(
                    "Relationship '{}.{}' shares its name with a field",
                    table.name(),
                    relationship.name
                ));
            }
        }

        result
    }

    fn validate_field_options(table: &TableIr) -> ValidationResult {
        let mut result = ValidationResult::new();
        for field in &table.fields {
            if let Err(message) = field.options.check(field.kind) {
                result.add_error(format!("Field '{}.{}': {}", table.name(), field.name, message));
            }
        }
        result
    }

    /// Every column is represented exactly once, by a standalone field or by
    /// a present relationship
    fn validate_column_coverage(table: &TableIr) -> ValidationResult {
        let mut result = ValidationResult::new();
        let single_pk = match table.table.primary_key_columns.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        };

        for column in &table.table.columns {
            let fields: Vec<_> = table.fields.iter().filter(|f| f.column == column.name).collect();
            let [field] = fields.as_slice() else {
                result.add_error(format!(
                    "Column '{}.{}' is mapped by {} fields, expected exactly one",
                    table.name(),
                    column.name,
                    fields.len()
                ));
                continue;
            };

            if single_pk == Some(column.name.as_str()) && field.handled_by_relationship {
                result.add_error(format!(
                    "Primary key '{}.{}' must stay a standalone field",
                    table.name(),
                    column.name
                ));
            }

            if field.handled_by_relationship && table.relationship_for_column(&column.name).is_none() {
                result.add_error(format!(
                    "Column '{}.{}' is marked handled but no relationship owns it",
                    table.name(),
                    column.name
                ));
            }
        }

        result
    }

    fn resolved_name(table: &TableIr, column: &str) -> Option<String> {
        let field = table.field_for_column(column)?;
        if field.handled_by_relationship {
            table.relationship_for_column(column).map(|r| r.name.clone())
        } else {
            Some(field.name.clone())
        }
    }

    /// A unique meta constraint covers the whole composite primary key
    fn validate_composite_key(table: &TableIr) -> ValidationResult {
        let mut result = ValidationResult::new();

        let expected: Option<HashSet<String>> = table
            .table
            .primary_key_columns
            .iter()
            .map(|c| Self::resolved_name(table, c))
            .collect();

        let Some(expected) = expected else {
            result.add_error(format!(
                "Composite primary key of '{}' has unresolvable columns",
                table.name()
            ));
            return result;
        };

        let covered = table.meta_constraints.iter().any(|c| {
            c.kind == MetaConstraintKind::Unique
                && c.fields.iter().cloned().collect::<HashSet<_>>() == expected
        });
        if !covered {
            result.add_error(format!(
                "Composite primary key of '{}' has no matching unique constraint",
                table.name()
            ));
        }

        result
    }

    /// Meta constraints and indexes only cite existing names
    fn validate_resolution(table: &TableIr) -> ValidationResult {
        let mut result = ValidationResult::new();

        let cited = table
            .meta_constraints
            .iter()
            .map(|c| (&c.name, &c.fields))
            .chain(table.meta_indexes.iter().map(|i| (&i.name, &i.fields)));

        for (name, fields) in cited {
            for field in fields {
                if !table.has_name(field) {
                    result.add_error(format!(
                        "Constraint '{}' on '{}' cites unknown name '{}'",
                        name,
                        table.name(),
                        field
                    ));
                }
            }
        }

        result
    }

    /// Each association table yields exactly two many-to-many specs, one per endpoint
    fn validate_association_symmetry(tables: &[TableIr]) -> ValidationResult {
        let mut result = ValidationResult::new();

        let mut by_through: HashMap<&str, Vec<&str>> = HashMap::new();
        for table in tables {
            for relationship in table.relationships.iter().filter(|r| r.is_many_to_many()) {
                if let Some(through) = &relationship.through_table {
                    by_through
                        .entry(through.as_str())
                        .or_default()
                        .push(relationship.source_table.as_str());
                }
            }
        }

        for table in tables.iter().filter(|t| t.is_association_table) {
            let sources = by_through.get(table.name()).cloned().unwrap_or_default();
            if sources.is_empty() {
                result.add_warning(format!(
                    "Association table '{}' produced no many-to-many relationships",
                    table.name()
                ));
                continue;
            }

            let mut expected: Vec<&str> = table
                .relationships
                .iter()
                .filter(|r| r.is_many_to_one())
                .map(|r| r.target_table.as_str())
                .collect();
            let mut actual = sources;
            expected.sort_unstable();
            actual.sort_unstable();

            if actual.len() != 2 || actual != expected {
                result.add_error(format!(
                    "Association table '{}' has many-to-many relationships on [{}], expected one on each of [{}]",
                    table.name(),
                    actual.join(", "),
                    expected.join(", ")
                ));
            }
        }

        result
    }
}
