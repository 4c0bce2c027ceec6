//! Constraint and index resolution (pass 3)
//!
//! Raw constraints name physical columns. Here each column is re-expressed as
//! the final name that represents it: the many-to-one relationship that took
//! it over, or its own field. A constraint with any unresolvable column is
//! dropped as a whole.

use crate::builder::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::ir::{MetaConstraint, MetaConstraintKind, MetaIndex, RelatedTable, TableIr};
use crate::types::RawConstraint;
use crate::{Result, SchemaIrError};
use std::collections::HashSet;

/// Deduplication key: kind, sorted fields, definition
type DedupKey = (Option<MetaConstraintKind>, Vec<String>, Option<String>);

fn dedup_key(kind: Option<MetaConstraintKind>, fields: &[String], definition: Option<&str>) -> DedupKey {
    let mut sorted = fields.to_vec();
    sorted.sort();
    (kind, sorted, definition.map(str::to_string))
}

/// Resolve one raw column to its final field or relationship name
pub fn resolve_column(table: &RelatedTable<'_>, column: &str) -> Option<String> {
    let field = table.field_for_column(column)?;
    if field.handled_by_relationship {
        table.relationship_for_column(column).map(|r| r.name.clone())
    } else {
        Some(field.name.clone())
    }
}

/// Pass 3 driver
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintAnalyzer;

impl ConstraintAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Attach meta constraints and indexes to `table`, finishing its IR
    pub fn resolve(&self, table: RelatedTable<'_>, diagnostics: &mut Diagnostics) -> Result<TableIr> {
        let source = table.source;
        let mut constraints: Vec<MetaConstraint> = Vec::new();
        let mut indexes: Vec<MetaIndex> = Vec::new();
        let mut seen: HashSet<DedupKey> = HashSet::new();

        if source.has_composite_primary_key() {
            if let Some(constraint) = self.composite_key_constraint(&table, diagnostics) {
                seen.insert(dedup_key(Some(constraint.kind), &constraint.fields, None));
                constraints.push(constraint);
            }
        }

        for (name, raw) in &source.constraints {
            let columns = raw.columns.as_ref().ok_or_else(|| {
                SchemaIrError::malformed(&source.name, format!("constraint '{}' has no column list", name))
            })?;

            if columns.is_empty() && !raw.check {
                log::debug!("Skipping constraint '{}' on '{}': no columns", name, source.name);
                continue;
            }

            let Some(fields) = self.resolve_columns(&table, name, columns, diagnostics) else {
                continue;
            };

            match self.classify(&table, raw, &fields, &constraints) {
                Some(Classified::Unique) => {
                    let mut fields = fields;
                    fields.sort();
                    if seen.insert(dedup_key(Some(MetaConstraintKind::Unique), &fields, None)) {
                        constraints.push(MetaConstraint {
                            kind: MetaConstraintKind::Unique,
                            fields,
                            name: name.clone(),
                            definition: None,
                        });
                    } else {
                        log::debug!("Duplicate unique constraint '{}' on '{}' discarded", name, source.name);
                    }
                }
                Some(Classified::Index) => {
                    if seen.insert(dedup_key(None, &fields, None)) {
                        indexes.push(MetaIndex {
                            fields,
                            name: name.clone(),
                        });
                    } else {
                        log::debug!("Duplicate index '{}' on '{}' discarded", name, source.name);
                    }
                }
                Some(Classified::Check) => {
                    let definition = raw.definition.clone();
                    if seen.insert(dedup_key(Some(MetaConstraintKind::Check), &fields, definition.as_deref())) {
                        constraints.push(MetaConstraint {
                            kind: MetaConstraintKind::Check,
                            fields,
                            name: name.clone(),
                            definition,
                        });
                    }
                }
                None => {
                    log::trace!("Constraint '{}' on '{}' needs no model-level record", name, source.name);
                }
            }
        }

        log::debug!(
            "Table '{}': {} meta constraint(s), {} meta index(es)",
            source.name,
            constraints.len(),
            indexes.len()
        );

        Ok(TableIr {
            table: source.clone(),
            model_name: table.model_name,
            fields: table.fields,
            relationships: table.relationships,
            meta_constraints: constraints,
            meta_indexes: indexes,
            has_primary_key: source.has_primary_key(),
            has_composite_primary_key: source.has_composite_primary_key(),
            is_association_table: table.is_association_table,
        })
    }

    /// Resolve every column or report the first failure and give up
    fn resolve_columns(
        &self,
        table: &RelatedTable<'_>,
        constraint: &str,
        columns: &[String],
        diagnostics: &mut Diagnostics,
    ) -> Option<Vec<String>> {
        let mut fields = Vec::with_capacity(columns.len());
        for column in columns {
            match resolve_column(table, column) {
                Some(field) => fields.push(field),
                None => {
                    diagnostics.report(
                        Diagnostic::new(
                            DiagnosticKind::UnresolvableConstraintColumn,
                            &table.source.name,
                            "column has no field or relationship, constraint dropped",
                        )
                        .with_column(column)
                        .with_constraint(constraint),
                    );
                    return None;
                }
            }
        }
        Some(fields)
    }

    /// Unique constraint over the resolved names of all primary-key columns
    fn composite_key_constraint(
        &self,
        table: &RelatedTable<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Option<MetaConstraint> {
        let source = table.source;
        let name = source
            .constraints
            .iter()
            .find(|(_, c)| c.primary_key)
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| format!("{}_pkey", source.name));

        let mut fields = self.resolve_columns(table, &name, &source.primary_key_columns, diagnostics)?;
        fields.sort();

        Some(MetaConstraint {
            kind: MetaConstraintKind::Unique,
            fields,
            name,
            definition: None,
        })
    }

    fn classify(
        &self,
        table: &RelatedTable<'_>,
        raw: &RawConstraint,
        fields: &[String],
        captured: &[MetaConstraint],
    ) -> Option<Classified> {
        let is_plain_fk = raw.foreign_key.is_some();

        if raw.unique && !raw.primary_key && !is_plain_fk && fields.len() > 1 {
            return Some(Classified::Unique);
        }

        if raw.index && !raw.primary_key && !is_plain_fk {
            let single_unique_field = matches!(fields, [only] if table
                .fields
                .iter()
                .any(|f| &f.name == only && f.options.unique));

            let mut sorted = fields.to_vec();
            sorted.sort();
            let already_unique = raw.unique
                && captured
                    .iter()
                    .any(|c| c.kind == MetaConstraintKind::Unique && c.fields == sorted);

            if single_unique_field || already_unique {
                return None;
            }
            return Some(Classified::Index);
        }

        if raw.check {
            return Some(Classified::Check);
        }

        None
    }
}

enum Classified {
    Unique,
    Index,
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Column, RawConstraint, Table};
    use crate::relationships::RelationshipAnalyzer;
    use crate::{BuilderConfig, IrBuilder};

    fn related<'a>(tables: &'a [Table]) -> Vec<RelatedTable<'a>> {
        let builder = IrBuilder::new();
        let mut diagnostics = Diagnostics::new();
        let mapped = tables.iter().map(|t| builder.map_table(t, &mut diagnostics)).collect();
        RelationshipAnalyzer::new(&BuilderConfig::default()).analyze(mapped, &mut diagnostics)
    }

    #[test]
    fn test_missing_column_list_is_a_hard_error() {
        let mut table = Table::new("post").column(Column::new("id", "integer").primary_key());
        table.constraints.insert("post_broken".to_string(), RawConstraint::default());
        let tables = vec![table];

        let result = ConstraintAnalyzer::new().resolve(related(&tables).remove(0), &mut Diagnostics::new());
        assert!(matches!(result, Err(SchemaIrError::MalformedInput { .. })));
    }

    #[test]
    fn test_single_unique_field_index_is_skipped() {
        let tables = vec![Table::new("account")
            .column(Column::new("id", "integer").primary_key())
            .column(Column::new("email", "varchar").unique())
            .constraint("account_email_key", RawConstraint::unique_index(["email"]))];

        let ir = ConstraintAnalyzer::new()
            .resolve(related(&tables).remove(0), &mut Diagnostics::new())
            .unwrap();
        assert!(ir.meta_indexes.is_empty());
        assert!(ir.meta_constraints.is_empty());
    }
}
