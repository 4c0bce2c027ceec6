//! Relationship inference (pass 2)
//!
//! Many-to-one relationships come from single-column foreign keys. Many-to-many
//! relationships are inferred from association tables: exactly two foreign-key
//! columns that together form the whole primary key. Names are then made
//! unique per source table and self-references get a distinct related name.

use crate::builder::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::config::BuilderConfig;
use crate::ir::{MappedTable, RelatedTable, RelationshipKind, RelationshipSpec};
use crate::mapping::{FieldKind, FieldOptions, WireSchema};
use crate::naming;
use crate::types::ColumnRef;
use std::collections::{HashMap, HashSet};

/// Read-only facts about a table that other tables may point at
struct TargetInfo {
    model_name: String,
    /// Wire descriptor per raw column
    column_wire: HashMap<String, WireSchema>,
    primary_key_wire: Option<WireSchema>,
}

impl TargetInfo {
    fn key_wire(&self, column: &str) -> WireSchema {
        self.column_wire
            .get(column)
            .or(self.primary_key_wire.as_ref())
            .cloned()
            .unwrap_or_else(|| {
                WireSchema::for_field(FieldKind::IntegerField, &FieldOptions::default(), false, false)
            })
    }
}

/// Association-table classification of one table
#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    /// `(column, target)` in column order
    pub first: (String, ColumnRef),
    pub second: (String, ColumnRef),
    /// Raw columns outside the primary key
    pub extra_columns: Vec<String>,
}

/// Classify `table` as an association table: exactly two single-column
/// foreign keys whose columns are, as a set, the full primary key
pub fn detect_association(table: &MappedTable<'_>) -> Option<Association> {
    let fks = table.source.foreign_keys();
    let [first, second] = fks.single.as_slice() else {
        return None;
    };

    let fk_columns: HashSet<&str> = fks.columns().collect();
    let pk_columns: HashSet<&str> = table
        .source
        .primary_key_columns
        .iter()
        .map(String::as_str)
        .collect();
    if fk_columns.len() != 2 || fk_columns != pk_columns {
        return None;
    }

    let extra_columns = table
        .source
        .columns
        .iter()
        .filter(|c| !pk_columns.contains(c.name.as_str()))
        .map(|c| c.name.clone())
        .collect();

    Some(Association {
        first: first.clone(),
        second: second.clone(),
        extra_columns,
    })
}

/// Pass 2 driver
pub struct RelationshipAnalyzer<'c> {
    config: &'c BuilderConfig,
}

impl<'c> RelationshipAnalyzer<'c> {
    pub fn new(config: &'c BuilderConfig) -> Self {
        Self { config }
    }

    pub fn analyze<'a>(
        &self,
        tables: Vec<MappedTable<'a>>,
        diagnostics: &mut Diagnostics,
    ) -> Vec<RelatedTable<'a>> {
        let targets: HashMap<String, TargetInfo> = tables
            .iter()
            .map(|t| {
                let info = TargetInfo {
                    model_name: t.model_name.clone(),
                    column_wire: t
                        .fields
                        .iter()
                        .map(|f| (f.column.clone(), f.wire.clone()))
                        .collect(),
                    primary_key_wire: t.primary_key_field().map(|f| f.wire.clone()),
                };
                (t.source.name.clone(), info)
            })
            .collect();

        let associations: Vec<Option<Association>> = tables.iter().map(detect_association).collect();

        let mut related: Vec<RelatedTable<'a>> = tables
            .into_iter()
            .zip(associations.iter())
            .map(|(table, association)| self.many_to_one(table, association.is_some(), &targets, diagnostics))
            .collect();

        // Many-to-many specs land on the endpoint tables, collected first
        let mut pending: Vec<RelationshipSpec> = Vec::new();
        for (index, association) in associations.iter().enumerate() {
            if let Some(association) = association {
                pending.extend(self.many_to_many(&related[index], association, &targets, diagnostics));
            }
        }
        for spec in pending {
            if let Some(endpoint) = related.iter_mut().find(|t| t.source.name == spec.source_table) {
                endpoint.relationships.push(spec);
            }
        }

        for table in &mut related {
            self.resolve_conflicts(table);
        }
        self.unique_related_names(&mut related);

        log::info!(
            "Relationship analysis complete: {} relationship(s), {} association table(s)",
            related.iter().map(|t| t.relationships.len()).sum::<usize>(),
            related.iter().filter(|t| t.is_association_table).count()
        );

        related
    }

    fn many_to_one<'a>(
        &self,
        table: MappedTable<'a>,
        is_association_table: bool,
        targets: &HashMap<String, TargetInfo>,
        diagnostics: &mut Diagnostics,
    ) -> RelatedTable<'a> {
        let source = table.source;
        let mut fields = table.fields;
        let mut relationships: Vec<RelationshipSpec> = Vec::new();
        let fks = source.foreign_keys();

        for (constraint, columns) in &fks.composite {
            diagnostics.report(
                Diagnostic::new(
                    DiagnosticKind::MultiColumnForeignKey,
                    &source.name,
                    format!(
                        "multi-column foreign key over ({}) is not supported, skipped",
                        columns.join(", ")
                    ),
                )
                .with_constraint(constraint),
            );
        }

        let field_names: HashSet<String> = fields.iter().map(|f| f.name.clone()).collect();
        let single_pk = (source.primary_key_columns.len() == 1).then(|| source.primary_key_columns[0].as_str());
        let source_plural = naming::pluralize(&naming::to_compound_lower(&source.name));

        for (column, target) in &fks.single {
            let Some(target_info) = targets.get(&target.table) else {
                diagnostics.report(
                    Diagnostic::new(
                        DiagnosticKind::UnresolvableRelationshipTarget,
                        &source.name,
                        format!(
                            "target table '{}' not found or excluded, column kept as a plain field",
                            target.table
                        ),
                    )
                    .with_column(column),
                );
                continue;
            };

            let mut name = naming::sanitize_identifier(&naming::relationship_stem(column));
            let model_clash = self.config.suffix_on_model_name_clash
                && name == target_info.model_name.to_lowercase();
            if field_names.contains(&name)
                || relationships.iter().any(|r| r.name == name)
                || model_clash
            {
                log::debug!(
                    "Relationship name '{}' on '{}' clashes, appending '{}'",
                    name,
                    source.name,
                    self.config.relationship_suffix
                );
                name.push_str(&self.config.relationship_suffix);
            }

            let related_name = if relationships.iter().any(|r| r.target_table == target.table) {
                format!("{}_{}", source_plural, name)
            } else {
                source_plural.clone()
            };

            let nullable = source.get_column(column).map_or(true, |c| c.nullable);
            let wire = WireSchema::to_one(&target_info.key_wire(&target.column), nullable);

            log::debug!(
                "Many-to-one '{}' on {}.{} -> {}.{}",
                name,
                source.name,
                column,
                target.table,
                target.column
            );

            relationships.push(RelationshipSpec {
                name,
                kind: RelationshipKind::ManyToOne,
                source_table: source.name.clone(),
                target_table: target.table.clone(),
                target_model_name: target_info.model_name.clone(),
                source_columns: vec![column.clone()],
                target_columns: vec![target.column.clone()],
                related_name,
                on_delete: Some(self.config.on_delete_for(nullable)),
                nullable,
                through_table: None,
                through_fields: None,
                through_attributes: Vec::new(),
                is_self_referential: target.table == source.name,
                wire,
            });

            // The table's own primary key stays independently addressable
            if single_pk != Some(column.as_str()) {
                if let Some(field) = fields.iter_mut().find(|f| &f.column == column) {
                    field.handled_by_relationship = true;
                }
            }
        }

        RelatedTable {
            source,
            model_name: table.model_name,
            fields,
            relationships,
            is_association_table,
        }
    }

    fn many_to_many(
        &self,
        through: &RelatedTable<'_>,
        association: &Association,
        targets: &HashMap<String, TargetInfo>,
        diagnostics: &mut Diagnostics,
    ) -> Vec<RelationshipSpec> {
        let (first_column, first_target) = &association.first;
        let (second_column, second_target) = &association.second;
        let through_name = &through.source.name;

        let (Some(first_info), Some(second_info)) =
            (targets.get(&first_target.table), targets.get(&second_target.table))
        else {
            diagnostics.report(Diagnostic::new(
                DiagnosticKind::UnresolvableRelationshipTarget,
                through_name,
                format!(
                    "association between '{}' and '{}' skipped, an endpoint is not in the working set",
                    first_target.table, second_target.table
                ),
            ));
            return Vec::new();
        };

        let through_attributes: Vec<String> = association
            .extra_columns
            .iter()
            .filter_map(|column| through.field_for_column(column).map(|f| f.name.clone()))
            .collect();
        if !through_attributes.is_empty() {
            diagnostics.report(Diagnostic::new(
                DiagnosticKind::AssociationAttributes,
                through_name,
                format!(
                    "association table carries extra attributes ({}), kept as through attributes",
                    through_attributes.join(", ")
                ),
            ));
        }

        let self_referential = first_target.table == second_target.table;
        log::debug!(
            "Association table '{}' links '{}' and '{}'",
            through_name,
            first_target.table,
            second_target.table
        );

        let endpoints = [
            (first_column, first_target, second_column, second_target, second_info),
            (second_column, second_target, first_column, first_target, first_info),
        ];

        endpoints
            .into_iter()
            .map(|(near_column, near_target, far_column, far_target, far_info)| {
                let name = if self_referential {
                    naming::pluralize(&naming::sanitize_identifier(&naming::relationship_stem(far_column)))
                } else {
                    naming::pluralize(&naming::to_compound_lower(&far_target.table))
                };
                let related_name = format!(
                    "{}_via_{}",
                    naming::pluralize(&naming::to_compound_lower(&near_target.table)),
                    naming::sanitize_identifier(through_name)
                );

                RelationshipSpec {
                    name: naming::sanitize_identifier(&name),
                    kind: RelationshipKind::ManyToMany,
                    source_table: near_target.table.clone(),
                    target_table: far_target.table.clone(),
                    target_model_name: far_info.model_name.clone(),
                    source_columns: vec![near_column.clone()],
                    target_columns: vec![far_column.clone()],
                    related_name,
                    on_delete: None,
                    nullable: true,
                    through_table: Some(through_name.clone()),
                    through_fields: Some((near_column.clone(), far_column.clone())),
                    through_attributes: through_attributes.clone(),
                    is_self_referential: self_referential,
                    wire: WireSchema::to_many(&far_info.key_wire(&far_target.column)),
                }
            })
            .collect()
    }

    /// Suffix repeated relationship names, never reusing a field name, then
    /// mark self-references
    fn resolve_conflicts(&self, table: &mut RelatedTable<'_>) {
        let mut used: HashSet<String> = table.fields.iter().map(|f| f.name.clone()).collect();

        for relationship in &mut table.relationships {
            let name = naming::unique_name(&relationship.name, |n| used.contains(n));
            if name != relationship.name {
                log::debug!(
                    "Relationship '{}' on '{}' renamed to '{}'",
                    relationship.name,
                    table.source.name,
                    name
                );
                relationship.name = name;
            }
            used.insert(relationship.name.clone());

            if relationship.source_table == relationship.target_table {
                relationship.is_self_referential = true;
                let marker = &self.config.self_reference_marker;
                if !relationship.related_name.contains(marker.as_str()) {
                    relationship.related_name.push_str(marker);
                }
            }
        }
    }

    /// Reverse accessors land on the target, so they must be unique per target table
    fn unique_related_names(&self, tables: &mut [RelatedTable<'_>]) {
        let mut used_by_target: HashMap<String, HashSet<String>> = HashMap::new();

        for table in tables.iter_mut() {
            for relationship in &mut table.relationships {
                let used = used_by_target.entry(relationship.target_table.clone()).or_default();
                let related_name = naming::unique_name(&relationship.related_name, |n| used.contains(n));
                used.insert(related_name.clone());
                relationship.related_name = related_name;
            }
        }
    }
}
