//! Intermediate representation produced by the builder passes
//!
//! The passes hand each other distinct types: [`MappedTable`] after type
//! mapping, [`RelatedTable`] after relationship inference, and [`TableIr`]
//! once constraints and indexes are resolved.

use crate::mapping::{FieldKind, FieldOptions, MatchSource, WireSchema};
use crate::types::Table;
use serde::{Deserialize, Serialize};

/// One column mapped to a target field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMapping {
    /// Sanitized identifier, unique within the table
    pub name: String,

    pub kind: FieldKind,

    pub options: FieldOptions,

    /// Raw column name this field was derived from
    pub column: String,

    pub is_primary_key: bool,

    pub is_foreign_key: bool,

    /// A relationship field supersedes this column's standalone representation
    pub handled_by_relationship: bool,

    pub wire: WireSchema,

    pub match_source: MatchSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipKind {
    ManyToOne,
    ManyToMany,
}

/// Referential action applied when the target row is deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDeletePolicy {
    #[default]
    Cascade,
    Protect,
    SetNull,
    SetDefault,
    Restrict,
    DoNothing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipSpec {
    pub name: String,
    pub kind: RelationshipKind,
    pub source_table: String,
    pub target_table: String,
    pub target_model_name: String,

    /// Raw columns on the source side; for many-to-many, the through-table
    /// column pointing at the source
    pub source_columns: Vec<String>,

    /// Raw columns on the target side; for many-to-many, the through-table
    /// column pointing at the target
    pub target_columns: Vec<String>,

    /// Name of the reverse accessor on the target
    pub related_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<OnDeletePolicy>,

    /// Whether the relationship may be absent (nullable FK column)
    pub nullable: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub through_table: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub through_fields: Option<(String, String)>,

    /// Extra non-key fields of the through table
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub through_attributes: Vec<String>,

    pub is_self_referential: bool,

    pub wire: WireSchema,
}

impl RelationshipSpec {
    pub fn is_many_to_one(&self) -> bool {
        self.kind == RelationshipKind::ManyToOne
    }

    pub fn is_many_to_many(&self) -> bool {
        self.kind == RelationshipKind::ManyToMany
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaConstraintKind {
    Unique,
    Check,
}

/// Model-level constraint over resolved field or relationship names
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaConstraint {
    pub kind: MetaConstraintKind,
    pub fields: Vec<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

/// Model-level index over resolved field or relationship names
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaIndex {
    pub fields: Vec<String>,
    pub name: String,
}

/// Stage 1 output: fields mapped, no relationships yet
#[derive(Debug, Clone)]
pub struct MappedTable<'a> {
    pub source: &'a Table,
    pub model_name: String,
    pub fields: Vec<FieldMapping>,
}

impl MappedTable<'_> {
    pub fn field_for_column(&self, column: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.column == column)
    }

    /// Field mapped from the first primary-key column
    pub fn primary_key_field(&self) -> Option<&FieldMapping> {
        self.source
            .primary_key_columns
            .first()
            .and_then(|column| self.field_for_column(column))
    }
}

/// Stage 2 output: relationships inferred, field visibility settled
#[derive(Debug, Clone)]
pub struct RelatedTable<'a> {
    pub source: &'a Table,
    pub model_name: String,
    pub fields: Vec<FieldMapping>,
    pub relationships: Vec<RelationshipSpec>,
    pub is_association_table: bool,
}

impl RelatedTable<'_> {
    pub fn field_for_column(&self, column: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.column == column)
    }

    /// Many-to-one relationship sourced from `column`
    pub fn relationship_for_column(&self, column: &str) -> Option<&RelationshipSpec> {
        self.relationships
            .iter()
            .find(|r| r.is_many_to_one() && r.source_columns.iter().any(|c| c == column))
    }
}

/// Finished per-table IR handed to emitters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableIr {
    /// Source record with derived column flags
    pub table: Table,
    pub model_name: String,
    pub fields: Vec<FieldMapping>,
    pub relationships: Vec<RelationshipSpec>,
    pub meta_constraints: Vec<MetaConstraint>,
    pub meta_indexes: Vec<MetaIndex>,
    /// Emitters must skip tables where this is false
    pub has_primary_key: bool,
    pub has_composite_primary_key: bool,
    /// Emitters must skip direct CRUD generation where this is true
    pub is_association_table: bool,
}

impl TableIr {
    pub fn name(&self) -> &str {
        &self.table.name
    }

    /// Fields rendered standalone, i.e. not superseded by a relationship
    pub fn visible_fields(&self) -> impl Iterator<Item = &FieldMapping> {
        self.fields.iter().filter(|f| !f.handled_by_relationship)
    }

    pub fn field(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_for_column(&self, column: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.column == column)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipSpec> {
        self.relationships.iter().find(|r| r.name == name)
    }

    pub fn relationship_for_column(&self, column: &str) -> Option<&RelationshipSpec> {
        self.relationships
            .iter()
            .find(|r| r.is_many_to_one() && r.source_columns.iter().any(|c| c == column))
    }

    /// Whether `name` is a field or relationship on this table
    pub fn has_name(&self, name: &str) -> bool {
        self.field(name).is_some() || self.relationship(name).is_some()
    }

    pub fn is_crud_eligible(&self) -> bool {
        self.has_primary_key && !self.is_association_table
    }
}
