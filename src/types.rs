//! Inbound schema records as delivered by the introspection collaborator

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A `(table, column)` pair naming the target of a foreign key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// One physical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Raw column name as stored in the database
    pub name: String,

    /// Raw database type string (`varchar`, `int4`, `CharField`, ...)
    #[serde(rename = "type")]
    pub raw_type: String,

    #[serde(default = "default_nullable")]
    pub nullable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,

    /// Best-effort, most backends leave it empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    #[serde(default)]
    pub is_primary_key: bool,

    /// Set when a single-column unique constraint or unique index covers this column
    #[serde(default)]
    pub is_unique: bool,

    #[serde(default)]
    pub is_foreign_key: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ColumnRef>,

    /// Ordered enumerated values, e.g. from a PostgreSQL enum type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

fn default_nullable() -> bool {
    true
}

impl Column {
    /// Create a nullable column with no flags set
    pub fn new(name: impl Into<String>, raw_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_type: raw_type.into(),
            nullable: true,
            size: None,
            precision: None,
            scale: None,
            collation: None,
            default: None,
            is_primary_key: false,
            is_unique: false,
            is_foreign_key: false,
            foreign_key: None,
            enum_values: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.is_foreign_key = true;
        self.foreign_key = Some(ColumnRef::new(table, column));
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn with_enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Fill `size`/`precision`/`scale` from a parameterized raw type such as
    /// `varchar(100)` or `numeric(12,4)` when the introspection left them empty
    fn fill_type_params(&mut self) {
        let Some(open) = self.raw_type.find('(') else {
            return;
        };
        let Some(close) = self.raw_type[open..].find(')') else {
            return;
        };
        let params: Vec<u32> = self.raw_type[open + 1..open + close]
            .split(',')
            .filter_map(|p| p.trim().parse::<u32>().ok())
            .collect();

        let base = self.raw_type[..open].trim().to_lowercase();
        let fixed_point = base.contains("numeric") || base.contains("decimal");

        match params.as_slice() {
            [precision, scale] if fixed_point => {
                self.precision.get_or_insert(*precision);
                self.scale.get_or_insert(*scale);
            }
            [precision] if fixed_point => {
                self.precision.get_or_insert(*precision);
            }
            [size] => {
                self.size.get_or_insert(*size);
            }
            _ => {}
        }
    }
}

/// One raw constraint or index, keyed by name on [`Table::constraints`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawConstraint {
    /// Constrained columns; `None` means the introspection record is malformed
    #[serde(default)]
    pub columns: Option<Vec<String>>,

    #[serde(default)]
    pub unique: bool,

    #[serde(default)]
    pub primary_key: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ColumnRef>,

    #[serde(default)]
    pub index: bool,

    #[serde(default)]
    pub check: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

impl RawConstraint {
    fn over<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: Some(columns.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn unique<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unique: true,
            ..Self::over(columns)
        }
    }

    pub fn primary_key<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unique: true,
            primary_key: true,
            index: true,
            ..Self::over(columns)
        }
    }

    pub fn index<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            index: true,
            ..Self::over(columns)
        }
    }

    pub fn unique_index<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unique: true,
            index: true,
            ..Self::over(columns)
        }
    }

    pub fn foreign_key<I, S>(columns: I, target: ColumnRef) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            foreign_key: Some(target),
            ..Self::over(columns)
        }
    }

    pub fn check<I, S>(columns: I, definition: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            check: true,
            definition: Some(definition.into()),
            ..Self::over(columns)
        }
    }

    /// Number of columns, zero when the list is absent
    pub fn arity(&self) -> usize {
        self.columns.as_ref().map_or(0, Vec::len)
    }
}

/// One relation as read from the database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,

    #[serde(default)]
    pub columns: Vec<Column>,

    /// Raw primary-key column names, declaration order preserved
    #[serde(default)]
    pub primary_key_columns: Vec<String>,

    /// Raw constraints and indexes by name
    #[serde(default)]
    pub constraints: IndexMap<String, RawConstraint>,

    /// Relation catalog: FK column -> target. Empty when the backend
    /// cannot introspect relations directly.
    #[serde(default)]
    pub relations: IndexMap<String, ColumnRef>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        if column.is_primary_key && !self.primary_key_columns.contains(&column.name) {
            self.primary_key_columns.push(column.name.clone());
        }
        if let Some(target) = &column.foreign_key {
            self.relations.insert(column.name.clone(), target.clone());
        }
        self.columns.push(column);
        self
    }

    pub fn constraint(mut self, name: impl Into<String>, constraint: RawConstraint) -> Self {
        self.constraints.insert(name.into(), constraint);
        self
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key_columns.is_empty()
    }

    pub fn has_composite_primary_key(&self) -> bool {
        self.primary_key_columns.len() > 1
    }

    /// Single-column foreign keys, preferring the relation catalog over
    /// parsing raw constraints. Multi-column foreign-key constraints are
    /// always read from the constraints and returned separately, since only
    /// single-column keys are supported.
    pub fn foreign_keys(&self) -> ForeignKeys {
        let mut by_column: IndexMap<String, ColumnRef> = IndexMap::new();
        let mut composite = Vec::new();

        for (name, constraint) in &self.constraints {
            let Some(target) = &constraint.foreign_key else {
                continue;
            };
            match constraint.columns.as_deref() {
                Some([column]) if self.relations.is_empty() => {
                    by_column.insert(column.clone(), target.clone());
                }
                Some(columns) if columns.len() > 1 => {
                    composite.push((name.clone(), columns.to_vec()));
                }
                _ => {}
            }
        }
        for (column, target) in &self.relations {
            by_column.insert(column.clone(), target.clone());
        }

        // Column order, not catalog order, decides discovery order
        let single = self
            .columns
            .iter()
            .filter_map(|c| by_column.get(&c.name).map(|t| (c.name.clone(), t.clone())))
            .collect();

        ForeignKeys { single, composite }
    }

    /// Derive the per-column flags that introspection normally computes:
    /// primary key membership, single-column uniqueness and foreign keys.
    /// Flags already set are kept.
    pub fn annotated(mut self) -> Self {
        let pk: HashSet<String> = self.primary_key_columns.iter().cloned().collect();

        let unique: HashSet<String> = self
            .constraints
            .values()
            .filter(|c| c.unique && !c.primary_key)
            .filter_map(|c| match c.columns.as_deref() {
                Some([column]) => Some(column.clone()),
                _ => None,
            })
            .collect();

        let fks = self.foreign_keys();

        for column in &mut self.columns {
            if pk.contains(&column.name) {
                column.is_primary_key = true;
            }
            if unique.contains(&column.name) {
                column.is_unique = true;
            }
            if let Some((_, target)) = fks.single.iter().find(|(name, _)| *name == column.name) {
                column.is_foreign_key = true;
                column.foreign_key.get_or_insert_with(|| target.clone());
            }
            column.fill_type_params();
        }

        self
    }
}

/// Foreign keys of one table, split by support
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForeignKeys {
    /// `(column, target)` in column order
    pub single: Vec<(String, ColumnRef)>,
    /// `(constraint name, columns)` of unsupported multi-column keys
    pub composite: Vec<(String, Vec<String>)>,
}

impl ForeignKeys {
    pub fn target_of(&self, column: &str) -> Option<&ColumnRef> {
        self.single
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, target)| target)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.single.iter().map(|(name, _)| name.as_str())
    }
}

/// A complete introspection snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    #[serde(default)]
    pub tables: Vec<Table>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_catalog_preferred_over_constraints() {
        let table = Table::new("post")
            .column(Column::new("id", "integer").primary_key())
            .column(Column::new("author_id", "integer").references("author", "id"))
            .column(Column::new("editor_id", "integer"))
            .constraint(
                "post_editor_fk",
                RawConstraint::foreign_key(["editor_id"], ColumnRef::new("author", "id")),
            );

        let fks = table.foreign_keys();
        assert_eq!(fks.single.len(), 1);
        assert_eq!(fks.single[0].0, "author_id");
    }

    #[test]
    fn test_constraints_parsed_when_catalog_empty() {
        let table = Table::new("line")
            .column(Column::new("id", "integer").primary_key())
            .column(Column::new("order_id", "integer"))
            .column(Column::new("product_id", "integer"))
            .column(Column::new("variant", "integer"))
            .constraint(
                "line_order_fk",
                RawConstraint::foreign_key(["order_id"], ColumnRef::new("order", "id")),
            )
            .constraint(
                "line_variant_fk",
                RawConstraint::foreign_key(
                    ["product_id", "variant"],
                    ColumnRef::new("variant", "product_id"),
                ),
            );

        let fks = table.foreign_keys();
        assert_eq!(fks.single, vec![("order_id".to_string(), ColumnRef::new("order", "id"))]);
        assert_eq!(fks.composite.len(), 1);
        assert_eq!(fks.composite[0].0, "line_variant_fk");
    }

    #[test]
    fn test_composite_constraints_read_alongside_catalog() {
        let table = Table::new("line")
            .column(Column::new("id", "integer").primary_key())
            .column(Column::new("order_id", "integer").references("order", "id"))
            .column(Column::new("product_id", "integer"))
            .column(Column::new("variant_no", "integer"))
            .constraint(
                "line_variant_fk",
                RawConstraint::foreign_key(
                    ["product_id", "variant_no"],
                    ColumnRef::new("variant", "product_id"),
                ),
            );

        let fks = table.foreign_keys();
        assert_eq!(fks.single, vec![("order_id".to_string(), ColumnRef::new("order", "id"))]);
        assert_eq!(
            fks.composite,
            vec![(
                "line_variant_fk".to_string(),
                vec!["product_id".to_string(), "variant_no".to_string()]
            )]
        );
    }

    #[test]
    fn test_annotated_derives_flags_and_params() {
        let mut table = Table::new("account");
        table.columns.push(Column::new("id", "integer"));
        table.columns.push(Column::new("email", "varchar(120)"));
        table.columns.push(Column::new("balance", "numeric(12,4)"));
        table.primary_key_columns.push("id".to_string());
        table.constraints.insert("account_email_key".to_string(), RawConstraint::unique(["email"]));

        let table = table.annotated();

        assert!(table.columns[0].is_primary_key);
        assert!(table.columns[1].is_unique);
        assert_eq!(table.columns[1].size, Some(120));
        assert_eq!(table.columns[2].precision, Some(12));
        assert_eq!(table.columns[2].scale, Some(4));
        assert_eq!(table.columns[2].size, None);
    }
}
