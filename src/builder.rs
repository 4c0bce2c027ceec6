//! IR assembler: runs the three passes in order over one schema snapshot

use crate::config::BuilderConfig;
use crate::constraints::ConstraintAnalyzer;
use crate::ir::{FieldMapping, MappedTable, TableIr};
use crate::mapping::{MatchSource, TypeMapper};
use crate::naming;
use crate::relationships::RelationshipAnalyzer;
use crate::types::Table;
use crate::validator::IrValidator;
use crate::{Result, SchemaIrError};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Degraded-path categories, each logged and recorded instead of failing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    UnmappableType,
    UnresolvableRelationshipTarget,
    UnresolvableConstraintColumn,
    MultiColumnForeignKey,
    MissingPrimaryKey,
    UnmarkedForeignKeyField,
    AssociationAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, table: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            column: None,
            constraint: None,
            message: message.into(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] table '{}'", self.kind, self.table)?;
        if let Some(column) = &self.column {
            write!(f, ", column '{}'", column)?;
        }
        if let Some(constraint) = &self.constraint {
            write!(f, ", constraint '{}'", constraint)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Ordered record of every degraded decision made during one build
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log at warn level and record
    pub fn report(&mut self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    /// Record without logging, for paths that already logged
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    pub fn contains(&self, kind: DiagnosticKind) -> bool {
        self.of_kind(kind).next().is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of one build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildOutput {
    pub tables: Vec<TableIr>,
    pub diagnostics: Diagnostics,
}

impl BuildOutput {
    pub fn table(&self, name: &str) -> Option<&TableIr> {
        self.tables.iter().find(|t| t.table.name == name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.table.name.as_str()).collect()
    }

    /// Pretty JSON of the tables, byte-identical for equal input
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.tables)?)
    }
}

/// Orchestrates type mapping, relationship inference and constraint resolution
#[derive(Debug, Clone, Default)]
pub struct IrBuilder {
    config: BuilderConfig,
}

impl IrBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BuilderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Build the IR for one snapshot. Fails only when the input violates the
    /// inbound contract; data-quality issues become diagnostics.
    pub fn build(&self, tables: &[Table]) -> Result<BuildOutput> {
        if let Some((table, message)) = IrValidator::input_violations(tables).into_iter().next() {
            return Err(SchemaIrError::MalformedInput { table, message });
        }

        let mut diagnostics = Diagnostics::new();
        let annotated = self.annotate(tables, &mut diagnostics);
        let working_set = self.working_set(&annotated, &mut diagnostics);

        log::info!("Mapping {} table(s)...", working_set.len());
        let mapped: Vec<MappedTable<'_>> = working_set
            .into_iter()
            .map(|table| self.map_table(table, &mut diagnostics))
            .collect();

        log::info!("Analyzing relationships...");
        let related = RelationshipAnalyzer::new(&self.config).analyze(mapped, &mut diagnostics);

        log::info!("Resolving constraints and indexes...");
        let analyzer = ConstraintAnalyzer::new();
        let tables = related
            .into_iter()
            .map(|table| analyzer.resolve(table, &mut diagnostics))
            .collect::<Result<Vec<_>>>()?;

        log::info!(
            "Intermediate representation complete: {} table(s), {} diagnostic(s)",
            tables.len(),
            diagnostics.len()
        );

        Ok(BuildOutput {
            tables,
            diagnostics,
        })
    }

    /// Derive per-column flags from the primary-key list, constraints and
    /// relation catalog. Flags already set are kept, so annotated input is
    /// unchanged.
    fn annotate(&self, tables: &[Table], diagnostics: &mut Diagnostics) -> Vec<Table> {
        tables
            .iter()
            .map(|table| {
                for (column, target) in &table.foreign_keys().single {
                    let unmarked = table
                        .get_column(column)
                        .map_or(false, |c| !c.is_foreign_key && c.foreign_key.is_none());
                    if unmarked {
                        diagnostics.report(
                            Diagnostic::new(
                                DiagnosticKind::UnmarkedForeignKeyField,
                                &table.name,
                                format!(
                                    "column not flagged as a foreign key, flag derived from reference to {}.{}",
                                    target.table, target.column
                                ),
                            )
                            .with_column(column),
                        );
                    }
                }
                table.clone().annotated()
            })
            .collect()
    }

    /// Tables the passes operate on; tables without a primary key are
    /// excluded unless configured otherwise
    fn working_set<'a>(&self, tables: &'a [Table], diagnostics: &mut Diagnostics) -> Vec<&'a Table> {
        tables
            .iter()
            .filter(|table| {
                if table.has_primary_key() {
                    return true;
                }
                let action = if self.config.include_tables_without_primary_key {
                    "kept without CRUD eligibility"
                } else {
                    "excluded from the IR"
                };
                diagnostics.report(Diagnostic::new(
                    DiagnosticKind::MissingPrimaryKey,
                    &table.name,
                    format!("table has no primary key, {}", action),
                ));
                self.config.include_tables_without_primary_key
            })
            .collect()
    }

    /// Pass 1: map every column of `table` to a uniquely named field
    pub fn map_table<'a>(&self, table: &'a Table, diagnostics: &mut Diagnostics) -> MappedTable<'a> {
        let model_name = model_name_for(&table.name);
        log::debug!("Mapping table '{}' to model '{}'", table.name, model_name);

        let mut used: HashSet<String> = HashSet::new();
        let mut fields = Vec::with_capacity(table.columns.len());

        for column in &table.columns {
            let mut mapping = TypeMapper::map_column(column, table, &self.config);

            if mapping.source == MatchSource::Fallback {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::UnmappableType,
                        &table.name,
                        format!("unmapped type '{}', using {}", column.raw_type, mapping.kind),
                    )
                    .with_column(&column.name),
                );
            }

            let name = naming::unique_name(&mapping.field_name, |n| used.contains(n));
            if name != mapping.field_name {
                log::debug!(
                    "Field name '{}' already used in '{}', renamed to '{}'",
                    mapping.field_name,
                    table.name,
                    name
                );
                mapping.options.alias_column(&name, &column.name);
            }
            used.insert(name.clone());

            fields.push(FieldMapping {
                name,
                kind: mapping.kind,
                options: mapping.options,
                column: column.name.clone(),
                is_primary_key: column.is_primary_key
                    || table.primary_key_columns.contains(&column.name),
                is_foreign_key: column.is_foreign_key || column.foreign_key.is_some(),
                handled_by_relationship: false,
                wire: mapping.wire,
                match_source: mapping.source,
            });
        }

        MappedTable {
            source: table,
            model_name,
            fields,
        }
    }
}

fn model_name_for(table_name: &str) -> String {
    let name = naming::to_compound_capitalized(table_name);
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("Model{}", name)
    } else {
        name
    }
}
