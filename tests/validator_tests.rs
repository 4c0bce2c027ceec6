//! Tests for the IR validator module

use rustf_schema_ir::{
    BuilderConfig, Column, IrBuilder, IrValidator, MetaIndex, RawConstraint, SchemaIrError, Table,
    TableIr,
};

fn blog_ir() -> Vec<TableIr> {
    let author = Table::new("author")
        .column(Column::new("id", "integer").primary_key())
        .column(Column::new("name", "varchar(100)").not_null());
    let post = Table::new("post")
        .column(Column::new("id", "integer").primary_key())
        .column(Column::new("title", "varchar(200)").not_null())
        .column(Column::new("author_id", "integer").not_null().references("author", "id"));
    let tag = Table::new("tag").column(Column::new("id", "integer").primary_key());
    let mut post_tag = Table::new("post_tag")
        .column(Column::new("post_id", "integer").not_null().references("post", "id"))
        .column(Column::new("tag_id", "integer").not_null().references("tag", "id"));
    post_tag.primary_key_columns = vec!["post_id".to_string(), "tag_id".to_string()];

    let tables: Vec<Table> = vec![author, post, tag, post_tag]
        .into_iter()
        .map(Table::annotated)
        .collect();
    IrBuilder::new().build(&tables).unwrap().tables
}

fn table_mut<'a>(tables: &'a mut [TableIr], name: &str) -> &'a mut TableIr {
    tables.iter_mut().find(|t| t.name() == name).unwrap()
}

#[test]
fn test_valid_ir() {
    let result = IrValidator::validate(&blog_ir());
    assert!(!result.has_errors(), "unexpected errors: {:?}", result.errors);
    assert!(!result.has_warnings());
}

#[test]
fn test_relationship_shadowing_field() {
    let mut tables = blog_ir();
    let post = table_mut(&mut tables, "post");
    post.relationships[0].name = "title".to_string();

    let result = IrValidator::validate(&tables);
    assert!(result.errors.iter().any(|e| e.contains("shares its name with a field")));
}

#[test]
fn test_invalid_identifier() {
    let mut tables = blog_ir();
    table_mut(&mut tables, "author").fields[1].name = "class".to_string();

    let result = IrValidator::validate(&tables);
    assert!(result.errors.iter().any(|e| e.contains("not a valid identifier")));
}

#[test]
fn test_missing_composite_key_constraint() {
    let mut tables = blog_ir();
    table_mut(&mut tables, "post_tag").meta_constraints.clear();

    let result = IrValidator::validate(&tables);
    assert!(result
        .errors
        .iter()
        .any(|e| e.contains("has no matching unique constraint")));
}

#[test]
fn test_index_citing_unknown_name() {
    let mut tables = blog_ir();
    table_mut(&mut tables, "post").meta_indexes.push(MetaIndex {
        fields: vec!["author_id".to_string()],
        name: "post_author_idx".to_string(),
    });

    let result = IrValidator::validate(&tables);
    assert!(result
        .errors
        .iter()
        .any(|e| e.contains("cites unknown name 'author_id'")));
}

#[test]
fn test_inconsistent_field_options() {
    let mut tables = blog_ir();
    table_mut(&mut tables, "author").fields[1].options.max_length = None;

    let result = IrValidator::validate(&tables);
    assert!(result.errors.iter().any(|e| e.contains("author.name")));
}

#[test]
fn test_handled_column_without_relationship() {
    let mut tables = blog_ir();
    table_mut(&mut tables, "post").relationships.retain(|r| r.name != "author");

    let result = IrValidator::validate(&tables);
    assert!(result
        .errors
        .iter()
        .any(|e| e.contains("marked handled but no relationship owns it")));
}

#[test]
fn test_broken_association_symmetry() {
    let mut tables = blog_ir();
    table_mut(&mut tables, "tag").relationships.clear();

    let result = IrValidator::validate(&tables);
    assert!(result.errors.iter().any(|e| e.contains("Association table 'post_tag'")));
}

#[test]
fn test_validate_strict() {
    assert!(IrValidator::validate_strict(&blog_ir()).is_ok());

    let mut tables = blog_ir();
    table_mut(&mut tables, "post_tag").meta_constraints.clear();
    assert!(matches!(
        IrValidator::validate_strict(&tables),
        Err(SchemaIrError::Validation(_))
    ));
}

#[test]
fn test_validate_input() {
    let mut post = Table::new("post")
        .column(Column::new("id", "integer").primary_key())
        .column(Column::new("author_id", "integer").references("author", "id"))
        .constraint("post_ghost_idx", RawConstraint::index(["ghost"]));
    let log = Table::new("audit_log").column(Column::new("message", "text"));

    let result = IrValidator::validate_input(&[post.clone(), log]);
    assert!(!result.has_errors());
    assert_eq!(result.warnings.len(), 3);

    post.constraints.insert("post_broken".to_string(), RawConstraint::default());
    let result = IrValidator::validate_input(&[post]);
    assert!(result.errors.iter().any(|e| e.contains("no column list")));
}

#[test]
fn test_ir_with_kept_primary_keyless_table() {
    let config = BuilderConfig {
        include_tables_without_primary_key: true,
        ..Default::default()
    };
    let log = Table::new("audit_log").column(Column::new("message", "text"));
    let tables = IrBuilder::with_config(config).unwrap().build(&[log]).unwrap().tables;

    assert!(!IrValidator::validate(&tables).has_errors());
}
