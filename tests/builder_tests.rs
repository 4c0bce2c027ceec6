//! End-to-end tests for the IR builder

use pretty_assertions::assert_eq;
use rustf_schema_ir::{
    BuilderConfig, Column, ColumnRef, DiagnosticKind, FieldKind, IrBuilder, IrValidator, MatchSource,
    MetaConstraintKind, RawConstraint, SchemaIrError, Table,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn blog() -> Vec<Table> {
    let author = Table::new("author")
        .column(Column::new("id", "integer").primary_key())
        .column(Column::new("name", "varchar(100)").not_null())
        .column(Column::new("email", "varchar(255)").not_null().unique());
    let post = Table::new("post")
        .column(Column::new("id", "integer").primary_key())
        .column(Column::new("title", "varchar(200)").not_null())
        .column(Column::new("body", "text"))
        .column(Column::new("author_id", "integer").not_null().references("author", "id"))
        .constraint("post_author_title_key", RawConstraint::unique(["author_id", "title"]));
    let tag = Table::new("tag")
        .column(Column::new("id", "integer").primary_key())
        .column(Column::new("label", "varchar(50)").not_null());
    let mut post_tag = Table::new("post_tag")
        .column(Column::new("post_id", "integer").not_null().references("post", "id"))
        .column(Column::new("tag_id", "integer").not_null().references("tag", "id"));
    post_tag.primary_key_columns = vec!["post_id".to_string(), "tag_id".to_string()];

    vec![author, post, tag, post_tag]
        .into_iter()
        .map(Table::annotated)
        .collect()
}

#[test]
fn test_blog_schema() {
    init_logging();
    let output = IrBuilder::new().build(&blog()).unwrap();

    assert_eq!(output.table_names(), vec!["author", "post", "tag", "post_tag"]);
    assert!(output.diagnostics.is_empty());

    let author = output.table("author").unwrap();
    assert_eq!(author.model_name, "Author");
    assert_eq!(author.field("id").unwrap().kind, FieldKind::AutoField);
    assert_eq!(author.field("name").unwrap().options.max_length, Some(100));
    assert!(author.field("email").unwrap().options.unique);
    assert!(author.is_crud_eligible());

    let post = output.table("post").unwrap();
    let relationship = post.relationship("author").unwrap();
    assert_eq!(relationship.related_name, "posts");
    assert_eq!(relationship.target_model_name, "Author");
    assert_eq!(
        post.visible_fields().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        vec!["id", "title", "body"]
    );
    assert_eq!(post.meta_constraints.len(), 1);
    assert_eq!(post.meta_constraints[0].kind, MetaConstraintKind::Unique);
    assert_eq!(post.meta_constraints[0].fields, vec!["author".to_string(), "title".to_string()]);

    let tags = post.relationship("tags").unwrap();
    assert_eq!(tags.related_name, "posts_via_post_tag");
    let posts = output.table("tag").unwrap().relationship("posts").unwrap();
    assert_eq!(posts.related_name, "tags_via_post_tag");

    let post_tag = output.table("post_tag").unwrap();
    assert!(post_tag.is_association_table);
    assert!(!post_tag.is_crud_eligible());
    assert_eq!(post_tag.meta_constraints[0].name, "post_tag_pkey");
    assert_eq!(
        post_tag.meta_constraints[0].fields,
        vec!["post".to_string(), "tag".to_string()]
    );
}

#[test]
fn test_built_ir_passes_validation() {
    let output = IrBuilder::new().build(&blog()).unwrap();
    let result = IrValidator::validate(&output.tables);

    assert!(!result.has_errors(), "unexpected errors: {:?}", result.errors);
    assert!(IrValidator::validate_strict(&output.tables).is_ok());
}

#[test]
fn test_build_is_deterministic() {
    let builder = IrBuilder::new();
    let first = builder.build(&blog()).unwrap().to_json().unwrap();
    let second = builder.build(&blog()).unwrap().to_json().unwrap();

    assert_eq!(first, second);
    assert!(first.contains("\"related_name\": \"posts\""));
}

#[test]
fn test_unknown_type_falls_back_to_text() {
    let place = Table::new("place")
        .column(Column::new("id", "integer").primary_key())
        .column(Column::new("area", "geometry"));

    let output = IrBuilder::new().build(&[place]).unwrap();
    let area = output.table("place").unwrap().field("area").unwrap();

    assert_eq!(area.kind, FieldKind::TextField);
    assert_eq!(area.match_source, MatchSource::Fallback);
    let diagnostic = output
        .diagnostics
        .of_kind(DiagnosticKind::UnmappableType)
        .next()
        .unwrap();
    assert_eq!(diagnostic.column.as_deref(), Some("area"));
}

#[test]
fn test_table_without_primary_key_is_excluded() {
    let audit = Table::new("audit_log")
        .column(Column::new("at", "timestamp"))
        .column(Column::new("message", "text"));

    let output = IrBuilder::new().build(&[audit]).unwrap();

    assert!(output.tables.is_empty());
    assert!(output.diagnostics.contains(DiagnosticKind::MissingPrimaryKey));
}

#[test]
fn test_table_without_primary_key_can_be_kept() {
    let audit = Table::new("audit_log")
        .column(Column::new("at", "timestamp"))
        .column(Column::new("message", "text"));
    let config = BuilderConfig {
        include_tables_without_primary_key: true,
        ..Default::default()
    };

    let output = IrBuilder::with_config(config).unwrap().build(&[audit]).unwrap();
    let audit = output.table("audit_log").unwrap();

    assert!(!audit.has_primary_key);
    assert!(!audit.is_crud_eligible());
    assert_eq!(audit.fields.len(), 2);
    assert!(output.diagnostics.contains(DiagnosticKind::MissingPrimaryKey));
}

#[test]
fn test_duplicate_table_is_rejected() {
    let table = Table::new("tag").column(Column::new("id", "integer").primary_key());

    let result = IrBuilder::new().build(&[table.clone(), table]);
    match result {
        Err(SchemaIrError::MalformedInput { table, message }) => {
            assert_eq!(table, "tag");
            assert!(message.contains("more than once"));
        }
        other => panic!("expected malformed input, got {:?}", other),
    }
}

#[test]
fn test_constraint_without_columns_is_rejected() {
    let mut table = Table::new("tag").column(Column::new("id", "integer").primary_key());
    table.constraints.insert("tag_broken".to_string(), RawConstraint::default());

    let result = IrBuilder::new().build(&[table]);
    assert!(matches!(result, Err(SchemaIrError::MalformedInput { .. })));
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = BuilderConfig {
        default_decimal_digits: 2,
        default_decimal_places: 4,
        ..Default::default()
    };
    assert!(matches!(IrBuilder::with_config(config), Err(SchemaIrError::Config(_))));
}

#[test]
fn test_config_from_yaml_drives_build() {
    let config = BuilderConfig::from_yaml_str(
        r#"
default_char_max_length: 64
relationship_suffix: "_ref"
"#,
    )
    .unwrap();

    let post = Table::new("post")
        .column(Column::new("id", "integer").primary_key())
        .column(Column::new("author", "varchar"))
        .column(Column::new("author_id", "integer").references("author", "id"));
    let author = Table::new("author").column(Column::new("id", "integer").primary_key());

    let output = IrBuilder::with_config(config).unwrap().build(&[author, post]).unwrap();
    let post = output.table("post").unwrap();

    assert_eq!(post.field("author").unwrap().options.max_length, Some(64));
    assert!(post.relationship("author_ref").is_some());
}

#[test]
fn test_every_column_is_represented_once() {
    let output = IrBuilder::new().build(&blog()).unwrap();

    for table in &output.tables {
        for column in &table.table.columns {
            let field = table.field_for_column(&column.name).unwrap();
            if field.handled_by_relationship {
                assert!(table.relationship_for_column(&column.name).is_some());
            }
        }
    }
}

#[test]
fn test_unannotated_input_gets_derived_flags() {
    let mut account = Table::new("account");
    account.columns.push(Column::new("id", "integer").not_null());
    account.columns.push(Column::new("email", "varchar(120)").not_null());
    account.primary_key_columns.push("id".to_string());
    account
        .constraints
        .insert("account_email_key".to_string(), RawConstraint::unique(["email"]));

    let user = Table::new("user").column(Column::new("id", "integer").primary_key());

    let mut profile = Table::new("profile");
    profile.columns.push(Column::new("user_id", "integer").not_null());
    profile.columns.push(Column::new("bio", "text"));
    profile.primary_key_columns.push("user_id".to_string());
    profile
        .relations
        .insert("user_id".to_string(), ColumnRef::new("user", "id"));

    let output = IrBuilder::new().build(&[account, user, profile]).unwrap();

    let account = output.table("account").unwrap();
    let email = account.field("email").unwrap();
    assert!(email.options.unique);
    assert_eq!(email.options.max_length, Some(120));
    assert_eq!(account.field("id").unwrap().kind, FieldKind::AutoField);
    assert!(account.meta_constraints.is_empty());
    assert!(account.meta_indexes.is_empty());

    let profile = output.table("profile").unwrap();
    let user_id = profile.field("user_id").unwrap();
    assert_eq!(user_id.kind, FieldKind::IntegerField);
    assert!(user_id.options.primary_key);
    assert!(user_id.is_foreign_key);
    assert!(!user_id.handled_by_relationship);
    assert!(profile.relationship("user").is_some());

    let unmarked: Vec<_> = output
        .diagnostics
        .of_kind(DiagnosticKind::UnmarkedForeignKeyField)
        .collect();
    assert_eq!(unmarked.len(), 1);
    assert_eq!(unmarked[0].table, "profile");
    assert_eq!(unmarked[0].column.as_deref(), Some("user_id"));
}

#[test]
fn test_flagged_input_reports_no_unmarked_keys() {
    let output = IrBuilder::new().build(&blog()).unwrap();
    assert!(!output.diagnostics.contains(DiagnosticKind::UnmarkedForeignKeyField));
}
