//! Tests for the snapshot parser module

use rustf_schema_ir::{IrBuilder, SchemaIrError, SnapshotParser};
use std::path::Path;
use tempfile::TempDir;
use tokio::fs;

const AUTHORS_YAML: &str = r#"
tables:
  - name: author
    columns:
      - name: id
        type: integer
        nullable: false
      - name: name
        type: varchar(100)
        nullable: false
    primary_key_columns: [id]
"#;

const POSTS_JSON: &str = r#"{
  "tables": [
    {
      "name": "post",
      "columns": [
        {"name": "id", "type": "integer", "nullable": false},
        {"name": "title", "type": "varchar(200)", "nullable": false},
        {"name": "author_id", "type": "integer", "nullable": false}
      ],
      "primary_key_columns": ["id"],
      "constraints": {
        "post_author_title_key": {"columns": ["author_id", "title"], "unique": true}
      },
      "relations": {"author_id": {"table": "author", "column": "id"}}
    }
  ]
}"#;

/// Helper function to create a test snapshot directory
async fn create_snapshot_dir() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();

    fs::write(dir.join("01_authors.yaml"), AUTHORS_YAML).await.unwrap();
    fs::write(dir.join("02_posts.json"), POSTS_JSON).await.unwrap();
    fs::write(dir.join("_draft.yaml"), "tables: [ {broken").await.unwrap();
    fs::write(dir.join("README.md"), "not a snapshot").await.unwrap();

    temp_dir
}

#[tokio::test]
async fn test_parse_yaml_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("authors.yml");
    fs::write(&path, AUTHORS_YAML).await.unwrap();

    let snapshot = SnapshotParser::parse_file(&path).await.unwrap();
    let author = &snapshot.tables[0];

    assert_eq!(author.name, "author");
    assert!(author.columns[0].is_primary_key);
    assert_eq!(author.columns[1].size, Some(100));
    assert!(!author.columns[1].nullable);
}

#[tokio::test]
async fn test_parse_json_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("posts.json");
    fs::write(&path, POSTS_JSON).await.unwrap();

    let snapshot = SnapshotParser::parse_file(&path).await.unwrap();
    let post = &snapshot.tables[0];

    assert_eq!(post.constraints.len(), 1);
    assert!(post.columns[2].is_foreign_key);
    assert_eq!(post.columns[2].foreign_key.as_ref().unwrap().table, "author");
}

#[tokio::test]
async fn test_parse_directory() {
    let temp_dir = create_snapshot_dir().await;

    let snapshot = SnapshotParser::parse_directory(temp_dir.path()).await.unwrap();
    let names: Vec<_> = snapshot.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["author", "post"]);

    let output = IrBuilder::new().build(&snapshot.tables).unwrap();
    let post = output.table("post").unwrap();
    assert_eq!(post.relationship("author").unwrap().related_name, "posts");
    assert_eq!(
        post.meta_constraints[0].fields,
        vec!["author".to_string(), "title".to_string()]
    );
}

#[tokio::test]
async fn test_parse_directory_rejects_duplicate_tables() {
    let temp_dir = create_snapshot_dir().await;
    fs::write(temp_dir.path().join("03_again.yaml"), AUTHORS_YAML)
        .await
        .unwrap();

    let result = SnapshotParser::parse_directory(temp_dir.path()).await;
    match result {
        Err(SchemaIrError::Parse(message)) => assert!(message.contains("author")),
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_parse_missing_directory() {
    let result = SnapshotParser::parse_directory(Path::new("/nonexistent/snapshots")).await;
    assert!(matches!(result, Err(SchemaIrError::Io(_))));
}

#[tokio::test]
async fn test_parse_file_reports_path_on_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.json");
    fs::write(&path, "{\"tables\": [").await.unwrap();

    match SnapshotParser::parse_file(&path).await {
        Err(SchemaIrError::Parse(message)) => {
            assert!(message.contains("broken.json"));
            assert!(message.contains("Failed to parse JSON snapshot"));
            assert!(!message.contains("Parse error"));
        }
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn test_parse_directory_sync() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("authors.yaml"), AUTHORS_YAML).unwrap();
    std::fs::write(temp_dir.path().join("posts.json"), POSTS_JSON).unwrap();

    let snapshot = SnapshotParser::parse_directory_sync(temp_dir.path()).unwrap();
    assert_eq!(snapshot.tables.len(), 2);

    let single = SnapshotParser::parse_file_sync(&temp_dir.path().join("posts.json")).unwrap();
    assert_eq!(single.tables[0].name, "post");
}

#[test]
fn test_unsupported_extension() {
    let result = SnapshotParser::parse_file_sync(Path::new("schema.toml"));
    assert!(matches!(result, Err(SchemaIrError::Parse(_))));
}
