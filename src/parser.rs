//! Snapshot parser for YAML and JSON introspection dumps

use crate::types::{SchemaSnapshot, Table};
use crate::{Result, SchemaIrError};
use std::path::{Path, PathBuf};

#[cfg(feature = "tokio")]
use tokio::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
}

impl Format {
    fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            Some("json") => Ok(Format::Json),
            _ => Err(SchemaIrError::Parse(format!(
                "Unsupported snapshot file '{}': expected .yaml, .yml or .json",
                path.display()
            ))),
        }
    }
}

/// Snapshot parser
pub struct SnapshotParser;

impl SnapshotParser {
    /// Parse a YAML snapshot and derive per-column flags
    pub fn parse_yaml(contents: &str) -> Result<SchemaSnapshot> {
        let snapshot: SchemaSnapshot = serde_yaml::from_str(contents)
            .map_err(|e| SchemaIrError::Parse(format!("Failed to parse YAML snapshot: {}", e)))?;
        Ok(Self::annotate(snapshot))
    }

    /// Parse a JSON snapshot and derive per-column flags
    pub fn parse_json(contents: &str) -> Result<SchemaSnapshot> {
        let snapshot: SchemaSnapshot = serde_json::from_str(contents)
            .map_err(|e| SchemaIrError::Parse(format!("Failed to parse JSON snapshot: {}", e)))?;
        Ok(Self::annotate(snapshot))
    }

    fn parse_with(format: Format, contents: &str, path: &Path) -> Result<SchemaSnapshot> {
        let parsed = match format {
            Format::Yaml => Self::parse_yaml(contents),
            Format::Json => Self::parse_json(contents),
        };
        parsed.map_err(|e| match e {
            SchemaIrError::Parse(message) => {
                SchemaIrError::Parse(format!("'{}': {}", path.display(), message))
            }
            other => other,
        })
    }

    fn annotate(snapshot: SchemaSnapshot) -> SchemaSnapshot {
        SchemaSnapshot {
            tables: snapshot.tables.into_iter().map(Table::annotated).collect(),
        }
    }

    /// Parse a single snapshot file, format chosen by extension
    #[cfg(feature = "tokio")]
    pub async fn parse_file(path: &Path) -> Result<SchemaSnapshot> {
        let format = Format::from_path(path)?;
        let contents = fs::read_to_string(path).await?;
        let snapshot = Self::parse_with(format, &contents, path)?;
        log::debug!(
            "Loaded {} table(s) from snapshot '{}'",
            snapshot.tables.len(),
            path.display()
        );
        Ok(snapshot)
    }

    /// Parse a single snapshot file (sync version)
    pub fn parse_file_sync(path: &Path) -> Result<SchemaSnapshot> {
        let format = Format::from_path(path)?;
        let contents = std::fs::read_to_string(path)?;
        let snapshot = Self::parse_with(format, &contents, path)?;
        log::debug!(
            "Loaded {} table(s) from snapshot '{}'",
            snapshot.tables.len(),
            path.display()
        );
        Ok(snapshot)
    }

    /// Snapshot files of a directory in file-name order; `_`-prefixed files are skipped
    fn snapshot_files(entries: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = entries
            .into_iter()
            .filter(|path| Format::from_path(path).is_ok())
            .filter(|path| {
                path.file_name()
                    .map_or(false, |name| !name.to_string_lossy().starts_with('_'))
            })
            .collect();
        files.sort();
        files
    }

    fn merge(merged: &mut SchemaSnapshot, part: SchemaSnapshot, path: &Path) -> Result<()> {
        for table in part.tables {
            if merged.tables.iter().any(|t| t.name == table.name) {
                return Err(SchemaIrError::Parse(format!(
                    "Table '{}' in '{}' is already defined by another snapshot file",
                    table.name,
                    path.display()
                )));
            }
            merged.tables.push(table);
        }
        Ok(())
    }

    fn missing_directory(dir: &Path) -> SchemaIrError {
        SchemaIrError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Snapshot directory not found: {:?}", dir),
        ))
    }

    /// Parse all snapshot files in a directory into one snapshot
    #[cfg(feature = "tokio")]
    pub async fn parse_directory(dir: &Path) -> Result<SchemaSnapshot> {
        if !dir.exists() {
            return Err(Self::missing_directory(dir));
        }

        let mut paths = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            }
        }

        let mut snapshot = SchemaSnapshot::default();
        for path in Self::snapshot_files(paths) {
            let part = Self::parse_file(&path).await?;
            Self::merge(&mut snapshot, part, &path)?;
        }
        Ok(snapshot)
    }

    /// Parse all snapshot files in a directory (sync version)
    pub fn parse_directory_sync(dir: &Path) -> Result<SchemaSnapshot> {
        if !dir.exists() {
            return Err(Self::missing_directory(dir));
        }

        let paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();

        let mut snapshot = SchemaSnapshot::default();
        for path in Self::snapshot_files(paths) {
            let part = Self::parse_file_sync(&path)?;
            Self::merge(&mut snapshot, part, &path)?;
        }
        Ok(snapshot)
    }
}
