use crate::ir::OnDeletePolicy;
use crate::{Result, SchemaIrError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Builder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Max length for character columns that report no size
    #[serde(default = "default_char_max_length")]
    pub default_char_max_length: u32,

    #[serde(default = "default_decimal_digits")]
    pub default_decimal_digits: u32,

    #[serde(default = "default_decimal_places")]
    pub default_decimal_places: u32,

    /// Policy stamped on every many-to-one relationship
    #[serde(default)]
    pub default_on_delete: OnDeletePolicy,

    /// Use `set_null` instead of the default policy for nullable FK columns
    #[serde(default)]
    pub set_null_for_nullable_fk: bool,

    /// Also suffix a many-to-one name equal to the lowercase target model name.
    /// Off by default, so `author_id` pointing at `Author` stays `author`;
    /// generators that always suffixed on a model-name clash need it on.
    #[serde(default)]
    pub suffix_on_model_name_clash: bool,

    #[serde(default = "default_relationship_suffix")]
    pub relationship_suffix: String,

    #[serde(default = "default_self_reference_marker")]
    pub self_reference_marker: String,

    /// Keep tables without a primary key in the output instead of excluding them
    #[serde(default)]
    pub include_tables_without_primary_key: bool,
}

fn default_char_max_length() -> u32 {
    255
}
fn default_decimal_digits() -> u32 {
    10
}
fn default_decimal_places() -> u32 {
    2
}
fn default_relationship_suffix() -> String {
    "_rel".to_string()
}
fn default_self_reference_marker() -> String {
    "_children".to_string()
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            default_char_max_length: default_char_max_length(),
            default_decimal_digits: default_decimal_digits(),
            default_decimal_places: default_decimal_places(),
            default_on_delete: OnDeletePolicy::default(),
            set_null_for_nullable_fk: false,
            suffix_on_model_name_clash: false,
            relationship_suffix: default_relationship_suffix(),
            self_reference_marker: default_self_reference_marker(),
            include_tables_without_primary_key: false,
        }
    }
}

impl BuilderConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: BuilderConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let content = fs::read_to_string(path_ref).map_err(|e| {
            SchemaIrError::Config(format!(
                "Failed to read config file '{}': {}",
                path_ref.display(),
                e
            ))
        })?;

        let config = Self::from_yaml_str(&content).map_err(|e| {
            SchemaIrError::Config(format!(
                "Failed to load config file '{}': {}",
                path_ref.display(),
                e
            ))
        })?;

        log::debug!("Loaded builder configuration from: {}", path_ref.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_char_max_length == 0 {
            return Err(SchemaIrError::Config(
                "default_char_max_length must be greater than zero".to_string(),
            ));
        }
        if self.default_decimal_digits == 0 {
            return Err(SchemaIrError::Config(
                "default_decimal_digits must be greater than zero".to_string(),
            ));
        }
        if self.default_decimal_places > self.default_decimal_digits {
            return Err(SchemaIrError::Config(format!(
                "default_decimal_places ({}) exceeds default_decimal_digits ({})",
                self.default_decimal_places, self.default_decimal_digits
            )));
        }
        for (key, value) in [
            ("relationship_suffix", &self.relationship_suffix),
            ("self_reference_marker", &self.self_reference_marker),
        ] {
            if value.is_empty() {
                return Err(SchemaIrError::Config(format!("{} cannot be empty", key)));
            }
            if !value
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            {
                return Err(SchemaIrError::Config(format!(
                    "{} '{}' may only contain lowercase letters, digits and underscores",
                    key, value
                )));
            }
        }
        Ok(())
    }

    /// On-delete policy for a foreign key column with the given nullability
    pub fn on_delete_for(&self, nullable: bool) -> OnDeletePolicy {
        if nullable && self.set_null_for_nullable_fk {
            OnDeletePolicy::SetNull
        } else {
            self.default_on_delete
        }
    }
}
