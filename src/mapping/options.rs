use super::FieldKind;
use serde::{Deserialize, Serialize};

/// Column default, with well-known database generators recognized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldDefault {
    /// Literal value copied from introspection
    Literal(serde_json::Value),
    /// Random UUID generated on insert (`gen_random_uuid()`, `uuid_generate_v4()`, ...)
    GeneratedUuid,
    /// Current timestamp (`now()`, `CURRENT_TIMESTAMP`, ...)
    CurrentTimestamp,
}

impl FieldDefault {
    pub fn from_raw(raw: &serde_json::Value, kind: FieldKind) -> Self {
        if let Some(text) = raw.as_str() {
            let lower = text.trim().to_lowercase();
            if kind == FieldKind::UuidField
                && matches!(
                    lower.as_str(),
                    "uuid4()" | "gen_random_uuid()" | "uuid_generate_v4()" | "newid()"
                )
            {
                return FieldDefault::GeneratedUuid;
            }
            if matches!(kind, FieldKind::DateTimeField | FieldKind::DateField)
                && matches!(
                    lower.as_str(),
                    "now()" | "current_timestamp" | "current_timestamp()" | "current_date"
                )
            {
                return FieldDefault::CurrentTimestamp;
            }
        }
        FieldDefault::Literal(raw.clone())
    }
}

/// Tagged field options, a closed set of named optional attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldOptions {
    /// Explicit primary-key marker; auto kinds imply it instead
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub primary_key: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null: Option<bool>,

    /// "May be blank" convention for text-like kinds, mirrors nullability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blank: Option<bool>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_digits: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_places: Option<u32>,

    /// Ordered enumerated values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,

    /// Physical column name when it differs from the field name beyond letter case
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_column: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<FieldDefault>,
}

impl FieldOptions {
    /// Record `db_column` when `field_name` differs from `column_name` in more
    /// than letter case, clear it otherwise
    pub fn alias_column(&mut self, field_name: &str, column_name: &str) {
        self.db_column = if field_name.eq_ignore_ascii_case(column_name) {
            None
        } else {
            Some(column_name.to_string())
        };
    }

    /// Remove options that auto-incrementing kinds already imply or forbid
    pub fn strip_for_auto(&mut self) {
        self.primary_key = false;
        self.default = None;
        self.null = None;
        self.blank = None;
        self.unique = false;
    }

    /// Check that the options are consistent with `kind`
    pub fn check(&self, kind: FieldKind) -> std::result::Result<(), String> {
        if kind.is_auto() {
            if self.primary_key {
                return Err(format!("{} implies the primary key, explicit option set", kind));
            }
            if self.null.is_some() || self.blank.is_some() || self.unique || self.default.is_some() {
                return Err(format!("{} cannot carry null, blank, unique or default", kind));
            }
        }

        if self.primary_key && self.default.is_some() {
            return Err("explicit primary key cannot carry a default".to_string());
        }

        if self.blank.is_some() && !kind.is_text_like() {
            return Err(format!("blank is only meaningful on text-like kinds, not {}", kind));
        }

        match self.max_length {
            Some(0) => return Err("max_length must be positive".to_string()),
            Some(_) if !kind.is_character() => {
                return Err(format!("max_length set on non-character kind {}", kind));
            }
            None if kind.is_character() => {
                return Err(format!("{} requires max_length", kind));
            }
            _ => {}
        }

        if let Some(choices) = &self.choices {
            if let Some(max_length) = self.max_length {
                if choices.iter().any(|c| c.chars().count() as u32 > max_length) {
                    return Err("a choice is longer than max_length".to_string());
                }
            }
        }

        match (kind.is_fixed_point(), self.max_digits, self.decimal_places) {
            (true, Some(digits), Some(places)) if places > digits => {
                Err(format!("decimal_places {} exceeds max_digits {}", places, digits))
            }
            (true, Some(_), Some(_)) => Ok(()),
            (true, _, _) => Err("DecimalField requires max_digits and decimal_places".to_string()),
            (false, None, None) => Ok(()),
            (false, _, _) => Err(format!("digit options set on non-decimal kind {}", kind)),
        }
    }
}
