//! Type mapping from raw database types to field kinds, options and wire descriptors
//!
//! Matching runs in three ordered stages: an exact lookup in a static type
//! table, a chain of substring heuristics, and a text fallback. The stage that
//! fired is reported through [`MatchSource`] so callers can tell a confident
//! mapping from a guess.

mod kind;
mod options;
mod wire;

pub use kind::FieldKind;
pub use options::{FieldDefault, FieldOptions};
pub use wire::{WireSchema, WireType};

use crate::config::BuilderConfig;
use crate::naming;
use crate::types::{Column, Table};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which matching stage produced a [`TypeMatch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Exact,
    Heuristic,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMatch {
    pub kind: FieldKind,
    pub source: MatchSource,
}

impl TypeMatch {
    pub fn is_fallback(&self) -> bool {
        self.source == MatchSource::Fallback
    }
}

/// Result of mapping one column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMapping {
    /// Sanitized field name, not yet made unique within the table
    pub field_name: String,
    pub kind: FieldKind,
    pub options: FieldOptions,
    pub wire: WireSchema,
    pub source: MatchSource,
}

static EXACT_TYPES: Lazy<HashMap<String, FieldKind>> = Lazy::new(|| {
    use FieldKind::*;

    let mut map: HashMap<String, FieldKind> = [
        ("integer", IntegerField),
        ("int", IntegerField),
        ("int4", IntegerField),
        ("mediumint", IntegerField),
        ("serial", IntegerField),
        ("serial4", IntegerField),
        ("bigint", BigIntegerField),
        ("int8", BigIntegerField),
        ("bigserial", BigIntegerField),
        ("serial8", BigIntegerField),
        ("smallint", SmallIntegerField),
        ("int2", SmallIntegerField),
        ("tinyint", SmallIntegerField),
        ("smallserial", SmallIntegerField),
        ("serial2", SmallIntegerField),
        ("integer unsigned", PositiveIntegerField),
        ("int unsigned", PositiveIntegerField),
        ("bigint unsigned", PositiveBigIntegerField),
        ("smallint unsigned", PositiveSmallIntegerField),
        ("tinyint unsigned", PositiveSmallIntegerField),
        ("real", FloatField),
        ("float", FloatField),
        ("float4", FloatField),
        ("float8", FloatField),
        ("double", FloatField),
        ("double precision", FloatField),
        ("numeric", DecimalField),
        ("decimal", DecimalField),
        ("money", DecimalField),
        ("varchar", CharField),
        ("character varying", CharField),
        ("char", CharField),
        ("character", CharField),
        ("nchar", CharField),
        ("nvarchar", CharField),
        ("bpchar", CharField),
        ("text", TextField),
        ("citext", TextField),
        ("tinytext", TextField),
        ("mediumtext", TextField),
        ("longtext", TextField),
        ("clob", TextField),
        ("date", DateField),
        ("timestamp", DateTimeField),
        ("timestamptz", DateTimeField),
        ("timestamp without time zone", DateTimeField),
        ("timestamp with time zone", DateTimeField),
        ("datetime", DateTimeField),
        ("datetime2", DateTimeField),
        ("smalldatetime", DateTimeField),
        ("time", TimeField),
        ("timetz", TimeField),
        ("time without time zone", TimeField),
        ("time with time zone", TimeField),
        ("interval", DurationField),
        ("boolean", BooleanField),
        ("bool", BooleanField),
        ("bit", BooleanField),
        ("uuid", UuidField),
        ("uniqueidentifier", UuidField),
        ("json", JsonField),
        ("jsonb", JsonField),
        ("bytea", BinaryField),
        ("blob", BinaryField),
        ("tinyblob", BinaryField),
        ("mediumblob", BinaryField),
        ("longblob", BinaryField),
        ("binary", BinaryField),
        ("varbinary", BinaryField),
        ("inet", GenericIpAddressField),
        ("cidr", GenericIpAddressField),
    ]
    .into_iter()
    .map(|(name, kind)| (name.to_string(), kind))
    .collect();

    // Framework introspection reports kind tags directly
    for kind in FieldKind::ALL {
        map.insert(kind.as_str().to_lowercase(), kind);
    }
    map
});

/// Lowercase, drop `(...)` parameters and collapse whitespace:
/// `TIMESTAMP(6)  WITH TIME ZONE` -> `timestamp with time zone`
pub fn normalize_type(raw_type: &str) -> String {
    let mut stripped = String::with_capacity(raw_type.len());
    let mut depth = 0usize;
    for ch in raw_type.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => stripped.push(ch),
            _ => {}
        }
    }
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Type mapper
pub struct TypeMapper;

impl TypeMapper {
    /// Exact lookup in the static type table
    pub fn exact_match(raw_type: &str) -> Option<FieldKind> {
        EXACT_TYPES.get(normalize_type(raw_type).as_str()).copied()
    }

    /// Ordered substring heuristics over the normalized type
    pub fn heuristic_match(raw_type: &str) -> Option<FieldKind> {
        let t = normalize_type(raw_type);
        let has = |needle: &str| t.contains(needle);

        if has("text") || has("clob") {
            return Some(FieldKind::TextField);
        }
        if has("char") || has("string") {
            return Some(FieldKind::CharField);
        }
        if has("int") && !has("interval") && !has("point") {
            let unsigned = has("unsigned");
            return Some(match (has("big"), has("small") || has("tiny"), unsigned) {
                (true, _, false) => FieldKind::BigIntegerField,
                (true, _, true) => FieldKind::PositiveBigIntegerField,
                (false, true, false) => FieldKind::SmallIntegerField,
                (false, true, true) => FieldKind::PositiveSmallIntegerField,
                (false, false, false) => FieldKind::IntegerField,
                (false, false, true) => FieldKind::PositiveIntegerField,
            });
        }
        if has("bool") || t == "bit" {
            return Some(FieldKind::BooleanField);
        }
        if has("timestamp") || has("datetime") {
            return Some(FieldKind::DateTimeField);
        }
        if has("date") {
            return Some(FieldKind::DateField);
        }
        if has("time") {
            return Some(FieldKind::TimeField);
        }
        if has("float") || has("real") || has("double") {
            return Some(FieldKind::FloatField);
        }
        if has("decimal") || has("numeric") || has("money") || has("number") {
            return Some(FieldKind::DecimalField);
        }
        if has("uuid") || has("guid") {
            return Some(FieldKind::UuidField);
        }
        if has("json") {
            return Some(FieldKind::JsonField);
        }
        if has("blob") || has("binary") || has("bytea") {
            return Some(FieldKind::BinaryField);
        }
        if has("interval") || has("duration") {
            return Some(FieldKind::DurationField);
        }
        None
    }

    /// Resolve a raw type: exact, then heuristic, then text fallback
    pub fn match_type(raw_type: &str) -> TypeMatch {
        if let Some(kind) = Self::exact_match(raw_type) {
            return TypeMatch {
                kind,
                source: MatchSource::Exact,
            };
        }
        if let Some(kind) = Self::heuristic_match(raw_type) {
            return TypeMatch {
                kind,
                source: MatchSource::Heuristic,
            };
        }
        TypeMatch {
            kind: FieldKind::TextField,
            source: MatchSource::Fallback,
        }
    }

    /// Map one column of `table` to its field kind, options and wire descriptor.
    /// Never fails; unknown types degrade to text with a warning.
    pub fn map_column(column: &Column, table: &Table, config: &BuilderConfig) -> ColumnMapping {
        let mut matched = Self::match_type(&column.raw_type);

        // Named enum types rarely match anything, their values still make them text
        if matched.is_fallback() && column.enum_values.is_some() {
            matched = TypeMatch {
                kind: FieldKind::CharField,
                source: MatchSource::Heuristic,
            };
        }

        if matched.is_fallback() {
            log::warn!(
                "Unmapped type '{}' for column {}.{}, falling back to {}",
                column.raw_type,
                table.name,
                column.name,
                matched.kind
            );
        } else {
            log::trace!(
                "Column {}.{} type '{}' -> {} ({:?})",
                table.name,
                column.name,
                column.raw_type,
                matched.kind,
                matched.source
            );
        }

        let field_name = naming::sanitize_identifier(&column.name);
        let is_pk = column.is_primary_key || table.primary_key_columns.contains(&column.name);
        let composite_pk = is_pk && table.has_composite_primary_key();
        let is_fk = column.is_foreign_key || column.foreign_key.is_some();

        let mut kind = matched.kind;
        let mut options = FieldOptions::default();

        if is_pk && !composite_pk {
            if kind.is_auto() && is_fk {
                kind = kind.demote_auto();
            }
            if kind.is_integer() && !is_fk {
                kind = kind.to_auto();
            } else if !kind.is_auto() {
                options.primary_key = true;
            }
        } else if kind.is_auto() {
            log::debug!(
                "Column {}.{} is not a single primary key, demoting {}",
                table.name,
                column.name,
                kind
            );
            kind = kind.demote_auto();
        }

        options.null = Some(column.nullable);
        if kind.is_text_like() {
            options.blank = Some(column.nullable);
        }

        options.unique = column.is_unique && !is_pk && !is_fk;

        if kind.is_character() {
            let mut max_length = column.size.filter(|s| *s > 0).unwrap_or(config.default_char_max_length);
            if let Some(values) = &column.enum_values {
                let longest = values.iter().map(|v| v.chars().count() as u32).max().unwrap_or(0);
                max_length = max_length.max(longest);
            }
            options.max_length = Some(max_length);
        }

        if kind.is_fixed_point() {
            let digits = column.precision.unwrap_or(config.default_decimal_digits);
            let places = column.scale.unwrap_or(config.default_decimal_places);
            options.max_digits = Some(digits.max(places));
            options.decimal_places = Some(places);
        }

        if let Some(values) = &column.enum_values {
            options.choices = Some(values.clone());
        }

        if !options.primary_key {
            options.default = column.default.as_ref().map(|raw| FieldDefault::from_raw(raw, kind));
        }

        options.alias_column(&field_name, &column.name);

        if kind.is_auto() {
            options.strip_for_auto();
        }

        let wire = WireSchema::for_field(kind, &options, column.nullable, is_pk && !composite_pk);

        ColumnMapping {
            field_name,
            kind,
            options,
            wire,
            source: matched.source,
        }
    }
}
