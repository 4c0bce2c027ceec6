use super::{FieldKind, FieldOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireType {
    Integer,
    Number,
    String,
    Boolean,
    Object,
    Array,
}

/// Minimal structural type descriptor for external interface generators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSchema {
    #[serde(rename = "type")]
    pub wire_type: WireType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    pub nullable: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,

    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,

    /// Element descriptor of an `array`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<WireSchema>>,
}

impl WireSchema {
    fn base(wire_type: WireType, format: Option<&str>) -> Self {
        Self {
            wire_type,
            format: format.map(str::to_string),
            nullable: false,
            read_only: false,
            max_length: None,
            minimum: None,
            enum_values: None,
            items: None,
        }
    }

    /// Bare descriptor for a field kind
    pub fn for_kind(kind: FieldKind) -> Self {
        use FieldKind::*;

        let mut schema = match kind {
            AutoField | SmallAutoField | IntegerField | SmallIntegerField
            | PositiveIntegerField | PositiveSmallIntegerField => Self::base(WireType::Integer, None),
            BigAutoField | BigIntegerField | PositiveBigIntegerField => {
                Self::base(WireType::Integer, Some("int64"))
            }
            FloatField => Self::base(WireType::Number, Some("float")),
            DecimalField => Self::base(WireType::Number, Some("double")),
            CharField | TextField | SlugField => Self::base(WireType::String, None),
            EmailField => Self::base(WireType::String, Some("email")),
            UrlField => Self::base(WireType::String, Some("uri")),
            DateField => Self::base(WireType::String, Some("date")),
            DateTimeField => Self::base(WireType::String, Some("date-time")),
            TimeField => Self::base(WireType::String, Some("time")),
            DurationField => Self::base(WireType::String, Some("duration")),
            BooleanField => Self::base(WireType::Boolean, None),
            UuidField => Self::base(WireType::String, Some("uuid")),
            JsonField => Self::base(WireType::Object, None),
            BinaryField => Self::base(WireType::String, Some("byte")),
            GenericIpAddressField => Self::base(WireType::String, Some("ip")),
        };

        if kind.is_positive() {
            schema.minimum = Some(0);
        }
        schema.read_only = kind.is_auto();
        schema
    }

    /// Descriptor for a mapped column
    pub fn for_field(kind: FieldKind, options: &FieldOptions, nullable: bool, is_primary_key: bool) -> Self {
        let mut schema = Self::for_kind(kind);
        schema.nullable = nullable && !kind.is_auto();
        schema.read_only = schema.read_only || is_primary_key;
        if kind.is_character() {
            schema.max_length = options.max_length;
        }
        schema.enum_values = options.choices.clone();
        schema
    }

    /// Descriptor of a to-one relationship: the target key's scalar shape
    pub fn to_one(target_key: &WireSchema, nullable: bool) -> Self {
        Self {
            nullable,
            read_only: false,
            ..target_key.clone()
        }
    }

    /// Descriptor of a to-many relationship: an array of target keys
    pub fn to_many(target_key: &WireSchema) -> Self {
        let mut items = target_key.clone();
        items.read_only = false;
        items.nullable = false;
        Self {
            items: Some(Box::new(items)),
            ..Self::base(WireType::Array, None)
        }
    }
}
