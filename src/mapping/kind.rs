use serde::{Deserialize, Serialize};
use std::fmt;

/// Target field-type tag, a closed set shared by every emitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    AutoField,
    BigAutoField,
    SmallAutoField,
    IntegerField,
    BigIntegerField,
    SmallIntegerField,
    PositiveIntegerField,
    PositiveBigIntegerField,
    PositiveSmallIntegerField,
    FloatField,
    DecimalField,
    CharField,
    TextField,
    EmailField,
    UrlField,
    SlugField,
    DateField,
    DateTimeField,
    TimeField,
    DurationField,
    BooleanField,
    UuidField,
    JsonField,
    BinaryField,
    GenericIpAddressField,
}

impl FieldKind {
    pub const ALL: [FieldKind; 25] = [
        FieldKind::AutoField,
        FieldKind::BigAutoField,
        FieldKind::SmallAutoField,
        FieldKind::IntegerField,
        FieldKind::BigIntegerField,
        FieldKind::SmallIntegerField,
        FieldKind::PositiveIntegerField,
        FieldKind::PositiveBigIntegerField,
        FieldKind::PositiveSmallIntegerField,
        FieldKind::FloatField,
        FieldKind::DecimalField,
        FieldKind::CharField,
        FieldKind::TextField,
        FieldKind::EmailField,
        FieldKind::UrlField,
        FieldKind::SlugField,
        FieldKind::DateField,
        FieldKind::DateTimeField,
        FieldKind::TimeField,
        FieldKind::DurationField,
        FieldKind::BooleanField,
        FieldKind::UuidField,
        FieldKind::JsonField,
        FieldKind::BinaryField,
        FieldKind::GenericIpAddressField,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::AutoField => "AutoField",
            FieldKind::BigAutoField => "BigAutoField",
            FieldKind::SmallAutoField => "SmallAutoField",
            FieldKind::IntegerField => "IntegerField",
            FieldKind::BigIntegerField => "BigIntegerField",
            FieldKind::SmallIntegerField => "SmallIntegerField",
            FieldKind::PositiveIntegerField => "PositiveIntegerField",
            FieldKind::PositiveBigIntegerField => "PositiveBigIntegerField",
            FieldKind::PositiveSmallIntegerField => "PositiveSmallIntegerField",
            FieldKind::FloatField => "FloatField",
            FieldKind::DecimalField => "DecimalField",
            FieldKind::CharField => "CharField",
            FieldKind::TextField => "TextField",
            FieldKind::EmailField => "EmailField",
            FieldKind::UrlField => "UrlField",
            FieldKind::SlugField => "SlugField",
            FieldKind::DateField => "DateField",
            FieldKind::DateTimeField => "DateTimeField",
            FieldKind::TimeField => "TimeField",
            FieldKind::DurationField => "DurationField",
            FieldKind::BooleanField => "BooleanField",
            FieldKind::UuidField => "UuidField",
            FieldKind::JsonField => "JsonField",
            FieldKind::BinaryField => "BinaryField",
            FieldKind::GenericIpAddressField => "GenericIpAddressField",
        }
    }

    /// Case-insensitive lookup of a kind tag such as `CharField`
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(tag))
    }

    pub fn is_auto(&self) -> bool {
        matches!(
            self,
            FieldKind::AutoField | FieldKind::BigAutoField | FieldKind::SmallAutoField
        )
    }

    /// Plain integer kinds, the ones eligible for auto-increment
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FieldKind::IntegerField
                | FieldKind::BigIntegerField
                | FieldKind::SmallIntegerField
                | FieldKind::PositiveIntegerField
                | FieldKind::PositiveBigIntegerField
                | FieldKind::PositiveSmallIntegerField
        )
    }

    pub fn is_big(&self) -> bool {
        matches!(
            self,
            FieldKind::BigAutoField | FieldKind::BigIntegerField | FieldKind::PositiveBigIntegerField
        )
    }

    pub fn is_positive(&self) -> bool {
        matches!(
            self,
            FieldKind::PositiveIntegerField
                | FieldKind::PositiveBigIntegerField
                | FieldKind::PositiveSmallIntegerField
        )
    }

    /// Kinds that carry a maximum length
    pub fn is_character(&self) -> bool {
        matches!(
            self,
            FieldKind::CharField | FieldKind::EmailField | FieldKind::UrlField | FieldKind::SlugField
        )
    }

    /// Kinds that follow the "may be blank" convention
    pub fn is_text_like(&self) -> bool {
        self.is_character() || *self == FieldKind::TextField
    }

    pub fn is_fixed_point(&self) -> bool {
        *self == FieldKind::DecimalField
    }

    /// Auto-incrementing variant of an integer kind, size-aware
    pub fn to_auto(self) -> Self {
        match self {
            FieldKind::BigIntegerField | FieldKind::PositiveBigIntegerField => FieldKind::BigAutoField,
            FieldKind::SmallIntegerField | FieldKind::PositiveSmallIntegerField => {
                FieldKind::SmallAutoField
            }
            FieldKind::IntegerField | FieldKind::PositiveIntegerField => FieldKind::AutoField,
            other => other,
        }
    }

    /// Plain integer variant of an auto kind
    pub fn demote_auto(self) -> Self {
        match self {
            FieldKind::AutoField => FieldKind::IntegerField,
            FieldKind::BigAutoField => FieldKind::BigIntegerField,
            FieldKind::SmallAutoField => FieldKind::SmallIntegerField,
            other => other,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
