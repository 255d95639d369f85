//! Schema descriptors.
//!
//! A [`Schema`] describes the shape of a JSON value. The same descriptor is used
//! by the validator at request time and by the contract compiler when rendering
//! documentation, so a shape is only ever written down once.
//!
//! Descriptors are plain values: build them at startup, wrap them in an `Arc`
//! (route registrations do this for you) and share them freely.
//!
//! # Example
//!
//! ```
//! use daedalus_core::schema::{Format, Schema};
//!
//! let login = Schema::object([
//!     ("email", Schema::string().format(Format::Email)),
//!     ("password", Schema::string().min(1.0)),
//!     ("remember", Schema::boolean().optional()),
//! ]);
//!
//! let object = login.as_object().unwrap();
//! assert!(object.is_required("email"));
//! assert!(!object.is_required("remember"));
//! ```

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while constructing a descriptor.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A `pattern` constraint did not compile.
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// A required name is not a declared property.
    #[error("required field '{name}' is not a declared property")]
    UnknownRequired {
        /// The offending name.
        name: String,
    },
}

/// The base type of a primitive descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// A JSON string.
    String,
    /// Any JSON number.
    Number,
    /// A JSON number without a fractional part.
    Integer,
    /// `true` or `false`.
    Boolean,
}

impl PrimitiveKind {
    /// The type name used in messages and documents.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }
}

/// Well-known string formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// `local@domain.tld`
    Email,
    /// RFC 4122 UUID.
    Uuid,
    /// RFC 3339 timestamp.
    DateTime,
    /// `YYYY-MM-DD`
    Date,
    /// Absolute URI with a scheme.
    Uri,
}

impl Format {
    /// The format name used in messages and documents.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Uuid => "uuid",
            Self::DateTime => "date-time",
            Self::Date => "date",
            Self::Uri => "uri",
        }
    }
}

/// A compiled `pattern` constraint.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles a pattern.
    pub fn new(pattern: &str) -> Result<Self, SchemaError> {
        let regex = Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Tests a string against the pattern.
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Constraints on a primitive value.
///
/// `min`/`max` bound the character count of strings and the value of numbers.
/// Constraints are only checked once the base type matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    /// Lower bound (inclusive).
    pub min: Option<f64>,
    /// Upper bound (inclusive).
    pub max: Option<f64>,
    /// Regular expression a string must match.
    pub pattern: Option<Pattern>,
    /// Well-known string format.
    pub format: Option<Format>,
}

impl Constraints {
    /// Returns `true` when no constraint is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.pattern.is_none() && self.format.is_none()
    }
}

/// What to do with object keys that are not declared properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownKeys {
    /// Accept and drop them from the validated value.
    #[default]
    Strip,
    /// Accept and keep them.
    Passthrough,
    /// Report each one as a violation.
    Reject,
}

/// An object descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    properties: IndexMap<String, Schema>,
    required: IndexSet<String>,
    unknown_keys: UnknownKeys,
    description: Option<String>,
}

impl ObjectSchema {
    /// Creates an object from its properties.
    ///
    /// Every property not wrapped in [`Schema::Optional`] is required.
    pub fn new<K, I>(properties: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Schema)>,
    {
        let properties: IndexMap<String, Schema> = properties
            .into_iter()
            .map(|(name, schema)| (name.into(), schema))
            .collect();
        let required = properties
            .iter()
            .filter(|(_, schema)| !schema.is_optional())
            .map(|(name, _)| name.clone())
            .collect();
        Self {
            properties,
            required,
            unknown_keys: UnknownKeys::default(),
            description: None,
        }
    }

    /// Replaces the required set.
    ///
    /// Names of `Optional` properties are dropped, since an optional field can
    /// never be required.
    pub fn with_required<I, S>(mut self, names: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut required = IndexSet::new();
        for name in names {
            let name = name.into();
            match self.properties.get(&name) {
                None => return Err(SchemaError::UnknownRequired { name }),
                Some(schema) if schema.is_optional() => {}
                Some(_) => {
                    required.insert(name);
                }
            }
        }
        self.required = required;
        Ok(self)
    }

    /// Sets the unknown-key policy.
    #[must_use]
    pub fn unknown_keys(mut self, policy: UnknownKeys) -> Self {
        self.unknown_keys = policy;
        self
    }

    /// Declared properties, in declaration order.
    pub fn properties(&self) -> &IndexMap<String, Schema> {
        &self.properties
    }

    /// Required property names, in declaration order.
    pub fn required(&self) -> &IndexSet<String> {
        &self.required
    }

    /// Returns `true` if `name` is required.
    pub fn is_required(&self, name: &str) -> bool {
        self.required.contains(name)
    }

    /// The unknown-key policy.
    pub fn unknown_key_policy(&self) -> UnknownKeys {
        self.unknown_keys
    }
}

impl From<ObjectSchema> for Schema {
    fn from(object: ObjectSchema) -> Self {
        Self::Object(object)
    }
}

/// An array descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ArraySchema {
    /// Descriptor every element must satisfy.
    pub item: Box<Schema>,
    /// Minimum number of elements.
    pub min_items: Option<usize>,
    /// Maximum number of elements.
    pub max_items: Option<usize>,
    /// Human description.
    pub description: Option<String>,
}

/// A primitive descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveSchema {
    /// Base type.
    pub kind: PrimitiveKind,
    /// Constraints checked after the base type matches.
    pub constraints: Constraints,
    /// Human description.
    pub description: Option<String>,
}

/// An enum descriptor: the value must equal one of the literals.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    /// Allowed literals, in declaration order.
    pub values: Vec<Value>,
    /// Human description.
    pub description: Option<String>,
}

/// A composable description of a data shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// A JSON object with named properties.
    Object(ObjectSchema),
    /// A homogeneous JSON array.
    Array(ArraySchema),
    /// A string, number, integer or boolean.
    Primitive(PrimitiveSchema),
    /// One of a fixed set of literals.
    Enum(EnumSchema),
    /// The value may be absent.
    Optional(Box<Schema>),
    /// The value may be `null`.
    Nullable(Box<Schema>),
    /// The value must match at least one variant.
    Union(Vec<Schema>),
}

impl Schema {
    /// An object descriptor; see [`ObjectSchema::new`].
    pub fn object<K, I>(properties: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Schema)>,
    {
        Self::Object(ObjectSchema::new(properties))
    }

    /// An object with no declared properties.
    pub fn empty_object() -> Self {
        Self::Object(ObjectSchema::default())
    }

    /// An array of `item`.
    pub fn array(item: Schema) -> Self {
        Self::Array(ArraySchema {
            item: Box::new(item),
            min_items: None,
            max_items: None,
            description: None,
        })
    }

    /// A primitive of the given kind.
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::Primitive(PrimitiveSchema {
            kind,
            constraints: Constraints::default(),
            description: None,
        })
    }

    /// A string.
    pub fn string() -> Self {
        Self::primitive(PrimitiveKind::String)
    }

    /// A number.
    pub fn number() -> Self {
        Self::primitive(PrimitiveKind::Number)
    }

    /// An integer.
    pub fn integer() -> Self {
        Self::primitive(PrimitiveKind::Integer)
    }

    /// A boolean.
    pub fn boolean() -> Self {
        Self::primitive(PrimitiveKind::Boolean)
    }

    /// One of the given literals.
    pub fn enumeration<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Enum(EnumSchema {
            values: values.into_iter().map(Into::into).collect(),
            description: None,
        })
    }

    /// Any of the given variants.
    pub fn union<I>(variants: I) -> Self
    where
        I: IntoIterator<Item = Schema>,
    {
        Self::Union(variants.into_iter().collect())
    }

    /// Wraps this descriptor in [`Schema::Optional`].
    #[must_use]
    pub fn optional(self) -> Self {
        Self::Optional(Box::new(self))
    }

    /// Wraps this descriptor in [`Schema::Nullable`].
    #[must_use]
    pub fn nullable(self) -> Self {
        Self::Nullable(Box::new(self))
    }

    /// Sets the lower bound of a primitive, or the minimum item count of an array.
    ///
    /// Applies through `Optional`/`Nullable` wrappers; ignored on other kinds.
    #[must_use]
    pub fn min(self, min: f64) -> Self {
        self.map_leaf(|leaf| match leaf {
            Self::Primitive(mut p) => {
                p.constraints.min = Some(min);
                Self::Primitive(p)
            }
            Self::Array(mut a) => {
                a.min_items = Some(bound_to_count(min));
                Self::Array(a)
            }
            other => other,
        })
    }

    /// Sets the upper bound of a primitive, or the maximum item count of an array.
    #[must_use]
    pub fn max(self, max: f64) -> Self {
        self.map_leaf(|leaf| match leaf {
            Self::Primitive(mut p) => {
                p.constraints.max = Some(max);
                Self::Primitive(p)
            }
            Self::Array(mut a) => {
                a.max_items = Some(bound_to_count(max));
                Self::Array(a)
            }
            other => other,
        })
    }

    /// Sets a string format.
    #[must_use]
    pub fn format(self, format: Format) -> Self {
        self.map_leaf(|leaf| match leaf {
            Self::Primitive(mut p) => {
                p.constraints.format = Some(format);
                Self::Primitive(p)
            }
            other => other,
        })
    }

    /// Sets a string pattern.
    pub fn pattern(self, pattern: &str) -> Result<Self, SchemaError> {
        let pattern = Pattern::new(pattern)?;
        Ok(self.map_leaf(|leaf| match leaf {
            Self::Primitive(mut p) => {
                p.constraints.pattern = Some(pattern);
                Self::Primitive(p)
            }
            other => other,
        }))
    }

    /// Attaches a human description, used only in documentation.
    #[must_use]
    pub fn describe(self, text: impl Into<String>) -> Self {
        let text = Some(text.into());
        self.map_leaf(|leaf| match leaf {
            Self::Object(mut o) => {
                o.description = text;
                Self::Object(o)
            }
            Self::Array(mut a) => {
                a.description = text;
                Self::Array(a)
            }
            Self::Primitive(mut p) => {
                p.description = text;
                Self::Primitive(p)
            }
            Self::Enum(mut e) => {
                e.description = text;
                Self::Enum(e)
            }
            other => other,
        })
    }

    /// The human description, looking through wrappers.
    pub fn description(&self) -> Option<&str> {
        match self.unwrap_modifiers() {
            Self::Object(o) => o.description.as_deref(),
            Self::Array(a) => a.description.as_deref(),
            Self::Primitive(p) => p.description.as_deref(),
            Self::Enum(e) => e.description.as_deref(),
            _ => None,
        }
    }

    /// Returns `true` for [`Schema::Optional`].
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }

    /// Returns the object descriptor, looking through wrappers.
    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self.unwrap_modifiers() {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Strips `Optional` and `Nullable` wrappers.
    pub fn unwrap_modifiers(&self) -> &Schema {
        match self {
            Self::Optional(inner) | Self::Nullable(inner) => inner.unwrap_modifiers(),
            other => other,
        }
    }

    /// A short name for the kind of this descriptor.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Object(_) => "object",
            Self::Array(_) => "array",
            Self::Primitive(p) => p.kind.as_str(),
            Self::Enum(_) => "enum",
            Self::Optional(_) => "optional",
            Self::Nullable(_) => "nullable",
            Self::Union(_) => "union",
        }
    }

    fn map_leaf(self, f: impl FnOnce(Schema) -> Schema) -> Self {
        match self {
            Self::Optional(inner) => Self::Optional(Box::new(inner.map_leaf(f))),
            Self::Nullable(inner) => Self::Nullable(Box::new(inner.map_leaf(f))),
            leaf => f(leaf),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bound_to_count(bound: f64) -> usize {
    if bound.is_sign_negative() {
        0
    } else {
        bound as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_required_defaults_to_non_optional_fields() {
        let schema = Schema::object([
            ("id", Schema::string()),
            ("nickname", Schema::string().optional()),
            ("bio", Schema::string().nullable()),
        ]);
        let object = schema.as_object().unwrap();
        let required: Vec<_> = object.required().iter().map(String::as_str).collect();
        assert_eq!(required, vec!["id", "bio"]);
    }

    #[test]
    fn test_with_required_rejects_unknown_names() {
        let result = ObjectSchema::new([("id", Schema::string())]).with_required(["missing"]);
        assert!(matches!(result, Err(SchemaError::UnknownRequired { name }) if name == "missing"));
    }

    #[test]
    fn test_with_required_drops_optional_names() {
        let object = ObjectSchema::new([
            ("id", Schema::string()),
            ("tag", Schema::string().optional()),
        ])
        .with_required(["id", "tag"])
        .unwrap();
        assert!(object.is_required("id"));
        assert!(!object.is_required("tag"));
    }

    #[test]
    fn test_constraints_apply_through_wrappers() {
        let schema = Schema::string().optional().min(2.0).max(5.0);
        let Schema::Optional(inner) = &schema else {
            panic!("expected optional");
        };
        let Schema::Primitive(p) = inner.as_ref() else {
            panic!("expected primitive");
        };
        assert_eq!(p.constraints.min, Some(2.0));
        assert_eq!(p.constraints.max, Some(5.0));
    }

    #[test]
    fn test_array_bounds() {
        let Schema::Array(array) = Schema::array(Schema::integer()).min(1.0).max(3.0) else {
            panic!("expected array");
        };
        assert_eq!(array.min_items, Some(1));
        assert_eq!(array.max_items, Some(3));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let err = Schema::string().pattern("([a-z").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern { .. }));
        assert!(err.to_string().contains("([a-z"));
    }

    #[test]
    fn test_pattern_equality_by_source() {
        let a = Schema::string().pattern("^[a-z]+$").unwrap();
        let b = Schema::string().pattern("^[a-z]+$").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_enumeration_and_description() {
        let schema = Schema::enumeration(["admin", "member"]).describe("account role");
        assert_eq!(schema.description(), Some("account role"));
        let Schema::Enum(e) = schema else {
            panic!("expected enum");
        };
        assert_eq!(e.values, vec![json!("admin"), json!("member")]);
    }

    #[test]
    fn test_unwrap_modifiers() {
        let schema = Schema::empty_object().nullable().optional();
        assert!(schema.as_object().is_some());
        assert_eq!(schema.kind_name(), "optional");
        assert_eq!(schema.unwrap_modifiers().kind_name(), "object");
    }
}
