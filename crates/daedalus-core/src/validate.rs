//! Validation of JSON values against [`Schema`] descriptors.
//!
//! Validation never fails fast: every violation in the value is collected in a
//! single pass, so a client sees all corrections at once.
//!
//! # Example
//!
//! ```
//! use daedalus_core::schema::{Format, Schema};
//! use daedalus_core::validate::validate;
//! use serde_json::json;
//!
//! let schema = Schema::object([
//!     ("email", Schema::string().format(Format::Email)),
//!     ("password", Schema::string().min(1.0)),
//! ]);
//!
//! let outcome = validate(&schema, Some(&json!({ "email": "not-an-email" })));
//! let violations = outcome.violations();
//! assert_eq!(violations.len(), 2);
//! assert_eq!(violations[0].path.to_string(), "email");
//! assert_eq!(violations[1].message, "password is required");
//! ```

use crate::error::ApiError;
use crate::schema::{
    ArraySchema, EnumSchema, Format, ObjectSchema, PrimitiveKind, PrimitiveSchema, Schema,
    UnknownKeys,
};
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::sync::OnceLock;

/// One step in a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// An object key.
    Key(String),
    /// An array index.
    Index(usize),
}

/// Location of a value inside a document, rendered as `user.tags[2].name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// The document root.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a child path for an object key.
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.into()));
        Self(segments)
    }

    /// Returns a child path for an array index.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    /// Returns `true` at the document root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The segments of this path.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    fn label(&self) -> String {
        if self.is_root() {
            "value".to_string()
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Where the failure occurred.
    pub path: FieldPath,
    /// What went wrong.
    pub message: String,
}

impl Violation {
    /// Creates a violation.
    #[must_use]
    pub fn new(path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

/// Result of validating a value.
///
/// An absent input that is allowed to be absent validates to `Valid(None)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The value satisfies the descriptor. Holds the normalized value.
    Valid(Option<Value>),
    /// The value does not satisfy the descriptor.
    Invalid(Vec<Violation>),
}

impl Outcome {
    /// Returns `true` for [`Outcome::Valid`].
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// The violations, empty when valid.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Valid(_) => &[],
            Self::Invalid(violations) => violations,
        }
    }

    /// Converts into a `Result`, mapping violations to a validation [`ApiError`].
    pub fn into_result(self) -> Result<Option<Value>, ApiError> {
        match self {
            Self::Valid(value) => Ok(value),
            Self::Invalid(violations) => Err(ApiError::validation(violations)),
        }
    }

    /// Deserializes the validated value into `T`.
    ///
    /// An absent value is presented to `T` as `null`, so `Option<T>` works for
    /// optional inputs.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let value = self.into_result()?.unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(ApiError::from)
    }
}

/// Validates `value` against `schema` without coercion.
///
/// `None` stands for an absent value.
#[must_use]
pub fn validate(schema: &Schema, value: Option<&Value>) -> Outcome {
    Validator::strict().validate(schema, value)
}

/// Configurable validator.
///
/// The strict validator is used for JSON bodies. The coercing validator is used
/// for query strings and path captures, where every scalar arrives as a string:
/// strings are converted to numbers and booleans where the descriptor asks for
/// them, and a lone value is accepted where an array is expected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    coerce: bool,
}

impl Validator {
    /// A validator that checks types exactly.
    #[must_use]
    pub const fn strict() -> Self {
        Self { coerce: false }
    }

    /// A validator that coerces string input.
    #[must_use]
    pub const fn coercing() -> Self {
        Self { coerce: true }
    }

    /// Validates `value` against `schema`.
    #[must_use]
    pub fn validate(&self, schema: &Schema, value: Option<&Value>) -> Outcome {
        let mut violations = Vec::new();
        let normalized = self.check(schema, value, &FieldPath::root(), &mut violations);
        if violations.is_empty() {
            Outcome::Valid(normalized)
        } else {
            Outcome::Invalid(violations)
        }
    }

    fn check(
        &self,
        schema: &Schema,
        value: Option<&Value>,
        path: &FieldPath,
        out: &mut Vec<Violation>,
    ) -> Option<Value> {
        match schema {
            Schema::Optional(inner) => {
                value.and_then(|value| self.check(inner, Some(value), path, out))
            }
            _ if value.is_none() => {
                out.push(Violation::new(
                    path.clone(),
                    format!("{} is required", path.label()),
                ));
                None
            }
            Schema::Nullable(_) if value == Some(&Value::Null) => Some(Value::Null),
            Schema::Nullable(inner) => self.check(inner, value, path, out),
            Schema::Object(object) => self.check_object(object, value?, path, out),
            Schema::Array(array) => self.check_array(array, value?, path, out),
            Schema::Primitive(primitive) => self.check_primitive(primitive, value?, path, out),
            Schema::Enum(enumeration) => self.check_enum(enumeration, value?, path, out),
            Schema::Union(variants) => self.check_union(variants, value?, path, out),
        }
    }

    /// Exact match first. A coerced string also matches a literal whose text
    /// form is equal, and the literal itself is returned.
    fn check_enum(
        &self,
        enumeration: &EnumSchema,
        value: &Value,
        path: &FieldPath,
        out: &mut Vec<Violation>,
    ) -> Option<Value> {
        if enumeration.values.contains(value) {
            return Some(value.clone());
        }
        if let (true, Value::String(s)) = (self.coerce, value) {
            let s = s.trim();
            let literal = enumeration.values.iter().find(|literal| match literal {
                Value::Number(_) | Value::Bool(_) => literal.to_string() == s,
                _ => false,
            });
            if let Some(literal) = literal {
                return Some(literal.clone());
            }
        }
        let allowed = enumeration
            .values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        out.push(Violation::new(
            path.clone(),
            format!("{} must be one of: {allowed}", path.label()),
        ));
        None
    }

    fn check_object(
        &self,
        object: &ObjectSchema,
        value: &Value,
        path: &FieldPath,
        out: &mut Vec<Violation>,
    ) -> Option<Value> {
        let Value::Object(map) = value else {
            out.push(type_mismatch(path, "an object", value));
            return None;
        };

        let mut normalized = Map::new();
        for (name, property) in object.properties() {
            let child_path = path.key(name);
            match map.get(name) {
                Some(child) => {
                    if let Some(child) = self.check(property, Some(child), &child_path, out) {
                        normalized.insert(name.clone(), child);
                    }
                }
                None if object.is_required(name) => out.push(Violation::new(
                    child_path.clone(),
                    format!("{child_path} is required"),
                )),
                None => {}
            }
        }

        for (key, child) in map {
            if object.properties().contains_key(key) {
                continue;
            }
            match object.unknown_key_policy() {
                UnknownKeys::Strip => {}
                UnknownKeys::Passthrough => {
                    normalized.insert(key.clone(), child.clone());
                }
                UnknownKeys::Reject => {
                    let child_path = path.key(key);
                    out.push(Violation::new(
                        child_path.clone(),
                        format!("{child_path} is not an allowed field"),
                    ));
                }
            }
        }

        Some(Value::Object(normalized))
    }

    fn check_array(
        &self,
        array: &ArraySchema,
        value: &Value,
        path: &FieldPath,
        out: &mut Vec<Violation>,
    ) -> Option<Value> {
        let single;
        let items = match value {
            Value::Array(items) => items.as_slice(),
            other if self.coerce => {
                single = [other.clone()];
                &single[..]
            }
            other => {
                out.push(type_mismatch(path, "an array", other));
                return None;
            }
        };

        if let Some(min) = array.min_items {
            if items.len() < min {
                out.push(Violation::new(
                    path.clone(),
                    format!("{} must contain at least {min} items", path.label()),
                ));
            }
        }
        if let Some(max) = array.max_items {
            if items.len() > max {
                out.push(Violation::new(
                    path.clone(),
                    format!("{} must contain at most {max} items", path.label()),
                ));
            }
        }

        let normalized = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                self.check(&array.item, Some(item), &path.index(i), out)
                    .unwrap_or(Value::Null)
            })
            .collect();
        Some(Value::Array(normalized))
    }

    fn check_primitive(
        &self,
        primitive: &PrimitiveSchema,
        value: &Value,
        path: &FieldPath,
        out: &mut Vec<Violation>,
    ) -> Option<Value> {
        let value = if self.coerce {
            coerce(primitive.kind, value).unwrap_or_else(|| value.clone())
        } else {
            value.clone()
        };

        match (primitive.kind, &value) {
            (PrimitiveKind::String, Value::String(s)) => {
                check_string(primitive, s, path, out);
            }
            (PrimitiveKind::Number, Value::Number(n)) => check_number(primitive, n, path, out),
            (PrimitiveKind::Integer, Value::Number(n)) if is_integral(n) => {
                check_number(primitive, n, path, out);
            }
            (PrimitiveKind::Integer, Value::Number(_)) => {
                out.push(Violation::new(
                    path.clone(),
                    format!("{} must be an integer", path.label()),
                ));
            }
            (PrimitiveKind::Boolean, Value::Bool(_)) => {}
            (kind, other) => {
                out.push(type_mismatch(path, article(kind), other));
                return None;
            }
        }
        Some(value)
    }

    fn check_union(
        &self,
        variants: &[Schema],
        value: &Value,
        path: &FieldPath,
        out: &mut Vec<Violation>,
    ) -> Option<Value> {
        let mut closest: Option<Vec<Violation>> = None;
        for variant in variants {
            let mut attempt = Vec::new();
            let normalized = self.check(variant, Some(value), path, &mut attempt);
            if attempt.is_empty() {
                return normalized;
            }
            if closest.as_ref().map_or(true, |best| attempt.len() < best.len()) {
                closest = Some(attempt);
            }
        }

        out.push(Violation::new(
            path.clone(),
            format!(
                "{} does not match any of the {} allowed shapes",
                path.label(),
                variants.len()
            ),
        ));
        out.extend(closest.unwrap_or_default());
        None
    }
}

fn check_string(primitive: &PrimitiveSchema, s: &str, path: &FieldPath, out: &mut Vec<Violation>) {
    let label = path.label();
    let constraints = &primitive.constraints;
    let length = s.chars().count() as f64;

    if let Some(min) = constraints.min {
        if length < min {
            out.push(Violation::new(
                path.clone(),
                format!("{label} must be at least {min} characters"),
            ));
        }
    }
    if let Some(max) = constraints.max {
        if length > max {
            out.push(Violation::new(
                path.clone(),
                format!("{label} must be at most {max} characters"),
            ));
        }
    }
    if let Some(pattern) = &constraints.pattern {
        if !pattern.is_match(s) {
            out.push(Violation::new(
                path.clone(),
                format!("{label} must match pattern {}", pattern.as_str()),
            ));
        }
    }
    if let Some(format) = constraints.format {
        if !matches_format(format, s) {
            out.push(Violation::new(
                path.clone(),
                format!("{label} must be a valid {}", format.as_str()),
            ));
        }
    }
}

fn check_number(
    primitive: &PrimitiveSchema,
    n: &Number,
    path: &FieldPath,
    out: &mut Vec<Violation>,
) {
    let Some(n) = n.as_f64() else {
        return;
    };
    let label = path.label();
    if let Some(min) = primitive.constraints.min {
        if n < min {
            out.push(Violation::new(
                path.clone(),
                format!("{label} must be greater than or equal to {min}"),
            ));
        }
    }
    if let Some(max) = primitive.constraints.max {
        if n > max {
            out.push(Violation::new(
                path.clone(),
                format!("{label} must be less than or equal to {max}"),
            ));
        }
    }
}

fn is_integral(n: &Number) -> bool {
    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
}

fn coerce(kind: PrimitiveKind, value: &Value) -> Option<Value> {
    let Value::String(s) = value else {
        return None;
    };
    let s = s.trim();
    match kind {
        PrimitiveKind::String => None,
        PrimitiveKind::Integer => s
            .parse::<i64>()
            .ok()
            .map(Value::from)
            .or_else(|| s.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)),
        PrimitiveKind::Number => s
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        PrimitiveKind::Boolean => match s {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
    }
}

fn matches_format(format: Format, s: &str) -> bool {
    match format {
        Format::Email => email_regex().is_match(s),
        Format::Uuid => uuid::Uuid::parse_str(s).is_ok(),
        Format::DateTime => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
        Format::Date => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        Format::Uri => uri_regex().is_match(s),
    }
}

fn email_regex() -> &'static regex::Regex {
    static EMAIL: OnceLock<regex::Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex")
    })
}

fn uri_regex() -> &'static regex::Regex {
    static URI: OnceLock<regex::Regex> = OnceLock::new();
    URI.get_or_init(|| regex::Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:\S+$").expect("valid regex"))
}

const fn article(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::String => "a string",
        PrimitiveKind::Number => "a number",
        PrimitiveKind::Integer => "an integer",
        PrimitiveKind::Boolean => "a boolean",
    }
}

fn type_mismatch(path: &FieldPath, expected: &str, actual: &Value) -> Violation {
    let received = match actual {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    Violation::new(
        path.clone(),
        format!("{} must be {expected}, received {received}", path.label()),
    )
}
