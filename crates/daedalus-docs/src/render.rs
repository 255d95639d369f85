//! Descriptor to schema-fragment rendering.
//!
//! [`render_schema`] walks a [`Schema`] with one exhaustive match per kind.
//! `Optional` renders its inner fragment; the parent object leaves the field
//! out of `required`. `Nullable` renders its inner fragment with
//! `nullable: true`. Descriptors must be acyclic.

use crate::openapi::{Parameter, ParameterIn, SchemaObject, SchemaType};
use daedalus_core::schema::{
    ArraySchema, EnumSchema, ObjectSchema, PrimitiveKind, PrimitiveSchema, UnknownKeys,
};
use daedalus_core::Schema;
use serde_json::Value;

/// Renders a descriptor into a schema fragment.
///
/// # Example
///
/// ```
/// use daedalus_core::Schema;
/// use daedalus_docs::render_schema;
///
/// let fragment = render_schema(&Schema::object([
///     ("name", Schema::string()),
///     ("nickname", Schema::string().optional()),
/// ]));
/// assert_eq!(fragment.required, vec!["name"]);
/// assert_eq!(fragment.properties.len(), 2);
/// ```
#[must_use]
pub fn render_schema(schema: &Schema) -> SchemaObject {
    match schema {
        Schema::Object(object) => render_object(object, schema.description()),
        Schema::Array(array) => render_array(array),
        Schema::Primitive(primitive) => render_primitive(primitive),
        Schema::Enum(enumeration) => render_enum(enumeration),
        Schema::Optional(inner) => render_schema(inner),
        Schema::Nullable(inner) => SchemaObject {
            nullable: true,
            ..render_schema(inner)
        },
        Schema::Union(variants) => SchemaObject {
            any_of: variants.iter().map(render_schema).collect(),
            ..SchemaObject::default()
        },
    }
}

fn render_object(object: &ObjectSchema, description: Option<&str>) -> SchemaObject {
    let mut fragment = SchemaObject::object();
    for (name, property) in object.properties() {
        fragment = fragment.property(name, render_schema(property), object.is_required(name));
    }
    fragment.additional_properties = match object.unknown_key_policy() {
        UnknownKeys::Reject => Some(false),
        UnknownKeys::Strip | UnknownKeys::Passthrough => None,
    };
    fragment.description = description.map(ToString::to_string);
    fragment
}

fn render_array(array: &ArraySchema) -> SchemaObject {
    SchemaObject {
        min_items: array.min_items,
        max_items: array.max_items,
        description: array.description.clone(),
        ..SchemaObject::array(render_schema(&array.item))
    }
}

fn render_primitive(primitive: &PrimitiveSchema) -> SchemaObject {
    let constraints = &primitive.constraints;
    let mut fragment = SchemaObject::of_type(match primitive.kind {
        PrimitiveKind::String => SchemaType::String,
        PrimitiveKind::Number => SchemaType::Number,
        PrimitiveKind::Integer => SchemaType::Integer,
        PrimitiveKind::Boolean => SchemaType::Boolean,
    });

    match primitive.kind {
        PrimitiveKind::String => {
            fragment.min_length = constraints.min.map(length_bound);
            fragment.max_length = constraints.max.map(length_bound);
            fragment.pattern = constraints.pattern.as_ref().map(|p| p.as_str().to_string());
            fragment.format = constraints.format.map(|f| f.as_str().to_string());
        }
        PrimitiveKind::Number | PrimitiveKind::Integer => {
            fragment.minimum = constraints.min;
            fragment.maximum = constraints.max;
        }
        PrimitiveKind::Boolean => {}
    }
    fragment.description = primitive.description.clone();
    fragment
}

fn render_enum(enumeration: &EnumSchema) -> SchemaObject {
    let schema_type = literal_type(&enumeration.values);
    SchemaObject {
        schema_type,
        enum_values: enumeration.values.clone(),
        description: enumeration.description.clone(),
        ..SchemaObject::default()
    }
}

/// The common JSON type of a set of literals, if they share one.
fn literal_type(values: &[Value]) -> Option<SchemaType> {
    let type_of = |value: &Value| match value {
        Value::String(_) => Some(SchemaType::String),
        Value::Bool(_) => Some(SchemaType::Boolean),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(SchemaType::Integer),
        Value::Number(_) => Some(SchemaType::Number),
        _ => None,
    };
    let first = type_of(values.first()?)?;
    values
        .iter()
        .all(|value| type_of(value) == Some(first))
        .then_some(first)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn length_bound(bound: f64) -> u64 {
    if bound.is_sign_negative() {
        0
    } else {
        bound as u64
    }
}

/// Flattens the top-level properties of an object descriptor into parameters.
///
/// Path parameters are always required. Non-object descriptors yield nothing.
#[must_use]
pub fn flatten_parameters(schema: &Schema, location: ParameterIn) -> Vec<Parameter> {
    let Some(object) = schema.as_object() else {
        return Vec::new();
    };
    object
        .properties()
        .iter()
        .map(|(name, property)| Parameter {
            name: name.clone(),
            location,
            description: property.description().map(ToString::to_string),
            required: location == ParameterIn::Path || object.is_required(name),
            schema: render_schema(property),
        })
        .collect()
}
