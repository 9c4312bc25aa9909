//! Structural type descriptions.
//!
//! Declared parameter and body types are described by a [`TypeDescriptor`]
//! tree rather than by runtime reflection. [`describe`] walks that tree and
//! produces a [`SchemaNode`], resolving field names through an explicit
//! [`NamingStrategy`].

use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    String,
    Integer,
    Number,
    Boolean,
    /// Raw bytes (uploads, octet streams)
    Binary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field name as written in the source type
    pub name: String,
    /// Serialization name, when it differs from `name`
    pub tag: Option<String>,
    pub ty: TypeDescriptor,
    pub required: bool,
    pub description: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            tag: None,
            ty,
            required: false,
            description: None,
        }
    }

    #[must_use]
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// Anything; no structural constraint
    Any,
    Primitive(Primitive),
    Array(Box<TypeDescriptor>),
    Object {
        name: Option<String>,
        fields: Vec<FieldDescriptor>,
    },
}

impl Default for TypeDescriptor {
    fn default() -> Self {
        TypeDescriptor::Primitive(Primitive::String)
    }
}

impl TypeDescriptor {
    #[must_use]
    pub fn string() -> Self {
        TypeDescriptor::Primitive(Primitive::String)
    }

    #[must_use]
    pub fn integer() -> Self {
        TypeDescriptor::Primitive(Primitive::Integer)
    }

    #[must_use]
    pub fn number() -> Self {
        TypeDescriptor::Primitive(Primitive::Number)
    }

    #[must_use]
    pub fn boolean() -> Self {
        TypeDescriptor::Primitive(Primitive::Boolean)
    }

    #[must_use]
    pub fn binary() -> Self {
        TypeDescriptor::Primitive(Primitive::Binary)
    }

    #[must_use]
    pub fn array_of(item: TypeDescriptor) -> Self {
        TypeDescriptor::Array(Box::new(item))
    }

    /// An object with no fields yet; add them with [`TypeDescriptor::field`].
    pub fn object(name: impl Into<String>) -> Self {
        TypeDescriptor::Object {
            name: Some(name.into()),
            fields: Vec::new(),
        }
    }

    /// Append a field. No effect on non-object descriptors.
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        if let TypeDescriptor::Object { fields, .. } = &mut self {
            fields.push(field);
        }
        self
    }

    /// Name of a named object type.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        match self {
            TypeDescriptor::Object { name, .. } => name.as_deref(),
            _ => None,
        }
    }
}

/// Rust types with a known structural description.
pub trait Describe {
    fn type_descriptor() -> TypeDescriptor;
}

macro_rules! describe_primitive {
    ($prim:ident => $($ty:ty),+) => {
        $(impl Describe for $ty {
            fn type_descriptor() -> TypeDescriptor {
                TypeDescriptor::Primitive(Primitive::$prim)
            }
        })+
    };
}

describe_primitive!(String => String, &str, char);
describe_primitive!(Integer => i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);
describe_primitive!(Number => f32, f64);
describe_primitive!(Boolean => bool);

impl<T: Describe> Describe for Vec<T> {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::array_of(T::type_descriptor())
    }
}

impl<T: Describe> Describe for Option<T> {
    fn type_descriptor() -> TypeDescriptor {
        T::type_descriptor()
    }
}

impl Describe for Value {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::Any
    }
}

/// Resolves the wire name of an object field.
pub type NamingStrategy = fn(&FieldDescriptor) -> String;

/// Prefer the serialization tag, fall back to the field name.
#[must_use]
pub fn tag_or_field_name(field: &FieldDescriptor) -> String {
    field.tag.clone().unwrap_or_else(|| field.name.clone())
}

/// Always the raw field name.
#[must_use]
pub fn field_name(field: &FieldDescriptor) -> String {
    field.name.clone()
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Any,
    Primitive {
        ty: &'static str,
        format: Option<&'static str>,
    },
    Array(Box<SchemaNode>),
    Object {
        title: Option<String>,
        properties: Vec<(String, SchemaNode, Option<String>)>,
        required: Vec<String>,
    },
}

/// Walk a descriptor and produce its schema.
#[must_use]
pub fn describe(ty: &TypeDescriptor, naming: NamingStrategy) -> SchemaNode {
    match ty {
        TypeDescriptor::Any => SchemaNode::Any,
        TypeDescriptor::Primitive(p) => {
            let (ty, format) = match p {
                Primitive::String => ("string", None),
                Primitive::Integer => ("integer", Some("int64")),
                Primitive::Number => ("number", Some("double")),
                Primitive::Boolean => ("boolean", None),
                Primitive::Binary => ("string", Some("binary")),
            };
            SchemaNode::Primitive { ty, format }
        }
        TypeDescriptor::Array(item) => SchemaNode::Array(Box::new(describe(item, naming))),
        TypeDescriptor::Object { name, fields } => {
            let mut required = Vec::new();
            let properties = fields
                .iter()
                .map(|f| {
                    let wire = naming(f);
                    if f.required {
                        required.push(wire.clone());
                    }
                    (wire, describe(&f.ty, naming), f.description.clone())
                })
                .collect();
            SchemaNode::Object {
                title: name.clone(),
                properties,
                required,
            }
        }
    }
}

impl SchemaNode {
    /// JSON Schema (OpenAPI 3.1 dialect) for this node.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            SchemaNode::Any => json!({}),
            SchemaNode::Primitive { ty, format } => match format {
                Some(format) => json!({ "type": ty, "format": format }),
                None => json!({ "type": ty }),
            },
            SchemaNode::Array(item) => json!({ "type": "array", "items": item.to_json() }),
            SchemaNode::Object {
                title,
                properties,
                required,
            } => {
                let mut props = Map::new();
                for (name, node, description) in properties {
                    let mut schema = node.to_json();
                    if let (Some(d), Value::Object(obj)) = (description, &mut schema) {
                        obj.insert("description".into(), Value::String(d.clone()));
                    }
                    props.insert(name.clone(), schema);
                }
                let mut schema = Map::new();
                schema.insert("type".into(), json!("object"));
                if let Some(title) = title {
                    schema.insert("title".into(), json!(title));
                }
                schema.insert("properties".into(), Value::Object(props));
                if !required.is_empty() {
                    schema.insert("required".into(), json!(required));
                }
                Value::Object(schema)
            }
        }
    }
}

/// Shorthand for `describe(ty, tag_or_field_name).to_json()`.
#[must_use]
pub fn json_schema(ty: &TypeDescriptor) -> Value {
    describe(ty, tag_or_field_name).to_json()
}
