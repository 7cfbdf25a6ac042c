//! Schema nodes
//!
//! [`SchemaNode`] is the normalized shape every emitter consumes. It is a
//! pure value tree: a [`SchemaNode::Reference`] names a catalog declaration
//! and never inlines it.
//!
//! Serializing a node yields an OpenAPI 3.0 schema object.

pub mod resolve;

pub use resolve::SchemaResolver;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::source::{LiteralValue, PrimitiveKind};

/// Prefix for component references in the schema document
pub const COMPONENT_REF_PREFIX: &str = "#/components/schemas/";

/// Normalized type shape
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Primitive(PrimitiveSchema),
    Array(Box<SchemaNode>),
    /// Named catalog declaration
    Reference(String),
    AnyOf(Vec<SchemaNode>),
    AllOf(Vec<SchemaNode>),
    Object(ObjectSchema),
    /// Open schema, accepts anything
    Unknown,
}

/// A primitive with an optional format and allowed values
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveSchema {
    pub kind: PrimitiveKind,
    pub format: Option<String>,
    /// Allowed values in declaration order, empty when unrestricted
    pub values: Vec<LiteralValue>,
}

/// An object with ordered properties
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    pub description: Option<String>,
    pub properties: Vec<PropertySchema>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySchema {
    pub name: String,
    pub schema: SchemaNode,
    pub description: Option<String>,
    pub required: bool,
}

impl SchemaNode {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::Primitive(PrimitiveSchema {
            kind,
            format: None,
            values: Vec::new(),
        })
    }

    pub fn string() -> Self {
        Self::primitive(PrimitiveKind::String)
    }

    pub fn number() -> Self {
        Self::primitive(PrimitiveKind::Number)
    }

    pub fn boolean() -> Self {
        Self::primitive(PrimitiveKind::Boolean)
    }

    pub fn array(items: SchemaNode) -> Self {
        Self::Array(Box::new(items))
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference(name.into())
    }

    /// Object without declared properties
    pub fn empty_object() -> Self {
        Self::Object(ObjectSchema::default())
    }

    pub fn as_reference(&self) -> Option<&str> {
        match self {
            Self::Reference(name) => Some(name),
            _ => None,
        }
    }

    /// Write this node's keys into an already-open map
    fn serialize_entries<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        match self {
            Self::Primitive(p) => {
                map.serialize_entry("type", p.kind.as_str())?;
                if let Some(format) = &p.format {
                    map.serialize_entry("format", format)?;
                }
                if !p.values.is_empty() {
                    map.serialize_entry("enum", &p.values)?;
                }
            }
            Self::Array(items) => {
                map.serialize_entry("type", "array")?;
                map.serialize_entry("items", items)?;
            }
            Self::Reference(name) => {
                map.serialize_entry("$ref", &format!("{}{}", COMPONENT_REF_PREFIX, name))?;
            }
            Self::AnyOf(members) => map.serialize_entry("anyOf", members)?,
            Self::AllOf(members) => map.serialize_entry("allOf", members)?,
            Self::Object(obj) => {
                map.serialize_entry("type", "object")?;
                if let Some(description) = &obj.description {
                    map.serialize_entry("description", description)?;
                }
                if !obj.properties.is_empty() {
                    map.serialize_entry("properties", &PropertiesView(&obj.properties))?;
                }
                let required: Vec<&str> = obj
                    .properties
                    .iter()
                    .filter(|p| p.required)
                    .map(|p| p.name.as_str())
                    .collect();
                if !required.is_empty() {
                    map.serialize_entry("required", &required)?;
                }
            }
            Self::Unknown => {}
        }
        Ok(())
    }
}

impl Serialize for SchemaNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.serialize_entries(&mut map)?;
        map.end()
    }
}

/// Ordered `properties` map
struct PropertiesView<'a>(&'a [PropertySchema]);

impl Serialize for PropertiesView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for prop in self.0 {
            map.serialize_entry(&prop.name, &PropertyView(prop))?;
        }
        map.end()
    }
}

/// A property schema with its description folded in
struct PropertyView<'a>(&'a PropertySchema);

impl Serialize for PropertyView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.0.schema.serialize_entries(&mut map)?;
        if let Some(description) = &self.0.description {
            map.serialize_entry("description", description)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_reference_and_array() {
        let node = SchemaNode::array(SchemaNode::reference("User"));
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"type": "array", "items": {"$ref": "#/components/schemas/User"}})
        );
        assert_eq!(serde_json::to_value(SchemaNode::Unknown).unwrap(), json!({}));
    }

    #[test]
    fn test_serialize_object_keeps_property_order() {
        let node = SchemaNode::Object(ObjectSchema {
            description: Some("A user".to_string()),
            properties: vec![
                PropertySchema {
                    name: "name".to_string(),
                    schema: SchemaNode::string(),
                    description: Some("Display name".to_string()),
                    required: true,
                },
                PropertySchema {
                    name: "age".to_string(),
                    schema: SchemaNode::number(),
                    description: None,
                    required: false,
                },
            ],
        });

        let text = serde_json::to_string(&node).unwrap();
        assert!(text.find("\"name\"").unwrap() < text.find("\"age\"").unwrap());
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({
                "type": "object",
                "description": "A user",
                "properties": {
                    "name": {"type": "string", "description": "Display name"},
                    "age": {"type": "number"}
                },
                "required": ["name"]
            })
        );
    }

    #[test]
    fn test_serialize_enum_values() {
        let node = SchemaNode::Primitive(PrimitiveSchema {
            kind: PrimitiveKind::Number,
            format: None,
            values: vec![
                LiteralValue::Number(1.into()),
                LiteralValue::Number(2.into()),
            ],
        });
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"type": "number", "enum": [1, 2]})
        );
    }
}
