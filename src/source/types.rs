//! Type expressions as yielded by the source-model reader.
//!
//! A [`TypeExpr`] is the resolved type of a parameter, property, or return
//! value. It is never interpreted here: the schema resolver turns it into a
//! [`crate::schema::SchemaNode`] and the client emitter renders it back to
//! source text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive keyword kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A literal value (literal types, enum member values)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    String(String),
    Number(serde_json::Number),
    Boolean(bool),
}

impl LiteralValue {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::String(_) => PrimitiveKind::String,
            Self::Number(_) => PrimitiveKind::Number,
            Self::Boolean(_) => PrimitiveKind::Boolean,
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Self::Number(n) => write!(f, "{}", n),
            Self::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Check if a property key must be quoted in source text
pub fn needs_quotes(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
            !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => true,
    }
}

/// A property of an object type, interface, or class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

/// A resolved type expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeExpr {
    /// `string`, `number`, `boolean`
    Keyword { keyword: PrimitiveKind },
    /// `"active"`, `42`, `true`
    Literal { value: LiteralValue },
    Undefined,
    Null,
    Void,
    Any,
    Unknown,
    /// `T[]`
    Array { element: Box<TypeExpr> },
    /// `A | B`
    Union { members: Vec<TypeExpr> },
    /// `A & B`
    Intersection { members: Vec<TypeExpr> },
    /// Named declaration or built-in, with optional type arguments
    Reference {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        arguments: Vec<TypeExpr>,
    },
    /// Type parameter of the enclosing generic declaration
    TypeParameter { name: String },
    /// Structural object type `{ a: string }`
    Object {
        #[serde(default)]
        members: Vec<PropertyDecl>,
    },
}

impl TypeExpr {
    pub fn keyword(kind: PrimitiveKind) -> Self {
        Self::Keyword { keyword: kind }
    }

    pub fn string() -> Self {
        Self::keyword(PrimitiveKind::String)
    }

    pub fn number() -> Self {
        Self::keyword(PrimitiveKind::Number)
    }

    pub fn boolean() -> Self {
        Self::keyword(PrimitiveKind::Boolean)
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, arguments: Vec<TypeExpr>) -> Self {
        Self::Reference {
            name: name.into(),
            arguments,
        }
    }

    pub fn array(element: TypeExpr) -> Self {
        Self::Array {
            element: Box::new(element),
        }
    }

    /// Unwrap a single-argument `Promise<T>` to `T`
    pub fn unwrap_promise(&self) -> &TypeExpr {
        match self {
            Self::Reference { name, arguments } if name == "Promise" && arguments.len() == 1 => {
                &arguments[0]
            }
            other => other,
        }
    }

    /// Visit every named reference in this expression
    pub fn for_each_reference<'a>(&'a self, visit: &mut impl FnMut(&'a str)) {
        match self {
            Self::Reference { name, arguments } => {
                visit(name);
                for arg in arguments {
                    arg.for_each_reference(visit);
                }
            }
            Self::Array { element } => element.for_each_reference(visit),
            Self::Union { members } | Self::Intersection { members } => {
                for member in members {
                    member.for_each_reference(visit);
                }
            }
            Self::Object { members } => {
                for member in members {
                    member.ty.for_each_reference(visit);
                }
            }
            _ => {}
        }
    }

    fn needs_parens_in_array(&self) -> bool {
        matches!(self, Self::Union { .. } | Self::Intersection { .. })
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyword { keyword } => write!(f, "{}", keyword),
            Self::Literal { value } => write!(f, "{}", value),
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Void => f.write_str("void"),
            Self::Any => f.write_str("any"),
            Self::Unknown => f.write_str("unknown"),
            Self::Array { element } => {
                if element.needs_parens_in_array() {
                    write!(f, "({})[]", element)
                } else {
                    write!(f, "{}[]", element)
                }
            }
            Self::Union { members } => write_joined(f, members, " | ", false),
            Self::Intersection { members } => write_joined(f, members, " & ", true),
            Self::Reference { name, arguments } => {
                f.write_str(name)?;
                if !arguments.is_empty() {
                    f.write_str("<")?;
                    write_joined(f, arguments, ", ", false)?;
                    f.write_str(">")?;
                }
                Ok(())
            }
            Self::TypeParameter { name } => f.write_str(name),
            Self::Object { members } => {
                if members.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    if needs_quotes(&member.name) {
                        write!(f, "{}", LiteralValue::String(member.name.clone()))?;
                    } else {
                        f.write_str(&member.name)?;
                    }
                    let opt = if member.optional { "?" } else { "" };
                    write!(f, "{}: {}", opt, member.ty)?;
                }
                f.write_str(" }")
            }
        }
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    items: &[TypeExpr],
    sep: &str,
    paren_unions: bool,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        if paren_unions && matches!(item, TypeExpr::Union { .. }) {
            write!(f, "({})", item)?;
        } else {
            write!(f, "{}", item)?;
        }
    }
    Ok(())
}
