//! Source Model
//!
//! The capability contract for the external source-model reader. A reader
//! yields one [`SourceUnit`] per source file: its annotated class-like
//! declarations (controllers) and its exported type declarations, with
//! every type already resolved to a [`TypeExpr`].
//!
//! Parsing source files is not done here. [`JsonSourceReader`] consumes
//! JSON dumps produced by a front end; tests and embedders can implement
//! [`SourceReader`] directly.

pub mod reader;
pub mod types;

pub use reader::JsonSourceReader;
pub use types::{needs_quotes, LiteralValue, PrimitiveKind, PropertyDecl, TypeExpr};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

// =============================================================================
// Reader Capability
// =============================================================================

/// Yields source units for a set of glob patterns relative to a root
pub trait SourceReader: Sync {
    fn read(&self, root: &Path, patterns: &[String]) -> Result<Vec<SourceUnit>>;
}

// =============================================================================
// Source Units
// =============================================================================

/// Everything the reader knows about one source file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Path of the original source file (e.g. `src/users/users.controller.ts`)
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub classes: Vec<ClassDecl>,
    #[serde(default)]
    pub declarations: Vec<TypeDeclaration>,
}

/// A class-like declaration with its annotations and methods
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
}

/// A method of a class-like declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub parameters: Vec<ParameterDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<TypeExpr>,
}

/// A formal parameter of a method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDecl {
    pub name: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
}

// =============================================================================
// Annotations
// =============================================================================

/// A structured marker on a declaration, method, or parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<ArgLiteral>,
}

impl Annotation {
    pub fn new(name: impl Into<String>, arguments: Vec<ArgLiteral>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// First argument, if any
    pub fn first_argument(&self) -> Option<&ArgLiteral> {
        self.arguments.first()
    }
}

/// Literal argument passed to an annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgLiteral {
    String(String),
    Number(serde_json::Number),
    Boolean(bool),
    Array(Vec<ArgLiteral>),
    /// Non-literal argument (identifier, call, template), kept as source text
    Expression {
        #[serde(rename = "$expression")]
        text: String,
    },
    Object(BTreeMap<String, ArgLiteral>),
}

impl ArgLiteral {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Self::String(s) => format!("string \"{}\"", s),
            Self::Number(n) => format!("number {}", n),
            Self::Boolean(b) => format!("boolean {}", b),
            Self::Array(_) => "array with non-string elements".to_string(),
            Self::Expression { text } => format!("expression `{}`", text),
            Self::Object(_) => "object literal".to_string(),
        }
    }
}

/// Find an annotation by name
pub fn find_annotation<'a>(annotations: &'a [Annotation], name: &str) -> Option<&'a Annotation> {
    annotations.iter().find(|a| a.name == name)
}

// =============================================================================
// Type Declarations
// =============================================================================

/// A named type declaration discovered in the project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
    #[serde(default = "default_true")]
    pub exported: bool,
    #[serde(flatten)]
    pub body: DeclarationBody,
}

/// Closed set of declaration kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeclarationBody {
    Enum {
        #[serde(default)]
        members: Vec<EnumMember>,
    },
    Interface(ObjectDecl),
    Class(ObjectDecl),
    Alias {
        target: TypeExpr,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        type_parameters: Vec<String>,
    },
}

/// Shape shared by interfaces and classes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectDecl {
    #[serde(default)]
    pub properties: Vec<PropertyDecl>,
    /// Supertypes by name (`extends` / `implements`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supertypes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_parameters: Vec<String>,
}

/// A member of an enum declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    pub value: LiteralValue,
}

impl TypeDeclaration {
    /// Properties for interfaces and classes, empty otherwise
    pub fn properties(&self) -> &[PropertyDecl] {
        match &self.body {
            DeclarationBody::Interface(obj) | DeclarationBody::Class(obj) => &obj.properties,
            _ => &[],
        }
    }

    /// Supertype names for interfaces and classes, empty otherwise
    pub fn supertypes(&self) -> &[String] {
        match &self.body {
            DeclarationBody::Interface(obj) | DeclarationBody::Class(obj) => &obj.supertypes,
            _ => &[],
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.body {
            DeclarationBody::Enum { .. } => "enum",
            DeclarationBody::Interface(_) => "interface",
            DeclarationBody::Class(_) => "class",
            DeclarationBody::Alias { .. } => "alias",
        }
    }
}

fn default_true() -> bool {
    true
}
