//! API surface extraction
//!
//! Turns annotated class declarations into [`Controller`]s holding
//! immutable [`Request`] records. The records are framework independent;
//! the annotation names they are read from come from a [`Convention`].

pub mod controller;
pub mod request;

pub use controller::{controller_name, ControllerExtractor};
pub use request::extract_request;

use serde::Serialize;
use std::fmt;

use crate::error::{GenError, Result};
use crate::source::{ArgLiteral, TypeExpr};

// =============================================================================
// Annotation Convention
// =============================================================================

/// Annotation names that mark API roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Convention {
    pub controller: &'static str,
    pub verbs: [(&'static str, Verb); 5],
    pub path: &'static str,
    pub query: &'static str,
    pub body: &'static str,
}

impl Convention {
    /// NestJS-style decorators
    pub const NEST: Convention = Convention {
        controller: "Controller",
        verbs: [
            ("Get", Verb::Get),
            ("Post", Verb::Post),
            ("Put", Verb::Put),
            ("Patch", Verb::Patch),
            ("Delete", Verb::Delete),
        ],
        path: "Param",
        query: "Query",
        body: "Body",
    };

    pub fn verb(&self, annotation: &str) -> Option<Verb> {
        self.verbs
            .iter()
            .find(|(name, _)| *name == annotation)
            .map(|(_, verb)| *verb)
    }

    pub fn binding_source(&self, annotation: &str) -> Option<BindingSource> {
        if annotation == self.path {
            Some(BindingSource::Path)
        } else if annotation == self.query {
            Some(BindingSource::Query)
        } else if annotation == self.body {
            Some(BindingSource::Body)
        } else {
            None
        }
    }
}

// =============================================================================
// Request IR
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    /// Lower-case method name as used on the wire and in documents
    pub fn as_lower(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_lower().to_uppercase())
    }
}

/// Where a bound parameter travels in the HTTP request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingSource {
    Path,
    Query,
    Body,
}

impl fmt::Display for BindingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path => f.write_str("path"),
            Self::Query => f.write_str("query"),
            Self::Body => f.write_str("body"),
        }
    }
}

/// A formal handler parameter that made it onto the wire
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundParameter {
    pub name: String,
    #[serde(rename = "type", serialize_with = "serialize_type_text")]
    pub ty: TypeExpr,
    pub optional: bool,
}

/// A parameter bound to one named field of a payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialBinding {
    pub property: String,
    pub parameter: BoundParameter,
}

/// The complete binding for one payload source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    /// One parameter supplies the entire payload
    Whole(BoundParameter),
    /// Named fields merged into a synthetic object
    Partial(Vec<PartialBinding>),
}

impl Payload {
    /// Formal parameters in declaration order
    pub fn parameters(&self) -> Vec<&BoundParameter> {
        match self {
            Self::Whole(param) => vec![param],
            Self::Partial(partials) => partials.iter().map(|p| &p.parameter).collect(),
        }
    }
}

/// One API endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
    /// Path with `:name` placeholders
    pub url_template: String,
    pub verb: Verb,
    pub params: Vec<PartialBinding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,
    /// Declared return type with any `Promise<T>` unwrapped
    #[serde(serialize_with = "serialize_type_text")]
    pub return_type: TypeExpr,
}

impl Request {
    /// Every formal parameter on the wire: params, then query, then data
    pub fn parameters(&self) -> Vec<&BoundParameter> {
        let mut all: Vec<&BoundParameter> = self.params.iter().map(|p| &p.parameter).collect();
        for payload in [&self.query, &self.data].into_iter().flatten() {
            all.extend(payload.parameters());
        }
        all
    }
}

/// Requests grouped under one annotated class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Controller {
    /// Source file base name (`users.controller.ts` → `users`)
    pub name: String,
    pub source: String,
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
    pub requests: Vec<Request>,
}

fn serialize_type_text<S: serde::Serializer>(ty: &TypeExpr, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(ty)
}

// =============================================================================
// Route Arguments
// =============================================================================

/// Join URL fragments, dropping empty and repeated separators.
///
/// The result always starts with `/` and never ends with one unless it is
/// the root.
pub fn join_url(base: &str, fragment: &str) -> String {
    let segments: Vec<&str> = base
        .split('/')
        .chain(fragment.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

/// Parse a route annotation argument into a path fragment.
///
/// Accepts nothing, a string, or an array of strings. With
/// `allow_object`, an object literal's `path` field is parsed the same way.
pub fn route_fragment(arg: Option<&ArgLiteral>, context: &str, allow_object: bool) -> Result<String> {
    let unknown = |found: &ArgLiteral| {
        if allow_object {
            GenError::unknown_controller_argument(context, found.describe())
        } else {
            GenError::unknown_route_argument(context, found.describe())
        }
    };

    match arg {
        None => Ok(String::new()),
        Some(ArgLiteral::String(s)) => Ok(s.clone()),
        Some(ArgLiteral::Array(items)) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    ArgLiteral::String(s) => parts.push(s.as_str()),
                    _ => return Err(unknown(item)),
                }
            }
            Ok(parts.join("/"))
        }
        Some(ArgLiteral::Object(fields)) if allow_object => {
            route_fragment(fields.get("path"), context, allow_object)
        }
        Some(other) => Err(unknown(other)),
    }
}
