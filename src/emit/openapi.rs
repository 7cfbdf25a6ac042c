//! Schema Document Emitter
//!
//! Builds an OpenAPI 3.0.0 document from the extracted controllers and the
//! task's type catalog. The document is a typed value built fresh for each
//! call and serialized once at the end.

use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use crate::catalog::TypeCatalog;
use crate::config::OpenApiConfig;
use crate::diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics};
use crate::error::Result;
use crate::extract::{BindingSource, BoundParameter, Controller, PartialBinding, Payload, Request};
use crate::schema::{ObjectSchema, PropertySchema, SchemaNode, SchemaResolver};
use crate::source::{DeclarationBody, PropertyDecl, TypeExpr};

use super::{Artifact, EmitInput, Emitter};

pub const OPENAPI_VERSION: &str = "3.0.0";
const JSON_MEDIA_TYPE: &str = "application/json";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([A-Za-z_$][A-Za-z0-9_$]*)").expect("valid placeholder regex"));

/// `/users/:id` → `/users/{id}`
pub fn document_path(url_template: &str) -> String {
    PLACEHOLDER.replace_all(url_template, "{$1}").into_owned()
}

// =============================================================================
// Document Model
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct OpenApiDocument {
    pub openapi: &'static str,
    pub info: Info,
    pub paths: BTreeMap<String, BTreeMap<&'static str, Operation>>,
    pub components: Components,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub operation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: BTreeMap<String, Response>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: BindingSource,
    pub required: bool,
    pub schema: SchemaNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestBody {
    pub required: bool,
    pub content: BTreeMap<&'static str, MediaType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaType {
    pub schema: SchemaNode,
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<BTreeMap<&'static str, MediaType>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Components {
    pub schemas: BTreeMap<String, SchemaNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    pub name: String,
    pub description: String,
}

fn json_content(schema: SchemaNode) -> BTreeMap<&'static str, MediaType> {
    BTreeMap::from([(JSON_MEDIA_TYPE, MediaType { schema })])
}

// =============================================================================
// Emitter
// =============================================================================

/// Emits a JSON schema document
#[derive(Debug, Clone)]
pub struct OpenApiEmitter {
    config: OpenApiConfig,
}

impl OpenApiEmitter {
    pub fn new(config: OpenApiConfig) -> Self {
        Self { config }
    }

    /// Fold controllers and catalog into a fresh document
    pub fn build_document(&self, input: EmitInput<'_>, diagnostics: &mut Diagnostics) -> OpenApiDocument {
        let resolver = SchemaResolver::with_catalog(input.catalog);

        let mut components = Components::default();
        for decl in input.catalog.iter() {
            let schema = resolver.synthesize(decl, diagnostics);
            components.schemas.insert(decl.name.clone(), schema);
        }

        let mut paths: BTreeMap<String, BTreeMap<&'static str, Operation>> = BTreeMap::new();
        for controller in input.controllers {
            for request in &controller.requests {
                let path = document_path(&request.url_template);
                let operation = self.operation(controller, request, &resolver, diagnostics);
                let replaced = paths
                    .entry(path.clone())
                    .or_default()
                    .insert(request.verb.as_lower(), operation);
                if let Some(previous) = replaced {
                    diagnostics.push(
                        DiagnosticItem::new(
                            format!("{} {}", request.verb, path),
                            DiagnosticCode::DuplicateRoute,
                            "route declared more than once; the later handler wins",
                        )
                        .with_context(format!("replaced: {}", previous.operation_id))
                        .with_context(format!("kept: {}.{}", controller.name, request.name)),
                    );
                }
            }
        }

        let mut seen = HashSet::new();
        let tags = input
            .controllers
            .iter()
            .filter_map(|c| {
                let docs = c.docs.as_deref().map(str::trim).filter(|d| !d.is_empty())?;
                seen.insert(c.name.as_str()).then(|| Tag {
                    name: c.name.clone(),
                    description: docs.to_string(),
                })
            })
            .collect();

        OpenApiDocument {
            openapi: OPENAPI_VERSION,
            info: Info {
                title: self.config.title.clone(),
                version: self.config.version.clone(),
                description: self.config.description.clone(),
            },
            paths,
            components,
            tags,
        }
    }

    fn operation(
        &self,
        controller: &Controller,
        request: &Request,
        resolver: &SchemaResolver<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Operation {
        let subject = format!("{}.{}", controller.name, request.name);

        let mut parameters: Vec<Parameter> = request
            .params
            .iter()
            .map(|p| partial_parameter(&subject, BindingSource::Path, p, resolver, diagnostics))
            .collect();

        match &request.query {
            Some(Payload::Partial(partials)) => parameters.extend(
                partials
                    .iter()
                    .map(|p| partial_parameter(&subject, BindingSource::Query, p, resolver, diagnostics)),
            ),
            Some(Payload::Whole(param)) => {
                parameters.extend(whole_query_parameters(&subject, param, resolver, diagnostics))
            }
            None => {}
        }

        let request_body = request.data.as_ref().map(|data| match data {
            Payload::Whole(param) => RequestBody {
                required: !param.optional,
                content: json_content(
                    resolver
                        .resolve_for(&subject, &param.ty, diagnostics)
                        .unwrap_or(SchemaNode::Unknown),
                ),
            },
            Payload::Partial(partials) => {
                let properties = partials
                    .iter()
                    .map(|p| PropertySchema {
                        name: p.property.clone(),
                        schema: resolver
                            .resolve_for(&subject, &p.parameter.ty, diagnostics)
                            .unwrap_or(SchemaNode::Unknown),
                        description: None,
                        required: !p.parameter.optional,
                    })
                    .collect();
                RequestBody {
                    required: partials.iter().any(|p| !p.parameter.optional),
                    content: json_content(SchemaNode::Object(ObjectSchema {
                        description: None,
                        properties,
                    })),
                }
            }
        });

        let response = Response {
            description: "OK".to_string(),
            content: resolver
                .resolve_for(&subject, &request.return_type, diagnostics)
                .map(json_content),
        };

        Operation {
            operation_id: request.name.clone(),
            summary: request.docs.clone(),
            tags: vec![controller.name.clone()],
            parameters,
            request_body,
            responses: BTreeMap::from([("200".to_string(), response)]),
        }
    }
}

fn partial_parameter(
    subject: &str,
    location: BindingSource,
    binding: &PartialBinding,
    resolver: &SchemaResolver<'_>,
    diagnostics: &mut Diagnostics,
) -> Parameter {
    Parameter {
        name: binding.property.clone(),
        location,
        // path parameters are always required in the document format
        required: location == BindingSource::Path || !binding.parameter.optional,
        schema: resolver
            .resolve_for(subject, &binding.parameter.ty, diagnostics)
            .unwrap_or(SchemaNode::Unknown),
        description: None,
    }
}

/// Expand a whole query binding into one parameter per property
fn whole_query_parameters(
    subject: &str,
    param: &BoundParameter,
    resolver: &SchemaResolver<'_>,
    diagnostics: &mut Diagnostics,
) -> Vec<Parameter> {
    let properties = resolver
        .catalog()
        .and_then(|catalog| expandable_properties(catalog, &param.ty, 0));

    match properties {
        Some(properties) => properties
            .into_iter()
            .filter_map(|prop| {
                let schema = resolver.resolve_for(subject, &prop.ty, diagnostics)?;
                Some(Parameter {
                    name: prop.name.clone(),
                    location: BindingSource::Query,
                    required: !prop.optional,
                    schema,
                    description: prop.docs.clone(),
                })
            })
            .collect(),
        None => {
            diagnostics.report(
                subject,
                DiagnosticCode::UnexpandableQuery,
                format!(
                    "query type '{}' of '{}' has no properties to expand, emitted as one parameter",
                    param.ty, param.name
                ),
            );
            vec![Parameter {
                name: param.name.clone(),
                location: BindingSource::Query,
                required: !param.optional,
                schema: resolver
                    .resolve_for(subject, &param.ty, diagnostics)
                    .unwrap_or(SchemaNode::Unknown),
                description: None,
            }]
        }
    }
}

const MAX_ALIAS_DEPTH: usize = 16;

/// Properties a query type expands to, following aliases and supertypes
fn expandable_properties<'a>(catalog: &'a TypeCatalog, ty: &'a TypeExpr, depth: usize) -> Option<Vec<&'a PropertyDecl>> {
    if depth > MAX_ALIAS_DEPTH {
        return None;
    }
    match ty {
        TypeExpr::Object { members } => Some(members.iter().collect()),
        TypeExpr::Reference { name, arguments } if arguments.is_empty() => match &catalog.get(name)?.body {
            DeclarationBody::Interface(_) | DeclarationBody::Class(_) => Some(catalog.flattened_properties(name)),
            DeclarationBody::Alias { target, .. } => expandable_properties(catalog, target, depth + 1),
            DeclarationBody::Enum { .. } => None,
        },
        TypeExpr::Intersection { members } => {
            let mut seen = HashSet::new();
            let mut all = Vec::new();
            for member in members {
                for prop in expandable_properties(catalog, member, depth + 1)? {
                    if seen.insert(prop.name.as_str()) {
                        all.push(prop);
                    }
                }
            }
            Some(all)
        }
        _ => None,
    }
}

impl Emitter for OpenApiEmitter {
    fn name(&self) -> &'static str {
        "openapi"
    }

    fn emit(&self, input: EmitInput<'_>, diagnostics: &mut Diagnostics) -> Result<Vec<Artifact>> {
        let document = self.build_document(input, diagnostics);
        tracing::debug!(
            paths = document.paths.len(),
            schemas = document.components.schemas.len(),
            "built schema document"
        );

        let mut contents = serde_json::to_string_pretty(&document)?;
        contents.push('\n');
        Ok(vec![Artifact::new(&self.config.output, contents)])
    }
}
