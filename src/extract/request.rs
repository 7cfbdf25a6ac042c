//! Request Extractor
//!
//! One [`Request`] per handler method. A method is a handler when it carries
//! a verb annotation; anything else is skipped.

use crate::diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics};
use crate::error::{GenError, Result};
use crate::source::{MethodDecl, ParameterDecl, TypeExpr};

use super::{join_url, route_fragment, BindingSource, BoundParameter, Convention, PartialBinding, Payload, Request};

/// Accumulates the bindings of one payload source
#[derive(Debug, Default)]
struct SourceBindings {
    partials: Vec<PartialBinding>,
    whole: Option<BoundParameter>,
}

impl SourceBindings {
    /// Add a binding; the first whole binding takes the source over
    fn add(&mut self, field: Option<&str>, parameter: BoundParameter, subject: &str, diagnostics: &mut Diagnostics) {
        if let Some(whole) = &self.whole {
            tracing::debug!(
                subject,
                kept = %whole.name,
                ignored = %parameter.name,
                "source already bound whole"
            );
            return;
        }

        match field {
            Some(property) => self.partials.push(PartialBinding {
                property: property.to_string(),
                parameter,
            }),
            None => {
                if !self.partials.is_empty() {
                    let dropped: Vec<&str> = self.partials.iter().map(|p| p.parameter.name.as_str()).collect();
                    diagnostics.push(
                        DiagnosticItem::new(
                            subject,
                            DiagnosticCode::DiscardedBinding,
                            format!("whole binding '{}' replaces earlier field bindings", parameter.name),
                        )
                        .with_context(format!("discarded: {}", dropped.join(", "))),
                    );
                    self.partials.clear();
                }
                self.whole = Some(parameter);
            }
        }
    }

    fn finish(self) -> Option<Payload> {
        match self.whole {
            Some(whole) => Some(Payload::Whole(whole)),
            None if self.partials.is_empty() => None,
            None => Some(Payload::Partial(self.partials)),
        }
    }
}

/// Extract the request for one method of `controller`.
///
/// Returns `Ok(None)` when the method carries no verb annotation.
pub fn extract_request(
    convention: &Convention,
    controller: &str,
    base_url: &str,
    method: &MethodDecl,
    diagnostics: &mut Diagnostics,
) -> Result<Option<Request>> {
    let Some((annotation, verb)) = method
        .annotations
        .iter()
        .find_map(|a| convention.verb(&a.name).map(|verb| (a, verb)))
    else {
        return Ok(None);
    };

    let subject = format!("{}.{}", controller, method.name);
    let fragment = route_fragment(annotation.first_argument(), &subject, false)?;
    let url_template = join_url(base_url, &fragment);

    let mut params: Vec<PartialBinding> = Vec::new();
    let mut query = SourceBindings::default();
    let mut data = SourceBindings::default();

    for parameter in &method.parameters {
        let Some((source, field)) = binding_of(convention, parameter) else {
            continue;
        };
        let bound = BoundParameter {
            name: parameter.name.clone(),
            ty: parameter.ty.clone(),
            optional: parameter.optional,
        };

        match source {
            BindingSource::Path => {
                let property = field.ok_or_else(|| GenError::MissingPathField {
                    controller: controller.to_string(),
                    method: method.name.clone(),
                    parameter: parameter.name.clone(),
                })?;
                params.push(PartialBinding {
                    property: property.to_string(),
                    parameter: bound,
                });
            }
            BindingSource::Query => query.add(field, bound, &subject, diagnostics),
            BindingSource::Body => data.add(field, bound, &subject, diagnostics),
        }
    }

    let return_type = method
        .return_type
        .as_ref()
        .map(|ty| ty.unwrap_promise().clone())
        .unwrap_or(TypeExpr::Void);

    let request = Request {
        name: method.name.clone(),
        docs: method.docs.clone(),
        url_template,
        verb,
        params,
        query: query.finish(),
        data: data.finish(),
        return_type,
    };
    tracing::debug!(request = %subject, verb = %request.verb, url = %request.url_template, "extracted request");

    Ok(Some(request))
}

/// Binding source and explicit field name of a parameter, if annotated
fn binding_of<'a>(convention: &Convention, parameter: &'a ParameterDecl) -> Option<(BindingSource, Option<&'a str>)> {
    parameter.annotations.iter().find_map(|a| {
        convention
            .binding_source(&a.name)
            .map(|source| (source, a.first_argument().and_then(|arg| arg.as_str())))
    })
}
