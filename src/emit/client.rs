//! Client Stub Emitter
//!
//! Renders one `export namespace` per controller name holding one request
//! function per endpoint, followed by the type declarations those functions
//! reference. Types either follow the functions in the same unit or go to a
//! separate unit that the request unit imports.
//!
//! Parameter and return types are rendered from their source type text
//! rather than from resolved schemas.

use regex::{Captures, Regex};
use std::collections::HashSet;
use std::path::{Component, Path};
use std::sync::LazyLock;

use crate::config::{ClientConfig, FormatConfig};
use crate::diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics};
use crate::error::Result;
use crate::extract::{Controller, PartialBinding, Payload, Request};
use crate::source::{needs_quotes, DeclarationBody, LiteralValue, PropertyDecl, TypeDeclaration};

use super::{Artifact, EmitInput, Emitter};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([A-Za-z_$][A-Za-z0-9_$]*)").expect("valid placeholder regex"));

/// Comments and string or template literals
static NON_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)/\*.*?\*/|//[^\n]*|"(?:\\.|[^"\\\n])*"|'(?:\\.|[^'\\\n])*'|`(?:\\.|[^`\\])*`"#)
        .expect("valid non-code regex")
});

/// Namespace identifier for a controller name
pub fn namespace_name(controller: &str) -> String {
    let mut name: String = controller
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c.to_ascii_uppercase() } else { '_' })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

/// Module specifier for importing `to` from a file at `from`
pub fn relative_module(from: &Path, to: &Path) -> String {
    let normal = |p: &Path| -> Vec<String> {
        p.components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect()
    };

    let from_dir = from.parent().map(normal).unwrap_or_default();
    let target = normal(&to.with_extension(""));

    let common = from_dir
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = std::iter::repeat("..".to_string())
        .take(from_dir.len() - common)
        .collect();
    if parts.is_empty() {
        parts.push(".".to_string());
    }
    parts.extend(target[common..].iter().cloned());
    parts.join("/")
}

// =============================================================================
// Source Writer
// =============================================================================

/// Line-oriented writer with configurable indentation
struct SourceWriter {
    unit: String,
    depth: usize,
    out: String,
}

impl SourceWriter {
    fn new(format: &FormatConfig) -> Self {
        Self {
            unit: " ".repeat(format.indent),
            depth: 0,
            out: String::new(),
        }
    }

    fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str(&self.unit);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    fn open(&mut self, text: &str) {
        self.line(text);
        self.depth += 1;
    }

    fn close(&mut self, text: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    fn docs(&mut self, docs: Option<&str>) {
        let Some(docs) = docs.map(str::trim).filter(|d| !d.is_empty()) else {
            return;
        };
        if !docs.contains('\n') {
            self.line(&format!("/** {} */", docs));
            return;
        }
        self.line("/**");
        for line in docs.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                self.line(" *");
            } else {
                self.line(&format!(" * {}", line));
            }
        }
        self.line(" */");
    }

    fn finish(self) -> String {
        self.out
    }
}

// =============================================================================
// Imports
// =============================================================================

#[derive(Debug, Clone)]
struct Import {
    default: Option<String>,
    named: Vec<String>,
    module: String,
}

impl Import {
    /// Drop bindings that never occur in the code of `body`; `None` if nothing is left
    fn pruned(&self, body: &str) -> Option<Import> {
        let code = NON_CODE.replace_all(body, " ");
        let used = |ident: &str| {
            Regex::new(&format!(r"\b{}\b", regex::escape(ident)))
                .map(|re| re.is_match(&code))
                .unwrap_or(true)
        };

        let default = self.default.clone().filter(|d| used(d));
        let named: Vec<String> = self.named.iter().filter(|n| used(n)).cloned().collect();
        if default.is_none() && named.is_empty() {
            return None;
        }
        Some(Import {
            default,
            named,
            module: self.module.clone(),
        })
    }

    fn render(&self, format: &FormatConfig) -> String {
        let mut bindings = Vec::new();
        if let Some(default) = &self.default {
            bindings.push(default.clone());
        }
        if !self.named.is_empty() {
            bindings.push(format!("{{ {} }}", self.named.join(", ")));
        }
        format!("import {} from {};", bindings.join(", "), format.quote.quote(&self.module))
    }
}

// =============================================================================
// Emitter
// =============================================================================

/// Emits a typed request library
#[derive(Debug, Clone)]
pub struct ClientEmitter {
    config: ClientConfig,
}

/// How the generated functions perform the HTTP call
struct CallTarget {
    import: Import,
    callee: &'static str,
    overrides_type: &'static str,
}

impl ClientEmitter {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    fn call_target(&self) -> CallTarget {
        match &self.config.request_module {
            Some(module) => CallTarget {
                import: Import {
                    default: Some("request".to_string()),
                    named: Vec::new(),
                    module: module.clone(),
                },
                callee: "request",
                overrides_type: "Partial<Parameters<typeof request>[0]>",
            },
            None => CallTarget {
                import: Import {
                    default: Some("axios".to_string()),
                    named: vec!["AxiosRequestConfig".to_string()],
                    module: "axios".to_string(),
                },
                callee: "axios.request",
                overrides_type: "AxiosRequestConfig",
            },
        }
    }

    fn header(&self) -> String {
        let Some(header) = self.config.header.as_deref().map(str::trim).filter(|h| !h.is_empty()) else {
            return String::new();
        };
        if header.starts_with("//") || header.starts_with("/*") {
            return format!("{}\n\n", header);
        }
        let mut out: String = header
            .lines()
            .map(|l| match l.trim_end() {
                "" => "//\n".to_string(),
                text => format!("// {}\n", text),
            })
            .collect();
        out.push('\n');
        out
    }

    /// Namespaces in first-appearance order, merging controllers that share a name
    fn render_namespaces(&self, controllers: &[Controller], target: &CallTarget, diagnostics: &mut Diagnostics) -> String {
        let mut groups: Vec<(String, Vec<&Controller>)> = Vec::new();
        for controller in controllers {
            let ns = namespace_name(&controller.name);
            match groups.iter_mut().find(|(name, _)| *name == ns) {
                Some((_, members)) => members.push(controller),
                None => groups.push((ns, vec![controller])),
            }
        }

        let mut w = SourceWriter::new(&self.config.format);
        for (i, (ns, members)) in groups.iter().enumerate() {
            if i > 0 {
                w.line("");
            }
            w.open(&format!("export namespace {} {{", ns));
            let mut first = true;
            for controller in members {
                for request in &controller.requests {
                    if !first {
                        w.line("");
                    }
                    first = false;
                    self.render_function(&mut w, controller, request, target, diagnostics);
                }
            }
            w.close("}");
        }
        w.finish()
    }

    fn render_function(
        &self,
        w: &mut SourceWriter,
        controller: &Controller,
        request: &Request,
        target: &CallTarget,
        diagnostics: &mut Diagnostics,
    ) {
        let mut params: Vec<String> = request
            .parameters()
            .into_iter()
            .map(|p| format!("{}{}: {}", p.name, if p.optional { "?" } else { "" }, p.ty))
            .collect();
        if let Some(overrides) = &self.config.overrides_param {
            params.push(format!("{}?: {}", overrides, target.overrides_type));
        }

        w.docs(request.docs.as_deref());
        w.open(&format!(
            "export function {}({}): Promise<{}> {{",
            request.name,
            params.join(", "),
            request.return_type
        ));
        w.open(&format!("return {}({{", target.callee));
        w.line(&format!("method: {},", self.config.format.quote.quote(request.verb.as_lower())));
        w.line(&format!("url: {},", self.url_expression(controller, request, diagnostics)));
        if let Some(query) = &request.query {
            w.line(&format!("params: {},", self.payload_expression(query)));
        }
        if let Some(data) = &request.data {
            w.line(&format!("data: {},", self.payload_expression(data)));
        }
        if let Some(overrides) = &self.config.overrides_param {
            w.line(&format!("...{},", overrides));
        }
        w.close("});");
        w.close("}");
    }

    /// Plain string literal, or a template literal when path fields exist
    fn url_expression(&self, controller: &Controller, request: &Request, diagnostics: &mut Diagnostics) -> String {
        if request.params.is_empty() {
            return self.config.format.quote.quote(&request.url_template);
        }

        let mut unmatched = Vec::new();
        let escaped = request.url_template.replace('`', "\\`");
        let interpolated = PLACEHOLDER.replace_all(&escaped, |caps: &Captures| {
            let field = &caps[1];
            match request.params.iter().find(|p| p.property == field) {
                Some(binding) => format!("${{{}}}", binding.parameter.name),
                None => {
                    unmatched.push(field.to_string());
                    caps[0].to_string()
                }
            }
        });
        let url = format!("`{}`", interpolated);

        for field in unmatched {
            diagnostics.push(
                DiagnosticItem::new(
                    format!("{}.{}", controller.name, request.name),
                    DiagnosticCode::UnmatchedPlaceholder,
                    format!("placeholder ':{}' has no matching path parameter", field),
                )
                .with_context(format!("url: {}", request.url_template)),
            );
        }
        url
    }

    fn payload_expression(&self, payload: &Payload) -> String {
        match payload {
            Payload::Whole(param) => param.name.clone(),
            Payload::Partial(partials) => self.object_literal(partials),
        }
    }

    fn object_literal(&self, partials: &[PartialBinding]) -> String {
        let entries: Vec<String> = partials
            .iter()
            .map(|p| {
                let key = if needs_quotes(&p.property) {
                    self.config.format.quote.quote(&p.property)
                } else {
                    p.property.clone()
                };
                format!("{}: {}", key, p.parameter.name)
            })
            .collect();
        format!("{{ {} }}", entries.join(", "))
    }

    fn render_declarations(&self, declarations: &[&TypeDeclaration]) -> String {
        let mut w = SourceWriter::new(&self.config.format);
        for (i, decl) in declarations.iter().enumerate() {
            if i > 0 {
                w.line("");
            }
            self.render_declaration(&mut w, decl);
        }
        w.finish()
    }

    fn render_declaration(&self, w: &mut SourceWriter, decl: &TypeDeclaration) {
        w.docs(decl.docs.as_deref());
        match &decl.body {
            DeclarationBody::Interface(obj) | DeclarationBody::Class(obj) => {
                let extends = if obj.supertypes.is_empty() {
                    String::new()
                } else {
                    format!(" extends {}", obj.supertypes.join(", "))
                };
                w.open(&format!(
                    "export interface {}{}{} {{",
                    decl.name,
                    type_parameters(&obj.type_parameters),
                    extends
                ));
                for prop in &obj.properties {
                    self.render_property(w, prop);
                }
                w.close("}");
            }
            DeclarationBody::Enum { members } => {
                if members.iter().any(|m| matches!(m.value, LiteralValue::Boolean(_))) {
                    let values: Vec<String> = members.iter().map(|m| m.value.to_string()).collect();
                    w.line(&format!("export type {} = {};", decl.name, values.join(" | ")));
                    return;
                }
                w.open(&format!("export enum {} {{", decl.name));
                for member in members {
                    let value = match &member.value {
                        LiteralValue::String(s) => self.config.format.quote.quote(s),
                        other => other.to_string(),
                    };
                    w.line(&format!("{} = {},", member.name, value));
                }
                w.close("}");
            }
            DeclarationBody::Alias { target, type_parameters: params } => {
                w.line(&format!("export type {}{} = {};", decl.name, type_parameters(params), target));
            }
        }
    }

    fn render_property(&self, w: &mut SourceWriter, prop: &PropertyDecl) {
        w.docs(prop.docs.as_deref());
        let key = if needs_quotes(&prop.name) {
            self.config.format.quote.quote(&prop.name)
        } else {
            prop.name.clone()
        };
        w.line(&format!("{}{}: {};", key, if prop.optional { "?" } else { "" }, prop.ty));
    }
}

fn type_parameters(params: &[String]) -> String {
    if params.is_empty() {
        String::new()
    } else {
        format!("<{}>", params.join(", "))
    }
}

impl Emitter for ClientEmitter {
    fn name(&self) -> &'static str {
        "client"
    }

    fn emit(&self, input: EmitInput<'_>, diagnostics: &mut Diagnostics) -> Result<Vec<Artifact>> {
        let target = self.call_target();
        let namespaces = self.render_namespaces(input.controllers, &target, diagnostics);

        let mut roots: Vec<&str> = Vec::new();
        for request in input.controllers.iter().flat_map(|c| &c.requests) {
            for param in request.parameters() {
                param.ty.for_each_reference(&mut |name| roots.push(name));
            }
            request.return_type.for_each_reference(&mut |name| roots.push(name));
        }
        let referenced: HashSet<&str> = roots.iter().copied().collect();
        let declarations = input.catalog.referenced_closure(roots);
        let types = self.render_declarations(&declarations);
        tracing::debug!(declarations = declarations.len(), "collected referenced declarations");

        let header = self.header();
        let mut imports = vec![target.import];
        let mut artifacts = Vec::new();

        let body = match &self.config.types_output {
            Some(types_output) => {
                imports.push(Import {
                    default: None,
                    named: declarations
                        .iter()
                        .filter(|d| referenced.contains(d.name.as_str()))
                        .map(|d| d.name.clone())
                        .collect(),
                    module: relative_module(&self.config.output, types_output),
                });
                let types_unit = if types.is_empty() { "export {};\n".to_string() } else { types };
                artifacts.push(Artifact::new(types_output, format!("{}{}", header, types_unit)));
                namespaces
            }
            None if types.is_empty() => namespaces,
            None => format!("{}\n{}", namespaces, types),
        };

        let mut unit = header;
        let import_lines: Vec<String> = imports
            .iter()
            .filter_map(|i| i.pruned(&body))
            .map(|i| i.render(&self.config.format))
            .collect();
        if !import_lines.is_empty() {
            unit.push_str(&import_lines.join("\n"));
            unit.push_str("\n\n");
        }
        unit.push_str(&body);

        artifacts.insert(0, Artifact::new(&self.config.output, unit));
        Ok(artifacts)
    }
}
