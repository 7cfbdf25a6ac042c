//! Controller Extractor

use std::path::Path;

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::source::{find_annotation, ClassDecl, SourceUnit};

use super::{extract_request, route_fragment, Controller, Convention};

/// Controller name for a source file: the base name up to its first `.`
pub fn controller_name(path: &str) -> String {
    let file_name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    match file_name.split_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => file_name,
    }
}

/// Extracts controllers under one annotation convention
#[derive(Debug, Clone, Copy)]
pub struct ControllerExtractor {
    convention: &'static Convention,
}

impl ControllerExtractor {
    pub fn new(convention: &'static Convention) -> Self {
        Self { convention }
    }

    /// Controllers across all units, in unit then class order
    pub fn extract_all(&self, units: &[SourceUnit], diagnostics: &mut Diagnostics) -> Result<Vec<Controller>> {
        let mut controllers = Vec::new();
        for unit in units {
            controllers.extend(self.extract_unit(unit, diagnostics)?);
        }
        Ok(controllers)
    }

    /// One controller per class in `unit` carrying the grouping annotation
    pub fn extract_unit(&self, unit: &SourceUnit, diagnostics: &mut Diagnostics) -> Result<Vec<Controller>> {
        let mut controllers = Vec::new();
        for class in &unit.classes {
            if let Some(controller) = self.extract_class(unit, class, diagnostics)? {
                controllers.push(controller);
            }
        }
        Ok(controllers)
    }

    fn extract_class(
        &self,
        unit: &SourceUnit,
        class: &ClassDecl,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<Controller>> {
        let Some(annotation) = find_annotation(&class.annotations, self.convention.controller) else {
            return Ok(None);
        };

        let name = controller_name(&unit.path);
        let base_url = route_fragment(annotation.first_argument(), &class.name, true)?;

        let mut requests = Vec::new();
        for method in &class.methods {
            if let Some(request) = extract_request(self.convention, &name, &base_url, method, diagnostics)? {
                requests.push(request);
            }
        }

        tracing::debug!(
            controller = %name,
            class = %class.name,
            requests = requests.len(),
            "extracted controller"
        );

        Ok(Some(Controller {
            name,
            source: unit.path.clone(),
            base_url,
            docs: class.docs.clone(),
            requests,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenError;

    fn unit(json: &str) -> SourceUnit {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_controller_name_from_file() {
        assert_eq!(controller_name("src/users/users.controller.ts"), "users");
        assert_eq!(controller_name("admin-panel.ts"), "admin-panel");
        assert_eq!(controller_name("health"), "health");
    }

    #[test]
    fn test_extracts_annotated_classes_only() {
        let unit = unit(
            r#"{
                "path": "src/users/users.controller.ts",
                "classes": [
                    {"name": "Helper", "methods": [{"name": "run", "annotations": [{"name": "Get"}]}]},
                    {"name": "UsersController", "docs": "User management",
                     "annotations": [{"name": "Controller", "arguments": [{"path": "/users/"}]}],
                     "methods": [
                        {"name": "list", "annotations": [{"name": "Get"}]},
                        {"name": "helper"},
                        {"name": "create", "annotations": [{"name": "Post"}]}
                     ]}
                ]
            }"#,
        );

        let mut diags = Diagnostics::new();
        let controllers = ControllerExtractor::new(&Convention::NEST)
            .extract_unit(&unit, &mut diags)
            .unwrap();

        assert_eq!(controllers.len(), 1);
        let users = &controllers[0];
        assert_eq!(users.name, "users");
        assert_eq!(users.base_url, "/users/");
        assert_eq!(users.docs.as_deref(), Some("User management"));
        let names: Vec<_> = users.requests.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["list", "create"]);
        assert_eq!(users.requests[0].url_template, "/users");
    }

    #[test]
    fn test_unknown_controller_argument_is_fatal() {
        let unit = unit(
            r#"{
                "path": "users.controller.ts",
                "classes": [{"name": "UsersController",
                    "annotations": [{"name": "Controller", "arguments": [42]}]}]
            }"#,
        );

        let err = ControllerExtractor::new(&Convention::NEST)
            .extract_unit(&unit, &mut Diagnostics::new())
            .unwrap_err();
        match err {
            GenError::UnknownArgumentType { context, found, .. } => {
                assert_eq!(context, "UsersController");
                assert_eq!(found, "number 42");
            }
            other => panic!("Expected UnknownArgumentType, got {:?}", other),
        }
    }
}
