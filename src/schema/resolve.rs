//! Schema Resolver
//!
//! Converts a [`TypeExpr`] into a [`SchemaNode`]. Rules apply in priority
//! order:
//!
//! 1. `undefined` / `null` / `void` → no schema (caller omits the field)
//! 2. primitive keyword or literal → `Primitive` of the same kind
//! 3. array → `Array(resolve(element))`
//! 4. union → `AnyOf`
//! 5. intersection → `AllOf`
//! 6. named reference without type arguments → `Reference(name)`
//! 7. type parameter → `Unknown`
//! 8. generic reference with type arguments → untyped `Object` placeholder
//! 9. structural object → `Object` without declared properties
//!
//! Union and intersection members are normalized before wrapping: members
//! with no schema are dropped, structurally equal members are kept once, and
//! a single survivor stands on its own instead of a one-element `AnyOf` /
//! `AllOf`. So `User | null` resolves to `Reference("User")` and `"a" | "b"`
//! to a plain string.
//!
//! Nothing in here fails. Shapes without a rule degrade to a placeholder and
//! leave a diagnostic behind.

use crate::catalog::TypeCatalog;
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::source::{DeclarationBody, PrimitiveKind, TypeDeclaration, TypeExpr};

use super::{ObjectSchema, PrimitiveSchema, PropertySchema, SchemaNode};

/// Resolves type expressions, optionally against a type catalog
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaResolver<'c> {
    catalog: Option<&'c TypeCatalog>,
}

impl<'c> SchemaResolver<'c> {
    /// Resolver that trusts every named reference
    pub fn new() -> Self {
        Self { catalog: None }
    }

    /// Resolver that checks named references against `catalog`
    pub fn with_catalog(catalog: &'c TypeCatalog) -> Self {
        Self {
            catalog: Some(catalog),
        }
    }

    pub fn catalog(&self) -> Option<&'c TypeCatalog> {
        self.catalog
    }

    /// Resolve a type expression; `None` means the caller omits the field
    pub fn resolve(&self, ty: &TypeExpr, diagnostics: &mut Diagnostics) -> Option<SchemaNode> {
        self.resolve_for(&ty.to_string(), ty, diagnostics)
    }

    /// Resolve with `subject` naming the owner in any diagnostic
    pub fn resolve_for(
        &self,
        subject: &str,
        ty: &TypeExpr,
        diagnostics: &mut Diagnostics,
    ) -> Option<SchemaNode> {
        match ty {
            TypeExpr::Undefined | TypeExpr::Null | TypeExpr::Void => None,
            TypeExpr::Keyword { keyword } => Some(SchemaNode::primitive(*keyword)),
            TypeExpr::Literal { value } => Some(SchemaNode::primitive(value.kind())),
            TypeExpr::Array { element } => Some(self.array_of(subject, element, diagnostics)),
            TypeExpr::Union { members } => {
                let members = self.resolve_members(subject, members, diagnostics);
                collapse(members, SchemaNode::AnyOf)
            }
            TypeExpr::Intersection { members } => {
                let members = self.resolve_members(subject, members, diagnostics);
                collapse(members, SchemaNode::AllOf)
            }
            TypeExpr::Reference { name, arguments } => {
                self.resolve_reference(subject, name, arguments, diagnostics)
            }
            TypeExpr::TypeParameter { name } => {
                diagnostics.report(
                    subject,
                    DiagnosticCode::TypeParameter,
                    format!("type parameter '{}' treated as unconstrained", name),
                );
                Some(SchemaNode::Unknown)
            }
            TypeExpr::Object { .. } => Some(SchemaNode::empty_object()),
            TypeExpr::Any | TypeExpr::Unknown => Some(SchemaNode::Unknown),
        }
    }

    fn array_of(&self, subject: &str, element: &TypeExpr, diagnostics: &mut Diagnostics) -> SchemaNode {
        let items = self
            .resolve_for(subject, element, diagnostics)
            .unwrap_or(SchemaNode::Unknown);
        SchemaNode::array(items)
    }

    fn resolve_members(
        &self,
        subject: &str,
        members: &[TypeExpr],
        diagnostics: &mut Diagnostics,
    ) -> Vec<SchemaNode> {
        let mut resolved: Vec<SchemaNode> = Vec::with_capacity(members.len());
        for member in members {
            if let Some(node) = self.resolve_for(subject, member, diagnostics) {
                if !resolved.contains(&node) {
                    resolved.push(node);
                }
            }
        }
        resolved
    }

    fn resolve_reference(
        &self,
        subject: &str,
        name: &str,
        arguments: &[TypeExpr],
        diagnostics: &mut Diagnostics,
    ) -> Option<SchemaNode> {
        match (name, arguments) {
            ("Promise", [inner]) => return self.resolve_for(subject, inner, diagnostics),
            ("Array" | "ReadonlyArray", [element]) => {
                return Some(self.array_of(subject, element, diagnostics))
            }
            ("Date", []) => {
                return Some(SchemaNode::Primitive(PrimitiveSchema {
                    kind: PrimitiveKind::String,
                    format: Some("date-time".to_string()),
                    values: Vec::new(),
                }))
            }
            _ => {}
        }

        if !arguments.is_empty() {
            diagnostics.report(
                subject,
                DiagnosticCode::GenericArguments,
                format!(
                    "generic reference '{}' with {} type argument(s) emitted as an untyped object",
                    name,
                    arguments.len()
                ),
            );
            return Some(SchemaNode::empty_object());
        }

        if let Some(catalog) = self.catalog {
            if !catalog.contains(name) {
                diagnostics.unresolved_reference(subject, name);
                return Some(SchemaNode::Unknown);
            }
        }

        Some(SchemaNode::reference(name))
    }

    /// Component schema for a named declaration
    pub fn synthesize(&self, declaration: &TypeDeclaration, diagnostics: &mut Diagnostics) -> SchemaNode {
        match &declaration.body {
            DeclarationBody::Interface(_) | DeclarationBody::Class(_) => {
                self.synthesize_object(declaration, diagnostics)
            }
            DeclarationBody::Enum { members } => {
                let Some(first) = members.first() else {
                    return SchemaNode::string();
                };
                let kind = first.value.kind();
                if members.iter().any(|m| m.value.kind() != kind) {
                    diagnostics.report(
                        &declaration.name,
                        DiagnosticCode::MixedEnum,
                        "enum mixes literal kinds, falling back to string",
                    );
                    return SchemaNode::string();
                }
                SchemaNode::Primitive(PrimitiveSchema {
                    kind,
                    format: None,
                    values: members.iter().map(|m| m.value.clone()).collect(),
                })
            }
            DeclarationBody::Alias { target, .. } => self
                .resolve_for(&declaration.name, target, diagnostics)
                .unwrap_or(SchemaNode::Unknown),
        }
    }

    fn synthesize_object(&self, declaration: &TypeDeclaration, diagnostics: &mut Diagnostics) -> SchemaNode {
        let own = match self.catalog {
            Some(catalog) => catalog.own_properties(declaration),
            None => declaration.properties().iter().collect(),
        };

        let mut properties = Vec::with_capacity(own.len());
        for prop in own {
            let subject = format!("{}.{}", declaration.name, prop.name);
            if let Some(schema) = self.resolve_for(&subject, &prop.ty, diagnostics) {
                properties.push(PropertySchema {
                    name: prop.name.clone(),
                    schema,
                    description: prop.docs.clone(),
                    required: !prop.optional,
                });
            }
        }

        let object = SchemaNode::Object(ObjectSchema {
            description: declaration.docs.clone(),
            properties,
        });

        let supertypes: Vec<SchemaNode> = declaration
            .supertypes()
            .iter()
            .filter(|name| self.catalog.map_or(true, |c| c.contains(name)))
            .map(|name| SchemaNode::reference(name.as_str()))
            .collect();

        if supertypes.is_empty() {
            object
        } else {
            let mut members = supertypes;
            members.push(object);
            SchemaNode::AllOf(members)
        }
    }
}

/// Wrap multiple members, collapse a single one, drop an empty set
fn collapse(mut members: Vec<SchemaNode>, wrap: fn(Vec<SchemaNode>) -> SchemaNode) -> Option<SchemaNode> {
    match members.len() {
        0 => None,
        1 => members.pop(),
        _ => Some(wrap(members)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{EnumMember, LiteralValue, ObjectDecl, PropertyDecl};

    fn resolve(ty: &TypeExpr) -> Option<SchemaNode> {
        SchemaResolver::new().resolve(ty, &mut Diagnostics::new())
    }

    fn prop(name: &str, ty: TypeExpr, optional: bool) -> PropertyDecl {
        PropertyDecl {
            name: name.to_string(),
            ty,
            optional,
            docs: None,
        }
    }

    fn interface(name: &str, supertypes: &[&str], props: Vec<PropertyDecl>) -> TypeDeclaration {
        TypeDeclaration {
            name: name.to_string(),
            docs: None,
            exported: true,
            body: DeclarationBody::Interface(ObjectDecl {
                properties: props,
                supertypes: supertypes.iter().map(|s| s.to_string()).collect(),
                type_parameters: Vec::new(),
            }),
        }
    }

    #[test]
    fn test_absent_types_have_no_schema() {
        assert_eq!(resolve(&TypeExpr::Undefined), None);
        assert_eq!(resolve(&TypeExpr::Null), None);
        assert_eq!(resolve(&TypeExpr::Void), None);
    }

    #[test]
    fn test_primitives_ignore_literal_value() {
        let cases = [
            (TypeExpr::string(), PrimitiveKind::String),
            (TypeExpr::number(), PrimitiveKind::Number),
            (TypeExpr::boolean(), PrimitiveKind::Boolean),
            (
                TypeExpr::Literal { value: LiteralValue::String("active".to_string()) },
                PrimitiveKind::String,
            ),
            (
                TypeExpr::Literal { value: LiteralValue::Number(42.into()) },
                PrimitiveKind::Number,
            ),
            (
                TypeExpr::Literal { value: LiteralValue::Boolean(false) },
                PrimitiveKind::Boolean,
            ),
        ];

        for (ty, kind) in cases {
            assert_eq!(resolve(&ty), Some(SchemaNode::primitive(kind)), "for {}", ty);
        }
    }

    #[test]
    fn test_nested_arrays() {
        let ty = TypeExpr::array(TypeExpr::array(TypeExpr::reference("User")));
        assert_eq!(
            resolve(&ty),
            Some(SchemaNode::array(SchemaNode::array(SchemaNode::reference("User"))))
        );

        let ty = TypeExpr::generic("Array", vec![TypeExpr::number()]);
        assert_eq!(resolve(&ty), Some(SchemaNode::array(SchemaNode::number())));
    }

    #[test]
    fn test_union_drops_absent_and_collapses() {
        let ty = TypeExpr::Union {
            members: vec![TypeExpr::string(), TypeExpr::Null, TypeExpr::Undefined],
        };
        assert_eq!(resolve(&ty), Some(SchemaNode::string()));

        let ty = TypeExpr::Union {
            members: vec![TypeExpr::reference("User"), TypeExpr::Null],
        };
        assert_eq!(resolve(&ty), Some(SchemaNode::reference("User")));

        let ty = TypeExpr::Union {
            members: vec![
                TypeExpr::Literal { value: LiteralValue::String("a".to_string()) },
                TypeExpr::Literal { value: LiteralValue::String("b".to_string()) },
            ],
        };
        assert_eq!(resolve(&ty), Some(SchemaNode::string()));

        let ty = TypeExpr::Union {
            members: vec![
                TypeExpr::Literal { value: LiteralValue::String("a".to_string()) },
                TypeExpr::Literal { value: LiteralValue::String("b".to_string()) },
                TypeExpr::number(),
            ],
        };
        assert_eq!(
            resolve(&ty),
            Some(SchemaNode::AnyOf(vec![SchemaNode::string(), SchemaNode::number()]))
        );
    }

    #[test]
    fn test_intersection_is_all_of() {
        let ty = TypeExpr::Intersection {
            members: vec![TypeExpr::reference("Base"), TypeExpr::reference("Extra")],
        };
        assert_eq!(
            resolve(&ty),
            Some(SchemaNode::AllOf(vec![
                SchemaNode::reference("Base"),
                SchemaNode::reference("Extra"),
            ]))
        );
    }

    #[test]
    fn test_generic_and_type_parameter_degrade() {
        let mut diags = Diagnostics::new();
        let resolver = SchemaResolver::new();

        let ty = TypeExpr::generic("Page", vec![TypeExpr::reference("User")]);
        assert_eq!(resolver.resolve(&ty, &mut diags), Some(SchemaNode::empty_object()));

        let ty = TypeExpr::TypeParameter { name: "T".to_string() };
        assert_eq!(resolver.resolve(&ty, &mut diags), Some(SchemaNode::Unknown));

        assert_eq!(diags.with_code(DiagnosticCode::GenericArguments).count(), 1);
        assert_eq!(diags.with_code(DiagnosticCode::TypeParameter).count(), 1);
        assert_eq!(diags.warning_count(), 1);
    }

    #[test]
    fn test_promise_and_date() {
        let ty = TypeExpr::generic("Promise", vec![TypeExpr::reference("User")]);
        assert_eq!(resolve(&ty), Some(SchemaNode::reference("User")));

        match resolve(&TypeExpr::reference("Date")) {
            Some(SchemaNode::Primitive(p)) => assert_eq!(p.format.as_deref(), Some("date-time")),
            other => panic!("Expected date-time string, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_reference_with_catalog_is_unknown() {
        let mut diags = Diagnostics::new();
        let catalog = TypeCatalog::build(
            vec![("m.ts".to_string(), interface("User", &[], Vec::new()))],
            &mut diags,
        );
        let resolver = SchemaResolver::with_catalog(&catalog);

        assert_eq!(
            resolver.resolve(&TypeExpr::reference("User"), &mut diags),
            Some(SchemaNode::reference("User"))
        );
        assert_eq!(
            resolver.resolve(&TypeExpr::reference("Ghost"), &mut diags),
            Some(SchemaNode::Unknown)
        );
        assert_eq!(diags.with_code(DiagnosticCode::UnresolvedReference).count(), 1);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let ty = TypeExpr::Union {
            members: vec![
                TypeExpr::array(TypeExpr::reference("User")),
                TypeExpr::generic("Map", vec![TypeExpr::string(), TypeExpr::number()]),
            ],
        };
        let resolver = SchemaResolver::new();
        let mut diags = Diagnostics::new();
        assert_eq!(resolver.resolve(&ty, &mut diags), resolver.resolve(&ty, &mut diags));
    }

    #[test]
    fn test_single_supertype_all_of() {
        let mut diags = Diagnostics::new();
        let catalog = TypeCatalog::build(
            vec![
                (
                    "m.ts".to_string(),
                    interface("Base", &[], vec![prop("id", TypeExpr::number(), false)]),
                ),
                (
                    "m.ts".to_string(),
                    interface(
                        "User",
                        &["Base"],
                        vec![
                            prop("id", TypeExpr::number(), false),
                            prop("nickname", TypeExpr::string(), true),
                        ],
                    ),
                ),
            ],
            &mut diags,
        );
        let resolver = SchemaResolver::with_catalog(&catalog);
        let user = catalog.get("User").unwrap();

        match resolver.synthesize(user, &mut diags) {
            SchemaNode::AllOf(members) => {
                assert_eq!(members.len(), 2);
                assert_eq!(members[0], SchemaNode::reference("Base"));
                match &members[1] {
                    SchemaNode::Object(obj) => {
                        assert_eq!(obj.properties.len(), 1);
                        assert_eq!(obj.properties[0].name, "nickname");
                        assert!(!obj.properties[0].required);
                    }
                    other => panic!("Expected own-property object, got {:?}", other),
                }
            }
            other => panic!("Expected AllOf, got {:?}", other),
        }
        assert!(diags.is_empty());
    }

    #[test]
    fn test_enum_synthesis() {
        let decl = TypeDeclaration {
            name: "Role".to_string(),
            docs: None,
            exported: true,
            body: DeclarationBody::Enum {
                members: vec![
                    EnumMember { name: "Admin".to_string(), value: LiteralValue::String("admin".to_string()) },
                    EnumMember { name: "User".to_string(), value: LiteralValue::String("user".to_string()) },
                ],
            },
        };
        let mut diags = Diagnostics::new();
        match SchemaResolver::new().synthesize(&decl, &mut diags) {
            SchemaNode::Primitive(p) => {
                assert_eq!(p.kind, PrimitiveKind::String);
                assert_eq!(
                    p.values,
                    vec![
                        LiteralValue::String("admin".to_string()),
                        LiteralValue::String("user".to_string()),
                    ]
                );
            }
            other => panic!("Expected primitive enum, got {:?}", other),
        }

        let mixed = TypeDeclaration {
            body: DeclarationBody::Enum {
                members: vec![
                    EnumMember { name: "A".to_string(), value: LiteralValue::Number(1.into()) },
                    EnumMember { name: "B".to_string(), value: LiteralValue::String("b".to_string()) },
                ],
            },
            ..decl
        };
        assert_eq!(SchemaResolver::new().synthesize(&mixed, &mut diags), SchemaNode::string());
        assert_eq!(diags.with_code(DiagnosticCode::MixedEnum).count(), 1);
    }

    #[test]
    fn test_alias_and_optional_absent_property() {
        let alias = TypeDeclaration {
            name: "Ids".to_string(),
            docs: None,
            exported: true,
            body: DeclarationBody::Alias {
                target: TypeExpr::array(TypeExpr::number()),
                type_parameters: Vec::new(),
            },
        };
        let mut diags = Diagnostics::new();
        assert_eq!(
            SchemaResolver::new().synthesize(&alias, &mut diags),
            SchemaNode::array(SchemaNode::number())
        );

        let decl = interface(
            "Empty",
            &[],
            vec![
                prop("gone", TypeExpr::Undefined, true),
                prop("name", TypeExpr::string(), false),
            ],
        );
        match SchemaResolver::new().synthesize(&decl, &mut diags) {
            SchemaNode::Object(obj) => {
                let names: Vec<_> = obj.properties.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, vec!["name"]);
            }
            other => panic!("Expected object, got {:?}", other),
        }
    }
}
