//! Type Catalog
//!
//! The set of named type declarations discovered in one generation task,
//! indexed by name. Built once, read-only afterwards.
//!
//! Supertype references are kept in a petgraph `DiGraph` (edge = subtype ->
//! supertype) so inheritance cycles can be reported up front; ancestor
//! walks are cycle-safe regardless.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics};
use crate::source::{PropertyDecl, SourceUnit, TypeDeclaration};

/// A declaration together with the source file it came from
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub declaration: TypeDeclaration,
    pub source: String,
}

/// Name-indexed declarations of one generation task
#[derive(Debug, Default)]
pub struct TypeCatalog {
    /// Entries in discovery order (a replaced duplicate keeps its slot)
    entries: Vec<CatalogEntry>,
    /// name -> index into `entries`
    by_name: HashMap<String, usize>,
    /// Inheritance graph, nodes weighted by declaration name
    graph: DiGraph<String, ()>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the exported declarations of a set of source units
    pub fn from_units(units: &[SourceUnit], diagnostics: &mut Diagnostics) -> Self {
        let declarations = units.iter().flat_map(|unit| {
            unit.declarations
                .iter()
                .map(move |decl| (unit.path.clone(), decl.clone()))
        });
        Self::build(declarations, diagnostics)
    }

    /// Build from `(source file, declaration)` pairs.
    ///
    /// Non-exported declarations are skipped. A duplicate name replaces the
    /// earlier declaration and is reported.
    pub fn build(
        declarations: impl IntoIterator<Item = (String, TypeDeclaration)>,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut catalog = Self::new();

        for (source, declaration) in declarations {
            if !declaration.exported {
                tracing::debug!(name = %declaration.name, %source, "skipping non-exported declaration");
                continue;
            }
            match catalog.by_name.get(&declaration.name) {
                Some(&idx) => {
                    diagnostics.duplicate_declaration(
                        &declaration.name,
                        &source,
                        &catalog.entries[idx].source,
                    );
                    catalog.entries[idx] = CatalogEntry { declaration, source };
                }
                None => {
                    catalog.by_name.insert(declaration.name.clone(), catalog.entries.len());
                    catalog.entries.push(CatalogEntry { declaration, source });
                }
            }
        }

        catalog.link_supertypes(diagnostics);
        catalog
    }

    fn link_supertypes(&mut self, diagnostics: &mut Diagnostics) {
        let mut graph = DiGraph::with_capacity(self.entries.len(), self.entries.len());
        let indices: Vec<NodeIndex> = self
            .entries
            .iter()
            .map(|e| graph.add_node(e.declaration.name.clone()))
            .collect();

        for (idx, entry) in self.entries.iter().enumerate() {
            for supertype in entry.declaration.supertypes() {
                match self.by_name.get(supertype) {
                    Some(&target) => {
                        graph.add_edge(indices[idx], indices[target], ());
                    }
                    None => diagnostics.unresolved_reference(&entry.declaration.name, supertype),
                }
            }
        }

        for scc in kosaraju_scc(&graph) {
            let self_loop = scc.len() == 1 && graph.contains_edge(scc[0], scc[0]);
            if scc.len() < 2 && !self_loop {
                continue;
            }
            let mut members: Vec<String> = scc
                .iter()
                .filter_map(|idx| graph.node_weight(*idx).cloned())
                .collect();
            members.sort();
            diagnostics.push(
                DiagnosticItem::new(
                    members.join(", "),
                    DiagnosticCode::InheritanceCycle,
                    "supertype chain refers back to itself",
                )
                .with_context(format!("members: {}", members.join(" -> "))),
            );
        }

        self.graph = graph;
    }

    /// Look up a declaration by name
    pub fn get(&self, name: &str) -> Option<&TypeDeclaration> {
        self.entry(name).map(|e| &e.declaration)
    }

    /// Look up a declaration and its source file by name
    pub fn entry(&self, name: &str) -> Option<&CatalogEntry> {
        self.by_name.get(name).map(|&idx| &self.entries[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All declarations in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &TypeDeclaration> {
        self.entries.iter().map(|e| &e.declaration)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of resolved inheritance edges
    pub fn inheritance_edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Ancestors of `name`, nearest first, each visited once.
    /// Supertypes missing from the catalog are skipped.
    pub fn ancestors(&self, name: &str) -> Vec<&TypeDeclaration> {
        let mut result = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        visited.insert(name);
        if let Some(decl) = self.get(name) {
            queue.extend(decl.supertypes().iter().map(String::as_str));
        }

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(decl) = self.get(current) {
                result.push(decl);
                queue.extend(decl.supertypes().iter().map(String::as_str));
            }
        }

        result
    }

    /// Properties of `declaration` that no ancestor declares
    pub fn own_properties<'a>(&'a self, declaration: &'a TypeDeclaration) -> Vec<&'a PropertyDecl> {
        let inherited: HashSet<&str> = self
            .ancestors(&declaration.name)
            .into_iter()
            .flat_map(|a| a.properties().iter().map(|p| p.name.as_str()))
            .collect();

        declaration
            .properties()
            .iter()
            .filter(|p| !inherited.contains(p.name.as_str()))
            .collect()
    }

    /// Properties of `name` including everything inherited; the nearest
    /// declaration of a property name wins.
    pub fn flattened_properties(&self, name: &str) -> Vec<&PropertyDecl> {
        let Some(decl) = self.get(name) else {
            return Vec::new();
        };

        let mut seen: HashSet<&str> = HashSet::new();
        let mut result = Vec::new();
        for source in std::iter::once(decl).chain(self.ancestors(name)) {
            for prop in source.properties() {
                if seen.insert(prop.name.as_str()) {
                    result.push(prop);
                }
            }
        }

        result
    }

    /// Declarations reachable from `roots` through property types,
    /// supertypes, and alias targets, in catalog order.
    pub fn referenced_closure<'a>(&self, roots: impl IntoIterator<Item = &'a str>) -> Vec<&TypeDeclaration> {
        let mut reached: HashSet<usize> = HashSet::new();
        let mut stack: Vec<String> = roots.into_iter().map(str::to_string).collect();

        while let Some(name) = stack.pop() {
            let Some(&idx) = self.by_name.get(&name) else {
                continue;
            };
            if !reached.insert(idx) {
                continue;
            }
            let decl = &self.entries[idx].declaration;
            stack.extend(decl.supertypes().iter().cloned());
            for prop in decl.properties() {
                prop.ty.for_each_reference(&mut |n| stack.push(n.to_string()));
            }
            if let crate::source::DeclarationBody::Alias { target, .. } = &decl.body {
                target.for_each_reference(&mut |n| stack.push(n.to_string()));
            }
        }

        let mut indices: Vec<usize> = reached.into_iter().collect();
        indices.sort_unstable();
        indices.into_iter().map(|i| &self.entries[i].declaration).collect()
    }
}
