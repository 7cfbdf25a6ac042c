//! Diagnostics
//!
//! Collects soft failures during resolution and emission. Nothing recorded
//! here stops a run: the affected schema degrades to a placeholder and
//! generation carries on for the rest of the API surface.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // === Resolution ===
    /// Generic reference with type arguments, emitted as an untyped object
    GenericArguments,
    /// Reference to a type parameter, emitted as an open schema
    TypeParameter,
    /// Named reference missing from the type catalog
    UnresolvedReference,
    /// Enum members with mixed literal kinds
    MixedEnum,

    // === Catalog ===
    /// Two declarations share a name; the later one wins
    DuplicateDeclaration,
    /// Supertype chain loops back on itself
    InheritanceCycle,

    // === Extraction ===
    /// Partial bindings dropped because a whole binding took over the source
    DiscardedBinding,

    // === Emission ===
    /// `:name` placeholder with no matching path parameter
    UnmatchedPlaceholder,
    /// Whole query binding whose type has no expandable properties
    UnexpandableQuery,
    /// Two requests map to the same path and verb; the later one wins
    DuplicateRoute,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GenericArguments => "W001",
            Self::TypeParameter => "I001",
            Self::UnresolvedReference => "W002",
            Self::MixedEnum => "W003",
            Self::DuplicateDeclaration => "W004",
            Self::InheritanceCycle => "W005",
            Self::DiscardedBinding => "W006",
            Self::UnmatchedPlaceholder => "W007",
            Self::UnexpandableQuery => "W008",
            Self::DuplicateRoute => "W009",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::TypeParameter => Severity::Info,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// A single diagnostic item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// Declaration, request, or type the diagnostic is about
    pub subject: String,
    /// Diagnostic code
    pub code: DiagnosticCode,
    /// Human-readable message
    pub message: String,
    /// Additional context (source files, field names)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl DiagnosticItem {
    pub fn new(subject: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.code,
            self.code.severity(),
            self.message,
            self.subject
        )?;

        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }

        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Collection of diagnostics from one generation task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic item
    pub fn push(&mut self, item: DiagnosticItem) {
        self.items.push(item);
    }

    /// Add a diagnostic with the code's default severity
    pub fn report(
        &mut self,
        subject: impl Into<String>,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) {
        self.push(DiagnosticItem::new(subject, code, message));
    }

    /// Add diagnostic for a reference missing from the catalog
    pub fn unresolved_reference(&mut self, subject: impl Into<String>, target: &str) {
        self.push(DiagnosticItem::new(
            subject,
            DiagnosticCode::UnresolvedReference,
            format!("reference '{}' not found in type catalog", target),
        ));
    }

    /// Add diagnostic for a duplicate declaration name
    pub fn duplicate_declaration(&mut self, name: &str, kept: &str, replaced: &str) {
        self.push(
            DiagnosticItem::new(
                name,
                DiagnosticCode::DuplicateDeclaration,
                format!("'{}' is declared more than once; the later declaration wins", name),
            )
            .with_context(format!("kept: {}", kept))
            .with_context(format!("replaced: {}", replaced)),
        );
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    /// Get all warnings
    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Warning)
    }

    /// Get all items with a given code
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(move |i| i.code == code)
    }

    /// Get all items
    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    /// Get total count
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Count warnings
    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Merge another Diagnostics into this one
    pub fn merge(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// Write every item to the log stream
    pub fn log(&self) {
        for item in &self.items {
            match item.severity() {
                Severity::Info => tracing::info!(code = %item.code, subject = %item.subject, "{}", item.message),
                Severity::Warning => tracing::warn!(code = %item.code, subject = %item.subject, "{}", item.message),
            }
        }
    }

    /// Format all diagnostics for display
    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }

        if !self.is_empty() {
            output.push_str(&format!("\n{} warning(s)\n", self.warning_count()));
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl IntoIterator for Diagnostics {
    type Item = DiagnosticItem;
    type IntoIter = std::vec::IntoIter<DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticItem;
    type IntoIter = std::slice::Iter<'a, DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
