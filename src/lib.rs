//! apigen
//!
//! Extracts the HTTP API surface of an annotated source project (controllers,
//! routes, parameter bindings, response types, exported data types) into a
//! framework-independent description and re-emits it as a typed client
//! request library or an OpenAPI schema document.
//!
//! ## Pipeline
//!
//! ```text
//! source units (JSON)
//!   ├── type declarations ──► TypeCatalog
//!   └── annotated classes ──► ControllerExtractor ──► Controller { Request* }
//!                                                          │
//!                    SchemaResolver ◄──────────────────────┤
//!                                                          ▼
//!                                      ClientEmitter | OpenApiEmitter
//!                                                          │
//!                                                          ▼
//!                                               ArtifactWriter (atomic)
//! ```
//!
//! Unsupported type shapes never abort a run: they degrade to placeholder
//! schemas and are reported through [`Diagnostics`]. Unrecognized route
//! arguments and path bindings without a field name are fatal.

pub mod catalog;
pub mod checksum;
pub mod config;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod writer;

pub use catalog::TypeCatalog;
pub use checksum::Checksum;
pub use config::{ApigenConfig, EmitterConfig, TaskConfig};
pub use diagnostics::{DiagnosticCode, Diagnostics};
pub use emit::{emitter_for, Artifact, EmitInput, Emitter};
pub use error::{GenError, Result};
pub use extract::{Controller, ControllerExtractor, Request};
pub use pipeline::{run_batch, run_task, TaskReport};
pub use schema::{SchemaNode, SchemaResolver};
pub use source::{JsonSourceReader, SourceReader, SourceUnit, TypeExpr};
pub use writer::{ArtifactWriter, OutputMode};
