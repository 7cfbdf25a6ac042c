//! Emitters
//!
//! Each emitter folds the extracted controllers and the task's type catalog
//! into freshly built, complete artifacts. Nothing is written here.
//!
//! The emitter for a task is chosen by [`emitter_for`] from the closed
//! [`EmitterConfig`] enum before the pipeline starts.

pub mod client;
pub mod openapi;

pub use client::ClientEmitter;
pub use openapi::OpenApiEmitter;

use std::path::PathBuf;

use crate::catalog::TypeCatalog;
use crate::config::EmitterConfig;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::extract::Controller;

/// A complete output unit destined for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Destination, relative to the task root unless absolute
    pub path: PathBuf,
    pub contents: String,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Inputs shared by every emitter
#[derive(Debug, Clone, Copy)]
pub struct EmitInput<'a> {
    pub controllers: &'a [Controller],
    pub catalog: &'a TypeCatalog,
}

/// Turns extracted controllers into artifacts
pub trait Emitter: Send + Sync {
    fn name(&self) -> &'static str;

    fn emit(&self, input: EmitInput<'_>, diagnostics: &mut Diagnostics) -> Result<Vec<Artifact>>;
}

/// Build the emitter selected by `config`
pub fn emitter_for(config: &EmitterConfig) -> Box<dyn Emitter> {
    match config {
        EmitterConfig::Client(client) => Box::new(ClientEmitter::new(client.clone())),
        EmitterConfig::OpenApi(openapi) => Box::new(OpenApiEmitter::new(openapi.clone())),
    }
}
