//! Generation pipeline
//!
//! One task runs end to end on its own state: read source units, build the
//! type catalog, extract controllers, emit artifacts, write them. Tasks in a
//! batch share nothing and run in parallel.

use rayon::prelude::*;
use std::collections::HashSet;
use std::path::Path;

use crate::catalog::TypeCatalog;
use crate::config::TaskConfig;
use crate::diagnostics::Diagnostics;
use crate::emit::{emitter_for, Artifact, EmitInput};
use crate::error::Result;
use crate::extract::{Controller, ControllerExtractor};
use crate::source::{SourceReader, SourceUnit};
use crate::writer::{ArtifactWriter, OutputMode, WriteOutcome};

/// Extracted API surface of one task
#[derive(Debug)]
pub struct Surface {
    pub controllers: Vec<Controller>,
    pub catalog: TypeCatalog,
    pub diagnostics: Diagnostics,
}

impl Surface {
    pub fn request_count(&self) -> usize {
        self.controllers.iter().map(|c| c.requests.len()).sum()
    }
}

/// Result of running one task
#[derive(Debug)]
pub struct TaskReport {
    pub task: String,
    pub emitter: &'static str,
    pub controllers: usize,
    pub requests: usize,
    pub declarations: usize,
    pub outcomes: Vec<WriteOutcome>,
    pub diagnostics: Diagnostics,
}

impl TaskReport {
    pub fn has_drift(&self) -> bool {
        self.outcomes.iter().any(WriteOutcome::is_drift)
    }
}

/// Read sources and extract controllers plus the type catalog
pub fn extract_surface(task: &TaskConfig, root: &Path, reader: &dyn SourceReader) -> Result<Surface> {
    let type_units = reader.read(root, &task.types)?;
    let controller_units = reader.read(root, &task.controllers)?;
    tracing::debug!(
        types = type_units.len(),
        controllers = controller_units.len(),
        "read source units"
    );

    let mut diagnostics = Diagnostics::new();

    // a file matched by both pattern sets contributes its declarations once
    let seen: HashSet<&str> = type_units.iter().map(|u| u.path.as_str()).collect();
    let declaration_units: Vec<&SourceUnit> = type_units
        .iter()
        .chain(controller_units.iter().filter(|u| !seen.contains(u.path.as_str())))
        .collect();
    let catalog = TypeCatalog::build(
        declaration_units.into_iter().flat_map(|unit| {
            unit.declarations
                .iter()
                .map(move |decl| (unit.path.clone(), decl.clone()))
        }),
        &mut diagnostics,
    );

    let extractor = ControllerExtractor::new(task.framework.convention());
    let controllers = extractor.extract_all(&controller_units, &mut diagnostics)?;

    Ok(Surface {
        controllers,
        catalog,
        diagnostics,
    })
}

/// Extract and emit without writing anything
pub fn generate(task: &TaskConfig, root: &Path, reader: &dyn SourceReader) -> Result<(Surface, Vec<Artifact>)> {
    let mut surface = extract_surface(task, root, reader)?;
    let emitter = emitter_for(&task.emitter);

    let input = EmitInput {
        controllers: &surface.controllers,
        catalog: &surface.catalog,
    };
    let mut diagnostics = Diagnostics::new();
    let artifacts = emitter.emit(input, &mut diagnostics)?;
    surface.diagnostics.merge(diagnostics);

    Ok((surface, artifacts))
}

/// Run one task end to end
pub fn run_task(task: &TaskConfig, root: &Path, reader: &dyn SourceReader, mode: OutputMode) -> Result<TaskReport> {
    let span = tracing::info_span!("task", name = %task.name);
    let _guard = span.enter();

    let (surface, artifacts) = generate(task, root, reader)?;

    let mode = match mode {
        OutputMode::Write if task.emitter.streams() => OutputMode::Stdout,
        other => other,
    };
    let outcomes = ArtifactWriter::new(root, mode).write_all(&artifacts)?;

    surface.diagnostics.log();
    tracing::info!(
        emitter = task.emitter.kind(),
        controllers = surface.controllers.len(),
        requests = surface.request_count(),
        artifacts = outcomes.len(),
        warnings = surface.diagnostics.warning_count(),
        "task complete"
    );

    Ok(TaskReport {
        task: task.name.clone(),
        emitter: task.emitter.kind(),
        controllers: surface.controllers.len(),
        requests: surface.request_count(),
        declarations: surface.catalog.len(),
        outcomes,
        diagnostics: surface.diagnostics,
    })
}

/// Run independent tasks in parallel; one failure does not stop the others
pub fn run_batch(
    tasks: &[&TaskConfig],
    root: &Path,
    reader: &dyn SourceReader,
    mode: OutputMode,
) -> Vec<(String, Result<TaskReport>)> {
    tasks
        .par_iter()
        .map(|task| (task.name.clone(), run_task(task, root, reader, mode)))
        .collect()
}
