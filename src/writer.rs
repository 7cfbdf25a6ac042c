//! Artifact output
//!
//! Artifacts arrive complete. Each file is written through a temporary file
//! in its destination directory and then persisted over the target, so an
//! interrupted run never leaves a half-written file behind.

use similar::{ChangeTag, TextDiff};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::checksum::Checksum;
use crate::emit::Artifact;
use crate::error::{GenError, Result};

/// What to do with artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Write changed files to disk
    Write,
    /// Compare against disk without writing
    Check,
    /// Print to stdout instead of the filesystem
    Stdout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStatus {
    Created,
    Updated,
    Unchanged,
    Streamed,
    /// Check mode: file does not exist yet
    Missing,
    /// Check mode: file differs, with a line diff
    Drifted { diff: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub path: PathBuf,
    pub status: WriteStatus,
    pub checksum: Checksum,
}

impl WriteOutcome {
    pub fn is_drift(&self) -> bool {
        matches!(self.status, WriteStatus::Missing | WriteStatus::Drifted { .. })
    }
}

/// Writes artifacts below a root directory
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    root: PathBuf,
    mode: OutputMode,
}

impl ArtifactWriter {
    pub fn new(root: impl Into<PathBuf>, mode: OutputMode) -> Self {
        Self {
            root: root.into(),
            mode,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Destination of an artifact path
    pub fn destination(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn write_all(&self, artifacts: &[Artifact]) -> Result<Vec<WriteOutcome>> {
        if self.mode == OutputMode::Stdout {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            return stream(artifacts, &mut lock);
        }
        artifacts.iter().map(|a| self.write(a)).collect()
    }

    pub fn write(&self, artifact: &Artifact) -> Result<WriteOutcome> {
        let dest = self.destination(&artifact.path);
        let checksum = Checksum::of(&artifact.contents);
        let existing = Checksum::of_file(&dest)?;

        let status = match (self.mode, existing) {
            (_, Some(current)) if current == checksum => WriteStatus::Unchanged,
            (OutputMode::Check, None) => WriteStatus::Missing,
            (OutputMode::Check, Some(_)) => {
                let current = fs::read_to_string(&dest)?;
                WriteStatus::Drifted {
                    diff: unified_diff(&artifact.path, &current, &artifact.contents),
                }
            }
            (_, existing) => {
                persist(&dest, &artifact.contents)?;
                if existing.is_some() {
                    WriteStatus::Updated
                } else {
                    WriteStatus::Created
                }
            }
        };

        tracing::debug!(path = %dest.display(), checksum = checksum.short(), ?status, "artifact");
        Ok(WriteOutcome {
            path: dest,
            status,
            checksum,
        })
    }
}

/// Write artifacts to a stream sink, in order
pub fn stream(artifacts: &[Artifact], sink: &mut impl Write) -> Result<Vec<WriteOutcome>> {
    let mut outcomes = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        sink.write_all(artifact.contents.as_bytes())?;
        outcomes.push(WriteOutcome {
            path: artifact.path.clone(),
            status: WriteStatus::Streamed,
            checksum: Checksum::of(&artifact.contents),
        });
    }
    sink.flush()?;
    Ok(outcomes)
}

fn persist(dest: &Path, contents: &str) -> Result<()> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    tmp.persist(dest).map_err(|e| GenError::Persist {
        path: dest.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Line diff of current file contents against generated contents
pub fn unified_diff(path: &Path, current: &str, generated: &str) -> String {
    let diff = TextDiff::from_lines(current, generated);
    let mut output = String::new();

    output.push_str(&format!("--- {} (on disk)\n", path.display()));
    output.push_str(&format!("+++ {} (generated)\n", path.display()));

    for (idx, group) in diff.grouped_ops(3).iter().enumerate() {
        if idx > 0 {
            output.push_str("...\n");
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => "-",
                    ChangeTag::Insert => "+",
                    ChangeTag::Equal => " ",
                };
                output.push_str(sign);
                output.push_str(change.value());
                if change.missing_newline() {
                    output.push('\n');
                }
            }
        }
    }

    output
}
