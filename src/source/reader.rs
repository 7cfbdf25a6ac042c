//! JSON source-unit reader
//!
//! Resolves glob patterns against a root directory and deserializes each
//! matching file as a [`SourceUnit`].

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};

use super::{SourceReader, SourceUnit};
use crate::error::{GenError, Result};

/// Reads source units from JSON dumps on disk
#[derive(Debug, Clone, Default)]
pub struct JsonSourceReader {
    /// Also walk hidden files and directories
    pub include_hidden: bool,
}

impl JsonSourceReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the files matching `patterns` under `root`, sorted by path
    pub fn matching_files(&self, root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let mut overrides = OverrideBuilder::new(root);
        for pattern in patterns {
            overrides.add(pattern).map_err(|source| GenError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
        }
        let overrides = overrides.build()?;

        let walker = WalkBuilder::new(root)
            .hidden(!self.include_hidden)
            .git_ignore(false)
            .overrides(overrides)
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry?;
            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                files.push(entry.into_path());
            }
        }
        files.sort();

        Ok(files)
    }
}

impl SourceReader for JsonSourceReader {
    fn read(&self, root: &Path, patterns: &[String]) -> Result<Vec<SourceUnit>> {
        let files = self.matching_files(root, patterns)?;
        tracing::debug!(count = files.len(), root = %root.display(), "reading source units");

        let mut units = Vec::with_capacity(files.len());
        for path in files {
            let content = fs::read_to_string(&path)?;
            let mut unit: SourceUnit = serde_json::from_str(&content)
                .map_err(|source| GenError::SourceParse { path: path.clone(), source })?;
            if unit.path.is_empty() {
                unit.path = path
                    .strip_prefix(root)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .into_owned();
            }
            units.push(unit);
        }

        Ok(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_matching_units_only() {
        let dir = tempfile::tempdir().unwrap();
        let api = dir.path().join("api");
        fs::create_dir_all(&api).unwrap();
        fs::write(
            api.join("users.controller.json"),
            r#"{"path": "src/users/users.controller.ts", "classes": []}"#,
        )
        .unwrap();
        fs::write(api.join("notes.txt"), "not a unit").unwrap();
        fs::write(dir.path().join("models.json"), r#"{"declarations": []}"#).unwrap();

        let reader = JsonSourceReader::new();
        let units = reader
            .read(dir.path(), &["api/*.controller.json".to_string()])
            .unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].path, "src/users/users.controller.ts");

        let units = reader.read(dir.path(), &["*.json".to_string()]).unwrap();
        let paths: Vec<_> = units.iter().map(|u| u.path.as_str()).collect();
        assert!(paths.contains(&"models.json"));
    }

    #[test]
    fn test_parse_failure_names_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();

        let err = JsonSourceReader::new()
            .read(dir.path(), &["*.json".to_string()])
            .unwrap_err();
        match err {
            GenError::SourceParse { path, .. } => assert!(path.ends_with("broken.json")),
            other => panic!("Expected SourceParse, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_patterns_yield_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let units = JsonSourceReader::new().read(dir.path(), &[]).unwrap();
        assert!(units.is_empty());
    }
}
