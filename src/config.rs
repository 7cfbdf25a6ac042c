//! Configuration management for apigen
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (apigen.toml)
//! - Environment variables (APIGEN__*)
//!
//! ## Example config file (apigen.toml):
//! ```toml
//! root = "."
//!
//! [[tasks]]
//! name = "client"
//! controllers = ["dump/**/*.controller.json"]
//! types = ["dump/**/*.dto.json"]
//!
//! [tasks.emitter]
//! kind = "client"
//! output = "client/api.ts"
//! types_output = "client/types.ts"
//! overrides_param = "overrides"
//!
//! [[tasks]]
//! name = "docs"
//! controllers = ["dump/**/*.controller.json"]
//! types = ["dump/**/*.dto.json"]
//!
//! [tasks.emitter]
//! kind = "openapi"
//! output = "openapi.json"
//! title = "Users API"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{GenError, Result};
use crate::extract::Convention;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApigenConfig {
    /// Directory that source patterns and outputs are relative to
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Independent generation tasks
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

/// One generation task: source sets plus a single emitter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub name: String,

    #[serde(default)]
    pub framework: Framework,

    /// Glob patterns for source units holding controllers
    #[serde(default)]
    pub controllers: Vec<String>,

    /// Glob patterns for source units holding type declarations
    #[serde(default)]
    pub types: Vec<String>,

    pub emitter: EmitterConfig,
}

/// Annotation convention of the source project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    #[default]
    Nest,
}

impl Framework {
    pub fn convention(&self) -> &'static Convention {
        match self {
            Self::Nest => &Convention::NEST,
        }
    }
}

/// Emitter selection with its settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EmitterConfig {
    Client(ClientConfig),
    OpenApi(OpenApiConfig),
}

impl EmitterConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Client(_) => "client",
            Self::OpenApi(_) => "openapi",
        }
    }

    /// Whether artifacts go to stdout rather than the filesystem
    pub fn streams(&self) -> bool {
        match self {
            Self::Client(_) => false,
            Self::OpenApi(openapi) => openapi.stdout,
        }
    }
}

/// Client stub emitter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Request functions (and types, unless split)
    pub output: PathBuf,

    /// Separate unit for type declarations
    #[serde(default)]
    pub types_output: Option<PathBuf>,

    /// Module whose default export performs the HTTP call; axios when unset
    #[serde(default)]
    pub request_module: Option<String>,

    /// Name of a trailing per-call options parameter
    #[serde(default)]
    pub overrides_param: Option<String>,

    /// Comment prepended to every emitted unit
    #[serde(default)]
    pub header: Option<String>,

    #[serde(default)]
    pub format: FormatConfig,
}

/// Formatting preferences for emitted source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatConfig {
    #[serde(default = "default_indent")]
    pub indent: usize,

    #[serde(default)]
    pub quote: QuoteStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    #[default]
    Double,
    Single,
}

impl QuoteStyle {
    /// Quote a string literal
    pub fn quote(&self, text: &str) -> String {
        let q = match self {
            Self::Double => '"',
            Self::Single => '\'',
        };
        let escaped = text.replace('\\', "\\\\").replace(q, &format!("\\{}", q));
        format!("{}{}{}", q, escaped, q)
    }
}

/// Schema document emitter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiConfig {
    pub output: PathBuf,

    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Echo the document to stdout instead of writing `output`
    #[serde(default)]
    pub stdout: bool,
}

// Default value functions
fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_indent() -> usize {
    2
}

fn default_title() -> String {
    "API".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl Default for ApigenConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            tasks: Vec::new(),
        }
    }
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            quote: QuoteStyle::Double,
        }
    }
}

impl ApigenConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file that must exist
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["apigen.toml", ".apigen.toml", "config/apigen.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "apigen") {
            let xdg_config = config_dir.config_dir().join("apigen.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // Load from environment variables (APIGEN__*)
        builder = builder.add_source(
            Environment::with_prefix("APIGEN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(content, config_crate::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the root path (resolves relative paths against the working directory)
    pub fn root_path(&self) -> PathBuf {
        if self.root.is_absolute() {
            self.root.clone()
        } else {
            std::env::current_dir().unwrap_or_default().join(&self.root)
        }
    }

    /// Tasks to run: the named one, or all of them
    pub fn select_tasks(&self, name: Option<&str>) -> Result<Vec<&TaskConfig>> {
        match name {
            None => Ok(self.tasks.iter().collect()),
            Some(name) => self
                .tasks
                .iter()
                .find(|t| t.name == name)
                .map(|t| vec![t])
                .ok_or_else(|| GenError::UnknownTask(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
root = "project"

[[tasks]]
name = "client"
controllers = ["**/*.controller.json"]

[tasks.emitter]
kind = "client"
output = "client/api.ts"
request_module = "@/lib/request"

[tasks.emitter.format]
indent = 4
quote = "single"

[[tasks]]
name = "docs"

[tasks.emitter]
kind = "openapi"
output = "openapi.json"
title = "Users API"
"#;

    #[test]
    fn test_default_config() {
        let config = ApigenConfig::default();
        assert_eq!(config.root, PathBuf::from("."));
        assert!(config.tasks.is_empty());
    }

    #[test]
    fn test_parse_tasks() {
        let config = ApigenConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.tasks.len(), 2);

        let client = &config.tasks[0];
        assert_eq!(client.framework, Framework::Nest);
        match &client.emitter {
            EmitterConfig::Client(c) => {
                assert_eq!(c.request_module.as_deref(), Some("@/lib/request"));
                assert_eq!(c.format.indent, 4);
                assert_eq!(c.format.quote, QuoteStyle::Single);
                assert!(c.types_output.is_none());
            }
            other => panic!("Expected client emitter, got {:?}", other),
        }

        match &config.tasks[1].emitter {
            EmitterConfig::OpenApi(o) => {
                assert_eq!(o.title, "Users API");
                assert_eq!(o.version, "1.0.0");
                assert!(!o.stdout);
            }
            other => panic!("Expected openapi emitter, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_emitter_kind_is_fatal() {
        let toml = r#"
[[tasks]]
name = "x"
[tasks.emitter]
kind = "graphql"
output = "schema.graphql"
"#;
        assert!(matches!(ApigenConfig::from_toml(toml), Err(GenError::Config(_))));
    }

    #[test]
    fn test_unknown_framework_is_fatal() {
        let toml = r#"
[[tasks]]
name = "x"
framework = "express"
[tasks.emitter]
kind = "openapi"
output = "openapi.json"
"#;
        assert!(matches!(ApigenConfig::from_toml(toml), Err(GenError::Config(_))));
    }

    #[test]
    fn test_select_tasks() {
        let config = ApigenConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.select_tasks(None).unwrap().len(), 2);
        assert_eq!(config.select_tasks(Some("docs")).unwrap()[0].name, "docs");
        assert!(matches!(config.select_tasks(Some("nope")), Err(GenError::UnknownTask(_))));
    }

    #[test]
    fn test_serialize_config() {
        let config = ApigenConfig::from_toml(SAMPLE).unwrap();
        let toml_str = config.to_toml().unwrap();
        assert!(toml_str.contains("[[tasks]]"));
        assert!(toml_str.contains("kind = \"openapi\""));
    }

    #[test]
    fn test_quote_style() {
        assert_eq!(QuoteStyle::Double.quote("axios"), "\"axios\"");
        assert_eq!(QuoteStyle::Single.quote("it's"), "'it\\'s'");
    }
}
