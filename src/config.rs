//! Configuration for the analyzer
//!
//! Reads configuration from:
//! - `.xaml-analyzer.yaml` / `.xaml-analyzer.yml` / `.xaml-analyzer.json` (project-level)
//! - the same names in the home directory (user-level)

use crate::analyzer::{ProjectFramework, ProjectKind};
use crate::diagnostic::Severity;
use crate::suppression::SuppressionList;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File names searched by [`Config::load_default`]
pub const CONFIG_NAMES: &[&str] = &[
    ".xaml-analyzer.yaml",
    ".xaml-analyzer.yml",
    ".xaml-analyzer.json",
];

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The project the markup belongs to
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// UI framework; framework-specific rules stay off when unset
    pub framework: Option<ProjectFramework>,
    pub kind: ProjectKind,
}

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Enable parallel processing
    pub parallel: bool,

    /// Number of parallel jobs (0 = auto-detect)
    pub jobs: usize,

    /// Give up on a document with more elements than this
    pub max_elements: Option<usize>,

    /// Reuse diagnostics for unchanged documents
    pub cache: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            jobs: 0,
            max_elements: None,
            cache: true,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color: ColorMode,
    /// Print help text and source lines
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Color mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// File handling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Include patterns
    pub include: Vec<String>,

    /// Exclude patterns
    pub exclude: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            include: vec!["**/*.xaml".to_string()],
            exclude: vec![
                "**/bin/**".to_string(),
                "**/obj/**".to_string(),
                "**/*.g.xaml".to_string(),
                "**/node_modules/**".to_string(),
            ],
        }
    }
}

/// Rule configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Disabled rule codes
    pub disabled: Vec<String>,

    /// Enabled rule codes (empty = all)
    pub enabled: Vec<String>,

    /// Ignore rules by code prefix (e.g., "RXT1" ignores every grid rule)
    pub ignore: Vec<String>,

    /// Severity overrides (code -> severity)
    pub severity: HashMap<String, Severity>,

    /// Per-file rule ignores (glob pattern -> codes, `all` for every rule)
    pub per_file: HashMap<String, Vec<String>>,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,

    /// Engine settings
    pub engine: EngineConfig,

    /// Output settings
    pub output: OutputConfig,

    /// File handling settings
    pub files: FilesConfig,

    /// Rule configuration
    pub rules: RulesConfig,

    /// Diagnostics to hide, by code, file and line range
    pub suppressions: SuppressionList,
}

impl Config {
    /// Create default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        let config: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };

        config.validate()?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        // Check current directory
        for name in CONFIG_NAMES {
            let path = PathBuf::from(name);
            if path.exists() {
                return Self::load(&path);
            }
        }

        // Check home directory
        if let Some(home) = dirs::home_dir() {
            for name in CONFIG_NAMES {
                let path = home.join(name);
                if path.exists() {
                    return Self::load(&path);
                }
            }
        }

        Ok(Self::default())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for pattern in self
            .files
            .include
            .iter()
            .chain(&self.files.exclude)
            .chain(self.rules.per_file.keys())
        {
            Glob::new(pattern).map_err(|e| {
                ConfigError::Invalid(format!("bad glob pattern '{}': {}", pattern, e))
            })?;
        }
        if self.engine.max_elements == Some(0) {
            return Err(ConfigError::Invalid(
                "engine.max_elements must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Merge CLI arguments into configuration
    pub fn merge_cli(
        &mut self,
        framework: Option<ProjectFramework>,
        format: Option<OutputFormat>,
        verbose: Option<bool>,
        jobs: Option<usize>,
        disabled_rules: Option<Vec<String>>,
    ) {
        if let Some(f) = framework {
            self.project.framework = Some(f);
        }
        if let Some(f) = format {
            self.output.format = f;
        }
        if let Some(v) = verbose {
            self.output.verbose = v;
        }
        if let Some(j) = jobs {
            self.engine.jobs = j;
        }
        if let Some(disabled) = disabled_rules {
            self.rules.disabled.extend(disabled);
        }
    }

    /// Check if a rule is enabled
    pub fn is_rule_enabled(&self, code: &str) -> bool {
        if self
            .rules
            .disabled
            .iter()
            .any(|d| d.eq_ignore_ascii_case(code))
        {
            return false;
        }

        // Check if rule matches any ignore prefix (case-insensitive)
        let upper = code.to_uppercase();
        if self
            .rules
            .ignore
            .iter()
            .any(|prefix| upper.starts_with(&prefix.to_uppercase()))
        {
            return false;
        }

        // If enabled list is not empty, rule must be in it
        self.rules.enabled.is_empty()
            || self
                .rules
                .enabled
                .iter()
                .any(|e| e.eq_ignore_ascii_case(code))
    }

    /// Get severity override for a rule
    pub fn severity_override(&self, code: &str) -> Option<Severity> {
        self.rules
            .severity
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(code))
            .map(|(_, s)| *s)
    }

    /// Check if a rule should be ignored for a file
    pub fn should_ignore_rule_for_file(&self, code: &str, file_path: &Path) -> bool {
        let file_str = file_path.to_string_lossy();

        self.rules.per_file.iter().any(|(pattern, codes)| {
            Glob::new(pattern).is_ok_and(|glob| glob.compile_matcher().is_match(file_str.as_ref()))
                && codes
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case("all") || c.eq_ignore_ascii_case(code))
        })
    }

    /// Matcher for `files.include` / `files.exclude`
    pub fn file_filter(&self) -> Result<FileFilter, ConfigError> {
        Ok(FileFilter {
            include: build_set(&self.files.include)?,
            exclude: build_set(&self.files.exclude)?,
        })
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| ConfigError::Invalid(format!("bad glob pattern '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ConfigError::Invalid(e.to_string()))
}

/// Decides which discovered files get analyzed
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl FileFilter {
    pub fn accepts(&self, path: &Path) -> bool {
        (self.include.is_empty() || self.include.is_match(path)) && !self.exclude.is_match(path)
    }
}
