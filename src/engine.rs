//! Analysis engine
//!
//! [`analyze_fragment`] is the pure entry point: one piece of markup in, sorted
//! diagnostics out. [`Engine`] wraps it for whole documents and files,
//! applying configuration, inline pragmas and the document cache.

use crate::action::AnalysisAction;
use crate::analyzer::{AnalysisContext, AnalyzerRegistry, ElementUidAllocator, UidAllocator};
use crate::cache::DocumentCache;
use crate::config::Config;
use crate::diagnostic::{self, Diagnostic, Severity};
use crate::element::Element;
use crate::extractor::Extractor;
use crate::span::{SourceText, Span};
use crate::suppression::{parse_inline, SuppressionList};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

static BUILTIN: LazyLock<AnalyzerRegistry> = LazyLock::new(AnalyzerRegistry::with_builtin_rules);

/// Code of the diagnostic reported for a file that could not be read
pub const FILE_READ_ERROR: &str = "file-read-error";

/// Resource limits for one analysis pass
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Give up on fragments with more elements than this
    pub max_elements: Option<usize>,
    /// Checked between elements; once set, the pass stops and returns what it has
    pub cancel: Option<Arc<AtomicBool>>,
}

impl AnalysisOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_elements(mut self, limit: usize) -> Self {
        self.max_elements = Some(limit);
        self
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Analyze the element starting at `offset` in `text` with the built-in rules
///
/// `text` is the whole document; spans, lines and columns in the result are
/// relative to it. Markup that does not parse yields no diagnostics.
pub fn analyze_fragment(
    text: &str,
    offset: usize,
    context: &AnalysisContext<'_>,
    suppressions: &SuppressionList,
    options: &AnalysisOptions,
) -> Vec<Diagnostic> {
    analyze_with(&BUILTIN, None, text, offset, context, suppressions, options)
}

/// [`analyze_fragment`] with an explicit registry and file name
pub fn analyze_with(
    registry: &AnalyzerRegistry,
    file: Option<&Path>,
    text: &str,
    offset: usize,
    context: &AnalysisContext<'_>,
    suppressions: &SuppressionList,
    options: &AnalysisOptions,
) -> Vec<Diagnostic> {
    let Some(fragment) = text.get(offset..) else {
        log::debug!("offset {} is not a valid position in the text", offset);
        return Vec::new();
    };

    let mut extractor = Extractor::new();
    if let Some(limit) = options.max_elements {
        extractor = extractor.with_max_elements(limit);
    }
    let root = match extractor.extract(fragment, offset) {
        Ok(root) => root,
        Err(err) => {
            log::debug!("skipping fragment at {}: {}", offset, err);
            return Vec::new();
        }
    };

    let source = SourceText::new(text);
    let context = AnalysisContext {
        framework: context.framework,
        project_kind: context.project_kind,
        source: Some(&source),
        uids: context
            .uids
            .clone()
            .or_else(|| Some(Arc::new(ElementUidAllocator) as Arc<dyn UidAllocator>)),
    };
    let file_name = file.map(Path::to_path_buf).unwrap_or_default();

    let mut diagnostics = Vec::new();
    let mut stack: Vec<&Element> = vec![&root];
    while let Some(element) = stack.pop() {
        if options.is_cancelled() {
            log::debug!("analysis cancelled at offset {}", element.span.start);
            break;
        }

        for action in registry.analyze(element, &context) {
            diagnostics.push(
                Diagnostic::from_action(action, element.start_tag, file_name.clone(), &source)
                    .with_element(element.span),
            );
        }

        let mut next: Vec<&Element> = element
            .children
            .iter()
            .chain(element.attributes.iter().flat_map(|a| a.elements()))
            .collect();
        next.sort_by_key(|e| std::cmp::Reverse(e.span.start));
        stack.extend(next);
    }

    let mut diagnostics: Vec<Diagnostic> = diagnostic::dedup(diagnostics)
        .into_iter()
        .filter(|d| !suppressions.is_suppressed(&d.code, file, d.location.line))
        .collect();
    diagnostic::sort(&mut diagnostics);
    diagnostics
}

/// Result of analyzing one or more files
#[derive(Debug, Default)]
pub struct LintResult {
    /// All diagnostics
    pub diagnostics: Vec<Diagnostic>,

    /// Files processed
    pub files_processed: usize,

    /// Files with errors
    pub files_with_errors: usize,

    /// Files with warnings
    pub files_with_warnings: usize,

    /// Total errors
    pub error_count: usize,

    /// Total warnings
    pub warning_count: usize,

    /// Total info messages
    pub info_count: usize,

    /// Processing duration
    pub duration: Duration,
}

impl LintResult {
    /// Result for a single file
    pub fn for_file(diagnostics: Vec<Diagnostic>) -> Self {
        let mut result = Self {
            files_processed: 1,
            ..Self::default()
        };
        for diag in &diagnostics {
            match diag.severity {
                Severity::Error => result.error_count += 1,
                Severity::Warning => result.warning_count += 1,
                Severity::Info => result.info_count += 1,
            }
        }
        if result.error_count > 0 {
            result.files_with_errors = 1;
        }
        if result.warning_count > 0 {
            result.files_with_warnings = 1;
        }
        result.diagnostics = diagnostics;
        result
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        self.warning_count > 0
    }

    /// Check if result is clean (no errors or warnings)
    pub fn is_clean(&self) -> bool {
        self.error_count == 0 && self.warning_count == 0
    }

    /// Get exit code (0 = success, 1 = warnings, 2 = errors)
    pub fn exit_code(&self) -> i32 {
        if self.error_count > 0 {
            2
        } else if self.warning_count > 0 {
            1
        } else {
            0
        }
    }

    /// Merge another result into this one
    pub fn merge(&mut self, other: LintResult) {
        self.diagnostics.extend(other.diagnostics);
        self.files_processed += other.files_processed;
        self.files_with_errors += other.files_with_errors;
        self.files_with_warnings += other.files_with_warnings;
        self.error_count += other.error_count;
        self.warning_count += other.warning_count;
        self.info_count += other.info_count;
    }
}

/// Whole-document analysis under a configuration
pub struct Engine {
    config: Config,
    registry: Arc<AnalyzerRegistry>,
    uids: Arc<dyn UidAllocator>,
    cache: Option<DocumentCache>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Engine {
    /// Create a new engine with configuration and the built-in rules
    pub fn new(config: Config) -> Self {
        let cache = config.engine.cache.then(DocumentCache::new);
        Self {
            config,
            registry: Arc::new(AnalyzerRegistry::with_builtin_rules()),
            uids: Arc::new(ElementUidAllocator),
            cache,
            cancel: None,
        }
    }

    /// Replace the rule set
    pub fn with_registry(mut self, registry: AnalyzerRegistry) -> Self {
        self.registry = Arc::new(registry);
        self.clear_cache();
        self
    }

    pub fn with_uid_allocator(mut self, uids: Arc<dyn UidAllocator>) -> Self {
        self.uids = uids;
        self.clear_cache();
        self
    }

    /// Stop in-flight and future analyses once `flag` is set
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> Option<&DocumentCache> {
        self.cache.as_ref()
    }

    fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Analyze a whole document held in memory
    ///
    /// Inline pragmas, configured suppressions, disabled rules and severity
    /// overrides all apply.
    pub fn analyze_document(&self, path: &Path, text: &str) -> Vec<Diagnostic> {
        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(path, text)) {
            return Vec::clone(&cached);
        }

        let context = AnalysisContext {
            framework: self.config.project.framework,
            project_kind: self.config.project.kind,
            source: None,
            uids: Some(Arc::clone(&self.uids)),
        };

        let mut suppressions = self.config.suppressions.clone();
        suppressions.extend(parse_inline(text).iter().cloned());

        let options = AnalysisOptions {
            max_elements: self.config.engine.max_elements,
            cancel: self.cancel.clone(),
        };

        let diagnostics: Vec<Diagnostic> = analyze_with(
            &self.registry,
            Some(path),
            text,
            0,
            &context,
            &suppressions,
            &options,
        )
        .into_iter()
        .filter(|d| {
            self.config.is_rule_enabled(&d.code)
                && !self.config.should_ignore_rule_for_file(&d.code, path)
        })
        .map(|mut d| {
            if let Some(severity) = self.config.severity_override(&d.code) {
                d.severity = severity;
                d.action.severity = severity;
            }
            d
        })
        .collect();

        log::debug!("{}: {} diagnostic(s)", path.display(), diagnostics.len());

        if options.is_cancelled() {
            return diagnostics;
        }
        match &self.cache {
            Some(cache) => Vec::clone(&cache.insert(path, text, diagnostics)),
            None => diagnostics,
        }
    }

    /// Read and analyze a single file
    pub fn analyze_file(&self, path: &Path) -> LintResult {
        match std::fs::read_to_string(path) {
            Ok(text) => LintResult::for_file(self.analyze_document(path, &text)),
            Err(e) => {
                let source = SourceText::new("");
                let diagnostic = Diagnostic::from_action(
                    AnalysisAction::highlight_only(
                        FILE_READ_ERROR,
                        Severity::Error,
                        &format!("Failed to read file: {}", e),
                    ),
                    Span::default(),
                    path.to_path_buf(),
                    &source,
                );
                LintResult::for_file(vec![diagnostic])
            }
        }
    }

    /// Analyze multiple files
    pub fn analyze_files(&self, files: &[PathBuf]) -> LintResult {
        let start = Instant::now();

        let results: Vec<LintResult> = if self.config.engine.parallel {
            let jobs = if self.config.engine.jobs > 0 {
                self.config.engine.jobs
            } else {
                num_cpus::get()
            };
            match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(|| files.par_iter().map(|f| self.analyze_file(f)).collect()),
                Err(e) => {
                    log::warn!("could not start {} worker threads: {}", jobs, e);
                    files.iter().map(|f| self.analyze_file(f)).collect()
                }
            }
        } else {
            files.iter().map(|f| self.analyze_file(f)).collect()
        };

        let mut combined = LintResult::default();
        for result in results {
            combined.merge(result);
        }

        combined.duration = start.elapsed();
        combined
    }
}
