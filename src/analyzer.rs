//! Analyzer protocol, ambient context and tag-name dispatch

use crate::action::AnalysisAction;
use crate::attributes::{string_attribute, uid};
use crate::element::Element;
use crate::extractor::try_extract;
use crate::span::{SourceText, TextSnapshot};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// UI framework dialect of the project being analyzed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectFramework {
    Uwp,
    Wpf,
    XamarinForms,
    Maui,
    #[serde(rename = "winui", alias = "win-ui")]
    WinUi,
}

impl ProjectFramework {
    /// Whether this framework is one of `allowed`
    pub fn matches(self, allowed: &[ProjectFramework]) -> bool {
        allowed.contains(&self)
    }
}

impl fmt::Display for ProjectFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectFramework::Uwp => write!(f, "uwp"),
            ProjectFramework::Wpf => write!(f, "wpf"),
            ProjectFramework::XamarinForms => write!(f, "xamarin-forms"),
            ProjectFramework::Maui => write!(f, "maui"),
            ProjectFramework::WinUi => write!(f, "winui"),
        }
    }
}

impl std::str::FromStr for ProjectFramework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "uwp" => Ok(ProjectFramework::Uwp),
            "wpf" => Ok(ProjectFramework::Wpf),
            "xamarin-forms" | "xamarinforms" | "xamarin" => Ok(ProjectFramework::XamarinForms),
            "maui" => Ok(ProjectFramework::Maui),
            "winui" | "winui3" => Ok(ProjectFramework::WinUi),
            other => Err(format!("unknown framework '{}'", other)),
        }
    }
}

/// Kind of project the markup belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    App,
    Library,
    #[default]
    Unknown,
}

/// Lookup or generation of localization identifiers
pub trait UidAllocator: Send + Sync {
    /// Existing uid of the element, or a freshly generated one
    ///
    /// The flag is `true` when the uid is already present in `element_text`.
    fn try_get_or_generate(&self, element_text: &str, attribute_name: &str) -> (bool, String);
}

/// Default allocator: reuse `x:Uid`, else derive one from `x:Name` or the element text
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementUidAllocator;

impl UidAllocator for ElementUidAllocator {
    fn try_get_or_generate(&self, element_text: &str, attribute_name: &str) -> (bool, String) {
        let Ok(element) = try_extract(element_text, 0) else {
            return (false, format!("{}{}", attribute_name, short_hash(element_text)));
        };

        if let Some(existing) = uid(&element) {
            return (true, existing.to_string());
        }

        match string_attribute(&element, "x:Name").or_else(|| string_attribute(&element, "Name")) {
            Some(name) if !name.is_empty() => (false, name.to_string()),
            _ => (
                false,
                format!(
                    "{}{}_{}",
                    element.local_name(),
                    attribute_name,
                    short_hash(element_text)
                ),
            ),
        }
    }
}

fn short_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().take(3).map(|b| format!("{:02x}", b)).collect()
}

/// Read-only ambient facts handed to every analyzer
#[derive(Clone, Default)]
pub struct AnalysisContext<'a> {
    pub framework: Option<ProjectFramework>,
    pub project_kind: ProjectKind,
    /// Whole-document text the element spans index into
    pub source: Option<&'a SourceText>,
    pub uids: Option<Arc<dyn UidAllocator>>,
}

impl<'a> AnalysisContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_framework(mut self, framework: ProjectFramework) -> Self {
        self.framework = Some(framework);
        self
    }

    pub fn with_project_kind(mut self, kind: ProjectKind) -> Self {
        self.project_kind = kind;
        self
    }

    pub fn with_source(mut self, source: &'a SourceText) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_uid_allocator(mut self, uids: Arc<dyn UidAllocator>) -> Self {
        self.uids = Some(uids);
        self
    }

    /// Whether the active framework is one of `allowed`; `false` when unknown
    pub fn framework_is(&self, allowed: &[ProjectFramework]) -> bool {
        self.framework.is_some_and(|f| f.matches(allowed))
    }

    /// Source text of `element`, when the context carries the document
    pub fn element_text(&self, element: &Element) -> Option<&'a str> {
        let source = self.source?;
        source.substring(element.span)
    }
}

impl fmt::Debug for AnalysisContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("framework", &self.framework)
            .field("project_kind", &self.project_kind)
            .field("has_source", &self.source.is_some())
            .field("has_uid_allocator", &self.uids.is_some())
            .finish()
    }
}

/// A rule run against every element with a given tag name
pub trait Analyzer: Send + Sync {
    /// Local tag name this analyzer handles
    fn target_type(&self) -> &str;

    /// Short identifier used in logs
    fn id(&self) -> &str;

    /// Inspect `element` and report what should change
    ///
    /// Returns an empty list when the element is fine or the context does not apply.
    fn analyze(&self, element: &Element, context: &AnalysisContext<'_>) -> Vec<AnalysisAction>;
}

/// Tag name to analyzer dispatch table
#[derive(Default, Clone)]
pub struct AnalyzerRegistry {
    analyzers: HashMap<String, Vec<Arc<dyn Analyzer>>>,
}

impl AnalyzerRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in rule
    pub fn with_builtin_rules() -> Self {
        let mut registry = Self::new();
        for analyzer in crate::rules::builtin() {
            registry.register(analyzer);
        }
        registry
    }

    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) {
        self.analyzers
            .entry(analyzer.target_type().to_string())
            .or_default()
            .push(analyzer);
    }

    /// Analyzers registered for `tag`, in registration order
    pub fn for_tag(&self, tag: &str) -> &[Arc<dyn Analyzer>] {
        self.analyzers.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.analyzers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Run every analyzer registered for the element's local name
    pub fn analyze(&self, element: &Element, context: &AnalysisContext<'_>) -> Vec<AnalysisAction> {
        self.for_tag(element.local_name())
            .iter()
            .flat_map(|analyzer| {
                let actions = analyzer.analyze(element, context);
                if !actions.is_empty() {
                    log::trace!(
                        "{} reported {} action(s) at {}",
                        analyzer.id(),
                        actions.len(),
                        element.span
                    );
                }
                actions
            })
            .collect()
    }
}

impl fmt::Debug for AnalyzerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.analyzers.keys().collect();
        tags.sort();
        f.debug_struct("AnalyzerRegistry").field("tags", &tags).finish()
    }
}
