//! `SelectedItem` bindings that cannot push selection changes back

use crate::action::AnalysisAction;
use crate::analyzer::{AnalysisContext, Analyzer, ProjectFramework};
use crate::attributes::{resolve_attribute, AttributeForm};
use crate::diagnostic::Severity;
use crate::element::Element;
use regex::Regex;
use std::sync::LazyLock;

pub const SELECTED_ITEM_BINDING_MODE: &str = "RXT160";

/// Selector controls that expose `SelectedItem`
pub const SELECTORS: &[&str] = &[
    "ListView",
    "ListBox",
    "GridView",
    "ComboBox",
    "FlipView",
    "DataGrid",
    "TreeView",
];

static MODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Mode\s*=\s*(\w+)").expect("mode pattern is valid"));

static EXTENSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{\s*(Binding|x:Bind)\b\s*(.*?)\s*\}$").expect("binding pattern is valid")
});

#[derive(Debug, Clone)]
pub struct SelectedItemBindingAnalyzer {
    target: &'static str,
}

impl SelectedItemBindingAnalyzer {
    pub fn new(target: &'static str) -> Self {
        Self { target }
    }

    pub fn builtin() -> Vec<Self> {
        SELECTORS.iter().copied().map(Self::new).collect()
    }
}

/// The binding rewritten with `Mode=TwoWay`, or `None` when it already is
fn two_way(binding: &str) -> Option<String> {
    let binding = binding.trim();
    let caps = EXTENSION_RE.captures(binding)?;
    let (extension, body) = (&caps[1], &caps[2]);

    match MODE_RE.captures(body) {
        Some(mode) if &mode[1] == "TwoWay" => None,
        Some(mode) => {
            let whole = mode.get(0)?;
            Some(format!(
                "{{{} {}Mode=TwoWay{}}}",
                extension,
                &body[..whole.start()],
                &body[whole.end()..]
            ))
        }
        None if body.is_empty() => Some(format!("{{{} Mode=TwoWay}}", extension)),
        None => Some(format!("{{{} {}, Mode=TwoWay}}", extension, body)),
    }
}

impl Analyzer for SelectedItemBindingAnalyzer {
    fn target_type(&self) -> &str {
        self.target
    }

    fn id(&self) -> &str {
        "selected-item-binding"
    }

    fn analyze(&self, element: &Element, context: &AnalysisContext<'_>) -> Vec<AnalysisAction> {
        if !context.framework_is(&[ProjectFramework::Uwp, ProjectFramework::WinUi]) {
            return Vec::new();
        }

        let Some(found) = resolve_attribute(element, "SelectedItem", AttributeForm::Inline) else {
            return Vec::new();
        };
        let Some(replacement) = found.value.and_then(two_way) else {
            return Vec::new();
        };

        vec![AnalysisAction::replace_attribute_value(
            SELECTED_ITEM_BINDING_MODE,
            Severity::Warning,
            "SelectedItem binding should be TwoWay",
            "Set binding mode to TwoWay",
            "SelectedItem",
            &replacement,
        )
        .with_extended_message("Without TwoWay mode, selection changes made in the UI never reach the bound property.")
        .with_anchor(found.span)]
    }
}
