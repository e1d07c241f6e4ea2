//! Hard-coded user-facing strings

use crate::action::AnalysisAction;
use crate::analyzer::{AnalysisContext, Analyzer, ProjectFramework};
use crate::attributes::{is_markup_extension, resolve_attribute, uid, AttributeForm};
use crate::diagnostic::Severity;
use crate::element::Element;

pub const HARDCODED_STRING: &str = "RXT200";

/// Frameworks a rule runs for
#[derive(Debug, Clone, Copy)]
pub enum Applicability {
    /// Every framework, including an unknown one, except those listed
    Except(&'static [ProjectFramework]),
    /// Only the listed frameworks; nothing when the framework is unknown
    Only(&'static [ProjectFramework]),
}

impl Applicability {
    pub fn applies(self, context: &AnalysisContext<'_>) -> bool {
        match self {
            Applicability::Except(excluded) => !context.framework_is(excluded),
            Applicability::Only(allowed) => context.framework_is(allowed),
        }
    }
}

const XAML_UI: &[ProjectFramework] = &[ProjectFramework::Uwp, ProjectFramework::WinUi];
const FORMS: &[ProjectFramework] = &[ProjectFramework::XamarinForms, ProjectFramework::Maui];

/// Flags literal text in attributes that should come from resources
#[derive(Debug, Clone)]
pub struct HardCodedStringAnalyzer {
    target: &'static str,
    attributes: &'static [&'static str],
    form: AttributeForm,
    applicability: Applicability,
}

impl HardCodedStringAnalyzer {
    pub fn new(
        target: &'static str,
        attributes: &'static [&'static str],
        form: AttributeForm,
        applicability: Applicability,
    ) -> Self {
        Self {
            target,
            attributes,
            form,
            applicability,
        }
    }

    /// The built-in set of element/attribute pairs
    pub fn builtin() -> Vec<Self> {
        use AttributeForm::{Any, InlineOrElement};
        use Applicability::{Except, Only};

        vec![
            Self::new("TextBlock", &["Text"], Any, Except(FORMS)),
            Self::new("ToggleSwitch", &["Header", "OnContent", "OffContent"], InlineOrElement, Only(XAML_UI)),
            Self::new("CalendarDatePicker", &["Header", "Description"], InlineOrElement, Only(XAML_UI)),
            Self::new("PasswordBox", &["Header", "Description"], InlineOrElement, Only(XAML_UI)),
            Self::new("AppBarToggleButton", &["Label"], InlineOrElement, Only(XAML_UI)),
            Self::new("HubSection", &["Header"], InlineOrElement, Only(XAML_UI)),
        ]
    }

    fn uid_for(&self, element: &Element, attribute: &str, context: &AnalysisContext<'_>) -> (bool, String) {
        if let (Some(uids), Some(text)) = (context.uids.as_ref(), context.element_text(element)) {
            return uids.try_get_or_generate(text, attribute);
        }
        match uid(element) {
            Some(existing) => (true, existing.to_string()),
            None => (false, format!("{}{}", element.local_name(), attribute)),
        }
    }
}

impl Analyzer for HardCodedStringAnalyzer {
    fn target_type(&self) -> &str {
        self.target
    }

    fn id(&self) -> &str {
        "hardcoded-string"
    }

    fn analyze(&self, element: &Element, context: &AnalysisContext<'_>) -> Vec<AnalysisAction> {
        if !self.applicability.applies(context) {
            return Vec::new();
        }

        let mut actions = Vec::new();

        for &name in self.attributes {
            let Some(found) = resolve_attribute(element, name, self.form) else {
                continue;
            };
            let Some(value) = found.value.map(str::trim) else {
                continue;
            };
            if value.is_empty() || is_markup_extension(value) {
                continue;
            }

            let description = format!("Hard-coded string \"{}\" in {}.{}", value, self.target, name);
            let (exists, uid) = self.uid_for(element, name, context);

            let action = if exists {
                AnalysisAction::highlight_only(HARDCODED_STRING, Severity::Warning, &description)
                    .with_extended_message(&format!(
                        "Move the text to the resource entry \"{}.{}\".",
                        uid, name
                    ))
            } else {
                AnalysisAction::add_attribute(
                    HARDCODED_STRING,
                    Severity::Warning,
                    &description,
                    "Add x:Uid for localization",
                    "x:Uid",
                    &uid,
                )
                .with_extended_message("Localizable text should be loaded from a resource file.")
            };

            actions.push(action.with_anchor(found.span));
        }

        actions
    }
}
