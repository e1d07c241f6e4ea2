//! `MediaElement` is superseded by `MediaPlayerElement` on UWP

use crate::action::AnalysisAction;
use crate::analyzer::{AnalysisContext, Analyzer, ProjectFramework};
use crate::diagnostic::Severity;
use crate::element::Element;

pub const USE_MEDIA_PLAYER_ELEMENT: &str = "RXT402";

const REPLACEMENT: &str = "MediaPlayerElement";

#[derive(Debug, Default)]
pub struct MediaElementAnalyzer;

impl MediaElementAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for MediaElementAnalyzer {
    fn target_type(&self) -> &str {
        "MediaElement"
    }

    fn id(&self) -> &str {
        "media-element"
    }

    fn analyze(&self, element: &Element, context: &AnalysisContext<'_>) -> Vec<AnalysisAction> {
        if !context.framework_is(&[ProjectFramework::Uwp]) {
            return Vec::new();
        }

        // Keep the namespace prefix the element was written with
        let new_name = match element.name.rsplit_once(':') {
            Some((prefix, _)) => format!("{}:{}", prefix, REPLACEMENT),
            None => REPLACEMENT.to_string(),
        };

        vec![AnalysisAction::rename_element(
            USE_MEDIA_PLAYER_ELEMENT,
            Severity::Warning,
            "Use MediaPlayerElement in place of MediaElement",
            "Replace with MediaPlayerElement",
            &new_name,
        )
        .with_extended_message(
            "MediaPlayerElement has the same playback features and supports the system media transport controls.",
        )]
    }
}
