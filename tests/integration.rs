//! Integration tests for xaml-analyzer

use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use xaml_analyzer::{
    analyze_fragment, apply_replacements, build_fix, exclusions, preview_fix, try_extract,
    ActionKind, AnalysisContext, AnalysisOptions, Config, Diagnostic, Element, Engine, Fixer,
    ProjectFramework, Severity, Suppression, SuppressionList,
};

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixtures_path().join(name)).unwrap()
}

fn analyze(text: &str) -> Vec<Diagnostic> {
    analyze_fragment(
        text,
        0,
        &AnalysisContext::new(),
        &SuppressionList::new(),
        &AnalysisOptions::default(),
    )
}

fn uwp_engine() -> Engine {
    let mut config = Config::default();
    config.project.framework = Some(ProjectFramework::Uwp);
    Engine::new(config)
}

fn warnings(diagnostics: &[Diagnostic]) -> Vec<&Diagnostic> {
    diagnostics
        .iter()
        .filter(|d| d.severity > Severity::Info)
        .collect()
}

fn assert_children_reextract(text: &str, element: &Element) {
    for child in &element.children {
        let slice = &text[child.span.start..child.span.end()];
        let again = try_extract(slice, child.span.start).unwrap();
        assert_eq!(&again, child);
        assert_children_reextract(text, child);
    }
}

#[test]
fn test_round_trip_idempotence() {
    for name in ["MainPage.xaml", "NestedGrid.xaml", "Clean.xaml"] {
        let text = fixture(name);
        let root = try_extract(&text, 0).unwrap();
        assert_children_reextract(&text, &root);
    }
}

#[test]
fn test_exclusion_correctness() {
    let text = fixture("NestedGrid.xaml");
    let outer = try_extract(&text, 0).unwrap();
    let nested = outer
        .children
        .iter()
        .find(|c| c.local_name() == "Grid")
        .unwrap();

    let diagnostics = analyze(&text);
    let from_outer: Vec<_> = diagnostics.iter().filter(|d| d.element == outer.span).collect();

    assert!(!from_outer.is_empty());
    assert!(from_outer.iter().all(|d| !nested.span.encloses(&d.span)));
    assert_eq!(from_outer.iter().filter(|d| d.code == "RXT101").count(), 1);

    // The nested grid declares its rows, so every warning belongs to the outer one
    assert!(warnings(&diagnostics).iter().all(|d| d.element == outer.span));
}

#[test]
fn test_comment_immunity() {
    let commented = analyze(r#"<Grid><!--<TextBlock Grid.Row="4">--></Grid>"#);
    assert!(commented.iter().all(|d| d.code != "RXT101"));
    assert!(commented.is_empty());

    let live = analyze(r#"<Grid><TextBlock Grid.Row="4" /></Grid>"#);
    assert_eq!(live.iter().filter(|d| d.code == "RXT101").count(), 1);
}

#[test]
fn test_grid_row_inference() {
    let diagnostics = analyze(r#"<Grid><TextBlock Grid.Row="1"></Grid>"#);

    // One grid-level inference plus the per-usage report of the same row
    let mut codes: Vec<_> = diagnostics.iter().map(|d| d.code.as_str()).collect();
    codes.sort();
    assert_eq!(codes, vec!["RXT101", "RXT105"]);

    let added: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.kind() == ActionKind::AddAttribute)
        .collect();

    assert_eq!(added.len(), 1);
    assert_eq!(added[0].action.target_attribute.as_deref(), Some("RowDefinitions"));
    assert_eq!(added[0].action.new_value.as_deref(), Some("*,*"));
}

#[test]
fn test_span_overflow() {
    let text = r#"<Grid><Grid.RowDefinitions><RowDefinition/><RowDefinition/></Grid.RowDefinitions><TextBlock Grid.Row="1" Grid.RowSpan="2"/></Grid>"#;
    let diagnostics = analyze(text);
    assert_eq!(diagnostics.iter().filter(|d| d.code == "RXT103").count(), 1);
    assert!(diagnostics.iter().all(|d| d.code != "RXT101"));
}

#[test]
fn test_out_of_range_placement_is_bounded() {
    let max = u64::MAX.to_string();
    let texts = [
        format!(r#"<Grid><TextBlock Grid.Row="{}" /></Grid>"#, max),
        format!(r#"<Grid><TextBlock Grid.Row="1" Grid.RowSpan="{}" /></Grid>"#, max),
        format!(r#"<Grid RowDefinitions="*"><TextBlock Grid.Column="{}" Grid.ColumnSpan="{}" /></Grid>"#, max, max),
        r#"<Grid><TextBlock Grid.Row="50000000" /></Grid>"#.to_string(),
    ];

    for text in &texts {
        let diagnostics = analyze(text);
        assert!(diagnostics.iter().all(|d| d.code != "RXT101" && d.code != "RXT105"), "{}", text);
        for diagnostic in &diagnostics {
            if let Ok(plan) = build_fix(diagnostic, text) {
                assert!(preview_fix(&plan, text).unwrap().len() < text.len() * 16);
            }
        }
    }

    // A sibling within range is still reported
    let mixed = format!(
        r#"<Grid><TextBlock Grid.Row="{}" /><TextBlock Grid.Row="2" /></Grid>"#,
        max
    );
    let diagnostics = analyze(&mixed);
    assert_eq!(diagnostics.iter().filter(|d| d.code == "RXT101").count(), 1);
    let inferred = diagnostics.iter().find(|d| d.code == "RXT105").unwrap();
    assert_eq!(inferred.action.new_value.as_deref(), Some("*,*,*"));
}

#[test]
fn test_patch_ordering() {
    let text = r#"<Grid><TextBlock Grid.Row="1" /><Grid><TextBlock Grid.Row="1" /></Grid></Grid>"#;
    let excluded = exclusions(text, "Grid");
    let replacements = vec![(r#"Grid.Row="1""#.to_string(), r#"Grid.Row="2""#.to_string())];
    let result = apply_replacements(text, &replacements, &excluded);

    assert_eq!(
        result.text,
        r#"<Grid><TextBlock Grid.Row="2" /><Grid><TextBlock Grid.Row="1" /></Grid></Grid>"#
    );
}

#[test]
fn test_preview_purity() {
    let text = fixture("MainPage.xaml");
    let insert = analyze(&text)
        .into_iter()
        .find(|d| d.code == "RXT190")
        .unwrap();
    let plan = build_fix(&insert, &text).unwrap();

    let first = preview_fix(&plan, &text).unwrap();
    let second = preview_fix(&plan, &text).unwrap();

    assert_eq!(first, second);
    assert_eq!(text, fixture("MainPage.xaml"));
    assert!(first.matches("<RowDefinition").count() > text[plan.region.start..plan.region.end()].matches("<RowDefinition").count());
}

#[test]
fn test_suppression_filtering() {
    let text = "<Grid>\n<TextBlock Grid.Row=\"1\" />\n<TextBlock Grid.Row=\"1\" />\n</Grid>";
    let mut suppressions = SuppressionList::new();
    suppressions.push(Suppression::line("RXT101", 2));

    let diagnostics = analyze_fragment(
        text,
        0,
        &AnalysisContext::new(),
        &suppressions,
        &AnalysisOptions::default(),
    );
    let lines: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.code == "RXT101")
        .map(|d| d.location.line)
        .collect();
    assert_eq!(lines, vec![3]);
}

#[test]
fn test_main_page_diagnostics() {
    let engine = uwp_engine();
    let result = engine.analyze_file(&fixtures_path().join("MainPage.xaml"));
    let found: Vec<(&str, usize)> = warnings(&result.diagnostics)
        .iter()
        .map(|d| (d.code.as_str(), d.location.line))
        .collect();

    assert!(found.contains(&("RXT105", 5)));
    assert!(found.contains(&("RXT200", 10)));
    assert!(found.contains(&("RXT160", 11)));
    assert!(found.contains(&("RXT101", 12)));
    assert!(found.contains(&("RXT402", 12)));

    // Commented-out markup and the pragma-suppressed line stay quiet
    assert!(found.iter().all(|(code, _)| *code != "RXT102" && *code != "RXT106"));
    assert!(!found.contains(&("RXT200", 15)));

    assert_eq!(result.info_count, 2);
    assert_eq!(result.exit_code(), 1);
}

#[test]
fn test_clean_page() {
    let result = uwp_engine().analyze_file(&fixtures_path().join("Clean.xaml"));
    assert!(result.is_clean(), "{:?}", result.diagnostics);
    assert_eq!(result.exit_code(), 0);
}

#[test]
fn test_incomplete_document_is_skipped() {
    let result = uwp_engine().analyze_file(&fixtures_path().join("Incomplete.xaml"));
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.files_processed, 1);
}

#[test]
fn test_fix_main_page() {
    let engine = uwp_engine();
    let path = fixtures_path().join("MainPage.xaml");
    let text = fixture("MainPage.xaml");
    let report = Fixer::new(&engine).fix_text(&path, &text);

    assert!(report.changed());
    assert!(report.failed.is_empty(), "{:?}", report.failed);
    assert!(report.text.contains(r#"x:Uid="Title""#));
    assert!(report.text.contains("Mode=TwoWay"));
    assert!(report.text.contains("<MediaPlayerElement Grid.Row=\"2\""));
    assert_eq!(report.text.matches("<RowDefinition ").count(), 3);

    // What is left has no automatic fix
    let remaining = engine.analyze_document(&path, &report.text);
    assert!(warnings(&remaining).iter().all(|d| !d.has_fix()), "{:?}", remaining);
}

#[test]
fn test_config_file_drives_engine() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join(".xaml-analyzer.yaml");
    std::fs::write(
        &config_path,
        "project:\n  framework: uwp\nrules:\n  disabled: [RXT160]\n  severity:\n    RXT402: error\n",
    )
    .unwrap();

    let config = Config::load(&config_path).unwrap();
    let engine = Engine::new(config);
    let result = engine.analyze_files(&[fixtures_path().join("MainPage.xaml")]);

    assert!(result.diagnostics.iter().all(|d| d.code != "RXT160"));
    let media = result
        .diagnostics
        .iter()
        .find(|d| d.code == "RXT402")
        .unwrap();
    assert_eq!(media.severity, Severity::Error);
    assert_eq!(result.exit_code(), 2);
}

#[test]
fn test_configured_suppression_for_file() {
    let mut config = Config::default();
    config.project.framework = Some(ProjectFramework::Uwp);
    config
        .suppressions
        .push(Suppression::line("RXT402", 12).for_file("MainPage.xaml"));
    let engine = Engine::new(config);

    let main = engine.analyze_file(&fixtures_path().join("MainPage.xaml"));
    assert!(main.diagnostics.iter().all(|d| d.code != "RXT402"));

    let other = engine.analyze_document(Path::new("Other.xaml"), &fixture("MainPage.xaml"));
    assert!(other.iter().any(|d| d.code == "RXT402"));
}
