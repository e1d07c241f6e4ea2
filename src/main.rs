//! XAML Analyzer CLI
//!
//! Analyzes XAML files, prints diagnostics and optionally applies fixes.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use glob::glob;
use std::path::{Path, PathBuf};
use xaml_analyzer::config::{ColorMode, Config, FileFilter, OutputFormat};
use xaml_analyzer::engine::{Engine, LintResult};
use xaml_analyzer::fixer::{unified_diff, Fixer};
use xaml_analyzer::output::formatter_for;
use xaml_analyzer::ProjectFramework;

#[derive(Parser)]
#[command(
    name = "xaml-analyzer",
    version,
    about = "XAML static analyzer",
    long_about = "Finds undeclared grid rows and columns, hard-coded strings, one-way SelectedItem bindings and deprecated elements in XAML files, and fixes them."
)]
struct Cli {
    /// Files, directories or glob patterns to analyze
    files: Vec<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// UI framework of the project (uwp, wpf, xamarin-forms, maui, winui)
    #[arg(long)]
    framework: Option<ProjectFramework>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Disable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    disable: Option<Vec<String>>,

    /// Apply available fixes
    #[arg(long)]
    fix: bool,

    /// Also apply info-level refactorings when fixing
    #[arg(long, requires = "fix")]
    fix_info: bool,

    /// Write fixed files back to disk
    #[arg(long, requires = "fix")]
    write: bool,

    /// Print a unified diff of each fixed file
    #[arg(long, requires = "fix")]
    diff: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::load_default().context("failed to load config")?,
    };

    config.merge_cli(
        cli.framework,
        cli.format.map(|f| match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }),
        cli.verbose.then_some(true),
        cli.jobs,
        cli.disable.clone(),
    );
    if cli.no_color {
        config.output.color = ColorMode::Never;
    }
    match config.output.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {}
    }

    let files = collect_files(&cli.files, &config.file_filter()?)?;
    if files.is_empty() {
        bail!("no files found to analyze");
    }
    if config.output.verbose {
        eprintln!("Analyzing {} file(s)", files.len());
    }

    let engine = Engine::new(config);

    if cli.fix {
        fix_files(cli, &engine, &files)?;
    }

    let result: LintResult = engine.analyze_files(&files);
    let formatter = formatter_for(&engine.config().output);
    print!("{}", formatter.format(&result));

    Ok(result.exit_code())
}

/// Expand arguments into the list of files to analyze
///
/// Directories are searched recursively and filtered by the configured
/// include/exclude patterns; explicit files and glob matches are taken as is.
fn collect_files(patterns: &[String], filter: &FileFilter) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_dir() {
            let walk = format!("{}/**/*", pattern.trim_end_matches(['/', '\\']));
            let entries = glob(&walk).with_context(|| format!("invalid directory '{}'", pattern))?;
            files.extend(
                entries
                    .flatten()
                    .filter(|entry| entry.is_file() && filter.accepts(entry)),
            );
            continue;
        }

        let entries = glob(pattern).with_context(|| format!("invalid pattern '{}'", pattern))?;
        files.extend(entries.flatten().filter(|entry| entry.is_file()));
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn fix_files(cli: &Cli, engine: &Engine, files: &[PathBuf]) -> Result<()> {
    let fixer = Fixer::new(engine).with_info_fixes(cli.fix_info);

    for file in files {
        let before = std::fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        let report = fixer.fix_text(file, &before);

        for failure in &report.failed {
            eprintln!("{}: {}: {}", "warning".yellow().bold(), file.display(), failure);
        }
        if !report.changed() {
            continue;
        }

        if cli.diff {
            print!("{}", unified_diff(file, &before, &report.text));
        }
        if cli.write {
            std::fs::write(file, &report.text)
                .with_context(|| format!("failed to write {}", file.display()))?;
            if let Some(cache) = engine.cache() {
                cache.invalidate(file);
            }
        }
        eprintln!(
            "{} {} fix(es) to {}{}",
            "fixed:".green().bold(),
            report.applied,
            file.display(),
            if cli.write { "" } else { " (not written, use --write)" }
        );
    }

    Ok(())
}
