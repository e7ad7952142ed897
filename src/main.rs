use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use storage_migrate::config::{load_from_path, MigrateConfig};
use storage_migrate::{
    find_candidates, logging, PatchError, PatchOutcome, TextPatcher, WorkspaceGuard,
};

/// Environment override for the default target file.
const TARGET_ENV: &str = "STORAGE_MIGRATE_TARGET";

#[derive(Parser)]
#[command(name = "storage-migrate")]
#[command(about = "Rewrite legacy StorageUtils imports to S3StorageUtils", long_about = None)]
#[command(version)]
struct Cli {
    /// File to patch (defaults to backend/src/services/index.js)
    file: Option<PathBuf>,

    /// TOML config file overriding the migration rule and target
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Patch every script under this directory that has the legacy import
    #[arg(short, long, conflicts_with = "file")]
    root: Option<PathBuf>,

    /// Dry run - show what would be changed without modifying files
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show unified diff of changes
    #[arg(short, long)]
    diff: bool,

    /// Print outcomes as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_from_path(path)?,
        None => MigrateConfig::default(),
    };

    logging::init(cli.verbose, config.logging.level.as_deref());

    let patcher = TextPatcher::new(config.migration.clone())?;

    match &cli.root {
        Some(root) => cmd_batch(&cli, &config, &patcher, root),
        None => cmd_single(&cli, &config, &patcher),
    }
}

/// Resolve the file to patch
///
/// Priority order:
/// 1. Positional FILE argument
/// 2. STORAGE_MIGRATE_TARGET environment variable
/// 3. `target.file` from the config file
/// 4. Built-in services module path
fn resolve_target(cli_file: Option<&Path>, config: &MigrateConfig) -> PathBuf {
    if let Some(path) = cli_file {
        return path.to_path_buf();
    }

    if let Ok(env_path) = env::var(TARGET_ENV) {
        if !env_path.trim().is_empty() {
            return PathBuf::from(env_path);
        }
    }

    config.target_file().to_path_buf()
}

/// Where `--diff` output goes. With `--json` stdout is reserved for the JSON
/// document, so the diff moves to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiffOutput {
    Off,
    Stdout,
    Stderr,
}

impl DiffOutput {
    fn for_cli(cli: &Cli) -> Self {
        match (cli.diff, cli.json) {
            (false, _) => DiffOutput::Off,
            (true, false) => DiffOutput::Stdout,
            (true, true) => DiffOutput::Stderr,
        }
    }
}

/// Patch (or preview) one file, printing a diff when asked.
fn process_file(
    patcher: &TextPatcher,
    path: &Path,
    dry_run: bool,
    diff: DiffOutput,
) -> Result<PatchOutcome, PatchError> {
    if diff == DiffOutput::Off {
        return if dry_run {
            patcher.preview(path).map(|preview| preview.outcome)
        } else {
            patcher.run(path)
        };
    }

    let preview = patcher.preview(path)?;
    let outcome = if dry_run {
        preview.outcome
    } else {
        patcher.run(path)?
    };

    if preview.before != preview.after {
        let rendered = render_diff(path, &preview.before, &preview.after);
        match diff {
            DiffOutput::Stderr => eprint!("{rendered}"),
            _ => print!("{rendered}"),
        }
    }

    Ok(outcome)
}

fn completion_message(patcher: &TextPatcher) -> String {
    format!(
        "✓ Storage imports migrated to {}",
        patcher.migration().new_binding
    )
}

fn cmd_single(cli: &Cli, config: &MigrateConfig, patcher: &TextPatcher) -> Result<()> {
    let target = resolve_target(cli.file.as_deref(), config);
    tracing::debug!(file = %target.display(), "resolved target");

    let outcome = process_file(patcher, &target, cli.dry_run, DiffOutput::for_cli(cli))
        .with_context(|| format!("failed to patch {}", target.display()))?;

    tracing::info!(
        file = %outcome.file().display(),
        counts = %outcome.counts(),
        "single-file run finished"
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    // A real run confirms with one line; a dry run says what it would do.
    if cli.dry_run {
        print_outcome(&outcome);
        println!("{}", "[DRY RUN - no files were written]".cyan());
    } else {
        println!("{}", completion_message(patcher).green());
    }

    Ok(())
}

fn cmd_batch(
    cli: &Cli,
    config: &MigrateConfig,
    patcher: &TextPatcher,
    root: &Path,
) -> Result<()> {
    let guard = WorkspaceGuard::new(root)?;
    let files = find_candidates(&guard, &config.target.extensions, patcher.patterns())?;

    if !cli.json {
        println!("Root: {}", guard.root().display());
        println!("Candidates: {}", files.len());
        if cli.dry_run {
            println!("{}", "  [DRY RUN - showing what would be applied]".cyan());
        }
        println!();
    }

    let diff = DiffOutput::for_cli(cli);
    let results: Vec<(PathBuf, Result<PatchOutcome, PatchError>)> = files
        .into_iter()
        .map(|file| {
            let result = process_file(patcher, &file, cli.dry_run, diff);
            (file, result)
        })
        .collect();

    let total_failed = results.iter().filter(|(_, r)| r.is_err()).count();

    if cli.json {
        let entries: Vec<serde_json::Value> = results
            .iter()
            .map(|(file, result)| match result {
                Ok(outcome) => serde_json::to_value(outcome),
                Err(e) => Ok(serde_json::json!({
                    "status": "failed",
                    "file": file,
                    "error": e.to_string(),
                })),
            })
            .collect::<Result<_, _>>()?;
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print_batch_report(&results);
    }

    if total_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn print_outcome(outcome: &PatchOutcome) {
    let file = outcome.file().display();
    match outcome {
        PatchOutcome::Applied { .. } => {
            println!("{} {}: {}", "✓".green(), file, outcome.counts());
        }
        PatchOutcome::WouldApply { .. } => {
            println!("{} {}: Would apply ({})", "✓".green(), file, outcome.counts());
        }
        PatchOutcome::AlreadyMigrated { .. } => {
            println!("{} {}: Already migrated", "⊙".yellow(), file);
        }
    }
}

fn print_batch_report(results: &[(PathBuf, Result<PatchOutcome, PatchError>)]) {
    let mut total_applied = 0;
    let mut total_already = 0;
    let mut total_failed = 0;

    for (file, result) in results {
        match result {
            Ok(outcome) => {
                print_outcome(outcome);
                match outcome {
                    PatchOutcome::AlreadyMigrated { .. } => total_already += 1,
                    _ => total_applied += 1,
                }
            }
            Err(e) => {
                eprintln!("{} {}: Failed - {}", "✗".red(), file.display(), e);
                total_failed += 1;
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", total_applied).green());
    println!(
        "  {} already migrated",
        format!("{}", total_already).yellow()
    );
    println!("  {} failed", format!("{}", total_failed).red());
}

/// Coloured unified diff between original and modified content
fn render_diff(file: &Path, original: &str, modified: &str) -> String {
    let mut out = format!(
        "\n{}\n{}\n",
        format!("--- {} (original)", file.display()).dimmed(),
        format!("+++ {} (patched)", file.display()).dimmed()
    );

    let diff = TextDiff::from_lines(original, modified);

    for group in diff.grouped_ops(3) {
        for op in group {
            for change in diff.iter_changes(&op) {
                let line = match change.tag() {
                    ChangeTag::Delete => format!("-{}", change).red(),
                    ChangeTag::Insert => format!("+{}", change).green(),
                    ChangeTag::Equal => format!(" {}", change).normal(),
                };
                out.push_str(&line.to_string());
                if change.missing_newline() {
                    out.push('\n');
                }
            }
        }
    }

    out
}
