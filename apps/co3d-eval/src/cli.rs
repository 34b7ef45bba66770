//! # CLI Module
//!
//! Argument definitions and one `cmd_*` function per subcommand.
//!
//! Every command prints a human-readable summary by default and pretty JSON
//! with `--json`. Logs go to stderr so JSON on stdout stays parseable.

use clap::{Parser, Subcommand};
use co3d_eval_core::{
    Co3dError, Co3dSequenceSet, Co3dTask, EvaluationReport, ResultFiles, Submission,
    SubmissionReport, evaluate_file_folders, get_result_directory_file_names,
    sequence_set_from_subset_name, task_from_subset_name, unzip, validate_file_folders,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Environment variable holding the ground-truth root for submission commands.
pub const GT_ROOT_ENV: &str = "CO3D_GT_ROOT";

// =============================================================================
// ARGUMENTS
// =============================================================================

#[derive(Parser, Debug)]
#[command(name = "co3d-eval", version, about = "CO3D challenge evaluation")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(short, long, global = true, help = "Log per-example progress")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a prediction folder against a ground-truth folder.
    Evaluate {
        #[arg(long)]
        pred: PathBuf,
        #[arg(long)]
        gt: PathBuf,
        #[arg(long, default_value_t = false, help = "List every example")]
        per_example: bool,
        #[arg(long, help = "Also write the JSON report to this file")]
        output: Option<PathBuf>,
    },
    /// Check that both folders hold the same complete examples.
    Check {
        #[arg(long)]
        pred: PathBuf,
        #[arg(long)]
        gt: PathBuf,
    },
    /// List the examples of a result folder.
    List {
        dir: PathBuf,
        #[arg(long, default_value_t = false)]
        has_depth_masks: bool,
    },
    /// Show the task and sequence set encoded in a subset name.
    Subset { name: String },
    /// Extract a zip archive.
    Unzip { archive: PathBuf, output_dir: PathBuf },
    /// Operate on a submission cache.
    Submission {
        #[command(subcommand)]
        command: SubmissionCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum SubmissionCommands {
    /// Evaluate every category / subset folder.
    Evaluate {
        #[command(flatten)]
        target: SubmissionTarget,
        #[arg(long, help = "Also write the JSON report to this file")]
        output: Option<PathBuf>,
    },
    /// Check every category / subset folder without scoring.
    Validate {
        #[command(flatten)]
        target: SubmissionTarget,
    },
}

#[derive(clap::Args, Debug)]
pub struct SubmissionTarget {
    #[arg(long, help = "Submission output folder (contains submission_cache/)")]
    pub submission: PathBuf,
    #[arg(long, env = GT_ROOT_ENV)]
    pub gt_root: PathBuf,
    #[arg(long, help = "manyview or fewview")]
    pub task: Co3dTask,
    #[arg(long, help = "train, dev or test")]
    pub sequence_set: Co3dSequenceSet,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Errors surfaced by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] Co3dError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CliResult<T> = std::result::Result<T, CliError>;

// =============================================================================
// DISPATCH
// =============================================================================

/// Run the parsed command line.
pub fn run(cli: Cli) -> CliResult<()> {
    let json = cli.json;
    match cli.command {
        Commands::Evaluate {
            pred,
            gt,
            per_example,
            output,
        } => cmd_evaluate(&pred, &gt, json, per_example, output.as_deref()).map(drop),
        Commands::Check { pred, gt } => cmd_check(&pred, &gt, json).map(drop),
        Commands::List {
            dir,
            has_depth_masks,
        } => cmd_list(&dir, has_depth_masks, json).map(drop),
        Commands::Subset { name } => cmd_subset(&name, json).map(drop),
        Commands::Unzip {
            archive,
            output_dir,
        } => cmd_unzip(&archive, &output_dir, json).map(drop),
        Commands::Submission { command } => match command {
            SubmissionCommands::Evaluate { target, output } => {
                cmd_submission_evaluate(&target, json, output.as_deref()).map(drop)
            }
            SubmissionCommands::Validate { target } => {
                cmd_submission_validate(&target, json).map(drop)
            }
        },
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Evaluate `pred` against `gt` and print the report.
pub fn cmd_evaluate(
    pred: &Path,
    gt: &Path,
    json: bool,
    per_example: bool,
    output: Option<&Path>,
) -> CliResult<EvaluationReport> {
    let report = evaluate_file_folders(pred, gt)?;

    if let Some(output) = output {
        write_json(output, &report)?;
    }

    if json {
        if per_example {
            print_json(&report)?;
        } else {
            print_json(&report.average)?;
        }
    } else {
        print!("{}", report.to_text(per_example));
    }
    Ok(report)
}

/// Validate both folders without scoring. Returns the example count.
pub fn cmd_check(pred: &Path, gt: &Path, json: bool) -> CliResult<usize> {
    let (ground_truth_files, _) = validate_file_folders(pred, gt)?;
    let count = ground_truth_files.len();

    if json {
        print_json(&serde_json::json!({ "valid": true, "examples": count }))?;
    } else {
        println!("Submission valid: {} example(s) match the ground truth", count);
    }
    Ok(count)
}

/// List the examples found in `dir`.
pub fn cmd_list(dir: &Path, has_depth_masks: bool, json: bool) -> CliResult<ResultFiles> {
    let files = get_result_directory_file_names(dir, has_depth_masks)?;

    if json {
        print_json(&files)?;
    } else {
        println!("{} example(s) in {}", files.len(), dir.display());
        for (name, root) in &files {
            println!("  {} -> {}", name, root.display());
        }
    }
    Ok(files)
}

/// Decode the task and sequence set of a subset name.
pub fn cmd_subset(name: &str, json: bool) -> CliResult<(Co3dTask, Co3dSequenceSet)> {
    let task = task_from_subset_name(name)?;
    let sequence_set = sequence_set_from_subset_name(name)?;

    if json {
        print_json(&serde_json::json!({
            "subset_name": name,
            "task": task,
            "sequence_set": sequence_set,
        }))?;
    } else {
        println!("{}: task={} sequence_set={}", name, task, sequence_set);
    }
    Ok((task, sequence_set))
}

/// Extract `archive` into `output_dir`. Returns the entry count.
pub fn cmd_unzip(archive: &Path, output_dir: &Path, json: bool) -> CliResult<usize> {
    let entries = unzip(archive, output_dir)?;

    if json {
        print_json(&serde_json::json!({
            "output_dir": output_dir,
            "entries": entries,
        }))?;
    } else {
        println!("Extracted {} entries into {}", entries, output_dir.display());
    }
    Ok(entries)
}

/// Evaluate a whole submission cache.
pub fn cmd_submission_evaluate(
    target: &SubmissionTarget,
    json: bool,
    output: Option<&Path>,
) -> CliResult<SubmissionReport> {
    let submission = open_submission(target);
    let report = submission.evaluate(&target.gt_root)?;

    if let Some(output) = output {
        write_json(output, &report)?;
    }

    if json {
        print_json(&report)?;
    } else {
        print!("{}", report.to_text());
    }
    Ok(report)
}

/// Validate a whole submission cache. Returns the example count.
pub fn cmd_submission_validate(target: &SubmissionTarget, json: bool) -> CliResult<usize> {
    let submission = open_submission(target);
    let count = submission.validate(&target.gt_root)?;

    if json {
        print_json(&serde_json::json!({
            "valid": true,
            "task": submission.task(),
            "sequence_set": submission.sequence_set(),
            "examples": count,
        }))?;
    } else {
        println!(
            "Submission {} ({} / {}) valid: {} example(s)",
            submission.output_folder().display(),
            submission.task(),
            submission.sequence_set(),
            count
        );
    }
    Ok(count)
}

// =============================================================================
// HELPERS
// =============================================================================

fn open_submission(target: &SubmissionTarget) -> Submission {
    Submission::new(target.task, target.sequence_set, &target.submission)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> CliResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    tracing::info!(path = %path.display(), "wrote report");
    Ok(())
}
