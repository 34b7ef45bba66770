//! # Evaluate Module
//!
//! Folder-versus-folder evaluation of a submission.
//!
//! Steps:
//! 1. Scan the prediction folder (no depth masks) and the ground-truth folder
//!    (with depth masks)
//! 2. Require both to list exactly the same examples
//! 3. Score every ground-truth example in sorted order
//! 4. Average each metric over the examples

use crate::metrics::{average_metrics, eval_one};
use crate::result_dir::{
    ResultFiles, check_user_submission_file_paths, get_result_directory_file_names,
};
use crate::{Co3dError, EvalMetrics, Result, load_rgbda_frame};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Scores of one example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleReport {
    pub example_name: String,
    pub metrics: EvalMetrics,
}

/// Averaged scores plus the per-example breakdown they were computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Arithmetic mean of every metric over `per_example`.
    pub average: EvalMetrics,
    /// Per-example scores, sorted by example name.
    pub per_example: Vec<ExampleReport>,
}

impl EvaluationReport {
    /// Build a report by averaging `per_example`. `None` when it is empty.
    #[must_use]
    pub fn from_examples(per_example: Vec<ExampleReport>) -> Option<Self> {
        let metrics: Vec<EvalMetrics> = per_example.iter().map(|e| e.metrics).collect();
        let average = average_metrics(&metrics)?;
        Some(Self {
            average,
            per_example,
        })
    }

    #[must_use]
    pub fn example_count(&self) -> usize {
        self.per_example.len()
    }

    /// Format as plain text, optionally listing every example.
    #[must_use]
    pub fn to_text(&self, include_examples: bool) -> String {
        let mut output = String::new();

        output.push_str("┌─────────────────────────────────────┐\n");
        output.push_str(&format!(
            "│ AVERAGE over {} example(s)\n",
            self.example_count()
        ));
        for (metric, value) in self.average.iter() {
            let direction = if metric.higher_is_better() { "↑" } else { "↓" };
            output.push_str(&format!("│ - {:<16} {:>12.4} {}\n", metric.name(), value, direction));
        }

        if include_examples {
            output.push_str("├─────────────────────────────────────┤\n");
            output.push_str("│ PER EXAMPLE\n");
            for example in &self.per_example {
                let values = example
                    .metrics
                    .iter()
                    .map(|(metric, value)| format!("{}={:.4}", metric.name(), value))
                    .collect::<Vec<_>>()
                    .join(" ");
                output.push_str(&format!("│ - {}: {}\n", example.example_name, values));
            }
        }

        output.push_str("└─────────────────────────────────────┘\n");

        output
    }
}

/// Scan both folders and check they hold the same complete examples.
///
/// Returns `(ground_truth_files, user_submission_files)`.
pub fn validate_file_folders(
    pred_folder: &Path,
    gt_folder: &Path,
) -> Result<(ResultFiles, ResultFiles)> {
    let user_submission_files = get_result_directory_file_names(pred_folder, false)?;
    let ground_truth_files = get_result_directory_file_names(gt_folder, true)?;

    check_user_submission_file_paths(&ground_truth_files, &user_submission_files)?;

    Ok((ground_truth_files, user_submission_files))
}

/// Evaluate every prediction in `pred_folder` against `gt_folder`.
pub fn evaluate_file_folders(pred_folder: &Path, gt_folder: &Path) -> Result<EvaluationReport> {
    tracing::info!(
        prediction = %pred_folder.display(),
        gt = %gt_folder.display(),
        "Evaluating folders"
    );

    let (ground_truth_files, user_submission_files) =
        validate_file_folders(pred_folder, gt_folder)?;

    // Key sets are equal from here on.
    let total = ground_truth_files.len();
    let mut per_example = Vec::with_capacity(total);
    for (index, (example_name, gt_root)) in ground_truth_files.iter().enumerate() {
        let Some(pred_root) = user_submission_files.get(example_name) else {
            continue;
        };

        let gt_frame = load_rgbda_frame(gt_root)?;
        let pred_frame = load_rgbda_frame(pred_root)?;
        let metrics = eval_one(&pred_frame, &gt_frame)?;

        tracing::debug!(
            example = %example_name,
            index = index + 1,
            total,
            psnr_masked = metrics.psnr_masked,
            iou = metrics.iou,
            "evaluated example"
        );

        per_example.push(ExampleReport {
            example_name: example_name.clone(),
            metrics,
        });
    }

    EvaluationReport::from_examples(per_example)
        .ok_or_else(|| Co3dError::NoExamples(gt_folder.to_path_buf()))
}

// =============================================================================
// TESTS
// =============================================================================
