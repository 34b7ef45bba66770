//! # Submission Module
//!
//! On-disk cache of predictions for one task / sequence set, and its
//! evaluation against a ground-truth root.
//!
//! Layout:
//!
//! ```text
//! <output_folder>/submission_cache/
//!     <category>_<subset_name>/
//!         <sequence_name>_<frame_number>_image.png
//!         <sequence_name>_<frame_number>_mask.png
//!         <sequence_name>_<frame_number>_depth.png
//! ```
//!
//! The ground-truth root uses the same `<category>_<subset_name>` folders.

use crate::evaluate::{EvaluationReport, evaluate_file_folders, validate_file_folders};
use crate::metrics::average_metrics;
use crate::task::{sequence_set_from_subset_name, task_from_subset_name};
use crate::{
    Co3dError, Co3dSequenceSet, Co3dTask, EvalMetrics, Result, RgbdaFrame, store_rgbda_frame,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the prediction cache inside the output folder.
pub const SUBMISSION_CACHE_DIR: &str = "submission_cache";

/// Predictions of one task on one sequence set.
#[derive(Debug, Clone)]
pub struct Submission {
    task: Co3dTask,
    sequence_set: Co3dSequenceSet,
    output_folder: PathBuf,
}

/// Evaluation of every category / subset folder of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub task: Co3dTask,
    pub sequence_set: Co3dSequenceSet,
    /// Mean of the per-folder averages.
    pub average: EvalMetrics,
    /// Folder name -> its evaluation.
    pub per_folder: BTreeMap<String, EvaluationReport>,
}

impl SubmissionReport {
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut output = format!(
            "Submission task={} sequence_set={} ({} folder(s))\n",
            self.task,
            self.sequence_set,
            self.per_folder.len()
        );
        for (folder, report) in &self.per_folder {
            output.push_str(&format!("\n{}\n", folder));
            output.push_str(&report.to_text(false));
        }
        output.push_str("\nOverall:\n");
        for (metric, value) in self.average.iter() {
            output.push_str(&format!("  {:<16} {:>12.4}\n", metric.name(), value));
        }
        output
    }
}

impl Submission {
    pub fn new(
        task: Co3dTask,
        sequence_set: Co3dSequenceSet,
        output_folder: impl Into<PathBuf>,
    ) -> Self {
        Self {
            task,
            sequence_set,
            output_folder: output_folder.into(),
        }
    }

    #[must_use]
    pub fn task(&self) -> Co3dTask {
        self.task
    }

    #[must_use]
    pub fn sequence_set(&self) -> Co3dSequenceSet {
        self.sequence_set
    }

    #[must_use]
    pub fn output_folder(&self) -> &Path {
        &self.output_folder
    }

    #[must_use]
    pub fn cache_folder(&self) -> PathBuf {
        self.output_folder.join(SUBMISSION_CACHE_DIR)
    }

    /// Folder holding the predictions of one category / subset pair.
    #[must_use]
    pub fn result_folder(&self, category: &str, subset_name: &str) -> PathBuf {
        self.cache_folder().join(format!("{}_{}", category, subset_name))
    }

    /// Fail unless `subset_name` belongs to this submission's task and sequence set.
    pub fn check_subset(&self, subset_name: &str) -> Result<()> {
        let task = task_from_subset_name(subset_name)?;
        let sequence_set = sequence_set_from_subset_name(subset_name)?;
        if task == self.task && sequence_set == self.sequence_set {
            Ok(())
        } else {
            Err(Co3dError::SubsetMismatch {
                subset_name: subset_name.to_string(),
                expected_task: self.task,
                expected_set: self.sequence_set,
            })
        }
    }

    /// Store the prediction for one evaluation frame.
    ///
    /// Returns the root path the frame files were written under.
    pub fn add_result(
        &self,
        category: &str,
        subset_name: &str,
        sequence_name: &str,
        frame_number: u64,
        frame: &RgbdaFrame,
    ) -> Result<PathBuf> {
        self.check_subset(subset_name)?;

        let folder = self.result_folder(category, subset_name);
        std::fs::create_dir_all(&folder).map_err(|e| Co3dError::io(&folder, e))?;

        let root = folder.join(format!("{}_{}", sequence_name, frame_number));
        store_rgbda_frame(frame, &root)?;

        tracing::debug!(
            category,
            subset_name,
            sequence_name,
            frame_number,
            "stored result"
        );
        Ok(root)
    }

    /// Remove every cached prediction.
    pub fn clear_files(&self) -> Result<()> {
        let cache = self.cache_folder();
        if cache.exists() {
            tracing::info!(cache = %cache.display(), "clearing submission cache");
            std::fs::remove_dir_all(&cache).map_err(|e| Co3dError::io(&cache, e))?;
        }
        Ok(())
    }

    /// Ground-truth folders under `gt_root` that belong to this submission, sorted.
    pub fn ground_truth_folders(&self, gt_root: &Path) -> Result<Vec<String>> {
        let mut folders = Vec::new();
        for name in list_folder_names(gt_root)? {
            let belongs = split_folder_name(&name)
                .is_some_and(|(_, subset_name)| self.check_subset(subset_name).is_ok());
            if belongs {
                folders.push(name);
            } else {
                tracing::debug!(folder = %name, "skipping ground-truth folder");
            }
        }
        Ok(folders)
    }

    /// Folders currently present in the prediction cache, sorted.
    pub fn result_folders(&self) -> Result<Vec<String>> {
        let cache = self.cache_folder();
        if cache.is_dir() {
            list_folder_names(&cache)
        } else {
            Ok(Vec::new())
        }
    }

    /// Ground-truth folders to evaluate, after checking the cache holds no others.
    fn matched_folders(&self, gt_root: &Path) -> Result<Vec<String>> {
        let folders = self.ground_truth_folders(gt_root)?;
        if folders.is_empty() {
            return Err(Co3dError::NoExamples(gt_root.to_path_buf()));
        }

        let unexpected: Vec<String> = self
            .result_folders()?
            .into_iter()
            .filter(|name| !folders.contains(name))
            .collect();
        if !unexpected.is_empty() {
            return Err(Co3dError::UnexpectedResultFolders(unexpected));
        }
        Ok(folders)
    }

    /// Check completeness and key sets of every folder without scoring.
    ///
    /// Returns the total number of validated examples.
    pub fn validate(&self, gt_root: &Path) -> Result<usize> {
        let mut total = 0;
        for folder in self.matched_folders(gt_root)? {
            let pred_folder = self.existing_result_folder(&folder)?;
            let (ground_truth_files, _) =
                validate_file_folders(&pred_folder, &gt_root.join(&folder))?;
            total += ground_truth_files.len();
        }
        Ok(total)
    }

    /// Evaluate every folder and average the folder averages.
    pub fn evaluate(&self, gt_root: &Path) -> Result<SubmissionReport> {
        let mut per_folder = BTreeMap::new();
        for folder in self.matched_folders(gt_root)? {
            let pred_folder = self.existing_result_folder(&folder)?;
            let report = evaluate_file_folders(&pred_folder, &gt_root.join(&folder))?;
            per_folder.insert(folder, report);
        }

        let folder_averages: Vec<EvalMetrics> = per_folder.values().map(|r| r.average).collect();
        let average = average_metrics(&folder_averages)
            .ok_or_else(|| Co3dError::NoExamples(gt_root.to_path_buf()))?;

        Ok(SubmissionReport {
            task: self.task,
            sequence_set: self.sequence_set,
            average,
            per_folder,
        })
    }

    fn existing_result_folder(&self, folder: &str) -> Result<PathBuf> {
        let pred_folder = self.cache_folder().join(folder);
        if pred_folder.is_dir() {
            Ok(pred_folder)
        } else {
            Err(Co3dError::MissingResultFolder(pred_folder))
        }
    }
}

/// Sorted names of the directories directly inside `dir`.
fn list_folder_names(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Co3dError::io(dir, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Co3dError::io(dir, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Split `<category>_<subset_name>` at the start of the subset name.
fn split_folder_name(name: &str) -> Option<(&str, &str)> {
    [Co3dTask::ManyView, Co3dTask::FewView]
        .iter()
        .filter_map(|task| name.find(&format!("_{}", task.as_str())))
        .min()
        .map(|index| (&name[..index], &name[index + 1..]))
}

// =============================================================================
// TESTS
// =============================================================================
