//! # CO3D Eval Core
//!
//! Evaluation engine for CO3D challenge submissions.
//!
//! A result directory holds one triplet of PNG files per evaluation example:
//!
//! ```text
//! <example>_image.png
//! <example>_mask.png
//! <example>_depth.png
//! <example>_depth_mask.png   (ground truth only, optional)
//! ```
//!
//! The pipeline is:
//! 1. [`get_result_directory_file_names`] scans a directory into [`ResultFiles`]
//! 2. [`check_user_submission_file_paths`] verifies both sides list the same examples
//! 3. [`eval_one`] scores each prediction against its ground truth
//! 4. [`average_metrics`] reduces the per-example scores
//!
//! [`evaluate_file_folders`] runs all four steps.

pub mod archive;
pub mod evaluate;
pub mod frame;
pub mod metrics;
pub mod result_dir;
pub mod submission;
pub mod task;

pub use archive::unzip;
pub use evaluate::{ExampleReport, EvaluationReport, evaluate_file_folders, validate_file_folders};
pub use frame::{GrayF32Image, RgbdaFrame, load_rgbda_frame, store_rgbda_frame};
pub use metrics::{EVAL_METRIC_NAMES, EvalMetric, EvalMetrics, average_metrics, eval_one};
pub use result_dir::{
    ResultFiles, check_user_submission_file_paths, get_result_directory_file_names,
};
pub use submission::{Submission, SubmissionReport};
pub use task::{Co3dSequenceSet, Co3dTask, sequence_set_from_subset_name, task_from_subset_name};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

// =============================================================================
// RESULT TYPE
// =============================================================================

/// The three per-example files every result directory must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Image,
    Mask,
    Depth,
}

impl ResultType {
    /// All result types in scan order.
    pub const ALL: [ResultType; 3] = [ResultType::Image, ResultType::Mask, ResultType::Depth];

    /// Name used in file postfixes and error messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResultType::Image => "image",
            ResultType::Mask => "mask",
            ResultType::Depth => "depth",
        }
    }

    /// File name postfix, e.g. `_image.png`.
    #[must_use]
    pub fn postfix(self) -> String {
        format!("_{}.png", self.as_str())
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Postfix of the optional ground-truth depth validity mask.
pub const DEPTH_MASK_POSTFIX: &str = "_depth_mask.png";

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Errors from CO3D evaluation.
#[derive(Debug, thiserror::Error)]
pub enum Co3dError {
    /// Filesystem operation failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// PNG decoding or encoding failed.
    #[error("Image error at {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Archive could not be read or extracted.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Some examples lack one or more of their image / mask / depth files.
    #[error("Some evaluation examples are incomplete:\n{}", format_incomplete(.0))]
    IncompleteExamples(BTreeMap<String, Vec<ResultType>>),

    /// Ground truth and submission list different examples.
    #[error("{}", format_mismatch(.missing, .unexpected))]
    SubmissionMismatch {
        /// Ground-truth examples absent from the submission.
        missing: Vec<String>,
        /// Submitted examples absent from the ground truth.
        unexpected: Vec<String>,
    },

    /// Two maps that must share a resolution do not.
    #[error("Dimension mismatch for {what}: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        what: String,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Depth maps must be 16-bit single-channel PNGs.
    #[error("Depth map {} is not a 16-bit grayscale PNG", .path.display())]
    UnsupportedDepthFormat { path: PathBuf },

    /// Subset name does not encode a known task or sequence set.
    #[error("Invalid subset name {0}!")]
    InvalidSubsetName(String),

    /// A result was added for a subset belonging to another task or sequence set.
    #[error("Subset {subset_name} does not belong to task {expected_task} / sequence set {expected_set}")]
    SubsetMismatch {
        subset_name: String,
        expected_task: Co3dTask,
        expected_set: Co3dSequenceSet,
    },

    /// There is nothing to average.
    #[error("No evaluation examples found in {}", .0.display())]
    NoExamples(PathBuf),

    /// A ground-truth folder has no prediction counterpart.
    #[error("Missing result folder {}", .0.display())]
    MissingResultFolder(PathBuf),

    /// The prediction cache holds folders with no ground-truth counterpart.
    #[error("Unexpected result folders {}", format_list(.0))]
    UnexpectedResultFolders(Vec<String>),
}

impl Co3dError {
    /// Wrap an I/O error together with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap an image error together with the path it concerns.
    pub fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Image {
            path: path.into(),
            source,
        }
    }
}

fn format_incomplete(missing: &BTreeMap<String, Vec<ResultType>>) -> String {
    missing
        .iter()
        .map(|(name, types)| format!("   {} missing {}", name, format_list(types)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_mismatch(missing: &[String], unexpected: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!(
            "There are missing evaluation examples: {}",
            format_list(missing)
        ));
    }
    if !unexpected.is_empty() {
        parts.push(format!(
            "Unexpected submitted evaluation examples {}",
            format_list(unexpected)
        ));
    }
    parts.join("\n")
}

fn format_list<T: fmt::Display>(items: &[T]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| format!("'{}'", item)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Result alias for CO3D evaluation.
pub type Result<T> = std::result::Result<T, Co3dError>;

// =============================================================================
// TESTS
// =============================================================================
