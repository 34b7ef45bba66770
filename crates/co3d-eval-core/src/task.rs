//! # Task Module
//!
//! Challenge tasks and sequence sets, and their encoding in subset names.
//!
//! Subset names look like `manyview_dev_0`, `fewview_test` or
//! `manyview_train_1`: the prefix selects the task and the second
//! `_`-separated token selects the sequence set.

use crate::{Co3dError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two CO3D challenge tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Co3dTask {
    /// Reconstruct from many known views of one sequence.
    #[serde(rename = "manyview")]
    ManyView,
    /// Reconstruct from a handful of source views per evaluation frame.
    #[serde(rename = "fewview")]
    FewView,
}

impl Co3dTask {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Co3dTask::ManyView => "manyview",
            Co3dTask::FewView => "fewview",
        }
    }
}

impl fmt::Display for Co3dTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Co3dTask {
    type Err = Co3dError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "manyview" => Ok(Co3dTask::ManyView),
            "fewview" => Ok(Co3dTask::FewView),
            other => Err(Co3dError::InvalidSubsetName(other.to_string())),
        }
    }
}

/// Sequence sets a subset can be drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Co3dSequenceSet {
    Train,
    Dev,
    /// Hidden test set. Ground truth is only available on the server.
    Test,
}

impl Co3dSequenceSet {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Co3dSequenceSet::Train => "train",
            Co3dSequenceSet::Dev => "dev",
            Co3dSequenceSet::Test => "test",
        }
    }
}

impl fmt::Display for Co3dSequenceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Co3dSequenceSet {
    type Err = Co3dError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "train" => Ok(Co3dSequenceSet::Train),
            "dev" => Ok(Co3dSequenceSet::Dev),
            "test" => Ok(Co3dSequenceSet::Test),
            other => Err(Co3dError::InvalidSubsetName(other.to_string())),
        }
    }
}

/// Determine the task a subset belongs to from its prefix.
pub fn task_from_subset_name(subset_name: &str) -> Result<Co3dTask> {
    if subset_name.starts_with("manyview") {
        Ok(Co3dTask::ManyView)
    } else if subset_name.starts_with("fewview") {
        Ok(Co3dTask::FewView)
    } else {
        Err(Co3dError::InvalidSubsetName(subset_name.to_string()))
    }
}

/// Determine the sequence set a subset belongs to from its second token.
pub fn sequence_set_from_subset_name(subset_name: &str) -> Result<Co3dSequenceSet> {
    subset_name
        .split('_')
        .nth(1)
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| Co3dError::InvalidSubsetName(subset_name.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================
