//! # Result Directory Module
//!
//! Matching of per-example result files inside a directory, and the
//! key-set check between a ground-truth and a submitted directory.
//!
//! Only the top level of a directory is scanned. An example is complete when
//! all three of `<name>_image.png`, `<name>_mask.png` and `<name>_depth.png`
//! exist.

use crate::{Co3dError, DEPTH_MASK_POSTFIX, Result, ResultType};
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Example name -> root path (the image path without its `_image.png` postfix).
pub type ResultFiles = BTreeMap<String, PathBuf>;

/// Append a file postfix to an example root path.
#[must_use]
pub fn with_postfix(root: &Path, postfix: &str) -> PathBuf {
    let mut path = OsString::from(root.as_os_str());
    path.push(postfix);
    PathBuf::from(path)
}

/// Scan `result_dir` and map every complete example to its root path.
///
/// Set `has_depth_masks` for ground-truth directories, so that
/// `<name>_depth_mask.png` is not mistaken for the mask of an example called
/// `<name>_depth`.
///
/// Fails with [`Co3dError::IncompleteExamples`] listing every example that
/// lacks at least one of its image / mask / depth files.
pub fn get_result_directory_file_names(
    result_dir: &Path,
    has_depth_masks: bool,
) -> Result<ResultFiles> {
    let file_names = list_file_names(result_dir)?;

    let mut result_type_files: BTreeMap<ResultType, BTreeMap<String, PathBuf>> = BTreeMap::new();
    for result_type in ResultType::ALL {
        let postfix = result_type.postfix();
        let matching = file_names
            .iter()
            .filter(|name| {
                !(has_depth_masks
                    && result_type == ResultType::Mask
                    && name.ends_with(DEPTH_MASK_POSTFIX))
            })
            .filter_map(|name| {
                let example = name.strip_suffix(postfix.as_str())?;
                Some((example.to_string(), result_dir.join(name)))
            })
            .collect();
        result_type_files.insert(result_type, matching);
    }

    let example_names: BTreeSet<&String> = result_type_files
        .values()
        .flat_map(|files| files.keys())
        .collect();

    let mut missing_examples: BTreeMap<String, Vec<ResultType>> = BTreeMap::new();
    for example_name in &example_names {
        for result_type in ResultType::ALL {
            let present = result_type_files
                .get(&result_type)
                .is_some_and(|files| files.contains_key(*example_name));
            if !present {
                missing_examples
                    .entry((*example_name).clone())
                    .or_default()
                    .push(result_type);
            }
        }
    }

    if !missing_examples.is_empty() {
        return Err(Co3dError::IncompleteExamples(missing_examples));
    }

    Ok(example_names
        .into_iter()
        .map(|name| (name.clone(), result_dir.join(name)))
        .collect())
}

/// Verify that the submission lists exactly the ground-truth examples.
///
/// Fails with [`Co3dError::SubmissionMismatch`] carrying the full symmetric
/// difference, sorted.
pub fn check_user_submission_file_paths(
    ground_truth_files: &ResultFiles,
    user_submission_files: &ResultFiles,
) -> Result<()> {
    let missing: Vec<String> = ground_truth_files
        .keys()
        .filter(|name| !user_submission_files.contains_key(*name))
        .cloned()
        .collect();

    let unexpected: Vec<String> = user_submission_files
        .keys()
        .filter(|name| !ground_truth_files.contains_key(*name))
        .cloned()
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        Ok(())
    } else {
        Err(Co3dError::SubmissionMismatch {
            missing,
            unexpected,
        })
    }
}

/// Sorted names of the regular files directly inside `dir`.
fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Co3dError::io(dir, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Co3dError::io(dir, e))?;
        if !entry.path().is_file() {
            continue;
        }
        // Non UTF-8 names cannot follow the naming convention
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        // Hidden files never match, as with a shell glob
        if !name.starts_with('.') {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

// =============================================================================
// TESTS
// =============================================================================
