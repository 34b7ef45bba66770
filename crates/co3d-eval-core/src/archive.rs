//! # Archive Module
//!
//! Extraction of zipped submissions and ground-truth bundles.

use crate::{Co3dError, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Extract every entry of the zip archive at `file_path` into `output_dir`.
///
/// `output_dir` is created if needed. Returns the number of archive entries.
pub fn unzip(file_path: &Path, output_dir: &Path) -> Result<usize> {
    let file = File::open(file_path).map_err(|e| Co3dError::io(file_path, e))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))?;

    std::fs::create_dir_all(output_dir).map_err(|e| Co3dError::io(output_dir, e))?;
    archive.extract(output_dir)?;

    tracing::info!(
        archive = %file_path.display(),
        output = %output_dir.display(),
        entries = archive.len(),
        "extracted archive"
    );
    Ok(archive.len())
}

// =============================================================================
// TESTS
// =============================================================================
