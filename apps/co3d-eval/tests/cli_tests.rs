//! Integration tests for co3d-eval CLI commands.
//!
//! Uses tempfile for testing file-based operations.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use co3d_eval::cli::{
    Cli, CliError, Commands, SubmissionTarget, cmd_check, cmd_evaluate, cmd_list, cmd_subset,
    cmd_submission_evaluate, cmd_submission_validate, cmd_unzip, run,
};
use co3d_eval_core::{
    Co3dError, Co3dSequenceSet, Co3dTask, RgbdaFrame, Submission, store_rgbda_frame,
};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Create a temporary directory for tests.
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Write one example into `dir`.
fn write_example(dir: &Path, name: &str, frame: &RgbdaFrame) {
    std::fs::create_dir_all(dir).unwrap();
    store_rgbda_frame(frame, &dir.join(name)).unwrap();
}

/// Ground-truth and prediction folders with two examples.
///
/// `a` is predicted perfectly, `b` has white pixels where the truth is black.
fn create_folder_pair(temp: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
    let gt = temp.path().join("gt");
    let pred = temp.path().join("pred");
    let truth = RgbdaFrame::uniform(4, 4, [0.0; 3], 1.0, 2.0);

    write_example(&gt, "a", &truth);
    write_example(&gt, "b", &truth);
    write_example(&pred, "a", &truth);
    write_example(&pred, "b", &RgbdaFrame::uniform(4, 4, [1.0; 3], 1.0, 2.0));

    (pred, gt)
}

fn submission_target(submission: &Path, gt_root: &Path) -> SubmissionTarget {
    SubmissionTarget {
        submission: submission.to_path_buf(),
        gt_root: gt_root.to_path_buf(),
        task: Co3dTask::FewView,
        sequence_set: Co3dSequenceSet::Dev,
    }
}

// =============================================================================
// EVALUATE COMMAND TESTS
// =============================================================================

#[test]
fn test_evaluate_matching_folders() {
    let temp = create_temp_dir();
    let (pred, gt) = create_folder_pair(&temp);

    let report = cmd_evaluate(&pred, &gt, false, false, None).unwrap();

    assert_eq!(report.example_count(), 2);
    // mean of 100 dB (perfect) and 0 dB (maximal error)
    assert!((report.average.psnr_full_image - 50.0).abs() < 1e-6);
    assert!((report.average.iou - 1.0).abs() < 1e-9);
}

#[test]
fn test_evaluate_json_mode_with_output_file() {
    let temp = create_temp_dir();
    let (pred, gt) = create_folder_pair(&temp);
    let output = temp.path().join("reports/result.json");

    cmd_evaluate(&pred, &gt, true, true, Some(&output)).unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["per_example"].as_array().map(Vec::len), Some(2));
    assert_eq!(written["per_example"][0]["example_name"], "a");
    assert!(written["average"]["psnr_masked"].is_number());
}

#[test]
fn test_evaluate_rejects_extra_prediction() {
    let temp = create_temp_dir();
    let (pred, gt) = create_folder_pair(&temp);
    write_example(&pred, "c", &RgbdaFrame::uniform(4, 4, [0.0; 3], 1.0, 2.0));

    let err = cmd_evaluate(&pred, &gt, false, false, None).unwrap_err();
    match err {
        CliError::Core(Co3dError::SubmissionMismatch {
            missing,
            unexpected,
        }) => {
            assert!(missing.is_empty());
            assert_eq!(unexpected, vec!["c".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_evaluate_rejects_incomplete_prediction() {
    let temp = create_temp_dir();
    let (pred, gt) = create_folder_pair(&temp);
    std::fs::remove_file(pred.join("b_mask.png")).unwrap();

    let err = cmd_evaluate(&pred, &gt, false, false, None).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Some evaluation examples are incomplete"));
    assert!(message.contains("b missing ['mask']"));
}

#[test]
fn test_evaluate_rejects_resolution_mismatch() {
    let temp = create_temp_dir();
    let (pred, gt) = create_folder_pair(&temp);
    write_example(&pred, "b", &RgbdaFrame::uniform(2, 2, [0.0; 3], 1.0, 2.0));

    let err = cmd_evaluate(&pred, &gt, false, false, None).unwrap_err();
    assert!(matches!(
        err,
        CliError::Core(Co3dError::DimensionMismatch { .. })
    ));
}

// =============================================================================
// CHECK AND LIST COMMAND TESTS
// =============================================================================

#[test]
fn test_check_counts_examples() {
    let temp = create_temp_dir();
    let (pred, gt) = create_folder_pair(&temp);

    assert_eq!(cmd_check(&pred, &gt, false).unwrap(), 2);
    assert_eq!(cmd_check(&pred, &gt, true).unwrap(), 2);
}

#[test]
fn test_check_reports_missing_example() {
    let temp = create_temp_dir();
    let (pred, gt) = create_folder_pair(&temp);
    for suffix in ["image", "mask", "depth"] {
        std::fs::remove_file(pred.join(format!("a_{}.png", suffix))).unwrap();
    }

    let err = cmd_check(&pred, &gt, false).unwrap_err();
    assert!(
        err.to_string()
            .contains("There are missing evaluation examples: ['a']")
    );
}

#[test]
fn test_list_ground_truth_with_depth_masks() {
    let temp = create_temp_dir();
    let (_, gt) = create_folder_pair(&temp);
    std::fs::copy(gt.join("a_mask.png"), gt.join("a_depth_mask.png")).unwrap();

    let files = cmd_list(&gt, true, true).unwrap();
    assert_eq!(files.len(), 2);

    // without the flag the depth mask looks like an incomplete example
    assert!(cmd_list(&gt, false, false).is_err());
}

// =============================================================================
// SUBSET AND UNZIP COMMAND TESTS
// =============================================================================

#[test]
fn test_subset_decodes_name() {
    let (task, set) = cmd_subset("fewview_test", false).unwrap();
    assert_eq!(task, Co3dTask::FewView);
    assert_eq!(set, Co3dSequenceSet::Test);
}

#[test]
fn test_subset_invalid_name() {
    let result = cmd_subset("allview_dev", true);
    assert!(result.is_err());
}

#[test]
fn test_unzip_then_evaluate() {
    let temp = create_temp_dir();
    let (pred, gt) = create_folder_pair(&temp);

    let archive_path = temp.path().join("pred.zip");
    let mut writer = zip_writer(&archive_path);
    for entry in std::fs::read_dir(&pred).unwrap() {
        let path = entry.unwrap().path();
        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        writer
            .start_file(name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(&std::fs::read(&path).unwrap()).unwrap();
    }
    writer.finish().unwrap();

    let extracted = temp.path().join("extracted");
    assert_eq!(cmd_unzip(&archive_path, &extracted, false).unwrap(), 6);

    let report = cmd_evaluate(&extracted, &gt, true, false, None).unwrap();
    assert_eq!(report.example_count(), 2);
}

fn zip_writer(path: &Path) -> zip::ZipWriter<std::fs::File> {
    zip::ZipWriter::new(std::fs::File::create(path).unwrap())
}

// =============================================================================
// SUBMISSION COMMAND TESTS
// =============================================================================

#[test]
fn test_submission_evaluate_and_validate() {
    let temp = create_temp_dir();
    let output = temp.path().join("submission");
    let gt_root = temp.path().join("gt_root");
    let frame = RgbdaFrame::uniform(4, 4, [0.25; 3], 1.0, 3.0);

    let submission = Submission::new(Co3dTask::FewView, Co3dSequenceSet::Dev, &output);
    for category in ["apple", "hydrant"] {
        submission
            .add_result(category, "fewview_dev", "42_1_3", 5, &frame)
            .unwrap();
        write_example(
            &gt_root.join(format!("{}_fewview_dev", category)),
            "42_1_3_5",
            &frame,
        );
    }

    let target = submission_target(&output, &gt_root);
    assert_eq!(cmd_submission_validate(&target, false).unwrap(), 2);

    let report = cmd_submission_evaluate(&target, true, None).unwrap();
    assert_eq!(report.per_folder.len(), 2);
    assert!((report.average.iou - 1.0).abs() < 1e-9);
    assert!(report.average.depth_abs_fg.abs() < 1e-9);
}

#[test]
fn test_submission_extra_folder() {
    let temp = create_temp_dir();
    let output = temp.path().join("submission");
    let gt_root = temp.path().join("gt_root");
    let frame = RgbdaFrame::uniform(2, 2, [0.0; 3], 1.0, 1.0);

    write_example(&gt_root.join("apple_fewview_dev"), "seq_0", &frame);
    write_example(&output.join("submission_cache/apple_fewview_dev"), "seq_0", &frame);
    write_example(&output.join("submission_cache/zebra_fewview_dev"), "seq_0", &frame);

    let target = submission_target(&output, &gt_root);
    let err = cmd_submission_validate(&target, false).unwrap_err();
    match err {
        CliError::Core(Co3dError::UnexpectedResultFolders(folders)) => {
            assert_eq!(folders, vec!["zebra_fewview_dev".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_submission_without_ground_truth() {
    let temp = create_temp_dir();
    let output = temp.path().join("submission");
    let gt_root = temp.path().join("gt_root");
    std::fs::create_dir_all(&gt_root).unwrap();
    write_example(
        &output.join("submission_cache/apple_fewview_dev"),
        "seq_0",
        &RgbdaFrame::uniform(2, 2, [0.0; 3], 1.0, 1.0),
    );

    let target = submission_target(&output, &gt_root);
    let err = cmd_submission_validate(&target, false).unwrap_err();
    assert!(matches!(err, CliError::Core(Co3dError::NoExamples(_))));
}

#[test]
fn test_submission_missing_folder() {
    let temp = create_temp_dir();
    let gt_root = temp.path().join("gt_root");
    write_example(
        &gt_root.join("apple_fewview_dev"),
        "seq_0",
        &RgbdaFrame::uniform(2, 2, [0.0; 3], 1.0, 1.0),
    );

    let target = submission_target(&temp.path().join("empty_submission"), &gt_root);
    let err = cmd_submission_validate(&target, false).unwrap_err();
    assert!(matches!(
        err,
        CliError::Core(Co3dError::MissingResultFolder(_))
    ));
}

// =============================================================================
// ARGUMENT PARSING TESTS
// =============================================================================

#[test]
fn test_parse_evaluate_arguments() {
    let cli = Cli::try_parse_from([
        "co3d-eval",
        "--json",
        "evaluate",
        "--pred",
        "p",
        "--gt",
        "g",
        "--per-example",
    ])
    .unwrap();

    assert!(cli.json);
    match cli.command {
        Commands::Evaluate {
            pred,
            gt,
            per_example,
            output,
        } => {
            assert_eq!(pred, Path::new("p"));
            assert_eq!(gt, Path::new("g"));
            assert!(per_example);
            assert!(output.is_none());
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_parse_submission_task_values() {
    let cli = Cli::try_parse_from([
        "co3d-eval",
        "submission",
        "validate",
        "--submission",
        "out",
        "--gt-root",
        "gt",
        "--task",
        "manyview",
        "--sequence-set",
        "test",
    ])
    .unwrap();
    assert!(matches!(cli.command, Commands::Submission { .. }));

    let bad = Cli::try_parse_from([
        "co3d-eval",
        "submission",
        "validate",
        "--submission",
        "out",
        "--gt-root",
        "gt",
        "--task",
        "someview",
        "--sequence-set",
        "test",
    ]);
    assert!(bad.is_err());
}

#[test]
fn test_run_dispatches_check() {
    let temp = create_temp_dir();
    let (pred, gt) = create_folder_pair(&temp);

    let cli = Cli::try_parse_from([
        "co3d-eval",
        "check",
        "--pred",
        pred.to_str().unwrap(),
        "--gt",
        gt.to_str().unwrap(),
    ])
    .unwrap();
    assert!(run(cli).is_ok());
}
