//! Integration test for configuration errors

use bulkdecomp::{Error, RunOptions};
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_invalid_path_error() {
    let opts = RunOptions::new("/definitely/does/not/exist/xyz123");
    let err = bulkdecomp::run(&opts).unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(err.to_string().contains("does not exist"));
}

#[test]
fn test_file_instead_of_directory() {
    let temp_file = NamedTempFile::new().unwrap();
    let err = bulkdecomp::run(&RunOptions::new(temp_file.path())).unwrap_err();

    assert!(err.to_string().contains("not a directory"));
}

#[test]
fn test_empty_extension_list() {
    let temp_dir = TempDir::new().unwrap();
    let mut opts = RunOptions::new(temp_dir.path());
    opts.extensions.clear();

    assert!(matches!(opts.validate(), Err(Error::InvalidInput(_))));
}

#[test]
fn test_zero_workers() {
    let temp_dir = TempDir::new().unwrap();
    let mut opts = RunOptions::new(temp_dir.path());
    opts.workers = 0;

    let err = bulkdecomp::run(&opts).unwrap_err();
    assert!(err.to_string().contains("at least 1"));
}

#[test]
fn test_default_output_dir_uses_target_name() {
    let opts = RunOptions::new("/srv/builds/Managed");
    assert_eq!(opts.output_dir, std::path::PathBuf::from("Managed"));
}

#[test]
fn test_empty_directory_runs_cleanly() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("empty");
    std::fs::create_dir(&input).unwrap();

    let mut opts = RunOptions::new(&input);
    opts.output_dir = temp_dir.path().join("out");
    opts.report = bulkdecomp::ReportMode::Silent;

    let summary = bulkdecomp::run(&opts).unwrap();
    assert_eq!(summary.discovered, 0);
    assert!(!opts.output_dir.exists(), "nothing to decompile, nothing created");
}
