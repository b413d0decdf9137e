//! Unit tests for the deduplicating directory search

use crate::fixtures::{create_input_tree, write_file};
use bulkdecomp::services::traverse::hash::{self, HasherFactory};
use bulkdecomp::services::traverse::{HashLedger, SearchConfig, find_unique_files};
use bulkdecomp::{Error, FileRecord};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

fn collect(config: SearchConfig<'_>) -> (Vec<FileRecord>, usize) {
    let mut found = Vec::new();
    let ledger = find_unique_files(config.on_found(|record| {
        found.push(record);
        Ok(())
    }))
    .expect("search should succeed");
    (found, ledger.len())
}

fn names(records: &[FileRecord], root: &Path) -> Vec<String> {
    records
        .iter()
        .map(|r| {
            r.path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

fn any_file(_: &Path) -> bool {
    true
}

#[test]
fn duplicate_content_is_flagged_on_second_occurrence() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_input_tree(temp_dir.path()).unwrap();
    let canonical = root.canonicalize().unwrap();

    let config = SearchConfig::new(&root).include(|p: &Path| {
        p.extension().is_some_and(|e| e == "dll")
    });
    let (found, ledger_len) = collect(config);

    assert_eq!(names(&found, &canonical), vec!["a.dll", "b.dll"]);
    assert!(!found[0].already_seen);
    assert!(found[1].already_seen);
    assert_eq!(found[0].hash, found[1].hash);
    assert_eq!(found[1].first_seen_at.as_deref(), Some(found[0].path.as_path()));
    assert_eq!(ledger_len, 1, "the duplicate must not grow the ledger");
}

#[test]
fn distinct_content_is_never_flagged() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("bins");
    write_file(root.join("one.dll"), b"first").unwrap();
    write_file(root.join("two.dll"), b"second").unwrap();

    let (found, ledger_len) = collect(SearchConfig::new(&root).include(any_file));

    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|r| !r.already_seen));
    assert!(found.iter().all(|r| r.first_seen_at.is_none()));
    assert_ne!(found[0].hash, found[1].hash);
    assert_eq!(ledger_len, 2);
}

#[test]
fn hash_is_hex_sha256_of_content() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("bins");
    write_file(root.join("lib.dll"), b"payload").unwrap();

    let (found, _) = collect(SearchConfig::new(&root).include(any_file));

    let expected = format!("{:x}", Sha256::digest(b"payload"));
    assert_eq!(found[0].hash, expected);
    assert_eq!(found[0].metadata.len(), 7);
    assert!(found[0].metadata.is_file());
}

#[test]
fn allow_duplicates_skips_hashing_entirely() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_input_tree(temp_dir.path()).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let factory: HasherFactory = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        hash::sha256()
    });

    let config = SearchConfig::new(&root)
        .allow_duplicates(true)
        .hasher(factory)
        .include(|p: &Path| p.extension().is_some_and(|e| e == "dll"));
    let (found, ledger_len) = collect(config);

    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|r| !r.already_seen && r.hash.is_empty()));
    assert_eq!(ledger_len, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn excluded_files_are_not_hashed() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_input_tree(temp_dir.path()).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let factory: HasherFactory = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        hash::sha256()
    });

    let config = SearchConfig::new(&root)
        .hasher(factory)
        .include(|p: &Path| p.extension().is_some_and(|e| e == "txt"));
    let (found, _) = collect(config);

    assert_eq!(found.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn returned_ledger_remembers_first_occurrence() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_input_tree(temp_dir.path()).unwrap();

    let mut found = Vec::new();
    let ledger = find_unique_files(
        SearchConfig::new(&root)
            .recursive(true)
            .include(|p: &Path| p.extension().is_some_and(|e| e == "dll"))
            .on_found(|record| {
                found.push(record);
                Ok(())
            }),
    )
    .unwrap();

    assert!(!ledger.is_empty());
    assert_eq!(ledger.len(), 2);
    let a = &found[0];
    assert!(a.path.ends_with("a.dll"));
    assert_eq!(ledger.first_seen(&a.hash), Some(a.path.as_path()));
    assert_eq!(ledger.first_seen("0000"), None);
}

#[test]
fn ledger_observe_keeps_the_first_path() {
    let mut ledger = HashLedger::new();
    assert!(ledger.is_empty());

    assert_eq!(ledger.observe("abc", Path::new("/in/first.dll")), None);
    assert_eq!(
        ledger.observe("abc", Path::new("/in/second.dll")),
        Some(PathBuf::from("/in/first.dll"))
    );
    assert_eq!(ledger.first_seen("abc"), Some(Path::new("/in/first.dll")));
    assert_eq!(ledger.len(), 1);
}

#[test]
fn non_recursive_search_reports_only_top_level() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_input_tree(temp_dir.path()).unwrap();
    let canonical = root.canonicalize().unwrap();

    let (found, _) = collect(SearchConfig::new(&root).include(any_file));

    assert_eq!(names(&found, &canonical), vec!["a.dll", "b.dll", "c.txt"]);
    assert!(found.iter().all(|r| r.parent_dir == canonical));
}

#[test]
fn recursive_search_descends_in_name_order() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_input_tree(temp_dir.path()).unwrap();
    write_file(root.join("sub/deeper/e.dll"), b"assembly-e").unwrap();
    let canonical = root.canonicalize().unwrap();

    let (found, _) = collect(SearchConfig::new(&root).recursive(true).include(any_file));

    assert_eq!(
        names(&found, &canonical),
        vec!["a.dll", "b.dll", "c.txt", "sub/d.dll", "sub/deeper/e.dll"]
    );
    let nested = found.iter().find(|r| r.path.ends_with("sub/d.dll")).unwrap();
    assert_eq!(nested.parent_dir, canonical.join("sub"));
    assert_eq!(nested.search_root, canonical);
}

#[test]
fn duplicates_across_directories_are_detected() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("bins");
    write_file(root.join("x/lib.dll"), b"shared").unwrap();
    write_file(root.join("y/lib.dll"), b"shared").unwrap();

    let (found, ledger_len) = collect(SearchConfig::new(&root).recursive(true).include(any_file));

    assert_eq!(found.len(), 2);
    assert!(!found[0].already_seen);
    assert!(found[1].already_seen);
    assert!(found[0].path.ends_with("x/lib.dll"));
    assert_eq!(ledger_len, 1);
}

#[cfg(unix)]
#[test]
fn symlinks_are_not_followed() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("bins");
    write_file(root.join("real.dll"), b"real").unwrap();
    write_file(temp_dir.path().join("elsewhere/hidden.dll"), b"hidden").unwrap();
    std::os::unix::fs::symlink(root.join("real.dll"), root.join("link.dll")).unwrap();
    std::os::unix::fs::symlink(temp_dir.path().join("elsewhere"), root.join("linked-dir")).unwrap();

    let (found, _) = collect(SearchConfig::new(&root).recursive(true).include(any_file));

    let found: Vec<PathBuf> = found.into_iter().map(|r| r.path).collect();
    assert_eq!(found.len(), 1);
    assert!(found[0].ends_with("real.dll"));
}

#[test]
fn callback_error_stops_the_search() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_input_tree(temp_dir.path()).unwrap();

    let mut visits = 0;
    let result = find_unique_files(SearchConfig::new(&root).include(any_file).on_found(|_| {
        visits += 1;
        Err(Error::InvalidInput("stop here".to_string()))
    }));

    assert!(matches!(result, Err(Error::InvalidInput(ref msg)) if msg == "stop here"));
    assert_eq!(visits, 1);
}

#[test]
fn missing_predicate_or_callback_fails_validation() {
    let temp_dir = TempDir::new().unwrap();

    let no_predicate = SearchConfig::new(temp_dir.path()).on_found(|_| Ok(()));
    assert!(matches!(
        find_unique_files(no_predicate),
        Err(Error::InvalidInput(_))
    ));

    let no_callback = SearchConfig::new(temp_dir.path()).include(any_file);
    assert!(matches!(
        find_unique_files(no_callback),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn missing_root_is_a_traversal_error() {
    let temp_dir = TempDir::new().unwrap();
    let config = SearchConfig::new(temp_dir.path().join("nope"))
        .include(any_file)
        .on_found(|_| Ok(()));

    assert!(matches!(
        find_unique_files(config),
        Err(Error::Traversal { .. })
    ));
}
