//! Content-addressable directory search.
//!
//! The walker visits every regular file under a root exactly once, depth
//! first with each directory's entries in name order. Files accepted by the
//! inclusion predicate are hashed (unless duplicates are allowed) and handed
//! to a callback together with whether their content was seen earlier in the
//! same search:
//!
//! - Symlinks and special files are skipped; symlinks are never followed.
//! - A non-recursive search does not descend into any subdirectory.
//! - Any I/O error or callback error ends the search and is returned.

pub mod hash;
pub mod ledger;

pub use hash::HasherFactory;
pub use ledger::HashLedger;

use crate::models::FileRecord;
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Decides whether a file takes part in the search.
pub type IncludeFn<'a> = Box<dyn Fn(&Path) -> bool + 'a>;

/// Receives every included file; an error stops the search.
pub type FoundFn<'a> = Box<dyn FnMut(FileRecord) -> Result<()> + 'a>;

/// Configures a [`find_unique_files`] call.
pub struct SearchConfig<'a> {
    pub target_dir: PathBuf,
    pub recursive: bool,
    /// Skip hashing and report every file as unseen.
    pub allow_duplicates: bool,
    /// SHA-256 is used when unset.
    pub hasher: Option<HasherFactory>,
    pub include: Option<IncludeFn<'a>>,
    pub on_found: Option<FoundFn<'a>>,
}

impl<'a> SearchConfig<'a> {
    #[must_use]
    pub fn new<P: AsRef<Path>>(target_dir: P) -> Self {
        Self {
            target_dir: target_dir.as_ref().to_path_buf(),
            recursive: false,
            allow_duplicates: false,
            hasher: None,
            include: None,
            on_found: None,
        }
    }

    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    #[must_use]
    pub fn allow_duplicates(mut self, allow: bool) -> Self {
        self.allow_duplicates = allow;
        self
    }

    #[must_use]
    pub fn hasher(mut self, factory: HasherFactory) -> Self {
        self.hasher = Some(factory);
        self
    }

    #[must_use]
    pub fn include<F>(mut self, include: F) -> Self
    where
        F: Fn(&Path) -> bool + 'a,
    {
        self.include = Some(Box::new(include));
        self
    }

    #[must_use]
    pub fn on_found<F>(mut self, on_found: F) -> Self
    where
        F: FnMut(FileRecord) -> Result<()> + 'a,
    {
        self.on_found = Some(Box::new(on_found));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.include.is_none() {
            return Err(Error::InvalidInput(
                "an inclusion predicate is required".to_string(),
            ));
        }
        if self.on_found.is_none() {
            return Err(Error::InvalidInput(
                "a found-file callback is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Search a directory, reporting each included file once.
///
/// # Returns
/// The ledger of content hashes observed during the search.
pub fn find_unique_files(config: SearchConfig<'_>) -> Result<HashLedger> {
    let mut walker = FileWalker::new(config)?;
    walker.search()?;
    Ok(walker.ledger)
}

struct FileWalker<'a> {
    root: PathBuf,
    recursive: bool,
    allow_duplicates: bool,
    hasher: HasherFactory,
    include: IncludeFn<'a>,
    on_found: FoundFn<'a>,
    ledger: HashLedger,
}

impl<'a> FileWalker<'a> {
    fn new(config: SearchConfig<'a>) -> Result<Self> {
        config.validate()?;

        let SearchConfig {
            target_dir,
            recursive,
            allow_duplicates,
            hasher,
            include: Some(include),
            on_found: Some(on_found),
        } = config
        else {
            return Err(Error::InvalidInput("incomplete search configuration".to_string()));
        };

        let root = fs::canonicalize(&target_dir).map_err(|source| Error::Traversal {
            path: target_dir.clone(),
            source,
        })?;

        Ok(Self {
            root,
            recursive,
            allow_duplicates,
            hasher: hasher.unwrap_or_else(hash::default_factory),
            include,
            on_found,
            ledger: HashLedger::new(),
        })
    }

    fn search(&mut self) -> Result<()> {
        // Entries are pushed in reverse name order so the smallest pops first.
        let mut pending = vec![self.root.clone()];

        while let Some(path) = pending.pop() {
            let metadata = fs::symlink_metadata(&path).map_err(|source| Error::Traversal {
                path: path.clone(),
                source,
            })?;

            if metadata.is_dir() {
                if path != self.root && !self.recursive {
                    log::debug!("Skipping subdirectory {}", path.display());
                    continue;
                }
                let mut children = list_dir(&path)?;
                children.sort_unstable_by(|a, b| b.cmp(a));
                pending.extend(children);
            } else if metadata.is_file() {
                self.visit_file(path, metadata)?;
            } else {
                log::debug!("Skipping non-regular entry {}", path.display());
            }
        }

        Ok(())
    }

    fn visit_file(&mut self, path: PathBuf, metadata: fs::Metadata) -> Result<()> {
        if !(self.include)(&path) {
            log::trace!("Excluded {}", path.display());
            return Ok(());
        }

        let (hash, first_seen_at) = if self.allow_duplicates {
            (String::new(), None)
        } else {
            let hash = hash::hash_file(&path, (self.hasher)()).map_err(|source| {
                Error::Traversal {
                    path: path.clone(),
                    source,
                }
            })?;
            let first_seen_at = self.ledger.observe(&hash, &path);
            (hash, first_seen_at)
        };

        let parent_dir = path
            .parent()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        log::debug!(
            "Found {} (seen before: {})",
            path.display(),
            first_seen_at.is_some()
        );

        (self.on_found)(FileRecord {
            already_seen: first_seen_at.is_some(),
            first_seen_at,
            parent_dir,
            search_root: self.root.clone(),
            hash,
            metadata,
            path,
        })
    }
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let traversal_error = |source| Error::Traversal {
        path: dir.to_path_buf(),
        source,
    };

    let mut children = Vec::new();
    for entry in fs::read_dir(dir).map_err(traversal_error)? {
        children.push(entry.map_err(traversal_error)?.path());
    }
    Ok(children)
}
