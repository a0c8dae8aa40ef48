use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::common::error::MvcError;
use crate::common::result::MvcResult;
use crate::domain::value_objects::RepoType;

/// A version control metadata directory found while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerHit {
    /// The metadata directory itself, e.g. `/home/u/prj/alpha/.git`.
    pub marker_dir: PathBuf,
    /// The working copy containing it.
    pub parent_dir: PathBuf,
    pub repo_type: RepoType,
}

/// Walk a directory tree looking for working copies.
///
/// Bzr, Git, and Hg keep one metadata directory per checkout, so the
/// walk stops descending at each hit. CVS and SVN historically kept one
/// per directory; stopping at the topmost still finds every distinct
/// checkout, because nested checkouts get their own hit on the way down.
/// The walk never descends into metadata directories themselves: a
/// `.svn` entry committed into a git repository is not a working copy.
pub struct CheckoutScanner {
    ignore_dirs: Vec<PathBuf>,
}

impl CheckoutScanner {
    pub fn new(ignore_dirs: Vec<PathBuf>) -> Self {
        Self { ignore_dirs }
    }

    /// Scan `root` and return every marker directory found, in
    /// name-sorted depth-first order. The root itself must exist.
    pub fn scan(&self, root: &Path) -> MvcResult<Vec<MarkerHit>> {
        if !root.is_dir() {
            return Err(MvcError::SearchRootMissing {
                path: root.to_path_buf(),
            });
        }

        let mut hits = Vec::new();
        let mut walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // Permission problems on one subtree should not stop
                    // the scan of the rest.
                    warn!("cannot read directory during scan: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let path = entry.path();
            if self.ignore_dirs.iter().any(|ignored| ignored == path) {
                debug!(directory = %path.display(), "ignoring directory");
                walker.skip_current_dir();
                continue;
            }
            let marker = entry
                .file_name()
                .to_str()
                .and_then(RepoType::from_marker);
            if let Some(repo_type) = marker {
                if let Some(parent) = path.parent() {
                    hits.push(MarkerHit {
                        marker_dir: path.to_path_buf(),
                        parent_dir: parent.to_path_buf(),
                        repo_type,
                    });
                }
                walker.skip_current_dir();
            }
        }
        Ok(hits)
    }
}
