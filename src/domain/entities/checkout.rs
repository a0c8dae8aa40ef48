use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::common::error::MvcError;
use crate::common::result::MvcResult;
use crate::domain::value_objects::RepoType;

/// One working copy under management.
///
/// Identity is the triple of repository type, canonical directory, and
/// module: two descriptions of the same working copy compare equal even
/// when one was found by scanning and the other came from the checkouts
/// file, or when their repository URLs differ in spelling.
#[derive(Debug, Clone, Serialize)]
pub struct Checkout {
    /// The version control system managing this working copy.
    pub repo_type: RepoType,
    /// Local working-copy directory, canonicalized when it exists.
    pub directory: PathBuf,
    /// Module within the repository, if the system distinguishes one.
    pub module: Option<String>,
    /// Repository root or remote URL, when known.
    pub repository: Option<String>,
}

impl Checkout {
    /// Build a checkout description.
    ///
    /// If the directory already exists on disk it must contain the
    /// type's metadata subdirectory; a directory that is absent is
    /// accepted, since a clone has nothing on disk yet.
    pub fn new(
        repo_type: RepoType,
        directory: PathBuf,
        module: Option<String>,
        repository: Option<String>,
    ) -> MvcResult<Self> {
        let directory = canonicalize_lenient(&directory);
        if directory.is_dir() {
            let marker = repo_type.marker_dir();
            if !directory.join(marker).is_dir() {
                return Err(MvcError::directory_missing(directory, marker));
            }
        }
        Ok(Self {
            repo_type,
            directory,
            module,
            repository,
        })
    }

    /// Build a checkout without touching the filesystem. Used by the
    /// scanner, which has already seen the metadata subdirectory.
    pub fn new_unchecked(
        repo_type: RepoType,
        directory: PathBuf,
        module: Option<String>,
        repository: Option<String>,
    ) -> Self {
        Self {
            repo_type,
            directory: canonicalize_lenient(&directory),
            module,
            repository,
        }
    }
}

/// Canonicalize when the path exists, fall back to the given path.
fn canonicalize_lenient(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

impl PartialEq for Checkout {
    fn eq(&self, other: &Self) -> bool {
        self.repo_type == other.repo_type
            && self.directory == other.directory
            && self.module == other.module
    }
}

impl Eq for Checkout {}

impl Hash for Checkout {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.repo_type.hash(state);
        self.directory.hash(state);
        self.module.hash(state);
    }
}

impl fmt::Display for Checkout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.repo_type, self.directory.display())?;
        if let Some(module) = &self.module {
            write!(f, " {module}")?;
        }
        if let Some(repository) = &self.repository {
            write!(f, " ({repository})")?;
        }
        Ok(())
    }
}

/// Insertion-ordered set of checkouts.
///
/// Config entries and scan hits are merged here; a working copy described
/// by both sources appears once, in the position it was first added.
#[derive(Debug, Default)]
pub struct CheckoutSet {
    ordered: Vec<Checkout>,
    seen: HashSet<Checkout>,
}

impl CheckoutSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a checkout, ignoring it if an equal one is already present.
    /// Returns whether the checkout was newly added.
    pub fn insert(&mut self, checkout: Checkout) -> bool {
        if self.seen.contains(&checkout) {
            return false;
        }
        self.seen.insert(checkout.clone());
        self.ordered.push(checkout);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Checkout> {
        self.ordered.iter()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn as_slice(&self) -> &[Checkout] {
        &self.ordered
    }
}

impl<'a> IntoIterator for &'a CheckoutSet {
    type Item = &'a Checkout;
    type IntoIter = std::slice::Iter<'a, Checkout>;

    fn into_iter(self) -> Self::IntoIter {
        self.ordered.iter()
    }
}
