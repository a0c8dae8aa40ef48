use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version control system backing a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoType {
    /// Bazaar
    Bzr,
    /// CVS
    Cvs,
    /// Git
    Git,
    /// Mercurial
    Hg,
    /// Subversion
    Svn,
}

impl fmt::Display for RepoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoType::Bzr => write!(f, "bzr"),
            RepoType::Cvs => write!(f, "cvs"),
            RepoType::Git => write!(f, "git"),
            RepoType::Hg => write!(f, "hg"),
            RepoType::Svn => write!(f, "svn"),
        }
    }
}

impl FromStr for RepoType {
    type Err = RepoTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bzr" | "bazaar" => Ok(RepoType::Bzr),
            "cvs" => Ok(RepoType::Cvs),
            "git" => Ok(RepoType::Git),
            "hg" | "mercurial" => Ok(RepoType::Hg),
            "svn" | "subversion" => Ok(RepoType::Svn),
            _ => Err(RepoTypeError::Unsupported(s.to_string())),
        }
    }
}

impl RepoType {
    /// All repository types known to the tool.
    pub const ALL: [RepoType; 5] = [
        RepoType::Bzr,
        RepoType::Cvs,
        RepoType::Git,
        RepoType::Hg,
        RepoType::Svn,
    ];

    /// The metadata subdirectory that marks a working copy of this type.
    pub fn marker_dir(&self) -> &'static str {
        match self {
            RepoType::Bzr => ".bzr",
            RepoType::Cvs => "CVS",
            RepoType::Git => ".git",
            RepoType::Hg => ".hg",
            RepoType::Svn => ".svn",
        }
    }

    /// The default executable name for this VCS.
    pub fn executable_name(&self) -> &'static str {
        match self {
            RepoType::Bzr => "bzr",
            RepoType::Cvs => "cvs",
            RepoType::Git => "git",
            RepoType::Hg => "hg",
            RepoType::Svn => "svn",
        }
    }

    /// Recognize a directory name as a marker subdirectory.
    pub fn from_marker(name: &str) -> Option<RepoType> {
        match name {
            ".bzr" => Some(RepoType::Bzr),
            "CVS" => Some(RepoType::Cvs),
            ".git" => Some(RepoType::Git),
            ".hg" => Some(RepoType::Hg),
            ".svn" => Some(RepoType::Svn),
            _ => None,
        }
    }

    /// Whether the metadata directory repeats in every subdirectory of a
    /// working copy (CVS and pre-1.7-style SVN layouts), forcing a scan to
    /// visit every directory instead of only top-level markers.
    pub fn has_per_directory_metadata(&self) -> bool {
        matches!(self, RepoType::Cvs | RepoType::Svn)
    }

    /// Whether checkouts of this type carry a module component in their
    /// identity (CVS always, SVN optionally).
    pub fn uses_module(&self) -> bool {
        matches!(self, RepoType::Cvs | RepoType::Svn)
    }
}

/// Errors that can occur when parsing a repository type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoTypeError {
    /// The given name is not a supported VCS.
    Unsupported(String),
}

impl fmt::Display for RepoTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoTypeError::Unsupported(name) => write!(
                f,
                "unsupported repository type: '{}'; supported types are: bzr, cvs, git, hg, svn",
                name
            ),
        }
    }
}

impl std::error::Error for RepoTypeError {}
