use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while assembling or processing the checkout set.
///
/// Fatal variants carry their process exit code via [`MvcError::exit_code`]:
/// argument and configuration problems exit with 1, broken filesystem
/// preconditions (missing search roots, uncreatable clone parents, SVN
/// working copies without a repository root) exit with 2.
#[derive(Error, Debug)]
pub enum MvcError {
    #[error("{}:{line}: directory entry before any section header", .file.display())]
    ConfigFormat { file: PathBuf, line: usize },

    #[error("problem reading file {}: {source}", .path.display())]
    ConfigUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("directory {} exists but {marker} subdirectory does not exist", .directory.display())]
    DirectoryMissing {
        directory: PathBuf,
        marker: &'static str,
    },

    #[error("directory in which to search for checkouts is not a directory: {}", .path.display())]
    SearchRootMissing { path: PathBuf },

    #[error(
        "old svn working copy in {} has no repository root; check it out again to get one",
        .directory.display()
    )]
    RepositoryRootUnavailable { directory: PathBuf },

    #[error("could not create directory: {}", .path.display())]
    ParentDirectoryUncreatable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not run {command}: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("file system operation failed: {message}")]
    FileSystem {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("{0}")]
    Serialization(String),

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl MvcError {
    pub fn config_unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigUnreadable {
            path: path.into(),
            source,
        }
    }

    pub fn directory_missing(directory: impl Into<PathBuf>, marker: &'static str) -> Self {
        Self::DirectoryMissing {
            directory: directory.into(),
            marker,
        }
    }

    pub fn launch(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::Launch {
            command: command.into(),
            source,
        }
    }

    pub fn filesystem(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::FileSystem {
            message: message.into(),
            path,
            source: None,
        }
    }

    pub fn filesystem_with_source(
        message: impl Into<String>,
        path: Option<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            message: message.into(),
            path,
            source: Some(source),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Process exit code for a fatal occurrence of this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigFormat { .. } => 1,
            Self::SearchRootMissing { .. }
            | Self::RepositoryRootUnavailable { .. }
            | Self::ParentDirectoryUncreatable { .. }
            | Self::FileSystem { .. }
            | Self::Internal { .. } => 2,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for MvcError {
    fn from(error: std::io::Error) -> Self {
        Self::filesystem_with_source("file system operation failed", None, error)
    }
}

impl From<serde_json::Error> for MvcError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON serialization failed: {error}"))
    }
}

impl From<serde_yaml::Error> for MvcError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Serialization(format!("YAML serialization failed: {error}"))
    }
}
