use std::path::Path;

use git2::Repository;
use tracing::debug;

/// The URL of the `origin` remote for the working copy at `directory`,
/// or `None` if the repository cannot be opened or has no such remote.
///
/// Discovery must not fail just because one repository is odd (bare,
/// corrupt, freshly `git init`ed), so every error degrades to `None`.
pub fn origin_url(directory: &Path) -> Option<String> {
    let repo = match Repository::open(directory) {
        Ok(repo) => repo,
        Err(e) => {
            debug!(directory = %directory.display(), error = %e, "cannot open git repository");
            return None;
        }
    };
    let remote = repo.find_remote("origin").ok()?;
    remote.url().map(String::from)
}
