use std::fs;
use std::path::Path;

use tracing::debug;
use url::Url;

use crate::common::error::MvcError;
use crate::common::result::MvcResult;
use crate::domain::entities::Checkout;
use crate::domain::value_objects::RepoType;
use crate::infrastructure::filesystem::scanner::MarkerHit;
use crate::infrastructure::scm::path_align::{self, strip_common_suffix};
use crate::infrastructure::scm::{git_remote, hgrc, svn_info};

/// Turn a metadata directory found by the scanner into a checkout
/// description.
///
/// Returns `Ok(None)` for directories that turn out not to be usable
/// working copies (a `CVS` directory without its control files, an
/// unreadable svn working copy). Only an svn working copy with no
/// recorded repository root is fatal, since every svn checkout we could
/// act on must have one.
pub async fn checkout_for(hit: &MarkerHit, svn_executable: &str) -> MvcResult<Option<Checkout>> {
    match hit.repo_type {
        RepoType::Cvs => checkout_for_cvs(hit),
        RepoType::Svn => checkout_for_svn(hit, svn_executable).await,
        RepoType::Hg => {
            let repository = hgrc::remote_url(&hit.marker_dir);
            Ok(Some(Checkout::new_unchecked(
                RepoType::Hg,
                hit.parent_dir.clone(),
                None,
                repository,
            )))
        }
        RepoType::Git => {
            let repository = git_remote::origin_url(&hit.parent_dir);
            Ok(Some(Checkout::new_unchecked(
                RepoType::Git,
                hit.parent_dir.clone(),
                None,
                repository,
            )))
        }
        RepoType::Bzr => Ok(Some(Checkout::new_unchecked(
            RepoType::Bzr,
            hit.parent_dir.clone(),
            None,
            None,
        ))),
    }
}

/// CVS records the repository-relative path in `CVS/Repository` and the
/// root in `CVS/Root`. The working-copy directory and the in-repository
/// path share a suffix; stripping it lets a single checkouts-file line
/// cover a whole tree of checkouts under one containing directory.
fn checkout_for_cvs(hit: &MarkerHit) -> MvcResult<Option<Checkout>> {
    let path_in_repo = match fs::read_to_string(hit.marker_dir.join("Repository")) {
        Ok(contents) => contents.trim().to_string(),
        Err(_) => return Ok(None),
    };
    let root = match fs::read_to_string(hit.marker_dir.join("Root")) {
        Ok(contents) => contents.trim().to_string(),
        Err(_) => return Ok(None),
    };

    let repo_path = Path::new(&path_in_repo);
    let repo_path_root = path_align::path_root(repo_path);
    let stripped = strip_common_suffix(&hit.parent_dir, repo_path, Some(repo_path_root), Some("CVS"));
    let Some(directory) = stripped.local else {
        return Err(MvcError::internal(format!(
            "dir ({}) is parent of path in repo ({path_in_repo})",
            hit.parent_dir.display()
        )));
    };
    let module = match stripped.remote {
        Some(remote) => remote.to_string_lossy().into_owned(),
        None => directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    Ok(Some(Checkout::new_unchecked(
        RepoType::Cvs,
        directory,
        Some(module),
        Some(root),
    )))
}

/// For svn the URL and the repository root come from `svn info`. The
/// checkout is recorded with the URL rewritten to the stripped
/// in-repository path, so a containing-directory entry in the checkouts
/// file matches every working copy beneath it.
async fn checkout_for_svn(hit: &MarkerHit, svn_executable: &str) -> MvcResult<Option<Checkout>> {
    let Some(info) = svn_info::working_copy_info(svn_executable, &hit.parent_dir).await else {
        return Ok(None);
    };
    let Some(root) = info.repository_root_url else {
        return Err(MvcError::RepositoryRootUnavailable {
            directory: hit.parent_dir.clone(),
        });
    };

    let url = parse_url(&info.url)?;
    let root_url = parse_url(&root)?;
    debug!(
        directory = %hit.parent_dir.display(),
        url = %url,
        root = %root_url,
        "svn working copy"
    );

    let stripped = strip_common_suffix(
        &hit.parent_dir,
        Path::new(url.path()),
        Some(Path::new(root_url.path())),
        Some(".svn"),
    );
    let Some(directory) = stripped.local else {
        return Err(MvcError::internal(format!(
            "dir ({}) is parent of repository URL ({})",
            hit.parent_dir.display(),
            info.url
        )));
    };
    let Some(path_at_checkout) = stripped.remote else {
        return Err(MvcError::internal(format!(
            "dir ({}) is child of repository URL ({})",
            hit.parent_dir.display(),
            info.url
        )));
    };

    let mut checkout_url = url.clone();
    checkout_url.set_path(&path_at_checkout.to_string_lossy());
    if !checkout_url.as_str().starts_with(root_url.as_str().trim_end_matches('/')) {
        return Err(MvcError::internal(format!(
            "repository root {root_url} is not a prefix of checkout URL {checkout_url}"
        )));
    }

    Ok(Some(Checkout::new_unchecked(
        RepoType::Svn,
        directory,
        None,
        Some(checkout_url.to_string()),
    )))
}

fn parse_url(url: &str) -> MvcResult<Url> {
    Url::parse(url)
        .map_err(|e| MvcError::internal(format!("cannot parse svn URL {url}: {e}")))
}
