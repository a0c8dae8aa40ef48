use std::path::{Path, PathBuf};

/// What remains of a local directory and a repository path after their
/// common trailing components have been stripped. Either side may be
/// `None` when the whole path was consumed.
#[derive(Debug, PartialEq, Eq)]
pub struct StrippedPair {
    pub local: Option<PathBuf>,
    pub remote: Option<PathBuf>,
}

/// Strip identical trailing components off both paths and return what is
/// left of each.
///
/// Used when the checkouts file lists a containing directory: a working
/// copy at `~/prj/trunk/www` of `svn+ssh://host/repo/trunk/www` collapses
/// to `~/prj` and `svn+ssh://host/repo`, so distinct checkouts under one
/// parent share a config line.
///
/// `remote_limit`, when given, is a parent of `remote` and bounds the
/// stripping: the remote side never shrinks past it. `local_contains`,
/// when given, names a subdirectory that must be present next to the
/// local path for stripping to continue; CVS passes `"CVS"` here so only
/// directories that are themselves working copies are folded away.
pub fn strip_common_suffix(
    local: &Path,
    remote: &Path,
    remote_limit: Option<&Path>,
    local_contains: Option<&str>,
) -> StrippedPair {
    let mut r1: Option<&Path> = Some(local);
    let mut r2: Option<&Path> = Some(remote);
    while let (Some(p1), Some(p2)) = (r1, r2) {
        if remote_limit.is_some_and(|limit| p2 == limit) {
            break;
        }
        match (p1.file_name(), p2.file_name()) {
            (Some(n1), Some(n2)) if n1 == n2 => {}
            _ => break,
        }
        if let Some(name) = local_contains {
            let sibling = match parent(p1) {
                Some(parent) => parent.join(name),
                None => PathBuf::from(name),
            };
            if !sibling.is_dir() {
                break;
            }
        }
        r1 = parent(p1);
        r2 = parent(p2);
    }
    StrippedPair {
        local: r1.map(Path::to_path_buf),
        remote: r2.map(Path::to_path_buf),
    }
}

/// The topmost component of a path, e.g. `/` for an absolute path.
pub fn path_root(path: &Path) -> &Path {
    let mut current = path;
    while let Some(up) = parent(current) {
        current = up;
    }
    current
}

/// Like [`Path::parent`] but treating the empty path as no parent, so
/// relative single-component paths terminate the walk.
fn parent(path: &Path) -> Option<&Path> {
    match path.parent() {
        Some(p) if p.as_os_str().is_empty() => None,
        other => other,
    }
}
