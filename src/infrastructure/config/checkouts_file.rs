use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::common::error::MvcError;
use crate::common::result::MvcResult;
use crate::domain::entities::{Checkout, CheckoutSet};
use crate::domain::value_objects::RepoType;

/// Reader for the `.mvc-checkouts` file.
///
/// The format is line oriented. A section header is one of
/// `BZRROOT:`/`BZRREPOS:`, `CVSROOT:`, `GITROOT:`/`GITREPOS:`,
/// `HGROOT:`/`HGREPOS:`, `SVNROOT:`/`SVNREPOS:` followed by a root or
/// repository URL; every following line names a checkout directory,
/// optionally followed by a module after the last space. Blank lines and
/// `#` comments are skipped.
pub struct CheckoutsFileReader {
    home: PathBuf,
    /// Also pick up sibling directories whose name extends a listed one,
    /// e.g. `proj-branch-feature` next to a listed `proj`.
    search_prefix: bool,
}

impl CheckoutsFileReader {
    pub fn new(home: PathBuf, search_prefix: bool) -> Self {
        Self {
            home,
            search_prefix,
        }
    }

    /// Read `file` and add every checkout it describes to `checkouts`.
    pub fn read(&self, file: &Path, checkouts: &mut CheckoutSet) -> MvcResult<()> {
        let contents = fs::read_to_string(file)
            .map_err(|e| MvcError::config_unreadable(file, e))?;

        let mut section: Option<Section> = None;
        for (index, raw_line) in contents.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(new_section) = parse_section_header(line) {
                section = Some(new_section);
                continue;
            }
            let Some(section) = &section else {
                return Err(MvcError::ConfigFormat {
                    file: file.to_path_buf(),
                    line: index + 1,
                });
            };
            self.add_entry(section, line, checkouts)?;
        }
        Ok(())
    }

    fn add_entry(
        &self,
        section: &Section,
        line: &str,
        checkouts: &mut CheckoutSet,
    ) -> MvcResult<()> {
        let mut root = section.root.trim_end_matches('/').to_string();

        // The module, if any, follows the last space; directory names
        // containing spaces stay intact.
        let (dirname, mut module) = match line.rsplit_once(' ') {
            Some((dirname, module)) => (dirname, Some(module.to_string())),
            None => (line, None),
        };
        let dir = self.expand_tilde(dirname);

        if module.is_none() {
            module = dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned());
        }
        if section.repo_type != RepoType::Cvs {
            if !section.is_repos {
                if let Some(module) = &module {
                    root = format!("{root}/{module}");
                }
            }
            module = None;
        }

        debug!(?dir, %root, ?module, "checkouts file entry");
        checkouts.insert(Checkout::new(
            section.repo_type,
            dir.clone(),
            module.clone(),
            Some(root.clone()),
        )?);

        if self.search_prefix {
            self.add_prefix_siblings(section, &dir, &root, module.as_deref(), checkouts)?;
        }
        Ok(())
    }

    /// Add every sibling directory whose name extends the entry's name.
    /// A sibling that exists but is not a working copy of this type is
    /// skipped rather than reported.
    fn add_prefix_siblings(
        &self,
        section: &Section,
        dir: &Path,
        root: &str,
        module: Option<&str>,
        checkouts: &mut CheckoutSet,
    ) -> MvcResult<()> {
        let Some(name) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Ok(());
        };
        let Some(parent) = dir.parent() else {
            return Ok(());
        };
        if !parent.is_dir() {
            return Ok(());
        }
        let mut siblings: Vec<PathBuf> = fs::read_dir(parent)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_dir()
                    && path
                        .file_name()
                        .is_some_and(|n| n.to_string_lossy().starts_with(&name))
            })
            .collect();
        siblings.sort();

        for sibling in siblings {
            match Checkout::new(
                section.repo_type,
                sibling,
                module.map(String::from),
                Some(root.to_string()),
            ) {
                Ok(checkout) => {
                    checkouts.insert(checkout);
                }
                // A directory whose name extends a listed one but which
                // has no metadata subdirectory is not a checkout at all.
                Err(MvcError::DirectoryMissing { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn expand_tilde(&self, dirname: &str) -> PathBuf {
        if dirname == "~" {
            self.home.clone()
        } else if let Some(rest) = dirname.strip_prefix("~/") {
            self.home.join(rest)
        } else {
            PathBuf::from(dirname)
        }
    }
}

struct Section {
    repo_type: RepoType,
    root: String,
    is_repos: bool,
}

fn parse_section_header(line: &str) -> Option<Section> {
    let mut words = line.split_whitespace();
    let word1 = words.next()?;
    let word2 = words.next()?;
    if words.next().is_some() {
        return None;
    }
    let (repo_type, is_repos) = match word1 {
        "BZRROOT:" => (RepoType::Bzr, false),
        "BZRREPOS:" => (RepoType::Bzr, true),
        "CVSROOT:" => (RepoType::Cvs, false),
        "GITROOT:" => (RepoType::Git, false),
        "GITREPOS:" => (RepoType::Git, true),
        "HGROOT:" => (RepoType::Hg, false),
        "HGREPOS:" => (RepoType::Hg, true),
        "SVNROOT:" => (RepoType::Svn, false),
        "SVNREPOS:" => (RepoType::Svn, true),
        _ => return None,
    };
    let mut root = word2.to_string();
    if repo_type == RepoType::Cvs {
        root = localize_cvs_root(root);
    }
    Some(Section {
        repo_type,
        root,
        is_repos,
    })
}

/// A remote `:ext:` CVS root whose path portion exists locally is used
/// directly, saving an ssh round trip per command.
fn localize_cvs_root(root: String) -> String {
    if !root.starts_with(":ext:") {
        return root;
    }
    match root.rsplit(':').next() {
        Some(path) if Path::new(path).is_dir() => path.to_string(),
        _ => root,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(contents: &str, home: &Path, search_prefix: bool) -> MvcResult<CheckoutSet> {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join(".mvc-checkouts");
        fs::write(&file, contents).unwrap();
        let mut checkouts = CheckoutSet::new();
        CheckoutsFileReader::new(home.to_path_buf(), search_prefix)
            .read(&file, &mut checkouts)?;
        Ok(checkouts)
    }

    #[test]
    fn test_gitroot_appends_module_to_root() {
        let home = tempfile::tempdir().unwrap();
        let checkouts = read(
            "GITROOT: git@example.org:user\n~/prj/alpha\n",
            home.path(),
            false,
        )
        .unwrap();
        assert_eq!(checkouts.len(), 1);
        let c = &checkouts.as_slice()[0];
        assert_eq!(c.repo_type, RepoType::Git);
        assert_eq!(c.directory, home.path().join("prj/alpha"));
        assert_eq!(c.repository.as_deref(), Some("git@example.org:user/alpha"));
        assert_eq!(c.module, None);
    }

    #[test]
    fn test_gitrepos_root_is_used_verbatim() {
        let home = tempfile::tempdir().unwrap();
        let checkouts = read(
            "GITREPOS: https://example.org/monorepo.git\n~/prj/alpha\n",
            home.path(),
            false,
        )
        .unwrap();
        let c = &checkouts.as_slice()[0];
        assert_eq!(
            c.repository.as_deref(),
            Some("https://example.org/monorepo.git")
        );
    }

    #[test]
    fn test_explicit_module_follows_last_space() {
        let home = tempfile::tempdir().unwrap();
        let checkouts = read(
            "GITROOT: git@example.org:user\n~/my prj/alpha widgets\n",
            home.path(),
            false,
        )
        .unwrap();
        let c = &checkouts.as_slice()[0];
        assert_eq!(c.directory, home.path().join("my prj/alpha"));
        assert_eq!(c.repository.as_deref(), Some("git@example.org:user/widgets"));
    }

    #[test]
    fn test_svnroot_and_svnrepos_resolve_identically() {
        let home = tempfile::tempdir().unwrap();
        // A root plus a module names the same checkout as the full
        // repository URL with no module.
        let via_root = read(
            "SVNROOT: https://svn.example.org/repo/\n~/prj/crash trunk\n",
            home.path(),
            false,
        )
        .unwrap();
        let via_repos = read(
            "SVNREPOS: https://svn.example.org/repo/trunk\n~/prj/crash\n",
            home.path(),
            false,
        )
        .unwrap();
        let a = &via_root.as_slice()[0];
        let b = &via_repos.as_slice()[0];
        assert_eq!(
            a.repository.as_deref(),
            Some("https://svn.example.org/repo/trunk")
        );
        assert_eq!(a.repository, b.repository);
        assert_eq!(a.directory, b.directory);
        assert_eq!(a.module, None);
        assert_eq!(b.module, None);
    }

    #[test]
    fn test_cvs_keeps_module_and_root_separate() {
        let home = tempfile::tempdir().unwrap();
        let checkouts = read(
            "CVSROOT: :pserver:anonymous@cvs.example.org:/cvsroot\n~/prj/alpha\n",
            home.path(),
            false,
        )
        .unwrap();
        let c = &checkouts.as_slice()[0];
        assert_eq!(c.repo_type, RepoType::Cvs);
        assert_eq!(
            c.repository.as_deref(),
            Some(":pserver:anonymous@cvs.example.org:/cvsroot")
        );
        assert_eq!(c.module.as_deref(), Some("alpha"));
    }

    #[test]
    fn test_trailing_slash_on_root_is_dropped() {
        let home = tempfile::tempdir().unwrap();
        let checkouts = read(
            "HGROOT: https://example.org/hg/\n~/prj/alpha\n",
            home.path(),
            false,
        )
        .unwrap();
        let c = &checkouts.as_slice()[0];
        assert_eq!(c.repository.as_deref(), Some("https://example.org/hg/alpha"));
    }

    #[test]
    fn test_entry_before_section_is_an_error() {
        let home = tempfile::tempdir().unwrap();
        let err = read("# comment\n\n~/prj/alpha\n", home.path(), false).unwrap_err();
        assert!(matches!(err, MvcError::ConfigFormat { line: 3, .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_ext_cvs_root_is_localized_when_path_exists() {
        let local = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let contents = format!(
            "CVSROOT: :ext:user@host:{}\n~/prj/alpha\n",
            local.path().display()
        );
        let checkouts = read(&contents, home.path(), false).unwrap();
        let c = &checkouts.as_slice()[0];
        assert_eq!(
            c.repository.as_deref(),
            Some(local.path().to_str().unwrap())
        );
    }

    #[test]
    fn test_prefix_search_picks_up_extended_siblings() {
        let home = tempfile::tempdir().unwrap();
        let prj = home.path().join("prj");
        fs::create_dir_all(prj.join("alpha/.git")).unwrap();
        fs::create_dir_all(prj.join("alpha-fork/.git")).unwrap();
        // An extension without a .git subdirectory is skipped.
        fs::create_dir_all(prj.join("alpha-notes")).unwrap();
        fs::create_dir_all(prj.join("beta/.git")).unwrap();

        let checkouts = read(
            "GITROOT: git@example.org:user\n~/prj/alpha\n",
            home.path(),
            true,
        )
        .unwrap();
        let mut dirs: Vec<_> = checkouts
            .iter()
            .map(|c| c.directory.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        dirs.sort();
        assert_eq!(dirs, vec!["alpha", "alpha-fork"]);
    }
}
