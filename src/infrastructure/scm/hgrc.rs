use std::fs;
use std::path::Path;

/// Extract `default` from the `[paths]` section of an hgrc file.
///
/// A minimal ini reader: section headers in brackets, `key = value`
/// lines, `#` and `;` comments. Mercurial's own format allows more
/// (value continuation lines, `%include`) but clone metadata written by
/// `hg clone` never uses those.
pub fn paths_default(hgrc: &Path) -> Option<String> {
    let contents = fs::read_to_string(hgrc).ok()?;
    let mut in_paths = false;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            in_paths = section.trim() == "paths";
            continue;
        }
        if !in_paths {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            if key.trim() == "default" {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

/// The default remote of the working copy whose `.hg` directory is given,
/// with any trailing slash removed.
pub fn remote_url(hg_dir: &Path) -> Option<String> {
    let mut url = paths_default(&hg_dir.join("hgrc"))?;
    while url.ends_with('/') {
        url.pop();
    }
    Some(url)
}

/// Whether the working copy's default remote is one of the dead Google
/// Code hosts whose TLS certificates no longer verify. Pulls from these
/// need certificate checking disabled to produce useful output.
pub fn has_legacy_certificate(directory: &Path) -> bool {
    match paths_default(&directory.join(".hg").join("hgrc")) {
        Some(url) => {
            url.starts_with("https://hg.codespot.com/") || is_legacy_googlecode(&url)
        }
        None => false,
    }
}

/// Matches `https://<user>.<project>.googlecode.com/hg` exactly.
fn is_legacy_googlecode(url: &str) -> bool {
    let Some(rest) = url.strip_prefix("https://") else {
        return false;
    };
    let parts: Vec<&str> = rest.split('.').collect();
    parts.len() == 4 && parts[2] == "googlecode" && parts[3] == "com/hg"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_hgrc(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let hg_dir = tmp.path().join(".hg");
        fs::create_dir(&hg_dir).unwrap();
        fs::write(hg_dir.join("hgrc"), contents).unwrap();
        (tmp, hg_dir)
    }

    #[test]
    fn test_reads_default_from_paths_section() {
        let (_tmp, hg_dir) = write_hgrc("[paths]\ndefault = https://example.org/repo\n");
        assert_eq!(
            remote_url(&hg_dir),
            Some("https://example.org/repo".to_string())
        );
    }

    #[test]
    fn test_default_outside_paths_section_is_ignored() {
        let (_tmp, hg_dir) = write_hgrc("[ui]\ndefault = not-a-remote\n");
        assert_eq!(remote_url(&hg_dir), None);
    }

    #[test]
    fn test_trailing_slash_is_stripped() {
        let (_tmp, hg_dir) = write_hgrc("[paths]\ndefault = https://example.org/repo/\n");
        assert_eq!(
            remote_url(&hg_dir),
            Some("https://example.org/repo".to_string())
        );
    }

    #[test]
    fn test_missing_file_yields_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(remote_url(&tmp.path().join(".hg")), None);
    }

    #[test]
    fn test_legacy_certificate_hosts() {
        let (tmp, _hg_dir) =
            write_hgrc("[paths]\ndefault = https://jsr308-langtools.googlecode.com/hg\n");
        assert!(!has_legacy_certificate(tmp.path()));

        let (tmp, _hg_dir) =
            write_hgrc("[paths]\ndefault = https://code.jsr308-langtools.googlecode.com/hg\n");
        assert!(has_legacy_certificate(tmp.path()));

        let (tmp, _hg_dir) =
            write_hgrc("[paths]\ndefault = https://hg.codespot.com/a/repo\n");
        assert!(has_legacy_certificate(tmp.path()));

        let (tmp, _hg_dir) = write_hgrc("[paths]\ndefault = https://example.org/hg\n");
        assert!(!has_legacy_certificate(tmp.path()));
    }
}
