use regex::Regex;

/// A single output-rewrite rule: a pattern and its replacement text.
///
/// Replacers make raw tool output user-friendly: suppressing noise,
/// qualifying relative file names with the checkout directory, collapsing
/// multi-line banners. A rule's pattern may match across the whole captured
/// buffer, newlines included, and its replacement may reference capture
/// groups (`$1`, `$2`, ...).
#[derive(Debug, Clone)]
pub struct Replacer {
    regex: Regex,
    replacement: String,
}

impl Replacer {
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            replacement: replacement.into(),
        })
    }

    /// Apply this rule once over the whole input, replacing every match.
    pub fn apply(&self, input: &str) -> String {
        self.regex
            .replace_all(input, self.replacement.as_str())
            .into_owned()
    }

    /// The source pattern, with control characters made printable. Used by
    /// the replacer-debug output.
    pub fn printable_pattern(&self) -> String {
        self.regex
            .as_str()
            .replace('\r', "\\r")
            .replace('\n', "\\n")
    }
}

/// Apply a rule list as a left-to-right fold over the captured text.
///
/// Order is semantically significant: later rules see the output already
/// transformed by earlier ones, and no rule is re-applied to its own output.
pub fn apply_all(rules: &[Replacer], input: &str) -> String {
    rules
        .iter()
        .fold(input.to_string(), |text, rule| rule.apply(&text))
}

/// Escape `$` in literal text destined for a replacement template, so a
/// directory path cannot be misread as a capture-group reference.
pub fn literal(text: &str) -> String {
    text.replace('$', "$$")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_directory_qualification() {
        let rule = Replacer::new(r"(^|\n)([?][?]) ", "$1$2 /home/u/proj/").unwrap();
        assert_eq!(rule.apply("?? file.txt"), "?? /home/u/proj/file.txt");
        assert_eq!(
            rule.apply("M  a\n?? b"),
            "M  a\n?? /home/u/proj/b"
        );
    }

    #[test]
    fn test_deletion_rule() {
        let rule = Replacer::new(r"(^|\n)Already up to date\.\n", "$1").unwrap();
        assert_eq!(rule.apply("Already up to date.\n"), "");
    }

    #[test]
    fn test_multiline_match() {
        let rule = Replacer::new(
            r"^comparing with .*\nsearching for changes\nno changes found\n",
            "",
        )
        .unwrap();
        let input = "comparing with ssh://host/repo\nsearching for changes\nno changes found\n";
        assert_eq!(rule.apply(input), "");
    }

    #[test]
    fn test_ordering_is_significant() {
        // Rule 1 inserts text that rule 2's pattern then matches; applying
        // them in the reverse order must give a different result.
        let first = Replacer::new("start", "marker middle").unwrap();
        let second = Replacer::new("marker", "end").unwrap();

        let forward = apply_all(&[first.clone(), second.clone()], "start");
        assert_eq!(forward, "end middle");

        let backward = apply_all(&[second, first], "start");
        assert_eq!(backward, "marker middle");
    }

    #[test]
    fn test_rules_apply_once_each() {
        // A rule whose replacement matches its own pattern must not loop.
        let rule = Replacer::new("a", "aa").unwrap();
        assert_eq!(apply_all(&[rule], "a"), "aa");
    }

    #[test]
    fn test_literal_escapes_dollar() {
        assert_eq!(literal("/tmp/$dir"), "/tmp/$$dir");
        let rule = Replacer::new("x", literal("/tmp/$1")).unwrap();
        assert_eq!(rule.apply("x"), "/tmp/$1");
    }
}
