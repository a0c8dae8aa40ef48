use std::fmt;
use std::str::FromStr;

/// The operation to perform on every checkout in the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Clone (check out) all repositories.
    Clone,
    /// Show files that are changed but not committed, committed but not
    /// pushed, or shelved/stashed.
    Status,
    /// Pull and update all clones.
    Pull,
    /// List the checkouts the tool is aware of.
    List,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Clone => write!(f, "clone"),
            Action::Status => write!(f, "status"),
            Action::Pull => write!(f, "pull"),
            Action::List => write!(f, "list"),
        }
    }
}

/// Action words accepted on the command line. A given argument matches the
/// first word it is a prefix of, so `st` means status and `up` means update.
const ACTION_WORDS: [(&str, Action); 6] = [
    ("checkout", Action::Clone),
    ("clone", Action::Clone),
    ("list", Action::List),
    ("pull", Action::Pull),
    ("status", Action::Status),
    ("update", Action::Pull),
];

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ActionParseError(s.to_string()));
        }
        for (word, action) in ACTION_WORDS {
            if word.starts_with(s) {
                return Ok(action);
            }
        }
        Err(ActionParseError(s.to_string()))
    }
}

/// The given argument is not a recognized action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionParseError(pub String);

impl fmt::Display for ActionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unrecognized action \"{}\"; expected one of clone, checkout, status, pull, update, list",
            self.0
        )
    }
}

impl std::error::Error for ActionParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_words() {
        assert_eq!("clone".parse::<Action>().unwrap(), Action::Clone);
        assert_eq!("checkout".parse::<Action>().unwrap(), Action::Clone);
        assert_eq!("status".parse::<Action>().unwrap(), Action::Status);
        assert_eq!("pull".parse::<Action>().unwrap(), Action::Pull);
        assert_eq!("update".parse::<Action>().unwrap(), Action::Pull);
        assert_eq!("list".parse::<Action>().unwrap(), Action::List);
    }

    #[test]
    fn test_prefixes() {
        assert_eq!("st".parse::<Action>().unwrap(), Action::Status);
        assert_eq!("up".parse::<Action>().unwrap(), Action::Pull);
        assert_eq!("l".parse::<Action>().unwrap(), Action::List);
        // "c" is a prefix of "checkout", the first word checked.
        assert_eq!("c".parse::<Action>().unwrap(), Action::Clone);
    }

    #[test]
    fn test_rejects_unknown() {
        assert!("commit".parse::<Action>().is_err());
        assert!("".parse::<Action>().is_err());
    }
}
