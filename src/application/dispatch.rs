//! Builds the concrete commands to run for one checkout, together with
//! the output-rewrite rules that make each tool's output terse and fully
//! qualified.

use crate::common::error::MvcError;
use crate::common::result::MvcResult;
use crate::domain::entities::Checkout;
use crate::domain::value_objects::replacer::{self, Replacer};
use crate::domain::value_objects::{Action, RepoType};
use crate::infrastructure::process::CommandInvocation;
use crate::infrastructure::scm::hgrc;

/// Per-system executables and pass-through arguments.
#[derive(Debug, Clone, Default)]
pub struct ToolConfig {
    pub cvs_executable: String,
    pub git_executable: String,
    pub hg_executable: String,
    pub svn_executable: String,
    pub cvs_args: Vec<String>,
    pub git_args: Vec<String>,
    pub hg_args: Vec<String>,
    pub svn_args: Vec<String>,
    /// Pass `--insecure` to hg commands that contact a remote.
    pub insecure: bool,
}

/// One command with the rewrite rules to apply to its output.
#[derive(Debug)]
pub struct PlannedCommand {
    pub invocation: CommandInvocation,
    pub replacers: Vec<Replacer>,
}

/// The commands to run for one checkout, in order.
#[derive(Debug)]
pub struct CommandPlan {
    pub commands: Vec<PlannedCommand>,
    /// Show filtered output even when the command exits zero. Status
    /// output is the point of the status action; clone and pull are
    /// quiet on success.
    pub show_normal_output: bool,
}

/// What to do with one checkout: run commands, or skip it with a notice.
#[derive(Debug)]
pub enum DispatchOutcome {
    Plan(CommandPlan),
    Skip(String),
}

/// Decide the commands for `action` applied to `checkout`.
///
/// The list action never reaches here; it is handled before any command
/// planning.
pub fn plan(
    action: Action,
    checkout: &Checkout,
    tools: &ToolConfig,
) -> MvcResult<DispatchOutcome> {
    if checkout.repo_type == RepoType::Bzr {
        return Ok(DispatchOutcome::Skip(format!(
            "bzr handling not yet implemented: skipping {}",
            checkout.directory.display()
        )));
    }
    match action {
        Action::Clone => plan_clone(checkout, tools),
        Action::Status => plan_status(checkout, tools),
        Action::Pull => plan_pull(checkout, tools),
        Action::List => Err(MvcError::internal("list action has no command plan")),
    }
}

fn plan_clone(checkout: &Checkout, tools: &ToolConfig) -> MvcResult<DispatchOutcome> {
    let dir = &checkout.directory;
    let Some(repository) = checkout.repository.as_deref() else {
        return Ok(DispatchOutcome::Skip(format!(
            "Skipping checkout with unknown repository:\n  {}",
            dir.display()
        )));
    };
    let Some(parent) = dir.parent() else {
        return Ok(DispatchOutcome::Skip(format!(
            "Directory {} has no parent",
            dir.display()
        )));
    };
    let Some(dirbase) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Ok(DispatchOutcome::Skip(format!(
            "Directory {} has no name",
            dir.display()
        )));
    };

    let replacers = common_replacers(checkout)?;
    let invocation = match checkout.repo_type {
        RepoType::Cvs => {
            let Some(module) = checkout.module.as_deref() else {
                return Err(MvcError::internal(format!(
                    "cvs checkout of {} has no module",
                    dir.display()
                )));
            };
            // -P prunes empty directories, -ko disables keyword
            // substitution.
            CommandInvocation::new(&tools.cvs_executable, parent)
                .args(["-d", repository, "checkout", "-P", "-ko", module])
                .args(&tools.cvs_args)
        }
        RepoType::Git => {
            // "--" keeps a repository name starting with a hyphen from
            // being taken as an option.
            CommandInvocation::new(&tools.git_executable, parent)
                .args(["clone", "--recursive", "--", repository, dirbase.as_str()])
                .args(&tools.git_args)
        }
        RepoType::Hg => {
            let mut invocation = CommandInvocation::new(&tools.hg_executable, parent)
                .args(["clone", repository, dirbase.as_str()])
                .args(&tools.hg_args);
            if tools.insecure {
                invocation = invocation.arg("--insecure");
            }
            invocation
        }
        RepoType::Svn => {
            let mut invocation = CommandInvocation::new(&tools.svn_executable, parent)
                .args(["checkout", repository]);
            if let Some(module) = checkout.module.as_deref() {
                invocation = invocation.arg(module);
            }
            invocation.args(&tools.svn_args)
        }
        RepoType::Bzr => {
            return Err(MvcError::internal("bzr commands are never planned"));
        }
    };

    Ok(DispatchOutcome::Plan(CommandPlan {
        commands: vec![PlannedCommand {
            invocation,
            replacers,
        }],
        show_normal_output: false,
    }))
}

fn plan_status(checkout: &Checkout, tools: &ToolConfig) -> MvcResult<DispatchOutcome> {
    let dir = &checkout.directory;
    let dir_text = replacer::literal(&dir.display().to_string());
    let mut replacers = common_replacers(checkout)?;
    let mut commands = Vec::new();

    match checkout.repo_type {
        RepoType::Cvs => {
            // cvs diff exits nonzero when there are differences; the
            // rewrite rules boil its output down to one line per file.
            // -d <root> is omitted: it breaks checkouts whose
            // subdirectories live in a different repository.
            let invocation = CommandInvocation::new(&tools.cvs_executable, dir)
                .args(["-q", "diff", "-b", "--brief", "-N"])
                .args(&tools.cvs_args);
            replacers.push(re(
                concat!(
                    "\n=+",
                    "\nRCS file: .*",
                    "(\nretrieving revision .*)?",
                    "\ndiff .*",
                    "(\nFiles .* and .* differ)?"
                ),
                "".to_string(),
            )?);
            replacers.push(re(r"(^|\n)Index: ", format!("$1{dir_text}/"))?);
            replacers.push(re(
                r"(^|\n)(cvs \[diff aborted)(\]:)",
                format!("$1$2 in {dir_text}$3"),
            )?);
            replacers.push(re(r"(^|\n)(Permission denied)", format!("$1$2 in {dir_text}"))?);
            replacers.push(re(
                r"(^|\n)(cvs diff: )(cannot find revision control)",
                format!("$1$2 in {dir_text}: $3"),
            )?);
            replacers.push(re(
                r"(^|\n)(cvs diff: cannot find )",
                format!("$1$2{dir_text}"),
            )?);
            replacers.push(re(
                r"(^|\n)(cvs diff: in directory )",
                format!("$1$2{dir_text}/"),
            )?);
            replacers.push(re(
                r"(^|\n)(cvs diff: ignoring )",
                format!("$1$2{dir_text}/"),
            )?);
            commands.push(PlannedCommand {
                invocation,
                replacers: replacers.clone(),
            });
        }
        RepoType::Git => {
            let invocation = CommandInvocation::new(&tools.git_executable, dir)
                .arg("status")
                .args(&tools.git_args)
                .arg("--porcelain");
            for quiet_line in [
                "(^|\\n)On branch master\\nYour branch is up-to-date with 'origin/master'.\\n\\n?",
                r"(^|\n)nothing to commit,? working directory clean\n",
                "(^|\\n)no changes added to commit \\(use \"git add\" and/or \"git commit -a\"\\)\\n",
                "(^|\\n)nothing added to commit but untracked files present \\(use \"git add\" to track\\)\\n",
                r"(^|\n)nothing to commit \(use -u to show untracked files\)\n",
                r"(^|\n)#\n",
                r"(^|\n)# On branch master\n",
                r"(^|\n)nothing to commit \(working directory clean\)\n",
                r"(^|\n)# Changed but not updated:\n",
                "(^|\\n)#   \\(use \"git add <file>...\" to update what will be committed\\)\\n",
                "(^|\\n)#   \\(use \"git checkout -- <file>...\" to discard changes in working directory\\)\\n",
                r"(^|\n)# Untracked files:\n",
                "(^|\\n)#   \\(use \"git add <file>...\" to include in what will be committed\\)\\n",
            ] {
                replacers.push(re(quiet_line, "$1".to_string())?);
            }
            replacers.push(re(r"(^|\n)(#\tmodified:   )", format!("$1{dir_text}/"))?);
            // Must come after the rule above, whose pattern it prefixes.
            replacers.push(re(r"(^|\n)(#\t)", format!("$1untracked: {dir_text}/"))?);
            replacers.push(re(
                r"(^|\n)# Your branch is ahead of .*\n",
                format!("$1unpushed changesets: {dir_text}\n"),
            )?);
            replacers.push(re(r"(^|\n)([?][?]) ", format!("$1$2 {dir_text}/"))?);
            replacers.push(re(
                r"(^|\n)([ACDMRU][ ACDMRTU]|[ ACDMRU][ACDMRTU]) ",
                format!("$1$2 {dir_text}/"),
            )?);
            replacers.push(re(
                r"(^|\n)# Your branch is behind .*\n",
                format!("$1unpushed changesets: {dir_text}\n"),
            )?);
            // `git status --porcelain` says nothing about commits that
            // are not pushed; a second command reports them.
            let log_invocation = CommandInvocation::new(&tools.git_executable, dir)
                .args(["log", "--branches", "--not", "--remotes"])
                .args(&tools.git_args);
            replacers.push(re(
                r"^commit .*(.*\n)+",
                format!("unpushed commits: {dir_text}\n"),
            )?);
            commands.push(PlannedCommand {
                invocation,
                replacers: replacers.clone(),
            });
            commands.push(PlannedCommand {
                invocation: log_invocation,
                replacers: replacers.clone(),
            });
        }
        RepoType::Hg => {
            let invocation = CommandInvocation::new(&tools.hg_executable, dir)
                .arg("status")
                .args(&tools.hg_args);
            let mut outgoing = CommandInvocation::new(&tools.hg_executable, dir)
                .args(["outgoing", "-l", "1"]);
            if hgrc::has_legacy_certificate(dir) {
                outgoing = outgoing.args(["--config", "web.cacerts="]);
            }
            outgoing = outgoing.args(&tools.hg_args);
            if tools.insecure {
                outgoing = outgoing.arg("--insecure");
            }
            // After "searching for changes", outgoing prints either
            // "no changes found" or a changeset block.
            replacers.push(re(
                "^comparing with .*\\nsearching for changes\\nchangeset[^\x01]*",
                format!("unpushed changesets: {dir_text}\n"),
            )?);
            replacers.push(re(
                "^\\n?comparing with .*\\nsearching for changes\\nno changes found\n",
                "".to_string(),
            )?);
            commands.push(PlannedCommand {
                invocation,
                replacers: replacers.clone(),
            });
            commands.push(PlannedCommand {
                invocation: outgoing,
                replacers: replacers.clone(),
            });
            // Shelve is an optional extension; say nothing when it is
            // not installed.
            let shelve = CommandInvocation::new(&tools.hg_executable, dir)
                .args(["shelve", "-l"])
                .args(&tools.hg_args);
            let shelve_replacers = vec![
                re(r"^hg: unknown command 'shelve'\n(.*\n)+", "".to_string())?,
                re(r"^(.*\n)+", format!("shelved changes: {dir_text}\n"))?,
            ];
            commands.push(PlannedCommand {
                invocation: shelve,
                replacers: shelve_replacers,
            });
        }
        RepoType::Svn => {
            // The columns admit an eighth entry under --show-updates.
            replacers.push(re(
                r"(^|\n)([ACDIMRX?!~ ][CM ][L ][+ ][$ ]) *",
                format!("$1$2 {dir_text}/"),
            )?);
            let invocation = CommandInvocation::new(&tools.svn_executable, dir)
                .arg("status")
                .args(&tools.svn_args);
            commands.push(PlannedCommand {
                invocation,
                replacers: replacers.clone(),
            });
        }
        RepoType::Bzr => {
            return Err(MvcError::internal("bzr commands are never planned"));
        }
    }

    Ok(DispatchOutcome::Plan(CommandPlan {
        commands,
        show_normal_output: true,
    }))
}

fn plan_pull(checkout: &Checkout, tools: &ToolConfig) -> MvcResult<DispatchOutcome> {
    let dir = &checkout.directory;
    let dir_text = replacer::literal(&dir.display().to_string());
    let mut replacers = common_replacers(checkout)?;
    let mut commands = Vec::new();

    match checkout.repo_type {
        RepoType::Cvs => {
            replacers.push(re(
                r"(^|\n)(cvs update: ((in|skipping) directory|conflicts found in )) +",
                format!("$1$2 {dir_text}/"),
            )?);
            replacers.push(re(
                r"(^|\n)(Merging differences between 1.16 and 1.17 into )",
                format!("$1$2 {dir_text}/"),
            )?);
            // -d <root> is omitted here too; it breaks repositories
            // embedded inside other repositories.
            let invocation = CommandInvocation::new(&tools.cvs_executable, dir)
                .args(["-Q", "update", "-d"])
                .args(&tools.cvs_args);
            replacers.push(re("(cvs update: move away )", format!("$1{dir_text}/"))?);
            replacers.push(re(
                r"(cvs \[update aborted)(\])",
                format!("$1 in {dir_text}$2"),
            )?);
            commands.push(PlannedCommand {
                invocation,
                replacers: replacers.clone(),
            });
        }
        RepoType::Git => {
            replacers.push(re(r"(^|\n)Already up-to-date\.\n", "$1".to_string())?);
            replacers.push(re(r"(^|\n)error:", format!("$1error in {dir_text}:"))?);
            replacers.push(re(
                "(^|\\n)Please, commit your changes or stash them before you can merge.\\nAborting\\n",
                "$1".to_string(),
            )?);
            replacers.push(re(
                r"((^|\n)CONFLICT \(content\): Merge conflict in )",
                format!("$1{dir_text}/"),
            )?);
            replacers.push(re(r"(^|\n)([ACDMRU]\t)", format!("$1$2{dir_text}/"))?);
            let invocation = CommandInvocation::new(&tools.git_executable, dir)
                .args(["pull", "-q", "--recurse-submodules"])
                .args(&tools.git_args);
            // Prune remote-tracking branches for remotes gone away.
            let fetch = CommandInvocation::new(&tools.git_executable, dir).args(["fetch", "-p"]);
            commands.push(PlannedCommand {
                invocation,
                replacers: replacers.clone(),
            });
            commands.push(PlannedCommand {
                invocation: fetch,
                replacers: replacers.clone(),
            });
        }
        RepoType::Hg => {
            replacers.push(re(r"(^|\n)([?!AMR] ) +", format!("$1$2 {dir_text}/"))?);
            replacers.push(re(r"(^|\n)abort: ", "$1".to_string())?);
            let invocation = CommandInvocation::new(&tools.hg_executable, dir)
                .args(["-q", "update"])
                .args(&tools.hg_args);
            let mut fetch = CommandInvocation::new(&tools.hg_executable, dir).args(["-q", "fetch"]);
            if hgrc::has_legacy_certificate(dir) {
                fetch = fetch.args(["--config", "web.cacerts="]);
            }
            fetch = fetch.args(&tools.hg_args);
            if tools.insecure {
                fetch = fetch.arg("--insecure");
            }
            commands.push(PlannedCommand {
                invocation,
                replacers: replacers.clone(),
            });
            commands.push(PlannedCommand {
                invocation: fetch,
                replacers: replacers.clone(),
            });
        }
        RepoType::Svn => {
            replacers.push(re(r"(^|\n)([?!AMR] ) +", format!("$1$2 {dir_text}/"))?);
            replacers.push(re(
                "(svn: Failed to add file ')(.*')",
                format!("$1{dir_text}/$2"),
            )?);
            let invocation = CommandInvocation::new(&tools.svn_executable, dir)
                .args(["-q", "update"])
                .args(&tools.svn_args);
            commands.push(PlannedCommand {
                invocation,
                replacers: replacers.clone(),
            });
        }
        RepoType::Bzr => {
            return Err(MvcError::internal("bzr commands are never planned"));
        }
    }

    Ok(DispatchOutcome::Plan(CommandPlan {
        commands,
        show_normal_output: false,
    }))
}

/// Rules every command of a checkout gets: per-system noise suppression
/// and directory qualification, X11 forwarding noise from ssh remotes,
/// and qualification of "working copy" messages.
fn common_replacers(checkout: &Checkout) -> MvcResult<Vec<Replacer>> {
    let dir_text = replacer::literal(&checkout.directory.display().to_string());
    let mut replacers = Vec::new();
    match checkout.repo_type {
        RepoType::Bzr => {}
        RepoType::Cvs => {
            replacers.push(re(r"(^|\n)([?]) ", format!("$1$2 {dir_text}/"))?);
        }
        RepoType::Git => {
            replacers.push(re(r"(^|\n)fatal:", format!("$1fatal in {dir_text}:"))?);
            replacers.push(re(r"(^|\n)warning:", format!("$1warning in {dir_text}:"))?);
            replacers.push(re(
                r"(^|\n)(There is no tracking information for the current branch\.)",
                format!("$1{dir_text}: $2"),
            )?);
            replacers.push(re(
                r"(^|\n)(Your configuration specifies to merge)",
                format!("{dir_text}: $1$2"),
            )?);
        }
        RepoType::Hg => {
            // bitbucket.org prints the "real URL" line; strip it first.
            replacers.push(re(r"(^|\n)real URL is .*\n", "$1".to_string())?);
            replacers.push(re(r"(^|\n)(abort: .*)", format!("$1$2: {dir_text}"))?);
            replacers.push(re(r"(^|\n)([MARC!?I]) ", format!("$1$2 {dir_text}/"))?);
            replacers.push(re(
                r"(^|\n)(\*\*\* failed to import extension .*: No module named demandload\n)",
                "$1".to_string(),
            )?);
            // The certificate warning can appear twice with overlapping
            // matches, so the rule is applied twice.
            for _ in 0..2 {
                replacers.push(re(
                    r"(^|\n)warning: .* certificate not verified \(check web.cacerts config setting\)\n",
                    "$1".to_string(),
                )?);
            }
            replacers.push(re(
                r"(^|\n)((comparing with default-push\n)?abort: repository default(-push)? not found!: .*\n)",
                "$1".to_string(),
            )?);
        }
        RepoType::Svn => {
            replacers.push(re(
                "(svn: Network connection closed unexpectedly)",
                format!("$1 for {dir_text}"),
            )?);
            replacers.push(re("(svn: Repository) (UUID)", format!("$1 {dir_text} $2"))?);
            replacers.push(re(
                "(svn: E155037: Previous operation has not finished; run 'cleanup' if it was interrupted)",
                format!("$1; for {dir_text}"),
            )?);
        }
    }
    // Sometimes there are two carriage returns, hence \r*.
    replacers.push(re(
        "(remote: )?Warning: untrusted X11 forwarding setup failed: xauth key data not generated\r*\n(remote: )?Warning: No xauth data; using fake authentication data for X11 forwarding\\.\r*\n",
        "".to_string(),
    )?);
    replacers.push(re("(working copy ')", format!("$1{dir_text}"))?);
    Ok(replacers)
}

fn re(pattern: &str, replacement: String) -> MvcResult<Replacer> {
    Replacer::new(pattern, replacement)
        .map_err(|e| MvcError::internal(format!("bad output rewrite rule {pattern:?}: {e}")))
}
