use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::application::dispatch::{self, DispatchOutcome, PlannedCommand, ToolConfig};
use crate::common::error::MvcError;
use crate::common::result::MvcResult;
use crate::domain::entities::{Checkout, CheckoutSet};
use crate::domain::value_objects::Action;
use crate::infrastructure::config::CheckoutsFileReader;
use crate::infrastructure::filesystem::CheckoutScanner;
use crate::infrastructure::process::{CommandOutcome, CommandRunner};
use crate::infrastructure::scm::identity;

/// Output format of the list action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

/// Everything one run needs, resolved by the command line layer.
#[derive(Debug, Clone)]
pub struct ProgramOptions {
    pub action: Action,
    pub home: PathBuf,
    /// The `.mvc-checkouts` file.
    pub checkouts_file: PathBuf,
    /// Search the directories in `dirs` for working copies.
    pub search: bool,
    /// Also accept directories whose name extends one in the checkouts
    /// file.
    pub search_prefix: bool,
    pub dirs: Vec<PathBuf>,
    /// Directories not to search within, possibly tilde-prefixed.
    pub ignore_dirs: Vec<String>,
    pub redo_existing: bool,
    pub timeout: Duration,
    pub dry_run: bool,
    pub show: bool,
    pub print_directory: bool,
    pub quiet: bool,
    pub debug: bool,
    pub debug_replacers: bool,
    pub debug_process_output: bool,
    pub list_format: ListFormat,
    pub tools: ToolConfig,
}

/// Applies one action across every known checkout.
pub struct RunActionUseCase {
    options: ProgramOptions,
}

impl RunActionUseCase {
    pub fn new(options: ProgramOptions) -> Self {
        Self { options }
    }

    pub async fn execute(&self) -> MvcResult<()> {
        let checkouts = self.assemble_checkouts().await?;
        debug!(count = checkouts.len(), "about to process checkouts");

        if self.options.action == Action::List {
            print!("{}", render_list(&checkouts, self.options.list_format)?);
            return Ok(());
        }

        for checkout in &checkouts {
            self.process_checkout(checkout).await?;
        }
        Ok(())
    }

    /// Merge the checkouts file with filesystem discovery. An unreadable
    /// checkouts file is reported but not fatal; a malformed one is.
    pub async fn assemble_checkouts(&self) -> MvcResult<CheckoutSet> {
        let mut checkouts = CheckoutSet::new();

        let reader = CheckoutsFileReader::new(
            self.options.home.clone(),
            self.options.search_prefix,
        );
        match reader.read(&self.options.checkouts_file, &mut checkouts) {
            Ok(()) => {}
            Err(e @ MvcError::ConfigUnreadable { .. }) => eprintln!("{e}"),
            Err(e) => return Err(e),
        }

        if self.options.search {
            let scanner = CheckoutScanner::new(self.vetted_ignore_dirs());
            for dir in &self.options.dirs {
                debug!(directory = %dir.display(), "searching for checkouts");
                let before = checkouts.len();
                for hit in scanner.scan(dir)? {
                    if let Some(checkout) =
                        identity::checkout_for(&hit, &self.options.tools.svn_executable).await?
                    {
                        checkouts.insert(checkout);
                    }
                }
                debug!(added = checkouts.len() - before, "search finished");
            }
        }
        Ok(checkouts)
    }

    /// Expand and validate the ignore list, warning about entries that
    /// cannot take effect.
    fn vetted_ignore_dirs(&self) -> Vec<PathBuf> {
        let mut vetted = Vec::new();
        for raw in &self.options.ignore_dirs {
            let expanded = self.expand_tilde(raw);
            if !expanded.exists() {
                eprintln!(
                    "Warning: Directory to ignore while searching for checkouts does not exist:\n  {raw}"
                );
            } else if !expanded.is_dir() {
                eprintln!(
                    "Warning: Directory to ignore while searching for checkouts is not a directory:\n  {raw}"
                );
            } else {
                vetted.push(expanded);
            }
        }
        vetted
    }

    fn expand_tilde(&self, path: &str) -> PathBuf {
        if path == "~" {
            self.options.home.clone()
        } else if let Some(rest) = path.strip_prefix("~/") {
            self.options.home.join(rest)
        } else {
            PathBuf::from(path)
        }
    }

    async fn process_checkout(&self, checkout: &Checkout) -> MvcResult<()> {
        if self.options.debug {
            println!("{checkout}");
        }
        let plan = match dispatch::plan(self.options.action, checkout, &self.options.tools)? {
            DispatchOutcome::Plan(plan) => plan,
            DispatchOutcome::Skip(notice) => {
                println!("{notice}");
                return Ok(());
            }
        };

        if !self.prepare_directory(checkout)? {
            return Ok(());
        }

        if self.options.print_directory {
            println!("{} :", checkout.directory.display());
        }
        for command in &plan.commands {
            match self.perform_command(command, plan.show_normal_output).await {
                Ok(()) => {}
                Err(e @ MvcError::Launch { .. }) => {
                    // A missing executable fails every later command for
                    // this checkout too.
                    eprintln!("{e}");
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Existence handling before any command runs. Returns whether the
    /// checkout should be processed.
    fn prepare_directory(&self, checkout: &Checkout) -> MvcResult<bool> {
        let dir = &checkout.directory;
        if dir.exists() {
            if self.options.action == Action::Clone && !self.options.redo_existing {
                if !self.options.quiet {
                    println!("Skipping checkout (dir already exists): {}", dir.display());
                }
                return Ok(false);
            }
            return Ok(true);
        }

        match self.options.action {
            Action::Clone => {
                let Some(parent) = dir.parent() else {
                    eprintln!(
                        "Directory {} does not exist, and it has no parent",
                        dir.display()
                    );
                    return Ok(false);
                };
                if !parent.exists() {
                    if self.options.show {
                        if self.options.dry_run {
                            println!("  mkdir -p {}", parent.display());
                        } else {
                            println!(
                                "Parent directory {} does not exist (creating)",
                                parent.display()
                            );
                        }
                    }
                    if !self.options.dry_run {
                        std::fs::create_dir_all(parent).map_err(|e| {
                            MvcError::ParentDirectoryUncreatable {
                                path: parent.to_path_buf(),
                                source: e,
                            }
                        })?;
                    }
                }
                Ok(true)
            }
            Action::Status | Action::Pull => {
                if !self.options.quiet {
                    println!("Cannot find directory: {}", dir.display());
                }
                Ok(false)
            }
            Action::List => Ok(false),
        }
    }

    async fn perform_command(
        &self,
        command: &PlannedCommand,
        show_normal_output: bool,
    ) -> MvcResult<()> {
        if self.options.show {
            println!("{}", command.invocation.command_line());
        }
        if self.options.dry_run {
            return Ok(());
        }

        let runner = CommandRunner::new(self.options.timeout);
        let execution = runner.run(&command.invocation).await?;

        let failed = match execution.outcome {
            CommandOutcome::Completed { exit_code } => exit_code != 0,
            CommandOutcome::TimedOut => {
                println!("Timed out (limit: {}s):", self.options.timeout.as_secs());
                println!("{}", command.invocation.command_line());
                // fall through; the partial output is still worth showing
                true
            }
        };

        let debugging = self.options.debug_replacers || self.options.debug_process_output;
        if show_normal_output || failed || debugging {
            let mut output = execution.output;
            if debugging {
                println!("preoutput=<<<{output}>>>");
            }
            if !output.is_empty() {
                for replacer in &command.replacers {
                    if self.options.debug_replacers {
                        println!(
                            "midoutput_pre[{}]=<<<{output}>>>",
                            replacer.printable_pattern()
                        );
                    }
                    output = replacer.apply(&output);
                    if self.options.debug_replacers {
                        println!(
                            "midoutput_post[{}]=<<<{output}>>>",
                            replacer.printable_pattern()
                        );
                    }
                }
                if debugging {
                    println!("postoutput=<<<{output}>>>");
                }
                // `git pull` on a detached head says only this, without
                // naming the repository.
                if output.starts_with("You are not currently on a branch.") {
                    println!("{}:", command.invocation.working_dir.display());
                }
                print!("{output}");
            }
        }
        Ok(())
    }
}

/// Render the checkout set for the list action.
pub fn render_list(checkouts: &CheckoutSet, format: ListFormat) -> MvcResult<String> {
    match format {
        ListFormat::Text => {
            let mut out = String::new();
            for checkout in checkouts {
                out.push_str(&checkout.to_string());
                out.push('\n');
            }
            Ok(out)
        }
        ListFormat::Json => {
            let mut out = serde_json::to_string_pretty(checkouts.as_slice())?;
            out.push('\n');
            Ok(out)
        }
        ListFormat::Yaml => Ok(serde_yaml::to_string(checkouts.as_slice())?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::RepoType;
    use std::fs;

    fn options(action: Action, home: PathBuf) -> ProgramOptions {
        ProgramOptions {
            action,
            checkouts_file: home.join(".mvc-checkouts"),
            dirs: vec![home.clone()],
            home,
            search: false,
            search_prefix: false,
            ignore_dirs: Vec::new(),
            redo_existing: false,
            timeout: Duration::from_secs(600),
            dry_run: false,
            show: false,
            print_directory: false,
            quiet: true,
            debug: false,
            debug_replacers: false,
            debug_process_output: false,
            list_format: ListFormat::Text,
            tools: ToolConfig {
                cvs_executable: "cvs".to_string(),
                git_executable: "git".to_string(),
                hg_executable: "hg".to_string(),
                svn_executable: "svn".to_string(),
                ..ToolConfig::default()
            },
        }
    }

    #[tokio::test]
    async fn test_config_and_search_merge_without_duplicates() {
        let home = tempfile::tempdir().unwrap();
        fs::create_dir_all(home.path().join("prj/alpha/.git")).unwrap();
        fs::write(
            home.path().join(".mvc-checkouts"),
            "GITROOT: git@example.org:user\n~/prj/alpha\n",
        )
        .unwrap();

        let mut opts = options(Action::List, home.path().to_path_buf());
        opts.search = true;
        let checkouts = RunActionUseCase::new(opts).assemble_checkouts().await.unwrap();
        assert_eq!(checkouts.len(), 1);
        let c = &checkouts.as_slice()[0];
        // the config entry came first, so its repository wins
        assert_eq!(c.repository.as_deref(), Some("git@example.org:user/alpha"));
    }

    #[tokio::test]
    async fn test_missing_checkouts_file_is_not_fatal() {
        let home = tempfile::tempdir().unwrap();
        fs::create_dir_all(home.path().join("prj/beta/.hg")).unwrap();

        let mut opts = options(Action::List, home.path().to_path_buf());
        opts.search = true;
        let checkouts = RunActionUseCase::new(opts).assemble_checkouts().await.unwrap();
        assert_eq!(checkouts.len(), 1);
        assert_eq!(checkouts.as_slice()[0].repo_type, RepoType::Hg);
    }

    #[tokio::test]
    async fn test_missing_search_root_is_fatal() {
        let home = tempfile::tempdir().unwrap();
        let mut opts = options(Action::List, home.path().to_path_buf());
        opts.search = true;
        opts.dirs = vec![PathBuf::from("/no/such/search/root")];
        let err = RunActionUseCase::new(opts)
            .assemble_checkouts()
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_malformed_checkouts_file_is_fatal() {
        let home = tempfile::tempdir().unwrap();
        fs::write(home.path().join(".mvc-checkouts"), "~/prj/alpha\n").unwrap();
        let opts = options(Action::List, home.path().to_path_buf());
        let err = RunActionUseCase::new(opts)
            .assemble_checkouts()
            .await
            .unwrap_err();
        assert!(matches!(err, MvcError::ConfigFormat { .. }));
    }

    #[tokio::test]
    async fn test_run_continues_after_a_command_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let home = tempfile::tempdir().unwrap();
        fs::create_dir_all(home.path().join("prj/alpha/.hg")).unwrap();
        fs::create_dir_all(home.path().join("prj/beta/.hg")).unwrap();

        // Records each subcommand, then hangs on "status" until killed.
        let log = home.path().join("invocations.log");
        let stub = home.path().join("hg-stub");
        fs::write(
            &stub,
            format!(
                "#!/bin/sh\necho \"$1\" >> {}\nif [ \"$1\" = status ]; then exec sleep 10; fi\n",
                log.display()
            ),
        )
        .unwrap();
        let mut perms = fs::metadata(&stub).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&stub, perms).unwrap();

        let mut opts = options(Action::Status, home.path().to_path_buf());
        opts.search = true;
        opts.timeout = Duration::from_millis(300);
        opts.tools.hg_executable = stub.display().to_string();
        RunActionUseCase::new(opts).execute().await.unwrap();

        // Both checkouts ran all three planned commands despite the
        // status command of each timing out.
        let recorded = fs::read_to_string(&log).unwrap();
        let count = |word: &str| recorded.lines().filter(|l| *l == word).count();
        assert_eq!(count("status"), 2);
        assert_eq!(count("outgoing"), 2);
        assert_eq!(count("shelve"), 2);
    }

    #[test]
    fn test_render_list_text() {
        let mut checkouts = CheckoutSet::new();
        checkouts.insert(Checkout::new_unchecked(
            RepoType::Git,
            PathBuf::from("/home/u/prj/alpha"),
            None,
            Some("git@example.org:user/alpha".to_string()),
        ));
        let text = render_list(&checkouts, ListFormat::Text).unwrap();
        assert_eq!(
            text,
            "git /home/u/prj/alpha (git@example.org:user/alpha)\n"
        );
    }

    #[test]
    fn test_render_list_json() {
        let mut checkouts = CheckoutSet::new();
        checkouts.insert(Checkout::new_unchecked(
            RepoType::Svn,
            PathBuf::from("/home/u/prj/beta"),
            None,
            Some("https://example.org/svn/beta".to_string()),
        ));
        let json = render_list(&checkouts, ListFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["repo_type"], "svn");
        assert_eq!(parsed[0]["directory"], "/home/u/prj/beta");
    }

    #[test]
    fn test_render_list_yaml() {
        let mut checkouts = CheckoutSet::new();
        checkouts.insert(Checkout::new_unchecked(
            RepoType::Cvs,
            PathBuf::from("/home/u/prj/gamma"),
            Some("gamma".to_string()),
            Some(":ext:host:/cvsroot".to_string()),
        ));
        let yaml = render_list(&checkouts, ListFormat::Yaml).unwrap();
        assert!(yaml.contains("repo_type: cvs"));
        assert!(yaml.contains("module: gamma"));
    }
}
