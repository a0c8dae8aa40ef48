//! Command line interface.

use std::path::PathBuf;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::{ArgAction, Parser, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use crate::application::dispatch::ToolConfig;
use crate::application::use_cases::{ListFormat, ProgramOptions, RunActionUseCase};
use crate::domain::value_objects::Action;

/// Run a version control command across multiple checkouts.
#[derive(Parser, Debug)]
#[command(
    name = "mvc",
    version,
    about = "Run a version control command, such as status or pull, on a set of \
             CVS/Git/Hg/SVN checkouts rather than just one"
)]
pub struct Cli {
    /// Action to perform: clone (or checkout), status, pull (or update),
    /// or list. Any unambiguous prefix works.
    action: String,

    /// User home directory
    #[arg(long)]
    home: Option<PathBuf>,

    /// File with the list of clones. Set it to /dev/null to suppress reading.
    #[arg(long, default_value = "~/.mvc-checkouts")]
    checkouts: String,

    /// Redo existing clones; relevant only to the clone action
    #[arg(long)]
    redo_existing: bool,

    /// Timeout for each command, in seconds
    #[arg(long, default_value_t = 600)]
    timeout: u64,

    /// Search for all clones, not just those listed in the checkouts file
    #[arg(long)]
    search: bool,

    /// Also accept clones whose directory name extends one listed in the
    /// checkouts file
    #[arg(long)]
    search_prefix: bool,

    /// Directory under which to search for clones; defaults to the home
    /// directory. May be given more than once.
    #[arg(long = "dir")]
    dirs: Vec<String>,

    /// Directory under which NOT to search for clones
    #[arg(long = "ignore-dir")]
    ignore_dirs: Vec<String>,

    /// Path to the cvs program
    #[arg(long, default_value = "cvs")]
    cvs_executable: String,

    /// Path to the git program
    #[arg(long, default_value = "git")]
    git_executable: String,

    /// Path to the hg program
    #[arg(long, default_value = "hg")]
    hg_executable: String,

    /// Path to the svn program
    #[arg(long, default_value = "svn")]
    svn_executable: String,

    /// Pass --insecure to hg commands that contact a remote
    #[arg(long)]
    insecure: bool,

    /// Extra argument to pass to the cvs program
    #[arg(long = "cvs-arg", allow_hyphen_values = true)]
    cvs_args: Vec<String>,

    /// Extra argument to pass to the git program
    #[arg(long = "git-arg", allow_hyphen_values = true)]
    git_args: Vec<String>,

    /// Extra argument to pass to the hg program
    #[arg(long = "hg-arg", allow_hyphen_values = true)]
    hg_args: Vec<String>,

    /// Extra argument to pass to the svn program
    #[arg(long = "svn-arg", allow_hyphen_values = true)]
    svn_args: Vec<String>,

    /// Display commands as they are executed
    #[arg(long)]
    show: bool,

    /// Print each checkout directory before running its commands
    #[arg(long)]
    print_directory: bool,

    /// Do not execute commands, just print them; implies --show and
    /// --redo-existing
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    dry_run: Option<bool>,

    /// Run quietly (e.g., no output about missing directories)
    #[arg(
        short,
        long,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = true,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    quiet: bool,

    /// Print debugging output; implies --show
    #[arg(long)]
    debug: bool,

    /// Debug the rewrite rules applied to command output
    #[arg(long)]
    debug_replacers: bool,

    /// Print raw process output before and after rewriting
    #[arg(long)]
    debug_process_output: bool,

    /// Output format for the list action
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl From<OutputFormat> for ListFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ListFormat::Text,
            OutputFormat::Json => ListFormat::Json,
            OutputFormat::Yaml => ListFormat::Yaml,
        }
    }
}

/// CLI entry point: parses arguments, resolves the effective options,
/// and runs the action.
pub struct CliApp;

impl CliApp {
    /// Run and return the process exit code.
    pub async fn run() -> i32 {
        let cli = match Cli::try_parse() {
            Ok(cli) => cli,
            Err(e) => {
                let _ = e.print();
                return match e.kind() {
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                    _ => 1,
                };
            }
        };

        init_tracing(cli.debug);

        let options = match resolve_options(cli) {
            Ok(options) => options,
            Err(message) => {
                eprintln!("{}", message);
                return 1;
            }
        };

        match RunActionUseCase::new(options).execute().await {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("{} {e}", "Error:".red().bold());
                e.exit_code()
            }
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("mvc=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Apply the defaulting rules that depend on the chosen action, and
/// expand paths against the home directory.
fn resolve_options(cli: Cli) -> Result<ProgramOptions, String> {
    let action: Action = cli
        .action
        .parse()
        .map_err(|_| format!("Unrecognized action \"{}\"", cli.action))?;

    let home = match cli.home {
        Some(home) => home,
        None => std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| "Cannot determine home directory; pass --home".to_string())?,
    };

    let mut search = cli.search;
    let mut show = cli.show;
    let mut redo_existing = cli.redo_existing;
    let mut timeout = cli.timeout;
    let mut dry_run = cli.dry_run;

    if action == Action::Clone {
        search = false;
        show = true;
        // Clones can be much slower than other operations.
        timeout *= 10;
        if dry_run.is_none() {
            if !cli.quiet {
                println!(
                    "No --dry-run argument, so using --dry-run=true; \
                     override with --dry-run=false"
                );
            }
            dry_run = Some(true);
        }
    }
    let dry_run = dry_run.unwrap_or(false);
    if dry_run {
        show = true;
        redo_existing = true;
    }
    if cli.debug {
        show = true;
    }

    let expand = |path: &str| -> PathBuf {
        if path == "~" {
            home.clone()
        } else if let Some(rest) = path.strip_prefix("~/") {
            home.join(rest)
        } else {
            PathBuf::from(path)
        }
    };

    let checkouts_file = expand(&cli.checkouts);
    let mut dirs: Vec<PathBuf> = cli.dirs.iter().map(|d| expand(d)).collect();
    if dirs.is_empty() {
        dirs.push(home.clone());
    }

    Ok(ProgramOptions {
        action,
        home,
        checkouts_file,
        search,
        search_prefix: cli.search_prefix,
        dirs,
        ignore_dirs: cli.ignore_dirs,
        redo_existing,
        timeout: Duration::from_secs(timeout),
        dry_run,
        show,
        print_directory: cli.print_directory,
        quiet: cli.quiet,
        debug: cli.debug,
        debug_replacers: cli.debug_replacers,
        debug_process_output: cli.debug_process_output,
        list_format: cli.output.into(),
        tools: ToolConfig {
            cvs_executable: cli.cvs_executable,
            git_executable: cli.git_executable,
            hg_executable: cli.hg_executable,
            svn_executable: cli.svn_executable,
            cvs_args: cli.cvs_args,
            git_args: cli.git_args,
            hg_args: cli.hg_args,
            svn_args: cli.svn_args,
            insecure: cli.insecure,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_clone_defaults_to_dry_run_with_show() {
        let cli = parse(&["mvc", "clone", "--home", "/home/u"]);
        let options = resolve_options(cli).unwrap();
        assert_eq!(options.action, Action::Clone);
        assert!(options.dry_run);
        assert!(options.show);
        assert!(options.redo_existing);
        assert!(!options.search);
        assert_eq!(options.timeout, Duration::from_secs(6000));
    }

    #[test]
    fn test_clone_with_explicit_dry_run_false() {
        let cli = parse(&["mvc", "clone", "--home", "/home/u", "--dry-run=false"]);
        let options = resolve_options(cli).unwrap();
        assert!(!options.dry_run);
        assert!(options.show);
        assert!(!options.redo_existing);
    }

    #[test]
    fn test_action_prefixes() {
        for (arg, action) in [
            ("st", Action::Status),
            ("up", Action::Pull),
            ("pull", Action::Pull),
            ("li", Action::List),
            ("checkout", Action::Clone),
        ] {
            let cli = parse(&["mvc", arg, "--home", "/home/u"]);
            assert_eq!(resolve_options(cli).unwrap().action, action, "{arg}");
        }
    }

    #[test]
    fn test_unrecognized_action_is_rejected() {
        let cli = parse(&["mvc", "frobnicate", "--home", "/home/u"]);
        assert!(resolve_options(cli).is_err());
    }

    #[test]
    fn test_tilde_expansion_and_default_search_dir() {
        let cli = parse(&["mvc", "status", "--home", "/home/u"]);
        let options = resolve_options(cli).unwrap();
        assert_eq!(
            options.checkouts_file,
            PathBuf::from("/home/u/.mvc-checkouts")
        );
        assert_eq!(options.dirs, vec![PathBuf::from("/home/u")]);
    }

    #[test]
    fn test_quiet_can_be_disabled() {
        let cli = parse(&["mvc", "status", "--home", "/home/u", "--quiet=false"]);
        assert!(!resolve_options(cli).unwrap().quiet);
    }

    #[test]
    fn test_status_keeps_timeout_and_search_flags() {
        let cli = parse(&[
            "mvc",
            "status",
            "--home",
            "/home/u",
            "--search",
            "--timeout",
            "30",
            "--git-arg",
            "-c",
            "--git-arg",
            "color.ui=false",
        ]);
        let options = resolve_options(cli).unwrap();
        assert!(options.search);
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.tools.git_args, vec!["-c", "color.ui=false"]);
    }
}
