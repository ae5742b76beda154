//! auto-pr CLI entry point.
//!
//! Parses command-line arguments, builds the collaborators once and
//! dispatches to the command handlers.

use std::time::Duration;

use autopr::commands::{
    config_get_command, config_path_command, config_set_command, config_show_command,
    config_unset_command, create_branch_command, create_pr_command, merge_pr_command,
    status_command, update_pr_command,
};
use autopr::completion::{detect_shell, print_completion_script, ShellType};
use autopr::config::{get_effective_config, ConflictStrategy};
use autopr::error::{AutoPrError, Result};
use autopr::git::{GitCli, Vcs};
use autopr::llm::ModelRouter;
use autopr::logging;
use autopr::output::ErrorDetails;
use autopr::platform::{MergeMethod, PlatformRegistry, ProviderContext};
use autopr::prompt::TerminalPrompter;
use autopr::workflow::{
    CreateBranchOptions, CreateOptions, GenerationOptions, MergeOptions, SystemClock,
    UpdateOptions, WorkflowContext,
};
use clap::{Args, CommandFactory, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "auto-pr")]
#[command(
    version,
    about = "Pull request automation with AI-drafted descriptions and CI-aware merging",
    after_help = "EXAMPLES:
    # Open a PR for the current branch
    auto-pr create-pr --reviewer alice --label enhancement

    # Merge the PR for the current branch once checks pass
    auto-pr merge-pr --merge-method squash --delete-branch

    # Merge in CI without prompts, resolving conflicts by rebase
    auto-pr merge-pr -n 42 --yes --non-interactive --auto-resolve

    # See where a PR stands
    auto-pr status -n 42"
)]
struct Cli {
    /// Only print errors and final results
    #[arg(short, long, global = true, conflicts_with = "debug")]
    quiet: bool,

    /// Show diagnostic logs (external commands, state transitions)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every command that generates text.
#[derive(Args, Debug, Clone, Default)]
struct GenerationArgs {
    /// Print the prompt sent to the model
    #[arg(long)]
    show_prompt: bool,

    /// Language for the generated text (overrides config)
    #[arg(long)]
    language: Option<String>,

    /// Model as provider:model, e.g. openrouter:openai/gpt-4o (overrides config)
    #[arg(long)]
    model: Option<String>,

    /// Extra context for the model, e.g. "fixes #123"
    #[arg(long)]
    hint: Option<String>,
}

impl From<GenerationArgs> for GenerationOptions {
    fn from(args: GenerationArgs) -> Self {
        GenerationOptions {
            model: args.model,
            language: args.language,
            hint: args.hint,
            show_prompt: args.show_prompt,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a pull request for the current branch
    #[command(after_help = "EXAMPLES:
    auto-pr create-pr                      # Generate title and description, confirm, create
    auto-pr create-pr --draft --yes        # Create a draft without confirmation
    auto-pr create-pr --dry-run --verbose  # Preview a detailed description only")]
    CreatePr {
        /// Base branch (default: the repository's default branch)
        #[arg(long)]
        base: Option<String>,

        /// Generate only a title
        #[arg(long)]
        title_only: bool,

        /// Create the PR as a draft
        #[arg(long)]
        draft: bool,

        /// Preview the generated text without pushing or creating
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,

        /// Ask for a more detailed description (testing and notes sections)
        #[arg(short, long)]
        verbose: bool,

        /// Request a review from this user (repeatable)
        #[arg(long = "reviewer", value_name = "USER")]
        reviewers: Vec<String>,

        /// Add this label (repeatable)
        #[arg(long = "label", value_name = "LABEL")]
        labels: Vec<String>,

        #[command(flatten)]
        generation: GenerationArgs,
    },

    /// Merge a pull request once it is safe to do so
    #[command(after_help = "BEHAVIOR:
    Each round re-reads the PR and derives its lifecycle state:
    conflicts are resolved (with --auto-resolve) or explained, running checks
    are waited on, failed checks can be retried, and reviews are enforced.
    The merge commit message is drafted by the model before merging.

EXIT CODES:
    7 platform error, 8 merge conflict, 9 checks failed or pending,
    10 PR blocked or review required")]
    MergePr {
        /// PR number (default: the open PR for the current branch)
        #[arg(short = 'n', long)]
        pr_number: Option<u64>,

        /// merge, squash or rebase (overrides config)
        #[arg(long)]
        merge_method: Option<MergeMethod>,

        /// Generate and print the merge commit message without merging
        #[arg(long)]
        message_only: bool,

        /// Skip the final confirmation and confirm a missing review quorum
        #[arg(short, long)]
        yes: bool,

        /// Resolve conflicts with the base branch automatically
        #[arg(long)]
        auto_resolve: bool,

        /// rebase or merge, for --auto-resolve (overrides config)
        #[arg(long)]
        strategy: Option<ConflictStrategy>,

        /// Fail on running checks instead of waiting
        #[arg(long)]
        no_wait_checks: bool,

        /// Merge regardless of check results
        #[arg(long)]
        ignore_checks: bool,

        /// Seconds to wait for checks (overrides config)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Delete the head branch after merging
        #[arg(long)]
        delete_branch: bool,

        /// Never prompt; take the safe default for every question
        #[arg(long)]
        non_interactive: bool,

        #[command(flatten)]
        generation: GenerationArgs,
    },

    /// Regenerate the description of an existing pull request
    UpdatePr {
        /// PR number (default: the open PR for the current branch)
        #[arg(short = 'n', long)]
        pr_number: Option<u64>,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,

        #[command(flatten)]
        generation: GenerationArgs,
    },

    /// Create a feature branch from the up-to-date base branch
    CreateBranch {
        /// Name of the new branch
        name: String,

        /// Base branch (default: the repository's default branch)
        #[arg(long)]
        base: Option<String>,

        /// Push the branch and set its upstream
        #[arg(long)]
        push: bool,
    },

    /// Show the lifecycle state of a pull request
    Status {
        /// PR number (default: the open PR for the current branch)
        #[arg(short = 'n', long)]
        pr_number: Option<u64>,
    },

    /// Show or edit the global configuration
    #[command(after_help = "EXAMPLES:
    auto-pr config                          # Show the configuration
    auto-pr config set merge_method squash
    auto-pr config unset merge_method       # Back to the default
    auto-pr config path")]
    Config {
        #[command(subcommand)]
        subcommand: Option<ConfigSubcommand>,
    },

    /// Print a shell completion script
    #[command(after_help = "EXAMPLES:
    auto-pr completions zsh > ~/.zfunc/_auto-pr
    auto-pr completions bash > ~/.local/share/bash-completion/completions/auto-pr")]
    Completions {
        /// bash, zsh or fish (default: detected from $SHELL)
        shell: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommand {
    /// Show all values (the default)
    Show,
    /// Print one value
    Get { key: String },
    /// Set a value
    Set { key: String, value: String },
    /// Reset a value to its default
    Unset { key: String },
    /// Print the configuration file locations
    Path,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        ErrorDetails::from(&e).print_panel();
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    // Neither needs a repository or a valid configuration
    match &cli.command {
        Commands::Completions { shell } => {
            let shell = match shell {
                Some(name) => ShellType::from_name(name)?,
                None => detect_shell()?,
            };
            print_completion_script(shell, &mut Cli::command());
            return Ok(());
        }
        Commands::Config { subcommand } => {
            logging::init(logging::resolve_level(cli.debug, cli.quiet, "warn"));
            return run_config(subcommand.as_ref());
        }
        _ => {}
    }

    let config = get_effective_config()?;
    logging::init(logging::resolve_level(cli.debug, cli.quiet, &config.log_level));

    if !GitCli::is_git_repo() {
        return Err(AutoPrError::Git(
            "Not inside a git repository. Run auto-pr from your project directory.".to_string(),
        ));
    }
    let vcs = GitCli::new();
    let remote_url = vcs.remote_url()?;
    let platform = PlatformRegistry::default()
        .resolve(config.platform_kind()?, &ProviderContext::from_env(remote_url))?;
    if !platform.is_available() {
        return Err(AutoPrError::PlatformUnavailable(format!(
            "The {} backend cannot reach the repository",
            platform.name()
        )));
    }
    log::debug!("Using platform backend {}", platform.name());
    let llm = ModelRouter::new();
    let non_interactive = matches!(
        cli.command,
        Commands::MergePr {
            non_interactive: true,
            ..
        }
    );
    let prompter = TerminalPrompter::new(non_interactive);
    let clock = SystemClock;

    let ctx = WorkflowContext {
        config: &config,
        platform: &*platform,
        vcs: &vcs,
        llm: &llm,
        prompter: &prompter,
        clock: &clock,
        quiet: cli.quiet,
    };
    dispatch(cli.command, &ctx)
}

fn run_config(subcommand: Option<&ConfigSubcommand>) -> Result<()> {
    match subcommand {
        None | Some(ConfigSubcommand::Show) => config_show_command(),
        Some(ConfigSubcommand::Get { key }) => config_get_command(key),
        Some(ConfigSubcommand::Set { key, value }) => config_set_command(key, value),
        Some(ConfigSubcommand::Unset { key }) => config_unset_command(key),
        Some(ConfigSubcommand::Path) => config_path_command(),
    }
}

fn dispatch(command: Commands, ctx: &WorkflowContext) -> Result<()> {
    match command {
        Commands::CreatePr {
            base,
            title_only,
            draft,
            dry_run,
            yes,
            verbose,
            reviewers,
            labels,
            generation,
        } => create_pr_command(
            ctx,
            &CreateOptions {
                base,
                title_only,
                draft,
                dry_run,
                yes,
                verbose,
                reviewers,
                labels,
                generation: generation.into(),
            },
        ),

        Commands::MergePr {
            pr_number,
            merge_method,
            message_only,
            yes,
            auto_resolve,
            strategy,
            no_wait_checks,
            ignore_checks,
            timeout,
            delete_branch,
            non_interactive: _,
            generation,
        } => merge_pr_command(
            ctx,
            &MergeOptions {
                pr_number,
                merge_method,
                message_only,
                yes,
                auto_resolve: auto_resolve.then_some(true),
                strategy,
                no_wait_checks,
                ignore_checks,
                timeout: timeout.map(Duration::from_secs),
                delete_branch,
                generation: generation.into(),
            },
        ),

        Commands::UpdatePr {
            pr_number,
            yes,
            generation,
        } => update_pr_command(
            ctx,
            &UpdateOptions {
                pr_number,
                yes,
                generation: generation.into(),
            },
        ),

        Commands::CreateBranch { name, base, push } => {
            create_branch_command(ctx, &CreateBranchOptions { name, base, push })
        }

        Commands::Status { pr_number } => status_command(ctx, pr_number),

        // Handled in `run` before the collaborators exist
        Commands::Config { .. } | Commands::Completions { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_create_pr_flags() {
        let cli = Cli::try_parse_from([
            "auto-pr",
            "create-pr",
            "--base",
            "develop",
            "--draft",
            "--reviewer",
            "alice",
            "--reviewer",
            "bob",
            "--label",
            "ci",
            "--hint",
            "fixes #12",
        ])
        .unwrap();

        match cli.command {
            Commands::CreatePr {
                base,
                draft,
                reviewers,
                labels,
                generation,
                ..
            } => {
                assert_eq!(base.as_deref(), Some("develop"));
                assert!(draft);
                assert_eq!(reviewers, vec!["alice", "bob"]);
                assert_eq!(labels, vec!["ci"]);
                assert_eq!(generation.hint.as_deref(), Some("fixes #12"));
            }
            other => panic!("parsed as {:?}", other),
        }
    }

    #[test]
    fn test_merge_pr_flags() {
        let cli = Cli::try_parse_from([
            "auto-pr",
            "merge-pr",
            "-n",
            "42",
            "--merge-method",
            "squash",
            "--strategy",
            "merge",
            "--timeout",
            "120",
            "--auto-resolve",
            "--non-interactive",
        ])
        .unwrap();

        match cli.command {
            Commands::MergePr {
                pr_number,
                merge_method,
                strategy,
                timeout,
                auto_resolve,
                non_interactive,
                ..
            } => {
                assert_eq!(pr_number, Some(42));
                assert_eq!(merge_method, Some(MergeMethod::Squash));
                assert_eq!(strategy, Some(ConflictStrategy::Merge));
                assert_eq!(timeout, Some(120));
                assert!(auto_resolve);
                assert!(non_interactive);
            }
            other => panic!("parsed as {:?}", other),
        }
    }

    #[test]
    fn test_invalid_merge_method_is_rejected() {
        assert!(Cli::try_parse_from(["auto-pr", "merge-pr", "--merge-method", "octopus"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["auto-pr", "status", "-n", "7", "--quiet"]).unwrap();
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Status { pr_number: Some(7) }));
    }

    #[test]
    fn test_quiet_conflicts_with_debug() {
        assert!(Cli::try_parse_from(["auto-pr", "--quiet", "--debug", "status"]).is_err());
    }

    #[test]
    fn test_config_subcommands() {
        let cli = Cli::try_parse_from(["auto-pr", "config"]).unwrap();
        assert!(matches!(cli.command, Commands::Config { subcommand: None }));

        let cli = Cli::try_parse_from(["auto-pr", "config", "set", "merge_method", "squash"]).unwrap();
        match cli.command {
            Commands::Config {
                subcommand: Some(ConfigSubcommand::Set { key, value }),
            } => {
                assert_eq!(key, "merge_method");
                assert_eq!(value, "squash");
            }
            other => panic!("parsed as {:?}", other),
        }
    }

    #[test]
    fn test_create_branch_requires_name() {
        assert!(Cli::try_parse_from(["auto-pr", "create-branch"]).is_err());
        let cli = Cli::try_parse_from(["auto-pr", "create-branch", "feature/x", "--push"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::CreateBranch { ref name, push: true, .. } if name == "feature/x"
        ));
    }

    #[test]
    fn test_generation_args_convert() {
        let options: GenerationOptions = GenerationArgs {
            show_prompt: true,
            language: Some("German".into()),
            model: Some("fireworks:llama".into()),
            hint: None,
        }
        .into();
        assert!(options.show_prompt);
        assert_eq!(options.language.as_deref(), Some("German"));
        assert_eq!(options.model.as_deref(), Some("fireworks:llama"));
    }
}
