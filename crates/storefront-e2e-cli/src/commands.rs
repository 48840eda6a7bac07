//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use storefront_e2e::ZeroBadgePolicy;

/// storefront-e2e: run resilient end-to-end scenarios against the storefront
#[derive(Parser, Debug)]
#[command(name = "storefront-e2e")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v debug, -vv trace; RUST_LOG wins)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only failures and the summary)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available scenarios
    List,

    /// Run scenarios
    Run(RunArgs),

    /// Print the effective suite configuration as YAML
    Config(ConfigArgs),
}

/// Options shared by commands that build a suite configuration
#[derive(Parser, Debug, Default, Clone)]
pub struct SuiteArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Storefront URL (overrides file and STOREFRONT_URL)
    #[arg(long)]
    pub url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// How the cart header badge renders an empty cart
    #[arg(long)]
    pub zero_badge: Option<ZeroBadgeArg>,
}

/// Arguments for the run command
#[derive(Parser, Debug, Default, Clone)]
pub struct RunArgs {
    /// Scenario to run (repeatable; default: all)
    #[arg(short, long = "scenario", value_name = "NAME")]
    pub scenarios: Vec<String>,

    /// Run against the in-memory storefront instead of a browser
    #[arg(long)]
    pub fake: bool,

    /// Stop at the first failing scenario
    #[arg(long)]
    pub fail_fast: bool,

    /// Write the JSON report to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Suite configuration
    #[command(flatten)]
    pub suite: SuiteArgs,
}

/// Arguments for the config command
#[derive(Parser, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// Suite configuration
    #[command(flatten)]
    pub suite: SuiteArgs,
}

/// Color output argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorArg {
    /// Whether to emit ANSI colors
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => console::Term::stdout().features().colors_supported(),
        }
    }
}

/// Zero-badge policy argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZeroBadgeArg {
    /// Badge disappears at zero items
    Hidden,
    /// Badge stays and reads 0
    RenderedZero,
}

impl From<ZeroBadgeArg> for ZeroBadgePolicy {
    fn from(arg: ZeroBadgeArg) -> Self {
        match arg {
            ZeroBadgeArg::Hidden => Self::Hidden,
            ZeroBadgeArg::RenderedZero => Self::RenderedZero,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_run_defaults() {
        let cli = parse(&["storefront-e2e", "run"]);
        match cli.command {
            Commands::Run(args) => {
                assert!(args.scenarios.is_empty());
                assert!(!args.fake);
                assert!(!args.fail_fast);
                assert!(args.suite.url.is_none());
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_run_repeated_scenarios() {
        let cli = parse(&[
            "storefront-e2e",
            "run",
            "-s",
            "empty-cart-state",
            "--scenario",
            "subtotal-accuracy",
            "--fake",
            "--zero-badge",
            "rendered-zero",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.scenarios, vec!["empty-cart-state", "subtotal-accuracy"]);
                assert!(args.fake);
                assert_eq!(args.suite.zero_badge, Some(ZeroBadgeArg::RenderedZero));
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["storefront-e2e", "list", "-vv", "--color", "never"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.color, ColorArg::Never);
        assert!(!cli.color.should_color());
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["storefront-e2e", "checkout"]).is_err());
    }

    #[test]
    fn test_zero_badge_conversion() {
        assert_eq!(
            ZeroBadgePolicy::from(ZeroBadgeArg::Hidden),
            ZeroBadgePolicy::Hidden
        );
    }
}
