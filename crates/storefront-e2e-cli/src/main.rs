//! storefront-e2e CLI: run storefront scenarios from the command line
//!
//! ## Usage
//!
//! ```bash
//! storefront-e2e list                              # Show scenarios
//! storefront-e2e run --fake                        # Whole suite, in-memory store
//! storefront-e2e run -s subtotal-accuracy --headed # One scenario in a visible browser
//! storefront-e2e run --report target/e2e.json      # Write a JSON report
//! storefront-e2e config -c suite.yaml              # Effective configuration
//! ```

use clap::Parser;
use std::process::ExitCode;
use storefront_e2e::Scenario;
use storefront_e2e_cli::{
    build_suite_config, run_suite, select_scenarios, Cli, CliError, CliResult, Commands,
    ConfigArgs, Reporter, RunArgs,
};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> CliResult<()> {
    let use_color = cli.color.should_color();
    console::set_colors_enabled(use_color);
    let reporter = Reporter::new(use_color, cli.quiet);

    match cli.command {
        Commands::List => {
            reporter.scenarios(&Scenario::ALL);
            Ok(())
        }
        Commands::Run(args) => run_scenarios(&reporter, &args),
        Commands::Config(args) => print_config(&args),
    }
}

fn run_scenarios(reporter: &Reporter, args: &RunArgs) -> CliResult<()> {
    let config = build_suite_config(&args.suite)?;
    let scenarios = select_scenarios(&args.scenarios)?;

    reporter.header("Storefront scenarios");
    if args.fake {
        reporter.info("using the in-memory storefront");
    } else {
        reporter.info(&format!("storefront: {}", config.base_url));
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(run_suite(&config, &scenarios, args.fake, args.fail_fast))?;

    reporter.summary(&report);

    if let Some(path) = &args.report {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, report.to_json()?)?;
        reporter.info(&format!("report written to {}", path.display()));
    }

    if report.all_passed() {
        Ok(())
    } else {
        Err(CliError::ScenariosFailed {
            failed: report.failed(),
            total: report.scenarios.len(),
        })
    }
}

fn print_config(args: &ConfigArgs) -> CliResult<()> {
    let config = build_suite_config(&args.suite)?;
    print!("{}", serde_yaml_ng::to_string(&config)?);
    Ok(())
}
