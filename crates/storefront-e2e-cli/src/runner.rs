//! Suite assembly: configuration layering, scenario selection, driver choice

use crate::commands::SuiteArgs;
use crate::error::{CliError, CliResult};
use storefront_e2e::mock::FakeStoreFactory;
use storefront_e2e::{run_all, Scenario, SuiteConfig, SuiteReport};

/// Build the effective configuration.
///
/// Layers, lowest first: defaults or the YAML file, environment, flags.
pub fn build_suite_config(args: &SuiteArgs) -> CliResult<SuiteConfig> {
    let config = match &args.config {
        Some(path) => SuiteConfig::from_yaml_file(path)?,
        None => SuiteConfig::default(),
    };
    let mut config = config.with_env_overrides();
    if let Some(url) = &args.url {
        config = config.with_base_url(url.clone());
    }
    if args.headed {
        config = config.with_headless(false);
    }
    if let Some(policy) = args.zero_badge {
        config = config.with_zero_badge(policy.into());
    }
    config.validate()?;
    Ok(config)
}

/// Resolve scenario names; no names means the whole suite
pub fn select_scenarios(names: &[String]) -> CliResult<Vec<Scenario>> {
    if names.is_empty() {
        return Ok(Scenario::ALL.to_vec());
    }
    names
        .iter()
        .map(|name| {
            name.parse::<Scenario>().map_err(|_| {
                let known: Vec<_> = Scenario::ALL.iter().map(|s| s.name()).collect();
                CliError::invalid_argument(format!(
                    "unknown scenario {name:?} (known: {})",
                    known.join(", ")
                ))
            })
        })
        .collect()
}

/// Run the selected scenarios against the in-memory store or a browser
pub async fn run_suite(
    config: &SuiteConfig,
    scenarios: &[Scenario],
    fake: bool,
    fail_fast: bool,
) -> CliResult<SuiteReport> {
    if fake {
        tracing::info!(count = scenarios.len(), "running against the in-memory storefront");
        let factory = FakeStoreFactory::new();
        return Ok(run_all(&factory, config, scenarios, fail_fast).await);
    }
    run_in_browser(config, scenarios, fail_fast).await
}

#[cfg(feature = "browser")]
async fn run_in_browser(
    config: &SuiteConfig,
    scenarios: &[Scenario],
    fail_fast: bool,
) -> CliResult<SuiteReport> {
    tracing::info!(url = %config.base_url, count = scenarios.len(), "running in chromium");
    let factory = storefront_e2e::ChromiumFactory::new();
    let report = run_all(&factory, config, scenarios, fail_fast).await;
    factory.close().await?;
    Ok(report)
}

#[cfg(not(feature = "browser"))]
async fn run_in_browser(
    _config: &SuiteConfig,
    _scenarios: &[Scenario],
    _fail_fast: bool,
) -> CliResult<SuiteReport> {
    Err(CliError::BrowserUnavailable)
}
