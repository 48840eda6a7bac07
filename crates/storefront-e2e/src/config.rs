//! Suite configuration.
//!
//! Defaults match the timings the suite was tuned against. A YAML file may
//! override any field, and a few environment variables override the file.

use crate::result::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Storefront under test
pub const DEFAULT_BASE_URL: &str = "https://automation-interview.vercel.app/";

/// Environment variable overriding the storefront URL
pub const ENV_BASE_URL: &str = "STOREFRONT_URL";

/// Environment variable overriding the Chromium executable
pub const ENV_CHROMIUM_PATH: &str = "CHROMIUM_PATH";

/// Environment variable toggling headless mode (`0`/`false` for headed)
pub const ENV_HEADLESS: &str = "STOREFRONT_HEADLESS";

/// How the open-panel quantity badge renders an empty cart
///
/// The storefront has shipped both behaviours. Whichever is configured is
/// enforced; the other rendering fails the check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZeroBadgePolicy {
    /// Badge is removed from the header at zero items
    #[default]
    Hidden,
    /// Badge stays and reads "0"
    RenderedZero,
}

/// Timeouts in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Single click dispatch
    pub click_ms: u64,
    /// Confirming a toggle or panel transition
    pub poll_short_ms: u64,
    /// Badge and quantity catch-up
    pub poll_medium_ms: u64,
    /// Subtotal, clearing, empty state
    pub poll_long_ms: u64,
    /// Grid label and cards converging
    pub grid_stable_ms: u64,
    /// A named product appearing in the grid
    pub product_visible_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            click_ms: 3_000,
            poll_short_ms: 5_000,
            poll_medium_ms: 8_000,
            poll_long_ms: 15_000,
            grid_stable_ms: 15_000,
            product_visible_ms: 15_000,
        }
    }
}

impl Timeouts {
    /// Click timeout
    #[must_use]
    pub const fn click(&self) -> Duration {
        Duration::from_millis(self.click_ms)
    }

    /// Short poll timeout
    #[must_use]
    pub const fn poll_short(&self) -> Duration {
        Duration::from_millis(self.poll_short_ms)
    }

    /// Medium poll timeout
    #[must_use]
    pub const fn poll_medium(&self) -> Duration {
        Duration::from_millis(self.poll_medium_ms)
    }

    /// Long poll timeout
    #[must_use]
    pub const fn poll_long(&self) -> Duration {
        Duration::from_millis(self.poll_long_ms)
    }

    /// Grid stability timeout
    #[must_use]
    pub const fn grid_stable(&self) -> Duration {
        Duration::from_millis(self.grid_stable_ms)
    }

    /// Product visibility timeout
    #[must_use]
    pub const fn product_visible(&self) -> Duration {
        Duration::from_millis(self.product_visible_ms)
    }
}

/// Browser launch options (used with the `browser` feature)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    /// Run without a window
    pub headless: bool,
    /// Chromium executable (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Chromium sandbox (disable in containers)
    pub sandbox: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chromium_path: None,
            sandbox: true,
            viewport_width: 1280,
            viewport_height: 900,
        }
    }
}

/// Complete configuration for a suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Storefront URL
    pub base_url: String,
    /// Timeouts
    pub timeouts: Timeouts,
    /// Attempts per resilient interaction
    pub max_attempts: u32,
    /// Wait between retryable attempts
    pub backoff_ms: u64,
    /// Wait between poll reads
    pub poll_interval_ms: u64,
    /// Consecutive equal reads before a value counts as settled
    pub stable_matches: u32,
    /// Open-panel badge rendering at zero items
    pub zero_badge: ZeroBadgePolicy,
    /// Browser launch options
    pub browser: BrowserOptions,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeouts: Timeouts::default(),
            max_attempts: 6,
            backoff_ms: 150,
            poll_interval_ms: 100,
            stable_matches: 2,
            zero_badge: ZeroBadgePolicy::default(),
            browser: BrowserOptions::default(),
        }
    }
}

impl SuiteConfig {
    /// Create default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a YAML file; missing fields keep their defaults
    pub fn from_yaml_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Parse YAML text
    pub fn from_yaml_str(text: &str) -> StoreResult<Self> {
        let config: Self = serde_yaml_ng::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (environment in production)
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|u| !u.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(path) = lookup(ENV_CHROMIUM_PATH).filter(|p| !p.trim().is_empty()) {
            self.browser.chromium_path = Some(path);
        }
        if let Some(flag) = lookup(ENV_HEADLESS) {
            self.browser.headless = !matches!(flag.trim(), "0" | "false" | "no");
        }
        self
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> StoreResult<()> {
        if self.max_attempts == 0 {
            return Err(StoreError::Config {
                message: "max_attempts must be at least 1".into(),
            });
        }
        if self.stable_matches == 0 {
            return Err(StoreError::Config {
                message: "stable_matches must be at least 1".into(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(StoreError::Config {
                message: "poll_interval_ms must be positive".into(),
            });
        }
        origin_of(&self.base_url)?;
        Ok(())
    }

    /// Set the storefront URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set all timeouts
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set the zero-badge policy
    #[must_use]
    pub const fn with_zero_badge(mut self, policy: ZeroBadgePolicy) -> Self {
        self.zero_badge = policy;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.browser.headless = headless;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    /// Poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Retry backoff as Duration
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Origin (`scheme://host[:port]`) of the storefront URL
    pub fn origin(&self) -> StoreResult<String> {
        origin_of(&self.base_url)
    }
}

/// Serialized origin of an absolute http(s) URL.
///
/// Default ports and userinfo are dropped and the host is lowercased, so the
/// result is what the browser reports as `location.origin`.
pub fn origin_of(url: &str) -> StoreResult<String> {
    let invalid = |reason: String| StoreError::Config {
        message: format!("base_url is not an absolute http(s) URL: {url:?} ({reason})"),
    };
    let parsed = url::Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
    }
    Ok(parsed.origin().ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    mod default_tests {
        use super::*;

        #[test]
        fn test_defaults_match_tuned_timings() {
            let config = SuiteConfig::default();
            assert_eq!(config.timeouts.click(), Duration::from_millis(3000));
            assert_eq!(config.timeouts.grid_stable(), Duration::from_secs(15));
            assert_eq!(config.max_attempts, 6);
            assert_eq!(config.backoff(), Duration::from_millis(150));
            assert_eq!(config.stable_matches, 2);
            assert_eq!(config.zero_badge, ZeroBadgePolicy::Hidden);
            assert!(config.browser.headless);
        }

        #[test]
        fn test_builder() {
            let config = SuiteConfig::new()
                .with_base_url("http://localhost:3000/")
                .with_zero_badge(ZeroBadgePolicy::RenderedZero)
                .with_headless(false)
                .with_poll_interval(25);
            assert_eq!(config.base_url, "http://localhost:3000/");
            assert_eq!(config.zero_badge, ZeroBadgePolicy::RenderedZero);
            assert!(!config.browser.headless);
            assert_eq!(config.poll_interval(), Duration::from_millis(25));
        }
    }

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_partial_yaml_keeps_defaults() {
            let config = SuiteConfig::from_yaml_str(
                "base_url: http://localhost:8080/\nzero_badge: rendered-zero\ntimeouts:\n  click_ms: 500\n",
            )
            .unwrap();
            assert_eq!(config.base_url, "http://localhost:8080/");
            assert_eq!(config.zero_badge, ZeroBadgePolicy::RenderedZero);
            assert_eq!(config.timeouts.click_ms, 500);
            assert_eq!(config.timeouts.poll_long_ms, 15_000);
            assert_eq!(config.max_attempts, 6);
        }

        #[test]
        fn test_invalid_yaml_values_rejected() {
            let err = SuiteConfig::from_yaml_str("max_attempts: 0\n").unwrap_err();
            assert!(matches!(err, StoreError::Config { .. }));

            let err = SuiteConfig::from_yaml_str("base_url: not-a-url\n").unwrap_err();
            assert!(matches!(err, StoreError::Config { .. }));
        }

        #[test]
        fn test_from_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "stable_matches: 3").unwrap();
            let config = SuiteConfig::from_yaml_file(file.path()).unwrap();
            assert_eq!(config.stable_matches, 3);
        }

        #[test]
        fn test_missing_file_is_io_error() {
            let err = SuiteConfig::from_yaml_file("/nonexistent/storefront.yaml").unwrap_err();
            assert!(matches!(err, StoreError::Io(_)));
        }
    }

    mod override_tests {
        use super::*;

        #[test]
        fn test_overrides_apply() {
            let env: HashMap<&str, &str> = [
                (ENV_BASE_URL, "http://127.0.0.1:5000/"),
                (ENV_CHROMIUM_PATH, "/usr/bin/chromium"),
                (ENV_HEADLESS, "false"),
            ]
            .into_iter()
            .collect();
            let config = SuiteConfig::default()
                .with_overrides_from(|k| env.get(k).map(|v| (*v).to_string()));
            assert_eq!(config.base_url, "http://127.0.0.1:5000/");
            assert_eq!(
                config.browser.chromium_path.as_deref(),
                Some("/usr/bin/chromium")
            );
            assert!(!config.browser.headless);
        }

        #[test]
        fn test_blank_overrides_ignored() {
            let config = SuiteConfig::default().with_overrides_from(|k| {
                (k == ENV_BASE_URL).then(|| "   ".to_string())
            });
            assert_eq!(config.base_url, DEFAULT_BASE_URL);
        }
    }

    mod origin_tests {
        use super::*;

        #[test]
        fn test_origin_of() {
            assert_eq!(
                origin_of("https://automation-interview.vercel.app/").unwrap(),
                "https://automation-interview.vercel.app"
            );
            assert_eq!(
                origin_of("http://localhost:3000/shop?x=1").unwrap(),
                "http://localhost:3000"
            );
            assert!(origin_of("ftp://host/").is_err());
            assert!(origin_of("https://").is_err());
        }

        #[test]
        fn test_default_port_dropped() {
            assert_eq!(
                origin_of("https://store.test:443/").unwrap(),
                "https://store.test"
            );
            assert_eq!(
                origin_of("http://store.test:80/cart").unwrap(),
                "http://store.test"
            );
            assert_eq!(
                origin_of("http://store.test:8080/").unwrap(),
                "http://store.test:8080"
            );
        }

        #[test]
        fn test_scheme_and_host_case_folded() {
            assert_eq!(
                origin_of("HTTPS://Store.Test/").unwrap(),
                "https://store.test"
            );
        }

        #[test]
        fn test_userinfo_not_in_origin() {
            assert_eq!(
                origin_of("http://user:pw@store.test/").unwrap(),
                "http://store.test"
            );
        }

        #[test]
        fn test_bad_url_is_config_error() {
            let err = origin_of("not a url").unwrap_err();
            assert!(matches!(err, StoreError::Config { .. }));
        }
    }
}
