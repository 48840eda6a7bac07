//! Terminal output for scenario runs

use console::{style, Term};
use storefront_e2e::{Scenario, ScenarioReport, SuiteReport};

/// Writes scenario results to the terminal
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    use_color: bool,
    quiet: bool,
}

impl Reporter {
    /// Reporter on stdout
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            use_color,
            quiet,
        }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        self.line("");
        self.line(&styled);
    }

    /// Print the scenario catalogue
    pub fn scenarios(&self, scenarios: &[Scenario]) {
        for scenario in scenarios {
            let name = if self.use_color {
                style(scenario.name()).cyan().to_string()
            } else {
                scenario.name().to_string()
            };
            self.line(&format!("{name:<34} {}", scenario.description()));
        }
    }

    /// Print one scenario result; failures print even in quiet mode
    pub fn scenario(&self, report: &ScenarioReport) {
        if report.passed {
            if self.quiet {
                return;
            }
            let prefix = if self.use_color {
                style("✓").green().bold().to_string()
            } else {
                "PASS".to_string()
            };
            self.line(&format!("{prefix} {} ({}ms)", report.name, report.duration_ms));
        } else {
            let prefix = if self.use_color {
                style("✗").red().bold().to_string()
            } else {
                "FAIL".to_string()
            };
            self.line(&format!("{prefix} {} ({}ms)", report.name, report.duration_ms));
            if let Some(error) = &report.error {
                self.line(&format!("    {error}"));
            }
        }
    }

    /// Print every result and the totals
    pub fn summary(&self, report: &SuiteReport) {
        for scenario in &report.scenarios {
            self.scenario(scenario);
        }
        let totals = format!(
            "{} passed, {} failed, {} total",
            report.passed(),
            report.failed(),
            report.scenarios.len()
        );
        let totals = match (self.use_color, report.all_passed()) {
            (false, _) => totals,
            (true, true) => style(totals).green().to_string(),
            (true, false) => style(totals).red().to_string(),
        };
        self.line("");
        self.line(&totals);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }
}
