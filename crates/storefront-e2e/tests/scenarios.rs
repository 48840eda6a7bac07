//! Scenario suite against the in-memory storefront.

use storefront_e2e::mock::{FakeStoreFactory, FaultPlan};
use storefront_e2e::{
    run_all, run_scenario, Scenario, SuiteConfig, ZeroBadgePolicy, BLUE_TSHIRT,
};

fn config() -> SuiteConfig {
    SuiteConfig::default().with_base_url("http://store.test/")
}

async fn assert_all_pass(factory: &FakeStoreFactory, config: &SuiteConfig) {
    let report = run_all(factory, config, &Scenario::ALL, false).await;
    assert_eq!(report.scenarios.len(), Scenario::ALL.len());
    for scenario in &report.scenarios {
        assert!(
            scenario.passed,
            "{} failed: {:?}",
            scenario.name, scenario.error
        );
    }
    assert!(report.all_passed());
}

mod clean_store {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_every_scenario_passes() {
        assert_all_pass(&FakeStoreFactory::new(), &config()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_names_follow_suite_order() {
        let report = run_all(&FakeStoreFactory::new(), &config(), &Scenario::ALL, false).await;
        let names: Vec<_> = report.scenarios.iter().map(|r| r.name.as_str()).collect();
        let expected: Vec<_> = Scenario::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_scenario_gets_a_fresh_store() {
        let factory = FakeStoreFactory::new();
        let config = config();
        run_scenario(&factory, &config, Scenario::SameProductIncrementsQuantity).await;
        let first = factory.last_opened().unwrap();
        assert_eq!(first.cart_lines(), vec![(BLUE_TSHIRT.to_string(), 3)]);

        run_scenario(&factory, &config, Scenario::EmptyCartState).await;
        let second = factory.last_opened().unwrap();
        assert!(second.cart_lines().is_empty());
        assert_eq!(first.cart_lines().len(), 1);
    }
}

mod flaky_store {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_survives_detached_nodes() {
        let factory = FakeStoreFactory::new().with_faults(FaultPlan::none().with_detach(3));
        assert_all_pass(&factory, &config()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_survives_intercepted_clicks() {
        let factory = FakeStoreFactory::new().with_faults(FaultPlan::none().with_intercept(2));
        assert_all_pass(&factory, &config()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_survives_destroyed_context() {
        let factory =
            FakeStoreFactory::new().with_faults(FaultPlan::none().with_context_destroyed(1));
        assert_all_pass(&factory, &config()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_survives_lagging_labels_and_totals() {
        let factory = FakeStoreFactory::new().with_faults(
            FaultPlan::none().with_label_lag(4).with_totals_lag(3),
        );
        assert_all_pass(&factory, &config()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_exhaustion_is_reported() {
        let factory = FakeStoreFactory::new().with_faults(FaultPlan::none().with_detach(50));
        let report = run_scenario(&factory, &config(), Scenario::RapidFilterToggle).await;
        assert!(!report.passed);
        let error = report.error.unwrap();
        assert!(error.contains("attempt(s)"), "{error}");
    }
}

mod zero_badge {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_rendered_zero_store_with_matching_config() {
        let config = config().with_zero_badge(ZeroBadgePolicy::RenderedZero);
        assert_all_pass(&FakeStoreFactory::new(), &config).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_policy_mismatch_fails_empty_state() {
        let factory = FakeStoreFactory::new().with_zero_badge(ZeroBadgePolicy::RenderedZero);
        let report = run_scenario(&factory, &config(), Scenario::EmptyCartState).await;
        assert!(!report.passed);
        let error = report.error.unwrap();
        assert!(error.contains("Hidden zero badge"), "{error}");
    }
}

mod runner {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fail_fast_stops_at_first_failure() {
        let factory = FakeStoreFactory::new().with_zero_badge(ZeroBadgePolicy::RenderedZero);
        let order = [
            Scenario::SameProductIncrementsQuantity,
            Scenario::EmptyCartState,
            Scenario::SubtotalAccuracy,
        ];
        let report = run_all(&factory, &config(), &order, true).await;
        assert_eq!(report.scenarios.len(), 2);
        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 1);

        let report = run_all(&factory, &config(), &order, false).await;
        assert_eq!(report.scenarios.len(), 3);
        assert_eq!(report.failed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_closed_after_each_scenario() {
        let factory = FakeStoreFactory::new();
        let report = run_scenario(&factory, &config(), Scenario::EmptyCartState).await;
        assert!(report.passed);
        assert!(factory.last_opened().unwrap().is_closed());

        // a failing scenario releases its page too
        let factory = FakeStoreFactory::new().with_zero_badge(ZeroBadgePolicy::RenderedZero);
        let report = run_scenario(&factory, &config(), Scenario::EmptyCartState).await;
        assert!(!report.passed);
        assert!(factory.last_opened().unwrap().is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_store_is_a_failed_report() {
        let config = SuiteConfig::default().with_base_url("store.test");
        let report = run_scenario(&FakeStoreFactory::new(), &config, Scenario::EmptyCartState).await;
        assert!(!report.passed);
        assert!(report.error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_serializes() {
        let report = run_all(
            &FakeStoreFactory::new(),
            &config(),
            &[Scenario::EmptyCartState],
            false,
        )
        .await;
        let json = report.to_json().unwrap();
        assert!(json.contains("\"name\": \"empty-cart-state\""));
        assert!(json.contains("\"passed\": true"));
    }
}
