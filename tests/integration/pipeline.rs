//! End-to-end runs of the agent framework over in-memory collaborators.

use std::sync::Arc;

use dealhunter::engine::framework::DealAgentFramework;
use dealhunter::engine::planner::{PlanningAgent, MAX_DEALS_PER_RUN};
use dealhunter::error::PipelineError;
use dealhunter::storage;
use dealhunter::types::PlanOutcome;

use crate::fakes::{deal, FakeDealSource, RecordingNotifier, TableEstimator};

fn temp_path() -> String {
    let mut p = std::env::temp_dir();
    p.push(format!("dealhunter_it_memory_{}.json", uuid::Uuid::new_v4()));
    p.to_string_lossy().to_string()
}

struct Harness {
    source: Arc<FakeDealSource>,
    frontier: Arc<TableEstimator>,
    specialist: Arc<TableEstimator>,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    /// Frontier and specialist disagree by ±10 around the listed value.
    fn new(catalogue: &[(&str, f64, f64)]) -> Self {
        let deals = catalogue.iter().map(|(d, price, _)| deal(d, *price)).collect();
        let high: Vec<(&str, f64)> = catalogue.iter().map(|(d, _, v)| (*d, v + 10.0)).collect();
        let low: Vec<(&str, f64)> = catalogue.iter().map(|(d, _, v)| (*d, v - 10.0)).collect();
        Self {
            source: Arc::new(FakeDealSource::new(deals)),
            frontier: Arc::new(TableEstimator::new("Frontier", &high)),
            specialist: Arc::new(TableEstimator::new("Specialist", &low)),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    fn planner(&self) -> PlanningAgent {
        PlanningAgent::new(
            self.source.clone(),
            self.frontier.clone(),
            self.specialist.clone(),
            self.notifier.clone(),
        )
    }
}

#[tokio::test]
async fn test_surfaced_deal_is_remembered_across_runs() {
    let path = temp_path();
    let harness = Harness::new(&[
        ("Dyson V8 cordless vacuum", 299.0, 469.0),
        ("Roku Express streaming stick", 19.0, 29.0),
    ]);

    let mut framework = DealAgentFramework::new(harness.planner(), path.clone()).unwrap();

    // First run: the vacuum clears the threshold.
    let first = framework.run().await.unwrap();
    let surfaced = first.surfaced().unwrap();
    assert_eq!(surfaced.url(), "https://deals.example.com/dyson-v8-cordless-vacuum");
    assert_eq!(surfaced.estimate(), 469.0);
    assert_eq!(surfaced.discount(), 170.0);
    assert_eq!(harness.notifier.alerts().len(), 1);

    // Second run: the vacuum is in memory, the Roku is not worth an alert.
    let second = framework.run().await.unwrap();
    assert!(matches!(second, PlanOutcome::BelowThreshold(ref best) if best.discount() == 10.0));
    assert_eq!(harness.notifier.alerts().len(), 1);

    let scans = harness.source.scans();
    assert_eq!(scans.len(), 2);
    assert!(scans[0].is_empty());
    assert!(scans[1].contains("https://deals.example.com/dyson-v8-cordless-vacuum"));

    // A fresh framework on the same file picks the memory back up.
    let restored = DealAgentFramework::new(harness.planner(), path.clone()).unwrap();
    assert_eq!(restored.memory().len(), 1);

    storage::delete_memory(Some(&path)).unwrap();
}

#[tokio::test]
async fn test_delivery_failure_still_surfaces_and_persists() {
    let path = temp_path();
    let harness = Harness::new(&[("Nintendo Switch OLED", 249.0, 349.0)]);
    harness.notifier.set_failing(true);

    let mut framework = DealAgentFramework::new(harness.planner(), path.clone()).unwrap();
    let outcome = framework.run().await.unwrap();

    match &outcome {
        PlanOutcome::Notified { opportunity, delivered } => {
            assert!(!delivered);
            assert_eq!(opportunity.discount(), 100.0);
        }
        other => panic!("expected notified, got {other:?}"),
    }
    assert_eq!(harness.notifier.alerts().len(), 1);
    assert_eq!(storage::load_memory(Some(&path)).unwrap().len(), 1);

    storage::delete_memory(Some(&path)).unwrap();
}

#[tokio::test]
async fn test_only_the_first_candidates_are_priced() {
    let path = temp_path();
    let names: Vec<String> = (0..8).map(|i| format!("Gadget {i}")).collect();
    let catalogue: Vec<(&str, f64, f64)> = names.iter().map(|n| (n.as_str(), 100.0, 110.0)).collect();
    let harness = Harness::new(&catalogue);

    let mut framework = DealAgentFramework::new(harness.planner(), path).unwrap();
    let outcome = framework.run().await.unwrap();

    assert!(matches!(outcome, PlanOutcome::BelowThreshold(_)));
    assert_eq!(harness.frontier.calls().len(), MAX_DEALS_PER_RUN);
    assert_eq!(harness.specialist.calls().len(), MAX_DEALS_PER_RUN);
    assert!(!harness.frontier.calls().contains(&"Gadget 5".to_string()));
    assert!(harness.notifier.alerts().is_empty());
}

#[tokio::test]
async fn test_unknown_products_fail_the_run() {
    let path = temp_path();
    let harness = Harness::new(&[]);
    let source = Arc::new(FakeDealSource::new(vec![deal("Mystery box", 10.0)]));
    let planner = PlanningAgent::new(
        source,
        harness.frontier.clone(),
        harness.specialist.clone(),
        harness.notifier.clone(),
    );

    let mut framework = DealAgentFramework::new(planner, path).unwrap();
    let err = framework.run().await.unwrap_err();

    assert_eq!(
        err.downcast_ref::<PipelineError>(),
        Some(&PipelineError::RunFailed { attempted: 1 })
    );
    assert!(harness.notifier.alerts().is_empty());
    assert_eq!(framework.stats().failed_runs, 1);
}

#[tokio::test]
async fn test_source_outage_then_recovery() {
    let path = temp_path();
    let harness = Harness::new(&[("Weber Spirit gas grill", 399.0, 549.0)]);
    harness.source.set_error("feed returned HTTP 503");

    let mut framework = DealAgentFramework::new(harness.planner(), path.clone()).unwrap();
    let err = framework.run().await.unwrap_err();
    assert!(err.to_string().contains("deal source unavailable"));
    assert!(framework.memory().is_empty());
    assert!(harness.frontier.calls().is_empty());

    harness.source.clear_error();
    let outcome = framework.run().await.unwrap();
    assert_eq!(outcome.surfaced().map(|o| o.discount()), Some(150.0));
    assert_eq!(framework.stats().runs, 2);
    assert_eq!(framework.stats().failed_runs, 1);
    assert_eq!(framework.stats().opportunities_surfaced, 1);

    storage::delete_memory(Some(&path)).unwrap();
}
