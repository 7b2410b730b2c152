//! Integration tests for Router dispatch and batch measurement

use async_trait::async_trait;
use latency_exporter::{MetricsRegistry, Router, RouterError, format_all};
use latency_probe::{
    Destination, ExtraData, MeasurementResult, ProbeSettings, Runner, RunnerRegistry,
};
use mockall::mock;
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub ProbeRunner {}

    #[async_trait]
    impl Runner for ProbeRunner {
        async fn run(&self, endpoint: &str) -> MeasurementResult;
        fn method_name(&self) -> &'static str;
    }
}

/// Runner that answers after a fixed delay
struct DelayedRunner {
    delay: Duration,
}

#[async_trait]
impl Runner for DelayedRunner {
    async fn run(&self, endpoint: &str) -> MeasurementResult {
        tokio::time::sleep(self.delay).await;
        MeasurementResult::reachable(self.delay.as_millis() as f64).with_extra(ExtraData::Icmp {
            host: endpoint.to_string(),
        })
    }

    fn method_name(&self) -> &'static str {
        "delayed"
    }
}

/// Helper to create an ICMP destination
fn icmp(slug: &str) -> Destination {
    Destination::new(slug, format!("{}.example.test", slug), "icmp", slug)
}

#[tokio::test]
async fn test_run_measurement_dispatches_endpoint() {
    let mut runner = MockProbeRunner::new();
    runner
        .expect_run()
        .withf(|endpoint| endpoint.to_string() == "10.0.0.1")
        .times(1)
        .returning(|_| MeasurementResult::reachable(4.2));

    let mut registry = RunnerRegistry::new();
    registry.register("icmp", Arc::new(runner));

    let router = Router::with_registry(
        registry,
        vec![Destination::new("a", "10.0.0.1", "icmp", "a")],
        None,
    );

    let destination = router.get_destination_by_slug("a").unwrap().clone();
    let result = router.run_measurement(&destination).await.unwrap();
    assert!(result.success);
    assert_eq!(result.latency_ms, 4.2);
}

#[tokio::test]
async fn test_aliases_resolve_to_same_runner() {
    let mut runner = MockProbeRunner::new();
    runner
        .expect_run()
        .times(2)
        .returning(|_| MeasurementResult::reachable(1.0));
    let runner: Arc<dyn Runner> = Arc::new(runner);

    let mut registry = RunnerRegistry::new();
    registry.register("icmp", runner.clone());
    registry.register("ping", runner);

    let router = Router::with_registry(
        registry,
        vec![
            Destination::new("a", "10.0.0.1", "icmp", "a"),
            Destination::new("b", "10.0.0.2", "ping", "b"),
        ],
        None,
    );

    let results = router.measure_all().await;
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn test_unsupported_method_matches_get_runner() {
    let router = Router::with_registry(RunnerRegistry::new(), vec![], None);
    let destination = Destination::new("ssh", "10.0.0.1:22", "tcp", "ssh");

    let via_runner = router.get_runner("tcp").err().unwrap();
    let via_measurement = router.run_measurement(&destination).await.unwrap_err();

    assert!(matches!(via_runner, RouterError::UnsupportedMethod(_)));
    assert_eq!(via_runner.to_string(), via_measurement.to_string());
}

#[tokio::test]
async fn test_measure_all_skips_failed_destination() {
    let mut runner = MockProbeRunner::new();
    runner
        .expect_run()
        .times(2)
        .returning(|_| MeasurementResult::reachable(10.0));

    let mut registry = RunnerRegistry::new();
    registry.register("icmp", Arc::new(runner));

    let destinations = vec![
        icmp("first"),
        Destination::new("second", "10.0.0.2:22", "tcp", "second"),
        icmp("third"),
    ];
    let router = Router::with_registry(registry, destinations.clone(), None);

    let results = router.measure_all().await;
    assert_eq!(results.len(), 2);
    assert!(!results.contains_key("second"));

    let text = format_all(router.get_all_destinations(), &results);
    let blocks: Vec<&str> = text
        .lines()
        .filter(|line| line.starts_with("latency_measurement_seconds{"))
        .collect();
    assert_eq!(blocks.len(), 2);
    assert!(blocks[0].contains("target=\"first\""));
    assert!(blocks[1].contains("target=\"third\""));
}

#[tokio::test]
async fn test_measure_all_keeps_failed_probe_results() {
    let mut runner = MockProbeRunner::new();
    runner
        .expect_run()
        .returning(|_| MeasurementResult::unreachable("command error: no fping"));

    let mut registry = RunnerRegistry::new();
    registry.register("icmp", Arc::new(runner));

    let router = Router::with_registry(registry, vec![icmp("down")], None);

    let results = router.measure_all().await;
    let result = results.get("down").unwrap();
    assert!(!result.success);
    assert_eq!(result.error_message, "command error: no fping");
}

#[tokio::test]
async fn test_measure_all_output_order_ignores_completion_order() {
    let mut registry = RunnerRegistry::new();
    registry.register("slow", Arc::new(DelayedRunner { delay: Duration::from_millis(150) }));
    registry.register("fast", Arc::new(DelayedRunner { delay: Duration::from_millis(1) }));

    let destinations = vec![
        Destination::new("a", "a.example.test", "slow", "a"),
        Destination::new("b", "b.example.test", "fast", "b"),
        Destination::new("c", "c.example.test", "slow", "c"),
        Destination::new("d", "d.example.test", "fast", "d"),
    ];
    let router = Router::with_registry(registry, destinations, None).max_concurrency(4);

    let results = router.measure_all().await;
    assert_eq!(results.len(), 4);

    let text = format_all(router.get_all_destinations(), &results);
    let order: Vec<usize> = ["\"a\"", "\"b\"", "\"c\"", "\"d\""]
        .iter()
        .map(|slug| text.find(&format!("target={}", slug)).unwrap())
        .collect();
    assert!(order.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test]
async fn test_measure_all_runs_concurrently() {
    let mut registry = RunnerRegistry::new();
    registry.register("slow", Arc::new(DelayedRunner { delay: Duration::from_millis(200) }));

    let destinations = (0..4)
        .map(|i| Destination::new(format!("d{}", i), "x", "slow", format!("d{}", i)))
        .collect();
    let router = Router::with_registry(registry, destinations, None).max_concurrency(4);

    let start = std::time::Instant::now();
    let results = router.measure_all().await;
    assert_eq!(results.len(), 4);
    assert!(start.elapsed() < Duration::from_millis(700));
}

#[tokio::test]
async fn test_measure_all_on_spawned_task() {
    let mut registry = RunnerRegistry::new();
    registry.register("fast", Arc::new(DelayedRunner { delay: Duration::from_millis(1) }));

    let destinations = vec![
        Destination::new("a", "a.example.test", "fast", "a"),
        Destination::new("b", "b.example.test", "tcp", "b"),
        Destination::new("c", "c.example.test", "fast", "c"),
    ];
    let router = Arc::new(Router::with_registry(registry, destinations, None));

    let shared = router.clone();
    let results = tokio::spawn(async move { shared.measure_all().await })
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.contains_key("a"));
    assert!(results.contains_key("c"));
}

#[tokio::test]
async fn test_unreachable_http_destination() {
    let router = Router::new(
        vec![Destination::new("down", "http://127.0.0.1:1/", "http", "down")],
        &ProbeSettings {
            timeout: Duration::from_millis(500),
            ..ProbeSettings::default()
        },
        None,
    )
    .unwrap();

    let destination = router.get_destination_by_slug("down").unwrap().clone();
    let result = router.run_measurement(&destination).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.latency_ms, 0.0);
    assert_eq!(result.extra, ExtraData::Http { status_code: 500 });
}

#[tokio::test]
async fn test_router_records_metrics() {
    let mut runner = MockProbeRunner::new();
    runner
        .expect_run()
        .returning(|_| MeasurementResult::reachable(2.0));

    let mut registry = RunnerRegistry::new();
    registry.register("icmp", Arc::new(runner));

    let metrics = Arc::new(MetricsRegistry::new());
    let router = Router::with_registry(
        registry,
        vec![icmp("up"), Destination::new("bad", "x", "tcp", "bad")],
        Some(metrics.clone()),
    );

    router.measure_all().await;

    let text = metrics.encode().unwrap();
    assert!(text.contains("latency_exporter_destinations 2"));
    assert!(text.contains(r#"latency_exporter_probes_total{method="icmp",outcome="success"} 1"#));
    assert!(text.contains(r#"latency_exporter_skipped_total{reason="unsupported_method"} 1"#));
}
