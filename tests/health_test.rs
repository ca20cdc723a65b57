//! Health aggregation tests.

use std::sync::Arc;

use gg_actuator::health::{
    aggregate, combine, CompositeHealthProvider, DiskSpaceHealthProvider, FnHealthProvider,
    HealthCheckError, HealthProvider, HealthRegistry, HealthStatus, Status,
};
use gg_actuator::Actuator;

fn fixed(name: &str, status: Status) -> Arc<dyn HealthProvider> {
    Arc::new(FnHealthProvider::new(name, move || Ok(HealthStatus::new(status))))
}

struct Unsupported;

impl HealthProvider for Unsupported {
    fn is_supported(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "redis"
    }

    fn health(&self) -> Result<HealthStatus, HealthCheckError> {
        panic!("unsupported providers must never be probed");
    }
}

// ============================================================================
// Status Algebra
// ============================================================================

#[test]
fn test_zero_providers_is_up() {
    let summary = aggregate(&[]);
    assert_eq!(summary.status, Status::Up);
    assert!(summary.details.is_empty());
    assert_eq!(summary.http_status(), 200);
}

#[test]
fn test_up_and_unknown_is_up() {
    let summary = aggregate(&[fixed("a", Status::Up), fixed("b", Status::Unknown)]);
    assert_eq!(summary.status, Status::Up);
}

#[test]
fn test_down_dominates() {
    let summary = aggregate(&[fixed("a", Status::Down), fixed("b", Status::Up)]);
    assert_eq!(summary.status, Status::Down);
    assert_eq!(summary.http_status(), 503);
}

#[test]
fn test_all_unknown_is_unknown() {
    let summary = aggregate(&[fixed("a", Status::Unknown), fixed("b", Status::Unknown)]);
    assert_eq!(summary.status, Status::Unknown);
}

#[test]
fn test_combine_precedence() {
    assert_eq!(combine(&[Status::Up, Status::Up]), Status::Up);
    assert_eq!(combine(&[Status::Unknown, Status::Down, Status::Up]), Status::Down);
    assert_eq!(combine(&[Status::Unknown]), Status::Unknown);
}

// ============================================================================
// Provider Handling
// ============================================================================

#[test]
fn test_unsupported_providers_are_excluded() {
    let unsupported: Arc<dyn HealthProvider> = Arc::new(Unsupported);
    let summary = aggregate(&[Arc::clone(&unsupported), fixed("db", Status::Up)]);
    assert_eq!(summary.status, Status::Up);
    assert!(summary.details.contains_key("db"));
    assert!(!summary.details.contains_key("redis"));

    let only_unsupported = aggregate(&[unsupported]);
    assert_eq!(only_unsupported.status, Status::Up);
}

#[test]
fn test_provider_error_becomes_down_with_message() {
    let failing: Arc<dyn HealthProvider> = Arc::new(FnHealthProvider::new("db", || {
        Err(HealthCheckError::Unreachable("connection refused".to_string()))
    }));
    let summary = aggregate(&[failing, fixed("cache", Status::Up)]);

    assert_eq!(summary.status, Status::Down);
    let db = &summary.details["db"];
    assert_eq!(db.status, Status::Down);
    assert!(db.details["error"].as_str().unwrap().contains("connection refused"));
}

#[test]
fn test_provider_panic_becomes_down() {
    let panicking: Arc<dyn HealthProvider> =
        Arc::new(FnHealthProvider::new("flaky", || panic!("probe exploded")));
    let summary = aggregate(&[panicking]);

    assert_eq!(summary.status, Status::Down);
    assert_eq!(summary.details["flaky"].details["error"], "probe exploded");
}

#[test]
fn test_details_carry_provider_payload() {
    let provider: Arc<dyn HealthProvider> = Arc::new(FnHealthProvider::new("db", || {
        Ok(HealthStatus::up().with_detail("engine", "postgres"))
    }));
    let summary = aggregate(&[provider]);
    assert_eq!(summary.details["db"].details["engine"], "postgres");
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn test_composite_nests_the_same_algebra() {
    let group: Arc<dyn HealthProvider> = Arc::new(CompositeHealthProvider::new(
        "storage",
        vec![fixed("primary", Status::Up), fixed("replica", Status::Down)],
    ));
    let summary = aggregate(&[group, fixed("cache", Status::Up)]);

    assert_eq!(summary.status, Status::Down);
    let storage = &summary.details["storage"];
    assert_eq!(storage.status, Status::Down);
    assert_eq!(storage.details["replica"]["status"], "DOWN");
    assert_eq!(storage.details["primary"]["status"], "UP");
}

#[test]
fn test_empty_composite_is_up() {
    let group = CompositeHealthProvider::new("empty", Vec::new());
    assert_eq!(group.health().unwrap().status, Status::Up);
}

// ============================================================================
// Registry / Built-ins
// ============================================================================

#[test]
fn test_registry_aggregates_registered_providers() {
    let registry = HealthRegistry::new();
    assert!(registry.is_empty());
    registry.register(fixed("a", Status::Up));
    registry.register(fixed("b", Status::Unknown));
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.aggregate().status, Status::Up);
}

#[test]
fn test_disk_space_threshold() {
    // Skip where no disk information is available.
    let Some(roomy) = DiskSpaceHealthProvider::for_current_dir(0) else {
        return;
    };
    let status = roomy.health().unwrap();
    assert_eq!(status.details["threshold"], 0);
    assert!(status.details.contains_key("total"));
    assert!(status.details.contains_key("free"));

    let impossible = DiskSpaceHealthProvider::for_current_dir(u64::MAX).unwrap();
    assert_eq!(impossible.health().unwrap().status, Status::Down);
}

#[test]
fn test_facade_health_summary_serializes() {
    let actuator = Actuator::default();
    actuator.register_health_provider(fixed("db", Status::Up));

    let json = serde_json::to_value(actuator.health()).unwrap();
    assert_eq!(json["status"], "UP");
    assert_eq!(json["details"]["db"]["status"], "UP");
}
