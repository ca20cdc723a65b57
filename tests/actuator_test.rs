//! Facade tests: discovery links, info document, built-in providers.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use gg_actuator::health::Status;
use gg_actuator::info::{BuildInfo, GitCommitInfo, GitInfo};
use gg_actuator::{canonical_endpoint, Actuator, ActuatorConfig, ENDPOINTS};
use serde_json::{json, Map};

fn config() -> ActuatorConfig {
    ActuatorConfig {
        app_name: "orders".to_string(),
        app_description: Some("Order service".to_string()),
        endpoint_url: "http://orders.local/actuator".to_string(),
        ..ActuatorConfig::default()
    }
}

// ============================================================================
// Discovery
// ============================================================================

#[test]
fn test_endpoint_links_cover_every_endpoint() {
    let links = Actuator::new(config()).endpoint_links();

    assert_eq!(links.links["self"].href, "http://orders.local/actuator");
    for name in ENDPOINTS {
        let link = &links.links[name];
        assert_eq!(link.href, format!("http://orders.local/actuator/{}", name));
        assert!(!link.templated);
    }

    let json = serde_json::to_value(&links).unwrap();
    assert_eq!(json["_links"]["health"]["href"], "http://orders.local/actuator/health");
}

#[test]
fn test_endpoint_aliases_resolve() {
    assert_eq!(canonical_endpoint("dump"), Some("threaddump"));
    assert_eq!(canonical_endpoint("trace"), Some("httptrace"));
    assert_eq!(canonical_endpoint("loggers"), Some("loggers"));
    assert_eq!(canonical_endpoint("shutdown"), None);
}

// ============================================================================
// Info
// ============================================================================

#[test]
fn test_info_contains_app_details() {
    let info = Actuator::new(config()).info();
    assert_eq!(info, json!({"app": {"name": "orders", "description": "Order service"}}));
}

#[test]
fn test_info_with_build_git_and_additional() {
    let actuator = Actuator::new(config());
    actuator.set_build_info(BuildInfo {
        version: Some("2.0.1".to_string()),
        artifact: Some("orders".to_string()),
        ..Default::default()
    });
    actuator.set_git_info(GitInfo {
        commit: GitCommitInfo {
            time: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
            id: "1a2b3c".to_string(),
        },
        branch: Some("main".to_string()),
    });
    let mut extra = Map::new();
    extra.insert("owner".to_string(), json!("payments"));
    actuator.set_additional_info(extra);

    let info = actuator.info();
    assert_eq!(info["build"]["version"], "2.0.1");
    assert_eq!(info["git"]["commit"]["id"], "1a2b3c");
    assert_eq!(info["git"]["branch"], "main");
    assert_eq!(info["owner"], "payments");
}

// ============================================================================
// Built-in Providers
// ============================================================================

#[test]
fn test_builtin_providers_registered() {
    let actuator = Actuator::with_builtin_providers(config());

    let names = actuator.metric_names().names;
    assert!(names.contains(&"thread.count".to_string()));

    let count = actuator.metric("thread.count").unwrap();
    assert!(count.measurements[0].value >= 1.0);

    let env = actuator.environment();
    assert!(env
        .property_sources
        .iter()
        .any(|s| s.name == "systemEnvironment"));

    // diskSpace is present wherever disk information exists.
    let health = actuator.health();
    if let Some(disk) = health.details.get("diskSpace") {
        assert!(matches!(disk.status, Status::Up | Status::Down));
    }
}

#[test]
fn test_http_trace_through_facade() {
    use gg_actuator::httptrace::{Headers, TraceRecord, TraceRequest, TraceResponse};

    let actuator = Actuator::default();
    actuator.record_trace(TraceRecord {
        timestamp: Utc::now(),
        principal: None,
        session: None,
        request: TraceRequest {
            method: "POST".to_string(),
            uri: "/orders".to_string(),
            headers: Headers::new(),
        },
        response: TraceResponse {
            status: 201,
            headers: Headers::new(),
        },
        time_taken_millis: 12,
    });

    let traces = actuator.http_trace().traces;
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0].response.status, 201);
}

#[test]
fn test_registration_disabled_without_url() {
    let actuator = Actuator::new(config());
    assert!(actuator.registration_heartbeat().is_none());
}

#[test]
fn test_logging_subscriber_feeds_logfile() {
    use gg_actuator::telemetry::{build_subscriber, LogConfig};

    let actuator = Arc::new(Actuator::new(config()));
    let subscriber = build_subscriber(&LogConfig::default(), &actuator).unwrap();
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(target: "orders::api", "order accepted");
    });

    let text = actuator.logfile(None).unwrap().slice.text;
    assert!(text.contains("order accepted"));
    assert!(actuator.loggers().loggers.contains_key("orders::api"));
}
