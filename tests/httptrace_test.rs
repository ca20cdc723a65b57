//! HTTP trace store tests.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use chrono::Utc;
use gg_actuator::httptrace::{
    Headers, HttpTracer, Principal, TraceRecord, TraceRequest, TraceResponse, MAX_TRACES,
};
use gg_actuator::scrubber::REDACTED;

fn headers(pairs: &[(&str, &str)]) -> Headers {
    let mut map = BTreeMap::new();
    for (k, v) in pairs {
        map.entry(k.to_string()).or_insert_with(Vec::new).push(v.to_string());
    }
    map
}

fn record(uri: &str) -> TraceRecord {
    TraceRecord {
        timestamp: Utc::now(),
        principal: None,
        session: None,
        request: TraceRequest {
            method: "GET".to_string(),
            uri: uri.to_string(),
            headers: headers(&[("Host", "example.org")]),
        },
        response: TraceResponse {
            status: 200,
            headers: Headers::new(),
        },
        time_taken_millis: 3,
    }
}

// ============================================================================
// Capacity
// ============================================================================

#[test]
fn test_keeps_last_hundred_in_order() {
    let tracer = HttpTracer::new();
    for i in 0..105 {
        tracer.record(record(&format!("/item/{}", i)));
    }

    let traces = tracer.snapshot();
    assert_eq!(traces.len(), MAX_TRACES);
    assert_eq!(traces.first().unwrap().request.uri, "/item/5");
    assert_eq!(traces.last().unwrap().request.uri, "/item/104");
    for (idx, trace) in traces.iter().enumerate() {
        assert_eq!(trace.request.uri, format!("/item/{}", idx + 5));
    }
}

#[test]
fn test_snapshot_is_a_copy() {
    let tracer = HttpTracer::new();
    tracer.record(record("/a"));

    let mut copy = tracer.snapshot();
    copy[0].request.uri = "/tampered".to_string();
    copy.clear();

    assert_eq!(tracer.len(), 1);
    assert_eq!(tracer.snapshot()[0].request.uri, "/a");
}

#[test]
fn test_concurrent_records_respect_capacity() {
    let tracer = Arc::new(HttpTracer::with_capacity(50));
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let tracer = Arc::clone(&tracer);
            thread::spawn(move || {
                for i in 0..100 {
                    tracer.record(record(&format!("/t{}/{}", t, i)));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(tracer.len(), 50);
}

// ============================================================================
// Scrubbing
// ============================================================================

#[test]
fn test_secret_headers_scrubbed_on_write() {
    let tracer = HttpTracer::new();
    let mut rec = record("/login");
    rec.principal = Some(Principal {
        name: "alice".to_string(),
    });
    rec.request.headers = headers(&[
        ("Authorization", "Bearer abc"),
        ("Cookie", "session=1"),
        ("X-Api-Key", "k"),
        ("Host", "example.org"),
    ]);
    rec.response.headers = headers(&[("Set-Cookie", "session=2"), ("Content-Type", "text/html")]);
    tracer.record(rec);

    let stored = &tracer.snapshot()[0];
    assert_eq!(stored.request.headers["Authorization"], vec![REDACTED]);
    assert_eq!(stored.request.headers["Cookie"], vec![REDACTED]);
    assert_eq!(stored.request.headers["X-Api-Key"], vec![REDACTED]);
    assert_eq!(stored.request.headers["Host"], vec!["example.org"]);
    assert_eq!(stored.response.headers["Set-Cookie"], vec![REDACTED]);
    assert_eq!(stored.response.headers["Content-Type"], vec!["text/html"]);
}

#[test]
fn test_multi_valued_headers_each_scrubbed() {
    let tracer = HttpTracer::new();
    let mut rec = record("/");
    rec.request.headers = headers(&[("X-Token", "a"), ("X-Token", "b")]);
    tracer.record(rec);

    assert_eq!(tracer.snapshot()[0].request.headers["X-Token"], vec![REDACTED, REDACTED]);
}

// ============================================================================
// Wire Format
// ============================================================================

#[test]
fn test_trace_serializes_with_console_keys() {
    let tracer = HttpTracer::new();
    tracer.record(record("/health"));

    let json = serde_json::to_value(tracer.traces()).unwrap();
    let trace = &json["traces"][0];
    assert_eq!(trace["timeTaken"], 3);
    assert_eq!(trace["request"]["method"], "GET");
    assert_eq!(trace["response"]["status"], 200);
    assert!(trace["timestamp"].is_string());
}
