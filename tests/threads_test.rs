//! Thread dump tests.

use gg_actuator::threads::{thread_state, ThreadSnapshotProvider};
use gg_actuator::Actuator;

#[test]
fn test_snapshot_lists_calling_thread_with_frames() {
    let dump = ThreadSnapshotProvider::new().snapshot();
    assert!(!dump.threads.is_empty());

    let with_frames: Vec<_> = dump
        .threads
        .iter()
        .filter(|t| !t.stack_trace.is_empty())
        .collect();
    assert_eq!(with_frames.len(), 1, "only the calling thread carries frames");
    assert_eq!(with_frames[0].thread_state, "RUNNABLE");
}

#[cfg(target_os = "linux")]
#[test]
fn test_snapshot_sees_named_worker_thread() {
    use std::sync::mpsc;
    use std::thread;

    let (ready_tx, ready_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let worker = thread::Builder::new()
        .name("gg-dump-worker".to_string())
        .spawn(move || {
            ready_tx.send(()).unwrap();
            done_rx.recv().unwrap();
        })
        .unwrap();
    ready_rx.recv().unwrap();

    let dump = ThreadSnapshotProvider::new().snapshot();
    let found = dump
        .threads
        .iter()
        .find(|t| t.thread_name == "gg-dump-worker")
        .cloned();

    done_tx.send(()).unwrap();
    worker.join().unwrap();

    let worker_info = found.expect("worker thread should be listed");
    assert!(worker_info.thread_id.is_some());
    assert!(worker_info.daemon);
    assert!(worker_info.stack_trace.is_empty());
    assert!(ThreadSnapshotProvider::new().thread_count() >= 1);
}

#[test]
fn test_state_heuristic_is_documented_approximation() {
    assert_eq!(thread_state(Some(-5)), "NEW");
    assert_eq!(thread_state(Some(0)), "RUNNABLE");
}

#[test]
fn test_dump_serializes_console_fields() {
    let dump = Actuator::default().thread_dump();
    let json = serde_json::to_value(&dump).unwrap();
    let thread = json["threads"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| !t["stackTrace"].as_array().unwrap().is_empty())
        .unwrap();

    for key in ["threadName", "threadId", "daemon", "suspended", "threadState"] {
        assert!(thread.get(key).is_some(), "missing {key}");
    }
    let frame = &thread["stackTrace"][0];
    for key in ["methodName", "fileName", "lineNumber", "className", "nativeMethod"] {
        assert!(frame.get(key).is_some(), "missing {key}");
    }
}
