//! Thread dumps of the running process.
//!
//! Thread enumeration comes from the OS (`/proc/self/task` on Linux, the
//! calling thread elsewhere). Rust offers no portable way to walk another
//! thread's stack, so only the calling thread carries frames; every other
//! thread is reported with an empty stack.
//!
//! Two fields are approximations and are documented as such:
//! - `threadState` is `NEW` for a negative id and `RUNNABLE` otherwise. No
//!   scheduler state machine is consulted.
//! - `className` is guessed from the demangled symbol path: the segment
//!   owning the function, if it looks like a type name. Free functions,
//!   closures and unresolved frames report no type.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// One frame of a captured stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub method_name: String,
    pub file_name: String,
    pub line_number: u32,
    #[serde(rename = "className")]
    pub declaring_type: Option<String>,
    pub native_method: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadInfo {
    pub thread_name: String,
    pub thread_id: Option<i64>,
    pub daemon: bool,
    pub suspended: bool,
    pub thread_state: String,
    pub stack_trace: Vec<StackFrame>,
}

/// Payload of the `threaddump` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadDump {
    pub threads: Vec<ThreadInfo>,
}

/// A thread known to the OS at the time of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveThread {
    pub id: Option<i64>,
    pub name: String,
    pub stopped: bool,
}

/// Captures thread dumps on demand.
#[derive(Debug, Default, Clone)]
pub struct ThreadSnapshotProvider;

impl ThreadSnapshotProvider {
    pub fn new() -> Self {
        Self
    }

    /// Snapshot every live thread.
    pub fn snapshot(&self) -> ThreadDump {
        let frames = capture_current_stack();
        let current = current_thread_id();
        let pid = i64::from(std::process::id());

        let threads = live_threads()
            .into_iter()
            .map(|thread| {
                let is_current = thread.id == current;
                ThreadInfo {
                    thread_state: thread_state(thread.id).to_string(),
                    daemon: thread.id.is_some_and(|id| id != pid),
                    suspended: thread.stopped,
                    stack_trace: if is_current { frames.clone() } else { Vec::new() },
                    thread_name: thread.name,
                    thread_id: thread.id,
                }
            })
            .collect();

        ThreadDump { threads }
    }

    /// Number of live threads in the process.
    pub fn thread_count(&self) -> usize {
        live_threads().len()
    }
}

/// Heuristic thread state.
pub fn thread_state(id: Option<i64>) -> &'static str {
    match id {
        Some(id) if id < 0 => "NEW",
        _ => "RUNNABLE",
    }
}

#[cfg(target_os = "linux")]
fn current_thread_id() -> Option<i64> {
    let link = std::fs::read_link("/proc/thread-self").ok()?;
    link.file_name()?.to_str()?.parse().ok()
}

#[cfg(not(target_os = "linux"))]
fn current_thread_id() -> Option<i64> {
    None
}

#[cfg(target_os = "linux")]
fn live_threads() -> Vec<LiveThread> {
    let entries = match std::fs::read_dir("/proc/self/task") {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(error = %e, "cannot enumerate /proc/self/task");
            return vec![calling_thread()];
        }
    };

    let mut threads: Vec<LiveThread> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let id: i64 = entry.file_name().to_str()?.parse().ok()?;
            let dir = entry.path();
            let name = std::fs::read_to_string(dir.join("comm"))
                .map(|s| s.trim_end().to_string())
                .unwrap_or_else(|_| format!("thread-{}", id));
            let stopped = std::fs::read_to_string(dir.join("stat"))
                .ok()
                .and_then(|stat| stat_state(&stat))
                .is_some_and(|state| state == 'T' || state == 't');
            Some(LiveThread {
                id: Some(id),
                name,
                stopped,
            })
        })
        .collect();

    threads.sort_by_key(|t| t.id);
    threads
}

#[cfg(not(target_os = "linux"))]
fn live_threads() -> Vec<LiveThread> {
    vec![calling_thread()]
}

fn calling_thread() -> LiveThread {
    let current = std::thread::current();
    LiveThread {
        id: current_thread_id(),
        name: current.name().unwrap_or("unnamed").to_string(),
        stopped: false,
    }
}

/// State letter from a `/proc/<pid>/task/<tid>/stat` line. The command name
/// is parenthesised and may itself contain `)`, so scan from the last one.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn stat_state(stat: &str) -> Option<char> {
    let rest = &stat[stat.rfind(')')? + 1..];
    rest.trim_start().chars().next()
}

fn capture_current_stack() -> Vec<StackFrame> {
    let trace = backtrace::Backtrace::new();
    let mut frames = Vec::new();

    for frame in trace.frames() {
        let symbols = frame.symbols();
        if symbols.is_empty() {
            frames.push(StackFrame {
                method_name: format!("{:?}", frame.ip()),
                file_name: "<unknown>".to_string(),
                line_number: 0,
                declaring_type: None,
                native_method: true,
            });
            continue;
        }

        for symbol in symbols {
            let path = symbol
                .name()
                .map(|n| format!("{:#}", n))
                .unwrap_or_else(|| "<unknown>".to_string());
            if path.starts_with("backtrace::") {
                continue;
            }
            let (method_name, declaring_type) = split_symbol(&path);
            let file_name = symbol
                .filename()
                .and_then(Path::file_name)
                .map(|f| f.to_string_lossy().into_owned());

            frames.push(StackFrame {
                method_name,
                native_method: file_name.is_none(),
                file_name: file_name.unwrap_or_else(|| "<unknown>".to_string()),
                line_number: symbol.lineno().unwrap_or(0),
                declaring_type,
            });
        }
    }

    frames
}

/// Split a demangled path into the function name and a best-effort owning
/// type.
fn split_symbol(path: &str) -> (String, Option<String>) {
    let (owner, method) = match last_top_level_separator(path) {
        Some(idx) => (&path[..idx], &path[idx + 2..]),
        None => ("", path),
    };

    let owner = match owner.strip_prefix('<') {
        Some(qualified) => qualified
            .split(" as ")
            .next()
            .unwrap_or(qualified)
            .trim_end_matches('>'),
        None => owner,
    };

    let declaring_type = owner
        .rsplit("::")
        .next()
        .map(|segment| segment.split('<').next().unwrap_or(segment))
        .filter(|segment| segment.chars().next().is_some_and(|c| c.is_ascii_uppercase()))
        .map(str::to_string);

    (method.to_string(), declaring_type)
}

/// Byte index of the last `::` outside any `<...>` group.
fn last_top_level_separator(path: &str) -> Option<usize> {
    let bytes = path.as_bytes();
    let mut depth = 0usize;
    let mut found = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                found = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    found
}
