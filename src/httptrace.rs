//! Bounded history of observed HTTP exchanges.
//!
//! Header values are scrubbed once, when a record is written. Readers only
//! ever get copies of the stored records.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::scrubber::scrub_header_value;

/// Number of exchanges kept before the oldest is evicted.
pub const MAX_TRACES: usize = 100;

/// Multi-valued header mapping.
pub type Headers = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRequest {
    pub method: String,
    pub uri: String,
    pub headers: Headers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceResponse {
    pub status: u16,
    pub headers: Headers,
}

/// One request/response pair as seen at the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRecord {
    pub timestamp: DateTime<Utc>,
    pub principal: Option<Principal>,
    pub session: Option<Session>,
    pub request: TraceRequest,
    pub response: TraceResponse,
    #[serde(rename = "timeTaken")]
    pub time_taken_millis: u64,
}

/// Payload of the `httptrace` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Traces {
    pub traces: Vec<TraceRecord>,
}

/// FIFO store of the last [`MAX_TRACES`] exchanges.
pub struct HttpTracer {
    capacity: usize,
    traces: Mutex<VecDeque<TraceRecord>>,
}

impl HttpTracer {
    pub fn new() -> Self {
        Self::with_capacity(MAX_TRACES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            traces: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Scrub and store a record, evicting the oldest one when full.
    pub fn record(&self, mut record: TraceRecord) {
        scrub_headers(&mut record.request.headers);
        scrub_headers(&mut record.response.headers);

        let mut traces = self.traces.lock();
        if traces.len() >= self.capacity {
            traces.pop_front();
        }
        traces.push_back(record);
    }

    /// Copy of the stored records, oldest first.
    pub fn snapshot(&self) -> Vec<TraceRecord> {
        self.traces.lock().iter().cloned().collect()
    }

    pub fn traces(&self) -> Traces {
        Traces {
            traces: self.snapshot(),
        }
    }

    pub fn len(&self) -> usize {
        self.traces.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HttpTracer {
    fn default() -> Self {
        Self::new()
    }
}

fn scrub_headers(headers: &mut Headers) {
    for (name, values) in headers.iter_mut() {
        for value in values.iter_mut() {
            *value = scrub_header_value(name, value);
        }
    }
}
