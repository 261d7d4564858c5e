use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;

pub const CALL_LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiCallLogEntry {
    pub id: u64,
    pub timestamp: String,
    pub endpoint: String,
    pub method: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallLogSnapshot {
    pub total_calls: u64,
    pub logs: Vec<ApiCallLogEntry>,
}

#[derive(Default)]
struct CallLogState {
    total_calls: u64,
    entries: VecDeque<ApiCallLogEntry>,
}

/// Bounded record of recent API calls. Ids keep counting across evictions.
pub struct CallLog {
    capacity: usize,
    state: Mutex<CallLogState>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::with_capacity(CALL_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CallLogState::default()),
        }
    }

    pub fn record(&self, endpoint: &str, method: &str, status: &str) -> ApiCallLogEntry {
        let timestamp = chrono::Local::now().format("%H:%M:%S").to_string();

        let entry = {
            let mut state = self.state.lock();
            state.total_calls += 1;
            let entry = ApiCallLogEntry {
                id: state.total_calls,
                timestamp,
                endpoint: endpoint.to_string(),
                method: method.to_string(),
                status: status.to_string(),
            };
            state.entries.push_back(entry.clone());
            while state.entries.len() > self.capacity {
                state.entries.pop_front();
            }
            entry
        };

        tracing::info!(
            "[{}] API Call #{}: {} {} - {}",
            entry.timestamp,
            entry.id,
            entry.method,
            entry.endpoint,
            entry.status
        );

        entry
    }

    pub fn snapshot(&self) -> CallLogSnapshot {
        let state = self.state.lock();
        CallLogSnapshot {
            total_calls: state.total_calls,
            logs: state.entries.iter().cloned().collect(),
        }
    }
}

impl Default for CallLog {
    fn default() -> Self {
        Self::new()
    }
}
