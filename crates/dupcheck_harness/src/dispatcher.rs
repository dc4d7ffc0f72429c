#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use serde_json::Value;

use crate::client::{CreatedRecord, Endpoint, RemoteClientRuntime, RemoteError};
use dupcheck_contracts::outcome::TestOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// All attempts issued back to back, none waiting on a completion.
    Simultaneous,
    /// Fixed sub-second delay between issuances, emulating rapid
    /// re-submission; prior completions are still never awaited.
    Staggered { interval_ms: u64 },
}

/// Issues `count` requests against one endpoint and waits for every attempt
/// to settle before returning. The returned sequence is ordered by
/// `attempt_index` (submission order); completion order is unspecified and
/// never observable in the result. Each attempt owns its slot: a timeout or
/// panic settles that slot as unreachable and touches nothing else.
pub async fn dispatch<F>(
    client: &RemoteClientRuntime,
    endpoint: Endpoint,
    mut payload_factory: F,
    count: u16,
    mode: DispatchMode,
    timeout_ms: u64,
) -> Vec<TestOutcome>
where
    F: FnMut(u16) -> Value,
{
    let mut handles = Vec::with_capacity(usize::from(count));
    for attempt_index in 0..count {
        if attempt_index > 0 {
            if let DispatchMode::Staggered { interval_ms } = mode {
                tokio::time::sleep(Duration::from_millis(interval_ms)).await;
            }
        }
        let payload = payload_factory(attempt_index);
        let task_client = client.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let started = Instant::now();
            let submitted = task_client.submit(endpoint, &payload, timeout_ms);
            let latency_ms = started.elapsed().as_millis() as u64;
            settle(attempt_index, latency_ms, submitted)
        }));
    }

    let mut outcomes = Vec::with_capacity(usize::from(count));
    for (attempt_index, handle) in handles.into_iter().enumerate() {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(_) => TestOutcome::unreachable(
                attempt_index as u16,
                0,
                "dispatch task aborted before settlement".to_string(),
            ),
        };
        outcomes.push(outcome);
    }
    outcomes
}

fn settle(
    attempt_index: u16,
    latency_ms: u64,
    submitted: Result<CreatedRecord, RemoteError>,
) -> TestOutcome {
    match submitted {
        Ok(record) => TestOutcome::created(attempt_index, latency_ms, record.id),
        Err(RemoteError::Rejected { status, message }) => {
            TestOutcome::rejected(attempt_index, latency_ms, status, message)
        }
        Err(RemoteError::Unreachable { cause }) => {
            TestOutcome::unreachable(attempt_index, latency_ms, cause)
        }
        Err(RemoteError::Malformed { detail }) => {
            TestOutcome::malformed(attempt_index, latency_ms, detail)
        }
    }
}
