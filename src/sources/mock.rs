//! Mock checker for testing purposes.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::models::{Citation, Status};
use crate::sources::{CheckerCapabilities, StatusChecker};

/// A mock checker that returns scripted statuses and records how it was called.
#[derive(Debug)]
pub struct MockChecker {
    id: String,
    default_status: Status,
    overrides: Mutex<HashMap<String, Status>>,
    panic_on: Mutex<HashSet<String>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockChecker {
    /// Create a mock checker answering `status` for every citation
    pub fn new(id: impl Into<String>, status: Status) -> Self {
        Self {
            id: id.into(),
            default_status: status,
            overrides: Mutex::new(HashMap::new()),
            panic_on: Mutex::new(HashSet::new()),
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Sleep this long inside every check
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer `status` for citations with this number
    pub fn set_status(&self, number: &str, status: Status) {
        let mut guard = self.overrides.lock().unwrap();
        guard.insert(number.to_string(), status);
    }

    /// Panic when asked about citations with this number
    pub fn panic_on(&self, number: &str) {
        let mut guard = self.panic_on.lock().unwrap();
        guard.insert(number.to_string());
    }

    /// Number of checks started so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of checks that were running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn scripted_status(&self, citation: &Citation) -> Status {
        if self.panic_on.lock().unwrap().contains(&citation.number) {
            panic!("mock checker asked to fail on {}", citation.number);
        }

        self.overrides
            .lock()
            .unwrap()
            .get(&citation.number)
            .copied()
            .unwrap_or(self.default_status)
    }
}

/// Decrements the in-flight counter even when the check panics
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StatusChecker for MockChecker {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Checker"
    }

    fn capabilities(&self) -> CheckerCapabilities {
        CheckerCapabilities::QUERY_SEARCH
    }

    async fn check(&self, citation: &Citation) -> Status {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.scripted_status(citation)
    }
}
