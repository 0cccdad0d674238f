use serde::Serialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub type RequestId = u64;

#[derive(Debug, Clone)]
struct ActiveRequest {
    method: String,
    path: String,
    client: IpAddr,
    started: Instant,
}

#[derive(Debug, Default)]
struct Registry {
    next_id: RequestId,
    active: HashMap<RequestId, ActiveRequest>,
}

/// Registry of in-flight requests, shared by the tracking middleware and the
/// health endpoints. Ids come from a counter kept under the same lock, so they
/// are unique for the life of the process.
#[derive(Clone)]
pub struct RequestTracker {
    registry: Arc<Mutex<Registry>>,
    start_time: Instant,
    slow_threshold: Duration,
    long_running_threshold: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestAge {
    pub id: RequestId,
    pub method: String,
    pub path: String,
    pub client: String,
    #[serde(serialize_with = "serialize_secs")]
    pub age: Duration,
}

/// State of the registry at one instant.
#[derive(Debug, Clone)]
pub struct TrackerSnapshot {
    pub active_count: usize,
    pub oldest_age: Option<Duration>,
    /// Oldest first.
    pub requests: Vec<RequestAge>,
}

impl TrackerSnapshot {
    pub fn long_running(&self, threshold: Duration) -> usize {
        self.requests.iter().filter(|r| r.age >= threshold).count()
    }
}

/// Ends its request when dropped, so cancelled or panicking handlers are
/// deregistered too.
pub struct RequestGuard {
    tracker: RequestTracker,
    id: RequestId,
    started: Instant,
}

impl RequestGuard {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.tracker.end(self.id);
    }
}

impl RequestTracker {
    pub fn new(slow_threshold: Duration, long_running_threshold: Duration) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            start_time: Instant::now(),
            slow_threshold,
            long_running_threshold,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn begin(&self, method: &str, path: &str, client: IpAddr) -> RequestGuard {
        self.begin_at(method, path, client, Instant::now())
    }

    pub fn begin_at(&self, method: &str, path: &str, client: IpAddr, now: Instant) -> RequestGuard {
        let id = {
            let mut reg = self.lock();
            reg.next_id += 1;
            let id = reg.next_id;
            reg.active.insert(
                id,
                ActiveRequest { method: method.to_string(), path: path.to_string(), client, started: now },
            );
            id
        };
        RequestGuard { tracker: self.clone(), id, started: now }
    }

    /// Removes `id` and returns how long it was active. Ending twice is a no-op.
    pub fn end(&self, id: RequestId) -> Option<Duration> {
        self.lock().active.remove(&id).map(|r| r.started.elapsed())
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        let reg = self.lock();
        let now = Instant::now();
        let mut requests: Vec<RequestAge> = reg
            .active
            .iter()
            .map(|(id, r)| RequestAge {
                id: *id,
                method: r.method.clone(),
                path: r.path.clone(),
                client: r.client.to_string(),
                age: now.saturating_duration_since(r.started),
            })
            .collect();
        drop(reg);

        requests.sort_by(|a, b| b.age.cmp(&a.age).then_with(|| a.id.cmp(&b.id)));
        TrackerSnapshot {
            active_count: requests.len(),
            oldest_age: requests.first().map(|r| r.age),
            requests,
        }
    }

    pub fn active_count(&self) -> usize {
        self.lock().active.len()
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn slow_threshold(&self) -> Duration {
        self.slow_threshold
    }

    pub fn long_running_threshold(&self) -> Duration {
        self.long_running_threshold
    }
}

/// Seconds with two decimals, the unit of every age in the API.
pub fn round_secs(d: Duration) -> f64 {
    (d.as_secs_f64() * 100.0).round() / 100.0
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(round_secs(*d))
}
