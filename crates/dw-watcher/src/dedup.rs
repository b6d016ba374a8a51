//! Duplicate suppression for change events.
//!
//! Editors and the OS report a single save as several notifications. Two
//! policies decide which of them trigger an extraction:
//!
//! | Policy | Key | Rejects |
//! |--------|-----|---------|
//! | [`ImmediateDedup`] | path, operation, observed second | an event equal to the previous accepted one |
//! | [`WindowedDebounce`] | path, operation (`Create` folds into `Write`) | events for a key whose extraction is pending |
//!
//! [`EventGate`] wraps the configured policy and returns an [`Admission`]
//! carrying the delay before extraction.
//!
//! # Windowed Timeline
//!
//! ```text
//! t=0    WRITE a.go   → accepted, extraction scheduled at t=100
//! t=10   WRITE a.go   → dropped (pending)
//! t=40   CREATE a.go  → dropped (folds into WRITE, pending)
//! t=100  window elapses → key released, extraction runs
//! t=150  WRITE a.go   → accepted again
//! ```

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use dw_core::{DedupPolicy, WatchConfig};

use crate::events::{ChangeEvent, Operation};

/// Identity of an event under the immediate policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    /// Event path.
    pub path: Utf8PathBuf,
    /// Event operation.
    pub operation: Operation,
    /// Observation time in whole seconds.
    pub second: i64,
}

impl From<&ChangeEvent> for DedupKey {
    fn from(event: &ChangeEvent) -> Self {
        Self {
            path: event.path.clone(),
            operation: event.operation,
            second: event.observed_second(),
        }
    }
}

/// Identity of an event under the windowed policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DebounceKey {
    /// Event path.
    pub path: Utf8PathBuf,
    /// Event operation, with `Create` folded into `Write`.
    pub operation: Operation,
}

impl From<&ChangeEvent> for DebounceKey {
    fn from(event: &ChangeEvent) -> Self {
        let operation = match event.operation {
            Operation::Create => Operation::Write,
            other => other,
        };
        Self {
            path: event.path.clone(),
            operation,
        }
    }
}

/// Rejects an event identical to the immediately preceding accepted one.
///
/// A rejection clears the memory, so in a run of identical events every
/// other one is accepted.
///
/// # Examples
///
/// ```
/// use dw_watcher::{ChangeEvent, ImmediateDedup, Operation};
/// use camino::Utf8PathBuf;
///
/// let event = ChangeEvent::new(Utf8PathBuf::from("a.go"), Operation::Write);
/// let mut dedup = ImmediateDedup::new();
/// assert!(dedup.accept(&event));
/// assert!(!dedup.accept(&event));
/// assert!(dedup.accept(&event));
/// ```
#[derive(Debug, Default)]
pub struct ImmediateDedup {
    last: Option<DedupKey>,
}

impl ImmediateDedup {
    /// Creates a dedup filter with no memory.
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Returns `true` if the event should be processed.
    pub fn accept(&mut self, event: &ChangeEvent) -> bool {
        let key = DedupKey::from(event);
        if self.last.as_ref() == Some(&key) {
            self.last = None;
            return false;
        }
        self.last = Some(key);
        true
    }
}

type PendingTable = Arc<Mutex<FxHashSet<DebounceKey>>>;

/// Accepts the first event per key and drops repeats while it is pending.
///
/// The table is shared with every outstanding [`DebounceTicket`]; releasing
/// a ticket reopens its key.
#[derive(Debug, Clone)]
pub struct WindowedDebounce {
    window: Duration,
    pending: PendingTable,
}

impl WindowedDebounce {
    /// Creates a debouncer with the given quiescence window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Arc::default(),
        }
    }

    /// The quiescence window.
    #[inline]
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Claims the event's key. Returns `None` if it is already pending.
    pub fn accept(&self, event: &ChangeEvent) -> Option<DebounceTicket> {
        let key = DebounceKey::from(event);
        let inserted = self.pending.lock().insert(key.clone());
        inserted.then(|| DebounceTicket {
            key: Some(key),
            table: Arc::clone(&self.pending),
        })
    }

    /// Number of keys currently pending.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}

/// Claim on a pending debounce key.
///
/// The key is released by [`DebounceTicket::release`] or when the ticket is
/// dropped, whichever comes first.
#[derive(Debug)]
pub struct DebounceTicket {
    key: Option<DebounceKey>,
    table: PendingTable,
}

impl DebounceTicket {
    /// Releases the key so later events for it are accepted.
    pub fn release(mut self) {
        self.release_key();
    }

    fn release_key(&mut self) {
        if let Some(key) = self.key.take() {
            self.table.lock().remove(&key);
        }
    }
}

impl Drop for DebounceTicket {
    fn drop(&mut self) {
        self.release_key();
    }
}

/// Permission to extract an accepted event.
#[derive(Debug)]
pub struct Admission {
    delay: Duration,
    ticket: Option<DebounceTicket>,
}

impl Admission {
    /// How long to wait before extracting.
    #[inline]
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Ends the quiescence period, releasing any debounce key.
    ///
    /// Call after the delay and before extraction starts.
    pub fn settle(self) {
        if let Some(ticket) = self.ticket {
            ticket.release();
        }
    }
}

/// The configured duplicate-suppression policy.
///
/// # Examples
///
/// ```
/// use dw_core::WatchConfig;
/// use dw_watcher::{ChangeEvent, EventGate, Operation};
/// use camino::Utf8PathBuf;
///
/// let mut gate = EventGate::from_config(&WatchConfig::default());
/// let event = ChangeEvent::new(Utf8PathBuf::from("a.go"), Operation::Write);
///
/// let admission = gate.accept(&event).expect("first event is accepted");
/// assert_eq!(admission.delay().as_millis(), 100);
/// assert!(gate.accept(&event).is_none());
///
/// admission.settle();
/// assert!(gate.accept(&event).is_some());
/// ```
#[derive(Debug)]
pub enum EventGate {
    /// Immediate consecutive-duplicate suppression.
    Immediate(ImmediateDedup),
    /// Windowed debounce.
    Windowed(WindowedDebounce),
}

impl EventGate {
    /// Builds the gate selected by the configuration.
    #[must_use]
    pub fn from_config(config: &WatchConfig) -> Self {
        match config.dedup {
            DedupPolicy::Immediate => Self::Immediate(ImmediateDedup::new()),
            DedupPolicy::Windowed => Self::Windowed(WindowedDebounce::new(config.debounce_window())),
        }
    }

    /// Returns an [`Admission`] if the event should trigger an extraction.
    pub fn accept(&mut self, event: &ChangeEvent) -> Option<Admission> {
        match self {
            Self::Immediate(dedup) => dedup.accept(event).then_some(Admission {
                delay: Duration::ZERO,
                ticket: None,
            }),
            Self::Windowed(debounce) => debounce.accept(event).map(|ticket| Admission {
                delay: debounce.window(),
                ticket: Some(ticket),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn event_at(path: &str, operation: Operation, second: i64) -> ChangeEvent {
        let at = Local
            .timestamp_opt(second, 0)
            .single()
            .expect("valid timestamp");
        ChangeEvent::with_time(Utf8PathBuf::from(path), operation, at)
    }

    #[test]
    fn test_immediate_third_identical_event_is_accepted() {
        let mut dedup = ImmediateDedup::new();
        let event = event_at("a.go", Operation::Write, 100);

        let results: Vec<_> = (0..3).map(|_| dedup.accept(&event)).collect();
        assert_eq!(results, [true, false, true]);
    }

    #[test]
    fn test_immediate_distinguishes_operation_and_second() {
        let mut dedup = ImmediateDedup::new();
        assert!(dedup.accept(&event_at("a.go", Operation::Write, 100)));
        assert!(dedup.accept(&event_at("a.go", Operation::Create, 100)));
        assert!(dedup.accept(&event_at("a.go", Operation::Create, 101)));
        assert!(dedup.accept(&event_at("b.go", Operation::Create, 101)));
    }

    #[test]
    fn test_immediate_only_compares_with_previous() {
        let mut dedup = ImmediateDedup::new();
        let a = event_at("a.go", Operation::Write, 100);
        let b = event_at("b.go", Operation::Write, 100);
        assert!(dedup.accept(&a));
        assert!(dedup.accept(&b));
        assert!(dedup.accept(&a));
    }

    #[test]
    fn test_windowed_burst_collapses() {
        let debounce = WindowedDebounce::new(Duration::from_millis(100));
        let first = debounce.accept(&event_at("a.go", Operation::Write, 1));
        assert!(first.is_some());

        for second in 1..5 {
            assert!(debounce.accept(&event_at("a.go", Operation::Write, second)).is_none());
        }
        assert!(debounce.accept(&event_at("a.go", Operation::Create, 2)).is_none());
        assert_eq!(debounce.pending_len(), 1);
    }

    #[test]
    fn test_windowed_release_reopens_key() {
        let debounce = WindowedDebounce::new(Duration::from_millis(100));
        let event = event_at("a.go", Operation::Write, 1);

        let ticket = debounce.accept(&event).expect("accepted");
        ticket.release();
        assert_eq!(debounce.pending_len(), 0);
        assert!(debounce.accept(&event).is_some());
    }

    #[test]
    fn test_windowed_ticket_drop_releases() {
        let debounce = WindowedDebounce::new(Duration::from_millis(100));
        let event = event_at("a.go", Operation::Write, 1);
        drop(debounce.accept(&event));
        assert_eq!(debounce.pending_len(), 0);
    }

    #[test]
    fn test_windowed_keys_are_independent() {
        let debounce = WindowedDebounce::new(Duration::from_millis(100));
        let _a = debounce.accept(&event_at("a.go", Operation::Write, 1)).expect("a");
        let _b = debounce.accept(&event_at("b.go", Operation::Write, 1)).expect("b");
        let _chmod = debounce
            .accept(&event_at("a.go", Operation::Chmod, 1))
            .expect("chmod is its own key");
        assert_eq!(debounce.pending_len(), 3);
    }

    #[test]
    fn test_windowed_claim_is_exclusive_across_threads() {
        let debounce = WindowedDebounce::new(Duration::from_millis(100));
        let event = event_at("a.go", Operation::Write, 1);

        let tickets: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| debounce.accept(&event)))
                .collect();
            handles
                .into_iter()
                .filter_map(|h| h.join().expect("thread panicked"))
                .collect()
        });

        assert_eq!(tickets.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_suppresses_until_window_settles() {
        let mut gate = EventGate::from_config(&WatchConfig::default());
        let event = ChangeEvent::new(Utf8PathBuf::from("a.go"), Operation::Write);

        let admission = gate.accept(&event).expect("first event is accepted");
        let started = tokio::time::Instant::now();

        tokio::time::sleep(admission.delay() / 2).await;
        assert!(gate.accept(&event).is_none());

        tokio::time::sleep(admission.delay() / 2).await;
        assert_eq!(started.elapsed(), Duration::from_millis(100));
        admission.settle();

        assert!(gate.accept(&event).is_some());
    }

    #[test]
    fn test_gate_immediate_has_no_delay() {
        let config = WatchConfig {
            dedup: DedupPolicy::Immediate,
            ..WatchConfig::default()
        };
        let mut gate = EventGate::from_config(&config);
        let admission = gate
            .accept(&event_at("a.go", Operation::Write, 1))
            .expect("accepted");
        assert_eq!(admission.delay(), Duration::ZERO);
    }
}
