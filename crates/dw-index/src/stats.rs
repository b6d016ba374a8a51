//! Pipeline statistics with atomic counters.
//!
//! [`PipelineStats`] is shared by the event loop and the extraction tasks;
//! [`StatsSnapshot`] is the copy logged at shutdown and returned in the run
//! summary.
//!
//! All counters use [`AtomicU64`] with
//! [`Relaxed`](std::sync::atomic::Ordering::Relaxed) ordering. They are for
//! reporting only and never drive control flow.
//!
//! # Examples
//!
//! ```
//! use dw_index::PipelineStats;
//!
//! let stats = PipelineStats::new();
//! stats.increment_received();
//! stats.increment_accepted();
//! stats.increment_extracted();
//!
//! let snapshot = stats.snapshot();
//! assert_eq!(snapshot.events_received, 1);
//! assert_eq!(snapshot.extractions_succeeded, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters for the indexing pipeline.
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Change events delivered by the watcher.
    received: AtomicU64,
    /// Events admitted by the gate.
    accepted: AtomicU64,
    /// Events rejected as duplicates.
    suppressed: AtomicU64,
    /// Events discarded without gating (removals).
    ignored: AtomicU64,
    /// Extractions stored in the index.
    extracted: AtomicU64,
    /// Extractions that failed after all attempts.
    failed: AtomicU64,
    /// Results dropped because a newer one was already applied.
    stale: AtomicU64,
    /// Index writes that failed.
    materialize_failures: AtomicU64,
}

impl PipelineStats {
    /// Creates a new [`PipelineStats`] with all counters at zero.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the received-events counter.
    #[inline]
    pub fn increment_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the accepted-events counter.
    #[inline]
    pub fn increment_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the suppressed-events counter.
    #[inline]
    pub fn increment_suppressed(&self) {
        self.suppressed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the ignored-events counter.
    #[inline]
    pub fn increment_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the successful-extractions counter.
    #[inline]
    pub fn increment_extracted(&self) {
        self.extracted.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the failed-extractions counter.
    #[inline]
    pub fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the stale-results counter.
    #[inline]
    pub fn increment_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the materialization-failures counter.
    #[inline]
    pub fn increment_materialize_failures(&self) {
        self.materialize_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_received: self.received.load(Ordering::Relaxed),
            events_accepted: self.accepted.load(Ordering::Relaxed),
            events_suppressed: self.suppressed.load(Ordering::Relaxed),
            events_ignored: self.ignored.load(Ordering::Relaxed),
            extractions_succeeded: self.extracted.load(Ordering::Relaxed),
            extractions_failed: self.failed.load(Ordering::Relaxed),
            stale_dropped: self.stale.load(Ordering::Relaxed),
            materialization_failures: self.materialize_failures.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Change events delivered by the watcher.
    pub events_received: u64,
    /// Events admitted by the gate.
    pub events_accepted: u64,
    /// Events rejected as duplicates.
    pub events_suppressed: u64,
    /// Removal events discarded.
    pub events_ignored: u64,
    /// Extractions stored in the index.
    pub extractions_succeeded: u64,
    /// Extractions that failed after all attempts.
    pub extractions_failed: u64,
    /// Results dropped because a newer one was already applied.
    pub stale_dropped: u64,
    /// Index writes that failed.
    pub materialization_failures: u64,
}

impl StatsSnapshot {
    /// Total extractions attempted.
    #[inline]
    #[must_use]
    pub const fn extractions(&self) -> u64 {
        self.extractions_succeeded + self.extractions_failed + self.stale_dropped
    }

    /// Share of gated events that were suppressed, as a percentage.
    ///
    /// Returns 0.0 when nothing was gated.
    ///
    /// # Examples
    ///
    /// ```
    /// use dw_index::StatsSnapshot;
    ///
    /// let snap = StatsSnapshot {
    ///     events_accepted: 1,
    ///     events_suppressed: 3,
    ///     ..StatsSnapshot::default()
    /// };
    /// assert!((snap.suppression_percent() - 75.0).abs() < 0.1);
    /// ```
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Acceptable for statistics display
    pub fn suppression_percent(&self) -> f64 {
        let gated = self.events_accepted + self.events_suppressed;
        if gated == 0 {
            return 0.0;
        }
        (self.events_suppressed as f64 / gated as f64) * 100.0
    }
}
