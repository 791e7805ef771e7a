//! Per-submitter rate limiting and the suspicion watchlist.
//!
//! Each submitter has a sliding one-hour window of submission timestamps.
//! On every check the window is first pruned of entries older than the
//! window length, then the remaining count is compared against the limit;
//! only accepted submissions are recorded, so a throttled submitter cannot
//! extend its own ban by hammering the gate.
//!
//! The watchlist is an independent append-only set of submitters flagged
//! for suspicion. It is a signal for callers, not a hard block.

use std::collections::VecDeque;

use dashmap::DashMap;
use tracing::{debug, warn};

use snarl_core::constants::{RATE_LIMIT_MAX_SUBMISSIONS, RATE_LIMIT_WINDOW_SECS};

/// Sliding-window submission rate limiter keyed by submitter.
///
/// Each window lives in its own `DashMap` shard entry, so the prune +
/// check + record sequence is serialized per submitter while distinct
/// submitters proceed in parallel.
pub struct SubmissionGuard {
    windows: DashMap<String, VecDeque<u64>>,
    window_secs: u64,
    max_submissions: usize,
}

impl SubmissionGuard {
    pub fn new(window_secs: u64, max_submissions: usize) -> Self {
        Self {
            windows: DashMap::new(),
            window_secs,
            max_submissions,
        }
    }

    /// Guard with the default 10-per-hour limit.
    pub fn with_defaults() -> Self {
        Self::new(RATE_LIMIT_WINDOW_SECS, RATE_LIMIT_MAX_SUBMISSIONS)
    }

    /// Check and record a submission attempt at `now`.
    ///
    /// Prunes timestamps that have left the window, rejects if the
    /// remaining count has reached the limit, and otherwise records `now`
    /// and accepts.
    pub fn allow(&self, submitter: &str, now: u64) -> bool {
        let mut window = self.windows.entry(submitter.to_string()).or_default();
        while window
            .front()
            .is_some_and(|&t| now.saturating_sub(t) >= self.window_secs)
        {
            window.pop_front();
        }

        if window.len() >= self.max_submissions {
            debug!(
                submitter,
                count = window.len(),
                limit = self.max_submissions,
                "rate limit exceeded"
            );
            return false;
        }

        window.push_back(now);
        true
    }

    /// Submissions currently inside the window for a submitter, without
    /// recording anything.
    pub fn window_len(&self, submitter: &str, now: u64) -> usize {
        self.windows
            .get(submitter)
            .map(|window| {
                window
                    .iter()
                    .filter(|&&t| now.saturating_sub(t) < self.window_secs)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Drop all state for a submitter.
    pub fn remove(&self, submitter: &str) {
        self.windows.remove(submitter);
    }

    #[cfg(test)]
    fn backdate(&self, submitter: &str, timestamps: &[u64]) {
        let mut window = self.windows.entry(submitter.to_string()).or_default();
        window.clear();
        window.extend(timestamps.iter().copied());
    }
}

impl Default for SubmissionGuard {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// One watchlist entry. The first reason recorded for a submitter wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchlistEntry {
    pub submitter_id: String,
    pub reason: String,
    pub added_at: u64,
}

/// Append-only set of submitters flagged for suspicious activity.
#[derive(Default)]
pub struct Watchlist {
    entries: DashMap<String, WatchlistEntry>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a submitter with a reason. Repeat adds keep the original entry.
    pub fn add(&self, submitter: &str, reason: &str, now: u64) {
        let entry = self.entries.entry(submitter.to_string());
        if let dashmap::mapref::entry::Entry::Vacant(slot) = entry {
            warn!(submitter, reason, "submitter added to watchlist");
            slot.insert(WatchlistEntry {
                submitter_id: submitter.to_string(),
                reason: reason.to_string(),
                added_at: now,
            });
        }
    }

    pub fn contains(&self, submitter: &str) -> bool {
        self.entries.contains_key(submitter)
    }

    pub fn get(&self, submitter: &str) -> Option<WatchlistEntry> {
        self.entries.get(submitter).map(|e| e.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_700_000_000;

    // --- rate limiting ---

    /// Under-limit submissions all pass.
    #[test]
    fn within_rate_limit() {
        let guard = SubmissionGuard::with_defaults();
        for i in 0..RATE_LIMIT_MAX_SUBMISSIONS {
            assert!(
                guard.allow("miner-1", T0 + i as u64),
                "submission {i} within limit should pass"
            );
        }
    }

    /// The submission after the limit is rejected.
    #[test]
    fn exceeds_rate_limit() {
        let guard = SubmissionGuard::with_defaults();
        for i in 0..RATE_LIMIT_MAX_SUBMISSIONS {
            assert!(guard.allow("miner-1", T0 + i as u64));
        }
        assert!(
            !guard.allow("miner-1", T0 + 60),
            "submission over limit should be rejected"
        );
    }

    /// Rejected attempts are not recorded, so the window does not grow
    /// while a submitter is throttled.
    #[test]
    fn rejected_attempts_do_not_extend_window() {
        let guard = SubmissionGuard::with_defaults();
        for i in 0..RATE_LIMIT_MAX_SUBMISSIONS {
            guard.allow("miner-1", T0 + i as u64);
        }
        for i in 0..5 {
            assert!(!guard.allow("miner-1", T0 + 100 + i));
        }
        assert_eq!(guard.window_len("miner-1", T0 + 200), RATE_LIMIT_MAX_SUBMISSIONS);
    }

    /// Entries older than the window are pruned, so the limit resets.
    /// Simulated by backdating stored timestamps.
    #[test]
    fn rate_limit_window_slides() {
        let guard = SubmissionGuard::with_defaults();
        let old: Vec<u64> = (0..RATE_LIMIT_MAX_SUBMISSIONS)
            .map(|i| T0 + i as u64)
            .collect();
        guard.backdate("miner-1", &old);

        assert!(!guard.allow("miner-1", T0 + 3599), "window not yet elapsed");
        assert!(
            guard.allow("miner-1", T0 + RATE_LIMIT_WINDOW_SECS),
            "after the window slides the limit should reset"
        );
    }

    /// One submitter's usage must not affect another.
    #[test]
    fn per_submitter_isolation() {
        let guard = SubmissionGuard::with_defaults();
        for i in 0..RATE_LIMIT_MAX_SUBMISSIONS {
            guard.allow("miner-1", T0 + i as u64);
        }
        assert!(!guard.allow("miner-1", T0 + 60));
        assert!(guard.allow("miner-2", T0 + 60), "miner-2 should have a clean slate");
    }

    /// After `remove` the submitter starts over.
    #[test]
    fn remove_resets_window() {
        let guard = SubmissionGuard::with_defaults();
        for i in 0..RATE_LIMIT_MAX_SUBMISSIONS {
            guard.allow("miner-1", T0 + i as u64);
        }
        assert!(!guard.allow("miner-1", T0 + 60));
        guard.remove("miner-1");
        assert!(guard.allow("miner-1", T0 + 61));
    }

    /// A custom two-per-window guard enforces its own limit.
    #[test]
    fn custom_limits() {
        let guard = SubmissionGuard::new(100, 2);
        assert!(guard.allow("m", 1_000));
        assert!(guard.allow("m", 1_010));
        assert!(!guard.allow("m", 1_020));
        assert!(guard.allow("m", 1_100), "first entry left the 100s window");
    }

    // --- watchlist ---

    #[test]
    fn watchlist_add_and_contains() {
        let watchlist = Watchlist::new();
        assert!(!watchlist.contains("miner-1"));

        watchlist.add("miner-1", "pattern_farming", T0);
        assert!(watchlist.contains("miner-1"));
        assert!(!watchlist.contains("miner-2"));
        assert_eq!(watchlist.len(), 1);
    }

    #[test]
    fn watchlist_keeps_first_reason() {
        let watchlist = Watchlist::new();
        watchlist.add("miner-1", "pattern_farming", T0);
        watchlist.add("miner-1", "coordination_detected", T0 + 100);

        let entry = watchlist.get("miner-1").unwrap();
        assert_eq!(entry.reason, "pattern_farming");
        assert_eq!(entry.added_at, T0);
        assert_eq!(watchlist.len(), 1);
    }

    #[test]
    fn watchlist_get_missing_is_none() {
        let watchlist = Watchlist::new();
        assert!(watchlist.get("nobody").is_none());
        assert!(watchlist.is_empty());
    }
}
