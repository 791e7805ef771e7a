//! Cross-submitter recent-submission window.
//!
//! Keeps a pruned, time-ordered record of every analyzed submission so the
//! coordination and farming analyses can see what the rest of the network
//! reported in the last hour. One shared window, briefly locked; entries
//! are compact summaries, not full graphs.

use std::collections::VecDeque;

use parking_lot::RwLock;

use snarl_gaming::RecentSubmission;

/// Rolling window of recent submissions across all submitters.
pub struct RecentWindow {
    window_secs: u64,
    entries: RwLock<VecDeque<RecentSubmission>>,
}

impl RecentWindow {
    pub fn new(window_secs: u64) -> Self {
        Self {
            window_secs,
            entries: RwLock::new(VecDeque::new()),
        }
    }

    /// Record a submission summary and drop entries that have left the
    /// window. Entries are expected in roughly arriving order.
    pub fn record(&self, entry: RecentSubmission, now: u64) {
        let mut entries = self.entries.write();
        Self::prune(&mut entries, self.window_secs, now);
        entries.push_back(entry);
    }

    /// Pruned snapshot of the current window.
    pub fn snapshot(&self, now: u64) -> Vec<RecentSubmission> {
        let mut entries = self.entries.write();
        Self::prune(&mut entries, self.window_secs, now);
        entries.iter().cloned().collect()
    }

    /// Entries currently inside the window.
    pub fn len(&self, now: u64) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|e| now.saturating_sub(e.observed_at) < self.window_secs)
            .count()
    }

    pub fn is_empty(&self, now: u64) -> bool {
        self.len(now) == 0
    }

    fn prune(entries: &mut VecDeque<RecentSubmission>, window_secs: u64, now: u64) {
        while entries
            .front()
            .is_some_and(|e| now.saturating_sub(e.observed_at) >= window_secs)
        {
            entries.pop_front();
        }
    }
}
