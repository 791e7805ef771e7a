//! # snarl-gaming
//! Adversarial gate: heuristic gaming analyses, their aggregation into an
//! accept/flag/reject verdict, and per-submitter rate enforcement.

pub mod detector;
pub mod guard;
pub mod signals;

pub use detector::{GamingDetector, GamingVerdict};
pub use guard::{SubmissionGuard, Watchlist, WatchlistEntry};
pub use signals::RecentSubmission;
