//! Output module for the job feed
//!
//! This module handles:
//! - Counting jobs per status from a store snapshot
//! - Rendering the feed as text for logs and stdout

mod feed;

pub use feed::{print_feed, render_feed, render_job, FeedSummary};
