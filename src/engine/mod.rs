//! Console side of a reconciliation pass
//!
//! Reconciliation itself lives in the `declarative` crate. This module shows
//! progress while workers run and renders change-sets for review.

pub mod differ;
pub mod reporter;

pub use differ::{display_changes, display_content_diffs};
pub use reporter::{ConsoleReporter, print_summary};
