//! Upload quota accounting for one compose request.
//!
//! # Modules
//!
//! - `tracker` - Running byte counter checked against per-file and total caps

pub mod tracker;

#[cfg(test)]
mod tracker_props;

pub use tracker::{QuotaCheck, QuotaTracker};
