//! Allocation and scheduling engine for exam study plans.
//!
//! # Core Concepts
//!
//! - [`allocate`]: splits a total hour budget across weighted topics, in
//!   proportion to their weights, and assigns each topic a study order.
//! - [`schedule`]: walks the calendar from a start date and turns each topic's
//!   hours into day-sized [`SessionRecord`]s, one topic per day.
//! - [`generate_plan`]: the full pipeline from topics + exam date to a
//!   [`GeneratedPlan`].
//! - [`ProgressSummary`]: completion ratio and today's sessions for any set of
//!   [`Trackable`] sessions.
//!
//! Everything here is pure computation: no I/O, no shared state between calls.

mod allocator;
mod calendar;
mod error;
mod plan;
mod progress;
mod scheduler;

pub use allocator::*;
pub use calendar::*;
pub use error::*;
pub use plan::*;
pub use progress::*;
pub use scheduler::*;

/// Tolerance used when comparing hour totals.
pub const HOURS_TOLERANCE: f64 = 1e-6;
