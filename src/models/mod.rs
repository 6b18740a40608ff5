//! Domain models for the study planner service.
//!
//! # Core Concepts
//!
//! - [`User`]: A student who owns study plans.
//! - [`StudyPlan`]: One exam to prepare for: subject, exam date and the daily
//!   study budget.
//! - [`Topic`]: A weighted unit of study material with its allocated hours and
//!   study order. Topics are derived from the plan, never edited directly.
//! - [`StudySession`]: A scheduled study block for one topic on one day.
//! - [`UploadedMaterial`]: Text extracted from exam materials (past papers,
//!   syllabus, notes).
//!
//! Topics and sessions are regenerated as a unit: generating a plan again
//! replaces both.

mod dashboard;
mod material;
mod plan;
mod session;
mod topic;
mod user;

pub use dashboard::*;
pub use material::*;
pub use plan::*;
pub use session::*;
pub use topic::*;
pub use user::*;
