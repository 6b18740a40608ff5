//! Boundary with the AI collaborators.
//!
//! The planner never calls a model itself. It accepts what the models
//! produced: topic-extraction responses are decoded here into weighted
//! topics, chat exchanges are kept in a bounded in-memory history, and the
//! context for the next chat prompt is assembled from the plan, its materials
//! and that history.

mod context;
mod conversation;
mod extraction;

pub use context::*;
pub use conversation::*;
pub use extraction::*;
