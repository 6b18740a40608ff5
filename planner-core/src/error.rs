use thiserror::Error;

/// Precondition violations reported by the allocator and scheduler.
///
/// None of these leave partial results behind: the engine validates its input
/// before computing anything.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("invalid weight {weight} for topic '{name}': weights must be positive")]
    InvalidWeight { name: String, weight: f64 },

    #[error("invalid budget: {0}")]
    InvalidBudget(String),

    #[error("at least one topic is required")]
    EmptyTopicSet,
}
