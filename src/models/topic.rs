use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted topic allocation belonging to a study plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub name: String,
    /// Relative importance, as supplied when the plan was generated.
    pub weight: f64,
    pub allocated_hours: f64,
    /// Study order; 0 is studied first.
    pub order_index: i64,
}
