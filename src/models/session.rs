use chrono::{DateTime, NaiveDate, Utc};
use planner_core::Trackable;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scheduled study block for one topic on one day.
///
/// Sessions are created only by plan generation. The one mutation they accept
/// afterwards is being marked complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySession {
    pub id: Uuid,
    pub topic_id: Uuid,
    /// Name of the owning topic, joined in for display.
    pub topic_name: String,
    pub scheduled_date: NaiveDate,
    /// Length in hours.
    pub duration: f64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Trackable for StudySession {
    fn scheduled_date(&self) -> NaiveDate {
        self.scheduled_date
    }

    fn is_completed(&self) -> bool {
        self.completed
    }
}

/// Query parameters for listing a plan's sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionQuery {
    /// Only sessions scheduled on this day.
    pub date: Option<NaiveDate>,
}
