use chrono::{DateTime, NaiveDate, Utc};
use planner_core::TopicInput;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::topic::Topic;

/// Preparation for a single exam.
///
/// A plan fixes the exam date and the daily study budget. Its topics and
/// sessions are produced by generation and replaced wholesale when the plan is
/// generated again. Editing the plan afterwards does not reschedule anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    /// Free-form exam label (e.g., "final", "midterm", "entrance").
    pub exam_type: String,
    pub exam_date: NaiveDate,
    /// Maximum study hours on any one day.
    pub daily_hours: f64,
    pub target_grade: String,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The status of a study plan.
///
/// - `Active`: The exam is upcoming and the plan is in use
/// - `Completed`: The exam has been taken
/// - `Archived`: Kept for reference only
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Active,
    Completed,
    Archived,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Input for creating a new study plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStudyPlanInput {
    pub user_id: Uuid,
    pub subject: String,
    pub exam_type: String,
    pub exam_date: NaiveDate,
    /// Must be greater than 0 and at most 24.
    pub daily_hours: f64,
    pub target_grade: String,
}

/// Input for updating an existing plan. All fields are optional for partial updates.
///
/// Changing the exam date or daily hours does not touch existing sessions;
/// generate the plan again to apply them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStudyPlanInput {
    pub subject: Option<String>,
    pub exam_type: Option<String>,
    pub exam_date: Option<NaiveDate>,
    pub daily_hours: Option<f64>,
    pub target_grade: Option<String>,
    pub status: Option<PlanStatus>,
}

/// A plan with its topics in study order, used for detailed responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyPlanWithTopics {
    #[serde(flatten)]
    pub plan: StudyPlan,
    pub topics: Vec<Topic>,
}

/// Input for generating (or regenerating) a plan's topics and sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratePlanInput {
    pub topics: Vec<TopicInput>,
}

/// Result of generating a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratePlanResponse {
    pub plan_id: Uuid,
    pub topics: Vec<Topic>,
    pub session_count: usize,
    pub budget_hours: f64,
    pub days_remaining: u32,
    pub first_session_date: Option<NaiveDate>,
    pub last_session_date: Option<NaiveDate>,
    /// Scheduled days that land on or after the exam date.
    pub overrun_days: u32,
}

/// Raw topic-extraction output to be parsed into weighted topics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseTopicsInput {
    pub raw: String,
}
