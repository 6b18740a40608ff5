use chrono::NaiveDate;
use planner_core::{days_remaining, ProgressSummary};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::plan::StudyPlan;
use super::session::StudySession;

/// Progress overview for a plan as of a given day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub plan_id: Uuid,
    pub exam_date: NaiveDate,
    pub days_remaining: u32,
    /// Completion percentage, rounded to two decimals.
    pub progress: f64,
    pub completion_ratio: f64,
    pub total_sessions: usize,
    pub completed_sessions: usize,
    pub today_tasks: Vec<TodayTask>,
}

/// A session due today, as shown on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodayTask {
    pub session_id: Uuid,
    pub topic: String,
    pub duration: f64,
    pub completed: bool,
}

impl Dashboard {
    pub fn build(plan: &StudyPlan, sessions: &[StudySession], today: NaiveDate) -> Self {
        let summary = ProgressSummary::from_sessions(sessions, today);

        Self {
            plan_id: plan.id,
            exam_date: plan.exam_date,
            days_remaining: days_remaining(today, plan.exam_date),
            progress: summary.percent(),
            completion_ratio: summary.completion_ratio,
            total_sessions: summary.total,
            completed_sessions: summary.completed,
            today_tasks: summary
                .today
                .iter()
                .map(|s| TodayTask {
                    session_id: s.id,
                    topic: s.topic_name.clone(),
                    duration: s.duration,
                    completed: s.completed,
                })
                .collect(),
        }
    }
}
