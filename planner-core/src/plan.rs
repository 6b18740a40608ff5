use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::allocator::{allocate, TopicInput};
use crate::calendar::{days_remaining, total_budget_hours};
use crate::error::PlanError;
use crate::scheduler::{schedule, Schedule};

/// Everything needed to lay out a study plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub topics: Vec<TopicInput>,
    /// First study day; also the reference point for the budget.
    pub today: NaiveDate,
    pub exam_date: NaiveDate,
    pub daily_hours: f64,
}

/// A fully allocated and scheduled plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPlan {
    pub today: NaiveDate,
    pub exam_date: NaiveDate,
    pub daily_hours: f64,
    pub days_remaining: u32,
    pub budget_hours: f64,
    pub schedule: Schedule,
    /// Scheduled days on or after the exam date. Overruns are reported, not rejected.
    pub overrun_days: u32,
}

impl GeneratedPlan {
    pub fn fits_before_exam(&self) -> bool {
        self.overrun_days == 0
    }
}

/// Compute the budget, allocate it across topics, and schedule sessions from `today`.
pub fn generate_plan(request: &PlanRequest) -> Result<GeneratedPlan, PlanError> {
    let budget_hours = total_budget_hours(request.today, request.exam_date, request.daily_hours)?;
    let allocations = allocate(&request.topics, budget_hours)?;
    let schedule = schedule(&allocations, request.today, request.daily_hours)?;
    let overrun_days = schedule.overrun_days(request.exam_date);

    tracing::debug!(
        topics = allocations.len(),
        budget_hours,
        sessions = schedule.session_count(),
        "generated study plan"
    );

    if overrun_days > 0 {
        tracing::warn!(
            overrun_days,
            exam_date = %request.exam_date,
            "study plan runs past the exam date"
        );
    }

    Ok(GeneratedPlan {
        today: request.today,
        exam_date: request.exam_date,
        daily_hours: request.daily_hours,
        days_remaining: days_remaining(request.today, request.exam_date),
        budget_hours,
        schedule,
        overrun_days,
    })
}
