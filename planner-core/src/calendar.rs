use chrono::{Local, NaiveDate};

use crate::error::PlanError;

/// Source of "today" for budget and dashboard calculations.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The local calendar date of the machine running the planner.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Whole study days from `today` up to, but not including, the exam day.
///
/// Exams today or in the past leave no study days.
pub fn days_remaining(today: NaiveDate, exam_date: NaiveDate) -> u32 {
    (exam_date - today).num_days().max(0) as u32
}

/// Total hours available before the exam at `daily_hours` per day.
pub fn total_budget_hours(
    today: NaiveDate,
    exam_date: NaiveDate,
    daily_hours: f64,
) -> Result<f64, PlanError> {
    if !daily_hours.is_finite() || daily_hours <= 0.0 {
        return Err(PlanError::InvalidBudget(format!(
            "daily hours must be a positive number, got {}",
            daily_hours
        )));
    }
    Ok(days_remaining(today, exam_date) as f64 * daily_hours)
}
