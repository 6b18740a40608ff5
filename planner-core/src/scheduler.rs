use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::allocator::TopicAllocation;
use crate::error::PlanError;

/// Remaining hours below this count as fully scheduled.
pub const EPSILON: f64 = 1e-9;

/// One study block: a single topic on a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// `order_index` of the topic this session belongs to.
    pub order_index: usize,
    pub scheduled_date: NaiveDate,
    /// Hours, never more than the daily budget.
    pub duration: f64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A topic's allocation together with the sessions generated for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTopic {
    pub allocation: TopicAllocation,
    pub sessions: Vec<SessionRecord>,
}

impl ScheduledTopic {
    pub fn scheduled_hours(&self) -> f64 {
        self.sessions.iter().map(|s| s.duration).sum()
    }
}

/// Sessions for every topic, in study order (`order_index` ascending).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub topics: Vec<ScheduledTopic>,
}

impl Schedule {
    /// The sessions of the topic with the given `order_index`.
    pub fn sessions_for(&self, order_index: usize) -> Option<&[SessionRecord]> {
        self.topics
            .iter()
            .find(|t| t.allocation.order_index == order_index)
            .map(|t| t.sessions.as_slice())
    }

    /// All sessions in emission order.
    pub fn sessions(&self) -> impl Iterator<Item = &SessionRecord> {
        self.topics.iter().flat_map(|t| t.sessions.iter())
    }

    pub fn session_count(&self) -> usize {
        self.topics.iter().map(|t| t.sessions.len()).sum()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.sessions().next().map(|s| s.scheduled_date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.sessions().last().map(|s| s.scheduled_date)
    }

    /// Number of scheduled days that fall on or after `exam_date`.
    ///
    /// Scheduled days are consecutive from the first session to the last.
    pub fn overrun_days(&self, exam_date: NaiveDate) -> u32 {
        let (Some(first), Some(last)) = (self.first_date(), self.last_date()) else {
            return 0;
        };
        if last < exam_date {
            return 0;
        }
        let from = first.max(exam_date);
        (last - from).num_days() as u32 + 1
    }
}

/// Lay out study sessions for `allocations`, one topic at a time.
///
/// Topics are taken in `order_index` order regardless of the slice order. Each
/// topic gets sessions of `min(remaining, daily_hours)` on consecutive days
/// starting at the shared calendar cursor; the next topic starts the day after
/// the previous one finishes. Topics with no hours produce no sessions and do
/// not move the cursor.
///
/// The exam date is not consulted here. See [`Schedule::overrun_days`].
pub fn schedule(
    allocations: &[TopicAllocation],
    start_date: NaiveDate,
    daily_hours: f64,
) -> Result<Schedule, PlanError> {
    if !daily_hours.is_finite() || daily_hours <= 0.0 {
        return Err(PlanError::InvalidBudget(format!(
            "daily hours must be a positive number, got {}",
            daily_hours
        )));
    }
    if let Some(bad) = allocations
        .iter()
        .find(|a| !a.allocated_hours.is_finite() || a.allocated_hours < 0.0)
    {
        return Err(PlanError::InvalidBudget(format!(
            "topic '{}' has invalid allocated hours {}",
            bad.name, bad.allocated_hours
        )));
    }

    let mut ordered: Vec<&TopicAllocation> = allocations.iter().collect();
    ordered.sort_by_key(|a| a.order_index);

    let mut current_date = start_date;
    let mut topics = Vec::with_capacity(ordered.len());

    for allocation in ordered {
        let mut remaining = allocation.allocated_hours;
        let mut sessions = Vec::new();

        while remaining > EPSILON {
            let duration = remaining.min(daily_hours);
            sessions.push(SessionRecord {
                order_index: allocation.order_index,
                scheduled_date: current_date,
                duration,
                completed: false,
                completed_at: None,
            });
            remaining -= duration;
            current_date = current_date.checked_add_days(Days::new(1)).ok_or_else(|| {
                PlanError::InvalidBudget(
                    "schedule runs past the last representable date".to_string(),
                )
            })?;
        }

        tracing::trace!(
            topic = %allocation.name,
            sessions = sessions.len(),
            "scheduled topic"
        );

        topics.push(ScheduledTopic {
            allocation: allocation.clone(),
            sessions,
        });
    }

    Ok(Schedule { topics })
}
