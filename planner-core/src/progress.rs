use chrono::NaiveDate;

use crate::scheduler::SessionRecord;

/// Anything with a study date and a completion flag.
pub trait Trackable {
    fn scheduled_date(&self) -> NaiveDate;
    fn is_completed(&self) -> bool;
}

impl Trackable for SessionRecord {
    fn scheduled_date(&self) -> NaiveDate {
        self.scheduled_date
    }

    fn is_completed(&self) -> bool {
        self.completed
    }
}

/// Completion figures for a plan's sessions, plus the sessions due today.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSummary<'a, T> {
    pub total: usize,
    pub completed: usize,
    /// `completed / total`, or 0.0 for a plan with no sessions.
    pub completion_ratio: f64,
    pub today: Vec<&'a T>,
}

impl<'a, T: Trackable> ProgressSummary<'a, T> {
    pub fn from_sessions(sessions: &'a [T], today: NaiveDate) -> Self {
        let total = sessions.len();
        let completed = sessions.iter().filter(|s| s.is_completed()).count();
        let completion_ratio = if total == 0 {
            0.0
        } else {
            completed as f64 / total as f64
        };
        let due_today = sessions
            .iter()
            .filter(|s| s.scheduled_date() == today)
            .collect();

        Self {
            total,
            completed,
            completion_ratio,
            today: due_today,
        }
    }

    /// Completion as a percentage, rounded to two decimals.
    pub fn percent(&self) -> f64 {
        (self.completion_ratio * 10_000.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(day: u32, completed: bool) -> SessionRecord {
        SessionRecord {
            order_index: 0,
            scheduled_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            duration: 2.0,
            completed,
            completed_at: None,
        }
    }

    #[test]
    fn empty_plan_has_zero_progress() {
        let sessions: Vec<SessionRecord> = vec![];
        let summary =
            ProgressSummary::from_sessions(&sessions, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        assert_eq!(summary.total, 0);
        assert_eq!(summary.completion_ratio, 0.0);
        assert_eq!(summary.percent(), 0.0);
        assert!(summary.today.is_empty());
    }

    #[test]
    fn ratio_counts_completed_sessions() {
        let sessions = vec![session(1, true), session(2, false), session(3, false)];
        let summary =
            ProgressSummary::from_sessions(&sessions, NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());

        assert_eq!(summary.completed, 1);
        assert!((summary.completion_ratio - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(summary.percent(), 33.33);
    }

    #[test]
    fn picks_out_todays_sessions() {
        let sessions = vec![session(1, true), session(2, false), session(2, true)];
        let summary =
            ProgressSummary::from_sessions(&sessions, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());

        assert_eq!(summary.today.len(), 2);
        assert!(summary
            .today
            .iter()
            .all(|s| s.scheduled_date == NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
    }
}
