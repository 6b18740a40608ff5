//! ASCII rendering of a generated schedule for the terminal.

use planner_core::{GeneratedPlan, Schedule};

const PENDING: char = '○';
const DONE: char = '●';

/// Render a schedule as one branch per topic, with a leaf per session.
///
/// Example output:
/// ```text
/// Algebra (12.00h)
/// ├── ○ 2024-01-01  3.00h
/// └── ○ 2024-01-02  3.00h
/// Geometry (6.00h)
/// └── ○ 2024-01-03  3.00h
/// ```
pub fn render_schedule(schedule: &Schedule) -> String {
    let mut output = String::new();

    for topic in &schedule.topics {
        output.push_str(&format!(
            "{} ({:.2}h)\n",
            topic.allocation.name, topic.allocation.allocated_hours
        ));

        for (i, session) in topic.sessions.iter().enumerate() {
            let branch = if i == topic.sessions.len() - 1 {
                "└── "
            } else {
                "├── "
            };
            let symbol = if session.completed { DONE } else { PENDING };
            output.push_str(&format!(
                "{}{} {}  {:.2}h\n",
                branch, symbol, session.scheduled_date, session.duration
            ));
        }
    }

    output
}

/// Header lines summarising the budget, followed by the schedule tree.
pub fn render_plan(plan: &GeneratedPlan) -> String {
    let mut output = format!(
        "Exam {} | {} days | {:.2}h/day | budget {:.2}h | {} sessions\n",
        plan.exam_date,
        plan.days_remaining,
        plan.daily_hours,
        plan.budget_hours,
        plan.schedule.session_count()
    );

    if plan.overrun_days > 0 {
        output.push_str(&format!(
            "warning: schedule runs {} day(s) into the exam date or beyond\n",
            plan.overrun_days
        ));
    }

    output.push('\n');
    output.push_str(&render_schedule(&plan.schedule));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use planner_core::{generate_plan, PlanRequest, TopicInput};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn plan(topics: Vec<TopicInput>, exam: NaiveDate) -> GeneratedPlan {
        generate_plan(&PlanRequest {
            topics,
            today: date(2024, 1, 1),
            exam_date: exam,
            daily_hours: 3.0,
        })
        .unwrap()
    }

    #[test]
    fn test_empty_schedule() {
        assert_eq!(render_schedule(&Schedule::default()), "");
    }

    #[test]
    fn test_topics_and_sessions() {
        let generated = plan(
            vec![TopicInput::new("Algebra", 2.0), TopicInput::new("Geometry", 1.0)],
            date(2024, 1, 3),
        );
        // 2 days * 3h = 6h; Algebra 4h, Geometry 2h.
        let expected = "\
Algebra (4.00h)
├── ○ 2024-01-01  3.00h
└── ○ 2024-01-02  1.00h
Geometry (2.00h)
└── ○ 2024-01-03  2.00h
";
        assert_eq!(render_schedule(&generated.schedule), expected);
    }

    #[test]
    fn test_topic_without_sessions() {
        let generated = plan(vec![TopicInput::new("Algebra", 1.0)], date(2024, 1, 1));
        assert_eq!(render_schedule(&generated.schedule), "Algebra (0.00h)\n");
    }

    #[test]
    fn test_plan_header_reports_overrun() {
        let generated = plan(
            vec![TopicInput::new("Algebra", 2.0), TopicInput::new("Geometry", 1.0)],
            date(2024, 1, 3),
        );
        let output = render_plan(&generated);
        assert!(output.starts_with("Exam 2024-01-03 | 2 days | 3.00h/day | budget 6.00h | 3 sessions\n"));
        assert!(output.contains("runs 1 day(s)"));
    }
}
