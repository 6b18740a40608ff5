use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::NaiveDate;
use planner_core::{FixedClock, TopicInput};
use study_planner::api::{create_router, create_router_with_security, AppState, SecurityConfig};
use study_planner::assistant::{
    ConversationHistory, ConversationStore, ExtractionSource, PromptContext, RecordExchangeInput,
    TopicExtraction,
};
use study_planner::db::Database;
use study_planner::models::*;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn test_state() -> AppState {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    AppState::new(db).with_clock(FixedClock(date(2024, 1, 1)))
}

fn setup() -> TestServer {
    TestServer::new(create_router(test_state())).expect("Failed to create test server")
}

async fn create_test_user(server: &TestServer) -> User {
    server
        .post("/api/v1/users")
        .json(&CreateUserInput {
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
        })
        .await
        .json::<User>()
}

/// A plan six study days out at three hours a day.
async fn create_test_plan(server: &TestServer) -> StudyPlan {
    let user = create_test_user(server).await;
    server
        .post("/api/v1/plans")
        .json(&CreateStudyPlanInput {
            user_id: user.id,
            subject: "Mathematics".to_string(),
            exam_type: "final".to_string(),
            exam_date: date(2024, 1, 7),
            daily_hours: 3.0,
            target_grade: "A".to_string(),
        })
        .await
        .json::<StudyPlan>()
}

fn algebra_geometry() -> GeneratePlanInput {
    GeneratePlanInput {
        topics: vec![
            TopicInput::new("Algebra", 8.0),
            TopicInput::new("Geometry", 4.0),
        ],
    }
}

async fn generate(server: &TestServer, plan_id: Uuid) -> GeneratePlanResponse {
    let response = server
        .post(&format!("/api/v1/plans/{}/generate", plan_id))
        .json(&algebra_geometry())
        .await;
    response.assert_status_ok();
    response.json()
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_ok() {
        let server = setup();
        let response = server.get("/api/v1/health").await;

        response.assert_status_ok();
        response.assert_json(&serde_json::json!({ "status": "ok" }));
    }
}

mod users {
    use super::*;

    #[tokio::test]
    async fn creates_and_fetches_a_user() {
        let server = setup();
        let user = create_test_user(&server).await;

        let response = server.get(&format!("/api/v1/users/{}", user.id)).await;

        response.assert_status_ok();
        assert_eq!(response.json::<User>().email, "ada@example.com");
    }

    #[tokio::test]
    async fn rejects_duplicate_email_with_conflict() {
        let server = setup();
        create_test_user(&server).await;

        let response = server
            .post("/api/v1/users")
            .json(&CreateUserInput {
                email: "ada@example.com".to_string(),
                name: "Another Ada".to_string(),
            })
            .await;

        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn returns_404_for_unknown_user() {
        let server = setup();
        server
            .get(&format!("/api/v1/users/{}", Uuid::new_v4()))
            .await
            .assert_status_not_found();
        server
            .get(&format!("/api/v1/users/{}/plans", Uuid::new_v4()))
            .await
            .assert_status_not_found();
    }
}

mod plans {
    use super::*;

    #[tokio::test]
    async fn lists_plans_for_a_user() {
        let server = setup();
        let plan = create_test_plan(&server).await;

        let response = server
            .get(&format!("/api/v1/users/{}/plans", plan.user_id))
            .await;

        response.assert_status_ok();
        let plans: Vec<StudyPlan> = response.json();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].id, plan.id);
    }

    #[tokio::test]
    async fn rejects_invalid_daily_hours() {
        let server = setup();
        let user = create_test_user(&server).await;

        let response = server
            .post("/api/v1/plans")
            .json(&CreateStudyPlanInput {
                user_id: user.id,
                subject: "Physics".to_string(),
                exam_type: "final".to_string(),
                exam_date: date(2024, 2, 1),
                daily_hours: 0.0,
                target_grade: "B".to_string(),
            })
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn rejects_plan_for_unknown_user() {
        let server = setup();

        let response = server
            .post("/api/v1/plans")
            .json(&CreateStudyPlanInput {
                user_id: Uuid::new_v4(),
                subject: "Physics".to_string(),
                exam_type: "final".to_string(),
                exam_date: date(2024, 2, 1),
                daily_hours: 2.0,
                target_grade: "B".to_string(),
            })
            .await;

        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn updates_status() {
        let server = setup();
        let plan = create_test_plan(&server).await;

        let response = server
            .put(&format!("/api/v1/plans/{}", plan.id))
            .json(&UpdateStudyPlanInput {
                status: Some(PlanStatus::Archived),
                ..Default::default()
            })
            .await;

        response.assert_status_ok();
        let updated: StudyPlan = response.json();
        assert_eq!(updated.status, PlanStatus::Archived);
        assert_eq!(updated.exam_date, plan.exam_date);
    }

    #[tokio::test]
    async fn deletes_a_plan() {
        let server = setup();
        let plan = create_test_plan(&server).await;

        server
            .delete(&format!("/api/v1/plans/{}", plan.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .get(&format!("/api/v1/plans/{}", plan.id))
            .await
            .assert_status_not_found();
    }
}

mod generation {
    use super::*;

    #[tokio::test]
    async fn allocates_and_schedules_by_weight() {
        let server = setup();
        let plan = create_test_plan(&server).await;

        let generated = generate(&server, plan.id).await;

        assert_eq!(generated.days_remaining, 6);
        assert!((generated.budget_hours - 18.0).abs() < 1e-6);
        assert_eq!(generated.session_count, 6);
        assert_eq!(generated.first_session_date, Some(date(2024, 1, 1)));
        assert_eq!(generated.last_session_date, Some(date(2024, 1, 6)));
        assert_eq!(generated.overrun_days, 0);

        assert_eq!(generated.topics[0].name, "Algebra");
        assert!((generated.topics[0].allocated_hours - 12.0).abs() < 1e-6);
        assert_eq!(generated.topics[1].name, "Geometry");
        assert!((generated.topics[1].allocated_hours - 6.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn reports_days_scheduled_past_the_exam() {
        let server = setup();
        let user = create_test_user(&server).await;
        let plan: StudyPlan = server
            .post("/api/v1/plans")
            .json(&CreateStudyPlanInput {
                user_id: user.id,
                subject: "History".to_string(),
                exam_type: "quiz".to_string(),
                exam_date: date(2024, 1, 4),
                daily_hours: 3.0,
                target_grade: "B".to_string(),
            })
            .await
            .json();

        let response = server
            .post(&format!("/api/v1/plans/{}/generate", plan.id))
            .json(&GeneratePlanInput {
                topics: vec![
                    TopicInput::new("Treaties", 1.0),
                    TopicInput::new("Revolutions", 1.0),
                ],
            })
            .await;

        // 9h over three days, but each topic's half day takes a whole day.
        response.assert_status_ok();
        let generated: GeneratePlanResponse = response.json();
        assert!((generated.budget_hours - 9.0).abs() < 1e-6);
        assert_eq!(generated.session_count, 4);
        assert_eq!(generated.last_session_date, Some(date(2024, 1, 4)));
        assert_eq!(generated.overrun_days, 1);
    }

    #[tokio::test]
    async fn regenerating_replaces_previous_schedule() {
        let server = setup();
        let plan = create_test_plan(&server).await;

        generate(&server, plan.id).await;
        generate(&server, plan.id).await;

        let topics: Vec<Topic> = server
            .get(&format!("/api/v1/plans/{}/topics", plan.id))
            .await
            .json();
        let sessions: Vec<StudySession> = server
            .get(&format!("/api/v1/plans/{}/sessions", plan.id))
            .await
            .json();

        assert_eq!(topics.len(), 2);
        assert_eq!(sessions.len(), 6);
    }

    #[tokio::test]
    async fn plan_detail_includes_topics_in_study_order() {
        let server = setup();
        let plan = create_test_plan(&server).await;
        generate(&server, plan.id).await;

        let response = server.get(&format!("/api/v1/plans/{}", plan.id)).await;

        response.assert_status_ok();
        let detail: StudyPlanWithTopics = response.json();
        assert_eq!(detail.plan.id, plan.id);
        let names: Vec<&str> = detail.topics.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Algebra", "Geometry"]);
    }

    #[tokio::test]
    async fn rejects_non_positive_weight() {
        let server = setup();
        let plan = create_test_plan(&server).await;

        let response = server
            .post(&format!("/api/v1/plans/{}/generate", plan.id))
            .json(&GeneratePlanInput {
                topics: vec![TopicInput::new("Algebra", 0.0)],
            })
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn rejects_empty_topic_list() {
        let server = setup();
        let plan = create_test_plan(&server).await;

        let response = server
            .post(&format!("/api/v1/plans/{}/generate", plan.id))
            .json(&GeneratePlanInput { topics: vec![] })
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn returns_404_for_unknown_plan() {
        let server = setup();

        server
            .post(&format!("/api/v1/plans/{}/generate", Uuid::new_v4()))
            .json(&algebra_geometry())
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn parses_fenced_topic_response() {
        let server = setup();
        let plan = create_test_plan(&server).await;

        let response = server
            .post(&format!("/api/v1/plans/{}/topics/parse", plan.id))
            .json(&ParseTopicsInput {
                raw: "```json\n{\"topics\": [{\"name\": \"Limits\", \"weight\": 7}]}\n```"
                    .to_string(),
            })
            .await;

        response.assert_status_ok();
        let extraction: TopicExtraction = response.json();
        assert_eq!(extraction.source, ExtractionSource::Response);
        assert_eq!(extraction.topics, vec![TopicInput::new("Limits", 7.0)]);
    }

    #[tokio::test]
    async fn falls_back_on_unreadable_topic_response() {
        let server = setup();
        let plan = create_test_plan(&server).await;

        let response = server
            .post(&format!("/api/v1/plans/{}/topics/parse", plan.id))
            .json(&ParseTopicsInput {
                raw: "Sorry, I can't help with that.".to_string(),
            })
            .await;

        response.assert_status_ok();
        let extraction: TopicExtraction = response.json();
        assert_eq!(extraction.source, ExtractionSource::Fallback);
        assert_eq!(extraction.topics.len(), 3);
    }
}

mod sessions {
    use super::*;

    #[tokio::test]
    async fn filters_sessions_by_date() {
        let server = setup();
        let plan = create_test_plan(&server).await;
        generate(&server, plan.id).await;

        let response = server
            .get(&format!("/api/v1/plans/{}/sessions", plan.id))
            .add_query_param("date", "2024-01-05")
            .await;

        response.assert_status_ok();
        let sessions: Vec<StudySession> = response.json();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].topic_name, "Geometry");
    }

    #[tokio::test]
    async fn completing_unknown_session_is_404() {
        let server = setup();

        server
            .post(&format!("/api/v1/sessions/{}/complete", Uuid::new_v4()))
            .await
            .assert_status_not_found();
    }
}

mod dashboard {
    use super::*;

    #[tokio::test]
    async fn shows_todays_task_and_progress() {
        let server = setup();
        let plan = create_test_plan(&server).await;
        generate(&server, plan.id).await;

        let before: Dashboard = server
            .get(&format!("/api/v1/plans/{}/dashboard", plan.id))
            .await
            .json();

        assert_eq!(before.days_remaining, 6);
        assert_eq!(before.total_sessions, 6);
        assert_eq!(before.completed_sessions, 0);
        assert_eq!(before.progress, 0.0);
        assert_eq!(before.today_tasks.len(), 1);
        assert_eq!(before.today_tasks[0].topic, "Algebra");

        server
            .post(&format!(
                "/api/v1/sessions/{}/complete",
                before.today_tasks[0].session_id
            ))
            .await
            .assert_status_ok();

        let after: Dashboard = server
            .get(&format!("/api/v1/plans/{}/dashboard", plan.id))
            .await
            .json();

        assert_eq!(after.completed_sessions, 1);
        assert_eq!(after.progress, 16.67);
        assert!(after.today_tasks[0].completed);
    }

    #[tokio::test]
    async fn empty_plan_has_zero_progress() {
        let server = setup();
        let plan = create_test_plan(&server).await;

        let dashboard: Dashboard = server
            .get(&format!("/api/v1/plans/{}/dashboard", plan.id))
            .await
            .json();

        assert_eq!(dashboard.total_sessions, 0);
        assert_eq!(dashboard.completion_ratio, 0.0);
        assert!(dashboard.today_tasks.is_empty());
    }
}

mod materials {
    use super::*;

    #[tokio::test]
    async fn adds_and_lists_material() {
        let server = setup();
        let plan = create_test_plan(&server).await;

        let response = server
            .post(&format!("/api/v1/plans/{}/materials", plan.id))
            .json(&serde_json::json!({
                "filename": "2022-paper.pdf",
                "extracted_text": "Q1. Differentiate sin(x)"
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        assert_eq!(response.json::<UploadedMaterial>().file_type, MaterialType::Pyq);

        let materials: Vec<UploadedMaterial> = server
            .get(&format!("/api/v1/plans/{}/materials", plan.id))
            .await
            .json();
        assert_eq!(materials.len(), 1);
    }

    #[tokio::test]
    async fn returns_404_for_unknown_plan() {
        let server = setup();

        server
            .post(&format!("/api/v1/plans/{}/materials", Uuid::new_v4()))
            .json(&AddMaterialInput {
                filename: "notes.pdf".to_string(),
                file_type: MaterialType::Notes,
                extracted_text: String::new(),
            })
            .await
            .assert_status_not_found();
    }
}

mod conversations {
    use super::*;

    #[tokio::test]
    async fn records_and_clears_history() {
        let server = setup();
        let plan = create_test_plan(&server).await;
        let path = format!("/api/v1/conversations/{}/{}", plan.user_id, plan.id);

        let response = server
            .post(&path)
            .json(&RecordExchangeInput {
                question: "What should I start with?".to_string(),
                answer: "Algebra, it carries the most weight.".to_string(),
                provider: "local".to_string(),
            })
            .await;

        response.assert_status(StatusCode::CREATED);
        assert_eq!(response.json::<ConversationHistory>().message_count, 1);

        server.delete(&path).await.assert_status(StatusCode::NO_CONTENT);

        let history: ConversationHistory = server.get(&path).await.json();
        assert_eq!(history.message_count, 0);
    }

    #[tokio::test]
    async fn keeps_only_the_most_recent_exchanges() {
        let state = test_state().with_conversations(ConversationStore::new(2, 10));
        let server = TestServer::new(create_router(state)).expect("Failed to create test server");
        let plan = create_test_plan(&server).await;
        let path = format!("/api/v1/conversations/{}/{}", plan.user_id, plan.id);

        for i in 0..3 {
            server
                .post(&path)
                .json(&RecordExchangeInput {
                    question: format!("Question {}", i),
                    answer: format!("Answer {}", i),
                    provider: String::new(),
                })
                .await
                .assert_status(StatusCode::CREATED);
        }

        let history: ConversationHistory = server.get(&path).await.json();
        let questions: Vec<&str> = history.messages.iter().map(|m| m.question.as_str()).collect();
        assert_eq!(questions, vec!["Question 1", "Question 2"]);
    }

    #[tokio::test]
    async fn builds_prompt_context_from_plan_materials_and_recent_history() {
        let server = setup();
        let plan = create_test_plan(&server).await;
        generate(&server, plan.id).await;
        server
            .post(&format!("/api/v1/plans/{}/materials", plan.id))
            .json(&AddMaterialInput {
                filename: "2023-paper.pdf".to_string(),
                file_type: MaterialType::Pyq,
                extracted_text: "Q1. Factorise x^2 - 9".to_string(),
            })
            .await
            .assert_status(StatusCode::CREATED);

        let path = format!("/api/v1/conversations/{}/{}", plan.user_id, plan.id);
        for i in 0..7 {
            server
                .post(&path)
                .json(&RecordExchangeInput {
                    question: format!("Question {}", i),
                    answer: format!("Answer {}", i),
                    provider: String::new(),
                })
                .await
                .assert_status(StatusCode::CREATED);
        }

        let response = server.get(&format!("{}/context", path)).await;

        response.assert_status_ok();
        let context: PromptContext = response.json();
        assert_eq!(context.topics, vec!["Algebra", "Geometry"]);
        assert_eq!(context.materials.len(), 1);
        assert!(context.system_prompt.contains("Q1. Factorise x^2 - 9"));
        let questions: Vec<&str> = context.recent.iter().map(|m| m.question.as_str()).collect();
        assert_eq!(
            questions,
            vec!["Question 2", "Question 3", "Question 4", "Question 5", "Question 6"]
        );
    }

    #[tokio::test]
    async fn prompt_context_for_unknown_plan_is_404() {
        let server = setup();

        server
            .get(&format!(
                "/api/v1/conversations/{}/{}/context",
                Uuid::new_v4(),
                Uuid::new_v4()
            ))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn rejects_exchange_for_unknown_plan() {
        let server = setup();

        server
            .post(&format!(
                "/api/v1/conversations/{}/{}",
                Uuid::new_v4(),
                Uuid::new_v4()
            ))
            .json(&RecordExchangeInput {
                question: "Hello?".to_string(),
                answer: "Hi.".to_string(),
                provider: String::new(),
            })
            .await
            .assert_status_not_found();
    }
}

mod security {
    use super::*;

    fn secured_server(security: SecurityConfig) -> TestServer {
        TestServer::new(create_router_with_security(test_state(), security))
            .expect("Failed to create test server")
    }

    #[tokio::test]
    async fn requires_api_key_when_configured() {
        let server = secured_server(SecurityConfig::with_api_key("secret"));

        server
            .get(&format!("/api/v1/users/{}", Uuid::new_v4()))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        server
            .get(&format!("/api/v1/users/{}", Uuid::new_v4()))
            .authorization_bearer("wrong")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        server
            .get(&format!("/api/v1/users/{}", Uuid::new_v4()))
            .authorization_bearer("secret")
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn health_stays_open() {
        let server = secured_server(SecurityConfig::with_api_key("secret"));

        server.get("/api/v1/health").await.assert_status_ok();
    }

    #[tokio::test]
    async fn rate_limits_requests() {
        let server = secured_server(SecurityConfig::with_rate_limit(2));
        let path = format!("/api/v1/users/{}", Uuid::new_v4());

        server.get(&path).await.assert_status_not_found();
        server.get(&path).await.assert_status_not_found();
        server
            .get(&path)
            .await
            .assert_status(StatusCode::TOO_MANY_REQUESTS);
    }
}
