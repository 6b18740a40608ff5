mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use planner_core::GeneratedPlan;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::models::*;

const PLAN_COLUMNS: &str = "id, user_id, subject, exam_type, exam_date, daily_hours, target_grade, status, created_at, updated_at";

const SESSION_SELECT: &str = "SELECT s.id, s.topic_id, t.name, s.scheduled_date, s.duration, s.completed, s.completed_at
     FROM study_sessions s JOIN topics t ON t.id = s.topic_id";

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "study-planner")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("study-planner.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // User operations
    // ============================================================

    pub fn create_user(&self, input: CreateUserInput) -> Result<User> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO users (id, email, name, created_at) VALUES (?, ?, ?, ?)",
            (id.to_string(), &input.email, &input.name, now.to_rfc3339()),
        )?;

        Ok(User {
            id,
            email: input.email,
            name: input.name,
            created_at: now,
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare("SELECT id, email, name, created_at FROM users WHERE id = ?")?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(User {
                id: parse_uuid(row.get::<_, String>(0)?),
                email: row.get(1)?,
                name: row.get(2)?,
                created_at: parse_datetime(row.get::<_, String>(3)?),
            }))
        } else {
            Ok(None)
        }
    }

    // ============================================================
    // Study plan operations
    // ============================================================

    pub fn get_plans_by_user(&self, user_id: Uuid) -> Result<Vec<StudyPlan>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM study_plans WHERE user_id = ? ORDER BY exam_date, subject",
            PLAN_COLUMNS
        ))?;

        let plans = stmt
            .query_map([user_id.to_string()], plan_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(plans)
    }

    pub fn get_plan(&self, id: Uuid) -> Result<Option<StudyPlan>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM study_plans WHERE id = ?",
            PLAN_COLUMNS
        ))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(plan_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn get_plan_with_topics(&self, id: Uuid) -> Result<Option<StudyPlanWithTopics>> {
        let Some(plan) = self.get_plan(id)? else {
            return Ok(None);
        };

        let topics = self.get_topics(id)?;

        Ok(Some(StudyPlanWithTopics { plan, topics }))
    }

    pub fn create_plan(&self, input: CreateStudyPlanInput) -> Result<StudyPlan> {
        validate_daily_hours(input.daily_hours)?;
        self.get_user(input.user_id)?
            .ok_or_else(|| anyhow::anyhow!("User not found"))?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let status = PlanStatus::Active;

        conn.execute(
            &format!(
                "INSERT INTO study_plans ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                PLAN_COLUMNS
            ),
            (
                id.to_string(),
                input.user_id.to_string(),
                &input.subject,
                &input.exam_type,
                input.exam_date.to_string(),
                input.daily_hours,
                &input.target_grade,
                status.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(StudyPlan {
            id,
            user_id: input.user_id,
            subject: input.subject,
            exam_type: input.exam_type,
            exam_date: input.exam_date,
            daily_hours: input.daily_hours,
            target_grade: input.target_grade,
            status,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update. Topics and sessions are left as they are.
    pub fn update_plan(&self, id: Uuid, input: UpdateStudyPlanInput) -> Result<Option<StudyPlan>> {
        let Some(existing) = self.get_plan(id)? else {
            return Ok(None);
        };

        if let Some(daily_hours) = input.daily_hours {
            validate_daily_hours(daily_hours)?;
        }

        let plan = StudyPlan {
            subject: input.subject.unwrap_or(existing.subject),
            exam_type: input.exam_type.unwrap_or(existing.exam_type),
            exam_date: input.exam_date.unwrap_or(existing.exam_date),
            daily_hours: input.daily_hours.unwrap_or(existing.daily_hours),
            target_grade: input.target_grade.unwrap_or(existing.target_grade),
            status: input.status.unwrap_or(existing.status),
            updated_at: Utc::now(),
            ..existing
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "UPDATE study_plans SET subject = ?, exam_type = ?, exam_date = ?, daily_hours = ?,
             target_grade = ?, status = ?, updated_at = ? WHERE id = ?",
            (
                &plan.subject,
                &plan.exam_type,
                plan.exam_date.to_string(),
                plan.daily_hours,
                &plan.target_grade,
                plan.status.as_str(),
                plan.updated_at.to_rfc3339(),
                id.to_string(),
            ),
        )?;

        Ok(Some(plan))
    }

    pub fn delete_plan(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM study_plans WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Topic and schedule operations
    // ============================================================

    /// Replace a plan's topics and sessions with a freshly generated schedule.
    ///
    /// Old topics (and, by cascade, their sessions) are deleted and the new
    /// ones inserted in a single transaction, so regenerating never duplicates
    /// rows and a failure leaves the previous schedule intact.
    pub fn replace_plan_schedule(&self, plan_id: Uuid, generated: &GeneratedPlan) -> Result<Vec<Topic>> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let exists: i64 = tx.query_row(
            "SELECT COUNT(*) FROM study_plans WHERE id = ?",
            [plan_id.to_string()],
            |row| row.get(0),
        )?;
        if exists == 0 {
            anyhow::bail!("Study plan not found");
        }

        let removed = tx.execute("DELETE FROM topics WHERE plan_id = ?", [plan_id.to_string()])?;
        if removed > 0 {
            tracing::debug!(%plan_id, removed, "Cleared previous topics before regenerating");
        }

        let mut topics = Vec::with_capacity(generated.schedule.topics.len());
        {
            let mut insert_topic = tx.prepare(
                "INSERT INTO topics (id, plan_id, name, weight, allocated_hours, order_index)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )?;
            let mut insert_session = tx.prepare(
                "INSERT INTO study_sessions (id, topic_id, scheduled_date, duration, completed, completed_at)
                 VALUES (?, ?, ?, ?, 0, NULL)",
            )?;

            for scheduled in &generated.schedule.topics {
                let allocation = &scheduled.allocation;
                let topic = Topic {
                    id: Uuid::new_v4(),
                    plan_id,
                    name: allocation.name.clone(),
                    weight: allocation.weight,
                    allocated_hours: allocation.allocated_hours,
                    order_index: allocation.order_index as i64,
                };

                insert_topic.execute((
                    topic.id.to_string(),
                    plan_id.to_string(),
                    &topic.name,
                    topic.weight,
                    topic.allocated_hours,
                    topic.order_index,
                ))?;

                for session in &scheduled.sessions {
                    insert_session.execute((
                        Uuid::new_v4().to_string(),
                        topic.id.to_string(),
                        session.scheduled_date.to_string(),
                        session.duration,
                    ))?;
                }

                topics.push(topic);
            }
        }

        tx.commit()?;
        Ok(topics)
    }

    pub fn get_topics(&self, plan_id: Uuid) -> Result<Vec<Topic>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, plan_id, name, weight, allocated_hours, order_index
             FROM topics WHERE plan_id = ? ORDER BY order_index",
        )?;

        let topics = stmt
            .query_map([plan_id.to_string()], |row| {
                Ok(Topic {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    plan_id: parse_uuid(row.get::<_, String>(1)?),
                    name: row.get(2)?,
                    weight: row.get(3)?,
                    allocated_hours: row.get(4)?,
                    order_index: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(topics)
    }

    // ============================================================
    // Session operations
    // ============================================================

    /// Sessions of a plan in calendar order, optionally limited to one day.
    pub fn get_plan_sessions(&self, plan_id: Uuid, date: Option<NaiveDate>) -> Result<Vec<StudySession>> {
        let conn = self.conn.lock().expect("database lock poisoned");

        let sessions = match date {
            Some(date) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE t.plan_id = ? AND s.scheduled_date = ?
                     ORDER BY s.scheduled_date, t.order_index",
                    SESSION_SELECT
                ))?;
                let rows = stmt
                    .query_map((plan_id.to_string(), date.to_string()), session_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE t.plan_id = ? ORDER BY s.scheduled_date, t.order_index",
                    SESSION_SELECT
                ))?;
                let rows = stmt
                    .query_map([plan_id.to_string()], session_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        Ok(sessions)
    }

    pub fn get_session(&self, id: Uuid) -> Result<Option<StudySession>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!("{} WHERE s.id = ?", SESSION_SELECT))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(session_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Mark a session complete. Completing it again keeps the first timestamp.
    pub fn complete_session(&self, id: Uuid) -> Result<Option<StudySession>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE study_sessions SET completed = 1, completed_at = COALESCE(completed_at, ?)
             WHERE id = ?",
            (Utc::now().to_rfc3339(), id.to_string()),
        )?;
        drop(conn);

        if rows == 0 {
            return Ok(None);
        }
        self.get_session(id)
    }

    // ============================================================
    // Uploaded material operations
    // ============================================================

    pub fn add_material(&self, plan_id: Uuid, input: AddMaterialInput) -> Result<UploadedMaterial> {
        self.get_plan(plan_id)?
            .ok_or_else(|| anyhow::anyhow!("Study plan not found"))?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO uploaded_materials (id, plan_id, filename, file_type, extracted_text, uploaded_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                plan_id.to_string(),
                &input.filename,
                input.file_type.as_str(),
                &input.extracted_text,
                now.to_rfc3339(),
            ),
        )?;

        Ok(UploadedMaterial {
            id,
            plan_id,
            filename: input.filename,
            file_type: input.file_type,
            extracted_text: input.extracted_text,
            uploaded_at: now,
        })
    }

    pub fn get_materials(&self, plan_id: Uuid) -> Result<Vec<UploadedMaterial>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, plan_id, filename, file_type, extracted_text, uploaded_at
             FROM uploaded_materials WHERE plan_id = ? ORDER BY uploaded_at",
        )?;

        let materials = stmt
            .query_map([plan_id.to_string()], |row| {
                Ok(UploadedMaterial {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    plan_id: parse_uuid(row.get::<_, String>(1)?),
                    filename: row.get(2)?,
                    file_type: MaterialType::from_str(&row.get::<_, String>(3)?)
                        .unwrap_or_default(),
                    extracted_text: row.get(4)?,
                    uploaded_at: parse_datetime(row.get::<_, String>(5)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(materials)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn validate_daily_hours(daily_hours: f64) -> Result<()> {
    if !daily_hours.is_finite() || daily_hours <= 0.0 || daily_hours > 24.0 {
        anyhow::bail!(
            "Invalid daily_hours {}: must be greater than 0 and at most 24",
            daily_hours
        );
    }
    Ok(())
}

fn plan_from_row(row: &Row<'_>) -> rusqlite::Result<StudyPlan> {
    Ok(StudyPlan {
        id: parse_uuid(row.get::<_, String>(0)?),
        user_id: parse_uuid(row.get::<_, String>(1)?),
        subject: row.get(2)?,
        exam_type: row.get(3)?,
        exam_date: parse_date(4, row.get::<_, String>(4)?)?,
        daily_hours: row.get(5)?,
        target_grade: row.get(6)?,
        status: PlanStatus::from_str(&row.get::<_, String>(7)?).unwrap_or(PlanStatus::Active),
        created_at: parse_datetime(row.get::<_, String>(8)?),
        updated_at: parse_datetime(row.get::<_, String>(9)?),
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<StudySession> {
    Ok(StudySession {
        id: parse_uuid(row.get::<_, String>(0)?),
        topic_id: parse_uuid(row.get::<_, String>(1)?),
        topic_name: row.get(2)?,
        scheduled_date: parse_date(3, row.get::<_, String>(3)?)?,
        duration: row.get(4)?,
        completed: row.get::<_, i32>(5)? != 0,
        completed_at: row.get::<_, Option<String>>(6)?.map(parse_datetime),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Calendar dates carry the schedule, so a malformed one is a hard error
/// rather than a silent default.
fn parse_date(column: usize, s: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}
