use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::conversation::ConversationExchange;
use crate::models::{StudyPlan, Topic, UploadedMaterial};

/// Uploaded materials considered, in upload order.
pub const MAX_CONTEXT_MATERIALS: usize = 3;
/// Characters of extracted text kept per material.
pub const MATERIAL_EXCERPT_CHARS: usize = 2000;

/// The leading part of an uploaded material's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialExcerpt {
    pub filename: String,
    pub excerpt: String,
    /// The extracted text was longer than the excerpt.
    pub truncated: bool,
}

/// Everything the study assistant is told before a student's question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptContext {
    pub plan_id: Uuid,
    pub subject: String,
    pub exam_type: String,
    /// Topic names in study order.
    pub topics: Vec<String>,
    pub materials: Vec<MaterialExcerpt>,
    /// Previous exchanges, oldest first.
    pub recent: Vec<ConversationExchange>,
    /// `subject`, `topics` and `materials` rendered as instructions.
    pub system_prompt: String,
}

impl PromptContext {
    /// Assemble context from a plan, its topics (study order), its materials
    /// (upload order) and the recent part of the conversation.
    ///
    /// Only the first [`MAX_CONTEXT_MATERIALS`] materials are looked at, and
    /// those with no extracted text are skipped.
    pub fn build(
        plan: &StudyPlan,
        topics: &[Topic],
        materials: &[UploadedMaterial],
        recent: Vec<ConversationExchange>,
    ) -> Self {
        let materials: Vec<MaterialExcerpt> = materials
            .iter()
            .take(MAX_CONTEXT_MATERIALS)
            .filter(|m| !m.extracted_text.trim().is_empty())
            .map(|m| excerpt(&m.filename, &m.extracted_text))
            .collect();
        let topics: Vec<String> = topics.iter().map(|t| t.name.clone()).collect();

        let system_prompt = system_prompt(plan, &topics, &materials);

        Self {
            plan_id: plan.id,
            subject: plan.subject.clone(),
            exam_type: plan.exam_type.clone(),
            topics,
            materials,
            recent,
            system_prompt,
        }
    }

    pub fn has_material_context(&self) -> bool {
        !self.materials.is_empty()
    }

    /// The user-turn prompt: recent exchanges followed by the new question.
    pub fn question_prompt(&self, question: &str) -> String {
        let mut prompt = String::new();
        if !self.recent.is_empty() {
            prompt.push_str("Previous conversation:\n");
            for exchange in &self.recent {
                let _ = writeln!(prompt, "Student: {}", exchange.question);
                let _ = writeln!(prompt, "Assistant: {}\n", exchange.answer);
            }
        }
        let _ = write!(prompt, "Student's question: {}", question.trim());
        prompt
    }
}

fn excerpt(filename: &str, text: &str) -> MaterialExcerpt {
    let mut chars = text.char_indices();
    let cut = chars
        .nth(MATERIAL_EXCERPT_CHARS)
        .map(|(i, _)| i)
        .unwrap_or(text.len());

    MaterialExcerpt {
        filename: filename.to_string(),
        excerpt: text[..cut].to_string(),
        truncated: cut < text.len(),
    }
}

fn system_prompt(plan: &StudyPlan, topics: &[String], materials: &[MaterialExcerpt]) -> String {
    let mut prompt = format!(
        "You are a study assistant helping a student prepare for a {} exam in {}.\n",
        plan.exam_type, plan.subject
    );

    if !topics.is_empty() {
        let _ = writeln!(prompt, "\nTopics in the study plan: {}", topics.join(", "));
    }

    if !materials.is_empty() {
        prompt.push_str("\nStudy materials:\n");
        for material in materials {
            let _ = writeln!(prompt, "--- {} ---\n{}", material.filename, material.excerpt);
        }
    }

    prompt.push_str(
        "\nAnswer in under 150 words. Tie answers to the materials where they apply, \
         and say so when a question falls outside the study plan.",
    );
    prompt
}
