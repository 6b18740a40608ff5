use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text extracted from an uploaded exam document.
///
/// Extraction itself happens outside the planner; this only stores the result
/// so it can be used as context later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedMaterial {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub filename: String,
    pub file_type: MaterialType,
    pub extracted_text: String,
    pub uploaded_at: DateTime<Utc>,
}

/// The kind of document the text came from.
///
/// - `Pyq`: Previous years' question papers
/// - `Syllabus`: Official syllabus or course outline
/// - `Notes`: Lecture or personal notes
/// - `Mock`: Mock or practice tests
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MaterialType {
    #[default]
    Pyq,
    Syllabus,
    Notes,
    Mock,
}

impl MaterialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pyq => "pyq",
            Self::Syllabus => "syllabus",
            Self::Notes => "notes",
            Self::Mock => "mock",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pyq" => Some(Self::Pyq),
            "syllabus" => Some(Self::Syllabus),
            "notes" => Some(Self::Notes),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }
}

/// Input for storing extracted material text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMaterialInput {
    pub filename: String,
    /// Defaults to `Pyq` when omitted.
    #[serde(default)]
    pub file_type: MaterialType,
    pub extracted_text: String,
}
