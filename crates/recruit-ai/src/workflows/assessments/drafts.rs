//! Inbound payloads accepted by the assessment service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{
    ApplicationId, Difficulty, JobPostingId, Quiz, QuizDomain, QuizId, QuizSettings, QuizType,
    ResultId, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPostingDraft {
    pub title: String,
    pub company_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default, rename = "type")]
    pub employment_type: Option<String>,
}

/// Quiz as submitted by the builder; questions are validated on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizDraft {
    pub job_posting_id: JobPostingId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub quiz_type: QuizType,
    pub domain: QuizDomain,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    pub duration: i64,
    pub total_points: i64,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub technology: Vec<String>,
    /// Array of questions or its JSON encoding.
    #[serde(default)]
    pub questions: Value,
    #[serde(default)]
    pub settings: QuizSettings,
}

/// Stored quiz plus any advisory findings raised while authoring it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizAuthoring {
    pub quiz: Quiz,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub user_id: UserId,
    pub job_posting_id: JobPostingId,
}

/// A completed attempt as reported by the quiz runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptSubmission {
    pub quiz_id: QuizId,
    pub user_id: UserId,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub answers: Value,
    #[serde(default)]
    pub analysis: Option<Value>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Human review of an attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    #[serde(default)]
    pub reviewed_answers: Option<Value>,
    #[serde(default)]
    pub reviewed_score: Option<f64>,
    #[serde(default)]
    pub reviewer_notes: Option<String>,
    #[serde(default)]
    pub manual_corrections: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisUpdate {
    pub analysis: Value,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillAnalysisDraft {
    #[serde(default)]
    pub skills: Value,
    #[serde(default)]
    pub ai_feedback: Option<String>,
    #[serde(default)]
    pub improvement_tips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRelease {
    #[serde(default)]
    pub application_id: Option<ApplicationId>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

/// Visibility state returned by the feedback gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackVisibility {
    pub result_id: ResultId,
    pub feedback_visible_to_candidate: bool,
    pub feedback_released_at: Option<DateTime<Utc>>,
}
