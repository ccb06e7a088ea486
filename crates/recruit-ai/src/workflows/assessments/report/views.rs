use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::super::domain::{
    ApplicationId, JobPostingId, QuizId, QuizType, ResultId, ReviewMetadata,
};
use super::super::scoring::SkillScoreView;

/// One attempt as shown on the per-application dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub result_id: ResultId,
    pub quiz_id: QuizId,
    pub quiz_title: String,
    pub quiz_type: QuizType,
    pub total_points: u32,
    pub question_count: usize,
    pub original_score: Option<f64>,
    pub review_score: Option<f64>,
    pub final_score: Option<f64>,
    /// Reconciled score when reviewed, otherwise the automated score.
    pub score: f64,
    pub percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: Option<u32>,
    pub technology: Vec<String>,
    pub skills: Vec<SkillScoreView>,
    pub ai_feedback: Option<String>,
    pub improvement_tips: Vec<String>,
    pub analysis: Option<String>,
    pub answers: Option<Value>,
    pub review: Option<ReviewMetadata>,
    pub feedback_visible_to_candidate: bool,
    pub feedback_released_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationReport {
    pub application_id: ApplicationId,
    pub job_posting_id: JobPostingId,
    pub job_title: Option<String>,
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub attempts: usize,
    pub reviewed: usize,
    pub passed: usize,
    pub awaiting_release: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_percentage: Option<f64>,
}

/// What a candidate may see about one of their attempts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateFeedbackView {
    pub result_id: ResultId,
    pub quiz_title: String,
    pub released: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<SkillScoreView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_feedback: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub improvement_tips: Vec<String>,
}
