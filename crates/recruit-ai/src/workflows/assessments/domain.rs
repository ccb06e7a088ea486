use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::normalizer::{lenient_number, parse_questions_or_default};

/// Identifier wrapper for job postings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobPostingId(pub String);

/// Identifier wrapper for quizzes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuizId(pub String);

/// Identifier wrapper for a single completed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResultId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SkillAnalysisId(pub String);

/// Format of a quiz, which decides the shape of its questions and answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuizType {
    MultipleChoice,
    MockInterview,
    SoftSkills,
    Technical,
}

impl QuizType {
    pub const fn label(self) -> &'static str {
        match self {
            QuizType::MultipleChoice => "multiple-choice",
            QuizType::MockInterview => "mock-interview",
            QuizType::SoftSkills => "soft-skills",
            QuizType::Technical => "technical",
        }
    }

    /// Conversational quizzes are scored by the external interview evaluator.
    pub const fn is_conversational(self) -> bool {
        matches!(self, QuizType::MockInterview)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuizDomain {
    Frontend,
    Backend,
    Fullstack,
    Mobile,
    Devops,
    DataScience,
    MachineLearning,
    Cybersecurity,
    Cloud,
    QualityAssurance,
    UiUx,
    ProductManagement,
    ProjectManagement,
    Marketing,
    Sales,
    HumanResources,
    Finance,
    CustomerSupport,
}

impl QuizDomain {
    pub const fn label(self) -> &'static str {
        match self {
            QuizDomain::Frontend => "frontend",
            QuizDomain::Backend => "backend",
            QuizDomain::Fullstack => "fullstack",
            QuizDomain::Mobile => "mobile",
            QuizDomain::Devops => "devops",
            QuizDomain::DataScience => "data-science",
            QuizDomain::MachineLearning => "machine-learning",
            QuizDomain::Cybersecurity => "cybersecurity",
            QuizDomain::Cloud => "cloud",
            QuizDomain::QualityAssurance => "quality-assurance",
            QuizDomain::UiUx => "ui-ux",
            QuizDomain::ProductManagement => "product-management",
            QuizDomain::ProjectManagement => "project-management",
            QuizDomain::Marketing => "marketing",
            QuizDomain::Sales => "sales",
            QuizDomain::HumanResources => "human-resources",
            QuizDomain::Finance => "finance",
            QuizDomain::CustomerSupport => "customer-support",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Junior,
    Mid,
    Senior,
}

impl Difficulty {
    pub const fn label(self) -> &'static str {
        match self {
            Difficulty::Junior => "junior",
            Difficulty::Mid => "mid",
            Difficulty::Senior => "senior",
        }
    }
}

/// Delivery options chosen in the quiz builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizSettings {
    pub shuffle_questions: bool,
    pub show_results: bool,
    pub allow_retry: bool,
    /// Minutes; `None` means the quiz duration is the only limit.
    pub time_limit: Option<u32>,
    /// Percentage required to pass.
    pub passing_score: u8,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            shuffle_questions: false,
            show_results: true,
            allow_retry: false,
            time_limit: None,
            passing_score: 70,
        }
    }
}

/// Question variants, discriminated by their `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Question {
    MultipleChoice(MultipleChoiceQuestion),
    Coding(CodingQuestion),
    Scenario(ScenarioQuestion),
    Practical(PracticalQuestion),
    Interview(InterviewQuestion),
}

impl Question {
    pub fn points(&self) -> u32 {
        match self {
            Question::MultipleChoice(q) => q.points,
            Question::Coding(q) => q.points,
            Question::Scenario(q) => q.points,
            Question::Practical(q) => q.points,
            Question::Interview(q) => q.points,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            Question::MultipleChoice(q) => &q.question,
            Question::Coding(q) => &q.question,
            Question::Scenario(q) => &q.question,
            Question::Practical(q) => &q.question,
            Question::Interview(q) => &q.question,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleChoiceQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(default)]
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodingQuestion {
    pub question: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub starter_code: Option<String>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioQuestion {
    pub question: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub evaluation_criteria: Vec<String>,
    #[serde(default)]
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticalQuestion {
    pub question: String,
    #[serde(default)]
    pub deliverables: Vec<String>,
    #[serde(default)]
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub question: String,
    #[serde(default)]
    pub follow_ups: Vec<String>,
    #[serde(default)]
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: JobPostingId,
    pub title: String,
    pub company_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    /// Employment type ("full-time", "senior contract", ...).
    #[serde(default, rename = "type")]
    pub employment_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: QuizId,
    pub job_posting_id: JobPostingId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub quiz_type: QuizType,
    pub domain: QuizDomain,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    /// Minutes.
    pub duration: u32,
    pub total_points: u32,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub technology: Vec<String>,
    /// Stored rows may hold the list JSON-encoded; unreadable entries are dropped.
    #[serde(default, deserialize_with = "stored_questions")]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub settings: QuizSettings,
}

fn stored_questions<'de, D>(deserializer: D) -> Result<Vec<Question>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(parse_questions_or_default(&raw))
}

impl Quiz {
    pub fn question_points(&self) -> u64 {
        self.questions
            .iter()
            .map(|question| u64::from(question.points()))
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub user_id: UserId,
    pub job_posting_id: JobPostingId,
    pub updated_at: DateTime<Utc>,
}

/// Reviewer annotations, kept apart from the candidate's own answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewMetadata {
    #[serde(default)]
    pub reviewed_answers: Option<Value>,
    #[serde(default)]
    pub manual_corrections: Option<Value>,
    #[serde(default)]
    pub reviewer_notes: Option<String>,
    pub reviewed_at: DateTime<Utc>,
    pub reviewed_score: f64,
    pub final_score: f64,
    pub is_reviewed: bool,
}

/// One completed quiz attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub id: ResultId,
    pub quiz_id: QuizId,
    pub user_id: UserId,
    /// Automated score. Legacy rows may carry nothing usable here.
    #[serde(default, deserialize_with = "lenient_number")]
    pub score: Option<f64>,
    #[serde(default)]
    pub candidate_answers: Option<Value>,
    #[serde(default)]
    pub review: Option<ReviewMetadata>,
    /// Evaluator output; older rows hold it as a JSON-encoded string.
    #[serde(default)]
    pub analysis: Option<Value>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub review_score: Option<f64>,
    #[serde(default)]
    pub final_score: Option<f64>,
    #[serde(default)]
    pub feedback_visible_to_candidate: bool,
    #[serde(default)]
    pub feedback_released_at: Option<DateTime<Utc>>,
}

impl QuizResult {
    /// Score fed into review blending: the automated score, or zero.
    pub fn base_score(&self) -> f64 {
        finite(self.score).unwrap_or(0.0)
    }

    /// Score shown on reports: the reconciled score when reviewed.
    pub fn reported_score(&self) -> f64 {
        finite(self.final_score)
            .or_else(|| finite(self.score))
            .unwrap_or(0.0)
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|score| score.is_finite())
}

/// AI skill breakdown attached to a result; the newest one wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillAnalysis {
    pub id: SkillAnalysisId,
    pub result_id: ResultId,
    /// List of skill entries, possibly stored as a JSON string.
    #[serde(default)]
    pub skills: Value,
    #[serde(default)]
    pub ai_feedback: Option<String>,
    #[serde(default)]
    pub improvement_tips: Vec<String>,
    pub created_at: DateTime<Utc>,
}
