//! Bridge to the external mock-interview evaluator.
//!
//! The evaluator receives the interview transcript together with a summary of
//! the role being hired for and answers with a free-form analysis document.
//! Only `overallScore` is interpreted here; the rest is stored verbatim.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::domain::{JobPosting, Question, Quiz};
use super::normalizer::lenient_number;
use crate::config::EvaluatorConfig;

const EVALUATE_MOCK_INTERVIEW: &str = "evaluate-mock-interview";

/// Role summary sent alongside a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequirements {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub skills: Vec<String>,
    pub domains: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

impl JobRequirements {
    /// Job posting fields win; the quiz fills whatever the posting leaves out.
    pub fn resolve(quiz: &Quiz, posting: Option<&JobPosting>) -> Self {
        let title = posting
            .map(|job| job.title.trim())
            .filter(|title| !title.is_empty())
            .unwrap_or(quiz.title.as_str())
            .to_string();

        let description = posting
            .and_then(|job| non_empty(job.description.as_deref()))
            .or_else(|| non_empty(quiz.description.as_deref()));

        let skills = match posting {
            Some(job) if !job.skills.is_empty() => job.skills.clone(),
            _ => quiz.technology.clone(),
        };

        let domains = match posting {
            Some(job) if !job.domains.is_empty() => job.domains.clone(),
            _ => vec![quiz.domain.label().to_string()],
        };

        let difficulty = quiz
            .difficulty
            .map(|level| level.label().to_string())
            .or_else(|| posting.and_then(|job| non_empty(job.employment_type.as_deref())));

        Self {
            title,
            description,
            skills,
            domains,
            difficulty,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Request body understood by the evaluator endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub transcription: &'a [Value],
    pub job_requirements: &'a JobRequirements,
    pub questions: &'a [Question],
}

impl<'a> EvaluationRequest<'a> {
    pub fn mock_interview(
        transcription: &'a [Value],
        job_requirements: &'a JobRequirements,
        questions: &'a [Question],
    ) -> Self {
        Self {
            kind: EVALUATE_MOCK_INTERVIEW,
            transcription,
            job_requirements,
            questions,
        }
    }
}

/// Evaluator output. Everything besides the overall score is opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewAnalysis {
    #[serde(
        rename = "overallScore",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub overall_score: Option<f64>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl InterviewAnalysis {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_value(&self) -> Value {
        let mut map = self.details.clone();
        if let Some(score) = self.overall_score {
            map.insert("overallScore".to_string(), Value::from(score));
        }
        Value::Object(map)
    }
}

#[derive(Debug, Deserialize)]
struct EvaluationEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl EvaluationEnvelope {
    fn into_analysis(self) -> Result<InterviewAnalysis, AnalysisError> {
        if !self.success {
            return Err(AnalysisError::Rejected(
                self.error.unwrap_or_else(|| "no reason given".to_string()),
            ));
        }
        match self.data {
            Some(data @ Value::Object(_)) => InterviewAnalysis::from_value(data)
                .map_err(|err| AnalysisError::Decode(err.to_string())),
            _ => Err(AnalysisError::MissingData),
        }
    }
}

/// Failures talking to the evaluator.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("evaluator request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("evaluator responded with status {0}")]
    Status(u16),
    #[error("evaluator rejected the transcript: {0}")]
    Rejected(String),
    #[error("evaluator response carried no analysis")]
    MissingData,
    #[error("evaluator analysis could not be decoded: {0}")]
    Decode(String),
}

/// Seam for the interview evaluation service.
#[async_trait]
pub trait InterviewEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        request: &EvaluationRequest<'_>,
    ) -> Result<InterviewAnalysis, AnalysisError>;
}

/// Evaluator reached over HTTP at `{base_url}/api/gemini`.
#[derive(Debug, Clone)]
pub struct HttpInterviewEvaluator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpInterviewEvaluator {
    pub fn new(config: &EvaluatorConfig) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: &EvaluatorConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl InterviewEvaluator for HttpInterviewEvaluator {
    async fn evaluate(
        &self,
        request: &EvaluationRequest<'_>,
    ) -> Result<InterviewAnalysis, AnalysisError> {
        debug!(endpoint = %self.endpoint, entries = request.transcription.len(), "requesting interview evaluation");

        let response = self.client.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::Status(status.as_u16()));
        }

        let envelope: EvaluationEnvelope = response
            .json()
            .await
            .map_err(|err| AnalysisError::Decode(err.to_string()))?;
        envelope.into_analysis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::assessments::domain::{
        Difficulty, JobPostingId, QuizDomain, QuizId, QuizSettings, QuizType,
    };
    use serde_json::json;

    fn quiz() -> Quiz {
        Quiz {
            id: QuizId("quiz-1".to_string()),
            job_posting_id: JobPostingId("job-1".to_string()),
            title: "Backend screen".to_string(),
            description: Some("Talk through a service design".to_string()),
            quiz_type: QuizType::MockInterview,
            domain: QuizDomain::Backend,
            difficulty: None,
            duration: 30,
            total_points: 100,
            company: None,
            technology: vec!["Rust".to_string()],
            questions: Vec::new(),
            settings: QuizSettings::default(),
        }
    }

    fn posting() -> JobPosting {
        JobPosting {
            id: JobPostingId("job-1".to_string()),
            title: "Senior Platform Engineer".to_string(),
            company_name: "Acme".to_string(),
            description: None,
            skills: vec!["Kubernetes".to_string(), "Go".to_string()],
            domains: Vec::new(),
            employment_type: Some("senior".to_string()),
        }
    }

    #[test]
    fn requirements_prefer_job_posting_fields() {
        let requirements = JobRequirements::resolve(&quiz(), Some(&posting()));
        assert_eq!(requirements.title, "Senior Platform Engineer");
        assert_eq!(requirements.skills, vec!["Kubernetes", "Go"]);
        assert_eq!(
            requirements.description.as_deref(),
            Some("Talk through a service design")
        );
        assert_eq!(requirements.domains, vec!["backend"]);
        assert_eq!(requirements.difficulty.as_deref(), Some("senior"));
    }

    #[test]
    fn requirements_fall_back_to_quiz_without_posting() {
        let mut quiz = quiz();
        quiz.difficulty = Some(Difficulty::Junior);
        let requirements = JobRequirements::resolve(&quiz, None);
        assert_eq!(requirements.title, "Backend screen");
        assert_eq!(requirements.skills, vec!["Rust"]);
        assert_eq!(requirements.difficulty.as_deref(), Some("junior"));
    }

    #[test]
    fn request_serializes_with_wire_names() {
        let requirements = JobRequirements::resolve(&quiz(), None);
        let transcript = vec![json!({"speaker": "candidate", "text": "hello"})];
        let request = EvaluationRequest::mock_interview(&transcript, &requirements, &[]);
        let encoded = serde_json::to_value(&request).expect("serializes");
        assert_eq!(encoded["type"], "evaluate-mock-interview");
        assert_eq!(encoded["jobRequirements"]["title"], "Backend screen");
        assert_eq!(encoded["transcription"].as_array().map(Vec::len), Some(1));
        assert!(encoded["questions"].as_array().is_some());
    }

    #[test]
    fn envelope_requires_success_and_data() {
        let missing: EvaluationEnvelope =
            serde_json::from_value(json!({"success": true})).expect("parses");
        assert!(matches!(
            missing.into_analysis(),
            Err(AnalysisError::MissingData)
        ));

        let rejected: EvaluationEnvelope =
            serde_json::from_value(json!({"success": false, "error": "quota"})).expect("parses");
        assert!(matches!(
            rejected.into_analysis(),
            Err(AnalysisError::Rejected(reason)) if reason == "quota"
        ));

        let ok: EvaluationEnvelope = serde_json::from_value(
            json!({"success": true, "data": {"overallScore": 77, "summary": "solid"}}),
        )
        .expect("parses");
        let analysis = ok.into_analysis().expect("analysis present");
        assert_eq!(analysis.overall_score, Some(77.0));
        assert_eq!(analysis.details["summary"], "solid");
    }

    #[test]
    fn analysis_round_trips_through_values() {
        let value = json!({"overallScore": "64.5", "strengths": ["listening"]});
        let analysis = InterviewAnalysis::from_value(value).expect("decodes");
        assert_eq!(analysis.overall_score, Some(64.5));
        let encoded = analysis.to_value();
        assert_eq!(encoded["overallScore"], json!(64.5));
        assert_eq!(encoded["strengths"], json!(["listening"]));
    }
}
