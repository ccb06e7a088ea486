use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use crate::config::QuizPolicy;
use crate::workflows::assessments::analyzer::{
    AnalysisError, EvaluationRequest, InterviewAnalysis, InterviewEvaluator,
};
use crate::workflows::assessments::domain::{
    Application, JobPosting, Quiz, QuizDomain, QuizResult, QuizSettings, QuizType,
};
use crate::workflows::assessments::drafts::{
    ApplicationDraft, AttemptSubmission, JobPostingDraft, QuizDraft,
};
use crate::workflows::assessments::repository::InMemoryAssessmentRepository;
use crate::workflows::assessments::service::AssessmentService;

pub(super) type TestService = AssessmentService<InMemoryAssessmentRepository, StubEvaluator>;

/// Evaluator double that answers with a fixed overall score.
#[derive(Default)]
pub(super) struct StubEvaluator {
    calls: AtomicUsize,
    delay: Duration,
    overall_score: Option<f64>,
}

impl StubEvaluator {
    pub(super) fn scoring(overall_score: f64) -> Self {
        Self {
            overall_score: Some(overall_score),
            ..Self::default()
        }
    }

    pub(super) fn slow(overall_score: f64, delay: Duration) -> Self {
        Self {
            delay,
            overall_score: Some(overall_score),
            ..Self::default()
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InterviewEvaluator for StubEvaluator {
    async fn evaluate(
        &self,
        request: &EvaluationRequest<'_>,
    ) -> Result<InterviewAnalysis, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut details = serde_json::Map::new();
        details.insert("summary".to_string(), json!("clear communicator"));
        details.insert(
            "role".to_string(),
            json!(request.job_requirements.title.clone()),
        );
        Ok(InterviewAnalysis {
            overall_score: self.overall_score,
            details,
        })
    }
}

/// Evaluator double standing in for an unreachable service.
#[derive(Default)]
pub(super) struct FailingEvaluator {
    calls: AtomicUsize,
}

impl FailingEvaluator {
    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InterviewEvaluator for FailingEvaluator {
    async fn evaluate(
        &self,
        _request: &EvaluationRequest<'_>,
    ) -> Result<InterviewAnalysis, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AnalysisError::Status(503))
    }
}

pub(super) fn service_with<E: InterviewEvaluator + 'static>(
    evaluator: E,
) -> (
    AssessmentService<InMemoryAssessmentRepository, E>,
    Arc<InMemoryAssessmentRepository>,
    Arc<E>,
) {
    let repository = Arc::new(InMemoryAssessmentRepository::default());
    let evaluator = Arc::new(evaluator);
    let service =
        AssessmentService::new(repository.clone(), evaluator.clone(), QuizPolicy::default());
    (service, repository, evaluator)
}

pub(super) fn build_service() -> (
    TestService,
    Arc<InMemoryAssessmentRepository>,
    Arc<StubEvaluator>,
) {
    service_with(StubEvaluator::scoring(82.0))
}

/// A job posting, one application to it and two quizzes: a multiple-choice
/// screen worth 100 points and a mock interview.
pub(super) struct Catalog {
    pub(super) job: JobPosting,
    pub(super) application: Application,
    pub(super) screen: Quiz,
    pub(super) interview: Quiz,
}

pub(super) fn job_draft() -> JobPostingDraft {
    JobPostingDraft {
        title: "Backend Engineer".to_string(),
        company_name: "Acme".to_string(),
        description: Some("Owns the billing services".to_string()),
        skills: vec!["Rust".to_string(), "PostgreSQL".to_string()],
        domains: vec!["backend".to_string()],
        employment_type: Some("full-time".to_string()),
    }
}

pub(super) fn quiz_draft(job: &JobPosting, quiz_type: QuizType, total_points: i64) -> QuizDraft {
    let questions = match quiz_type {
        QuizType::MockInterview => json!([
            {"type": "interview", "question": "Walk me through a recent outage.", "points": 50},
            {"type": "interview", "question": "How do you review code?", "points": 50}
        ]),
        _ => json!([
            {"type": "multiple-choice", "question": "Which index suits range scans?",
             "options": ["hash", "b-tree"], "correct_answer": 1, "points": 60},
            {"type": "scenario", "question": "A query got slow overnight.", "points": 40}
        ]),
    };
    QuizDraft {
        job_posting_id: job.id.clone(),
        title: format!("{} {}", job.title, quiz_type.label()),
        description: None,
        quiz_type,
        domain: QuizDomain::Backend,
        difficulty: None,
        duration: 30,
        total_points,
        company: Some(job.company_name.clone()),
        technology: vec!["SQL".to_string()],
        questions,
        settings: QuizSettings::default(),
    }
}

pub(super) fn seed_catalog<R, E>(service: &AssessmentService<R, E>) -> Catalog
where
    R: crate::workflows::assessments::repository::AssessmentRepository + 'static,
    E: InterviewEvaluator + 'static,
{
    let job = service.create_job_posting(job_draft()).expect("job created");
    let application = service
        .create_application(ApplicationDraft {
            user_id: crate::workflows::assessments::domain::UserId("user-1".to_string()),
            job_posting_id: job.id.clone(),
        })
        .expect("application created");
    let screen = service
        .create_quiz(quiz_draft(&job, QuizType::MultipleChoice, 100))
        .expect("screen created")
        .quiz;
    let interview = service
        .create_quiz(quiz_draft(&job, QuizType::MockInterview, 100))
        .expect("interview created")
        .quiz;
    Catalog {
        job,
        application,
        screen,
        interview,
    }
}

pub(super) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn attempt(
    quiz: &Quiz,
    application: &Application,
    score: Option<f64>,
    answers: Value,
    completed_at: DateTime<Utc>,
) -> AttemptSubmission {
    AttemptSubmission {
        quiz_id: quiz.id.clone(),
        user_id: application.user_id.clone(),
        score,
        answers,
        analysis: None,
        duration_seconds: Some(900),
        completed_at: Some(completed_at),
    }
}

pub(super) fn interview_answers() -> Value {
    json!({
        "transcription": [
            {"speaker": "interviewer", "text": "Walk me through a recent outage."},
            {"speaker": "candidate", "text": "We lost a replica and failed over."}
        ]
    })
}

pub(super) fn record_interview<R, E>(
    service: &AssessmentService<R, E>,
    catalog: &Catalog,
    answers: Value,
) -> QuizResult
where
    R: crate::workflows::assessments::repository::AssessmentRepository + 'static,
    E: InterviewEvaluator + 'static,
{
    service
        .record_attempt(attempt(
            &catalog.interview,
            &catalog.application,
            None,
            answers,
            at(3, 10),
        ))
        .expect("attempt recorded")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
