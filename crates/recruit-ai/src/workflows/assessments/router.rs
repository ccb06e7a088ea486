use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::analyzer::InterviewEvaluator;
use super::domain::{ApplicationId, JobPostingId, QuizId, ResultId, UserId};
use super::drafts::{
    AnalysisUpdate, ApplicationDraft, AttemptSubmission, FeedbackRelease, JobPostingDraft,
    QuizDraft, ReviewSubmission, SkillAnalysisDraft,
};
use super::report::{ApplicationReport, ReportSummary};
use super::repository::{AssessmentRepository, RepositoryError};
use super::service::{AssessmentService, AssessmentServiceError};

/// Body shape shared by every assessment endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> ApiEnvelope<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiEnvelope<Value> {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: Value::Null,
        }
    }
}

/// Report plus its headline numbers.
#[derive(Debug, Clone, Serialize)]
pub struct ReportPayload {
    #[serde(flatten)]
    pub report: ApplicationReport,
    pub summary: ReportSummary,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReportQuery {
    #[serde(default = "enrich_by_default")]
    enrich: bool,
}

fn enrich_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeedbackQuery {
    user_id: String,
}

/// Router exposing quiz authoring, result reconciliation, reporting and the
/// feedback gate.
pub fn assessment_router<R, E>(service: Arc<AssessmentService<R, E>>) -> Router
where
    R: AssessmentRepository + 'static,
    E: InterviewEvaluator + 'static,
{
    Router::new()
        .route("/api/v1/job-postings", post(create_job_posting_handler::<R, E>))
        .route("/api/v1/quizzes", post(create_quiz_handler::<R, E>))
        .route(
            "/api/v1/quizzes/:quiz_id",
            axum::routing::delete(delete_quiz_handler::<R, E>),
        )
        .route("/api/v1/applications", post(create_application_handler::<R, E>))
        .route("/api/v1/quiz-results", post(record_attempt_handler::<R, E>))
        .route(
            "/api/v1/quiz-results/:result_id/skill-analyses",
            post(record_skill_analysis_handler::<R, E>),
        )
        .route(
            "/api/v1/quiz-results/:result_id/review",
            put(save_review_handler::<R, E>),
        )
        .route(
            "/api/v1/quiz-results/:result_id/analysis",
            put(save_analysis_handler::<R, E>),
        )
        .route(
            "/api/v1/quiz-results/:result_id/analysis/ensure",
            post(ensure_analysis_handler::<R, E>),
        )
        .route(
            "/api/v1/quiz-results/:result_id/feedback",
            put(share_feedback_handler::<R, E>).get(candidate_feedback_handler::<R, E>),
        )
        .route(
            "/api/v1/applications/:application_id/jobs/:job_id/quiz-results",
            get(application_report_handler::<R, E>),
        )
        .with_state(service)
}

fn respond<T: Serialize>(status: StatusCode, envelope: ApiEnvelope<T>) -> Response {
    (status, Json(envelope)).into_response()
}

/// Malformed bodies get the same envelope as every other failure.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| {
            respond(
                rejection.status(),
                ApiEnvelope::failure(rejection.body_text()),
            )
        })
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, Response> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| {
            respond(
                rejection.status(),
                ApiEnvelope::failure(rejection.body_text()),
            )
        })
}

fn error_response(error: AssessmentServiceError) -> Response {
    let status = match &error {
        AssessmentServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AssessmentServiceError::NotFound { .. }
        | AssessmentServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AssessmentServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        AssessmentServiceError::Repository(RepositoryError::Unavailable(_)) => {
            warn!(error = %error, "assessment store unavailable");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    respond(status, ApiEnvelope::failure(error.to_string()))
}

pub(crate) async fn create_job_posting_handler<R, E>(
    State(service): State<Arc<AssessmentService<R, E>>>,
    payload: Result<Json<JobPostingDraft>, JsonRejection>,
) -> Response
where
    R: AssessmentRepository + 'static,
    E: InterviewEvaluator + 'static,
{
    let draft = match json_body(payload) {
        Ok(draft) => draft,
        Err(rejected) => return rejected,
    };
    match service.create_job_posting(draft) {
        Ok(posting) => respond(StatusCode::CREATED, ApiEnvelope::ok(posting)),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_quiz_handler<R, E>(
    State(service): State<Arc<AssessmentService<R, E>>>,
    payload: Result<Json<QuizDraft>, JsonRejection>,
) -> Response
where
    R: AssessmentRepository + 'static,
    E: InterviewEvaluator + 'static,
{
    let draft = match json_body(payload) {
        Ok(draft) => draft,
        Err(rejected) => return rejected,
    };
    match service.create_quiz(draft) {
        Ok(authoring) => {
            let message = (!authoring.warnings.is_empty()).then(|| authoring.warnings.join("; "));
            let mut envelope = ApiEnvelope::ok(authoring);
            envelope.message = message;
            respond(StatusCode::CREATED, envelope)
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_quiz_handler<R, E>(
    State(service): State<Arc<AssessmentService<R, E>>>,
    Path(quiz_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    E: InterviewEvaluator + 'static,
{
    match service.delete_quiz(&QuizId(quiz_id)) {
        Ok(()) => respond(
            StatusCode::OK,
            ApiEnvelope::ok(Value::Null).with_message("quiz deleted"),
        ),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_application_handler<R, E>(
    State(service): State<Arc<AssessmentService<R, E>>>,
    payload: Result<Json<ApplicationDraft>, JsonRejection>,
) -> Response
where
    R: AssessmentRepository + 'static,
    E: InterviewEvaluator + 'static,
{
    let draft = match json_body(payload) {
        Ok(draft) => draft,
        Err(rejected) => return rejected,
    };
    match service.create_application(draft) {
        Ok(application) => respond(StatusCode::CREATED, ApiEnvelope::ok(application)),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn record_attempt_handler<R, E>(
    State(service): State<Arc<AssessmentService<R, E>>>,
    payload: Result<Json<AttemptSubmission>, JsonRejection>,
) -> Response
where
    R: AssessmentRepository + 'static,
    E: InterviewEvaluator + 'static,
{
    let submission = match json_body(payload) {
        Ok(submission) => submission,
        Err(rejected) => return rejected,
    };
    match service.record_attempt(submission) {
        Ok(result) => respond(StatusCode::CREATED, ApiEnvelope::ok(result)),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn record_skill_analysis_handler<R, E>(
    State(service): State<Arc<AssessmentService<R, E>>>,
    Path(result_id): Path<String>,
    payload: Result<Json<SkillAnalysisDraft>, JsonRejection>,
) -> Response
where
    R: AssessmentRepository + 'static,
    E: InterviewEvaluator + 'static,
{
    let draft = match json_body(payload) {
        Ok(draft) => draft,
        Err(rejected) => return rejected,
    };
    match service.record_skill_analysis(&ResultId(result_id), draft) {
        Ok(analysis) => respond(StatusCode::CREATED, ApiEnvelope::ok(analysis)),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn save_review_handler<R, E>(
    State(service): State<Arc<AssessmentService<R, E>>>,
    Path(result_id): Path<String>,
    payload: Result<Json<ReviewSubmission>, JsonRejection>,
) -> Response
where
    R: AssessmentRepository + 'static,
    E: InterviewEvaluator + 'static,
{
    let submission = match json_body(payload) {
        Ok(submission) => submission,
        Err(rejected) => return rejected,
    };
    match service.save_review(&ResultId(result_id), submission) {
        Ok(result) => respond(
            StatusCode::OK,
            ApiEnvelope::ok(result).with_message("review saved"),
        ),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn save_analysis_handler<R, E>(
    State(service): State<Arc<AssessmentService<R, E>>>,
    Path(result_id): Path<String>,
    payload: Result<Json<AnalysisUpdate>, JsonRejection>,
) -> Response
where
    R: AssessmentRepository + 'static,
    E: InterviewEvaluator + 'static,
{
    let update = match json_body(payload) {
        Ok(update) => update,
        Err(rejected) => return rejected,
    };
    match service.save_analysis(&ResultId(result_id), update.analysis, update.score) {
        Ok(result) => respond(StatusCode::OK, ApiEnvelope::ok(result)),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn ensure_analysis_handler<R, E>(
    State(service): State<Arc<AssessmentService<R, E>>>,
    Path(result_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    E: InterviewEvaluator + 'static,
{
    match service.ensure_analysis(&ResultId(result_id)).await {
        Ok(Some(analysis)) => respond(StatusCode::OK, ApiEnvelope::ok(analysis.to_value())),
        Ok(None) => respond(
            StatusCode::OK,
            ApiEnvelope::ok(Value::Null).with_message("no interview analysis available"),
        ),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn share_feedback_handler<R, E>(
    State(service): State<Arc<AssessmentService<R, E>>>,
    Path(result_id): Path<String>,
    payload: Result<Json<FeedbackRelease>, JsonRejection>,
) -> Response
where
    R: AssessmentRepository + 'static,
    E: InterviewEvaluator + 'static,
{
    let release = match json_body(payload) {
        Ok(release) => release,
        Err(rejected) => return rejected,
    };
    let outcome = service.share_feedback(
        &ResultId(result_id),
        release.application_id.as_ref(),
        release.visible,
    );
    match outcome {
        Ok(visibility) => {
            let message = if visibility.feedback_visible_to_candidate {
                "feedback shared with candidate"
            } else {
                "feedback hidden from candidate"
            };
            respond(StatusCode::OK, ApiEnvelope::ok(visibility).with_message(message))
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn candidate_feedback_handler<R, E>(
    State(service): State<Arc<AssessmentService<R, E>>>,
    Path(result_id): Path<String>,
    query: Result<Query<FeedbackQuery>, QueryRejection>,
) -> Response
where
    R: AssessmentRepository + 'static,
    E: InterviewEvaluator + 'static,
{
    let query = match query_params(query) {
        Ok(query) => query,
        Err(rejected) => return rejected,
    };
    match service.candidate_feedback(&ResultId(result_id), &UserId(query.user_id)) {
        Ok(view) if view.released => respond(StatusCode::OK, ApiEnvelope::ok(view)),
        Ok(view) => respond(
            StatusCode::OK,
            ApiEnvelope::ok(view).with_message("feedback has not been released yet"),
        ),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn application_report_handler<R, E>(
    State(service): State<Arc<AssessmentService<R, E>>>,
    Path((application_id, job_id)): Path<(String, String)>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Response
where
    R: AssessmentRepository + 'static,
    E: InterviewEvaluator + 'static,
{
    let query = match query_params(query) {
        Ok(query) => query,
        Err(rejected) => return rejected,
    };
    let application_id = ApplicationId(application_id);
    let job_id = JobPostingId(job_id);

    if query.enrich {
        if let Err(error) = service
            .ensure_application_analyses(&application_id, &job_id)
            .await
        {
            if !matches!(error, AssessmentServiceError::NotFound { .. }) {
                warn!(error = %error, "skipping interview analysis before report");
            }
        }
    }

    match service.application_report(&application_id, &job_id) {
        Ok(report) => {
            let summary = report.summary();
            respond(StatusCode::OK, ApiEnvelope::ok(ReportPayload { report, summary }))
        }
        Err(AssessmentServiceError::NotFound { entity, .. }) if entity == "application" => {
            let report = ApplicationReport {
                application_id,
                job_posting_id: job_id,
                job_title: None,
                rows: Vec::new(),
            };
            let summary = report.summary();
            respond(
                StatusCode::OK,
                ApiEnvelope::ok(ReportPayload { report, summary })
                    .with_message("application not found"),
            )
        }
        Err(error) => error_response(error),
    }
}
