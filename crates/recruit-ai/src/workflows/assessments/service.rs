use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::analyzer::{EvaluationRequest, InterviewAnalysis, InterviewEvaluator, JobRequirements};
use super::domain::{
    Application, ApplicationId, JobPosting, JobPostingId, Quiz, QuizId, QuizResult, ResultId,
    ReviewMetadata, SkillAnalysis, SkillAnalysisId, UserId,
};
use super::drafts::{
    ApplicationDraft, AttemptSubmission, FeedbackVisibility, JobPostingDraft, QuizAuthoring,
    QuizDraft, ReviewSubmission, SkillAnalysisDraft,
};
use super::locks::AnalysisLocks;
use super::normalizer::{
    extract_transcript, is_blank, normalize_list, normalize_or_default, normalize_payload,
    parse_questions, NormalizeError,
};
use super::report::{build_row, ApplicationReport, CandidateFeedbackView};
use super::repository::{AssessmentRepository, RepositoryError};
use super::scoring::{blend_scores, map_skill, percentage};
use crate::config::QuizPolicy;

/// Service composing the repository, the interview evaluator and the
/// reporting rules.
pub struct AssessmentService<R, E> {
    repository: Arc<R>,
    evaluator: Arc<E>,
    policy: QuizPolicy,
    analysis_locks: AnalysisLocks,
}

static RECORD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str) -> String {
    let id = RECORD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id:06}")
}

/// Moves the sequence past numbered ids already in the store (`quiz-000042`),
/// so records created afterwards do not collide with loaded ones.
pub(crate) fn reserve_record_ids<'a>(ids: impl IntoIterator<Item = &'a str>) {
    let highest = ids
        .into_iter()
        .filter_map(|id| id.rsplit_once('-'))
        .filter_map(|(_, number)| number.parse::<u64>().ok())
        .max();
    if let Some(highest) = highest {
        RECORD_SEQUENCE.fetch_max(highest.saturating_add(1), Ordering::Relaxed);
    }
}

impl<R, E> AssessmentService<R, E>
where
    R: AssessmentRepository + 'static,
    E: InterviewEvaluator + 'static,
{
    pub fn new(repository: Arc<R>, evaluator: Arc<E>, policy: QuizPolicy) -> Self {
        Self {
            repository,
            evaluator,
            policy,
            analysis_locks: AnalysisLocks::default(),
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn create_job_posting(
        &self,
        draft: JobPostingDraft,
    ) -> Result<JobPosting, AssessmentServiceError> {
        require_text("title", &draft.title)?;
        require_text("company_name", &draft.company_name)?;

        let posting = JobPosting {
            id: JobPostingId(next_id("job")),
            title: draft.title.trim().to_string(),
            company_name: draft.company_name.trim().to_string(),
            description: draft.description,
            skills: draft.skills,
            domains: draft.domains,
            employment_type: draft.employment_type,
        };
        Ok(self.repository.insert_job_posting(posting)?)
    }

    pub fn create_application(
        &self,
        draft: ApplicationDraft,
    ) -> Result<Application, AssessmentServiceError> {
        require_text("user_id", &draft.user_id.0)?;
        self.job_posting(&draft.job_posting_id)?;

        let application = Application {
            id: ApplicationId(next_id("app")),
            user_id: draft.user_id,
            job_posting_id: draft.job_posting_id,
            updated_at: Utc::now(),
        };
        Ok(self.repository.insert_application(application)?)
    }

    /// Validates and stores a quiz built in the quiz builder.
    pub fn create_quiz(&self, draft: QuizDraft) -> Result<QuizAuthoring, AssessmentServiceError> {
        require_text("title", &draft.title)?;
        let duration = positive("duration", draft.duration)?;
        let total_points = positive("total_points", draft.total_points)?;
        if draft.settings.passing_score > 100 {
            return Err(ValidationError::OutOfRange {
                field: "settings.passing_score",
                value: i64::from(draft.settings.passing_score),
            }
            .into());
        }
        self.job_posting(&draft.job_posting_id)?;

        let questions = parse_questions(&draft.questions).map_err(ValidationError::Questions)?;

        let mut warnings = Vec::new();
        let question_points: u64 = questions
            .iter()
            .map(|question| u64::from(question.points()))
            .sum();
        if !questions.is_empty() && question_points != u64::from(total_points) {
            if self.policy.enforce_point_totals {
                return Err(ValidationError::PointTotalMismatch {
                    expected: total_points,
                    found: question_points,
                }
                .into());
            }
            warn!(
                expected = total_points,
                found = question_points,
                "question points do not add up to the quiz total"
            );
            warnings.push(format!(
                "question points add up to {question_points}, quiz total is {total_points}"
            ));
        }

        let quiz = Quiz {
            id: QuizId(next_id("quiz")),
            job_posting_id: draft.job_posting_id,
            title: draft.title.trim().to_string(),
            description: draft.description,
            quiz_type: draft.quiz_type,
            domain: draft.domain,
            difficulty: draft.difficulty,
            duration,
            total_points,
            company: draft.company,
            technology: draft.technology,
            questions,
            settings: draft.settings,
        };
        let quiz = self.repository.insert_quiz(quiz)?;
        info!(quiz_id = %quiz.id.0, quiz_type = quiz.quiz_type.label(), "quiz created");
        Ok(QuizAuthoring { quiz, warnings })
    }

    /// Deletes a quiz; its results and skill analyses go with it.
    pub fn delete_quiz(&self, quiz_id: &QuizId) -> Result<(), AssessmentServiceError> {
        self.quiz(quiz_id)?;
        self.repository.delete_quiz(quiz_id)?;
        info!(quiz_id = %quiz_id.0, "quiz deleted with its results");
        Ok(())
    }

    /// Stores one completed attempt.
    pub fn record_attempt(
        &self,
        submission: AttemptSubmission,
    ) -> Result<QuizResult, AssessmentServiceError> {
        require_text("user_id", &submission.user_id.0)?;
        if let Some(score) = submission.score {
            if !score.is_finite() || score < 0.0 {
                return Err(ValidationError::InvalidScore { field: "score" }.into());
            }
        }
        self.quiz(&submission.quiz_id)?;

        let result = QuizResult {
            id: ResultId(next_id("result")),
            quiz_id: submission.quiz_id,
            user_id: submission.user_id,
            score: submission.score,
            candidate_answers: (!submission.answers.is_null()).then_some(submission.answers),
            review: None,
            analysis: submission.analysis.filter(|analysis| !is_blank(analysis)),
            duration_seconds: submission.duration_seconds,
            completed_at: submission.completed_at.unwrap_or_else(Utc::now),
            review_score: None,
            final_score: None,
            feedback_visible_to_candidate: false,
            feedback_released_at: None,
        };
        Ok(self.repository.insert_result(result)?)
    }

    pub fn record_skill_analysis(
        &self,
        result_id: &ResultId,
        draft: SkillAnalysisDraft,
    ) -> Result<SkillAnalysis, AssessmentServiceError> {
        self.result(result_id)?;
        if let Value::String(_) = draft.skills {
            normalize_payload(&draft.skills).map_err(|source| ValidationError::Payload {
                field: "skills",
                source,
            })?;
        }

        let analysis = SkillAnalysis {
            id: SkillAnalysisId(next_id("skills")),
            result_id: result_id.clone(),
            skills: draft.skills,
            ai_feedback: draft.ai_feedback,
            improvement_tips: draft.improvement_tips,
            created_at: Utc::now(),
        };
        Ok(self.repository.insert_skill_analysis(analysis)?)
    }

    /// Returns the stored interview analysis, generating it first when the
    /// result belongs to a mock interview and has none yet.
    ///
    /// Evaluator failures are logged and reported as `Ok(None)`; so is a
    /// stored analysis that can no longer be read, which is not regenerated.
    pub async fn ensure_analysis(
        &self,
        result_id: &ResultId,
    ) -> Result<Option<InterviewAnalysis>, AssessmentServiceError> {
        let _slot = self.analysis_locks.acquire(result_id).await;

        let result = self.result(result_id)?;
        if let Some(stored) = result.analysis.as_ref().filter(|value| !is_blank(value)) {
            return Ok(decode_stored_analysis(result_id, stored));
        }

        let quiz = self.quiz(&result.quiz_id)?;
        if !quiz.quiz_type.is_conversational() {
            return Ok(None);
        }

        let answers = normalize_or_default(result.candidate_answers.as_ref(), "answers");
        let transcript = extract_transcript(answers.as_ref());
        if transcript.is_empty() {
            debug!(result_id = %result_id.0, "no transcript to evaluate");
            return Ok(None);
        }

        let posting = self.repository.job_posting(&quiz.job_posting_id)?;
        let requirements = JobRequirements::resolve(&quiz, posting.as_ref());
        let request = EvaluationRequest::mock_interview(
            &transcript.transcription,
            &requirements,
            &quiz.questions,
        );

        let analysis = match self.evaluator.evaluate(&request).await {
            Ok(analysis) => analysis,
            Err(err) => {
                warn!(result_id = %result_id.0, error = %err, "interview evaluation unavailable");
                return Ok(None);
            }
        };

        self.repository
            .store_analysis(result_id, analysis.to_value(), analysis.overall_score)?;
        info!(
            result_id = %result_id.0,
            overall_score = ?analysis.overall_score,
            "interview analysis stored"
        );
        Ok(Some(analysis))
    }

    /// Generates missing interview analyses for every attempt an application
    /// made on a job's quizzes. Returns how many were generated.
    pub async fn ensure_application_analyses(
        &self,
        application_id: &ApplicationId,
        job_id: &JobPostingId,
    ) -> Result<usize, AssessmentServiceError> {
        let application = self.application(application_id)?;
        let quizzes = self.repository.quizzes_for_job(job_id)?;
        let interview_quizzes: Vec<QuizId> = quizzes
            .into_iter()
            .filter(|quiz| quiz.quiz_type.is_conversational())
            .map(|quiz| quiz.id)
            .collect();
        if interview_quizzes.is_empty() {
            return Ok(0);
        }

        let pending: Vec<ResultId> = self
            .repository
            .results_for_user(&application.user_id, &interview_quizzes)?
            .into_iter()
            .filter(|result| result.analysis.as_ref().map_or(true, is_blank))
            .map(|result| result.id)
            .collect();

        let mut generated = 0;
        for result_id in &pending {
            if self.ensure_analysis(result_id).await?.is_some() {
                generated += 1;
            }
        }
        Ok(generated)
    }

    /// Records a human review and blends it evenly with the automated score.
    pub fn save_review(
        &self,
        result_id: &ResultId,
        submission: ReviewSubmission,
    ) -> Result<QuizResult, AssessmentServiceError> {
        let review_score = submission.reviewed_score.unwrap_or(0.0);
        if !review_score.is_finite() {
            return Err(ValidationError::InvalidScore {
                field: "reviewed_score",
            }
            .into());
        }
        self.result(result_id)?;

        let reviewed_at = Utc::now();
        let result = self.repository.modify_result(result_id, &mut |result| {
            let final_score = blend_scores(result.base_score(), review_score);
            result.review = Some(ReviewMetadata {
                reviewed_answers: submission.reviewed_answers.clone(),
                manual_corrections: submission.manual_corrections.clone(),
                reviewer_notes: submission.reviewer_notes.clone(),
                reviewed_at,
                reviewed_score: review_score,
                final_score,
                is_reviewed: true,
            });
            result.review_score = Some(review_score);
            result.final_score = Some(final_score);
        })?;
        info!(
            result_id = %result_id.0,
            review_score,
            final_score = ?result.final_score,
            "review saved"
        );
        Ok(result)
    }

    /// Overwrites the stored analysis (and optionally the automated score)
    /// without touching review fields.
    pub fn save_analysis(
        &self,
        result_id: &ResultId,
        analysis: Value,
        score: Option<f64>,
    ) -> Result<QuizResult, AssessmentServiceError> {
        if let Some(score) = score {
            if !score.is_finite() {
                return Err(ValidationError::InvalidScore { field: "score" }.into());
            }
        }
        self.result(result_id)?;
        Ok(self.repository.store_analysis(result_id, analysis, score)?)
    }

    /// Releases (or withdraws) feedback to the candidate.
    pub fn share_feedback(
        &self,
        result_id: &ResultId,
        application_id: Option<&ApplicationId>,
        visible: bool,
    ) -> Result<FeedbackVisibility, AssessmentServiceError> {
        self.result(result_id)?;
        if let Some(application_id) = application_id {
            self.application(application_id)?;
        }

        let now = Utc::now();
        let result = self.repository.store_feedback_visibility(
            result_id,
            visible,
            visible.then_some(now),
        )?;

        if let Some(application_id) = application_id {
            self.repository.touch_application(application_id, now)?;
        }

        info!(result_id = %result_id.0, visible, "feedback visibility updated");
        Ok(FeedbackVisibility {
            result_id: result.id,
            feedback_visible_to_candidate: result.feedback_visible_to_candidate,
            feedback_released_at: result.feedback_released_at,
        })
    }

    /// The candidate's view of their own attempt.
    pub fn candidate_feedback(
        &self,
        result_id: &ResultId,
        user_id: &UserId,
    ) -> Result<CandidateFeedbackView, AssessmentServiceError> {
        let result = self.result(result_id)?;
        if &result.user_id != user_id {
            return Err(AssessmentServiceError::NotFound {
                entity: "quiz result",
                id: result_id.0.clone(),
            });
        }
        let quiz = self.quiz(&result.quiz_id)?;

        if !result.feedback_visible_to_candidate {
            return Ok(CandidateFeedbackView {
                result_id: result.id,
                quiz_title: quiz.title,
                released: false,
                released_at: None,
                score: None,
                percentage: None,
                analysis: None,
                skills: Vec::new(),
                ai_feedback: None,
                improvement_tips: Vec::new(),
            });
        }

        let skill_analysis = self.repository.latest_skill_analysis(&result.id)?;
        let score = result.reported_score();
        let skills = skill_analysis
            .as_ref()
            .map(|analysis| normalize_list(&analysis.skills, "skills"))
            .unwrap_or_default()
            .iter()
            .filter_map(map_skill)
            .collect();

        Ok(CandidateFeedbackView {
            result_id: result.id.clone(),
            quiz_title: quiz.title.clone(),
            released: true,
            released_at: result.feedback_released_at,
            score: Some(score),
            percentage: Some(percentage(score, quiz.total_points)),
            analysis: normalize_or_default(result.analysis.as_ref(), "analysis"),
            skills,
            ai_feedback: skill_analysis
                .as_ref()
                .and_then(|analysis| analysis.ai_feedback.clone()),
            improvement_tips: skill_analysis
                .map(|analysis| analysis.improvement_tips)
                .unwrap_or_default(),
        })
    }

    /// Per-application dashboard rows for one job's quizzes, newest first.
    /// Reads only; see [`Self::ensure_application_analyses`].
    pub fn application_report(
        &self,
        application_id: &ApplicationId,
        job_id: &JobPostingId,
    ) -> Result<ApplicationReport, AssessmentServiceError> {
        let application = self.application(application_id)?;
        let job_title = self
            .repository
            .job_posting(job_id)?
            .map(|posting| posting.title);
        let quizzes = self.repository.quizzes_for_job(job_id)?;

        let mut report = ApplicationReport {
            application_id: application.id.clone(),
            job_posting_id: job_id.clone(),
            job_title,
            rows: Vec::new(),
        };
        if quizzes.is_empty() {
            return Ok(report);
        }

        let quiz_ids: Vec<QuizId> = quizzes.iter().map(|quiz| quiz.id.clone()).collect();
        let by_id: HashMap<&QuizId, &Quiz> = quizzes.iter().map(|quiz| (&quiz.id, quiz)).collect();

        let mut results = self
            .repository
            .results_for_user(&application.user_id, &quiz_ids)?;
        results.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

        for result in &results {
            let Some(quiz) = by_id.get(&result.quiz_id) else {
                continue;
            };
            let skill_analysis = self.repository.latest_skill_analysis(&result.id)?;
            report
                .rows
                .push(build_row(result, quiz, skill_analysis.as_ref()));
        }

        debug!(
            application_id = %application_id.0,
            rows = report.rows.len(),
            "application report assembled"
        );
        Ok(report)
    }

    fn job_posting(&self, id: &JobPostingId) -> Result<JobPosting, AssessmentServiceError> {
        self.repository
            .job_posting(id)?
            .ok_or_else(|| AssessmentServiceError::NotFound {
                entity: "job posting",
                id: id.0.clone(),
            })
    }

    fn quiz(&self, id: &QuizId) -> Result<Quiz, AssessmentServiceError> {
        self.repository
            .quiz(id)?
            .ok_or_else(|| AssessmentServiceError::NotFound {
                entity: "quiz",
                id: id.0.clone(),
            })
    }

    fn result(&self, id: &ResultId) -> Result<QuizResult, AssessmentServiceError> {
        self.repository
            .result(id)?
            .ok_or_else(|| AssessmentServiceError::NotFound {
                entity: "quiz result",
                id: id.0.clone(),
            })
    }

    fn application(&self, id: &ApplicationId) -> Result<Application, AssessmentServiceError> {
        self.repository
            .application(id)?
            .ok_or_else(|| AssessmentServiceError::NotFound {
                entity: "application",
                id: id.0.clone(),
            })
    }
}

/// Reads a stored analysis back. Objects decode field by field; a stored list
/// is kept whole under `items`, since only objects carry an overall score.
fn decode_stored_analysis(result_id: &ResultId, stored: &Value) -> Option<InterviewAnalysis> {
    let document = match normalize_payload(stored) {
        Ok(Some(document)) => document,
        Ok(None) => {
            warn!(result_id = %result_id.0, "stored analysis is not a JSON document");
            return None;
        }
        Err(err) => {
            warn!(result_id = %result_id.0, error = %err, "stored analysis is corrupt");
            return None;
        }
    };

    if let Value::Array(_) = document {
        let mut details = serde_json::Map::new();
        details.insert("items".to_string(), document);
        return Some(InterviewAnalysis {
            overall_score: None,
            details,
        });
    }

    match InterviewAnalysis::from_value(document) {
        Ok(analysis) => Some(analysis),
        Err(err) => {
            warn!(result_id = %result_id.0, error = %err, "stored analysis has an unexpected shape");
            None
        }
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

fn positive(field: &'static str, value: i64) -> Result<u32, ValidationError> {
    if value <= 0 {
        return Err(ValidationError::NonPositive { field, value });
    }
    u32::try_from(value).map_err(|_| ValidationError::OutOfRange { field, value })
}

/// Input rejected before anything is written.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{field} must be greater than zero (got {value})")]
    NonPositive { field: &'static str, value: i64 },
    #[error("{field} is out of range (got {value})")]
    OutOfRange { field: &'static str, value: i64 },
    #[error("{field} must be a finite, non-negative number")]
    InvalidScore { field: &'static str },
    #[error("question points add up to {found}, expected {expected}")]
    PointTotalMismatch { expected: u32, found: u64 },
    #[error("questions are malformed: {0}")]
    Questions(NormalizeError),
    #[error("{field} is malformed: {source}")]
    Payload {
        field: &'static str,
        source: NormalizeError,
    },
}

/// Error raised by the assessment service.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
