//! Quiz results: answer normalization, interview analysis, score
//! reconciliation, per-application reporting and the candidate feedback gate.

pub mod analyzer;
pub mod domain;
pub mod drafts;
pub(crate) mod locks;
pub mod normalizer;
pub mod report;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod seed;
pub mod service;

#[cfg(test)]
mod tests;

pub use analyzer::{
    AnalysisError, EvaluationRequest, HttpInterviewEvaluator, InterviewAnalysis,
    InterviewEvaluator, JobRequirements,
};
pub use domain::{
    Application, ApplicationId, Difficulty, JobPosting, JobPostingId, Question, Quiz, QuizDomain,
    QuizId, QuizResult, QuizSettings, QuizType, ResultId, ReviewMetadata, SkillAnalysis,
    SkillAnalysisId, UserId,
};
pub use drafts::{
    AnalysisUpdate, ApplicationDraft, AttemptSubmission, FeedbackRelease, FeedbackVisibility,
    JobPostingDraft, QuizAuthoring, QuizDraft, ReviewSubmission, SkillAnalysisDraft,
};
pub use normalizer::{NormalizeError, Transcript};
pub use report::{write_csv, ApplicationReport, CandidateFeedbackView, ReportRow, ReportSummary};
pub use repository::{AssessmentRepository, InMemoryAssessmentRepository, RepositoryError};
pub use router::assessment_router;
pub use seed::{SeedError, SeedSnapshot};
pub use service::{AssessmentService, AssessmentServiceError, ValidationError};
