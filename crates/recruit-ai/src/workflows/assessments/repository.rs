use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::domain::{
    Application, ApplicationId, JobPosting, JobPostingId, Quiz, QuizId, QuizResult, ResultId,
    SkillAnalysis, UserId,
};

/// Storage abstraction so the service module can be exercised in isolation.
pub trait AssessmentRepository: Send + Sync {
    fn insert_job_posting(&self, posting: JobPosting) -> Result<JobPosting, RepositoryError>;
    fn job_posting(&self, id: &JobPostingId) -> Result<Option<JobPosting>, RepositoryError>;

    fn insert_quiz(&self, quiz: Quiz) -> Result<Quiz, RepositoryError>;
    fn quiz(&self, id: &QuizId) -> Result<Option<Quiz>, RepositoryError>;
    fn quizzes_for_job(&self, job: &JobPostingId) -> Result<Vec<Quiz>, RepositoryError>;
    /// Removes a quiz together with its results and their skill analyses.
    fn delete_quiz(&self, id: &QuizId) -> Result<(), RepositoryError>;

    fn insert_application(&self, application: Application)
        -> Result<Application, RepositoryError>;
    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn touch_application(
        &self,
        id: &ApplicationId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    fn insert_result(&self, result: QuizResult) -> Result<QuizResult, RepositoryError>;
    fn result(&self, id: &ResultId) -> Result<Option<QuizResult>, RepositoryError>;
    /// Applies `change` to the stored row while holding the store's write
    /// access, so fields the change leaves alone keep their latest values.
    fn modify_result(
        &self,
        id: &ResultId,
        change: &mut dyn FnMut(&mut QuizResult),
    ) -> Result<QuizResult, RepositoryError>;

    /// Writes the analysis and, when given, the automated score. Nothing else.
    fn store_analysis(
        &self,
        id: &ResultId,
        analysis: Value,
        score: Option<f64>,
    ) -> Result<QuizResult, RepositoryError> {
        self.modify_result(id, &mut |result| {
            result.analysis = Some(analysis.clone());
            if score.is_some() {
                result.score = score;
            }
        })
    }

    fn store_feedback_visibility(
        &self,
        id: &ResultId,
        visible: bool,
        released_at: Option<DateTime<Utc>>,
    ) -> Result<QuizResult, RepositoryError> {
        self.modify_result(id, &mut |result| {
            result.feedback_visible_to_candidate = visible;
            result.feedback_released_at = released_at;
        })
    }
    fn results_for_user(
        &self,
        user: &UserId,
        quizzes: &[QuizId],
    ) -> Result<Vec<QuizResult>, RepositoryError>;

    fn insert_skill_analysis(
        &self,
        analysis: SkillAnalysis,
    ) -> Result<SkillAnalysis, RepositoryError>;
    fn latest_skill_analysis(
        &self,
        result: &ResultId,
    ) -> Result<Option<SkillAnalysis>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Default)]
struct Tables {
    job_postings: HashMap<JobPostingId, JobPosting>,
    quizzes: HashMap<QuizId, Quiz>,
    applications: HashMap<ApplicationId, Application>,
    results: HashMap<ResultId, QuizResult>,
    skill_analyses: Vec<SkillAnalysis>,
}

/// Process-local store used by the CLI, the demo and tests.
#[derive(Debug, Default)]
pub struct InMemoryAssessmentRepository {
    tables: Mutex<Tables>,
}

impl InMemoryAssessmentRepository {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }
}

impl AssessmentRepository for InMemoryAssessmentRepository {
    fn insert_job_posting(&self, posting: JobPosting) -> Result<JobPosting, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.job_postings.contains_key(&posting.id) {
            return Err(RepositoryError::Conflict);
        }
        tables
            .job_postings
            .insert(posting.id.clone(), posting.clone());
        Ok(posting)
    }

    fn job_posting(&self, id: &JobPostingId) -> Result<Option<JobPosting>, RepositoryError> {
        Ok(self.tables()?.job_postings.get(id).cloned())
    }

    fn insert_quiz(&self, quiz: Quiz) -> Result<Quiz, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.quizzes.contains_key(&quiz.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.quizzes.insert(quiz.id.clone(), quiz.clone());
        Ok(quiz)
    }

    fn quiz(&self, id: &QuizId) -> Result<Option<Quiz>, RepositoryError> {
        Ok(self.tables()?.quizzes.get(id).cloned())
    }

    fn quizzes_for_job(&self, job: &JobPostingId) -> Result<Vec<Quiz>, RepositoryError> {
        let tables = self.tables()?;
        let mut quizzes: Vec<Quiz> = tables
            .quizzes
            .values()
            .filter(|quiz| &quiz.job_posting_id == job)
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(quizzes)
    }

    fn delete_quiz(&self, id: &QuizId) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        if tables.quizzes.remove(id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        let orphaned: Vec<ResultId> = tables
            .results
            .values()
            .filter(|result| &result.quiz_id == id)
            .map(|result| result.id.clone())
            .collect();
        for result_id in &orphaned {
            tables.results.remove(result_id);
        }
        tables
            .skill_analyses
            .retain(|analysis| !orphaned.contains(&analysis.result_id));
        Ok(())
    }

    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        tables
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.tables()?.applications.get(id).cloned())
    }

    fn touch_application(
        &self,
        id: &ApplicationId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        let application = tables
            .applications
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        application.updated_at = at;
        Ok(())
    }

    fn insert_result(&self, result: QuizResult) -> Result<QuizResult, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.results.contains_key(&result.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.results.insert(result.id.clone(), result.clone());
        Ok(result)
    }

    fn result(&self, id: &ResultId) -> Result<Option<QuizResult>, RepositoryError> {
        Ok(self.tables()?.results.get(id).cloned())
    }

    fn modify_result(
        &self,
        id: &ResultId,
        change: &mut dyn FnMut(&mut QuizResult),
    ) -> Result<QuizResult, RepositoryError> {
        let mut tables = self.tables()?;
        let slot = tables.results.get_mut(id).ok_or(RepositoryError::NotFound)?;
        change(slot);
        Ok(slot.clone())
    }

    fn results_for_user(
        &self,
        user: &UserId,
        quizzes: &[QuizId],
    ) -> Result<Vec<QuizResult>, RepositoryError> {
        let tables = self.tables()?;
        let mut results: Vec<QuizResult> = tables
            .results
            .values()
            .filter(|result| &result.user_id == user && quizzes.contains(&result.quiz_id))
            .cloned()
            .collect();
        results.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(results)
    }

    fn insert_skill_analysis(
        &self,
        analysis: SkillAnalysis,
    ) -> Result<SkillAnalysis, RepositoryError> {
        let mut tables = self.tables()?;
        if tables
            .skill_analyses
            .iter()
            .any(|existing| existing.id == analysis.id)
        {
            return Err(RepositoryError::Conflict);
        }
        tables.skill_analyses.push(analysis.clone());
        Ok(analysis)
    }

    fn latest_skill_analysis(
        &self,
        result: &ResultId,
    ) -> Result<Option<SkillAnalysis>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables
            .skill_analyses
            .iter()
            .filter(|analysis| &analysis.result_id == result)
            .max_by_key(|analysis| analysis.created_at)
            .cloned())
    }
}
