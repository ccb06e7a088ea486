//! Loads a JSON snapshot of assessment records into a repository.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{Application, JobPosting, Quiz, QuizResult, SkillAnalysis};
use super::repository::{AssessmentRepository, RepositoryError};
use super::service::reserve_record_ids;

#[derive(Debug)]
pub enum SeedError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Repository(RepositoryError),
}

impl std::fmt::Display for SeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedError::Io(err) => write!(f, "failed to read seed file: {}", err),
            SeedError::Json(err) => write!(f, "invalid seed data: {}", err),
            SeedError::Repository(err) => write!(f, "could not store seed records: {}", err),
        }
    }
}

impl std::error::Error for SeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SeedError::Io(err) => Some(err),
            SeedError::Json(err) => Some(err),
            SeedError::Repository(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for SeedError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for SeedError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<RepositoryError> for SeedError {
    fn from(err: RepositoryError) -> Self {
        Self::Repository(err)
    }
}

/// Records as exported from the assessment tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedSnapshot {
    #[serde(default)]
    pub job_postings: Vec<JobPosting>,
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default)]
    pub results: Vec<QuizResult>,
    #[serde(default)]
    pub skill_analyses: Vec<SkillAnalysis>,
}

impl SeedSnapshot {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SeedError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SeedError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn record_count(&self) -> usize {
        self.job_postings.len()
            + self.quizzes.len()
            + self.applications.len()
            + self.results.len()
            + self.skill_analyses.len()
    }

    /// Inserts every record; stops at the first one the repository refuses.
    pub fn load_into<R>(self, repository: &R) -> Result<(), SeedError>
    where
        R: AssessmentRepository + ?Sized,
    {
        let total = self.record_count();
        reserve_record_ids(
            self.job_postings
                .iter()
                .map(|posting| posting.id.0.as_str())
                .chain(self.quizzes.iter().map(|quiz| quiz.id.0.as_str()))
                .chain(self.applications.iter().map(|application| application.id.0.as_str()))
                .chain(self.results.iter().map(|result| result.id.0.as_str()))
                .chain(self.skill_analyses.iter().map(|analysis| analysis.id.0.as_str())),
        );

        for posting in self.job_postings {
            repository.insert_job_posting(posting)?;
        }
        for quiz in self.quizzes {
            repository.insert_quiz(quiz)?;
        }
        for application in self.applications {
            repository.insert_application(application)?;
        }
        for result in self.results {
            repository.insert_result(result)?;
        }
        for analysis in self.skill_analyses {
            repository.insert_skill_analysis(analysis)?;
        }

        info!(records = total, "seed snapshot loaded");
        Ok(())
    }
}
