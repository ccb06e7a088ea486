use super::views::{ApplicationReport, ReportRow, ReportSummary};
use super::super::scoring::round_to_cents;

impl ApplicationReport {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn summary(&self) -> ReportSummary {
        summarize(&self.rows)
    }
}

fn summarize(rows: &[ReportRow]) -> ReportSummary {
    let attempts = rows.len();
    let reviewed = rows.iter().filter(|row| row.final_score.is_some()).count();
    let passed = rows.iter().filter(|row| row.passed == Some(true)).count();
    let awaiting_release = rows
        .iter()
        .filter(|row| !row.feedback_visible_to_candidate)
        .count();

    let average_percentage = (attempts > 0).then(|| {
        let total: f64 = rows.iter().map(|row| row.percentage).sum();
        round_to_cents(total / attempts as f64)
    });
    let best_percentage = rows
        .iter()
        .map(|row| row.percentage)
        .fold(None, |best: Option<f64>, value| {
            Some(best.map_or(value, |current| current.max(value)))
        })
        .map(round_to_cents);

    ReportSummary {
        attempts,
        reviewed,
        passed,
        awaiting_release,
        average_percentage,
        best_percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::assessments::domain::{
        ApplicationId, JobPostingId, QuizId, QuizType, ResultId,
    };
    use chrono::Utc;

    fn row(id: &str, percentage: f64, reviewed: bool, visible: bool) -> ReportRow {
        ReportRow {
            result_id: ResultId(id.to_string()),
            quiz_id: QuizId("quiz-1".to_string()),
            quiz_title: "Screen".to_string(),
            quiz_type: QuizType::Technical,
            total_points: 100,
            question_count: 0,
            original_score: Some(percentage),
            review_score: None,
            final_score: reviewed.then_some(percentage),
            score: percentage,
            percentage,
            passed: Some(percentage >= 70.0),
            completed_at: Utc::now(),
            duration_seconds: None,
            technology: Vec::new(),
            skills: Vec::new(),
            ai_feedback: None,
            improvement_tips: Vec::new(),
            analysis: None,
            answers: None,
            review: None,
            feedback_visible_to_candidate: visible,
            feedback_released_at: None,
        }
    }

    #[test]
    fn summary_counts_and_averages() {
        let report = ApplicationReport {
            application_id: ApplicationId("app-1".to_string()),
            job_posting_id: JobPostingId("job-1".to_string()),
            job_title: None,
            rows: vec![row("a", 80.0, true, true), row("b", 55.0, false, false)],
        };
        let summary = report.summary();
        assert_eq!(summary.attempts, 2);
        assert_eq!(summary.reviewed, 1);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.awaiting_release, 1);
        assert_eq!(summary.average_percentage, Some(67.5));
        assert_eq!(summary.best_percentage, Some(80.0));
    }

    #[test]
    fn empty_report_has_no_averages() {
        let report = ApplicationReport {
            application_id: ApplicationId("app-1".to_string()),
            job_posting_id: JobPostingId("job-1".to_string()),
            job_title: None,
            rows: Vec::new(),
        };
        let summary = report.summary();
        assert!(report.is_empty());
        assert_eq!(summary.attempts, 0);
        assert_eq!(summary.average_percentage, None);
        assert_eq!(summary.best_percentage, None);
    }
}
