use serde_json::Value;

use super::super::domain::{Quiz, QuizResult, SkillAnalysis};
use super::super::normalizer::{normalize_list, normalize_or_default};
use super::super::scoring::{map_skill, percentage};
use super::views::ReportRow;

/// Joins a result with its quiz and newest skill analysis.
pub(crate) fn build_row(
    result: &QuizResult,
    quiz: &Quiz,
    skill_analysis: Option<&SkillAnalysis>,
) -> ReportRow {
    let skills = skill_analysis
        .map(|analysis| normalize_list(&analysis.skills, "skills"))
        .unwrap_or_default()
        .iter()
        .filter_map(map_skill)
        .collect();

    let answers = normalize_or_default(result.candidate_answers.as_ref(), "answers")
        .or_else(|| result.candidate_answers.clone().filter(|raw| !raw.is_null()));

    let score = result.reported_score();
    let percentage = percentage(score, quiz.total_points);
    let passed = (quiz.total_points > 0)
        .then(|| percentage >= f64::from(quiz.settings.passing_score));

    ReportRow {
        result_id: result.id.clone(),
        quiz_id: quiz.id.clone(),
        quiz_title: quiz.title.clone(),
        quiz_type: quiz.quiz_type,
        total_points: quiz.total_points,
        question_count: quiz.questions.len(),
        original_score: result.score,
        review_score: result.review_score,
        final_score: result.final_score,
        score,
        percentage,
        passed,
        completed_at: result.completed_at,
        duration_seconds: result.duration_seconds,
        technology: quiz.technology.clone(),
        skills,
        ai_feedback: skill_analysis.and_then(|analysis| analysis.ai_feedback.clone()),
        improvement_tips: skill_analysis
            .map(|analysis| analysis.improvement_tips.clone())
            .unwrap_or_default(),
        analysis: stored_analysis_text(result.analysis.as_ref()),
        answers,
        review: result.review.clone(),
        feedback_visible_to_candidate: result.feedback_visible_to_candidate,
        feedback_released_at: result.feedback_released_at,
    }
}

/// Stored analysis as display text: documents are re-encoded, free text kept.
pub(crate) fn stored_analysis_text(stored: Option<&Value>) -> Option<String> {
    match normalize_or_default(stored, "analysis") {
        Some(document) => Some(document.to_string()),
        None => match stored {
            Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
            _ => None,
        },
    }
}
