use crate::infra::load_repository;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use clap::Args;
use recruit_ai::config::{AppConfig, QuizPolicy};
use recruit_ai::error::AppError;
use recruit_ai::telemetry;
use recruit_ai::workflows::assessments::{
    write_csv, AnalysisError, ApplicationDraft, ApplicationId, ApplicationReport,
    AssessmentRepository, AssessmentService, AttemptSubmission, CandidateFeedbackView,
    EvaluationRequest, HttpInterviewEvaluator, InMemoryAssessmentRepository, InterviewAnalysis,
    InterviewEvaluator, JobPostingDraft, JobPostingId, QuizDomain, QuizDraft, QuizSettings,
    QuizType, ReviewSubmission, SkillAnalysisDraft, UserId,
};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// JSON snapshot of assessment records
    #[arg(long)]
    pub(crate) seed: PathBuf,
    /// Application whose attempts are reported
    #[arg(long)]
    pub(crate) application: String,
    /// Job posting whose quizzes are included
    #[arg(long)]
    pub(crate) job: String,
    /// Write CSV to stdout instead of a table
    #[arg(long)]
    pub(crate) csv: bool,
    /// Do not call the interview evaluator for attempts lacking analysis
    #[arg(long)]
    pub(crate) no_enrich: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print the demo report as CSV after the table
    #[arg(long)]
    pub(crate) csv: bool,
}

/// Offline evaluator: scores an interview by how much the candidate said.
pub(crate) struct ScriptedEvaluator;

#[async_trait]
impl InterviewEvaluator for ScriptedEvaluator {
    async fn evaluate(
        &self,
        request: &EvaluationRequest<'_>,
    ) -> Result<InterviewAnalysis, AnalysisError> {
        let candidate_turns = request
            .transcription
            .iter()
            .filter(|entry| entry.get("speaker").and_then(Value::as_str) == Some("candidate"))
            .count();
        let overall = (55 + 10 * candidate_turns).min(95) as f64;

        let mut details = Map::new();
        details.insert(
            "summary".to_string(),
            json!(format!(
                "{} candidate turns for {}",
                candidate_turns, request.job_requirements.title
            )),
        );
        details.insert("skills".to_string(), json!(request.job_requirements.skills));
        Ok(InterviewAnalysis {
            overall_score: Some(overall),
            details,
        })
    }
}

pub(crate) async fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        seed,
        application,
        job,
        csv,
        no_enrich,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;

    let repository = load_repository(Some(&seed))?;
    let evaluator = Arc::new(HttpInterviewEvaluator::new(&config.evaluator)?);
    let service = AssessmentService::new(repository, evaluator, config.quizzes);

    let application_id = ApplicationId(application);
    let job_id = JobPostingId(job);
    if !no_enrich {
        if let Err(err) = service
            .ensure_application_analyses(&application_id, &job_id)
            .await
        {
            warn!(error = %err, "interview analyses not generated");
        }
    }

    let report = service.application_report(&application_id, &job_id)?;
    if csv {
        write_csv(&report, std::io::stdout().lock())?;
    } else {
        render_report(&report);
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = AssessmentService::new(
        Arc::new(InMemoryAssessmentRepository::default()),
        Arc::new(ScriptedEvaluator),
        QuizPolicy::default(),
    );

    println!("Quiz result reconciliation demo");
    let job = service.create_job_posting(JobPostingDraft {
        title: "Platform Engineer".to_string(),
        company_name: "Lumen Labs".to_string(),
        description: Some("Runs the deployment platform".to_string()),
        skills: vec!["Kubernetes".to_string(), "Rust".to_string()],
        domains: vec!["devops".to_string()],
        employment_type: Some("full-time".to_string()),
    })?;
    let application = service.create_application(ApplicationDraft {
        user_id: UserId("candidate-42".to_string()),
        job_posting_id: job.id.clone(),
    })?;

    let screen = service.create_quiz(QuizDraft {
        job_posting_id: job.id.clone(),
        title: "Container fundamentals".to_string(),
        description: None,
        quiz_type: QuizType::MultipleChoice,
        domain: QuizDomain::Devops,
        difficulty: None,
        duration: 20,
        total_points: 40,
        company: Some(job.company_name.clone()),
        technology: vec!["Docker".to_string()],
        questions: json!([
            {"type": "multiple-choice", "question": "What isolates a container's processes?",
             "options": ["namespaces", "cron"], "correct_answer": 0, "points": 20},
            {"type": "multiple-choice", "question": "Which file builds an image?",
             "options": ["Makefile", "Dockerfile"], "correct_answer": 1, "points": 25}
        ]),
        settings: QuizSettings::default(),
    })?;
    for warning in &screen.warnings {
        println!("  Authoring warning: {warning}");
    }

    let interview = service
        .create_quiz(QuizDraft {
            job_posting_id: job.id.clone(),
            title: "Incident walkthrough".to_string(),
            description: Some("Discuss a production incident".to_string()),
            quiz_type: QuizType::MockInterview,
            domain: QuizDomain::Devops,
            difficulty: None,
            duration: 30,
            total_points: 100,
            company: None,
            technology: Vec::new(),
            questions: json!([
                {"type": "interview", "question": "Tell me about an outage you handled.",
                 "follow_ups": ["What would you change?"], "points": 100}
            ]),
            settings: QuizSettings::default(),
        })?
        .quiz;

    let now = Utc::now();
    let screen_result = service.record_attempt(AttemptSubmission {
        quiz_id: screen.quiz.id.clone(),
        user_id: application.user_id.clone(),
        score: Some(30.0),
        answers: json!({"0": 0, "1": 0}),
        analysis: None,
        duration_seconds: Some(840),
        completed_at: Some(now - Duration::hours(3)),
    })?;
    service.record_skill_analysis(
        &screen_result.id,
        SkillAnalysisDraft {
            skills: json!([
                {"name": "Isolation", "score": 9, "maxScore": 10},
                {"skill": "Image builds", "points": 4, "max_score": 10}
            ]),
            ai_feedback: Some("Solid runtime knowledge, shaky on builds.".to_string()),
            improvement_tips: vec!["Write a multi-stage Dockerfile".to_string()],
        },
    )?;
    let interview_result = service.record_attempt(AttemptSubmission {
        quiz_id: interview.id.clone(),
        user_id: application.user_id.clone(),
        score: None,
        answers: json!({
            "transcription": [
                {"speaker": "interviewer", "text": "Tell me about an outage you handled."},
                {"speaker": "candidate", "text": "Our ingress certificates expired."},
                {"speaker": "interviewer", "text": "What would you change?"},
                {"speaker": "candidate", "text": "Alert on expiry thirty days out."}
            ]
        }),
        analysis: None,
        duration_seconds: Some(1500),
        completed_at: Some(now - Duration::hours(1)),
    })?;

    let generated = service
        .ensure_application_analyses(&application.id, &job.id)
        .await?;
    println!("  Interview analyses generated: {generated}");

    let reviewed = service.save_review(
        &screen_result.id,
        ReviewSubmission {
            reviewed_answers: Some(json!({"1": "accepted after discussion"})),
            reviewed_score: Some(38.0),
            reviewer_notes: Some("Explained build caching well in follow-up.".to_string()),
            manual_corrections: None,
        },
    )?;
    println!(
        "  Review saved: automated {:.1}, reviewer {:.1}, final {:.2}",
        reviewed.base_score(),
        reviewed.review_score.unwrap_or_default(),
        reviewed.final_score.unwrap_or_default()
    );

    let withheld = service.candidate_feedback(&screen_result.id, &application.user_id)?;
    render_candidate_view(&withheld);
    service.share_feedback(&screen_result.id, Some(&application.id), true)?;
    let released = service.candidate_feedback(&screen_result.id, &application.user_id)?;
    render_candidate_view(&released);

    let stored = service
        .repository()
        .result(&interview_result.id)
        .map_err(recruit_ai::workflows::assessments::AssessmentServiceError::from)?;
    if let Some(result) = stored {
        println!(
            "  Interview score from evaluator: {:.1}",
            result.reported_score()
        );
    }

    let report = service.application_report(&application.id, &job.id)?;
    render_report(&report);
    if args.csv {
        println!();
        write_csv(&report, std::io::stdout().lock())?;
    }
    Ok(())
}

pub(crate) fn render_report(report: &ApplicationReport) {
    println!(
        "\nQuiz results for application {} ({})",
        report.application_id.0,
        report.job_title.as_deref().unwrap_or(&report.job_posting_id.0)
    );
    if report.is_empty() {
        println!("  No attempts recorded");
        return;
    }

    for row in &report.rows {
        let status = match row.passed {
            Some(true) => "passed",
            Some(false) => "below passing score",
            None => "unscored",
        };
        println!(
            "- {} [{}] {:.2} pts ({:.1}%), {}{}",
            row.quiz_title,
            row.quiz_type.label(),
            row.score,
            row.percentage,
            status,
            if row.final_score.is_some() {
                ", reviewed"
            } else {
                ""
            }
        );
        for skill in &row.skills {
            println!("    {}: {:.0}%", skill.name, skill.percentage);
        }
        if let Some(feedback) = &row.ai_feedback {
            println!("    Feedback: {feedback}");
        }
        if row.analysis.is_some() {
            println!("    Interview analysis on file");
        }
    }

    let summary = report.summary();
    println!(
        "Summary: {} attempts, {} reviewed, {} passed, {} awaiting release",
        summary.attempts, summary.reviewed, summary.passed, summary.awaiting_release
    );
    if let (Some(average), Some(best)) = (summary.average_percentage, summary.best_percentage) {
        println!("  Average {:.1}%, best {:.1}%", average, best);
    }
}

fn render_candidate_view(view: &CandidateFeedbackView) {
    if !view.released {
        println!("  Candidate view of '{}': feedback not released yet", view.quiz_title);
        return;
    }
    println!(
        "  Candidate view of '{}': {:.1}% ({} tips)",
        view.quiz_title,
        view.percentage.unwrap_or_default(),
        view.improvement_tips.len()
    );
}
