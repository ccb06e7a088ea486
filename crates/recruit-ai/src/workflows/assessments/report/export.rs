use std::io::Write;

use chrono::SecondsFormat;
use serde::Serialize;

use super::super::scoring::round_to_cents;
use super::views::ApplicationReport;

const HEADERS: [&str; 11] = [
    "result_id",
    "quiz_title",
    "quiz_type",
    "completed_at",
    "original_score",
    "review_score",
    "final_score",
    "score",
    "percentage",
    "passed",
    "feedback_released",
];

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    result_id: &'a str,
    quiz_title: &'a str,
    quiz_type: &'static str,
    completed_at: String,
    original_score: Option<f64>,
    review_score: Option<f64>,
    final_score: Option<f64>,
    score: f64,
    percentage: f64,
    passed: Option<bool>,
    feedback_released: bool,
}

/// Writes one CSV line per attempt, header included.
pub fn write_csv<W: Write>(report: &ApplicationReport, writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if report.rows.is_empty() {
        csv_writer.write_record(HEADERS)?;
    }
    for row in &report.rows {
        csv_writer.serialize(CsvRow {
            result_id: &row.result_id.0,
            quiz_title: &row.quiz_title,
            quiz_type: row.quiz_type.label(),
            completed_at: row.completed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            original_score: row.original_score,
            review_score: row.review_score,
            final_score: row.final_score,
            score: row.score,
            percentage: round_to_cents(row.percentage),
            passed: row.passed,
            feedback_released: row.feedback_visible_to_candidate,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}
