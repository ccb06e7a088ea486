use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_SKILL_MAX: f64 = 100.0;

/// Rounds to two decimal places.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Even blend of the automated score and the reviewer's score.
pub fn blend_scores(base: f64, review: f64) -> f64 {
    round_to_cents((base + review) / 2.0)
}

/// Share of the quiz's points earned; zero when the quiz has no points.
pub fn percentage(score: f64, total_points: u32) -> f64 {
    if total_points == 0 {
        return 0.0;
    }
    score * 100.0 / f64::from(total_points)
}

/// A skill entry in the shape dashboards consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillScoreView {
    pub name: String,
    pub score: f64,
    pub max_score: f64,
    pub percentage: f64,
}

/// Maps one stored skill entry, accepting the field spellings used by the
/// different analysis generators over time. Non-object entries are skipped.
pub fn map_skill(entry: &Value) -> Option<SkillScoreView> {
    let map = entry.as_object()?;

    let name = ["name", "skill"]
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str))
        .unwrap_or("unspecified")
        .to_string();
    let score = ["score", "points"]
        .iter()
        .find_map(|key| map.get(*key).and_then(number))
        .unwrap_or(0.0);
    let max_score = ["maxScore", "max_score"]
        .iter()
        .find_map(|key| map.get(*key).and_then(number))
        .unwrap_or(DEFAULT_SKILL_MAX);

    let percentage = if max_score != 0.0 {
        score * 100.0 / max_score
    } else {
        score
    };

    Some(SkillScoreView {
        name,
        score,
        max_score,
        percentage,
    })
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blend_is_an_even_split_rounded_to_cents() {
        assert_eq!(blend_scores(70.0, 90.0), 80.0);
        assert_eq!(blend_scores(65.5, 70.0), 67.75);
        assert_eq!(blend_scores(85.0, 0.0), 42.5);
        assert_eq!(blend_scores(0.0, 0.0), 0.0);
    }

    #[test]
    fn percentage_guards_zero_total() {
        assert_eq!(percentage(70.0, 100), 70.0);
        assert_eq!(percentage(15.0, 60), 25.0);
        assert_eq!(percentage(42.0, 0), 0.0);
    }

    #[test]
    fn skill_mapping_accepts_alternate_field_names() {
        let view = map_skill(&json!({"skill": "SQL", "points": 8})).expect("mapped");
        assert_eq!(
            view,
            SkillScoreView {
                name: "SQL".to_string(),
                score: 8.0,
                max_score: 100.0,
                percentage: 8.0,
            }
        );
    }

    #[test]
    fn skill_mapping_uses_explicit_max() {
        let view =
            map_skill(&json!({"name": "Rust", "score": 4, "maxScore": 5})).expect("mapped");
        assert_eq!(view.percentage, 80.0);
    }

    #[test]
    fn zero_max_reports_raw_score() {
        let view = map_skill(&json!({"name": "Go", "score": 7, "maxScore": 0})).expect("mapped");
        assert_eq!(view.percentage, 7.0);
    }

    #[test]
    fn non_objects_are_skipped() {
        assert!(map_skill(&json!("SQL")).is_none());
    }
}
