// src/grading/evaluator.rs

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::models::question::{Question, QuestionKind};

/// Absorbs binary floating point error at the tolerance boundary.
const NUMERIC_EPSILON: f64 = 1e-9;

/// Result of checking one answer against one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub is_correct: bool,
    pub points_earned: u32,
}

/// Grades a raw submitted answer against a question.
///
/// All-or-nothing: a correct answer earns the question's full points, anything
/// else (including an answer of the wrong shape) earns zero.
pub fn evaluate(question: &Question, answer: &Value) -> Evaluation {
    let is_correct = is_correct(&question.kind, answer);
    Evaluation {
        is_correct,
        points_earned: if is_correct { question.points } else { 0 },
    }
}

fn is_correct(kind: &QuestionKind, answer: &Value) -> bool {
    match kind {
        QuestionKind::SingleChoice {
            correct_option_id, ..
        }
        | QuestionKind::ImageChoice {
            correct_option_id, ..
        } => answer.as_str() == Some(correct_option_id.as_str()),

        QuestionKind::MultiChoice {
            correct_option_ids, ..
        } => as_string_list(answer).is_some_and(|submitted| {
            let submitted: HashSet<&str> = submitted.into_iter().collect();
            let expected: HashSet<&str> = correct_option_ids.iter().map(String::as_str).collect();
            submitted == expected
        }),

        QuestionKind::TrueFalse { correct_boolean } => as_bool(answer) == Some(*correct_boolean),

        QuestionKind::FillBlank {
            correct_answers,
            case_sensitive,
        }
        | QuestionKind::ClozeTest {
            correct_answers,
            case_sensitive,
        } => answer
            .as_str()
            .is_some_and(|text| matches_any(text, correct_answers, *case_sensitive)),

        QuestionKind::NumericInput {
            correct_number,
            tolerance,
        } => as_number(answer)
            .is_some_and(|n| (n - correct_number).abs() <= tolerance + NUMERIC_EPSILON),

        QuestionKind::Ordering { correct_order, .. } => {
            as_string_list(answer).is_some_and(|submitted| {
                submitted.len() == correct_order.len()
                    && submitted.iter().zip(correct_order).all(|(s, c)| *s == c.as_str())
            })
        }

        QuestionKind::Matching { correct_pairs, .. } => {
            as_string_map(answer).is_some_and(|submitted| {
                submitted.len() == correct_pairs.len()
                    && correct_pairs
                        .iter()
                        .all(|(left, right)| submitted.get(left.as_str()) == Some(&right.as_str()))
            })
        }
    }
}

fn matches_any(text: &str, accepted: &[String], case_sensitive: bool) -> bool {
    let text = text.trim();
    if case_sensitive {
        accepted.iter().any(|a| a.trim() == text)
    } else {
        let text = text.to_lowercase();
        accepted.iter().any(|a| a.trim().to_lowercase() == text)
    }
}

/// Accepts JSON booleans and the strings `"true"` / `"false"`.
pub(crate) fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Accepts JSON numbers and numeric strings.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// An array whose every element is a string.
pub(crate) fn as_string_list(value: &Value) -> Option<Vec<&str>> {
    value.as_array()?.iter().map(Value::as_str).collect()
}

/// An object whose every value is a string.
pub(crate) fn as_string_map(value: &Value) -> Option<HashMap<&str, &str>> {
    value
        .as_object()?
        .iter()
        .map(|(k, v)| v.as_str().map(|v| (k.as_str(), v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::ChoiceOption;
    use serde_json::json;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn question(points: u32, kind: QuestionKind) -> Question {
        Question {
            id: Uuid::new_v4(),
            text: "q".to_string(),
            points,
            explanation: None,
            kind,
        }
    }

    fn options(ids: &[&str]) -> Vec<ChoiceOption> {
        ids.iter()
            .map(|id| ChoiceOption {
                id: id.to_string(),
                text: id.to_uppercase(),
                image_url: None,
            })
            .collect()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_choice() {
        let q = question(
            3,
            QuestionKind::SingleChoice {
                options: options(&["a", "b", "c"]),
                correct_option_id: "b".to_string(),
            },
        );
        assert_eq!(
            evaluate(&q, &json!("b")),
            Evaluation {
                is_correct: true,
                points_earned: 3
            }
        );
        assert_eq!(
            evaluate(&q, &json!("a")),
            Evaluation {
                is_correct: false,
                points_earned: 0
            }
        );
        assert!(!evaluate(&q, &json!(["b"])).is_correct);
        assert!(!evaluate(&q, &Value::Null).is_correct);
    }

    #[test]
    fn test_image_choice_behaves_like_single_choice() {
        let q = question(
            1,
            QuestionKind::ImageChoice {
                options: options(&["cat", "dog"]),
                correct_option_id: "cat".to_string(),
            },
        );
        assert!(evaluate(&q, &json!("cat")).is_correct);
        assert!(!evaluate(&q, &json!("dog")).is_correct);
    }

    #[test]
    fn test_multi_choice_is_order_independent() {
        let q = question(
            2,
            QuestionKind::MultiChoice {
                options: options(&["a", "b", "c", "d"]),
                correct_option_ids: strings(&["a", "c"]),
            },
        );
        assert!(evaluate(&q, &json!(["a", "c"])).is_correct);
        assert!(evaluate(&q, &json!(["c", "a"])).is_correct);
        assert_eq!(evaluate(&q, &json!(["c", "a"])).points_earned, 2);
    }

    #[test]
    fn test_multi_choice_no_partial_credit() {
        let q = question(
            2,
            QuestionKind::MultiChoice {
                options: options(&["a", "b", "c"]),
                correct_option_ids: strings(&["a", "c"]),
            },
        );
        assert_eq!(evaluate(&q, &json!(["a"])).points_earned, 0);
        assert_eq!(evaluate(&q, &json!(["a", "b", "c"])).points_earned, 0);
        assert!(!evaluate(&q, &json!("a")).is_correct);
        assert!(!evaluate(&q, &json!(["a", 3])).is_correct);
    }

    #[test]
    fn test_true_false_accepts_strings() {
        let q = question(
            1,
            QuestionKind::TrueFalse {
                correct_boolean: false,
            },
        );
        assert!(evaluate(&q, &json!(false)).is_correct);
        assert!(evaluate(&q, &json!("false")).is_correct);
        assert!(!evaluate(&q, &json!("true")).is_correct);
        assert!(!evaluate(&q, &json!(true)).is_correct);
        assert!(!evaluate(&q, &json!("no")).is_correct);
    }

    #[test]
    fn test_fill_blank_case_insensitive_by_default() {
        let q = question(
            1,
            QuestionKind::FillBlank {
                correct_answers: strings(&["Paris", "Paree"]),
                case_sensitive: false,
            },
        );
        assert!(evaluate(&q, &json!("paris")).is_correct);
        assert!(evaluate(&q, &json!("  PAREE ")).is_correct);
        assert!(!evaluate(&q, &json!("London")).is_correct);
    }

    #[test]
    fn test_cloze_test_case_sensitive() {
        let q = question(
            1,
            QuestionKind::ClozeTest {
                correct_answers: strings(&["DNA"]),
                case_sensitive: true,
            },
        );
        assert!(evaluate(&q, &json!("DNA")).is_correct);
        assert!(!evaluate(&q, &json!("dna")).is_correct);
    }

    #[test]
    fn test_numeric_input_tolerance() {
        let q = question(
            1,
            QuestionKind::NumericInput {
                correct_number: 3.14,
                tolerance: 0.01,
            },
        );
        assert!(evaluate(&q, &json!(3.14)).is_correct);
        assert!(evaluate(&q, &json!(3.15)).is_correct);
        assert!(evaluate(&q, &json!("3.13")).is_correct);
        assert!(!evaluate(&q, &json!(3.16)).is_correct);
        assert!(!evaluate(&q, &json!("pi")).is_correct);
    }

    #[test]
    fn test_numeric_input_exact_when_no_tolerance() {
        let q = question(
            1,
            QuestionKind::NumericInput {
                correct_number: 42.0,
                tolerance: 0.0,
            },
        );
        assert!(evaluate(&q, &json!(42)).is_correct);
        assert!(!evaluate(&q, &json!(42.5)).is_correct);
    }

    #[test]
    fn test_ordering_is_position_sensitive() {
        let q = question(
            4,
            QuestionKind::Ordering {
                items: options(&["1", "2", "3"]),
                correct_order: strings(&["1", "2", "3"]),
            },
        );
        assert!(evaluate(&q, &json!(["1", "2", "3"])).is_correct);
        assert!(!evaluate(&q, &json!(["2", "1", "3"])).is_correct);
        assert!(!evaluate(&q, &json!(["1", "3", "2"])).is_correct);
        assert!(!evaluate(&q, &json!(["1", "2"])).is_correct);
        assert!(!evaluate(&q, &json!(["1", "2", "3", "3"])).is_correct);
    }

    #[test]
    fn test_matching_requires_exact_map() {
        let mut pairs = BTreeMap::new();
        pairs.insert("fr".to_string(), "paris".to_string());
        pairs.insert("de".to_string(), "berlin".to_string());
        let q = question(
            2,
            QuestionKind::Matching {
                left_items: options(&["fr", "de"]),
                right_items: options(&["paris", "berlin"]),
                correct_pairs: pairs,
            },
        );
        assert!(evaluate(&q, &json!({"de": "berlin", "fr": "paris"})).is_correct);
        assert!(!evaluate(&q, &json!({"de": "paris", "fr": "berlin"})).is_correct);
        assert!(!evaluate(&q, &json!({"fr": "paris"})).is_correct);
        assert!(
            !evaluate(&q, &json!({"fr": "paris", "de": "berlin", "it": "rome"})).is_correct
        );
    }

    #[test]
    fn test_zero_point_question_never_awards_points() {
        let q = question(
            0,
            QuestionKind::TrueFalse {
                correct_boolean: true,
            },
        );
        assert_eq!(
            evaluate(&q, &json!(true)),
            Evaluation {
                is_correct: true,
                points_earned: 0
            }
        );
    }
}
