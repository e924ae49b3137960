// src/models/question.rs

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;
use validator::ValidationError;

use crate::utils::html::clean_html;

/// Upper bounds that keep a quiz's point total well inside `u32`.
pub const MAX_QUESTION_POINTS: u32 = 10_000;
pub const MAX_QUESTIONS_PER_QUIZ: usize = 500;

/// An entry a user can pick: a choice option, an ordering item or one side of a matching pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A quiz question as stored inside the quiz document.
///
/// The answer key lives in `kind`; use [`PublicQuestion`] for anything sent to quiz takers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Prompt text. For cloze tests this is the passage with the blank marked by the author.
    pub text: String,

    pub points: u32,

    /// Shown after grading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,

    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// Type-specific answer key, tagged by the `type` field.
///
/// Unknown `type` values fail deserialization, so a stored quiz can only hold gradable questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum QuestionKind {
    SingleChoice {
        options: Vec<ChoiceOption>,
        correct_option_id: String,
    },
    /// Single choice rendered with pictures; every option carries an `imageUrl`.
    ImageChoice {
        options: Vec<ChoiceOption>,
        correct_option_id: String,
    },
    MultiChoice {
        options: Vec<ChoiceOption>,
        correct_option_ids: Vec<String>,
    },
    TrueFalse {
        correct_boolean: bool,
    },
    FillBlank {
        correct_answers: Vec<String>,
        #[serde(default)]
        case_sensitive: bool,
    },
    ClozeTest {
        correct_answers: Vec<String>,
        #[serde(default)]
        case_sensitive: bool,
    },
    NumericInput {
        correct_number: f64,
        #[serde(default)]
        tolerance: f64,
    },
    Ordering {
        items: Vec<ChoiceOption>,
        correct_order: Vec<String>,
    },
    Matching {
        left_items: Vec<ChoiceOption>,
        right_items: Vec<ChoiceOption>,
        correct_pairs: BTreeMap<String, String>,
    },
}

impl QuestionKind {
    /// The wire name of the variant, e.g. `"single_choice"`.
    pub fn type_name(&self) -> &'static str {
        match self {
            QuestionKind::SingleChoice { .. } => "single_choice",
            QuestionKind::ImageChoice { .. } => "image_choice",
            QuestionKind::MultiChoice { .. } => "multi_choice",
            QuestionKind::TrueFalse { .. } => "true_false",
            QuestionKind::FillBlank { .. } => "fill_blank",
            QuestionKind::ClozeTest { .. } => "cloze_test",
            QuestionKind::NumericInput { .. } => "numeric_input",
            QuestionKind::Ordering { .. } => "ordering",
            QuestionKind::Matching { .. } => "matching",
        }
    }
}

/// DTO for sending a question to a quiz taker (no answer key, no explanation).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: Uuid,
    pub text: String,
    pub points: u32,
    #[serde(flatten)]
    pub kind: PublicQuestionKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum PublicQuestionKind {
    SingleChoice {
        options: Vec<ChoiceOption>,
    },
    ImageChoice {
        options: Vec<ChoiceOption>,
    },
    MultiChoice {
        options: Vec<ChoiceOption>,
    },
    TrueFalse,
    FillBlank,
    ClozeTest,
    NumericInput,
    Ordering {
        items: Vec<ChoiceOption>,
    },
    Matching {
        left_items: Vec<ChoiceOption>,
        right_items: Vec<ChoiceOption>,
    },
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        let kind = match &q.kind {
            QuestionKind::SingleChoice { options, .. } => PublicQuestionKind::SingleChoice {
                options: options.clone(),
            },
            QuestionKind::ImageChoice { options, .. } => PublicQuestionKind::ImageChoice {
                options: options.clone(),
            },
            QuestionKind::MultiChoice { options, .. } => PublicQuestionKind::MultiChoice {
                options: options.clone(),
            },
            QuestionKind::TrueFalse { .. } => PublicQuestionKind::TrueFalse,
            QuestionKind::FillBlank { .. } => PublicQuestionKind::FillBlank,
            QuestionKind::ClozeTest { .. } => PublicQuestionKind::ClozeTest,
            QuestionKind::NumericInput { .. } => PublicQuestionKind::NumericInput,
            // Authors often list items in the correct order; present them alphabetically instead.
            QuestionKind::Ordering { items, .. } => PublicQuestionKind::Ordering {
                items: sorted_by_text(items),
            },
            QuestionKind::Matching {
                left_items,
                right_items,
                ..
            } => PublicQuestionKind::Matching {
                left_items: left_items.clone(),
                right_items: sorted_by_text(right_items),
            },
        };

        PublicQuestion {
            id: q.id,
            text: q.text.clone(),
            points: q.points,
            kind,
        }
    }
}

fn sorted_by_text(items: &[ChoiceOption]) -> Vec<ChoiceOption> {
    let mut items = items.to_vec();
    items.sort_by(|a, b| a.text.cmp(&b.text).then_with(|| a.id.cmp(&b.id)));
    items
}

/// Strips unsafe markup from every author-supplied display string.
/// Answer keys are left untouched since they are compared against raw user input.
pub fn sanitize_question(q: &mut Question) {
    q.text = clean_html(&q.text);
    if let Some(explanation) = q.explanation.as_mut() {
        *explanation = clean_html(explanation);
    }
    let lists: Vec<&mut Vec<ChoiceOption>> = match &mut q.kind {
        QuestionKind::SingleChoice { options, .. }
        | QuestionKind::ImageChoice { options, .. }
        | QuestionKind::MultiChoice { options, .. } => vec![options],
        QuestionKind::Ordering { items, .. } => vec![items],
        QuestionKind::Matching {
            left_items,
            right_items,
            ..
        } => vec![left_items, right_items],
        _ => Vec::new(),
    };
    for list in lists {
        for option in list.iter_mut() {
            option.text = clean_html(&option.text);
        }
    }
}

/// Custom validator for the question list of a quiz.
pub fn validate_questions(questions: &[Question]) -> Result<(), ValidationError> {
    if questions.is_empty() {
        return Err(ValidationError::new("questions_cannot_be_empty"));
    }
    if questions.len() > MAX_QUESTIONS_PER_QUIZ {
        return Err(ValidationError::new("too_many_questions"));
    }
    let mut seen = HashSet::new();
    for q in questions {
        if !seen.insert(q.id) {
            return Err(ValidationError::new("duplicate_question_id"));
        }
        validate_question(q)?;
    }
    Ok(())
}

/// Checks that a question's answer key is consistent with its own options.
pub fn validate_question(q: &Question) -> Result<(), ValidationError> {
    if q.text.trim().is_empty() {
        return Err(ValidationError::new("question_text_cannot_be_empty"));
    }
    if q.text.len() > 5000 {
        return Err(ValidationError::new("question_text_too_long"));
    }
    if q.points > MAX_QUESTION_POINTS {
        return Err(ValidationError::new("question_points_too_high"));
    }

    match &q.kind {
        QuestionKind::SingleChoice {
            options,
            correct_option_id,
        } => {
            let ids = option_ids(options, 2)?;
            if !ids.contains(correct_option_id.as_str()) {
                return Err(ValidationError::new("correct_option_not_in_options"));
            }
        }
        QuestionKind::ImageChoice {
            options,
            correct_option_id,
        } => {
            let ids = option_ids(options, 2)?;
            if !ids.contains(correct_option_id.as_str()) {
                return Err(ValidationError::new("correct_option_not_in_options"));
            }
            for opt in options {
                let valid = opt
                    .image_url
                    .as_deref()
                    .is_some_and(|url| Url::parse(url).is_ok());
                if !valid {
                    return Err(ValidationError::new("invalid_image_url"));
                }
            }
        }
        QuestionKind::MultiChoice {
            options,
            correct_option_ids,
        } => {
            let ids = option_ids(options, 2)?;
            if correct_option_ids.is_empty() {
                return Err(ValidationError::new("correct_options_cannot_be_empty"));
            }
            if correct_option_ids.iter().any(|id| !ids.contains(id.as_str())) {
                return Err(ValidationError::new("correct_option_not_in_options"));
            }
        }
        QuestionKind::TrueFalse { .. } => {}
        QuestionKind::FillBlank {
            correct_answers, ..
        }
        | QuestionKind::ClozeTest {
            correct_answers, ..
        } => {
            if correct_answers.is_empty() || correct_answers.iter().any(|a| a.trim().is_empty()) {
                return Err(ValidationError::new("correct_answers_cannot_be_empty"));
            }
        }
        QuestionKind::NumericInput {
            correct_number,
            tolerance,
        } => {
            if !correct_number.is_finite() {
                return Err(ValidationError::new("correct_number_not_finite"));
            }
            if !tolerance.is_finite() || *tolerance < 0.0 {
                return Err(ValidationError::new("tolerance_must_be_non_negative"));
            }
        }
        QuestionKind::Ordering {
            items,
            correct_order,
        } => {
            let ids = option_ids(items, 2)?;
            let order: HashSet<&str> = correct_order.iter().map(String::as_str).collect();
            if correct_order.len() != items.len() || order != ids {
                return Err(ValidationError::new("correct_order_must_permute_items"));
            }
        }
        QuestionKind::Matching {
            left_items,
            right_items,
            correct_pairs,
        } => {
            let left = option_ids(left_items, 1)?;
            let right = option_ids(right_items, 1)?;
            let keys: HashSet<&str> = correct_pairs.keys().map(String::as_str).collect();
            if keys != left {
                return Err(ValidationError::new("correct_pairs_must_cover_left_items"));
            }
            if correct_pairs.values().any(|v| !right.contains(v.as_str())) {
                return Err(ValidationError::new("correct_pair_not_in_right_items"));
            }
        }
    }
    Ok(())
}

/// Collects option ids, enforcing a minimum count, uniqueness and sane text.
fn option_ids(options: &[ChoiceOption], min: usize) -> Result<HashSet<&str>, ValidationError> {
    if options.len() < min {
        return Err(ValidationError::new("too_few_options"));
    }
    let mut ids = HashSet::new();
    for opt in options {
        if opt.id.trim().is_empty() {
            return Err(ValidationError::new("option_id_cannot_be_empty"));
        }
        if opt.text.len() > 500 {
            return Err(ValidationError::new("option_too_long"));
        }
        if !ids.insert(opt.id.as_str()) {
            return Err(ValidationError::new("duplicate_option_id"));
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn option(id: &str, text: &str) -> ChoiceOption {
        ChoiceOption {
            id: id.to_string(),
            text: text.to_string(),
            image_url: None,
        }
    }

    #[test]
    fn test_deserialize_tagged_question() {
        let q: Question = serde_json::from_value(json!({
            "text": "Pick one",
            "points": 2,
            "type": "single_choice",
            "options": [{"id": "a", "text": "A"}, {"id": "b", "text": "B"}],
            "correctOptionId": "b"
        }))
        .unwrap();

        assert_eq!(q.points, 2);
        assert_eq!(q.kind.type_name(), "single_choice");
        match q.kind {
            QuestionKind::SingleChoice {
                correct_option_id, ..
            } => assert_eq!(correct_option_id, "b"),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_question_points_are_bounded() {
        let mut q: Question = serde_json::from_value(json!({
            "text": "Sky is blue",
            "points": 4_000_000_000u32,
            "type": "true_false",
            "correctBoolean": true
        }))
        .unwrap();
        assert!(validate_question(&q).is_err());

        q.points = MAX_QUESTION_POINTS;
        assert!(validate_question(&q).is_ok());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let parsed = serde_json::from_value::<Question>(json!({
            "text": "Essay",
            "points": 5,
            "type": "essay"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_numeric_tolerance_defaults_to_zero() {
        let q: Question = serde_json::from_value(json!({
            "text": "2 + 2",
            "points": 1,
            "type": "numeric_input",
            "correctNumber": 4
        }))
        .unwrap();
        assert_eq!(
            q.kind,
            QuestionKind::NumericInput {
                correct_number: 4.0,
                tolerance: 0.0
            }
        );
    }

    #[test]
    fn test_public_question_hides_answer_key() {
        let q = Question {
            id: Uuid::new_v4(),
            text: "Order these".to_string(),
            points: 1,
            explanation: Some("because".to_string()),
            kind: QuestionKind::Ordering {
                items: vec![option("1", "Zulu"), option("2", "Alpha")],
                correct_order: vec!["1".to_string(), "2".to_string()],
            },
        };

        let value = serde_json::to_value(PublicQuestion::from(&q)).unwrap();
        assert_eq!(value["type"], "ordering");
        assert!(value.get("correctOrder").is_none());
        assert!(value.get("explanation").is_none());
        assert_eq!(value["items"][0]["text"], "Alpha");
    }

    #[test]
    fn test_validate_single_choice_requires_known_option() {
        let mut q = Question {
            id: Uuid::new_v4(),
            text: "Pick".to_string(),
            points: 1,
            explanation: None,
            kind: QuestionKind::SingleChoice {
                options: vec![option("a", "A"), option("b", "B")],
                correct_option_id: "c".to_string(),
            },
        };
        assert!(validate_question(&q).is_err());

        q.kind = QuestionKind::SingleChoice {
            options: vec![option("a", "A"), option("b", "B")],
            correct_option_id: "a".to_string(),
        };
        assert!(validate_question(&q).is_ok());
    }

    #[test]
    fn test_validate_ordering_must_be_permutation() {
        let q = Question {
            id: Uuid::new_v4(),
            text: "Order".to_string(),
            points: 1,
            explanation: None,
            kind: QuestionKind::Ordering {
                items: vec![option("1", "one"), option("2", "two")],
                correct_order: vec!["1".to_string(), "1".to_string()],
            },
        };
        let err = validate_question(&q).unwrap_err();
        assert_eq!(err.code, "correct_order_must_permute_items");
    }

    #[test]
    fn test_validate_matching_pairs() {
        let mut pairs = BTreeMap::new();
        pairs.insert("l1".to_string(), "r9".to_string());
        let q = Question {
            id: Uuid::new_v4(),
            text: "Match".to_string(),
            points: 1,
            explanation: None,
            kind: QuestionKind::Matching {
                left_items: vec![option("l1", "Paris")],
                right_items: vec![option("r1", "France")],
                correct_pairs: pairs,
            },
        };
        let err = validate_question(&q).unwrap_err();
        assert_eq!(err.code, "correct_pair_not_in_right_items");
    }

    #[test]
    fn test_validate_image_choice_needs_urls() {
        let q = Question {
            id: Uuid::new_v4(),
            text: "Which is a cat?".to_string(),
            points: 1,
            explanation: None,
            kind: QuestionKind::ImageChoice {
                options: vec![
                    ChoiceOption {
                        id: "a".to_string(),
                        text: "A".to_string(),
                        image_url: Some("https://img.example.com/cat.png".to_string()),
                    },
                    option("b", "B"),
                ],
                correct_option_id: "a".to_string(),
            },
        };
        let err = validate_question(&q).unwrap_err();
        assert_eq!(err.code, "invalid_image_url");
    }

    #[test]
    fn test_validate_negative_tolerance() {
        let q = Question {
            id: Uuid::new_v4(),
            text: "pi".to_string(),
            points: 1,
            explanation: None,
            kind: QuestionKind::NumericInput {
                correct_number: 3.14,
                tolerance: -0.1,
            },
        };
        assert!(validate_question(&q).is_err());
    }

    #[test]
    fn test_duplicate_question_ids_rejected() {
        let q = Question {
            id: Uuid::new_v4(),
            text: "true?".to_string(),
            points: 1,
            explanation: None,
            kind: QuestionKind::TrueFalse {
                correct_boolean: true,
            },
        };
        let err = validate_questions(&[q.clone(), q]).unwrap_err();
        assert_eq!(err.code, "duplicate_question_id");
    }

    #[test]
    fn test_sanitize_strips_scripts() {
        let mut q = Question {
            id: Uuid::new_v4(),
            text: "Hello<script>alert(1)</script>".to_string(),
            points: 1,
            explanation: None,
            kind: QuestionKind::SingleChoice {
                options: vec![option("a", "<b>A</b><script>x</script>"), option("b", "B")],
                correct_option_id: "a".to_string(),
            },
        };
        sanitize_question(&mut q);
        assert_eq!(q.text, "Hello");
        match &q.kind {
            QuestionKind::SingleChoice { options, .. } => {
                assert_eq!(options[0].text, "<b>A</b>")
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }
}
