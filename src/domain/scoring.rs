//! Pure scoring engine: maps submitted answers against a question snapshot
//! to per-question credit and an aggregate percentage. No side effects.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Submitted answer payload for one question: a single option id (multiple
/// choice), free text (identification), or a set of option ids (checkbox).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum AnswerValue {
    Single(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone)]
pub(crate) struct OptionDef {
    pub(crate) id: String,
    pub(crate) is_correct: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum QuestionBody {
    MultipleChoice { options: Vec<OptionDef> },
    Checkbox { options: Vec<OptionDef> },
    Identification { accepted_answer: String },
}

#[derive(Debug, Clone)]
pub(crate) struct QuestionDef {
    pub(crate) id: String,
    pub(crate) points: f64,
    pub(crate) body: QuestionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QuestionScore {
    pub(crate) question_id: String,
    pub(crate) answered: bool,
    pub(crate) is_correct: bool,
    pub(crate) points_earned: f64,
    pub(crate) max_points: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct ScoreOutcome {
    pub(crate) per_question: Vec<QuestionScore>,
    pub(crate) score: f64,
    pub(crate) max_score: f64,
    pub(crate) percentage: f64,
}

/// Scores every question in the snapshot. Unanswered questions earn zero.
/// Answers referencing questions outside the snapshot are ignored here; the
/// caller decides how to record them.
pub(crate) fn score(
    questions: &[QuestionDef],
    answers: &HashMap<String, AnswerValue>,
) -> ScoreOutcome {
    let mut per_question = Vec::with_capacity(questions.len());
    let mut earned = 0.0;
    let mut max_score = 0.0;

    for question in questions {
        let answer = answers.get(&question.id);
        let is_correct = answer.map(|value| evaluate(&question.body, value)).unwrap_or(false);
        let points_earned = if is_correct { question.points } else { 0.0 };

        earned += points_earned;
        max_score += question.points;

        per_question.push(QuestionScore {
            question_id: question.id.clone(),
            answered: answer.is_some(),
            is_correct,
            points_earned,
            max_points: question.points,
        });
    }

    // Zero-point assessments are invalid upstream, but must not fault here.
    let percentage = if max_score > 0.0 { (100.0 * earned / max_score).round() } else { 0.0 };

    ScoreOutcome { per_question, score: earned, max_score, percentage }
}

fn evaluate(body: &QuestionBody, answer: &AnswerValue) -> bool {
    match body {
        QuestionBody::MultipleChoice { options } => match answer {
            AnswerValue::Single(id) => {
                options.iter().any(|option| option.is_correct && option.id == *id)
            }
            AnswerValue::Many(_) => false,
        },
        QuestionBody::Checkbox { options } => {
            let submitted: BTreeSet<&str> = match answer {
                AnswerValue::Many(ids) => ids.iter().map(String::as_str).collect(),
                AnswerValue::Single(id) => BTreeSet::from([id.as_str()]),
            };
            let correct: BTreeSet<&str> = options
                .iter()
                .filter(|option| option.is_correct)
                .map(|option| option.id.as_str())
                .collect();
            // Exact set equality: any missing or extra selection loses credit.
            !correct.is_empty() && submitted == correct
        }
        QuestionBody::Identification { accepted_answer } => match answer {
            AnswerValue::Single(text) => normalize(text) == normalize(accepted_answer),
            AnswerValue::Many(_) => false,
        },
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
