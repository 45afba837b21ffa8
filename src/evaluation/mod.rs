//! Answer evaluation.
//!
//! [`evaluate`] scores one raw answer against one question. It is total: any
//! malformed pattern, formula or answer degrades to a defined fallback and the
//! result is always a finite number.

mod formula;
mod pattern;

pub use formula::{BinaryOp, Expr, Formula, FormulaError, Function, MAX_DEPTH};
pub use pattern::TextPattern;

use crate::state::game::{QuestionKind, QuestionSpec};

/// Maximum distance between a numeric answer and its target to count as equal.
pub const NUMBER_TOLERANCE: f64 = 1e-9;

/// Points awarded to `raw_answer` for `question`.
pub fn evaluate(question: &QuestionSpec, raw_answer: &str) -> f64 {
    let points = match &question.kind {
        QuestionKind::Text { validation } => {
            award(question.points, TextPattern::parse(validation).matches(raw_answer))
        }
        QuestionKind::Number { validation, target } => {
            evaluate_number(question.points, validation, *target, raw_answer)
        }
        QuestionKind::Choice { correct_option, .. } => {
            award(question.points, choice_matches(correct_option, raw_answer))
        }
    };

    if points.is_finite() { points } else { 0.0 }
}

/// Parse a numeric answer. Surrounding whitespace is ignored and only finite
/// values count as numbers.
pub fn parse_number(raw_answer: &str) -> Option<f64> {
    raw_answer
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn evaluate_number(points: f64, validation: &str, target: Option<f64>, raw_answer: &str) -> f64 {
    let Some(answer) = parse_number(raw_answer) else {
        return 0.0;
    };

    let validation = validation.trim();
    if validation.is_empty() {
        return match target {
            Some(target) => award(points, (answer - target).abs() <= NUMBER_TOLERANCE),
            None => points,
        };
    }

    Formula::parse(validation)
        .and_then(|formula| formula.eval(answer))
        .unwrap_or(0.0)
}

fn choice_matches(correct_option: &str, raw_answer: &str) -> bool {
    let answer = raw_answer.trim();
    !answer.is_empty() && answer.to_lowercase() == correct_option.trim().to_lowercase()
}

fn award(points: f64, success: bool) -> f64 {
    if success { points } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(validation: &str, points: f64) -> QuestionSpec {
        QuestionSpec {
            id: "q".into(),
            text: String::new(),
            points,
            kind: QuestionKind::Text {
                validation: validation.into(),
            },
        }
    }

    fn number(validation: &str, target: Option<f64>, points: f64) -> QuestionSpec {
        QuestionSpec {
            id: "q".into(),
            text: String::new(),
            points,
            kind: QuestionKind::Number {
                validation: validation.into(),
                target,
            },
        }
    }

    fn choice(correct: &str) -> QuestionSpec {
        QuestionSpec {
            id: "q".into(),
            text: String::new(),
            points: 2.0,
            kind: QuestionKind::Choice {
                options: vec!["Red".into(), "Blue".into()],
                correct_option: correct.into(),
            },
        }
    }

    #[test]
    fn text_or_and_and_expressions() {
        let either = text("cat / dog", 1.0);
        assert_eq!(evaluate(&either, "Dog"), 1.0);
        assert_eq!(evaluate(&either, "a cat"), 1.0);
        assert_eq!(evaluate(&either, "bird"), 0.0);

        let both = text("red + blue", 1.5);
        assert_eq!(evaluate(&both, "blue and red"), 1.5);
        assert_eq!(evaluate(&both, "red"), 0.0);
    }

    #[test]
    fn text_whitespace_policy() {
        let paris = text("^[Pp]aris$", 1.0);
        assert_eq!(evaluate(&paris, "Paris"), 1.0);
        assert_eq!(evaluate(&paris, "paris"), 1.0);
        assert_eq!(evaluate(&paris, "Paris "), 1.0);
        assert_eq!(evaluate(&paris, "Pa ris"), 0.0);
    }

    #[test]
    fn number_formulas_score_directly() {
        let times_four = number("answer * 4", None, 0.0);
        assert_eq!(evaluate(&times_four, "10"), 40.0);
        assert_eq!(evaluate(&times_four, " 10 "), 40.0);
        assert_eq!(evaluate(&times_four, "abc"), 0.0);
        assert_eq!(evaluate(&times_four, ""), 0.0);
        assert_eq!(evaluate(&times_four, "NaN"), 0.0);
        assert_eq!(evaluate(&times_four, "inf"), 0.0);

        assert_eq!(evaluate(&number("answer / 0", None, 0.0), "10"), 0.0);
        assert_eq!(evaluate(&number("answer +", None, 0.0), "10"), 0.0);
        assert_eq!(evaluate(&number("evil(answer)", None, 0.0), "10"), 0.0);
    }

    #[test]
    fn number_without_formula_uses_target_or_validity() {
        let exact = number("", Some(1969.0), 3.0);
        assert_eq!(evaluate(&exact, "1969"), 3.0);
        assert_eq!(evaluate(&exact, "1969.0"), 3.0);
        assert_eq!(evaluate(&exact, "1970"), 0.0);

        let any_number = number("  ", None, 2.0);
        assert_eq!(evaluate(&any_number, "-4.5"), 2.0);
        assert_eq!(evaluate(&any_number, "four"), 0.0);
    }

    #[test]
    fn choice_compares_trimmed_and_case_folded() {
        let question = choice("Blue");
        assert_eq!(evaluate(&question, "  blue "), 2.0);
        assert_eq!(evaluate(&question, "BLUE"), 2.0);
        assert_eq!(evaluate(&question, "Red"), 0.0);
        assert_eq!(evaluate(&question, ""), 0.0);
    }

    #[test]
    fn evaluation_is_total_and_finite() {
        let questions = [
            text("(((", 1.0),
            text("", 1.0),
            number("((((((", None, 1.0),
            number(&"(".repeat(10_000), None, 1.0),
            number("answer * 1e308 * 1e308", None, 1.0),
            number("round(answer, 400)", None, 1.0),
            number("", Some(f64::NAN), 1.0),
            choice(""),
        ];
        let long = "9".repeat(400);
        let answers = ["", " ", "\u{0}", "1e400", "-0", "💥", long.as_str()];
        for question in &questions {
            for answer in answers {
                assert!(evaluate(question, answer).is_finite());
            }
        }
    }
}
