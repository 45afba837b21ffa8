//! Text answer patterns.
//!
//! A pattern is an OR of AND groups. ` / ` and ` | ` separate alternatives,
//! ` + ` joins requirements that must all match. A separator only counts when
//! whitespace surrounds it, so `AC/DC` stays a single pattern. Each piece is a
//! case-insensitive regular expression searched anywhere in the answer; a piece
//! that does not compile is matched as a plain substring instead.

use regex::{Regex, RegexBuilder};

const OR_SEPARATORS: &[char] = &['/', '|'];
const AND_SEPARATORS: &[char] = &['+'];
const REGEX_SIZE_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone)]
enum Matcher {
    Regex(Regex),
    Literal(String),
}

impl Matcher {
    fn compile(piece: &str) -> Self {
        match RegexBuilder::new(piece)
            .case_insensitive(true)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
        {
            Ok(regex) => Self::Regex(regex),
            Err(_) => Self::Literal(piece.to_lowercase()),
        }
    }

    fn matches(&self, answer: &str, lowered: &str) -> bool {
        match self {
            Self::Regex(regex) => regex.is_match(answer),
            Self::Literal(literal) => lowered.contains(literal.as_str()),
        }
    }
}

/// Compiled text pattern.
#[derive(Debug, Clone)]
pub struct TextPattern {
    groups: Vec<Vec<Matcher>>,
}

impl TextPattern {
    /// Compile an expression. Never fails.
    pub fn parse(expression: &str) -> Self {
        let expression = expression.trim();
        if expression.is_empty() {
            return Self { groups: Vec::new() };
        }

        let mut groups: Vec<Vec<Matcher>> = split_on(expression, OR_SEPARATORS)
            .into_iter()
            .map(|alternative| {
                split_on(alternative, AND_SEPARATORS)
                    .into_iter()
                    .map(str::trim)
                    .filter(|piece| !piece.is_empty())
                    .map(Matcher::compile)
                    .collect::<Vec<_>>()
            })
            .filter(|group| !group.is_empty())
            .collect();

        if groups.is_empty() {
            groups.push(vec![Matcher::compile(expression)]);
        }

        Self { groups }
    }

    /// Whether `raw_answer` satisfies the pattern. Blank answers never match,
    /// an empty pattern accepts every other answer.
    pub fn matches(&self, raw_answer: &str) -> bool {
        let answer = raw_answer.trim();
        if answer.is_empty() {
            return false;
        }
        if self.groups.is_empty() {
            return true;
        }

        let lowered = answer.to_lowercase();
        self.groups
            .iter()
            .any(|group| group.iter().all(|matcher| matcher.matches(answer, &lowered)))
    }

    /// Number of alternatives in the pattern.
    pub fn alternatives(&self) -> usize {
        self.groups.len()
    }

    /// Pieces that failed to compile as regular expressions.
    pub fn literal_fallbacks(&self) -> usize {
        self.groups
            .iter()
            .flatten()
            .filter(|matcher| matches!(matcher, Matcher::Literal(_)))
            .count()
    }
}

fn split_on<'a>(expression: &'a str, separators: &[char]) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut previous_is_space = false;
    let mut chars = expression.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        let next_is_space = chars.peek().is_some_and(|(_, next)| next.is_whitespace());
        if previous_is_space && next_is_space && separators.contains(&ch) {
            parts.push(&expression[start..idx]);
            start = idx + ch.len_utf8();
        }
        previous_is_space = ch.is_whitespace();
    }
    parts.push(&expression[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchored_regex_accepts_trimmed_answer() {
        let pattern = TextPattern::parse("^[Pp]aris$");
        assert!(pattern.matches("Paris"));
        assert!(pattern.matches("  paris "));
        assert!(!pattern.matches("Parisian"));
    }

    #[test]
    fn regex_is_case_insensitive_and_unanchored() {
        let pattern = TextPattern::parse("eiffel");
        assert!(pattern.matches("The EIFFEL tower"));
        assert!(!pattern.matches("Louvre"));
    }

    #[test]
    fn alternatives_are_or_ed() {
        let pattern = TextPattern::parse("^new york$ / ^nyc$ | big apple");
        assert_eq!(pattern.alternatives(), 3);
        assert!(pattern.matches("NYC"));
        assert!(pattern.matches("New York"));
        assert!(pattern.matches("the big apple"));
        assert!(!pattern.matches("Boston"));
    }

    #[test]
    fn requirements_are_and_ed_inside_alternatives() {
        let pattern = TextPattern::parse("lennon + mccartney / beatles");
        assert!(pattern.matches("McCartney and Lennon"));
        assert!(!pattern.matches("Lennon"));
        assert!(pattern.matches("The Beatles"));
    }

    #[test]
    fn separators_need_surrounding_whitespace() {
        let pattern = TextPattern::parse("AC/DC");
        assert_eq!(pattern.alternatives(), 1);
        assert!(pattern.matches("ac/dc"));
        assert!(!pattern.matches("AC"));

        let plus = TextPattern::parse("c++");
        assert!(plus.matches("C++"));
    }

    #[test]
    fn broken_regex_falls_back_to_substring() {
        let pattern = TextPattern::parse("f(x");
        assert_eq!(pattern.literal_fallbacks(), 1);
        assert!(pattern.matches("Compute F(X) now"));
        assert!(!pattern.matches("fx"));
    }

    #[test]
    fn empty_pattern_accepts_any_non_blank_answer() {
        let pattern = TextPattern::parse("   ");
        assert!(pattern.matches("anything"));
        assert!(!pattern.matches("   "));
        assert!(!pattern.matches(""));
    }

    #[test]
    fn blank_answer_never_matches() {
        assert!(!TextPattern::parse(".*").matches("  "));
    }
}
