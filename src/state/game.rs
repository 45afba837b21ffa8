use uuid::Uuid;

use crate::dao::models::{QuestionEntity, QuestionKindEntity, TeamEntity};

/// A question as the evaluation engine sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionSpec {
    /// Identifier, unique within its round.
    pub id: String,
    /// Prompt shown to the teams.
    pub text: String,
    /// Points awarded on success for pattern, target and choice scoring.
    pub points: f64,
    /// Scoring rule.
    pub kind: QuestionKind,
}

/// Closed set of question kinds, each with its own scoring rule.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    /// Pattern expression matched against the answer text.
    Text { validation: String },
    /// Arithmetic formula over `answer`. When empty, the answer is compared to
    /// `target` or merely checked to be a number.
    Number {
        validation: String,
        target: Option<f64>,
    },
    /// Pick one of `options`.
    Choice {
        options: Vec<String>,
        correct_option: String,
    },
}

impl QuestionKind {
    /// Wire tag of the kind.
    pub fn tag(&self) -> &'static str {
        match self {
            QuestionKind::Text { .. } => "text",
            QuestionKind::Number { .. } => "number",
            QuestionKind::Choice { .. } => "choice",
        }
    }
}

/// Identity of the team behind a player request, resolved from its credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedTeam {
    pub team_id: Uuid,
    pub game_id: Uuid,
    pub name: String,
}

impl From<&TeamEntity> for AuthenticatedTeam {
    fn from(team: &TeamEntity) -> Self {
        Self {
            team_id: team.id,
            game_id: team.game_id,
            name: team.name.clone(),
        }
    }
}

impl From<QuestionEntity> for QuestionSpec {
    fn from(value: QuestionEntity) -> Self {
        let kind = match value.kind {
            QuestionKindEntity::Text { validation } => QuestionKind::Text { validation },
            QuestionKindEntity::Number { validation, target } => {
                QuestionKind::Number { validation, target }
            }
            QuestionKindEntity::Choice {
                options,
                correct_option,
            } => QuestionKind::Choice {
                options,
                correct_option,
            },
        };
        Self {
            id: value.id,
            text: value.text,
            points: value.points,
            kind,
        }
    }
}

impl From<QuestionSpec> for QuestionEntity {
    fn from(value: QuestionSpec) -> Self {
        let kind = match value.kind {
            QuestionKind::Text { validation } => QuestionKindEntity::Text { validation },
            QuestionKind::Number { validation, target } => {
                QuestionKindEntity::Number { validation, target }
            }
            QuestionKind::Choice {
                options,
                correct_option,
            } => QuestionKindEntity::Choice {
                options,
                correct_option,
            },
        };
        Self {
            id: value.id,
            text: value.text,
            points: value.points,
            kind,
        }
    }
}
