use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dao::models::RoundEntity,
    dto::validation::{validate_not_blank, validate_questions},
    evaluation::parse_number,
    state::{
        game::{QuestionKind, QuestionSpec},
        round_machine::RoundStatus,
    },
};

/// Wire tag of a question kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKindDto {
    Text,
    Number,
    Choice,
}

/// Question spec as exchanged with clients.
///
/// For number questions `correctOption` carries the exact target used when
/// `validation` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDto {
    pub id: String,
    #[serde(default)]
    pub text: String,
    pub kind: QuestionKindDto,
    #[serde(default)]
    pub validation: String,
    pub points: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_option: Option<String>,
}

impl From<QuestionSpec> for QuestionDto {
    fn from(spec: QuestionSpec) -> Self {
        let (kind, validation, options, correct_option) = match spec.kind {
            QuestionKind::Text { validation } => {
                (QuestionKindDto::Text, validation, Vec::new(), None)
            }
            QuestionKind::Number { validation, target } => (
                QuestionKindDto::Number,
                validation,
                Vec::new(),
                target.map(|target| target.to_string()),
            ),
            QuestionKind::Choice {
                options,
                correct_option,
            } => (
                QuestionKindDto::Choice,
                String::new(),
                options,
                Some(correct_option),
            ),
        };
        Self {
            id: spec.id,
            text: spec.text,
            kind,
            validation,
            points: spec.points,
            options,
            correct_option,
        }
    }
}

impl TryFrom<QuestionDto> for QuestionSpec {
    type Error = ValidationError;

    fn try_from(dto: QuestionDto) -> Result<Self, Self::Error> {
        let kind = match dto.kind {
            QuestionKindDto::Text => QuestionKind::Text {
                validation: dto.validation.trim().to_string(),
            },
            QuestionKindDto::Number => {
                let target = match dto.correct_option.as_deref().map(str::trim) {
                    None | Some("") => None,
                    Some(raw) => Some(
                        parse_number(raw).ok_or_else(|| ValidationError::new("number_target"))?,
                    ),
                };
                QuestionKind::Number {
                    validation: dto.validation.trim().to_string(),
                    target,
                }
            }
            QuestionKindDto::Choice => QuestionKind::Choice {
                options: dto.options,
                correct_option: dto
                    .correct_option
                    .ok_or_else(|| ValidationError::new("choice_without_answer"))?,
            },
        };
        Ok(Self {
            id: dto.id.trim().to_string(),
            text: dto.text,
            points: dto.points,
            kind,
        })
    }
}

/// Convert a validated list of question DTOs into specs.
pub fn into_specs(questions: Vec<QuestionDto>) -> Result<Vec<QuestionSpec>, ValidationErrors> {
    questions
        .into_iter()
        .map(QuestionSpec::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| {
            let mut errors = ValidationErrors::new();
            errors.add("questions", err);
            errors
        })
}

/// Payload to add a round to a game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoundRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,
    #[serde(default)]
    #[validate(custom(function = "validate_questions"))]
    pub questions: Vec<QuestionDto>,
}

/// Payload replacing every question of a round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceQuestionsRequest {
    #[validate(custom(function = "validate_questions"))]
    pub questions: Vec<QuestionDto>,
}

/// New display order of the rounds of a game.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRoundsRequest {
    pub round_ids: Vec<Uuid>,
}

/// Optional countdown armed together with opening a round.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenRoundRequest {
    #[serde(default)]
    pub timer_seconds: Option<u64>,
}

/// Countdown to arm on an open round.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartTimerRequest {
    pub seconds: u64,
}

/// Organizer projection of a round.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary {
    pub id: Uuid,
    pub game_id: Uuid,
    pub name: String,
    pub position: u32,
    pub is_open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_expires_at_epoch_seconds: Option<u64>,
    pub questions: Vec<QuestionDto>,
}

impl From<RoundEntity> for RoundSummary {
    fn from(round: RoundEntity) -> Self {
        let status = RoundStatus::from(round.status);
        Self {
            id: round.id,
            game_id: round.game_id,
            name: round.name,
            position: round.position,
            is_open: status.is_open(),
            timer_expires_at_epoch_seconds: status
                .timer()
                .map(|timer| timer.expires_at_epoch_seconds),
            questions: round
                .questions
                .into_iter()
                .map(|question| QuestionSpec::from(question).into())
                .collect(),
        }
    }
}

/// Deadline of a round, for viewers that (re)connect mid-countdown.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTimer {
    pub round_id: Uuid,
    pub expires_at_epoch_seconds: u64,
    pub remaining_seconds: u64,
}

/// Question as shown to players: the scoring rule stays hidden.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerQuestion {
    pub id: String,
    pub text: String,
    pub kind: QuestionKindDto,
    pub points: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl From<QuestionSpec> for PlayerQuestion {
    fn from(spec: QuestionSpec) -> Self {
        let dto = QuestionDto::from(spec);
        Self {
            id: dto.id,
            text: dto.text,
            kind: dto.kind,
            points: dto.points,
            options: dto.options,
        }
    }
}

/// A round as seen by one team.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRoundView {
    pub id: Uuid,
    pub name: String,
    pub position: u32,
    pub is_open: bool,
    pub submitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_expires_at_epoch_seconds: Option<u64>,
    /// Only listed while the round is open.
    pub questions: Vec<PlayerQuestion>,
}
