use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dao::models::{AnswerEntity, AnswerPatch},
    dto::{format_system_time, validation::validate_finite},
};

/// Manual adjustment of an answer. Omitted fields stay unchanged.
///
/// A corrected `rawText` is scored again against its question unless
/// `points` is supplied too.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustAnswerRequest {
    #[serde(default)]
    pub points: Option<f64>,
    #[serde(default)]
    pub bonus: Option<f64>,
    #[serde(default)]
    pub penalty: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub raw_text: Option<String>,
}

impl Validate for AdjustAnswerRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for (field, value) in [
            ("points", self.points),
            ("bonus", self.bonus),
            ("penalty", self.penalty),
        ] {
            if let Some(value) = value {
                if let Err(err) = validate_finite(value) {
                    errors.add(field, err);
                }
            }
        }

        if self.notes.as_ref().is_some_and(|notes| notes.len() > 2000) {
            errors.add("notes", ValidationError::new("too_long"));
        }
        if self.raw_text.as_ref().is_some_and(|raw| raw.len() > 2000) {
            errors.add("raw_text", ValidationError::new("too_long"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<AdjustAnswerRequest> for AnswerPatch {
    fn from(request: AdjustAnswerRequest) -> Self {
        Self {
            points: request.points,
            bonus: request.bonus,
            penalty: request.penalty,
            notes: request.notes,
            raw_text: request.raw_text,
        }
    }
}

/// Answer with its scoring fields.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerView {
    pub id: Uuid,
    pub team_id: Uuid,
    pub round_id: Uuid,
    pub question_id: String,
    pub raw_text: String,
    pub points: f64,
    pub bonus: f64,
    pub penalty: f64,
    pub notes: String,
    pub total: f64,
    pub submitted_at: String,
}

impl From<AnswerEntity> for AnswerView {
    fn from(answer: AnswerEntity) -> Self {
        let total = answer.total();
        Self {
            id: answer.id,
            team_id: answer.team_id,
            round_id: answer.round_id,
            question_id: answer.question_id,
            raw_text: answer.raw_text,
            points: answer.points,
            bonus: answer.bonus,
            penalty: answer.penalty,
            notes: answer.notes,
            total,
            submitted_at: format_system_time(answer.submitted_at),
        }
    }
}

/// Subtotal of one team for one round.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoundSubtotal {
    pub round_id: Uuid,
    pub total: f64,
}

/// One line of the leaderboard.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based position; teams with equal totals still get distinct ranks.
    pub rank: usize,
    pub team_id: Uuid,
    pub team_name: String,
    pub total: f64,
    /// One entry per round of the game, in round order.
    pub rounds: Vec<RoundSubtotal>,
}

/// Per-question result of a team, as shown to that team.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionScore {
    pub question_id: String,
    pub raw_text: String,
    pub points: f64,
    pub bonus: f64,
    pub penalty: f64,
    pub total: f64,
}

/// The scores of a team for one round.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamRoundScore {
    pub round_id: Uuid,
    pub total: f64,
    pub answers: Vec<QuestionScore>,
}

impl From<&AnswerEntity> for QuestionScore {
    fn from(answer: &AnswerEntity) -> Self {
        Self {
            question_id: answer.question_id.clone(),
            raw_text: answer.raw_text.clone(),
            points: answer.points,
            bonus: answer.bonus,
            penalty: answer.penalty,
            total: answer.total(),
        }
    }
}
