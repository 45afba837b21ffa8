use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Competition entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Display name of the competition.
    pub name: String,
    /// Short code teams type to join the game.
    pub join_code: String,
    /// Inactive games refuse new joins but keep their teams.
    pub active: bool,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Question definition stored inside a round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionEntity {
    /// Identifier, unique within the round.
    pub id: String,
    /// Prompt shown to the teams.
    pub text: String,
    /// Points awarded on success. Formula-scored questions compute their own.
    pub points: f64,
    /// Kind-specific scoring rule.
    pub kind: QuestionKindEntity,
}

/// Kind-specific part of a stored question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKindEntity {
    Text {
        validation: String,
    },
    Number {
        validation: String,
        target: Option<f64>,
    },
    Choice {
        options: Vec<String>,
        correct_option: String,
    },
}

/// Countdown attached to an open round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PendingTimerEntity {
    /// Identifies one arming of the timer; a stale token never closes a round.
    pub token: Uuid,
    /// Absolute deadline in seconds since the Unix epoch.
    pub expires_at_epoch_seconds: u64,
}

/// Persisted open/closed status of a round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RoundStatusEntity {
    Closed,
    Open { timer: Option<PendingTimerEntity> },
}

/// Round entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundEntity {
    /// Primary key of the round.
    pub id: Uuid,
    /// Owning game.
    pub game_id: Uuid,
    /// Display name.
    pub name: String,
    /// Display position inside the game, ascending.
    pub position: u32,
    /// Open/closed status, only mutated through compare-and-set.
    pub status: RoundStatusEntity,
    /// Ordered question specs.
    pub questions: Vec<QuestionEntity>,
}

/// Team entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Stable identifier for the team.
    pub id: Uuid,
    /// Owning game.
    pub game_id: Uuid,
    /// Display name, unique within the game.
    pub name: String,
    /// Credential presented by the team on every player request.
    pub token: Uuid,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Monotonic creation sequence assigned by the store, used to break ranking ties.
    pub seq: u64,
}

/// Answer entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerEntity {
    /// Primary key of the answer.
    pub id: Uuid,
    /// Team that submitted the answer.
    pub team_id: Uuid,
    /// Round the answer belongs to.
    pub round_id: Uuid,
    /// Question identifier inside the round.
    pub question_id: String,
    /// Raw submitted text.
    pub raw_text: String,
    /// Points computed at submission time (organizer may override).
    pub points: f64,
    /// Manual bonus.
    pub bonus: f64,
    /// Manual penalty.
    pub penalty: f64,
    /// Free-text organizer notes.
    pub notes: String,
    /// Submission timestamp.
    pub submitted_at: SystemTime,
}

impl AnswerEntity {
    /// Total score of the answer: `points + bonus - penalty`.
    pub fn total(&self) -> f64 {
        self.points + self.bonus - self.penalty
    }
}

/// Partial update of an answer's scoring fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerPatch {
    pub points: Option<f64>,
    pub bonus: Option<f64>,
    pub penalty: Option<f64>,
    pub notes: Option<String>,
    pub raw_text: Option<String>,
}

impl AnswerPatch {
    /// Apply the supplied fields to `answer`.
    pub fn apply_to(&self, answer: &mut AnswerEntity) {
        if let Some(points) = self.points {
            answer.points = points;
        }
        if let Some(bonus) = self.bonus {
            answer.bonus = bonus;
        }
        if let Some(penalty) = self.penalty {
            answer.penalty = penalty;
        }
        if let Some(notes) = &self.notes {
            answer.notes.clone_from(notes);
        }
        if let Some(raw_text) = &self.raw_text {
            answer.raw_text.clone_from(raw_text);
        }
    }
}

/// Marker recording that a team's submission for a round was accepted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionEntity {
    pub team_id: Uuid,
    pub round_id: Uuid,
    pub submitted_at: SystemTime,
}

/// Outstanding permission for a team to replace its answers for a round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ResubmitPermissionEntity {
    pub team_id: Uuid,
    pub round_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(points: f64, bonus: f64, penalty: f64) -> AnswerEntity {
        AnswerEntity {
            id: Uuid::new_v4(),
            team_id: Uuid::new_v4(),
            round_id: Uuid::new_v4(),
            question_id: "q1".into(),
            raw_text: "x".into(),
            points,
            bonus,
            penalty,
            notes: String::new(),
            submitted_at: SystemTime::now(),
        }
    }

    #[test]
    fn total_combines_adjustments() {
        assert_eq!(answer(1.0, 0.0, 0.0).total(), 1.0);
        assert_eq!(answer(1.0, 2.0, 0.5).total(), 2.5);
        assert_eq!(answer(0.0, -1.0, -3.0).total(), 2.0);
        assert_eq!(answer(-2.0, 0.0, 1.0).total(), -3.0);
    }

    #[test]
    fn patch_only_touches_supplied_fields() {
        let mut target = answer(1.0, 1.0, 1.0);
        AnswerPatch {
            bonus: Some(3.0),
            notes: Some("nice".into()),
            ..AnswerPatch::default()
        }
        .apply_to(&mut target);
        assert_eq!(target.points, 1.0);
        assert_eq!(target.bonus, 3.0);
        assert_eq!(target.penalty, 1.0);
        assert_eq!(target.notes, "nice");
    }

    #[test]
    fn round_status_serializes_with_state_tag() {
        let status = RoundStatusEntity::Open { timer: None };
        let json = serde_json::to_value(status).expect("serialize");
        assert_eq!(json, serde_json::json!({"state": "open", "timer": null}));
    }
}
