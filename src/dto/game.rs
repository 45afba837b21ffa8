use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{GameEntity, TeamEntity},
    dto::{format_system_time, validation::validate_not_blank},
};

/// Payload used to create a competition.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    #[validate(custom(function = "validate_not_blank"), length(max = 120))]
    pub name: String,
}

/// New display name of a game, round or team.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RenameRequest {
    #[validate(custom(function = "validate_not_blank"), length(max = 120))]
    pub name: String,
}

/// Toggles whether a game accepts new teams.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// Summary of a competition.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub id: Uuid,
    pub name: String,
    pub join_code: String,
    pub active: bool,
    pub created_at: String,
}

impl From<GameEntity> for GameSummary {
    fn from(game: GameEntity) -> Self {
        Self {
            id: game.id,
            name: game.name,
            join_code: game.join_code,
            active: game.active,
            created_at: format_system_time(game.created_at),
        }
    }
}

/// Payload a team sends to enter a game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub join_code: String,
    #[validate(custom(function = "validate_not_blank"), length(max = 60))]
    pub team_name: String,
}

/// Credential issued on join; sent back as `x-team-token`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub team_id: Uuid,
    pub game_id: Uuid,
    pub team_name: String,
    pub token: Uuid,
}

impl From<TeamEntity> for JoinResponse {
    fn from(team: TeamEntity) -> Self {
        Self {
            team_id: team.id,
            game_id: team.game_id,
            team_name: team.name,
            token: team.token,
        }
    }
}

/// Organizer projection of a team. The credential is not exposed.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub id: Uuid,
    pub name: String,
    pub created_at: String,
}

impl From<TeamEntity> for TeamSummary {
    fn from(team: TeamEntity) -> Self {
        Self {
            id: team.id,
            name: team.name,
            created_at: format_system_time(team.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_request_requires_a_team_name() {
        let request = JoinRequest {
            join_code: "ABC234".into(),
            team_name: "   ".into(),
        };
        assert!(request.validate().is_err());

        let request = JoinRequest {
            join_code: "ABC234".into(),
            team_name: "Quizzy Rascals".into(),
        };
        assert!(request.validate().is_ok());
    }
}
