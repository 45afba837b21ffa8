//! Management of games, teams and rounds.

use std::time::SystemTime;

use rand::{Rng, rng};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        game_store::{
            CreateGameOutcome, CreateTeamOutcome, RenameTeamOutcome, ReplaceQuestionsOutcome,
        },
        models::{GameEntity, QuestionEntity, RoundEntity, RoundStatusEntity, TeamEntity},
    },
    dto::{
        game::{GameSummary, JoinResponse, TeamSummary},
        round::RoundSummary,
    },
    error::ServiceError,
    evaluation::{Formula, TextPattern},
    state::{
        SharedState,
        game::{AuthenticatedTeam, QuestionKind, QuestionSpec},
    },
};

/// Characters of generated join codes. Look-alikes (0/O, 1/I/L) are left out.
pub const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const JOIN_CODE_ATTEMPTS: usize = 16;

/// Random join code of `length` characters.
pub fn generate_join_code(length: usize) -> String {
    let mut rng = rng();
    (0..length)
        .map(|_| JOIN_CODE_ALPHABET[rng.random_range(0..JOIN_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Create a game with a fresh join code.
pub async fn create_game(state: &SharedState, name: &str) -> Result<GameSummary, ServiceError> {
    let store = state.store();
    let length = state.config().join_code_length();

    for attempt in 1..=JOIN_CODE_ATTEMPTS {
        let game = GameEntity {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            join_code: generate_join_code(length),
            active: true,
            created_at: SystemTime::now(),
        };
        match store.create_game(game.clone()).await? {
            CreateGameOutcome::Created => {
                info!(game_id = %game.id, join_code = %game.join_code, "game created");
                return Ok(game.into());
            }
            CreateGameOutcome::JoinCodeTaken => {
                debug!(attempt, "join code collision; drawing another");
            }
        }
    }

    Err(ServiceError::Conflict(
        "could not allocate a free join code".into(),
    ))
}

/// All games, oldest first.
pub async fn list_games(state: &SharedState) -> Result<Vec<GameSummary>, ServiceError> {
    let mut games = state.store().list_games().await?;
    games.sort_by_key(|game| game.created_at);
    Ok(games.into_iter().map(Into::into).collect())
}

/// One game.
pub async fn get_game(state: &SharedState, id: Uuid) -> Result<GameSummary, ServiceError> {
    Ok(find_game(state, id).await?.into())
}

/// Open or close a game to new teams. Existing teams stay.
pub async fn set_active(
    state: &SharedState,
    id: Uuid,
    active: bool,
) -> Result<GameSummary, ServiceError> {
    if !state.store().set_game_active(id, active).await? {
        return Err(game_not_found());
    }
    info!(game_id = %id, active, "game activity changed");
    get_game(state, id).await
}

/// Delete a game with everything it owns. Pending countdowns are cancelled
/// and subscribers of its topics see their streams end.
pub async fn delete_game(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let Some(rounds) = state.store().delete_game(id).await? else {
        return Err(game_not_found());
    };
    for round in &rounds {
        state.timers().forget(round.id);
    }
    state.fabric().close_game(id);
    info!(game_id = %id, rounds = rounds.len(), "game deleted");
    Ok(())
}

/// Rename a game. Its join code stays.
pub async fn rename_game(
    state: &SharedState,
    id: Uuid,
    name: &str,
) -> Result<GameSummary, ServiceError> {
    let name = non_blank_name(name)?;
    let game = state
        .store()
        .rename_game(id, name)
        .await?
        .ok_or_else(game_not_found)?;
    info!(game_id = %id, name = %game.name, "game renamed");
    Ok(game.into())
}

/// Register a team in the game identified by `join_code`.
pub async fn join(
    state: &SharedState,
    join_code: &str,
    team_name: &str,
) -> Result<JoinResponse, ServiceError> {
    let name = team_name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("team name must not be blank".into()));
    }

    let store = state.store();
    let code = join_code.trim().to_uppercase();
    let Some(game) = store.find_game_by_code(code).await? else {
        return Err(ServiceError::NotFound("no game uses this join code".into()));
    };
    if !game.active {
        return Err(ServiceError::InvalidState(
            "game is not accepting new teams".into(),
        ));
    }

    let team = TeamEntity {
        id: Uuid::new_v4(),
        game_id: game.id,
        name: name.to_string(),
        token: Uuid::new_v4(),
        created_at: SystemTime::now(),
        seq: 0,
    };
    match store.create_team(team).await? {
        CreateTeamOutcome::Created(team) => {
            info!(game_id = %game.id, team_id = %team.id, name = %team.name, "team joined");
            Ok(team.into())
        }
        CreateTeamOutcome::NameTaken => Err(ServiceError::Conflict(format!(
            "team name `{name}` is already taken"
        ))),
        CreateTeamOutcome::GameNotFound => Err(game_not_found()),
    }
}

/// Teams of a game in join order.
pub async fn list_teams(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Vec<TeamSummary>, ServiceError> {
    find_game(state, game_id).await?;
    let teams = state.store().list_teams(game_id).await?;
    Ok(teams.into_iter().map(Into::into).collect())
}

/// Remove a team with its answers.
pub async fn delete_team(state: &SharedState, team_id: Uuid) -> Result<(), ServiceError> {
    if !state.store().delete_team(team_id).await? {
        return Err(ServiceError::NotFound("team not found".into()));
    }
    info!(team_id = %team_id, "team deleted");
    Ok(())
}

/// Rename a team. Names stay unique within the game.
pub async fn rename_team(
    state: &SharedState,
    team_id: Uuid,
    name: &str,
) -> Result<TeamSummary, ServiceError> {
    let name = non_blank_name(name)?;
    match state.store().rename_team(team_id, name).await? {
        RenameTeamOutcome::Renamed(team) => {
            info!(team_id = %team_id, name = %team.name, "team renamed");
            Ok(team.into())
        }
        RenameTeamOutcome::NameTaken => Err(ServiceError::Conflict(
            "team name is already taken".into(),
        )),
        RenameTeamOutcome::TeamNotFound => Err(ServiceError::NotFound("team not found".into())),
    }
}

/// Resolve a player credential into the identity of its team.
pub async fn resolve_team(
    state: &SharedState,
    token: Uuid,
) -> Result<AuthenticatedTeam, ServiceError> {
    state
        .store()
        .find_team_by_token(token)
        .await?
        .map(|team| AuthenticatedTeam::from(&team))
        .ok_or_else(|| ServiceError::Unauthorized("unknown team token".into()))
}

/// Add a closed round at the end of the game.
pub async fn create_round(
    state: &SharedState,
    game_id: Uuid,
    name: &str,
    questions: Vec<QuestionSpec>,
) -> Result<RoundSummary, ServiceError> {
    let store = state.store();
    find_game(state, game_id).await?;
    warn_about_fallbacks(&questions);

    let position = store
        .list_rounds(game_id)
        .await?
        .iter()
        .map(|round| round.position + 1)
        .max()
        .unwrap_or(0);
    let round = RoundEntity {
        id: Uuid::new_v4(),
        game_id,
        name: name.trim().to_string(),
        position,
        status: RoundStatusEntity::Closed,
        questions: questions.into_iter().map(QuestionEntity::from).collect(),
    };
    if !store.create_round(round.clone()).await? {
        return Err(game_not_found());
    }
    info!(game_id = %game_id, round_id = %round.id, position, "round created");
    Ok(round.into())
}

/// Rounds of a game in display order.
pub async fn list_rounds(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Vec<RoundSummary>, ServiceError> {
    find_game(state, game_id).await?;
    let rounds = state.store().list_rounds(game_id).await?;
    Ok(rounds.into_iter().map(Into::into).collect())
}

/// Replace the questions of a round. Question ids already answered by a team
/// must survive the replacement.
pub async fn replace_questions(
    state: &SharedState,
    round_id: Uuid,
    questions: Vec<QuestionSpec>,
) -> Result<RoundSummary, ServiceError> {
    warn_about_fallbacks(&questions);
    let questions = questions.into_iter().map(QuestionEntity::from).collect();
    match state.store().replace_questions(round_id, questions).await? {
        ReplaceQuestionsOutcome::Replaced(round) => {
            info!(round_id = %round_id, questions = round.questions.len(), "questions replaced");
            Ok(round.into())
        }
        ReplaceQuestionsOutcome::RoundNotFound => Err(round_not_found()),
        ReplaceQuestionsOutcome::ReferencedQuestionRemoved(question_id) => {
            Err(ServiceError::InvalidState(format!(
                "question `{question_id}` already has answers and cannot be removed"
            )))
        }
    }
}

/// Rename a round. Its status and questions stay.
pub async fn rename_round(
    state: &SharedState,
    round_id: Uuid,
    name: &str,
) -> Result<RoundSummary, ServiceError> {
    let name = non_blank_name(name)?;
    let round = state
        .store()
        .rename_round(round_id, name)
        .await?
        .ok_or_else(round_not_found)?;
    info!(round_id = %round_id, name = %round.name, "round renamed");
    Ok(round.into())
}

/// Reorder the rounds of a game. `order` must list every round exactly once.
pub async fn reorder_rounds(
    state: &SharedState,
    game_id: Uuid,
    order: Vec<Uuid>,
) -> Result<Vec<RoundSummary>, ServiceError> {
    find_game(state, game_id).await?;
    if !state.store().reorder_rounds(game_id, order).await? {
        return Err(ServiceError::InvalidInput(
            "order must list every round of the game exactly once".into(),
        ));
    }
    list_rounds(state, game_id).await
}

/// Delete a round with its answers, cancelling its countdown.
pub async fn delete_round(state: &SharedState, round_id: Uuid) -> Result<(), ServiceError> {
    let Some(round) = state.store().delete_round(round_id).await? else {
        return Err(round_not_found());
    };
    state.timers().forget(round.id);
    info!(game_id = %round.game_id, round_id = %round_id, "round deleted");
    Ok(())
}

/// Log scoring rules that will degrade at evaluation time. They are accepted
/// anyway: a broken rule scores 0 or falls back to literal matching.
fn warn_about_fallbacks(questions: &[QuestionSpec]) {
    for question in questions {
        match &question.kind {
            QuestionKind::Number { validation, .. } if !validation.trim().is_empty() => {
                if let Err(err) = validation.parse::<Formula>() {
                    warn!(
                        question_id = %question.id,
                        error = %err,
                        "formula does not parse; it will score 0"
                    );
                }
            }
            QuestionKind::Text { validation } => {
                let fallbacks = TextPattern::parse(validation).literal_fallbacks();
                if fallbacks > 0 {
                    warn!(
                        question_id = %question.id,
                        fallbacks,
                        "patterns do not compile; they will match literally"
                    );
                }
            }
            _ => {}
        }
    }
}

fn non_blank_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("name must not be blank".into()));
    }
    Ok(name.to_string())
}

async fn find_game(state: &SharedState, id: Uuid) -> Result<GameEntity, ServiceError> {
    state
        .store()
        .find_game(id)
        .await?
        .ok_or_else(game_not_found)
}

fn game_not_found() -> ServiceError {
    ServiceError::NotFound("game not found".into())
}

fn round_not_found() -> ServiceError {
    ServiceError::NotFound("round not found".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, time::Duration};

    use crate::{
        config::AppConfig,
        dao::game_store::memory::MemoryQuizStore,
        services::round_service,
        state::{AppState, Topic},
    };

    fn state() -> SharedState {
        AppState::new(
            AppConfig::with_organizer_token("secret"),
            Arc::new(MemoryQuizStore::new()),
        )
    }

    fn text_question(id: &str) -> QuestionSpec {
        QuestionSpec {
            id: id.into(),
            text: "?".into(),
            points: 1.0,
            kind: QuestionKind::Text {
                validation: "yes".into(),
            },
        }
    }

    #[test]
    fn join_codes_use_the_alphabet() {
        let code = generate_join_code(8);
        assert_eq!(code.len(), 8);
        assert!(code.bytes().all(|byte| JOIN_CODE_ALPHABET.contains(&byte)));
    }

    #[tokio::test]
    async fn join_is_case_insensitive_and_names_are_unique() {
        let state = state();
        let game = create_game(&state, " Friday quiz ").await.unwrap();
        assert_eq!(game.name, "Friday quiz");

        let joined = join(&state, &game.join_code.to_lowercase(), "  Owls ")
            .await
            .unwrap();
        assert_eq!(joined.team_name, "Owls");
        assert_eq!(joined.game_id, game.id);

        let err = join(&state, &game.join_code, "Owls").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let team = resolve_team(&state, joined.token).await.unwrap();
        assert_eq!(team.team_id, joined.team_id);
        assert!(matches!(
            resolve_team(&state, Uuid::new_v4()).await.unwrap_err(),
            ServiceError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn inactive_games_refuse_joins_but_keep_teams() {
        let state = state();
        let game = create_game(&state, "Quiz").await.unwrap();
        join(&state, &game.join_code, "Owls").await.unwrap();

        set_active(&state, game.id, false).await.unwrap();
        let err = join(&state, &game.join_code, "Bats").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert_eq!(list_teams(&state, game.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn renames_trim_and_keep_team_names_unique() {
        let state = state();
        let game = create_game(&state, "Quiz").await.unwrap();
        let owls = join(&state, &game.join_code, "Owls").await.unwrap();
        let bats = join(&state, &game.join_code, "Bats").await.unwrap();

        let err = rename_team(&state, bats.team_id, " Owls ").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        let renamed = rename_team(&state, bats.team_id, " Foxes ").await.unwrap();
        assert_eq!(renamed.name, "Foxes");
        let err = rename_team(&state, owls.team_id, "   ").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let game = rename_game(&state, game.id, " Finals ").await.unwrap();
        assert_eq!(game.name, "Finals");
        let round = create_round(&state, game.id, "One", Vec::new()).await.unwrap();
        let round = rename_round(&state, round.id, "Warm-up").await.unwrap();
        assert_eq!(round.name, "Warm-up");
        assert!(matches!(
            rename_round(&state, Uuid::new_v4(), "Lost").await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn rounds_are_appended_and_reordered() {
        let state = state();
        let game = create_game(&state, "Quiz").await.unwrap();
        let first = create_round(&state, game.id, "One", vec![text_question("q1")])
            .await
            .unwrap();
        let second = create_round(&state, game.id, "Two", Vec::new()).await.unwrap();
        assert_eq!((first.position, second.position), (0, 1));

        let rounds = reorder_rounds(&state, game.id, vec![second.id, first.id])
            .await
            .unwrap();
        let names: Vec<&str> = rounds.iter().map(|round| round.name.as_str()).collect();
        assert_eq!(names, vec!["Two", "One"]);

        let err = reorder_rounds(&state, game.id, vec![first.id])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn deleting_a_game_cancels_timers_and_closes_topics() {
        let state = state();
        let game = create_game(&state, "Quiz").await.unwrap();
        let round = create_round(&state, game.id, "One", Vec::new()).await.unwrap();
        round_service::open(&state, round.id, Some(30)).await.unwrap();
        let mut sub = state.fabric().join(Topic::Game(game.id));

        delete_game(&state, game.id).await.unwrap();
        assert!(state.timers().is_empty());

        tokio::time::sleep(Duration::from_secs(40)).await;
        assert!(sub.receiver.recv().await.is_none());
        assert!(matches!(
            get_game(&state, game.id).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }
}
