pub mod memory;

use crate::dao::models::{
    AnswerEntity, AnswerPatch, GameEntity, QuestionEntity, ResubmitPermissionEntity, RoundEntity,
    RoundStatusEntity, SubmissionEntity, TeamEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Result of inserting a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateGameOutcome {
    Created,
    JoinCodeTaken,
}

/// Result of inserting a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateTeamOutcome {
    /// Stored team, with its creation sequence assigned.
    Created(TeamEntity),
    NameTaken,
    GameNotFound,
}

/// Result of renaming a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameTeamOutcome {
    Renamed(TeamEntity),
    /// Another team of the same game already uses the name.
    NameTaken,
    TeamNotFound,
}

/// Result of replacing the questions of a round.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplaceQuestionsOutcome {
    Replaced(RoundEntity),
    RoundNotFound,
    /// An answer references a question id missing from the new list.
    ReferencedQuestionRemoved(String),
}

/// Result of a compare-and-set on a round status.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusSwap {
    /// The status matched and was replaced; carries the updated round.
    Swapped(RoundEntity),
    /// Another writer got there first; carries the status actually stored.
    Mismatch(RoundStatusEntity),
    RoundNotFound,
}

/// Result of recording a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertSubmissionOutcome {
    /// Answers stored. `replaced` is set when a resubmit permission was consumed.
    Inserted { replaced: bool },
    RoundNotFound,
    RoundClosed,
    /// The team is gone or plays another game.
    TeamNotInGame,
    /// The answers do not cover the round's current questions, in order.
    QuestionsChanged,
    AlreadySubmitted,
}

/// Abstraction over the persistence layer for competitions.
///
/// Every method is one atomic check-and-write: implementations must never let
/// two concurrent callers both win a mutually exclusive operation.
pub trait QuizStore: Send + Sync {
    fn create_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<CreateGameOutcome>>;
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    fn find_game_by_code(
        &self,
        join_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// Returns `false` when the game does not exist.
    fn set_game_active(&self, id: Uuid, active: bool) -> BoxFuture<'static, StorageResult<bool>>;
    /// Deletes the game with its rounds, teams, answers and permissions.
    /// Returns the deleted rounds so callers can release their timers.
    fn delete_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<Vec<RoundEntity>>>>;
    fn rename_game(
        &self,
        id: Uuid,
        name: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;

    /// Returns `false` when the owning game does not exist.
    fn create_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<bool>>;
    fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    /// Rounds of a game sorted by position.
    fn list_rounds(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>>;
    fn replace_questions(
        &self,
        round_id: Uuid,
        questions: Vec<QuestionEntity>,
    ) -> BoxFuture<'static, StorageResult<ReplaceQuestionsOutcome>>;
    /// Assigns positions following `order`. Returns `false` unless `order` is
    /// exactly the set of the game's round ids.
    fn reorder_rounds(
        &self,
        game_id: Uuid,
        order: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    fn delete_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    fn rename_round(
        &self,
        id: Uuid,
        name: String,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    /// Replace the status of a round only if it still equals `expected`.
    fn compare_and_set_round_status(
        &self,
        round_id: Uuid,
        expected: RoundStatusEntity,
        next: RoundStatusEntity,
    ) -> BoxFuture<'static, StorageResult<StatusSwap>>;
    /// Every round, across games, whose status carries a pending timer.
    fn list_rounds_with_timer(&self) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>>;

    fn create_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<CreateTeamOutcome>>;
    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    fn find_team_by_token(
        &self,
        token: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    /// Teams of a game in creation order.
    fn list_teams(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>>;
    /// Deletes the team with its answers. Returns `false` if it did not exist.
    fn delete_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Team names stay unique per game, as on creation.
    fn rename_team(
        &self,
        id: Uuid,
        name: String,
    ) -> BoxFuture<'static, StorageResult<RenameTeamOutcome>>;

    /// Record a whole submission: the round must exist and be open, and the
    /// team must not have submitted yet unless it holds a resubmit permission,
    /// which is consumed and replaces the previous answers.
    fn insert_submission(
        &self,
        team_id: Uuid,
        round_id: Uuid,
        answers: Vec<AnswerEntity>,
    ) -> BoxFuture<'static, StorageResult<InsertSubmissionOutcome>>;
    fn list_submissions(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>>;
    fn grant_resubmit(
        &self,
        permission: ResubmitPermissionEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn list_resubmit_permissions(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ResubmitPermissionEntity>>>;

    fn find_answer(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<AnswerEntity>>>;
    /// Answers of every round of a game.
    fn list_answers_for_game(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>>;
    fn list_answers_for_team_round(
        &self,
        team_id: Uuid,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>>;
    /// Atomically apply `patch`; returns the updated answer.
    fn update_answer(
        &self,
        id: Uuid,
        patch: AnswerPatch,
    ) -> BoxFuture<'static, StorageResult<Option<AnswerEntity>>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
