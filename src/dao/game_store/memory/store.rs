use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::SystemTime,
};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::{MemoryResult, MemoryStoreError};
use crate::dao::{
    game_store::{
        CreateGameOutcome, CreateTeamOutcome, InsertSubmissionOutcome, QuizStore,
        RenameTeamOutcome, ReplaceQuestionsOutcome, StatusSwap,
    },
    models::{
        AnswerEntity, AnswerPatch, GameEntity, QuestionEntity, ResubmitPermissionEntity,
        RoundEntity, RoundStatusEntity, SubmissionEntity, TeamEntity,
    },
    storage::StorageResult,
};

/// Process-local [`QuizStore`] guarded by a single lock, so every operation is
/// one atomic check-and-write.
#[derive(Clone, Default)]
pub struct MemoryQuizStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    tables: RwLock<Tables>,
    offline: AtomicBool,
}

#[derive(Default)]
struct Tables {
    games: IndexMap<Uuid, GameEntity>,
    rounds: IndexMap<Uuid, RoundEntity>,
    teams: IndexMap<Uuid, TeamEntity>,
    answers: IndexMap<Uuid, AnswerEntity>,
    submissions: HashMap<(Uuid, Uuid), SubmissionEntity>,
    permissions: HashSet<(Uuid, Uuid)>,
    next_team_seq: u64,
}

impl Tables {
    fn remove_round_rows(&mut self, round_id: Uuid) {
        self.answers.retain(|_, answer| answer.round_id != round_id);
        self.submissions.retain(|(_, round), _| *round != round_id);
        self.permissions.retain(|(_, round)| *round != round_id);
    }

    fn remove_team_rows(&mut self, team_id: Uuid) {
        self.answers.retain(|_, answer| answer.team_id != team_id);
        self.submissions.retain(|(team, _), _| *team != team_id);
        self.permissions.retain(|(team, _)| *team != team_id);
    }
}

impl MemoryQuizStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated unavailability. While offline every call fails.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> MemoryResult<()> {
        if self.inner.offline.load(Ordering::SeqCst) {
            Err(MemoryStoreError::Offline)
        } else {
            Ok(())
        }
    }

    async fn create_game(&self, game: GameEntity) -> MemoryResult<CreateGameOutcome> {
        self.ensure_online()?;
        let mut tables = self.inner.tables.write().await;
        if tables
            .games
            .values()
            .any(|existing| existing.join_code == game.join_code)
        {
            return Ok(CreateGameOutcome::JoinCodeTaken);
        }
        tables.games.insert(game.id, game);
        Ok(CreateGameOutcome::Created)
    }

    async fn find_game(&self, id: Uuid) -> MemoryResult<Option<GameEntity>> {
        self.ensure_online()?;
        let tables = self.inner.tables.read().await;
        Ok(tables.games.get(&id).cloned())
    }

    async fn find_game_by_code(&self, join_code: String) -> MemoryResult<Option<GameEntity>> {
        self.ensure_online()?;
        let tables = self.inner.tables.read().await;
        Ok(tables
            .games
            .values()
            .find(|game| game.join_code == join_code)
            .cloned())
    }

    async fn list_games(&self) -> MemoryResult<Vec<GameEntity>> {
        self.ensure_online()?;
        let tables = self.inner.tables.read().await;
        Ok(tables.games.values().cloned().collect())
    }

    async fn set_game_active(&self, id: Uuid, active: bool) -> MemoryResult<bool> {
        self.ensure_online()?;
        let mut tables = self.inner.tables.write().await;
        let Some(game) = tables.games.get_mut(&id) else {
            return Ok(false);
        };
        game.active = active;
        Ok(true)
    }

    async fn delete_game(&self, id: Uuid) -> MemoryResult<Option<Vec<RoundEntity>>> {
        self.ensure_online()?;
        let mut tables = self.inner.tables.write().await;
        if tables.games.shift_remove(&id).is_none() {
            return Ok(None);
        }

        let round_ids: Vec<Uuid> = tables
            .rounds
            .values()
            .filter(|round| round.game_id == id)
            .map(|round| round.id)
            .collect();
        let team_ids: Vec<Uuid> = tables
            .teams
            .values()
            .filter(|team| team.game_id == id)
            .map(|team| team.id)
            .collect();

        let mut removed = Vec::with_capacity(round_ids.len());
        for round_id in round_ids {
            tables.remove_round_rows(round_id);
            if let Some(round) = tables.rounds.shift_remove(&round_id) {
                removed.push(round);
            }
        }
        for team_id in team_ids {
            tables.remove_team_rows(team_id);
            tables.teams.shift_remove(&team_id);
        }
        Ok(Some(removed))
    }

    async fn create_round(&self, round: RoundEntity) -> MemoryResult<bool> {
        self.ensure_online()?;
        let mut tables = self.inner.tables.write().await;
        if !tables.games.contains_key(&round.game_id) {
            return Ok(false);
        }
        tables.rounds.insert(round.id, round);
        Ok(true)
    }

    async fn find_round(&self, id: Uuid) -> MemoryResult<Option<RoundEntity>> {
        self.ensure_online()?;
        let tables = self.inner.tables.read().await;
        Ok(tables.rounds.get(&id).cloned())
    }

    async fn list_rounds(&self, game_id: Uuid) -> MemoryResult<Vec<RoundEntity>> {
        self.ensure_online()?;
        let tables = self.inner.tables.read().await;
        let mut rounds: Vec<RoundEntity> = tables
            .rounds
            .values()
            .filter(|round| round.game_id == game_id)
            .cloned()
            .collect();
        rounds.sort_by_key(|round| round.position);
        Ok(rounds)
    }

    async fn replace_questions(
        &self,
        round_id: Uuid,
        questions: Vec<QuestionEntity>,
    ) -> MemoryResult<ReplaceQuestionsOutcome> {
        self.ensure_online()?;
        let mut tables = self.inner.tables.write().await;
        if !tables.rounds.contains_key(&round_id) {
            return Ok(ReplaceQuestionsOutcome::RoundNotFound);
        }

        let kept: HashSet<&str> = questions.iter().map(|q| q.id.as_str()).collect();
        let removed_reference = tables
            .answers
            .values()
            .filter(|answer| answer.round_id == round_id)
            .find(|answer| !kept.contains(answer.question_id.as_str()))
            .map(|answer| answer.question_id.clone());
        if let Some(question_id) = removed_reference {
            return Ok(ReplaceQuestionsOutcome::ReferencedQuestionRemoved(question_id));
        }

        let Some(round) = tables.rounds.get_mut(&round_id) else {
            return Ok(ReplaceQuestionsOutcome::RoundNotFound);
        };
        round.questions = questions;
        Ok(ReplaceQuestionsOutcome::Replaced(round.clone()))
    }

    async fn reorder_rounds(&self, game_id: Uuid, order: Vec<Uuid>) -> MemoryResult<bool> {
        self.ensure_online()?;
        let mut tables = self.inner.tables.write().await;
        let current: HashSet<Uuid> = tables
            .rounds
            .values()
            .filter(|round| round.game_id == game_id)
            .map(|round| round.id)
            .collect();
        let requested: HashSet<Uuid> = order.iter().copied().collect();
        if requested.len() != order.len() || requested != current {
            return Ok(false);
        }

        for (position, round_id) in order.into_iter().enumerate() {
            if let Some(round) = tables.rounds.get_mut(&round_id) {
                round.position = position as u32;
            }
        }
        Ok(true)
    }

    async fn delete_round(&self, id: Uuid) -> MemoryResult<Option<RoundEntity>> {
        self.ensure_online()?;
        let mut tables = self.inner.tables.write().await;
        let removed = tables.rounds.shift_remove(&id);
        if removed.is_some() {
            tables.remove_round_rows(id);
        }
        Ok(removed)
    }

    async fn compare_and_set_round_status(
        &self,
        round_id: Uuid,
        expected: RoundStatusEntity,
        next: RoundStatusEntity,
    ) -> MemoryResult<StatusSwap> {
        self.ensure_online()?;
        let mut tables = self.inner.tables.write().await;
        let Some(round) = tables.rounds.get_mut(&round_id) else {
            return Ok(StatusSwap::RoundNotFound);
        };
        if round.status != expected {
            return Ok(StatusSwap::Mismatch(round.status));
        }
        round.status = next;
        Ok(StatusSwap::Swapped(round.clone()))
    }

    async fn list_rounds_with_timer(&self) -> MemoryResult<Vec<RoundEntity>> {
        self.ensure_online()?;
        let tables = self.inner.tables.read().await;
        Ok(tables
            .rounds
            .values()
            .filter(|round| matches!(round.status, RoundStatusEntity::Open { timer: Some(_) }))
            .cloned()
            .collect())
    }

    async fn create_team(&self, mut team: TeamEntity) -> MemoryResult<CreateTeamOutcome> {
        self.ensure_online()?;
        let mut tables = self.inner.tables.write().await;
        if !tables.games.contains_key(&team.game_id) {
            return Ok(CreateTeamOutcome::GameNotFound);
        }
        if tables
            .teams
            .values()
            .any(|existing| existing.game_id == team.game_id && existing.name == team.name)
        {
            return Ok(CreateTeamOutcome::NameTaken);
        }

        team.seq = tables.next_team_seq;
        tables.next_team_seq += 1;
        tables.teams.insert(team.id, team.clone());
        Ok(CreateTeamOutcome::Created(team))
    }

    async fn find_team(&self, id: Uuid) -> MemoryResult<Option<TeamEntity>> {
        self.ensure_online()?;
        let tables = self.inner.tables.read().await;
        Ok(tables.teams.get(&id).cloned())
    }

    async fn find_team_by_token(&self, token: Uuid) -> MemoryResult<Option<TeamEntity>> {
        self.ensure_online()?;
        let tables = self.inner.tables.read().await;
        Ok(tables.teams.values().find(|team| team.token == token).cloned())
    }

    async fn list_teams(&self, game_id: Uuid) -> MemoryResult<Vec<TeamEntity>> {
        self.ensure_online()?;
        let tables = self.inner.tables.read().await;
        let mut teams: Vec<TeamEntity> = tables
            .teams
            .values()
            .filter(|team| team.game_id == game_id)
            .cloned()
            .collect();
        teams.sort_by_key(|team| team.seq);
        Ok(teams)
    }

    async fn delete_team(&self, id: Uuid) -> MemoryResult<bool> {
        self.ensure_online()?;
        let mut tables = self.inner.tables.write().await;
        if tables.teams.shift_remove(&id).is_none() {
            return Ok(false);
        }
        tables.remove_team_rows(id);
        Ok(true)
    }

    async fn insert_submission(
        &self,
        team_id: Uuid,
        round_id: Uuid,
        answers: Vec<AnswerEntity>,
    ) -> MemoryResult<InsertSubmissionOutcome> {
        self.ensure_online()?;
        let mut tables = self.inner.tables.write().await;
        let Some(round) = tables.rounds.get(&round_id) else {
            return Ok(InsertSubmissionOutcome::RoundNotFound);
        };
        if !matches!(round.status, RoundStatusEntity::Open { .. }) {
            return Ok(InsertSubmissionOutcome::RoundClosed);
        }
        if tables
            .teams
            .get(&team_id)
            .is_none_or(|team| team.game_id != round.game_id)
        {
            return Ok(InsertSubmissionOutcome::TeamNotInGame);
        }
        let covers_round = answers.len() == round.questions.len()
            && answers
                .iter()
                .zip(&round.questions)
                .all(|(answer, question)| answer.question_id == question.id);
        if !covers_round {
            return Ok(InsertSubmissionOutcome::QuestionsChanged);
        }

        let key = (team_id, round_id);
        let already_submitted = tables.submissions.contains_key(&key)
            || tables
                .answers
                .values()
                .any(|answer| answer.team_id == team_id && answer.round_id == round_id);
        let replaced = if already_submitted {
            if !tables.permissions.remove(&key) {
                return Ok(InsertSubmissionOutcome::AlreadySubmitted);
            }
            tables
                .answers
                .retain(|_, answer| !(answer.team_id == team_id && answer.round_id == round_id));
            true
        } else {
            tables.permissions.remove(&key);
            false
        };

        tables.submissions.insert(
            key,
            SubmissionEntity {
                team_id,
                round_id,
                submitted_at: SystemTime::now(),
            },
        );
        for answer in answers {
            tables.answers.insert(answer.id, answer);
        }
        Ok(InsertSubmissionOutcome::Inserted { replaced })
    }

    async fn list_submissions(&self, round_id: Uuid) -> MemoryResult<Vec<SubmissionEntity>> {
        self.ensure_online()?;
        let tables = self.inner.tables.read().await;
        Ok(tables
            .submissions
            .values()
            .filter(|submission| submission.round_id == round_id)
            .copied()
            .collect())
    }

    async fn grant_resubmit(&self, permission: ResubmitPermissionEntity) -> MemoryResult<()> {
        self.ensure_online()?;
        let mut tables = self.inner.tables.write().await;
        tables
            .permissions
            .insert((permission.team_id, permission.round_id));
        Ok(())
    }

    async fn list_resubmit_permissions(
        &self,
        round_id: Uuid,
    ) -> MemoryResult<Vec<ResubmitPermissionEntity>> {
        self.ensure_online()?;
        let tables = self.inner.tables.read().await;
        Ok(tables
            .permissions
            .iter()
            .filter(|(_, round)| *round == round_id)
            .map(|&(team_id, round_id)| ResubmitPermissionEntity { team_id, round_id })
            .collect())
    }

    async fn find_answer(&self, id: Uuid) -> MemoryResult<Option<AnswerEntity>> {
        self.ensure_online()?;
        let tables = self.inner.tables.read().await;
        Ok(tables.answers.get(&id).cloned())
    }

    async fn list_answers_for_game(&self, game_id: Uuid) -> MemoryResult<Vec<AnswerEntity>> {
        self.ensure_online()?;
        let tables = self.inner.tables.read().await;
        Ok(tables
            .answers
            .values()
            .filter(|answer| {
                tables
                    .rounds
                    .get(&answer.round_id)
                    .is_some_and(|round| round.game_id == game_id)
            })
            .cloned()
            .collect())
    }

    async fn list_answers_for_team_round(
        &self,
        team_id: Uuid,
        round_id: Uuid,
    ) -> MemoryResult<Vec<AnswerEntity>> {
        self.ensure_online()?;
        let tables = self.inner.tables.read().await;
        Ok(tables
            .answers
            .values()
            .filter(|answer| answer.team_id == team_id && answer.round_id == round_id)
            .cloned()
            .collect())
    }

    async fn update_answer(
        &self,
        id: Uuid,
        patch: AnswerPatch,
    ) -> MemoryResult<Option<AnswerEntity>> {
        self.ensure_online()?;
        let mut tables = self.inner.tables.write().await;
        let Some(answer) = tables.answers.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply_to(answer);
        Ok(Some(answer.clone()))
    }

    async fn rename_game(&self, id: Uuid, name: String) -> MemoryResult<Option<GameEntity>> {
        self.ensure_online()?;
        let mut tables = self.inner.tables.write().await;
        Ok(tables.games.get_mut(&id).map(|game| {
            game.name = name;
            game.clone()
        }))
    }

    async fn rename_round(&self, id: Uuid, name: String) -> MemoryResult<Option<RoundEntity>> {
        self.ensure_online()?;
        let mut tables = self.inner.tables.write().await;
        Ok(tables.rounds.get_mut(&id).map(|round| {
            round.name = name;
            round.clone()
        }))
    }

    async fn rename_team(&self, id: Uuid, name: String) -> MemoryResult<RenameTeamOutcome> {
        self.ensure_online()?;
        let mut tables = self.inner.tables.write().await;
        let Some(game_id) = tables.teams.get(&id).map(|team| team.game_id) else {
            return Ok(RenameTeamOutcome::TeamNotFound);
        };
        if tables
            .teams
            .values()
            .any(|other| other.id != id && other.game_id == game_id && other.name == name)
        {
            return Ok(RenameTeamOutcome::NameTaken);
        }
        let Some(team) = tables.teams.get_mut(&id) else {
            return Ok(RenameTeamOutcome::TeamNotFound);
        };
        team.name = name;
        Ok(RenameTeamOutcome::Renamed(team.clone()))
    }
}

impl QuizStore for MemoryQuizStore {
    fn create_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<CreateGameOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.create_game(game).await.map_err(Into::into) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await.map_err(Into::into) })
    }

    fn find_game_by_code(
        &self,
        join_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game_by_code(join_code).await.map_err(Into::into) })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_games().await.map_err(Into::into) })
    }

    fn set_game_active(&self, id: Uuid, active: bool) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.set_game_active(id, active).await.map_err(Into::into) })
    }

    fn delete_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<Vec<RoundEntity>>>> {
        let store = self.clone();
        Box::pin(async move { store.delete_game(id).await.map_err(Into::into) })
    }

    fn create_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.create_round(round).await.map_err(Into::into) })
    }

    fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_round(id).await.map_err(Into::into) })
    }

    fn list_rounds(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_rounds(game_id).await.map_err(Into::into) })
    }

    fn replace_questions(
        &self,
        round_id: Uuid,
        questions: Vec<QuestionEntity>,
    ) -> BoxFuture<'static, StorageResult<ReplaceQuestionsOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace_questions(round_id, questions)
                .await
                .map_err(Into::into)
        })
    }

    fn reorder_rounds(
        &self,
        game_id: Uuid,
        order: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.reorder_rounds(game_id, order).await.map_err(Into::into) })
    }

    fn delete_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.delete_round(id).await.map_err(Into::into) })
    }

    fn compare_and_set_round_status(
        &self,
        round_id: Uuid,
        expected: RoundStatusEntity,
        next: RoundStatusEntity,
    ) -> BoxFuture<'static, StorageResult<StatusSwap>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .compare_and_set_round_status(round_id, expected, next)
                .await
                .map_err(Into::into)
        })
    }

    fn list_rounds_with_timer(&self) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_rounds_with_timer().await.map_err(Into::into) })
    }

    fn create_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<CreateTeamOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.create_team(team).await.map_err(Into::into) })
    }

    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_team(id).await.map_err(Into::into) })
    }

    fn find_team_by_token(
        &self,
        token: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_team_by_token(token).await.map_err(Into::into) })
    }

    fn list_teams(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_teams(game_id).await.map_err(Into::into) })
    }

    fn delete_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_team(id).await.map_err(Into::into) })
    }

    fn insert_submission(
        &self,
        team_id: Uuid,
        round_id: Uuid,
        answers: Vec<AnswerEntity>,
    ) -> BoxFuture<'static, StorageResult<InsertSubmissionOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .insert_submission(team_id, round_id, answers)
                .await
                .map_err(Into::into)
        })
    }

    fn list_submissions(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_submissions(round_id).await.map_err(Into::into) })
    }

    fn grant_resubmit(
        &self,
        permission: ResubmitPermissionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.grant_resubmit(permission).await.map_err(Into::into) })
    }

    fn list_resubmit_permissions(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ResubmitPermissionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_resubmit_permissions(round_id)
                .await
                .map_err(Into::into)
        })
    }

    fn find_answer(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_answer(id).await.map_err(Into::into) })
    }

    fn list_answers_for_game(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_answers_for_game(game_id).await.map_err(Into::into) })
    }

    fn list_answers_for_team_round(
        &self,
        team_id: Uuid,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_answers_for_team_round(team_id, round_id)
                .await
                .map_err(Into::into)
        })
    }

    fn update_answer(
        &self,
        id: Uuid,
        patch: AnswerPatch,
    ) -> BoxFuture<'static, StorageResult<Option<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.update_answer(id, patch).await.map_err(Into::into) })
    }

    fn rename_game(
        &self,
        id: Uuid,
        name: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.rename_game(id, name).await.map_err(Into::into) })
    }

    fn rename_round(
        &self,
        id: Uuid,
        name: String,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.rename_round(id, name).await.map_err(Into::into) })
    }

    fn rename_team(
        &self,
        id: Uuid,
        name: String,
    ) -> BoxFuture<'static, StorageResult<RenameTeamOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.rename_team(id, name).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online().map_err(Into::into) })
    }
}
