//! Admission control: at most one accepted submission per team and round.

use std::{collections::HashSet, time::SystemTime};

use indexmap::IndexMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        game_store::InsertSubmissionOutcome,
        models::{AnswerEntity, ResubmitPermissionEntity, RoundEntity},
    },
    dto::{
        round::{PlayerQuestion, PlayerRoundView},
        submission::{SubmissionResponse, SubmissionStatusEntry},
    },
    error::ServiceError,
    evaluation,
    services::events,
    state::{
        SharedState,
        game::{AuthenticatedTeam, QuestionSpec},
        round_machine::RoundStatus,
    },
};

/// Why a submission was refused. These are results, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    RoundNotFound,
    TeamNotInGame,
    RoundClosed,
    AlreadySubmitted,
}

impl RejectionReason {
    /// Wire tag of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::RoundNotFound => "round_not_found",
            RejectionReason::TeamNotInGame => "team_not_in_game",
            RejectionReason::RoundClosed => "round_closed",
            RejectionReason::AlreadySubmitted => "already_submitted",
        }
    }
}

/// Outcome of [`submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Every question of the round got an answer row.
    Accepted {
        /// A resubmit permission was consumed and earlier answers replaced.
        replaced: bool,
        answers: Vec<AnswerEntity>,
    },
    Rejected(RejectionReason),
}

impl SubmissionOutcome {
    /// Wire form of the outcome.
    pub fn to_response(&self, round_id: Uuid) -> SubmissionResponse {
        match self {
            SubmissionOutcome::Accepted { replaced, answers } => SubmissionResponse::Accepted {
                round_id,
                replaced: *replaced,
                answer_count: answers.len(),
            },
            SubmissionOutcome::Rejected(reason) => SubmissionResponse::Rejected {
                reason: reason.as_str().to_string(),
            },
        }
    }

    /// Whether the submission was stored.
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionOutcome::Accepted { .. })
    }
}

/// Submit `team`'s answers for a round.
///
/// Checks, in order: the round exists, it belongs to the team's game, it is
/// open, and the team has not submitted yet. The store re-checks all of them
/// in the same atomic write that records the answers, together with the
/// question set the answers were scored against; answers scored against
/// questions replaced in between are rescored and written again. Every
/// question of the round is scored; missing answers score as blank.
pub async fn submit(
    state: &SharedState,
    team: &AuthenticatedTeam,
    round_id: Uuid,
    raw_answers: IndexMap<String, String>,
) -> Result<SubmissionOutcome, ServiceError> {
    let store = state.store();
    let limit = state.config().cas_retry_limit();

    for attempt in 1..=limit {
        let Some(round) = store.find_round(round_id).await? else {
            return Ok(reject(team, round_id, RejectionReason::RoundNotFound));
        };
        if round.game_id != team.game_id {
            return Ok(reject(team, round_id, RejectionReason::TeamNotInGame));
        }
        if !RoundStatus::from(round.status).is_open() {
            return Ok(reject(team, round_id, RejectionReason::RoundClosed));
        }

        let answers = score_round(team, round, &raw_answers);
        let outcome = store
            .insert_submission(team.team_id, round_id, answers.clone())
            .await?;
        let replaced = match outcome {
            InsertSubmissionOutcome::Inserted { replaced } => replaced,
            InsertSubmissionOutcome::QuestionsChanged => {
                debug!(
                    team_id = %team.team_id,
                    round_id = %round_id,
                    attempt,
                    "round questions changed while scoring; rescoring"
                );
                continue;
            }
            InsertSubmissionOutcome::RoundNotFound => {
                return Ok(reject(team, round_id, RejectionReason::RoundNotFound));
            }
            InsertSubmissionOutcome::RoundClosed => {
                return Ok(reject(team, round_id, RejectionReason::RoundClosed));
            }
            InsertSubmissionOutcome::TeamNotInGame => {
                return Ok(reject(team, round_id, RejectionReason::TeamNotInGame));
            }
            InsertSubmissionOutcome::AlreadySubmitted => {
                return Ok(reject(team, round_id, RejectionReason::AlreadySubmitted));
            }
        };

        info!(
            team_id = %team.team_id,
            round_id = %round_id,
            answers = answers.len(),
            replaced,
            "submission accepted"
        );
        announce_submission_count(state, team.game_id, round_id).await;
        return Ok(SubmissionOutcome::Accepted { replaced, answers });
    }

    warn!(round_id = %round_id, "giving up on a round whose questions keep changing");
    Err(ServiceError::Conflict(
        "round questions are changing too quickly, retry".into(),
    ))
}

/// One answer row per question of `round`, in question order.
fn score_round(
    team: &AuthenticatedTeam,
    round: RoundEntity,
    raw_answers: &IndexMap<String, String>,
) -> Vec<AnswerEntity> {
    let submitted_at = SystemTime::now();
    let round_id = round.id;
    let answers: Vec<AnswerEntity> = round
        .questions
        .into_iter()
        .map(|question| {
            let raw_text = raw_answers.get(&question.id).cloned().unwrap_or_default();
            let spec = QuestionSpec::from(question);
            let points = evaluation::evaluate(&spec, &raw_text);
            AnswerEntity {
                id: Uuid::new_v4(),
                team_id: team.team_id,
                round_id,
                question_id: spec.id,
                raw_text,
                points,
                bonus: 0.0,
                penalty: 0.0,
                notes: String::new(),
                submitted_at,
            }
        })
        .collect();
    let ignored = raw_answers
        .keys()
        .filter(|question_id| !answers.iter().any(|answer| &answer.question_id == *question_id))
        .count();
    if ignored > 0 {
        debug!(
            team_id = %team.team_id,
            round_id = %round_id,
            ignored,
            "answers to unknown questions ignored"
        );
    }
    answers
}

fn reject(team: &AuthenticatedTeam, round_id: Uuid, reason: RejectionReason) -> SubmissionOutcome {
    info!(
        team_id = %team.team_id,
        round_id = %round_id,
        reason = reason.as_str(),
        "submission rejected"
    );
    SubmissionOutcome::Rejected(reason)
}

async fn announce_submission_count(state: &SharedState, game_id: Uuid, round_id: Uuid) {
    let store = state.store();
    let counts = async {
        let submitted = store.list_submissions(round_id).await?.len();
        let teams = store.list_teams(game_id).await?.len();
        Ok::<_, ServiceError>((submitted, teams))
    };
    match counts.await {
        Ok((submitted, teams)) => {
            events::broadcast_submission_count(state, game_id, round_id, submitted, teams)
        }
        Err(err) => warn!(round_id = %round_id, error = %err, "failed to count submissions"),
    }
}

/// Allow a team to submit a round once more. Its next submission replaces
/// the answers it already has for that round.
pub async fn grant_resubmit(
    state: &SharedState,
    round_id: Uuid,
    team_id: Uuid,
) -> Result<(), ServiceError> {
    let store = state.store();
    let round = store
        .find_round(round_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("round not found".into()))?;
    let team = store
        .find_team(team_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("team not found".into()))?;
    if team.game_id != round.game_id {
        return Err(ServiceError::InvalidInput(
            "team does not belong to the round's game".into(),
        ));
    }

    store
        .grant_resubmit(ResubmitPermissionEntity { team_id, round_id })
        .await?;
    info!(team_id = %team_id, round_id = %round_id, "resubmission granted");
    events::broadcast_submission_cleared(state, round.game_id, round_id, team_id);
    Ok(())
}

/// Submission state of every team of the round's game.
pub async fn submission_status(
    state: &SharedState,
    round_id: Uuid,
) -> Result<Vec<SubmissionStatusEntry>, ServiceError> {
    let store = state.store();
    let round = store
        .find_round(round_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("round not found".into()))?;

    let submitted: HashSet<Uuid> = store
        .list_submissions(round_id)
        .await?
        .into_iter()
        .map(|submission| submission.team_id)
        .collect();
    let permitted: HashSet<Uuid> = store
        .list_resubmit_permissions(round_id)
        .await?
        .into_iter()
        .map(|permission| permission.team_id)
        .collect();

    let entries = store
        .list_teams(round.game_id)
        .await?
        .into_iter()
        .map(|team| SubmissionStatusEntry {
            submitted: submitted.contains(&team.id),
            can_resubmit: permitted.contains(&team.id),
            team_id: team.id,
            team_name: team.name,
        })
        .collect();
    Ok(entries)
}

/// The rounds of the team's game, as that team sees them.
pub async fn player_rounds(
    state: &SharedState,
    team: &AuthenticatedTeam,
) -> Result<Vec<PlayerRoundView>, ServiceError> {
    let store = state.store();
    let rounds = store.list_rounds(team.game_id).await?;

    let mut views = Vec::with_capacity(rounds.len());
    for round in rounds {
        let submitted = store
            .list_submissions(round.id)
            .await?
            .iter()
            .any(|submission| submission.team_id == team.team_id);
        let status = RoundStatus::from(round.status);
        let questions = if status.is_open() {
            round
                .questions
                .into_iter()
                .map(|question| PlayerQuestion::from(QuestionSpec::from(question)))
                .collect()
        } else {
            Vec::new()
        };
        views.push(PlayerRoundView {
            id: round.id,
            name: round.name,
            position: round.position,
            is_open: status.is_open(),
            submitted,
            timer_expires_at_epoch_seconds: status
                .timer()
                .map(|timer| timer.expires_at_epoch_seconds),
            questions,
        });
    }
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::{
        config::AppConfig,
        dao::{
            game_store::{CreateTeamOutcome, memory::MemoryQuizStore},
            models::{
                GameEntity, QuestionEntity, QuestionKindEntity, RoundEntity, RoundStatusEntity,
                TeamEntity,
            },
        },
        state::{AppState, Topic},
    };

    struct Fixture {
        state: SharedState,
        team: AuthenticatedTeam,
        round_id: Uuid,
    }

    async fn fixture(status: RoundStatusEntity) -> Fixture {
        let state = AppState::new(
            AppConfig::with_organizer_token("secret"),
            Arc::new(MemoryQuizStore::new()),
        );
        let store = state.store();
        let game_id = Uuid::new_v4();
        store
            .create_game(GameEntity {
                id: game_id,
                name: "Pub quiz".into(),
                join_code: "QUIZ23".into(),
                active: true,
                created_at: SystemTime::now(),
            })
            .await
            .unwrap();
        let round_id = Uuid::new_v4();
        store
            .create_round(RoundEntity {
                id: round_id,
                game_id,
                name: "Animals".into(),
                position: 0,
                status,
                questions: vec![
                    QuestionEntity {
                        id: "q1".into(),
                        text: "Pet?".into(),
                        points: 1.0,
                        kind: QuestionKindEntity::Text {
                            validation: "cat / dog".into(),
                        },
                    },
                    QuestionEntity {
                        id: "q2".into(),
                        text: "Double it".into(),
                        points: 1.0,
                        kind: QuestionKindEntity::Number {
                            validation: "answer * 2".into(),
                            target: None,
                        },
                    },
                ],
            })
            .await
            .unwrap();
        let CreateTeamOutcome::Created(team) = store
            .create_team(TeamEntity {
                id: Uuid::new_v4(),
                game_id,
                name: "Owls".into(),
                token: Uuid::new_v4(),
                created_at: SystemTime::now(),
                seq: 0,
            })
            .await
            .unwrap()
        else {
            panic!("team not created");
        };
        Fixture {
            state,
            team: AuthenticatedTeam::from(&team),
            round_id,
        }
    }

    fn answers(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(question, raw)| (question.to_string(), raw.to_string()))
            .collect()
    }

    fn open() -> RoundStatusEntity {
        RoundStatusEntity::Open { timer: None }
    }

    #[tokio::test]
    async fn accepted_submission_is_scored() {
        let fx = fixture(open()).await;
        let outcome = submit(
            &fx.state,
            &fx.team,
            fx.round_id,
            answers(&[("q1", "Dog"), ("q2", "5")]),
        )
        .await
        .unwrap();
        let SubmissionOutcome::Accepted { replaced, answers } = outcome else {
            panic!("expected acceptance");
        };
        assert!(!replaced);
        let points: Vec<f64> = answers.iter().map(|answer| answer.points).collect();
        assert_eq!(points, vec![1.0, 10.0]);
    }

    #[tokio::test]
    async fn missing_answers_are_recorded_blank() {
        let fx = fixture(open()).await;
        let outcome = submit(&fx.state, &fx.team, fx.round_id, answers(&[("q2", "3")]))
            .await
            .unwrap();
        let SubmissionOutcome::Accepted { answers, .. } = outcome else {
            panic!("expected acceptance");
        };
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].raw_text, "");
        assert_eq!(answers[0].points, 0.0);
    }

    #[tokio::test]
    async fn closed_round_is_rejected() {
        let fx = fixture(RoundStatusEntity::Closed).await;
        let outcome = submit(&fx.state, &fx.team, fx.round_id, IndexMap::new())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SubmissionOutcome::Rejected(RejectionReason::RoundClosed)
        );
    }

    #[tokio::test]
    async fn foreign_team_is_rejected_before_status() {
        let fx = fixture(RoundStatusEntity::Closed).await;
        let stranger = AuthenticatedTeam {
            team_id: Uuid::new_v4(),
            game_id: Uuid::new_v4(),
            name: "Strangers".into(),
        };
        let outcome = submit(&fx.state, &stranger, fx.round_id, IndexMap::new())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SubmissionOutcome::Rejected(RejectionReason::TeamNotInGame)
        );

        let outcome = submit(&fx.state, &fx.team, Uuid::new_v4(), IndexMap::new())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SubmissionOutcome::Rejected(RejectionReason::RoundNotFound)
        );
    }

    #[tokio::test]
    async fn team_deleted_after_authentication_is_rejected() {
        let fx = fixture(open()).await;
        assert!(fx.state.store().delete_team(fx.team.team_id).await.unwrap());

        let outcome = submit(&fx.state, &fx.team, fx.round_id, answers(&[("q1", "cat")]))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SubmissionOutcome::Rejected(RejectionReason::TeamNotInGame)
        );
        assert!(
            fx.state
                .store()
                .list_submissions(fx.round_id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn second_submission_is_rejected_until_granted() {
        let fx = fixture(open()).await;
        let first = submit(&fx.state, &fx.team, fx.round_id, answers(&[("q1", "cat")]))
            .await
            .unwrap();
        assert!(first.is_accepted());

        let second = submit(&fx.state, &fx.team, fx.round_id, answers(&[("q1", "dog")]))
            .await
            .unwrap();
        assert_eq!(
            second,
            SubmissionOutcome::Rejected(RejectionReason::AlreadySubmitted)
        );

        grant_resubmit(&fx.state, fx.round_id, fx.team.team_id)
            .await
            .unwrap();
        let status = submission_status(&fx.state, fx.round_id).await.unwrap();
        assert!(status[0].submitted && status[0].can_resubmit);

        let third = submit(&fx.state, &fx.team, fx.round_id, answers(&[("q1", "bird")]))
            .await
            .unwrap();
        assert!(matches!(third, SubmissionOutcome::Accepted { replaced: true, .. }));

        let stored = fx
            .state
            .store()
            .list_answers_for_team_round(fx.team.team_id, fx.round_id)
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().any(|answer| answer.raw_text == "bird"));
    }

    #[tokio::test]
    async fn acceptance_broadcasts_the_submission_count() {
        let fx = fixture(open()).await;
        let mut sub = fx.state.fabric().join(Topic::Game(fx.team.game_id));
        submit(&fx.state, &fx.team, fx.round_id, IndexMap::new())
            .await
            .unwrap();
        let event = sub.receiver.try_recv().unwrap();
        assert_eq!(
            event.event.as_deref(),
            Some(events::EVENT_SUBMISSION_COUNT_CHANGED)
        );
        assert!(event.data.contains("\"submittedCount\":1"));
        assert!(event.data.contains("\"totalTeams\":1"));
    }

    #[tokio::test]
    async fn player_rounds_hide_questions_of_closed_rounds() {
        let fx = fixture(RoundStatusEntity::Closed).await;
        let views = player_rounds(&fx.state, &fx.team).await.unwrap();
        assert_eq!(views.len(), 1);
        assert!(!views[0].is_open);
        assert!(views[0].questions.is_empty());
    }
}
