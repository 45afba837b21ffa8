//! Read-side scoring: totals, per-round subtotals and the leaderboard, plus
//! the organizer's manual adjustments.

use std::collections::HashMap;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::models::{AnswerEntity, AnswerPatch, RoundEntity, TeamEntity},
    dto::scoring::{AnswerView, LeaderboardEntry, QuestionScore, RoundSubtotal, TeamRoundScore},
    error::ServiceError,
    evaluation,
    services::events,
    state::{
        SharedState,
        game::{AuthenticatedTeam, QuestionSpec},
    },
};

/// Rank teams by total descending; equal totals keep team creation order.
///
/// Every team appears, with one subtotal per round in `rounds` order.
pub fn rank(
    teams: &[TeamEntity],
    rounds: &[RoundEntity],
    answers: &[AnswerEntity],
) -> Vec<LeaderboardEntry> {
    let mut subtotals: HashMap<(Uuid, Uuid), f64> = HashMap::new();
    for answer in answers {
        *subtotals
            .entry((answer.team_id, answer.round_id))
            .or_default() += answer.total();
    }

    let mut ordered: Vec<&TeamEntity> = teams.iter().collect();
    ordered.sort_by_key(|team| team.seq);

    let mut entries: Vec<(u64, LeaderboardEntry)> = ordered
        .into_iter()
        .map(|team| {
            let per_round: Vec<RoundSubtotal> = rounds
                .iter()
                .map(|round| RoundSubtotal {
                    round_id: round.id,
                    total: subtotals.get(&(team.id, round.id)).copied().unwrap_or(0.0),
                })
                .collect();
            let total = per_round.iter().map(|round| round.total).sum::<f64>();
            (
                team.seq,
                LeaderboardEntry {
                    rank: 0,
                    team_id: team.id,
                    team_name: team.name.clone(),
                    total,
                    rounds: per_round,
                },
            )
        })
        .collect();

    entries.sort_by(|(a_seq, a), (b_seq, b)| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a_seq.cmp(b_seq))
    });

    entries
        .into_iter()
        .enumerate()
        .map(|(index, (_, mut entry))| {
            entry.rank = index + 1;
            entry
        })
        .collect()
}

/// Leaderboard of a game.
pub async fn leaderboard(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Vec<LeaderboardEntry>, ServiceError> {
    let store = state.store();
    if store.find_game(game_id).await?.is_none() {
        return Err(ServiceError::NotFound("game not found".into()));
    }
    let teams = store.list_teams(game_id).await?;
    let rounds = store.list_rounds(game_id).await?;
    let answers = store.list_answers_for_game(game_id).await?;
    Ok(rank(&teams, &rounds, &answers))
}

/// Every answer of a game, for the organizer scoring grid.
pub async fn answer_grid(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Vec<AnswerView>, ServiceError> {
    let store = state.store();
    if store.find_game(game_id).await?.is_none() {
        return Err(ServiceError::NotFound("game not found".into()));
    }
    let answers = store.list_answers_for_game(game_id).await?;
    Ok(answers.into_iter().map(AnswerView::from).collect())
}

/// Apply a manual adjustment and return the updated answer with its total.
///
/// Omitted fields stay unchanged. A corrected answer text is scored again
/// unless explicit points come with it. Organizers following the game's
/// scoring topic receive the updated answer.
pub async fn adjust(
    state: &SharedState,
    answer_id: Uuid,
    mut patch: AnswerPatch,
) -> Result<AnswerView, ServiceError> {
    let store = state.store();
    if let (Some(raw_text), None) = (&patch.raw_text, patch.points) {
        patch.points = rescore(state, answer_id, raw_text).await?;
    }
    let answer = store
        .update_answer(answer_id, patch)
        .await?
        .ok_or_else(|| ServiceError::NotFound("answer not found".into()))?;

    info!(
        answer_id = %answer.id,
        points = answer.points,
        bonus = answer.bonus,
        penalty = answer.penalty,
        total = answer.total(),
        "score adjusted"
    );

    match store.find_round(answer.round_id).await? {
        Some(round) => events::broadcast_score_changed(state, round.game_id, &answer),
        None => info!(answer_id = %answer.id, "adjusted answer has no round; not broadcast"),
    }
    Ok(answer.into())
}

/// Points `raw_text` earns on the question of `answer_id`, or `None` when
/// that question was removed from its round.
async fn rescore(
    state: &SharedState,
    answer_id: Uuid,
    raw_text: &str,
) -> Result<Option<f64>, ServiceError> {
    let store = state.store();
    let answer = store
        .find_answer(answer_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("answer not found".into()))?;
    let question = store
        .find_round(answer.round_id)
        .await?
        .and_then(|round| {
            round
                .questions
                .into_iter()
                .find(|question| question.id == answer.question_id)
        });
    match question {
        Some(question) => Ok(Some(evaluation::evaluate(
            &QuestionSpec::from(question),
            raw_text,
        ))),
        None => {
            debug!(answer_id = %answer_id, "question gone; corrected answer keeps its points");
            Ok(None)
        }
    }
}

/// The team's own scores for one round.
pub async fn team_round_score(
    state: &SharedState,
    team: &AuthenticatedTeam,
    round_id: Uuid,
) -> Result<TeamRoundScore, ServiceError> {
    let store = state.store();
    let round = store
        .find_round(round_id)
        .await?
        .filter(|round| round.game_id == team.game_id)
        .ok_or_else(|| ServiceError::NotFound("round not found".into()))?;

    let answers = store
        .list_answers_for_team_round(team.team_id, round.id)
        .await?;
    // follow question order of the round
    let mut scores: Vec<QuestionScore> = round
        .questions
        .iter()
        .filter_map(|question| {
            answers
                .iter()
                .find(|answer| answer.question_id == question.id)
                .map(QuestionScore::from)
        })
        .collect();
    scores.extend(
        answers
            .iter()
            .filter(|answer| !round.questions.iter().any(|q| q.id == answer.question_id))
            .map(QuestionScore::from),
    );

    Ok(TeamRoundScore {
        round_id: round.id,
        total: scores.iter().map(|score| score.total).sum::<f64>(),
        answers: scores,
    })
}
