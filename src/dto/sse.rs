use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq)]
/// Event delivered to one subscriber of a topic.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Serialise `payload` into the data field of an event named `event`.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// First event of every stream, naming the topic the client now follows.
pub struct Handshake {
    /// `game:{id}` or `scoring:{id}`.
    pub topic: String,
    /// Identifier of this subscription.
    pub subscriber_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// A round opened or closed.
pub struct RoundStatusChangedEvent {
    pub round_id: Uuid,
    pub is_open: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// A round closed. `cause` is `manual` or `timer`.
pub struct RoundClosedEvent {
    pub round_id: Uuid,
    pub cause: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// A countdown was armed on a round.
pub struct TimerStartedEvent {
    pub round_id: Uuid,
    pub expires_at_epoch_seconds: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// The countdown of a round was cancelled.
pub struct TimerStoppedEvent {
    pub round_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// A submission was accepted for a round.
pub struct SubmissionCountChangedEvent {
    pub round_id: Uuid,
    pub submitted_count: usize,
    pub total_teams: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// A team was allowed to submit a round again.
pub struct SubmissionClearedEvent {
    pub round_id: Uuid,
    pub team_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Every round of the game is closed.
pub struct GameFinalisingEvent {
    pub game_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// An organizer adjusted an answer. Published on the scoring topic only.
pub struct ScoreChangedEvent {
    pub answer_id: Uuid,
    pub points: f64,
    pub bonus: f64,
    pub penalty: f64,
    pub notes: String,
    pub total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payloads_use_camel_case_fields() {
        let round_id = Uuid::nil();
        let event = ServerEvent::json(
            Some("timer-started".to_string()),
            &TimerStartedEvent {
                round_id,
                expires_at_epoch_seconds: 42,
            },
        )
        .unwrap();
        assert_eq!(event.event.as_deref(), Some("timer-started"));
        let value: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(
            value,
            json!({"roundId": round_id, "expiresAtEpochSeconds": 42})
        );
    }
}
