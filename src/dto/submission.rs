use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A submitted value. Numbers are accepted as JSON numbers or strings.
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum RawAnswer {
    Text(String),
    Number(f64),
}

impl RawAnswer {
    /// Text handed to the validation engine.
    pub fn into_text(self) -> String {
        match self {
            RawAnswer::Text(text) => text,
            RawAnswer::Number(number) => number.to_string(),
        }
    }
}

/// Request body of a submission: question id to raw value.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct SubmitAnswersRequest(pub IndexMap<String, RawAnswer>);

impl SubmitAnswersRequest {
    /// Raw answers as text, keyed by question id.
    pub fn into_answers(self) -> IndexMap<String, String> {
        self.0
            .into_iter()
            .map(|(question_id, raw)| (question_id, raw.into_text()))
            .collect()
    }
}

/// Response to an accepted or rejected submission.
#[derive(Debug, Serialize, ToSchema, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionResponse {
    #[serde(rename_all = "camelCase")]
    Accepted {
        round_id: Uuid,
        replaced: bool,
        answer_count: usize,
    },
    Rejected {
        /// `round_not_found`, `team_not_in_game`, `round_closed` or `already_submitted`.
        reason: String,
    },
}

/// Submission state of one team for a round.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStatusEntry {
    pub team_id: Uuid,
    pub team_name: String,
    pub submitted: bool,
    pub can_resubmit: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_and_strings_are_both_accepted() {
        let request: SubmitAnswersRequest =
            serde_json::from_value(json!({"q1": "Dog", "q2": 5, "q3": "5.5"})).unwrap();
        let answers = request.into_answers();
        assert_eq!(answers["q1"], "Dog");
        assert_eq!(answers["q2"], "5");
        assert_eq!(answers["q3"], "5.5");
    }

    #[test]
    fn rejection_serialises_with_status_tag() {
        let value = serde_json::to_value(SubmissionResponse::Rejected {
            reason: "already_submitted".into(),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"status": "rejected", "reason": "already_submitted"})
        );
    }
}
