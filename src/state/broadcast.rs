use std::fmt;

use dashmap::DashMap;
use indexmap::IndexMap;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// Identifier of one subscriber inside a topic.
pub type SubscriberId = Uuid;

/// Delivery scopes. Each game has a player-facing topic and a scoring topic
/// reserved for organizers reviewing answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// `game:{id}`: round lifecycle and submission counters.
    Game(Uuid),
    /// `scoring:{id}`: manual score edits.
    Scoring(Uuid),
}

impl Topic {
    /// Game the topic belongs to.
    pub fn game_id(&self) -> Uuid {
        match self {
            Topic::Game(id) | Topic::Scoring(id) => *id,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Game(id) => write!(f, "game:{id}"),
            Topic::Scoring(id) => write!(f, "scoring:{id}"),
        }
    }
}

/// Membership handle returned by [`BroadcastFabric::join`].
#[derive(Debug)]
pub struct Subscription {
    /// Topic joined.
    pub topic: Topic,
    /// Identifier to pass to [`BroadcastFabric::leave`].
    pub id: SubscriberId,
    /// Events published after the join, in publish order.
    pub receiver: mpsc::UnboundedReceiver<ServerEvent>,
}

/// Topic-scoped fan-out with an explicit subscriber set per topic.
///
/// Publishing holds the topic entry for the whole fan-out, so two events on the
/// same topic reach every subscriber in the same order. Joins and leaves
/// apply to events published afterwards.
#[derive(Default)]
pub struct BroadcastFabric {
    topics: DashMap<Topic, IndexMap<SubscriberId, mpsc::UnboundedSender<ServerEvent>>>,
}

impl BroadcastFabric {
    /// Empty fabric.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber to `topic`.
    pub fn join(&self, topic: Topic) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.topics.entry(topic).or_default().insert(id, sender);
        debug!(%topic, subscriber = %id, "subscriber joined");
        Subscription {
            topic,
            id,
            receiver,
        }
    }

    /// Remove a subscriber. Returns `false` if it was not a member.
    pub fn leave(&self, topic: Topic, id: SubscriberId) -> bool {
        let removed = self
            .topics
            .get_mut(&topic)
            .is_some_and(|mut members| members.shift_remove(&id).is_some());
        self.topics.remove_if(&topic, |_, members| members.is_empty());
        if removed {
            debug!(%topic, subscriber = %id, "subscriber left");
        }
        removed
    }

    /// Current members of `topic`, in join order.
    pub fn subscribers(&self, topic: Topic) -> Vec<SubscriberId> {
        self.topics
            .get(&topic)
            .map(|members| members.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Number of current members of `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topics.get(&topic).map_or(0, |members| members.len())
    }

    /// Deliver `event` to every current member of `topic` and return how many
    /// received it. Members whose receiver is gone are pruned.
    pub fn publish(&self, topic: Topic, event: ServerEvent) -> usize {
        let Some(mut members) = self.topics.get_mut(&topic) else {
            return 0;
        };
        members.retain(|_, sender| sender.send(event.clone()).is_ok());
        members.len()
    }

    /// Close both topics of a game. Subscribers see their stream end.
    pub fn close_game(&self, game_id: Uuid) {
        self.topics.remove(&Topic::Game(game_id));
        self.topics.remove(&Topic::Scoring(game_id));
    }
}
