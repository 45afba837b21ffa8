use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::sse::{Handshake, ServerEvent},
    error::ServiceError,
    services::events::EVENT_HANDSHAKE,
    state::{SharedState, Subscription, Topic},
};

/// Join the player-facing topic of an existing game.
pub async fn subscribe_game(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Subscription, ServiceError> {
    ensure_game_exists(state, game_id).await?;
    Ok(state.fabric().join(Topic::Game(game_id)))
}

/// Join the organizer scoring topic of an existing game.
pub async fn subscribe_scoring(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Subscription, ServiceError> {
    ensure_game_exists(state, game_id).await?;
    Ok(state.fabric().join(Topic::Scoring(game_id)))
}

async fn ensure_game_exists(state: &SharedState, game_id: Uuid) -> Result<(), ServiceError> {
    match state.store().find_game(game_id).await? {
        Some(_) => Ok(()),
        None => Err(ServiceError::NotFound("game not found".into())),
    }
}

/// Convert a subscription into an SSE response. The first event is a
/// handshake; the subscriber leaves its topic once the client disconnects.
pub fn to_sse_stream(
    state: SharedState,
    subscription: Subscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let Subscription {
        topic,
        id,
        mut receiver,
    } = subscription;

    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        let handshake = ServerEvent::json(
            Some(EVENT_HANDSHAKE.to_string()),
            &Handshake {
                topic: topic.to_string(),
                subscriber_id: id,
            },
        );
        if let Ok(handshake) = handshake {
            if tx.send(Ok(to_event(handshake))).await.is_err() {
                state.fabric().leave(topic, id);
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                message = receiver.recv() => {
                    let Some(message) = message else {
                        // topic closed, e.g. the game was deleted
                        break;
                    };
                    if tx.send(Ok(to_event(message))).await.is_err() {
                        break;
                    }
                }
            }
        }

        state.fabric().leave(topic, id);
        info!(%topic, subscriber = %id, "SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(message: ServerEvent) -> Event {
    let mut event = Event::default().data(message.data);
    if let Some(name) = message.event {
        event = event.event(name);
    }
    event
}
