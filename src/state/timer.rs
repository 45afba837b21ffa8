use std::{future::Future, sync::Arc, time::Duration};

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::{
    sync::{Mutex, OwnedMutexGuard},
    task::AbortHandle,
    time::sleep,
};
use tracing::debug;
use uuid::Uuid;

struct ArmedTimer {
    token: Uuid,
    handle: AbortHandle,
}

/// Process-local countdown scheduler, at most one pending countdown per round.
///
/// A countdown only closes its round through the callback it was armed with;
/// the round itself stays authoritative through its stored timer token.
#[derive(Default)]
pub struct RoundTimers {
    pending: Arc<DashMap<Uuid, ArmedTimer>>,
    transitions: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl RoundTimers {
    /// Empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `on_expiry` to run after `delay` for `round_id`, replacing and
    /// cancelling any countdown already pending for the round.
    pub fn arm<F>(&self, round_id: Uuid, token: Uuid, delay: Duration, on_expiry: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let pending = Arc::clone(&self.pending);
        let spawn = move || {
            tokio::spawn(async move {
                sleep(delay).await;
                // Deregister before the callback: closing the round may cancel
                // timers of this round, and must not abort this very task.
                pending.remove_if(&round_id, |_, armed| armed.token == token);
                debug!(round_id = %round_id, token = %token, "round timer fired");
                on_expiry.await;
            })
            .abort_handle()
        };

        // The entry stays locked until the new timer is registered, so the
        // task cannot deregister before it is inserted.
        match self.pending.entry(round_id) {
            Entry::Occupied(mut occupied) => {
                let handle = spawn();
                let previous = occupied.insert(ArmedTimer { token, handle });
                previous.handle.abort();
                debug!(round_id = %round_id, replaced = %previous.token, "round timer re-armed");
            }
            Entry::Vacant(vacant) => {
                let handle = spawn();
                vacant.insert(ArmedTimer { token, handle });
                debug!(round_id = %round_id, delay_ms = delay.as_millis() as u64, "round timer armed");
            }
        }
    }

    /// Cancel the countdown of `round_id` if it is the one identified by `token`.
    pub fn cancel(&self, round_id: Uuid, token: Uuid) -> bool {
        match self
            .pending
            .remove_if(&round_id, |_, armed| armed.token == token)
        {
            Some((_, armed)) => {
                armed.handle.abort();
                debug!(round_id = %round_id, token = %token, "round timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel whatever countdown is pending for `round_id`. No-op if none.
    pub fn stop(&self, round_id: Uuid) -> bool {
        match self.pending.remove(&round_id) {
            Some((_, armed)) => {
                armed.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Serialize the transitions of `round_id`.
    ///
    /// Held from the status read to the last effect, so countdowns are armed
    /// in the order their tokens were committed.
    pub async fn lock_round(&self, round_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.transitions.entry(round_id).or_default().value());
        lock.lock_owned().await
    }

    /// Drop every trace of a deleted round.
    pub fn forget(&self, round_id: Uuid) {
        self.stop(round_id);
        self.transitions.remove(&round_id);
    }

    /// Token of the countdown pending for `round_id`.
    pub fn armed_token(&self, round_id: Uuid) -> Option<Uuid> {
        self.pending.get(&round_id).map(|armed| armed.token)
    }

    /// Number of pending countdowns.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no countdown is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Drop for RoundTimers {
    fn drop(&mut self) {
        for entry in self.pending.iter() {
            entry.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let timers = RoundTimers::new();
        let round = Uuid::new_v4();
        let token = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();

        timers.arm(round, token, Duration::from_secs(30), async move {
            let _ = tx.send(token);
        });
        assert_eq!(timers.armed_token(round), Some(token));

        sleep(Duration::from_secs(29)).await;
        assert!(rx.try_recv().is_err());

        assert_eq!(rx.recv().await, Some(token));
        assert!(timers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_cancels_the_previous_countdown() {
        let timers = RoundTimers::new();
        let round = Uuid::new_v4();
        let fired = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let first = Uuid::new_v4();
        let counter = Arc::clone(&fired);
        let first_tx = tx.clone();
        timers.arm(round, first, Duration::from_secs(10), async move {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = first_tx.send(first);
        });

        let second = Uuid::new_v4();
        let counter = Arc::clone(&fired);
        timers.arm(round, second, Duration::from_secs(20), async move {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(second);
        });

        assert_eq!(rx.recv().await, Some(second));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_requires_matching_token() {
        let timers = RoundTimers::new();
        let round = Uuid::new_v4();
        let token = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        timers.arm(round, token, Duration::from_secs(5), async move {
            let _ = tx.send(());
        });
        assert!(!timers.cancel(round, Uuid::new_v4()));
        assert!(timers.cancel(round, token));
        assert!(!timers.cancel(round, token));

        sleep(Duration::from_secs(10)).await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn stopping_an_unknown_round_is_a_noop() {
        let timers = RoundTimers::new();
        assert!(!timers.stop(Uuid::new_v4()));
    }

    #[tokio::test(start_paused = true)]
    async fn round_locks_are_exclusive_per_round() {
        let timers = RoundTimers::new();
        let round = Uuid::new_v4();

        let held = timers.lock_round(round).await;
        let blocked = tokio::time::timeout(Duration::from_millis(10), timers.lock_round(round)).await;
        assert!(blocked.is_err());
        // other rounds are not affected
        let _other = timers.lock_round(Uuid::new_v4()).await;

        drop(held);
        let _again = timers.lock_round(round).await;
    }
}
