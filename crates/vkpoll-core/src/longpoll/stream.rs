use std::{collections::VecDeque, time::Duration};

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::{
    errors::Error,
    events::{decode_update, Event},
    retry::RetryPolicy,
    Result,
};

use super::session::LongPollSession;

/// Flattens long-poll batches into an ordered sequence of updates.
///
/// Pending updates live in the stream, not in the poll future, so dropping a
/// pending `next_update` and calling it again neither skips nor repeats.
pub struct UpdateStream {
    session: LongPollSession,
    pending: VecDeque<Value>,
    closed: bool,
}

impl UpdateStream {
    pub fn new(session: LongPollSession) -> Self {
        Self {
            session,
            pending: VecDeque::new(),
            closed: false,
        }
    }

    pub fn session(&self) -> &LongPollSession {
        &self.session
    }

    /// Updates received but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Hand the session back, e.g. to build a fresh stream after a fatal error.
    /// Buffered updates are dropped.
    pub fn into_session(self) -> LongPollSession {
        self.session
    }

    pub async fn next_update(&mut self) -> Result<Value> {
        loop {
            if let Some(update) = self.pending.pop_front() {
                return Ok(update);
            }
            if self.closed {
                return Err(Error::Closed);
            }
            match self.session.poll().await {
                Ok(outcome) => self.pending.extend(outcome.updates),
                Err(e) => {
                    if e.is_fatal() {
                        tracing::error!(error = %e, "long-poll stream closed");
                        self.closed = true;
                    }
                    return Err(e);
                }
            }
        }
    }

    pub async fn next_event(&mut self) -> Result<Event> {
        let update = self.next_update().await?;
        Ok(decode_update(&update))
    }

    /// Feed decoded events to `on_event` until `cancel` fires or a fatal error.
    ///
    /// Transient errors (network, malformed body) are logged and retried with
    /// the session's backoff. An error from `on_event` stops the loop.
    pub async fn run(
        &mut self,
        cancel: CancellationToken,
        on_event: &mut (dyn FnMut(Event) -> Result<()> + Send),
    ) -> Result<()> {
        let retry = self.session.retry();
        let mut transient: u32 = 0;

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                next = self.next_event() => next,
            };

            match next {
                Ok(event) => {
                    transient = 0;
                    on_event(event)?;
                }
                Err(e) if e.is_fatal() || matches!(e, Error::Closed) => return Err(e),
                Err(e) => {
                    transient = transient.saturating_add(1);
                    let delay = transient_delay(&retry, transient);
                    tracing::warn!(error = %e, attempt = transient, ?delay, "long-poll request failed; retrying");
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(()),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}

/// Backoff before retrying after `failures` consecutive transient errors.
/// The first retry already waits the base delay.
fn transient_delay(retry: &RetryPolicy, failures: u32) -> Duration {
    retry.delay_for_attempt(failures.saturating_add(1))
}
