//! Single-flight access token refresh.
//!
//! Every request that fails with an expired token joins the queue of one
//! [`RefreshCoordinator`]. The first one to join while no refresh is running
//! starts the refresh call on its own task; everyone, the starter included,
//! waits for it to settle. When the call settles, the flag is released and the
//! whole queue is drained in one critical section, so a late failure either
//! joins the finished batch or starts a fresh refresh, never both.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::RefreshError;
use crate::types::AccessToken;

/// Performs the refresh call on behalf of a [`RefreshCoordinator`].
pub trait TokenRefresher: Send + Sync {
    /// Exchange the stored refresh token for a new access token.
    ///
    /// Implementations persist the new tokens and update the default
    /// `Authorization` header before returning, so replays see them.
    fn refresh(&self) -> impl Future<Output = Result<AccessToken, RefreshError>> + Send;

    /// Called once per failed refresh, after every queued request was rejected.
    fn refresh_failed(&self, error: &RefreshError);
}

/// Outcome delivered to every request queued behind one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// Replay the original request with this token.
    Resolved(AccessToken),
    Rejected(RefreshError),
}

struct PendingRequest {
    settle: oneshot::Sender<Settlement>,
}

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    queue: Vec<PendingRequest>,
}

/// Refresh flag and waiter queue for one API client.
pub struct RefreshCoordinator {
    state: Arc<Mutex<RefreshState>>,
    timeout: Duration,
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(RefreshState::default())),
            timeout,
        }
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.state.lock().refreshing
    }

    /// Requests waiting on the in-flight refresh.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Wait for a fresh access token, starting a refresh if none is running.
    ///
    /// The refresh runs on a spawned task, so cancelling the caller that
    /// started it does not affect the other waiters. Must be called from
    /// within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the [`RefreshError`] of the refresh this call waited on.
    pub async fn acquire<R>(&self, refresher: Arc<R>) -> Result<AccessToken, RefreshError>
    where
        R: TokenRefresher + 'static,
    {
        let (settle, settled) = oneshot::channel();
        let leader = {
            let mut state = self.state.lock();
            state.queue.push(PendingRequest { settle });
            !std::mem::replace(&mut state.refreshing, true)
        };

        if leader {
            let flight = Flight {
                state: self.state.clone(),
                landed: false,
            };
            tokio::spawn(fly(flight, self.timeout, refresher));
        } else {
            tracing::debug!("Refresh in flight, request queued");
        }

        match settled.await {
            Ok(Settlement::Resolved(token)) => Ok(token),
            Ok(Settlement::Rejected(error)) => Err(error),
            Err(_) => Err(RefreshError::Abandoned),
        }
    }
}

async fn fly<R: TokenRefresher>(flight: Flight, timeout: Duration, refresher: Arc<R>) {
    let outcome = match tokio::time::timeout(timeout, refresher.refresh()).await {
        Ok(outcome) => outcome,
        Err(_) => Err(RefreshError::TimedOut(timeout)),
    };

    match outcome {
        Ok(token) => {
            let replayed = flight.land(Settlement::Resolved(token));
            tracing::info!(replayed, "Access token refreshed");
        }
        Err(error) => {
            let rejected = flight.land(Settlement::Rejected(error.clone()));
            tracing::warn!(error = %error, rejected, "Access token refresh failed");
            refresher.refresh_failed(&error);
        }
    }
}

/// Release the flag and drain the queue, then notify the drained waiters.
fn settle(state: &Mutex<RefreshState>, settlement: Settlement) -> usize {
    let queue = {
        let mut state = state.lock();
        state.refreshing = false;
        std::mem::take(&mut state.queue)
    };

    let count = queue.len();
    for pending in queue {
        // Receiver is gone when the caller stopped waiting.
        let _ = pending.settle.send(settlement.clone());
    }
    count
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &state.refreshing)
            .field("pending", &state.queue.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Releases the refresh flag even if the refresh task dies mid-call.
struct Flight {
    state: Arc<Mutex<RefreshState>>,
    landed: bool,
}

impl Flight {
    fn land(mut self, settlement: Settlement) -> usize {
        self.landed = true;
        settle(&self.state, settlement)
    }
}

impl Drop for Flight {
    fn drop(&mut self) {
        if !self.landed {
            let rejected = settle(&self.state, Settlement::Rejected(RefreshError::Abandoned));
            tracing::warn!(rejected, "Refresh dropped before settling");
        }
    }
}
