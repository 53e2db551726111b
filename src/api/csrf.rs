//! Coalesced CSRF token refresh.
//!
//! Only one refresh may be outstanding per client. Callers that arrive while
//! it is running await the same shared future and get the same token.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

type PendingRefresh = Shared<BoxFuture<'static, Option<String>>>;

#[derive(Default)]
pub struct TokenRefresher {
    in_flight: Mutex<Option<PendingRefresh>>,
}

impl TokenRefresher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the running refresh, or start one with `start`.
    ///
    /// The slot is cleared when the refresh settles, success or not, so a
    /// later call can try again.
    pub async fn refresh<F, Fut>(&self, start: F) -> Option<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<String>> + Send + 'static,
    {
        let pending = {
            let mut slot = self.slot();
            match slot.as_ref() {
                Some(pending) => {
                    debug!("Joining in-flight CSRF token refresh");
                    pending.clone()
                }
                None => {
                    let pending = start().boxed().shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        let token = pending.clone().await;

        let mut slot = self.slot();
        if slot
            .as_ref()
            .is_some_and(|current| current.ptr_eq(&pending))
        {
            *slot = None;
        }

        token
    }

    pub fn is_refreshing(&self) -> bool {
        self.slot().is_some()
    }

    fn slot(&self) -> MutexGuard<'_, Option<PendingRefresh>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for TokenRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRefresher")
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}
