//! Location handling for redirects issued by the request pipeline.

use std::sync::{Mutex, PoisonError};

/// Where the client currently "is" and how to move it.
///
/// The pipeline redirects to the login or maintenance route through this
/// trait; a browser shell would change `window.location`, the CLI just
/// records the move.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;

    fn navigate(&self, path: &str);
}

/// Navigator that keeps the location in memory and remembers every move.
#[derive(Debug)]
pub struct MemoryNavigator {
    state: Mutex<NavState>,
}

#[derive(Debug)]
struct NavState {
    current: String,
    history: Vec<String>,
}

impl MemoryNavigator {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(NavState {
                current: start.into(),
                history: Vec::new(),
            }),
        }
    }

    /// Every path passed to [`Navigator::navigate`], oldest first
    pub fn history(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .clone()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    fn navigate(&self, path: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(from = %state.current, to = %path, "Redirecting");
        state.current = path.to_string();
        state.history.push(path.to_string());
    }
}
