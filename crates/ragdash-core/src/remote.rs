//! State for views that fetch once on activation and render the result.

use std::future::Future;

use crate::error::ApiError;
use crate::task::Task;

pub const LOADING: &str = "Loading…";
pub const NO_CLUSTERS: &str = "No clusters found.";

/// Loading/error/success state of one remote resource
#[derive(Debug, Clone, PartialEq)]
pub enum Remote<T> {
    Loading,
    Ready(T),
    /// User-visible failure text
    Failed(String),
}

impl<T> Remote<T> {
    pub fn from_result(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(value) => Remote::Ready(value),
            Err(err) => Remote::Failed(err.user_message()),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Remote::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Remote::Ready(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> Default for Remote<T> {
    fn default() -> Self {
        Remote::Loading
    }
}

/// A GET issued when its view activates, plus the state it resolves into
#[derive(Debug)]
pub struct Fetch<T> {
    state: Remote<T>,
    task: Task<T>,
}

impl<T: Send + 'static> Fetch<T> {
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        Self {
            state: Remote::Loading,
            task: Task::spawn(future),
        }
    }

    pub fn state(&self) -> &Remote<T> {
        &self.state
    }

    pub fn ready(&self) -> Option<&T> {
        self.state.ready()
    }

    /// Move the result into state if the request has finished
    pub async fn poll(&mut self) -> bool {
        match self.task.poll().await {
            Some(result) => {
                self.state = Remote::from_result(result);
                true
            }
            None => false,
        }
    }

    pub async fn wait(&mut self) {
        if let Some(result) = self.task.wait().await {
            self.state = Remote::from_result(result);
        }
    }
}

/// Outcome of a POST action, ready to show inline or in an alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Success(String),
    Failed(String),
}

impl ActionOutcome {
    pub fn from_result<T>(result: Result<T, ApiError>, describe: impl FnOnce(T) -> String) -> Self {
        match result {
            Ok(value) => ActionOutcome::Success(describe(value)),
            Err(err) => {
                if !err.is_rejection() {
                    tracing::warn!(error = %err, "backend action failed");
                }
                ActionOutcome::Failed(err.user_message())
            }
        }
    }

    pub fn text(&self) -> &str {
        match self {
            ActionOutcome::Success(text) | ActionOutcome::Failed(text) => text,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Success(_))
    }
}
