use std::future::Future;

use tokio::task::JoinHandle;

use crate::error::ApiError;

/// A backend call running on a spawned tokio task.
///
/// The UI loop never awaits a request directly; it polls the task on every
/// event and tick and takes the result once it is there.
#[derive(Debug)]
pub struct Task<T> {
    handle: Option<JoinHandle<Result<T, ApiError>>>,
}

impl<T: Send + 'static> Task<T> {
    /// Spawn `future`. Must be called inside a tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        Self {
            handle: Some(tokio::spawn(future)),
        }
    }

    /// True until the result has been taken or the task aborted
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Take the result if the task has finished; `None` while it is running
    /// and after the result was taken.
    pub async fn poll(&mut self) -> Option<Result<T, ApiError>> {
        if !self.handle.as_ref().is_some_and(|handle| handle.is_finished()) {
            return None;
        }
        let handle = self.handle.take()?;
        Some(join(handle).await)
    }

    /// Wait for the task to finish and take its result
    pub async fn wait(&mut self) -> Option<Result<T, ApiError>> {
        let handle = self.handle.take()?;
        Some(join(handle).await)
    }

    /// Abort the task. Returns false if nothing was running.
    pub fn abort(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl<T> Default for Task<T> {
    fn default() -> Self {
        Self { handle: None }
    }
}

async fn join<T>(handle: JoinHandle<Result<T, ApiError>>) -> Result<T, ApiError> {
    match handle.await {
        Ok(result) => result,
        Err(err) => {
            tracing::warn!(error = %err, "background request task failed");
            Err(ApiError::Task(err))
        }
    }
}
