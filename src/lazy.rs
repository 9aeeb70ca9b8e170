//! Tri-state lazy cache for a resource that is expensive to load once.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

enum LoadState<T> {
    Pending,
    Ready(T),
    Failed(Arc<anyhow::Error>),
}

/// Observer-facing view of the cache state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Pending,
    Ready,
    Failed,
}

/// One-shot initialization cache.
///
/// The first `get_or_init` call runs the initializer; every later call
/// returns the cached outcome, including a cached failure. The lock is held
/// across initialization, so concurrent first calls serialize and only one
/// initializer ever runs.
pub struct LazyResource<T> {
    state: Mutex<LoadState<T>>,
}

impl<T: Clone> LazyResource<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LoadState::Pending),
        }
    }

    pub async fn get_or_init<F, Fut>(&self, init: F) -> Result<T, Arc<anyhow::Error>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut state = self.state.lock().await;

        match &*state {
            LoadState::Ready(value) => Ok(value.clone()),
            LoadState::Failed(error) => Err(Arc::clone(error)),
            LoadState::Pending => match init().await {
                Ok(value) => {
                    *state = LoadState::Ready(value.clone());
                    Ok(value)
                }
                Err(error) => {
                    let error = Arc::new(error);
                    *state = LoadState::Failed(Arc::clone(&error));
                    Err(error)
                }
            },
        }
    }

    pub async fn status(&self) -> LoadStatus {
        match &*self.state.lock().await {
            LoadState::Pending => LoadStatus::Pending,
            LoadState::Ready(_) => LoadStatus::Ready,
            LoadState::Failed(_) => LoadStatus::Failed,
        }
    }
}

impl<T: Clone> Default for LazyResource<T> {
    fn default() -> Self {
        Self::new()
    }
}
