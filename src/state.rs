//! Client-side todo state: the cached list plus loading and error flags,
//! kept in step with the server through a [`TodoApi`].

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::client::{ClientError, TodoApi};
use crate::models::{CreateTodo, Todo, UpdateTodo};

/// Point-in-time copy of the state, handed to renderers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub items: Vec<Todo>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Owns the in-memory item list. Local changes are applied only after the
/// server confirms them; concurrent responses are applied last-write-wins.
pub struct TodoState {
    api: Arc<dyn TodoApi>,
    inner: RwLock<Snapshot>,
    in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TodoState {
    /// Starts in the loading state until the first `refetch` completes.
    pub fn new(api: Arc<dyn TodoApi>) -> Self {
        Self {
            api,
            inner: RwLock::new(Snapshot {
                loading: true,
                ..Snapshot::default()
            }),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.inner.read().await.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub async fn clear_error(&self) {
        self.inner.write().await.error = None;
    }

    /// Replace the list with the server's.
    pub async fn refetch(&self) -> Result<(), ClientError> {
        let _guard = InFlight::enter(&self.in_flight);
        {
            let mut state = self.inner.write().await;
            state.loading = true;
            state.error = None;
        }

        let result = self.api.list_todos().await;

        let mut state = self.inner.write().await;
        state.loading = false;
        match result {
            Ok(items) => {
                tracing::debug!(count = items.len(), "Todos loaded");
                state.items = items;
                Ok(())
            }
            Err(e) => {
                state.error = Some(failure_message("Failed to load todos", &e));
                tracing::warn!("Error fetching todos: {}", e);
                Err(e)
            }
        }
    }

    pub async fn create(&self, req: CreateTodo) -> Result<Todo, ClientError> {
        let _guard = InFlight::enter(&self.in_flight);
        self.clear_error().await;

        let result = match req.validate() {
            Ok(()) => self.api.create_todo(req).await,
            Err(errors) => Err(errors.into()),
        };
        match result {
            Ok(todo) => {
                self.inner.write().await.items.push(todo.clone());
                Ok(todo)
            }
            Err(e) => Err(self.record("Failed to create todo", e).await),
        }
    }

    pub async fn update(&self, id: &str, req: UpdateTodo) -> Result<Todo, ClientError> {
        self.apply_update(id, req, "Failed to update todo").await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let _guard = InFlight::enter(&self.in_flight);
        self.clear_error().await;

        match self.api.delete_todo(id).await {
            Ok(()) => {
                self.inner.write().await.items.retain(|t| t.id != id);
                Ok(())
            }
            Err(e) => Err(self.record("Failed to delete todo", e).await),
        }
    }

    /// Invert `completed` on a cached item. Ids not in the cache fail
    /// without contacting the server.
    pub async fn toggle(&self, id: &str) -> Result<Todo, ClientError> {
        let current = {
            let state = self.inner.read().await;
            state.items.iter().find(|t| t.id == id).map(|t| t.completed)
        };
        match current {
            Some(completed) => {
                self.apply_update(id, UpdateTodo::completed(!completed), "Failed to toggle todo")
                    .await
            }
            None => {
                let err = ClientError::NotFound {
                    message: "Todo not found".to_string(),
                };
                Err(self.record("Failed to toggle todo", err).await)
            }
        }
    }

    async fn apply_update(
        &self,
        id: &str,
        req: UpdateTodo,
        context: &str,
    ) -> Result<Todo, ClientError> {
        let _guard = InFlight::enter(&self.in_flight);
        self.clear_error().await;

        let result = match req.validate() {
            Ok(()) => self.api.update_todo(id, req).await,
            Err(errors) => Err(errors.into()),
        };
        match result {
            Ok(updated) => {
                let mut state = self.inner.write().await;
                if let Some(slot) = state.items.iter_mut().find(|t| t.id == id) {
                    *slot = updated.clone();
                }
                Ok(updated)
            }
            Err(e) => Err(self.record(context, e).await),
        }
    }

    async fn record(&self, context: &str, err: ClientError) -> ClientError {
        tracing::warn!("{}: {}", context, err);
        self.inner.write().await.error = Some(failure_message(context, &err));
        err
    }

    /// Refetch every `period` in the background. Ticks are skipped while a
    /// request is in flight or an error is showing. Dropping the returned
    /// handle stops polling.
    pub fn spawn_poller(self: &Arc<Self>, period: Duration) -> Poller {
        let state = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if state.is_busy() || state.inner.read().await.error.is_some() {
                    tracing::debug!("Skipping poll");
                    continue;
                }
                // Failures are recorded in the state
                let _ = state.refetch().await;
            }
        });
        Poller { handle }
    }
}

/// Background refetch task; aborted on drop.
pub struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    pub fn stop(self) {}
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn failure_message(context: &str, err: &ClientError) -> String {
    format!("{}: {}", context, err.user_message())
}
