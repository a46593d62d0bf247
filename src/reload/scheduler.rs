//! Debounced, single-flight snapshot rebuilds.
//!
//! The scheduler is an actor: one task owns the debounce timer and is the
//! only place a rebuild is started from. Change notifications are messages
//! on its channel, which serializes arming, re-arming and firing without any
//! shared timer state.
//!
//! ```text
//!            notify                      notify (re-arm)
//!   Idle ─────────────→ PendingReload ─────────────┐
//!    ↑                        │  ↑                 │
//!    │      deadline: load +  │  └─────────────────┘
//!    └────── publish ─────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::projection::{LoadError, Projection, SnapshotLoader};

/// Errors raised by the reload machinery
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("Rebuild failed: {0}")]
    RebuildFailed(#[source] LoadError),

    #[error("Notify error: {0}")]
    Watch(#[from] notify::Error),
}

/// What changed about a watched file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Size or contents
    Content,
    /// Timestamps or other metadata
    Metadata,
    Other,
}

/// A change reported by a file-watch facility
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

#[derive(Debug)]
enum Message {
    Changed,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    PendingReload { deadline: Instant },
}

/// Cheap, cloneable sender of change notifications
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    tx: mpsc::UnboundedSender<Message>,
    metadata_file: Arc<str>,
}

impl ReloadHandle {
    /// Request a rebuild; returns false once the scheduler has stopped
    pub fn notify(&self) -> bool {
        self.tx.send(Message::Changed).is_ok()
    }

    /// Forward a file-watch event if it concerns a metadata file.
    ///
    /// Returns whether the event was accepted and delivered.
    pub fn notify_change(&self, event: &ChangeEvent) -> bool {
        if !self.accepts(event) {
            tracing::debug!("Ignoring {:?} on {}", event.kind, event.path.display());
            return false;
        }
        self.notify()
    }

    /// Whether an event should trigger a rebuild
    pub fn accepts(&self, event: &ChangeEvent) -> bool {
        let is_metadata = event
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name == &*self.metadata_file)
            .unwrap_or(false);

        is_metadata && matches!(event.kind, ChangeKind::Content | ChangeKind::Metadata)
    }
}

/// Running scheduler actor
#[derive(Debug)]
pub struct ReloadScheduler {
    handle: ReloadHandle,
    published: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl ReloadScheduler {
    /// Spawn the actor on the current Tokio runtime
    pub fn spawn(
        projection: Arc<Projection>,
        loader: Arc<dyn SnapshotLoader>,
        delay: Duration,
        metadata_file: impl Into<String>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (published_tx, published) = watch::channel(projection.snapshot().generation);

        let actor = Actor {
            projection,
            loader,
            delay,
            published: published_tx,
        };
        let task = tokio::spawn(actor.run(rx));

        Self {
            handle: ReloadHandle {
                tx,
                metadata_file: Arc::from(metadata_file.into()),
            },
            published,
            task,
        }
    }

    /// A sender for change notifications
    pub fn handle(&self) -> ReloadHandle {
        self.handle.clone()
    }

    /// Receiver of published snapshot generations
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.published.clone()
    }

    /// Stop the actor, waiting for an in-flight rebuild to finish
    pub async fn shutdown(self) {
        let _ = self.handle.tx.send(Message::Shutdown);
        if let Err(e) = self.task.await {
            tracing::error!("Reload scheduler task failed: {}", e);
        }
    }
}

struct Actor {
    projection: Arc<Projection>,
    loader: Arc<dyn SnapshotLoader>,
    delay: Duration,
    published: watch::Sender<u64>,
}

impl Actor {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Message>) {
        let mut state = State::Idle;

        loop {
            state = match state {
                State::Idle => match rx.recv().await {
                    Some(Message::Changed) => self.arm(),
                    Some(Message::Shutdown) | None => break,
                },
                State::PendingReload { deadline } => {
                    tokio::select! {
                        message = rx.recv() => match message {
                            Some(Message::Changed) => self.arm(),
                            Some(Message::Shutdown) | None => break,
                        },
                        _ = sleep_until(deadline) => {
                            self.rebuild().await;
                            State::Idle
                        }
                    }
                }
            };
        }

        tracing::debug!("Reload scheduler stopped");
    }

    fn arm(&self) -> State {
        State::PendingReload {
            deadline: Instant::now() + self.delay,
        }
    }

    async fn rebuild(&self) {
        tracing::info!("Catalog changed, rebuilding snapshot");

        let loader = Arc::clone(&self.loader);
        let result = match tokio::task::spawn_blocking(move || loader.load()).await {
            Ok(result) => result,
            Err(e) => Err(LoadError::Task(e.to_string())),
        };

        match result {
            Ok(snapshot) => {
                let generation = self.projection.publish(snapshot);
                self.published.send_replace(generation);
            }
            Err(e) => {
                let error = ReloadError::RebuildFailed(e);
                tracing::warn!("{}; keeping previous snapshot", error);
            }
        }
    }
}
