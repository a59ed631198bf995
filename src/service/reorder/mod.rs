//! Drag-reordering of a course's content list.
//!
//! Moves are applied to the local list at once and queued as `(content, sort order)` pairs.
//! One shared timer collects rapid drags; when it expires the whole batch is written in
//! parallel and the list is fetched again so the server has the last word.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use itertools::Itertools;
use snafu::{ensure, OptionExt as _, Snafu};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::instrument;

use crate::api::{ApiError, CourseBackend};
use crate::model::{ContentId, ContentItem, ContentStatus, CourseId};
use crate::Located;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

type Items = Arc<watch::Sender<Vec<ContentItem>>>;

#[derive(Debug, Snafu)]
pub enum ReorderError {
    #[snafu(display("cannot move item {from} to {to} in a list of {len}"))]
    OutOfBounds { from: usize, to: usize, len: usize },

    #[snafu(display("the reorder task has stopped"))]
    Closed,

    #[snafu(transparent)]
    Backend { source: ApiError },
}

/// Moves the item at `from` to `to` and renumbers every item by its new position.
///
/// The list is left untouched when either index is out of range.
pub fn reorder(items: &mut Vec<ContentItem>, from: usize, to: usize) -> Result<(), ReorderError> {
    let len = items.len();
    ensure!(from < len && to < len, OutOfBoundsSnafu { from, to, len });

    let item = items.remove(from);
    items.insert(to, item);

    for (index, item) in items.iter_mut().enumerate() {
        item.sort_order = index as i64;
    }
    Ok(())
}

#[derive(Debug)]
enum Command {
    Queue(Vec<(ContentId, i64)>),
}

#[derive(Debug)]
pub struct ReorderCoordinator<B> {
    course: CourseId,
    backend: B,
    items: Items,
    commands: UnboundedSender<Command>,
    handle: JoinHandle<()>,
}

impl<B> ReorderCoordinator<B>
where
    B: CourseBackend + Clone + 'static,
{
    /// Starts a coordinator with an empty list. See [ReorderCoordinator::load].
    pub fn new(course: CourseId, backend: B, debounce: Duration) -> Self {
        let (items, _) = watch::channel(Vec::new());
        let items = Arc::new(items);
        let (commands, rx) = unbounded_channel();

        let handle = tokio::spawn(run(course, backend.clone(), items.clone(), debounce, rx));

        Self {
            course,
            backend,
            items,
            commands,
            handle,
        }
    }

    /// Starts a coordinator and fills it with the course's current content.
    pub async fn load(course: CourseId, backend: B, debounce: Duration) -> Result<Self, ReorderError> {
        let coordinator = Self::new(course, backend, debounce);
        coordinator.reload().await?;
        Ok(coordinator)
    }

    /// Snapshot of the list as currently displayed.
    pub fn items(&self) -> Vec<ContentItem> {
        self.items.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<ContentItem>> {
        self.items.subscribe()
    }

    /// Applies a drag from position `from` to position `to` and schedules its persistence.
    pub fn move_item(&self, from: usize, to: usize) -> Result<(), ReorderError> {
        let mut outcome = Ok(());
        let mut changes = Vec::new();

        self.items.send_if_modified(|items| {
            if from == to && from < items.len() {
                return false;
            }

            outcome = reorder(items, from, to);
            if outcome.is_err() {
                return false;
            }
            changes = items.iter().map(|item| (item.id, item.sort_order)).collect();
            true
        });

        outcome?;

        if changes.is_empty() {
            return Ok(());
        }

        tracing::debug!(course.id = %self.course, from, to, "moved content");
        self.commands.send(Command::Queue(changes)).ok().context(ClosedSnafu)
    }

    /// Replaces the local list with the server's.
    pub async fn reload(&self) -> Result<(), ReorderError> {
        Ok(reload(self.course, &self.backend, &self.items).await?)
    }

    #[instrument(skip(self))]
    pub async fn set_status(&self, content: ContentId, status: ContentStatus) -> Result<(), ReorderError> {
        let outcome = self.backend.update_status(content, status).await;
        self.reload().await?;
        Ok(outcome?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, content: ContentId) -> Result<(), ReorderError> {
        let outcome = self.backend.delete_content(content).await;
        self.reload().await?;
        Ok(outcome?)
    }

    /// Stops the timer task. Unsent moves are dropped, a flush already running completes.
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(error) = self.handle.await {
            tracing::warn!(course.id = %self.course, %error, "reorder task did not end cleanly");
        }
    }
}

async fn run<B>(
    course: CourseId, backend: B, items: Items, debounce: Duration,
    mut commands: UnboundedReceiver<Command>,
) where
    B: CourseBackend + Clone + 'static,
{
    let mut pending: HashMap<ContentId, i64> = HashMap::new();
    let timer = sleep(debounce);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Queue(changes)) => {
                    pending.extend(changes);
                    timer.as_mut().reset(Instant::now() + debounce);
                }
                None => break,
            },

            () = &mut timer, if !pending.is_empty() => {
                let batch = std::mem::take(&mut pending);
                tokio::spawn(flush(course, batch, backend.clone(), items.clone()));
            }
        }
    }

    if !pending.is_empty() {
        tracing::debug!(course.id = %course, count = pending.len(), "discarded unsaved order changes");
    }
}

async fn flush<B: CourseBackend>(
    course: CourseId, batch: HashMap<ContentId, i64>, backend: B, items: Items,
) {
    tracing::info!(course.id = %course, count = batch.len(), "saving content order");

    let updates = batch
        .into_iter()
        .sorted_by_key(|(_, sort_order)| *sort_order)
        .map(|(content, sort_order)| {
            let backend = &backend;
            async move { (content, backend.update_order(content, sort_order).await) }
        });

    for (content, result) in futures::future::join_all(updates).await {
        if let Err(error) = result {
            tracing::error!(course.id = %course, content.id = %content, %error, location = %error.location(), "could not save content order");
        }
    }

    if let Err(error) = reload(course, &backend, &items).await {
        tracing::error!(course.id = %course, %error, location = %error.location(), "could not reload course content");
    }
}

async fn reload<B: CourseBackend>(course: CourseId, backend: &B, items: &Items) -> Result<(), ApiError> {
    let mut fresh = backend.course_content(course).await?;
    fresh.sort_by_key(|item| item.sort_order);

    tracing::debug!(course.id = %course, count = fresh.len(), "reloaded course content");
    items.send_replace(fresh);
    Ok(())
}
