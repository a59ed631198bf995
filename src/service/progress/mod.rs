//! Playback progress autosave and completion tracking.
//!
//! Every video gets its own [PlaybackSession] task. `timeupdate` ticks are debounced: only
//! the last sample survives a quiet period and is persisted. The end of a video marks the
//! content completed right away, without touching the pending save.

use std::sync::Arc;
use std::time::Duration;

use dashmap::{DashMap, DashSet};
use snafu::Snafu;
use tracing::instrument;

use crate::api::{ApiError, CourseBackend};
use crate::model::{ContentId, ContentProgress, CourseId, CourseProgress, ProgressSample};

use session::{PlaybackEvent, PlaybackSession};

mod session;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(5);

/// Content the member has finished, shared between the tracker and whoever renders it.
#[derive(Debug, Clone, Default)]
pub struct WatchedSet(Arc<DashSet<ContentId>>);

impl WatchedSet {
    pub fn contains(&self, id: ContentId) -> bool {
        self.0.contains(&id)
    }

    /// Returns `true` when the content was not watched before.
    pub fn insert(&self, id: ContentId) -> bool {
        self.0.insert(id)
    }

    pub fn set(&self, id: ContentId, watched: bool) {
        if watched {
            self.0.insert(id);
        } else {
            self.0.remove(&id);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Snafu)]
pub enum ProgressError {
    #[snafu(transparent)]
    Backend { source: ApiError },
}

#[derive(Debug)]
pub struct ProgressTracker<B> {
    backend: B,
    watched: WatchedSet,
    debounce: Duration,
    sessions: DashMap<ContentId, PlaybackSession>,
}

impl<B> ProgressTracker<B>
where
    B: CourseBackend + Clone + 'static,
{
    pub fn new(backend: B, debounce: Duration) -> Self {
        Self {
            backend,
            watched: WatchedSet::default(),
            debounce,
            sessions: DashMap::new(),
        }
    }

    pub fn watched(&self) -> &WatchedSet {
        &self.watched
    }

    pub fn is_watched(&self, id: ContentId) -> bool {
        self.watched.contains(id)
    }

    /// Forwards a `timeupdate` from the player. The save fires once the ticks stop.
    pub fn time_update(&self, content: ContentId, current_time: f64, duration: f64) {
        let sample = ProgressSample::from_player(current_time, duration);
        self.dispatch(content, PlaybackEvent::TimeUpdate(sample));
    }

    /// Forwards the player's `ended` event.
    pub fn ended(&self, content: ContentId) {
        self.dispatch(content, PlaybackEvent::Ended);
    }

    /// The player went away: the pending save is dropped, requests already sent keep going.
    pub fn unmount(&self, content: ContentId) {
        if let Some((_, session)) = self.sessions.remove(&content) {
            tracing::debug!(content.id = %content, "unmounted playback session");
            session.stop();
        }
    }

    /// Flips the completion state of `content` on the member's request.
    #[instrument(skip(self))]
    pub async fn toggle(&self, content: ContentId) -> Result<bool, ProgressError> {
        let target = !self.watched.contains(content);
        let progress = self.backend.mark_completed(content, target).await?;

        self.watched.set(content, progress.is_completed);
        tracing::info!(content.id = %content, completed = progress.is_completed, "toggled completion");

        Ok(progress.is_completed)
    }

    /// Loads the member's progress on a course and seeds the watched set with it.
    #[instrument(skip(self))]
    pub async fn load_course(&self, course: CourseId) -> Result<CourseProgress, ProgressError> {
        let progress = self.backend.course_progress(course).await?;

        for item in &progress.items {
            self.watched.set(item.content_id, item.is_completed);
        }

        tracing::debug!(course.id = %course, completed = progress.completed_count(), "loaded course progress");
        Ok(progress)
    }

    /// The position the backend has on record for `content`.
    #[instrument(skip(self))]
    pub async fn progress(&self, content: ContentId) -> Result<ContentProgress, ProgressError> {
        let progress = self.backend.content_progress(content).await?;
        self.watched.set(content, progress.is_completed);
        Ok(progress)
    }

    /// Course progress as the watched set sees it now, including toggles and completions
    /// made since [ProgressTracker::load_course].
    pub fn snapshot(
        &self, course: CourseId, contents: impl IntoIterator<Item = ContentId>,
    ) -> CourseProgress {
        let items = contents
            .into_iter()
            .map(|content| ContentProgress::new(content, 0, 0, self.is_watched(content)))
            .collect();
        CourseProgress::new(course, items)
    }

    /// Stops every session and waits for their loops to end.
    pub async fn shutdown(&self) {
        let contents: Vec<ContentId> = self.sessions.iter().map(|x| *x.key()).collect();

        for content in contents {
            if let Some((_, session)) = self.sessions.remove(&content) {
                session.shutdown().await;
            }
        }
    }

    fn dispatch(&self, content: ContentId, event: PlaybackEvent) {
        let session = self.sessions.entry(content).or_insert_with(|| {
            tracing::debug!(content.id = %content, "starting playback session");
            PlaybackSession::spawn(
                content,
                self.backend.clone(),
                self.watched.clone(),
                self.debounce,
            )
        });

        if let Err(event) = session.send(event) {
            tracing::warn!(content.id = %content, ?event, "playback session is gone, event dropped");
        }
    }
}
